//! The Herald notification core.
//!
//! Owns the notification state machine and the five public operations
//! (send, get, list, reschedule, cancel), vends per-tenant senders through
//! the [`SenderRegistry`], and adapts the notification domain onto the
//! generic retry scheduler via [`NotificationPendingSource`] and
//! [`NotificationDispatcher`].

pub mod dispatch;
pub mod registry;
pub mod service;
pub mod testing;

pub use dispatch::{NotificationDispatcher, NotificationPendingSource};
pub use registry::SenderRegistry;
pub use service::Notifications;
