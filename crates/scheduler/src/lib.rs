//! A periodic retry scheduler decoupled from any particular job family.
//!
//! The scheduler interacts with its domain solely through two collaborator
//! traits: a [`PendingSource`] that snapshots eligible jobs and persists
//! attempt outcomes, and a [`Dispatcher`] that performs one delivery attempt.
//! Time is read through an injectable [`Clock`] so tests are deterministic.

pub mod backoff;
pub mod clock;
pub mod job;
pub mod scheduler;

pub use backoff::Backoff;
pub use clock::{Clock, ManualClock, SystemClock};
pub use job::{Attempt, DispatchError, Job, JobUpdate, SchedulerError};
pub use scheduler::{Dispatcher, PendingSource, Scheduler, SchedulerConfig};
