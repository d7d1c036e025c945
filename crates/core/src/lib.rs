pub mod attachment;
pub mod digest;
pub mod error;
pub mod notification;
pub mod request;
pub mod runtime;
pub mod types;

pub use attachment::{
    Attachment, DEFAULT_CONTENT_TYPE, MAX_ATTACHMENT_BYTES, MAX_ATTACHMENT_COUNT,
    MAX_TOTAL_ATTACHMENT_BYTES,
};
pub use digest::log_digest;
pub use error::{AttachmentError, HeraldError};
pub use notification::{Notification, NotificationStatus, NotificationType};
pub use request::{NotificationRequest, RawAttachment, RawNotification};
pub use runtime::{
    EmailCredentials, RuntimeConfig, RuntimeInvalidate, SmsCredentials, Tenant, TenantStatus,
};
pub use types::{NotificationId, TenantId};
