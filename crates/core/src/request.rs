use chrono::{DateTime, FixedOffset, Utc};

use crate::attachment::{
    Attachment, DEFAULT_CONTENT_TYPE, MAX_ATTACHMENT_BYTES, MAX_ATTACHMENT_COUNT,
    MAX_TOTAL_ATTACHMENT_BYTES,
};
use crate::error::{AttachmentError, HeraldError};
use crate::notification::NotificationType;

/// Raw ingress fields before validation, as both front doors collect them.
#[derive(Debug, Clone, Default)]
pub struct RawNotification {
    /// Channel label (`email` / `sms`), any case.
    pub kind: String,
    pub recipient: String,
    pub subject: Option<String>,
    pub message: String,
    pub attachments: Vec<RawAttachment>,
    /// Schedule instant in the caller's offset; normalized to UTC.
    pub scheduled_for: Option<DateTime<FixedOffset>>,
}

/// An attachment as presented by a caller.
#[derive(Debug, Clone)]
pub struct RawAttachment {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// A validated, canonical notification request.
///
/// Produced exclusively by [`NotificationRequest::validate`]; attachment
/// bytes are copied out of the caller's buffers, so the canonical request
/// shares no storage with the raw input.
#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub kind: NotificationType,
    pub recipient: String,
    pub subject: Option<String>,
    pub message: String,
    pub attachments: Vec<Attachment>,
    pub scheduled_for: Option<DateTime<Utc>>,
}

impl NotificationRequest {
    /// Validate and normalize raw ingress fields.
    ///
    /// Rules are checked in a fixed order, each failure producing a distinct
    /// error kind: recipient, message, type, attachments (count, filename,
    /// data, per-file size, aggregate size), schedule normalization. The
    /// function is pure: no I/O, no logging.
    pub fn validate(raw: RawNotification) -> Result<Self, HeraldError> {
        let recipient = raw.recipient.trim().to_owned();
        if recipient.is_empty() {
            return Err(HeraldError::invalid_argument("recipient is required"));
        }

        let message = raw.message.trim().to_owned();
        if message.is_empty() {
            return Err(HeraldError::invalid_argument("message is required"));
        }

        let kind = NotificationType::parse(&raw.kind).ok_or_else(|| {
            HeraldError::invalid_argument("type must be one of \"email\" or \"sms\"")
        })?;

        if kind != NotificationType::Email && !raw.attachments.is_empty() {
            return Err(AttachmentError::NotAllowed.into());
        }
        if raw.attachments.len() > MAX_ATTACHMENT_COUNT {
            return Err(AttachmentError::CountExceeded.into());
        }

        let mut total = 0usize;
        let mut attachments = Vec::with_capacity(raw.attachments.len());
        for raw_attachment in &raw.attachments {
            if raw_attachment.filename.trim().is_empty() {
                return Err(AttachmentError::FilenameRequired.into());
            }
            if raw_attachment.data.is_empty() {
                return Err(AttachmentError::DataRequired.into());
            }
            if raw_attachment.data.len() > MAX_ATTACHMENT_BYTES {
                return Err(AttachmentError::FileTooLarge.into());
            }
            total += raw_attachment.data.len();
            if total > MAX_TOTAL_ATTACHMENT_BYTES {
                return Err(AttachmentError::TotalTooLarge.into());
            }

            let content_type = match raw_attachment.content_type.as_deref() {
                None | Some("") => DEFAULT_CONTENT_TYPE.to_owned(),
                Some(ct) => ct.to_owned(),
            };
            attachments.push(Attachment {
                filename: raw_attachment.filename.clone(),
                content_type,
                // Copy, so the caller's buffer cannot reach the stored row.
                data: raw_attachment.data.clone(),
            });
        }

        let subject = raw
            .subject
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty());

        Ok(Self {
            kind,
            recipient,
            subject,
            message,
            attachments,
            scheduled_for: raw.scheduled_for.map(|t| t.with_timezone(&Utc)),
        })
    }
}
