use thiserror::Error;

use crate::attachment::{MAX_ATTACHMENT_BYTES, MAX_ATTACHMENT_COUNT, MAX_TOTAL_ATTACHMENT_BYTES};

/// The error taxonomy surfaced by Herald's public operations.
///
/// Every ingress surface maps these variants onto its own status codes; the
/// [`code`](Self::code) string is the stable machine-readable form. Secrets
/// and recipient addresses never appear in these messages.
#[derive(Debug, Error)]
pub enum HeraldError {
    /// Missing or invalid bearer token, or missing request metadata.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Missing required id, malformed timestamp, unknown notification type,
    /// unsupported field, or empty tenant id.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown tenant, notification, or host.
    #[error("not found")]
    NotFound,

    /// No tenant runtime could be established for the call.
    #[error("missing tenant context")]
    MissingTenantContext,

    /// Attempted edit on a notification that is no longer queued.
    #[error("notification can only be edited while queued")]
    NotEditable,

    /// A reschedule target that is not strictly in the future.
    #[error("scheduled time must be in the future")]
    ScheduleInPast,

    /// The tenant has no SMS credentials configured.
    #[error("sms is not enabled for this tenant")]
    SmsDisabled,

    /// An attachment limit or shape violation.
    #[error(transparent)]
    Attachments(#[from] AttachmentError),

    /// Stored credential ciphertext failed authentication. Fatal for the
    /// affected tenant until its configuration is corrected.
    #[error("credential decryption failed")]
    CredentialDecryptFailed,

    /// Any unexpected storage or transport failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HeraldError {
    /// Stable surface code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidArgument(_) | Self::MissingTenantContext => "invalid_argument",
            Self::NotFound => "not_found",
            Self::NotEditable => "not_editable",
            Self::ScheduleInPast => "schedule_in_past",
            Self::SmsDisabled => "sms_disabled",
            Self::Attachments(e) => e.code(),
            Self::CredentialDecryptFailed => "credential_decrypt_failed",
            Self::Internal(_) => "internal",
        }
    }

    /// Shorthand for an `invalid_argument` error with the given message.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Shorthand for an `internal` error with the given message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Attachment validation failures, each with its own surface code.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AttachmentError {
    #[error("attachments are only supported for email notifications")]
    NotAllowed,

    #[error("too many attachments (maximum {MAX_ATTACHMENT_COUNT})")]
    CountExceeded,

    #[error("attachment filename is required")]
    FilenameRequired,

    #[error("attachment data is required")]
    DataRequired,

    #[error("attachment exceeds the per-file limit of {MAX_ATTACHMENT_BYTES} bytes")]
    FileTooLarge,

    #[error("attachments exceed the aggregate limit of {MAX_TOTAL_ATTACHMENT_BYTES} bytes")]
    TotalTooLarge,
}

impl AttachmentError {
    /// Stable surface code for this violation.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAllowed => "attachments_not_allowed",
            Self::CountExceeded => "attachments_count_exceeded",
            Self::FilenameRequired => "attachments_filename_required",
            Self::DataRequired => "attachments_data_required",
            Self::FileTooLarge => "attachments_file_too_large",
            Self::TotalTooLarge => "attachments_total_too_large",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(HeraldError::Unauthenticated.code(), "unauthenticated");
        assert_eq!(HeraldError::invalid_argument("x").code(), "invalid_argument");
        assert_eq!(HeraldError::MissingTenantContext.code(), "invalid_argument");
        assert_eq!(HeraldError::NotFound.code(), "not_found");
        assert_eq!(HeraldError::NotEditable.code(), "not_editable");
        assert_eq!(HeraldError::ScheduleInPast.code(), "schedule_in_past");
        assert_eq!(HeraldError::SmsDisabled.code(), "sms_disabled");
        assert_eq!(HeraldError::CredentialDecryptFailed.code(), "credential_decrypt_failed");
        assert_eq!(HeraldError::internal("boom").code(), "internal");
    }

    #[test]
    fn attachment_codes_are_distinct() {
        let all = [
            AttachmentError::NotAllowed,
            AttachmentError::CountExceeded,
            AttachmentError::FilenameRequired,
            AttachmentError::DataRequired,
            AttachmentError::FileTooLarge,
            AttachmentError::TotalTooLarge,
        ];
        let codes: std::collections::HashSet<_> = all.iter().map(AttachmentError::code).collect();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn attachment_error_converts_to_herald_error() {
        let err: HeraldError = AttachmentError::CountExceeded.into();
        assert_eq!(err.code(), "attachments_count_exceeded");
    }
}
