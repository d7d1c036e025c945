use serde::{Deserialize, Serialize};

/// Maximum number of attachments on a single notification.
pub const MAX_ATTACHMENT_COUNT: usize = 10;

/// Maximum size of a single attachment in bytes (5 MiB).
pub const MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;

/// Maximum aggregate size of all attachments in bytes (25 MiB).
pub const MAX_TOTAL_ATTACHMENT_BYTES: usize = 25 * 1024 * 1024;

/// Content type assigned when the caller does not specify one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A file attached to an email notification.
///
/// Payload bytes are owned by the attachment; validation copies them out of
/// the caller's buffer so later mutation of the source cannot reach a
/// persisted row. On the wire the payload travels base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.to_owned()
}

/// Serde adapter encoding binary payloads as base64 strings in JSON.
pub mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as B64;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&B64.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        B64.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_roundtrip_base64() {
        let attachment = Attachment {
            filename: "report.pdf".to_owned(),
            content_type: "application/pdf".to_owned(),
            data: vec![0xde, 0xad, 0xbe, 0xef],
        };
        let json = serde_json::to_string(&attachment).unwrap();
        assert!(json.contains("3q2+7w=="), "payload should be base64: {json}");
        let back: Attachment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, attachment);
    }

    #[test]
    fn missing_content_type_defaults() {
        let json = r#"{"filename":"a.bin","data":"AAECAw=="}"#;
        let attachment: Attachment = serde_json::from_str(json).unwrap();
        assert_eq!(attachment.content_type, DEFAULT_CONTENT_TYPE);
        assert_eq!(attachment.data, vec![0, 1, 2, 3]);
    }
}
