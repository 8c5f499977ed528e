use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::StoreError;

/// Upper bound on id length; matches the textual form of a UUID.
pub const SESSION_ID_MAX_LEN: usize = 36;

/// Key of a stored session. Non-empty and at most [`SESSION_ID_MAX_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Result<Self, StoreError> {
        let id = id.into();

        if id.is_empty() {
            return Err(StoreError::InvalidSessionId("empty id".to_string()));
        }
        if id.chars().count() > SESSION_ID_MAX_LEN {
            return Err(StoreError::InvalidSessionId(format!(
                "'{id}' is longer than {SESSION_ID_MAX_LEN} characters"
            )));
        }

        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// A row as persisted: the id and the base64 text of its payload.
///
/// `data` is `None` when the column holds NULL, which only tables created
/// outside this crate allow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub data: Option<String>,
}

impl SessionRecord {
    /// Decoded payload, or `None` if the column is NULL or not valid base64.
    pub fn payload(&self) -> Option<Vec<u8>> {
        self.data.as_deref().and_then(crate::codec::decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_length_ids_are_accepted() {
        let id = SessionId::new("3f2504e0-4f89-11d3-9a0c-0305e82c3301").unwrap();
        assert_eq!(id.as_str().len(), SESSION_ID_MAX_LEN);
        assert_eq!(id.to_string(), "3f2504e0-4f89-11d3-9a0c-0305e82c3301");
    }

    #[test]
    fn empty_and_oversized_ids_are_rejected() {
        assert!(matches!(
            SessionId::new(""),
            Err(StoreError::InvalidSessionId(_))
        ));
        assert!(matches!(
            "x".repeat(37).parse::<SessionId>(),
            Err(StoreError::InvalidSessionId(_))
        ));
    }

    #[test]
    fn record_payload_decodes_stored_text() {
        let record = SessionRecord {
            id: SessionId::new("abc-123").unwrap(),
            data: Some("AP8Q".to_string()),
        };
        assert_eq!(record.payload(), Some(vec![0x00, 0xFF, 0x10]));

        let broken = SessionRecord {
            data: Some("%%%".to_string()),
            ..record.clone()
        };
        assert_eq!(broken.payload(), None);

        let null = SessionRecord {
            data: None,
            ..record
        };
        assert_eq!(null.payload(), None);
        assert_eq!(
            serde_json::to_value(&null).unwrap(),
            serde_json::json!({ "id": "abc-123", "data": null })
        );
    }
}
