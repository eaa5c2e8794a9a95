use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier assigned to a client connection at accept time.
///
/// Wraps a v4 UUID. The id is stable for the lifetime of one TCP
/// connection and is the key under which the connection is tracked in
/// the client map and the frame scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Generate a fresh random client id.
    #[must_use]
    pub fn generate() -> Self {
        ClientId(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Short prefix of the id, convenient for log lines.
    #[must_use]
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ClientId {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let uuid = Uuid::parse_str(s)
            .map_err(|e| crate::Error::InvalidIdentifier(format!("Invalid client id '{s}': {e}")))?;
        Ok(ClientId(uuid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_client_id_unique() {
        let a = ClientId::generate();
        let b = ClientId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_client_id_roundtrip() {
        let id = ClientId::generate();
        let parsed: ClientId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_client_id_short() {
        let id = ClientId::generate();
        assert_eq!(id.short().len(), 8);
        assert!(id.to_string().starts_with(&id.short()));
    }

    #[rstest]
    #[case("not-a-uuid")]
    #[case("")]
    #[case("123e4567-e89b-12d3-a456")] // truncated
    fn test_client_id_parse_invalid(#[case] input: &str) {
        let result: crate::Result<ClientId> = input.parse();
        assert!(result.is_err());
    }
}
