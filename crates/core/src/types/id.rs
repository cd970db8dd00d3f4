//! Numeric user identifier.

use serde::{Deserialize, Serialize};

/// The provider's numeric `userId`.
///
/// Serialized as a bare number so cached sessions keep the wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<UserId> for u64 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_serializes_as_bare_number() {
        let id = UserId::new(12345);
        assert_eq!(serde_json::to_string(&id).unwrap(), "12345");
        assert_eq!(serde_json::from_str::<UserId>("12345").unwrap(), id);
    }

    #[test]
    fn test_user_id_display_and_conversion() {
        let id = UserId::from(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(u64::from(id), 42);
        assert_eq!(id.as_u64(), 42);
    }
}
