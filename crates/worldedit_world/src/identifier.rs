//! Entity identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifies a point, polygon or network.
///
/// Entities that were loaded from the store carry their permanent numeric
/// id. Entities created in the editor carry a client-assigned temporary id
/// until the store persists them.
///
/// Serialized as `{"id": 12}` or `{"temporaryCUID": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Identifier {
    /// Permanent id assigned by the store.
    #[serde(rename = "id")]
    Id(u64),
    /// Temporary id assigned by the editor.
    #[serde(rename = "temporaryCUID")]
    Temporary(String),
}

impl Identifier {
    /// Creates a temporary identifier.
    pub fn temporary(cuid: impl Into<String>) -> Self {
        Self::Temporary(cuid.into())
    }

    /// Creates a fresh, random temporary identifier.
    pub fn new_temporary() -> Self {
        Self::Temporary(Uuid::new_v4().simple().to_string())
    }

    /// Returns true if the entity has not been persisted yet.
    pub fn is_temporary(&self) -> bool {
        matches!(self, Identifier::Temporary(_))
    }
}

impl From<u64> for Identifier {
    fn from(id: u64) -> Self {
        Self::Id(id)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Id(id) => write!(f, "#{id}"),
            Identifier::Temporary(cuid) => write!(f, "~{cuid}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format() {
        let json = serde_json::to_string(&Identifier::Id(12)).unwrap();
        assert_eq!(json, r#"{"id":12}"#);

        let json = serde_json::to_string(&Identifier::temporary("ck1")).unwrap();
        assert_eq!(json, r#"{"temporaryCUID":"ck1"}"#);

        let parsed: Identifier = serde_json::from_str(r#"{"temporaryCUID":"ck1"}"#).unwrap();
        assert_eq!(parsed, Identifier::temporary("ck1"));
    }

    #[test]
    fn fresh_temporaries_are_distinct() {
        let a = Identifier::new_temporary();
        let b = Identifier::new_temporary();
        assert!(a.is_temporary());
        assert_ne!(a, b);
        assert!(!Identifier::from(3).is_temporary());
    }
}
