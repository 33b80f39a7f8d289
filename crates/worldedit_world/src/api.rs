//! PATCH wire types.

use crate::error::{WorldError, WorldResult};
use serde::{Deserialize, Serialize};

/// The editor instance that produced a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Client id of the editor session.
    #[serde(rename = "CUID")]
    pub cuid: String,
}

impl Author {
    /// Creates an author.
    pub fn new(cuid: impl Into<String>) -> Self {
        Self { cuid: cuid.into() }
    }
}

/// Body of `PATCH /api/worlds/{id}`.
///
/// ```json
/// { "author": { "CUID": "..." }, "deltas": [ ... ] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchWorldBody<D> {
    /// Who sent the batch.
    pub author: Author,
    /// Deltas in the order they must be applied.
    pub deltas: Vec<D>,
}

impl<D> PatchWorldBody<D> {
    /// Creates a body.
    pub fn new(author: Author, deltas: Vec<D>) -> Self {
        Self { author, deltas }
    }

    /// Checks the body is well formed.
    pub fn validate(&self) -> WorldResult<()> {
        if self.author.cuid.trim().is_empty() {
            return Err(WorldError::InvalidPatch("author CUID is empty".into()));
        }
        if self.deltas.is_empty() {
            return Err(WorldError::InvalidPatch(
                "deltas must contain at least one item".into(),
            ));
        }
        Ok(())
    }
}

impl<D: Serialize> PatchWorldBody<D> {
    /// Encodes the body as JSON.
    pub fn to_json(&self) -> WorldResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl<D: for<'de> Deserialize<'de>> PatchWorldBody<D> {
    /// Decodes and validates a JSON body.
    pub fn from_json(bytes: &[u8]) -> WorldResult<Self> {
        let body: Self = serde_json::from_slice(bytes)?;
        body.validate()?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::{DeltaOp, WorldDelta};

    fn body() -> PatchWorldBody<WorldDelta> {
        PatchWorldBody::new(
            Author::new("editor-1"),
            vec![WorldDelta::new(DeltaOp::SetWorldName {
                name: "bay".into(),
            })],
        )
    }

    #[test]
    fn json_shape() {
        let value = serde_json::to_value(body()).unwrap();
        assert_eq!(value["author"]["CUID"], "editor-1");
        assert_eq!(value["deltas"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn decode_validates() {
        let original = body();
        let bytes = original.to_json().unwrap();
        let decoded = PatchWorldBody::<WorldDelta>::from_json(&bytes).unwrap();
        assert_eq!(decoded, original);

        let empty = PatchWorldBody::<WorldDelta>::new(Author::new("editor-1"), vec![]);
        let bytes = empty.to_json().unwrap();
        assert!(matches!(
            PatchWorldBody::<WorldDelta>::from_json(&bytes),
            Err(WorldError::InvalidPatch(_))
        ));
    }

    #[test]
    fn blank_author_rejected() {
        let mut body = body();
        body.author.cuid = "  ".into();
        assert!(body.validate().is_err());
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        let result = PatchWorldBody::<WorldDelta>::from_json(b"{\"author\":");
        assert!(matches!(result, Err(WorldError::Serialization(_))));
    }
}
