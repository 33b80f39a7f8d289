//! Validate command implementation.

use serde::Serialize;
use std::path::Path;
use worldedit_world::{apply_batch, PatchWorldBody, World, WorldDelta};

/// PATCH body validation result.
#[derive(Debug, Serialize)]
pub struct ValidateResult {
    /// Body file path.
    pub path: String,
    /// Author CUID.
    pub author: String,
    /// Delta kinds in order.
    pub deltas: Vec<String>,
    /// Whether the batch applies to the given world, if one was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applies: Option<bool>,
    /// Why the batch does not apply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The world after the batch, if it applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<World>,
}

/// Checks a body file, and optionally applies it to a world snapshot.
pub fn validate(
    body_path: &Path,
    world_path: Option<&Path>,
) -> Result<ValidateResult, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(body_path)
        .map_err(|e| format!("failed to read body {}: {e}", body_path.display()))?;
    let body = PatchWorldBody::<WorldDelta>::from_json(&bytes)
        .map_err(|e| format!("invalid body {}: {e}", body_path.display()))?;

    let mut result = ValidateResult {
        path: body_path.display().to_string(),
        author: body.author.cuid.clone(),
        deltas: body.deltas.iter().map(|d| d.op.kind().to_string()).collect(),
        applies: None,
        error: None,
        result: None,
    };

    if let Some(world_path) = world_path {
        let text = std::fs::read_to_string(world_path)
            .map_err(|e| format!("failed to read world {}: {e}", world_path.display()))?;
        let mut world: World = serde_json::from_str(&text)
            .map_err(|e| format!("invalid world {}: {e}", world_path.display()))?;

        match apply_batch(&mut world, &body.deltas) {
            Ok(()) => {
                result.applies = Some(true);
                result.result = Some(world);
            }
            Err(err) => {
                result.applies = Some(false);
                result.error = Some(err.to_string());
            }
        }
    }

    Ok(result)
}

/// Runs the validate command.
pub fn run(
    body_path: &Path,
    world_path: Option<&Path>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = validate(body_path, world_path)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    if result.applies == Some(false) {
        return Err("batch does not apply to the given world".into());
    }
    Ok(())
}

fn print_text_output(result: &ValidateResult) {
    println!("✓ Valid PATCH body");
    println!("  Path: {}", result.path);
    println!("  Author: {}", result.author);
    println!("  Deltas: {}", result.deltas.len());
    for (index, kind) in result.deltas.iter().enumerate() {
        println!("    {:>3}. {kind}", index + 1);
    }

    match (result.applies, &result.error) {
        (Some(true), _) => println!("✓ Applies to the given world"),
        (Some(false), Some(error)) => println!("✗ Does not apply: {error}"),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use worldedit_testkit::{sample_world, temp_json_file};
    use worldedit_world::{Author, DeltaOp, Identifier};

    fn body(ops: Vec<DeltaOp>) -> PatchWorldBody<WorldDelta> {
        PatchWorldBody::new(
            Author::new("editor-1"),
            ops.into_iter().map(WorldDelta::new).collect(),
        )
    }

    #[test]
    fn valid_body_without_world() {
        let file = temp_json_file(&body(vec![DeltaOp::SetWorldName {
            name: "bay".into(),
        }]));

        let result = validate(file.path(), None).unwrap();
        assert_eq!(result.author, "editor-1");
        assert_eq!(result.deltas, vec!["setWorldName"]);
        assert_eq!(result.applies, None);
    }

    #[test]
    fn body_applied_to_world() {
        let world = temp_json_file(&sample_world());
        let ok = temp_json_file(&body(vec![DeltaOp::DeletePoint {
            point: Identifier::Id(4),
        }]));
        let result = validate(ok.path(), Some(world.path())).unwrap();
        assert_eq!(result.applies, Some(true));
        assert_eq!(result.result.unwrap().point_count(), 3);

        let referenced = temp_json_file(&body(vec![DeltaOp::DeletePoint {
            point: Identifier::Id(1),
        }]));
        let result = validate(referenced.path(), Some(world.path())).unwrap();
        assert_eq!(result.applies, Some(false));
        assert!(result.error.is_some());
    }

    #[test]
    fn empty_batch_is_invalid() {
        let file = temp_json_file(&body(vec![]));
        let err = validate(file.path(), None).unwrap_err();
        assert!(err.to_string().contains("at least one"), "{err}");
    }
}
