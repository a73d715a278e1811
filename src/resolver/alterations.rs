use crate::error::{AssetError, Result};
use crate::models::{Alteration, AlterationKind};

/// Apply alterations to a file list in declaration order.
///
/// Each edit searches for its target in the list as left by the previous edits, so an edit
/// may target a file inserted earlier. A missing target is a configuration error.
pub fn apply_alterations(
  bundle: &str,
  mut files: Vec<String>,
  alterations: &[Alteration],
) -> Result<Vec<String>> {
  for alteration in alterations {
    for edit in &alteration.edits {
      if let AlterationKind::Unknown(kind) = &edit.kind {
        tracing::debug!(bundle, target = %alteration.target, %kind, "ignoring unknown alteration");
        continue;
      }

      let position = files
        .iter()
        .position(|file| file == &alteration.target)
        .ok_or_else(|| AssetError::AlterationTargetMissing {
          bundle: bundle.to_string(),
          target: alteration.target.clone(),
        })?;

      let inserted = edit.files.iter().cloned();
      match edit.kind {
        AlterationKind::After => {
          files.splice(position + 1..position + 1, inserted);
        }
        AlterationKind::Before => {
          files.splice(position..position, inserted);
        }
        AlterationKind::Replace => {
          files.splice(position..=position, inserted);
        }
        AlterationKind::Unknown(_) => {}
      }
    }
  }

  Ok(files)
}
