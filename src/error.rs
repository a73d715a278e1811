//! Error type shared by bundle resolution, compilation and publishing.

use std::path::PathBuf;

use thiserror::Error;

use crate::filters::MAX_FILTER_ARGUMENTS;

/// Result alias used throughout the crate.
pub type Result<T, E = AssetError> = std::result::Result<T, E>;

/// Failures surfaced to callers of the asset service.
///
/// Every variant is fatal for the compile call that produced it. Unresolvable symbolic file
/// references are the one non-fatal condition and never reach this type; they are dropped
/// from the bundle and logged instead.
#[derive(Debug, Error)]
pub enum AssetError {
  /// The requested bundle is not declared under the namespace path.
  #[error("bundle `{bundle}` is not declared under `{path}`")]
  BundleNotFound {
    /// Name of the missing bundle.
    bundle: String,
    /// Configuration path that was searched.
    path: String,
  },
  /// An alteration names a file that is not part of the bundle's file list.
  #[error("bundle `{bundle}` alters `{target}`, which is not in its file list")]
  AlterationTargetMissing {
    /// Bundle declaring the alteration.
    bundle: String,
    /// File reference the alteration is keyed by.
    target: String,
  },
  /// A filter declares more positional arguments than a filter constructor accepts.
  #[error(
    "filter `{filter}` declares {count} arguments, at most {max} are supported",
    max = MAX_FILTER_ARGUMENTS
  )]
  TooManyFilterArguments {
    /// Filter name as declared in the bundle.
    filter: String,
    /// Number of declared arguments.
    count: usize,
  },
  /// Dependency resolution revisited a bundle or exceeded the depth bound.
  #[error("dependency cycle while resolving bundles: {}", .chain.join(" -> "))]
  CyclicDependency {
    /// Bundle names from the outermost bundle to the one that closed the cycle.
    chain: Vec<String>,
  },
  /// The filter factory has no constructor for the requested name.
  #[error("no filter registered under `{0}`")]
  UnknownFilter(String),
  /// The filter constructor rejected its arguments.
  #[error("failed to construct filter `{filter}`")]
  FilterConstruction {
    /// Filter name as declared in the bundle.
    filter: String,
    /// Underlying constructor failure.
    source: anyhow::Error,
  },
  /// A filter failed while transforming an asset.
  #[error("filter `{filter}` failed on `{path}`")]
  FilterFailed {
    /// Filter name as declared in the bundle.
    filter: String,
    /// Source path (or merged artifact name) being filtered.
    path: String,
    /// Underlying filter failure.
    source: anyhow::Error,
  },
  /// The asset source could not provide the content of a file reference.
  #[error("failed to read asset source `{path}`")]
  SourceUnreadable {
    /// File reference that could not be read.
    path: String,
    /// Underlying read failure.
    source: anyhow::Error,
  },
  /// The content store rejected the compiled content.
  #[error("failed to publish `{filename}`")]
  Publish {
    /// Filename hint handed to the store.
    filename: String,
    /// Underlying store failure.
    source: anyhow::Error,
  },
  /// The configured bundle does not have the expected shape.
  #[error("bundle `{bundle}` has an invalid declaration")]
  InvalidDeclaration {
    /// Bundle whose declaration failed to deserialize.
    bundle: String,
    /// Deserialization failure.
    source: serde_yaml::Error,
  },
  /// A configuration document could not be loaded.
  #[error("failed to load configuration from {}", .path.display())]
  Configuration {
    /// Path of the configuration document.
    path: PathBuf,
    /// Underlying read or parse failure.
    source: anyhow::Error,
  },
}
