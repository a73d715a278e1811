//! Turns a resolved bundle into compiled artifacts, merged or one per file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::error::{AssetError, Result};
use crate::filters::FilterChain;
use crate::models::{BundleDeclaration, CompiledArtifact};
use crate::resolver::RESOURCE_SCHEME;

/// Provides the text of a file reference.
pub trait AssetSource {
  /// Read the content behind `path`.
  fn read(&self, path: &str) -> anyhow::Result<String>;
}

/// Reads file references from disk.
///
/// `resource://` references are looked up below the resource root; anything else is a path
/// relative to the base directory (absolute paths are used as-is). Content that is not valid
/// UTF-8, such as a legacy Latin-1 stylesheet, is decoded lossily rather than rejected.
#[derive(Debug, Clone)]
pub struct FileSystemSource {
  resource_root: PathBuf,
  base_dir: PathBuf,
}

impl FileSystemSource {
  /// Create a source with the given resource root and base directory.
  pub fn new(resource_root: impl Into<PathBuf>, base_dir: impl Into<PathBuf>) -> Self {
    Self {
      resource_root: resource_root.into(),
      base_dir: base_dir.into(),
    }
  }

  /// Filesystem location backing a file reference.
  pub fn locate(&self, path: &str) -> PathBuf {
    match path.strip_prefix(RESOURCE_SCHEME) {
      Some(resource) => self.resource_root.join(resource.trim_start_matches('/')),
      None => self.base_dir.join(Path::new(path)),
    }
  }
}

impl AssetSource for FileSystemSource {
  fn read(&self, path: &str) -> anyhow::Result<String> {
    let location = self.locate(path);
    let bytes =
      fs::read(&location).with_context(|| format!("failed to read {}", location.display()))?;
    Ok(match String::from_utf8(bytes) {
      Ok(text) => text,
      Err(err) => {
        tracing::warn!(path, "asset source is not valid UTF-8, decoding lossily");
        String::from_utf8_lossy(err.as_bytes()).into_owned()
      }
    })
  }
}

/// Name of the single artifact produced by a merged bundle.
///
/// Namespace separators (`:`) in the bundle name fold to dots and the namespace becomes the
/// lower-cased extension, so `Site:Main` in `Css` becomes `Site.Main.css`.
pub fn merged_artifact_name(bundle: &str, namespace: &str) -> String {
  format!("{}.{}", bundle.replace(':', "."), namespace.to_lowercase())
}

/// Compiles resolved bundles by reading their sources and running the filter chain.
pub struct Compiler<'a> {
  source: &'a dyn AssetSource,
}

impl<'a> Compiler<'a> {
  /// Create a compiler reading files through `source`.
  pub fn new(source: &'a dyn AssetSource) -> Self {
    Self { source }
  }

  /// Compile a resolved bundle.
  ///
  /// With `PreCompileMerge` the files are joined with newlines and filtered once, producing a
  /// single artifact. Otherwise every file is filtered on its own and named by its path.
  pub fn compile(
    &self,
    bundle_name: &str,
    namespace: &str,
    bundle: &BundleDeclaration,
    filters: &FilterChain,
  ) -> Result<Vec<CompiledArtifact>> {
    if bundle.merges_before_compile() {
      let filename = merged_artifact_name(bundle_name, namespace);
      let merged = bundle
        .files
        .iter()
        .map(|file| self.read(file))
        .collect::<Result<Vec<_>>>()?
        .join("\n");
      let content = filters.apply(&filename, merged)?;
      return Ok(vec![CompiledArtifact {
        filename,
        content: content.into_bytes(),
      }]);
    }

    bundle
      .files
      .iter()
      .map(|file| {
        let content = filters.apply(file, self.read(file)?)?;
        Ok(CompiledArtifact {
          filename: file.clone(),
          content: content.into_bytes(),
        })
      })
      .collect()
  }

  fn read(&self, path: &str) -> Result<String> {
    self
      .source
      .read(path)
      .map_err(|source| AssetError::SourceUnreadable {
        path: path.to_string(),
        source,
      })
  }
}
