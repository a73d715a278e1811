//! Publishing compiled content to a content-addressable store.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use sha2::{Digest, Sha256};

use crate::error::{AssetError, Result};
use crate::models::CompiledArtifact;

/// Handle to content imported into a [`ContentStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
  /// Store-specific identifier of the content.
  pub id: String,
  /// Filename the content is served under.
  pub filename: String,
}

/// Storage collaborator receiving published content.
///
/// Importing identical content with the same filename must yield a handle with the same
/// public URI.
pub trait ContentStore {
  /// Persist `content`, using `filename` as a naming hint.
  fn import(&self, content: &[u8], filename: &str) -> anyhow::Result<ResourceHandle>;

  /// Keep imported content from being collected before it is referenced.
  fn retain(&self, _handle: &ResourceHandle) -> anyhow::Result<()> {
    Ok(())
  }

  /// Public URI under which the content is reachable.
  fn public_uri(&self, handle: &ResourceHandle) -> anyhow::Result<String>;
}

/// Hands compiled content to the store and returns its public URI.
pub struct Publisher<'a> {
  store: &'a dyn ContentStore,
}

impl<'a> Publisher<'a> {
  /// Create a publisher for `store`.
  pub fn new(store: &'a dyn ContentStore) -> Self {
    Self { store }
  }

  /// Publish raw content under a filename hint.
  pub fn publish(&self, content: &[u8], filename_hint: &str) -> Result<String> {
    let publish = || -> anyhow::Result<String> {
      let handle = self.store.import(content, filename_hint)?;
      self.store.retain(&handle)?;
      self.store.public_uri(&handle)
    };

    let uri = publish().map_err(|source| AssetError::Publish {
      filename: filename_hint.to_string(),
      source,
    })?;
    tracing::debug!(filename = filename_hint, %uri, bytes = content.len(), "published asset");
    Ok(uri)
  }

  /// Publish a compiled artifact under its own filename.
  pub fn publish_artifact(&self, artifact: &CompiledArtifact) -> Result<String> {
    self.publish(&artifact.content, &artifact.filename)
  }
}

/// Content store writing to `<root>/<sha256>/<file name>` and serving from a URI prefix.
#[derive(Debug, Clone)]
pub struct FileSystemStore {
  root: PathBuf,
  public_base_uri: String,
}

impl FileSystemStore {
  /// Create a store rooted at `root`, served under `public_base_uri`.
  pub fn new(root: impl Into<PathBuf>, public_base_uri: impl Into<String>) -> Self {
    Self {
      root: root.into(),
      public_base_uri: public_base_uri.into(),
    }
  }

  /// Location of the stored file for a handle.
  pub fn path_for(&self, handle: &ResourceHandle) -> PathBuf {
    self.root.join(&handle.id).join(&handle.filename)
  }
}

impl ContentStore for FileSystemStore {
  fn import(&self, content: &[u8], filename: &str) -> anyhow::Result<ResourceHandle> {
    let handle = ResourceHandle {
      id: content_digest(content),
      filename: storage_filename(filename),
    };

    let destination = self.path_for(&handle);
    if destination.exists() {
      return Ok(handle);
    }

    // The digest path only ever appears complete: write beside it, then rename into place.
    let directory = self.root.join(&handle.id);
    fs::create_dir_all(&directory)
      .with_context(|| format!("failed to create {}", directory.display()))?;
    let staging = directory.join(format!("{}.tmp", handle.filename));
    fs::write(&staging, content)
      .with_context(|| format!("failed to write {}", staging.display()))?;
    fs::rename(&staging, &destination)
      .with_context(|| format!("failed to move {} into place", destination.display()))?;
    Ok(handle)
  }

  fn public_uri(&self, handle: &ResourceHandle) -> anyhow::Result<String> {
    Ok(format!(
      "{}/{}/{}",
      self.public_base_uri.trim_end_matches('/'),
      handle.id,
      handle.filename
    ))
  }
}

fn content_digest(content: &[u8]) -> String {
  Sha256::digest(content)
    .iter()
    .map(|byte| format!("{byte:02x}"))
    .collect()
}

/// Last path segment of a filename hint, so `resource://Site/Public/a.css` stores as `a.css`.
fn storage_filename(hint: &str) -> String {
  let name = hint
    .rsplit(['/', '\\'])
    .find(|segment| !segment.is_empty())
    .unwrap_or_default();
  if name.is_empty() || name == ".." || name == "." {
    "asset".to_string()
  } else {
    name.to_string()
  }
}
