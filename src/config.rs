//! Configuration access: the `Assets` configuration store and the service settings loader.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{AssetError, Result};

/// Configuration type name under which bundle declarations live.
pub const ASSETS_CONFIGURATION_TYPE: &str = "Assets";

const DEFAULT_SETTINGS_FILE: &str = "assets.config.json";

/// Hierarchical configuration store keyed by a type name and a dotted path.
pub trait ConfigurationSource {
  /// Return the structure found at `path` within the document registered for `type_name`.
  ///
  /// An empty path addresses the whole document.
  fn configuration(&self, type_name: &str, path: &str) -> Option<Value>;
}

/// In-memory configuration store backed by one YAML document per configuration type.
#[derive(Debug, Clone, Default)]
pub struct YamlConfiguration {
  documents: BTreeMap<String, Value>,
}

impl YamlConfiguration {
  /// Create an empty store.
  pub fn new() -> Self {
    Self::default()
  }

  /// Register (or replace) the document for a configuration type.
  pub fn insert(&mut self, type_name: impl Into<String>, document: Value) -> &mut Self {
    self.documents.insert(type_name.into(), document);
    self
  }

  /// Build a store holding a single document parsed from YAML text.
  pub fn from_yaml_str(type_name: &str, yaml: &str) -> std::result::Result<Self, serde_yaml::Error> {
    let document = serde_yaml::from_str(yaml)?;
    let mut configuration = Self::new();
    configuration.insert(type_name, document);
    Ok(configuration)
  }

  /// Build a store holding a single document read from a YAML file.
  pub fn load(type_name: &str, path: &Path) -> Result<Self> {
    let content = fs::read_to_string(path)
      .with_context(|| format!("failed to read {}", path.display()))
      .map_err(|source| AssetError::Configuration {
        path: path.to_path_buf(),
        source,
      })?;

    Self::from_yaml_str(type_name, &content).map_err(|err| AssetError::Configuration {
      path: path.to_path_buf(),
      source: err.into(),
    })
  }
}

impl ConfigurationSource for YamlConfiguration {
  fn configuration(&self, type_name: &str, path: &str) -> Option<Value> {
    let mut current = self.documents.get(type_name)?;
    for segment in path.split('.').filter(|segment| !segment.is_empty()) {
      current = current.as_mapping()?.get(segment)?;
    }
    Some(current.clone())
  }
}

/// Discoverable settings describing where configuration, sources and published files live.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
  /// YAML file holding the `Assets` configuration document.
  pub assets_file: String,
  /// Directory that `resource://` references are resolved against.
  pub resource_root: String,
  /// Directory that plain file references are resolved against.
  pub base_dir: String,
  /// Directory receiving published content.
  pub store_root: String,
  /// Public URI prefix under which `store_root` is served.
  pub public_base_uri: String,
  /// Maximum nesting of bundle dependencies before resolution is aborted.
  pub max_dependency_depth: usize,
  /// Bundle that required scripts are accumulated into when no bundle is named.
  pub required_bundle: String,
}

impl Default for ServiceSettings {
  fn default() -> Self {
    Self {
      assets_file: "Assets.yaml".into(),
      resource_root: "resources".into(),
      base_dir: ".".into(),
      store_root: "public/_Resources".into(),
      public_base_uri: "/_Resources".into(),
      max_dependency_depth: 32,
      required_bundle: crate::service::DEFAULT_REQUIRED_BUNDLE.into(),
    }
  }
}

impl ServiceSettings {
  /// Attempt to load settings from the provided project directory.
  ///
  /// A missing or malformed settings file falls back to the defaults.
  pub fn discover(project_dir: &Path) -> Self {
    let candidate = project_dir.join(DEFAULT_SETTINGS_FILE);
    Self::from_path(&candidate).unwrap_or_default()
  }

  /// Read settings from a specific JSON file.
  pub fn from_path(path: &Path) -> Option<Self> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
  }

  /// Path of the assets configuration file.
  pub fn assets_file_path(&self, project_dir: &Path) -> PathBuf {
    project_dir.join(&self.assets_file)
  }

  /// Directory backing `resource://` references.
  pub fn resource_root_path(&self, project_dir: &Path) -> PathBuf {
    project_dir.join(&self.resource_root)
  }

  /// Directory backing plain file references.
  pub fn base_dir_path(&self, project_dir: &Path) -> PathBuf {
    project_dir.join(&self.base_dir)
  }

  /// Directory receiving published content.
  pub fn store_root_path(&self, project_dir: &Path) -> PathBuf {
    project_dir.join(&self.store_root)
  }
}
