//! Bundle resolution: loading declarations, merging dependencies and applying alterations.
//!
//! The steps are split into focused submodules so each transformation stays a pure function
//! over owned values; [`BundleResolver`] only sequences them and drives the recursion.

mod alterations;
mod merge;
mod references;

pub use alterations::apply_alterations;
pub use merge::merge_dependencies;
pub use references::{
  ContextResolver, NoContext, RESOURCE_SCHEME, StaticContext, resolve_file_references,
};

use crate::config::{ASSETS_CONFIGURATION_TYPE, ConfigurationSource};
use crate::error::{AssetError, Result};
use crate::models::{BundleDeclaration, BundleOverrides};

/// Resolves bundle declarations from the `Assets` configuration.
pub struct BundleResolver<'a> {
  configuration: &'a dyn ConfigurationSource,
  context: &'a dyn ContextResolver,
  max_depth: usize,
}

impl<'a> BundleResolver<'a> {
  /// Create a resolver that aborts dependency chains nested deeper than `max_depth`.
  pub fn new(
    configuration: &'a dyn ConfigurationSource,
    context: &'a dyn ContextResolver,
    max_depth: usize,
  ) -> Self {
    Self {
      configuration,
      context,
      max_depth,
    }
  }

  /// Resolve a declared bundle, applying `overrides` before anything else.
  pub fn resolve(
    &self,
    bundle: &str,
    base_path: &str,
    overrides: BundleOverrides,
  ) -> Result<BundleDeclaration> {
    let declaration = self
      .load(bundle, base_path)?
      .ok_or_else(|| AssetError::BundleNotFound {
        bundle: bundle.to_string(),
        path: base_path.to_string(),
      })?;

    self.resolve_declaration(bundle, base_path, overrides.apply(declaration), &mut Vec::new())
  }

  /// Resolve a bundle that may be synthetic: an undeclared name starts from an empty
  /// declaration instead of failing.
  pub fn resolve_or_default(
    &self,
    bundle: &str,
    base_path: &str,
    overrides: BundleOverrides,
  ) -> Result<BundleDeclaration> {
    let declaration = self.load(bundle, base_path)?.unwrap_or_default();
    self.resolve_declaration(bundle, base_path, overrides.apply(declaration), &mut Vec::new())
  }

  fn resolve_declaration(
    &self,
    bundle: &str,
    base_path: &str,
    mut declaration: BundleDeclaration,
    stack: &mut Vec<String>,
  ) -> Result<BundleDeclaration> {
    if stack.iter().any(|entry| entry == bundle) || stack.len() >= self.max_depth {
      let mut chain = stack.clone();
      chain.push(bundle.to_string());
      return Err(AssetError::CyclicDependency { chain });
    }
    stack.push(bundle.to_string());
    tracing::debug!(bundle, base_path, depth = stack.len(), "resolving bundle");

    declaration.files = resolve_file_references(bundle, declaration.files, self.context);

    let mut resolved_dependencies = Vec::with_capacity(declaration.dependencies.len());
    for dependency in &declaration.dependencies {
      let dependency_declaration = self
        .load(dependency, base_path)?
        .ok_or_else(|| AssetError::BundleNotFound {
          bundle: dependency.clone(),
          path: base_path.to_string(),
        })?;
      resolved_dependencies.push(self.resolve_declaration(
        dependency,
        base_path,
        dependency_declaration,
        stack,
      )?);
    }

    let mut merged = merge_dependencies(resolved_dependencies, declaration);
    let alterations = std::mem::take(&mut merged.alterations);
    merged.files = apply_alterations(bundle, merged.files, &alterations)?;

    stack.pop();
    Ok(merged)
  }

  fn load(&self, bundle: &str, base_path: &str) -> Result<Option<BundleDeclaration>> {
    let Some(container) = self
      .configuration
      .configuration(ASSETS_CONFIGURATION_TYPE, base_path)
    else {
      return Ok(None);
    };
    let Some(raw) = container.get(bundle) else {
      return Ok(None);
    };
    if raw.is_null() {
      return Ok(Some(BundleDeclaration::default()));
    }

    serde_yaml::from_value(raw.clone())
      .map(Some)
      .map_err(|source| AssetError::InvalidDeclaration {
        bundle: bundle.to_string(),
        source,
      })
  }
}
