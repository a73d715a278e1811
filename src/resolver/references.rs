use std::collections::BTreeMap;

/// Scheme marking a file reference as a literal storage path.
pub const RESOURCE_SCHEME: &str = "resource://";

const CONTEXT_PATH_PREFIX: &str = "current.securityContext.";

/// Capability for evaluating symbolic file references against the caller's context.
pub trait ContextResolver {
  /// Evaluate a dotted attribute path, returning `None` when it does not resolve.
  fn resolve(&self, path: &str) -> Option<String>;
}

/// Context with no attributes; every symbolic reference is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContext;

impl ContextResolver for NoContext {
  fn resolve(&self, _path: &str) -> Option<String> {
    None
  }
}

/// Context backed by a fixed map of attribute paths to resource identifiers.
#[derive(Debug, Clone, Default)]
pub struct StaticContext {
  values: BTreeMap<String, String>,
}

impl StaticContext {
  /// Create an empty context.
  pub fn new() -> Self {
    Self::default()
  }

  /// Add an attribute, returning the context for chaining.
  pub fn with(mut self, path: impl Into<String>, value: impl Into<String>) -> Self {
    self.values.insert(path.into(), value.into());
    self
  }
}

impl ContextResolver for StaticContext {
  fn resolve(&self, path: &str) -> Option<String> {
    self.values.get(path).cloned()
  }
}

/// Rewrite symbolic references to storage paths, dropping the ones the context cannot resolve.
///
/// Literal `resource://` paths pass through untouched. A leading `current.securityContext.`
/// segment is stripped before the lookup.
pub fn resolve_file_references(
  bundle: &str,
  files: Vec<String>,
  context: &dyn ContextResolver,
) -> Vec<String> {
  files
    .into_iter()
    .filter_map(|file| {
      if file.starts_with(RESOURCE_SCHEME) {
        return Some(file);
      }

      let path = file.strip_prefix(CONTEXT_PATH_PREFIX).unwrap_or(&file);
      match context.resolve(path) {
        Some(resource) => Some(format!("{RESOURCE_SCHEME}{resource}")),
        None => {
          tracing::warn!(bundle, reference = %file, "dropping unresolved file reference");
          None
        }
      }
    })
    .collect()
}
