//! Filter construction and the filter chain applied to asset content.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::{Context, anyhow};
use regex::Regex;
use serde_yaml::Value;

use crate::error::{AssetError, Result};
use crate::models::FilterSpec;

/// Largest number of positional arguments a filter constructor accepts.
pub const MAX_FILTER_ARGUMENTS: usize = 6;

/// Pure text transform applied to an asset before it is published.
pub trait Filter {
  /// Transform `content`, read from `source_path` (or the merged artifact name).
  fn apply(&self, source_path: &str, content: String) -> anyhow::Result<String>;
}

/// Positional constructor arguments, bounded at [`MAX_FILTER_ARGUMENTS`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterArguments(Vec<Value>);

impl FilterArguments {
  /// Wrap the declared arguments of `filter`, rejecting lists longer than the bound.
  pub fn new(filter: &str, values: Vec<Value>) -> Result<Self> {
    if values.len() > MAX_FILTER_ARGUMENTS {
      return Err(AssetError::TooManyFilterArguments {
        filter: filter.to_string(),
        count: values.len(),
      });
    }
    Ok(Self(values))
  }

  /// Number of positional arguments.
  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// Whether no arguments were declared.
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Argument at `index`.
  pub fn get(&self, index: usize) -> Option<&Value> {
    self.0.get(index)
  }

  /// Argument at `index` as a string.
  pub fn str(&self, index: usize) -> Option<&str> {
    self.get(index).and_then(Value::as_str)
  }
}

/// Object-construction capability instantiating filters by name.
pub trait FilterFactory {
  /// Construct the filter registered as `name` with exactly `arguments`.
  fn construct(&self, name: &str, arguments: FilterArguments) -> Result<Box<dyn Filter>>;
}

type Constructor = Box<dyn Fn(&FilterArguments) -> anyhow::Result<Box<dyn Filter>> + Send + Sync>;

/// Filter factory backed by named constructor closures.
#[derive(Default)]
pub struct FilterRegistry {
  constructors: BTreeMap<String, Constructor>,
}

impl FilterRegistry {
  /// Create an empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// Registry preloaded with the `RegexReplace` and `Banner` filters.
  pub fn with_builtins() -> Self {
    let mut registry = Self::new();
    registry
      .register("RegexReplace", |arguments| {
        Ok(Box::new(RegexReplaceFilter::from_arguments(arguments)?))
      })
      .register("Banner", |arguments| {
        Ok(Box::new(BannerFilter::from_arguments(arguments)?))
      });
    registry
  }

  /// Register a constructor under `name`, replacing any previous one.
  pub fn register<F>(&mut self, name: impl Into<String>, constructor: F) -> &mut Self
  where
    F: Fn(&FilterArguments) -> anyhow::Result<Box<dyn Filter>> + Send + Sync + 'static,
  {
    self.constructors.insert(name.into(), Box::new(constructor));
    self
  }

  /// Names of all registered filters.
  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.constructors.keys().map(String::as_str)
  }
}

impl FilterFactory for FilterRegistry {
  fn construct(&self, name: &str, arguments: FilterArguments) -> Result<Box<dyn Filter>> {
    let constructor = self
      .constructors
      .get(name)
      .ok_or_else(|| AssetError::UnknownFilter(name.to_string()))?;

    constructor(&arguments).map_err(|source| AssetError::FilterConstruction {
      filter: name.to_string(),
      source,
    })
  }
}

/// Ordered filters built for one compilation call.
#[derive(Default)]
pub struct FilterChain {
  filters: Vec<(String, Box<dyn Filter>)>,
}

impl FilterChain {
  /// Number of filters in the chain.
  pub fn len(&self) -> usize {
    self.filters.len()
  }

  /// Whether the chain leaves content untouched.
  pub fn is_empty(&self) -> bool {
    self.filters.is_empty()
  }

  /// Filter names in application order.
  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.filters.iter().map(|(name, _)| name.as_str())
  }

  /// Run every filter over `content` in order.
  pub fn apply(&self, source_path: &str, content: String) -> Result<String> {
    self
      .filters
      .iter()
      .try_fold(content, |content, (name, filter)| {
        filter
          .apply(source_path, content)
          .map_err(|source| AssetError::FilterFailed {
            filter: name.clone(),
            path: source_path.to_string(),
            source,
          })
      })
  }
}

impl fmt::Debug for FilterChain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list().entries(self.names()).finish()
  }
}

/// Instantiate the declared filters in declaration order.
///
/// The argument count is checked before the factory is consulted, so an over-long argument
/// list never reaches a constructor.
pub fn build_filter_chain(factory: &dyn FilterFactory, specs: &[FilterSpec]) -> Result<FilterChain> {
  let mut filters = Vec::with_capacity(specs.len());
  for spec in specs {
    let arguments = FilterArguments::new(&spec.name, spec.arguments.clone())?;
    tracing::debug!(filter = %spec.name, arguments = arguments.len(), "constructing filter");
    filters.push((spec.name.clone(), factory.construct(&spec.name, arguments)?));
  }
  Ok(FilterChain { filters })
}

/// Regex substitution over the whole content: `RegexReplace(pattern, replacement)`.
#[derive(Debug, Clone)]
pub struct RegexReplaceFilter {
  pattern: Regex,
  replacement: String,
}

impl RegexReplaceFilter {
  /// Build the filter from its positional arguments.
  pub fn from_arguments(arguments: &FilterArguments) -> anyhow::Result<Self> {
    let pattern = arguments
      .str(0)
      .ok_or_else(|| anyhow!("RegexReplace expects a pattern as its first argument"))?;
    let replacement = arguments.str(1).unwrap_or_default().to_string();
    let pattern =
      Regex::new(pattern).with_context(|| format!("invalid RegexReplace pattern `{pattern}`"))?;
    Ok(Self {
      pattern,
      replacement,
    })
  }
}

impl Filter for RegexReplaceFilter {
  fn apply(&self, _source_path: &str, content: String) -> anyhow::Result<String> {
    Ok(
      self
        .pattern
        .replace_all(&content, self.replacement.as_str())
        .into_owned(),
    )
  }
}

/// Prepends a fixed line: `Banner(text)`.
#[derive(Debug, Clone)]
pub struct BannerFilter {
  banner: String,
}

impl BannerFilter {
  /// Build the filter from its positional arguments.
  pub fn from_arguments(arguments: &FilterArguments) -> anyhow::Result<Self> {
    let banner = arguments
      .str(0)
      .ok_or_else(|| anyhow!("Banner expects the banner text as its first argument"))?;
    Ok(Self {
      banner: banner.to_string(),
    })
  }
}

impl Filter for BannerFilter {
  fn apply(&self, _source_path: &str, content: String) -> anyhow::Result<String> {
    Ok(format!("{}\n{}", self.banner, content))
  }
}
