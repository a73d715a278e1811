//! The asset service: public entry points tying resolution, filtering, compilation and
//! publishing together.

use std::collections::BTreeMap;

use serde_yaml::Value;

use crate::compiler::{AssetSource, Compiler};
use crate::config::{ASSETS_CONFIGURATION_TYPE, ConfigurationSource};
use crate::error::Result;
use crate::filters::{FilterFactory, build_filter_chain};
use crate::models::{BundleDeclaration, BundleOverrides};
use crate::publisher::{ContentStore, Publisher};
use crate::resolver::{BundleResolver, ContextResolver};

/// Namespace holding stylesheet bundles.
pub const CSS_NAMESPACE: &str = "Css";
/// Namespace holding script bundles.
pub const JS_NAMESPACE: &str = "Js";
/// Bundle that required scripts are accumulated into by default.
pub const DEFAULT_REQUIRED_BUNDLE: &str = "Required";

/// Collaborators the service delegates to.
#[derive(Clone, Copy)]
pub struct AssetContext<'a> {
  /// Store holding the `Assets` configuration.
  pub configuration: &'a dyn ConfigurationSource,
  /// Factory instantiating declared filters.
  pub filters: &'a dyn FilterFactory,
  /// Reader for file references.
  pub sources: &'a dyn AssetSource,
  /// Store receiving compiled content.
  pub store: &'a dyn ContentStore,
  /// Resolver for symbolic file references.
  pub context: &'a dyn ContextResolver,
  /// Maximum nesting of bundle dependencies.
  pub max_dependency_depth: usize,
}

/// Compiles configured bundles and returns the public URIs of the results.
pub struct AssetService<'a> {
  context: AssetContext<'a>,
}

impl<'a> AssetService<'a> {
  /// Create a service over the provided collaborators.
  pub fn new(context: AssetContext<'a>) -> Self {
    Self { context }
  }

  /// Raw configuration found at `path` in the `Assets` configuration.
  pub fn asset_configuration(&self, path: &str) -> Option<Value> {
    self
      .context
      .configuration
      .configuration(ASSETS_CONFIGURATION_TYPE, path)
  }

  /// Resolve, filter, compile and publish the bundle `name` declared under
  /// `Bundles.<namespace>`, returning URIs in artifact order.
  pub fn compile(
    &self,
    name: &str,
    namespace: &str,
    overrides: BundleOverrides,
  ) -> Result<Vec<String>> {
    let bundle = self
      .resolver()
      .resolve(name, &bundle_path(namespace), overrides)?;
    self.compile_resolved(name, namespace, &bundle)
  }

  /// URIs of a stylesheet bundle.
  pub fn css_bundle_uris(&self, name: &str) -> Result<Vec<String>> {
    self.compile(name, CSS_NAMESPACE, BundleOverrides::default())
  }

  /// URIs of a script bundle.
  pub fn js_bundle_uris(&self, name: &str) -> Result<Vec<String>> {
    self.compile(name, JS_NAMESPACE, BundleOverrides::default())
  }

  /// Compile the scripts registered for `bundle_name` so far.
  ///
  /// The registered names become the dependency list of a script bundle named `bundle_name`;
  /// a bundle of that name need not be declared. The accumulator is left untouched.
  pub fn compile_required_js(
    &self,
    accumulator: &RequiredJsAccumulator,
    bundle_name: &str,
  ) -> Result<Vec<String>> {
    let overrides = match accumulator.dependencies(bundle_name) {
      [] => BundleOverrides::default(),
      dependencies => BundleOverrides::with_dependencies(dependencies.to_vec()),
    };

    let bundle =
      self
        .resolver()
        .resolve_or_default(bundle_name, &bundle_path(JS_NAMESPACE), overrides)?;
    self.compile_resolved(bundle_name, JS_NAMESPACE, &bundle)
  }

  fn compile_resolved(
    &self,
    name: &str,
    namespace: &str,
    bundle: &BundleDeclaration,
  ) -> Result<Vec<String>> {
    let filters = build_filter_chain(self.context.filters, &bundle.filters)?;
    let artifacts = Compiler::new(self.context.sources).compile(name, namespace, bundle, &filters)?;
    tracing::debug!(
      bundle = name,
      namespace,
      files = bundle.files.len(),
      artifacts = artifacts.len(),
      "compiled bundle"
    );

    let publisher = Publisher::new(self.context.store);
    artifacts
      .iter()
      .map(|artifact| publisher.publish_artifact(artifact))
      .collect()
  }

  fn resolver(&self) -> BundleResolver<'a> {
    BundleResolver::new(
      self.context.configuration,
      self.context.context,
      self.context.max_dependency_depth,
    )
  }
}

fn bundle_path(namespace: &str) -> String {
  format!("Bundles.{namespace}")
}

/// Script bundles registered for later compilation, keyed by the bundle they accumulate into.
///
/// The accumulator belongs to whoever renders the page (typically one per request) and is
/// passed to [`AssetService::compile_required_js`] by reference. Callers sharing one across
/// threads must wrap it in a lock.
#[derive(Debug, Clone, Default)]
pub struct RequiredJsAccumulator {
  bundles: BTreeMap<String, Vec<String>>,
}

impl RequiredJsAccumulator {
  /// Create an empty accumulator.
  pub fn new() -> Self {
    Self::default()
  }

  /// Append `asset_name` to the dependencies of `bundle_name`; order of registration is
  /// the dependency order at compile time.
  pub fn register(&mut self, asset_name: impl Into<String>, bundle_name: &str) {
    self
      .bundles
      .entry(bundle_name.to_string())
      .or_default()
      .push(asset_name.into());
  }

  /// Append `asset_name` to the default [`DEFAULT_REQUIRED_BUNDLE`].
  pub fn register_default(&mut self, asset_name: impl Into<String>) {
    self.register(asset_name, DEFAULT_REQUIRED_BUNDLE);
  }

  /// Names registered for `bundle_name`, in registration order.
  pub fn dependencies(&self, bundle_name: &str) -> &[String] {
    self
      .bundles
      .get(bundle_name)
      .map(Vec::as_slice)
      .unwrap_or_default()
  }

  /// Forget everything registered so far.
  pub fn reset(&mut self) {
    self.bundles.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::YamlConfiguration;
  use crate::error::AssetError;
  use crate::resolver::NoContext;
  use crate::testing::{MemorySource, MemoryStore, RecordingFactory, RejectingStore};

  const ASSETS: &str = r#"
Bundles:
  Css:
    Site:
      Files: ["resource://a.css", "resource://b.css"]
      Filters:
        Compile: ~
        Minify: ["aggressive"]
    Merged:
      Files: ["resource://a.css", "resource://b.css"]
      PreCompileMerge: true
  Js:
    Jquery:
      Files: ["resource://jquery.js"]
    Widgets:
      Files: ["resource://widgets.js"]
      Dependencies: [Jquery]
"#;

  struct Fixture {
    configuration: YamlConfiguration,
    factory: RecordingFactory,
    source: MemorySource,
    store: MemoryStore,
  }

  impl Fixture {
    fn new() -> Self {
      Self {
        configuration: YamlConfiguration::from_yaml_str(ASSETS_CONFIGURATION_TYPE, ASSETS).unwrap(),
        factory: RecordingFactory::default(),
        source: MemorySource::default()
          .with("resource://a.css", "a{}")
          .with("resource://b.css", "b{}")
          .with("resource://jquery.js", "$")
          .with("resource://widgets.js", "w"),
        store: MemoryStore::default(),
      }
    }

    fn service(&self) -> AssetService<'_> {
      self.service_with_store(&self.store)
    }

    fn service_with_store<'a>(&'a self, store: &'a dyn ContentStore) -> AssetService<'a> {
      AssetService::new(AssetContext {
        configuration: &self.configuration,
        filters: &self.factory,
        sources: &self.source,
        store,
        context: &NoContext,
        max_dependency_depth: 32,
      })
    }
  }

  #[test]
  fn compiles_each_file_through_the_filter_chain() {
    let fixture = Fixture::new();
    let uris = fixture.service().css_bundle_uris("Site").unwrap();

    assert_eq!(uris.len(), 2);
    assert_eq!(fixture.store.content(&uris[0]).unwrap(), "a{}|Compile|Minify");
    assert_eq!(fixture.store.content(&uris[1]).unwrap(), "b{}|Compile|Minify");
    assert!(uris[0].ends_with("/resource://a.css"));

    let calls = fixture.factory.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].1.str(0), Some("aggressive"));
  }

  #[test]
  fn merged_bundles_publish_one_artifact() {
    let fixture = Fixture::new();
    let uris = fixture.service().css_bundle_uris("Merged").unwrap();

    assert_eq!(uris, vec!["memory://0/Merged.css".to_string()]);
    assert_eq!(fixture.store.content(&uris[0]).unwrap(), "a{}\nb{}");
  }

  #[test]
  fn script_bundles_include_dependencies_first() {
    let fixture = Fixture::new();
    let uris = fixture.service().js_bundle_uris("Widgets").unwrap();

    let contents: Vec<String> = uris
      .iter()
      .map(|uri| fixture.store.content(uri).unwrap())
      .collect();
    assert_eq!(contents, vec!["$", "w"]);
  }

  #[test]
  fn overrides_reach_the_resolver() {
    let fixture = Fixture::new();
    let overrides = BundleOverrides {
      pre_compile_merge: Some(true),
      ..BundleOverrides::default()
    };

    let uris = fixture.service().compile("Widgets", JS_NAMESPACE, overrides).unwrap();
    assert_eq!(uris, vec!["memory://0/Widgets.js".to_string()]);
    assert_eq!(fixture.store.content(&uris[0]).unwrap(), "$\nw");
  }

  #[test]
  fn unknown_bundles_fail() {
    let fixture = Fixture::new();
    let err = fixture.service().css_bundle_uris("Nope").unwrap_err();
    assert!(matches!(err, AssetError::BundleNotFound { ref path, .. } if path == "Bundles.Css"));
  }

  #[test]
  fn publish_failures_propagate() {
    let fixture = Fixture::new();
    let err = fixture
      .service_with_store(&RejectingStore)
      .css_bundle_uris("Merged")
      .unwrap_err();
    assert!(matches!(err, AssetError::Publish { .. }));
  }

  #[test]
  fn required_scripts_compile_in_registration_order() {
    let fixture = Fixture::new();
    let mut required = RequiredJsAccumulator::new();
    required.register_default("Widgets");
    required.register_default("Jquery");

    assert_eq!(required.dependencies(DEFAULT_REQUIRED_BUNDLE), ["Widgets", "Jquery"]);

    let uris = fixture
      .service()
      .compile_required_js(&required, DEFAULT_REQUIRED_BUNDLE)
      .unwrap();
    let contents: Vec<String> = uris
      .iter()
      .map(|uri| fixture.store.content(uri).unwrap())
      .collect();
    assert_eq!(contents, vec!["$", "w", "$"]);
  }

  #[test]
  fn compiling_required_scripts_keeps_the_accumulator() {
    let fixture = Fixture::new();
    let service = fixture.service();
    let mut required = RequiredJsAccumulator::new();
    required.register("Jquery", "Footer");

    assert_eq!(service.compile_required_js(&required, "Footer").unwrap().len(), 1);
    required.register("Widgets", "Footer");
    assert_eq!(service.compile_required_js(&required, "Footer").unwrap().len(), 3);
    assert!(required.dependencies(DEFAULT_REQUIRED_BUNDLE).is_empty());
  }

  #[test]
  fn empty_required_bundle_compiles_to_nothing() {
    let fixture = Fixture::new();
    let uris = fixture
      .service()
      .compile_required_js(&RequiredJsAccumulator::new(), DEFAULT_REQUIRED_BUNDLE)
      .unwrap();
    assert!(uris.is_empty());
  }

  #[test]
  fn reset_clears_registrations() {
    let mut required = RequiredJsAccumulator::new();
    required.register_default("Jquery");
    required.reset();
    assert!(required.dependencies(DEFAULT_REQUIRED_BUNDLE).is_empty());
  }

  #[test]
  fn exposes_raw_configuration() {
    let fixture = Fixture::new();
    let js = fixture.service().asset_configuration("Bundles.Js").unwrap();
    assert!(js.get("Jquery").is_some());
  }
}
