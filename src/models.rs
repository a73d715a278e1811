//! Data structures describing bundle declarations and compiled output.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

/// A bundle as declared in the `Assets` configuration.
///
/// Keys follow the configuration schema (`Files`, `Filters`, `Dependencies`, `Alterations`,
/// `PreCompileMerge`); every key is optional and `null` reads as empty.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BundleDeclaration {
  /// Ordered file references making up the bundle.
  #[serde(deserialize_with = "null_as_default")]
  pub files: Vec<String>,
  /// Filters to run over the files, in declaration order.
  #[serde(deserialize_with = "deserialize_filters")]
  pub filters: Vec<FilterSpec>,
  /// Bundles whose files are merged underneath this one, in declaration order.
  #[serde(deserialize_with = "null_as_default")]
  pub dependencies: Vec<String>,
  /// Positional edits to the file list, in declaration order.
  #[serde(deserialize_with = "deserialize_alterations")]
  pub alterations: Vec<Alteration>,
  /// Whether to merge all files into a single artifact before filtering.
  pub pre_compile_merge: Option<bool>,
}

impl BundleDeclaration {
  /// Effective merge mode; an absent flag means one artifact per file.
  pub fn merges_before_compile(&self) -> bool {
    self.pre_compile_merge.unwrap_or(false)
  }
}

/// Named filter with the positional arguments handed to its constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
  /// Name the filter factory knows the filter by.
  pub name: String,
  /// Positional constructor arguments, exactly as declared.
  pub arguments: Vec<Value>,
}

impl FilterSpec {
  /// Pair a filter name with its declared arguments.
  pub fn new(name: impl Into<String>, arguments: Vec<Value>) -> Self {
    Self {
      name: name.into(),
      arguments,
    }
  }
}

/// Edits keyed by an existing entry of the bundle's file list.
#[derive(Debug, Clone, PartialEq)]
pub struct Alteration {
  /// File reference locating the edit position.
  pub target: String,
  /// Edits applied in order, each locating `target` afresh.
  pub edits: Vec<AlterationEdit>,
}

/// A single positional edit.
#[derive(Debug, Clone, PartialEq)]
pub struct AlterationEdit {
  /// Kind of edit.
  pub kind: AlterationKind,
  /// Files inserted by the edit.
  pub files: Vec<String>,
}

/// Supported alteration operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterationKind {
  /// Insert after the target.
  After,
  /// Insert before the target.
  Before,
  /// Replace the target (`Replace` and `Instead` are synonyms).
  Replace,
  /// Operation name this version does not know; applying it has no effect.
  Unknown(String),
}

impl From<&str> for AlterationKind {
  fn from(value: &str) -> Self {
    match value {
      "After" => Self::After,
      "Before" => Self::Before,
      "Replace" | "Instead" => Self::Replace,
      other => Self::Unknown(other.to_string()),
    }
  }
}

/// Caller supplied values that replace the corresponding declaration fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BundleOverrides {
  /// Replacement file list.
  pub files: Option<Vec<String>>,
  /// Replacement filter list.
  pub filters: Option<Vec<FilterSpec>>,
  /// Replacement dependency list.
  pub dependencies: Option<Vec<String>>,
  /// Replacement alterations.
  pub alterations: Option<Vec<Alteration>>,
  /// Replacement merge flag.
  pub pre_compile_merge: Option<bool>,
}

impl BundleOverrides {
  /// Overrides that only replace the dependency list.
  pub fn with_dependencies(dependencies: Vec<String>) -> Self {
    Self {
      dependencies: Some(dependencies),
      ..Self::default()
    }
  }

  /// Shallow-merge the overrides onto a declaration; present fields win.
  pub fn apply(self, declaration: BundleDeclaration) -> BundleDeclaration {
    BundleDeclaration {
      files: self.files.unwrap_or(declaration.files),
      filters: self.filters.unwrap_or(declaration.filters),
      dependencies: self.dependencies.unwrap_or(declaration.dependencies),
      alterations: self.alterations.unwrap_or(declaration.alterations),
      pre_compile_merge: self.pre_compile_merge.or(declaration.pre_compile_merge),
    }
  }
}

/// Compiled bytes waiting to be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
  /// Filename hint passed to the content store.
  pub filename: String,
  /// Filtered content.
  pub content: Vec<u8>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de> + Default,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_filters<'de, D>(deserializer: D) -> Result<Vec<FilterSpec>, D::Error>
where
  D: Deserializer<'de>,
{
  let Some(mapping) = Option::<Mapping>::deserialize(deserializer)? else {
    return Ok(Vec::new());
  };

  mapping
    .into_iter()
    .map(|(name, arguments)| {
      let name = name
        .as_str()
        .ok_or_else(|| <D::Error as de::Error>::custom("filter names must be strings"))?;
      Ok(FilterSpec::new(name, positional_values(arguments)))
    })
    .collect()
}

fn deserialize_alterations<'de, D>(deserializer: D) -> Result<Vec<Alteration>, D::Error>
where
  D: Deserializer<'de>,
{
  let Some(mapping) = Option::<Mapping>::deserialize(deserializer)? else {
    return Ok(Vec::new());
  };

  mapping
    .into_iter()
    .map(|(target, spec)| {
      let target = target
        .as_str()
        .ok_or_else(|| <D::Error as de::Error>::custom("alteration targets must be strings"))?;
      Ok(Alteration {
        target: target.to_string(),
        edits: alteration_edits::<D::Error>(spec)?,
      })
    })
    .collect()
}

// A non-mapping alteration value carries no edits.
fn alteration_edits<E: de::Error>(spec: Value) -> Result<Vec<AlterationEdit>, E> {
  let Value::Mapping(edits) = spec else {
    return Ok(Vec::new());
  };

  edits
    .into_iter()
    .map(|(kind, files)| {
      let kind = kind
        .as_str()
        .ok_or_else(|| E::custom("alteration operations must be strings"))?;
      let files = positional_values(files)
        .into_iter()
        .map(|file| match file {
          Value::String(file) => Ok(file),
          other => Err(E::custom(format!(
            "alteration files must be strings, found {other:?}"
          ))),
        })
        .collect::<Result<Vec<_>, E>>()?;

      Ok(AlterationEdit {
        kind: AlterationKind::from(kind),
        files,
      })
    })
    .collect()
}

/// Interpret a declared value as a positional list: `null` is empty, a scalar is one entry.
fn positional_values(value: Value) -> Vec<Value> {
  match value {
    Value::Null => Vec::new(),
    Value::Sequence(values) => values,
    other => vec![other],
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn declaration(yaml: &str) -> BundleDeclaration {
    serde_yaml::from_str(yaml).unwrap()
  }

  #[test]
  fn reads_every_schema_key_in_order() {
    let bundle = declaration(
      r#"
Files: [a.css, b.css]
Filters:
  Less: ~
  RegexReplace: ["\\s+", " "]
  Banner: "/* site */"
Dependencies: [Base]
Alterations:
  a.css:
    After: [c.css]
    Before: d.css
PreCompileMerge: true
"#,
    );

    assert_eq!(bundle.files, vec!["a.css", "b.css"]);
    let names: Vec<&str> = bundle.filters.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Less", "RegexReplace", "Banner"]);
    assert!(bundle.filters[0].arguments.is_empty());
    assert_eq!(bundle.filters[1].arguments.len(), 2);
    assert_eq!(bundle.filters[2].arguments.len(), 1);
    assert_eq!(bundle.dependencies, vec!["Base"]);
    assert_eq!(bundle.alterations[0].target, "a.css");
    assert_eq!(bundle.alterations[0].edits, vec![
      AlterationEdit {
        kind: AlterationKind::After,
        files: vec!["c.css".into()],
      },
      AlterationEdit {
        kind: AlterationKind::Before,
        files: vec!["d.css".into()],
      },
    ]);
    assert!(bundle.merges_before_compile());
  }

  #[test]
  fn null_and_missing_keys_read_as_empty() {
    let bundle = declaration("Files: ~\nFilters: ~\n");
    assert_eq!(bundle, BundleDeclaration::default());
    assert!(!bundle.merges_before_compile());
  }

  #[test]
  fn keeps_unknown_operations_and_ignores_non_mapping_specs() {
    let bundle = declaration(
      r#"
Files: [a.js]
Alterations:
  a.js:
    Instead: [b.js]
    Around: [c.js]
  b.js: just-a-string
"#,
    );

    assert_eq!(bundle.alterations[0].edits[0].kind, AlterationKind::Replace);
    assert_eq!(
      bundle.alterations[0].edits[1].kind,
      AlterationKind::Unknown("Around".into())
    );
    assert!(bundle.alterations[1].edits.is_empty());
  }

  #[test]
  fn rejects_non_string_filter_names_and_targets() {
    assert!(serde_yaml::from_str::<BundleDeclaration>("Filters:\n  1: ~\n").is_err());
    assert!(serde_yaml::from_str::<BundleDeclaration>("Alterations:\n  1: {After: b.js}\n").is_err());
  }

  #[test]
  fn rejects_non_string_alteration_files() {
    let result = serde_yaml::from_str::<BundleDeclaration>("Alterations:\n  a.js:\n    After: [{x: 1}]\n");
    assert!(result.is_err());
  }

  #[test]
  fn overrides_replace_only_present_fields() {
    let base = declaration("Files: [a.js]\nDependencies: [Base]\nPreCompileMerge: true\n");
    let merged = BundleOverrides::with_dependencies(vec!["Other".into()]).apply(base);

    assert_eq!(merged.files, vec!["a.js"]);
    assert_eq!(merged.dependencies, vec!["Other"]);
    assert_eq!(merged.pre_compile_merge, Some(true));
  }
}
