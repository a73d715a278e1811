use crate::models::{BundleDeclaration, FilterSpec};

/// Merge resolved dependencies underneath a declaration.
///
/// Dependencies are layered in declaration order, then the declaration itself on top. File
/// lists concatenate (`deps[0] ++ deps[1] ++ ... ++ own`); filters and the merge flag come from
/// the topmost layer that declares them. Dependency and alteration lists are the
/// declaration's own: a resolved dependency has already applied its alterations.
pub fn merge_dependencies(
  dependencies: Vec<BundleDeclaration>,
  declaration: BundleDeclaration,
) -> BundleDeclaration {
  let underlay = dependencies
    .into_iter()
    .fold(BundleDeclaration::default(), layer);
  layer(underlay, declaration)
}

fn layer(base: BundleDeclaration, top: BundleDeclaration) -> BundleDeclaration {
  let mut files = base.files;
  files.extend(top.files);

  BundleDeclaration {
    files,
    filters: layer_filters(base.filters, top.filters),
    dependencies: top.dependencies,
    alterations: top.alterations,
    pre_compile_merge: top.pre_compile_merge.or(base.pre_compile_merge),
  }
}

// A filter declared on both layers keeps its position and takes the top layer's arguments.
fn layer_filters(mut base: Vec<FilterSpec>, top: Vec<FilterSpec>) -> Vec<FilterSpec> {
  for filter in top {
    match base.iter_mut().find(|existing| existing.name == filter.name) {
      Some(existing) => existing.arguments = filter.arguments,
      None => base.push(filter),
    }
  }
  base
}
