use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use asset_bundler::config::ASSETS_CONFIGURATION_TYPE;
use asset_bundler::{
  AssetContext, AssetService, BundleOverrides, FileSystemSource, FileSystemStore, FilterRegistry,
  NoContext, RequiredJsAccumulator, ServiceSettings, YamlConfiguration,
};

/// Compile asset bundles declared in an `Assets` YAML file and print their public URIs.
#[derive(Debug, Parser)]
#[command(name = "asset-bundler", version, about)]
struct Cli {
  /// Project directory holding `assets.config.json` and the assets file.
  #[arg(long, default_value = ".")]
  project: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
  /// Compile one bundle declared under `Bundles.<NAMESPACE>`.
  Compile {
    /// Namespace, e.g. `Css` or `Js`.
    namespace: String,
    /// Bundle name.
    bundle: String,
    /// Force a single merged artifact.
    #[arg(long)]
    merge: bool,
  },
  /// Compile the listed script bundles as one required-scripts bundle.
  Required {
    /// Script bundles, in dependency order.
    #[arg(required = true)]
    assets: Vec<String>,
    /// Bundle the scripts accumulate into (defaults to the configured required bundle).
    #[arg(long)]
    bundle: Option<String>,
  },
  /// List the filters bundles can declare.
  Filters,
}

fn main() -> Result<()> {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,asset_bundler=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();

  let cli = Cli::parse();
  let settings = ServiceSettings::discover(&cli.project);
  tracing::info!(project = %cli.project.display(), ?settings, "loaded settings");

  let configuration =
    YamlConfiguration::load(ASSETS_CONFIGURATION_TYPE, &settings.assets_file_path(&cli.project))?;
  let filters = FilterRegistry::with_builtins();
  let sources = FileSystemSource::new(
    settings.resource_root_path(&cli.project),
    settings.base_dir_path(&cli.project),
  );
  let store = FileSystemStore::new(
    settings.store_root_path(&cli.project),
    settings.public_base_uri.clone(),
  );

  let service = AssetService::new(AssetContext {
    configuration: &configuration,
    filters: &filters,
    sources: &sources,
    store: &store,
    context: &NoContext,
    max_dependency_depth: settings.max_dependency_depth,
  });

  let lines = match cli.command {
    Command::Compile {
      namespace,
      bundle,
      merge,
    } => {
      let overrides = BundleOverrides {
        pre_compile_merge: merge.then_some(true),
        ..BundleOverrides::default()
      };
      service.compile(&bundle, &namespace, overrides)?
    }
    Command::Required { assets, bundle } => {
      let bundle = bundle.unwrap_or_else(|| settings.required_bundle.clone());
      let mut required = RequiredJsAccumulator::new();
      for asset in assets {
        required.register(asset, &bundle);
      }
      service.compile_required_js(&required, &bundle)?
    }
    Command::Filters => filters.names().map(str::to_string).collect(),
  };

  for line in lines {
    println!("{line}");
  }

  Ok(())
}
