#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod compiler;
pub mod config;
pub mod error;
pub mod filters;
pub mod models;
pub mod publisher;
pub mod resolver;
pub mod service;
#[cfg(test)]
mod testing;

pub use compiler::{AssetSource, Compiler, FileSystemSource};
pub use config::{ConfigurationSource, ServiceSettings, YamlConfiguration};
pub use error::{AssetError, Result};
pub use filters::{Filter, FilterArguments, FilterChain, FilterFactory, FilterRegistry};
pub use models::{BundleDeclaration, BundleOverrides, CompiledArtifact};
pub use publisher::{ContentStore, FileSystemStore, Publisher, ResourceHandle};
pub use resolver::{BundleResolver, ContextResolver, NoContext, StaticContext};
pub use service::{AssetContext, AssetService, RequiredJsAccumulator};
