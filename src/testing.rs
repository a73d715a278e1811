//! In-memory collaborators shared by the unit tests.

use std::cell::RefCell;
use std::collections::BTreeMap;

use anyhow::anyhow;

use crate::compiler::AssetSource;
use crate::error::Result;
use crate::filters::{Filter, FilterArguments, FilterFactory};
use crate::publisher::{ContentStore, ResourceHandle};

/// Asset source serving fixed contents.
#[derive(Debug, Default)]
pub struct MemorySource {
  files: BTreeMap<String, String>,
}

impl MemorySource {
  pub fn with(mut self, path: &str, content: &str) -> Self {
    self.files.insert(path.to_string(), content.to_string());
    self
  }
}

impl AssetSource for MemorySource {
  fn read(&self, path: &str) -> anyhow::Result<String> {
    self
      .files
      .get(path)
      .cloned()
      .ok_or_else(|| anyhow!("no such asset: {path}"))
  }
}

/// Appends `|<name>` to the content, so tests can observe filter order.
pub struct SuffixFilter(String);

impl Filter for SuffixFilter {
  fn apply(&self, _source_path: &str, content: String) -> anyhow::Result<String> {
    Ok(format!("{content}|{}", self.0))
  }
}

pub struct FailingFilter;

impl Filter for FailingFilter {
  fn apply(&self, _source_path: &str, _content: String) -> anyhow::Result<String> {
    Err(anyhow!("filter exploded"))
  }
}

/// Factory that builds a [`SuffixFilter`] for any name and records every call.
#[derive(Default)]
pub struct RecordingFactory {
  calls: RefCell<Vec<(String, FilterArguments)>>,
}

impl RecordingFactory {
  pub fn calls(&self) -> Vec<(String, FilterArguments)> {
    self.calls.borrow().clone()
  }
}

impl FilterFactory for RecordingFactory {
  fn construct(&self, name: &str, arguments: FilterArguments) -> Result<Box<dyn Filter>> {
    self.calls.borrow_mut().push((name.to_string(), arguments));
    Ok(Box::new(SuffixFilter(name.to_string())))
  }
}

/// Store keeping published content in memory; identical content reuses its id.
#[derive(Debug, Default)]
pub struct MemoryStore {
  contents: RefCell<Vec<Vec<u8>>>,
  retained: RefCell<Vec<String>>,
}

impl MemoryStore {
  pub fn retained(&self) -> Vec<String> {
    self.retained.borrow().clone()
  }

  pub fn content(&self, uri: &str) -> Option<String> {
    let id: usize = uri.strip_prefix("memory://")?.split('/').next()?.parse().ok()?;
    let contents = self.contents.borrow();
    contents
      .get(id)
      .map(|content| String::from_utf8_lossy(content).into_owned())
  }
}

impl ContentStore for MemoryStore {
  fn import(&self, content: &[u8], filename: &str) -> anyhow::Result<ResourceHandle> {
    let mut contents = self.contents.borrow_mut();
    let id = match contents.iter().position(|existing| existing == content) {
      Some(id) => id,
      None => {
        contents.push(content.to_vec());
        contents.len() - 1
      }
    };
    Ok(ResourceHandle {
      id: id.to_string(),
      filename: filename.to_string(),
    })
  }

  fn retain(&self, handle: &ResourceHandle) -> anyhow::Result<()> {
    self.retained.borrow_mut().push(handle.id.clone());
    Ok(())
  }

  fn public_uri(&self, handle: &ResourceHandle) -> anyhow::Result<String> {
    Ok(format!("memory://{}/{}", handle.id, handle.filename))
  }
}

pub struct RejectingStore;

impl ContentStore for RejectingStore {
  fn import(&self, _content: &[u8], _filename: &str) -> anyhow::Result<ResourceHandle> {
    Err(anyhow!("disk full"))
  }

  fn public_uri(&self, _handle: &ResourceHandle) -> anyhow::Result<String> {
    unreachable!("nothing is ever imported")
  }
}
