#![allow(dead_code)]

use fibre_provider::{BoxError, Built, Config, Provider, Registration, Registry, TypeName};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// --- Shared Fixtures ---

// The capability every sink exposes.
pub trait Sink: Send + Sync {
  fn label(&self) -> String;
}

#[derive(Default)]
pub struct ConsoleSink {
  pub name: String,
  pub config: Config,
}

impl Provider for ConsoleSink {
  fn name(&self) -> &str {
    &self.name
  }

  fn initialize(&mut self, name: &str, config: &Config) -> Result<(), BoxError> {
    self.name = name.to_owned();
    self.config = config.clone();
    Ok(())
  }
}

impl Sink for ConsoleSink {
  fn label(&self) -> String {
    format!("console:{}", self.name)
  }
}

#[derive(Default)]
pub struct FileSink {
  pub name: String,
  pub path: String,
}

impl Provider for FileSink {
  fn name(&self) -> &str {
    &self.name
  }

  fn initialize(&mut self, name: &str, config: &Config) -> Result<(), BoxError> {
    self.name = name.to_owned();
    self.path = config.get_cloned_or("path", "stdout".to_string());
    Ok(())
  }
}

impl Sink for FileSink {
  fn label(&self) -> String {
    format!("file:{}:{}", self.name, self.path)
  }
}

#[derive(Default)]
pub struct MemorySink {
  pub name: String,
}

impl Provider for MemorySink {
  fn name(&self) -> &str {
    &self.name
  }

  fn initialize(&mut self, name: &str, _config: &Config) -> Result<(), BoxError> {
    self.name = name.to_owned();
    Ok(())
  }
}

impl Sink for MemorySink {
  fn label(&self) -> String {
    format!("memory:{}", self.name)
  }
}

// Builds fine, then refuses to initialize.
#[derive(Default)]
pub struct BrokenSink;

impl Provider for BrokenSink {
  fn name(&self) -> &str {
    "broken"
  }

  fn initialize(&mut self, _name: &str, _config: &Config) -> Result<(), BoxError> {
    Err("sink backend unavailable".into())
  }
}

// A provider nobody exposes a `Sink` view for.
#[derive(Default)]
pub struct MutedSink {
  pub name: String,
}

impl Provider for MutedSink {
  fn name(&self) -> &str {
    &self.name
  }

  fn initialize(&mut self, name: &str, _config: &Config) -> Result<(), BoxError> {
    self.name = name.to_owned();
    Ok(())
  }
}

// Constructs fine but is not a provider.
#[derive(Debug, PartialEq)]
pub struct PlainObject(pub u32);

/// A fresh registry knowing every fixture above, the sinks exposed as `dyn Sink`.
pub fn sink_registry() -> Arc<Registry> {
  let registry = Arc::new(Registry::new());
  registry.register(Registration::provider(ConsoleSink::default).exposes(|sink| sink as Arc<dyn Sink>));
  registry.register(Registration::provider(FileSink::default).exposes(|sink| sink as Arc<dyn Sink>));
  registry.register(Registration::provider(MemorySink::default).exposes(|sink| sink as Arc<dyn Sink>));
  registry.register(Registration::provider(BrokenSink::default));
  registry.register(Registration::provider(MutedSink::default));
  registry.register(Registration::object(|| PlainObject(7)));
  registry
}

/// Registers `T` with a factory that counts its calls and yields nothing.
pub fn register_empty<T: Provider + Default>(registry: &Registry) -> Arc<AtomicUsize> {
  let attempts = Arc::new(AtomicUsize::new(0));
  let counter = attempts.clone();
  registry.register(Registration::<T>::new().constructor(Vec::new(), move |_| {
    counter.fetch_add(1, Ordering::SeqCst);
    Ok(None)
  }));
  attempts
}

/// Registers `T` with a factory that counts its calls and always fails.
pub fn register_failing<T: Provider + Default>(registry: &Registry) -> Arc<AtomicUsize> {
  let attempts = Arc::new(AtomicUsize::new(0));
  let counter = attempts.clone();
  registry.register(Registration::<T>::new().constructor(Vec::new(), move |_| {
    counter.fetch_add(1, Ordering::SeqCst);
    Err::<Option<Built>, BoxError>("factory exploded".into())
  }));
  attempts
}

pub fn type_of<T: ?Sized>() -> TypeName {
  TypeName::of::<T>()
}

pub fn labels(sinks: &[Arc<dyn Sink>]) -> Vec<String> {
  sinks.iter().map(|sink| sink.label()).collect()
}
