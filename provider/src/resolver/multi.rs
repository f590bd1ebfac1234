use super::capability;
use crate::catalog::TypeName;
use crate::error::Result;
use crate::ordered::OrderedMap;
use crate::provider::Provider;
use crate::registry::Registry;

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

/// Gives a subsystem every distinct registered provider type, each as its
/// registry singleton, in sorted type-name order.
pub struct MultiResolver {
  registry: Arc<Registry>,
  types: RwLock<OrderedMap<TypeName>>,
}

impl MultiResolver {
  pub fn new(registry: Arc<Registry>) -> Self {
    Self {
      registry,
      types: RwLock::new(OrderedMap::new()),
    }
  }

  pub fn registry(&self) -> &Arc<Registry> {
    &self.registry
  }

  /// Adds `type_name`; adding a type twice has no effect.
  pub fn add(&self, type_name: TypeName) {
    if self.types.read().contains_key(type_name.as_str()) {
      return;
    }
    let mut types = self.types.write();
    if !types.contains_key(type_name.as_str()) {
      debug!(type_name = %type_name, "provider added");
      types.insert(type_name.to_string(), type_name);
    }
  }

  pub fn clear(&self) {
    self.types.write().clear();
  }

  pub fn len(&self) -> usize {
    self.types.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.types.read().is_empty()
  }

  /// Registered types in sorted order.
  pub fn types(&self) -> Vec<TypeName> {
    self.types.read().sorted_values().cloned().collect()
  }

  /// The provider singleton of every registered type that resolves.
  ///
  /// Types whose provider cannot be built are skipped.
  pub fn list(&self) -> Vec<Arc<dyn Provider>> {
    self
      .resolve_all()
      .into_iter()
      .map(|(_, provider)| provider)
      .collect()
  }

  /// Every resolved provider viewed as a `C`; fails on the first one that isn't.
  pub fn list_as<C>(&self) -> Result<Vec<Arc<C>>>
  where
    C: ?Sized + Send + Sync + 'static,
  {
    self
      .resolve_all()
      .iter()
      .map(|(type_name, provider)| capability::<C>(&self.registry, type_name, provider))
      .collect()
  }

  fn resolve_all(&self) -> Vec<(TypeName, Arc<dyn Provider>)> {
    let types = self.types();
    let mut resolved = Vec::with_capacity(types.len());
    for type_name in types {
      match self.registry.create_singleton_provider(&type_name) {
        Some(provider) => resolved.push((type_name, provider)),
        None => warn!(type_name = %type_name, "skipping provider that could not be built"),
      }
    }
    resolved
  }
}
