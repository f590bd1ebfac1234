use super::{capability, unresolved};
use crate::catalog::TypeName;
use crate::error::Result;
use crate::ordered::OrderedMap;
use crate::provider::Provider;
use crate::registry::Registry;

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

/// What [`KeyedResolver::add`] does with a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
  /// Map the key to this provider type.
  To(TypeName),
  /// Forget any mapping for the key.
  Remove,
}

impl From<TypeName> for Binding {
  fn from(type_name: TypeName) -> Self {
    Binding::To(type_name)
  }
}

impl From<Option<TypeName>> for Binding {
  fn from(type_name: Option<TypeName>) -> Self {
    match type_name {
      Some(type_name) => Binding::To(type_name),
      None => Binding::Remove,
    }
  }
}

/// Gives a subsystem a provider chosen by key or by the caller's type.
///
/// `get` tries, in order: the explicit key, the caller's type name, the
/// catch-all binding made by [`add_default`](Self::add_default), and the
/// resolver's hard-coded default type. The first stage naming a type whose
/// provider singleton builds wins; a stage whose provider cannot be built
/// passes to the next.
pub struct KeyedResolver {
  registry: Arc<Registry>,
  default_type: Option<TypeName>,
  bindings: RwLock<OrderedMap<TypeName>>,
}

impl KeyedResolver {
  pub fn new(registry: Arc<Registry>) -> Self {
    Self {
      registry,
      default_type: None,
      bindings: RwLock::new(OrderedMap::new()),
    }
  }

  /// A resolver that falls back to `default_type` when nothing else matches.
  pub fn with_default(registry: Arc<Registry>, default_type: TypeName) -> Self {
    Self {
      default_type: Some(default_type),
      ..Self::new(registry)
    }
  }

  pub fn registry(&self) -> &Arc<Registry> {
    &self.registry
  }

  pub fn default_type(&self) -> Option<&TypeName> {
    self.default_type.as_ref()
  }

  /// Binds `key` to a provider type, or removes its binding.
  pub fn add(&self, key: impl Into<String>, binding: impl Into<Binding>) {
    let key = key.into();
    let mut bindings = self.bindings.write();
    match binding.into() {
      Binding::To(type_name) => {
        debug!(key = %key, type_name = %type_name, "binding added");
        bindings.insert(key, type_name);
      }
      Binding::Remove => {
        debug!(key = %key, "binding removed");
        bindings.remove(&key);
      }
    }
  }

  /// Binds the catch-all key, used when neither the key nor the caller's type match.
  pub fn add_default(&self, type_name: TypeName) {
    self.add(TypeName::any().to_string(), type_name);
  }

  pub fn binding(&self, key: &str) -> Option<TypeName> {
    self.bindings.read().get(key).cloned()
  }

  /// Resolves the unnamed provider singleton for `key`, or for `default_type`.
  pub fn get(&self, key: Option<&str>, default_type: &TypeName) -> Option<Arc<dyn Provider>> {
    self.resolve(None, key, default_type).map(|(_, provider)| provider)
  }

  /// Resolves the provider singleton named `name`.
  ///
  /// Tries `name:default_type` and `name` before the stages of [`get`](Self::get),
  /// and every stage resolves the instance called `name`.
  pub fn get_by_name(&self, name: &str, default_type: &TypeName) -> Option<Arc<dyn Provider>> {
    self
      .resolve(Some(name), None, default_type)
      .map(|(_, provider)| provider)
  }

  /// Like [`get`](Self::get), viewed as a `C`.
  pub fn get_as<C>(&self, key: Option<&str>, default_type: &TypeName) -> Result<Arc<C>>
  where
    C: ?Sized + Send + Sync + 'static,
  {
    let (type_name, provider) = self
      .resolve(None, key, default_type)
      .ok_or_else(unresolved::<C>)?;
    capability::<C>(&self.registry, &type_name, &provider)
  }

  /// Like [`get_by_name`](Self::get_by_name), viewed as a `C`.
  pub fn get_by_name_as<C>(&self, name: &str, default_type: &TypeName) -> Result<Arc<C>>
  where
    C: ?Sized + Send + Sync + 'static,
  {
    let (type_name, provider) = self
      .resolve(Some(name), None, default_type)
      .ok_or_else(unresolved::<C>)?;
    capability::<C>(&self.registry, &type_name, &provider)
  }

  // Candidate types in stage order; collected under the lock, built outside it.
  fn candidates(&self, name: Option<&str>, key: Option<&str>, default_type: &TypeName) -> Vec<TypeName> {
    let bindings = self.bindings.read();
    let mut candidates = Vec::with_capacity(5);
    if let Some(name) = name {
      if let Some(type_name) = bindings
        .find_value(&[name, ":", default_type.as_str()])
        .found()
      {
        candidates.push(type_name.clone());
      }
      candidates.extend(bindings.get(name).cloned());
    }
    if let Some(key) = key {
      candidates.extend(bindings.get(key).cloned());
    }
    candidates.extend(bindings.get(default_type.as_str()).cloned());
    candidates.extend(bindings.get(TypeName::any().as_str()).cloned());
    candidates.extend(self.default_type.clone());
    candidates
  }

  fn resolve(
    &self,
    name: Option<&str>,
    key: Option<&str>,
    default_type: &TypeName,
  ) -> Option<(TypeName, Arc<dyn Provider>)> {
    for type_name in self.candidates(name, key, default_type) {
      let provider = match name {
        Some(name) => self.registry.create_named_singleton_provider(name, &type_name),
        None => self.registry.create_singleton_provider(&type_name),
      };
      match provider {
        Some(provider) => return Some((type_name, provider)),
        None => trace!(type_name = %type_name, "stage yielded no provider, trying the next"),
      }
    }
    None
  }
}
