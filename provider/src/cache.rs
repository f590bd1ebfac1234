//! Cache entries and the construction guard shared by the registry.

use crate::catalog::{Built, TypeName, Value};
use crate::error::{Error, Result};
use crate::provider::Provider;

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

thread_local! {
  // The (registry, type) pairs currently being constructed on this thread.
  static CONSTRUCTING: RefCell<HashSet<(usize, TypeName)>> = RefCell::new(HashSet::new());
}

/// An RAII guard that detects a type being constructed from inside its own
/// construction.
///
/// Entering pushes the type onto a thread-local set; entering a type that is
/// already present fails. Dropping the guard pops it again.
pub(crate) struct ResolutionGuard {
  key: (usize, TypeName),
}

impl ResolutionGuard {
  pub(crate) fn enter<R>(registry: &R, type_name: &TypeName) -> Result<Self> {
    let key = (registry as *const R as usize, type_name.clone());
    let entered = CONSTRUCTING.with(|constructing| constructing.borrow_mut().insert(key.clone()));
    if !entered {
      return Err(Error::CircularDependency {
        type_name: type_name.to_string(),
      });
    }
    Ok(Self { key })
  }
}

impl Drop for ResolutionGuard {
  fn drop(&mut self) {
    CONSTRUCTING.with(|constructing| {
      constructing.borrow_mut().remove(&self.key);
    });
  }
}

/// An entry of the object-singleton cache.
#[derive(Clone)]
pub enum Instance {
  Object(Value),
  /// A provider built through the object path, initialized before it was cached.
  Provider(Arc<dyn Provider>),
}

impl Instance {
  /// The instance as a concrete `T`, if that is what it is.
  pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
    match self {
      Instance::Object(value) => value.clone().downcast::<T>().ok(),
      Instance::Provider(provider) => provider.clone().into_any_arc().downcast::<T>().ok(),
    }
  }

  pub fn as_provider(&self) -> Option<&Arc<dyn Provider>> {
    match self {
      Instance::Provider(provider) => Some(provider),
      Instance::Object(_) => None,
    }
  }

  pub fn ptr_eq(&self, other: &Instance) -> bool {
    match (self, other) {
      (Instance::Object(a), Instance::Object(b)) => Arc::ptr_eq(a, b),
      (Instance::Provider(a), Instance::Provider(b)) => Arc::ptr_eq(a, b),
      _ => false,
    }
  }
}

impl From<Built> for Instance {
  fn from(built: Built) -> Self {
    match built {
      Built::Object(value) => Instance::Object(value),
      Built::Provider(provider) => Instance::Provider(Arc::from(provider)),
    }
  }
}

impl fmt::Debug for Instance {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Instance::Object(_) => f.write_str("Instance::Object(..)"),
      Instance::Provider(provider) => write!(f, "Instance::Provider({})", provider.name()),
    }
  }
}

/// An entry of the provider-singleton cache: a provider, or the permanently
/// cached reason it could not be built.
pub(crate) struct ProviderSlot {
  pub(crate) type_name: TypeName,
  state: SlotState,
}

enum SlotState {
  Ready(Arc<dyn Provider>),
  Failed(Arc<Error>),
}

impl ProviderSlot {
  pub(crate) fn ready(type_name: TypeName, provider: Arc<dyn Provider>) -> Self {
    Self {
      type_name,
      state: SlotState::Ready(provider),
    }
  }

  pub(crate) fn failed(type_name: TypeName, error: Error) -> Self {
    Self {
      type_name,
      state: SlotState::Failed(Arc::new(error)),
    }
  }

  pub(crate) fn provider(&self) -> Option<Arc<dyn Provider>> {
    match &self.state {
      SlotState::Ready(provider) => Some(provider.clone()),
      SlotState::Failed(_) => None,
    }
  }

  pub(crate) fn failure(&self) -> Option<Arc<Error>> {
    match &self.state {
      SlotState::Ready(_) => None,
      SlotState::Failed(error) => Some(error.clone()),
    }
  }
}
