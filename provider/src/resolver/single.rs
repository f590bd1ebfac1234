use super::{capability, unresolved};
use crate::catalog::{Built, TypeName};
use crate::error::{Error, Result};
use crate::ordered::OrderedMap;
use crate::provider::{Provider, DEFAULT_NAME};
use crate::registry::Registry;

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

#[derive(Default)]
struct SingleState {
  // Positional keys keep registrations in the order they were made.
  registrations: OrderedMap<TypeName>,
  resolved: Option<(TypeName, Arc<dyn Provider>)>,
  generation: u64,
}

/// Gives a subsystem exactly one active provider.
///
/// Resolution tries registrations from the most recent to the oldest and keeps
/// the first one that builds. A registration whose construction fails or
/// yields nothing is skipped; one that builds something that is not a provider
/// is a configuration error.
pub struct SingleResolver {
  registry: Arc<Registry>,
  state: RwLock<SingleState>,
}

impl SingleResolver {
  pub fn new(registry: Arc<Registry>) -> Self {
    Self {
      registry,
      state: RwLock::new(SingleState::default()),
    }
  }

  pub fn registry(&self) -> &Arc<Registry> {
    &self.registry
  }

  /// Registers `type_name` as the preferred provider and forgets the resolved one.
  pub fn set(&self, type_name: TypeName) {
    let mut state = self.state.write();
    state.resolved = None;
    state.generation += 1;
    debug!(type_name = %type_name, "provider registered");
    state.registrations.add(type_name);
  }

  /// Registered types, oldest first.
  pub fn registrations(&self) -> Vec<TypeName> {
    self.state.read().registrations.sorted_values().cloned().collect()
  }

  /// The active provider, resolving it on first use.
  pub fn get(&self) -> Result<Option<Arc<dyn Provider>>> {
    Ok(self.resolve()?.map(|(_, provider)| provider))
  }

  /// The active provider viewed as a `C`.
  pub fn get_as<C>(&self) -> Result<Arc<C>>
  where
    C: ?Sized + Send + Sync + 'static,
  {
    let (type_name, provider) = self.resolve()?.ok_or_else(unresolved::<C>)?;
    capability::<C>(&self.registry, &type_name, &provider)
  }

  fn resolve(&self) -> Result<Option<(TypeName, Arc<dyn Provider>)>> {
    let (generation, candidates) = {
      let state = self.state.read();
      if let Some(resolved) = &state.resolved {
        return Ok(Some(resolved.clone()));
      }
      let candidates: Vec<TypeName> = state.registrations.sorted_values().rev().cloned().collect();
      (state.generation, candidates)
    };

    let Some(resolved) = self.first_usable(&candidates)? else {
      return Ok(None);
    };

    let mut state = self.state.write();
    if let Some(published) = &state.resolved {
      return Ok(Some(published.clone()));
    }
    // A registration made meanwhile must get its chance on the next call.
    if state.generation == generation {
      state.resolved = Some(resolved.clone());
    }
    Ok(Some(resolved))
  }

  fn first_usable(&self, candidates: &[TypeName]) -> Result<Option<(TypeName, Arc<dyn Provider>)>> {
    for type_name in candidates {
      match self.registry.create(type_name) {
        Ok(Some(Built::Provider(provider))) => {
          match self
            .registry
            .initialize_provider(DEFAULT_NAME, type_name, provider, None)
          {
            Ok(provider) => return Ok(Some((type_name.clone(), provider))),
            Err(error) => warn!(type_name = %type_name, %error, "provider failed to initialize, falling back"),
          }
        }
        Ok(Some(Built::Object(_))) => {
          return Err(Error::NotAProvider {
            type_name: type_name.to_string(),
          })
        }
        Ok(None) => debug!(type_name = %type_name, "construction yielded nothing, falling back"),
        Err(error) => warn!(type_name = %type_name, %error, "provider construction failed, falling back"),
      }
    }
    Ok(None)
  }
}
