//! The resolution registry.

use crate::catalog::{Args, Built, Catalog, Registration, TypeName, Value};
use crate::cache::{Instance, ProviderSlot, ResolutionGuard};
use crate::environment::{self, Environment, ENVIRONMENT_KEY, ENVIRONMENT_VAR};
use crate::error::{Error, Result};
use crate::ordered::{OrderedMap, Probe};
use crate::provider::{concrete_type_id, Config, Provider, DEFAULT_NAME};
use crate::settings::Settings;

use std::any::Any;
use std::mem;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, trace, warn};

#[derive(Default)]
struct State {
  settings: OrderedMap<Settings>,
  values: OrderedMap<Value>,
  singletons: OrderedMap<Instance>,
  providers: OrderedMap<ProviderSlot>,
  // Bumped whenever settings change; a construction that started under an
  // older generation must not publish.
  generation: u64,
}

/// Settings overrides, a shared value store and two singleton caches, plus the
/// catalog used to construct things by name.
///
/// A `Registry` is an ordinary value: tests build isolated instances, and
/// applications share one through [`global()`](crate::global).
///
/// Every cache-miss path constructs outside the lock and publishes under it.
/// Two threads missing on the same key may both construct; the first to
/// publish wins and every caller gets the published instance.
///
/// A provider singleton that failed to build stays failed until
/// [`remove_singleton_provider`](Self::remove_singleton_provider), a
/// [`set_setting`](Self::set_setting) touching its type, or [`reset`](Self::reset).
/// Nothing else notices that the cause has gone away.
pub struct Registry {
  catalog: Catalog,
  state: RwLock<State>,
  environment: AtomicU8,
}

impl Default for Registry {
  fn default() -> Self {
    Self {
      catalog: Catalog::default(),
      state: RwLock::new(State::default()),
      environment: AtomicU8::new(Environment::Unknown as u8),
    }
  }
}

impl Registry {
  /// Creates a new, empty `Registry`.
  pub fn new() -> Self {
    Self::default()
  }

  // --- Catalog ---

  /// Makes a type constructible by name. Registering a name again replaces it.
  pub fn register<T: Any + Send + Sync>(&self, registration: Registration<T>) {
    debug!(type_name = %registration.type_name(), "registering type");
    self.catalog.insert(registration);
  }

  pub fn is_registered(&self, type_name: &TypeName) -> bool {
    self.catalog.contains(type_name)
  }

  // --- Settings ---

  /// A copy of the settings stored under `key`.
  pub fn get_setting(&self, key: &str) -> Option<Settings> {
    self.state.read().settings.get(key).cloned()
  }

  /// Stores `settings` under `key` and drops every cached singleton derived from it.
  ///
  /// Removed atomically with the write: the bare key, the settings' type, and
  /// `key:type` / `name:type`; for providers, every instance name of the key's
  /// type and of the settings' type.
  pub fn set_setting(&self, key: impl Into<String>, settings: Settings) {
    let key = key.into();
    let resolved = settings.resolve_type(&self.catalog);

    let mut stale = vec![key.clone()];
    if let Some(type_name) = &resolved {
      stale.push(type_name.to_string());
      stale.push(format!("{}:{}", key, type_name));
      if !settings.name.is_empty() {
        stale.push(format!("{}:{}", settings.name, type_name));
      }
    }

    // Evicted entries are dropped after the guard: a provider's `Drop` may call back in.
    let evicted = {
      let mut state = self.state.write();
      state.generation += 1;
      let mut instances = Vec::new();
      let mut slots = Vec::new();
      for stale_key in &stale {
        instances.extend(state.singletons.remove(stale_key));
        slots.extend(state.providers.remove(stale_key));
      }
      slots.extend(
        state
          .providers
          .drain_where(|_, slot| {
            slot.type_name.as_str() == key || Some(&slot.type_name) == resolved.as_ref()
          })
          .into_iter()
          .map(|(_, slot)| slot),
      );
      debug!(key = %key, type_name = ?resolved, evicted = instances.len() + slots.len(), "settings registered");
      let previous = state.settings.insert(key, settings);
      (instances, slots, previous)
    };
    drop(evicted);
  }

  pub fn remove_setting(&self, key: &str) -> Option<Settings> {
    let mut state = self.state.write();
    state.generation += 1;
    state.settings.remove(key)
  }

  // --- Values ---

  pub fn get_value(&self, key: &str) -> Option<Value> {
    self.state.read().values.get(key).cloned()
  }

  /// The value under `key` as a `T`.
  pub fn value<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
    self.get_value(key)?.downcast::<T>().ok()
  }

  pub fn set_value<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
    self.state.write().values.insert(key, Arc::new(value) as Value);
  }

  pub fn remove_value(&self, key: &str) -> Option<Value> {
    self.state.write().values.remove(key)
  }

  /// The value under `key` if it is a string, otherwise `default`.
  ///
  /// Only `String` and `&'static str` values count as strings. Any other value,
  /// a stored `u32` say, is not formatted: the call returns `default`. Use
  /// [`value`](Self::value) to read typed values.
  pub fn get_value_string(&self, key: &str, default: &str) -> String {
    let state = self.state.read();
    state
      .values
      .get(key)
      .and_then(value_as_str)
      .unwrap_or(default)
      .to_owned()
  }

  /// Clears settings, values, both singleton caches and the environment.
  ///
  /// The catalog survives: it describes what can be built, not what was.
  pub fn reset(&self) {
    let previous = {
      let mut state = self.state.write();
      let generation = state.generation + 1;
      self
        .environment
        .store(Environment::Unknown as u8, Ordering::Release);
      mem::replace(
        &mut *state,
        State {
          generation,
          ..State::default()
        },
      )
    };
    // Cached providers are dropped with the guard released.
    drop(previous);
    debug!("registry reset");
  }

  // --- Environment ---

  /// The deployment environment, classified once on first read.
  ///
  /// Reads `"MaxEnvironment"` from the value store, then the `MAX_ENVIRONMENT`
  /// variable; without either, a process under a debugger is `Development` and
  /// anything else `Production`.
  pub fn environment(&self) -> Environment {
    let current = Environment::from_u8(self.environment.load(Ordering::Acquire));
    if current != Environment::Unknown {
      return current;
    }

    let state = self.state.write();
    let current = Environment::from_u8(self.environment.load(Ordering::Acquire));
    if current != Environment::Unknown {
      return current;
    }
    let configured = state
      .values
      .get(ENVIRONMENT_KEY)
      .and_then(value_as_str)
      .map(str::to_owned)
      .or_else(|| std::env::var(ENVIRONMENT_VAR).ok());
    let classified = environment::classify(configured.as_deref());
    self.environment.store(classified as u8, Ordering::Release);
    debug!(environment = %classified, "environment classified");
    classified
  }

  /// Overrides the environment; `Environment::Unknown` forces reclassification.
  pub fn set_environment(&self, environment: Environment) {
    let _state = self.state.write();
    self.environment.store(environment as u8, Ordering::Release);
  }

  // --- Construction ---

  /// Builds `type_name` with the constructor whose parameters are exactly `param_types`.
  pub fn create_with_params(
    &self,
    type_name: &TypeName,
    param_types: &[TypeName],
    param_values: &[Value],
  ) -> Result<Option<Built>> {
    self.construct(DEFAULT_NAME, type_name, param_types, param_values)
  }

  /// Builds what `settings` describe. Fails if their type does not resolve.
  pub fn create_from_settings(&self, settings: &Settings) -> Result<Option<Built>> {
    let type_name = self.settings_type(settings)?;
    self.construct_from(settings, &type_name)
  }

  /// Builds `type_name`, honoring settings registered under its string form.
  pub fn create(&self, type_name: &TypeName) -> Result<Option<Built>> {
    match self.get_setting(type_name.as_str()) {
      Some(settings) => self.create_from_settings(&settings),
      None => self.construct(DEFAULT_NAME, type_name, &[], &[]),
    }
  }

  fn settings_type(&self, settings: &Settings) -> Result<TypeName> {
    settings
      .resolve_type(&self.catalog)
      .ok_or_else(|| settings.unresolved())
  }

  fn construct_from(&self, settings: &Settings, type_name: &TypeName) -> Result<Option<Built>> {
    let name = if settings.name.is_empty() {
      DEFAULT_NAME
    } else {
      settings.name.as_str()
    };
    self.construct(name, type_name, &settings.param_types, &settings.param_values)
  }

  fn construct(
    &self,
    name: &str,
    type_name: &TypeName,
    param_types: &[TypeName],
    param_values: &[Value],
  ) -> Result<Option<Built>> {
    if param_types.len() != param_values.len() {
      return Err(Error::ArgumentCount {
        type_name: type_name.to_string(),
        expected: param_types.len(),
        actual: param_values.len(),
      });
    }
    let constructor = self.catalog.constructor(type_name, param_types)?;
    let _guard = ResolutionGuard::enter(self, type_name)?;

    debug!(name, type_name = %type_name, "constructing");
    let args = Args::new(self, type_name, param_values);
    (constructor.factory)(&args).map_err(|source| Error::Construction {
      name: name.to_owned(),
      type_name: type_name.to_string(),
      source,
    })
  }

  // --- Object singletons ---

  /// The object singleton for `type_name`, keyed by its string form.
  ///
  /// A construction that yields nothing is not cached; the next call retries.
  /// A provider is initialized under its default instance name before it is
  /// cached; an initialization error is returned and not cached either.
  pub fn create_singleton(&self, type_name: &TypeName) -> Result<Option<Instance>> {
    let name = self.default_instance_name(type_name);
    self.singleton_with(
      type_name.to_string(),
      || self.create(type_name),
      |built| self.instance_from(&name, type_name, built, None),
    )
  }

  /// The object singleton for `settings`, keyed by `name:type` (or `type` when unnamed).
  pub fn create_singleton_from_settings(&self, settings: &Settings) -> Result<Option<Instance>> {
    let type_name = self.settings_type(settings)?;
    let key = if settings.name.is_empty() {
      type_name.to_string()
    } else {
      format!("{}:{}", settings.name, type_name)
    };
    let name = if settings.name.is_empty() {
      DEFAULT_NAME
    } else {
      settings.name.as_str()
    };
    self.singleton_with(
      key,
      || self.construct_from(settings, &type_name),
      |built| self.instance_from(name, &type_name, built, Some(&settings.config)),
    )
  }

  /// The object singleton of `T` as a concrete `Arc<T>`.
  pub fn singleton<T: Any + Send + Sync>(&self) -> Result<Option<Arc<T>>> {
    let instance = self.create_singleton(&TypeName::of::<T>())?;
    Ok(instance.and_then(|instance| instance.downcast::<T>()))
  }

  pub fn remove_singleton(&self, key: &str) -> bool {
    let removed = self.state.write().singletons.remove(key);
    removed.is_some()
  }

  fn singleton_with(
    &self,
    key: String,
    build: impl FnOnce() -> Result<Option<Built>>,
    finish: impl FnOnce(Built) -> Result<Instance>,
  ) -> Result<Option<Instance>> {
    let generation = {
      let state = self.state.read();
      if let Some(instance) = state.singletons.get(&key) {
        trace!(key = %key, "singleton cache hit");
        return Ok(Some(instance.clone()));
      }
      state.generation
    };

    let Some(built) = build()? else {
      debug!(key = %key, "construction yielded nothing, not caching");
      return Ok(None);
    };
    let instance = finish(built)?;

    let mut state = self.state.write();
    if let Some(published) = state.singletons.get(&key) {
      return Ok(Some(published.clone()));
    }
    if state.generation != generation {
      debug!(key = %key, "settings changed during construction, not caching");
      return Ok(Some(instance));
    }
    debug!(key = %key, "singleton published");
    state.singletons.insert(key, instance.clone());
    Ok(Some(instance))
  }

  fn instance_from(
    &self,
    name: &str,
    type_name: &TypeName,
    built: Built,
    config: Option<&Config>,
  ) -> Result<Instance> {
    match built {
      Built::Object(value) => Ok(Instance::Object(value)),
      Built::Provider(provider) => self
        .initialize_provider(name, type_name, provider, config)
        .map(Instance::Provider),
    }
  }

  // --- Providers ---

  /// Builds `type_name` and initializes it as provider `name`.
  ///
  /// Returns `None` when construction yields nothing or yields a non-provider.
  /// Without `config`, the config of settings registered for the type is used.
  pub fn create_provider(
    &self,
    name: &str,
    type_name: &TypeName,
    config: Option<&Config>,
  ) -> Result<Option<Arc<dyn Provider>>> {
    let built = self.create(type_name)?;
    self.finish_provider(name, type_name, built, config)
  }

  /// Builds what `settings` describe and initializes it as provider `name`.
  ///
  /// Without `config`, the settings' own config is used.
  pub fn create_provider_from_settings(
    &self,
    name: &str,
    settings: &Settings,
    config: Option<&Config>,
  ) -> Result<Option<Arc<dyn Provider>>> {
    let type_name = self.settings_type(settings)?;
    let built = self.construct_from(settings, &type_name)?;
    self.finish_provider(name, &type_name, built, Some(config.unwrap_or(&settings.config)))
  }

  fn finish_provider(
    &self,
    name: &str,
    type_name: &TypeName,
    built: Option<Built>,
    config: Option<&Config>,
  ) -> Result<Option<Arc<dyn Provider>>> {
    match built {
      None => Ok(None),
      Some(Built::Object(_)) => {
        warn!(type_name = %type_name, "constructed object is not a provider");
        Ok(None)
      }
      Some(Built::Provider(provider)) => self
        .initialize_provider(name, type_name, provider, config)
        .map(Some),
    }
  }

  pub(crate) fn initialize_provider(
    &self,
    name: &str,
    type_name: &TypeName,
    mut provider: Box<dyn Provider>,
    config: Option<&Config>,
  ) -> Result<Arc<dyn Provider>> {
    let fallback;
    let config = match config {
      Some(config) => config,
      None => {
        fallback = self.type_config(type_name);
        &fallback
      }
    };
    provider
      .initialize(name, config)
      .map_err(|source| Error::Initialization {
        name: name.to_owned(),
        type_name: type_name.to_string(),
        source,
      })?;
    Ok(Arc::from(provider))
  }

  fn type_config(&self, type_name: &TypeName) -> Config {
    self
      .state
      .read()
      .settings
      .get(type_name.as_str())
      .map(|settings| settings.config.clone())
      .unwrap_or_default()
  }

  /// The instance name used for `type_name` when the caller gives none.
  ///
  /// Settings registered for the type may supply `"<Type>-Name"` or `"Name"` in
  /// their config; otherwise it is [`DEFAULT_NAME`].
  pub fn default_instance_name(&self, type_name: &TypeName) -> String {
    let state = self.state.read();
    let Some(settings) = state.settings.get(type_name.as_str()) else {
      return DEFAULT_NAME.to_owned();
    };
    let typed_key = format!("{}-Name", type_name.short());
    settings
      .config
      .get(&typed_key)
      .or_else(|| settings.config.get("Name"))
      .filter(|name| !name.is_empty())
      .cloned()
      .unwrap_or_else(|| DEFAULT_NAME.to_owned())
  }

  // --- Provider singletons ---

  /// The provider singleton for `type_name` under its default instance name.
  pub fn create_singleton_provider(&self, type_name: &TypeName) -> Option<Arc<dyn Provider>> {
    self.singleton_provider_with(None, type_name, |name| {
      self.create_provider(name, type_name, None)
    })
  }

  pub fn create_singleton_provider_with_config(
    &self,
    type_name: &TypeName,
    config: &Config,
  ) -> Option<Arc<dyn Provider>> {
    self.singleton_provider_with(None, type_name, |name| {
      self.create_provider(name, type_name, Some(config))
    })
  }

  /// The provider singleton for `type_name` under instance name `name`.
  pub fn create_named_singleton_provider(
    &self,
    name: &str,
    type_name: &TypeName,
  ) -> Option<Arc<dyn Provider>> {
    self.singleton_provider_with(Some(name), type_name, |name| {
      self.create_provider(name, type_name, None)
    })
  }

  /// The provider singleton for `settings`, named by `settings.name` when set.
  pub fn create_singleton_provider_from_settings(
    &self,
    settings: &Settings,
    config: Option<&Config>,
  ) -> Option<Arc<dyn Provider>> {
    let type_name = settings.resolve_type(&self.catalog);
    let identity = type_name.clone().unwrap_or_else(|| settings.identity());
    self.singleton_provider_with(Some(settings.name.as_str()), &identity, |name| {
      match &type_name {
        Some(_) => self.create_provider_from_settings(name, settings, config),
        None => Err(settings.unresolved()),
      }
    })
  }

  /// Resolves a provider singleton and views it as a `C`.
  pub fn provider_as<C>(&self, name: Option<&str>, type_name: &TypeName) -> Option<Arc<C>>
  where
    C: ?Sized + Send + Sync + 'static,
  {
    let provider = match name {
      Some(name) => self.create_named_singleton_provider(name, type_name)?,
      None => self.create_singleton_provider(type_name)?,
    };
    self.cast::<C>(&provider)
  }

  /// Views a provider as a `C`, through the casts its registration exposes.
  pub fn cast<C>(&self, provider: &Arc<dyn Provider>) -> Option<Arc<C>>
  where
    C: ?Sized + Send + Sync + 'static,
  {
    let concrete = concrete_type_id(provider);
    self.catalog.cast::<C>(concrete, provider.clone().into_any_arc())
  }

  // A failure, whether an error or an empty result, is cached for good.
  fn singleton_provider_with(
    &self,
    name: Option<&str>,
    type_name: &TypeName,
    build: impl FnOnce(&str) -> Result<Option<Arc<dyn Provider>>>,
  ) -> Option<Arc<dyn Provider>> {
    // Read first so the instance name and the build both see this generation or a newer one.
    let generation = self.state.read().generation;
    let name = match name {
      Some(name) if !name.is_empty() => name.to_owned(),
      _ => self.default_instance_name(type_name),
    };
    if let Probe::Found(slot) = self
      .state
      .read()
      .providers
      .find_value(&[name.as_str(), ":", type_name.as_str()])
    {
      trace!(name = %name, type_name = %type_name, "provider cache hit");
      return slot.provider();
    }

    let outcome = build(&name);

    let mut state = self.state.write();
    if let Probe::Found(published) = state.providers.find_value(&[name.as_str(), ":", type_name.as_str()]) {
      return published.provider();
    }
    let key = format!("{}:{}", name, type_name);
    if state.generation != generation {
      debug!(key = %key, "settings changed during construction, not caching");
      return outcome.ok().flatten();
    }
    let (slot, provider) = match outcome {
      Ok(Some(provider)) => {
        debug!(key = %key, "provider published");
        (ProviderSlot::ready(type_name.clone(), provider.clone()), Some(provider))
      }
      Ok(None) => {
        error!(key = %key, "no provider could be built; caching the failure");
        let failure = Error::Unresolved {
          subject: format!("provider '{}'", key),
        };
        (ProviderSlot::failed(type_name.clone(), failure), None)
      }
      Err(failure) => {
        error!(key = %key, error = %failure, "provider construction failed; caching the failure");
        (ProviderSlot::failed(type_name.clone(), failure), None)
      }
    };
    state.providers.insert(key, slot);
    provider
  }

  /// Why the provider singleton `name:type_name` is cached as failed, if it is.
  pub fn provider_failure(&self, name: &str, type_name: &TypeName) -> Option<Arc<Error>> {
    let state = self.state.read();
    match state.providers.find_value(&[name, ":", type_name.as_str()]) {
      Probe::Found(slot) => slot.failure(),
      Probe::NotFound => None,
    }
  }

  /// Drops every cached provider singleton of `type_name`, whatever its instance name.
  pub fn remove_singleton_provider(&self, type_name: &TypeName) -> usize {
    let removed = self
      .state
      .write()
      .providers
      .drain_where(|_, slot| &slot.type_name == type_name);
    debug!(type_name = %type_name, removed = removed.len(), "provider singletons removed");
    removed.len()
  }

  /// Drops exactly the cached provider singleton `name:type_name`.
  pub fn remove_named_singleton_provider(&self, type_name: &TypeName, name: &str) -> bool {
    let key = format!("{}:{}", name, type_name);
    let removed = self.state.write().providers.remove(&key);
    removed.is_some()
  }
}

fn value_as_str(value: &Value) -> Option<&str> {
  value
    .downcast_ref::<String>()
    .map(String::as_str)
    .or_else(|| value.downcast_ref::<&'static str>().copied())
}
