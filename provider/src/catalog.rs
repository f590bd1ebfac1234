//! Type identity and the factory catalog.
//!
//! The catalog maps a [`TypeName`] to the constructors that can build it. It is
//! populated up front (usually at start-up) through [`Registration`] values and
//! consulted whenever the registry needs to construct something by name.

use crate::error::{BoxError, Error, Result};
use crate::provider::Provider;
use crate::registry::Registry;

use std::any::{Any, TypeId};
use std::borrow::Borrow;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use dashmap::DashMap;

/// A shared, type-erased value: constructor arguments and value-store entries.
pub type Value = Arc<dyn Any + Send + Sync>;

/// The string identity of a constructible type.
///
/// Its `Display` form is the key every registry map and resolver uses.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeName(Arc<str>);

impl TypeName {
  /// The name of `T` as reported by [`std::any::type_name`].
  pub fn of<T: ?Sized>() -> Self {
    Self(Arc::from(std::any::type_name::<T>()))
  }

  pub fn new(name: impl AsRef<str>) -> Self {
    Self(Arc::from(name.as_ref()))
  }

  /// The catch-all key: the string form of `dyn Any`.
  pub fn any() -> Self {
    Self::of::<dyn Any>()
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// The last path segment, without generic arguments.
  pub fn short(&self) -> &str {
    let base = self.0.split('<').next().unwrap_or(&self.0);
    base.rsplit("::").next().unwrap_or(base)
  }
}

impl fmt::Display for TypeName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl fmt::Debug for TypeName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "TypeName({})", self.0)
  }
}

impl From<&str> for TypeName {
  fn from(name: &str) -> Self {
    Self::new(name)
  }
}

impl From<String> for TypeName {
  fn from(name: String) -> Self {
    Self(Arc::from(name))
  }
}

impl Borrow<str> for TypeName {
  fn borrow(&self) -> &str {
    &self.0
  }
}

/// What a factory produced.
pub enum Built {
  /// A plain object with no provider capability.
  Object(Value),
  /// A provider that has not been initialized yet.
  Provider(Box<dyn Provider>),
}

impl Built {
  pub fn object<T: Any + Send + Sync>(value: T) -> Self {
    Built::Object(Arc::new(value))
  }

  pub fn provider<P: Provider>(provider: P) -> Self {
    Built::Provider(Box::new(provider))
  }

  pub fn is_provider(&self) -> bool {
    matches!(self, Built::Provider(_))
  }
}

impl fmt::Debug for Built {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Built::Object(_) => f.write_str("Built::Object(..)"),
      Built::Provider(provider) => write!(f, "Built::Provider({})", provider.name()),
    }
  }
}

/// The arguments a factory is invoked with.
pub struct Args<'a> {
  registry: &'a Registry,
  type_name: &'a TypeName,
  values: &'a [Value],
}

impl<'a> Args<'a> {
  pub(crate) fn new(registry: &'a Registry, type_name: &'a TypeName, values: &'a [Value]) -> Self {
    Self {
      registry,
      type_name,
      values,
    }
  }

  /// The registry performing the construction, for resolving dependencies.
  pub fn registry(&self) -> &'a Registry {
    self.registry
  }

  /// The type being constructed.
  pub fn type_name(&self) -> &'a TypeName {
    self.type_name
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn value(&self, index: usize) -> Option<&'a Value> {
    self.values.get(index)
  }

  /// The argument at `index`, which must be a `T`.
  pub fn get<T: Any + Send + Sync>(&self, index: usize) -> Result<&'a T> {
    self
      .values
      .get(index)
      .and_then(|value| value.downcast_ref::<T>())
      .ok_or_else(|| Error::ArgumentType {
        index,
        expected: std::any::type_name::<T>().to_owned(),
      })
  }

  pub fn cloned<T: Any + Send + Sync + Clone>(&self, index: usize) -> Result<T> {
    self.get::<T>(index).cloned()
  }
}

/// The signature every constructor is stored as.
pub type Factory = dyn Fn(&Args<'_>) -> Result<Option<Built>, BoxError> + Send + Sync;

type CastFn = Arc<dyn Fn(Value) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;

#[derive(Clone)]
pub(crate) struct Constructor {
  pub(crate) params: Vec<TypeName>,
  pub(crate) factory: Arc<Factory>,
}

/// Describes how to build a `T`: its name, module and constructors, plus the
/// capability traits it may be viewed as.
pub struct Registration<T> {
  type_name: TypeName,
  module: Option<String>,
  constructors: Vec<Constructor>,
  casts: Vec<(TypeId, CastFn)>,
  _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> Registration<T> {
  /// A registration for `T` with no constructors yet.
  pub fn new() -> Self {
    let identity: CastFn = Arc::new(|value: Value| {
      value
        .downcast::<T>()
        .ok()
        .map(|concrete| Box::new(concrete) as Box<dyn Any + Send + Sync>)
    });
    Self {
      type_name: TypeName::of::<T>(),
      module: None,
      constructors: Vec::new(),
      casts: vec![(TypeId::of::<Arc<T>>(), identity)],
      _marker: PhantomData,
    }
  }

  /// A plain object built by a parameterless factory.
  pub fn object(factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
    Self::new().constructor(Vec::new(), move |_| Ok(Some(Built::object(factory()))))
  }

  /// Registers under `name` instead of the Rust type name.
  pub fn named(mut self, name: impl Into<TypeName>) -> Self {
    self.type_name = name.into();
    self
  }

  /// The module label settings must name to resolve this type.
  pub fn module(mut self, module: impl Into<String>) -> Self {
    self.module = Some(module.into());
    self
  }

  /// Adds a constructor taking exactly `params`.
  ///
  /// A later constructor with the same parameter list replaces the earlier one.
  pub fn constructor<F>(mut self, params: Vec<TypeName>, factory: F) -> Self
  where
    F: Fn(&Args<'_>) -> Result<Option<Built>, BoxError> + Send + Sync + 'static,
  {
    self.constructors.retain(|existing| existing.params != params);
    self.constructors.push(Constructor {
      params,
      factory: Arc::new(factory),
    });
    self
  }

  /// Lets resolved instances of `T` be viewed as `Arc<C>`.
  pub fn exposes<C>(mut self, cast: impl Fn(Arc<T>) -> Arc<C> + Send + Sync + 'static) -> Self
  where
    C: ?Sized + Send + Sync + 'static,
  {
    let cast: CastFn = Arc::new(move |value: Value| {
      value
        .downcast::<T>()
        .ok()
        .map(|concrete| Box::new(cast(concrete)) as Box<dyn Any + Send + Sync>)
    });
    self.casts.push((TypeId::of::<Arc<C>>(), cast));
    self
  }

  pub fn type_name(&self) -> &TypeName {
    &self.type_name
  }
}

impl<T: Provider> Registration<T> {
  /// A provider built by a parameterless factory.
  pub fn provider(factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
    Self::new().constructor(Vec::new(), move |_| Ok(Some(Built::provider(factory()))))
  }
}

impl<T: Any + Send + Sync> Default for Registration<T> {
  fn default() -> Self {
    Self::new()
  }
}

struct Entry {
  module: Option<String>,
  constructors: Vec<Constructor>,
}

/// Every type the registry knows how to construct.
#[derive(Default)]
pub(crate) struct Catalog {
  entries: DashMap<TypeName, Entry>,
  casts: DashMap<(TypeId, TypeId), CastFn>,
}

impl Catalog {
  pub(crate) fn insert<T: Any + Send + Sync>(&self, registration: Registration<T>) {
    let concrete = TypeId::of::<T>();
    for (capability, cast) in registration.casts {
      self.casts.insert((concrete, capability), cast);
    }
    self.entries.insert(
      registration.type_name,
      Entry {
        module: registration.module,
        constructors: registration.constructors,
      },
    );
  }

  pub(crate) fn contains(&self, type_name: &TypeName) -> bool {
    self.entries.contains_key(type_name)
  }

  /// Resolves a `(namespace, class, module)` triple to a registered type.
  pub(crate) fn resolve(&self, namespace: &str, class_name: &str, module: &str) -> Option<TypeName> {
    if class_name.is_empty() {
      return None;
    }
    let qualified = qualify(namespace, class_name);
    let entry = self.entries.get(qualified.as_str())?;
    if !module.is_empty() && entry.module.as_deref() != Some(module) {
      return None;
    }
    Some(entry.key().clone())
  }

  /// Finds the constructor of `type_name` whose parameters match `params` exactly.
  ///
  /// The constructor is cloned out so the factory runs without holding a shard lock.
  pub(crate) fn constructor(&self, type_name: &TypeName, params: &[TypeName]) -> Result<Constructor> {
    let entry = self.entries.get(type_name).ok_or_else(|| Error::UnknownType {
      type_name: type_name.to_string(),
    })?;
    entry
      .constructors
      .iter()
      .find(|constructor| constructor.params == params)
      .cloned()
      .ok_or_else(|| Error::NoMatchingConstructor {
        type_name: type_name.to_string(),
        params: params
          .iter()
          .map(TypeName::as_str)
          .collect::<Vec<_>>()
          .join(", "),
      })
  }

  pub(crate) fn cast<C>(&self, concrete: TypeId, value: Value) -> Option<Arc<C>>
  where
    C: ?Sized + Send + Sync + 'static,
  {
    let cast = self
      .casts
      .get(&(concrete, TypeId::of::<Arc<C>>()))?
      .value()
      .clone();
    cast(value)?.downcast::<Arc<C>>().ok().map(|boxed| *boxed)
  }
}

pub(crate) fn qualify(namespace: &str, class_name: &str) -> String {
  if namespace.is_empty() {
    class_name.to_owned()
  } else {
    format!("{}::{}", namespace, class_name)
  }
}
