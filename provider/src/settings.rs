//! Settings descriptors: how to build one object.

use crate::catalog::{qualify, Catalog, TypeName, Value};
use crate::error::Error;
use crate::provider::Config;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

/// Describes how to build one object.
///
/// The type is either given directly or resolved lazily from a
/// `(namespace, class_name, module)` triple against the registry's catalog. A
/// resolved type is remembered and shared by clones taken afterwards.
#[derive(Clone, Default)]
pub struct Settings {
  /// Instance identity; empty means "unnamed".
  pub name: String,
  pub namespace: String,
  pub class_name: String,
  pub module: String,
  pub param_types: Vec<TypeName>,
  pub param_values: Vec<Value>,
  /// Handed to providers built from these settings.
  pub config: Config,
  type_name: OnceCell<TypeName>,
}

impl Settings {
  /// Settings for an already known type.
  pub fn for_type(type_name: impl Into<TypeName>) -> Self {
    Self {
      type_name: OnceCell::with_value(type_name.into()),
      ..Self::default()
    }
  }

  pub fn of<T: ?Sized>() -> Self {
    Self::for_type(TypeName::of::<T>())
  }

  /// Settings naming a class to be resolved by namespace, class name and module.
  pub fn for_class(
    namespace: impl Into<String>,
    class_name: impl Into<String>,
    module: impl Into<String>,
  ) -> Self {
    Self {
      namespace: namespace.into(),
      class_name: class_name.into(),
      module: module.into(),
      ..Self::default()
    }
  }

  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }

  pub fn with_config(mut self, config: Config) -> Self {
    self.config = config;
    self
  }

  pub fn with_config_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.config.insert(key, value.into());
    self
  }

  /// Appends one constructor argument of type `T`.
  pub fn with_param<T: Any + Send + Sync>(mut self, value: T) -> Self {
    self.param_types.push(TypeName::of::<T>());
    self.param_values.push(Arc::new(value));
    self
  }

  pub fn with_params(mut self, types: Vec<TypeName>, values: Vec<Value>) -> Self {
    self.param_types = types;
    self.param_values = values;
    self
  }

  /// The type, if it was given directly or has been resolved already.
  pub fn type_name(&self) -> Option<&TypeName> {
    self.type_name.get()
  }

  pub(crate) fn resolve_type(&self, catalog: &Catalog) -> Option<TypeName> {
    if let Some(type_name) = self.type_name.get() {
      return Some(type_name.clone());
    }
    let resolved = catalog.resolve(&self.namespace, &self.class_name, &self.module)?;
    Some(self.type_name.get_or_init(|| resolved).clone())
  }

  /// The type these settings would resolve to, or failing that the qualified class.
  pub(crate) fn identity(&self) -> TypeName {
    match self.type_name.get() {
      Some(type_name) => type_name.clone(),
      None => TypeName::from(qualify(&self.namespace, &self.class_name)),
    }
  }

  pub(crate) fn unresolved(&self) -> Error {
    Error::UnresolvedSettings {
      name: self.name.clone(),
      namespace: self.namespace.clone(),
      class_name: self.class_name.clone(),
      module: self.module.clone(),
    }
  }
}

impl fmt::Debug for Settings {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Settings")
      .field("name", &self.name)
      .field("type_name", &self.type_name.get())
      .field("namespace", &self.namespace)
      .field("class_name", &self.class_name)
      .field("module", &self.module)
      .field("param_types", &self.param_types)
      .field("config", &self.config)
      .finish_non_exhaustive()
  }
}
