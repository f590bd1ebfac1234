//! Public macros for ergonomic provider resolution.

/// Resolves a provider singleton from an explicit registry, returning an `Option`.
///
/// - `maybe_resolve_from!(registry, Type)` gives `Option<Arc<Type>>`.
/// - `maybe_resolve_from!(registry, Type, "name")` resolves the named instance.
/// - `maybe_resolve_from!(registry, trait Capability, Type)` gives
///   `Option<Arc<dyn Capability>>`, through the casts `Type`'s registration exposes.
/// - `maybe_resolve_from!(registry, trait Capability, Type, "name")`.
#[macro_export]
macro_rules! maybe_resolve_from {
  ($registry:expr, trait $capability:ident, $type:ty, $name:expr) => {
    $registry.provider_as::<dyn $capability>(
      ::std::option::Option::Some($name),
      &$crate::TypeName::of::<$type>(),
    )
  };

  ($registry:expr, trait $capability:ident, $type:ty) => {
    $registry.provider_as::<dyn $capability>(
      ::std::option::Option::None,
      &$crate::TypeName::of::<$type>(),
    )
  };

  ($registry:expr, $type:ty, $name:expr) => {
    $registry.provider_as::<$type>(
      ::std::option::Option::Some($name),
      &$crate::TypeName::of::<$type>(),
    )
  };

  ($registry:expr, $type:ty) => {
    $registry.provider_as::<$type>(::std::option::Option::None, &$crate::TypeName::of::<$type>())
  };
}

/// Resolves a provider singleton from an explicit registry.
///
/// # Panics
///
/// Panics if the provider cannot be resolved or lacks the requested capability.
/// For a non-panicking version, use [`maybe_resolve_from!`].
#[macro_export]
macro_rules! resolve_from {
  ($registry:expr, trait $capability:ident, $type:ty $(, $name:expr)?) => {
    $crate::maybe_resolve_from!($registry, trait $capability, $type $(, $name)?).unwrap_or_else(|| {
      panic!(
        "Provider for {} needs to implement {}",
        ::std::any::type_name::<$type>(),
        ::std::any::type_name::<dyn $capability>()
      )
    })
  };

  ($registry:expr, $type:ty $(, $name:expr)?) => {
    $crate::maybe_resolve_from!($registry, $type $(, $name)?).unwrap_or_else(|| {
      panic!(
        "Failed to resolve required provider: {}",
        ::std::any::type_name::<$type>()
      )
    })
  };
}

/// Resolves a provider singleton from the global registry, returning an `Option`.
///
/// Accepts the same forms as [`maybe_resolve_from!`] without the registry.
#[macro_export]
macro_rules! maybe_resolve {
  (trait $capability:ident, $type:ty $(, $name:expr)?) => {
    $crate::maybe_resolve_from!($crate::global(), trait $capability, $type $(, $name)?)
  };

  ($type:ty $(, $name:expr)?) => {
    $crate::maybe_resolve_from!($crate::global(), $type $(, $name)?)
  };
}

/// Resolves a provider singleton from the global registry.
///
/// # Panics
///
/// Panics if the provider cannot be resolved or lacks the requested capability.
///
/// # Examples
///
/// ```
/// use fibre_provider::{global, resolve, BoxError, Config, Provider, Registration};
///
/// #[derive(Default)]
/// struct Clock {
///   name: String,
/// }
///
/// impl Provider for Clock {
///   fn name(&self) -> &str {
///     &self.name
///   }
///
///   fn initialize(&mut self, name: &str, _config: &Config) -> Result<(), BoxError> {
///     self.name = name.to_owned();
///     Ok(())
///   }
/// }
///
/// global().register(Registration::provider(Clock::default));
///
/// let clock = resolve!(Clock);
/// assert_eq!(clock.name(), "Default");
/// ```
#[macro_export]
macro_rules! resolve {
  (trait $capability:ident, $type:ty $(, $name:expr)?) => {
    $crate::resolve_from!($crate::global(), trait $capability, $type $(, $name)?)
  };

  ($type:ty $(, $name:expr)?) => {
    $crate::resolve_from!($crate::global(), $type $(, $name)?)
  };
}
