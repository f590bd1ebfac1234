//! The process-wide registry instance and access function.

use crate::registry::Registry;

use std::sync::Arc;

use once_cell::sync::Lazy;

// The one process-wide registry, created on first access.
static GLOBAL_REGISTRY: Lazy<Arc<Registry>> = Lazy::new(|| Arc::new(Registry::new()));

/// Provides a reference to the process-wide registry.
///
/// Applications register their types and overrides here at start-up and hand
/// clones of the `Arc` to their resolvers. Tests that need isolation should
/// build their own [`Registry`] instead.
///
/// # Examples
///
/// ```
/// use fibre_provider::{global, Registration, TypeName};
///
/// struct Clock;
///
/// global().register(Registration::object(|| Clock));
/// assert!(global().is_registered(&TypeName::of::<Clock>()));
/// ```
pub fn global() -> &'static Arc<Registry> {
  &GLOBAL_REGISTRY
}
