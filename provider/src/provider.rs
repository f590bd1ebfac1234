//! The minimal capability contract every pluggable implementation satisfies.

use crate::error::BoxError;
use crate::ordered::OrderedMap;

use std::any::TypeId;
use std::sync::Arc;

use downcast_rs::{impl_downcast, DowncastSync};

/// The configuration bag handed to [`Provider::initialize`].
pub type Config = OrderedMap<String>;

/// Instance name used when neither the caller nor configuration names one.
pub const DEFAULT_NAME: &str = "Default";

/// A pluggable implementation object.
///
/// The registry calls `initialize` exactly once on every freshly constructed
/// provider, before anyone else can observe it. Domain capabilities (logging
/// sinks, converters, ...) are separate traits the concrete type also
/// implements; see [`Registration::exposes`](crate::Registration::exposes).
pub trait Provider: DowncastSync {
  /// The instance name given at initialization.
  fn name(&self) -> &str;

  fn initialize(&mut self, name: &str, config: &Config) -> Result<(), BoxError>;
}

impl_downcast!(sync Provider);

// The id of the concrete type behind the trait object, not of the `Arc`.
pub(crate) fn concrete_type_id(provider: &Arc<dyn Provider>) -> TypeId {
  let provider: &dyn Provider = &**provider;
  provider.as_any().type_id()
}
