//! Strategies deciding which provider a subsystem uses.
//!
//! - [`SingleResolver`]: one active provider, most recent registration first,
//!   falling back to earlier registrations whose construction succeeds.
//! - [`MultiResolver`]: every registered provider type, for fan-out.
//! - [`KeyedResolver`]: a provider chosen by key or by the caller's type, with a
//!   catch-all and a hard-coded default behind it.

mod keyed;
mod multi;
mod single;

pub use keyed::{Binding, KeyedResolver};
pub use multi::MultiResolver;
pub use single::SingleResolver;

use crate::catalog::TypeName;
use crate::error::{Error, Result};
use crate::provider::Provider;
use crate::registry::Registry;

use std::sync::Arc;

// Views `provider` (built from `type_name`) as a `C`, or explains why it can't be.
fn capability<C>(registry: &Registry, type_name: &TypeName, provider: &Arc<dyn Provider>) -> Result<Arc<C>>
where
  C: ?Sized + Send + Sync + 'static,
{
  registry
    .cast::<C>(provider)
    .ok_or_else(|| Error::MissingCapability {
      subject: type_name.to_string(),
      capability: std::any::type_name::<C>().to_owned(),
    })
}

fn unresolved<C: ?Sized>() -> Error {
  Error::Unresolved {
    subject: std::any::type_name::<C>().to_owned(),
  }
}
