//! # Fibre Provider
//!
//! A thread-safe provider registry for Rust.
//!
//! Call sites ask for "the provider for capability X" without depending on the
//! concrete implementation. The [`Registry`] constructs providers by name from
//! a catalog of factories, caches them as singletons, and honors settings
//! overrides registered at start-up or at runtime. Three resolvers sit on top of
//! it and give subsystems their override semantics.
//!
//! ## Core Concepts
//!
//! - **Registration**: tells the registry how to build a type, and which
//!   capability traits it may be viewed as.
//! - **Settings**: an override describing what to build for a key, with a
//!   configuration bag handed to the provider's `initialize`.
//! - **Singletons**: object singletons retry failed constructions; provider
//!   singletons cache failures for good (until removed or reset).
//! - **Resolvers**: [`SingleResolver`], [`MultiResolver`] and [`KeyedResolver`].
//!
//! ## Quick Start
//!
//! ```
//! use fibre_provider::{BoxError, Config, KeyedResolver, Provider, Registration, Registry, TypeName};
//! use std::sync::Arc;
//!
//! trait Greeter: Send + Sync {
//!   fn greet(&self) -> String;
//! }
//!
//! #[derive(Default)]
//! struct EnglishGreeter {
//!   name: String,
//! }
//!
//! impl Provider for EnglishGreeter {
//!   fn name(&self) -> &str {
//!     &self.name
//!   }
//!
//!   fn initialize(&mut self, name: &str, _config: &Config) -> Result<(), BoxError> {
//!     self.name = name.to_owned();
//!     Ok(())
//!   }
//! }
//!
//! impl Greeter for EnglishGreeter {
//!   fn greet(&self) -> String {
//!     "Hello!".to_string()
//!   }
//! }
//!
//! let registry = Arc::new(Registry::new());
//! registry.register(
//!   Registration::provider(EnglishGreeter::default)
//!     .exposes(|greeter| greeter as Arc<dyn Greeter>),
//! );
//!
//! let greeters = KeyedResolver::with_default(registry.clone(), TypeName::of::<EnglishGreeter>());
//! let greeter = greeters
//!   .get_as::<dyn Greeter>(Some("en"), &TypeName::of::<dyn Greeter>())
//!   .unwrap();
//!
//! assert_eq!(greeter.greet(), "Hello!");
//! ```

mod cache;
mod catalog;
#[cfg(feature = "config")]
pub mod config;
mod environment;
mod error;
mod global;
mod macros;
pub mod ordered;
mod provider;
mod registry;
mod resolver;
mod settings;

pub use cache::Instance;
pub use catalog::{Args, Built, Factory, Registration, TypeName, Value};
pub use environment::{Environment, UnknownEnvironment, ENVIRONMENT_KEY, ENVIRONMENT_VAR};
pub use error::{BoxError, Error, Result};
pub use global::global;
pub use ordered::{OrderedMap, Probe, NOT_FOUND};
pub use provider::{Config, Provider, DEFAULT_NAME};
pub use registry::Registry;
pub use resolver::{Binding, KeyedResolver, MultiResolver, SingleResolver};
pub use settings::Settings;
