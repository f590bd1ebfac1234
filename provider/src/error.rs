use thiserror::Error;

/// A boxed error raised by a factory or a provider's `initialize`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for the `fibre_provider` library.
#[derive(Debug, Error)]
pub enum Error {
  #[error("Type '{type_name}' is not registered in the catalog")]
  UnknownType { type_name: String },

  #[error("No constructor of '{type_name}' takes parameters ({params})")]
  NoMatchingConstructor { type_name: String, params: String },

  #[error("Expected {expected} constructor arguments for '{type_name}', got {actual}")]
  ArgumentCount {
    type_name: String,
    expected: usize,
    actual: usize,
  },

  #[error("Constructor argument {index} is not a '{expected}'")]
  ArgumentType { index: usize, expected: String },

  #[error(
    "Settings '{name}' do not resolve to a registered type (namespace '{namespace}', class '{class_name}', module '{module}'); is the module registered?"
  )]
  UnresolvedSettings {
    name: String,
    namespace: String,
    class_name: String,
    module: String,
  },

  #[error("Failed to construct '{type_name}' for '{name}': {source}")]
  Construction {
    name: String,
    type_name: String,
    #[source]
    source: BoxError,
  },

  #[error("Failed to initialize provider '{name}' of type '{type_name}': {source}")]
  Initialization {
    name: String,
    type_name: String,
    #[source]
    source: BoxError,
  },

  #[error("'{type_name}' was constructed but is not a provider")]
  NotAProvider { type_name: String },

  #[error("Provider for {subject} needs to implement {capability}")]
  MissingCapability { subject: String, capability: String },

  #[error("No provider could be resolved for {subject}")]
  Unresolved { subject: String },

  #[error("Circular dependency detected while constructing '{type_name}'")]
  CircularDependency { type_name: String },

  #[error("Failed to parse configuration: {0}")]
  ConfigParse(String),

  #[error("Invalid configuration value for '{field}': {message}")]
  InvalidConfigValue { field: String, message: String },
}

/// A specialized `Result` type for `fibre_provider` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
