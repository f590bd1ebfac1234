//! Declarative registry configuration.
//!
//! A configuration document lists settings overrides, shared values and an
//! optional environment. It is parsed into raw structs mirroring the document,
//! then processed into validated [`Settings`] before anything touches a
//! registry.
//!
//! ```yaml
//! environment: qa
//! values:
//!   MaxEnvironment: qa
//! settings:
//!   "app::logging::Sink":
//!     name: primary
//!     type: "app::logging::FileSink"
//!     config:
//!       path: /var/log/app.log
//!   "app::crypto::Cipher":
//!     namespace: "app::crypto"
//!     class: "AesCipher"
//!     module: "crypto"
//! ```

use crate::catalog::TypeName;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::provider::Config;
use crate::registry::Registry;
use crate::settings::Settings;

use std::collections::BTreeMap;
use std::io::Read;

use serde::Deserialize;
use tracing::debug;

// --- Raw, as written ---

#[derive(Debug, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfigRaw {
  #[serde(default)]
  pub environment: Option<String>,
  #[serde(default)]
  pub values: BTreeMap<String, String>,
  #[serde(default)]
  pub settings: BTreeMap<String, SettingsRaw>,
}

#[derive(Debug, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct SettingsRaw {
  #[serde(default)]
  pub name: String,
  /// A type name registered in the catalog. Exclusive with `class`.
  #[serde(default, rename = "type")]
  pub type_name: Option<String>,
  #[serde(default)]
  pub namespace: String,
  #[serde(default, rename = "class")]
  pub class_name: String,
  #[serde(default)]
  pub module: String,
  #[serde(default)]
  pub config: BTreeMap<String, String>,
}

// --- Processed ---

/// A validated configuration, ready to apply.
#[derive(Debug, Default)]
pub struct RegistryConfig {
  pub environment: Option<Environment>,
  pub values: Vec<(String, String)>,
  pub settings: Vec<(String, Settings)>,
}

pub fn from_yaml_str(source: &str) -> Result<RegistryConfigRaw> {
  serde_yaml::from_str(source).map_err(|e| Error::ConfigParse(e.to_string()))
}

pub fn from_json_str(source: &str) -> Result<RegistryConfigRaw> {
  serde_json::from_str(source).map_err(|e| Error::ConfigParse(e.to_string()))
}

pub fn from_yaml_reader(mut reader: impl Read) -> Result<RegistryConfigRaw> {
  let mut source = String::new();
  reader
    .read_to_string(&mut source)
    .map_err(|e| Error::ConfigParse(e.to_string()))?;
  from_yaml_str(&source)
}

/// Validates the raw document into settings descriptors.
pub fn process_raw_config(raw: RegistryConfigRaw) -> Result<RegistryConfig> {
  let environment = match raw.environment {
    Some(environment) => Some(environment.parse::<Environment>().map_err(|e| {
      Error::InvalidConfigValue {
        field: "environment".to_string(),
        message: e.to_string(),
      }
    })?),
    None => None,
  };

  let mut values = Vec::with_capacity(raw.values.len());
  for (key, value) in raw.values {
    if key.is_empty() {
      return Err(Error::InvalidConfigValue {
        field: "values".to_string(),
        message: "Value keys cannot be empty.".to_string(),
      });
    }
    values.push((key, value));
  }

  let mut settings = Vec::with_capacity(raw.settings.len());
  for (key, raw_settings) in raw.settings {
    if key.is_empty() {
      return Err(Error::InvalidConfigValue {
        field: "settings".to_string(),
        message: "Settings keys cannot be empty.".to_string(),
      });
    }
    let processed = process_settings(&key, raw_settings)?;
    settings.push((key, processed));
  }

  Ok(RegistryConfig {
    environment,
    values,
    settings,
  })
}

fn process_settings(key: &str, raw: SettingsRaw) -> Result<Settings> {
  let base = match (raw.type_name, raw.class_name.is_empty()) {
    (Some(_), false) => {
      return Err(Error::InvalidConfigValue {
        field: format!("settings.{}", key),
        message: "Specify either 'type' or 'class', not both.".to_string(),
      })
    }
    (Some(type_name), true) if type_name.is_empty() => {
      return Err(Error::InvalidConfigValue {
        field: format!("settings.{}.type", key),
        message: "Type name cannot be empty.".to_string(),
      })
    }
    (Some(type_name), true) => Settings::for_type(TypeName::from(type_name)),
    (None, false) => Settings::for_class(raw.namespace, raw.class_name, raw.module),
    (None, true) => {
      return Err(Error::InvalidConfigValue {
        field: format!("settings.{}", key),
        message: "Settings need a 'type' or a 'class'.".to_string(),
      })
    }
  };
  Ok(
    base
      .with_name(raw.name)
      .with_config(raw.config.into_iter().collect::<Config>()),
  )
}

impl Registry {
  /// Registers every override and value of `config`, then its environment.
  pub fn apply_config(&self, config: RegistryConfig) {
    for (key, value) in config.values {
      self.set_value(key, value);
    }
    for (key, settings) in config.settings {
      self.set_setting(key, settings);
    }
    if let Some(environment) = config.environment {
      self.set_environment(environment);
    }
    debug!("registry configuration applied");
  }

  /// Parses, validates and applies a YAML configuration document.
  pub fn load_yaml(&self, source: &str) -> Result<()> {
    let config = process_raw_config(from_yaml_str(source)?)?;
    self.apply_config(config);
    Ok(())
  }

  /// Parses, validates and applies a JSON configuration document.
  pub fn load_json(&self, source: &str) -> Result<()> {
    let config = process_raw_config(from_json_str(source)?)?;
    self.apply_config(config);
    Ok(())
  }
}
