//! Deployment environment classification.

use std::fmt;
use std::str::FromStr;

use tracing::warn;

/// Value-store key (and, upper-cased, environment variable) naming the environment.
pub const ENVIRONMENT_KEY: &str = "MaxEnvironment";
pub const ENVIRONMENT_VAR: &str = "MAX_ENVIRONMENT";

/// The environment the process runs in.
///
/// `Unknown` means "not classified yet"; assigning it makes the registry
/// classify again on the next read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Environment {
  Unknown = 0,
  Production = 1,
  Qa = 2,
  Development = 3,
  Testing = 4,
}

impl Environment {
  pub(crate) fn from_u8(raw: u8) -> Self {
    match raw {
      1 => Environment::Production,
      2 => Environment::Qa,
      3 => Environment::Development,
      4 => Environment::Testing,
      _ => Environment::Unknown,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Environment::Unknown => "unknown",
      Environment::Production => "production",
      Environment::Qa => "qa",
      Environment::Development => "dev",
      Environment::Testing => "testing",
    }
  }
}

impl fmt::Display for Environment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Error returned when a string names no known environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEnvironment(pub String);

impl fmt::Display for UnknownEnvironment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "unknown environment '{}', expected 'production', 'qa', 'dev' or 'testing'",
      self.0
    )
  }
}

impl std::error::Error for UnknownEnvironment {}

impl FromStr for Environment {
  type Err = UnknownEnvironment;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "production" => Ok(Environment::Production),
      "qa" => Ok(Environment::Qa),
      "dev" | "development" => Ok(Environment::Development),
      "testing" => Ok(Environment::Testing),
      _ => Err(UnknownEnvironment(s.to_owned())),
    }
  }
}

/// Classifies from a configured value, falling back to whether a debugger is attached.
pub(crate) fn classify(configured: Option<&str>) -> Environment {
  if let Some(configured) = configured {
    match configured.parse() {
      Ok(environment) => return environment,
      Err(error) => warn!(%error, "ignoring configured environment"),
    }
  }
  if debugger_attached() {
    Environment::Development
  } else {
    Environment::Production
  }
}

#[cfg(target_os = "linux")]
fn debugger_attached() -> bool {
  let Ok(status) = std::fs::read_to_string("/proc/self/status") else {
    return false;
  };
  status
    .lines()
    .find_map(|line| line.strip_prefix("TracerPid:"))
    .map(|pid| pid.trim() != "0")
    .unwrap_or(false)
}

#[cfg(not(target_os = "linux"))]
fn debugger_attached() -> bool {
  false
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_case_insensitively() {
    assert_eq!("Production".parse::<Environment>(), Ok(Environment::Production));
    assert_eq!("QA".parse::<Environment>(), Ok(Environment::Qa));
    assert_eq!(" dev ".parse::<Environment>(), Ok(Environment::Development));
    assert_eq!("TESTING".parse::<Environment>(), Ok(Environment::Testing));
    assert!("staging".parse::<Environment>().is_err());
  }

  #[test]
  fn configured_value_wins() {
    assert_eq!(classify(Some("qa")), Environment::Qa);
  }

  #[test]
  fn round_trips_through_u8() {
    for environment in [
      Environment::Unknown,
      Environment::Production,
      Environment::Qa,
      Environment::Development,
      Environment::Testing,
    ] {
      assert_eq!(Environment::from_u8(environment as u8), environment);
    }
  }
}
