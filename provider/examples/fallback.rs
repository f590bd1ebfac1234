use fibre_provider::{Built, BoxError, Config, Provider, Registration, Registry, SingleResolver, TypeName};
use std::sync::Arc;

trait Clock: Send + Sync {
  fn now(&self) -> String;
}

#[derive(Default)]
struct SystemClock {
  name: String,
}

impl Provider for SystemClock {
  fn name(&self) -> &str {
    &self.name
  }

  fn initialize(&mut self, name: &str, _config: &Config) -> Result<(), BoxError> {
    self.name = name.to_owned();
    Ok(())
  }
}

impl Clock for SystemClock {
  fn now(&self) -> String {
    "system time".to_string()
  }
}

// Stands in for a clock whose backend is missing on this host.
#[derive(Default)]
struct NtpClock;

impl Provider for NtpClock {
  fn name(&self) -> &str {
    "ntp"
  }

  fn initialize(&mut self, _name: &str, _config: &Config) -> Result<(), BoxError> {
    Ok(())
  }
}

impl Clock for NtpClock {
  fn now(&self) -> String {
    "ntp time".to_string()
  }
}

fn main() {
  let registry = Arc::new(Registry::new());
  registry.register(Registration::provider(SystemClock::default).exposes(|clock| clock as Arc<dyn Clock>));
  registry.register(
    Registration::<NtpClock>::new()
      .constructor(Vec::new(), |_| -> Result<Option<Built>, BoxError> { Err("no NTP server reachable".into()) })
      .exposes(|clock| clock as Arc<dyn Clock>),
  );

  // The most recent registration is preferred; a failing one falls back to the previous.
  let clocks = SingleResolver::new(registry);
  clocks.set(TypeName::of::<SystemClock>());
  clocks.set(TypeName::of::<NtpClock>());

  let clock = clocks.get_as::<dyn Clock>().expect("the system clock always builds");
  println!("The time is: {}", clock.now());
  assert_eq!(clock.now(), "system time");
}
