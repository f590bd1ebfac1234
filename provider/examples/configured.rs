use fibre_provider::{BoxError, Config, Provider, Registration, Registry, TypeName};
use std::sync::Arc;

const CONFIG: &str = r#"
environment: dev
values:
  region: eu-west-1
settings:
  "configured::Greeter":
    type: "configured::FrenchGreeter"
    config:
      Name: bonjour
      punctuation: "!"
"#;

trait Greeter: Send + Sync {
  fn greet(&self, who: &str) -> String;
}

#[derive(Default)]
struct EnglishGreeter {
  name: String,
}

impl Provider for EnglishGreeter {
  fn name(&self) -> &str {
    &self.name
  }

  fn initialize(&mut self, name: &str, _config: &Config) -> Result<(), BoxError> {
    self.name = name.to_owned();
    Ok(())
  }
}

impl Greeter for EnglishGreeter {
  fn greet(&self, who: &str) -> String {
    format!("Hello, {}.", who)
  }
}

#[derive(Default)]
struct FrenchGreeter {
  name: String,
  punctuation: String,
}

impl Provider for FrenchGreeter {
  fn name(&self) -> &str {
    &self.name
  }

  fn initialize(&mut self, name: &str, config: &Config) -> Result<(), BoxError> {
    self.name = name.to_owned();
    self.punctuation = config.get_cloned_or("punctuation", ".".to_string());
    Ok(())
  }
}

impl Greeter for FrenchGreeter {
  fn greet(&self, who: &str) -> String {
    format!("Bonjour, {}{}", who, self.punctuation)
  }
}

fn main() -> Result<(), fibre_provider::Error> {
  let registry = Arc::new(Registry::new());
  registry.register(Registration::provider(EnglishGreeter::default).exposes(|g| g as Arc<dyn Greeter>));
  registry.register(Registration::provider(FrenchGreeter::default).exposes(|g| g as Arc<dyn Greeter>));

  // Without configuration the key is unknown.
  let key = TypeName::new("configured::Greeter");
  assert!(registry.provider_as::<dyn Greeter>(None, &key).is_none());

  // Loading settings for the key also drops the failure cached above.
  registry.load_yaml(CONFIG)?;

  let greeter = registry
    .provider_as::<dyn Greeter>(None, &key)
    .expect("configured greeter");
  println!("environment: {}", registry.environment());
  println!("region: {}", registry.get_value_string("region", "unknown"));
  println!("{}", greeter.greet("Fibre"));
  assert_eq!(greeter.greet("Fibre"), "Bonjour, Fibre!");
  Ok(())
}
