use fibre_provider::{resolve_from, BoxError, Config, KeyedResolver, Provider, Registration, Registry, Settings, TypeName};
use std::sync::Arc;

// --- Abstraction and Implementations ---
trait MessageSender: Send + Sync {
  fn send(&self, to: &str, message: &str) -> String;
}

#[derive(Default)]
struct EmailSender {
  name: String,
  relay: String,
}

impl Provider for EmailSender {
  fn name(&self) -> &str {
    &self.name
  }

  fn initialize(&mut self, name: &str, config: &Config) -> Result<(), BoxError> {
    self.name = name.to_owned();
    self.relay = config.get_cloned_or("relay", "localhost".to_string());
    Ok(())
  }
}

impl MessageSender for EmailSender {
  fn send(&self, to: &str, message: &str) -> String {
    format!("Sending email to {} via {}: '{}'", to, self.relay, message)
  }
}

#[derive(Default)]
struct SmsSender {
  name: String,
}

impl Provider for SmsSender {
  fn name(&self) -> &str {
    &self.name
  }

  fn initialize(&mut self, name: &str, _config: &Config) -> Result<(), BoxError> {
    self.name = name.to_owned();
    Ok(())
  }
}

impl MessageSender for SmsSender {
  fn send(&self, to: &str, message: &str) -> String {
    format!("Sending SMS to {}: '{}'", to, message)
  }
}

fn main() {
  // --- Registration ---
  let registry = Arc::new(Registry::new());
  registry.register(Registration::provider(EmailSender::default).exposes(|sender| sender as Arc<dyn MessageSender>));
  registry.register(Registration::provider(SmsSender::default).exposes(|sender| sender as Arc<dyn MessageSender>));

  // Email unless a key says otherwise.
  let senders = KeyedResolver::with_default(registry.clone(), TypeName::of::<EmailSender>());
  senders.add("alerts", TypeName::of::<SmsSender>());

  // Start-up configuration for the email provider.
  registry.set_setting(
    TypeName::of::<EmailSender>().as_str(),
    Settings::of::<EmailSender>().with_config_value("relay", "smtp.example.com"),
  );

  // --- Resolution ---
  let caller = TypeName::of::<dyn MessageSender>();
  let newsletter = senders.get_as::<dyn MessageSender>(Some("newsletter"), &caller).unwrap();
  let alerts = senders.get_as::<dyn MessageSender>(Some("alerts"), &caller).unwrap();

  let result1 = newsletter.send("test@example.com", "Hello from Fibre!");
  let result2 = alerts.send("+123456789", "Disk almost full");
  println!("{}", result1);
  println!("{}", result2);
  assert!(result1.contains("smtp.example.com"));
  assert!(result2.contains("SMS"));

  // The same singleton, reached directly.
  let email = resolve_from!(registry, EmailSender);
  println!("Email provider instance: {}", email.name());
}
