use fibre_provider::{BoxError, Config, MultiResolver, Provider, Registration, Registry, TypeName};
use std::sync::Arc;

// --- Abstraction and Implementations ---
trait LogSink: Send + Sync {
  fn write(&self, line: &str) -> String;
}

#[derive(Default)]
struct ConsoleSink {
  name: String,
}

impl Provider for ConsoleSink {
  fn name(&self) -> &str {
    &self.name
  }

  fn initialize(&mut self, name: &str, _config: &Config) -> Result<(), BoxError> {
    self.name = name.to_owned();
    Ok(())
  }
}

impl LogSink for ConsoleSink {
  fn write(&self, line: &str) -> String {
    format!("[console/{}] {}", self.name, line)
  }
}

#[derive(Default)]
struct AuditSink {
  name: String,
}

impl Provider for AuditSink {
  fn name(&self) -> &str {
    &self.name
  }

  fn initialize(&mut self, name: &str, _config: &Config) -> Result<(), BoxError> {
    self.name = name.to_owned();
    Ok(())
  }
}

impl LogSink for AuditSink {
  fn write(&self, line: &str) -> String {
    format!("[audit/{}] {}", self.name, line)
  }
}

fn main() {
  // --- Registration ---
  let registry = Arc::new(Registry::new());
  registry.register(Registration::provider(ConsoleSink::default).exposes(|sink| sink as Arc<dyn LogSink>));
  registry.register(Registration::provider(AuditSink::default).exposes(|sink| sink as Arc<dyn LogSink>));

  // Every sink the subsystem fans out to. Adding a type twice is a no-op.
  let sinks = MultiResolver::new(registry);
  sinks.add(TypeName::of::<ConsoleSink>());
  sinks.add(TypeName::of::<AuditSink>());
  sinks.add(TypeName::of::<ConsoleSink>());

  // --- Resolution ---
  let written: Vec<String> = sinks
    .list_as::<dyn LogSink>()
    .expect("every sink exposes LogSink")
    .iter()
    .map(|sink| sink.write("user logged in"))
    .collect();

  for line in &written {
    println!("{}", line);
  }
  assert_eq!(written.len(), 2);
}
