mod common;

use common::*;
use fibre_provider::{Binding, Error, KeyedResolver, MultiResolver, Provider, SingleResolver, TypeName};
use pretty_assertions::assert_eq;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

// --- Single Resolver ---

#[test]
fn test_single_prefers_the_most_recent_registration() {
  // Arrange
  let resolver = SingleResolver::new(sink_registry());
  resolver.set(type_of::<ConsoleSink>());
  resolver.set(type_of::<MemorySink>());

  // Act
  let sink = resolver.get_as::<dyn Sink>().unwrap();

  // Assert
  assert_eq!(sink.label(), "memory:Default");
  assert_eq!(
    resolver.registrations(),
    vec![type_of::<ConsoleSink>(), type_of::<MemorySink>()]
  );
}

#[test]
fn test_single_falls_back_past_failing_registrations() {
  // Arrange
  let registry = sink_registry();
  let attempts = register_failing::<FileSink>(&registry);
  let resolver = SingleResolver::new(registry);
  resolver.set(type_of::<ConsoleSink>());
  resolver.set(type_of::<BrokenSink>());
  resolver.set(type_of::<FileSink>());

  // Act
  let first = resolver.get().unwrap().unwrap();
  let second = resolver.get().unwrap().unwrap();

  // Assert
  assert!(first.downcast_ref::<ConsoleSink>().is_some());
  assert!(Arc::ptr_eq(&first, &second));
  assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[test]
fn test_single_falls_back_past_empty_registrations() {
  // Arrange
  let registry = sink_registry();
  register_empty::<MemorySink>(&registry);
  let resolver = SingleResolver::new(registry);
  resolver.set(type_of::<FileSink>());
  resolver.set(type_of::<MemorySink>());

  // Act
  let sink = resolver.get_as::<dyn Sink>().unwrap();

  // Assert
  assert_eq!(sink.label(), "file:Default:stdout");
}

#[test]
fn test_single_rejects_a_registration_that_is_not_a_provider() {
  // Arrange
  let resolver = SingleResolver::new(sink_registry());
  resolver.set(type_of::<ConsoleSink>());
  resolver.set(type_of::<PlainObject>());

  // Act
  let result = resolver.get();

  // Assert
  assert!(matches!(result, Err(Error::NotAProvider { .. })));
}

#[test]
fn test_single_set_replaces_the_resolved_provider() {
  // Arrange
  let resolver = SingleResolver::new(sink_registry());
  resolver.set(type_of::<ConsoleSink>());
  let before = resolver.get().unwrap().unwrap();

  // Act
  resolver.set(type_of::<MemorySink>());
  let after = resolver.get().unwrap().unwrap();

  // Assert
  assert!(before.downcast_ref::<ConsoleSink>().is_some());
  assert!(after.downcast_ref::<MemorySink>().is_some());
}

#[test]
fn test_single_without_usable_registrations() {
  // Arrange
  let resolver = SingleResolver::new(sink_registry());

  // Act & Assert
  assert!(resolver.get().unwrap().is_none());
  assert!(matches!(resolver.get_as::<dyn Sink>(), Err(Error::Unresolved { .. })));

  resolver.set(type_of::<MutedSink>());
  match resolver.get_as::<dyn Sink>() {
    Err(error @ Error::MissingCapability { .. }) => {
      assert!(error.to_string().contains("needs to implement"));
    }
    Err(other) => panic!("expected MissingCapability, got {other:?}"),
    Ok(_) => panic!("MutedSink does not expose Sink"),
  }
}

// --- Multi Resolver ---

#[test]
fn test_multi_lists_each_type_once_in_sorted_order() {
  // Arrange
  let registry = sink_registry();
  let resolver = MultiResolver::new(registry.clone());
  resolver.add(type_of::<MemorySink>());
  resolver.add(type_of::<ConsoleSink>());
  resolver.add(type_of::<FileSink>());
  resolver.add(type_of::<ConsoleSink>());

  // Act
  let providers = resolver.list();

  // Assert
  let mut expected = vec![type_of::<ConsoleSink>(), type_of::<FileSink>(), type_of::<MemorySink>()];
  expected.sort_by(|a, b| a.as_str().cmp(b.as_str()));
  assert_eq!(resolver.types(), expected);
  assert_eq!(providers.len(), 3);
  for (provider, type_name) in providers.iter().zip(&expected) {
    let singleton = registry.create_singleton_provider(type_name).unwrap();
    assert!(Arc::ptr_eq(provider, &singleton));
  }
}

#[test]
fn test_multi_list_is_stable_across_calls() {
  // Arrange
  let resolver = MultiResolver::new(sink_registry());
  resolver.add(type_of::<ConsoleSink>());
  resolver.add(type_of::<MemorySink>());

  // Act
  let first = resolver.list();
  let second = resolver.list();

  // Assert
  assert_eq!(first.len(), second.len());
  assert!(first.iter().zip(&second).all(|(a, b)| Arc::ptr_eq(a, b)));
}

#[test]
fn test_multi_concurrent_adds_keep_each_type_once() {
  // Arrange
  let registry = sink_registry();
  let resolver = MultiResolver::new(registry.clone());
  let types = [type_of::<ConsoleSink>(), type_of::<FileSink>(), type_of::<MemorySink>()];

  // Act
  let listed: Vec<Vec<Arc<dyn Provider>>> = thread::scope(|scope| {
    let handles: Vec<_> = (0..8)
      .map(|_| {
        scope.spawn(|| {
          for type_name in &types {
            resolver.add(type_name.clone());
          }
          resolver.list()
        })
      })
      .collect();
    handles.into_iter().map(|handle| handle.join().unwrap()).collect()
  });

  // Assert
  assert_eq!(resolver.len(), 3);
  let providers = resolver.list();
  assert_eq!(providers.len(), 3);
  for (provider, type_name) in providers.iter().zip(resolver.types()) {
    let singleton = registry.create_singleton_provider(&type_name).unwrap();
    assert!(Arc::ptr_eq(provider, &singleton));
  }
  for seen in &listed {
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().zip(&providers).all(|(a, b)| Arc::ptr_eq(a, b)));
  }
}

#[test]
fn test_multi_skips_providers_that_cannot_be_built() {
  // Arrange
  let resolver = MultiResolver::new(sink_registry());
  resolver.add(type_of::<BrokenSink>());
  resolver.add(type_of::<MemorySink>());
  resolver.add(TypeName::new("app::NotRegistered"));

  // Act
  let sinks = resolver.list_as::<dyn Sink>().unwrap();

  // Assert
  assert_eq!(resolver.len(), 3);
  assert_eq!(labels(&sinks), vec!["memory:Default".to_string()]);
}

#[test]
fn test_multi_list_as_fails_on_a_provider_without_the_capability() {
  // Arrange
  let resolver = MultiResolver::new(sink_registry());
  resolver.add(type_of::<MemorySink>());
  resolver.add(type_of::<MutedSink>());

  // Act
  let result = resolver.list_as::<dyn Sink>();

  // Assert
  assert!(matches!(result, Err(Error::MissingCapability { .. })));
  resolver.clear();
  assert!(resolver.is_empty());
  assert!(resolver.list().is_empty());
}

// --- Keyed Resolver ---

#[test]
fn test_keyed_explicit_key_wins() {
  // Arrange
  let resolver = KeyedResolver::with_default(sink_registry(), type_of::<ConsoleSink>());
  resolver.add("audit", type_of::<FileSink>());

  // Act
  let sink = resolver.get_as::<dyn Sink>(Some("audit"), &type_of::<dyn Sink>()).unwrap();

  // Assert
  assert_eq!(sink.label(), "file:Default:stdout");
}

#[test]
fn test_keyed_removed_key_falls_through_to_the_caller_type() {
  // Arrange
  let resolver = KeyedResolver::new(sink_registry());
  resolver.add("K", type_of::<ConsoleSink>());
  resolver.add("app::Billing", type_of::<MemorySink>());

  // Act
  resolver.add("K", Binding::Remove);
  let provider = resolver.get(Some("K"), &TypeName::new("app::Billing")).unwrap();

  // Assert
  assert!(resolver.binding("K").is_none());
  assert!(provider.downcast_ref::<MemorySink>().is_some());
}

#[test]
fn test_keyed_binding_to_none_removes_the_key() {
  let resolver = KeyedResolver::new(sink_registry());
  resolver.add("K", type_of::<ConsoleSink>());

  resolver.add("K", None::<TypeName>);

  assert_eq!(resolver.binding("K"), None);
  assert!(resolver.get(Some("K"), &TypeName::new("app::Billing")).is_none());
}

#[test]
fn test_keyed_stage_order() {
  // Arrange
  let resolver = KeyedResolver::with_default(sink_registry(), type_of::<ConsoleSink>());
  let caller = TypeName::new("app::Billing");

  // Act & Assert
  // Hard default.
  let provider = resolver.get(Some("unbound"), &caller).unwrap();
  assert!(provider.downcast_ref::<ConsoleSink>().is_some());

  // Catch-all beats the hard default.
  resolver.add_default(type_of::<FileSink>());
  let provider = resolver.get(Some("unbound"), &caller).unwrap();
  assert!(provider.downcast_ref::<FileSink>().is_some());

  // The caller's type beats the catch-all.
  resolver.add(caller.as_str(), type_of::<MemorySink>());
  let provider = resolver.get(None, &caller).unwrap();
  assert!(provider.downcast_ref::<MemorySink>().is_some());
}

#[test]
fn test_keyed_stage_that_cannot_build_falls_through() {
  // Arrange
  let resolver = KeyedResolver::with_default(sink_registry(), type_of::<MemorySink>());
  resolver.add("K", type_of::<BrokenSink>());

  // Act
  let provider = resolver.get(Some("K"), &TypeName::new("app::Billing")).unwrap();

  // Assert
  assert!(provider.downcast_ref::<MemorySink>().is_some());
}

#[test]
fn test_keyed_with_nothing_resolvable() {
  let resolver = KeyedResolver::new(sink_registry());

  assert!(resolver.get(Some("K"), &TypeName::new("app::Billing")).is_none());
  assert!(matches!(
    resolver.get_as::<dyn Sink>(None, &TypeName::new("app::Billing")),
    Err(Error::Unresolved { .. })
  ));
}

#[test]
fn test_keyed_by_name_resolves_named_instances() {
  // Arrange
  let resolver = KeyedResolver::with_default(sink_registry(), type_of::<MemorySink>());
  let caller = type_of::<dyn Sink>();
  resolver.add(format!("audit:{}", caller), type_of::<FileSink>());

  // Act
  let audit = resolver.get_by_name_as::<dyn Sink>("audit", &caller).unwrap();
  let scratch = resolver.get_by_name("scratch", &caller).unwrap();
  let scratch_again = resolver.get_by_name("scratch", &caller).unwrap();

  // Assert
  assert_eq!(audit.label(), "file:audit:stdout");
  assert_eq!(scratch.name(), "scratch");
  assert!(scratch.downcast_ref::<MemorySink>().is_some());
  assert!(Arc::ptr_eq(&scratch, &scratch_again));
}

#[test]
fn test_keyed_shares_registry_singletons() {
  // Arrange
  let registry = sink_registry();
  let resolver = KeyedResolver::with_default(registry.clone(), type_of::<ConsoleSink>());

  // Act
  let resolved = resolver.get(None, &type_of::<dyn Sink>()).unwrap();

  // Assert
  let singleton = registry.create_singleton_provider(&type_of::<ConsoleSink>()).unwrap();
  assert!(Arc::ptr_eq(&resolved, &singleton));
  assert_eq!(resolver.default_type(), Some(&type_of::<ConsoleSink>()));
}
