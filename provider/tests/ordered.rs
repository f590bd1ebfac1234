use fibre_provider::{OrderedMap, Probe, NOT_FOUND};
use pretty_assertions::assert_eq;

fn fruit_map(keys: &[&str]) -> OrderedMap<usize> {
  keys.iter().enumerate().map(|(i, key)| (*key, i)).collect()
}

#[test]
fn test_sorted_iteration_ignores_insertion_order() {
  // Arrange
  let forward = fruit_map(&["pear", "apple", "fig", "banana"]);
  let backward = fruit_map(&["banana", "fig", "apple", "pear"]);

  // Act
  let forward_keys: Vec<&str> = forward.sorted_keys().collect();
  let backward_keys: Vec<&str> = backward.sorted_keys().collect();

  // Assert
  assert_eq!(forward_keys, vec!["apple", "banana", "fig", "pear"]);
  assert_eq!(forward_keys, backward_keys);
}

#[test]
fn test_sorted_iteration_stays_sorted_after_mutation() {
  // Arrange
  let mut map = fruit_map(&["pear", "apple", "fig", "banana"]);

  // Act
  map.remove("apple");
  map.insert("cherry", 10);
  map.insert("fig", 11);
  map.remove("missing");

  // Assert
  let keys: Vec<&str> = map.sorted_keys().collect();
  assert_eq!(keys, vec!["banana", "cherry", "fig", "pear"]);
  assert_eq!(map.get("fig"), Some(&11));
  assert_eq!(map.len(), 4);
}

#[test]
fn test_insertion_order_is_kept_by_iter() {
  // Arrange
  let mut map = fruit_map(&["pear", "apple", "fig"]);

  // Act
  map.insert("apple", 99);

  // Assert
  let keys: Vec<&str> = map.keys().collect();
  assert_eq!(keys, vec!["pear", "apple", "fig"]);
  assert_eq!(map.get("apple"), Some(&99));
}

#[test]
fn test_missing_key_is_distinct_from_stored_empty_value() {
  // Arrange
  let mut map: OrderedMap<String> = OrderedMap::new();
  map.insert("empty", String::new());

  // Act
  let stored = map.find_value(&["empty", ""]);
  let missing = map.find_value(&["absent"]);

  // Assert
  assert_eq!(stored, Probe::Found(&String::new()));
  assert!(stored.is_found());
  assert_eq!(stored.sentinel(), None);
  assert!(missing.is_not_found());
  assert_eq!(missing.sentinel(), Some(NOT_FOUND));
  assert_eq!(missing.found(), None);
}

#[test]
fn test_find_value_concatenates_parts() {
  // Arrange
  let mut map: OrderedMap<u32> = OrderedMap::new();
  map.insert("primary:app::Sink", 1);
  map.insert("primary", 2);

  // Act & Assert
  assert_eq!(map.find_value(&["primary", ":", "app::Sink"]).found(), Some(&1));
  assert_eq!(map.find_value(&["pri", "mary"]).found(), Some(&2));
  assert!(map.find_value(&["primary", ":"]).is_not_found());
  assert!(map.find_value(&[]).is_not_found());
}

#[test]
fn test_get_or_and_get_cloned_or_fall_back_on_missing_keys() {
  // Arrange
  let mut config: OrderedMap<String> = OrderedMap::new();
  config.insert("path", "/var/log/app.log".to_string());
  let fallback = "stdout".to_string();

  // Act & Assert
  assert_eq!(config.get_or("path", &fallback), "/var/log/app.log");
  assert_eq!(config.get_or("level", &fallback), "stdout");
  assert_eq!(config.get_cloned_or("level", "info".to_string()), "info");
}

#[test]
fn test_positional_add_sorts_in_insertion_order() {
  // Arrange
  let mut map: OrderedMap<&str> = OrderedMap::new();

  // Act
  for name in ["third", "first", "second"] {
    map.add(name);
  }
  for _ in 0..10 {
    map.add("filler");
  }

  // Assert
  let values: Vec<&str> = map.sorted_values().take(3).copied().collect();
  assert_eq!(values, vec!["third", "first", "second"]);
  assert_eq!(map.len(), 13);
}

#[test]
fn test_remove_prefix_and_retain() {
  // Arrange
  let mut map = fruit_map(&["a:one", "a:two", "b:one", "ab"]);

  // Act
  let removed = map.remove_prefix("a:");
  map.retain(|key, _| key != "ab");

  // Assert
  assert_eq!(removed, 2);
  let keys: Vec<&str> = map.sorted_keys().collect();
  assert_eq!(keys, vec!["b:one"]);
}

#[test]
fn test_drain_where_hands_back_removed_entries() {
  // Arrange
  let mut map = fruit_map(&["pear", "apple", "fig", "banana"]);

  // Act
  let drained = map.drain_where(|_, index| index % 2 == 1);

  // Assert
  assert_eq!(drained, vec![("apple".to_string(), 1), ("banana".to_string(), 3)]);
  let keys: Vec<&str> = map.sorted_keys().collect();
  assert_eq!(keys, vec!["fig", "pear"]);
  assert!(map.find_value(&["ap", "ple"]).is_not_found());
  assert!(map.drain_where(|_, _| false).is_empty());
}

#[test]
fn test_equality_ignores_insertion_order() {
  let left = fruit_map(&["x", "y"]);
  let mut right: OrderedMap<usize> = OrderedMap::new();
  right.insert("y", 1);
  right.insert("x", 0);

  assert_eq!(left, right);
  right.clear();
  assert!(right.is_empty());
  assert_ne!(left, right);
}
