//! An ordered, string-keyed map that doubles as an append-only list.
//!
//! `OrderedMap` keeps two views over the same entries:
//!
//! - the **raw view** (`keys`, `values`), roughly insertion order, which makes no
//!   promise about position once an entry has been removed;
//! - the **sorted view** (`sorted_keys`, `sorted_values`, `iter`), ordered
//!   lexicographically by key bytes. Every consumer that needs determinism
//!   iterates this view.
//!
//! The sorted view is maintained eagerly on every mutation, so reading it never
//! allocates. Lookups, including the composite [`OrderedMap::find_value`] probe,
//! are binary searches over that view.

use std::cmp::Ordering;
use std::fmt;
use std::mem;

/// Reserved identifier reported by a composite probe that did not match any key.
///
/// No stored value can ever compare equal to it: a miss is a distinct
/// [`Probe::NotFound`] variant, and this identifier only names that variant in
/// diagnostics.
pub const NOT_FOUND: u128 = 0x6e6f_7466_6f75_6e64_a5c3_19e2_7b40_d18f;

/// Outcome of a composite lookup.
///
/// `Found` carries the stored value even when that value is itself "empty"
/// (an empty string, `None`, ...). Only `NotFound` means the key was never set.
pub enum Probe<'a, V> {
  Found(&'a V),
  NotFound,
}

impl<'a, V> Probe<'a, V> {
  /// Converts the probe into an `Option`, losing nothing: `None` only on a miss.
  pub fn found(self) -> Option<&'a V> {
    match self {
      Probe::Found(value) => Some(value),
      Probe::NotFound => None,
    }
  }

  pub fn is_found(&self) -> bool {
    matches!(self, Probe::Found(_))
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Probe::NotFound)
  }

  /// The sentinel identifier on a miss, `None` on a hit.
  pub fn sentinel(&self) -> Option<u128> {
    match self {
      Probe::Found(_) => None,
      Probe::NotFound => Some(NOT_FOUND),
    }
  }
}

impl<V> Clone for Probe<'_, V> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<V> Copy for Probe<'_, V> {}

impl<V: PartialEq> PartialEq for Probe<'_, V> {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Probe::Found(a), Probe::Found(b)) => a == b,
      (Probe::NotFound, Probe::NotFound) => true,
      _ => false,
    }
  }
}

impl<V: fmt::Debug> fmt::Debug for Probe<'_, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Probe::Found(value) => f.debug_tuple("Found").field(value).finish(),
      Probe::NotFound => write!(f, "NotFound({:#034x})", NOT_FOUND),
    }
  }
}

/// A string-keyed map with a deterministic, lexicographically sorted view.
#[derive(Clone)]
pub struct OrderedMap<V> {
  entries: Vec<(String, V)>,
  // Indices into `entries`, ordered by key.
  sorted: Vec<usize>,
  next_position: u64,
}

impl<V> Default for OrderedMap<V> {
  fn default() -> Self {
    Self {
      entries: Vec::new(),
      sorted: Vec::new(),
      next_position: 0,
    }
  }
}

impl<V> OrderedMap<V> {
  /// Creates a new, empty `OrderedMap`.
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      entries: Vec::with_capacity(capacity),
      sorted: Vec::with_capacity(capacity),
      next_position: 0,
    }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  fn search(&self, key: &str) -> Result<usize, usize> {
    self
      .sorted
      .binary_search_by(|&slot| self.entries[slot].0.as_str().cmp(key))
  }

  fn search_parts(&self, parts: &[&str]) -> Result<usize, usize> {
    self
      .sorted
      .binary_search_by(|&slot| compare_parts(&self.entries[slot].0, parts))
  }

  /// Inserts `value` under `key`, returning the previous value if the key existed.
  ///
  /// Overwriting keeps the entry's place in the sorted view.
  pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
    let key = key.into();
    match self.search(&key) {
      Ok(pos) => {
        let slot = self.sorted[pos];
        Some(mem::replace(&mut self.entries[slot].1, value))
      }
      Err(pos) => {
        self.entries.push((key, value));
        self.sorted.insert(pos, self.entries.len() - 1);
        None
      }
    }
  }

  /// Appends `value` under a synthesized positional key and returns that key.
  ///
  /// Positional keys are zero-padded counters, so values added this way appear
  /// in the sorted view in the order they were added.
  pub fn add(&mut self, value: V) -> String {
    let key = loop {
      let candidate = format!("{:020}", self.next_position);
      self.next_position += 1;
      if self.search(&candidate).is_err() {
        break candidate;
      }
    };
    self.insert(key.clone(), value);
    key
  }

  pub fn get(&self, key: &str) -> Option<&V> {
    let pos = self.search(key).ok()?;
    Some(&self.entries[self.sorted[pos]].1)
  }

  pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
    let pos = self.search(key).ok()?;
    let slot = self.sorted[pos];
    Some(&mut self.entries[slot].1)
  }

  /// Returns the value under `key`, or `default` when the key is absent.
  pub fn get_or<'a>(&'a self, key: &str, default: &'a V) -> &'a V {
    self.get(key).unwrap_or(default)
  }

  /// Returns a clone of the value under `key`, or `default` when the key is absent.
  pub fn get_cloned_or(&self, key: &str, default: V) -> V
  where
    V: Clone,
  {
    self.get(key).cloned().unwrap_or(default)
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.search(key).is_ok()
  }

  /// Looks up the entry whose key equals the concatenation of `parts`.
  ///
  /// The concatenated key is never built; the probe compares each stored key
  /// against the parts piecewise.
  pub fn find_value(&self, parts: &[&str]) -> Probe<'_, V> {
    match self.search_parts(parts) {
      Ok(pos) => Probe::Found(&self.entries[self.sorted[pos]].1),
      Err(_) => Probe::NotFound,
    }
  }

  pub fn remove(&mut self, key: &str) -> Option<V> {
    let pos = self.search(key).ok()?;
    let slot = self.sorted.remove(pos);
    let last = self.entries.len() - 1;
    let (_, value) = self.entries.swap_remove(slot);
    if slot != last {
      // The former last entry now lives at `slot`.
      if let Some(moved) = self.sorted.iter_mut().find(|index| **index == last) {
        *moved = slot;
      }
    }
    Some(value)
  }

  /// Keeps only the entries for which `keep` returns `true`.
  pub fn retain(&mut self, mut keep: impl FnMut(&str, &V) -> bool) {
    let before = self.entries.len();
    self.entries.retain(|(key, value)| keep(key, value));
    if self.entries.len() != before {
      self.rebuild_sorted();
    }
  }

  /// Removes the entries for which `remove` returns `true` and hands them back.
  pub fn drain_where(&mut self, mut remove: impl FnMut(&str, &V) -> bool) -> Vec<(String, V)> {
    let (removed, kept): (Vec<_>, Vec<_>) = mem::take(&mut self.entries)
      .into_iter()
      .partition(|(key, value)| remove(key, value));
    self.entries = kept;
    if !removed.is_empty() {
      self.rebuild_sorted();
    }
    removed
  }

  /// Removes every entry whose key starts with `prefix`, returning how many went.
  pub fn remove_prefix(&mut self, prefix: &str) -> usize {
    let before = self.entries.len();
    self.retain(|key, _| !key.starts_with(prefix));
    before - self.entries.len()
  }

  pub fn clear(&mut self) {
    self.entries.clear();
    self.sorted.clear();
  }

  fn rebuild_sorted(&mut self) {
    let entries = &self.entries;
    self.sorted = (0..entries.len()).collect();
    self.sorted.sort_unstable_by(|&a, &b| entries[a].0.cmp(&entries[b].0));
  }

  /// Keys in the raw view.
  pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
    self.entries.iter().map(|(key, _)| key.as_str())
  }

  /// Values in the raw view.
  pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
    self.entries.iter().map(|(_, value)| value)
  }

  /// Keys in lexicographic order.
  pub fn sorted_keys(&self) -> impl DoubleEndedIterator<Item = &str> + ExactSizeIterator + '_ {
    self
      .sorted
      .iter()
      .map(move |&slot| self.entries[slot].0.as_str())
  }

  /// Values ordered by their keys.
  pub fn sorted_values(&self) -> impl DoubleEndedIterator<Item = &V> + ExactSizeIterator + '_ {
    self.sorted.iter().map(move |&slot| &self.entries[slot].1)
  }

  /// `(key, value)` pairs in sorted-key order.
  pub fn iter(&self) -> Iter<'_, V> {
    Iter {
      map: self,
      inner: self.sorted.iter(),
    }
  }
}

/// Sorted-order iterator over an [`OrderedMap`].
pub struct Iter<'a, V> {
  map: &'a OrderedMap<V>,
  inner: std::slice::Iter<'a, usize>,
}

impl<'a, V> Iterator for Iter<'a, V> {
  type Item = (&'a str, &'a V);

  fn next(&mut self) -> Option<Self::Item> {
    let slot = *self.inner.next()?;
    let (key, value) = &self.map.entries[slot];
    Some((key.as_str(), value))
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    self.inner.size_hint()
  }
}

impl<V> DoubleEndedIterator for Iter<'_, V> {
  fn next_back(&mut self) -> Option<Self::Item> {
    let slot = *self.inner.next_back()?;
    let (key, value) = &self.map.entries[slot];
    Some((key.as_str(), value))
  }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

impl<'a, V> IntoIterator for &'a OrderedMap<V> {
  type Item = (&'a str, &'a V);
  type IntoIter = Iter<'a, V>;

  fn into_iter(self) -> Self::IntoIter {
    self.iter()
  }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedMap<V> {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    let mut map = OrderedMap::new();
    map.extend(iter);
    map
  }
}

impl<K: Into<String>, V> Extend<(K, V)> for OrderedMap<V> {
  fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
    for (key, value) in iter {
      self.insert(key, value);
    }
  }
}

impl<V: PartialEq> PartialEq for OrderedMap<V> {
  fn eq(&self, other: &Self) -> bool {
    self.len() == other.len() && self.iter().eq(other.iter())
  }
}

impl<V: Eq> Eq for OrderedMap<V> {}

impl<V: fmt::Debug> fmt::Debug for OrderedMap<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_map().entries(self.iter()).finish()
  }
}

// Orders `key` against the concatenation of `parts`, byte by byte.
fn compare_parts(key: &str, parts: &[&str]) -> Ordering {
  let mut rest = key.as_bytes();
  for part in parts {
    let part = part.as_bytes();
    let shared = rest.len().min(part.len());
    match rest[..shared].cmp(&part[..shared]) {
      Ordering::Equal => {}
      unequal => return unequal,
    }
    if rest.len() < part.len() {
      return Ordering::Less;
    }
    rest = &rest[shared..];
  }
  if rest.is_empty() {
    Ordering::Equal
  } else {
    Ordering::Greater
  }
}
