//! In-memory result store for one workflow run.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Captured block outputs keyed by label.
///
/// Each label keeps one entry per producing connection. Reading a label
/// concatenates its entries in connection declaration order, so a consumer of
/// a label produced by several blocks sees every producer's text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultStore {
  entries: HashMap<String, BTreeMap<usize, String>>,
}

impl ResultStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record the output of one connection. Returns the previous text for the
  /// same (label, connection) pair, if any.
  pub fn insert(&mut self, label: &str, connection: usize, text: String) -> Option<String> {
    self
      .entries
      .entry(label.to_string())
      .or_default()
      .insert(connection, text)
  }

  /// Text stored under a label.
  pub fn get(&self, label: &str) -> Option<String> {
    self
      .entries
      .get(label)
      .map(|producers| producers.values().map(String::as_str).collect())
  }

  pub fn contains(&self, label: &str) -> bool {
    self.entries.contains_key(label)
  }

  /// Text per producing connection, in declaration order.
  pub fn producers(&self, label: &str) -> Vec<(usize, &str)> {
    self
      .entries
      .get(label)
      .map(|p| p.iter().map(|(i, t)| (*i, t.as_str())).collect())
      .unwrap_or_default()
  }

  /// A copy holding only the given labels.
  pub fn subset<'a>(&self, labels: impl IntoIterator<Item = &'a str>) -> Self {
    let mut entries = HashMap::new();
    for label in labels {
      if let Some(producers) = self.entries.get(label) {
        entries.insert(label.to_string(), producers.clone());
      }
    }
    Self { entries }
  }

  pub fn labels(&self) -> impl Iterator<Item = &str> {
    self.entries.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_fan_in_concatenates_in_declaration_order() {
    let mut store = ResultStore::new();
    store.insert("x", 4, "second\n".to_string());
    store.insert("x", 1, "first\n".to_string());

    assert_eq!(store.get("x").as_deref(), Some("first\nsecond\n"));
    assert_eq!(store.producers("x"), vec![(1, "first\n"), (4, "second\n")]);
    assert_eq!(store.get("y"), None);
  }

  #[test]
  fn test_subset() {
    let mut store = ResultStore::new();
    store.insert("a", 0, "A".to_string());
    store.insert("b", 1, "B".to_string());

    let subset = store.subset(["a", "missing"]);
    assert_eq!(subset.len(), 1);
    assert!(subset.contains("a"));
    assert!(!subset.contains("b"));
  }

  #[test]
  fn test_insert_same_connection_replaces() {
    let mut store = ResultStore::new();
    assert_eq!(store.insert("a", 0, "old".to_string()), None);
    assert_eq!(store.insert("a", 0, "new".to_string()).as_deref(), Some("old"));
    assert_eq!(store.get("a").as_deref(), Some("new"));

    store.clear();
    assert!(store.is_empty());
  }
}
