pub mod entry;

use crate::types::StoredValue;
use entry::Entry;
use std::collections::HashMap;

/// Keyspace backing the in-memory transport.
#[derive(Debug, Default)]
pub struct Database {
    data: HashMap<String, Entry>,
}

impl Database {
    pub fn new() -> Self {
        Database {
            data: HashMap::new(),
        }
    }

    /// Get a value, performing lazy expiration.
    pub fn get(&mut self, key: &str) -> Option<&Entry> {
        self.expire_if_due(key);
        self.data.get(key)
    }

    /// Get a mutable value, performing lazy expiration.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.expire_if_due(key);
        self.data.get_mut(key)
    }

    pub fn set(&mut self, key: String, entry: Entry) {
        self.data.insert(key, entry);
    }

    /// Delete a key. Returns true if it existed (and had not expired).
    pub fn del(&mut self, key: &str) -> bool {
        self.expire_if_due(key);
        self.data.remove(key).is_some()
    }

    pub fn exists(&mut self, key: &str) -> bool {
        self.expire_if_due(key);
        self.data.contains_key(key)
    }

    /// Get the type of a key.
    pub fn key_type(&mut self, key: &str) -> Option<&'static str> {
        self.get(key).map(|e| e.value.type_name())
    }

    /// Fetch the value at `key`, inserting `init()` when the key is absent.
    pub fn get_or_insert_with(&mut self, key: &str, init: impl FnOnce() -> StoredValue) -> &mut StoredValue {
        self.expire_if_due(key);
        &mut self
            .data
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(init()))
            .value
    }

    /// Drop the key if it holds an empty set or hash.
    pub fn remove_if_empty(&mut self, key: &str) {
        if self
            .data
            .get(key)
            .is_some_and(|e| e.value.is_empty_collection())
        {
            self.data.remove(key);
        }
    }

    /// Number of keys (includes expired keys not yet removed).
    pub fn dbsize(&self) -> usize {
        self.data.len()
    }

    fn expire_if_due(&mut self, key: &str) {
        if self.data.get(key).is_some_and(|entry| entry.is_expired()) {
            self.data.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::rstring::StoredString;
    use crate::types::set::StoredSet;

    fn string(v: &str) -> StoredValue {
        StoredValue::String(StoredString::new(v.as_bytes().to_vec()))
    }

    #[test]
    fn test_set_get_del() {
        let mut db = Database::new();
        db.set("k".to_string(), Entry::new(string("v")));
        assert!(db.exists("k"));
        assert_eq!(db.key_type("k"), Some("string"));
        assert!(db.del("k"));
        assert!(!db.del("k"));
        assert!(db.get("k").is_none());
    }

    #[test]
    fn test_lazy_expiry() {
        let mut db = Database::new();
        db.set("k".to_string(), Entry::with_expiry(string("v"), 1));
        assert!(db.get("k").is_none());
        assert_eq!(db.dbsize(), 0);
    }

    #[test]
    fn test_remove_if_empty() {
        let mut db = Database::new();
        let value = db.get_or_insert_with("s", || StoredValue::Set(StoredSet::new()));
        assert_eq!(value.type_name(), "set");
        db.remove_if_empty("s");
        assert!(!db.exists("s"));
    }
}
