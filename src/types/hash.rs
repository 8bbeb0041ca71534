use std::collections::HashMap;

/// Field-to-value map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredHash {
    data: HashMap<String, Vec<u8>>,
}

impl StoredHash {
    pub fn new() -> Self {
        StoredHash {
            data: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&Vec<u8>> {
        self.data.get(field)
    }

    /// Set a field. Returns true if the field is new (didn't exist before).
    pub fn set(&mut self, field: String, value: Vec<u8>) -> bool {
        self.data.insert(field, value).is_none()
    }

    pub fn del(&mut self, field: &str) -> bool {
        self.data.remove(field).is_some()
    }

    pub fn exists(&self, field: &str) -> bool {
        self.data.contains_key(field)
    }

    pub fn entries(&self) -> Vec<(String, Vec<u8>)> {
        self.data
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
