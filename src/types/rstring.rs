/// Binary-safe string value, stored as raw bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredString {
    data: Vec<u8>,
}

impl StoredString {
    pub fn new(data: Vec<u8>) -> Self {
        StoredString { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl From<&[u8]> for StoredString {
    fn from(data: &[u8]) -> Self {
        StoredString::new(data.to_vec())
    }
}
