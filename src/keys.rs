/// Namespace prepended to every key before it reaches the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPrefix {
    prefix: String,
}

impl KeyPrefix {
    pub fn new(prefix: impl Into<String>) -> Self {
        KeyPrefix {
            prefix: prefix.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.prefix
    }

    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty()
    }

    /// Prefix a key.
    pub fn apply(&self, key: &str) -> String {
        let mut out = String::with_capacity(self.prefix.len() + key.len());
        out.push_str(&self.prefix);
        out.push_str(key);
        out
    }

    pub fn apply_all<K: AsRef<str>>(&self, keys: &[K]) -> Vec<String> {
        keys.iter().map(|k| self.apply(k.as_ref())).collect()
    }

    /// Remove the prefix from a stored key. None if the key is outside this namespace.
    pub fn strip<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.prefix.as_str())
    }
}

impl From<&str> for KeyPrefix {
    fn from(prefix: &str) -> Self {
        KeyPrefix::new(prefix)
    }
}

impl From<String> for KeyPrefix {
    fn from(prefix: String) -> Self {
        KeyPrefix::new(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply() {
        let prefix = KeyPrefix::new("app:");
        assert_eq!(prefix.apply("user:1"), "app:user:1");
        assert_eq!(prefix.apply_all(&["a", "b"]), vec!["app:a", "app:b"]);
    }

    #[test]
    fn test_empty_prefix_is_identity() {
        let prefix = KeyPrefix::default();
        assert!(prefix.is_empty());
        assert_eq!(prefix.apply("k"), "k");
        assert_eq!(prefix.strip("k"), Some("k"));
    }

    #[test]
    fn test_strip() {
        let prefix = KeyPrefix::new("app:");
        assert_eq!(prefix.strip("app:k"), Some("k"));
        assert_eq!(prefix.strip("other:k"), None);
    }
}
