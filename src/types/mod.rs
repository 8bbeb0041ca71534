pub mod hash;
pub mod rstring;
pub mod set;

/// A value held by the in-memory store.
#[derive(Debug, Clone)]
pub enum StoredValue {
    String(rstring::StoredString),
    Set(set::StoredSet),
    Hash(hash::StoredHash),
}

impl StoredValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            StoredValue::String(_) => "string",
            StoredValue::Set(_) => "set",
            StoredValue::Hash(_) => "hash",
        }
    }

    pub fn as_string(&self) -> Option<&rstring::StoredString> {
        match self {
            StoredValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&set::StoredSet> {
        match self {
            StoredValue::Set(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_set_mut(&mut self) -> Option<&mut set::StoredSet> {
        match self {
            StoredValue::Set(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_hash(&self) -> Option<&hash::StoredHash> {
        match self {
            StoredValue::Hash(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_hash_mut(&mut self) -> Option<&mut hash::StoredHash> {
        match self {
            StoredValue::Hash(h) => Some(h),
            _ => None,
        }
    }

    /// True for collection values that hold no elements. Redis never keeps
    /// such keys around.
    pub fn is_empty_collection(&self) -> bool {
        match self {
            StoredValue::String(_) => false,
            StoredValue::Set(s) => s.is_empty(),
            StoredValue::Hash(h) => h.is_empty(),
        }
    }
}
