use std::collections::HashSet;

/// Unordered set of binary members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredSet {
    data: HashSet<Vec<u8>>,
}

impl StoredSet {
    pub fn new() -> Self {
        StoredSet {
            data: HashSet::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Add a member. Returns true if the member was new.
    pub fn add(&mut self, member: Vec<u8>) -> bool {
        self.data.insert(member)
    }

    pub fn remove(&mut self, member: &[u8]) -> bool {
        self.data.remove(member)
    }

    pub fn contains(&self, member: &[u8]) -> bool {
        self.data.contains(member)
    }

    pub fn members(&self) -> Vec<Vec<u8>> {
        self.data.iter().cloned().collect()
    }

    pub fn union(&self, other: &StoredSet) -> StoredSet {
        StoredSet {
            data: self.data.union(&other.data).cloned().collect(),
        }
    }

    pub fn intersect(&self, other: &StoredSet) -> StoredSet {
        StoredSet {
            data: self.data.intersection(&other.data).cloned().collect(),
        }
    }

    pub fn difference(&self, other: &StoredSet) -> StoredSet {
        StoredSet {
            data: self.data.difference(&other.data).cloned().collect(),
        }
    }

    pub fn random_member(&self) -> Option<&Vec<u8>> {
        use rand::seq::IteratorRandom;
        let mut rng = rand::thread_rng();
        self.data.iter().choose(&mut rng)
    }
}

impl FromIterator<Vec<u8>> for StoredSet {
    fn from_iter<I: IntoIterator<Item = Vec<u8>>>(iter: I) -> Self {
        StoredSet {
            data: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(members: &[&str]) -> StoredSet {
        members.iter().map(|m| m.as_bytes().to_vec()).collect()
    }

    fn sorted(set: &StoredSet) -> Vec<Vec<u8>> {
        let mut members = set.members();
        members.sort();
        members
    }

    #[test]
    fn test_add_remove() {
        let mut set = StoredSet::new();
        assert!(set.add(b"a".to_vec()));
        assert!(!set.add(b"a".to_vec()));
        assert!(set.contains(b"a"));
        assert!(set.remove(b"a"));
        assert!(!set.remove(b"a"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_combinators() {
        let a = set_of(&["1", "2", "3"]);
        let b = set_of(&["3", "4"]);
        assert_eq!(sorted(&a.union(&b)), sorted(&set_of(&["1", "2", "3", "4"])));
        assert_eq!(sorted(&a.intersect(&b)), sorted(&set_of(&["3"])));
        assert_eq!(sorted(&a.difference(&b)), sorted(&set_of(&["1", "2"])));
    }

    #[test]
    fn test_random_member() {
        let set = set_of(&["x", "y"]);
        let picked = set.random_member().unwrap();
        assert!(set.contains(picked));
        assert!(StoredSet::new().random_member().is_none());
    }
}
