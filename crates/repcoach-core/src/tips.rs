//! Ordered, duplicate-free coaching tips.

use indexmap::IndexSet;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Insertion-ordered set of tip strings with O(1) membership.
/// Equality is order-sensitive.
#[derive(Debug, Clone, Default)]
pub struct TipSet {
    tips: IndexSet<String>,
}

impl TipSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, tip: &str) -> bool {
        self.tips.contains(tip)
    }

    /// Adds `tip` unless already present. Returns true if it was added.
    pub fn insert(&mut self, tip: &str) -> bool {
        if self.tips.contains(tip) {
            return false;
        }
        self.tips.insert(tip.to_string())
    }

    /// Removes `tip` if present, keeping the order of the rest.
    /// Returns true if it was removed.
    pub fn remove(&mut self, tip: &str) -> bool {
        self.tips.shift_remove(tip)
    }

    /// Inserts `tip` while `active` holds, removes it once it clears.
    pub fn toggle(&mut self, tip: &str, active: bool) {
        if active {
            self.insert(tip);
        } else {
            self.remove(tip);
        }
    }

    pub fn clear(&mut self) {
        self.tips.clear();
    }

    pub fn len(&self) -> usize {
        self.tips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tips.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tips.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.tips.iter().cloned().collect()
    }
}

impl PartialEq for TipSet {
    fn eq(&self, other: &Self) -> bool {
        self.tips.iter().eq(other.tips.iter())
    }
}

impl Eq for TipSet {}

impl<S: AsRef<str>> FromIterator<S> for TipSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = TipSet::new();
        for tip in iter {
            set.insert(tip.as_ref());
        }
        set
    }
}

impl Serialize for TipSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.tips)
    }
}

impl<'de> Deserialize<'de> for TipSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let list = Vec::<String>::deserialize(deserializer)?;
        Ok(list.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_idempotent() {
        let mut tips = TipSet::new();
        assert!(tips.insert("Keep your back straight"));
        assert!(!tips.insert("Keep your back straight"));
        assert_eq!(tips.len(), 1);
    }

    #[test]
    fn test_preserves_insertion_order() {
        let tips: TipSet = ["b", "a", "c", "a"].into_iter().collect();
        assert_eq!(tips.to_vec(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_toggle_removes_when_cleared() {
        let mut tips = TipSet::new();
        tips.toggle("x", true);
        tips.toggle("y", true);
        tips.toggle("x", true);
        tips.toggle("x", false);
        assert_eq!(tips.to_vec(), vec!["y"]);
        assert!(!tips.contains("x"));
    }

    #[test]
    fn test_remove_keeps_remaining_order() {
        let mut tips: TipSet = ["a", "b", "c", "d"].into_iter().collect();
        assert!(tips.remove("b"));
        assert!(!tips.remove("b"));
        assert_eq!(tips.to_vec(), vec!["a", "c", "d"]);
        assert!(tips.insert("b"));
        assert_eq!(tips.iter().last(), Some("b"));
    }

    #[test]
    fn test_equality_follows_order() {
        let ab: TipSet = ["a", "b"].into_iter().collect();
        let ba: TipSet = ["b", "a"].into_iter().collect();
        assert_ne!(ab, ba);
        assert_eq!(ab, ["a", "b"].into_iter().collect::<TipSet>());
    }

    #[test]
    fn test_deserialize_drops_duplicates() {
        let tips: TipSet = serde_json::from_str(r#"["a","a","b"]"#).unwrap();
        assert_eq!(tips.to_vec(), vec!["a", "b"]);
        assert_eq!(serde_json::to_string(&tips).unwrap(), r#"["a","b"]"#);
    }
}
