// Repository module - in-memory inventory of discovered appliance objects
//
// Discovery fills one repository per object class (volumes, disks, FC ports).
// Page order matters for downstream consumers: discovery documents and the
// id lists sent back when monitoring is enabled must come out in the order
// the appliance listed the objects, so entries live in a Vec instead of a
// map keyed by id.

use std::collections::HashMap;

/// Attribute bag of a single discovered object, keyed by lowercased
/// element name from the inventory page.
pub type Attrs = HashMap<String, String>;

/// Insertion-ordered collection of discovered objects keyed by appliance id.
#[derive(Debug, Default)]
pub struct Repository {
    entries: Vec<(String, Attrs)>,
}

impl Repository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object, or updates it in place when the id is already known.
    /// Re-inserting keeps the original position.
    pub fn insert(&mut self, id: impl Into<String>, attrs: Attrs) {
        let id = id.into();
        match self.entries.iter_mut().find(|(known, _)| *known == id) {
            Some((_, slot)) => *slot = attrs,
            None => self.entries.push((id, attrs)),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Attrs> {
        self.entries
            .iter()
            .find(|(known, _)| known == id)
            .map(|(_, attrs)| attrs)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// First entry whose attribute `attr` equals `value`, as `(id, attrs)`.
    pub fn find_by(&self, attr: &str, value: &str) -> Option<(&str, &Attrs)> {
        self.entries
            .iter()
            .find(|(_, attrs)| attrs.get(attr).is_some_and(|v| v == value))
            .map(|(id, attrs)| (id.as_str(), attrs))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Attrs)> {
        self.entries.iter().map(|(id, attrs)| (id.as_str(), attrs))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Swaps the whole inventory for a freshly discovered one.
    pub fn replace_all(&mut self, other: Repository) {
        self.entries = other.entries;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Attrs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn preserves_insertion_order() {
        let mut repo = Repository::new();
        repo.insert("3", attrs(&[("name", "c")]));
        repo.insert("1", attrs(&[("name", "a")]));
        repo.insert("2", attrs(&[("name", "b")]));
        let ids: Vec<&str> = repo.ids().collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
    }

    #[test]
    fn reinsert_updates_in_place() {
        let mut repo = Repository::new();
        repo.insert("1", attrs(&[("name", "old")]));
        repo.insert("2", attrs(&[("name", "other")]));
        repo.insert("1", attrs(&[("name", "new")]));
        assert_eq!(repo.len(), 2);
        assert_eq!(repo.get("1").and_then(|a| a.get("name")).map(String::as_str), Some("new"));
        let ids: Vec<&str> = repo.ids().collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn find_by_matches_attribute_value() {
        let mut repo = Repository::new();
        repo.insert("9", attrs(&[("slot", "4"), ("vendor", "SEAGATE")]));
        repo.insert("10", attrs(&[("slot", "5"), ("vendor", "WDC")]));
        let (id, found) = repo.find_by("slot", "5").unwrap();
        assert_eq!(id, "10");
        assert_eq!(found.get("vendor").map(String::as_str), Some("WDC"));
        assert!(repo.find_by("slot", "6").is_none());
    }

    #[test]
    fn replace_all_swaps_contents() {
        let mut repo = Repository::new();
        repo.insert("1", attrs(&[("name", "stale")]));
        let mut fresh = Repository::new();
        fresh.insert("7", attrs(&[("name", "current")]));
        repo.replace_all(fresh);
        assert!(!repo.contains("1"));
        assert!(repo.contains("7"));
        assert_eq!(repo.len(), 1);
    }
}
