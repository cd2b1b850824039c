use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use verdict_schema::StepLocation;

/// Snippet suggestions keyed by the location of the undefined step.
///
/// Iterates in [`StepLocation`] order, never insertion order. The first
/// suggestion for a location wins: a retried scenario re-suggests the same
/// step and the earlier list stays canonical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingSnippets {
    by_location: BTreeMap<StepLocation, Vec<String>>,
}

impl PendingSnippets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store snippets for a location unless one is already stored.
    ///
    /// Returns true when the snippets were stored.
    pub fn insert(&mut self, location: StepLocation, snippets: Vec<String>) -> bool {
        match self.by_location.entry(location) {
            Entry::Vacant(slot) => {
                slot.insert(snippets);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, location: &StepLocation) -> Option<&[String]> {
        self.by_location.get(location).map(Vec::as_slice)
    }

    /// Remove and return the snippets for a location.
    pub fn take(&mut self, location: &StepLocation) -> Option<Vec<String>> {
        self.by_location.remove(location)
    }

    pub fn len(&self) -> usize {
        self.by_location.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_location.is_empty()
    }

    pub fn locations(&self) -> impl Iterator<Item = &StepLocation> {
        self.by_location.keys()
    }

    /// Snippet groups in location order.
    pub fn groups(&self) -> impl Iterator<Item = &Vec<String>> {
        self.by_location.values()
    }

    pub fn clear(&mut self) {
        self.by_location.clear();
    }
}
