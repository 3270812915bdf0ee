use {super::roster::ParticipantRecord, std::collections::BTreeSet};

/// The ids currently chosen in a list view. Always scoped to the filtered view the user
/// sees; "select all" means exactly the visible ids, never the full roster.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SelectionSet(BTreeSet<String>);

impl SelectionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids(ids: impl IntoIterator<Item = String>) -> Self {
        Self(ids.into_iter().collect())
    }

    /// Adds the id if absent, removes it if present.
    pub fn toggle(&mut self, id: &str) {
        if !self.0.remove(id) {
            self.0.insert(id.to_string());
        }
    }

    /// Replaces the selection with exactly the given visible ids.
    pub fn select_all_visible(&mut self, visible_ids: impl IntoIterator<Item = String>) {
        self.0 = visible_ids.into_iter().collect();
    }

    #[allow(unused)]
    pub fn clear(&mut self) {
        self.0.clear();
    }

    #[must_use]
    pub fn is_selected(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The selected subset of the roster, in roster order. Ids not on the roster
    /// contribute nothing.
    #[must_use]
    pub fn resolve<'roster>(
        &self,
        roster: &'roster [ParticipantRecord],
    ) -> Vec<&'roster ParticipantRecord> {
        roster
            .iter()
            .filter(|record| self.is_selected(&record.id))
            .collect()
    }
}
