use std::collections::{BTreeSet, HashSet};

/// Card titles to remove from and add to one list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    pub to_remove: BTreeSet<String>,
    pub to_add: BTreeSet<String>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_empty()
    }
}

/// `to_remove = existing - desired`, `to_add = desired - existing`. Titles in
/// both sets are left alone, even if the card's attachment is stale.
pub fn diff(desired: &HashSet<String>, existing: &HashSet<String>) -> Delta {
    Delta {
        to_remove: existing.difference(desired).cloned().collect(),
        to_add: desired.difference(existing).cloned().collect(),
    }
}
