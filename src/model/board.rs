/// A column on the board. `closed` lists are archived, not deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardList {
    pub id: String,
    pub name: String,
    pub closed: bool,
}

/// A card under one list. Reconciliation identifies cards by `title` only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub id: String,
    pub title: String,
    /// First attached URL, if the board reported one.
    pub url: Option<String>,
}
