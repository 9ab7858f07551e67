use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use tracing::debug;

use crate::config::ListSpec;
use crate::model::board::BoardList;
use crate::model::search_item::SearchItem;
use crate::providers::{BoardClient, SearchClient};

/// A configured list resolved to its board ID for one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListTarget {
    pub id: String,
    pub name: String,
    pub query: String,
}

/// What the search wants and what the board shows for one list.
#[derive(Debug)]
pub struct ListSnapshot {
    pub list: ListTarget,
    pub desired: HashMap<String, SearchItem>,
    pub existing: HashSet<String>,
}

impl ListSnapshot {
    pub fn desired_titles(&self) -> HashSet<String> {
        self.desired.keys().cloned().collect()
    }
}

/// Match configured lists to open board lists by name; the first board list
/// with a given name wins. Returns the resolved targets and the names that
/// have no list on the board.
pub fn resolve_targets(
    specs: &[ListSpec],
    board_lists: &[BoardList],
) -> (Vec<ListTarget>, Vec<String>) {
    let mut targets = Vec::with_capacity(specs.len());
    let mut missing = Vec::new();

    for spec in specs {
        match board_lists
            .iter()
            .find(|l| !l.closed && l.name == spec.name)
        {
            Some(list) => targets.push(ListTarget {
                id: list.id.clone(),
                name: spec.name.clone(),
                query: spec.query.clone(),
            }),
            None => missing.push(spec.name.clone()),
        }
    }

    (targets, missing)
}

/// Run the list's search and read its cards. Items sharing a title collapse to
/// the last one returned.
pub async fn fetch(
    list: ListTarget,
    board: &dyn BoardClient,
    search: &dyn SearchClient,
) -> Result<ListSnapshot> {
    let (items, cards) = tokio::try_join!(
        async {
            search
                .search_issues(&list.query)
                .await
                .with_context(|| format!("{} search for '{}' failed", search.name(), list.name))
        },
        async {
            board
                .list_cards(&list.id)
                .await
                .with_context(|| format!("Failed to read cards of '{}'", list.name))
        },
    )?;

    let desired: HashMap<String, SearchItem> = items
        .into_iter()
        .map(|item| (item.title.clone(), item))
        .collect();

    let unattached = cards.iter().filter(|c| c.url.is_none()).count();
    if unattached > 0 {
        debug!(list = %list.name, unattached, "Cards without an attached URL");
    }
    let existing: HashSet<String> = cards.into_iter().map(|c| c.title).collect();

    Ok(ListSnapshot {
        list,
        desired,
        existing,
    })
}
