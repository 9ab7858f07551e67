use std::fmt;

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::delta::Delta;
use super::search::ListSnapshot;
use crate::model::search_item::SearchItem;
use crate::providers::BoardClient;

/// The list a card action targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRef {
    pub id: String,
    pub name: String,
}

/// One card mutation derived from a list's delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardAction {
    Add { list: ListRef, item: SearchItem },
    Remove { list: ListRef, title: String },
}

impl CardAction {
    pub fn list(&self) -> &ListRef {
        match self {
            CardAction::Add { list, .. } | CardAction::Remove { list, .. } => list,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            CardAction::Add { item, .. } => &item.title,
            CardAction::Remove { title, .. } => title,
        }
    }
}

impl fmt::Display for CardAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardAction::Add { list, item } => write!(f, "add '{}' to '{}'", item.title, list.name),
            CardAction::Remove { list, title } => write!(f, "remove '{title}' from '{}'", list.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Added,
    Removed,
    /// The card was already gone when the removal ran.
    AlreadyGone,
}

/// Turn one list's delta into actions: removals first, then additions.
pub fn actions_for(snapshot: &ListSnapshot, delta: &Delta) -> Vec<CardAction> {
    let list = ListRef {
        id: snapshot.list.id.clone(),
        name: snapshot.list.name.clone(),
    };

    let removals = delta.to_remove.iter().map(|title| CardAction::Remove {
        list: list.clone(),
        title: title.clone(),
    });
    let additions = delta
        .to_add
        .iter()
        .filter_map(|title| snapshot.desired.get(title))
        .map(|item| CardAction::Add {
            list: list.clone(),
            item: item.clone(),
        });

    removals.chain(additions).collect()
}

pub async fn apply(board: &dyn BoardClient, action: &CardAction) -> Result<Applied> {
    match action {
        CardAction::Add { list, item } => {
            add_card(board, list, item).await?;
            Ok(Applied::Added)
        }
        CardAction::Remove { list, title } => {
            if remove_card(board, list, title).await? {
                Ok(Applied::Removed)
            } else {
                Ok(Applied::AlreadyGone)
            }
        }
    }
}

/// Create a card titled after `item` and attach the item's URL. If the attach
/// fails the card stays without its link; the next pass sees the title and
/// leaves it alone.
pub async fn add_card(board: &dyn BoardClient, list: &ListRef, item: &SearchItem) -> Result<()> {
    info!(list = %list.name, card = %item.title, "Adding card");
    let card = board
        .add_card(&list.id, &item.title)
        .await
        .with_context(|| format!("Failed to add '{}' to '{}'", item.title, list.name))?;
    board
        .attach_url(&card.id, &item.url)
        .await
        .with_context(|| format!("Card '{}' created but attaching {} failed", item.title, item.url))?;
    Ok(())
}

/// Delete the first card on `list` titled `title`. Returns `false` when no
/// such card exists, which is not an error.
pub async fn remove_card(board: &dyn BoardClient, list: &ListRef, title: &str) -> Result<bool> {
    let cards = board
        .list_cards(&list.id)
        .await
        .with_context(|| format!("Failed to read cards of '{}'", list.name))?;

    let Some(card) = cards.into_iter().find(|c| c.title == title) else {
        debug!(list = %list.name, card = %title, "Card already gone");
        return Ok(false);
    };

    info!(list = %list.name, card = %title, "Removing card");
    board
        .delete_card(&card.id)
        .await
        .with_context(|| format!("Failed to remove '{title}' from '{}'", list.name))?;
    Ok(true)
}
