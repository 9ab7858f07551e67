pub mod github;
pub mod trello;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::Config;
use crate::model::board::{BoardList, Card};
use crate::model::search_item::SearchItem;

/// Operations the sync engine needs from a kanban board. Implementations must be
/// safe to call concurrently; the engine shares one client across every worker.
#[async_trait]
pub trait BoardClient: Send + Sync {
    fn name(&self) -> &str;
    /// Open lists of the configured board.
    async fn list_lists(&self) -> Result<Vec<BoardList>>;
    async fn add_list(&self, name: &str) -> Result<BoardList>;
    async fn get_list(&self, list_id: &str) -> Result<BoardList>;
    async fn close_list(&self, list_id: &str) -> Result<()>;
    async fn list_cards(&self, list_id: &str) -> Result<Vec<Card>>;
    async fn add_card(&self, list_id: &str, title: &str) -> Result<Card>;
    async fn attach_url(&self, card_id: &str, url: &str) -> Result<()>;
    async fn delete_card(&self, card_id: &str) -> Result<()>;
}

/// Runs a saved issue search and returns every matching item.
#[async_trait]
pub trait SearchClient: Send + Sync {
    fn name(&self) -> &str;
    async fn search_issues(&self, query: &str) -> Result<Vec<SearchItem>>;
}

#[cfg(test)]
pub mod fake;

pub fn create_board(config: &Config) -> Arc<dyn BoardClient> {
    Arc::new(trello::TrelloBoard::new(
        config.trello.api_key.clone(),
        config.trello.token.clone(),
        config.board_id.clone(),
    ))
}

pub fn create_search(config: &Config) -> Arc<dyn SearchClient> {
    Arc::new(github::GitHubSearch::new(config.github_token.clone()))
}
