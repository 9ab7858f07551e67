use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::BoardClient;
use crate::model::board::{BoardList, Card};

const API_BASE: &str = "https://api.trello.com/1";

pub struct TrelloBoard {
    api_key: String,
    token: String,
    board_id: String,
    client: reqwest::Client,
}

impl TrelloBoard {
    pub fn new(api_key: String, token: String, board_id: String) -> Self {
        Self {
            api_key,
            token,
            board_id,
            client: reqwest::Client::new(),
        }
    }

    fn auth_params(&self) -> [(&str, &str); 2] {
        [("key", &self.api_key), ("token", &self.token)]
    }
}

#[derive(Deserialize)]
struct TrelloList {
    id: String,
    name: String,
    #[serde(default)]
    closed: bool,
}

impl From<TrelloList> for BoardList {
    fn from(list: TrelloList) -> Self {
        BoardList {
            id: list.id,
            name: list.name,
            closed: list.closed,
        }
    }
}

#[derive(Deserialize)]
struct TrelloAttachment {
    url: Option<String>,
}

#[derive(Deserialize)]
struct TrelloCard {
    id: String,
    name: String,
    #[serde(default)]
    attachments: Vec<TrelloAttachment>,
}

impl From<TrelloCard> for Card {
    fn from(card: TrelloCard) -> Self {
        let url = card.attachments.into_iter().find_map(|a| a.url);
        Card {
            id: card.id,
            title: card.name,
            url,
        }
    }
}

#[async_trait]
impl BoardClient for TrelloBoard {
    fn name(&self) -> &str {
        "Trello"
    }

    async fn list_lists(&self) -> Result<Vec<BoardList>> {
        let lists: Vec<TrelloList> = self
            .client
            .get(format!("{API_BASE}/boards/{}/lists", self.board_id))
            .query(&self.auth_params())
            .query(&[("filter", "open"), ("fields", "id,name,closed")])
            .send()
            .await
            .context("Trello boards/lists failed")?
            .error_for_status()
            .with_context(|| format!("Trello rejected lists request for board {}", self.board_id))?
            .json()
            .await
            .context("Failed to parse Trello lists")?;

        Ok(lists.into_iter().map(BoardList::from).collect())
    }

    async fn add_list(&self, name: &str) -> Result<BoardList> {
        let list: TrelloList = self
            .client
            .post(format!("{API_BASE}/lists"))
            .query(&self.auth_params())
            .query(&[
                ("name", name),
                ("idBoard", self.board_id.as_str()),
                ("pos", "bottom"),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to create Trello list '{name}'"))?
            .error_for_status()
            .with_context(|| format!("Trello rejected list '{name}'"))?
            .json()
            .await?;

        Ok(list.into())
    }

    async fn get_list(&self, list_id: &str) -> Result<BoardList> {
        let list: TrelloList = self
            .client
            .get(format!("{API_BASE}/lists/{list_id}"))
            .query(&self.auth_params())
            .query(&[("fields", "id,name,closed")])
            .send()
            .await
            .context("Failed to fetch Trello list")?
            .error_for_status()
            .with_context(|| format!("Trello list {list_id} not available"))?
            .json()
            .await?;

        Ok(list.into())
    }

    async fn close_list(&self, list_id: &str) -> Result<()> {
        self.client
            .put(format!("{API_BASE}/lists/{list_id}/closed"))
            .query(&self.auth_params())
            .query(&[("value", "true")])
            .send()
            .await
            .context("Failed to close Trello list")?
            .error_for_status()
            .with_context(|| format!("Trello refused to close list {list_id}"))?;

        Ok(())
    }

    async fn list_cards(&self, list_id: &str) -> Result<Vec<Card>> {
        let cards: Vec<TrelloCard> = self
            .client
            .get(format!("{API_BASE}/lists/{list_id}/cards"))
            .query(&self.auth_params())
            .query(&[
                ("fields", "id,name"),
                ("attachments", "true"),
                ("attachment_fields", "url"),
            ])
            .send()
            .await
            .context("Trello lists/cards failed")?
            .error_for_status()
            .with_context(|| format!("Trello rejected cards request for list {list_id}"))?
            .json()
            .await
            .context("Failed to parse Trello cards")?;

        Ok(cards.into_iter().map(Card::from).collect())
    }

    async fn add_card(&self, list_id: &str, title: &str) -> Result<Card> {
        let card: TrelloCard = self
            .client
            .post(format!("{API_BASE}/cards"))
            .query(&self.auth_params())
            .query(&[("idList", list_id), ("name", title)])
            .send()
            .await
            .context("Failed to create Trello card")?
            .error_for_status()
            .with_context(|| format!("Trello rejected card '{title}'"))?
            .json()
            .await?;

        Ok(card.into())
    }

    async fn attach_url(&self, card_id: &str, url: &str) -> Result<()> {
        self.client
            .post(format!("{API_BASE}/cards/{card_id}/attachments"))
            .query(&self.auth_params())
            .query(&[("url", url)])
            .send()
            .await
            .context("Failed to attach URL to Trello card")?
            .error_for_status()
            .with_context(|| format!("Trello rejected attachment for card {card_id}"))?;

        Ok(())
    }

    async fn delete_card(&self, card_id: &str) -> Result<()> {
        self.client
            .delete(format!("{API_BASE}/cards/{card_id}"))
            .query(&self.auth_params())
            .send()
            .await
            .context("Failed to delete Trello card")?
            .error_for_status()
            .with_context(|| format!("Trello refused to delete card {card_id}"))?;

        Ok(())
    }
}
