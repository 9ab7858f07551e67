//! In-memory board and search clients for exercising the sync engine.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::{BoardClient, SearchClient};
use crate::model::board::{BoardList, Card};
use crate::model::search_item::SearchItem;

#[derive(Default)]
struct BoardState {
    lists: Vec<BoardList>,
    cards: HashMap<String, Vec<Card>>,
    next_id: usize,
}

impl BoardState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

/// Tracks how many calls are in flight at once and the peak reached.
#[derive(Default)]
pub struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Ordered log of events shared between fakes, for asserting cross-client
/// ordering.
#[derive(Default)]
pub struct Timeline {
    events: Mutex<Vec<String>>,
}

impl Timeline {
    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct FakeBoard {
    state: Mutex<BoardState>,
    pub created_lists: Mutex<Vec<String>>,
    pub closed_lists: Mutex<Vec<String>>,
    pub deleted_cards: Mutex<Vec<String>>,
    fail_list_lists: bool,
    fail_add_list: HashSet<String>,
    fail_cards_for: HashSet<String>,
    fail_add_card: HashSet<String>,
    fail_attach: bool,
    delay: Option<Duration>,
    timeline: Option<Arc<Timeline>>,
    pub list_lists_calls: AtomicUsize,
    pub in_flight: Arc<InFlight>,
}

impl FakeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_list(self, name: &str, titles: &[&str]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let list_id = state.next_id("list");
            let cards = titles
                .iter()
                .map(|title| Card {
                    id: state.next_id("card"),
                    title: title.to_string(),
                    url: None,
                })
                .collect();
            state.lists.push(BoardList {
                id: list_id.clone(),
                name: name.to_string(),
                closed: false,
            });
            state.cards.insert(list_id, cards);
        }
        self
    }

    pub fn failing_list_lists(mut self) -> Self {
        self.fail_list_lists = true;
        self
    }

    pub fn failing_add_list(mut self, name: &str) -> Self {
        self.fail_add_list.insert(name.to_string());
        self
    }

    /// Listing cards of the named list fails.
    pub fn failing_cards_for(mut self, list_name: &str) -> Self {
        self.fail_cards_for.insert(list_name.to_string());
        self
    }

    /// Creating a card with this title fails.
    pub fn failing_add_card(mut self, title: &str) -> Self {
        self.fail_add_card.insert(title.to_string());
        self
    }

    pub fn failing_attach(mut self) -> Self {
        self.fail_attach = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Record card mutations as `add_card:<title>` / `delete_card:<id>`.
    pub fn with_timeline(mut self, timeline: Arc<Timeline>) -> Self {
        self.timeline = Some(timeline);
        self
    }

    fn record(&self, event: String) {
        if let Some(timeline) = &self.timeline {
            timeline.record(event);
        }
    }

    pub fn list_id(&self, name: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .lists
            .iter()
            .find(|l| l.name == name && !l.closed)
            .map(|l| l.id.clone())
    }

    /// Open list names, sorted.
    pub fn open_list_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut names: Vec<String> = state
            .lists
            .iter()
            .filter(|l| !l.closed)
            .map(|l| l.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Cards of the named open list, in board order.
    pub fn cards_of(&self, name: &str) -> Vec<Card> {
        let Some(id) = self.list_id(name) else {
            return Vec::new();
        };
        let state = self.state.lock().unwrap();
        state.cards.get(&id).cloned().unwrap_or_default()
    }

    /// Sorted card titles of the named open list.
    pub fn titles_of(&self, name: &str) -> Vec<String> {
        let mut titles: Vec<String> = self.cards_of(name).into_iter().map(|c| c.title).collect();
        titles.sort();
        titles
    }

    fn list_name(&self, list_id: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .lists
            .iter()
            .find(|l| l.id == list_id)
            .map(|l| l.name.clone())
    }

    async fn pause(&self) {
        self.in_flight.enter();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }
        self.in_flight.exit();
    }
}

#[async_trait]
impl BoardClient for FakeBoard {
    fn name(&self) -> &str {
        "Fake"
    }

    async fn list_lists(&self) -> Result<Vec<BoardList>> {
        self.list_lists_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_list_lists {
            bail!("board unavailable");
        }
        let state = self.state.lock().unwrap();
        Ok(state.lists.iter().filter(|l| !l.closed).cloned().collect())
    }

    async fn add_list(&self, name: &str) -> Result<BoardList> {
        self.pause().await;
        if self.fail_add_list.contains(name) {
            bail!("cannot create list '{name}'");
        }
        let list = {
            let mut state = self.state.lock().unwrap();
            let list = BoardList {
                id: state.next_id("list"),
                name: name.to_string(),
                closed: false,
            };
            state.lists.push(list.clone());
            state.cards.insert(list.id.clone(), Vec::new());
            list
        };
        self.created_lists.lock().unwrap().push(name.to_string());
        Ok(list)
    }

    async fn get_list(&self, list_id: &str) -> Result<BoardList> {
        self.pause().await;
        let state = self.state.lock().unwrap();
        match state.lists.iter().find(|l| l.id == list_id) {
            Some(list) => Ok(list.clone()),
            None => bail!("list {list_id} not found"),
        }
    }

    async fn close_list(&self, list_id: &str) -> Result<()> {
        self.pause().await;
        let name = {
            let mut state = self.state.lock().unwrap();
            let Some(list) = state.lists.iter_mut().find(|l| l.id == list_id) else {
                bail!("list {list_id} not found");
            };
            list.closed = true;
            list.name.clone()
        };
        self.closed_lists.lock().unwrap().push(name);
        Ok(())
    }

    async fn list_cards(&self, list_id: &str) -> Result<Vec<Card>> {
        self.pause().await;
        if let Some(name) = self.list_name(list_id) {
            if self.fail_cards_for.contains(&name) {
                bail!("cards of '{name}' unavailable");
            }
        }
        let state = self.state.lock().unwrap();
        match state.cards.get(list_id) {
            Some(cards) => Ok(cards.clone()),
            None => bail!("list {list_id} not found"),
        }
    }

    async fn add_card(&self, list_id: &str, title: &str) -> Result<Card> {
        self.record(format!("add_card:{title}"));
        self.pause().await;
        if self.fail_add_card.contains(title) {
            bail!("cannot create card '{title}'");
        }
        let mut state = self.state.lock().unwrap();
        let card = Card {
            id: state.next_id("card"),
            title: title.to_string(),
            url: None,
        };
        match state.cards.get_mut(list_id) {
            Some(cards) => cards.push(card.clone()),
            None => bail!("list {list_id} not found"),
        }
        Ok(card)
    }

    async fn attach_url(&self, card_id: &str, url: &str) -> Result<()> {
        self.pause().await;
        if self.fail_attach {
            bail!("attachment rejected");
        }
        let mut state = self.state.lock().unwrap();
        let card = state
            .cards
            .values_mut()
            .flat_map(|cards| cards.iter_mut())
            .find(|c| c.id == card_id);
        match card {
            Some(card) => {
                card.url = Some(url.to_string());
                Ok(())
            }
            None => bail!("card {card_id} not found"),
        }
    }

    async fn delete_card(&self, card_id: &str) -> Result<()> {
        self.record(format!("delete_card:{card_id}"));
        self.pause().await;
        {
            let mut state = self.state.lock().unwrap();
            let mut found = false;
            for cards in state.cards.values_mut() {
                let before = cards.len();
                cards.retain(|c| c.id != card_id);
                found |= cards.len() != before;
            }
            if !found {
                bail!("card {card_id} not found");
            }
        }
        self.deleted_cards.lock().unwrap().push(card_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSearch {
    results: HashMap<String, Vec<SearchItem>>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    query_delays: HashMap<String, Duration>,
    timeline: Option<Arc<Timeline>>,
    pub queries: Mutex<Vec<String>>,
    pub in_flight: Arc<InFlight>,
}

impl FakeSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// `items` are `(title, url)` pairs returned for `query`.
    pub fn with_results(mut self, query: &str, items: &[(&str, &str)]) -> Self {
        let items = items
            .iter()
            .map(|(title, url)| SearchItem {
                title: title.to_string(),
                url: url.to_string(),
            })
            .collect();
        self.results.insert(query.to_string(), items);
        self
    }

    pub fn failing(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Delay only searches for `query`; overrides `with_delay` for it.
    pub fn with_query_delay(mut self, query: &str, delay: Duration) -> Self {
        self.query_delays.insert(query.to_string(), delay);
        self
    }

    /// Record finished searches as `search_done:<query>`.
    pub fn with_timeline(mut self, timeline: Arc<Timeline>) -> Self {
        self.timeline = Some(timeline);
        self
    }
}

#[async_trait]
impl SearchClient for FakeSearch {
    fn name(&self) -> &str {
        "FakeSearch"
    }

    async fn search_issues(&self, query: &str) -> Result<Vec<SearchItem>> {
        self.in_flight.enter();
        match self.query_delays.get(query).copied().or(self.delay) {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }
        self.in_flight.exit();

        self.queries.lock().unwrap().push(query.to_string());
        if let Some(timeline) = &self.timeline {
            timeline.record(format!("search_done:{query}"));
        }
        if self.failing.contains(query) {
            bail!("search rate limited");
        }
        Ok(self.results.get(query).cloned().unwrap_or_default())
    }
}
