use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;

use super::SearchClient;
use crate::model::search_item::SearchItem;

const SEARCH_URL: &str = "https://api.github.com/search/issues";
const PER_PAGE: usize = 100;
/// GitHub never returns more than this many results for one search.
const RESULT_CAP: usize = 1000;

pub struct GitHubSearch {
    token: Option<String>,
    client: reqwest::Client,
}

impl GitHubSearch {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token,
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_page(&self, query: &str, page: usize) -> Result<SearchPage> {
        let mut request = self
            .client
            .get(SEARCH_URL)
            .header(USER_AGENT, concat!("gitrello/", env!("CARGO_PKG_VERSION")))
            .header(ACCEPT, "application/vnd.github+json")
            .query(&[
                ("q", query.to_string()),
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
            ]);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        request
            .send()
            .await
            .context("GitHub search request failed")?
            .error_for_status()
            .with_context(|| format!("GitHub rejected search '{query}'"))?
            .json()
            .await
            .context("Failed to parse GitHub search response")
    }
}

#[derive(Deserialize)]
struct SearchPage {
    total_count: usize,
    /// Set when GitHub timed out and returned only part of the matches.
    #[serde(default)]
    incomplete_results: bool,
    #[serde(default)]
    items: Vec<GhIssue>,
}

impl SearchPage {
    /// A partial result set must not be treated as the full desired set, or
    /// cards for the missing matches would be removed.
    fn ensure_complete(&self, query: &str) -> Result<()> {
        if self.incomplete_results {
            bail!(
                "GitHub returned incomplete results for '{query}' ({} of {} items)",
                self.items.len(),
                self.total_count
            );
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct GhIssue {
    title: String,
    html_url: String,
}

impl From<GhIssue> for SearchItem {
    fn from(issue: GhIssue) -> Self {
        SearchItem {
            title: issue.title,
            url: issue.html_url,
        }
    }
}

fn has_more(page_len: usize, collected: usize, total_count: usize) -> bool {
    page_len == PER_PAGE && collected < total_count.min(RESULT_CAP)
}

#[async_trait]
impl SearchClient for GitHubSearch {
    fn name(&self) -> &str {
        "GitHub"
    }

    async fn search_issues(&self, query: &str) -> Result<Vec<SearchItem>> {
        let mut items: Vec<SearchItem> = Vec::new();
        let mut page = 1;

        loop {
            let result = self.fetch_page(query, page).await?;
            result.ensure_complete(query)?;
            let page_len = result.items.len();
            items.extend(result.items.into_iter().map(SearchItem::from));
            if !has_more(page_len, items.len(), result.total_count) {
                break;
            }
            page += 1;
        }

        Ok(items)
    }
}
