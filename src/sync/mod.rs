//! Reconciliation of board lists against saved searches.
//!
//! A pass resolves the configured lists on the board, runs every list's search
//! on a bounded pool, diffs each result against the list's cards, then applies
//! all card actions on a second bounded pool. No action starts before every
//! search has finished, and the pass ends only once every action has.

pub mod actions;
pub mod delta;
pub mod pool;
pub mod search;
pub mod topology;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::providers::{BoardClient, SearchClient};
use actions::{Applied, CardAction};
use pool::run_bounded;
use topology::TopologyReport;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to read board lists")]
    ListBoard(#[source] anyhow::Error),
    #[error("{failed} of {total} list changes failed")]
    Topology { failed: usize, total: usize },
}

/// Outcome counts for one pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub lists_synced: usize,
    pub search_failures: usize,
    pub cards_added: usize,
    pub cards_removed: usize,
    pub action_failures: usize,
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "synced {} lists ({} failed), added {} cards, removed {} cards, {} actions failed",
            self.lists_synced,
            self.search_failures,
            self.cards_added,
            self.cards_removed,
            self.action_failures
        )
    }
}

pub struct Reconciler {
    config: Config,
    board: Arc<dyn BoardClient>,
    search: Arc<dyn SearchClient>,
}

impl Reconciler {
    pub fn new(config: Config, board: Arc<dyn BoardClient>, search: Arc<dyn SearchClient>) -> Self {
        Self {
            config,
            board,
            search,
        }
    }

    pub async fn reconcile_lists(&self) -> Result<TopologyReport, SyncError> {
        topology::reconcile_lists(&self.config, self.board.as_ref()).await
    }

    /// Bring the board's lists in line with the configuration before the first
    /// pass. Failure is logged; lists that could not be created show up as
    /// missing during the passes that follow.
    pub async fn startup(&self) {
        match self.reconcile_lists().await {
            Ok(report) => info!(
                created = report.created.len(),
                closed = report.closed.len(),
                "Board lists reconciled"
            ),
            Err(e) => {
                let e = anyhow::Error::from(e);
                error!(error = %format!("{e:#}"), "List reconciliation failed");
            }
        }
    }

    pub async fn run_pass(&self) -> Result<PassReport, SyncError> {
        if self.config.reconcile_lists_each_pass {
            self.reconcile_lists().await?;
        }

        info!(lists = self.config.lists.len(), "Syncing");
        let board = self.board.as_ref();
        let searcher = self.search.as_ref();
        let workers = self.config.workers;
        let mut report = PassReport::default();

        let board_lists = board.list_lists().await.map_err(SyncError::ListBoard)?;
        let (targets, missing) = search::resolve_targets(&self.config.lists, &board_lists);
        for name in &missing {
            warn!(list = %name, "List not found on board, skipping");
        }
        report.search_failures = missing.len();

        let snapshots = run_bounded(
            workers,
            targets.into_iter().map(|target| async move {
                let name = target.name.clone();
                (name, search::fetch(target, board, searcher).await)
            }),
        )
        .await;

        let mut pending: Vec<CardAction> = Vec::new();
        for (name, result) in snapshots {
            let snapshot = match result {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    report.search_failures += 1;
                    warn!(list = %name, error = %format!("{e:#}"), "Search failed");
                    continue;
                }
            };
            let changes = delta::diff(&snapshot.desired_titles(), &snapshot.existing);
            if changes.is_empty() {
                debug!(list = %name, "List in sync");
            } else {
                info!(
                    list = %name,
                    to_remove = changes.to_remove.len(),
                    to_add = changes.to_add.len(),
                    "Found {} cards to remove and {} cards to add in '{}'",
                    changes.to_remove.len(),
                    changes.to_add.len(),
                    name
                );
            }
            report.lists_synced += 1;
            pending.extend(actions::actions_for(&snapshot, &changes));
        }

        if pending.is_empty() {
            info!("Board already in sync");
            return Ok(report);
        }

        let outcomes = run_bounded(
            workers,
            pending.into_iter().map(|action| async move {
                let result = actions::apply(board, &action).await;
                (action, result)
            }),
        )
        .await;

        for (action, result) in outcomes {
            match result {
                Ok(Applied::Added) => report.cards_added += 1,
                Ok(Applied::Removed) => report.cards_removed += 1,
                Ok(Applied::AlreadyGone) => {}
                Err(e) => {
                    report.action_failures += 1;
                    warn!(
                        list = %action.list().name,
                        card = %action.title(),
                        action = %action,
                        error = %format!("{e:#}"),
                        "Card action failed"
                    );
                }
            }
        }

        Ok(report)
    }

    /// Startup topology is skipped when every pass reconciles lists itself.
    async fn startup_unless_per_pass(&self) {
        if !self.config.reconcile_lists_each_pass {
            self.startup().await;
        }
    }

    /// Reconcile topology, run a single pass, and return its report.
    pub async fn run_once(&self) -> Result<PassReport, SyncError> {
        self.startup_unless_per_pass().await;
        self.run_pass().await
    }

    /// Reconcile topology once, then run passes forever, sleeping the
    /// configured interval between them. Pass errors are logged and dropped.
    pub async fn run_forever(&self) {
        self.startup_unless_per_pass().await;
        loop {
            match self.run_pass().await {
                Ok(report) => info!(%report, "Pass complete"),
                Err(e) => {
                    let e = anyhow::Error::from(e);
                    error!(error = %format!("{e:#}"), "Pass failed");
                }
            }
            tokio::time::sleep(self.config.sync_interval).await;
        }
    }
}
