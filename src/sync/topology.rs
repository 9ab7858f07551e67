use std::collections::HashSet;

use anyhow::Result;
use tracing::{debug, info, warn};

use super::pool::run_bounded;
use super::SyncError;
use crate::config::Config;
use crate::model::board::BoardList;
use crate::providers::BoardClient;

/// Lists to create and lists to close so the board matches the configuration.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TopologyPlan {
    pub create: Vec<String>,
    pub close: Vec<BoardList>,
}

impl TopologyPlan {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.close.is_empty()
    }
}

/// What a topology run actually changed.
#[derive(Debug, Default)]
pub struct TopologyReport {
    pub created: Vec<String>,
    pub closed: Vec<String>,
}

enum Change {
    Create(String),
    Close(BoardList),
}

pub fn plan<'a>(
    configured: impl IntoIterator<Item = &'a str>,
    board_lists: &[BoardList],
) -> TopologyPlan {
    let configured: Vec<&str> = configured.into_iter().collect();
    let wanted: HashSet<&str> = configured.iter().copied().collect();
    let present: HashSet<&str> = board_lists
        .iter()
        .filter(|l| !l.closed)
        .map(|l| l.name.as_str())
        .collect();

    let mut create: Vec<String> = Vec::new();
    for name in configured {
        if !present.contains(name) && !create.iter().any(|c| c == name) {
            create.push(name.to_string());
        }
    }

    let mut close: Vec<BoardList> = board_lists
        .iter()
        .filter(|l| !l.closed && !wanted.contains(l.name.as_str()))
        .cloned()
        .collect();
    close.sort_by(|a, b| a.name.cmp(&b.name));

    TopologyPlan { create, close }
}

/// Create configured lists missing from the board and close board lists that
/// are no longer configured. Every change is attempted; failures are reported
/// together once all have finished.
pub async fn reconcile_lists(
    config: &Config,
    board: &dyn BoardClient,
) -> Result<TopologyReport, SyncError> {
    let board_lists = board.list_lists().await.map_err(SyncError::ListBoard)?;
    let plan = plan(config.list_names(), &board_lists);
    if plan.is_empty() {
        debug!("Board lists already match configuration");
        return Ok(TopologyReport::default());
    }

    let changes = plan
        .create
        .into_iter()
        .map(Change::Create)
        .chain(plan.close.into_iter().map(Change::Close));
    let outcomes = run_bounded(
        config.workers,
        changes.map(|change| async move {
            let result = apply(board, &change).await;
            (change, result)
        }),
    )
    .await;

    let total = outcomes.len();
    let mut report = TopologyReport::default();
    let mut failed = 0;
    for (change, result) in outcomes {
        match (change, result) {
            (Change::Create(name), Ok(())) => report.created.push(name),
            (Change::Close(list), Ok(())) => report.closed.push(list.name),
            (Change::Create(name), Err(e)) => {
                failed += 1;
                warn!(list = %name, error = %format!("{e:#}"), "Failed to create list");
            }
            (Change::Close(list), Err(e)) => {
                failed += 1;
                warn!(list = %list.name, error = %format!("{e:#}"), "Failed to close list");
            }
        }
    }

    if failed > 0 {
        return Err(SyncError::Topology { failed, total });
    }
    Ok(report)
}

async fn apply(board: &dyn BoardClient, change: &Change) -> Result<()> {
    match change {
        Change::Create(name) => {
            info!(list = %name, "Adding list");
            board.add_list(name).await?;
        }
        Change::Close(list) => {
            let current = board.get_list(&list.id).await?;
            if current.closed {
                debug!(list = %list.name, "List already closed");
                return Ok(());
            }
            info!(list = %list.name, "Closing list");
            board.close_list(&list.id).await?;
        }
    }
    Ok(())
}
