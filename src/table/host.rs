use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::engine::{ErasedOutcome, ErasedProcessor, GameRegistry};
use crate::ids::PlayerProfileId;
use crate::ledger::{ActionLog, ActionLogError, ActionSource, DbGameTableAction};

use super::error::TableSyncError;
use super::types::GameTable;

const LOG_TARGET: &str = "p2p_tables::table::host";

/// Whole table plus whole log: the unit every broadcast carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSnapshot {
    pub table: GameTable,
    pub actions: Vec<DbGameTableAction>,
}

/// Host-side owner of a table and its action log.
pub struct TableHost {
    processor: Arc<dyn ErasedProcessor>,
    table: GameTable,
    log: ActionLog,
}

impl std::fmt::Debug for TableHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableHost")
            .field("table", &self.table)
            .field("actions", &self.log.len())
            .finish_non_exhaustive()
    }
}

impl TableHost {
    /// Fails if the title is unregistered or the log does not belong to the
    /// table or is empty.
    pub fn new(
        registry: &GameRegistry,
        table: GameTable,
        log: ActionLog,
    ) -> Result<Self, TableSyncError> {
        let processor = registry.get(&table.game_title)?;
        if log.game_table_id() != &table.id {
            return Err(ActionLogError::ForeignTable {
                log: table.id.clone(),
                entry: log.game_table_id().clone(),
            }
            .into());
        }
        if log.is_empty() {
            return Err(ActionLogError::Empty(table.id.clone()).into());
        }
        Ok(Self {
            processor,
            table,
            log,
        })
    }

    pub fn table(&self) -> &GameTable {
        &self.table
    }

    pub fn log(&self) -> &ActionLog {
        &self.log
    }

    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            table: self.table.clone(),
            actions: self.log.entries().to_vec(),
        }
    }

    /// Applies a player's encoded action on behalf of `profile`.
    #[instrument(skip(self, action_str, now), fields(table_id = %self.table.id))]
    pub async fn submit_player_action(
        &mut self,
        profile: &PlayerProfileId,
        action_str: &str,
        now: DateTime<Utc>,
    ) -> Result<TableSnapshot, TableSyncError> {
        let result = self.apply_player_action(profile, action_str).await;
        self.finish(result, now)
    }

    /// Applies a host action. The seat check is skipped; everything else
    /// matches the player path.
    #[instrument(skip(self, action_str, now), fields(table_id = %self.table.id))]
    pub async fn submit_host_action(
        &mut self,
        action_str: &str,
        now: DateTime<Utc>,
    ) -> Result<TableSnapshot, TableSyncError> {
        let result = self.apply_host_action(action_str).await;
        self.finish(result, now)
    }

    async fn apply_player_action(
        &self,
        profile: &PlayerProfileId,
        action_str: &str,
    ) -> Result<(ActionSource, ErasedOutcome), TableSyncError> {
        self.ensure_open()?;
        let seat = self
            .table
            .seat_of(profile)
            .ok_or_else(|| TableSyncError::NotSeated(profile.clone()))?;
        let state_str = self.log.latest_state_str()?;
        let outcome = self
            .processor
            .apply_player_action(&self.table, state_str.as_str(), seat, action_str)
            .await?;
        Ok((ActionSource::Player(seat), outcome))
    }

    async fn apply_host_action(
        &self,
        action_str: &str,
    ) -> Result<(ActionSource, ErasedOutcome), TableSyncError> {
        self.ensure_open()?;
        let state_str = self.log.latest_state_str()?;
        let outcome = self
            .processor
            .apply_host_action(&self.table, state_str.as_str(), action_str)
            .await?;
        Ok((ActionSource::Host, outcome))
    }

    fn ensure_open(&self) -> Result<(), TableSyncError> {
        if self.table.table_phase.is_terminal() {
            return Err(TableSyncError::GameOver(self.table.table_phase));
        }
        Ok(())
    }

    fn finish(
        &mut self,
        result: Result<(ActionSource, ErasedOutcome), TableSyncError>,
        now: DateTime<Utc>,
    ) -> Result<TableSnapshot, TableSyncError> {
        match result.and_then(|(source, outcome)| self.commit(source, outcome, now)) {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => {
                if err.is_fatal() {
                    error!(target: LOG_TARGET, table_id = %self.table.id, error = %err, "table submission failed");
                } else {
                    warn!(target: LOG_TARGET, table_id = %self.table.id, error = %err, "dropping table submission");
                }
                Err(err)
            }
        }
    }

    fn commit(
        &mut self,
        source: ActionSource,
        outcome: ErasedOutcome,
        now: DateTime<Utc>,
    ) -> Result<TableSnapshot, TableSyncError> {
        let entry = DbGameTableAction::new(
            self.table.id.clone(),
            now,
            source,
            outcome.action_type,
            outcome.action_str,
            outcome.state_str,
        );
        self.log.append(entry)?;

        let previous = self.table.table_phase;
        self.table.table_phase = outcome.table_phase;
        self.table.current_status_description = outcome.state_summary;
        self.table.last_updated_at = now;

        info!(
            target: LOG_TARGET,
            table_id = %self.table.id,
            %source,
            action_type = %outcome.action_type,
            phase = %self.table.table_phase,
            actions = self.log.len(),
            "accepted table action"
        );
        if previous != self.table.table_phase && self.table.table_phase.is_game_over() {
            info!(
                target: LOG_TARGET,
                table_id = %self.table.id,
                phase = %self.table.table_phase,
                status = %self.table.current_status_description,
                "table reached a game-over phase"
            );
        }
        Ok(self.snapshot())
    }
}
