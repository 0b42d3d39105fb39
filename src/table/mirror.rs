use tracing::warn;

use crate::encoding::EncodedString;
use crate::engine::{GameProcessor, GameRegistry};
use crate::ids::{GameTableId, PlayerProfileId};
use crate::ledger::{hash, DbGameTableAction, StateHash};

use super::host::TableSnapshot;
use super::types::{GameTable, PlayerSeat, TablePhase};

const LOG_TARGET: &str = "p2p_tables::table::mirror";

/// What a peer renders, derived entirely from the latest broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    pub table_id: GameTableId,
    pub phase: TablePhase,
    pub status: String,
    pub my_player_seat: Option<PlayerSeat>,
    pub latest_state_str: Option<EncodedString>,
    pub next_to_act: Vec<PlayerSeat>,
    pub is_my_turn: bool,
    pub action_count: usize,
    pub state_hash: StateHash,
}

impl TableView {
    pub fn is_game_over(&self) -> bool {
        self.phase.is_game_over()
    }
}

/// Read-only copy of a table held by players and observers.
///
/// Every broadcast replaces the corresponding half wholesale, so missed or
/// reordered messages heal with the next one received.
#[derive(Debug, Clone)]
pub struct TableMirror {
    me: PlayerProfileId,
    table_id: GameTableId,
    table: Option<GameTable>,
    actions: Vec<DbGameTableAction>,
}

impl TableMirror {
    pub fn new(me: PlayerProfileId, table_id: GameTableId) -> Self {
        Self {
            me,
            table_id,
            table: None,
            actions: Vec::new(),
        }
    }

    pub fn table_id(&self) -> &GameTableId {
        &self.table_id
    }

    pub fn apply_table(&mut self, table: GameTable) -> bool {
        if table.id != self.table_id {
            warn!(
                target: LOG_TARGET,
                expected = %self.table_id,
                received = %table.id,
                "ignoring table broadcast for another table"
            );
            return false;
        }
        self.table = Some(table);
        true
    }

    pub fn apply_actions(&mut self, actions: Vec<DbGameTableAction>) -> bool {
        if let Some(foreign) = actions.iter().find(|a| a.game_table_id != self.table_id) {
            warn!(
                target: LOG_TARGET,
                expected = %self.table_id,
                received = %foreign.game_table_id,
                "ignoring action broadcast for another table"
            );
            return false;
        }
        self.actions = actions;
        true
    }

    pub fn apply_snapshot(&mut self, snapshot: TableSnapshot) -> bool {
        let TableSnapshot { table, actions } = snapshot;
        let table_ok = self.apply_table(table);
        let actions_ok = table_ok && self.apply_actions(actions);
        table_ok && actions_ok
    }

    pub fn table(&self) -> Option<&GameTable> {
        self.table.as_ref()
    }

    pub fn actions(&self) -> &[DbGameTableAction] {
        &self.actions
    }

    pub fn my_player_seat(&self) -> Option<PlayerSeat> {
        self.table.as_ref().and_then(|table| table.seat_of(&self.me))
    }

    pub fn latest_state_str(&self) -> Option<&EncodedString> {
        self.actions.last().map(|entry| &entry.next_game_state_str)
    }

    /// Decodes the latest state with the title's own encoder.
    pub fn latest_state<P: GameProcessor>(&self, processor: &P) -> Option<P::State> {
        let encoded = self.latest_state_str()?;
        processor.state_encoder().decode_or_log(encoded.as_str())
    }

    pub fn state_hash(&self) -> StateHash {
        hash::hash_log(&self.table_id, &self.actions)
    }

    /// `None` until the table itself has been received.
    pub fn view(&self, registry: &GameRegistry) -> Option<TableView> {
        let table = self.table.as_ref()?;
        let my_player_seat = self.my_player_seat();
        let next_to_act = self.next_to_act(table, registry);
        let is_my_turn = my_player_seat.is_some_and(|seat| next_to_act.contains(&seat));
        Some(TableView {
            table_id: table.id.clone(),
            phase: table.table_phase,
            status: table.current_status_description.clone(),
            my_player_seat,
            latest_state_str: self.latest_state_str().cloned(),
            next_to_act,
            is_my_turn,
            action_count: self.actions.len(),
            state_hash: self.state_hash(),
        })
    }

    fn next_to_act(&self, table: &GameTable, registry: &GameRegistry) -> Vec<PlayerSeat> {
        let Some(state_str) = self.latest_state_str() else {
            return Vec::new();
        };
        let result = registry
            .get(&table.game_title)
            .map_err(|err| err.to_string())
            .and_then(|processor| {
                processor
                    .next_to_act(state_str.as_str())
                    .map_err(|err| err.to_string())
            });
        match result {
            Ok(seats) => seats,
            Err(error) => {
                warn!(target: LOG_TARGET, table_id = %table.id, %error, "cannot derive next to act");
                Vec::new()
            }
        }
    }
}
