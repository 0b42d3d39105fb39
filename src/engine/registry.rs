use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::table::MAX_SEATS;

use super::erased::{ErasedProcessor, GameAdapter};
use super::games::{Nim, TicTacToe};
use super::processor::GameProcessor;
use super::types::{GameDefinition, GameTitle};

const LOG_TARGET: &str = "p2p_tables::engine::registry";

/// Configuration errors. Callers treat all of these as fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("no processor registered for game title `{0}`")]
    UnknownTitle(GameTitle),
    #[error("game title `{0}` registered twice")]
    DuplicateTitle(GameTitle),
    #[error("invalid definition for `{title}`: {reason}")]
    InvalidDefinition { title: GameTitle, reason: String },
}

/// Title → processor map, built once at startup and shared by `Arc`.
#[derive(Clone, Default)]
pub struct GameRegistry {
    processors: BTreeMap<GameTitle, Arc<dyn ErasedProcessor>>,
}

impl std::fmt::Debug for GameRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameRegistry")
            .field("titles", &self.processors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl GameRegistry {
    pub fn builder() -> GameRegistryBuilder {
        GameRegistryBuilder::default()
    }

    /// Registry holding every bundled title.
    pub fn with_builtin_games() -> Self {
        let mut processors: BTreeMap<GameTitle, Arc<dyn ErasedProcessor>> = BTreeMap::new();
        let tic_tac_toe = TicTacToe::new();
        processors.insert(tic_tac_toe.definition().title, Arc::new(GameAdapter::new(tic_tac_toe)));
        let nim = Nim::new();
        processors.insert(nim.definition().title, Arc::new(GameAdapter::new(nim)));
        Self { processors }
    }

    pub fn get(&self, title: &GameTitle) -> Result<Arc<dyn ErasedProcessor>, RegistryError> {
        self.processors
            .get(title)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownTitle(title.clone()))
    }

    pub fn definition(&self, title: &GameTitle) -> Result<GameDefinition, RegistryError> {
        self.get(title).map(|processor| processor.definition())
    }

    pub fn titles(&self) -> impl Iterator<Item = &GameTitle> + '_ {
        self.processors.keys()
    }

    pub fn contains(&self, title: &GameTitle) -> bool {
        self.processors.contains_key(title)
    }
}

#[derive(Default)]
pub struct GameRegistryBuilder {
    processors: BTreeMap<GameTitle, Arc<dyn ErasedProcessor>>,
}

impl GameRegistryBuilder {
    pub fn register<P: GameProcessor>(mut self, processor: P) -> Result<Self, RegistryError> {
        let definition = processor.definition();
        let title = definition.title.clone();
        if self.processors.contains_key(&title) {
            return Err(RegistryError::DuplicateTitle(title));
        }
        if definition.min_players == 0
            || definition.min_players > definition.max_players
            || definition.max_players > MAX_SEATS
        {
            return Err(RegistryError::InvalidDefinition {
                title,
                reason: format!(
                    "player bounds {}..={} must lie within 1..={MAX_SEATS}",
                    definition.min_players, definition.max_players
                ),
            });
        }
        info!(target: LOG_TARGET, %title, "registered game processor");
        self.processors
            .insert(title, Arc::new(GameAdapter::new(processor)));
        Ok(self)
    }

    pub fn build(self) -> GameRegistry {
        GameRegistry {
            processors: self.processors,
        }
    }
}
