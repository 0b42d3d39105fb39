pub mod config;
pub mod encoding;
pub mod engine;
pub mod ids;
pub mod ledger;
pub mod lobby;
pub mod profile;
pub mod session;
pub mod storage;
pub mod table;
pub mod transport;

#[cfg(test)]
pub mod test_utils;

pub use config::{ConfigError, SessionConfig};
pub use encoding::{DecodeError, EncodeError, EncodedString, Encoder, SchemaEncoder, Validate};
pub use engine::{
    ErasedProcessor, GameDefinition, GameProcessor, GameRegistry, GameTitle, ProcessorOutcome,
    RegistryError,
};
pub use ids::{GameLobbyId, GameTableActionId, GameTableId, PeerId, PlayerProfileId};
pub use ledger::{ActionLog, ActionSource, DbGameTableAction, GameTableActionType, StateHash};
pub use lobby::{GameLobby, LobbyHost, LobbyMirror, LobbyMove, LobbyOptions, LobbySnapshot};
pub use profile::{PeerProfiles, PrivatePlayerProfile, PublicPlayerProfile};
pub use session::{
    HostLobbySession, HostTableSession, PlayerLobbySession, PlayerTableSession, SessionError,
};
pub use storage::{InMemoryTableStorage, StorageError, TableStorage};
pub use table::{
    GameTable, PlayerSeat, TableHost, TableMirror, TablePhase, TableSnapshot, TableSyncError,
    TableView,
};
pub use transport::{ChannelTag, LocalRoomHub, Room, RoomConnector, RoomEvent, TransportError};
