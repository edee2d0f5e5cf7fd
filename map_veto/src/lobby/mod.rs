//! Lobby module: the lobby entity, per-lobby actors, and the registry.
//!
//! Each lobby runs in its own Tokio task with an mpsc inbox, so every
//! mutation to a given lobby is serialized. The [`LobbyRegistry`] spawns
//! actors, routes messages by lobby id, indexes connections for the
//! disconnect reaper, and owns the process-wide catalog and settings.

pub mod actor;
pub mod messages;
pub mod model;
pub mod registry;
pub mod rules;

pub use actor::{LobbyActor, LobbyHandle};
pub use messages::{DisconnectOutcome, JoinOutcome, JoinRole, LobbyMessage};
pub use model::{ConnId, Lobby, LobbyGame, LobbySummary};
pub use registry::{CreateOutcome, LobbyRegistry};
pub use rules::{CreationError, FpsSettings, Rules, SplatoonSettings};
