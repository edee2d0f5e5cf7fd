//! # Map Veto
//!
//! The authoritative core of a competitive map- and mode-veto ceremony
//! server. Two team captains, optional observers, and an administrator
//! share a lobby over an abstract event bus; the server drives a strict
//! turn-based protocol that produces the final match configuration.
//!
//! Two game families share one dispatch abstraction:
//!
//! - **FPS** — BO1/BO3/BO5 ban/pick over a seven-step pattern, with side
//!   selection and an optional knife decider.
//! - **Splatoon** — multi-round mode-then-map veto with 2- or 4-mode
//!   pools, priority-team ordering, and winner-driven priority transfer.
//!
//! ## Core Modules
//!
//! - [`catalog`]: map pools, veto patterns, mode translations
//! - [`lobby`]: the lobby entity, per-lobby actors, and the registry
//! - [`veto`]: the turn controller — validation, state transitions,
//!   capability grants
//! - [`events`]: the outbound event vocabulary and the [`events::EventSink`]
//!   bus the transport implements

pub mod catalog;
pub mod events;
pub mod lobby;
pub mod veto;

pub use catalog::{Catalog, FpsFormat, GameFamily, RuntimeSettings, SplatoonMode, VetoToken};
pub use events::{EventSink, Outbound, ServerEvent, Target, sanitize_team_name};
pub use lobby::{
    CreateOutcome, CreationError, FpsSettings, JoinRole, LobbyRegistry, LobbySummary,
    SplatoonSettings,
};
pub use veto::{Action, Capabilities, VetoError};
