//! Server crate: Socket.IO dispatcher, admin surface, and REST queries on
//! top of the `map_veto` core.

pub mod api;
pub mod config;
pub mod logging;
pub mod sink;
pub mod socket;
