//! Lobby actor message types.

use crate::catalog::GameFamily;
use crate::events::Target;
use crate::lobby::model::{ConnId, LobbySummary};
use crate::veto::Action;
use tokio::sync::oneshot;

/// How a connection joins a lobby.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JoinRole {
    Member,
    Observer,
    Test,
}

impl JoinRole {
    /// Unknown roles fall back to read-only observation.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "member" => Self::Member,
            "test" => Self::Test,
            _ => Self::Observer,
        }
    }
}

/// Reply to a join request.
#[derive(Clone, Copy, Debug)]
pub struct JoinOutcome {
    /// False when the member slots were full and the connection was
    /// demoted to observer.
    pub joined_as_member: bool,
    pub family: GameFamily,
}

/// Reply to a disconnect notification.
#[derive(Clone, Copy, Debug)]
pub struct DisconnectOutcome {
    pub removed: bool,
    pub members_empty: bool,
    pub admin: bool,
}

/// Messages that can be sent to a `LobbyActor`.
#[derive(Debug)]
pub enum LobbyMessage {
    /// Join as member or observer; the joiner receives a state snapshot.
    Join {
        conn: ConnId,
        role: JoinRole,
        reply: oneshot::Sender<JoinOutcome>,
    },

    /// A validated-at-ingress team action. Rejections are silent.
    TeamAction { conn: ConnId, action: Action },

    /// Begin the ceremony out of band (admin surface).
    AdminStart,

    /// Evict everyone and stop the actor; replies with the evicted
    /// connections so the transport can drop their room membership.
    AdminDelete { reply: oneshot::Sender<Vec<ConnId>> },

    /// A connection closed.
    Disconnect {
        conn: ConnId,
        reply: oneshot::Sender<DisconnectOutcome>,
    },

    /// Listing row for queries.
    Summary { reply: oneshot::Sender<LobbySummary> },

    /// Re-deliver the lobby state snapshot to a target.
    SnapshotTo { target: Target },

    /// Deliver the veto pattern list to a target.
    PatternListTo { target: Target },

    /// Deliver the currently picked mode to a target.
    CurrentModeTo { target: Target },
}
