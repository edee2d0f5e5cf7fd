//! Lobby actor: one task per lobby, serializing every mutation.

use super::messages::{DisconnectOutcome, JoinOutcome, JoinRole, LobbyMessage};
use super::model::Lobby;
use crate::events::{EventSink, Outbound, ServerEvent, Target, flush};
use crate::veto;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Handle for sending messages to a lobby actor.
#[derive(Clone)]
pub struct LobbyHandle {
    sender: mpsc::Sender<LobbyMessage>,
    lobby_id: String,
}

impl LobbyHandle {
    pub fn new(sender: mpsc::Sender<LobbyMessage>, lobby_id: String) -> Self {
        Self { sender, lobby_id }
    }

    pub fn lobby_id(&self) -> &str {
        &self.lobby_id
    }

    pub async fn send(&self, message: LobbyMessage) -> Result<(), String> {
        self.sender
            .send(message)
            .await
            .map_err(|_| "Lobby is closed".to_string())
    }
}

/// Actor owning a single lobby. The inbox gives per-lobby serialization:
/// invariants are never observed torn.
pub struct LobbyActor {
    lobby: Lobby,
    inbox: mpsc::Receiver<LobbyMessage>,
    sink: Arc<dyn EventSink>,
    closed: bool,
}

impl LobbyActor {
    pub fn new(lobby: Lobby, sink: Arc<dyn EventSink>) -> (Self, LobbyHandle) {
        let (sender, inbox) = mpsc::channel(64);
        let handle = LobbyHandle::new(sender, lobby.id.clone());
        let actor = Self {
            lobby,
            inbox,
            sink,
            closed: false,
        };
        (actor, handle)
    }

    /// Run the lobby event loop until the lobby is deleted or empties out.
    pub async fn run(mut self) {
        log::info!("Lobby {} starting", self.lobby.id);

        while let Some(message) = self.inbox.recv().await {
            self.handle_message(message);
            if self.closed {
                break;
            }
        }

        log::info!("Lobby {} closed", self.lobby.id);
    }

    fn handle_message(&mut self, message: LobbyMessage) {
        match message {
            LobbyMessage::Join { conn, role, reply } => {
                let outcome = self.handle_join(&conn, role);
                let _ = reply.send(outcome);
            }

            LobbyMessage::TeamAction { conn, action } => {
                match veto::apply(&mut self.lobby, &conn, action) {
                    Ok(events) => flush(self.sink.as_ref(), events),
                    Err(reason) => {
                        // Silent drop per the error model.
                        log::debug!("Lobby {}: rejected action from {conn}: {reason}", self.lobby.id);
                    }
                }
            }

            LobbyMessage::AdminStart => match veto::start(&mut self.lobby) {
                Ok(events) => flush(self.sink.as_ref(), events),
                Err(reason) => {
                    log::debug!("Lobby {}: admin start rejected: {reason}", self.lobby.id);
                }
            },

            LobbyMessage::AdminDelete { reply } => {
                let mut evicted: Vec<String> = self.lobby.members.clone();
                evicted.extend(self.lobby.observers.iter().cloned());
                self.emit(
                    Target::Lobby(self.lobby.id.clone()),
                    ServerEvent::LobbyDeleted {
                        lobby_id: self.lobby.id.clone(),
                    },
                );
                self.closed = true;
                let _ = reply.send(evicted);
            }

            LobbyMessage::Disconnect { conn, reply } => {
                let outcome = self.handle_disconnect(&conn);
                let _ = reply.send(outcome);
            }

            LobbyMessage::Summary { reply } => {
                let _ = reply.send(self.lobby.summary());
            }

            LobbyMessage::SnapshotTo { target } => {
                for event in self.lobby.snapshot_events() {
                    self.emit(target.clone(), event);
                }
            }

            LobbyMessage::PatternListTo { target } => {
                self.emit(target, ServerEvent::PatternList(self.lobby.pattern_payload()));
            }

            LobbyMessage::CurrentModeTo { target } => {
                let mode = self
                    .lobby
                    .splatoon_state()
                    .and_then(|state| state.picked_mode)
                    .map(|mode| mode.as_str().to_string());
                self.emit(target, ServerEvent::CurrentPickedMode(mode));
            }
        }
    }

    fn handle_join(&mut self, conn: &str, role: JoinRole) -> JoinOutcome {
        let as_member = role == JoinRole::Member
            && (self.lobby.is_member(conn) || self.lobby.members.len() < 2);

        if as_member {
            if !self.lobby.is_member(conn) {
                self.lobby.members.push(conn.to_string());
            }
        } else {
            self.lobby.observers.insert(conn.to_string());
        }

        for event in self.lobby.snapshot_events() {
            self.emit(Target::Conn(conn.to_string()), event);
        }

        JoinOutcome {
            joined_as_member: as_member,
            family: self.lobby.family(),
        }
    }

    fn handle_disconnect(&mut self, conn: &str) -> DisconnectOutcome {
        let had_member = self.lobby.is_member(conn);
        let had_observer = self.lobby.observers.remove(conn);
        self.lobby.members.retain(|member| member != conn);
        // shift_remove keeps the join order of the remaining team.
        let had_team = self.lobby.team_names.shift_remove(conn).is_some();
        self.lobby.caps.remove(conn);

        let removed = had_member || had_observer || had_team;
        if removed {
            let names = self.lobby.ordered_team_names();
            self.emit(
                Target::Lobby(self.lobby.id.clone()),
                ServerEvent::TeamNamesUpdated(names),
            );
        }

        // The registry broadcasts `lobbiesUpdated` when it reaps the
        // lobby; `lobbyDeleted` is reserved for admin deletion.
        let members_empty = self.lobby.members.is_empty();
        let admin = self.lobby.rules.admin;
        if members_empty && !admin {
            self.closed = true;
        }

        DisconnectOutcome {
            removed,
            members_empty,
            admin,
        }
    }

    fn emit(&self, target: Target, event: ServerEvent) {
        flush(self.sink.as_ref(), vec![Outbound { target, event }]);
    }
}
