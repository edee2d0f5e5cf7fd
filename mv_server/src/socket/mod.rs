//! Socket.IO event dispatcher.
//!
//! Maps the closed inbound event set onto lobby registry calls and actor
//! messages. Unknown events are never registered, so the transport ignores
//! them; malformed payloads fail extraction and the handler is not invoked.
//! All domain broadcasts flow back through [`crate::sink::SocketSink`].

pub mod admin;

use crate::sink::{OBS_ROOM, lobby_room};
use map_veto::catalog::DEFAULT_FPS_GAME;
use map_veto::lobby::LobbyMessage;
use map_veto::{
    Action, CreateOutcome, FpsSettings, JoinRole, LobbyRegistry, SplatoonSettings, Target,
};
use serde::Deserialize;
use serde_json::json;
use socketioxide::{
    SocketIo,
    extract::{Data, SocketRef, TryData},
};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// Handshake auth payload. The admin password screen is an external
/// collaborator; the server trusts the flag it sets.
#[derive(Debug, Deserialize)]
struct AuthPayload {
    admin: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LobbyIdPayload {
    pub lobby_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinLobbyPayload {
    lobby_id: String,
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateFpsPayload {
    lobby_id: String,
    game: Option<String>,
    game_type: String,
    coin_flip: Option<bool>,
    knife_decider: Option<bool>,
    map_pool_size: Option<usize>,
    admin: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSplatoonPayload {
    lobby_id: String,
    modes_size: u8,
    coin_flip: Option<bool>,
    admin: Option<bool>,
    rounds: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamNamePayload {
    lobby_id: String,
    team_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapActionPayload {
    lobby_id: String,
    map: String,
    team_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PickPayload {
    lobby_id: String,
    map: String,
    team_name: String,
    side: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeciderPayload {
    lobby_id: String,
    map: String,
    team_name: String,
    side: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModeActionPayload {
    lobby_id: String,
    mode: String,
    team_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportWinnerPayload {
    lobby_id: String,
    winner_team: String,
    team_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmWinnerPayload {
    lobby_id: String,
    confirmed: bool,
    team_name: String,
}

/// Register the root namespace and every inbound event handler.
pub fn register(io: &SocketIo, registry: Arc<LobbyRegistry>) {
    let io_handle = io.clone();
    io.ns("/", move |socket: SocketRef, TryData::<AuthPayload>(auth)| {
        let is_admin = matches!(
            auth,
            Ok(AuthPayload { admin: Some(true) })
        );
        info!("Client connected: {} (admin: {is_admin})", socket.id);

        register_lobby_events(&socket, registry.clone());
        register_query_events(&socket, registry.clone());
        admin::register(&socket, io_handle.clone(), registry.clone(), is_admin);

        let registry = registry.clone();
        socket.on_disconnect(move |socket: SocketRef| {
            let registry = registry.clone();
            async move {
                let conn = socket.id.to_string();
                let joined = registry.disconnect(&conn).await;
                debug!("Client {conn} disconnected ({} lobby refs)", joined.len());
            }
        });
    });
}

fn register_lobby_events(socket: &SocketRef, registry: Arc<LobbyRegistry>) {
    socket.on("joinLobby", {
        let registry = registry.clone();
        move |socket: SocketRef, Data::<JoinLobbyPayload>(data)| {
            let registry = registry.clone();
            async move {
                let conn = socket.id.to_string();
                let role = JoinRole::parse(data.role.as_deref().unwrap_or("observer"));
                match registry.join(&data.lobby_id, &conn, role).await {
                    Some(outcome) => {
                        socket.join(lobby_room(&data.lobby_id)).ok();
                        debug!(
                            "{conn} joined lobby {} (member: {})",
                            data.lobby_id, outcome.joined_as_member
                        );
                    }
                    None => {
                        socket
                            .emit("lobbyUndefined", &json!({ "lobbyId": data.lobby_id }))
                            .ok();
                    }
                }
            }
        }
    });

    socket.on("createFPSLobby", {
        let registry = registry.clone();
        move |socket: SocketRef, Data::<CreateFpsPayload>(data)| {
            let registry = registry.clone();
            async move {
                let settings = FpsSettings {
                    game: data
                        .game
                        .unwrap_or_else(|| DEFAULT_FPS_GAME.to_string()),
                    game_type: data.game_type,
                    coin_flip: match data.coin_flip {
                        Some(flag) => flag,
                        None => registry.coin_flip().await,
                    },
                    knife_decider: data.knife_decider.unwrap_or(false),
                    map_pool_size: data.map_pool_size,
                    admin: data.admin.unwrap_or(false),
                };
                emit_create_outcome(
                    &socket,
                    &data.lobby_id,
                    registry.create_fps(&data.lobby_id, settings).await,
                );
            }
        }
    });

    socket.on("createSplatoonLobby", {
        let registry = registry.clone();
        move |socket: SocketRef, Data::<CreateSplatoonPayload>(data)| {
            let registry = registry.clone();
            async move {
                let settings = SplatoonSettings {
                    modes_size: data.modes_size,
                    coin_flip: match data.coin_flip {
                        Some(flag) => flag,
                        None => registry.coin_flip().await,
                    },
                    admin: data.admin.unwrap_or(false),
                    rounds: data.rounds.unwrap_or(3),
                };
                emit_create_outcome(
                    &socket,
                    &data.lobby_id,
                    registry.create_splatoon(&data.lobby_id, settings).await,
                );
            }
        }
    });

    socket.on("lobby.teamName", {
        let registry = registry.clone();
        move |socket: SocketRef, Data::<TeamNamePayload>(data)| {
            let registry = registry.clone();
            async move {
                let action = Action::SetTeamName {
                    team_name: data.team_name,
                };
                forward(&registry, &socket, &data.lobby_id, action).await;
            }
        }
    });

    socket.on("lobby.ban", {
        let registry = registry.clone();
        move |socket: SocketRef, Data::<MapActionPayload>(data)| {
            let registry = registry.clone();
            async move {
                let action = Action::Ban {
                    map: data.map,
                    team_name: data.team_name,
                };
                forward(&registry, &socket, &data.lobby_id, action).await;
            }
        }
    });

    socket.on("lobby.startPick", {
        let registry = registry.clone();
        move |socket: SocketRef, Data::<MapActionPayload>(data)| {
            let registry = registry.clone();
            async move {
                let action = Action::StartPick {
                    map: data.map,
                    team_name: data.team_name,
                };
                forward(&registry, &socket, &data.lobby_id, action).await;
            }
        }
    });

    socket.on("lobby.pick", {
        let registry = registry.clone();
        move |socket: SocketRef, Data::<PickPayload>(data)| {
            let registry = registry.clone();
            async move {
                let action = Action::Pick {
                    map: data.map,
                    team_name: data.team_name,
                    side: data.side,
                };
                forward(&registry, &socket, &data.lobby_id, action).await;
            }
        }
    });

    socket.on("lobby.decider", {
        let registry = registry.clone();
        move |socket: SocketRef, Data::<DeciderPayload>(data)| {
            let registry = registry.clone();
            async move {
                let action = Action::Decider {
                    map: data.map,
                    team_name: data.team_name,
                    side: data.side,
                };
                forward(&registry, &socket, &data.lobby_id, action).await;
            }
        }
    });

    socket.on("lobby.modeBan", {
        let registry = registry.clone();
        move |socket: SocketRef, Data::<ModeActionPayload>(data)| {
            let registry = registry.clone();
            async move {
                let action = Action::ModeBan {
                    mode: data.mode,
                    team_name: data.team_name,
                };
                forward(&registry, &socket, &data.lobby_id, action).await;
            }
        }
    });

    socket.on("lobby.modePick", {
        let registry = registry.clone();
        move |socket: SocketRef, Data::<ModeActionPayload>(data)| {
            let registry = registry.clone();
            async move {
                let action = Action::ModePick {
                    mode: data.mode,
                    team_name: data.team_name,
                };
                forward(&registry, &socket, &data.lobby_id, action).await;
            }
        }
    });

    // Legacy single-event alias of lobby.proposeWinner.
    for event in ["lobby.reportWinner", "lobby.proposeWinner"] {
        socket.on(event, {
            let registry = registry.clone();
            move |socket: SocketRef, Data::<ReportWinnerPayload>(data)| {
                let registry = registry.clone();
                async move {
                    let action = Action::ProposeWinner {
                        winner_team: data.winner_team,
                        team_name: data.team_name,
                    };
                    forward(&registry, &socket, &data.lobby_id, action).await;
                }
            }
        });
    }

    socket.on("lobby.confirmWinner", {
        let registry = registry.clone();
        move |socket: SocketRef, Data::<ConfirmWinnerPayload>(data)| {
            let registry = registry.clone();
            async move {
                let action = Action::ConfirmWinner {
                    confirmed: data.confirmed,
                    team_name: data.team_name,
                };
                forward(&registry, &socket, &data.lobby_id, action).await;
            }
        }
    });
}

fn register_query_events(socket: &SocketRef, registry: Arc<LobbyRegistry>) {
    socket.on("joinObsView", {
        let registry = registry.clone();
        move |socket: SocketRef| {
            let registry = registry.clone();
            async move {
                socket.join(OBS_ROOM.to_string()).ok();
                if let Some(pinned) = registry.obs_lobby().await {
                    registry
                        .snapshot_to(&pinned, Target::Conn(socket.id.to_string()))
                        .await;
                }
            }
        }
    });

    socket.on("obs.getPatternList", {
        let registry = registry.clone();
        move |socket: SocketRef, Data::<LobbyIdPayload>(data)| {
            let registry = registry.clone();
            async move {
                match registry.get(&data.lobby_id).await {
                    Some(handle) => {
                        handle
                            .send(LobbyMessage::PatternListTo {
                                target: Target::Conn(socket.id.to_string()),
                            })
                            .await
                            .ok();
                    }
                    None => emit_not_found(&socket, &data.lobby_id),
                }
            }
        }
    });

    socket.on("obs.getCurrentPickedMode", {
        let registry = registry.clone();
        move |socket: SocketRef, Data::<LobbyIdPayload>(data)| {
            let registry = registry.clone();
            async move {
                match registry.get(&data.lobby_id).await {
                    Some(handle) => {
                        handle
                            .send(LobbyMessage::CurrentModeTo {
                                target: Target::Conn(socket.id.to_string()),
                            })
                            .await
                            .ok();
                    }
                    None => emit_not_found(&socket, &data.lobby_id),
                }
            }
        }
    });

    socket.on("getLobbyGameCategory", {
        let registry = registry.clone();
        move |socket: SocketRef, Data::<LobbyIdPayload>(data)| {
            let registry = registry.clone();
            async move {
                let Some(handle) = registry.get(&data.lobby_id).await else {
                    emit_not_found(&socket, &data.lobby_id);
                    return;
                };
                let (tx, rx) = oneshot::channel();
                if handle.send(LobbyMessage::Summary { reply: tx }).await.is_ok()
                    && let Ok(summary) = rx.await
                {
                    socket
                        .emit("lobbyGameCategory", &json!(summary.game_family.as_str()))
                        .ok();
                }
            }
        }
    });
}

/// Route a team action to its lobby actor; routing failures get
/// `lobbyUndefined`, everything else is the controller's business.
async fn forward(registry: &LobbyRegistry, socket: &SocketRef, lobby_id: &str, action: Action) {
    if !registry
        .team_action(lobby_id, &socket.id.to_string(), action)
        .await
    {
        socket
            .emit("lobbyUndefined", &json!({ "lobbyId": lobby_id }))
            .ok();
    }
}

fn emit_create_outcome(
    socket: &SocketRef,
    lobby_id: &str,
    outcome: Result<CreateOutcome, map_veto::CreationError>,
) {
    match outcome {
        Ok(CreateOutcome::Created) => {
            socket
                .emit("lobbyCreated", &json!({ "lobbyId": lobby_id }))
                .ok();
        }
        Ok(CreateOutcome::Exists) => {
            socket
                .emit("lobbyExists", &json!({ "lobbyId": lobby_id }))
                .ok();
        }
        Err(err) => {
            socket
                .emit("lobbyCreationError", &json!({ "message": err.to_string() }))
                .ok();
        }
    }
}

fn emit_not_found(socket: &SocketRef, lobby_id: &str) {
    socket
        .emit("lobbyNotFound", &json!({ "lobbyId": lobby_id }))
        .ok();
}
