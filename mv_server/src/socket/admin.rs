//! Admin surface: out-of-band mutations behind the admin-flag trust model.

use super::LobbyIdPayload;
use crate::sink::lobby_room;
use map_veto::LobbyRegistry;
use map_veto::catalog::DEFAULT_FPS_GAME;
use serde::Deserialize;
use serde_json::json;
use socketioxide::{
    SocketIo,
    extract::{Data, SocketRef},
};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct CoinFlipPayload {
    value: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditMapPoolPayload {
    game: Option<String>,
    /// `None` resets the pool to the built-in default.
    maps: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditCardColorsPayload {
    /// `None` resets the palette to the built-in default.
    colors: Option<Vec<String>>,
}

/// Register the `admin.*` handlers. Events from connections whose
/// handshake did not carry the admin flag are dropped.
pub fn register(socket: &SocketRef, io: SocketIo, registry: Arc<LobbyRegistry>, is_admin: bool) {
    socket.on("admin.start", {
        let registry = registry.clone();
        move |socket: SocketRef, Data::<LobbyIdPayload>(data)| {
            let registry = registry.clone();
            async move {
                if denied(&socket, is_admin, "admin.start") {
                    return;
                }
                if !registry.admin_start(&data.lobby_id).await {
                    socket
                        .emit("lobbyUndefined", &json!({ "lobbyId": data.lobby_id }))
                        .ok();
                }
            }
        }
    });

    socket.on("admin.delete", {
        let registry = registry.clone();
        let io = io.clone();
        move |socket: SocketRef, Data::<LobbyIdPayload>(data)| {
            let registry = registry.clone();
            let io = io.clone();
            async move {
                if denied(&socket, is_admin, "admin.delete") {
                    return;
                }
                let Some(evicted) = registry.delete(&data.lobby_id).await else {
                    socket
                        .emit("lobbyUndefined", &json!({ "lobbyId": data.lobby_id }))
                        .ok();
                    return;
                };
                // Evicted connections leave the transport room so stale
                // broadcasts can never reach them.
                let room = lobby_room(&data.lobby_id);
                if let Ok(sockets) = io.sockets() {
                    for peer in sockets {
                        if evicted.iter().any(|conn| *conn == peer.id.to_string()) {
                            peer.leave(room.clone()).ok();
                        }
                    }
                }
                info!("Admin deleted lobby {}", data.lobby_id);
            }
        }
    });

    socket.on("admin.coinFlipUpdate", {
        let registry = registry.clone();
        move |socket: SocketRef, Data::<CoinFlipPayload>(data)| {
            let registry = registry.clone();
            async move {
                if denied(&socket, is_admin, "admin.coinFlipUpdate") {
                    return;
                }
                registry.set_coin_flip(data.value).await;
            }
        }
    });

    socket.on("admin.editFPSMapPool", {
        let registry = registry.clone();
        move |socket: SocketRef, Data::<EditMapPoolPayload>(data)| {
            let registry = registry.clone();
            async move {
                if denied(&socket, is_admin, "admin.editFPSMapPool") {
                    return;
                }
                let game = data.game.unwrap_or_else(|| DEFAULT_FPS_GAME.to_string());
                registry.edit_fps_map_pool(&game, data.maps).await;
                info!("Admin edited the {game} map pool");
            }
        }
    });

    socket.on("admin.editCardColors", {
        let registry = registry.clone();
        move |socket: SocketRef, Data::<EditCardColorsPayload>(data)| {
            let registry = registry.clone();
            async move {
                if denied(&socket, is_admin, "admin.editCardColors") {
                    return;
                }
                registry.set_card_colors(data.colors).await;
            }
        }
    });

    socket.on("admin.setObsLobby", {
        let registry = registry.clone();
        move |socket: SocketRef, Data::<LobbyIdPayload>(data)| {
            let registry = registry.clone();
            async move {
                if denied(&socket, is_admin, "admin.setObsLobby") {
                    return;
                }
                if !registry.set_obs_lobby(&data.lobby_id).await {
                    socket
                        .emit("lobbyUndefined", &json!({ "lobbyId": data.lobby_id }))
                        .ok();
                }
            }
        }
    });

    socket.on("admin.play_obs", {
        let registry = registry.clone();
        move |socket: SocketRef, Data::<LobbyIdPayload>(data)| {
            let registry = registry.clone();
            async move {
                if denied(&socket, is_admin, "admin.play_obs") {
                    return;
                }
                if !registry.play_obs(&data.lobby_id).await {
                    socket
                        .emit("lobbyUndefined", &json!({ "lobbyId": data.lobby_id }))
                        .ok();
                }
            }
        }
    });

    socket.on("admin.clear_obs", {
        let registry = registry.clone();
        move |socket: SocketRef, Data::<LobbyIdPayload>(data)| {
            let registry = registry.clone();
            async move {
                if denied(&socket, is_admin, "admin.clear_obs") {
                    return;
                }
                registry.clear_obs(&data.lobby_id).await;
            }
        }
    });
}

fn denied(socket: &SocketRef, is_admin: bool, event: &str) -> bool {
    if !is_admin {
        warn!("Dropped {event} from non-admin connection {}", socket.id);
    }
    !is_admin
}
