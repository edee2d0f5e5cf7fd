//! Process-wide lobby registry: spawns lobby actors, indexes connections
//! for the disconnect reaper, and owns the editable catalog and runtime
//! settings.

use super::actor::{LobbyActor, LobbyHandle};
use super::messages::{DisconnectOutcome, JoinOutcome, JoinRole, LobbyMessage};
use super::model::{ConnId, Lobby, LobbySummary};
use super::rules::{CreationError, FpsSettings, Rules, SplatoonSettings};
use crate::catalog::{Catalog, RuntimeSettings};
use crate::events::{EventSink, Outbound, ServerEvent, Target, flush};
use crate::veto::Action;
use indexmap::IndexMap;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{RwLock, oneshot};

/// Result of an idempotent create.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CreateOutcome {
    Created,
    /// The id was taken; the existing lobby is left untouched.
    Exists,
}

pub struct LobbyRegistry {
    sink: Arc<dyn EventSink>,
    catalog: RwLock<Catalog>,
    settings: RwLock<RuntimeSettings>,
    lobbies: RwLock<IndexMap<String, LobbyHandle>>,
    /// Connection id to the lobbies it joined, for the reaper.
    conn_index: RwLock<HashMap<ConnId, HashSet<String>>>,
    /// Lobby currently pinned to the OBS overlay room.
    obs_lobby: RwLock<Option<String>>,
}

impl LobbyRegistry {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self::with_settings(sink, RuntimeSettings::default())
    }

    pub fn with_settings(sink: Arc<dyn EventSink>, settings: RuntimeSettings) -> Self {
        Self {
            sink,
            catalog: RwLock::new(Catalog::default()),
            settings: RwLock::new(settings),
            lobbies: RwLock::new(IndexMap::new()),
            conn_index: RwLock::new(HashMap::new()),
            obs_lobby: RwLock::new(None),
        }
    }

    /// Create an FPS lobby. Id collisions return the existing lobby
    /// untouched; rule violations create nothing.
    pub async fn create_fps(
        &self,
        id: &str,
        settings: FpsSettings,
    ) -> Result<CreateOutcome, CreationError> {
        if self.lobbies.read().await.contains_key(id) {
            return Ok(CreateOutcome::Exists);
        }
        let rules = {
            let catalog = self.catalog.read().await;
            Rules::fps(&settings, &catalog)?
        };
        self.spawn(Lobby::fps(id, rules)).await;
        Ok(CreateOutcome::Created)
    }

    /// Create a Splatoon lobby, snapshotting the per-mode map pools.
    pub async fn create_splatoon(
        &self,
        id: &str,
        settings: SplatoonSettings,
    ) -> Result<CreateOutcome, CreationError> {
        if self.lobbies.read().await.contains_key(id) {
            return Ok(CreateOutcome::Exists);
        }
        let rules = Rules::splatoon(&settings)?;
        let pools = self.catalog.read().await.splatoon_pools_snapshot();
        self.spawn(Lobby::splatoon(id, rules, pools)).await;
        Ok(CreateOutcome::Created)
    }

    async fn spawn(&self, lobby: Lobby) {
        let id = lobby.id.clone();
        let (actor, handle) = LobbyActor::new(lobby, self.sink.clone());
        self.lobbies.write().await.insert(id.clone(), handle);
        tokio::spawn(actor.run());
        log::info!("Created lobby {id}");
        self.broadcast_lobbies().await;
    }

    pub async fn get(&self, id: &str) -> Option<LobbyHandle> {
        self.lobbies.read().await.get(id).cloned()
    }

    /// Join a connection to a lobby and index it for the reaper.
    pub async fn join(&self, id: &str, conn: &str, role: JoinRole) -> Option<JoinOutcome> {
        let handle = self.get(id).await?;
        let (tx, rx) = oneshot::channel();
        handle
            .send(LobbyMessage::Join {
                conn: conn.to_string(),
                role,
                reply: tx,
            })
            .await
            .ok()?;
        let outcome = rx.await.ok()?;
        self.conn_index
            .write()
            .await
            .entry(conn.to_string())
            .or_default()
            .insert(id.to_string());
        Some(outcome)
    }

    /// Forward a team action; `false` when the lobby does not resolve.
    pub async fn team_action(&self, id: &str, conn: &str, action: Action) -> bool {
        let Some(handle) = self.get(id).await else {
            return false;
        };
        handle
            .send(LobbyMessage::TeamAction {
                conn: conn.to_string(),
                action,
            })
            .await
            .is_ok()
    }

    pub async fn admin_start(&self, id: &str) -> bool {
        let Some(handle) = self.get(id).await else {
            return false;
        };
        handle.send(LobbyMessage::AdminStart).await.is_ok()
    }

    /// Admin delete: evict everyone, stop the actor, drop the indices.
    /// Returns the evicted connections so the transport can leave rooms.
    pub async fn delete(&self, id: &str) -> Option<Vec<ConnId>> {
        let handle = self.lobbies.write().await.shift_remove(id)?;
        let (tx, rx) = oneshot::channel();
        let evicted = match handle.send(LobbyMessage::AdminDelete { reply: tx }).await {
            Ok(()) => rx.await.unwrap_or_default(),
            Err(_) => Vec::new(),
        };

        self.forget_lobby(id).await;
        self.broadcast_lobbies().await;
        log::info!("Deleted lobby {id}");
        Some(evicted)
    }

    /// Disconnect reaper. Returns the lobby ids the connection had joined.
    pub async fn disconnect(&self, conn: &str) -> Vec<String> {
        let ids: Vec<String> = self
            .conn_index
            .write()
            .await
            .remove(conn)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default();

        for id in &ids {
            let Some(handle) = self.get(id).await else {
                continue;
            };
            let (tx, rx) = oneshot::channel();
            if handle
                .send(LobbyMessage::Disconnect {
                    conn: conn.to_string(),
                    reply: tx,
                })
                .await
                .is_err()
            {
                continue;
            }
            let Ok(outcome) = rx.await else { continue };
            if let DisconnectOutcome {
                members_empty: true,
                admin: false,
                ..
            } = outcome
            {
                self.lobbies.write().await.shift_remove(id);
                self.forget_lobby(id).await;
                self.broadcast_lobbies().await;
                log::info!("Reaped empty lobby {id}");
            }
        }
        ids
    }

    /// Ordered summaries for `/api/lobbies` and `lobbiesUpdated`.
    pub async fn list(&self) -> Vec<LobbySummary> {
        let handles: Vec<LobbyHandle> = self.lobbies.read().await.values().cloned().collect();
        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            let (tx, rx) = oneshot::channel();
            if handle.send(LobbyMessage::Summary { reply: tx }).await.is_ok()
                && let Ok(summary) = rx.await
            {
                summaries.push(summary);
            }
        }
        summaries
    }

    pub async fn lobby_count(&self) -> usize {
        self.lobbies.read().await.len()
    }

    // --- process-wide runtime settings -----------------------------------

    pub async fn coin_flip(&self) -> bool {
        self.settings.read().await.coin_flip
    }

    pub async fn set_coin_flip(&self, flag: bool) {
        self.settings.write().await.coin_flip = flag;
        self.emit(Target::All, ServerEvent::CoinFlipUpdated(flag));
    }

    pub async fn card_colors(&self) -> Vec<String> {
        self.settings.read().await.card_colors.clone()
    }

    pub async fn set_card_colors(&self, colors: Option<Vec<String>>) {
        let current = {
            let mut settings = self.settings.write().await;
            match colors {
                Some(colors) => settings.card_colors = colors,
                None => settings.reset_card_colors(),
            }
            settings.card_colors.clone()
        };
        self.emit(Target::All, ServerEvent::CardColorsUpdated(current));
    }

    // --- catalog ---------------------------------------------------------

    pub async fn fps_map_pool(&self, game: &str) -> Option<Vec<String>> {
        self.catalog
            .read()
            .await
            .fps_map_pool(game)
            .map(<[String]>::to_vec)
    }

    /// Admin map-pool editor. Mutates the global catalog only; running
    /// lobbies keep their creation-time snapshot.
    pub async fn edit_fps_map_pool(&self, game: &str, maps: Option<Vec<String>>) {
        let mut catalog = self.catalog.write().await;
        match maps {
            Some(maps) => catalog.set_fps_map_pool(game, maps),
            None => catalog.reset_fps_map_pool(game),
        }
    }

    // --- OBS pinning -----------------------------------------------------

    pub async fn obs_lobby(&self) -> Option<String> {
        self.obs_lobby.read().await.clone()
    }

    /// Pin a lobby to the OBS room and replay its state there.
    pub async fn set_obs_lobby(&self, id: &str) -> bool {
        let Some(handle) = self.get(id).await else {
            return false;
        };
        *self.obs_lobby.write().await = Some(id.to_string());
        self.emit(Target::Obs, ServerEvent::AdminSetObsLobby(id.to_string()));
        handle
            .send(LobbyMessage::SnapshotTo {
                target: Target::Obs,
            })
            .await
            .is_ok()
    }

    /// Re-deliver a lobby's state to the OBS room.
    pub async fn play_obs(&self, id: &str) -> bool {
        self.snapshot_to(id, Target::Obs).await
    }

    /// Re-deliver a lobby's state snapshot to an arbitrary target.
    pub async fn snapshot_to(&self, id: &str, target: Target) -> bool {
        let Some(handle) = self.get(id).await else {
            return false;
        };
        handle
            .send(LobbyMessage::SnapshotTo { target })
            .await
            .is_ok()
    }

    /// Blank the OBS room and drop the pin if it names this lobby.
    pub async fn clear_obs(&self, id: &str) {
        let mut pinned = self.obs_lobby.write().await;
        if pinned.as_deref() == Some(id) {
            *pinned = None;
        }
        drop(pinned);
        self.emit(Target::Obs, ServerEvent::BackendClearObs);
    }

    // ---------------------------------------------------------------------

    async fn broadcast_lobbies(&self) {
        let summaries = self.list().await;
        self.emit(Target::All, ServerEvent::LobbiesUpdated(json!(summaries)));
    }

    /// Drop every index entry referencing a removed lobby.
    async fn forget_lobby(&self, id: &str) {
        let mut index = self.conn_index.write().await;
        for joined in index.values_mut() {
            joined.remove(id);
        }
        index.retain(|_, joined| !joined.is_empty());
        drop(index);

        let mut pinned = self.obs_lobby.write().await;
        if pinned.as_deref() == Some(id) {
            *pinned = None;
        }
    }

    fn emit(&self, target: Target, event: ServerEvent) {
        flush(self.sink.as_ref(), vec![Outbound { target, event }]);
    }
}
