//! Map session: one open map, its engine, and its sync with the store.
//!
//! ARCHITECTURE
//! ============
//! The session owns the `EngineCore` for one map. Engine actions flow through
//! [`MapSession::handle`], which schedules a debounced save whenever the
//! scene changed. Remote documents flow through [`MapSession::apply_remote`]:
//! the newest remote scene replaces the local one (last writer wins).
//! [`MapSession::run`] multiplexes both sources for hosts that feed edits
//! through a channel.
//!
//! TRADE-OFFS
//! ==========
//! The store echoes our own saves back to us. Payloads we recently sent are
//! remembered and their echoes ignored, so saving never wipes local undo
//! history. Any other remote scene does reset it.

use std::collections::VecDeque;
use std::sync::Arc;

use canvas::engine::{Action, EngineCore};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use super::persistence::{self, Notice, PersistError, SaveHandle};
use crate::config::PersistConfig;
use crate::store::{Document, DocumentStore};

/// Own payloads remembered for echo suppression.
const RECENT_PAYLOADS: usize = 8;

/// A local edit: an engine call whose actions the session should react to.
pub type Edit = Box<dyn FnOnce(&mut EngineCore) -> Vec<Action> + Send>;

pub struct MapSession {
    map_id: String,
    config: PersistConfig,
    store: Arc<dyn DocumentStore>,
    saver: SaveHandle,
    /// Payloads this session queued for saving, oldest first.
    sent: VecDeque<String>,
    pub core: EngineCore,
}

impl MapSession {
    /// Load the map (fail closed) and start its save worker.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Store`] if the store cannot be read.
    pub async fn open(store: Arc<dyn DocumentStore>, map_id: &str, config: PersistConfig) -> Result<Self, PersistError> {
        let scene = persistence::load_scene(&*store, &config, map_id).await?;
        info!(%map_id, layers = scene.layers.len(), entities = scene.entity_count(), "map session opened");
        let saver = persistence::spawn_save_worker(store.clone(), map_id, config.clone());
        Ok(Self {
            map_id: map_id.to_owned(),
            config,
            store,
            saver,
            sent: VecDeque::with_capacity(RECENT_PAYLOADS),
            core: EngineCore::with_scene(scene),
        })
    }

    #[must_use]
    pub fn map_id(&self) -> &str {
        &self.map_id
    }

    /// Save notices for this map.
    #[must_use]
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.saver.notices()
    }

    /// Subscribe to remote changes of this map's document.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Document> {
        self.store.subscribe(&self.config.collection, &self.map_id)
    }

    /// React to engine output. A `SceneChanged` schedules a save.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] if the scene cannot be encoded or the worker stopped.
    pub async fn handle(&mut self, actions: &[Action]) -> Result<(), PersistError> {
        if !actions.contains(&Action::SceneChanged) {
            return Ok(());
        }
        let payload = self.saver.schedule(&self.core.scene).await?;
        if self.sent.len() == RECENT_PAYLOADS {
            self.sent.pop_front();
        }
        self.sent.push_back(payload);
        Ok(())
    }

    /// Apply a remote version of the map document.
    ///
    /// Echoes of our own saves and documents without a usable scene are
    /// ignored; anything else replaces the local scene.
    pub fn apply_remote(&mut self, doc: &Document) -> Vec<Action> {
        if let Some(payload) = persistence::stored_payload(doc, &self.config.state_field) {
            if self.sent.iter().any(|sent| sent == payload) {
                debug!(map_id = %self.map_id, "ignoring echo of own save");
                return Vec::new();
            }
        }
        match persistence::decode_scene(doc, &self.config.state_field) {
            Ok(Some(scene)) => {
                info!(map_id = %self.map_id, "remote scene applied");
                self.sent.clear();
                self.core.replace_scene(scene)
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(map_id = %self.map_id, error = %e, "ignoring malformed remote scene");
                Vec::new()
            }
        }
    }

    /// Drive the session until `edits` closes, then flush and stop.
    ///
    /// Local edits and remote updates are applied in arrival order. The
    /// actions each one produces go to `out`. A closed subscription only
    /// stops remote updates.
    pub async fn run(
        mut self,
        mut remote: broadcast::Receiver<Document>,
        mut edits: mpsc::Receiver<Edit>,
        out: mpsc::Sender<Vec<Action>>,
    ) {
        let mut remote_open = true;
        loop {
            let actions = tokio::select! {
                edit = edits.recv() => {
                    let Some(edit) = edit else { break };
                    let actions = edit(&mut self.core);
                    if let Err(e) = self.handle(&actions).await {
                        error!(map_id = %self.map_id, error = %e, "could not schedule save");
                    }
                    actions
                }
                update = remote.recv(), if remote_open => match update {
                    Ok(doc) => self.apply_remote(&doc),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(map_id = %self.map_id, skipped, "remote updates lagged; newer ones follow");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(map_id = %self.map_id, "remote subscription closed");
                        remote_open = false;
                        continue;
                    }
                },
            };
            if !actions.is_empty() && out.send(actions).await.is_err() {
                debug!(map_id = %self.map_id, "action listener dropped");
            }
        }
        self.close().await;
    }

    /// Flush any pending save and stop the worker.
    pub async fn close(self) {
        info!(map_id = %self.map_id, "map session closed");
        self.saver.close().await;
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
