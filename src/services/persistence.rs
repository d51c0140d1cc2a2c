//! Persistence service: scene load, encoding, and debounced saves.
//!
//! DESIGN
//! ======
//! The scene is stored as a JSON string in one field of the map document.
//! Loading fails closed: a missing document, a missing field, or malformed
//! scene data all start the map from the default scene. Only a store error
//! reaches the caller.
//!
//! Saves go through a bounded queue to a background worker. The worker waits
//! for a scene, keeps replacing it with newer ones until the queue has been
//! quiet for the debounce period, then writes the latest. A burst of edits
//! costs one write.
//!
//! ERROR HANDLING
//! ==============
//! A failed save is logged and published as a [`Notice`]. Local state is never
//! rolled back; the next edit schedules a fresh save.

use std::sync::Arc;
use std::time::Duration;

use canvas::camera::Point;
use canvas::scene::{EntityId, Layer, Scene, SceneError};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::PersistConfig;
use crate::store::{BlobStore, Document, DocumentStore, StoreError};

/// Notices buffered for slow listeners.
const NOTICE_CAPACITY: usize = 16;

/// Display name of a generated background asset.
pub const BACKGROUND_ASSET_NAME: &str = "Generated map";

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("scene encode failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("save worker stopped")]
    WorkerStopped,
    #[error("scene update failed: {0}")]
    Scene(#[from] SceneError),
}

/// Out-of-band events for the user interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    SaveFailed { map_id: String, message: String },
}

// =============================================================================
// ENCODING
// =============================================================================

/// Serialize `scene` into the payload string stored under the state field.
///
/// # Errors
///
/// Returns [`PersistError::Encode`] if the scene holds a value JSON cannot represent.
pub fn scene_payload(scene: &Scene) -> Result<String, PersistError> {
    Ok(scene.to_json()?)
}

/// Document fields that persist `scene`.
///
/// # Errors
///
/// Returns [`PersistError::Encode`] if the scene cannot be serialized.
pub fn encode_scene(scene: &Scene, state_field: &str) -> Result<Document, PersistError> {
    let mut fields = Document::new();
    fields.insert(state_field.to_owned(), Value::String(scene_payload(scene)?));
    Ok(fields)
}

/// The raw scene payload of `doc`, if the field is present and a string.
#[must_use]
pub fn stored_payload<'a>(doc: &'a Document, state_field: &str) -> Option<&'a str> {
    doc.get(state_field).and_then(Value::as_str)
}

/// Decode the scene stored in `doc`.
///
/// `Ok(None)` when the field is absent or null.
///
/// # Errors
///
/// Returns the JSON error when the field holds something other than a
/// valid serialized scene.
pub fn decode_scene(doc: &Document, state_field: &str) -> Result<Option<Scene>, serde_json::Error> {
    match doc.get(state_field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) => Scene::from_json(raw).map(Some),
        // Tolerate a scene stored as a nested object rather than a string.
        Some(other) => Scene::from_json(&other.to_string()).map(Some),
    }
}

/// Load a map's scene, falling back to the default scene on missing or
/// malformed data.
///
/// # Errors
///
/// Returns [`PersistError::Store`] if the store itself cannot be read.
pub async fn load_scene(store: &dyn DocumentStore, config: &PersistConfig, map_id: &str) -> Result<Scene, PersistError> {
    let Some(doc) = store.get(&config.collection, map_id).await? else {
        info!(%map_id, "no map document; starting from the default scene");
        return Ok(Scene::default());
    };
    match decode_scene(&doc, &config.state_field) {
        Ok(Some(scene)) => Ok(scene),
        Ok(None) => {
            info!(%map_id, field = %config.state_field, "map document has no scene; starting from the default scene");
            Ok(Scene::default())
        }
        Err(e) => {
            warn!(%map_id, error = %e, "malformed map scene; starting from the default scene");
            Ok(Scene::default())
        }
    }
}

/// Write `scene` to the map document immediately.
///
/// # Errors
///
/// Returns [`PersistError`] if encoding or the store write fails.
pub async fn save_scene(store: &dyn DocumentStore, config: &PersistConfig, map_id: &str, scene: &Scene) -> Result<(), PersistError> {
    let fields = encode_scene(scene, &config.state_field)?;
    store.save(&config.collection, map_id, fields).await?;
    Ok(())
}

/// Place a generated map image as the bottom-most asset of the first layer,
/// with its top-left corner at the world origin.
///
/// # Errors
///
/// Returns a [`SceneError`] if the asset cannot be added.
pub fn place_background(scene: &mut Scene, src: &str, size: (f64, f64)) -> Result<EntityId, SceneError> {
    if scene.layers.is_empty() {
        scene.layers.push(Layer::new("Layer 1"));
    }
    let layer_id = scene.layers[0].id.clone();
    let id = scene.add_asset(&layer_id, BACKGROUND_ASSET_NAME, src, Point::new(0.0, 0.0), size)?;
    scene.layers[0].assets.rotate_right(1);
    Ok(id)
}

/// Upload a generated map image and save it as the map's background.
///
/// `pixel_size` is the image size, used as the asset's world size. Returns
/// the uploaded image's URL.
///
/// # Errors
///
/// Returns [`PersistError`] if the upload, the load, or the save fails.
pub async fn attach_background<S>(
    store: &S,
    config: &PersistConfig,
    map_id: &str,
    png: Vec<u8>,
    pixel_size: (u32, u32),
) -> Result<String, PersistError>
where
    S: DocumentStore + BlobStore,
{
    let blob_path = format!("{}/{map_id}/background-{}.png", config.collection, uuid::Uuid::new_v4());
    let url = store.upload(&blob_path, png).await?;

    let mut scene = load_scene(store, config, map_id).await?;
    let (w, h) = pixel_size;
    place_background(&mut scene, &url, (f64::from(w), f64::from(h)))?;
    save_scene(store, config, map_id, &scene).await?;
    info!(%map_id, %url, "background placed");
    Ok(url)
}

// =============================================================================
// SAVE WORKER
// =============================================================================

/// Sender side of a map's save worker.
///
/// Dropping the handle flushes any pending scene and stops the worker;
/// [`SaveHandle::close`] does the same and waits for it.
pub struct SaveHandle {
    tx: mpsc::Sender<String>,
    notices: broadcast::Sender<Notice>,
    worker: JoinHandle<()>,
}

impl SaveHandle {
    /// Queue `scene` for saving and return the payload that will be written.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Encode`] if the scene cannot be serialized, or
    /// [`PersistError::WorkerStopped`] if the worker is gone.
    pub async fn schedule(&self, scene: &Scene) -> Result<String, PersistError> {
        let payload = scene_payload(scene)?;
        self.tx.send(payload.clone()).await.map_err(|_| PersistError::WorkerStopped)?;
        Ok(payload)
    }

    /// Listen for save notices.
    #[must_use]
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Flush the pending scene and wait for the worker to finish.
    pub async fn close(self) {
        let Self { tx, worker, .. } = self;
        drop(tx);
        if let Err(e) = worker.await {
            error!(error = %e, "save worker panicked");
        }
    }
}

/// Spawn the debounced save worker for one map.
#[must_use]
pub fn spawn_save_worker(store: Arc<dyn DocumentStore>, map_id: impl Into<String>, config: PersistConfig) -> SaveHandle {
    let map_id = map_id.into();
    let (tx, mut rx) = mpsc::channel::<String>(config.queue_capacity.max(1));
    let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
    let worker_notices = notices.clone();
    let debounce = Duration::from_millis(config.debounce_ms);

    info!(%map_id, debounce_ms = config.debounce_ms, queue_capacity = config.queue_capacity, "save worker configured");

    let worker = tokio::spawn(async move {
        while let Some(mut pending) = rx.recv().await {
            let closed = loop {
                tokio::select! {
                    next = rx.recv() => match next {
                        Some(newer) => pending = newer,
                        None => break true,
                    },
                    () = tokio::time::sleep(debounce) => break false,
                }
            };
            write_payload(&*store, &config, &map_id, pending, &worker_notices).await;
            if closed {
                break;
            }
        }
        info!(%map_id, "save worker stopped");
    });

    SaveHandle { tx, notices, worker }
}

async fn write_payload(
    store: &dyn DocumentStore,
    config: &PersistConfig,
    map_id: &str,
    payload: String,
    notices: &broadcast::Sender<Notice>,
) {
    let mut fields = Document::new();
    fields.insert(config.state_field.clone(), Value::String(payload));
    match store.save(&config.collection, map_id, fields).await {
        Ok(()) => info!(%map_id, "map saved"),
        Err(e) => {
            error!(%map_id, error = %e, "map save failed");
            let notice = Notice::SaveFailed { map_id: map_id.to_owned(), message: e.to_string() };
            if notices.send(notice).is_err() {
                warn!(%map_id, "save failure had no listeners");
            }
        }
    }
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
