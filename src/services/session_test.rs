use std::time::Duration;

use super::*;
use crate::store::MemoryStore;
use canvas::scene::Scene;
use serde_json::Value;

fn fast_config() -> PersistConfig {
    PersistConfig { debounce_ms: 5, ..PersistConfig::default() }
}

fn remote_doc(scene: &Scene) -> Document {
    persistence::encode_scene(scene, "mapState").unwrap()
}

async fn open(store: &Arc<MemoryStore>) -> MapSession {
    MapSession::open(store.clone(), "m1", fast_config()).await.unwrap()
}

// =============================================================================
// open / handle
// =============================================================================

#[tokio::test]
async fn open_missing_map_starts_empty() {
    let store = Arc::new(MemoryStore::new());
    let session = open(&store).await;
    assert_eq!(session.map_id(), "m1");
    assert_eq!(session.core.scene.layers.len(), 1);
    assert!(!session.core.history.can_undo());
    session.close().await;
}

#[tokio::test]
async fn scene_change_is_saved() {
    let store = Arc::new(MemoryStore::new());
    let mut session = open(&store).await;

    let actions = session.core.add_generic_token();
    session.handle(&actions).await.unwrap();
    session.close().await;

    let saved = persistence::load_scene(&*store, &fast_config(), "m1").await.unwrap();
    assert_eq!(saved.entity_count(), 1);
}

#[tokio::test]
async fn render_only_actions_do_not_save() {
    let store = Arc::new(MemoryStore::new());
    let mut session = open(&store).await;
    session.handle(&[Action::RenderNeeded]).await.unwrap();
    session.close().await;
    assert!(store.get("maps", "m1").await.unwrap().is_none());
}

// =============================================================================
// apply_remote
// =============================================================================

#[tokio::test]
async fn echo_of_own_save_keeps_history() {
    let store = Arc::new(MemoryStore::new());
    let mut session = open(&store).await;
    let mut rx = session.subscribe();

    let actions = session.core.add_generic_token();
    session.handle(&actions).await.unwrap();
    let echo = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();

    assert!(session.apply_remote(&echo).is_empty());
    assert!(session.core.history.can_undo());
    assert_eq!(session.core.scene.entity_count(), 1);
    session.close().await;
}

#[tokio::test]
async fn remote_scene_replaces_local_and_resets_history() {
    let store = Arc::new(MemoryStore::new());
    let mut session = open(&store).await;
    let actions = session.core.add_generic_token();
    session.handle(&actions).await.unwrap();

    let mut other = Scene::default();
    other.add_layer("Remote");
    let actions = session.apply_remote(&remote_doc(&other));

    assert!(actions.contains(&Action::RenderNeeded));
    assert!(!actions.contains(&Action::SceneChanged));
    assert_eq!(session.core.scene.layers.len(), 2);
    assert_eq!(session.core.scene.entity_count(), 0);
    assert!(!session.core.history.can_undo());
    session.close().await;
}

#[tokio::test]
async fn malformed_remote_scene_is_ignored() {
    let store = Arc::new(MemoryStore::new());
    let mut session = open(&store).await;
    let actions = session.core.add_generic_token();
    session.handle(&actions).await.unwrap();

    let mut doc = Document::new();
    doc.insert("mapState".into(), Value::String("{oops".into()));
    assert!(session.apply_remote(&doc).is_empty());
    assert_eq!(session.core.scene.entity_count(), 1);
    session.close().await;
}

#[tokio::test]
async fn document_without_scene_is_ignored() {
    let store = Arc::new(MemoryStore::new());
    let mut session = open(&store).await;
    let mut doc = Document::new();
    doc.insert("title".into(), Value::String("Renamed".into()));
    assert!(session.apply_remote(&doc).is_empty());
    session.close().await;
}

// =============================================================================
// run
// =============================================================================

#[tokio::test]
async fn run_handles_edits_and_remote_updates_together() {
    let store = Arc::new(MemoryStore::new());
    let session = open(&store).await;
    let (remote_tx, remote_rx) = broadcast::channel(4);
    let (edit_tx, edit_rx) = mpsc::channel::<Edit>(4);
    let (out_tx, mut out_rx) = mpsc::channel(8);
    let task = tokio::spawn(session.run(remote_rx, edit_rx, out_tx));

    let mut other = Scene::default();
    other.add_layer("From peer");
    remote_tx.send(remote_doc(&other)).unwrap();
    let applied = tokio::time::timeout(Duration::from_secs(2), out_rx.recv()).await.unwrap().unwrap();
    assert!(applied.contains(&Action::RenderNeeded));

    edit_tx.send(Box::new(EngineCore::add_generic_token)).await.unwrap();
    let edited = tokio::time::timeout(Duration::from_secs(2), out_rx.recv()).await.unwrap().unwrap();
    assert!(edited.contains(&Action::SceneChanged));

    drop(edit_tx);
    task.await.unwrap();

    let saved = persistence::load_scene(&*store, &fast_config(), "m1").await.unwrap();
    assert_eq!(saved.layers[1].name, "From peer");
    assert_eq!(saved.entity_count(), 1);
}

#[tokio::test]
async fn run_keeps_taking_edits_after_the_subscription_closes() {
    let store = Arc::new(MemoryStore::new());
    let session = open(&store).await;
    let (remote_tx, remote_rx) = broadcast::channel::<Document>(1);
    drop(remote_tx);
    let (edit_tx, edit_rx) = mpsc::channel::<Edit>(4);
    let (out_tx, mut out_rx) = mpsc::channel(8);
    let task = tokio::spawn(session.run(remote_rx, edit_rx, out_tx));

    edit_tx.send(Box::new(EngineCore::add_generic_token)).await.unwrap();
    let edited = tokio::time::timeout(Duration::from_secs(2), out_rx.recv()).await.unwrap().unwrap();
    assert!(edited.contains(&Action::SceneChanged));
    drop(edit_tx);
    task.await.unwrap();
}
