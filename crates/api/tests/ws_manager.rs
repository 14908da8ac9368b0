//! Tests for `WsManager` without HTTP upgrades: registration, fan-out,
//! per-user delivery and shutdown.

use assert_matches::assert_matches;
use axum::extract::ws::Message;
use texgen_api::ws::WsManager;
use texgen_core::types::DbId;

fn is_text(msg: &Message, expected: &str) -> bool {
    matches!(msg, Message::Text(t) if *t == expected)
}

#[tokio::test]
async fn add_and_remove_track_connection_count() {
    let manager = WsManager::new();
    assert_eq!(manager.connection_count().await, 0);

    let _rx1 = manager.add("conn-1".into(), DbId::new_v4()).await;
    let _rx2 = manager.add("conn-2".into(), DbId::new_v4()).await;
    assert_eq!(manager.connection_count().await, 2);

    manager.remove("nonexistent").await;
    assert_eq!(manager.connection_count().await, 2);

    manager.remove("conn-1").await;
    assert_eq!(manager.connection_count().await, 1);
}

#[tokio::test]
async fn broadcast_reaches_every_open_connection() {
    let manager = WsManager::new();

    let closed = manager.add("conn-1".into(), DbId::new_v4()).await;
    let mut rx2 = manager.add("conn-2".into(), DbId::new_v4()).await;
    let mut rx3 = manager.add("conn-3".into(), DbId::new_v4()).await;
    drop(closed);

    manager.broadcast(Message::Text("queue drained".into())).await;

    assert!(is_text(&rx2.recv().await.unwrap(), "queue drained"));
    assert!(is_text(&rx3.recv().await.unwrap(), "queue drained"));
}

#[tokio::test]
async fn send_to_user_reaches_all_of_their_connections_only() {
    let manager = WsManager::new();
    let alice = DbId::new_v4();

    let mut tab1 = manager.add("a-1".into(), alice).await;
    let mut tab2 = manager.add("a-2".into(), alice).await;
    let mut other = manager.add("b-1".into(), DbId::new_v4()).await;

    let delivered = manager
        .send_to_user(alice, Message::Text("job completed".into()))
        .await;

    assert_eq!(delivered, 2);
    assert!(is_text(&tab1.recv().await.unwrap(), "job completed"));
    assert!(is_text(&tab2.recv().await.unwrap(), "job completed"));
    assert!(other.try_recv().is_err());
}

#[tokio::test]
async fn send_to_user_without_connections_delivers_nothing() {
    let manager = WsManager::new();
    let _rx = manager.add("conn-1".into(), DbId::new_v4()).await;

    let delivered = manager
        .send_to_user(DbId::new_v4(), Message::Text("x".into()))
        .await;
    assert_eq!(delivered, 0);
}

#[tokio::test]
async fn duplicate_id_replaces_previous_connection() {
    let manager = WsManager::new();
    let user = DbId::new_v4();

    let _old = manager.add("conn-1".into(), user).await;
    let mut new = manager.add("conn-1".into(), user).await;
    assert_eq!(manager.connection_count().await, 1);

    manager.broadcast(Message::Text("replaced".into())).await;
    assert!(is_text(&new.recv().await.unwrap(), "replaced"));
}

#[tokio::test]
async fn ping_all_sends_ping_frames() {
    let manager = WsManager::new();
    let mut rx = manager.add("conn-1".into(), DbId::new_v4()).await;

    manager.ping_all().await;

    assert_matches!(rx.recv().await, Some(Message::Ping(_)));
}

#[tokio::test]
async fn shutdown_all_sends_close_and_clears() {
    let manager = WsManager::new();
    let mut rx1 = manager.add("conn-1".into(), DbId::new_v4()).await;
    let mut rx2 = manager.add("conn-2".into(), DbId::new_v4()).await;

    manager.shutdown_all().await;

    assert_eq!(manager.connection_count().await, 0);
    assert_matches!(rx1.recv().await, Some(Message::Close(None)));
    assert_matches!(rx2.recv().await, Some(Message::Close(None)));

    // Senders were dropped with the registry.
    assert!(rx1.recv().await.is_none());
}
