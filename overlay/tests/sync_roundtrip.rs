//! Replica against a real service over HTTP.

use chrono::Utc;
use subathon_core::RawEvent;
use subathon_core::state::{AddTimeRequest, ContributorInfo, SnapshotStore};
use subathon_overlay::{BackendError, Replica, SyncClient, TimerBackend};
use subathon_server::router::router;
use subathon_server::service::{ServiceHandle, TimerAuthority, TimerService};
use subathon_types::GrantConfig;
use tokio::net::TcpListener;

async fn serve(dir: &std::path::Path) -> (SyncClient, ServiceHandle) {
    let store = SnapshotStore::in_dir(dir);
    let (authority, _) = TimerAuthority::restore(&store, GrantConfig::default(), Utc::now());
    let (handle, _join) = TimerService::spawn(authority, store);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(handle.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (SyncClient::new(format!("http://{addr}/")), handle)
}

#[tokio::test]
async fn test_replica_follows_service() {
    let server_dir = tempfile::tempdir().unwrap();
    let replica_dir = tempfile::tempdir().unwrap();
    let (client, handle) = serve(server_dir.path()).await;

    let (mut replica, _) = Replica::open(
        client.clone(),
        SnapshotStore::in_dir(replica_dir.path()),
        Utc::now(),
    );

    let request = AddTimeRequest {
        seconds: 300,
        reason: Some("sub".into()),
        contributor_info: Some(ContributorInfo {
            username: Some("gifter".into()),
            gift_count: 5,
            ..Default::default()
        }),
    };
    replica.add_time(request, Utc::now()).await.unwrap();
    replica.start(Utc::now()).await.unwrap();

    assert_eq!(replica.timer().total_contributions(), 5);
    assert!(replica.timer().is_running());

    let authoritative = handle.state().await.unwrap();
    assert_eq!(authoritative.timer.total_seconds_granted(), 300);
    assert_eq!(authoritative.sub_list.len(), 1);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_client_extras_and_errors() {
    let server_dir = tempfile::tempdir().unwrap();
    let (client, handle) = serve(server_dir.path()).await;

    let view = client
        .feed(&RawEvent::BitsCheer {
            id: Some("c1".into()),
            username: Some("cheer".into()),
            bits: Some(1_000),
        })
        .await
        .unwrap();
    assert_eq!(view.timer.remaining_seconds(), 60);
    assert_eq!(view.total_bits, 1_000);

    let view = client.add_bits(250).await.unwrap();
    assert_eq!(view.total_bits, 1_250);

    client.reset_list().await.unwrap();
    let view = client.fetch_state().await.unwrap();
    assert_eq!(view.total_bits, 0);
    assert_eq!(view.timer.remaining_seconds(), 60);

    let clamped = client.set_time(-1).await.unwrap();
    assert_eq!(clamped.timer.remaining_seconds(), 0);

    let err = client
        .add_time(AddTimeRequest {
            seconds: -1,
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Status { status: 400, .. }));

    handle.shutdown().await.unwrap();
}
