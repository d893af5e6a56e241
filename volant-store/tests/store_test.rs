use volant_core::ip::IpStatus;
use volant_core::vm::VmStatus;
use volant_store::{ip, vms, with_tx, Store};

async fn open_store() -> (Store, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("volant.db");
    let url = format!("sqlite://{}?mode=rwc", db_path.display());
    let store = Store::connect(&url).await.expect("connect");
    (store, dir)
}

#[tokio::test]
#[serial_test::serial]
async fn create_vm_starts_pending() {
    let (store, _dir) = open_store().await;

    let id = with_tx(store.pool(), |tx| {
        Box::pin(async move { vms::create(tx, "web-1", "demo", "demo", 1, 128, None).await })
    })
    .await
    .expect("create");

    let vm = vms::get_by_name(store.pool(), "web-1")
        .await
        .expect("get")
        .expect("present");
    assert_eq!(vm.id, id);
    assert_eq!(vm.status, VmStatus::Pending);
    assert_eq!(vm.cpu, 1);
    assert_eq!(vm.memory_mib, 128);
}

#[tokio::test]
#[serial_test::serial]
async fn duplicate_vm_name_fails() {
    let (store, _dir) = open_store().await;

    with_tx(store.pool(), |tx| {
        Box::pin(async move { vms::create(tx, "dup", "demo", "demo", 1, 128, None).await })
    })
    .await
    .expect("first create");

    let second = with_tx(store.pool(), |tx| {
        Box::pin(async move { vms::create(tx, "dup", "demo", "demo", 1, 128, None).await })
    })
    .await;

    assert!(second.is_err());
}

#[tokio::test]
#[serial_test::serial]
async fn ip_pool_lease_and_release_round_trips() {
    let (store, _dir) = open_store().await;
    let addresses = vec!["10.0.0.2".to_string(), "10.0.0.3".to_string()];
    ip::ensure_pool(store.pool(), &addresses).await.expect("seed");

    let leased = with_tx(store.pool(), |tx| Box::pin(async move { ip::lease_next(tx).await }))
        .await
        .expect("lease");
    assert_eq!(leased, "10.0.0.2");

    let allocation = ip::get(store.pool(), &leased).await.expect("get").expect("present");
    assert_eq!(allocation.status, IpStatus::Leased);

    ip::release(store.pool(), &leased).await.expect("release");
    let allocation = ip::get(store.pool(), &leased).await.expect("get").expect("present");
    assert_eq!(allocation.status, IpStatus::Available);
}

#[tokio::test]
#[serial_test::serial]
async fn ensure_pool_is_idempotent() {
    let (store, _dir) = open_store().await;
    let addresses = vec!["10.0.0.2".to_string()];
    ip::ensure_pool(store.pool(), &addresses).await.expect("seed once");

    let leased = with_tx(store.pool(), |tx| Box::pin(async move { ip::lease_next(tx).await }))
        .await
        .expect("lease");

    // Re-seeding must not disturb the existing lease.
    ip::ensure_pool(store.pool(), &addresses).await.expect("seed again");
    let allocation = ip::get(store.pool(), &leased).await.expect("get").expect("present");
    assert_eq!(allocation.status, IpStatus::Leased);
}

#[tokio::test]
#[serial_test::serial]
async fn lease_next_fails_when_pool_is_empty() {
    let (store, _dir) = open_store().await;

    let result = with_tx(store.pool(), |tx| Box::pin(async move { ip::lease_next(tx).await })).await;
    assert!(result.is_err());
}
