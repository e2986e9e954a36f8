//! Owner-task cache behaviour driven through its public handle.

mod helpers;

use applister::cache::owner::OwnerCache;
use applister::refresh::RefreshSchedule;
use helpers::{ScriptedSource, generation_of};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::broadcast;

const MINUTE: Duration = Duration::from_secs(60);

#[tokio::test(start_paused = true)]
async fn serves_empty_list_before_first_rebuild() {
    let source = ScriptedSource::new(vec![Duration::from_secs(1000)]);
    let (cache, mut owner) = OwnerCache::new(source.clone(), RefreshSchedule::immediate(MINUTE));
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let task = tokio::spawn(async move { owner.run(shutdown_rx).await });

    tokio::time::sleep(Duration::from_secs(10)).await;
    let snapshot = cache.snapshot().await;
    assert_eq!(snapshot.generation, 0);
    assert!(snapshot.apps.is_empty());
    assert!(snapshot.refreshed_at.is_none());
    assert_eq!(source.calls(), 1, "first rebuild starts immediately");

    shutdown_tx.send(()).unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn first_rebuild_resolves_names() {
    let source = ScriptedSource::new(vec![]);
    let (cache, mut owner) = OwnerCache::new(source, RefreshSchedule::immediate(MINUTE));
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let task = tokio::spawn(async move { owner.run(shutdown_rx).await });

    tokio::time::sleep(Duration::from_secs(1)).await;
    let snapshot = cache.snapshot().await;
    assert_eq!(snapshot.generation, 1);
    assert_eq!(snapshot.apps.len(), 1);
    let app = &snapshot.apps[0];
    assert_eq!(app.name, "gen0-app0");
    assert_eq!(app.space, "dev");
    assert_eq!(app.org, "acme");

    shutdown_tx.send(()).unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn last_completed_rebuild_wins() {
    // Ticks at 0s, 60s, 120s. The 60s rebuild takes 100s and lands at 160s,
    // after the 120s rebuild that finished at 130s.
    let source = ScriptedSource::new(vec![
        Duration::ZERO,
        Duration::from_secs(100),
        Duration::from_secs(10),
    ]);
    let (cache, mut owner) = OwnerCache::new(source, RefreshSchedule::immediate(MINUTE));
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let task = tokio::spawn(async move { owner.run(shutdown_rx).await });

    tokio::time::sleep(Duration::from_secs(135)).await;
    let snapshot = cache.snapshot().await;
    assert_eq!(snapshot.generation, 2);
    assert!(snapshot.apps.iter().all(|app| generation_of(app) == "gen2"));

    tokio::time::sleep(Duration::from_secs(35)).await;
    let snapshot = cache.snapshot().await;
    assert_eq!(snapshot.generation, 3);
    assert_eq!(snapshot.apps.len(), 2);
    assert!(snapshot.apps.iter().all(|app| generation_of(app) == "gen1"));

    shutdown_tx.send(()).unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn stale_data_served_while_rebuild_runs() {
    let source = ScriptedSource::new(vec![Duration::ZERO, Duration::from_secs(300)]);
    let (cache, mut owner) = OwnerCache::new(source, RefreshSchedule::immediate(MINUTE));
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let task = tokio::spawn(async move { owner.run(shutdown_rx).await });

    tokio::time::sleep(Duration::from_secs(90)).await;
    let snapshot = cache.snapshot().await;
    assert_eq!(snapshot.generation, 1);
    assert_eq!(snapshot.apps[0].name, "gen0-app0");

    shutdown_tx.send(()).unwrap();
    task.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_see_a_partial_generation() {
    let source = ScriptedSource::new(vec![]);
    let (cache, mut owner) =
        OwnerCache::new(source, RefreshSchedule::immediate(Duration::from_millis(1)));
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let task = tokio::spawn(async move { owner.run(shutdown_rx).await });

    let readers: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move {
                let mut seen = HashSet::new();
                for _ in 0..300 {
                    let snapshot = cache.snapshot().await;
                    let generations: HashSet<&str> =
                        snapshot.apps.iter().map(generation_of).collect();
                    assert!(generations.len() <= 1, "mixed generations: {generations:?}");
                    if let Some(generation) = generations.into_iter().next() {
                        let call: usize = generation.trim_start_matches("gen").parse().unwrap();
                        assert_eq!(snapshot.apps.len(), call + 1);
                        seen.insert(call);
                    }
                    tokio::task::yield_now().await;
                }
                seen
            })
        })
        .collect();

    for reader in readers {
        reader.await.unwrap();
    }

    shutdown_tx.send(()).unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn owner_exits_when_all_handles_drop() {
    let source = ScriptedSource::new(vec![]);
    let (cache, mut owner) = OwnerCache::new(source, RefreshSchedule::delayed(MINUTE));
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let task = tokio::spawn(async move { owner.run(shutdown_rx).await });

    drop(cache);
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("owner should stop once no handle remains")
        .unwrap();
}
