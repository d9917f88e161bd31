use armature_locks::{NamedLocks, lock_key};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Barrier;
use tokio::time::{Instant, sleep, timeout};

#[tokio::test(start_paused = true)]
async fn test_second_holder_starts_after_first_releases() {
    let locks = Arc::new(NamedLocks::new());
    let hold = Duration::from_millis(100);

    let first_guard = locks.lock("vnet-A").await;
    let first_acquired = Instant::now();

    let second = {
        let locks = Arc::clone(&locks);
        tokio::spawn(async move {
            let _guard = locks.lock("vnet-A").await;
            Instant::now()
        })
    };

    sleep(hold).await;
    first_guard.unlock();

    let second_acquired = second.await.unwrap();
    assert!(second_acquired.duration_since(first_acquired) >= hold);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_different_keys_hold_simultaneously() {
    let locks = Arc::new(NamedLocks::new());
    // Both critical sections must be inside the barrier at the same time,
    // which is impossible if the keys serialize against each other.
    let barrier = Arc::new(Barrier::new(2));

    let tasks: Vec<_> = ["vnet-A", "vnet-B"]
        .into_iter()
        .map(|key| {
            let locks = Arc::clone(&locks);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                let _guard = locks.lock(key).await;
                barrier.wait().await;
            })
        })
        .collect();

    for task in tasks {
        timeout(Duration::from_secs(5), task)
            .await
            .expect("distinct keys blocked each other")
            .unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_key_is_mutually_exclusive() {
    let locks = Arc::new(NamedLocks::new());
    let inside = Arc::new(AtomicBool::new(false));
    let entered = Arc::new(AtomicUsize::new(0));
    let key = lock_key("azurerm_virtual_network", "shared");

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let locks = Arc::clone(&locks);
            let inside = Arc::clone(&inside);
            let entered = Arc::clone(&entered);
            let key = key.clone();
            tokio::spawn(async move {
                for _ in 0..25 {
                    let _guard = locks.lock(&key).await;
                    assert!(
                        !inside.swap(true, Ordering::SeqCst),
                        "two holders inside the critical section"
                    );
                    entered.fetch_add(1, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    inside.store(false, Ordering::SeqCst);
                }
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(entered.load(Ordering::SeqCst), 8 * 25);
    assert_eq!(locks.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overlapping_lock_all_does_not_deadlock() {
    let locks = Arc::new(NamedLocks::new());

    // Each task names the same pair in opposite orders; acquisition order
    // is normalized by the registry.
    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let keys = if i % 2 == 0 {
                    ["virtual-network", "subnet"]
                } else {
                    ["subnet", "virtual-network"]
                };
                let _guard = locks.lock_all(keys).await;
                tokio::task::yield_now().await;
            })
        })
        .collect();

    for task in tasks {
        timeout(Duration::from_secs(5), task)
            .await
            .expect("lock_all deadlocked")
            .unwrap();
    }
}

#[tokio::test]
async fn test_cancelled_waiter_does_not_leak_the_lock() {
    let locks = NamedLocks::new();
    let held = locks.lock("vnet-A").await;

    let waited = timeout(Duration::from_millis(10), locks.lock("vnet-A")).await;
    assert!(waited.is_err());

    held.unlock();
    assert!(locks.try_lock("vnet-A").is_some());
}
