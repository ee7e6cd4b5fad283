mod common;

use std::time::Duration;

use common::{spawn_server, TestSocket};
use serde_json::json;
use tokio::time::{sleep, Instant};
use wt_locks::ws::LivenessSupervisor;

const SILENCE: Duration = Duration::from_millis(200);

#[tokio::test]
async fn snapshot_reports_held_and_free_locks() {
    let (addr, _state) = spawn_server().await;
    let (mut a, locks) = TestSocket::join(addr, "abc123", "wolf-story", 1, "A").await;
    assert!(locks.is_empty());

    assert!(a.claim_ok("tortoise").await);
    a.expect_status("tortoise", true).await;
    assert!(a.claim_ok("hare").await);
    a.expect_status("hare", true).await;
    a.release("hare").await;
    a.expect_status("hare", false).await;

    let (_b, locks) = TestSocket::join(addr, "abc123", "wolf-story", 1, "B").await;
    assert_eq!(
        locks,
        vec![
            json!({"charId": "hare", "locked": false, "isSelf": false}),
            json!({"charId": "tortoise", "locked": true, "isSelf": false}),
        ]
    );

    // A second tab of the holder sees its own lock as self-held
    let (_a2, locks) = TestSocket::join(addr, "abc123", "wolf-story", 1, "A").await;
    assert_eq!(locks[1], json!({"charId": "tortoise", "locked": true, "isSelf": true}));
}

#[tokio::test]
async fn conflicting_claim_is_refused_until_holder_disconnects() {
    let (addr, _state) = spawn_server().await;
    let (mut a, _) = TestSocket::join(addr, "abc123", "wolf-story", 1, "A").await;
    let (mut b, _) = TestSocket::join(addr, "abc123", "wolf-story", 1, "B").await;

    assert!(a.claim_ok("hare").await);
    a.expect_status("hare", true).await;
    b.expect_status("hare", true).await;

    assert!(!b.claim_ok("hare").await);
    a.expect_silence(SILENCE).await;

    // Disconnect without releasing
    drop(a);
    b.expect_status("hare", false).await;
    assert!(b.claim_ok("hare").await);
    b.expect_status("hare", true).await;
}

#[tokio::test]
async fn repeated_claim_by_holder_is_idempotent() {
    let (addr, _state) = spawn_server().await;
    let (mut a, _) = TestSocket::join(addr, "abc123", "wolf-story", 1, "A").await;
    let (mut b, _) = TestSocket::join(addr, "abc123", "wolf-story", 1, "B").await;

    assert!(a.claim_ok("hare").await);
    a.expect_status("hare", true).await;
    b.expect_status("hare", true).await;

    assert!(a.claim_ok("hare").await);
    b.expect_silence(SILENCE).await;
}

#[tokio::test]
async fn release_is_broadcast_to_every_connection() {
    let (addr, _state) = spawn_server().await;
    let (mut a, _) = TestSocket::join(addr, "abc123", "wolf-story", 1, "A").await;
    let (mut b, _) = TestSocket::join(addr, "abc123", "wolf-story", 1, "B").await;
    let (mut c, _) = TestSocket::join(addr, "abc123", "wolf-story", 1, "C").await;

    assert!(a.claim_ok("tortoise").await);
    a.expect_status("tortoise", true).await;
    b.expect_status("tortoise", true).await;
    c.expect_status("tortoise", true).await;

    a.release("tortoise").await;
    a.expect_status("tortoise", false).await;
    b.expect_status("tortoise", false).await;
    c.expect_status("tortoise", false).await;
}

#[tokio::test]
async fn release_by_non_holder_changes_nothing() {
    let (addr, _state) = spawn_server().await;
    let (mut a, _) = TestSocket::join(addr, "abc123", "wolf-story", 1, "A").await;
    let (mut b, _) = TestSocket::join(addr, "abc123", "wolf-story", 1, "B").await;

    assert!(a.claim_ok("hare").await);
    a.expect_status("hare", true).await;
    b.expect_status("hare", true).await;

    b.release("hare").await;
    a.expect_silence(SILENCE).await;
    assert!(!b.claim_ok("hare").await);
}

#[tokio::test]
async fn disconnect_broadcasts_one_status_per_held_character() {
    let (addr, _state) = spawn_server().await;
    let (mut a, _) = TestSocket::join(addr, "abc123", "wolf-story", 1, "A").await;
    let (mut b, _) = TestSocket::join(addr, "abc123", "wolf-story", 1, "B").await;

    assert!(a.claim_ok("hare").await);
    assert!(a.claim_ok("tortoise").await);
    b.expect_status("hare", true).await;
    b.expect_status("tortoise", true).await;

    a.close().await;
    b.expect_status("hare", false).await;
    b.expect_status("tortoise", false).await;
    b.expect_silence(SILENCE).await;
}

#[tokio::test]
async fn silent_holder_is_revoked_by_the_supervisor() {
    let (addr, state) = spawn_server().await;
    let _supervisor = LivenessSupervisor::spawn(
        state.registry.clone(),
        Duration::from_millis(300),
        Duration::from_secs(60),
        Duration::from_millis(50),
    );
    let (mut a, _) = TestSocket::join(addr, "abc123", "wolf-story", 1, "A").await;
    let (mut b, _) = TestSocket::join(addr, "abc123", "wolf-story", 1, "B").await;

    assert!(a.claim_ok("hare").await);
    a.expect_status("hare", true).await;
    b.expect_status("hare", true).await;

    // A stays connected but never heartbeats
    b.expect_status("hare", false).await;
    a.expect_status("hare", false).await;
    assert!(b.claim_ok("hare").await);
}

#[tokio::test]
async fn heartbeats_keep_the_lock_alive() {
    let (addr, state) = spawn_server().await;
    let _supervisor = LivenessSupervisor::spawn(
        state.registry.clone(),
        Duration::from_millis(300),
        Duration::from_secs(60),
        Duration::from_millis(50),
    );
    let (mut a, _) = TestSocket::join(addr, "abc123", "wolf-story", 1, "A").await;
    let (mut b, _) = TestSocket::join(addr, "abc123", "wolf-story", 1, "B").await;

    assert!(a.claim_ok("fox").await);
    b.expect_status("fox", true).await;

    for _ in 0..8 {
        sleep(Duration::from_millis(100)).await;
        a.heartbeat("fox").await;
    }
    b.expect_silence(Duration::from_millis(50)).await;
    assert!(!b.claim_ok("fox").await);
}

#[tokio::test]
async fn silent_connection_is_closed_and_its_locks_released() {
    let (addr, state) = spawn_server().await;
    let _supervisor = LivenessSupervisor::spawn(
        state.registry.clone(),
        Duration::from_secs(60),
        Duration::from_millis(400),
        Duration::from_millis(50),
    );
    let (mut a, _) = TestSocket::join(addr, "abc123", "wolf-story", 1, "A").await;
    let (mut b, _) = TestSocket::join(addr, "abc123", "wolf-story", 1, "B").await;
    assert!(a.claim_ok("hare").await);
    a.expect_status("hare", true).await;
    b.expect_status("hare", true).await;

    // B keeps talking, A goes quiet
    let started = Instant::now();
    for _ in 0..8 {
        sleep(Duration::from_millis(100)).await;
        b.send(json!({"type": "presence"})).await;
    }
    b.expect_status("hare", false).await;
    assert!(a.try_recv(Duration::from_secs(3)).await.is_none());
    assert!(started.elapsed() < Duration::from_secs(3));

    assert!(b.claim_ok("hare").await);
}

#[tokio::test]
async fn malformed_frames_are_ignored() {
    let (addr, _state) = spawn_server().await;
    let (mut a, _) = TestSocket::join(addr, "abc123", "wolf-story", 1, "A").await;

    a.send_raw("not json").await;
    a.send_raw(r#"["claim","hare"]"#).await;
    a.send(json!({"type": "dance", "charId": "hare"})).await;
    a.send(json!({"type": "claim"})).await;
    a.send(json!({"type": "claim", "charId": "   "})).await;
    a.send_binary(vec![1, 2, 3]).await;
    a.expect_silence(SILENCE).await;

    // The array frame must not have taken the lock
    let (mut b, locks) = TestSocket::join(addr, "abc123", "wolf-story", 1, "B").await;
    assert!(locks.is_empty());
    assert!(b.claim_ok("hare").await);
    assert!(!a.claim_ok("hare").await);
}

#[tokio::test]
async fn lock_operations_before_hello_are_dropped() {
    let (addr, _state) = spawn_server().await;
    let mut a = TestSocket::open(addr, "abc123", "wolf-story", 1).await;
    a.claim("hare").await;
    a.expect_silence(SILENCE).await;

    let (mut b, locks) = TestSocket::join(addr, "abc123", "wolf-story", 1, "B").await;
    assert!(locks.is_empty());
    assert!(b.claim_ok("hare").await);
}

#[tokio::test]
async fn rooms_are_isolated_per_slide() {
    let (addr, _state) = spawn_server().await;
    let (mut one, _) = TestSocket::join(addr, "abc123", "wolf-story", 1, "A").await;
    let (mut two, _) = TestSocket::join(addr, "abc123", "wolf-story", 2, "B").await;

    assert!(one.claim_ok("hare").await);
    one.expect_status("hare", true).await;
    two.expect_silence(SILENCE).await;
    assert!(two.claim_ok("hare").await);
}

#[tokio::test]
async fn only_one_of_many_concurrent_claims_wins() {
    let (addr, _state) = spawn_server().await;
    let mut sockets = Vec::new();
    for i in 0..8 {
        let (socket, _) = TestSocket::join(addr, "abc123", "wolf-story", 1, &format!("D{}", i)).await;
        sockets.push(socket);
    }

    for socket in sockets.iter_mut() {
        socket.claim("hare").await;
    }
    let mut winners = 0;
    for socket in sockets.iter_mut() {
        loop {
            let msg = socket.recv().await;
            if msg["type"] == "claim-result" {
                if msg["ok"] == true {
                    winners += 1;
                }
                break;
            }
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn all_connections_observe_the_same_status_order() {
    let (addr, _state) = spawn_server().await;
    let (mut a, _) = TestSocket::join(addr, "abc123", "wolf-story", 1, "A").await;
    let (mut b, _) = TestSocket::join(addr, "abc123", "wolf-story", 1, "B").await;

    for _ in 0..10 {
        a.claim("hare").await;
        a.release("hare").await;
    }

    let mut seen_by_b = Vec::new();
    while seen_by_b.len() < 20 {
        let msg = b.recv().await;
        seen_by_b.push(msg["locked"].as_bool().unwrap());
    }
    let mut seen_by_a = Vec::new();
    while seen_by_a.len() < 20 {
        let msg = a.recv().await;
        if msg["type"] == "status" {
            seen_by_a.push(msg["locked"].as_bool().unwrap());
        }
    }
    let expected: Vec<bool> = (0..20).map(|i| i % 2 == 0).collect();
    assert_eq!(seen_by_b, expected);
    assert_eq!(seen_by_a, expected);
}
