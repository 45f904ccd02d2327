//! Integration tests for the trust gate in both approval modes.
//!
//! Covers the ungated path, a TOTP send that times out waiting for a code,
//! a waiting send released by a code submitted mid-wait, and socket-mode
//! decisions from a live Unix-socket approval service.

#![allow(clippy::arithmetic_side_effects)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use warden_approval::{
    ApprovalPrompt, ApprovalWindowManager, GateRequest, PromptListeners, TrustGate, WindowScope,
};
use warden_audit::{AuditLog, BlockReason, read_entries};
use warden_config::{ApprovalMode, Config};
use warden_core::WardenHome;
use warden_crypto::totp;
use warden_runtime::{DeliveryOutcome, MessageSender, OutboundMessage, Warden};

struct NullSender;

#[async_trait]
impl MessageSender for NullSender {
    async fn send(&self, _message: &OutboundMessage) -> Result<(), String> {
        Ok(())
    }
}

fn gated(mode: ApprovalMode) -> Config {
    let mut config = Config::default();
    config.trust_gate.trust_level = 1;
    config.trust_gate.mode = mode;
    config.vault.passphrase_env = "WARDEN_IT_PASSPHRASE_UNSET".to_owned();
    config.vault.mirror_to_memory = false;
    config
}

fn request() -> GateRequest<'static> {
    GateRequest {
        channel: "telegram",
        recipient: "alice",
        content: "meet at noon",
        session_id: Some("session-1"),
    }
}

#[tokio::test]
async fn trust_level_zero_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("outbound.jsonl");
    let windows = Arc::new(ApprovalWindowManager::new());
    let listeners = Arc::new(PromptListeners::new());
    let prompts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&prompts);
    let _ = listeners.register(Arc::new(move |_: &ApprovalPrompt| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    let gate = TrustGate::new(
        Arc::clone(&windows),
        listeners,
        Arc::new(AuditLog::new(&audit_path)),
    );

    for mode in [ApprovalMode::Socket, ApprovalMode::Totp] {
        let mut config = gated(mode);
        config.trust_gate.trust_level = 0;
        let result = gate.request_approval(&config, &request()).await;
        assert!(result.allowed);
        assert!(result.decision.is_none());
    }

    assert!(read_entries(&audit_path).unwrap().is_empty());
    assert_eq!(prompts.load(Ordering::SeqCst), 0);
    let snapshot = windows.snapshot();
    assert!(!snapshot.active);
    assert_eq!(snapshot.pending, 0);
}

#[tokio::test(start_paused = true)]
async fn totp_without_window_times_out_pending() {
    let dir = tempfile::tempdir().unwrap();
    let warden = Warden::new(gated(ApprovalMode::Totp), WardenHome::from_path(dir.path()));
    let prompts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&prompts);
    let _ = warden
        .prompt_listeners()
        .register(Arc::new(move |prompt: &ApprovalPrompt| {
            assert_eq!(prompt.recipient, "alice");
            counter.fetch_add(1, Ordering::SeqCst);
        }));

    let started = tokio::time::Instant::now();
    let outcome = warden
        .deliver(&OutboundMessage::new("telegram", "alice", "hi"), &NullSender)
        .await
        .unwrap();
    assert!(started.elapsed() >= Duration::from_secs(120));

    match outcome {
        DeliveryOutcome::Blocked {
            reason: BlockReason::TrustGate,
            prompt_message: Some(_),
        } => {},
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(prompts.load(Ordering::SeqCst), 1);

    let entries = read_entries(&warden.home().audit_log_path()).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].block_reason, Some(BlockReason::TrustGate));
    assert_eq!(warden.windows().pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn code_submitted_mid_wait_releases_send() {
    let dir = tempfile::tempdir().unwrap();
    let warden = Arc::new(Warden::new(
        gated(ApprovalMode::Totp),
        WardenHome::from_path(dir.path()),
    ));
    let enrollment = warden.enroll_totp().unwrap();

    let waiting = {
        let warden = Arc::clone(&warden);
        tokio::spawn(async move {
            warden
                .deliver(&OutboundMessage::new("telegram", "alice", "hi"), &NullSender)
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(warden.windows().pending_count(), 1);

    let now = Utc::now();
    let code = totp::generate_code(&enrollment.secret, now).unwrap();
    let released = warden
        .submit_totp_code(&code, WindowScope::default(), now)
        .unwrap();
    assert_eq!(released, 1);

    assert!(waiting.await.unwrap().unwrap().is_sent());
    let entries = read_entries(&warden.home().audit_log_path()).unwrap();
    assert_eq!(entries.len(), 1);
    assert!(!entries[0].blocked);
}

#[tokio::test(start_paused = true)]
async fn closing_window_denies_waiters_immediately() {
    let windows = Arc::new(ApprovalWindowManager::new());
    let waiter = {
        let windows = Arc::clone(&windows);
        tokio::spawn(async move {
            windows
                .wait_for_approval("message.send", Duration::from_secs(600))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(windows.close_window(), 1);
    assert!(!waiter.await.unwrap());
}

#[cfg(unix)]
mod socket {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::UnixListener;

    use super::*;

    /// Answer every request with `decision`, echoing the request id.
    fn spawn_service(listener: UnixListener, decision: &'static str) {
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let (read_half, mut write_half) = stream.into_split();
                let mut lines = BufReader::new(read_half).lines();
                let Ok(Some(line)) = lines.next_line().await else {
                    continue;
                };
                let value: serde_json::Value = serde_json::from_str(&line).unwrap();
                assert_eq!(value["request"]["argv"][0], "message.send");
                let reply = serde_json::json!({
                    "type": "decision",
                    "id": value["id"],
                    "decision": decision,
                });
                let _ = write_half
                    .write_all(format!("{reply}\n").as_bytes())
                    .await;
            }
        });
    }

    fn warden_with_service(dir: &std::path::Path, decision: &'static str) -> Warden {
        let socket_path = dir.join("approvals.sock");
        spawn_service(UnixListener::bind(&socket_path).unwrap(), decision);
        let mut config = gated(ApprovalMode::Socket);
        config.trust_gate.socket.path = Some(socket_path);
        Warden::new(config, WardenHome::from_path(dir.join("home")))
    }

    #[tokio::test]
    async fn socket_allow_sends() {
        let dir = tempfile::tempdir().unwrap();
        let warden = warden_with_service(dir.path(), "allow-always");
        let outcome = warden
            .deliver(&OutboundMessage::new("telegram", "alice", "hi"), &NullSender)
            .await
            .unwrap();
        assert!(outcome.is_sent());
    }

    #[tokio::test]
    async fn socket_deny_is_audited() {
        let dir = tempfile::tempdir().unwrap();
        let warden = warden_with_service(dir.path(), "deny");
        let outcome = warden
            .deliver(&OutboundMessage::new("telegram", "alice", "hi"), &NullSender)
            .await
            .unwrap();
        assert_eq!(outcome.block_reason(), Some(BlockReason::TrustGate));

        let entries = read_entries(&warden.home().audit_log_path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].block_reason, Some(BlockReason::TrustGate));
    }

    #[tokio::test]
    async fn unreachable_service_denies() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = gated(ApprovalMode::Socket);
        config.trust_gate.socket.path = Some(dir.path().join("nobody-listens.sock"));
        let warden = Warden::new(config, WardenHome::from_path(dir.path()));
        let outcome = warden
            .deliver(&OutboundMessage::new("telegram", "alice", "hi"), &NullSender)
            .await
            .unwrap();
        assert_eq!(outcome.block_reason(), Some(BlockReason::TrustGate));
    }
}
