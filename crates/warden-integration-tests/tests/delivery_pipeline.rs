//! Integration tests for the delivery pipeline, loaded from a config file.

#![allow(clippy::arithmetic_side_effects)]

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use warden_audit::{BlockReason, MAX_CONTENT_CHARS, read_entries};
use warden_runtime::{DeliveryOutcome, MessageSender, OutboundMessage, RuntimeError, Warden};

#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<String>>,
}

impl RecordingSender {
    fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, message: &OutboundMessage) -> Result<(), String> {
        self.sent.lock().unwrap().push(message.content.clone());
        Ok(())
    }
}

fn load(home: &Path, config: &str) -> Warden {
    std::fs::create_dir_all(home).unwrap();
    std::fs::write(home.join("config.toml"), config).unwrap();
    Warden::load(Some(home)).unwrap()
}

fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

const LIMITED: &str = r#"
[vault]
passphrase_env = "WARDEN_IT_PASSPHRASE_UNSET"
mirror_to_memory = false

[delivery]
deny_commands = ["/reset"]

[rate_limits.channels.telegram]
max_per_minute = 3

[rate_limits.channels.telegram.accounts.work]
max_per_minute = 1
overflow = "drop"
"#;

#[tokio::test]
async fn rate_limit_slides_per_minute() {
    let dir = tempfile::tempdir().unwrap();
    let warden = load(dir.path(), LIMITED);
    let sender = RecordingSender::default();
    let msg = OutboundMessage::new("telegram", "alice", "hi");

    for i in 0..3 {
        let now = t0() + TimeDelta::seconds(i);
        assert!(warden.deliver_at(&msg, &sender, now).await.unwrap().is_sent());
    }
    let err = warden
        .deliver_at(&msg, &sender, t0() + TimeDelta::seconds(30))
        .await
        .unwrap_err();
    match err {
        RuntimeError::RateLimited { channel, reason } => {
            assert_eq!(channel, "telegram");
            assert!(reason.contains("3/3"));
        },
        other => panic!("unexpected {other:?}"),
    }

    let later = t0() + TimeDelta::seconds(63);
    assert!(warden.deliver_at(&msg, &sender, later).await.unwrap().is_sent());
    assert_eq!(sender.count(), 4);

    let reasons: Vec<_> = read_entries(&warden.home().audit_log_path())
        .unwrap()
        .into_iter()
        .map(|e| e.block_reason)
        .collect();
    assert_eq!(
        reasons,
        vec![None, None, None, Some(BlockReason::RateLimit), None]
    );
}

#[tokio::test]
async fn account_override_drops_silently() {
    let dir = tempfile::tempdir().unwrap();
    let warden = load(dir.path(), LIMITED);
    let sender = RecordingSender::default();
    let work = OutboundMessage::new("telegram", "bob", "hi").with_account("work");

    assert!(warden.deliver_at(&work, &sender, t0()).await.unwrap().is_sent());
    let outcome = warden.deliver_at(&work, &sender, t0()).await.unwrap();
    assert!(matches!(outcome, DeliveryOutcome::Dropped { .. }));

    // The account bucket is separate from the channel bucket.
    let personal = OutboundMessage::new("telegram", "bob", "hi");
    assert!(warden.deliver_at(&personal, &sender, t0()).await.unwrap().is_sent());
    assert_eq!(sender.count(), 2);
}

#[tokio::test]
async fn denied_command_never_reaches_sender() {
    let dir = tempfile::tempdir().unwrap();
    let warden = load(dir.path(), LIMITED);
    let sender = RecordingSender::default();

    let outcome = warden
        .deliver(&OutboundMessage::new("telegram", "alice", "/reset now"), &sender)
        .await
        .unwrap();
    assert_eq!(outcome.block_reason(), Some(BlockReason::DenyCommands));
    assert_eq!(sender.count(), 0);
}

#[tokio::test]
async fn broken_audit_path_does_not_block_sending() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();
    let config = format!(
        "[audit]\npath = \"{}\"\n\n[vault]\nmirror_to_memory = false\n",
        blocker.join("outbound.jsonl").display()
    );
    let warden = load(&dir.path().join("home"), &config);
    let sender = RecordingSender::default();

    for _ in 0..2 {
        let outcome = warden
            .deliver(&OutboundMessage::new("telegram", "alice", "hi"), &sender)
            .await
            .unwrap();
        assert!(outcome.is_sent());
    }
    assert_eq!(sender.count(), 2);
}

#[tokio::test]
async fn audit_lines_are_json_and_truncated() {
    let dir = tempfile::tempdir().unwrap();
    let warden = load(dir.path(), "[vault]\nmirror_to_memory = false\n");
    let sender = RecordingSender::default();
    let long = "x".repeat(MAX_CONTENT_CHARS + 500);

    warden
        .deliver(&OutboundMessage::new("telegram", "alice", "short"), &sender)
        .await
        .unwrap();
    warden
        .deliver(&OutboundMessage::new("telegram", "alice", long.clone()), &sender)
        .await
        .unwrap();

    let raw = std::fs::read_to_string(warden.home().audit_log_path()).unwrap();
    let lines: Vec<_> = raw.lines().collect();
    assert_eq!(lines.len(), 2);
    for line in &lines {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["channel"], "telegram");
        assert!(value.get("blockReason").is_some());
    }
    let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(
        second["content"].as_str().unwrap().chars().count(),
        MAX_CONTENT_CHARS
    );

    // The sender still got the full message.
    assert_eq!(sender.sent.lock().unwrap()[1], long);
}

#[tokio::test]
async fn watch_mode_audits_without_sending() {
    let dir = tempfile::tempdir().unwrap();
    let warden = load(
        dir.path(),
        "[delivery]\nwatch_mode = true\n\n[vault]\nmirror_to_memory = false\n",
    );
    let sender = RecordingSender::default();

    let outcome = warden
        .deliver(&OutboundMessage::new("telegram", "alice", "hi").with_session("s"), &sender)
        .await
        .unwrap();
    assert_eq!(outcome.block_reason(), Some(BlockReason::WatchMode));
    assert_eq!(sender.count(), 0);

    let entries = read_entries(&warden.home().audit_log_path()).unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].blocked);
    assert_eq!(entries[0].session_id.as_deref(), Some("s"));
}

#[test]
fn invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.toml"), "[totp]\nwindow_minutes = 0\n").unwrap();
    let err = Warden::load(Some(dir.path())).unwrap_err();
    assert!(matches!(err, RuntimeError::ConfigError(_)));
}
