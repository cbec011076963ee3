//! Session snapshots written by one agent and restored by the next.

use std::fs;

use friday::model::WELCOME_TITLE;
use friday::{DisplayMode, ThreadId};
use wiremock::MockServer;

use crate::helpers::{RecordingHost, agent, mock_config};

const SNAPSHOT_FILE: &str = "friday-threads.json";

#[tokio::test]
async fn test_restart_restores_threads_selection_and_preferences() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = mock_config(&server, dir.path());
    let host = RecordingHost::new();

    let (first, second) = {
        let agent = agent(&config, &host);
        let first = agent.with_state(|s| s.active_thread_id()).unwrap();
        let second = agent.create_thread();
        assert!(agent.rename_thread(first, "  Planning  "));
        assert!(agent.select_thread(first));
        agent.toggle_mute();
        agent.toggle_cloud_voice();
        agent.toggle_cloud_transcription();
        agent.set_display_mode(DisplayMode::Raw);
        (first, second)
    };
    assert!(dir.path().join(SNAPSHOT_FILE).exists());

    let restored = agent(&config, &host);
    let state = restored.state();
    let ids: Vec<ThreadId> = state.threads().threads().iter().map(|t| t.id).collect();
    assert_eq!(ids, [first, second]);
    assert_eq!(state.active_thread_id(), Some(first));
    assert_eq!(state.active_thread().map(|t| t.title.as_str()), Some("Planning"));
    assert!(state.is_muted());
    assert!(!state.use_cloud_voice());
    assert!(state.use_cloud_transcription());
    assert_eq!(state.display_mode(), DisplayMode::Raw);

    let third = restored.create_thread();
    assert!(third.0 > second.0);
}

#[tokio::test]
async fn test_legacy_snapshot_with_dangling_selection_loads() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join(SNAPSHOT_FILE),
        r###"{
            "threads": [{
                "id": 1700000000000,
                "title": "Old chat",
                "conversation": [
                    {"id": 1700000000001, "from": "user", "text": "hi"},
                    {"id": 1700000000002, "from": "assistant", "text": "hello"}
                ],
                "displayContent": {"title": "Thread: hi", "content": "## hi\n\nhello", "type": "markdown"}
            }],
            "activeThreadId": 42,
            "isMuted": true,
            "useGoogleTTS": false
        }"###,
    )
    .unwrap();

    let host = RecordingHost::new();
    let agent = agent(&mock_config(&server, dir.path()), &host);
    let state = agent.state();

    assert_eq!(state.threads().len(), 1);
    assert_eq!(state.active_thread_id(), Some(ThreadId(1_700_000_000_000)));
    let thread = state.active_thread().unwrap();
    assert_eq!(thread.title, "Old chat");
    assert_eq!(thread.conversation.len(), 2);
    assert_eq!(thread.display_content.title, "Thread: hi");
    assert!(state.is_muted());
    assert!(!state.use_cloud_voice());
    assert!(!state.use_cloud_transcription());
    assert_eq!(state.display_mode(), DisplayMode::Rendered);

    // The healed selection is written back in the current format.
    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join(SNAPSHOT_FILE)).unwrap())
            .unwrap();
    assert_eq!(saved["active_thread_id"], 1_700_000_000_000u64);
    assert_eq!(saved["muted"], true);
}

#[tokio::test]
async fn test_corrupt_snapshot_starts_a_fresh_session() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(SNAPSHOT_FILE), "{ not json").unwrap();

    let host = RecordingHost::new();
    let agent = agent(&mock_config(&server, dir.path()), &host);
    let state = agent.state();

    assert_eq!(state.threads().len(), 1);
    assert_eq!(
        state.active_thread().map(|t| t.title.as_str()),
        Some(WELCOME_TITLE)
    );
    assert!(state.use_cloud_voice());

    // Startup leaves the unreadable file alone and keeps a copy of it.
    let snapshot = dir.path().join(SNAPSHOT_FILE);
    let preserved = dir.path().join(format!("{SNAPSHOT_FILE}.corrupt"));
    assert_eq!(fs::read_to_string(&snapshot).unwrap(), "{ not json");
    assert_eq!(fs::read_to_string(&preserved).unwrap(), "{ not json");

    // The first change replaces the session; the copy survives.
    agent.create_thread();
    let rewritten = fs::read_to_string(&snapshot).unwrap();
    assert!(serde_json::from_str::<serde_json::Value>(&rewritten).is_ok());
    assert_eq!(fs::read_to_string(&preserved).unwrap(), "{ not json");
}

#[tokio::test]
async fn test_snapshot_missing_titles_and_message_ids_loads() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join(SNAPSHOT_FILE),
        r#"{"threads": [{"id": 5, "conversation": [{"from": "user", "text": "hi"}]}]}"#,
    )
    .unwrap();

    let host = RecordingHost::new();
    let agent = agent(&mock_config(&server, dir.path()), &host);
    let state = agent.state();

    assert_eq!(state.active_thread_id(), Some(ThreadId(5)));
    let thread = state.active_thread().unwrap();
    assert_eq!(thread.title, WELCOME_TITLE);
    assert_eq!(thread.conversation[0].text, "hi");
    assert!(thread.conversation[0].id > 5);
    assert!(!dir.path().join(format!("{SNAPSHOT_FILE}.corrupt")).exists());
}

#[tokio::test]
async fn test_deleting_every_thread_persists_one_fresh_thread() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = mock_config(&server, dir.path());
    let host = RecordingHost::new();

    {
        let agent = agent(&config, &host);
        let second = agent.create_thread();
        let first = agent
            .with_state(|s| s.threads().threads().first().map(|t| t.id))
            .unwrap();
        assert!(agent.delete_thread(second));
        assert_eq!(agent.with_state(|s| s.active_thread_id()), Some(first));
        assert!(agent.delete_thread(first));

        let (count, active) =
            agent.with_state(|s| (s.threads().len(), s.active_thread_id()));
        assert_eq!(count, 1);
        assert!(active.is_some());
        assert_ne!(active, Some(first));
    }

    let restored = agent(&config, &host);
    assert_eq!(restored.with_state(|s| s.threads().len()), 1);
    assert!(restored.with_state(|s| s.active_thread().is_some()));
}

#[tokio::test]
async fn test_clear_all_replaces_history_on_disk() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = mock_config(&server, dir.path());
    let host = RecordingHost::new();

    let fresh = {
        let agent = agent(&config, &host);
        agent.create_thread();
        agent.create_thread();
        agent.clear_all()
    };

    let restored = agent(&config, &host);
    let ids: Vec<ThreadId> = restored.with_state(|s| s.threads().threads().iter().map(|t| t.id).collect());
    assert_eq!(ids, [fresh]);
}
