//! End-to-end chat scenarios against a mock Gemini server.

use std::time::Duration;

use friday::model::{DisplayKind, PANE_PLACEHOLDER, WELCOME_TITLE};
use friday::{AgentStatus, Sender};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{
    ANSWER_MODEL, RecordingHost, UTILITY_MODEL, agent, assistant_texts, bodies_for, conversation,
    mount_generation, mock_config,
};

fn answer_path() -> String {
    format!("/v1beta/models/{ANSWER_MODEL}:generateContent")
}

fn utility_path() -> String {
    format!("/v1beta/models/{UTILITY_MODEL}:generateContent")
}

#[tokio::test]
async fn test_answer_fills_pane_title_speech_and_suggestions() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_generation(&server, ANSWER_MODEL, "**Rust** is a systems language.").await;
    mount_generation(
        &server,
        UTILITY_MODEL,
        r#"Here you go: ["Is it fast?", "Is it safe?", "Who uses it?", "Extra?"]"#,
    )
    .await;

    let host = RecordingHost::new();
    let agent = agent(&mock_config(&server, dir.path()), &host);
    // On-device voice keeps the transcript free of voice announcements.
    assert!(!agent.toggle_cloud_voice());

    agent.handle_user_input("What is Rust?").await;
    agent.drain_background().await;

    let convo = conversation(&agent);
    let n = convo.len();
    assert_eq!(convo[n - 2], (Sender::User, "What is Rust?".to_owned()));
    assert_eq!(
        convo[n - 1],
        (Sender::Assistant, "**Rust** is a systems language.".to_owned())
    );

    let thread = agent.with_state(|s| s.active_thread().cloned()).unwrap();
    assert_eq!(thread.title, "What is Rust?");
    assert_eq!(thread.display_content.title, "Thread: What is Rust?");
    assert_eq!(
        thread.display_content.content,
        "## What is Rust?\n\n**Rust** is a systems language."
    );

    assert_eq!(host.spoken(), ["Rust is a systems language."]);
    assert_eq!(
        agent.with_state(|s| s.suggested_questions().to_vec()),
        ["Is it fast?", "Is it safe?", "Who uses it?"]
    );

    let suggestion_calls = bodies_for(&server, &utility_path()).await;
    assert_eq!(suggestion_calls.len(), 1);
    let prompt = suggestion_calls[0]["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap();
    assert!(prompt.contains("**Rust** is a systems language."));
    assert_eq!(agent.status(), AgentStatus::Idle);
}

#[tokio::test]
async fn test_second_answer_is_appended_below_a_rule() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_generation(&server, ANSWER_MODEL, "Answer.").await;
    mount_generation(&server, UTILITY_MODEL, "[]").await;

    let host = RecordingHost::new();
    let agent = agent(&mock_config(&server, dir.path()), &host);
    agent.toggle_cloud_voice();

    agent.handle_user_input("First question").await;
    agent.handle_user_input("Second question").await;
    agent.drain_background().await;

    let thread = agent.with_state(|s| s.active_thread().cloned()).unwrap();
    assert_eq!(thread.title, "First question");
    assert_eq!(
        thread.display_content.content,
        "## First question\n\nAnswer.\n\n---\n\n## Second question\n\nAnswer."
    );
}

#[tokio::test]
async fn test_generation_error_is_reported_and_pane_untouched() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("POST"))
        .and(path(answer_path()))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "API key not valid." }
        })))
        .mount(&server)
        .await;

    let host = RecordingHost::new();
    let agent = agent(&mock_config(&server, dir.path()), &host);
    let before = conversation(&agent).len();

    agent.handle_user_input("Tell me a joke").await;
    agent.drain_background().await;

    let convo = conversation(&agent);
    assert_eq!(convo.len(), before + 2);
    assert_eq!(
        convo[before + 1],
        (
            Sender::Assistant,
            "Sorry, I encountered an error. Gemini request failed: API key not valid.".to_owned()
        )
    );

    let thread = agent.with_state(|s| s.active_thread().cloned()).unwrap();
    assert_eq!(thread.title, WELCOME_TITLE);
    assert_eq!(thread.display_content.content, PANE_PLACEHOLDER);
    assert!(agent.with_state(|s| s.suggested_questions().is_empty()));
    assert!(host.spoken().is_empty());
    assert_eq!(agent.status(), AgentStatus::Idle);
}

#[tokio::test]
async fn test_local_commands_never_reach_the_network() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let host = RecordingHost::new();
    let agent = agent(&mock_config(&server, dir.path()), &host);
    agent.toggle_cloud_voice();

    agent.handle_user_input("/so").await;
    agent.handle_user_input("/arxiv attention is all you need").await;
    agent.handle_user_input("set a reminder to water the plants").await;
    agent.handle_user_input("what time is it?").await;
    agent.drain_background().await;

    assert!(server.received_requests().await.unwrap_or_default().is_empty());
    assert_eq!(
        host.opened(),
        ["https://arxiv.org/search/?query=attention%20is%20all%20you%20need"]
    );

    let texts = assistant_texts(&agent);
    assert!(texts.contains(&"Please provide a search term after /so".to_owned()));
    assert!(texts.contains(&"Reminder set: \"water the plants\"".to_owned()));
    assert!(texts.iter().any(|t| t.starts_with("The current time is ")));

    let pane = agent
        .with_state(|s| s.active_thread().map(|t| t.display_content.clone()))
        .unwrap();
    assert_eq!(pane.kind, DisplayKind::Reminders);
    assert_eq!(pane.content, "- water the plants");
}

#[tokio::test]
async fn test_summary_uses_utility_model_and_fills_pane() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_generation(&server, ANSWER_MODEL, "Borrowing lets you reference data.").await;
    mount_generation(&server, UTILITY_MODEL, "- Discussed borrowing").await;

    let host = RecordingHost::new();
    let agent = agent(&mock_config(&server, dir.path()), &host);
    agent.toggle_cloud_voice();

    agent.handle_user_input("Explain borrowing").await;
    agent.drain_background().await;
    agent.summarize().await;
    agent.drain_background().await;

    let pane = agent
        .with_state(|s| s.active_thread().map(|t| t.display_content.clone()))
        .unwrap();
    assert_eq!(pane.title, "Conversation Summary");
    assert_eq!(pane.content, "- Discussed borrowing");
    assert_eq!(
        host.spoken().last().map(String::as_str),
        Some("Here is a summary of our conversation.")
    );

    let summary_prompt = bodies_for(&server, &utility_path())
        .await
        .into_iter()
        .filter_map(|b| b["contents"][0]["parts"][0]["text"].as_str().map(str::to_owned))
        .find(|p| p.contains("bullet-point summary"))
        .unwrap();
    assert!(summary_prompt.contains("user: Explain borrowing"));
    assert!(summary_prompt.contains("assistant: Borrowing lets you reference data."));
}

#[tokio::test]
async fn test_uploaded_file_rides_along_until_detached() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_generation(&server, ANSWER_MODEL, "It says hello.").await;
    mount_generation(&server, UTILITY_MODEL, "[]").await;

    let host = RecordingHost::new();
    let agent = agent(&mock_config(&server, dir.path()), &host);
    agent.toggle_cloud_voice();

    agent
        .handle_file_upload("notes.txt", "text/plain", b"hello", "  ")
        .await;
    agent.handle_user_input("Is it polite?").await;
    agent.clear_active_file();
    agent.handle_user_input("And now?").await;
    agent.drain_background().await;

    let calls = bodies_for(&server, &answer_path()).await;
    assert_eq!(calls.len(), 3);
    let parts = |i: usize| calls[i]["contents"][0]["parts"].as_array().unwrap().clone();

    assert_eq!(parts(0)[0]["text"], "What should I know about this text?");
    assert_eq!(parts(0)[1]["inline_data"]["data"], "aGVsbG8=");
    assert_eq!(parts(1)[1]["inline_data"]["mime_type"], "text/plain");
    assert_eq!(parts(2).len(), 1);

    let convo = agent.with_state(|s| s.active_thread().cloned()).unwrap();
    let upload = convo
        .conversation
        .iter()
        .find(|m| m.file.is_some())
        .unwrap();
    assert_eq!(upload.text, "What should I know about this text?");
    assert!(assistant_texts(&agent).contains(&"File context has been cleared.".to_owned()));
}

#[tokio::test]
async fn test_late_answer_lands_in_originating_thread() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("POST"))
        .and(path(answer_path()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(crate::helpers::candidate("Slow answer."))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let host = RecordingHost::new();
    let agent = agent(&mock_config(&server, dir.path()), &host);
    agent.toggle_cloud_voice();
    let origin = agent.with_state(|s| s.active_thread_id()).unwrap();

    let pending = tokio::spawn({
        let agent = agent.clone();
        async move { agent.handle_user_input("Slow question").await }
    });
    for _ in 0..200 {
        if !bodies_for(&server, &answer_path()).await.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let other = agent.create_thread();
    pending.await.unwrap();
    agent.drain_background().await;

    let origin_texts: Vec<String> = agent.with_state(|s| {
        s.threads()
            .get(origin)
            .map(|t| t.conversation.iter().map(|m| m.text.clone()).collect())
            .unwrap_or_default()
    });
    assert_eq!(origin_texts.last().map(String::as_str), Some("Slow answer."));
    assert_eq!(agent.with_state(|s| s.active_thread_id()), Some(other));
    assert!(!assistant_texts(&agent).contains(&"Slow answer.".to_owned()));
    assert!(host.spoken().is_empty());
    assert!(agent.with_state(|s| s.suggested_questions().is_empty()));
}
