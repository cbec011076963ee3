//! Terminal front end for the Friday assistant.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use friday::host::console::{ConsoleSpeech, ProcessAudioOutput, SystemNavigator};
use friday::model::DisplayKind;
use friday::store::FsKeyValueStore;
use friday::{Agent, AgentConfig, DisplayMode, HostCapabilities, Sender, ThreadId};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Friday: a conversational assistant with cloud voice.
#[derive(Parser)]
#[command(name = "friday", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Audio player used for premium voice clips (e.g. `mpg123`, `afplay`).
    #[arg(long)]
    player: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Chat interactively (default).
    Chat,

    /// List saved conversation threads.
    Threads,

    /// Write the default configuration file.
    InitConfig,
}

const HELP: &str = "\
Commands:
  :new                 start a new thread
  :list                list threads
  :select <id>         switch thread
  :delete <id>         delete a thread
  :rename <id> <title> rename a thread
  :clear               delete every thread
  :summarize           summarize the active thread
  :attach <path> [prompt]  ask about a file
  :detach              drop the active file
  :transcribe <path>   send a recorded clip to speech recognition
  :mute | :voice | :stt   toggle mute, cloud voice, cloud transcription
  :raw                 toggle raw/rendered pane
  :pane                show the display pane
  :quit
Shortcuts: /wp, /so, /arxiv, /mdn, /web.dev <query>; \"set a reminder to ...\"; \"what time is it\"";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("friday=info,reqwest=warn")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(AgentConfig::default_config_path);
    let config = load_config(&config_path)?;

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => run_chat(config, cli.player).await,
        Command::Threads => list_saved_threads(config),
        Command::InitConfig => {
            AgentConfig::default().save_to_file(&config_path)?;
            println!("Wrote {}", config_path.display());
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<AgentConfig> {
    let config = if path.exists() {
        AgentConfig::from_file(path)?
    } else {
        info!("no config at {}, using defaults", path.display());
        AgentConfig::default()
    };
    Ok(config.with_env_overrides())
}

fn build_agent(config: &AgentConfig, player: Option<String>) -> anyhow::Result<Agent> {
    let store = FsKeyValueStore::new(&config.storage.data_dir)?;
    let host = HostCapabilities::new(
        Arc::new(ConsoleSpeech),
        Arc::new(ProcessAudioOutput::new(player, std::env::temp_dir())),
        Arc::new(SystemNavigator),
    );
    Ok(Agent::from_config(config, host, Arc::new(store)))
}

fn list_saved_threads(config: AgentConfig) -> anyhow::Result<()> {
    let agent = build_agent(&config, None)?;
    print_threads(&agent);
    Ok(())
}

async fn run_chat(config: AgentConfig, player: Option<String>) -> anyhow::Result<()> {
    let agent = build_agent(&config, player)?;
    println!("Friday v{}  (:help for commands)", env!("CARGO_PKG_VERSION"));

    let mut seen: HashMap<ThreadId, usize> = HashMap::new();
    print_new_messages(&agent, &mut seen);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_prompt(&agent);
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("received Ctrl+C, shutting down");
                None
            }
        };
        let Some(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.strip_prefix(':') {
            Some(command) => {
                if !run_command(&agent, command).await {
                    break;
                }
            }
            None => agent.handle_user_input(line).await,
        }

        agent.drain_background().await;
        print_new_messages(&agent, &mut seen);
        print_suggestions(&agent);
    }

    agent.stop_audio();
    Ok(())
}

/// Run one `:command`. Returns false when the session should end.
async fn run_command(agent: &Agent, command: &str) -> bool {
    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map(|(n, r)| (n, r.trim()))
        .unwrap_or((command, ""));

    match name {
        "quit" | "q" | "exit" => return false,
        "help" | "h" => println!("{HELP}"),
        "new" => {
            agent.create_thread();
        }
        "list" => print_threads(agent),
        "select" => match parse_id(rest) {
            Some(id) if agent.select_thread(id) => {}
            _ => println!("No such thread: {rest}"),
        },
        "delete" => match parse_id(rest) {
            Some(id) if agent.delete_thread(id) => {}
            _ => println!("No such thread: {rest}"),
        },
        "rename" => {
            let (id, title) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            match parse_id(id) {
                Some(id) if agent.rename_thread(id, title) => {}
                _ => println!("Usage: :rename <id> <title>"),
            }
        }
        "clear" => {
            agent.clear_all();
        }
        "summarize" => {
            agent.summarize().await;
            print_pane(agent);
        }
        "attach" => {
            let (path, prompt) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            match read_file(path) {
                Ok((name, mime, bytes)) => {
                    agent.handle_file_upload(&name, &mime, &bytes, prompt.trim()).await;
                }
                Err(e) => println!("Cannot read {path}: {e}"),
            }
        }
        "detach" => agent.clear_active_file(),
        "transcribe" => match read_file(rest) {
            Ok((_, mime, bytes)) => {
                agent.begin_listening();
                agent.transcribe(&bytes, &mime).await;
            }
            Err(e) => println!("Cannot read {rest}: {e}"),
        },
        "mute" => println!("Muted: {}", agent.toggle_mute()),
        "voice" => println!("Cloud voice: {}", agent.toggle_cloud_voice()),
        "stt" => println!("Cloud transcription: {}", agent.toggle_cloud_transcription()),
        "raw" => {
            let mode = match agent.with_state(|s| s.display_mode()) {
                DisplayMode::Rendered => DisplayMode::Raw,
                DisplayMode::Raw => DisplayMode::Rendered,
            };
            agent.set_display_mode(mode);
            print_pane(agent);
        }
        "pane" => print_pane(agent),
        other => println!("Unknown command :{other} (try :help)"),
    }
    true
}

fn parse_id(text: &str) -> Option<ThreadId> {
    text.trim().parse().ok().map(ThreadId)
}

fn read_file(path: &str) -> std::io::Result<(String, String, Vec<u8>)> {
    let path = Path::new(path);
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok((name, mime_for_path(path).to_owned(), bytes))
}

fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" | "md" => "text/plain",
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "ogg" | "opus" => "audio/ogg",
        "webm" => "audio/webm",
        "flac" => "audio/flac",
        _ => {
            warn!("unknown extension {ext:?}, sending as octet-stream");
            "application/octet-stream"
        }
    }
}

fn print_prompt(agent: &Agent) {
    use std::io::Write;
    let title = agent
        .with_state(|s| s.active_thread().map(|t| t.title.clone()))
        .unwrap_or_default();
    print!("[{title}] > ");
    let _ = std::io::stdout().flush();
}

fn print_threads(agent: &Agent) {
    agent.with_state(|s| {
        let active = s.active_thread_id();
        for thread in s.threads().threads() {
            let marker = if Some(thread.id) == active { '*' } else { ' ' };
            println!(
                "{marker} {:>16}  {}  ({} messages)",
                thread.id.0,
                thread.title,
                thread.conversation.len()
            );
        }
    });
}

/// Print assistant messages of the active thread not shown yet.
fn print_new_messages(agent: &Agent, seen: &mut HashMap<ThreadId, usize>) {
    let fresh: Vec<String> = agent.with_state(|s| {
        let Some(thread) = s.active_thread() else {
            return Vec::new();
        };
        let shown = seen.entry(thread.id).or_insert(0);
        let start = (*shown).min(thread.conversation.len());
        *shown = thread.conversation.len();
        thread.conversation[start..]
            .iter()
            .filter(|m| m.from == Sender::Assistant)
            .map(|m| m.text.clone())
            .collect()
    });
    for text in fresh {
        println!("Friday: {text}");
    }
}

fn print_suggestions(agent: &Agent) {
    let questions = agent.with_state(|s| s.suggested_questions().to_vec());
    if !questions.is_empty() {
        println!("  Try: {}", questions.join(" | "));
    }
}

fn print_pane(agent: &Agent) {
    let (pane, mode) = agent.with_state(|s| {
        (
            s.active_thread().map(|t| t.display_content.clone()),
            s.display_mode(),
        )
    });
    let Some(pane) = pane else { return };
    println!("== {} ==", pane.title);
    match (mode, pane.kind) {
        (DisplayMode::Raw, _) | (_, DisplayKind::Reminders) => println!("{}", pane.content),
        (DisplayMode::Rendered, DisplayKind::Markdown) => {
            println!("{}", friday::speech_text::clean_for_speech(&pane.content));
        }
    }
}
