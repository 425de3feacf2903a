//! Command-line management surface.
//!
//! Every command except `serve` works directly on the persisted template set
//! and exits. `serve` runs the local HTTP API until interrupted; while it
//! runs, `copy` hands its text to the service's clipboard.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use std::io::{IsTerminal, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{load_app_config, read_port, AppConfig};
use crate::query::{self, highlight_segments, preview, selection_query};
use crate::state::AppState;
use crate::templates::{display_name, sample_templates};
use crate::validate::parse_template_json;

const PREVIEW_LEN: usize = 60;

#[derive(Parser, Debug)]
#[command(name = "quickcopy", version, about = "Canned response templates with search and one-click copy")]
pub struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory holding the template data (defaults to the config directory)
    #[arg(long, global = true, env = "QUICKCOPY_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the local HTTP API used by the browser extension
    Serve {
        /// Port to bind on 127.0.0.1 (0 picks a free one)
        #[arg(long)]
        port: Option<u16>,
    },
    /// List categories and their messages
    List {
        /// Only this category, with message indices
        #[arg(long)]
        category: Option<String>,
        /// Filter the category's messages (requires --category)
        #[arg(long, requires = "category")]
        filter: Option<String>,
    },
    /// Search every category for a substring
    Search(SearchArgs),
    /// Copy a message to the clipboard. Goes through the running service
    /// when there is one, since its clipboard outlives this process.
    Copy {
        category: String,
        index: usize,
        /// Write to this process's clipboard even when the service is running
        #[arg(long)]
        local: bool,
    },
    /// Show category and message counts
    Stats,
    #[command(subcommand)]
    Category(CategoryCommand),
    #[command(subcommand)]
    Message(MessageCommand),
    /// Replace all templates with a JSON file ("-" reads stdin)
    Import { file: PathBuf },
    /// Print all templates as JSON
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace all templates with the sample set
    Sample,
    /// Delete stored templates; defaults are restored on next use
    Reset,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    pub query: String,
    /// Treat the query as a page selection: trimmed, lowercased, and ignored
    /// when shorter than the configured minimum
    #[arg(long)]
    pub selection: bool,
    /// Print HTML markup with matches highlighted
    #[arg(long)]
    pub html: bool,
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    /// Add an empty category
    Add { name: String },
    /// Rename a category
    Rename { old: String, new: String },
    /// Delete a category and its messages
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
pub enum MessageCommand {
    /// Append a message to a category
    Add { category: String, text: String },
    /// Replace the message at an index
    Edit { category: String, index: usize, text: String },
    /// Delete the message at an index
    Delete { category: String, index: usize },
}

impl Cli {
    fn app_config(&self) -> AppConfig {
        let mut config = load_app_config();
        if let Some(dir) = &self.data_dir {
            config.data_dir = Some(dir.clone());
        }
        if let Command::Serve { port: Some(port) } = &self.command {
            config.port = *port;
        }
        config
    }
}

/// Entry point used by the `quickcopy` binary.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let state = Arc::new(AppState::from_config(cli.app_config()));
    if let Command::Serve { .. } = cli.command {
        return serve(state).await;
    }
    let stdout = std::io::stdout();
    let color = stdout.is_terminal();
    execute(cli.command, &state, &mut stdout.lock(), color).await
}

async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    state.init().await.context("failed to load templates")?;

    let signal_state = state.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            crate::http::stop_server(&signal_state);
        }
    });

    crate::http::start_server(state).await
}

/// Run a one-shot command, writing human-readable output to `out`.
pub async fn execute<W: Write>(
    command: Command,
    state: &AppState,
    out: &mut W,
    color: bool,
) -> anyhow::Result<()> {
    let mut store = state.store.lock().await;
    match command {
        Command::Serve { .. } => bail!("serve is not a one-shot command"),
        Command::List { category: None, .. } => {
            let set = store.load().await?;
            for group in query::search(set, "") {
                writeln!(out, "{} ({}, {} messages)", group.category, group.key, group.messages.len())?;
                for message in &group.messages {
                    writeln!(out, "  - {}", preview(message, PREVIEW_LEN))?;
                }
            }
        }
        Command::List { category: Some(name), filter } => {
            let set = store.load().await?;
            let hits = query::search_category(set, &name, filter.as_deref().unwrap_or(""))
                .with_context(|| format!("Category not found: {name}"))?;
            writeln!(out, "{}", display_name(&name))?;
            for (index, text) in hits {
                writeln!(out, "  [{index}] {text}")?;
            }
        }
        Command::Search(args) => {
            let needle = if args.selection {
                let min_len = state.config.read().min_selection_len;
                match selection_query(&args.query, min_len) {
                    Some(q) => q,
                    None => {
                        writeln!(out, "Selection is shorter than {min_len} characters")?;
                        return Ok(());
                    }
                }
            } else {
                args.query
            };
            let set = store.load().await?;
            let results = query::search(set, &needle);
            if results.is_empty() {
                writeln!(out, "No messages match \"{needle}\"")?;
            }
            for group in results {
                writeln!(out, "{}", group.category)?;
                for message in &group.messages {
                    let rendered = if args.html {
                        query::highlight(message, &needle)
                    } else {
                        render_terminal(message, &needle, color)
                    };
                    writeln!(out, "  - {rendered}")?;
                }
            }
        }
        Command::Copy { category, index, local } => {
            let set = store.load().await?;
            let messages = set
                .get(&category)
                .with_context(|| format!("Category not found: {category}"))?;
            let Some(text) = messages.get(index) else {
                bail!(
                    "Message index {index} is out of bounds for category {category} ({} messages)",
                    messages.len()
                );
            };
            let port = if local { None } else { read_port().ok() };
            if let Some(port) = port {
                match copy_via_service(port, text).await {
                    Ok(()) => {
                        writeln!(out, "Copied via service: {}", preview(text, PREVIEW_LEN))?;
                        return Ok(());
                    }
                    Err(e) => tracing::warn!("service copy failed, using local clipboard: {e:#}"),
                }
            }
            state.clipboard.write_text(text)?;
            #[cfg(target_os = "linux")]
            tracing::warn!(
                "copied from a short-lived process; without a clipboard manager the text \
                 is gone once it exits. Run `quickcopy serve` to keep it available"
            );
            writeln!(out, "Copied: {}", preview(text, PREVIEW_LEN))?;
        }
        Command::Stats => {
            let stats = store.load().await?.stats();
            writeln!(out, "{} categories, {} messages", stats.categories, stats.messages)?;
        }
        Command::Category(cmd) => match cmd {
            CategoryCommand::Add { name } => {
                store.add_category(&name).await?;
                writeln!(out, "Added category {}", name.trim())?;
            }
            CategoryCommand::Rename { old, new } => {
                store.rename_category(&old, &new).await?;
                writeln!(out, "Renamed {old} to {}", new.trim())?;
            }
            CategoryCommand::Delete { name } => {
                store.delete_category(&name).await?;
                writeln!(out, "Deleted category {name}")?;
            }
        },
        Command::Message(cmd) => match cmd {
            MessageCommand::Add { category, text } => {
                store.add_message(&category, &text).await?;
                writeln!(out, "Added message to {category}")?;
            }
            MessageCommand::Edit { category, index, text } => {
                store.edit_message(&category, index, &text).await?;
                writeln!(out, "Updated message {index} in {category}")?;
            }
            MessageCommand::Delete { category, index } => {
                let removed = store.delete_message(&category, index).await?;
                writeln!(out, "Deleted: {}", preview(&removed, PREVIEW_LEN))?;
            }
        },
        Command::Import { file } => {
            let text = if file.as_os_str() == "-" {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            } else {
                std::fs::read_to_string(&file)
                    .with_context(|| format!("Cannot read {}", file.display()))?
            };
            let set = parse_template_json(&text)?;
            let stats = set.stats();
            store.save(set).await?;
            writeln!(out, "Imported {} categories, {} messages", stats.categories, stats.messages)?;
        }
        Command::Export { output } => {
            let json = store.load().await?.to_pretty_json();
            match output {
                Some(path) => {
                    std::fs::write(&path, format!("{json}\n"))
                        .with_context(|| format!("Cannot write {}", path.display()))?;
                    writeln!(out, "Exported to {}", path.display())?;
                }
                None => writeln!(out, "{json}")?,
            }
        }
        Command::Sample => {
            store.save(sample_templates()).await?;
            writeln!(out, "Loaded sample templates")?;
        }
        Command::Reset => {
            store.reset().await?;
            writeln!(out, "Templates reset; defaults will be restored on next use")?;
        }
    }
    Ok(())
}

/// Hand the text to the running service's clipboard (`POST /clipboard`).
async fn copy_via_service(port: u16, text: &str) -> anyhow::Result<()> {
    let resp = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?
        .post(format!("http://127.0.0.1:{port}/clipboard"))
        .json(&serde_json::json!({"text": text}))
        .send()
        .await
        .context("QuickCopy service unreachable")?;
    if !resp.status().is_success() {
        let status = resp.status();
        let body: serde_json::Value = resp.json().await.unwrap_or_default();
        bail!(
            "service refused the copy ({status}): {}",
            body["error"].as_str().unwrap_or("unknown error")
        );
    }
    Ok(())
}

/// Matches in bold reverse video when writing to a terminal.
fn render_terminal(message: &str, needle: &str, color: bool) -> String {
    if !color {
        return message.to_string();
    }
    highlight_segments(message, needle)
        .into_iter()
        .map(|seg| {
            if seg.matched {
                format!("\x1b[1;7m{}\x1b[0m", seg.text)
            } else {
                seg.text.to_string()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;
    use crate::config::CONFIG_DIR_ENV;
    use crate::templates::TemplateSet;
    use serial_test::serial;
    use tempfile::TempDir;

    fn state(dir: &TempDir, clipboard: Arc<MemoryClipboard>) -> AppState {
        let config = AppConfig {
            data_dir: Some(dir.path().to_path_buf()),
            ..AppConfig::default()
        };
        AppState::new(config, Box::new(clipboard))
    }

    async fn run_cmd(state: &AppState, args: &[&str]) -> anyhow::Result<String> {
        let cli = Cli::try_parse_from(std::iter::once("quickcopy").chain(args.iter().copied()))?;
        let mut out = Vec::new();
        execute(cli.command, state, &mut out, false).await?;
        Ok(String::from_utf8(out)?)
    }

    async fn seeded(dir: &TempDir, clipboard: Arc<MemoryClipboard>) -> AppState {
        let s = state(dir, clipboard);
        let set = TemplateSet::from_pairs([
            ("greeting", vec!["Hello there", "Hi, welcome"]),
            ("closing", vec!["Goodbye"]),
        ]);
        s.store.lock().await.save(set).await.unwrap();
        s
    }

    #[test]
    fn parses_nested_commands_and_global_flags() {
        let cli = Cli::try_parse_from(["quickcopy", "message", "edit", "greeting", "1", "Hey", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Command::Message(MessageCommand::Edit { ref category, index: 1, ref text })
                if category == "greeting" && text == "Hey"
        ));

        let cli = Cli::try_parse_from(["quickcopy", "serve", "--port", "4100"]).unwrap();
        assert!(matches!(cli.command, Command::Serve { port: Some(4100) }));

        assert!(Cli::try_parse_from(["quickcopy", "list", "--filter", "x"]).is_err());
        assert!(Cli::try_parse_from(["quickcopy", "copy", "greeting", "-1"]).is_err());
    }

    #[tokio::test]
    async fn list_seeds_defaults_on_first_use() {
        let dir = TempDir::new().unwrap();
        let s = state(&dir, Arc::new(MemoryClipboard::new()));
        let out = run_cmd(&s, &["list"]).await.unwrap();
        assert!(out.starts_with("Tax Pending Task (tax-pending-task, 2 messages)"));
        assert!(out.contains("Banking On Hold"));
        assert_eq!(run_cmd(&s, &["stats"]).await.unwrap(), "4 categories, 8 messages\n");
    }

    #[tokio::test]
    async fn list_single_category_with_filter_keeps_indices() {
        let dir = TempDir::new().unwrap();
        let s = seeded(&dir, Arc::new(MemoryClipboard::new())).await;
        let out = run_cmd(&s, &["list", "--category", "greeting", "--filter", "WELCOME"])
            .await
            .unwrap();
        assert_eq!(out, "Greeting\n  [1] Hi, welcome\n");
        assert!(run_cmd(&s, &["list", "--category", "nope"]).await.is_err());
    }

    #[tokio::test]
    async fn search_outputs_grouped_matches() {
        let dir = TempDir::new().unwrap();
        let s = seeded(&dir, Arc::new(MemoryClipboard::new())).await;
        assert_eq!(run_cmd(&s, &["search", "hi"]).await.unwrap(), "Greeting\n  - Hi, welcome\n");
        assert_eq!(
            run_cmd(&s, &["search", "bye", "--html"]).await.unwrap(),
            "Closing\n  - Good<span class=\"quickcopy-highlight\">bye</span>\n"
        );
        assert_eq!(run_cmd(&s, &["search", "zzz"]).await.unwrap(), "No messages match \"zzz\"\n");
    }

    #[tokio::test]
    async fn selection_search_enforces_minimum_length() {
        let dir = TempDir::new().unwrap();
        let s = seeded(&dir, Arc::new(MemoryClipboard::new())).await;
        let out = run_cmd(&s, &["search", "--selection", " hi "]).await.unwrap();
        assert_eq!(out, "Selection is shorter than 3 characters\n");
        let out = run_cmd(&s, &["search", "--selection", "  HELLO "]).await.unwrap();
        assert_eq!(out, "Greeting\n  - Hello there\n");
    }

    #[tokio::test]
    async fn copy_writes_to_clipboard() {
        let dir = TempDir::new().unwrap();
        let clipboard = Arc::new(MemoryClipboard::new());
        let s = seeded(&dir, clipboard.clone()).await;
        let out = run_cmd(&s, &["copy", "closing", "0", "--local"]).await.unwrap();
        assert_eq!(out, "Copied: Goodbye\n");
        assert_eq!(clipboard.last().as_deref(), Some("Goodbye"));
        assert!(run_cmd(&s, &["copy", "closing", "5", "--local"]).await.is_err());
    }

    #[tokio::test]
    #[serial]
    async fn copy_goes_through_running_service() {
        let config_dir = TempDir::new().unwrap();
        // SAFETY: env-mutating tests are #[serial]
        unsafe { std::env::set_var(CONFIG_DIR_ENV, config_dir.path()) };

        let service_dir = TempDir::new().unwrap();
        let service_clipboard = Arc::new(MemoryClipboard::new());
        let service = Arc::new(state(&service_dir, service_clipboard.clone()));
        let server = tokio::spawn(crate::http::start_server(service.clone()));
        for _ in 0..100 {
            if read_port().is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let dir = TempDir::new().unwrap();
        let local_clipboard = Arc::new(MemoryClipboard::new());
        let s = seeded(&dir, local_clipboard.clone()).await;
        let out = run_cmd(&s, &["copy", "greeting", "1"]).await.unwrap();
        assert_eq!(out, "Copied via service: Hi, welcome\n");
        assert_eq!(service_clipboard.last().as_deref(), Some("Hi, welcome"));
        assert_eq!(local_clipboard.last(), None);

        assert!(crate::http::stop_server(&service));
        server.await.unwrap().unwrap();

        // Service gone: falls back to this process's clipboard
        let out = run_cmd(&s, &["copy", "greeting", "0"]).await.unwrap();
        assert_eq!(out, "Copied: Hello there\n");
        assert_eq!(local_clipboard.last().as_deref(), Some("Hello there"));

        unsafe { std::env::remove_var(CONFIG_DIR_ENV) };
    }

    #[tokio::test]
    async fn category_and_message_commands_mutate_the_store() {
        let dir = TempDir::new().unwrap();
        let s = seeded(&dir, Arc::new(MemoryClipboard::new())).await;
        run_cmd(&s, &["category", "add", "billing"]).await.unwrap();
        run_cmd(&s, &["message", "add", "billing", "Invoice sent"]).await.unwrap();
        run_cmd(&s, &["category", "rename", "billing", "invoices"]).await.unwrap();
        run_cmd(&s, &["message", "edit", "greeting", "0", "Hey"]).await.unwrap();
        let out = run_cmd(&s, &["message", "delete", "greeting", "1"]).await.unwrap();
        assert_eq!(out, "Deleted: Hi, welcome\n");
        run_cmd(&s, &["category", "delete", "closing"]).await.unwrap();

        let err = run_cmd(&s, &["category", "add", "greeting"]).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));

        let out = run_cmd(&s, &["export"]).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"greeting": ["Hey"], "invoices": ["Invoice sent"]})
        );
    }

    #[tokio::test]
    async fn import_export_and_reset() {
        let dir = TempDir::new().unwrap();
        let s = state(&dir, Arc::new(MemoryClipboard::new()));

        let file = dir.path().join("import.json");
        std::fs::write(&file, r#"{"b": ["two"], "a": ["one", "uno"]}"#).unwrap();
        let out = run_cmd(&s, &["import", file.to_str().unwrap()]).await.unwrap();
        assert_eq!(out, "Imported 2 categories, 3 messages\n");

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"{"a": "not a list"}"#).unwrap();
        assert!(run_cmd(&s, &["import", bad.to_str().unwrap()]).await.is_err());

        let exported = dir.path().join("export.json");
        run_cmd(&s, &["export", "-o", exported.to_str().unwrap()]).await.unwrap();
        let text = std::fs::read_to_string(&exported).unwrap();
        assert!(text.starts_with("{\n  \"b\": ["));

        run_cmd(&s, &["reset"]).await.unwrap();
        assert_eq!(run_cmd(&s, &["stats"]).await.unwrap(), "4 categories, 8 messages\n");

        run_cmd(&s, &["sample"]).await.unwrap();
        assert_eq!(run_cmd(&s, &["stats"]).await.unwrap(), "6 categories, 10 messages\n");
    }

    #[test]
    fn terminal_rendering_marks_matches_only_with_color() {
        assert_eq!(render_terminal("Goodbye", "bye", false), "Goodbye");
        assert_eq!(render_terminal("Goodbye", "BYE", true), "Good\x1b[1;7mbye\x1b[0m");
    }
}
