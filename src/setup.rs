//! `pubmed setup`: register the MCP server with AI editors.
//!
//! Finds installed editors (Claude Code, Claude Desktop, Cursor, Zed),
//! optionally asks for an NCBI API key, and writes a `pubmed serve` entry
//! into each editor's MCP configuration.

use crate::error::{PubMedError, Result};
use crate::PubMedClient;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Name of the server entry written into editor configs.
const SERVER_KEY: &str = "pubmed";

/// Supported AI editors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EditorTarget {
    ClaudeCode,
    ClaudeDesktop,
    Cursor,
    Zed,
}

impl EditorTarget {
    const ALL: [EditorTarget; 4] = [
        Self::ClaudeCode,
        Self::ClaudeDesktop,
        Self::Cursor,
        Self::Zed,
    ];
}

impl std::fmt::Display for EditorTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClaudeCode => write!(f, "Claude Code"),
            Self::ClaudeDesktop => write!(f, "Claude Desktop"),
            Self::Cursor => write!(f, "Cursor"),
            Self::Zed => write!(f, "Zed"),
        }
    }
}

/// Where an editor keeps its MCP settings.
enum ConfigTarget {
    /// Register through the `claude` CLI.
    ClaudeCli,
    /// Edit a JSON file, inserting under the given top-level section.
    JsonFile { path: PathBuf, section: &'static str },
}

struct DetectedEditor {
    target: EditorTarget,
    config: ConfigTarget,
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Configured,
    Skipped,
    Failed(String),
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configured => write!(f, "done"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed(msg) => write!(f, "FAILED ({})", msg),
        }
    }
}

/// Show the first and last four characters of a key.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Pick up `NCBI_API_KEY`, or ask for one unless running with `--yes`.
/// The key is optional: without it NCBI allows 3 requests per second.
fn resolve_api_key(yes: bool) -> Result<Option<String>> {
    if let Ok(key) = std::env::var("NCBI_API_KEY") {
        if !key.trim().is_empty() {
            println!("  Found NCBI_API_KEY in environment: {}", mask_key(&key));
            return Ok(Some(key));
        }
    }
    if yes {
        println!("  No NCBI_API_KEY set; continuing without one.");
        return Ok(None);
    }

    println!("  An NCBI API key raises the rate limit from 3 to 10 requests/second.");
    println!("  Create one at: https://account.ncbi.nlm.nih.gov/settings/");
    let key: String = dialoguer::Input::new()
        .with_prompt("  NCBI API key (leave empty to skip)")
        .allow_empty(true)
        .interact_text()
        .map_err(|e| PubMedError::Config(format!("Failed to read API key: {}", e)))?;

    let key = key.trim().to_string();
    Ok(if key.is_empty() { None } else { Some(key) })
}

/// Run one cheap search to confirm PubMed is reachable with this key.
fn check_connectivity(api_key: Option<&str>) {
    let client = match PubMedClient::new() {
        Ok(client) => client,
        Err(e) => {
            println!("  Checking PubMed... WARNING: {}", e);
            return;
        }
    };
    let client = match api_key {
        Some(key) => client.with_api_key(key),
        None => client,
    };
    match client.search_ids("aspirin", 1, 0) {
        Ok(_) => println!("  Checking PubMed... OK"),
        Err(e) => println!("  Checking PubMed... WARNING: {} (continuing)", e),
    }
}

fn claude_cli_available() -> bool {
    Command::new("claude")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn detect_editors(home: &Path, filter: Option<EditorTarget>) -> Vec<DetectedEditor> {
    let wanted = |t: EditorTarget| filter.map_or(true, |f| f == t);
    let mut editors = Vec::new();

    if wanted(EditorTarget::ClaudeCode) {
        let claude_dir = home.join(".claude");
        if claude_cli_available() {
            editors.push(DetectedEditor {
                target: EditorTarget::ClaudeCode,
                config: ConfigTarget::ClaudeCli,
            });
        } else if claude_dir.exists() {
            editors.push(DetectedEditor {
                target: EditorTarget::ClaudeCode,
                config: ConfigTarget::JsonFile {
                    path: claude_dir.join("settings.json"),
                    section: "mcpServers",
                },
            });
        }
    }

    if wanted(EditorTarget::ClaudeDesktop) {
        let dir = if cfg!(target_os = "macos") {
            Some(home.join("Library/Application Support/Claude"))
        } else if cfg!(target_os = "windows") {
            std::env::var("APPDATA").ok().map(|p| PathBuf::from(p).join("Claude"))
        } else {
            dirs::config_dir().map(|d| d.join("Claude"))
        };
        if let Some(dir) = dir.filter(|d| d.exists()) {
            editors.push(DetectedEditor {
                target: EditorTarget::ClaudeDesktop,
                config: ConfigTarget::JsonFile {
                    path: dir.join("claude_desktop_config.json"),
                    section: "mcpServers",
                },
            });
        }
    }

    if wanted(EditorTarget::Cursor) {
        let dir = home.join(".cursor");
        if dir.exists() {
            editors.push(DetectedEditor {
                target: EditorTarget::Cursor,
                config: ConfigTarget::JsonFile {
                    path: dir.join("mcp.json"),
                    section: "mcpServers",
                },
            });
        }
    }

    if wanted(EditorTarget::Zed) {
        let dir = home.join(".config/zed");
        if dir.exists() {
            editors.push(DetectedEditor {
                target: EditorTarget::Zed,
                config: ConfigTarget::JsonFile {
                    path: dir.join("settings.json"),
                    section: "context_servers",
                },
            });
        }
    }

    editors
}

fn server_env(api_key: Option<&str>) -> Value {
    match api_key {
        Some(key) => json!({ "NCBI_API_KEY": key }),
        None => json!({}),
    }
}

/// Server entry for the given config section. Zed nests the command.
fn server_entry(section: &str, binary: &str, api_key: Option<&str>) -> Value {
    let command = json!({
        "command": binary,
        "args": ["serve"],
        "env": server_env(api_key)
    });
    if section == "context_servers" {
        json!({ "command": { "path": binary, "args": ["serve"], "env": server_env(api_key) } })
    } else {
        command
    }
}

/// Insert `entry` under `section.pubmed` in a JSON config file.
fn update_json_config(path: &Path, section: &str, entry: Value, yes: bool) -> Outcome {
    let content = if path.exists() {
        match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => return Outcome::Failed(format!("cannot read {}: {}", path.display(), e)),
        }
    } else {
        "{}".to_string()
    };

    let mut root: Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(_) => {
            // JSONC or otherwise unparseable: leave it alone and print the snippet.
            let snippet = json!({ section: { SERVER_KEY: entry } });
            eprintln!(
                "  Could not parse {}. Add this manually:\n{}",
                path.display(),
                serde_json::to_string_pretty(&snippet).unwrap_or_default()
            );
            return Outcome::Failed("unparseable config".to_string());
        }
    };

    let Some(obj) = root.as_object_mut() else {
        return Outcome::Failed(format!("{} is not a JSON object", path.display()));
    };
    let Some(servers) = obj
        .entry(section.to_string())
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
    else {
        return Outcome::Failed(format!("\"{}\" is not an object", section));
    };

    if servers.contains_key(SERVER_KEY) && !yes {
        let overwrite = dialoguer::Confirm::new()
            .with_prompt(format!(
                "  {} is already configured in {}. Overwrite?",
                SERVER_KEY,
                path.display()
            ))
            .default(false)
            .interact()
            .unwrap_or(false);
        if !overwrite {
            return Outcome::Skipped;
        }
    }
    servers.insert(SERVER_KEY.to_string(), entry);

    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let output = serde_json::to_string_pretty(&root)?;
        std::fs::write(path, output)
    };
    match write() {
        Ok(()) => Outcome::Configured,
        Err(e) => Outcome::Failed(format!("cannot write {}: {}", path.display(), e)),
    }
}

fn configure_claude_cli(binary: &str, api_key: Option<&str>) -> Outcome {
    // A stale entry makes `claude mcp add` fail; it is fine if none exists.
    let _ = Command::new("claude")
        .args(["mcp", "remove", SERVER_KEY, "--scope", "user"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    let mut args = vec![
        "mcp".to_string(),
        "add".to_string(),
        "--scope".to_string(),
        "user".to_string(),
        SERVER_KEY.to_string(),
    ];
    if let Some(key) = api_key {
        args.push("-e".to_string());
        args.push(format!("NCBI_API_KEY={}", key));
    }
    args.extend(["--".to_string(), binary.to_string(), "serve".to_string()]);

    match Command::new("claude")
        .args(&args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(s) if s.success() => Outcome::Configured,
        Ok(s) => Outcome::Failed(format!("claude mcp add exited with {}", s)),
        Err(e) => Outcome::Failed(format!("failed to run claude CLI: {}", e)),
    }
}

fn configure_editor(
    editor: &DetectedEditor,
    binary: &str,
    api_key: Option<&str>,
    yes: bool,
) -> Outcome {
    match &editor.config {
        ConfigTarget::ClaudeCli => configure_claude_cli(binary, api_key),
        ConfigTarget::JsonFile { path, section } => {
            update_json_config(path, section, server_entry(section, binary, api_key), yes)
        }
    }
}

/// Run the setup wizard.
pub fn run_setup(editor: Option<EditorTarget>, skip_check: bool, yes: bool) -> Result<()> {
    println!();
    println!("pubmed setup: PubMed MCP Server Setup");
    println!("=====================================");
    println!();

    println!("Checking NCBI API key...");
    let api_key = resolve_api_key(yes)?;
    if skip_check {
        println!("  Skipping connectivity check (--skip-check).");
    } else {
        check_connectivity(api_key.as_deref());
    }
    println!();

    let binary = std::env::current_exe()
        .map_err(|e| PubMedError::Config(format!("Cannot locate binary: {}", e)))?
        .to_string_lossy()
        .to_string();
    println!("Server binary: {}", binary);
    println!();

    let home = dirs::home_dir()
        .ok_or_else(|| PubMedError::Config("Cannot determine home directory".to_string()))?;

    println!("Detecting editors...");
    let detected = detect_editors(&home, editor);
    for target in EditorTarget::ALL {
        if editor.map_or(false, |e| e != target) {
            continue;
        }
        let status = if detected.iter().any(|d| d.target == target) {
            "[found] "
        } else {
            "[absent]"
        };
        println!("  {}  {}", status, target);
    }
    println!();

    if detected.is_empty() {
        println!("No supported editors detected. Configure manually with:");
        println!("  command: {}  args: [\"serve\"]", binary);
        return Ok(());
    }

    println!("Configuring editors...");
    let mut any_configured = false;
    for detected_editor in &detected {
        let outcome = configure_editor(detected_editor, &binary, api_key.as_deref(), yes);
        println!("  {:<15} {}", format!("{}:", detected_editor.target), outcome);
        any_configured |= outcome == Outcome::Configured;
    }
    println!();

    if any_configured {
        println!("Setup complete! Your AI assistant can now search PubMed.");
        println!("Try asking: \"Find recent reviews on GLP-1 agonists and kidney outcomes\"");
    } else {
        println!("No editors were configured. Run `pubmed setup` again or configure manually.");
    }

    Ok(())
}
