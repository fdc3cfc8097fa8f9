use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use openclaw_mem0_core::config::{
    EnvSnapshot, build_config, load_plugin_config, load_plugin_config_at,
};
use openclaw_mem0_core::render::memory_text;
use openclaw_mem0_core::telemetry::telemetry_from_config;
use openclaw_mem0_core::{
    ApiVersion, IdentityState, Mem0Config, MemoryClient, MemoryHooks, MemoryOptions, Message,
};
use serde_json::{Value, json};
use std::io::Read;
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_LOG_FILTER: &str = "openclaw_mem0=info";

#[derive(Debug, Parser)]
#[command(name = "openclaw-mem0")]
#[command(about = "Mem0 memory for openclaw agents")]
struct Cli {
    /// Plugin config JSON (defaults to ~/.openclaw/mem0.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true, default_value_t = false)]
    human: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a lifecycle hook on a `{"event": .., "ctx": ..}` payload from stdin.
    Hook { name: String },
    #[command(flatten)]
    Api(ApiCommand),
}

#[derive(Debug, Subcommand)]
enum ApiCommand {
    /// Check the API key and report the owning org/project.
    Ping,
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        #[arg(long)]
        user: Option<String>,
        #[arg(long, default_value_t = false)]
        v2: bool,
    },
    /// Store a single user message.
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
        #[arg(long)]
        user: Option<String>,
    },
    List {
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
        #[arg(long, default_value_t = false)]
        v2: bool,
    },
    Get { id: String },
    History { id: String },
    Delete { id: String },
    Users,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(path: Option<&PathBuf>) -> Result<Mem0Config> {
    let env = EnvSnapshot::load();
    let plugin = match path {
        Some(path) => load_plugin_config_at(path)?,
        None => load_plugin_config()?,
    };
    let config = build_config(Some(&plugin), &env);
    debug!(
        base_url = %config.base_url,
        user_id = %config.user_id,
        has_api_key = config.api_key.is_some(),
        "resolved mem0 config"
    );
    Ok(config)
}

fn options_for(config: &Mem0Config, user: Option<String>) -> MemoryOptions {
    MemoryOptions::for_user(user.unwrap_or_else(|| config.user_id.clone()))
}

fn render_human(value: &Value) -> String {
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return format!("Error: {error}");
    }

    let data = value.get("data").unwrap_or(value);
    let records = data
        .as_array()
        .or_else(|| data.get("results").and_then(Value::as_array));
    if let Some(records) = records {
        let lines = records
            .iter()
            .filter_map(|record| {
                let text = memory_text(record)?;
                let id = record.get("id").and_then(Value::as_str).unwrap_or("-");
                Some(format!("- [{id}] {text}"))
            })
            .collect::<Vec<_>>();
        if !lines.is_empty() {
            return lines.join("\n");
        }
    }

    serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string())
}

async fn run_hook(config: Mem0Config, name: &str) -> Result<()> {
    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .context("read hook payload from stdin")?;
    let payload = if raw.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&raw).context("parse hook payload")?
    };

    let result = MemoryHooks::new(config).dispatch(name, payload).await?;
    if !result.is_null() {
        println!("{}", serde_json::to_string(&result)?);
    }
    Ok(())
}

/// Identity discovery outcome for `ping`; a degraded client means the key
/// check failed.
fn ping_report(state: &IdentityState) -> Result<Value> {
    match state {
        IdentityState::Degraded { reason } => anyhow::bail!("Mem0 ping failed: {reason}"),
        settled => Ok(serde_json::to_value(settled)?),
    }
}

async fn run_client(config: &Mem0Config, command: ApiCommand) -> Result<Value> {
    let mut client = MemoryClient::from_config(config, telemetry_from_config(config))?;

    let data = match command {
        ApiCommand::Ping => return ping_report(client.initialize().await),
        ApiCommand::Search { query, user, v2 } => {
            let mut options = options_for(config, user);
            if v2 {
                options = options.with_api_version(ApiVersion::V2);
            }
            client.search(&query.join(" "), options).await?
        }
        ApiCommand::Add { text, user } => {
            client
                .add(&[Message::user(text.join(" "))], options_for(config, user))
                .await?
        }
        ApiCommand::List {
            user,
            page,
            page_size,
            v2,
        } => {
            let mut options = options_for(config, user);
            options.page = page;
            options.page_size = page_size;
            if v2 {
                let user_id = options.user_id.take();
                options.filters = Some(json!({ "user_id": user_id }));
                options = options.with_api_version(ApiVersion::V2);
            }
            client.get_all(options).await?
        }
        ApiCommand::Get { id } => client.get(&id).await?,
        ApiCommand::History { id } => client.history(&id).await?,
        ApiCommand::Delete { id } => client.delete(&id).await?,
        ApiCommand::Users => client.users().await?,
    };
    Ok(data)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_ref())?;

    let command = match cli.command {
        Command::Hook { name } => return run_hook(config, &name).await,
        Command::Api(command) => command,
    };

    let output = match run_client(&config, command).await {
        Ok(data) => json!({ "ok": true, "data": data }),
        Err(error) => json!({ "ok": false, "error": error.to_string() }),
    };

    if cli.human {
        println!("{}", render_human(&output));
    } else {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    if output.get("ok").and_then(Value::as_bool) == Some(false) {
        std::process::exit(1);
    }

    Ok(())
}
