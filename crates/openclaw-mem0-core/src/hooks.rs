//! Lifecycle hooks that connect an agent runtime to Mem0.
//!
//! Neither hook ever fails towards the runtime: client construction errors
//! and service errors are logged and swallowed.

use crate::client::MemoryClient;
use crate::config::Mem0Config;
use crate::render::build_memories_block;
use crate::telemetry::{Telemetry, telemetry_from_config};
use crate::text::extract_text;
use crate::types::{
    AgentEndEvent, BeforeAgentStartEvent, BeforeAgentStartResult, HookContext, Message,
    MemoryOptions,
};
use crate::utils::char_len;
use anyhow::Context;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const PLUGIN_ID: &str = "openclaw-mem0-plugin";
pub const PLUGIN_NAME: &str = "openclaw-mem0-plugin";
pub const PLUGIN_DESCRIPTION: &str = "Mem0 memory via lifecycle hooks";

pub const BEFORE_AGENT_START: &str = "before_agent_start";
pub const AGENT_END: &str = "agent_end";

/// User id used when neither the runtime nor the configuration names one.
pub const FALLBACK_USER_ID: &str = "default-user";

const MIN_PROMPT_CHARS: usize = 2;

fn last_with_role<'a>(messages: Option<&'a [Message]>, role: &str) -> Option<&'a Message> {
    messages?.iter().rev().find(|message| message.is_role(role))
}

fn prompt_text(event: &BeforeAgentStartEvent, ctx: &HookContext) -> String {
    let explicit = event
        .prompt
        .as_ref()
        .filter(|prompt| !prompt.is_null() && prompt.as_str() != Some(""));
    if let Some(prompt) = explicit {
        return extract_text(prompt);
    }

    last_with_role(event.messages.as_deref(), "user")
        .or_else(|| last_with_role(ctx.messages.as_deref(), "user"))
        .map(|message| extract_text(&message.content))
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct HookPayload<E> {
    #[serde(default)]
    event: E,
    #[serde(default)]
    ctx: HookContext,
}

pub struct MemoryHooks {
    config: Mem0Config,
    telemetry: Arc<dyn Telemetry>,
}

impl MemoryHooks {
    #[must_use]
    pub fn new(config: Mem0Config) -> Self {
        let telemetry = telemetry_from_config(&config);
        Self { config, telemetry }
    }

    #[must_use]
    pub fn with_telemetry(config: Mem0Config, telemetry: Arc<dyn Telemetry>) -> Self {
        Self { config, telemetry }
    }

    #[must_use]
    pub fn config(&self) -> &Mem0Config {
        &self.config
    }

    fn client(&self, purpose: &str) -> Option<MemoryClient> {
        match MemoryClient::from_config(&self.config, Arc::clone(&self.telemetry)) {
            Ok(client) => Some(client),
            Err(error) => {
                warn!(%error, purpose, "mem0 client init failed");
                None
            }
        }
    }

    fn resolve_user_id<'a>(&'a self, ctx: &'a HookContext) -> &'a str {
        ctx.user_id
            .as_deref()
            .filter(|x| !x.is_empty())
            .or_else(|| Some(self.config.user_id.as_str()).filter(|x| !x.is_empty()))
            .unwrap_or(FALLBACK_USER_ID)
    }

    /// Looks up memories relevant to the prompt that is about to run and
    /// returns them as context to prepend.
    pub async fn before_agent_start(
        &self,
        event: &BeforeAgentStartEvent,
        ctx: &HookContext,
    ) -> Option<BeforeAgentStartResult> {
        if !self.config.search_enabled {
            return None;
        }

        let prompt = prompt_text(event, ctx);
        if char_len(&prompt) < MIN_PROMPT_CHARS {
            return None;
        }

        let client = self.client("recall")?;
        let user_id = self.resolve_user_id(ctx);

        let response = match client
            .search(&prompt, MemoryOptions::for_user(user_id))
            .await
        {
            Ok(response) => response,
            Err(error) => {
                warn!(%error, "mem0 recall failed");
                return None;
            }
        };

        let Some(records) = response.as_array() else {
            let enveloped = response.get("results").is_some_and(Value::is_array);
            warn!(enveloped, "mem0 search response is not a list; no memories injected");
            return None;
        };

        let block = build_memories_block(records);
        if block.is_empty() {
            return None;
        }

        info!(count = records.len(), user_id, "injected memories");
        Some(BeforeAgentStartResult {
            prepend_context: block,
        })
    }

    /// Stores the last user/assistant exchange of a successful turn.
    pub async fn agent_end(&self, event: &AgentEndEvent, ctx: &HookContext) {
        if !self.config.add_enabled || event.success == Some(false) {
            return;
        }
        let Some(messages) = event.messages.as_deref().filter(|m| !m.is_empty()) else {
            return;
        };

        let last_user = last_with_role(Some(messages), "user");
        let last_assistant = last_with_role(Some(messages), "assistant");
        let (Some(user), Some(assistant)) = (last_user, last_assistant) else {
            debug!("turn has no user/assistant pair; nothing to store");
            return;
        };

        let Some(client) = self.client("add") else {
            return;
        };
        let user_id = self.resolve_user_id(ctx);

        let exchange = [
            Message::user(extract_text(&user.content)),
            Message::assistant(extract_text(&assistant.content)),
        ];

        match client.add(&exchange, MemoryOptions::for_user(user_id)).await {
            Ok(_) => info!(user_id, "added interaction to memory"),
            Err(error) => warn!(%error, "mem0 add failed"),
        }
    }

    /// Runs the hook named `hook` on a `{"event": .., "ctx": ..}` payload and
    /// returns its JSON result (`null` when the hook has nothing to return).
    pub async fn dispatch(&self, hook: &str, payload: Value) -> anyhow::Result<Value> {
        match hook {
            BEFORE_AGENT_START => {
                let payload: HookPayload<BeforeAgentStartEvent> = parse_payload(payload, hook)?;
                let result = self.before_agent_start(&payload.event, &payload.ctx).await;
                Ok(serde_json::to_value(result)?)
            }
            AGENT_END => {
                let payload: HookPayload<AgentEndEvent> = parse_payload(payload, hook)?;
                self.agent_end(&payload.event, &payload.ctx).await;
                Ok(Value::Null)
            }
            other => anyhow::bail!(
                "unknown hook '{other}'. Allowed: {BEFORE_AGENT_START}, {AGENT_END}"
            ),
        }
    }
}

fn parse_payload<T: DeserializeOwned>(payload: Value, hook: &str) -> anyhow::Result<T> {
    let payload = if payload.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        payload
    };
    serde_json::from_value(payload).with_context(|| format!("parse {hook} payload"))
}
