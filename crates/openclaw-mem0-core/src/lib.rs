pub mod client;
pub mod config;
pub mod error;
pub mod hooks;
pub mod identity;
pub mod paths;
pub mod render;
pub mod scope;
pub mod telemetry;
pub mod text;
pub mod types;
pub mod utils;

pub use client::{ClientOptions, MemoryClient};
pub use config::{EnvSnapshot, Mem0Config, PluginConfig, build_config};
pub use error::{Mem0Error, Result};
pub use hooks::MemoryHooks;
pub use identity::{Identity, IdentityState};
pub use telemetry::{NoopTelemetry, Telemetry, TelemetryEvent};
pub use types::{
    AgentEndEvent, ApiVersion, BeforeAgentStartEvent, BeforeAgentStartResult, EntityType,
    HookContext, Message, MemoryOptions,
};
