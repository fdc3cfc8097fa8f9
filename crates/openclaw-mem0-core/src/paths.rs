use std::path::PathBuf;

/// Host runtimes whose per-user `.env` files may carry Mem0 settings, in
/// lookup order.
pub const ENV_SOURCES: [(&str, &str); 3] = [
    ("openclaw", ".openclaw"),
    ("moltbot", ".moltbot"),
    ("clawdbot", ".clawdbot"),
];

#[must_use]
pub fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

#[must_use]
pub fn env_file_paths() -> Vec<(&'static str, PathBuf)> {
    let home = home_dir();
    ENV_SOURCES
        .iter()
        .map(|(name, dir)| (*name, home.join(dir).join(".env")))
        .collect()
}

#[must_use]
pub fn get_plugin_config_path() -> PathBuf {
    home_dir().join(".openclaw").join("mem0.json")
}
