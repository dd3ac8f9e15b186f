use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the config file in the user's home directory.
pub const CONFIG_FILE_NAME: &str = ".tidings.json";

/// Login/config state persisted as a small JSON document.
///
/// Read once at process start; rewritten whenever the current user changes
/// (login, register, reset).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub db_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_user_name: Option<String>,
    #[serde(skip)]
    path: PathBuf,
}

impl Config {
    /// Load the config from `~/.tidings.json`.
    pub fn load_default() -> anyhow::Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("home directory not found"))?;
        Self::load(home.join(CONFIG_FILE_NAME))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let mut config: Config = serde_json::from_str(&content)?;
        config.path = path.as_ref().to_path_buf();
        Ok(config)
    }

    /// Parse config from a JSON string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = serde_json::from_str(content)?;
        Ok(config)
    }

    pub fn set_user(&mut self, name: &str) -> anyhow::Result<()> {
        self.current_user_name = Some(name.to_string());
        self.save()
    }

    pub fn clear_user(&mut self) -> anyhow::Result<()> {
        self.current_user_name = None;
        self.save()
    }

    fn save(&self) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}
