use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub ws_url: Option<String>,
    pub poll_interval_ms: Option<u64>,
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir available"))?
        .join("agent_dashboard"))
}

pub fn config_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("config.toml");
    Ok(p)
}

pub fn load_config() -> Result<Config> {
    let path = config_path()?;
    if !path.exists() {
        // create a template config for users to edit
        let sample = Config {
            api_base_url: "http://127.0.0.1:5000".to_string(),
            ws_url: Some("ws://127.0.0.1:5000/ws".to_string()),
            poll_interval_ms: Some(500),
        };
        let tom = toml::to_string_pretty(&sample)?;
        fs::write(&path, tom)?;
        return Err(anyhow::anyhow!(
            "Created template config at {} — edit it and run again",
            path.display()
        ));
    }
    let s = fs::read_to_string(path)?;
    let cfg: Config = toml::from_str(&s)?;
    Ok(cfg)
}

pub fn resolve_ws_url(cfg: &Config) -> String {
    cfg.ws_url
        .clone()
        .unwrap_or_else(|| "ws://127.0.0.1:5000/ws".to_string())
}

pub fn resolve_poll_interval(cfg: &Config) -> Duration {
    Duration::from_millis(cfg.poll_interval_ms.unwrap_or(500))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_optional_fields_are_absent() {
        let cfg: Config = toml::from_str(r#"api_base_url = "http://10.0.0.2:5000""#).unwrap();
        assert_eq!(resolve_ws_url(&cfg), "ws://127.0.0.1:5000/ws");
        assert_eq!(resolve_poll_interval(&cfg), Duration::from_millis(500));
    }

    #[test]
    fn explicit_fields_win() {
        let cfg: Config = toml::from_str(
            r#"
            api_base_url = "http://10.0.0.2:5000"
            ws_url = "ws://10.0.0.2:5000/ws"
            poll_interval_ms = 100
            "#,
        )
        .unwrap();
        assert_eq!(resolve_ws_url(&cfg), "ws://10.0.0.2:5000/ws");
        assert_eq!(resolve_poll_interval(&cfg), Duration::from_millis(100));
    }
}
