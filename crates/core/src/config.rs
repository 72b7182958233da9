use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub obs_connection: ObsConnection,
    pub paths: Paths,
    #[serde(default)]
    pub relay: RelayConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            obs_connection: ObsConnection::default(),
            paths: Paths::default(),
            relay: RelayConfig::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ObsConnection {
    /// Host of the OBS instance running the obs-websocket server
    pub obs_host: String,
    pub obs_port: u16,
    /// Optional; OBS may run with authentication disabled
    #[serde(default)]
    pub obs_password: Option<String>,
}

impl Default for ObsConnection {
    fn default() -> Self {
        Self {
            obs_host: "localhost".to_string(),
            obs_port: 4455,
            obs_password: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Paths {
    /// Where the Source Record plugin drops per-camera files during a take
    pub buffer_folder: PathBuf,
    /// Root under which finished sessions are filed away
    pub save_folder: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            buffer_folder: PathBuf::from("SourceRecordBuffer"),
            save_folder: PathBuf::from("Recordings"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8765 }
    }
}

impl AppConfig {
    /// Loads and validates `config.yaml`. Called once at startup; the result
    /// is immutable for the life of the process.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.obs_connection.obs_host.is_empty() {
            bail!("obs_connection.obs_host must not be empty");
        }
        if self.paths.buffer_folder.as_os_str().is_empty() {
            bail!("paths.buffer_folder must not be empty");
        }
        if self.paths.save_folder.as_os_str().is_empty() {
            bail!("paths.save_folder must not be empty");
        }
        if self.relay.host.is_empty() {
            bail!("relay.host must not be empty");
        }
        Ok(())
    }

    pub fn relay_addr(&self) -> String {
        format!("{}:{}", self.relay.host, self.relay.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
obs_connection:
  obs_host: studio-pc
  obs_port: 4457
  obs_password: hunter2
paths:
  buffer_folder: /tmp/buffer
  save_folder: /tmp/save
relay:
  host: 0.0.0.0
  port: 9001
"#;

    #[test]
    fn parses_full_config() {
        let config: AppConfig = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(config.obs_connection.obs_host, "studio-pc");
        assert_eq!(config.obs_connection.obs_port, 4457);
        assert_eq!(config.obs_connection.obs_password.as_deref(), Some("hunter2"));
        assert_eq!(config.paths.buffer_folder, PathBuf::from("/tmp/buffer"));
        assert_eq!(config.relay.port, 9001);
    }

    #[test]
    fn relay_section_is_optional() {
        let yaml = r#"
obs_connection:
  obs_host: localhost
  obs_port: 4455
paths:
  buffer_folder: buffer
  save_folder: save
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.obs_connection.obs_password.is_none());
        assert_eq!(config.relay.port, RelayConfig::default().port);
    }

    #[test]
    fn load_rejects_empty_host() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let yaml = SAMPLE.replace("studio-pc", "\"\"");
        file.write_all(yaml.as_bytes()).unwrap();
        assert!(AppConfig::load(file.path()).is_err());
    }

    #[test]
    fn load_surfaces_missing_file() {
        let err = AppConfig::load(Path::new("/nonexistent/config.yaml")).unwrap_err();
        assert!(err.to_string().contains("config.yaml"));
    }
}
