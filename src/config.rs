use std::io;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use crate::executor::DEFAULT_SEARCH_DIRS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub prompt: String,
    pub echo_input: bool,
    pub search_path: Vec<PathBuf>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        ConfigLoader::default_config()
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn default_config() -> Config {
        Config {
            prompt: "What next? ".to_string(),
            echo_input: false,
            search_path: DEFAULT_SEARCH_DIRS.iter().map(PathBuf::from).collect(),
            log_level: "warn".to_string(),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let src = fs::read_to_string(path)?;
        Self::load_from_str(&src)
    }

    /// Parses `key=value` lines. Everything after the first `=` is the value,
    /// untrimmed, so a prompt can keep its trailing space.
    pub fn load_from_str(src: &str) -> Result<Config, ConfigError> {
        let mut config = Self::default_config();

        for (lineno, line) in src.lines().enumerate() {
            let lineno = lineno + 1;
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Parse(format!("Line {}: No '=' found: {}", lineno, line)));
            };

            match key.trim() {
                "prompt" => config.prompt = value.to_string(),
                "echo_input" => match value.trim() {
                    "true" => config.echo_input = true,
                    "false" => config.echo_input = false,
                    _ => {
                        return Err(ConfigError::Parse(format!(
                            "Line {}: Invalid bool: {}",
                            lineno, line
                        )));
                    }
                },
                "search_path" => {
                    let dirs: Vec<PathBuf> = value
                        .trim()
                        .split(':')
                        .filter(|dir| !dir.is_empty())
                        .map(PathBuf::from)
                        .collect();
                    if dirs.is_empty() {
                        return Err(ConfigError::Parse(format!(
                            "Line {}: Empty search path",
                            lineno
                        )));
                    }
                    config.search_path = dirs;
                }
                "log_level" => config.log_level = value.trim().to_string(),
                k => return Err(ConfigError::Parse(format!("Line {}: Unknown key: {}", lineno, k))),
            }
        }

        Ok(config)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
}
