use std::path::PathBuf;

use crate::aggregate::{MatchMode, TokenMode};

pub const DEFAULT_DATA_PATH: &str = "ANALISA KANTIN/sta24.csv";
pub const DEFAULT_OUT_PATH: &str = "out/dashboard/index.html";

#[derive(Debug, Clone)]
pub struct Config {
    pub data_path: PathBuf,
    pub out_path: PathBuf,
    pub show_preview: bool,
    pub obstacle_match: MatchMode,
    pub reason_tokens: TokenMode,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            out_path: PathBuf::from(DEFAULT_OUT_PATH),
            show_preview: true,
            obstacle_match: MatchMode::Substring,
            reason_tokens: TokenMode::Raw,
            port: 8501,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_path: std::env::var("KANTIN_DATA")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            out_path: std::env::var("KANTIN_OUT")
                .map(PathBuf::from)
                .unwrap_or(defaults.out_path),
            show_preview: std::env::var("KANTIN_PREVIEW")
                .ok()
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.show_preview),
            obstacle_match: std::env::var("KANTIN_OBSTACLE_MATCH")
                .ok()
                .and_then(|v| MatchMode::parse(&v))
                .unwrap_or(defaults.obstacle_match),
            reason_tokens: std::env::var("KANTIN_REASON_TOKENS")
                .ok()
                .and_then(|v| TokenMode::parse(&v))
                .unwrap_or(defaults.reason_tokens),
            port: std::env::var("KANTIN_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
        }
    }

    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
