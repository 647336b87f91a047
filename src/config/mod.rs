//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Gameplay policy shared by every session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameRules {
    /// First value of the pre-game countdown (counts down to 0)
    pub countdown_start: u32,
    /// Delay between countdown ticks
    pub countdown_step: Duration,
    /// How long a wrong click locks the player out
    pub penalty: Duration,
    /// Readiness polls before a session with no referee is cancelled
    pub ready_poll_attempts: u32,
    /// Delay between readiness polls
    pub ready_poll_interval: Duration,
    /// Points needed to win alone
    pub points_to_win_solo: u32,
    /// Points needed to win against others
    pub points_to_win_multi: u32,
    /// Color the hit validator treats as background
    pub ignored_color: u32,
}

impl GameRules {
    pub fn points_to_win(&self, player_count: usize) -> u32 {
        if player_count <= 1 {
            self.points_to_win_solo
        } else {
            self.points_to_win_multi
        }
    }

    /// Defaults overridden by any rule env vars that are set
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            countdown_start: env_or("COUNTDOWN_START", defaults.countdown_start)?,
            countdown_step: defaults.countdown_step,
            penalty: Duration::from_millis(env_or(
                "PENALTY_MS",
                defaults.penalty.as_millis() as u64,
            )?),
            ready_poll_attempts: env_or("READY_POLL_ATTEMPTS", defaults.ready_poll_attempts)?,
            ready_poll_interval: Duration::from_millis(env_or(
                "READY_POLL_INTERVAL_MS",
                defaults.ready_poll_interval.as_millis() as u64,
            )?),
            points_to_win_solo: env_or("POINTS_TO_WIN_SOLO", defaults.points_to_win_solo)?,
            points_to_win_multi: env_or("POINTS_TO_WIN_MULTI", defaults.points_to_win_multi)?,
            ignored_color: defaults.ignored_color,
        })
    }
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            countdown_start: 3,
            countdown_step: Duration::from_secs(1),
            penalty: Duration::from_millis(1000),
            ready_poll_attempts: 6,
            ready_poll_interval: Duration::from_millis(500),
            points_to_win_solo: 7,
            points_to_win_multi: 4,
            ignored_color: 0xFF,
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Base URL of the hit-validation service
    pub hit_validator_url: String,
    /// Highscore service endpoint; finished games are only logged when unset
    pub highscore_url: Option<String>,

    /// Directory holding `images/` and `scenes/`
    pub asset_root: PathBuf,
    /// Directory for staged per-game copies
    pub temp_dir: PathBuf,

    /// Public base URL the staged assets are reachable at
    pub public_base_url: String,
    /// Allowed client origin for CORS
    pub client_origin: String,

    pub rules: GameRules,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = env::var("PORT").ok();
        let server_addr = match &port {
            Some(port) => format!("0.0.0.0:{}", port),
            None => env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        };
        let server_addr: SocketAddr = server_addr
            .parse()
            .map_err(|_| ConfigError::InvalidAddress)?;

        Ok(Self {
            server_addr,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            hit_validator_url: env::var("HIT_VALIDATOR_URL")
                .unwrap_or_else(|_| "http://localhost:3000/api/hit-validator".to_string()),
            highscore_url: env::var("HIGHSCORE_URL").ok().filter(|url| !url.is_empty()),

            asset_root: env::var("ASSET_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("public")),
            temp_dir: env::var("TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("temp")),

            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", server_addr.port())),
            client_origin: env::var("CLIENT_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:4200".to_string()),

            rules: GameRules::from_env()?,
        })
    }
}

fn env_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
