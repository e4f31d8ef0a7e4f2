use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::room::{TimerSettings, DEFAULT_BREAK_SECS, DEFAULT_WORK_SECS};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("a study log store URL was given without an API key")]
    MissingSinkKey,
}

/// Focus room server: shared work/break timers over WebSocket.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Config {
    /// Address to bind to
    #[arg(short = 'H', long, env = "FOCUS_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3001)]
    pub port: u16,
    /// Length of a WORK phase in seconds
    #[arg(long, env = "FOCUS_WORK_SECS", default_value_t = DEFAULT_WORK_SECS)]
    pub work_secs: u32,
    /// Length of a BREAK phase in seconds
    #[arg(long, env = "FOCUS_BREAK_SECS", default_value_t = DEFAULT_BREAK_SECS)]
    pub break_secs: u32,
    /// Scheduler period in milliseconds; each period takes one second off running timers
    #[arg(long, env = "FOCUS_TICK_MS", default_value_t = 1000)]
    pub tick_ms: u64,
    /// Base URL of the Supabase/PostgREST study log store
    #[arg(long, env = "SUPABASE_URL")]
    pub sink_url: Option<String>,
    /// API key for the study log store
    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true)]
    pub sink_key: Option<String>,
    /// Table receiving study log records
    #[arg(long, env = "FOCUS_SINK_TABLE", default_value = "study_logs")]
    pub sink_table: String,
    /// Directory served as static files
    #[arg(long, env = "FOCUS_STATIC_DIR", default_value = "public")]
    pub static_dir: PathBuf,
    /// PEM certificate chain; enables HTTPS/WSS together with --tls-key
    #[arg(long, env = "FOCUS_TLS_CERT", requires = "tls_key")]
    pub tls_cert: Option<PathBuf>,
    /// PEM private key
    #[arg(long, env = "FOCUS_TLS_KEY", requires = "tls_cert")]
    pub tls_key: Option<PathBuf>,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.work_secs == 0 {
            return Err(ConfigError::Zero("work-secs"));
        }
        if self.break_secs == 0 {
            return Err(ConfigError::Zero("break-secs"));
        }
        if self.tick_ms == 0 {
            return Err(ConfigError::Zero("tick-ms"));
        }
        if self.sink().is_some() && self.sink_key.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::MissingSinkKey);
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn timer_settings(&self) -> TimerSettings {
        TimerSettings {
            work_secs: self.work_secs,
            break_secs: self.break_secs,
        }
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// The store URL, treating an empty value as unset.
    pub fn sink(&self) -> Option<&str> {
        self.sink_url.as_deref().filter(|url| !url.trim().is_empty())
    }

    pub fn tls_identity(&self) -> Option<(&PathBuf, &PathBuf)> {
        self.tls_cert.as_ref().zip(self.tls_key.as_ref())
    }
}
