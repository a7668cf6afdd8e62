use std::{borrow::Cow, fmt, io::IsTerminal, net::SocketAddr, path::PathBuf, str::FromStr};

use clap::{Parser, Subcommand, ValueEnum};
use config::{Config, RateLimitQuota};
use logforth::filter::EnvFilter;
use secrecy::SecretString;
use url::Url;

#[derive(Debug, Parser)]
#[command(name = "GenAI Router", version, long_about = concat!("GenAI Router v", env!("CARGO_PKG_VERSION")))]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,
    /// IP address on which the server will listen for incomming connections.
    /// Default: 127.0.0.1:8000
    #[arg(short, long, env = "GENAI_LISTEN_ADDRESS")]
    pub listen_address: Option<SocketAddr>,
    /// Path to the TOML configuration file
    #[arg(long, short, env = "GENAI_CONFIG_PATH", default_value = "./genai-router.toml")]
    pub config: PathBuf,
    /// Ollama server used when no routing table is configured
    #[arg(long, env = "GENAI_OLLAMA_BASE_URL")]
    pub ollama_base_url: Option<Url>,
    /// API keys accepted by the server, replacing the ones in the configuration file
    #[arg(long = "api-key", env = "GENAI_API_KEYS", value_delimiter = ',')]
    pub api_keys: Vec<String>,
    /// Per-client rate limit, e.g. `100/minute`. `0/minute` disables limiting.
    #[arg(long, env = "GENAI_RATE_LIMIT")]
    pub rate_limit: Option<RateLimitQuota>,
    /// Set the logging level, this applies to all log events.
    #[arg(long = "log", env = "GENAI_LOG", default_value_t = LogLevel::default(), global = true)]
    pub log_level: LogLevel,
    /// Set the style of log output
    #[arg(long, env = "GENAI_LOG_STYLE", default_value_t = LogStyle::default(), global = true)]
    pub log_style: LogStyle,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the gateway (default)
    Serve,
    /// Send one chat completion to a running gateway
    Chat(ChatArgs),
}

#[derive(Debug, clap::Args)]
pub struct ChatArgs {
    /// The user message
    pub message: String,
    /// Model to request
    #[arg(short, long, default_value = "llama3")]
    pub model: String,
    /// Base URL of the gateway
    #[arg(short, long, default_value = "http://localhost:8000")]
    pub server: Url,
    /// Stream the answer chunk by chunk
    #[arg(long)]
    pub stream: bool,
    /// API key presented to the gateway
    #[arg(long, env = "GENAI_API_KEY")]
    pub api_key: Option<String>,
}

impl Args {
    /// Loads the configuration file, or the defaults if there is none, and applies the overrides
    /// from the command line and environment.
    pub fn config(&self) -> anyhow::Result<Config> {
        let mut config = if self.config.exists() {
            Config::load(&self.config)?
        } else {
            log::debug!(
                "No configuration file at {}, using defaults",
                self.config.display()
            );

            Config::default()
        };

        if let Some(url) = &self.ollama_base_url {
            config.llm.ollama_base_url = url.clone();
        }

        let api_keys: Vec<_> = self
            .api_keys
            .iter()
            .map(|key| key.trim())
            .filter(|key| !key.is_empty())
            .map(|key| SecretString::from(key.to_string()))
            .collect();

        if !api_keys.is_empty() {
            config.server.auth.api_keys = api_keys;
        }

        if let Some(quota) = &self.rate_limit {
            config.server.rate_limit = Some(quota.clone());
        }

        Ok(config)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub(crate) enum LogStyle {
    /// Colorized text, used as the default with TTY output
    Color,
    /// Standard text, used as the default with non-TTY output
    Text,
    /// JSON objects
    Json,
}

impl Default for LogStyle {
    fn default() -> Self {
        if std::io::stdout().is_terminal() {
            LogStyle::Color
        } else {
            LogStyle::Text
        }
    }
}

impl AsRef<str> for LogStyle {
    fn as_ref(&self) -> &str {
        match self {
            LogStyle::Color => "color",
            LogStyle::Text => "text",
            LogStyle::Json => "json",
        }
    }
}

impl fmt::Display for LogStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub(crate) enum LogLevel {
    /// Disable logging
    Off,
    /// Only log errors
    Error,
    /// Log errors, and warnings
    Warn,
    /// Log errors, warnings, and info messages
    #[default]
    Info,
    /// Log errors, warnings, info, and debug messages
    Debug,
    /// Log errors, warnings, info, debug, and trace messages
    Trace,
}

impl LogLevel {
    pub fn env_filter(self) -> EnvFilter {
        let filter_str = match self {
            LogLevel::Off => Cow::Borrowed("off"),
            // Dependencies stay at warn, workspace crates follow the selected level.
            level => Cow::Owned(format!(
                "warn,genai_router={level},server={level},config={level},llm={level},rate_limit={level},telemetry={level}"
            )),
        };

        EnvFilter::from_str(&filter_str).expect("These all are valid env filters.")
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_ref().fmt(f)
    }
}

impl AsRef<str> for LogLevel {
    fn as_ref(&self) -> &str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}
