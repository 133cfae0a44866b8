use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MODEL_PATH: &str = "runs/classify/train/weights/best.onnx";
pub const DEFAULT_DATA_FILE: &str = "data.json";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;
pub const DEFAULT_REVIEW_TIMEOUT_SECS: u64 = 60;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub classifier: ClassifierConfig,
    pub review: ReviewConfig,
    pub store: StoreConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .or_else(|_| env::var("PORT"))
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;
        let max_upload_bytes = parse_number(
            "APP_MAX_UPLOAD_BYTES",
            DEFAULT_MAX_UPLOAD_BYTES as u64,
        )? as usize;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let model_path = env::var("MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_PATH));

        let data_file = env::var("DATA_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_FILE));

        Ok(Self {
            environment,
            server: ServerConfig {
                host,
                port,
                max_upload_bytes,
            },
            telemetry: TelemetryConfig { log_level },
            classifier: ClassifierConfig { model_path },
            review: ReviewConfig::from_env()?,
            store: StoreConfig { data_file },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Location of the two-class image model artifact.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub model_path: PathBuf,
}

/// Where moderation records are appended.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub data_file: PathBuf,
}

/// Which language-model backend serves the policy review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewProvider {
    Ollama,
    /// Any OpenAI-compatible chat completions API (Groq by default).
    ChatCompletions,
}

impl ReviewProvider {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "groq" | "openai" | "chat" => Ok(Self::ChatCompletions),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }

    pub fn default_endpoint(self) -> &'static str {
        match self {
            Self::Ollama => "http://127.0.0.1:11434",
            Self::ChatCompletions => "https://api.groq.com/openai/v1",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::Ollama => "llama3.1",
            Self::ChatCompletions => "llama-3.1-8b-instant",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReviewConfig {
    pub provider: ReviewProvider,
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl ReviewConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let provider = match env::var("REVIEW_PROVIDER") {
            Ok(value) => ReviewProvider::parse(&value)?,
            Err(_) => ReviewProvider::Ollama,
        };

        let endpoint = env::var("REVIEW_ENDPOINT")
            .unwrap_or_else(|_| provider.default_endpoint().to_string());
        let model =
            env::var("REVIEW_MODEL").unwrap_or_else(|_| provider.default_model().to_string());
        let api_key = env::var("REVIEW_API_KEY")
            .or_else(|_| env::var("GROQ_API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty());

        if provider == ReviewProvider::ChatCompletions && api_key.is_none() {
            return Err(ConfigError::MissingApiKey);
        }

        let timeout_secs = parse_number("REVIEW_TIMEOUT_SECS", DEFAULT_REVIEW_TIMEOUT_SECS)?;
        // A zero timeout would fail every review before the backend answers.
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidNumber {
                name: "REVIEW_TIMEOUT_SECS",
            });
        }
        let timeout = Duration::from_secs(timeout_secs);

        Ok(Self {
            provider,
            endpoint,
            model,
            api_key,
            timeout,
        })
    }
}

fn parse_number(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { name }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { name: &'static str },
    UnknownProvider(String),
    MissingApiKey,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { name } => {
                write!(f, "{name} must be a positive integer")
            }
            ConfigError::UnknownProvider(value) => write!(
                f,
                "REVIEW_PROVIDER '{value}' is not supported (expected ollama or groq)"
            ),
            ConfigError::MissingApiKey => write!(
                f,
                "REVIEW_API_KEY or GROQ_API_KEY is required for the chat completions provider"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
