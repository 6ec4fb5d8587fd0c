use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
const DEFAULT_MAX_FILES: usize = 10;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
const DEFAULT_OCR_TIMEOUT_SECS: u64 = 120;
const DEFAULT_SUMMARY_TIMEOUT_SECS: u64 = 30;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the document digest server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP server listens on.
    pub server_port: u16,
    /// Directory where uploads are stored until their batch completes.
    pub upload_dir: PathBuf,
    /// Per-file size limit in bytes.
    pub max_file_size: usize,
    /// Maximum number of files accepted in one request.
    pub max_files: usize,
    /// Attempts made for OCR and for each summarization provider.
    pub max_retries: u32,
    /// Base delay between retry attempts.
    pub retry_delay: Duration,
    /// OCR engine settings.
    pub ocr: OcrSettings,
    /// Summarization cascade settings.
    pub summary: SummarySettings,
}

/// Which OCR engine implementation to drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OcrEngineKind {
    /// Spawn a local process that prints a JSON result on stdout.
    Command,
    /// POST the raw file bytes to an OCR HTTP service.
    Http,
}

/// Settings for the OCR collaborator.
#[derive(Debug, Clone)]
pub struct OcrSettings {
    /// Selected engine implementation.
    pub engine: OcrEngineKind,
    /// Program executed by the command engine.
    pub command: String,
    /// Arguments placed before the file path.
    pub args: Vec<String>,
    /// Endpoint used by the HTTP engine.
    pub url: Option<String>,
    /// Upper bound for a single OCR attempt.
    pub timeout: Duration,
    /// Treat blank extracted text as a failed attempt.
    pub require_text: bool,
}

/// Supported summarization backends, in the order they may appear in the cascade.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SummarizationProvider {
    /// OpenAI chat completions.
    OpenAI,
    /// Hugging Face inference API.
    HuggingFace,
    /// Google Gemini `generateContent`.
    Gemini,
    /// Local Ollama runtime.
    Ollama,
}

impl SummarizationProvider {
    /// Stable identifier used in configuration and responses.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::HuggingFace => "huggingface",
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
        }
    }
}

impl FromStr for SummarizationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "huggingface" | "hugging_face" | "hf" => Ok(Self::HuggingFace),
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

/// Credentials and endpoint for one hosted provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// API key, when the provider requires one.
    pub api_key: Option<String>,
    /// Model identifier.
    pub model: String,
    /// Base URL of the provider API.
    pub base_url: String,
}

/// Settings for the summarization cascade.
#[derive(Debug, Clone)]
pub struct SummarySettings {
    /// Providers tried in order.
    pub providers: Vec<SummarizationProvider>,
    /// HTTP timeout applied to each provider call.
    pub timeout: Duration,
    /// OpenAI settings.
    pub openai: ProviderSettings,
    /// Hugging Face settings.
    pub huggingface: ProviderSettings,
    /// Gemini settings.
    pub gemini: ProviderSettings,
    /// Ollama settings; `api_key` is unused.
    pub ollama: ProviderSettings,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let engine = match load_env_optional("OCR_ENGINE").as_deref() {
            None => OcrEngineKind::Command,
            Some(value) => match value.to_lowercase().as_str() {
                "command" => OcrEngineKind::Command,
                "http" => OcrEngineKind::Http,
                _ => return Err(ConfigError::InvalidValue("OCR_ENGINE".into())),
            },
        };
        let url = load_env_optional("OCR_URL");
        if engine == OcrEngineKind::Http && url.is_none() {
            return Err(ConfigError::MissingVariable("OCR_URL".into()));
        }

        let ocr = OcrSettings {
            engine,
            command: load_env_or("OCR_COMMAND", "python3"),
            args: load_env_or("OCR_ARGS", "ocr.py")
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            url,
            timeout: Duration::from_secs(parse_env("OCR_TIMEOUT_SECS", DEFAULT_OCR_TIMEOUT_SECS)?),
            require_text: parse_env("OCR_REQUIRE_TEXT", engine == OcrEngineKind::Command)?,
        };

        let providers = load_env_or("SUMMARY_PROVIDERS", "openai,huggingface,gemini")
            .split(',')
            .filter(|name| !name.trim().is_empty())
            .map(|name| {
                name.parse()
                    .map_err(|()| ConfigError::InvalidValue(format!("SUMMARY_PROVIDERS ({name})")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let summary = SummarySettings {
            providers,
            timeout: Duration::from_secs(parse_env(
                "SUMMARY_TIMEOUT_SECS",
                DEFAULT_SUMMARY_TIMEOUT_SECS,
            )?),
            openai: ProviderSettings {
                api_key: load_env_optional("OPENAI_API_KEY"),
                model: load_env_or("OPENAI_MODEL", "gpt-3.5-turbo"),
                base_url: load_env_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            },
            huggingface: ProviderSettings {
                api_key: load_env_optional("HUGGING_FACE_API_KEY"),
                model: load_env_or("HUGGING_FACE_MODEL", "distilbert-base-uncased"),
                base_url: load_env_or(
                    "HUGGING_FACE_BASE_URL",
                    "https://api-inference.huggingface.co/models",
                ),
            },
            gemini: ProviderSettings {
                api_key: load_env_optional("GEMINI_API_KEY"),
                model: load_env_or("GEMINI_MODEL", "gemini-1.5-flash"),
                base_url: load_env_or(
                    "GEMINI_BASE_URL",
                    "https://generativelanguage.googleapis.com/v1beta/models",
                ),
            },
            ollama: ProviderSettings {
                api_key: None,
                model: load_env_or("OLLAMA_MODEL", "llama3.1"),
                base_url: load_env_or("OLLAMA_URL", "http://127.0.0.1:11434"),
            },
        };

        Ok(Self {
            server_port: parse_env("SERVER_PORT", DEFAULT_PORT)?,
            upload_dir: PathBuf::from(load_env_or("UPLOAD_DIR", "uploads")),
            max_file_size: parse_env("MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE)?,
            max_files: parse_env("MAX_FILES", DEFAULT_MAX_FILES)?,
            max_retries: parse_env("MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            retry_delay: Duration::from_millis(parse_env("RETRY_DELAY_MS", DEFAULT_RETRY_DELAY_MS)?),
            ocr,
            summary,
        })
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_or(key: &str, default: &str) -> String {
    load_env_optional(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
        .map(|value| value.unwrap_or(default))
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        port = config.server_port,
        upload_dir = %config.upload_dir.display(),
        ocr_engine = ?config.ocr.engine,
        providers = ?config.summary.providers,
        max_retries = config.max_retries,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
