//! Server configuration loaded from environment variables

use std::path::PathBuf;

/// Server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

/// Database settings
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Upload handling settings
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Directory where uploaded PDFs are persisted
    pub dir: PathBuf,
}

/// Background job settings
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Maximum parse jobs running at once
    pub max_parse_workers: usize,
    /// Maximum translation jobs running at once
    pub max_translate_workers: usize,
    /// Timeout for a single extractor call, in seconds
    pub extract_timeout_secs: u64,
    /// Timeout for a single translator call, in seconds
    pub translate_timeout_secs: u64,
}

/// Machine translation provider settings
#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    /// Base URL of the Ollama-compatible generation API
    pub base_url: String,
    /// Model name used for translation
    pub model: String,
}

/// Full application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub upload: UploadConfig,
    pub jobs: JobConfig,
    pub translator: TranslatorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig { port: 8080 },
            database: DatabaseConfig {
                url: "sqlite://data/traductor.db".to_string(),
            },
            upload: UploadConfig {
                dir: PathBuf::from("data/uploads"),
            },
            jobs: JobConfig {
                max_parse_workers: 4,
                max_translate_workers: 4,
                extract_timeout_secs: 120,
                translate_timeout_secs: 120,
            },
            translator: TranslatorConfig {
                base_url: "http://localhost:11434".to_string(),
                model: "qwen2.5".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Self {
            server: ServerConfig {
                port: env_parse("TRADUCTOR_PORT", defaults.server.port),
            },
            database: DatabaseConfig {
                url: env_string("DATABASE_URL", &defaults.database.url),
            },
            upload: UploadConfig {
                dir: PathBuf::from(env_string(
                    "TRADUCTOR_UPLOAD_DIR",
                    &defaults.upload.dir.display().to_string(),
                )),
            },
            jobs: JobConfig {
                max_parse_workers: env_parse(
                    "TRADUCTOR_MAX_PARSE_WORKERS",
                    defaults.jobs.max_parse_workers,
                ),
                max_translate_workers: env_parse(
                    "TRADUCTOR_MAX_TRANSLATE_WORKERS",
                    defaults.jobs.max_translate_workers,
                ),
                extract_timeout_secs: env_parse(
                    "TRADUCTOR_EXTRACT_TIMEOUT_SECS",
                    defaults.jobs.extract_timeout_secs,
                ),
                translate_timeout_secs: env_parse(
                    "TRADUCTOR_TRANSLATE_TIMEOUT_SECS",
                    defaults.jobs.translate_timeout_secs,
                ),
            },
            translator: TranslatorConfig {
                base_url: env_string("TRADUCTOR_OLLAMA_URL", &defaults.translator.base_url),
                model: env_string("TRADUCTOR_OLLAMA_MODEL", &defaults.translator.model),
            },
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
