use serde::Deserialize;

/// Development-only signing secret, used when `JWT_SECRET` is unset
pub const DEFAULT_JWT_SECRET: &str = "edubit-development-secret-change-me";

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// PostgreSQL database connection URL. Without it the in-memory store is used.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Redis connection URL for caching generated AI content
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Secret used to sign access tokens
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// Access token lifetime in minutes
    #[serde(default = "default_token_expiry")]
    pub access_token_expire_minutes: i64,

    #[serde(default)]
    pub openai_api_key: Option<String>,

    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    #[serde(default = "default_openai_api_url")]
    pub openai_api_url: String,

    #[serde(default)]
    pub cloudinary_cloud_name: Option<String>,

    #[serde(default)]
    pub cloudinary_api_key: Option<String>,

    #[serde(default)]
    pub cloudinary_api_secret: Option<String>,

    /// Folder uploaded videos are placed in on the media host
    #[serde(default = "default_cloudinary_folder")]
    pub cloudinary_folder: String,

    /// Origins allowed by the CORS layer (comma-separated in the environment)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted request body, in bytes (bounds video uploads)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

/// Settings for the text-generation provider
#[derive(Debug, Clone, PartialEq)]
pub struct AiSettings {
    pub api_key: String,
    pub model: String,
    pub api_url: String,
}

/// Credentials for the video hosting provider
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSettings {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
}

fn default_jwt_secret() -> String {
    DEFAULT_JWT_SECRET.to_string()
}

fn default_token_expiry() -> i64 {
    60 * 24 * 7
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_openai_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_cloudinary_folder() -> String {
    "edubit/reels".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_upload_bytes() -> usize {
    100 * 1024 * 1024
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// AI settings, present only when an API key is configured
    pub fn ai_settings(&self) -> Option<AiSettings> {
        non_empty(&self.openai_api_key).map(|api_key| AiSettings {
            api_key,
            model: self.openai_model.clone(),
            api_url: self.openai_api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Media settings, present only when all three credentials are configured
    pub fn media_settings(&self) -> Option<MediaSettings> {
        Some(MediaSettings {
            cloud_name: non_empty(&self.cloudinary_cloud_name)?,
            api_key: non_empty(&self.cloudinary_api_key)?,
            api_secret: non_empty(&self.cloudinary_api_secret)?,
            folder: self.cloudinary_folder.clone(),
        })
    }

    /// Whether the development signing secret is still in use
    pub fn uses_default_jwt_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }

    /// Socket address string the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
