use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub conversation: ConversationConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    /// Absent key disables both assistants (every turn fails fast)
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_seconds: u64,
    pub max_tokens: usize,
    pub temperature: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    /// Absent url runs the clinic assistant with empty statistics
    pub url: Option<String>,
    pub pool_max_size: u32,
    pub pool_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConversationConfig {
    pub patient_max_messages: usize,
    pub clinic_max_messages: usize,
    /// 0 disables the idle sweep
    pub idle_sweep_seconds: u64,
    pub idle_ttl_seconds: i64,
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("llm.base_url", "https://generativelanguage.googleapis.com/v1beta/openai")?
            .set_default("llm.model", "gemini-2.0-flash")?
            .set_default("llm.timeout_seconds", 60)?
            .set_default("llm.max_tokens", 1024)?
            .set_default("llm.temperature", 0.4)?
            .set_default("database.pool_max_size", 5)?
            .set_default("database.pool_timeout_seconds", 10)?
            .set_default("auth.jwt_secret", "change-me")?
            .set_default("conversation.patient_max_messages", 6)?
            .set_default("conversation.clinic_max_messages", 8)?
            .set_default("conversation.idle_sweep_seconds", 0)?
            .set_default("conversation.idle_ttl_seconds", 6 * 60 * 60)?
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    /// Credential for the text-generation service, ignoring blank values
    pub fn llm_api_key(&self) -> Option<&str> {
        self.llm
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}
