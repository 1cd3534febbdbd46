use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub default_provider: String,
    pub default_model: String,
    /// Paragraph-aligned chunk bound for the summarization path.
    pub max_chunk_chars: usize,
    /// Global cap on text fed to the single-call tasks (key terms, quiz).
    pub max_prompt_chars: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    pub max_file_size_mb: usize,
    pub quiz_count_min: u8,
    pub quiz_count_max: u8,
    pub quiz_count_default: u8,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_loads() {
        unsafe { std::env::set_var("RUN_ENV", "development") };
        let config = AppConfig::load();
        assert!(config.is_ok(), "Default config should load: {config:?}");

        let config = config.unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.llm.max_chunk_chars, 3800);
        assert!(config.limits.quiz_count_min <= config.limits.quiz_count_default);
        assert!(config.limits.quiz_count_default <= config.limits.quiz_count_max);
    }

    #[test]
    fn test_env_override() {
        // Overrides a key the other test doesn't assert on — tests share the
        // process environment.
        unsafe {
            std::env::set_var("APP__LLM__MAX_PROMPT_CHARS", "9000");
            std::env::set_var("RUN_ENV", "development");
        }

        let config = AppConfig::load().unwrap();
        assert_eq!(config.llm.max_prompt_chars, 9000);

        unsafe { std::env::remove_var("APP__LLM__MAX_PROMPT_CHARS") };
    }
}
