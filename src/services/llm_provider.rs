use anyhow::{Context, Result};
use async_trait::async_trait;
use rig::client::completion::CompletionClientDyn;
use rig::client::{ProviderClient, ProviderValue};
use rig::completion::Prompt;
use rig::providers::{gemini, openai};

use crate::errors::AppError;

/// One blocking round trip to a hosted model. The pipeline only ever talks to
/// this port, so provider SDKs stay out of the orchestration code and tests
/// can substitute a scripted caller.
#[async_trait]
pub trait ModelCaller: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AppError>;
}

/// `ModelCaller` backed by a rig completion client.
pub struct RigCaller {
    client: Box<dyn CompletionClientDyn>,
    model: String,
}

impl RigCaller {
    pub fn new(provider: &str, api_key: &str, model: &str) -> Result<Self, AppError> {
        let client = create_completion_client(provider, api_key)?;
        Ok(Self {
            client,
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl ModelCaller for RigCaller {
    async fn generate(&self, prompt: &str) -> Result<String, AppError> {
        let agent = self.client.agent(&self.model).build();
        agent
            .prompt(prompt)
            .await
            .map_err(|e| AppError::Inference(format!("Model call failed: {e}")))
    }
}

/// Environment variable consulted for a provider's API key.
pub fn env_key_var(provider: &str) -> Option<&'static str> {
    match provider.to_lowercase().as_str() {
        "openai" => Some("OPENAI_API_KEY"),
        "gemini" | "google" => Some("GEMINI_API_KEY"),
        _ => None,
    }
}

/// Resolve an API key: an explicit user-supplied value wins, then the
/// provider's environment variable. Neither present is a configuration
/// error — surfaced before any network call is attempted.
pub fn resolve_api_key(provider: &str, explicit: Option<&str>) -> Result<String, AppError> {
    if let Some(key) = explicit.map(str::trim).filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }

    let var = env_key_var(provider)
        .ok_or_else(|| AppError::Validation(format!("Unsupported provider: {provider}")))?;

    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(AppError::Configuration(format!(
            "No API key found for provider '{provider}'. \
             Supply one in the request or set the {var} environment variable."
        ))),
    }
}

fn create_provider_boxed(provider: &str, api_key: &str) -> Result<Box<dyn ProviderClient>> {
    let value = ProviderValue::Simple(api_key.to_string());

    let boxed: Box<dyn ProviderClient> = match provider.to_lowercase().as_str() {
        "openai" => {
            let c: openai::Client<reqwest::Client> = openai::Client::from_val(value);
            c.boxed()
        }
        "gemini" | "google" => {
            let c: gemini::Client<reqwest::Client> = gemini::Client::from_val(value);
            c.boxed()
        }
        other => return Err(anyhow::anyhow!("Unsupported provider: {other}")),
    };

    Ok(boxed)
}

pub fn create_completion_client(
    provider: &str,
    api_key: &str,
) -> Result<Box<dyn CompletionClientDyn>, AppError> {
    let boxed = create_provider_boxed(provider, api_key)
        .map_err(|e| AppError::Validation(e.to_string()))?;
    boxed
        .as_completion()
        .context(format!("Provider '{provider}' does not support completions"))
        .map_err(AppError::Internal)
}

pub fn supported_providers() -> Vec<ProviderInfo> {
    vec![
        ProviderInfo {
            id: "openai",
            name: "OpenAI",
            env_key_var: "OPENAI_API_KEY",
            default_model: "gpt-4o-mini",
            models: &[
                ModelEntry { id: "gpt-4o-mini", display_name: "GPT-4o Mini" },
                ModelEntry { id: "gpt-4o", display_name: "GPT-4o" },
                ModelEntry { id: "gpt-4-turbo", display_name: "GPT-4 Turbo" },
                ModelEntry { id: "gpt-3.5-turbo", display_name: "GPT-3.5 Turbo" },
            ],
        },
        ProviderInfo {
            id: "gemini",
            name: "Google Gemini",
            env_key_var: "GEMINI_API_KEY",
            default_model: "gemini-2.0-flash",
            models: &[
                ModelEntry { id: "gemini-2.0-flash", display_name: "Gemini 2.0 Flash" },
                ModelEntry { id: "gemini-2.0-flash-lite", display_name: "Gemini 2.0 Flash Lite" },
                ModelEntry { id: "gemini-1.5-pro", display_name: "Gemini 1.5 Pro" },
                ModelEntry { id: "gemini-1.5-flash", display_name: "Gemini 1.5 Flash" },
            ],
        },
    ]
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProviderInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub env_key_var: &'static str,
    pub default_model: &'static str,
    pub models: &'static [ModelEntry],
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ModelEntry {
    pub id: &'static str,
    pub display_name: &'static str,
}
