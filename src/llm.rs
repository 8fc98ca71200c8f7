//! Abstracción sobre Rig para trabajar con distintos proveedores de LLM.
//! Gemini es el proveedor por defecto; OpenAI queda disponible vía `LLM_PROVIDER`.

use crate::config::{AppConfig, LlmProvider};
use anyhow::Result;
use async_trait::async_trait;
use rig::client::CompletionClient as _;
use rig::completion::Prompt;
use rig::providers::{gemini, openai};
use tracing::debug;

/// Generación de texto a partir de un prompt, en una sola llamada y sin streaming.
///
/// Las tuberías de ingesta y consulta sólo dependen de este trait, de modo que
/// los tests pueden sustituir el modelo real por uno guionizado.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Clone)]
enum ChatClient {
    Gemini(gemini::Client),
    OpenAI(openai::Client),
}

/// Gestor del LLM. El cliente se crea una vez al arrancar y se reutiliza.
#[derive(Clone)]
pub struct LlmManager {
    pub provider: LlmProvider,
    pub chat_model: String,
    client: ChatClient,
}

impl LlmManager {
    /// Construye el manager a partir de la configuración, con la API key que
    /// ya validó `AppConfig`.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let client = match cfg.llm_provider {
            LlmProvider::Gemini => {
                ChatClient::Gemini(gemini::Client::builder(&cfg.llm_api_key).build()?)
            }
            LlmProvider::OpenAI => ChatClient::OpenAI(openai::Client::new(&cfg.llm_api_key)),
        };

        Ok(Self {
            provider: cfg.llm_provider.clone(),
            chat_model: cfg.llm_chat_model.clone(),
            client,
        })
    }
}

#[async_trait]
impl TextGenerator for LlmManager {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(
            "Enviando prompt de {} caracteres a {:?} ({})",
            prompt.chars().count(),
            self.provider,
            self.chat_model
        );

        let response = match &self.client {
            ChatClient::Gemini(client) => {
                let agent = client.agent(&self.chat_model).build();
                agent.prompt(prompt).await?
            }
            ChatClient::OpenAI(client) => {
                let agent = client.agent(&self.chat_model).build();
                agent.prompt(prompt).await?
            }
        };

        Ok(response)
    }
}
