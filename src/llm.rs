//! Abstracción sobre Rig para el clasificador de sentimiento remoto.
//! De momento se implementa OpenAI; Gemini/Ollama quedan preparados para el futuro.

use crate::config::{AppConfig, LlmProvider};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rig::completion::Prompt;
use std::time::Duration;

/// Servicio remoto que puntúa un lote de comentarios.
///
/// Recibe los textos ya unidos con el separador del lote y devuelve la
/// respuesta en bruto; el análisis de la respuesta lo hace el clasificador.
#[async_trait]
pub trait SentimentBackend: Send + Sync {
    async fn score_batch(&self, joined_texts: &str) -> Result<String>;
}

/// Gestor del LLM usado para puntuar sentimiento.
#[derive(Debug, Clone)]
pub struct LlmManager {
    pub provider: LlmProvider,
    pub chat_model: String,
    pub timeout: Duration,
}

impl LlmManager {
    /// Construye el manager a partir de la configuración.
    /// Devuelve `None` si no hay credencial: entonces sólo se usa el léxico.
    pub fn from_config(cfg: &AppConfig) -> Option<Self> {
        if !cfg.remote_classifier_enabled() {
            return None;
        }
        Some(Self {
            provider: cfg.llm_provider.clone(),
            chat_model: cfg.llm_chat_model.clone(),
            timeout: Duration::from_secs(cfg.llm_timeout_secs),
        })
    }

    async fn score_with_openai(&self, joined_texts: &str) -> Result<String> {
        use rig::providers::openai;
        // Trait para client.agent(...)
        use rig::client::CompletionClient as _;

        const SYSTEM_PROMPT: &str = r#"
Analyze the sentiment of each comment separated by '---'.
Return a JSON array with sentiment scores from -1 (most negative) to 1 (most positive) for each comment, in the same order.
Only return the JSON array, no other text.
"#;

        let client = openai::Client::from_env();

        let model_name = if self.chat_model.is_empty() {
            "gpt-3.5-turbo"
        } else {
            self.chat_model.as_str()
        };

        let agent = client
            .agent(model_name)
            .preamble(SYSTEM_PROMPT)
            .temperature(0.1)
            .max_tokens(500)
            .build();

        let answer = agent.prompt(joined_texts).await?;
        Ok(answer)
    }
}

/// Corta una llamada remota que no responde dentro del plazo.
pub async fn with_deadline<F>(timeout: Duration, call: F) -> Result<String>
where
    F: std::future::Future<Output = Result<String>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| anyhow!("El LLM no respondió en {}ms", timeout.as_millis()))?
}

#[async_trait]
impl SentimentBackend for LlmManager {
    async fn score_batch(&self, joined_texts: &str) -> Result<String> {
        let call = async {
            match self.provider {
                LlmProvider::OpenAI => self.score_with_openai(joined_texts).await,
                ref other => Err(anyhow!(
                    "Proveedor LLM {:?} aún no implementado para sentimiento",
                    other
                )),
            }
        };

        with_deadline(self.timeout, call).await
    }
}
