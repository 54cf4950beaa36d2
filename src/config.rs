//! Carga y gestión de configuración de la aplicación (YouTube + LLM + Neo4j).

use std::env;
use std::str::FromStr;
use anyhow::{anyhow, Result};

#[derive(Clone, Debug, PartialEq)]
pub enum LlmProvider {
    OpenAI,
    Gemini,
    Ollama,
}

impl LlmProvider {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => Err(anyhow!("Proveedor LLM no soportado: {other}")),
        }
    }
}

/// Credenciales de Neo4j. Si no hay `NEO4J_URI` se usa el almacén en memoria.
#[derive(Clone, Debug)]
pub struct Neo4jConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
}

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_addr: String,

    pub youtube_api_key: Option<String>,
    pub youtube_api_base: String,
    pub youtube_max_results: u32,

    pub llm_provider: LlmProvider,
    pub llm_chat_model: String,
    /// Con `None` el clasificador remoto queda desactivado y todo pasa por el léxico.
    pub llm_api_key: Option<String>,
    pub llm_timeout_secs: u64,

    pub neo4j: Option<Neo4jConfig>,
    pub recent_analyses_limit: usize,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        let server_addr =
            env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:3322".to_string());

        let youtube_api_key = non_empty_var("YOUTUBE_API_KEY");
        let youtube_api_base = env::var("YOUTUBE_API_BASE")
            .unwrap_or_else(|_| "https://www.googleapis.com/youtube/v3".to_string());
        let youtube_max_results = parse_var("YOUTUBE_MAX_RESULTS", 100u32)?;

        let llm_provider_str =
            env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let llm_provider = LlmProvider::from_str(&llm_provider_str)?;
        let llm_chat_model =
            env::var("LLM_CHAT_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string());
        let llm_api_key = non_empty_var("OPENAI_API_KEY");
        let llm_timeout_secs = parse_var("LLM_TIMEOUT_SECS", 30u64)?;

        let neo4j = match non_empty_var("NEO4J_URI") {
            Some(uri) => {
                let user = env::var("NEO4J_USER")
                    .map_err(|_| anyhow!("Falta NEO4J_USER en el entorno"))?;
                let password = env::var("NEO4J_PASSWORD")
                    .map_err(|_| anyhow!("Falta NEO4J_PASSWORD en el entorno"))?;
                Some(Neo4jConfig { uri, user, password })
            }
            None => None,
        };

        let recent_analyses_limit = parse_var("RECENT_ANALYSES_LIMIT", 10usize)?;

        Ok(Self {
            server_addr,
            youtube_api_key,
            youtube_api_base,
            youtube_max_results,
            llm_provider,
            llm_chat_model,
            llm_api_key,
            llm_timeout_secs,
            neo4j,
            recent_analyses_limit,
        })
    }

    /// El clasificador remoto sólo se usa si hay credencial para el proveedor.
    pub fn remote_classifier_enabled(&self) -> bool {
        self.llm_api_key.is_some()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match non_empty_var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow!("Valor inválido para {name}: '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parsing_is_case_insensitive() {
        assert_eq!(LlmProvider::from_str("OpenAI").unwrap(), LlmProvider::OpenAI);
        assert_eq!(LlmProvider::from_str("ollama").unwrap(), LlmProvider::Ollama);
        assert!(LlmProvider::from_str("bard").is_err());
    }

    #[test]
    fn parse_var_falls_back_to_default() {
        let value: u32 = parse_var("YT_SENTIMENT_TEST_UNSET_VAR", 42).unwrap();
        assert_eq!(value, 42);
    }
}
