//! Carga y gestión de configuración de la aplicación (Neo4j + LLM).

use std::env;
use anyhow::{anyhow, Result};
use tracing::warn;

/// Límite por defecto de caracteres enviados al LLM para extraer tripletas.
pub const DEFAULT_EXTRACTION_CHAR_LIMIT: usize = 4000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LlmProvider {
    Gemini,
    OpenAI,
}

impl LlmProvider {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAI),
            other => Err(anyhow!("Proveedor LLM no soportado: {other}")),
        }
    }

    /// Variable de entorno con la API key del proveedor.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::OpenAI => "OPENAI_API_KEY",
        }
    }

    pub fn default_chat_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.5-flash",
            Self::OpenAI => "gpt-4o-mini",
        }
    }
}

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,
    pub server_addr: String,
    pub open_browser: bool,

    pub llm_provider: LlmProvider,
    pub llm_api_key: String,
    pub llm_chat_model: String,
    pub extraction_char_limit: usize,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Construye la configuración a partir de una función de búsqueda de
    /// variables, de forma que pueda probarse sin tocar el entorno real.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("Falta {key} en el entorno"))
        };

        let neo4j_uri = required("NEO4J_URI")?;
        let neo4j_user = required("NEO4J_USER")?;

        // NEO4J_PASSWORD es el nombre autoritativo; NEO4J_PASS se acepta como alias heredado.
        let neo4j_password = match lookup("NEO4J_PASSWORD") {
            Some(password) => password,
            None => match lookup("NEO4J_PASS") {
                Some(password) => {
                    warn!("Usando NEO4J_PASS como contraseña de Neo4j; renómbrala a NEO4J_PASSWORD.");
                    password
                }
                None => return Err(anyhow!("Falta NEO4J_PASSWORD en el entorno")),
            },
        };

        let server_addr = lookup("SERVER_ADDR").unwrap_or_else(|| "127.0.0.1:3322".to_string());
        let open_browser = match lookup("OPEN_BROWSER") {
            Some(v) => parse_bool(&v)
                .ok_or_else(|| anyhow!("OPEN_BROWSER debe ser true/false, recibido: {v}"))?,
            None => true,
        };

        let llm_provider_str = lookup("LLM_PROVIDER").unwrap_or_else(|| "gemini".to_string());
        let llm_provider = LlmProvider::from_str(&llm_provider_str)?;
        let llm_api_key = required(llm_provider.api_key_var())?;

        let llm_chat_model = lookup("LLM_CHAT_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| llm_provider.default_chat_model().to_string());

        let extraction_char_limit = match lookup("EXTRACTION_CHAR_LIMIT") {
            Some(v) => match v.trim().parse::<usize>() {
                Ok(0) | Err(_) => {
                    return Err(anyhow!(
                        "EXTRACTION_CHAR_LIMIT debe ser un entero positivo, recibido: {v}"
                    ))
                }
                Ok(n) => n,
            },
            None => DEFAULT_EXTRACTION_CHAR_LIMIT,
        };

        Ok(Self {
            neo4j_uri,
            neo4j_user,
            neo4j_password,
            server_addr,
            open_browser,
            llm_provider,
            llm_api_key,
            llm_chat_model,
            extraction_char_limit,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("NEO4J_URI", "bolt://localhost:7687"),
        ("NEO4J_USER", "neo4j"),
        ("NEO4J_PASSWORD", "secreto"),
        ("GEMINI_API_KEY", "clave"),
    ];

    #[test]
    fn defaults_follow_gemini() {
        let cfg = AppConfig::from_lookup(lookup_from(BASE)).unwrap();
        assert_eq!(cfg.llm_provider, LlmProvider::Gemini);
        assert_eq!(cfg.llm_chat_model, "gemini-2.5-flash");
        assert_eq!(cfg.extraction_char_limit, 4000);
        assert_eq!(cfg.server_addr, "127.0.0.1:3322");
        assert!(cfg.open_browser);
    }

    #[test]
    fn legacy_pass_variable_is_accepted_as_fallback() {
        let vars: Vec<_> = BASE
            .iter()
            .filter(|(k, _)| *k != "NEO4J_PASSWORD")
            .copied()
            .chain([("NEO4J_PASS", "antigua")])
            .collect();
        let cfg = AppConfig::from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!(cfg.neo4j_password, "antigua");
    }

    #[test]
    fn password_wins_over_legacy_pass() {
        let vars: Vec<_> = BASE.iter().copied().chain([("NEO4J_PASS", "antigua")]).collect();
        let cfg = AppConfig::from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!(cfg.neo4j_password, "secreto");
    }

    #[test]
    fn missing_uri_is_reported() {
        let vars: Vec<_> = BASE.iter().filter(|(k, _)| *k != "NEO4J_URI").copied().collect();
        let err = AppConfig::from_lookup(lookup_from(&vars)).unwrap_err();
        assert!(err.to_string().contains("NEO4J_URI"));
    }

    #[test]
    fn openai_requires_its_own_key() {
        let vars: Vec<_> = BASE.iter().copied().chain([("LLM_PROVIDER", "openai")]).collect();
        let err = AppConfig::from_lookup(lookup_from(&vars)).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        let vars: Vec<_> = vars.into_iter().chain([("OPENAI_API_KEY", "sk")]).collect();
        let cfg = AppConfig::from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!(cfg.llm_chat_model, "gpt-4o-mini");
        assert_eq!(cfg.llm_api_key, "sk");
    }

    #[test]
    fn extraction_limit_must_be_positive() {
        let vars: Vec<_> = BASE.iter().copied().chain([("EXTRACTION_CHAR_LIMIT", "0")]).collect();
        assert!(AppConfig::from_lookup(lookup_from(&vars)).is_err());

        let vars: Vec<_> = BASE.iter().copied().chain([("EXTRACTION_CHAR_LIMIT", "8000")]).collect();
        let cfg = AppConfig::from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!(cfg.extraction_char_limit, 8000);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let vars: Vec<_> = BASE.iter().copied().chain([("LLM_PROVIDER", "ollama")]).collect();
        assert!(AppConfig::from_lookup(lookup_from(&vars)).is_err());
    }
}
