//! Errores de las tuberías de ingesta y consulta.
//!
//! Los avisos no fatales (PDF sin texto, líneas mal formadas, grafo vacío) no
//! son errores: viajan como resultados en los informes de cada operación.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// El PDF no se pudo abrir o interpretar.
    #[error("No se pudo extraer texto del PDF: {0}")]
    Extraction(String),

    /// Fallo del servicio LLM (red, cuota, respuesta inválida...).
    #[error("Error del servicio LLM: {0}")]
    Llm(#[source] anyhow::Error),

    /// Fallo de la base de datos de grafos.
    #[error("Error de Neo4j: {0}")]
    Graph(#[source] anyhow::Error),

    #[error("Petición no válida: {0}")]
    InvalidInput(String),

    #[error("Ya hay una ingesta en curso, inténtalo más tarde.")]
    Busy,
}

pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Busy => StatusCode::CONFLICT,
            Self::Llm(_) | Self::Graph(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
