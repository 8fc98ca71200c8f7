use std::path::PathBuf;
use axum::{
    extract::{DefaultBodyLimit, Json, Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::{
    app_state::{lock_status, AppState, BusyGuard, Status},
    error::{PipelineError, PipelineResult},
    ingest::{self, DocumentInput, IngestionReport},
    models::{GraphData, WriteMode},
    neo4j_client,
    query::{self, Answer},
};

/// Tamaño máximo de un PDF subido.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

// --- Payloads de la API ---

#[derive(Deserialize)]
pub struct ModeParams {
    #[serde(default)]
    mode: WriteMode,
}

#[derive(Deserialize)]
pub struct IngestFilePayload {
    path: String,
    #[serde(default)]
    mode: WriteMode,
}

#[derive(Deserialize)]
pub struct AskPayload {
    question: String,
}

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/upload", post(upload_handler))
        .route("/api/ingest-file", post(ingest_file_handler))
        .route("/api/ask", post(ask_handler))
        .route("/api/graph-data", get(graph_data_handler))
        .route("/api/graph", delete(clear_graph_handler))
        .route("/api/status", get(status_handler))
        .route("/api/health", get(health_handler))
        .route("/api/shutdown", post(shutdown_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(app_state)
}

// --- Handlers ---

/// Sube un PDF (campo multipart `file`) y reconstruye el grafo con él.
#[axum::debug_handler]
async fn upload_handler(
    State(state): State<AppState>,
    Query(params): Query<ModeParams>,
    mut multipart: Multipart,
) -> PipelineResult<Json<IngestionReport>> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PipelineError::InvalidInput(format!("Formulario no válido: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().replace(' ', "_");
        if !is_pdf_filename(&filename) {
            return Err(PipelineError::InvalidInput(format!(
                "Sólo se aceptan ficheros PDF, recibido: '{filename}'"
            )));
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| PipelineError::InvalidInput(format!("No se pudo leer el fichero: {e}")))?;
        upload = Some(DocumentInput::Upload {
            filename,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let input = upload.ok_or_else(|| {
        PipelineError::InvalidInput("Falta el campo 'file' con el PDF.".to_string())
    })?;
    run_ingestion(&state, input, params.mode).await.map(Json)
}

/// Ingiere un PDF que ya está en el disco del servidor.
#[axum::debug_handler]
async fn ingest_file_handler(
    State(state): State<AppState>,
    Json(payload): Json<IngestFilePayload>,
) -> PipelineResult<Json<IngestionReport>> {
    let path = PathBuf::from(&payload.path);
    if !path.is_file() {
        return Err(PipelineError::InvalidInput(
            "La ruta proporcionada no es un fichero válido.".to_string(),
        ));
    }
    run_ingestion(&state, DocumentInput::Path(path), payload.mode).await.map(Json)
}

async fn run_ingestion(
    state: &AppState,
    input: DocumentInput,
    mode: WriteMode,
) -> PipelineResult<IngestionReport> {
    let guard = BusyGuard::acquire(&state.status, format!("Iniciando ingesta de '{}'...", input.name()))?;

    let result = ingest::ingest_document(
        state.graph.as_ref(),
        state.llm.as_ref(),
        input,
        mode,
        state.config.extraction_char_limit,
        state.status.clone(),
    )
    .await;

    match &result {
        Ok(report) => guard.finish(format!("¡Ingesta completada! {report}")),
        Err(err) => {
            error!("Error de ingesta: {err}");
            guard.finish(format!("Error en la ingesta: {err}"));
        }
    }
    result
}

#[axum::debug_handler]
async fn ask_handler(
    State(state): State<AppState>,
    Json(payload): Json<AskPayload>,
) -> PipelineResult<Json<Answer>> {
    let answer = query::answer_question(state.graph.as_ref(), state.llm.as_ref(), &payload.question).await;
    if let Err(err) = &answer {
        error!("Error al procesar la pregunta: {err}");
    }
    answer.map(Json)
}

#[axum::debug_handler]
async fn graph_data_handler(State(state): State<AppState>) -> PipelineResult<Json<GraphData>> {
    let triples = state.graph.read_all().await.map_err(|e| {
        error!("Error consultando datos del grafo: {e}");
        PipelineError::Graph(e)
    })?;
    Ok(Json(GraphData::from_triples(&triples)))
}

/// Vaciado explícito del grafo, independiente de la ingesta.
#[axum::debug_handler]
async fn clear_graph_handler(State(state): State<AppState>) -> PipelineResult<StatusCode> {
    let guard = BusyGuard::acquire(&state.status, "Vaciando el grafo...".to_string())?;
    state.graph.clear().await.map_err(PipelineError::Graph)?;
    guard.finish("Grafo vaciado.".to_string());
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
async fn status_handler(State(state): State<AppState>) -> Json<Status> {
    Json(lock_status(&state.status).clone())
}

#[axum::debug_handler]
async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let browser_url = neo4j_client::browser_url(&state.config.neo4j_uri);

    match state.graph.health_check().await {
        Ok(()) => Ok(Json(json!({ "status": "ok", "browser_url": browser_url }))),
        Err(e) => {
            error!("Error en el health check de Neo4j: {}", e);
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": format!("Neo4j no está disponible: {e}") })),
            ))
        }
    }
}

#[axum::debug_handler]
async fn shutdown_handler(State(state): State<AppState>) -> impl IntoResponse {
    info!("Petición de apagado recibida.");
    if let Some(sender) = state.shutdown_sender.lock().ok().and_then(|mut s| s.take()) {
        let _ = sender.send(());
    }
    StatusCode::OK
}

fn is_pdf_filename(filename: &str) -> bool {
    mime_guess::from_path(filename).first_raw() == Some("application/pdf")
}
