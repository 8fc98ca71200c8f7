//! Ingesta de un PDF: extracción de texto → tripletas con el LLM → grafo en Neo4j.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    app_state::{lock_status, Status},
    error::PipelineResult,
    extract::{self, ExtractedDocument},
    graph_store::{self, GraphStore},
    llm::TextGenerator,
    models::{WriteMode, WriteReport},
    triples::{self, SkippedLine},
};

/// Origen del PDF a ingerir.
#[derive(Debug, Clone)]
pub enum DocumentInput {
    /// Bytes subidos desde el frontend, con el nombre original del fichero.
    Upload { filename: String, bytes: Vec<u8> },
    /// Fichero ya presente en disco.
    Path(PathBuf),
}

impl DocumentInput {
    pub fn name(&self) -> String {
        match self {
            Self::Upload { filename, .. } => filename.clone(),
            Self::Path(path) => path.display().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionOutcome {
    /// Se escribieron tripletas en el grafo.
    GraphBuilt,
    /// El PDF no tenía texto extraíble; no se llamó al LLM.
    EmptyText,
    /// El LLM no devolvió ninguna tripleta válida; el grafo no se tocó.
    NoTriples,
}

/// Resumen de una ingesta, devuelto al llamante.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub id: Uuid,
    pub source: String,
    pub started_at: DateTime<Utc>,
    pub outcome: IngestionOutcome,
    pub pages: usize,
    pub characters: usize,
    /// Caracteres realmente enviados al LLM tras el recorte.
    pub characters_sent: usize,
    pub triples_parsed: usize,
    pub skipped_lines: Vec<SkippedLine>,
    pub ignored_lines: usize,
    pub write: Option<WriteReport>,
}

impl IngestionReport {
    fn new(source: String, doc: &ExtractedDocument, char_limit: usize) -> Self {
        let characters = doc.text.chars().count();
        Self {
            id: Uuid::new_v4(),
            source,
            started_at: Utc::now(),
            outcome: IngestionOutcome::EmptyText,
            pages: doc.page_count(),
            characters,
            characters_sent: characters.min(char_limit),
            triples_parsed: 0,
            skipped_lines: Vec::new(),
            ignored_lines: 0,
            write: None,
        }
    }
}

impl std::fmt::Display for IngestionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.outcome {
            IngestionOutcome::EmptyText => write!(
                f,
                "'{}': {} páginas sin texto extraíble, grafo sin cambios.",
                self.source, self.pages
            ),
            IngestionOutcome::NoTriples => write!(
                f,
                "'{}': el modelo no devolvió tripletas válidas ({} líneas descartadas), grafo sin cambios.",
                self.source,
                self.skipped_lines.len()
            ),
            IngestionOutcome::GraphBuilt => {
                let (written, rejected) = self
                    .write
                    .as_ref()
                    .map(|w| (w.written, w.rejected.len()))
                    .unwrap_or_default();
                write!(
                    f,
                    "'{}': {} páginas, {} de {} caracteres analizados, {} tripletas escritas, {} rechazadas y {} líneas descartadas.",
                    self.source,
                    self.pages,
                    self.characters_sent,
                    self.characters,
                    written,
                    rejected,
                    self.skipped_lines.len()
                )
            }
        }
    }
}

fn set_status(status_arc: &Arc<Mutex<Status>>, message: String, progress: f32) {
    let mut status = lock_status(status_arc);
    status.message = message;
    status.progress = progress;
}

/// Ejecuta la tubería completa para un PDF.
///
/// Un PDF ilegible o un fallo del LLM o de Neo4j se devuelven como error;
/// un PDF sin texto o sin tripletas se informa en el resultado.
pub async fn ingest_document(
    store: &dyn GraphStore,
    llm: &dyn TextGenerator,
    input: DocumentInput,
    mode: WriteMode,
    char_limit: usize,
    status_arc: Arc<Mutex<Status>>,
) -> PipelineResult<IngestionReport> {
    let source = input.name();

    set_status(&status_arc, format!("Extrayendo texto de '{source}'..."), 0.1);
    let doc = match input {
        DocumentInput::Upload { bytes, .. } => extract::extract_text_from_bytes(bytes).await?,
        DocumentInput::Path(path) => extract::extract_text_from_path(&path).await?,
    };

    build_graph_from_document(store, llm, source, &doc, mode, char_limit, status_arc).await
}

/// Parte de la tubería posterior a la extracción: tripletas y escritura.
pub async fn build_graph_from_document(
    store: &dyn GraphStore,
    llm: &dyn TextGenerator,
    source: String,
    doc: &ExtractedDocument,
    mode: WriteMode,
    char_limit: usize,
    status_arc: Arc<Mutex<Status>>,
) -> PipelineResult<IngestionReport> {
    let mut report = IngestionReport::new(source.clone(), doc, char_limit);
    if doc.is_empty() {
        warn!("⚠️ No se extrajo texto del PDF '{source}'.");
        return Ok(report);
    }

    set_status(&status_arc, format!("Extrayendo tripletas de '{source}' con el LLM..."), 0.4);
    let parsed = triples::extract_triples(llm, &doc.text, char_limit).await?;
    report.triples_parsed = parsed.triples.len();
    report.skipped_lines = parsed.skipped;
    report.ignored_lines = parsed.ignored;

    set_status(&status_arc, "Construyendo el grafo de conocimiento...".to_string(), 0.7);
    let write = graph_store::store_triples(store, parsed.triples, mode).await?;
    report.outcome = if write.written > 0 {
        IngestionOutcome::GraphBuilt
    } else {
        IngestionOutcome::NoTriples
    };
    report.write = Some(write);

    info!("Ingesta {} completada. {}", report.id, report);
    Ok(report)
}
