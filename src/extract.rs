//! Extracción del texto plano de un PDF, página a página.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::task;
use tracing::info;

use crate::error::{PipelineError, PipelineResult};

/// Texto de un documento subido. Sólo vive durante la ingesta.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedDocument {
    /// Texto de cada página, en orden de lectura.
    pub pages: Vec<String>,
    /// Páginas unidas con `\n` y recortadas.
    pub text: String,
}

impl ExtractedDocument {
    /// `pdf-extract` antepone saltos de línea de maquetación a cada página;
    /// se quitan antes de unirlas.
    pub fn from_pages(pages: Vec<String>) -> Self {
        let pages: Vec<String> = pages
            .into_iter()
            .map(|page| page.trim_matches(|c: char| c == '\n' || c == '\r').to_string())
            .collect();
        let text = join_pages(&pages);
        Self { pages, text }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Une las páginas con un salto de línea y recorta el resultado.
pub fn join_pages(pages: &[String]) -> String {
    pages.join("\n").trim().to_string()
}

/// Extrae el texto de un PDF en disco.
pub async fn extract_text_from_path(path: &Path) -> PipelineResult<ExtractedDocument> {
    let path: PathBuf = path.to_path_buf();
    let shown = path.display().to_string();

    let pages = run_blocking(move || {
        pdf_extract::extract_text_by_pages(&path).map_err(|e| e.to_string())
    })
    .await?;
    info!("Extraído '{}'", shown);
    Ok(log_pages(pages))
}

/// Extrae el texto de un PDF recibido en memoria (subida desde el frontend).
pub async fn extract_text_from_bytes(bytes: Vec<u8>) -> PipelineResult<ExtractedDocument> {
    let pages = run_blocking(move || {
        pdf_extract::extract_text_from_mem_by_pages(&bytes).map_err(|e| e.to_string())
    })
    .await?;
    Ok(log_pages(pages))
}

/// `pdf-extract` es síncrono y puede entrar en pánico con PDFs corruptos, así
/// que se ejecuta fuera del runtime y el pánico se convierte en error.
async fn run_blocking<F>(f: F) -> PipelineResult<Vec<String>>
where
    F: FnOnce() -> Result<Vec<String>, String> + Send + 'static,
{
    match task::spawn_blocking(f).await {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(PipelineError::Extraction(e)),
        Err(join_err) => Err(PipelineError::Extraction(format!(
            "el lector de PDF falló de forma inesperada: {join_err}"
        ))),
    }
}

fn log_pages(pages: Vec<String>) -> ExtractedDocument {
    for (i, page) in pages.iter().enumerate() {
        info!("✅ Página {} extraída ({} caracteres)", i + 1, page.chars().count());
    }
    ExtractedDocument::from_pages(pages)
}
