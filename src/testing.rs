//! Dobles de prueba para el LLM y la base de datos de grafos.

use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::{
    graph_store::GraphStore,
    llm::TextGenerator,
    models::{Triple, WriteMode},
};

/// LLM que devuelve respuestas prefijadas en orden y registra los prompts.
/// Cuando se agotan las respuestas devuelve texto vacío.
#[derive(Default)]
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    failure: Option<String>,
}

impl ScriptedLlm {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(message) = &self.failure {
            return Err(anyhow!(message.clone()));
        }
        Ok(self.responses.lock().unwrap().pop_front().unwrap_or_default())
    }
}

/// Grafo en memoria con la misma semántica de MERGE que el esquema de Neo4j:
/// nodos por nombre y aristas por (origen, tipo, destino).
#[derive(Default)]
pub struct MemoryGraphStore {
    nodes: Mutex<BTreeSet<String>>,
    edges: Mutex<BTreeSet<Triple>>,
    writes: AtomicUsize,
    unavailable: bool,
}

impl MemoryGraphStore {
    /// Simula una base de datos caída: todas las operaciones fallan.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    pub fn with_triples(triples: &[Triple]) -> Self {
        let store = Self::default();
        for t in triples {
            store.merge(t);
        }
        store
    }

    pub fn node_count(&self) -> usize {
        self.nodes.lock().unwrap().len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.lock().unwrap().len()
    }

    pub fn write_calls(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn merge(&self, triple: &Triple) {
        let mut nodes = self.nodes.lock().unwrap();
        nodes.insert(triple.subject.clone());
        nodes.insert(triple.object.clone());
        self.edges.lock().unwrap().insert(triple.clone());
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable {
            return Err(anyhow!("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn write(&self, triples: &[Triple], mode: WriteMode) -> Result<()> {
        self.check_available()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        if mode == WriteMode::Replace {
            self.clear().await?;
        }
        for t in triples {
            self.merge(t);
        }
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<Triple>> {
        self.check_available()?;
        Ok(self.edges.lock().unwrap().iter().cloned().collect())
    }

    async fn clear(&self) -> Result<()> {
        self.check_available()?;
        self.nodes.lock().unwrap().clear();
        self.edges.lock().unwrap().clear();
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        self.check_available()
    }
}

/// PDF mínimo con una línea de texto en Helvetica por página. Los offsets de
/// la tabla xref se calculan al escribir cada objeto.
pub fn text_pdf(pages: &[&str]) -> Vec<u8> {
    let kids: Vec<String> = (0..pages.len()).map(|i| format!("{} 0 R", 4 + 2 * i)).collect();
    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), pages.len()),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    ];
    for (i, text) in pages.iter().enumerate() {
        let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            5 + 2 * i
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{content}\nendstream",
            content.len()
        ));
    }

    let mut pdf = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, object) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.push_str(&format!("{} 0 obj\n{object}\nendobj\n", i + 1));
    }

    let xref = pdf.len();
    pdf.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
    for offset in offsets {
        pdf.push_str(&format!("{offset:010} 00000 n \n"));
    }
    pdf.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
        objects.len() + 1
    ));
    pdf.into_bytes()
}
