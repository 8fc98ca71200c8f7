//! Respuesta a preguntas en lenguaje natural a partir del grafo completo.
//!
//! Flujo:
//!   1. Lectura completa del grafo (todas las aristas).
//!   2. Si está vacío se responde con un mensaje fijo, sin llamar al LLM.
//!   3. Cada arista se convierte en una línea `origen -[relación]-> destino`.
//!   4. El LLM responde usando esas líneas como contexto.
//!
//! No hay estado de conversación: cada pregunta parte de una lectura nueva.

use serde::Serialize;
use tracing::{info, warn};

use crate::{
    error::{PipelineError, PipelineResult},
    graph_store::GraphStore,
    llm::TextGenerator,
    models::Triple,
};

pub const EMPTY_GRAPH_MESSAGE: &str = "⚠️ El grafo está vacío. Sube primero un PDF.";
pub const NO_RESPONSE_MESSAGE: &str = "⚠️ El modelo no devolvió ninguna respuesta.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    Answered,
    EmptyGraph,
    NoResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub text: String,
    pub outcome: AnswerOutcome,
    /// Número de hechos del grafo enviados como contexto.
    pub facts_used: usize,
}

/// Una línea por tripleta, unidas con `\n`.
pub fn render_context(triples: &[Triple]) -> String {
    triples
        .iter()
        .map(Triple::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_answer_prompt(context: &str, question: &str) -> String {
    format!(
        "Eres un asistente de IA. Usa este conocimiento del grafo para responder preguntas.\n\n\
         Hechos del grafo:\n{context}\n\n\
         Pregunta: {question}\n\
         Responde de forma clara y concisa."
    )
}

pub async fn answer_question(
    store: &dyn GraphStore,
    llm: &dyn TextGenerator,
    question: &str,
) -> PipelineResult<Answer> {
    let question = question.trim();
    if question.is_empty() {
        return Err(PipelineError::InvalidInput(
            "Escribe una pregunta primero.".to_string(),
        ));
    }

    let triples = store.read_all().await.map_err(PipelineError::Graph)?;
    if triples.is_empty() {
        info!("Pregunta recibida con el grafo vacío; no se llama al LLM.");
        return Ok(Answer {
            text: EMPTY_GRAPH_MESSAGE.to_string(),
            outcome: AnswerOutcome::EmptyGraph,
            facts_used: 0,
        });
    }

    let context = render_context(&triples);
    let prompt = build_answer_prompt(&context, question);
    info!("Respondiendo con {} hechos del grafo como contexto.", triples.len());

    let response = llm.generate(&prompt).await.map_err(PipelineError::Llm)?;
    if response.trim().is_empty() {
        warn!("El LLM devolvió una respuesta vacía.");
        return Ok(Answer {
            text: NO_RESPONSE_MESSAGE.to_string(),
            outcome: AnswerOutcome::NoResponse,
            facts_used: triples.len(),
        });
    }

    Ok(Answer {
        text: response,
        outcome: AnswerOutcome::Answered,
        facts_used: triples.len(),
    })
}
