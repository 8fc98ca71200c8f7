//! Modelos de dominio (tripletas, modos de escritura y nodos del grafo Neo4j).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Un hecho (sujeto, relación, objeto) extraído del texto.
///
/// En el grafo se convierte en dos nodos `:Concept` identificados por su
/// nombre y una arista dirigida cuyo tipo es `relation`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub relation: String,
    pub object: String,
}

impl Triple {
    /// Crea la tripleta recortando espacios en los tres campos.
    pub fn new(subject: &str, relation: &str, object: &str) -> Self {
        Self {
            subject: subject.trim().to_string(),
            relation: relation.trim().to_string(),
            object: object.trim().to_string(),
        }
    }
}

/// Formato de contexto para el LLM: `origen -[relación]-> destino`.
impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -[{}]-> {}", self.subject, self.relation, self.object)
    }
}

/// Cómo se incorporan las tripletas nuevas al grafo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Borra todo el grafo y escribe sólo las tripletas nuevas.
    #[default]
    Replace,
    /// Añade las tripletas al grafo existente (upsert).
    Merge,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace => write!(f, "replace"),
            Self::Merge => write!(f, "merge"),
        }
    }
}

/// Una tripleta que no llegó a escribirse, con el motivo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedTriple {
    pub triple: Triple,
    pub reason: String,
}

/// Resultado parcial de una escritura en el grafo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    pub mode: WriteMode,
    /// Tripletas enviadas a la base de datos (los duplicados se fusionan allí).
    pub written: usize,
    pub rejected: Vec<RejectedTriple>,
    /// Si el grafo se vació antes de escribir.
    pub cleared: bool,
}

impl WriteReport {
    pub fn untouched(mode: WriteMode) -> Self {
        Self {
            mode,
            written: 0,
            rejected: Vec::new(),
            cleared: false,
        }
    }
}

// Estructuras para la visualización del grafo en el frontend.

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub label: String,
}

#[derive(Debug, Serialize, Default)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphData {
    /// Construye nodos únicos (por nombre) y una arista por tripleta.
    pub fn from_triples(triples: &[Triple]) -> Self {
        let mut names = std::collections::BTreeSet::new();
        let mut edges = Vec::with_capacity(triples.len());

        for t in triples {
            names.insert(t.subject.clone());
            names.insert(t.object.clone());
            edges.push(GraphEdge {
                source: t.subject.clone(),
                target: t.object.clone(),
                label: t.relation.clone(),
            });
        }

        let nodes = names
            .into_iter()
            .map(|name| GraphNode { id: name.clone(), label: name })
            .collect();

        Self { nodes, edges }
    }
}
