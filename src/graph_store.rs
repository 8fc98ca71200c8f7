//! Almacenamiento de las tripletas como grafo de `:Concept` en Neo4j.
//!
//! Cada tripleta se escribe como dos nodos `:Concept {name}` y una arista
//! `[:RELATION {type}]` dirigida de sujeto a objeto. Todo es MERGE, así que
//! repetir una tripleta no cambia el grafo.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use neo4rs::{query, Graph};
use tracing::{debug, info, warn};

use crate::{
    error::{PipelineError, PipelineResult},
    models::{RejectedTriple, Triple, WriteMode, WriteReport},
};

const CLEAR_GRAPH: &str = "MATCH (n) DETACH DELETE n";

const MERGE_TRIPLE: &str = "MERGE (a:Concept {name: $subject})
     MERGE (b:Concept {name: $object})
     MERGE (a)-[:RELATION {type: $relation}]->(b)";

// El tipo de la relación se guarda como propiedad; `type(r)` sólo cubre
// aristas escritas con otro esquema.
const READ_ALL: &str = "MATCH (a)-[r]->(b)
     RETURN a.name AS source, coalesce(r.type, type(r)) AS relation, b.name AS target";

/// Operaciones de grafo que usan las tuberías de ingesta y consulta.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Escribe tripletas ya validadas. Con `WriteMode::Replace` el borrado
    /// previo y las escrituras se aplican juntos.
    async fn write(&self, triples: &[Triple], mode: WriteMode) -> Result<()>;

    /// Lectura completa del grafo, sin orden ni paginación.
    async fn read_all(&self) -> Result<Vec<Triple>>;

    /// Elimina todos los nodos y relaciones.
    async fn clear(&self) -> Result<()>;

    /// Comprueba que la base de datos responde.
    async fn health_check(&self) -> Result<()>;
}

/// Comprueba que la tripleta puede convertirse en nodos y arista.
pub fn validate_triple(triple: &Triple) -> Result<(), String> {
    let fields = [
        ("sujeto", &triple.subject),
        ("relación", &triple.relation),
        ("objeto", &triple.object),
    ];
    for (name, value) in fields {
        if value.trim().is_empty() {
            return Err(format!("campo vacío: {name}"));
        }
        if value.trim().len() != value.len() {
            return Err(format!("espacios en los extremos: {name}"));
        }
    }
    Ok(())
}

/// Valida y escribe las tripletas, devolviendo cuáles se escribieron y cuáles
/// se rechazaron.
///
/// Si no queda ninguna tripleta válida el grafo no se toca, aunque el modo sea
/// `Replace`. Un fallo de la base de datos se propaga como error.
pub async fn store_triples(
    store: &dyn GraphStore,
    triples: Vec<Triple>,
    mode: WriteMode,
) -> PipelineResult<WriteReport> {
    let mut report = WriteReport::untouched(mode);
    let mut accepted = Vec::with_capacity(triples.len());

    for triple in triples {
        match validate_triple(&triple) {
            Ok(()) => accepted.push(triple),
            Err(reason) => {
                warn!("Tripleta rechazada ({reason}): {triple}");
                report.rejected.push(RejectedTriple { triple, reason });
            }
        }
    }

    if accepted.is_empty() {
        info!("Sin tripletas válidas: el grafo se deja como estaba.");
        return Ok(report);
    }

    store
        .write(&accepted, mode)
        .await
        .map_err(PipelineError::Graph)?;

    report.written = accepted.len();
    report.cleared = mode == WriteMode::Replace;
    info!(
        "✅ Grafo actualizado en Neo4j ({}): {} tripletas escritas, {} rechazadas.",
        mode,
        report.written,
        report.rejected.len()
    );
    Ok(report)
}

/// Implementación de `GraphStore` sobre una conexión `neo4rs` compartida.
#[derive(Clone)]
pub struct Neo4jGraphStore {
    graph: Arc<Graph>,
}

impl Neo4jGraphStore {
    pub fn new(graph: Arc<Graph>) -> Self {
        Self { graph }
    }
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    async fn write(&self, triples: &[Triple], mode: WriteMode) -> Result<()> {
        let tx = self.graph.start_txn().await?;

        if mode == WriteMode::Replace {
            tx.run(query(CLEAR_GRAPH)).await?;
            debug!("Grafo vaciado antes de escribir.");
        }

        for triple in triples {
            tx.run(
                query(MERGE_TRIPLE)
                    .param("subject", triple.subject.clone())
                    .param("relation", triple.relation.clone())
                    .param("object", triple.object.clone()),
            )
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<Triple>> {
        let mut cursor = self.graph.execute(query(READ_ALL)).await?;

        let mut triples = Vec::new();
        while let Some(row) = cursor.next().await? {
            let source: String = row
                .get("source")
                .ok_or_else(|| anyhow!("Falta campo 'source' en resultado de Neo4j"))?;
            let relation: String = row
                .get("relation")
                .ok_or_else(|| anyhow!("Falta campo 'relation' en resultado de Neo4j"))?;
            let target: String = row
                .get("target")
                .ok_or_else(|| anyhow!("Falta campo 'target' en resultado de Neo4j"))?;
            triples.push(Triple {
                subject: source,
                relation,
                object: target,
            });
        }

        Ok(triples)
    }

    async fn clear(&self) -> Result<()> {
        self.graph.run(query(CLEAR_GRAPH)).await?;
        info!("Grafo de Neo4j vaciado.");
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        let mut cursor = self.graph.execute(query("RETURN 1 AS ok")).await?;
        match cursor.next().await? {
            Some(row) if row.get::<i64>("ok") == Some(1) => Ok(()),
            _ => Err(anyhow!("Neo4j no devolvió el resultado esperado")),
        }
    }
}
