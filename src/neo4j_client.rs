use crate::config::AppConfig;
use anyhow::Result;
use neo4rs::{query, Graph};
use tracing::info;
use url::Url;

pub async fn connect_from_config(cfg: &AppConfig) -> Result<Graph> {
    let addr = bolt_address(&cfg.neo4j_uri)?;

    info!("Conectando a Neo4j en {addr}...");
    let graph = Graph::new(&addr, &cfg.neo4j_user, &cfg.neo4j_password).await?;
    info!("Conexión a Neo4j OK");
    Ok(graph)
}

/// `host:puerto` para neo4rs a partir de una URI `bolt://` o `neo4j://`.
pub fn bolt_address(uri: &str) -> Result<String> {
    let url = Url::parse(uri)?;
    let host = url.host_str().unwrap_or("localhost");
    let port = url.port().unwrap_or(7687);
    Ok(format!("{host}:{port}"))
}

/// URL del Neo4j Browser (puerto HTTP 7474) para mostrarla en el frontend.
pub fn browser_url(uri: &str) -> String {
    // `bolt` no es un esquema "especial" para `url`, así que no se puede
    // cambiar a `http` con set_scheme; se reconstruye a partir del host.
    let host = Url::parse(uri)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| "localhost".to_string());
    format!("http://{host}:7474")
}

/// El nombre identifica a cada :Concept, así que se garantiza su unicidad.
pub async fn ensure_schema(graph: &Graph) -> Result<()> {
    graph
        .run(query(
            "CREATE CONSTRAINT concept_name IF NOT EXISTS
             FOR (c:Concept)
             REQUIRE c.name IS UNIQUE",
        ))
        .await?;

    info!("Esquema de Neo4j asegurado (constraint sobre :Concept(name)).");
    Ok(())
}
