use crate::config::Neo4jConfig;
use anyhow::Result;
use neo4rs::{query, Graph};
use tracing::info;
use url::Url;

pub async fn connect_from_config(cfg: &Neo4jConfig) -> Result<Graph> {
    let url = Url::parse(&cfg.uri)?;
    let host = url.host_str().unwrap_or("localhost");
    let port = url.port().unwrap_or(7687);
    let addr = format!("{host}:{port}");

    info!("Conectando a Neo4j en {addr}...");
    let graph = Graph::new(&addr, &cfg.user, &cfg.password).await?;
    info!("Conexión a Neo4j OK");
    Ok(graph)
}

/// Crea constraints e índices para las etiquetas usadas en el grafo:
/// :Analysis, :Comment y el contador :Sequence
pub async fn ensure_schema(graph: &Graph) -> Result<()> {
    let statements = [
        // Analysis.id único (lo asigna el contador de secuencia)
        "CREATE CONSTRAINT analysis_id IF NOT EXISTS
         FOR (a:Analysis)
         REQUIRE a.id IS UNIQUE",
        // Sequence.name único
        "CREATE CONSTRAINT sequence_name IF NOT EXISTS
         FOR (s:Sequence)
         REQUIRE s.name IS UNIQUE",
        // Los comentarios se consultan siempre por análisis
        "CREATE INDEX comment_analysis_id IF NOT EXISTS
         FOR (c:Comment)
         ON (c.analysis_id)",
        "CREATE INDEX analysis_created_at IF NOT EXISTS
         FOR (a:Analysis)
         ON (a.created_at)",
    ];

    for stmt in statements {
        graph.run(query(stmt)).await?;
    }

    info!("Esquema de Neo4j asegurado (constraints e índices creados).");
    Ok(())
}
