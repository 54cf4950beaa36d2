//! Persistencia de análisis y sus comentarios.
//!
//! `AnalysisStore` es la abstracción que recibe el pipeline. Hay dos
//! implementaciones: `Neo4jStore` (duradera) y `MemoryStore` (tests y
//! ejecuciones sin base de datos).
//!
//! Grafo: (:Analysis {id})-[:HAS_COMMENT]->(:Comment), con ids de análisis
//! autoincrementales sacados de un nodo (:Sequence {name: 'analysis'}).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use neo4rs::{query, Graph, Row, Txn};
use tracing::{error, info};

use crate::models::{Analysis, AnalysisDetail, Comment, NewAnalysis, ScoredComment, SentimentLabel};

#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Crea el análisis y añade sus comentarios en una única transacción:
    /// o se guardan todas las filas o ninguna. Devuelve el id asignado.
    async fn save_analysis(&self, analysis: &NewAnalysis, comments: &[ScoredComment]) -> Result<i64>;

    /// Últimos análisis, del más reciente al más antiguo.
    async fn list_recent(&self, limit: usize) -> Result<Vec<Analysis>>;

    async fn get_analysis(&self, id: i64) -> Result<Option<AnalysisDetail>>;

    async fn health_check(&self) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ---------------------------------------------------------------------
// NEO4J
// ---------------------------------------------------------------------

pub struct Neo4jStore {
    graph: Arc<Graph>,
}

impl Neo4jStore {
    pub fn new(graph: Arc<Graph>) -> Self {
        Self { graph }
    }

    /// Siguiente id de análisis. Fuera de la transacción: un fallo posterior
    /// deja un hueco en la secuencia, igual que un AUTOINCREMENT.
    async fn next_analysis_id(&self) -> Result<i64> {
        let mut cursor = self
            .graph
            .execute(
                query(
                    "MERGE (s:Sequence {name: $name})
                     ON CREATE SET s.value = 0
                     SET s.value = s.value + 1
                     RETURN s.value AS id",
                )
                .param("name", "analysis"),
            )
            .await?;

        let row = cursor
            .next()
            .await?
            .ok_or_else(|| anyhow!("La secuencia de análisis no devolvió valor"))?;
        row.get::<i64>("id")
            .ok_or_else(|| anyhow!("Falta campo 'id' en la secuencia de análisis"))
    }
}

async fn create_analysis(tx: &Txn, id: i64, analysis: &NewAnalysis, created_at: &str) -> Result<()> {
    tx.run(
        query(
            "CREATE (a:Analysis {id: $id, video_id: $video_id, video_title: $video_title,
                     video_url: $video_url, total_comments: $total, positive_count: $positive,
                     negative_count: $negative, neutral_count: $neutral, created_at: $created_at})",
        )
        .param("id", id)
        .param("video_id", analysis.video_id.clone())
        .param("video_title", analysis.video_title.clone())
        .param("video_url", analysis.video_url.clone())
        .param("total", analysis.total_comments as i64)
        .param("positive", analysis.positive_count as i64)
        .param("negative", analysis.negative_count as i64)
        .param("neutral", analysis.neutral_count as i64)
        .param("created_at", created_at.to_string()),
    )
    .await?;
    Ok(())
}

async fn add_comments(tx: &Txn, analysis_id: i64, comments: &[ScoredComment]) -> Result<()> {
    for (position, scored) in comments.iter().enumerate() {
        let comment = &scored.comment;
        tx.run(
            query(
                "MATCH (a:Analysis {id: $analysis_id})
                 CREATE (a)-[:HAS_COMMENT]->(c:Comment {
                     analysis_id: $analysis_id, position: $position,
                     youtube_comment_id: $youtube_comment_id, text: $text, author: $author,
                     sentiment: $sentiment, sentiment_label: $sentiment_label,
                     like_count: $like_count, published_at: $published_at})",
            )
            .param("analysis_id", analysis_id)
            .param("position", position as i64)
            .param("youtube_comment_id", comment.id.clone())
            .param("text", comment.text.clone())
            .param("author", comment.author.clone())
            .param("sentiment", scored.sentiment)
            .param("sentiment_label", scored.sentiment_label.as_str())
            .param("like_count", comment.like_count as i64)
            .param("published_at", comment.published_at.clone()),
        )
        .await?;
    }
    Ok(())
}

const ANALYSIS_FIELDS: &str = "a.id AS id, a.video_id AS video_id, a.video_title AS video_title,
     a.video_url AS video_url, a.total_comments AS total_comments,
     a.positive_count AS positive_count, a.negative_count AS negative_count,
     a.neutral_count AS neutral_count, a.created_at AS created_at";

fn missing(name: &str) -> anyhow::Error {
    anyhow!("Falta campo '{name}' en resultado de Neo4j")
}

fn string_field(row: &Row, name: &str) -> Result<String> {
    row.get::<String>(name).ok_or_else(|| missing(name))
}

fn int_field(row: &Row, name: &str) -> Result<i64> {
    row.get::<i64>(name).ok_or_else(|| missing(name))
}

fn float_field(row: &Row, name: &str) -> Result<f64> {
    row.get::<f64>(name).ok_or_else(|| missing(name))
}

/// Los contadores se guardan como enteros con signo en Neo4j.
fn to_count(value: i64) -> u64 {
    value.max(0) as u64
}

fn count_field(row: &Row, name: &str) -> Result<u64> {
    int_field(row, name).map(to_count)
}

fn analysis_from_row(row: &Row) -> Result<Analysis> {
    Ok(Analysis {
        id: int_field(row, "id")?,
        video_id: string_field(row, "video_id")?,
        video_title: string_field(row, "video_title")?,
        video_url: string_field(row, "video_url")?,
        total_comments: count_field(row, "total_comments")?,
        positive_count: count_field(row, "positive_count")?,
        negative_count: count_field(row, "negative_count")?,
        neutral_count: count_field(row, "neutral_count")?,
        created_at: string_field(row, "created_at")?,
    })
}

fn scored_comment_from_row(row: &Row) -> Result<ScoredComment> {
    let label = string_field(row, "sentiment_label")?;
    let sentiment_label = SentimentLabel::parse(&label)
        .ok_or_else(|| anyhow!("Etiqueta de sentimiento desconocida: {label}"))?;

    Ok(ScoredComment {
        comment: Comment {
            id: string_field(row, "youtube_comment_id")?,
            text: string_field(row, "text")?,
            author: string_field(row, "author")?,
            published_at: string_field(row, "published_at")?,
            like_count: count_field(row, "like_count")?,
        },
        sentiment: float_field(row, "sentiment")?,
        sentiment_label,
    })
}

#[async_trait]
impl AnalysisStore for Neo4jStore {
    async fn save_analysis(&self, analysis: &NewAnalysis, comments: &[ScoredComment]) -> Result<i64> {
        let id = self.next_analysis_id().await?;
        let created_at = now_timestamp();

        let tx = self.graph.start_txn().await?;
        let written = async {
            create_analysis(&tx, id, analysis, &created_at).await?;
            add_comments(&tx, id, comments).await
        }
        .await;

        match written {
            Ok(()) => tx.commit().await?,
            Err(err) => {
                error!("Error guardando el análisis {id}; deshaciendo la transacción: {err}");
                if let Err(rollback_err) = tx.rollback().await {
                    error!("Error en el rollback del análisis {id}: {rollback_err}");
                }
                return Err(err);
            }
        }

        info!("Análisis {id} guardado con {} comentarios.", comments.len());
        Ok(id)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Analysis>> {
        let cypher = format!(
            "MATCH (a:Analysis) RETURN {ANALYSIS_FIELDS}
             ORDER BY a.created_at DESC, a.id DESC LIMIT $limit"
        );
        let mut cursor = self
            .graph
            .execute(query(&cypher).param("limit", limit as i64))
            .await?;

        let mut analyses = Vec::new();
        while let Some(row) = cursor.next().await? {
            analyses.push(analysis_from_row(&row)?);
        }
        Ok(analyses)
    }

    async fn get_analysis(&self, id: i64) -> Result<Option<AnalysisDetail>> {
        let cypher = format!("MATCH (a:Analysis {{id: $id}}) RETURN {ANALYSIS_FIELDS}");
        let mut cursor = self.graph.execute(query(&cypher).param("id", id)).await?;
        let analysis = match cursor.next().await? {
            Some(row) => analysis_from_row(&row)?,
            None => return Ok(None),
        };

        let mut cursor = self
            .graph
            .execute(
                query(
                    "MATCH (a:Analysis {id: $id})-[:HAS_COMMENT]->(c:Comment)
                     RETURN c.youtube_comment_id AS youtube_comment_id, c.text AS text,
                            c.author AS author, c.published_at AS published_at,
                            c.like_count AS like_count, c.sentiment AS sentiment,
                            c.sentiment_label AS sentiment_label
                     ORDER BY c.position",
                )
                .param("id", id),
            )
            .await?;

        let mut comments = Vec::new();
        while let Some(row) = cursor.next().await? {
            comments.push(scored_comment_from_row(&row)?);
        }

        Ok(Some(AnalysisDetail { analysis, comments }))
    }

    async fn health_check(&self) -> Result<()> {
        self.graph.run(query("RETURN 1")).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "neo4j"
    }
}

// ---------------------------------------------------------------------
// MEMORIA
// ---------------------------------------------------------------------

#[derive(Default)]
struct MemoryInner {
    last_id: i64,
    analyses: Vec<Analysis>,
    comments: HashMap<i64, Vec<ScoredComment>>,
}

/// Almacén en memoria. Los datos se pierden al reiniciar.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryInner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("El almacén en memoria quedó envenenado"))
    }
}

#[cfg(test)]
impl MemoryStore {
    /// Número de comentarios guardados para un análisis.
    pub fn comment_count(&self, analysis_id: i64) -> usize {
        self.lock()
            .map(|inner| inner.comments.get(&analysis_id).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    pub fn analysis_count(&self) -> usize {
        self.lock().map(|inner| inner.analyses.len()).unwrap_or(0)
    }
}

#[async_trait]
impl AnalysisStore for MemoryStore {
    async fn save_analysis(&self, analysis: &NewAnalysis, comments: &[ScoredComment]) -> Result<i64> {
        let mut inner = self.lock()?;
        inner.last_id += 1;
        let id = inner.last_id;
        inner
            .analyses
            .push(Analysis::from_new(id, analysis, now_timestamp()));
        inner.comments.insert(id, comments.to_vec());
        Ok(id)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Analysis>> {
        let inner = self.lock()?;
        let mut analyses = inner.analyses.clone();
        analyses.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        analyses.truncate(limit);
        Ok(analyses)
    }

    async fn get_analysis(&self, id: i64) -> Result<Option<AnalysisDetail>> {
        let inner = self.lock()?;
        let detail = inner.analyses.iter().find(|a| a.id == id).map(|analysis| AnalysisDetail {
            analysis: analysis.clone(),
            comments: inner.comments.get(&id).cloned().unwrap_or_default(),
        });
        Ok(detail)
    }

    async fn health_check(&self) -> Result<()> {
        self.lock().map(|_| ())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
