//! Operación `analyze`: URL del video → comentarios → clasificación →
//! estadísticas + persistencia.
//!
//! Es todo o nada: si algo falla no se guarda nada y se devuelve un
//! `AnalyzeError` con un mensaje legible. Los fallos del clasificador remoto
//! nunca llegan aquí, los absorbe el léxico.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    classifier::SentimentClassifier,
    models::{NewAnalysis, ScoredComment},
    sentiment::{self, SentimentStats},
    store::AnalysisStore,
    youtube::{self, CommentSource, SourceError},
};

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    NotFound(String),
    #[error("No se encontraron comentarios para este video")]
    EmptyResult,
    #[error("{0}")]
    UpstreamUnavailable(String),
    #[error("No se pudo guardar el análisis: {0}")]
    PersistenceFailure(String),
}

impl From<SourceError> for AnalyzeError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NotFound(_) => AnalyzeError::NotFound(err.to_string()),
            SourceError::Unavailable(_) | SourceError::Unconfigured => {
                AnalyzeError::UpstreamUnavailable(err.to_string())
            }
        }
    }
}

/// Resultado de un análisis completado y guardado.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub analysis_id: i64,
    pub video_title: String,
    pub comments: Vec<ScoredComment>,
    pub stats: SentimentStats,
}

pub struct AnalysisPipeline {
    source: Arc<dyn CommentSource>,
    classifier: Arc<SentimentClassifier>,
    store: Arc<dyn AnalysisStore>,
    max_results: u32,
}

impl AnalysisPipeline {
    pub fn new(
        source: Arc<dyn CommentSource>,
        classifier: Arc<SentimentClassifier>,
        store: Arc<dyn AnalysisStore>,
        max_results: u32,
    ) -> Self {
        Self {
            source,
            classifier,
            store,
            max_results,
        }
    }

    pub fn classifier(&self) -> &SentimentClassifier {
        &self.classifier
    }

    pub async fn analyze(&self, video_url: Option<&str>) -> Result<AnalysisOutcome, AnalyzeError> {
        let video_url = video_url
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| AnalyzeError::InvalidInput("Se requiere la URL del video".to_string()))?;

        let video_id = youtube::extract_video_id(video_url)
            .ok_or_else(|| AnalyzeError::InvalidInput("URL de YouTube inválida".to_string()))?;

        info!("Analizando video {video_id}...");
        let fetched = self.source.fetch(&video_id, self.max_results).await.map_err(|err| {
            warn!("Fallo obteniendo comentarios de {video_id}: {err}");
            AnalyzeError::from(err)
        })?;

        if fetched.comments.is_empty() {
            return Err(AnalyzeError::EmptyResult);
        }

        let scored = self.classifier.classify(fetched.comments).await;
        let stats = sentiment::aggregate(&scored);

        let record = NewAnalysis {
            video_id: video_id.clone(),
            video_title: fetched.title.clone(),
            video_url: video_url.to_string(),
            total_comments: stats.total,
            positive_count: stats.positive,
            negative_count: stats.negative,
            neutral_count: stats.neutral,
        };

        let analysis_id = self
            .store
            .save_analysis(&record, &scored)
            .await
            .map_err(|err| {
                error!("Error guardando el análisis de {video_id}: {err}");
                AnalyzeError::PersistenceFailure(err.to_string())
            })?;

        info!(
            "Análisis {analysis_id} de {video_id}: {} comentarios ({}% positivos, {}% negativos, {}% neutrales)",
            stats.total, stats.positive_percent, stats.negative_percent, stats.neutral_percent
        );

        Ok(AnalysisOutcome {
            analysis_id,
            video_title: fetched.title,
            comments: scored,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        llm::SentimentBackend,
        models::{Analysis, AnalysisDetail, Comment},
        store::MemoryStore,
        youtube::FetchedVideo,
    };
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeSource {
        result: fn() -> Result<FetchedVideo, SourceError>,
        requested: Mutex<Vec<(String, u32)>>,
    }

    impl FakeSource {
        fn new(result: fn() -> Result<FetchedVideo, SourceError>) -> Self {
            Self {
                result,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CommentSource for FakeSource {
        async fn fetch(&self, video_id: &str, max_results: u32) -> Result<FetchedVideo, SourceError> {
            self.requested.lock().unwrap().push((video_id.to_string(), max_results));
            (self.result)()
        }
    }

    fn twenty_five_comments() -> Result<FetchedVideo, SourceError> {
        let comments = (0..25)
            .map(|i| Comment {
                id: format!("yt{i}"),
                text: format!("comment number {i}"),
                author: format!("author{i}"),
                published_at: "2024-02-02T08:00:00Z".to_string(),
                like_count: i,
            })
            .collect();
        Ok(FetchedVideo {
            title: "Rust in 100 seconds".to_string(),
            comments,
        })
    }

    /// Responde a cada lote con 0.8 para el primer comentario y -0.8 para el resto.
    struct CountingBackend {
        calls: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl SentimentBackend for CountingBackend {
        async fn score_batch(&self, joined_texts: &str) -> Result<String> {
            let n = joined_texts.split(crate::classifier::BATCH_SEPARATOR).count();
            self.calls.lock().unwrap().push(n);
            let scores: Vec<f64> = (0..n).map(|i| if i == 0 { 0.8 } else { -0.8 }).collect();
            Ok(serde_json::to_string(&scores)?)
        }
    }

    struct FailingStore;

    #[async_trait]
    impl AnalysisStore for FailingStore {
        async fn save_analysis(&self, _: &NewAnalysis, _: &[ScoredComment]) -> Result<i64> {
            Err(anyhow!("disk full"))
        }
        async fn list_recent(&self, _: usize) -> Result<Vec<Analysis>> {
            Ok(Vec::new())
        }
        async fn get_analysis(&self, _: i64) -> Result<Option<AnalysisDetail>> {
            Ok(None)
        }
        async fn health_check(&self) -> Result<()> {
            Err(anyhow!("down"))
        }
        fn backend_name(&self) -> &'static str {
            "failing"
        }
    }

    fn pipeline_with(
        source: Arc<FakeSource>,
        backend: Option<Arc<dyn SentimentBackend>>,
        store: Arc<dyn AnalysisStore>,
    ) -> AnalysisPipeline {
        AnalysisPipeline::new(source, Arc::new(SentimentClassifier::new(backend)), store, 100)
    }

    #[tokio::test]
    async fn test_end_to_end_twenty_five_comments() {
        let source = Arc::new(FakeSource::new(twenty_five_comments));
        let backend = Arc::new(CountingBackend { calls: Mutex::new(Vec::new()) });
        let store = Arc::new(MemoryStore::new());
        let pipeline = pipeline_with(source.clone(), Some(backend.clone()), store.clone());

        let outcome = pipeline
            .analyze(Some("https://www.youtube.com/watch?v=ABC123"))
            .await
            .unwrap();

        assert_eq!(*backend.calls.lock().unwrap(), vec![10, 10, 5]);
        assert_eq!(source.requested.lock().unwrap()[0], ("ABC123".to_string(), 100));

        assert_eq!(outcome.stats.total, 25);
        assert_eq!(outcome.stats.positive, 3);
        assert_eq!(outcome.stats.negative, 22);
        assert_eq!(outcome.stats.neutral, 0);
        let sum = outcome.stats.positive_percent
            + outcome.stats.negative_percent
            + outcome.stats.neutral_percent;
        assert!((99..=101).contains(&sum));
        assert_eq!(outcome.comments.len(), 25);
        assert_eq!(outcome.video_title, "Rust in 100 seconds");

        assert_eq!(store.analysis_count(), 1);
        assert_eq!(store.comment_count(outcome.analysis_id), 25);
        let detail = store.get_analysis(outcome.analysis_id).await.unwrap().unwrap();
        assert_eq!(detail.analysis.video_id, "ABC123");
        assert_eq!(detail.analysis.total_comments, 25);
        assert_eq!(
            detail.analysis.positive_count + detail.analysis.negative_count + detail.analysis.neutral_count,
            detail.analysis.total_comments
        );
        assert_eq!(detail.comments, outcome.comments);
    }

    #[tokio::test]
    async fn test_missing_and_invalid_urls_are_input_errors() {
        let source = Arc::new(FakeSource::new(twenty_five_comments));
        let pipeline = pipeline_with(source.clone(), None, Arc::new(MemoryStore::new()));

        assert!(matches!(pipeline.analyze(None).await, Err(AnalyzeError::InvalidInput(_))));
        assert!(matches!(pipeline.analyze(Some("   ")).await, Err(AnalyzeError::InvalidInput(_))));
        assert!(matches!(
            pipeline.analyze(Some("https://example.com/not-a-video")).await,
            Err(AnalyzeError::InvalidInput(_))
        ));
        assert!(source.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_source_errors_are_mapped() {
        let not_found = Arc::new(FakeSource::new(|| Err(SourceError::NotFound("ABC123".into()))));
        let pipeline = pipeline_with(not_found, None, Arc::new(MemoryStore::new()));
        assert!(matches!(
            pipeline.analyze(Some("https://youtu.be/ABC123")).await,
            Err(AnalyzeError::NotFound(_))
        ));

        let unconfigured = Arc::new(FakeSource::new(|| Err(SourceError::Unconfigured)));
        let pipeline = pipeline_with(unconfigured, None, Arc::new(MemoryStore::new()));
        assert!(matches!(
            pipeline.analyze(Some("https://youtu.be/ABC123")).await,
            Err(AnalyzeError::UpstreamUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_zero_comments_is_empty_result_and_nothing_saved() {
        let source = Arc::new(FakeSource::new(|| {
            Ok(FetchedVideo {
                title: "Silent video".to_string(),
                comments: Vec::new(),
            })
        }));
        let store = Arc::new(MemoryStore::new());
        let pipeline = pipeline_with(source, None, store.clone());

        let result = pipeline.analyze(Some("https://www.youtube.com/embed/ABC123")).await;

        assert!(matches!(result, Err(AnalyzeError::EmptyResult)));
        assert_eq!(store.analysis_count(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_surfaced() {
        let source = Arc::new(FakeSource::new(twenty_five_comments));
        let pipeline = pipeline_with(source, None, Arc::new(FailingStore));

        let err = pipeline
            .analyze(Some("https://youtu.be/ABC123"))
            .await
            .unwrap_err();

        assert!(matches!(err, AnalyzeError::PersistenceFailure(_)));
        assert!(err.to_string().contains("disk full"));
    }

    #[tokio::test]
    async fn test_remote_outage_still_labels_everything() {
        struct DownBackend;

        #[async_trait]
        impl SentimentBackend for DownBackend {
            async fn score_batch(&self, _: &str) -> Result<String> {
                Err(anyhow!("503 Service Unavailable"))
            }
        }

        let source = Arc::new(FakeSource::new(twenty_five_comments));
        let store = Arc::new(MemoryStore::new());
        let pipeline = pipeline_with(source, Some(Arc::new(DownBackend)), store.clone());

        let outcome = pipeline.analyze(Some("https://youtu.be/ABC123")).await.unwrap();

        assert_eq!(outcome.comments.len(), 25);
        assert_eq!(outcome.stats.total, 25);
        assert_eq!(store.comment_count(outcome.analysis_id), 25);
    }
}
