//! Clasificador principal: puntúa los comentarios por lotes con el LLM y, si un
//! lote falla por cualquier motivo, lo repuntúa entero con el léxico local.
//!
//! Flujo por petición:
//!   1. Se parte la secuencia en lotes de `BATCH_SIZE`, respetando el orden.
//!   2. Cada lote se envía en una sola llamada, textos unidos por `BATCH_SEPARATOR`.
//!   3. La respuesta se analiza como un array JSON de números en [-1, 1].
//!   4. Si la llamada o el análisis fallan, el lote completo pasa al léxico.
//!   5. Cada puntuación se normaliza a etiqueta.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::{debug, info, warn};

use crate::{
    lexicon::Lexicon,
    llm::SentimentBackend,
    models::{Comment, ScoredComment},
    sentiment,
};

pub const BATCH_SIZE: usize = 10;
pub const BATCH_SEPARATOR: &str = "\n---\n";

pub struct SentimentClassifier {
    backend: Option<Arc<dyn SentimentBackend>>,
    lexicon: Lexicon,
}

impl SentimentClassifier {
    /// Sin backend todo se puntúa localmente, sin llamadas de red.
    pub fn new(backend: Option<Arc<dyn SentimentBackend>>) -> Self {
        Self {
            backend,
            lexicon: Lexicon::new(),
        }
    }

    pub fn remote_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Puntúa todos los comentarios. Nunca falla: cada comentario sale etiquetado.
    pub async fn classify(&self, comments: Vec<Comment>) -> Vec<ScoredComment> {
        let backend = match &self.backend {
            Some(backend) => backend,
            None => {
                debug!("Clasificador remoto no configurado; usando el léxico para {} comentarios.", comments.len());
                return comments.into_iter().map(|c| self.score_locally(c)).collect();
            }
        };

        let mut scored = Vec::with_capacity(comments.len());
        let mut fallbacks = 0usize;

        for (index, batch) in comments.chunks(BATCH_SIZE).enumerate() {
            match self.score_remotely(backend.as_ref(), batch).await {
                Ok(scores) => {
                    for (comment, score) in batch.iter().zip(scores) {
                        scored.push(build_scored(comment.clone(), score));
                    }
                }
                Err(err) => {
                    warn!("Lote {} ({} comentarios) puntuado con el léxico: {}", index, batch.len(), err);
                    fallbacks += 1;
                    scored.extend(batch.iter().cloned().map(|c| self.score_locally(c)));
                }
            }
        }

        info!(
            "Clasificados {} comentarios ({} lotes con respaldo léxico).",
            scored.len(),
            fallbacks
        );
        scored
    }

    /// Devuelve exactamente una puntuación por comentario del lote.
    async fn score_remotely(
        &self,
        backend: &dyn SentimentBackend,
        batch: &[Comment],
    ) -> Result<Vec<f64>> {
        let joined = batch
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(BATCH_SEPARATOR);

        let raw = backend.score_batch(&joined).await?;
        let mut scores = parse_scores(&raw)?;

        if scores.len() < batch.len() {
            debug!("El LLM devolvió {} puntuaciones para {} comentarios; el resto queda en 0.", scores.len(), batch.len());
        }
        scores.resize(batch.len(), 0.0);
        Ok(scores)
    }

    fn score_locally(&self, comment: Comment) -> ScoredComment {
        let score = self.lexicon.score(&comment.text);
        build_scored(comment, score)
    }
}

fn build_scored(comment: Comment, score: f64) -> ScoredComment {
    ScoredComment {
        comment,
        sentiment: score,
        sentiment_label: sentiment::label(score),
    }
}

/// Analiza la respuesta del LLM como un array JSON de números.
///
/// Acepta la respuesta envuelta en un bloque ```json. Cualquier otra cosa
/// (texto libre, elementos no numéricos, valores fuera de [-1, 1]) es un error.
pub fn parse_scores(raw: &str) -> Result<Vec<f64>> {
    let cleaned = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let scores: Vec<f64> = serde_json::from_str(cleaned)
        .map_err(|e| anyhow!("Respuesta del LLM no es un array numérico ({e}): '{raw}'"))?;

    if let Some(bad) = scores.iter().find(|s| !(-1.0..=1.0).contains(*s)) {
        return Err(anyhow!("Puntuación fuera de rango en la respuesta del LLM: {bad}"));
    }

    Ok(scores)
}
