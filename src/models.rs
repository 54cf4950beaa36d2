//! Modelos de dominio (comentarios, comentarios puntuados y análisis persistidos).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Comentario tal y como llega de la fuente (YouTube).
/// Es inmutable una vez obtenido.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub author: String,
    pub published_at: String,
    pub like_count: u64,
}

/// Etiqueta discreta de sentimiento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "positive" => Some(SentimentLabel::Positive),
            "negative" => Some(SentimentLabel::Negative),
            "neutral" => Some(SentimentLabel::Neutral),
            _ => None,
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comentario con su puntuación y etiqueta. Se crea una sola vez por comentario
/// en la etapa de clasificación y no se modifica después.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredComment {
    #[serde(flatten)]
    pub comment: Comment,
    pub sentiment: f64,
    pub sentiment_label: SentimentLabel,
}

/// Datos necesarios para crear un análisis; el `id` y `created_at` los asigna el almacén.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnalysis {
    pub video_id: String,
    pub video_title: String,
    pub video_url: String,
    pub total_comments: u64,
    pub positive_count: u64,
    pub negative_count: u64,
    pub neutral_count: u64,
}

/// Análisis persistido (una fila/nodo por ejecución del pipeline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub id: i64,
    pub video_id: String,
    pub video_title: String,
    pub video_url: String,
    pub total_comments: u64,
    pub positive_count: u64,
    pub negative_count: u64,
    pub neutral_count: u64,
    pub created_at: String,
}

impl Analysis {
    pub fn from_new(id: i64, new: &NewAnalysis, created_at: String) -> Self {
        Self {
            id,
            video_id: new.video_id.clone(),
            video_title: new.video_title.clone(),
            video_url: new.video_url.clone(),
            total_comments: new.total_comments,
            positive_count: new.positive_count,
            negative_count: new.negative_count,
            neutral_count: new.neutral_count,
            created_at,
        }
    }
}

/// Análisis junto con sus comentarios, para la vista de detalle.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisDetail {
    #[serde(flatten)]
    pub analysis: Analysis,
    pub comments: Vec<ScoredComment>,
}
