//! Normalización de puntuaciones a etiquetas y agregación de estadísticas.
//!
//! Los umbrales son constantes del diseño: los análisis guardados dependen de
//! ellos y no deben cambiar entre versiones.

use serde::Serialize;

use crate::models::{ScoredComment, SentimentLabel};

pub const NEGATIVE_THRESHOLD: f64 = -0.2;
pub const POSITIVE_THRESHOLD: f64 = 0.2;

/// Convierte una puntuación en [-1, 1] en etiqueta.
/// La banda [-0.2, 0.2], extremos incluidos, es neutral.
pub fn label(sentiment: f64) -> SentimentLabel {
    if sentiment < NEGATIVE_THRESHOLD {
        SentimentLabel::Negative
    } else if sentiment > POSITIVE_THRESHOLD {
        SentimentLabel::Positive
    } else {
        SentimentLabel::Neutral
    }
}

/// Recuentos y porcentajes de un conjunto de comentarios puntuados.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentStats {
    pub total: u64,
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
    pub positive_percent: u64,
    pub negative_percent: u64,
    pub neutral_percent: u64,
}

/// Agrega los comentarios puntuados. Una secuencia vacía da todo a cero.
pub fn aggregate(scored: &[ScoredComment]) -> SentimentStats {
    let total = scored.len() as u64;
    let positive = count_label(scored, SentimentLabel::Positive);
    let negative = count_label(scored, SentimentLabel::Negative);
    // Derivado, no contado, para que la suma cuadre siempre con el total.
    let neutral = total - positive - negative;

    SentimentStats {
        total,
        positive,
        negative,
        neutral,
        positive_percent: percent(positive, total),
        negative_percent: percent(negative, total),
        neutral_percent: percent(neutral, total),
    }
}

fn count_label(scored: &[ScoredComment], wanted: SentimentLabel) -> u64 {
    scored.iter().filter(|c| c.sentiment_label == wanted).count() as u64
}

fn percent(count: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    // Empates al par: 12.5 -> 12, 87.5 -> 88.
    (count as f64 / total as f64 * 100.0).round_ties_even() as u64
}
