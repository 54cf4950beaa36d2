//! Clasificador léxico local. Es determinista, no usa red y nunca falla:
//! sirve como motor por defecto y como respaldo del clasificador remoto.

use std::collections::HashMap;

/// Léxico de polaridad para comentarios en inglés (el idioma mayoritario en YouTube).
pub struct Lexicon {
    words: HashMap<&'static str, f64>,
    negations: Vec<&'static str>,
    intensifiers: HashMap<&'static str, f64>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::new()
    }
}

impl Lexicon {
    pub fn new() -> Self {
        let positive = [
            ("good", 0.7),
            ("great", 0.8),
            ("excellent", 1.0),
            ("amazing", 0.9),
            ("awesome", 0.9),
            ("wonderful", 1.0),
            ("fantastic", 0.9),
            ("brilliant", 0.9),
            ("perfect", 1.0),
            ("best", 1.0),
            ("better", 0.5),
            ("love", 0.6),
            ("loved", 0.7),
            ("loving", 0.6),
            ("like", 0.3),
            ("liked", 0.4),
            ("nice", 0.6),
            ("beautiful", 0.85),
            ("cool", 0.35),
            ("fun", 0.3),
            ("funny", 0.25),
            ("happy", 0.8),
            ("glad", 0.5),
            ("enjoy", 0.4),
            ("enjoyed", 0.5),
            ("helpful", 0.5),
            ("useful", 0.3),
            ("interesting", 0.5),
            ("informative", 0.5),
            ("thanks", 0.4),
            ("thank", 0.4),
            ("incredible", 0.9),
            ("impressive", 0.8),
            ("masterpiece", 1.0),
            ("recommend", 0.5),
            ("favorite", 0.5),
            ("favourite", 0.5),
            ("wow", 0.4),
            ("legend", 0.5),
            ("underrated", 0.3),
            ("clear", 0.2),
            ("well", 0.25),
            ("fine", 0.4),
        ];

        let negative = [
            ("bad", -0.7),
            ("terrible", -1.0),
            ("awful", -1.0),
            ("horrible", -1.0),
            ("worst", -1.0),
            ("worse", -0.6),
            ("poor", -0.4),
            ("hate", -0.8),
            ("hated", -0.9),
            ("dislike", -0.6),
            ("boring", -0.8),
            ("stupid", -0.8),
            ("dumb", -0.4),
            ("annoying", -0.8),
            ("useless", -0.5),
            ("waste", -0.2),
            ("wasted", -0.2),
            ("disappointing", -0.6),
            ("disappointed", -0.75),
            ("sad", -0.5),
            ("angry", -0.5),
            ("wrong", -0.5),
            ("fake", -0.5),
            ("scam", -0.8),
            ("clickbait", -0.6),
            ("garbage", -0.8),
            ("trash", -0.8),
            ("cringe", -0.6),
            ("misleading", -0.6),
            ("broken", -0.4),
            ("ugly", -0.7),
            ("sucks", -0.3),
            ("pathetic", -1.0),
            ("ridiculous", -0.3),
            ("lame", -0.5),
            ("mediocre", -0.3),
            ("unwatchable", -0.8),
            ("overrated", -0.4),
        ];

        let words = positive.into_iter().chain(negative).collect();

        let negations = vec![
            "not", "no", "never", "neither", "nobody", "nothing", "none", "cannot",
            "cant", "can't", "don't", "dont", "doesn't", "doesnt", "didn't", "didnt",
            "won't", "wont", "wouldn't", "wouldnt", "isn't", "isnt", "aren't", "arent",
            "wasn't", "wasnt", "weren't", "werent", "hardly", "barely",
        ];

        let intensifiers = [
            ("very", 1.3),
            ("really", 1.3),
            ("so", 1.2),
            ("super", 1.4),
            ("extremely", 1.5),
            ("absolutely", 1.5),
            ("totally", 1.3),
            ("incredibly", 1.5),
            ("pretty", 1.1),
            ("slightly", 0.5),
            ("somewhat", 0.7),
            ("kinda", 0.7),
        ]
        .into_iter()
        .collect();

        Self {
            words,
            negations,
            intensifiers,
        }
    }

    /// Polaridad de un texto en [-1, 1].
    ///
    /// Media de las palabras con polaridad encontradas, aplicando:
    /// 1. negación (invierte y atenúa la siguiente palabra con polaridad)
    /// 2. intensificadores (escalan la siguiente palabra con polaridad)
    ///
    /// Un texto sin palabras conocidas puntúa 0.0.
    pub fn score(&self, text: &str) -> f64 {
        let mut scores: Vec<f64> = Vec::new();
        let mut negate_next = false;
        let mut intensifier = 1.0;

        for token in tokenize(text) {
            let token = token.as_str();

            if self.negations.iter().any(|n| *n == token) {
                negate_next = true;
                continue;
            }

            if let Some(mult) = self.intensifiers.get(token) {
                intensifier = *mult;
                continue;
            }

            match self.words.get(token) {
                Some(base) => {
                    let mut score = *base * intensifier;
                    if negate_next {
                        score *= -0.5;
                    }
                    scores.push(score);
                    negate_next = false;
                    intensifier = 1.0;
                }
                None => {
                    negate_next = false;
                    intensifier = 1.0;
                }
            }
        }

        if scores.is_empty() {
            return 0.0;
        }

        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        mean.clamp(-1.0, 1.0)
    }
}

/// Minúsculas y separación por cualquier carácter que no sea alfanumérico o apóstrofo.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .replace('\u{2019}', "'")
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\''))
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_comment() {
        let lexicon = Lexicon::new();
        assert!(lexicon.score("This video is amazing, I love it!") > 0.2);
    }

    #[test]
    fn test_negative_comment() {
        let lexicon = Lexicon::new();
        assert!(lexicon.score("Terrible video. Worst explanation ever, total waste of time.") < -0.2);
    }

    #[test]
    fn test_unknown_words_are_neutral() {
        let lexicon = Lexicon::new();
        assert_eq!(lexicon.score("The upload was at 10am on Tuesday"), 0.0);
        assert_eq!(lexicon.score(""), 0.0);
        assert_eq!(lexicon.score("🔥🔥🔥"), 0.0);
    }

    #[test]
    fn test_negation_flips_sign() {
        let lexicon = Lexicon::new();
        assert!(lexicon.score("this is good") > 0.0);
        assert!(lexicon.score("this is not good") < 0.0);
        assert!(lexicon.score("honestly not bad at all") > 0.0);
        assert!(lexicon.score("I don\u{2019}t like it") < 0.0);
    }

    #[test]
    fn test_intensifier_scales() {
        let lexicon = Lexicon::new();
        assert!(lexicon.score("really good") > lexicon.score("good"));
        assert!(lexicon.score("slightly good") < lexicon.score("good"));
    }

    #[test]
    fn test_score_is_bounded_and_deterministic() {
        let lexicon = Lexicon::new();
        let text = "absolutely perfect perfect perfect, extremely excellent";
        let first = lexicon.score(text);
        assert!((-1.0..=1.0).contains(&first));
        assert_eq!(first, lexicon.score(text));
        assert!((-1.0..=1.0).contains(&lexicon.score("extremely terrible, absolutely awful")));
    }
}
