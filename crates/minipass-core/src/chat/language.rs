//! Bilingual question language detection
//!
//! The user base writes in French or English. Detection is keyword-based:
//! a single strong French indicator decides, otherwise two weak indicators
//! are required.

use std::sync::OnceLock;

use regex::Regex;

/// Detected question language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    French,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::French => "fr",
        }
    }
}

fn strong_french() -> &'static Vec<Regex> {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r"(?i)\b(quel|quelle|quels|quelles)\b",
            r"(?i)\b(combien)\b",
            r"(?i)\b(où)\b",
            r"(?i)\bmontre-moi\b",
            r"(?i)\b(génèrent|generent)\b",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

fn weak_french() -> &'static Vec<Regex> {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r"(?i)\b(comment|quand|pourquoi)\b",
            r"(?i)\b(mon|ma|mes|notre|nos|votre|vos|leur|leurs)\b",
            r"(?i)\b(est|sont|ont|était|etait|étaient|etaient)\b",
            r"(?i)\b(du|des|le|la|les|une)\b",
            r"(?i)\b(ce|cette|ces|cet)\b",
            r"(?i)\b(montre|montrer|revenus?|activités?|activites?)\b",
            r"(?i)\b(utilisateurs?|clients?|passeports?|inscriptions?)\b",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

/// Detect whether a question is French or English
pub fn detect_language(question: &str) -> Language {
    for pattern in strong_french() {
        if pattern.is_match(question) {
            return Language::French;
        }
    }

    let weak_count = weak_french()
        .iter()
        .filter(|pattern| pattern.is_match(question))
        .count();

    if weak_count >= 2 {
        Language::French
    } else {
        Language::English
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_question() {
        assert_eq!(
            detect_language("How many passports were sold this month?"),
            Language::English
        );
    }

    #[test]
    fn test_strong_french_indicator() {
        assert_eq!(
            detect_language("Combien de passeports vendus?"),
            Language::French
        );
    }

    #[test]
    fn test_weak_indicators_need_two() {
        // "les" alone is not enough
        assert_eq!(detect_language("show les results"), Language::English);
        assert_eq!(
            detect_language("montre les revenus des activités"),
            Language::French
        );
    }

    #[test]
    fn test_quelle_is_strong() {
        assert_eq!(
            detect_language("Quelle activité rapporte le plus?"),
            Language::French
        );
    }
}
