//! Bag-of-words overlap between a designation and extracted document text

use std::collections::HashSet;

/// Fold the accented letters found in French catalog text to ASCII
pub fn fold_accents(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            'à' | 'á' | 'â' | 'ä' | 'ã' | 'å' => out.push('a'),
            'À' | 'Á' | 'Â' | 'Ä' | 'Ã' | 'Å' => out.push('A'),
            'ç' => out.push('c'),
            'Ç' => out.push('C'),
            'è' | 'é' | 'ê' | 'ë' => out.push('e'),
            'È' | 'É' | 'Ê' | 'Ë' => out.push('E'),
            'ì' | 'í' | 'î' | 'ï' => out.push('i'),
            'Ì' | 'Í' | 'Î' | 'Ï' => out.push('I'),
            'ñ' => out.push('n'),
            'Ñ' => out.push('N'),
            'ò' | 'ó' | 'ô' | 'ö' | 'õ' => out.push('o'),
            'Ò' | 'Ó' | 'Ô' | 'Ö' | 'Õ' => out.push('O'),
            'ù' | 'ú' | 'û' | 'ü' => out.push('u'),
            'Ù' | 'Ú' | 'Û' | 'Ü' => out.push('U'),
            'ÿ' => out.push('y'),
            'Ÿ' => out.push('Y'),
            'œ' => out.push_str("oe"),
            'Œ' => out.push_str("OE"),
            'æ' => out.push_str("ae"),
            'Æ' => out.push_str("AE"),
            _ => out.push(c),
        }
    }
    out
}

/// Normalized words: lowercase, accents folded, split on non-alphanumerics,
/// single characters dropped
pub fn words(text: &str) -> Vec<String> {
    fold_accents(text)
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 2)
        .map(String::from)
        .collect()
}

/// Fraction of the designation's distinct words present in the text
pub fn overlap_score(designation: &str, text: &str) -> f64 {
    let wanted: HashSet<String> = words(designation).into_iter().collect();
    if wanted.is_empty() {
        return 0.0;
    }
    let available: HashSet<String> = words(text).into_iter().collect();
    let found = wanted.iter().filter(|w| available.contains(*w)).count();
    found as f64 / wanted.len() as f64
}

/// Text of a document, pre-split for scoring against many designations
pub struct DocumentWords {
    words: HashSet<String>,
}

impl DocumentWords {
    pub fn new(text: &str) -> Self {
        Self {
            words: words(text).into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Same result as `overlap_score(designation, text)`
    pub fn score(&self, designation: &str) -> f64 {
        let wanted: HashSet<String> = words(designation).into_iter().collect();
        if wanted.is_empty() {
            return 0.0;
        }
        let found = wanted.iter().filter(|w| self.words.contains(*w)).count();
        found as f64 / wanted.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_normalization() {
        assert_eq!(
            words("Bloc-porte Coupe-Feu EI30 à 1 vantail"),
            vec!["bloc", "porte", "coupe", "feu", "ei30", "vantail"]
        );
        assert_eq!(words("Œil-de-bœuf"), vec!["oeil", "de", "boeuf"]);
    }

    #[test]
    fn test_full_and_partial_overlap() {
        let text = "FICHE TECHNIQUE\nBloc porte coupe feu EI 30 - 1 vantail\nDimensions 2040 x 930";
        assert_eq!(overlap_score("Bloc-porte coupe-feu 1 vantail", text), 1.0);
        // "ei30" is not in the text (written "EI 30"), 4 of 5 words found
        assert!((overlap_score("Bloc-porte coupe-feu EI30", text) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_accents_do_not_matter() {
        assert_eq!(overlap_score("Béquille double", "BEQUILLE DOUBLE INOX"), 1.0);
    }

    #[test]
    fn test_repeated_words_count_once() {
        assert_eq!(overlap_score("porte porte porte", "porte"), 1.0);
    }

    #[test]
    fn test_empty_designation_scores_zero() {
        assert_eq!(overlap_score("", "anything"), 0.0);
        assert_eq!(overlap_score("- /", "anything"), 0.0);
    }

    #[test]
    fn test_document_words_matches_free_function() {
        let text = "Ferme-porte à bras compas, force 2-4";
        let doc = DocumentWords::new(text);
        for designation in ["Ferme-porte bras", "Ferme-porte glissière", "Charnière"] {
            assert_eq!(doc.score(designation), overlap_score(designation, text));
        }
        assert!(DocumentWords::new("  ").is_empty());
    }
}
