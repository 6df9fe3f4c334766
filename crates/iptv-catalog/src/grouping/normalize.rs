//! Title normalization for cross-source grouping
//!
//! This is a similarity heuristic, not guaranteed identity resolution:
//! different works with identical titles collide, and the same work under
//! divergent titles will not merge. The edition-marker strip list is
//! hand-tuned configuration data, not fixed core logic.

/// Fold common Latin diacritics to their ASCII base character
pub fn fold_diacritics(text: &str) -> String {
    text.chars().map(fold_char).collect()
}

fn fold_char(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        'ñ' => 'n',
        'ç' => 'c',
        'ß' => 's',
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
        'È' | 'É' | 'Ê' | 'Ë' => 'E',
        'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => 'O',
        'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
        'Ñ' => 'N',
        'Ç' => 'C',
        _ => c,
    }
}

/// Resolution tags stripped during grouping normalization and recognized by
/// the quality scorer. Variants of the same work differ only by these.
const RESOLUTION_TOKENS: &[&str] = &[
    "4k", "uhd", "2160p", "2160", "fhd", "1080p", "1080", "hd", "720p", "720", "sd", "480p",
    "480",
];

/// Grouping-time title normalizer: case-fold, fold diacritics, strip
/// punctuation, resolution tags and configured edition markers, collapse
/// whitespace.
#[derive(Debug, Clone)]
pub struct TitleNormalizer {
    edition_markers: Vec<String>,
}

impl TitleNormalizer {
    pub fn new(edition_markers: &[String]) -> Self {
        Self {
            edition_markers: edition_markers.iter().map(|m| m.to_lowercase()).collect(),
        }
    }

    pub fn normalize(&self, title: &str) -> String {
        let folded = fold_diacritics(&title.to_lowercase());
        let spaced: String = folded
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect();
        let mut collapsed = spaced
            .split_whitespace()
            .filter(|token| !RESOLUTION_TOKENS.contains(token))
            .collect::<Vec<_>>()
            .join(" ");

        for marker in &self.edition_markers {
            // Markers are stripped as whole words/phrases only
            let stripped: String = marker
                .chars()
                .map(|c| if c.is_alphanumeric() { c } else { ' ' })
                .collect();
            let stripped = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
            if stripped.is_empty() {
                continue;
            }
            let padded = format!(" {collapsed} ");
            let removed = padded.replace(&format!(" {stripped} "), " ");
            collapsed = removed.split_whitespace().collect::<Vec<_>>().join(" ");
        }

        collapsed
    }
}

/// Resolution heuristic from URL/name text: 4K→5, 1080p→4, 720p→3, SD→2,
/// none→1.
pub fn quality_score(text: &str) -> u8 {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    let has = |candidates: &[&str]| tokens.iter().any(|t| candidates.contains(t));

    if has(&["4k", "2160p", "2160", "uhd"]) {
        5
    } else if has(&["1080p", "1080", "fhd"]) {
        4
    } else if has(&["720p", "720"]) {
        3
    } else if has(&["sd", "480p", "480"]) {
        2
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::default_edition_markers;

    fn normalizer() -> TitleNormalizer {
        TitleNormalizer::new(&default_edition_markers())
    }

    #[test]
    fn folds_case_punctuation_and_whitespace() {
        let n = normalizer();
        assert_eq!(n.normalize("The  Matrix!"), "the matrix");
        assert_eq!(n.normalize("THE MATRIX"), "the matrix");
        assert_eq!(n.normalize("The.Matrix"), "the matrix");
    }

    #[test]
    fn folds_diacritics() {
        assert_eq!(normalizer().normalize("Amélie"), "amelie");
        assert_eq!(normalizer().normalize("Niño Perdido"), "nino perdido");
    }

    #[test]
    fn strips_edition_markers_as_whole_phrases() {
        let n = normalizer();
        assert_eq!(n.normalize("Blade Runner Remastered"), "blade runner");
        assert_eq!(
            n.normalize("Apocalypse Now (Director's Cut)"),
            "apocalypse now"
        );
        // No partial-word stripping
        assert_eq!(n.normalize("Remasterers"), "remasterers");
    }

    #[test]
    fn strips_resolution_tags_so_variants_bucket_together() {
        let n = normalizer();
        assert_eq!(n.normalize("The Matrix 4K"), "the matrix");
        assert_eq!(n.normalize("The Matrix 1080p"), "the matrix");
        assert_eq!(n.normalize("BBC One HD"), "bbc one");
    }

    #[test]
    fn quality_scores_follow_the_resolution_table() {
        assert_eq!(quality_score("The Matrix 4K"), 5);
        assert_eq!(quality_score("http://host/matrix-2160p.mkv"), 5);
        assert_eq!(quality_score("The Matrix 1080p"), 4);
        assert_eq!(quality_score("The Matrix 720p"), 3);
        assert_eq!(quality_score("The Matrix SD"), 2);
        assert_eq!(quality_score("The Matrix"), 1);
    }

    #[test]
    fn quality_tokens_do_not_match_inside_words() {
        // "sd" inside a word is not an SD tag
        assert_eq!(quality_score("Hausderby"), 1);
    }
}
