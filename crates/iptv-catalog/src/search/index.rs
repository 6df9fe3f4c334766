//! In-process inverted index
//!
//! Token dictionary in a `BTreeMap` so query terms resolve as prefix range
//! scans; a bounded edit-distance fallback covers terms with no prefix hit.
//! Scoring is TF/IDF with a recency tie-break. Every document is 1:1 with a
//! catalog record id; removing a document also drops its postings, so no
//! orphaned entries survive an update or delete.

use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use super::tokenizer::{QueryTerm, tokenize};
use crate::models::{CanonicalRecord, ContentKind, SearchHit};

/// Fuzzy fallback matches score lower than literal prefix matches
const FUZZY_DAMPING: f64 = 0.5;

#[derive(Debug, Clone)]
struct DocEntry {
    title: String,
    summary: String,
    kind: ContentKind,
    tokens: Vec<String>,
    token_count: usize,
    /// Recency weight used as the ranking tie-break
    rank_weight: i64,
}

/// Inverted index over catalog records
#[derive(Default)]
pub struct InvertedIndex {
    postings: BTreeMap<String, HashMap<Uuid, u32>>,
    docs: HashMap<Uuid, DocEntry>,
}

impl InvertedIndex {
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.docs.contains_key(id)
    }

    /// Insert or replace the document for one record
    pub fn insert(&mut self, record: &CanonicalRecord) {
        self.remove(&record.id);

        let tokens = tokenize(&Self::document_text(record));
        let token_count = tokens.len().max(1);

        for token in &tokens {
            *self
                .postings
                .entry(token.clone())
                .or_default()
                .entry(record.id)
                .or_insert(0) += 1;
        }

        self.docs.insert(
            record.id,
            DocEntry {
                title: record.title.clone(),
                summary: Self::summary(record),
                kind: record.kind,
                tokens,
                token_count,
                rank_weight: record.updated_at.timestamp(),
            },
        );
    }

    /// Remove the document for one record id, dropping emptied postings
    pub fn remove(&mut self, id: &Uuid) {
        let Some(entry) = self.docs.remove(id) else {
            return;
        };
        for token in entry.tokens {
            if let Some(postings) = self.postings.get_mut(&token) {
                postings.remove(id);
                if postings.is_empty() {
                    self.postings.remove(&token);
                }
            }
        }
    }

    /// Rank documents matching every query term
    pub fn query(
        &self,
        terms: &[QueryTerm],
        kind: Option<ContentKind>,
        limit: usize,
    ) -> Vec<SearchHit> {
        if terms.is_empty() || self.docs.is_empty() {
            return Vec::new();
        }

        let total_docs = self.docs.len() as f64;
        let mut combined: Option<HashMap<Uuid, f64>> = None;

        for term in terms {
            let scores = self.term_scores(term, total_docs);
            combined = Some(match combined {
                None => scores,
                Some(mut acc) => {
                    // Every term must match
                    acc.retain(|doc, _| scores.contains_key(doc));
                    for (doc, score) in scores {
                        if let Some(total) = acc.get_mut(&doc) {
                            *total += score;
                        }
                    }
                    acc
                }
            });
            if combined.as_ref().is_some_and(HashMap::is_empty) {
                return Vec::new();
            }
        }

        let mut hits: Vec<(Uuid, f64, i64)> = combined
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(doc, score)| {
                let entry = self.docs.get(&doc)?;
                if let Some(kind) = kind {
                    if entry.kind != kind {
                        return None;
                    }
                }
                Some((doc, score, entry.rank_weight))
            })
            .collect();

        hits.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.2.cmp(&a.2))
                .then_with(|| a.0.cmp(&b.0))
        });
        hits.truncate(limit);

        hits.into_iter()
            .map(|(doc, score, _)| {
                let entry = &self.docs[&doc];
                SearchHit {
                    record_id: doc,
                    title: entry.title.clone(),
                    summary: entry.summary.clone(),
                    kind: entry.kind,
                    rank: score,
                }
            })
            .collect()
    }

    /// Per-document scores for one term: prefix matches over raw and stemmed
    /// forms, with a bounded edit-distance scan when nothing matches.
    fn term_scores(&self, term: &QueryTerm, total_docs: f64) -> HashMap<Uuid, f64> {
        let mut scores = HashMap::new();

        let mut variants = vec![term.raw.as_str()];
        if term.stemmed != term.raw {
            variants.push(term.stemmed.as_str());
        }

        for variant in variants {
            for (_token, postings) in self.prefix_entries(variant) {
                Self::accumulate(&mut scores, postings, total_docs, 1.0, &self.docs);
            }
        }

        if scores.is_empty() {
            let max_edits = if term.raw.chars().count() >= 8 { 2 } else { 1 };
            for (token, postings) in &self.postings {
                if levenshtein_within(&term.raw, token, max_edits) {
                    Self::accumulate(&mut scores, postings, total_docs, FUZZY_DAMPING, &self.docs);
                }
            }
        }

        scores
    }

    fn prefix_entries<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a HashMap<Uuid, u32>)> {
        self.postings
            .range(prefix.to_string()..)
            .take_while(move |(token, _)| token.starts_with(prefix))
    }

    fn accumulate(
        scores: &mut HashMap<Uuid, f64>,
        postings: &HashMap<Uuid, u32>,
        total_docs: f64,
        damping: f64,
        docs: &HashMap<Uuid, DocEntry>,
    ) {
        let df = postings.len() as f64;
        let idf = (1.0 + total_docs / df).ln();
        for (doc, tf) in postings {
            let Some(entry) = docs.get(doc) else { continue };
            let weight = (*tf as f64 / entry.token_count as f64) * idf * damping;
            *scores.entry(*doc).or_insert(0.0) += weight;
        }
    }

    fn document_text(record: &CanonicalRecord) -> String {
        let mut text = record.title.clone();
        if let Some(series) = &record.series_title {
            text.push(' ');
            text.push_str(series);
        }
        if let Some(group) = &record.group_name {
            text.push(' ');
            text.push_str(group);
        }
        text
    }

    fn summary(record: &CanonicalRecord) -> String {
        match &record.group_name {
            Some(group) => format!("{} · {}", record.kind, group),
            None => record.kind.to_string(),
        }
    }
}

/// Whether the edit distance between `a` and `b` is at most `max_edits`
fn levenshtein_within(a: &str, b: &str, max_edits: usize) -> bool {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.len().abs_diff(b.len()) > max_edits {
        return false;
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for i in 1..=a.len() {
        current[0] = i;
        let mut row_min = current[0];
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            current[j] = (prev[j] + 1)
                .min(current[j - 1] + 1)
                .min(prev[j - 1] + cost);
            row_min = row_min.min(current[j]);
        }
        if row_min > max_edits {
            return false;
        }
        std::mem::swap(&mut prev, &mut current);
    }

    prev[b.len()] <= max_edits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tokenizer::query_terms;
    use chrono::Utc;

    fn record(title: &str, kind: ContentKind) -> CanonicalRecord {
        let now = Utc::now();
        CanonicalRecord {
            id: Uuid::new_v4(),
            source_id: Uuid::new_v4(),
            identity_key: title.to_lowercase(),
            fingerprint: String::new(),
            title: title.to_string(),
            normalized_title: title.to_lowercase(),
            kind,
            stream_url: "http://host/x".to_string(),
            logo_url: None,
            group_name: None,
            series_title: None,
            series_key: None,
            season: None,
            episode: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn prefix_query_finds_documents() {
        let mut index = InvertedIndex::default();
        let inception = record("Inception", ContentKind::Movie);
        index.insert(&inception);
        index.insert(&record("Interstellar", ContentKind::Movie));

        let hits = index.query(&query_terms("incep"), None, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record_id, inception.id);
    }

    #[test]
    fn removed_documents_leave_no_orphaned_postings() {
        let mut index = InvertedIndex::default();
        let inception = record("Inception", ContentKind::Movie);
        index.insert(&inception);
        index.remove(&inception.id);

        assert!(index.is_empty());
        assert!(index.postings.is_empty());
        assert!(index.query(&query_terms("incep"), None, 10).is_empty());
    }

    #[test]
    fn insert_is_an_upsert() {
        let mut index = InvertedIndex::default();
        let mut movie = record("Old Title", ContentKind::Movie);
        index.insert(&movie);
        movie.title = "New Title".to_string();
        index.insert(&movie);

        assert_eq!(index.len(), 1);
        assert!(index.query(&query_terms("old"), None, 10).is_empty());
        assert_eq!(index.query(&query_terms("new"), None, 10).len(), 1);
    }

    #[test]
    fn fuzzy_fallback_tolerates_typos() {
        let mut index = InvertedIndex::default();
        let jurassic = record("Jurassic Park", ContentKind::Movie);
        index.insert(&jurassic);

        let hits = index.query(&query_terms("jurasic"), None, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record_id, jurassic.id);
    }

    #[test]
    fn stemmed_forms_match_across_inflections() {
        let mut index = InvertedIndex::default();
        index.insert(&record("Running Wild", ContentKind::Movie));

        assert_eq!(index.query(&query_terms("run"), None, 10).len(), 1);
    }

    #[test]
    fn kind_filter_applies() {
        let mut index = InvertedIndex::default();
        index.insert(&record("Matrix News", ContentKind::Channel));
        index.insert(&record("The Matrix", ContentKind::Movie));

        let hits = index.query(&query_terms("matrix"), Some(ContentKind::Movie), 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, ContentKind::Movie);
    }

    #[test]
    fn multi_term_queries_require_every_term() {
        let mut index = InvertedIndex::default();
        index.insert(&record("Jurassic Park", ContentKind::Movie));
        index.insert(&record("Park Life", ContentKind::Movie));

        let hits = index.query(&query_terms("jurassic park"), None, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Jurassic Park");
    }

    #[test]
    fn better_matches_rank_first_and_limit_applies() {
        let mut index = InvertedIndex::default();
        let exact = record("Matrix", ContentKind::Movie);
        index.insert(&exact);
        index.insert(&record("Matrix Reloaded Extended Anniversary", ContentKind::Movie));

        let hits = index.query(&query_terms("matrix"), None, 1);
        assert_eq!(hits.len(), 1);
        // Shorter document has higher term density
        assert_eq!(hits[0].record_id, exact.id);
    }

    #[test]
    fn levenshtein_bounds() {
        assert!(levenshtein_within("jurasic", "jurassic", 1));
        assert!(!levenshtein_within("jurasic", "jurassic", 0));
        assert!(levenshtein_within("same", "same", 0));
        assert!(!levenshtein_within("abc", "xyz", 2));
    }
}
