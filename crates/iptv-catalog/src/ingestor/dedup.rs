//! Per-run dedup bookkeeping
//!
//! [`RunLedger`] is an explicit value object created for one ingestion run
//! and never shared, so concurrent source imports cannot leak state into one
//! another. It answers one question per draft: insert, update, or discard.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use uuid::Uuid;

use crate::database::repositories::catalog_record::ExistingKey;
use crate::models::{ContentKind, RecordDraft};

/// Case-folded, whitespace-collapsed form used for identity keys and the
/// stored normalized title. Edition-marker stripping happens only at
/// grouping time, not here.
pub fn normalize_identity(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Source-scoped duplicate-detection key: normalized title, plus the episode
/// numbering for episodic content.
pub fn identity_key(draft: &RecordDraft) -> String {
    let base = normalize_identity(&draft.title);
    match (draft.kind, draft.season, draft.episode) {
        (ContentKind::Episode, Some(season), Some(episode)) => {
            format!("{base}#s{season:02}e{episode:03}")
        }
        _ => base,
    }
}

/// Content hash distinguishing an unchanged re-ingestion from a real update
pub fn fingerprint(draft: &RecordDraft) -> String {
    let mut hasher = DefaultHasher::new();
    draft.title.hash(&mut hasher);
    draft.kind.to_string().hash(&mut hasher);
    draft.stream_url.hash(&mut hasher);
    draft.logo_url.hash(&mut hasher);
    draft.group_name.hash(&mut hasher);
    draft.series_title.hash(&mut hasher);
    draft.season.hash(&mut hasher);
    draft.episode.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Outcome of admitting one draft into the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// New identity key for this source
    Insert,
    /// Existing key with changed content
    Update { record_id: Uuid },
    /// Same key already admitted earlier in this run; first occurrence wins
    DuplicateInRun,
    /// Existing key with identical content; re-run no-op
    UnchangedExisting,
}

/// Dedup state for one ingestion run
pub struct RunLedger {
    existing: HashMap<String, (Uuid, String)>,
    seen: HashSet<String>,
}

impl RunLedger {
    pub fn new(existing: Vec<ExistingKey>) -> Self {
        Self {
            existing: existing
                .into_iter()
                .map(|k| (k.identity_key, (k.record_id, k.fingerprint)))
                .collect(),
            seen: HashSet::new(),
        }
    }

    /// Admit one draft, marking its key as seen
    pub fn admit(&mut self, draft: &RecordDraft) -> (String, Admission) {
        let key = identity_key(draft);

        if !self.seen.insert(key.clone()) {
            return (key, Admission::DuplicateInRun);
        }

        match self.existing.get(&key) {
            Some((record_id, existing_fingerprint)) => {
                if *existing_fingerprint == fingerprint(draft) {
                    (key, Admission::UnchangedExisting)
                } else {
                    let record_id = *record_id;
                    (key, Admission::Update { record_id })
                }
            }
            None => (key, Admission::Insert),
        }
    }

    /// Ids of previously stored records whose keys were absent from this
    /// pass; used by the staleness sweep after a fully successful run.
    pub fn stale_record_ids(&self) -> Vec<Uuid> {
        self.existing
            .iter()
            .filter(|(key, _)| !self.seen.contains(*key))
            .map(|(_, (id, _))| *id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str, url: &str) -> RecordDraft {
        RecordDraft {
            source_id: Uuid::new_v4(),
            title: title.to_string(),
            kind: ContentKind::Channel,
            stream_url: url.to_string(),
            logo_url: None,
            group_name: None,
            series_title: None,
            season: None,
            episode: None,
        }
    }

    #[test]
    fn identity_key_folds_case_and_whitespace() {
        assert_eq!(
            identity_key(&draft("  The   MATRIX ", "u")),
            identity_key(&draft("the matrix", "u"))
        );
    }

    #[test]
    fn episodes_key_on_title_plus_numbering() {
        let mut episode = draft("Pilot", "u");
        episode.kind = ContentKind::Episode;
        episode.season = Some(1);
        episode.episode = Some(2);
        assert_eq!(identity_key(&episode), "pilot#s01e002");
    }

    #[test]
    fn duplicate_in_run_first_occurrence_wins() {
        let mut ledger = RunLedger::new(Vec::new());
        let (_, first) = ledger.admit(&draft("BBC One", "http://a"));
        // Same title, different URL: still a duplicate within the run
        let (_, second) = ledger.admit(&draft("BBC One", "http://b"));
        assert_eq!(first, Admission::Insert);
        assert_eq!(second, Admission::DuplicateInRun);
    }

    #[test]
    fn unchanged_existing_is_a_noop() {
        let d = draft("BBC One", "http://a");
        let id = Uuid::new_v4();
        let mut ledger = RunLedger::new(vec![ExistingKey {
            identity_key: identity_key(&d),
            record_id: id,
            fingerprint: fingerprint(&d),
        }]);
        assert_eq!(ledger.admit(&d).1, Admission::UnchangedExisting);
    }

    #[test]
    fn changed_existing_becomes_update() {
        let old = draft("BBC One", "http://a");
        let new = draft("BBC One", "http://b");
        let id = Uuid::new_v4();
        let mut ledger = RunLedger::new(vec![ExistingKey {
            identity_key: identity_key(&old),
            record_id: id,
            fingerprint: fingerprint(&old),
        }]);
        assert_eq!(ledger.admit(&new).1, Admission::Update { record_id: id });
    }

    #[test]
    fn stale_ids_are_existing_keys_not_seen() {
        let kept = draft("Kept", "u");
        let gone_id = Uuid::new_v4();
        let mut ledger = RunLedger::new(vec![
            ExistingKey {
                identity_key: identity_key(&kept),
                record_id: Uuid::new_v4(),
                fingerprint: fingerprint(&kept),
            },
            ExistingKey {
                identity_key: "vanished".to_string(),
                record_id: gone_id,
                fingerprint: "x".to_string(),
            },
        ]);
        ledger.admit(&kept);
        assert_eq!(ledger.stale_record_ids(), vec![gone_id]);
    }
}
