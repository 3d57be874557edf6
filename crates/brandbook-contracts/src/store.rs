use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::guideline::VisualGuideRules;

/// File-backed guideline persistence, one JSON document per session.
///
/// Upserts replace the whole document, never merge: a re-analysis of a
/// session overwrites whatever was stored before. Persistence is the
/// caller's responsibility and is not transactional with the analysis call.
#[derive(Debug, Clone)]
pub struct GuidelineStore {
    dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredGuideline {
    pub session_id: String,
    pub rules: VisualGuideRules,
    pub source_image_count: u64,
    pub analyzed_at: String,
    pub rules_hash: String,
}

impl GuidelineStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn document_path(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{session_id}.json"))
    }

    pub fn upsert(
        &self,
        session_id: &str,
        rules: &VisualGuideRules,
        source_image_count: u64,
    ) -> Result<PathBuf> {
        let rules_json = serde_json::to_value(rules).context("guideline serialization failed")?;

        let mut derived = Map::new();
        derived.insert(
            "source_image_count".to_string(),
            Value::Number(source_image_count.into()),
        );
        derived.insert("analyzed_at".to_string(), Value::String(now_utc_iso()));

        let mut document = Map::new();
        document.insert(
            "session_id".to_string(),
            Value::String(session_id.to_string()),
        );
        document.insert("rules_hash".to_string(), Value::String(stable_hash(&rules_json)));
        document.insert("rules_json".to_string(), rules_json);
        document.insert("derived_palettes_json".to_string(), Value::Object(derived));

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed creating {}", self.dir.display()))?;
        let path = self.document_path(session_id);
        fs::write(
            &path,
            serde_json::to_string_pretty(&Value::Object(document))?,
        )
        .with_context(|| format!("failed writing {}", path.display()))?;
        Ok(path)
    }

    pub fn load(&self, session_id: &str) -> Result<StoredGuideline> {
        let path = self.document_path(session_id);
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        let document: Value = serde_json::from_str(&raw)
            .with_context(|| format!("{} is not valid JSON", path.display()))?;
        parse_document(session_id, &document)
    }
}

fn parse_document(session_id: &str, document: &Value) -> Result<StoredGuideline> {
    let rules_json = document
        .get("rules_json")
        .cloned()
        .context("stored guideline missing rules_json")?;
    let rules: VisualGuideRules = serde_json::from_value(rules_json)
        .context("stored rules_json does not match the guideline schema")?;
    let derived = document
        .get("derived_palettes_json")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    Ok(StoredGuideline {
        session_id: document
            .get("session_id")
            .and_then(Value::as_str)
            .unwrap_or(session_id)
            .to_string(),
        rules,
        source_image_count: derived
            .get("source_image_count")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        analyzed_at: derived
            .get("analyzed_at")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        rules_hash: document
            .get("rules_hash")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

fn stable_hash(payload: &Value) -> String {
    let bytes = serde_json::to_vec(payload).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guideline::{normalize, PartialGuideline, PartialPalette};

    fn sample_rules(primary: &str) -> VisualGuideRules {
        normalize(PartialGuideline {
            palette: Some(PartialPalette {
                primary: Some(vec![primary.to_string()]),
                ..PartialPalette::default()
            }),
            ..PartialGuideline::default()
        })
    }

    #[test]
    fn upsert_then_load_roundtrips() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let store = GuidelineStore::new(temp.path());
        let rules = sample_rules("#AA0000");

        let path = store.upsert("session-1", &rules, 3)?;
        assert!(path.ends_with("session-1.json"));

        let stored = store.load("session-1")?;
        assert_eq!(stored.session_id, "session-1");
        assert_eq!(stored.rules, rules);
        assert_eq!(stored.source_image_count, 3);
        assert!(!stored.analyzed_at.is_empty());
        assert_eq!(stored.rules_hash.len(), 64);
        Ok(())
    }

    #[test]
    fn upsert_replaces_rather_than_merges() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let store = GuidelineStore::new(temp.path());

        store.upsert("session-1", &sample_rules("#AA0000"), 2)?;
        store.upsert("session-1", &sample_rules("#00BB00"), 5)?;

        let stored = store.load("session-1")?;
        assert_eq!(stored.rules.palette.primary, vec!["#00BB00".to_string()]);
        assert_eq!(stored.source_image_count, 5);
        Ok(())
    }

    #[test]
    fn identical_rules_hash_identically() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let store = GuidelineStore::new(temp.path());

        store.upsert("a", &sample_rules("#AA0000"), 1)?;
        store.upsert("b", &sample_rules("#AA0000"), 9)?;

        assert_eq!(store.load("a")?.rules_hash, store.load("b")?.rules_hash);
        Ok(())
    }

    #[test]
    fn load_of_missing_session_fails() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = GuidelineStore::new(temp.path());
        assert!(store.load("nope").is_err());
    }
}
