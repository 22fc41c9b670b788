use indexmap::IndexMap;
use serde::de::{self, DeserializeOwned, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{EnsembleError, Result};
use crate::{AnswerabilityScoreSet, CandidateAnswer, CandidateListSet, PredictionMap};

#[derive(Debug, Clone)]
pub struct ScoreSource {
    pub name: String,
    pub scores: AnswerabilityScoreSet,
}

impl ScoreSource {
    pub fn new(name: impl Into<String>, scores: AnswerabilityScoreSet) -> Self {
        Self {
            name: name.into(),
            scores,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CandidateSource {
    pub name: String,
    pub candidates: CandidateListSet,
}

impl CandidateSource {
    pub fn new(name: impl Into<String>, candidates: CandidateListSet) -> Self {
        Self {
            name: name.into(),
            candidates,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModelOutputs {
    pub scores: Vec<ScoreSource>,
    pub candidates: Vec<CandidateSource>,
}

impl ModelOutputs {
    pub fn new(scores: Vec<ScoreSource>, candidates: Vec<CandidateSource>) -> Self {
        Self { scores, candidates }
    }

    pub fn load(score_paths: &[PathBuf], candidate_paths: &[PathBuf]) -> Result<Self> {
        let mut scores = Vec::with_capacity(score_paths.len());
        for path in score_paths {
            scores.push(ScoreSource::new(path.display().to_string(), load_score_set(path)?));
        }

        let mut candidates = Vec::with_capacity(candidate_paths.len());
        for path in candidate_paths {
            candidates.push(CandidateSource::new(
                path.display().to_string(),
                load_candidate_set(path)?,
            ));
        }

        Ok(Self { scores, candidates })
    }
}

pub fn load_score_set(path: &Path) -> Result<AnswerabilityScoreSet> {
    let UniqueKeys(scores) = read_json::<UniqueKeys<f64>>(path)?;
    debug!(path = %path.display(), questions = scores.len(), "loaded answerability scores");
    Ok(scores)
}

pub fn load_candidate_set(path: &Path) -> Result<CandidateListSet> {
    let UniqueKeys(candidates) = read_json::<UniqueKeys<Vec<CandidateAnswer>>>(path)?;
    debug!(path = %path.display(), questions = candidates.len(), "loaded candidate lists");
    Ok(candidates)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = std::fs::read_to_string(path).map_err(|err| EnsembleError::io(path, err))?;
    serde_json::from_str(&data).map_err(|err| EnsembleError::malformed(path, err.to_string()))
}

/// Writes predictions as 4-space indented JSON, replacing any previous file.
pub fn write_predictions(path: &Path, predictions: &PredictionMap) -> Result<()> {
    write_json(path, predictions)?;
    debug!(path = %path.display(), predictions = predictions.len(), "wrote predictions");
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|err| EnsembleError::io(parent, err))?;
        }
    }

    let mut payload = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut payload, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|err| EnsembleError::malformed(path, format!("failed to serialize: {}", err)))?;

    let tmp_path = tmp_path_for(path);
    std::fs::write(&tmp_path, payload).map_err(|err| EnsembleError::io(&tmp_path, err))?;
    std::fs::rename(&tmp_path, path).map_err(|err| EnsembleError::io(path, err))?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|name| name.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

struct UniqueKeys<V>(IndexMap<String, V>);

impl<'de, V: Deserialize<'de>> Deserialize<'de> for UniqueKeys<V> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(UniqueKeysVisitor(PhantomData))
    }
}

struct UniqueKeysVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for UniqueKeysVisitor<V> {
    type Value = UniqueKeys<V>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object keyed by question id")
    }

    fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = IndexMap::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            if entries.contains_key(&key) {
                return Err(de::Error::custom(format!("duplicate question id {}", key)));
            }
            entries.insert(key, value);
        }
        Ok(UniqueKeys(entries))
    }
}
