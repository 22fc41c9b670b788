use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

use crate::artifacts::read_json;
use crate::error::{EnsembleError, Result};
use crate::evaluation::squad::normalize_answer;
use crate::QuestionId;

#[derive(Debug, Deserialize)]
struct SquadFile {
    data: Vec<SquadArticle>,
}

#[derive(Debug, Deserialize)]
struct SquadArticle {
    paragraphs: Vec<SquadParagraph>,
}

#[derive(Debug, Deserialize)]
struct SquadParagraph {
    qas: Vec<SquadQuestion>,
}

#[derive(Debug, Deserialize)]
struct SquadQuestion {
    id: String,
    #[serde(default)]
    answers: Vec<SquadAnswer>,
    #[serde(default)]
    is_impossible: bool,
}

#[derive(Debug, Deserialize)]
struct SquadAnswer {
    text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoldAnswers {
    pub answers: Vec<String>,
    pub has_answer: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Benchmark {
    questions: IndexMap<QuestionId, GoldAnswers>,
    two_class: bool,
}

impl Benchmark {
    fn new(questions: IndexMap<QuestionId, GoldAnswers>, two_class: bool) -> Self {
        Self {
            questions,
            two_class,
        }
    }

    pub fn load(path: &Path, two_class: bool) -> Result<Self> {
        let file: SquadFile = read_json(path)?;

        let mut questions = IndexMap::new();
        for question in file
            .data
            .into_iter()
            .flat_map(|article| article.paragraphs)
            .flat_map(|paragraph| paragraph.qas)
        {
            if questions.contains_key(&question.id) {
                return Err(EnsembleError::malformed(
                    path,
                    format!("duplicate question id {}", question.id),
                ));
            }

            let has_answer = if two_class {
                !question.is_impossible && !question.answers.is_empty()
            } else if question.answers.is_empty() {
                return Err(EnsembleError::malformed(
                    path,
                    format!("question {} has no gold answer", question.id),
                ));
            } else {
                true
            };

            let answers = question
                .answers
                .into_iter()
                .map(|answer| answer.text)
                .filter(|text| !normalize_answer(text).is_empty())
                .collect();

            questions.insert(question.id, GoldAnswers { answers, has_answer });
        }

        debug!(path = %path.display(), questions = questions.len(), two_class, "loaded benchmark");
        Ok(Self::new(questions, two_class))
    }

    pub fn is_two_class(&self) -> bool {
        self.two_class
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, question_id: &str) -> Option<&GoldAnswers> {
        self.questions.get(question_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuestionId, &GoldAnswers)> {
        self.questions.iter()
    }
}
