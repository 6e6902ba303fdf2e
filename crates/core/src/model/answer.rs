use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::ExerciseId;

/// Raw value a learner submitted for one exercise.
///
/// The UI layer normalises input into one of these shapes; the evaluator decides
/// whether the shape fits the exercise type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnswerValue {
    Flag(bool),
    Text(String),
    Choices(Vec<String>),
    Blanks(BTreeMap<u32, String>),
}

impl AnswerValue {
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    #[must_use]
    pub fn choices<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Choices(values.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn blanks<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        Self::Blanks(values.into_iter().map(|(k, v)| (k, v.into())).collect())
    }

    /// Flat rendering for outcome detail lists.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            AnswerValue::Flag(b) => b.to_string(),
            AnswerValue::Text(s) => s.clone(),
            AnswerValue::Choices(values) => values.join(", "),
            AnswerValue::Blanks(map) => map.values().cloned().collect::<Vec<_>>().join(" | "),
        }
    }
}

/// One learner's answer to one exercise within a running attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub exercise_id: ExerciseId,
    pub value: AnswerValue,
    pub submitted_at: DateTime<Utc>,
}

impl Submission {
    #[must_use]
    pub fn new(exercise_id: ExerciseId, value: AnswerValue, submitted_at: DateTime<Utc>) -> Self {
        Self {
            exercise_id,
            value,
            submitted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_shapes_map_to_variants() {
        let flag: AnswerValue = serde_json::from_str(r#"{"flag": true}"#).unwrap();
        assert_eq!(flag, AnswerValue::Flag(true));

        let set: AnswerValue = serde_json::from_str(r#"{"choices": ["a","b"]}"#).unwrap();
        assert_eq!(set, AnswerValue::choices(["a", "b"]));

        let blanks: AnswerValue = serde_json::from_str(r#"{"blanks": {"0": "am"}}"#).unwrap();
        assert_eq!(blanks, AnswerValue::blanks([(0, "am")]));
    }

    #[test]
    fn display_joins_multi_values() {
        assert_eq!(AnswerValue::choices(["x", "y"]).display(), "x, y");
        assert_eq!(AnswerValue::blanks([(1, "b"), (0, "a")]).display(), "a | b");
    }
}
