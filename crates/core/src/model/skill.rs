use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Learning category used to bucket scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skill {
    Vocab,
    Grammar,
    Listening,
    Speaking,
    Reading,
    Writing,
}

impl Skill {
    pub const ALL: [Skill; 6] = [
        Skill::Vocab,
        Skill::Grammar,
        Skill::Listening,
        Skill::Speaking,
        Skill::Reading,
        Skill::Writing,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Skill::Vocab => "vocab",
            Skill::Grammar => "grammar",
            Skill::Listening => "listening",
            Skill::Speaking => "speaking",
            Skill::Reading => "reading",
            Skill::Writing => "writing",
        }
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSkill(pub String);

impl fmt::Display for UnknownSkill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown skill: {}", self.0)
    }
}

impl std::error::Error for UnknownSkill {}

impl FromStr for Skill {
    type Err = UnknownSkill;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Skill::ALL
            .into_iter()
            .find(|skill| skill.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownSkill(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Grammar".parse::<Skill>().unwrap(), Skill::Grammar);
        assert!("math".parse::<Skill>().is_err());
    }
}
