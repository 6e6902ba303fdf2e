use std::fmt;

use lesson_core::model::{LessonId, UserId};

use crate::config::{AppConfig, normalize_sqlite_url};

#[derive(Debug, PartialEq, Eq)]
pub enum ArgsError {
    MissingCommand,
    UnknownCommand(String),
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidId { flag: &'static str, raw: String },
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingCommand => write!(f, "a command is required"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw:?}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

/// Where a JSON payload comes from. `-` means stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    File(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Merge a reported lesson completion.
    Submit { user: UserId, input: Input },
    /// Print a learner's summary, or one lesson's detail.
    Show {
        user: UserId,
        lesson: Option<LessonId>,
    },
    ImportLesson { input: Input },
    Lessons { limit: u32 },
    /// Take a lesson interactively on the terminal.
    Play { user: UserId, lesson: LessonId },
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub command: Command,
    pub db_url: Option<String>,
}

#[derive(Default)]
struct Flags {
    db_url: Option<String>,
    user: Option<String>,
    lesson: Option<String>,
    file: Option<String>,
    limit: Option<String>,
}

impl Args {
    /// Parse `argv` (without the program name).
    ///
    /// # Errors
    ///
    /// Returns `ArgsError` for unknown commands, unknown flags and missing values.
    pub fn parse(argv: impl IntoIterator<Item = String>) -> Result<Self, ArgsError> {
        let mut args = argv.into_iter();
        let cmd = args.next().ok_or(ArgsError::MissingCommand)?;
        if matches!(cmd.as_str(), "--help" | "-h" | "help") {
            return Ok(Self {
                command: Command::Help,
                db_url: None,
            });
        }

        let flags = Flags::parse(&mut args)?;
        let command = match cmd.as_str() {
            "submit" => Command::Submit {
                user: user_id(flags.user.as_deref())?,
                input: input(flags.file.as_deref())?,
            },
            "show" => Command::Show {
                user: user_id(flags.user.as_deref())?,
                lesson: flags.lesson.as_deref().map(lesson_id).transpose()?,
            },
            "import-lesson" => Command::ImportLesson {
                input: input(flags.file.as_deref())?,
            },
            "lessons" => Command::Lessons {
                limit: match flags.limit {
                    Some(raw) => raw.parse().map_err(|_| ArgsError::InvalidNumber {
                        flag: "--limit",
                        raw: raw.clone(),
                    })?,
                    None => 100,
                },
            },
            "play" => Command::Play {
                user: user_id(flags.user.as_deref())?,
                lesson: lesson_id(
                    flags
                        .lesson
                        .as_deref()
                        .ok_or(ArgsError::MissingFlag { flag: "--lesson" })?,
                )?,
            },
            _ => return Err(ArgsError::UnknownCommand(cmd)),
        };

        Ok(Self {
            command,
            db_url: flags.db_url,
        })
    }

    /// Flags override whatever the environment configured.
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(db_url) = &self.db_url {
            config.db_url = normalize_sqlite_url(db_url.clone());
        }
    }
}

impl Flags {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut flags = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    flags.db_url = Some(value);
                }
                "--user" | "-u" => flags.user = Some(require_value(args, "--user")?),
                "--lesson" | "-l" => flags.lesson = Some(require_value(args, "--lesson")?),
                "--file" | "-f" => flags.file = Some(require_value(args, "--file")?),
                "--limit" => flags.limit = Some(require_value(args, "--limit")?),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(flags)
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn user_id(raw: Option<&str>) -> Result<UserId, ArgsError> {
    let raw = raw.ok_or(ArgsError::MissingFlag { flag: "--user" })?;
    raw.parse().map_err(|_| ArgsError::InvalidId {
        flag: "--user",
        raw: raw.to_string(),
    })
}

fn lesson_id(raw: &str) -> Result<LessonId, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidId {
        flag: "--lesson",
        raw: raw.to_string(),
    })
}

fn input(raw: Option<&str>) -> Result<Input, ArgsError> {
    match raw {
        None => Err(ArgsError::MissingFlag { flag: "--file" }),
        Some("-") => Ok(Input::Stdin),
        Some(path) => Ok(Input::File(path.to_string())),
    }
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app submit        --user <id> --file <request.json|->   [--db <sqlite_url>]");
    eprintln!("  app show          --user <id> [--lesson <id>]            [--db <sqlite_url>]");
    eprintln!("  app import-lesson --file <lesson.json|->                 [--db <sqlite_url>]");
    eprintln!("  app lessons       [--limit <n>]                          [--db <sqlite_url>]");
    eprintln!("  app play          --user <id> --lesson <id>              [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Environment (.env is read if present):");
    eprintln!("  LESSON_DB_URL, LESSON_WEEKLY_GOAL, LESSON_MAX_MERGE_RETRIES,");
    eprintln!("  LESSON_LOG, LESSON_LOG_FORMAT (plain|json), RUST_LOG");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        Args::parse(args.iter().map(|s| (*s).to_string()))
    }

    #[test]
    fn parses_submit_from_stdin() {
        let args = parse(&["submit", "--user", "ana", "--file", "-", "--db", "x.db"]).unwrap();
        assert_eq!(
            args.command,
            Command::Submit {
                user: UserId::new("ana"),
                input: Input::Stdin
            }
        );
        assert_eq!(args.db_url.as_deref(), Some("x.db"));
    }

    #[test]
    fn show_lesson_is_optional() {
        let args = parse(&["show", "-u", "ana"]).unwrap();
        assert_eq!(
            args.command,
            Command::Show {
                user: UserId::new("ana"),
                lesson: None
            }
        );
    }

    #[test]
    fn reports_missing_and_unknown_input() {
        assert_eq!(parse(&[]).unwrap_err(), ArgsError::MissingCommand);
        assert_eq!(
            parse(&["play", "--user", "ana"]).unwrap_err(),
            ArgsError::MissingFlag { flag: "--lesson" }
        );
        assert_eq!(
            parse(&["submit", "--user"]).unwrap_err(),
            ArgsError::MissingValue { flag: "--user" }
        );
        assert_eq!(
            parse(&["show", "--user", "  "]).unwrap_err(),
            ArgsError::InvalidId {
                flag: "--user",
                raw: "  ".into()
            }
        );
        assert_eq!(
            parse(&["fly"]).unwrap_err(),
            ArgsError::UnknownCommand("fly".into())
        );
        assert_eq!(
            parse(&["lessons", "--verbose"]).unwrap_err(),
            ArgsError::UnknownArg("--verbose".into())
        );
    }

    #[test]
    fn db_flag_overrides_config() {
        let args = parse(&["lessons", "--db", "sqlite::memory:"]).unwrap();
        let mut config = AppConfig::default();
        args.apply_to(&mut config);
        assert_eq!(config.db_url, "sqlite::memory:");
    }
}
