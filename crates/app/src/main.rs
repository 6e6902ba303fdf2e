use std::io::{BufReader, Read};

use lesson_core::model::Lesson;
use services::{AppServices, Clock, ProgressError, SubmitProgressRequest};

mod args;
mod config;
mod logging;
mod play;

use args::{Args, ArgsError, Command, Input, print_usage};
use config::{AppConfig, prepare_sqlite_file};

fn read_input(input: &Input) -> std::io::Result<String> {
    match input {
        Input::Stdin => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Input::File(path) => std::fs::read_to_string(path),
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = Args::parse(std::env::args().skip(1)).map_err(|e: ArgsError| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    if parsed.command == Command::Help {
        print_usage();
        return Ok(());
    }

    let mut config = AppConfig::load()?;
    parsed.apply_to(&mut config);
    logging::init(&config);

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&config.db_url)?;
    let app =
        AppServices::new_sqlite(&config.db_url, Clock::default(), config.service_settings()).await?;
    tracing::debug!(db_url = %config.db_url, "services ready");

    match parsed.command {
        Command::Submit { user, input } => {
            let request: SubmitProgressRequest = serde_json::from_str(&read_input(&input)?)?;
            match app.progress().submit(&user, request).await {
                Ok(response) => print_json(&response),
                Err(err) => {
                    print_json(&serde_json::json!({
                        "status": err.status_code(),
                        "error": err.to_string(),
                    }))?;
                    Err(err.into())
                }
            }
        }
        Command::Show { user, lesson } => {
            let progress = app.progress();
            match lesson {
                Some(lesson_id) => {
                    let doc = progress.document(&user).await?;
                    let entry = doc.as_ref().and_then(|d| d.lesson(&lesson_id));
                    match entry {
                        Some(entry) => print_json(entry),
                        None => Err(ProgressError::from(
                            storage::repository::StorageError::NotFound,
                        )
                        .into()),
                    }
                }
                None => print_json(&progress.load(&user).await?),
            }
        }
        Command::ImportLesson { input } => {
            let lesson: Lesson = serde_json::from_str(&read_input(&input)?)?;
            app.import_lesson(&lesson).await?;
            eprintln!("imported lesson {} ({} exercises)", lesson.id, lesson.len());
            Ok(())
        }
        Command::Lessons { limit } => {
            for lesson in app.lessons(limit).await? {
                let skill = lesson.skill.map_or("-", |s| s.as_str());
                println!("{}\t{}\t{}\t{}", lesson.id, skill, lesson.len(), lesson.title);
            }
            Ok(())
        }
        Command::Play { user, lesson } => {
            let stdin = std::io::stdin();
            let input = BufReader::new(stdin.lock());
            play::play(&app, &user, &lesson, input, std::io::stdout()).await?;
            Ok(())
        }
        Command::Help => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        tracing::error!(error = %err, "command failed");
        eprintln!("{err}");
        std::process::exit(2);
    }
}
