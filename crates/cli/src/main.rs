#![warn(clippy::pedantic)]

mod config;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::Parser;
use fittrack_domain::{CatalogService, Exercise, ExerciseID, Freshness, Service};
use fittrack_storage::{REST, SQLite};
use log::warn;

use config::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match dotenv {
        Err(err) if !err.not_found() => warn!("failed to load .env file: {err}"),
        _ => {}
    }

    run(Cli::parse()).await
}

async fn run(cli: Cli) -> Result<()> {
    let rest = REST::new(cli.rest_settings()).context("failed to create API client")?;

    if let Command::ImageUrl { ref id, resolution } = cli.command {
        println!("{}", rest.image_url(&ExerciseID::new(id), resolution));
        return Ok(());
    }

    let sqlite = SQLite::open(&cli.database)
        .with_context(|| format!("failed to open {}", cli.database.display()))?;
    let service = Service::with_cache(rest, sqlite, cli.sync_settings());

    match cli.command {
        Command::Sync { if_needed } => {
            let snapshot = if if_needed {
                service.sync_if_needed().await?
            } else {
                Some(service.force_sync().await?)
            };
            match snapshot {
                Some(snapshot) => println!(
                    "synced {} exercises at {}",
                    snapshot.exercise_count,
                    snapshot.last_synced.with_timezone(&Local)
                ),
                None => println!("exercise catalog is up to date"),
            }
        }
        Command::Status => {
            println!("exercises: {}", service.get_exercise_count().await?);
            match service.get_last_sync().await? {
                Some(last_sync) => println!("last sync: {}", last_sync.with_timezone(&Local)),
                None => println!("last sync: never"),
            }
            if let Some(sync) = service.catalog_sync() {
                let state = match sync.freshness(Utc::now()).await? {
                    Freshness::Fresh => "up to date",
                    Freshness::Stale => "sync due",
                };
                println!("state: {state}");
            }
        }
        Command::List {
            body_part,
            target,
            equipment,
            page,
        } => {
            let cursor = page.cursor();
            let exercises = if let Some(body_part) = body_part {
                service.get_exercises_by_body_part(&body_part, cursor).await?
            } else if let Some(target) = target {
                service.get_exercises_by_target(&target, cursor).await?
            } else if let Some(equipment) = equipment {
                service.get_exercises_by_equipment(&equipment, cursor).await?
            } else {
                service.get_exercises(cursor).await?
            };
            print_exercises(&exercises);
        }
        Command::Show { id } => {
            print_exercise(&service.get_exercise(&ExerciseID::new(&id)).await?);
        }
        Command::Search { query } => print_exercises(&service.search_exercises(&query).await?),
        Command::BodyParts => print_lines(&service.get_body_parts().await?),
        Command::Targets => print_lines(&service.get_targets().await?),
        Command::Equipment => print_lines(&service.get_equipment().await?),
        Command::ImageUrl { .. } => {}
    }

    Ok(())
}

fn print_exercises(exercises: &[Exercise]) {
    for exercise in exercises {
        println!(
            "{:>6}  {} ({}, {}, {})",
            exercise.id, exercise.name, exercise.body_part, exercise.target, exercise.equipment
        );
    }
}

fn print_exercise(exercise: &Exercise) {
    println!("{} ({})", exercise.name, exercise.id);
    println!("body part:  {}", exercise.body_part);
    println!("target:     {}", exercise.target);
    println!("equipment:  {}", exercise.equipment);
    if !exercise.secondary_muscles.is_empty() {
        println!("secondary:  {}", exercise.secondary_muscles.join(", "));
    }
    println!("difficulty: {}", exercise.difficulty);
    println!("category:   {}", exercise.category);
    if !exercise.description.is_empty() {
        println!("\n{}", exercise.description);
    }
    if !exercise.instructions.is_empty() {
        println!();
        for (n, step) in exercise.instructions.iter().enumerate() {
            println!("{}. {step}", n + 1);
        }
    }
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}
