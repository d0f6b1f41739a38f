use std::fs;
use std::path::Path;

use crate::commands::{load_config, open_pool, run_blocking, CommandResult};
use casenote_db::repositories::SqlThreadRepository;
use casenote_db::{ingest_threads, sample_threads};

pub fn run(file: Option<&Path>) -> CommandResult {
    let config = match load_config("ingest") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let (threads, source) = match file {
        Some(path) => {
            let raw = match fs::read_to_string(path) {
                Ok(raw) => raw,
                Err(error) => {
                    return CommandResult::failure(
                        "ingest",
                        "threads_file",
                        format!("could not read `{}`: {error}", path.display()),
                        2,
                    );
                }
            };
            match casenote_db::fixtures::parse_threads_file(&raw) {
                Ok(threads) => (threads, path.display().to_string()),
                Err(error) => {
                    return CommandResult::failure(
                        "ingest",
                        "threads_file",
                        format!("could not parse `{}`: {error}", path.display()),
                        2,
                    );
                }
            }
        }
        None => (sample_threads(), "bundled samples".to_string()),
    };

    let outcome = run_blocking("ingest", async {
        let pool = open_pool(&config).await?;
        let repo = SqlThreadRepository::new(pool.clone());
        let result = ingest_threads(&repo, threads)
            .await
            .map_err(|error| ("ingest_execution", error.to_string(), 5u8));
        pool.close().await;
        result
    });

    match outcome {
        Ok(result) => CommandResult::success(
            "ingest",
            format!(
                "ingested threads from {source}: {} created, {} updated",
                result.created, result.updated
            ),
        ),
        Err(result) => result,
    }
}
