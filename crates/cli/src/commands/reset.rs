use crate::commands::{load_config, open_pool, run_blocking, CommandResult};
use casenote_core::domain::thread::ThreadId;
use casenote_core::export::{ExportSink, JsonlExportLog};
use casenote_db::repositories::{SqlSummaryRepository, SummaryRepository};

pub fn run(thread_id: Option<&str>, all: bool) -> CommandResult {
    match (thread_id, all) {
        (None, false) => {
            return CommandResult::failure(
                "reset",
                "usage",
                "pass --thread-id <id> for a single thread or --all for a full reset",
                2,
            );
        }
        (Some(_), true) => {
            return CommandResult::failure(
                "reset",
                "usage",
                "--thread-id and --all are mutually exclusive",
                2,
            );
        }
        _ => {}
    }

    let config = match load_config("reset") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let outcome = run_blocking("reset", async {
        let pool = open_pool(&config).await?;
        let summaries = SqlSummaryRepository::new(pool.clone());

        let result = match thread_id {
            Some(thread_id) => {
                let removed = summaries
                    .delete_by_thread(&ThreadId(thread_id.to_string()))
                    .await
                    .map_err(|error| ("reset_execution", error.to_string(), 5u8))?;
                if removed {
                    Ok(format!("summary for thread `{thread_id}` deleted; export logs untouched"))
                } else {
                    Err(("not_found", format!("no summary found for thread `{thread_id}`"), 6u8))
                }
            }
            None => {
                let removed = summaries
                    .delete_all()
                    .await
                    .map_err(|error| ("reset_execution", error.to_string(), 5u8))?;
                truncate_log(JsonlExportLog::new(config.export.approved_summaries_path()))?;
                truncate_log(JsonlExportLog::new(config.export.crm_notes_path()))?;
                Ok(format!("{removed} summaries deleted; both export logs truncated"))
            }
        };
        pool.close().await;
        result
    });

    match outcome {
        Ok(message) => CommandResult::success("reset", message),
        Err(result) => result,
    }
}

fn truncate_log(log: JsonlExportLog) -> Result<(), (&'static str, String, u8)> {
    log.truncate().map_err(|error| ("export_truncate", error.to_string(), 5u8))
}
