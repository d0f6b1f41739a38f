use crate::commands::{load_config, open_pool, run_blocking, CommandResult};

pub fn run() -> CommandResult {
    let config = match load_config("migrate") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let outcome = run_blocking("migrate", async {
        let pool = open_pool(&config).await?;
        pool.close().await;
        Ok(())
    });

    match outcome {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err(result) => result,
    }
}
