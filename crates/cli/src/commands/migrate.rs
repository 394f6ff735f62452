use monthbook_db::{connect_with_settings, migrations};

use super::CommandResult;

pub fn run() -> CommandResult {
    let (config, runtime) = match super::prepare("migrate") {
        Ok(ready) => ready,
        Err(result) => return result,
    };

    let outcome = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        pool.close().await;
        Ok(format!("applied pending migrations using `{}`", config.database.url))
    });

    super::finish("migrate", outcome)
}
