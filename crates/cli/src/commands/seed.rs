use chrono::{Datelike, Utc};
use monthbook_core::Month;
use monthbook_db::{apply_demo_dataset, connect_with_settings, migrations, MonthStore, SeedReport};

use super::{CommandResult, StepFailure};

pub fn run() -> CommandResult {
    let (config, runtime) = match super::prepare("seed") {
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

        // An empty database gets its first open month before seeding.
        let months = MonthStore::new(pool.clone());
        let today = Utc::now();
        months
            .seed_initial(today.year(), today.month())
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let seeded: Result<String, StepFailure> = match months
            .latest_open()
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?
        {
            Some(month) => apply_demo_dataset(&pool, month.id)
                .await
                .map(|report| seed_message(&month, &report))
                .map_err(|error| ("seed_execution", error.to_string(), 5u8)),
            None => Err(("seed_execution", "no open month is available to seed".to_string(), 5u8)),
        };

        pool.close().await;
        seeded
    });

    super::finish("seed", outcome)
}

fn seed_message(month: &Month, report: &SeedReport) -> String {
    if report.categories_created == 0 && report.lines_created == 0 {
        return format!("demo dataset already present in {} {}", month.name(), month.year);
    }

    format!(
        "demo dataset applied to {} {}: {} categories created, {} budget lines created",
        month.name(),
        month.year,
        report.categories_created,
        report.lines_created
    )
}

#[cfg(test)]
mod tests {
    use monthbook_core::{Month, MonthState};
    use monthbook_db::SeedReport;

    use super::seed_message;

    #[test]
    fn seed_message_reports_created_counts() {
        let month = Month { id: 7, year: 2024, month: 3, state: MonthState::Open };
        let report = SeedReport { month_id: 7, categories_created: 4, lines_created: 6 };

        assert_eq!(
            seed_message(&month, &report),
            "demo dataset applied to March 2024: 4 categories created, 6 budget lines created"
        );
    }

    #[test]
    fn seed_message_notes_an_already_seeded_month() {
        let month = Month { id: 7, year: 2025, month: 12, state: MonthState::Open };
        let report = SeedReport { month_id: 7, categories_created: 0, lines_created: 0 };

        assert_eq!(seed_message(&month, &report), "demo dataset already present in December 2025");
    }
}
