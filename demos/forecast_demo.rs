//! Demonstration of the AlertAir forecast pipeline.
//!
//! This example shows how to:
//! 1. Load the bundled model and normalizer
//! 2. Generate a synthetic observation series
//! 3. Forecast SO₂ three hours ahead and classify it
//! 4. Compare the default and four-level alert schemes
//! 5. Render the dashboard to the terminal
//!
//! Run with: cargo run --example forecast_demo

use std::sync::Arc;

use alertair::{
    core::{AlertScheme, ForecastArtifacts, Forecaster},
    dashboard::{render_text, DashboardBuilder},
    source::{DataSource, FixtureSource},
    tally::RenderTally,
    Config, DEMO_NOTICE,
};
use chrono::{Duration, Utc};

fn main() {
    println!("AlertAir - Forecast Demo");
    println!("========================");
    println!();
    println!("{DEMO_NOTICE}");
    println!();

    let config = Config::default();

    print!("Loading artifacts... ");
    let artifacts = match ForecastArtifacts::load(&config.model_path, &config.scaler_path) {
        Ok(artifacts) => {
            println!("OK ✓");
            Arc::new(artifacts)
        }
        Err(e) => {
            println!("FAILED ✗");
            println!("{e}");
            println!("Run this demo from the repository root.");
            return;
        }
    };

    let default_forecaster = Forecaster::new(
        Arc::clone(&artifacts),
        AlertScheme::default(),
        config.feature_columns.clone(),
        config.horizon_hours,
    );
    let who_forecaster = Forecaster::new(
        artifacts,
        AlertScheme::who_four_level(),
        config.feature_columns.clone(),
        config.horizon_hours,
    );

    // Walk a day of hourly renders over one synthetic week
    let source = FixtureSource::new(24 * 7, Utc::now(), 42);
    let table = match source.load() {
        Ok(table) => table,
        Err(e) => {
            println!("Error generating data: {e}");
            return;
        }
    };

    let tally = RenderTally::new();
    println!();
    println!("{:<18} {:>10} {:>10} {:>10}", "Issued", "SO2", "3-level", "4-level");
    for hours_back in (0..24).rev() {
        let partial = table.head(table.len() - hours_back);

        match (
            default_forecaster.forecast(&partial),
            who_forecaster.forecast(&partial),
        ) {
            (Ok(a), Ok(b)) => {
                tally.record_level(a.level);
                println!(
                    "{:<18} {:>10.1} {:>10} {:>10}",
                    a.issued_at.format("%d/%m %H:%M"),
                    a.value,
                    a.level.label(),
                    b.level.label()
                );
            }
            (Err(e), _) | (_, Err(e)) => {
                tally.record_failure();
                println!("Forecast failed: {e}");
            }
        }
    }
    println!();
    println!("{}", tally.summary());
    println!();

    match (
        default_forecaster.forecast(&table),
        DashboardBuilder::new(&config),
    ) {
        (Ok(forecast), Ok(builder)) => {
            let view = builder.build(&table, &forecast);
            println!("{}", render_text(&view));
        }
        (Err(e), _) => println!("Forecast failed: {e}"),
        (_, Err(e)) => println!("Config error: {e}"),
    }

    let next_update = Utc::now() + Duration::hours(1);
    println!("Next refresh at {}", next_update.format("%H:%M UTC"));
}

