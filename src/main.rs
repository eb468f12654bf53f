use clap::Parser;
use grid_emissions::core::{ConfigProvider, QueryOutcome, Storage};
use grid_emissions::domain::catalog::{display_choice, format_significant, unit_label};
use grid_emissions::utils::error::{EmissionsError, ErrorSeverity};
use grid_emissions::utils::{logger, validation::Validate};
use grid_emissions::{open_store, CliConfig, EmissionsQuery, LocalStorage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting grid-emissions");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = run(&cli).await {
        tracing::error!(
            "❌ Query failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run(cli: &CliConfig) -> Result<(), EmissionsError> {
    cli.validate()?;
    let settings = cli.settings()?;

    let store = open_store(settings.store_path())?;
    let engine = EmissionsQuery::from_config(store, &settings)?;
    tracing::info!("Active resolution strategy: {}", engine.active_strategy());

    let substance = settings.substance();

    if cli.list_sectors {
        for choice in engine.list_sectors(substance)? {
            println!("{}", display_choice(&choice));
        }
        return Ok(());
    }

    let point = cli.query_point()?;
    let sector = CliConfig::sector_choice(&settings);
    let outcome = engine.run(point, substance, &sector)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }

    if cli.export {
        if outcome.series.is_empty() {
            tracing::warn!("No data to export for this cell");
        } else {
            let artifact = engine.export(&outcome)?;
            let storage = LocalStorage::new(settings.output_path().to_string());
            let written = storage.write_file(&artifact.filename, &artifact.bytes).await?;
            tracing::info!("📁 Wrote {}", written);
            println!("📁 Wrote {}", written);
        }
    }

    Ok(())
}

fn print_outcome(outcome: &QueryOutcome) {
    let unit = unit_label(&outcome.substance);

    if let Some(point) = outcome.point {
        println!("Clicked (WGS84): {:.5}, {:.5}", point.lat, point.lon);
    }
    println!("Grid cell: {} ({})", outcome.cell, outcome.strategy);

    let value = match outcome.most_recent {
        Some(latest) => format!(
            "{} {} (in {})",
            format_significant(latest.emission, 6),
            unit,
            latest.year
        ),
        None => "n/a".to_string(),
    };
    println!(
        "Substance: {}, {}, {}",
        outcome.substance,
        outcome.effective.label(),
        value
    );

    for point in outcome.series.iter() {
        println!("  {}  {}", point.year, format_significant(point.emission, 6));
    }
}
