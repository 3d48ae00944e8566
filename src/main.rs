use anyhow::Result;
use clap::Parser;
use tracing::error;

use meaning_scan::browser::print_scan_report;
use meaning_scan::{
    analyze_browser_history, export, init_default_config, load_config, utils, Args,
    HistorySource, ResultsStore, ScanReport,
};

fn run(args: &Args) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    config.validate()?;

    let store = match &config.store {
        Some(path) => ResultsStore::new(path),
        None => ResultsStore::default_location()?,
    };

    if args.clear {
        if store.clear()? {
            println!("Cleared stored results at {}", store.path().display());
        } else {
            println!("No stored results at {}", store.path().display());
        }
        return Ok(());
    }

    let report = if args.cached {
        let Some(result) = store.load()? else {
            println!("No stored results. Run a scan first.");
            return Ok(());
        };
        ScanReport {
            browser: config.browser.clone(),
            date_range: None,
            records_processed: 0,
            result,
        }
    } else {
        let source = HistorySource {
            history: args.history.clone(),
            temp_path: args.temp_path.clone(),
        };
        let report = analyze_browser_history(&config, &source)?;
        if !args.no_save {
            store.save(&report.result)?;
        }
        report
    };

    print_scan_report(&report, config.top, args.redact);

    if let Some(path) = &args.json {
        export::write_json(&report.result, path)?;
        println!("\nWrote {}", path.display());
    }
    if let Some(path) = &args.csv {
        export::write_csv(&report.result, path)?;
        println!("\nWrote {}", path.display());
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    utils::setup_logging(args.verbose);
    utils::validate_args(&args)?;

    if args.init {
        return init_default_config();
    }

    if let Err(e) = run(&args) {
        error!(error = %e, "Run failed");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
