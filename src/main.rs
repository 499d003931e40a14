/*!
 * Command-line interface for extractfs
 */

use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{CommandFactory, Parser};
use indicatif::{ProgressBar, ProgressStyle};

use extractfs::config::Args;
use extractfs::extractor::Extractor;
use extractfs::report::{ReportFormat, Reporter};
use extractfs::settings::Settings;
use extractfs::utils::count_files;

fn main() -> ExitCode {
    // Parse command line arguments
    let args = Args::parse();

    if let Some(shell) = args.generate {
        let mut cmd = Args::command();
        let name = cmd.get_name().to_string();
        clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
        return ExitCode::SUCCESS;
    }

    setup_logging(args.verbose, args.quiet);

    // Defaults < settings file < flags
    let mut settings = Settings::load();
    settings.apply_args(&args);
    let config = settings.to_config();
    let output = settings.output_path();

    // Ctrl-C stops the run between two files
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        if let Err(e) = ctrlc::set_handler(move || cancel.store(true, Ordering::SeqCst)) {
            tracing::warn!("Failed to install Ctrl-C handler: {}", e);
        }
    }

    // Create progress bar with advanced Unicode styling
    let progress = ProgressBar::new(count_files(Path::new(&args.path)));
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} {prefix:.bold.cyan} {wide_msg:.dim.white} {pos}/{len} ({percent}%) ⏱️  Elapsed: {elapsed_precise}",
    ) {
        progress.set_style(style);
    }
    progress.enable_steady_tick(Duration::from_millis(100));
    progress.set_prefix("📊 Extracting");

    let extractor = Extractor::new(config).with_cancel_flag(cancel);

    let start_time = Instant::now();
    let mut on_progress = |delta: u64, description: &str| {
        progress.inc(delta);
        progress.set_message(description.to_string());
    };
    let outcome = extractor.extract(&args.path, &output, Some(&mut on_progress));
    let duration = start_time.elapsed();

    progress.finish_and_clear();

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    let format = if args.json {
        ReportFormat::Json
    } else {
        ReportFormat::ConsoleTable
    };
    if let Err(e) = Reporter::new(format).print_report(&result, duration) {
        eprintln!("Error: {}", e);
        return ExitCode::from(2);
    }

    if args.save_config {
        match settings.save() {
            Ok(path) => eprintln!("Settings saved to {}", path.display()),
            Err(e) => eprintln!("Warning: {}", e),
        }
    }

    ExitCode::SUCCESS
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    // Keep ignore/globset internals quiet below trace
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info,ignore=warn,globset=warn"),
            2 => tracing_subscriber::EnvFilter::new("debug,ignore=warn,globset=warn"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}
