use anyhow::Context;
use clap::Parser;
use img_batch::cancel::{cancel_on_interrupt, CancelToken};
use img_batch::cli::{build_config, Args, Commands};
use img_batch::{logger, run_batch, BatchConfig};
use tracing::warn;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init(args.quiet, args.verbose);
    let show_progress = !args.quiet && args.verbose == 0;

    let (config, report_path) = match args.command {
        Commands::Batch {
            input,
            output,
            recursive,
            jobs,
            run,
        } => {
            let config = build_config(input, output, recursive, &jobs, &run, show_progress)?;
            (config, run.report)
        }
        Commands::File {
            input,
            output,
            jobs,
            run,
        } => {
            if !input.is_file() {
                anyhow::bail!("{:?} is not a file", input);
            }
            let config = build_config(input, output, false, &jobs, &run, show_progress)?;
            (config.single_file(), run.report)
        }
    };

    execute(&config, report_path.as_deref(), args.quiet)
}

fn execute(config: &BatchConfig, report_path: Option<&std::path::Path>, quiet: bool) -> anyhow::Result<()> {
    let cancel = CancelToken::new();
    if let Err(e) = cancel_on_interrupt(cancel.clone()) {
        warn!("Ctrl-C handling unavailable: {}", e);
    }

    let report = run_batch(config, &cancel)
        .with_context(|| format!("batch over {:?} failed", config.input))?;

    if let Some(path) = report_path {
        report
            .write_json(path)
            .with_context(|| format!("cannot write report to {:?}", path))?;
    }

    if !quiet {
        if report.files.is_empty() {
            println!("⚠️  No image files found in {:?}", config.input);
        } else {
            report.print_summary();
        }
    }

    Ok(())
}
