use std::fs::File;
use std::io::BufWriter;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use kviz::cli::Args;
use kviz::export::ChromeTraceExporter;
use kviz::{load_file, IngestOptions};

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env().filter_level(level).init();

    let options = IngestOptions { text: args.text, pair_policy: args.pair_policy };
    let (trace, stats) = load_file(&args.trace, &options, args.limit)
        .with_context(|| format!("cannot open '{}'", args.trace.display()))?;

    if args.stats {
        stats.dump();
    }

    if let Some(path) = &args.export {
        let exporter = ChromeTraceExporter::from_trace(&trace);
        let file =
            File::create(path).with_context(|| format!("cannot create '{}'", path.display()))?;
        exporter.export(BufWriter::new(file)).context("failed to export trace")?;
        println!("exported {} events to {}", exporter.event_count(), path.display());
    }

    let tracks: usize = trace.groups().map(|g| g.track_indices().len()).sum();
    println!(
        "{} groups, {tracks} tracks, {} records ({} errors)",
        trace.groups().count(),
        stats.events,
        stats.errors
    );
    Ok(())
}
