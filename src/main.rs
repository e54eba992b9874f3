use std::io::{self, IsTerminal};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{HumanCount, ProgressBar, ProgressStyle};
use log::{LevelFilter, debug, error, info};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use time::macros::format_description;

use treehash::{
    Cli, Config, DigestGroups, Mode, Settings, WalkHandle, format_human_elapsed, spawn_hash_files, spawn_walk,
    stream_listing, write_report, write_report_json,
};

fn init_logger(level: LevelFilter) -> Result<()> {
    let mut builder = ConfigBuilder::new();
    builder.set_time_format_custom(format_description!(
        "[hour]:[minute]:[second].[subsecond digits:3]"
    ));
    // falls back to UTC when the local offset cannot be determined
    let _ = builder.set_time_offset_to_local();
    TermLogger::init(level, builder.build(), TerminalMode::Stderr, ColorChoice::Auto)
        .context("Failed to initialize logger")
}

fn hashing_spinner(settings: &Settings) -> Result<ProgressBar> {
    if settings.log_level < LevelFilter::Info {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} {human_pos} files")
            .context("Invalid spinner template")?,
    );
    pb.set_message("Hashing...");
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn run_listing(handle: WalkHandle, settings: &Settings, color: bool) -> Result<()> {
    let mut out = io::stdout().lock();
    let written = stream_listing(&mut out, handle.entries(), settings.json, color);
    let walked = handle.finish();

    let written = written.context("Failed to write listing")?;
    let summary = walked?;
    debug!("Listed {} of {} files", written, summary.files);
    Ok(())
}

fn run_duplicates(handle: WalkHandle, settings: &Settings, color: bool) -> Result<()> {
    let spinner = hashing_spinner(settings)?;
    let groups: DigestGroups = handle.entries().inspect(|_| spinner.inc(1)).collect();
    spinner.finish_and_clear();

    // a failed walk never produces a report
    let summary = handle.finish()?;
    info!(
        "Received {} entries for {} files",
        HumanCount(groups.len() as u64),
        HumanCount(summary.files)
    );

    let duplicates = groups.into_duplicates();
    let mut out = io::stdout().lock();
    let written = if settings.json {
        write_report_json(&mut out, &duplicates)
    } else {
        write_report(&mut out, &duplicates, color)
    };
    written.context("Failed to write duplicate report")
}

fn run(cli: &Cli, settings: &Settings) -> Result<()> {
    let handle = if settings.files {
        spawn_hash_files(cli.paths.clone(), &settings.walk)?
    } else {
        spawn_walk(cli.paths[0].clone(), &settings.walk)?
    };

    let color = settings.color && io::stdout().is_terminal();
    match settings.mode {
        Mode::Listing => run_listing(handle, settings, color),
        Mode::Duplicates => run_duplicates(handle, settings, color),
    }
}

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse_args();

    let config = Config::discover(cli.config.as_deref())?;
    let settings = Settings::resolve(&cli, config)?;
    init_logger(settings.log_level)?;

    info!("Starting treehash v{}", env!("CARGO_PKG_VERSION"));
    debug!("Command line arguments: {:?}", cli);
    debug!("Resolved settings: {:?}", settings);

    if let Err(err) = run(&cli, &settings) {
        error!("{err:#}");
        return Err(err);
    }

    info!("Completed in {}", format_human_elapsed(start_time.elapsed()));
    Ok(())
}
