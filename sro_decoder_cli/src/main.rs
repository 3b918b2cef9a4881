//! # sro_decoder_cli
//!
//! Command line front end for libsro_decoder. Decodes FADC250 streaming readout EVIO files
//! into JSON hit records.
//!
//! ## Use
//!
//! Make a template configuration, edit it, then run with it:
//!
//! ```bash
//! sro_decoder_cli -p config.yml new
//! sro_decoder_cli -p config.yml
//! ```
use clap::{Arg, Command};
use indicatif::{MultiProgress, ProgressBar};
use indicatif_log_bridge::LogWrapper;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use libsro_decoder::config::Config;
use libsro_decoder::process::process;
use libsro_decoder::worker_status::WorkerStatus;

fn make_template_config(path: &Path) -> std::io::Result<()> {
    let config = Config::default();
    let yaml_str = serde_yaml::to_string(&config).map_err(std::io::Error::other)?;
    let mut file = File::create(path)?;
    file.write_all(yaml_str.as_bytes())
}

fn init_logging(pb_manager: &MultiProgress, verbose: bool) {
    let level = if verbose {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };
    let logger = simplelog::TermLogger::new(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    if LogWrapper::new(pb_manager.clone(), logger)
        .try_init()
        .is_err()
    {
        eprintln!("Could not create logging/progress!");
    }
}

fn main() {
    // Create a cli
    let matches = Command::new("sro_decoder_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .required(true)
                .help("Path to the configuration file"),
        )
        .get_matches();

    let pb_manager = MultiProgress::new();

    // Parse the cli
    let config_path = match matches.get_one::<String>("path") {
        Some(p) => PathBuf::from(p),
        None => {
            eprintln!("A configuration path is required");
            return;
        }
    };

    if let Some(("new", _)) = matches.subcommand() {
        init_logging(&pb_manager, false);
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        match make_template_config(&config_path) {
            Ok(()) => log::info!("Done."),
            Err(e) => log::error!("Failed to write template config: {e}"),
        }
        return;
    }

    // Load our config. Verbosity comes from the config, so logging starts after.
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            return;
        }
    };
    init_logging(&pb_manager, config.verbose);
    log::info!("Config successfully loaded from {}.", config_path.to_string_lossy());
    for path in config.input_paths.iter() {
        log::info!("Input file: {}", path.to_string_lossy());
    }
    log::info!("Output Path: {}", config.output_path.to_string_lossy());
    match config.max_events {
        Some(max) => log::info!("Max events per file: {max}"),
        None => log::info!("Max events per file: all"),
    }
    log::info!("Number of threads: {}", config.n_threads);
    log::info!(
        "Tags -- streaming event: {:#06X}, stream info: {:#06X}, nested stream info: {:#06X}",
        config.tags.streaming_event,
        config.tags.stream_info,
        config.tags.nested_stream_info
    );

    // Setup the progress bar
    let pb = pb_manager.add(ProgressBar::new(100));
    let (tx, rx) = mpsc::channel::<WorkerStatus>();
    // Spawn the task!
    let handle = std::thread::spawn(move || process(config, tx));

    // The channel closes when the worker finishes and drops its sender
    for status in rx.iter() {
        pb.set_position((status.overall_progress() * 100.0) as u64);
    }

    match handle.join() {
        Ok(result) => match result {
            Ok(summary) => log::info!(
                "Successfully decoded data! {} of {} events accepted, {} hits.",
                summary.events_accepted,
                summary.events_seen,
                summary.total_hits()
            ),
            Err(e) => log::error!("Decoding failed with error: {e}"),
        },
        Err(_) => log::error!("Failed to join decoding task!"),
    }

    pb.finish();

    log::info!("Done.");
}
