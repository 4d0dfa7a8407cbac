//! polyvoice - terminal music keyboard
//!
//! Run with: cargo run -- --waveform square --octave 3

mod app;
mod ui;

use std::{
    fs::File,
    io::{self, Write},
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result as EyreResult, WrapErr};
use polyvoice::{dsp::Waveform, io::list_devices, EngineConfig, Settings};
use tracing_subscriber::EnvFilter;

use app::App;

/// Set while the TUI owns the terminal; stderr logging is muted meanwhile.
static TUI_ACTIVE: AtomicBool = AtomicBool::new(false);

#[derive(Parser)]
#[clap(version, about = "A polyphonic terminal keyboard.")]
struct Cli {
    #[clap(subcommand)]
    command: Option<Commands>,

    /// Starting waveform: sine, square, sawtooth or triangle.
    #[arg(short, long, default_value = "sine")]
    waveform: Waveform,
    /// Peak level of each note, 0.0 to 1.0.
    #[arg(short, long, default_value_t = 0.3)]
    volume: f32,
    /// Attack time in seconds, 0.0 to 1.0.
    #[arg(short, long, default_value_t = 0.01)]
    attack: f32,
    /// Release time in seconds, 0.0 to 2.0.
    #[arg(short, long, default_value_t = 0.3)]
    release: f32,
    /// Octave of the leftmost key, 1 to 7.
    #[arg(short, long, default_value_t = 4)]
    octave: i32,
    /// Voice pool size.
    #[arg(long, default_value_t = 16)]
    max_voices: usize,
    /// Output device name. Defaults to the system output.
    #[arg(short, long)]
    device: Option<String>,
    /// Write logs here instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    if let Some(Commands::Devices {}) = cli.command {
        let devices = list_devices()?;
        if devices.is_empty() {
            println!("No output devices found.");
            return Ok(());
        }
        println!("Devices (count: {}):", devices.len());
        for device in devices {
            println!("- {device}");
        }
        return Ok(());
    }

    let settings = Settings::new()
        .with_waveform(cli.waveform)
        .with_peak_level(cli.volume)
        .with_attack(cli.attack)
        .with_release(cli.release)
        .with_octave(cli.octave);
    let config = EngineConfig {
        max_voices: cli.max_voices,
        ..EngineConfig::default()
    };

    let mut app = App::new(settings, config, cli.device);

    let mut terminal = ratatui::init();
    TUI_ACTIVE.store(true, Ordering::Relaxed);
    let result = app.run(&mut terminal);
    TUI_ACTIVE.store(false, Ordering::Relaxed);
    ratatui::restore();

    result
}

fn init_logging(log_file: Option<&std::path::Path>) -> EyreResult<()> {
    match log_file {
        Some(path) => {
            let file = File::create(path)
                .wrap_err_with(|| format!("failed to create log file {}", path.display()))?;
            let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new("warn"))
                .with_writer(|| -> Box<dyn Write> {
                    if TUI_ACTIVE.load(Ordering::Relaxed) {
                        Box::new(io::sink())
                    } else {
                        Box::new(io::stderr())
                    }
                })
                .init();
        }
    }
    Ok(())
}
