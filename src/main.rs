use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{debug, info};
use tokio::sync::watch;

use glance::auth::{self, TokenData};
use glance::calendar::{calendar_task, CalendarClient, CalendarSnapshot, FetchRequest};
use glance::clock::Clock;
use glance::config::{self, Config};
use glance::device::{Device, Screen};
use glance::state::MirrorState;
use glance::touch;
use glance::weather::{weather_task, WeatherClient};

#[derive(Parser)]
#[command(name = "glance", version, about = "Clock, weather and calendar on a framebuffer panel")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Drive the mirror on the configured panel.
    Run {
        /// Config file instead of the default location.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Sign in to Google Calendar with the device flow.
    Auth {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the resolved configuration and token state.
    Status {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Run { config } => run(config.as_deref()),
        Command::Auth { config } => authorize(config.as_deref()),
        Command::Status { config } => status(config.as_deref()),
    }
}

fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let path = Config::path(config_path)?;
    let config = Config::load(&path)?;
    // The local offset lookup refuses multithreaded processes, so it
    // happens before the runtime brings up its workers.
    let clock = Clock::detect(config.clock.utc_offset_hours);
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    info!("glance {} starting", env!("CARGO_PKG_VERSION"));
    runtime.block_on(run_loop(config, clock))
}

async fn run_loop(config: Config, clock: Clock) -> anyhow::Result<()> {
    let screen = Screen::new(&config.display)?;
    let touch = touch::spawn_reader(config.touch.clone(), config.display.width, config.display.height)?;

    let (weather_tx, weather_rx) = watch::channel(None);
    let (calendar_tx, calendar_rx) = watch::channel(CalendarSnapshot::default());
    // Seeding the channel makes today's month the first fetch.
    let today = clock.now().date();
    let (fetch_tx, fetch_rx) = watch::channel(FetchRequest {
        year: today.year(),
        month: u8::from(today.month()),
    });

    tokio::spawn(weather_task(WeatherClient::new(config.weather.clone()), clock, weather_tx));
    tokio::spawn(calendar_task(
        CalendarClient::new(config.calendar.clone()),
        clock,
        calendar_tx,
        fetch_rx,
    ));

    let mut device = Device::new(clock, screen, touch, weather_rx, calendar_rx, fetch_tx);

    let mut state = MirrorState::startup(&mut device);
    state.draw(&mut device).await?;
    loop {
        let next = state.next(&mut device).await;
        debug!("{:?} -> {:?}", state, next);
        if next != state {
            next.draw(&mut device).await?;
        }
        state = next;
    }
}

fn authorize(config_path: Option<&Path>) -> anyhow::Result<()> {
    let path = Config::path(config_path)?;
    let config = Config::load(&path)?;
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime
        .block_on(auth::device_flow(&config.calendar))
        .context("device sign-in did not complete")
}

fn status(config_path: Option<&Path>) -> anyhow::Result<()> {
    let path = Config::path(config_path)?;
    let config = Config::load(&path)?;

    println!("config:   {}", path.display());
    println!(
        "display:  {} ({}x{}, {} bpp)",
        config.display.device.display(),
        config.display.width,
        config.display.height,
        config.display.bpp
    );
    println!("touch:    {}", config.touch.device.display());
    println!(
        "weather:  {} ({})",
        config.weather.city,
        if config.weather.api_key.is_empty() { "no api key" } else { "api key set" }
    );
    println!(
        "calendar: {} ({})",
        config.calendar.calendar_id,
        if config.calendar.client_id.is_empty() { "no oauth client" } else { "oauth client set" }
    );

    let token_path = config::token_path()?;
    match TokenData::load(&token_path) {
        Ok(token) => {
            let expiry = token
                .expires_at()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "unknown".into());
            println!("token:    stored at {}, expires {}", token_path.display(), expiry);
        }
        Err(err) => println!("token:    {err}"),
    }
    Ok(())
}
