//! Reel - three-reel slot mini-game in the terminal
//!
//! Usage:
//!   reel play              - Spin against the mock server
//!   reel simulate          - Batch outcome simulation, no animation
//!   reel config            - Print the default configuration
//!
//! While playing, type `m` to toggle sound or `q` to stop after the current spin.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;

use reel_engine::{MockServer, SpinConfig, SpinController, Stage, TimingConfig, TimingProfile};
use reel_stage::TraceCollection;

use reel_cli::presenter::{PlayerInput, SoundBoard, TerminalPresenter, reaction_player};

/// Keeps the server's RNG stream apart from the controller's for one seed
const SERVER_STREAM: u64 = 0x5EED_5E4E;

#[derive(Parser)]
#[command(name = "reel", about = "Three-reel slot mini-game")]
struct Cli {
    /// Debug logging (RUST_LOG still wins)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Spin against the mock server
    Play {
        /// Number of spins
        #[arg(short = 'n', long, default_value_t = 3)]
        spins: u32,
        /// Seed for reproducible spins
        #[arg(long)]
        seed: Option<u64>,
        /// JSON or YAML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Timing profile
        #[arg(short, long, value_enum)]
        profile: Option<Profile>,
        /// Abort a spin whose outcome takes longer than this
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Start with sound off
        #[arg(long)]
        mute: bool,
        /// Host supports skeletal animation
        #[arg(long)]
        skeletal: bool,
        /// Print every cosmetic tick
        #[arg(long)]
        show_ticks: bool,
        /// Write spin traces to this JSON file
        #[arg(long)]
        trace: Option<PathBuf>,
    },
    /// Run the outcome generator without animation
    Simulate {
        /// Number of outcomes
        #[arg(short = 'n', long, default_value_t = 100_000)]
        spins: u64,
        #[arg(long)]
        seed: Option<u64>,
        /// Override the reel count
        #[arg(long)]
        reels: Option<usize>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the default configuration
    Config {
        /// JSON instead of YAML
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Profile {
    Normal,
    Turbo,
    Studio,
}

impl From<Profile> for TimingProfile {
    fn from(profile: Profile) -> Self {
        match profile {
            Profile::Normal => TimingProfile::Normal,
            Profile::Turbo => TimingProfile::Turbo,
            Profile::Studio => TimingProfile::Studio,
        }
    }
}

struct PlayOptions {
    spins: u32,
    mute: bool,
    skeletal: bool,
    show_ticks: bool,
    trace: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Play {
            spins,
            seed,
            config,
            profile,
            timeout_ms,
            mute,
            skeletal,
            show_ticks,
            trace,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(seed) = seed {
                config.seed = Some(seed);
            }
            if let Some(profile) = profile {
                config.timing = TimingConfig::from_profile(profile.into());
            }
            if timeout_ms.is_some() {
                config.outcome_timeout_ms = timeout_ms;
            }
            let options = PlayOptions {
                spins,
                mute,
                skeletal,
                show_ticks,
                trace,
            };
            play(config, options).await
        }
        Commands::Simulate {
            spins,
            seed,
            reels,
            config,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(reels) = reels {
                config.reel_count = reels;
            }
            simulate(&config, spins, seed.or(config.seed))
        }
        Commands::Config { json } => {
            let config = SpinConfig::default();
            let text = if json { config.to_json()? } else { config.to_yaml()? };
            println!("{text}");
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<SpinConfig> {
    match path {
        Some(path) => SpinConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(SpinConfig::default()),
    }
}

async fn play(config: SpinConfig, options: PlayOptions) -> Result<()> {
    if options.spins == 0 {
        bail!("nothing to play: --spins must be at least 1");
    }

    let seed = config.seed;
    let profile = config.timing.profile;
    let generator = config.generator()?;
    let server = match config.seed {
        Some(seed) => MockServer::seeded(generator, config.latency, seed ^ SERVER_STREAM),
        None => MockServer::new(generator, config.latency),
    };
    let (controller, handle) = SpinController::new(config, server)?;
    let mut events = handle.subscribe();
    let mut spinning = handle.watch_spinning();
    let controller_task = controller.spawn();

    let mut presenter = TerminalPresenter::new(
        io::stdout(),
        SoundBoard::new(!options.mute),
        reaction_player(options.skeletal),
        options.show_ticks,
    );
    presenter.show_trigger(true)?;
    println!("type 'm' + Enter to toggle sound, 'q' + Enter to stop");
    let mut inputs = spawn_input_reader();
    let mut input_open = true;

    let mut recorded = Vec::new();
    let mut remaining = options.spins - 1;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;
    handle.trigger()?;

    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => {
                    presenter.on_event(&event)?;
                    let available = matches!(event.stage, Stage::SpinAvailable);
                    recorded.push(event);
                    if available {
                        if remaining == 0 {
                            break;
                        }
                        remaining -= 1;
                        handle.trigger()?;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("[Presenter] fell behind, {skipped} events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            changed = spinning.changed() => {
                if changed.is_err() {
                    break;
                }
                let in_progress = *spinning.borrow_and_update();
                presenter.show_trigger(!in_progress)?;
            }
            input = inputs.recv(), if input_open => match input {
                Some(PlayerInput::ToggleSound) => {
                    presenter.toggle_sound()?;
                }
                Some(PlayerInput::Quit) => {
                    log::info!("[Presenter] stopping after the current spin");
                    remaining = 0;
                }
                None => input_open = false,
            },
            signal = &mut ctrl_c, if !interrupted => {
                signal.context("listening for ctrl-c")?;
                log::info!("[Presenter] interrupted, cancelling spin");
                interrupted = true;
                remaining = 0;
                handle.cancel();
            }
        }
    }

    handle.shutdown();
    controller_task.await.context("spin controller panicked")?;

    let stats = handle.snapshot().stats;
    println!(
        "{} spins: {} wins, {} losses, {} aborted ({:.1}% hit rate)",
        stats.total_spins,
        stats.wins,
        stats.losses,
        stats.aborted,
        stats.hit_rate()
    );

    if let Some(path) = options.trace {
        let traces = TraceCollection::from_events(recorded)
            .with_metadata("seed", serde_json::json!(seed))
            .with_metadata("profile", serde_json::json!(profile));
        write_traces(&path, &traces)?;
    }
    Ok(())
}

/// Read player commands off stdin.
///
/// Runs on a plain thread: a blocking stdin read cannot be cancelled, and the
/// process may exit while it is parked.
fn spawn_input_reader() -> mpsc::UnboundedReceiver<PlayerInput> {
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in io::stdin().lines() {
            let Ok(line) = line else { break };
            match PlayerInput::parse(&line) {
                Some(input) => {
                    if input_tx.send(input).is_err() {
                        break;
                    }
                }
                None => log::debug!("[Presenter] unknown input {line:?}"),
            }
        }
    });
    input_rx
}

fn write_traces(path: &Path, traces: &TraceCollection) -> Result<()> {
    for trace in &traces.traces {
        let validation = trace.validate();
        for warning in validation.warnings() {
            log::warn!("[Trace] {}: {warning}", trace.trace_id);
        }
    }

    let json = serde_json::to_string_pretty(traces).context("serializing traces")?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    log::info!("[Trace] {} traces written to {}", traces.len(), path.display());
    Ok(())
}

fn simulate(config: &SpinConfig, spins: u64, seed: Option<u64>) -> Result<()> {
    config.validate()?;
    let generator = config.generator()?;
    let mut rng = match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_os_rng(),
    };

    let report = generator.simulate(config.reel_count, spins, &mut rng)?;
    println!(
        "{} spins on {} reels, {} symbols",
        report.spins, report.reel_count, report.catalog_size
    );
    println!("  wins     {:>10}", report.wins);
    println!("  losses   {:>10}", report.losses());
    println!("  observed {:>9.3}%", report.win_rate() * 100.0);
    println!("  expected {:>9.3}%", report.expected_win_rate * 100.0);
    Ok(())
}
