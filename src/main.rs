use std::io::BufRead;
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use anyhow::Context;
use crossbeam_channel::Sender;

use grapple_audio::audio_system::{
    AudioSystemManager, ClipCatalog, HeadlessBackend, PlaybackBackend, PrefsStore, RodioBackend,
};
use grapple_audio::config::Config;
use grapple_audio::error::AppResult;
use grapple_audio::messaging::{AudioCommand, CommandExecutor, CommandResult};

struct Args {
    headless: bool,
    clips: Option<PathBuf>,
}

fn parse_args() -> AppResult<Args> {
    let mut args = Args {
        headless: false,
        clips: None,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--headless" => args.headless = true,
            "--clips" => {
                let dir = iter.next().context("--clips needs a directory")?;
                args.clips = Some(PathBuf::from(dir));
            }
            other => anyhow::bail!("Unknown argument '{}'", other),
        }
    }

    Ok(args)
}

fn initialize_tracing() {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Get log directory in user config folder
    let log_dir = dirs::config_dir()
        .map(|dir| dir.join("GrappleAudio").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    let file_appender = rolling::daily(&log_dir, "grapple-audio.log");

    // Configure filter (info level by default)
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true);

    // In debug builds, also log to console
    #[cfg(debug_assertions)]
    {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(console_layer)
            .init();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();
    }

    tracing::info!("Log directory: {}", log_dir.display());
}

/// Read console lines on a background thread and forward them as commands
fn spawn_console_reader(sender: Sender<AudioCommand>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }

            match line.parse::<AudioCommand>() {
                Ok(command) => {
                    if sender.send(command).is_err() {
                        break;
                    }
                }
                Err(e) => eprintln!("✗ {}", e),
            }
        }

        // EOF on stdin ends the session
        let _ = sender.send(AudioCommand::Quit);
    });
}

/// Drive the manager at a fixed frame interval until `quit`
fn run<B: PlaybackBackend>(
    backend: B,
    catalog: ClipCatalog,
    prefs: PrefsStore,
    config: &Config,
) -> AppResult<()> {
    let mut manager = AudioSystemManager::init(backend, catalog, prefs, config.pool_limits())
        .context("Failed to initialize audio system")?;
    manager.start();

    let events = manager.subscribe().0;
    let executor = CommandExecutor::new();
    spawn_console_reader(executor.sender());

    println!("Type commands (effect <name>, loop <name>, stop <slot>, music next, volume music 0.5, status, quit)\n");

    let interval = config.tick_interval();
    let mut last = Instant::now();
    loop {
        let running = executor.process_pending(&mut manager, |result| match result {
            CommandResult::Success => {}
            CommandResult::SuccessWithValue(value) => println!("{}", value),
            CommandResult::Error(e) => println!("✗ {}", e),
        });
        if !running {
            break;
        }

        let now = Instant::now();
        manager.tick(now - last);
        last = now;

        while let Ok(event) = events.try_recv() {
            tracing::trace!("{}", event.description());
        }

        thread::sleep(interval);
    }

    manager.shutdown();
    Ok(())
}

fn main() -> AppResult<()> {
    initialize_tracing();

    println!("===========================================");
    println!("  Grapple Audio - Mixer & Source Pool");
    println!("===========================================\n");

    let args = parse_args()?;

    let config = Config::load().context("Failed to load config")?;
    let config_dir = Config::config_dir()?;

    let clip_dir = args.clips.unwrap_or_else(|| config.clip_dir_in(&config_dir));
    let catalog = ClipCatalog::load_dir(&clip_dir)
        .with_context(|| format!("Failed to load clips from {}", clip_dir.display()))?;
    println!(
        "✓ Loaded {} music tracks and {} effects from {}",
        catalog.music().len(),
        catalog.effects().len(),
        clip_dir.display()
    );

    let prefs = PrefsStore::open(Config::prefs_path()?).context("Failed to open preferences")?;

    if args.headless {
        println!("✓ Headless backend (no audio output)\n");
        run(HeadlessBackend::new(), catalog, prefs, &config)
    } else {
        let backend = RodioBackend::new().context("Failed to open audio output device")?;
        println!("✓ Audio output ready\n");
        run(backend, catalog, prefs, &config)
    }
}
