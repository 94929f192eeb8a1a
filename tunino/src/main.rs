use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use mpd_client::MpdConnector;
use tracing::info;

use tunino::config::{Config, ConfigLoader};
use tunino::logging::{init_logging, LoggingMode};
use tunino::{Inputs, Supervisor, SoxAplaySound, SystemClock, SystemPower};

/// Button and RFID front-end for MPD
#[derive(Parser, Debug)]
#[command(name = "tunino")]
#[command(about = "Physical controls for an MPD jukebox")]
#[command(version)]
pub struct Args {
    /// Settings file, may be repeated; later files override earlier ones
    #[arg(short, long = "config", value_name = "FILE")]
    pub configs: Vec<PathBuf>,

    /// Settings environment section
    #[arg(short, long)]
    pub env: Option<String>,

    /// MPD configuration to read music_directory from
    #[arg(long, value_name = "FILE")]
    pub mpd_conf: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); overrides log_level
    #[arg(long)]
    pub log_level: Option<String>,

    /// Include thread names and source locations in log lines
    #[arg(short, long)]
    pub verbose: bool,

    /// Validate configuration, print the tag map and exit
    #[arg(long)]
    pub check: bool,
}

impl Args {
    fn loader(&self) -> ConfigLoader {
        let mut loader = ConfigLoader::new();
        if !self.configs.is_empty() {
            loader = loader.with_files(self.configs.clone());
        }
        if let Some(env) = &self.env {
            loader = loader.with_environment(env.clone());
        }
        if let Some(mpd_conf) = &self.mpd_conf {
            loader = loader.with_mpd_conf(mpd_conf.clone());
        }
        loader
    }

    fn logging_mode(&self) -> LoggingMode {
        if self.verbose {
            LoggingMode::Verbose
        } else {
            LoggingMode::Compact
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = args.loader().load().context("Failed to load configuration")?;
    let level = args.log_level.as_deref().unwrap_or(&config.settings.log_level);
    init_logging(args.logging_mode(), level).context("Failed to initialize logging")?;

    if args.check {
        print_summary(&config);
        return Ok(());
    }

    let settings = &config.settings;
    info!("Starting tunino {}", env!("CARGO_PKG_VERSION"));

    let connector = MpdConnector::new(settings.mpd_host.clone(), settings.mpd_port);
    let sound = SoxAplaySound::new(
        settings.assets_dir.clone(),
        settings.sound_device.clone(),
        settings.sound_volume,
    );
    let power = SystemPower::new(settings.poweroff_command.clone());
    let inputs = open_inputs(&config)?;

    let config = Arc::new(config);
    let supervisor = Supervisor::connect(
        config,
        Box::new(connector),
        Arc::new(sound),
        Arc::new(power),
        Arc::new(SystemClock),
    )
    .context("Failed to connect to MPD")?;

    supervisor.run(inputs).context("Failed to start workers")?;
    Ok(())
}

#[cfg(feature = "rpi")]
fn open_inputs(config: &Config) -> Result<Inputs> {
    use tunino_hardware::{DigitalInput, GpioButton, InputChannel, Mfrc522Reader};

    let settings = &config.settings;
    let button = |channel: InputChannel| {
        GpioButton::open(channel)
            .map(|b| Box::new(b) as Box<dyn DigitalInput>)
            .with_context(|| format!("Failed to open button on {}", channel))
    };

    Ok(Inputs {
        play_pause: button(settings.play_pause_channel())?,
        volume_up: button(settings.volume_up_channel())?,
        volume_down: button(settings.volume_down_channel())?,
        power_off: button(settings.poweroff_channel())?,
        reader: Box::new(Mfrc522Reader::open().context("Failed to open RFID reader")?),
    })
}

#[cfg(not(feature = "rpi"))]
fn open_inputs(_config: &Config) -> Result<Inputs> {
    anyhow::bail!("tunino was built without the rpi feature; no input hardware available")
}

fn print_summary(config: &Config) {
    let settings = &config.settings;
    println!("MPD:          {}:{}", settings.mpd_host, settings.mpd_port);
    println!("Play/pause:   {}", settings.play_pause_channel());
    println!("Volume up:    {}", settings.volume_up_channel());
    println!("Volume down:  {}", settings.volume_down_channel());
    println!("Power-off:    {}", settings.poweroff_channel());
    println!("Volume:       initial {}, step {}", settings.initial_volume, settings.volume_step);
    println!("Sound device: {} (gain {})", settings.sound_device, settings.sound_volume);

    let mut tracks: Vec<_> = config.tracks.iter().collect();
    tracks.sort();
    println!("Tags:         {}", tracks.len());
    for (tag, track) in tracks {
        println!("  {} -> {}", tag, track);
    }
}
