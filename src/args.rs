// Commandline argument parser using clap for lagscope

use crate::config::ScopeConfig;
use crate::demux::Polarity;
use crate::sink::SinkMode;
use crate::window::WindowKind;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct ScopeArgs {
    #[command(subcommand)]
    /// What to do: list devices, run a fixed number of cycles, or watch live
    pub command: CommandTask,

    /// RON file with settings; flags below override it
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Samples per channel in one chunk (the chunk is 4x this many bytes)
    #[arg(short = 'n', long = "samples")]
    pub samples: Option<usize>,

    /// Window applied before the transform
    #[arg(short = 'w', long = "window", value_enum)]
    pub window: Option<WindowKind>,

    /// Sign-invert channel 2 after DC removal
    #[arg(long = "invert-ch2", conflicts_with = "normal_ch2")]
    pub invert_ch2: bool,

    /// Leave channel 2 as decoded
    #[arg(long = "normal-ch2")]
    pub normal_ch2: bool,

    /// Which series to hand to the output
    #[arg(long = "sink", value_enum)]
    pub sink: Option<SinkMode>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum CommandTask {
    /// List the serial devices on this machine
    #[command(about)]
    Ports,

    /// Run a fixed number of cycles and log what came out
    #[command(about)]
    Batch(BatchCommand),

    /// Plot the lag sequence in the terminal until a key is pressed
    #[command(about)]
    Live(LiveCommand),
}

#[derive(Debug, Args, Clone)]
pub struct BatchCommand {
    /// Number of read cycles to run
    #[arg(short = 'k', long = "cycles", default_value_t = 100)]
    pub cycles: u64,

    #[command(subcommand)]
    pub source: SourceCommand,
}

#[derive(Debug, Args, Clone)]
pub struct LiveCommand {
    #[command(subcommand)]
    pub source: SourceCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum SourceCommand {
    /// Read from the microphone front end over a serial link
    Serial(SerialArgs),

    /// Replay a raw byte capture from a file
    Replay(ReplayArgs),

    /// Use a simulated front end
    Simulate(SimulateArgs),
}

#[derive(Debug, Args, Clone)]
pub struct SerialArgs {
    /// Device path, e.g. /dev/ttyUSB0
    #[arg(short = 'p', long = "port")]
    pub port: Option<String>,

    /// Link rate in baud
    #[arg(short = 'b', long = "baud")]
    pub baud: Option<u32>,
}

#[derive(Debug, Args, Clone)]
pub struct ReplayArgs {
    /// File holding raw bytes as they came off the wire
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Samples by which channel 2 lags channel 1 (negative: leads)
    #[arg(short = 'd', long = "delay", default_value_t = 0, allow_hyphen_values = true)]
    pub delay: i64,

    /// Independent noise per microphone, in ADC counts
    #[arg(long = "noise", default_value_t = 5.0)]
    pub noise: f64,

    /// Samples between marker frames, 0 for none
    #[arg(short = 'm', long = "marker-every", default_value_t = 1000)]
    pub marker_every: usize,

    /// Throttle to the configured link rate
    #[arg(long = "paced")]
    pub paced: bool,

    /// Seed for the simulated signal
    #[arg(long = "seed")]
    pub seed: Option<u64>,
}

impl ScopeArgs {
    /// Writes every flag that was given over the corresponding field of
    /// `config`.
    pub fn apply(&self, config: &mut ScopeConfig) {
        if let Some(samples) = self.samples {
            config.samples_per_chunk = samples;
        }
        if let Some(window) = self.window {
            config.window = window;
        }
        if self.invert_ch2 {
            config.polarity = Polarity::InvertChannel2;
        }
        if self.normal_ch2 {
            config.polarity = Polarity::Normal;
        }
        if let Some(sink) = self.sink {
            config.sink = sink;
        }

        let source = match &self.command {
            CommandTask::Batch(BatchCommand { source, .. }) => Some(source),
            CommandTask::Live(LiveCommand { source }) => Some(source),
            CommandTask::Ports => None,
        };
        if let Some(SourceCommand::Serial(serial)) = source {
            if let Some(port) = &serial.port {
                config.port = Some(port.clone());
            }
            if let Some(baud) = serial.baud {
                config.baud_rate = baud;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_serial_overrides_config() {
        let args = ScopeArgs::try_parse_from([
            "lagscope",
            "--samples",
            "256",
            "--normal-ch2",
            "--window",
            "hann",
            "batch",
            "--cycles",
            "7",
            "serial",
            "--port",
            "/dev/ttyUSB1",
            "--baud",
            "115200",
        ])
        .unwrap();

        let mut config = ScopeConfig::default();
        args.apply(&mut config);
        assert_eq!(config.samples_per_chunk, 256);
        assert_eq!(config.polarity, Polarity::Normal);
        assert_eq!(config.window, WindowKind::Hann);
        assert_eq!(config.port.as_deref(), Some("/dev/ttyUSB1"));
        assert_eq!(config.baud_rate, 115_200);
        match args.command {
            CommandTask::Batch(batch) => assert_eq!(batch.cycles, 7),
            other => panic!("parsed the wrong command: {other:?}"),
        }
    }

    #[test]
    fn simulate_defaults_and_negative_delay() {
        let args =
            ScopeArgs::try_parse_from(["lagscope", "live", "simulate", "--delay", "-4"]).unwrap();
        match args.command {
            CommandTask::Live(LiveCommand {
                source: SourceCommand::Simulate(sim),
            }) => {
                assert_eq!(sim.delay, -4);
                assert_eq!(sim.marker_every, 1000);
                assert!(!sim.paced);
            }
            other => panic!("parsed the wrong command: {other:?}"),
        }
    }

    #[test]
    fn batch_defaults_to_one_hundred_cycles() {
        let args = ScopeArgs::try_parse_from(["lagscope", "batch", "replay", "-f", "cap.bin"])
            .unwrap();
        match args.command {
            CommandTask::Batch(batch) => assert_eq!(batch.cycles, 100),
            other => panic!("parsed the wrong command: {other:?}"),
        }
    }

    #[test]
    fn polarity_flags_conflict() {
        assert!(ScopeArgs::try_parse_from([
            "lagscope",
            "--invert-ch2",
            "--normal-ch2",
            "ports"
        ])
        .is_err());
    }
}
