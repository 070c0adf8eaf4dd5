//! Command line front end for lagscope.

use clap::Parser;
use lagscope::{
    args::{CommandTask, ScopeArgs, SourceCommand},
    byte_source::{ByteSource, ReaderSource},
    config::ScopeConfig,
    dummy_source::DummySource,
    gui,
    pipeline::{PipelineController, PipelineError},
    serial_source::{available_ports, SerialSource},
    sink::LogSink,
};

use log::{error, info};
use std::{error::Error, fs::File, io::BufReader, io::ErrorKind, process};

// Examples:
// cargo run -- ports
// cargo run -- batch --cycles 100 serial --port /dev/ttyUSB0
// cargo run -- --normal-ch2 live simulate --delay 5 --paced
// cargo run -- --config scope.ron batch replay --file capture.bin

fn main() {
    env_logger::init();
    let args = ScopeArgs::parse();

    if let Err(e) = run(args) {
        error!("{e}");
        eprintln!("lagscope: {e}");
        process::exit(1);
    }
}

fn run(args: ScopeArgs) -> Result<(), Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => ScopeConfig::from_path(path)?,
        None => ScopeConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    match args.command {
        CommandTask::Ports => {
            let ports = available_ports()?;
            if ports.is_empty() {
                println!("No serial devices found");
            }
            for port in ports {
                println!("{}", port.to_string_lossy());
            }
            Ok(())
        }

        CommandTask::Batch(batch) => {
            let Some(source) = open_source(&batch.source, &config, false)? else {
                return Ok(());
            };
            let mut pipeline = PipelineController::new(source, &config);
            let mut sink = LogSink::new(config.sink);
            match pipeline.run_batch(batch.cycles, &mut sink) {
                Ok(_) => Ok(()),
                Err(PipelineError::Source(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                    let stats = pipeline.stats();
                    info!(
                        "Source ran out after {} cycles ({} emitted)",
                        stats.cycles, stats.emitted
                    );
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        }

        CommandTask::Live(live) => {
            let Some(source) = open_source(&live.source, &config, true)? else {
                return Ok(());
            };
            let mut pipeline = PipelineController::new(source, &config);
            let stats = gui::live_scope(&mut pipeline, config.sink)?;
            info!(
                "{} cycles: {} emitted, {} resyncs, {} skipped",
                stats.cycles, stats.emitted, stats.resyncs, stats.skipped
            );
            Ok(())
        }
    }
}

/// Opens whichever byte source was asked for. Returns `None` when the user
/// backed out of picking a serial device.
fn open_source(
    command: &SourceCommand,
    config: &ScopeConfig,
    interactive: bool,
) -> Result<Option<Box<dyn ByteSource>>, Box<dyn Error>> {
    let source: Box<dyn ByteSource> = match command {
        SourceCommand::Serial(_) => {
            let port = match &config.port {
                Some(port) => port.into(),
                None if interactive => match gui::device_selector(available_ports()?)? {
                    Some(port) => port,
                    None => return Ok(None),
                },
                None => return Err("no serial port given, use --port or the config file".into()),
            };
            Box::new(SerialSource::open(port, config.baud_rate)?)
        }

        SourceCommand::Replay(replay) => {
            info!("Replaying {}", replay.file.display());
            Box::new(ReaderSource::new(BufReader::new(File::open(&replay.file)?)))
        }

        SourceCommand::Simulate(sim) => {
            let mut builder = DummySource::builder()
                .delay(sim.delay)
                .noise(sim.noise)
                .marker_every(sim.marker_every)
                .polarity(config.polarity);
            if sim.paced {
                builder = builder.paced(config.baud_rate);
            }
            if let Some(seed) = sim.seed {
                builder = builder.seed(seed);
            }
            Box::new(builder.build())
        }
    };
    Ok(Some(source))
}
