//! Drives the read → sync → demux → transform → correlate cycle.
//!
//! One [`PipelineController`] owns one byte source and the only state that
//! survives from one cycle to the next: the pending byte offset. Everything
//! else (chunk, channels, spectra) lives and dies within a single call to
//! [`PipelineController::run_cycle`]. Who calls it, and how often, is up to
//! the driver: a plain loop ([`PipelineController::run_batch`]), a stop
//! flag ([`PipelineController::run_until`]), or a UI event loop.

use crate::byte_source::ByteSource;
use crate::config::ScopeConfig;
use crate::correlator::CrossCorrelator;
use crate::demux::{DemuxError, SampleDemultiplexer};
use crate::frame_sync::FrameSynchronizer;
use crate::sink::{LagFrame, LagSink, SinkError};
use crate::spectral::{SpectralError, SpectralTransformer};
use crate::window::WindowTable;
use log::{debug, info, warn};
use std::{
    fmt, io,
    sync::atomic::{AtomicBool, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

/// What happened during one cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The chunk carried an alignment marker; the next read is shortened by
    /// `offset` bytes and nothing was decoded.
    Resync { marker_at: usize, offset: usize },
    /// The chunk was not the target size and was dropped.
    Skipped { len: usize },
    /// A lag sequence was produced.
    Emitted(LagFrame),
}

/// Running totals for one controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub cycles: u64,
    pub resyncs: u64,
    pub skipped: u64,
    pub emitted: u64,
}

/// Errors that stop the pipeline. Misalignment and short chunks are not
/// errors; see [`CycleOutcome`].
#[derive(Debug)]
pub enum PipelineError {
    /// The byte source failed or went away.
    Source(io::Error),
    /// A chunk that should have been gated out reached the decoder.
    Demux(DemuxError),
    /// A transform was handed a sequence of the wrong length.
    Spectral(SpectralError),
    Sink(SinkError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Source(error) => write!(f, "byte source failed: {error}"),
            PipelineError::Demux(error) => write!(f, "demultiplexer: {error}"),
            PipelineError::Spectral(error) => write!(f, "spectral: {error}"),
            PipelineError::Sink(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<io::Error> for PipelineError {
    fn from(value: io::Error) -> Self {
        Self::Source(value)
    }
}

impl From<DemuxError> for PipelineError {
    fn from(value: DemuxError) -> Self {
        Self::Demux(value)
    }
}

impl From<SpectralError> for PipelineError {
    fn from(value: SpectralError) -> Self {
        Self::Spectral(value)
    }
}

impl From<SinkError> for PipelineError {
    fn from(value: SinkError) -> Self {
        Self::Sink(value)
    }
}

pub struct PipelineController<S: ByteSource> {
    source: S,
    synchronizer: FrameSynchronizer,
    demux: SampleDemultiplexer,
    transformer: SpectralTransformer,
    correlator: CrossCorrelator,
    target_len: usize,
    offset: usize,
    stats: PipelineStats,
}

impl<S: ByteSource> PipelineController<S> {
    /// Builds every stage from `config`. The config is assumed to have been
    /// validated.
    pub fn new(source: S, config: &ScopeConfig) -> Self {
        let n = config.samples_per_chunk;
        let window = WindowTable::new(config.window, n);
        Self {
            source,
            synchronizer: FrameSynchronizer::new(config.marker_anchor),
            demux: SampleDemultiplexer::new(n, config.polarity),
            transformer: SpectralTransformer::new(window),
            correlator: CrossCorrelator::new(n),
            target_len: config.chunk_len(),
            offset: 0,
            stats: PipelineStats::default(),
        }
    }

    /// The byte offset the next read will be shortened by.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn target_len(&self) -> usize {
        self.target_len
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Flushes stale bytes, reads one chunk and processes it.
    pub fn run_cycle(&mut self) -> Result<CycleOutcome, PipelineError> {
        self.source.discard_input()?;
        let request = self.target_len - self.offset;
        let chunk = self.source.read_chunk(request)?;

        if log::log_enabled!(log::Level::Debug) {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs_f64())
                .unwrap_or_default();
            debug!("{now:.6}: requested {request} bytes, got {}", chunk.len());
        }

        // The pending offset only ever applies to the read it shortened.
        self.offset = 0;
        self.process_chunk(&chunk)
    }

    /// Runs everything after the read on an already received chunk.
    pub fn process_chunk(&mut self, chunk: &[u8]) -> Result<CycleOutcome, PipelineError> {
        self.stats.cycles += 1;

        let report = self.synchronizer.scan(chunk);
        if let Some(marker_at) = report.marker_at {
            self.offset = report.offset;
            self.stats.resyncs += 1;
            info!("Marker at byte {marker_at}, next read offset {}", self.offset);
            return Ok(CycleOutcome::Resync {
                marker_at,
                offset: report.offset,
            });
        }

        if chunk.len() != self.target_len {
            self.stats.skipped += 1;
            debug!(
                "Skipping {} byte chunk, want {}",
                chunk.len(),
                self.target_len
            );
            return Ok(CycleOutcome::Skipped { len: chunk.len() });
        }

        let channels = self.demux.decode(chunk)?;
        let spectrum_1 = self.transformer.transform(&channels.channel_1)?;
        let spectrum_2 = self.transformer.transform(&channels.channel_2)?;
        let lag = self.correlator.correlate(&spectrum_1, &spectrum_2)?;

        self.stats.emitted += 1;
        Ok(CycleOutcome::Emitted(LagFrame {
            lag,
            channel_1: channels.channel_1,
            channel_2: channels.channel_2,
        }))
    }

    fn run_and_emit(&mut self, sink: &mut impl LagSink) -> Result<(), PipelineError> {
        if let CycleOutcome::Emitted(frame) = self.run_cycle()? {
            sink.emit(&frame)?;
        }
        Ok(())
    }

    /// Runs exactly `cycles` cycles, handing every lag frame to `sink`.
    pub fn run_batch(
        &mut self,
        cycles: u64,
        sink: &mut impl LagSink,
    ) -> Result<PipelineStats, PipelineError> {
        for _ in 0..cycles {
            self.run_and_emit(sink)?;
        }
        self.log_summary();
        Ok(self.stats)
    }

    /// Runs cycles until `stop` is raised by someone else.
    pub fn run_until(
        &mut self,
        stop: &AtomicBool,
        sink: &mut impl LagSink,
    ) -> Result<PipelineStats, PipelineError> {
        while !stop.load(Ordering::Relaxed) {
            self.run_and_emit(sink)?;
        }
        self.log_summary();
        Ok(self.stats)
    }

    fn log_summary(&self) {
        let PipelineStats {
            cycles,
            resyncs,
            skipped,
            emitted,
        } = self.stats;
        if cycles > 0 && emitted == 0 {
            warn!("No lag frames produced in {cycles} cycles, is the front end sending?");
        }
        info!("{cycles} cycles: {emitted} emitted, {resyncs} resyncs, {skipped} skipped");
    }
}
