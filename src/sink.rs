//! Consumers of the per-cycle output.

use crate::correlator::argmax_abs;
use log::info;
use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

/// Everything one successful cycle produced.
#[derive(Debug, Clone, PartialEq)]
pub struct LagFrame {
    /// Centered cross-correlation, zero relative delay at `len / 2`.
    pub lag: Vec<f64>,
    /// DC-corrected channel 1.
    pub channel_1: Vec<f64>,
    /// DC-corrected channel 2, after polarity handling.
    pub channel_2: Vec<f64>,
}

impl LagFrame {
    /// `(index, lag)` points, ready to plot.
    pub fn lag_points(&self) -> Vec<(f64, f64)> {
        indexed(&self.lag)
    }

    /// `(index, channel 2)` points, ready to plot.
    pub fn channel_points(&self) -> Vec<(f64, f64)> {
        indexed(&self.channel_2)
    }
}

fn indexed(values: &[f64]) -> Vec<(f64, f64)> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64, v))
        .collect()
}

/// Which series a sink is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
pub enum SinkMode {
    /// Only the lag sequence
    Lag,
    /// Only the raw channel
    Channel,
    /// Both series
    #[default]
    Both,
}

impl SinkMode {
    pub fn wants_lag(&self) -> bool {
        matches!(self, SinkMode::Lag | SinkMode::Both)
    }

    pub fn wants_channel(&self) -> bool {
        matches!(self, SinkMode::Channel | SinkMode::Both)
    }
}

/// Returned by a sink that could not take a frame.
#[derive(Debug)]
pub struct SinkError(pub Box<dyn Error + Send + Sync>);

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink error: {}", self.0)
    }
}

impl Error for SinkError {}

/// `LagSink`
///
/// Called exactly once for every cycle that produced a [`LagFrame`]. The
/// sink owns the decision of what to draw and when.
pub trait LagSink {
    fn emit(&mut self, frame: &LagFrame) -> Result<(), SinkError>;
}

/// Logs a one-line summary per frame.
#[derive(Debug, Default)]
pub struct LogSink {
    mode: SinkMode,
    frames: usize,
}

impl LogSink {
    pub fn new(mode: SinkMode) -> Self {
        Self { mode, frames: 0 }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl LagSink for LogSink {
    fn emit(&mut self, frame: &LagFrame) -> Result<(), SinkError> {
        self.frames += 1;
        if self.mode.wants_lag() {
            let center = frame.lag.len() / 2;
            if let Some(peak) = argmax_abs(&frame.lag) {
                info!(
                    "frame {}: lag peak {:+} from center, {:.3e}",
                    self.frames,
                    peak as i64 - center as i64,
                    frame.lag[peak]
                );
            }
        }
        if self.mode.wants_channel() {
            let rms = (frame.channel_2.iter().map(|v| v * v).sum::<f64>()
                / frame.channel_2.len().max(1) as f64)
                .sqrt();
            info!("frame {}: channel 2 rms {:.1}", self.frames, rms);
        }
        Ok(())
    }
}

/// Keeps every frame it is handed.
#[derive(Debug, Default)]
pub struct CollectSink {
    pub frames: Vec<LagFrame>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LagSink for CollectSink {
    fn emit(&mut self, frame: &LagFrame) -> Result<(), SinkError> {
        self.frames.push(frame.clone());
        Ok(())
    }
}

impl<S: LagSink + ?Sized> LagSink for &mut S {
    fn emit(&mut self, frame: &LagFrame) -> Result<(), SinkError> {
        (**self).emit(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_are_indexed() {
        let frame = LagFrame {
            lag: vec![0.5, 2.0, -1.0],
            channel_1: vec![0.0; 3],
            channel_2: vec![1.0, 2.0, 3.0],
        };
        assert_eq!(frame.lag_points(), vec![(0.0, 0.5), (1.0, 2.0), (2.0, -1.0)]);
        assert_eq!(frame.channel_points()[2], (2.0, 3.0));
    }

    #[test]
    fn modes() {
        assert!(SinkMode::Both.wants_lag() && SinkMode::Both.wants_channel());
        assert!(SinkMode::Lag.wants_lag() && !SinkMode::Lag.wants_channel());
        assert!(!SinkMode::Channel.wants_lag() && SinkMode::Channel.wants_channel());
    }

    #[test]
    fn log_sink_counts() {
        let mut sink = LogSink::new(SinkMode::Both);
        let frame = LagFrame {
            lag: vec![0.0, 1.0, 0.0, 0.0],
            channel_1: vec![0.0; 4],
            channel_2: vec![0.0; 4],
        };
        sink.emit(&frame).unwrap();
        sink.emit(&frame).unwrap();
        assert_eq!(sink.frames(), 2);
    }
}
