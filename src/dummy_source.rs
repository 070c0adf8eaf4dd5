//! A stand-in for the microphone front end, for running without hardware.
//!
//! A single broadband "sound" is sampled by two simulated microphones, one
//! of which hears it `delay` samples later than the other. Readings are
//! 12 bit, centred on mid-scale, and put on the wire exactly like the real
//! firmware does it, including an all-`0xFF` marker frame every so often.

use crate::byte_source::ByteSource;
use crate::demux::{Polarity, BYTES_PER_SAMPLE};
use crate::frame_sync::MARKER_BYTE;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{collections::VecDeque, io, time::Duration};

const ADC_MAX: f64 = 4095.0;
const ADC_MIDSCALE: f64 = 2048.0;

/// Builder for [`DummySource`].
#[derive(Debug, Clone)]
pub struct DummySourceBuilder {
    delay: i64,
    amplitude: f64,
    noise: f64,
    marker_every: usize,
    polarity: Polarity,
    baud_rate: Option<u32>,
    seed: u64,
}

impl Default for DummySourceBuilder {
    fn default() -> Self {
        Self {
            delay: 0,
            amplitude: 600.0,
            noise: 5.0,
            marker_every: 1000,
            polarity: Polarity::default(),
            baud_rate: None,
            seed: 0x5eed,
        }
    }
}

impl DummySourceBuilder {
    /// Samples by which channel 2 lags channel 1; negative means it leads.
    pub fn delay(mut self, delay: i64) -> Self {
        self.delay = delay;
        self
    }

    /// Peak amplitude of the shared signal, in ADC counts.
    pub fn amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Peak amplitude of the independent per-microphone noise, in ADC counts.
    pub fn noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }

    /// Emit a marker frame after every `marker_every` samples; 0 disables
    /// markers entirely.
    pub fn marker_every(mut self, marker_every: usize) -> Self {
        self.marker_every = marker_every;
        self
    }

    /// How channel 2 is wired. With [`Polarity::InvertChannel2`] the second
    /// microphone sees the signal upside down, like on the reference board.
    pub fn polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }

    /// Throttle reads to what a real 8N1 link at `baud_rate` could deliver.
    pub fn paced(mut self, baud_rate: u32) -> Self {
        self.baud_rate = Some(baud_rate);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> DummySource {
        DummySource {
            history: VecDeque::from(vec![0.0; self.delay.unsigned_abs() as usize + 1]),
            rng: StdRng::seed_from_u64(self.seed),
            pending: VecDeque::new(),
            since_marker: 0,
            config: self,
        }
    }
}

/// A simulated dual-microphone front end.
#[derive(Debug)]
pub struct DummySource {
    config: DummySourceBuilder,
    rng: StdRng,
    // Most recent shared signal value at the back
    history: VecDeque<f64>,
    // Bytes of the frame currently being sent
    pending: VecDeque<u8>,
    since_marker: usize,
}

impl DummySource {
    pub fn builder() -> DummySourceBuilder {
        DummySourceBuilder::default()
    }

    fn to_adc(&self, value: f64) -> u16 {
        (ADC_MIDSCALE + value).round().clamp(0.0, ADC_MAX) as u16
    }

    fn next_frame(&mut self) -> [u8; BYTES_PER_SAMPLE] {
        if self.config.marker_every > 0 && self.since_marker == self.config.marker_every {
            self.since_marker = 0;
            return [MARKER_BYTE; BYTES_PER_SAMPLE];
        }
        self.since_marker += 1;

        let fresh = self.rng.gen_range(-1.0..=1.0) * self.config.amplitude;
        self.history.pop_front();
        self.history.push_back(fresh);

        let newest = fresh;
        let oldest = self.history.front().copied().unwrap_or(fresh);
        let (heard_1, heard_2) = if self.config.delay >= 0 {
            (newest, oldest)
        } else {
            (oldest, newest)
        };
        let heard_2 = match self.config.polarity {
            Polarity::Normal => heard_2,
            Polarity::InvertChannel2 => -heard_2,
        };

        let noise = self.config.noise;
        let mut jitter = || {
            if noise > 0.0 {
                self.rng.gen_range(-noise..=noise)
            } else {
                0.0
            }
        };
        let (n1, n2) = (jitter(), jitter());

        let [c1_lo, c1_hi] = self.to_adc(heard_1 + n1).to_le_bytes();
        let [c2_lo, c2_hi] = self.to_adc(heard_2 + n2).to_le_bytes();
        [c1_lo, c1_hi, c2_lo, c2_hi]
    }
}

impl ByteSource for DummySource {
    /// Drops the rest of a partially sent frame, so the next read starts on
    /// a frame boundary.
    fn discard_input(&mut self) -> io::Result<()> {
        self.pending.clear();
        Ok(())
    }

    fn read_chunk(&mut self, len: usize) -> io::Result<Vec<u8>> {
        while self.pending.len() < len {
            let frame = self.next_frame();
            self.pending.extend(frame);
        }
        if let Some(baud_rate) = self.config.baud_rate {
            // start bit + 8 data bits + stop bit
            let seconds = (len * 10) as f64 / baud_rate as f64;
            spin_sleep::sleep(Duration::from_secs_f64(seconds));
        }
        Ok(self.pending.drain(..len).collect())
    }
}
