//! De-interleaves an aligned chunk into the two microphone channels.
//!
//! On the wire every combined sample is four bytes:
//!
//! ```text
//! | ch1 lo | ch1 hi | ch2 lo | ch2 hi |
//! ```
//!
//! i.e. two unsigned little-endian 16 bit ADC readings.

use nom::{
    combinator::{all_consuming, map},
    multi::count,
    number::complete::le_u16,
    sequence::tuple,
    Finish, IResult,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bytes per combined (two channel) sample.
pub const BYTES_PER_SAMPLE: usize = 4;

/// One raw reading from each microphone, taken at the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombinedSample {
    pub channel_1: u16,
    pub channel_2: u16,
}

/// Whether channel 2 is sign-inverted after DC removal. The two microphones
/// on the reference board are wired with opposite polarity, but not every
/// capture setup compensates for that the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum Polarity {
    Normal,
    #[default]
    InvertChannel2,
}

/// Two DC-corrected channel sequences of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelPair {
    pub channel_1: Vec<f64>,
    pub channel_2: Vec<f64>,
}

/// Returned when a chunk that should never have reached the decoder does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemuxError {
    /// The chunk does not hold a whole number of combined samples.
    LengthNotMultipleOfSample(usize),
    /// The chunk is not exactly the configured size.
    UnexpectedLength { expected: usize, got: usize },
    /// The parser gave up; carries the number of unconsumed bytes.
    Malformed(usize),
}

impl fmt::Display for DemuxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DemuxError::LengthNotMultipleOfSample(len) => {
                write!(f, "chunk of {len} bytes is not a multiple of {BYTES_PER_SAMPLE}")
            }
            DemuxError::UnexpectedLength { expected, got } => {
                write!(f, "expected a {expected} byte chunk, got {got}")
            }
            DemuxError::Malformed(left) => {
                write!(f, "could not decode chunk, {left} bytes left over")
            }
        }
    }
}

impl std::error::Error for DemuxError {}

fn parse_combined_sample(input: &[u8]) -> IResult<&[u8], CombinedSample> {
    map(tuple((le_u16, le_u16)), |(channel_1, channel_2)| {
        CombinedSample {
            channel_1,
            channel_2,
        }
    })(input)
}

/// Parses exactly `n` combined samples, failing if any bytes remain.
pub fn parse_samples(input: &[u8], n: usize) -> Result<Vec<CombinedSample>, DemuxError> {
    match all_consuming(count(parse_combined_sample, n))(input).finish() {
        Ok((_remaining, samples)) => Ok(samples),
        Err(nom::error::Error { input, .. }) => Err(DemuxError::Malformed(input.len())),
    }
}

fn remove_mean(values: &mut [f64]) {
    if values.is_empty() {
        return;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter_mut().for_each(|v| *v -= mean);
}

/// Turns aligned chunks of `4 * samples` bytes into [`ChannelPair`]s.
#[derive(Debug, Clone, Copy)]
pub struct SampleDemultiplexer {
    samples: usize,
    polarity: Polarity,
}

impl SampleDemultiplexer {
    pub fn new(samples: usize, polarity: Polarity) -> Self {
        Self { samples, polarity }
    }

    /// Number of bytes a decodable chunk must have.
    pub fn chunk_len(&self) -> usize {
        self.samples * BYTES_PER_SAMPLE
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Decodes `chunk`, removes each channel's mean and applies the
    /// configured polarity to channel 2.
    pub fn decode(&self, chunk: &[u8]) -> Result<ChannelPair, DemuxError> {
        if chunk.len() % BYTES_PER_SAMPLE != 0 {
            return Err(DemuxError::LengthNotMultipleOfSample(chunk.len()));
        }
        if chunk.len() != self.chunk_len() {
            return Err(DemuxError::UnexpectedLength {
                expected: self.chunk_len(),
                got: chunk.len(),
            });
        }

        let samples = parse_samples(chunk, self.samples)?;
        let (mut channel_1, mut channel_2): (Vec<f64>, Vec<f64>) = samples
            .iter()
            .map(|s| (s.channel_1 as f64, s.channel_2 as f64))
            .unzip();

        remove_mean(&mut channel_1);
        remove_mean(&mut channel_2);
        if self.polarity == Polarity::InvertChannel2 {
            channel_2.iter_mut().for_each(|v| *v = -*v);
        }

        Ok(ChannelPair {
            channel_1,
            channel_2,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean(values: &[f64]) -> f64 {
        values.iter().sum::<f64>() / values.len() as f64
    }

    #[test]
    fn decodes_little_endian_pairs() {
        let samples = parse_samples(&[0x34, 0x12, 0x01, 0x00], 1).unwrap();
        assert_eq!(
            samples,
            vec![CombinedSample {
                channel_1: 0x1234,
                channel_2: 0x0001,
            }]
        );
    }

    #[test]
    fn leftover_bytes_are_malformed() {
        assert_eq!(
            parse_samples(&[0x34, 0x12, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00], 1),
            Err(DemuxError::Malformed(4))
        );
    }

    #[test]
    fn removes_dc() {
        let chunk: Vec<u8> = (0..128u16)
            .flat_map(|i| {
                let a = 2048 + (i * 37) % 1000;
                let b = 100 + (i * i) % 3000;
                let mut bytes = a.to_le_bytes().to_vec();
                bytes.extend_from_slice(&b.to_le_bytes());
                bytes
            })
            .collect();

        for polarity in [Polarity::Normal, Polarity::InvertChannel2] {
            let pair = SampleDemultiplexer::new(128, polarity).decode(&chunk).unwrap();
            assert_eq!(pair.channel_1.len(), 128);
            assert_eq!(pair.channel_2.len(), 128);
            assert!(mean(&pair.channel_1).abs() < 1e-9);
            assert!(mean(&pair.channel_2).abs() < 1e-9);
        }
    }

    #[test]
    fn polarity_flips_channel_2_only() {
        let chunk = [0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x04, 0x00];
        let normal = SampleDemultiplexer::new(2, Polarity::Normal)
            .decode(&chunk)
            .unwrap();
        let inverted = SampleDemultiplexer::new(2, Polarity::InvertChannel2)
            .decode(&chunk)
            .unwrap();

        assert_eq!(normal.channel_1, vec![-1.0, 1.0]);
        assert_eq!(normal.channel_2, vec![-2.0, 2.0]);
        assert_eq!(inverted.channel_1, normal.channel_1);
        assert_eq!(inverted.channel_2, vec![2.0, -2.0]);
    }

    #[test]
    fn rejects_bad_lengths() {
        let demux = SampleDemultiplexer::new(128, Polarity::Normal);
        assert_eq!(
            demux.decode(&[0u8; 511]),
            Err(DemuxError::LengthNotMultipleOfSample(511))
        );
        assert_eq!(
            demux.decode(&[0u8; 508]),
            Err(DemuxError::UnexpectedLength {
                expected: 512,
                got: 508
            })
        );
    }
}
