//! lagscope listens to a pair of microphones through a small analog front
//! end. The front end samples both microphones, interleaves the readings
//! and pushes them over a serial link as a plain byte stream, with nothing
//! but the occasional run of `0xFF` bytes to tell where a sample starts.
//!
//! Once per cycle this crate pulls a chunk off that stream, re-aligns to
//! the sample grid when it sees a marker, splits the chunk back into the
//! two channels, and cross-correlates them in the frequency domain. The
//! result is a lag sequence whose peak sits left or right of center by the
//! time difference of arrival between the two microphones.
//!
//! The stages, in the order data flows through them:
//!
//! - [frame_sync]: find the marker, compute the read correction
//! - [demux]: bytes to two DC-corrected channels
//! - [spectral]: window and forward real FFT
//! - [correlator]: cross-power spectrum, inverse FFT, center
//! - [pipeline]: the cycle itself, plus the offset carried between cycles
//!
//! Bytes come from a [byte_source::ByteSource] (a serial port, a capture
//! file, or the simulator in [dummy_source]) and lag frames go to a
//! [sink::LagSink].

pub mod args;
pub mod byte_source;
pub mod config;
pub mod correlator;
pub mod demux;
pub mod dummy_source;
pub mod frame_sync;
pub mod gui;
pub mod pipeline;
pub mod serial_source;
pub mod sink;
pub mod spectral;
pub mod window;
