//! Recovers sample alignment from a byte stream that carries no headers or
//! length fields. The front end periodically emits a run of `0xFF` bytes;
//! since real samples never put two `0xFF`s next to each other, the first
//! adjacent pair is the only landmark we get.

use serde::{Deserialize, Serialize};

/// Value of both bytes of an alignment marker.
pub const MARKER_BYTE: u8 = 0xFF;

/// Which byte of the matched pair becomes the reference sample boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum MarkerAnchor {
    /// Offset is the position of the first `0xFF` of the pair. This is what
    /// the acquisition firmware's wire layout was tuned against.
    #[default]
    FirstMarkerByte,
    /// Offset is the position of the second `0xFF` of the pair.
    SecondMarkerByte,
}

/// Result of scanning one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Index of the first byte of the first adjacent `0xFF` pair, if any.
    pub marker_at: Option<usize>,
    /// Correction to subtract from the next read; 0 when no marker was seen.
    pub offset: usize,
}

impl SyncReport {
    pub fn marker_found(&self) -> bool {
        self.marker_at.is_some()
    }
}

/// Stateless marker scanner.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameSynchronizer {
    anchor: MarkerAnchor,
}

impl FrameSynchronizer {
    pub fn new(anchor: MarkerAnchor) -> Self {
        Self { anchor }
    }

    /// Scans `chunk` once, remembering whether the previous byte was a
    /// marker byte, and stops at the first adjacent pair.
    pub fn scan(&self, chunk: &[u8]) -> SyncReport {
        let mut prev_was_marker = false;
        for (i, &byte) in chunk.iter().enumerate() {
            let is_marker = byte == MARKER_BYTE;
            if is_marker && prev_was_marker {
                let first = i - 1;
                let offset = match self.anchor {
                    MarkerAnchor::FirstMarkerByte => first,
                    MarkerAnchor::SecondMarkerByte => i,
                };
                return SyncReport {
                    marker_at: Some(first),
                    offset,
                };
            }
            prev_was_marker = is_marker;
        }

        SyncReport {
            marker_at: None,
            offset: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_with_pair_at(p: usize) -> Vec<u8> {
        let mut chunk: Vec<u8> = (0..512).map(|i| (i % 200) as u8).collect();
        chunk[p] = 0xFF;
        chunk[p + 1] = 0xFF;
        chunk
    }

    #[test]
    fn finds_adjacent_pair() {
        let sync = FrameSynchronizer::default();
        for p in [0, 1, 37, 300, 510] {
            let report = sync.scan(&chunk_with_pair_at(p));
            assert!(report.marker_found());
            assert_eq!(report.marker_at, Some(p));
            assert_eq!(report.offset, p);
        }
    }

    #[test]
    fn second_byte_anchor() {
        let sync = FrameSynchronizer::new(MarkerAnchor::SecondMarkerByte);
        let report = sync.scan(&chunk_with_pair_at(37));
        assert_eq!(report.marker_at, Some(37));
        assert_eq!(report.offset, 38);
    }

    #[test]
    fn lone_marker_bytes_are_ignored() {
        let sync = FrameSynchronizer::default();
        let mut chunk = vec![0x10; 64];
        chunk[3] = 0xFF;
        chunk[5] = 0xFF;
        chunk[63] = 0xFF;
        let report = sync.scan(&chunk);
        assert!(!report.marker_found());
        assert_eq!(report.offset, 0);
    }

    #[test]
    fn first_pair_wins() {
        let sync = FrameSynchronizer::default();
        let mut chunk = vec![0u8; 64];
        chunk[9] = 0xFF;
        chunk[20..24].fill(0xFF);
        chunk[40] = 0xFF;
        chunk[41] = 0xFF;
        assert_eq!(sync.scan(&chunk).marker_at, Some(20));
    }

    #[test]
    fn tiny_chunks() {
        let sync = FrameSynchronizer::default();
        assert!(!sync.scan(&[]).marker_found());
        assert!(!sync.scan(&[0xFF]).marker_found());
        assert_eq!(sync.scan(&[0xFF, 0xFF]).offset, 0);
        assert!(sync.scan(&[0xFF, 0xFF]).marker_found());
    }
}
