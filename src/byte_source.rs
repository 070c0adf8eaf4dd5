//! Where the raw bytes come from.

use std::io::{self, ErrorKind, Read};

/// `ByteSource`
///
/// A blocking supplier of raw front-end bytes. Implementations must be able
/// to drop whatever they have buffered but not yet handed out, and must
/// block in [`ByteSource::read_chunk`] until the requested number of bytes
/// is available. A short chunk is only expected at the very end of a finite
/// source.
pub trait ByteSource {
    /// Throw away stale, buffered-but-unread bytes.
    fn discard_input(&mut self) -> io::Result<()>;

    /// Block until `len` bytes are available and return them.
    fn read_chunk(&mut self, len: usize) -> io::Result<Vec<u8>>;
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn discard_input(&mut self) -> io::Result<()> {
        (**self).discard_input()
    }

    fn read_chunk(&mut self, len: usize) -> io::Result<Vec<u8>> {
        (**self).read_chunk(len)
    }
}

/// Fills up to `len` bytes from `reader`, retrying on short reads and
/// interrupts. Returns fewer bytes only when the reader hits end of file.
pub fn read_up_to<R: Read + ?Sized>(reader: &mut R, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    buf.truncate(filled);
    Ok(buf)
}

/// A [`ByteSource`] over anything readable, e.g. a raw capture file.
///
/// There is no device buffer to go stale, so [`ByteSource::discard_input`]
/// does nothing and a replay sees the capture contiguously.
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn discard_input(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn read_chunk(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let chunk = read_up_to(&mut self.reader, len)?;
        if chunk.is_empty() && len > 0 {
            return Err(io::Error::new(ErrorKind::UnexpectedEof, "byte source exhausted"));
        }
        Ok(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn reads_in_requested_sizes() {
        let bytes: Vec<u8> = (0..10).collect();
        let mut source = ReaderSource::new(Cursor::new(bytes));

        assert_eq!(source.read_chunk(4).unwrap(), vec![0, 1, 2, 3]);
        source.discard_input().unwrap();
        assert_eq!(source.read_chunk(4).unwrap(), vec![4, 5, 6, 7]);
        // tail of the capture comes back short
        assert_eq!(source.read_chunk(4).unwrap(), vec![8, 9]);
        let err = source.read_chunk(4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn replays_a_capture_file() {
        let mut capture = tempfile::NamedTempFile::new().unwrap();
        capture.write_all(&[0xAA; 1024]).unwrap();
        capture.flush().unwrap();

        let file = std::fs::File::open(capture.path()).unwrap();
        let mut source = ReaderSource::new(file);
        assert_eq!(source.read_chunk(512).unwrap().len(), 512);
        assert_eq!(source.read_chunk(512).unwrap().len(), 512);
        assert!(source.read_chunk(512).is_err());
    }

    /// A reader that hands out at most three bytes per call.
    struct Dribble(Cursor<Vec<u8>>);

    impl Read for Dribble {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(3);
            self.0.read(&mut buf[..n])
        }
    }

    #[test]
    fn short_reads_are_stitched_together() {
        let mut reader = Dribble(Cursor::new((0..20).collect()));
        assert_eq!(read_up_to(&mut reader, 16).unwrap(), (0..16).collect::<Vec<u8>>());
    }
}
