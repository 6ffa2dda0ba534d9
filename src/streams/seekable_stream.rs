use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// A seekable byte source. The demuxer performs one forward pass over it;
/// the decode pipeline later re-reads individual sample ranges.
pub trait SeekableStream: Read + Seek {
    /// Read exactly `size` bytes starting at the absolute `offset`.
    fn read_range(&mut self, offset: u64, size: usize) -> io::Result<Vec<u8>> {
        self.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; size];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Total length of the source in bytes.
    fn len(&mut self) -> io::Result<u64> {
        let current = self.stream_position()?;
        let end = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(current))?;
        Ok(end)
    }
}

/// Local file wrapper
pub struct LocalSeekableStream(std::fs::File);

impl LocalSeekableStream {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(LocalSeekableStream(std::fs::File::open(path)?))
    }
}

impl Read for LocalSeekableStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl Seek for LocalSeekableStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.0.seek(pos)
    }
}

impl SeekableStream for LocalSeekableStream {}

// In-memory sources, used by tests and the worker protocol.
impl SeekableStream for io::Cursor<Vec<u8>> {}
impl SeekableStream for io::Cursor<&[u8]> {}
