//! Capture sink (spec component 7 / spec.md §4.5 "Sink").
//!
//! A destination for captured stream bytes: either nothing yet, a
//! caller-sized in-memory buffer, or an already-open file. Grounded on
//! `src/sink.c` in the original source — binding a buffer there opens a
//! `fmemopen`-backed `FILE*` over it; here a `Cursor<Vec<u8>>` plays the
//! same role.

use std::fs::File;
use std::io::{self, Cursor, Write};

/// Where captured bytes end up.
pub enum Sink {
    Unset,
    Buffer(Cursor<Vec<u8>>),
    Stream(File),
}

impl Sink {
    pub fn new() -> Sink {
        Sink::Unset
    }

    /// Bind an in-memory buffer with `capacity` bytes reserved up front.
    pub fn set_buffer(&mut self, capacity: usize) {
        *self = Sink::Buffer(Cursor::new(Vec::with_capacity(capacity)));
    }

    /// Bind an already-open file as the destination.
    pub fn set_stream(&mut self, stream: File) {
        *self = Sink::Stream(stream);
    }

    /// The buffered bytes, if this sink is bound to a buffer.
    pub fn buffer(&self) -> Option<&[u8]> {
        match self {
            Sink::Buffer(cursor) => Some(cursor.get_ref().as_slice()),
            _ => None,
        }
    }
}

impl Default for Sink {
    fn default() -> Sink {
        Sink::new()
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Unset => {
                log::warn!("tapi, sink; write to an unbound sink discarded {} bytes", buf.len());
                Ok(buf.len())
            }
            Sink::Buffer(cursor) => cursor.get_mut().write(buf),
            Sink::Stream(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Unset => Ok(()),
            Sink::Buffer(_) => Ok(()),
            Sink::Stream(file) => file.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_sink_accumulates_writes_in_order() {
        let mut sink = Sink::new();
        sink.set_buffer(16);
        sink.write_all(b"1.60").unwrap();
        sink.write_all(b"\n").unwrap();
        assert_eq!(sink.buffer().unwrap(), b"1.60\n");
    }

    #[test]
    fn unbound_sink_discards_without_erroring() {
        let mut sink = Sink::new();
        assert!(sink.write_all(b"anything").is_ok());
    }
}
