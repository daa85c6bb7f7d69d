//! End-to-end stream-capture scenario (spec.md §8, scenario E2).

#![cfg(unix)]

use std::io::Write;

use tapi::capture::{Capture, StdStream};
use tapi::sink::Sink;

/// E2: a formatted write of `1.60` to the captured stream appears
/// byte-for-byte in the sink's buffer.
#[test]
fn e2_capture_exact_bytes() {
    let mut sink = Sink::new();
    sink.set_buffer(16);

    let capture = Capture::make(StdStream::Stderr).expect("capture begins");
    write!(std::io::stderr(), "{:.2}\n", 1.6f64).unwrap();
    capture.end(&mut sink);

    let bytes = sink.buffer().expect("buffer sink was bound");
    assert_eq!(&bytes[..5], &[0x31, 0x2E, 0x36, 0x30, 0x0A]);
}
