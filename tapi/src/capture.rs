//! Stream capture (spec component 7 / spec.md §4.5 "Capture").
//!
//! Redirects a standard stream's file descriptor into an anonymous pipe
//! for the duration of a test body, then drains it into a [`Sink`].
//! Grounded on `src/capture.c` in the original source; POSIX plumbing
//! goes through `rustix`'s `pipe`, `process`, and `stdio` features (the
//! same crate the teacher's CLI uses for its own descriptor handling),
//! the Win32 branch through `CreatePipe`/`GetStdHandle`/`SetStdHandle`.

use std::io::Write;

use crate::error::TapiError;
use crate::sink::Sink;

/// Which standard stream a capture redirects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdStream {
    Stdout,
    Stderr,
}

/// 4 KiB, matching the original's drain chunk size.
const DRAIN_CHUNK: usize = 4096;

/// An in-flight redirection of `stream` into a pipe, draining into a
/// sink at [`Capture::end`].
pub struct Capture {
    stream: StdStream,
    inner: sys::Redirect,
}

impl Capture {
    /// Begin capturing `stream`. Flushes the stream, opens a pipe,
    /// redirects the stream's descriptor onto the pipe's write end, and
    /// closes the process's redundant handle on that write end so `end`
    /// observes EOF once the descriptor is restored.
    pub fn make(stream: StdStream) -> Result<Capture, TapiError> {
        flush_std(stream);
        let inner = sys::Redirect::begin(stream).map_err(|e| {
            log::error!("tapi, capture; failed to redirect {stream:?}: {e}");
            TapiError::PipeIoFailed(e)
        })?;
        Ok(Capture { stream, inner })
    }

    /// Restore the stream's original descriptor and drain everything
    /// written during the capture into `sink`, 4 KiB at a time.
    pub fn end(self, sink: &mut Sink) {
        flush_std(self.stream);
        let read_end = match self.inner.finish() {
            Ok(fd) => fd,
            Err(e) => {
                log::error!("tapi, capture; failed to restore {:?}: {e}", self.stream);
                return;
            }
        };

        let mut buf = [0u8; DRAIN_CHUNK];
        loop {
            match sys::read_chunk(&read_end, &mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if let Err(e) = sink.write_all(&buf[..n]) {
                        log::error!("tapi, capture; sink write failed: {e}");
                        break;
                    }
                }
                Err(e) => {
                    log::error!("tapi, capture; pipe drain failed: {e}");
                    break;
                }
            }
        }
    }
}

fn flush_std(stream: StdStream) {
    let result = match stream {
        StdStream::Stdout => std::io::stdout().flush(),
        StdStream::Stderr => std::io::stderr().flush(),
    };
    if let Err(e) = result {
        log::warn!("tapi, capture; flush before redirect failed: {e}");
    }
}

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        mod sys {
            use std::io;
            use windows_sys::Win32::Foundation::{HANDLE, INVALID_HANDLE_VALUE};
            use windows_sys::Win32::Security::SECURITY_ATTRIBUTES;
            use windows_sys::Win32::System::Console::{
                GetStdHandle, SetStdHandle, STD_ERROR_HANDLE, STD_OUTPUT_HANDLE,
            };
            use windows_sys::Win32::System::Pipes::CreatePipe;
            use windows_sys::Win32::Storage::FileSystem::ReadFile;

            use super::StdStream;

            fn std_handle_id(stream: StdStream) -> u32 {
                match stream {
                    StdStream::Stdout => STD_OUTPUT_HANDLE,
                    StdStream::Stderr => STD_ERROR_HANDLE,
                }
            }

            pub struct ReadEnd(HANDLE);

            pub struct Redirect {
                id: u32,
                saved: HANDLE,
                read_end: HANDLE,
            }

            impl Redirect {
                pub fn begin(stream: StdStream) -> Result<Redirect, String> {
                    let id = std_handle_id(stream);
                    unsafe {
                        let saved = GetStdHandle(id);
                        if saved == INVALID_HANDLE_VALUE {
                            return Err("GetStdHandle failed".to_string());
                        }

                        let mut read_end: HANDLE = std::ptr::null_mut();
                        let mut write_end: HANDLE = std::ptr::null_mut();
                        let mut attrs: SECURITY_ATTRIBUTES = std::mem::zeroed();
                        attrs.nLength = std::mem::size_of::<SECURITY_ATTRIBUTES>() as u32;
                        attrs.bInheritHandle = 1;

                        if CreatePipe(&mut read_end, &mut write_end, &attrs, 0) == 0 {
                            return Err("CreatePipe failed".to_string());
                        }

                        if SetStdHandle(id, write_end) == 0 {
                            return Err("SetStdHandle failed".to_string());
                        }

                        Ok(Redirect { id, saved, read_end })
                    }
                }

                pub fn finish(self) -> Result<ReadEnd, String> {
                    unsafe {
                        if SetStdHandle(self.id, self.saved) == 0 {
                            return Err("SetStdHandle restore failed".to_string());
                        }
                    }
                    Ok(ReadEnd(self.read_end))
                }
            }

            pub fn read_chunk(read_end: &ReadEnd, buf: &mut [u8]) -> io::Result<usize> {
                let mut read = 0u32;
                let ok = unsafe {
                    ReadFile(
                        read_end.0,
                        buf.as_mut_ptr().cast(),
                        buf.len() as u32,
                        &mut read,
                        std::ptr::null_mut(),
                    )
                };
                if ok == 0 {
                    return Ok(0);
                }
                Ok(read as usize)
            }
        }
    } else {
        mod sys {
            use std::io;
            use std::os::fd::{BorrowedFd, OwnedFd, RawFd};

            use rustix::io::{dup, read};
            use rustix::pipe::pipe;
            use rustix::stdio::{dup2_stderr, dup2_stdout};

            use super::StdStream;

            fn raw_fd(stream: StdStream) -> RawFd {
                match stream {
                    StdStream::Stdout => 1,
                    StdStream::Stderr => 2,
                }
            }

            fn borrow(fd: RawFd) -> BorrowedFd<'static> {
                unsafe { BorrowedFd::borrow_raw(fd) }
            }

            /// `rustix::io::dup2` takes its target as `&mut OwnedFd` — it
            /// assumes the caller owns the descriptor it's overwriting.
            /// `stdout`/`stderr` are borrowed, not owned, here, so this
            /// goes through the purpose-built `dup2_stdout`/`dup2_stderr`
            /// instead, which redirect onto fd 1/2 without requiring
            /// ownership of them.
            fn redirect_onto(stream: StdStream, fd: &OwnedFd) -> io::Result<()> {
                match stream {
                    StdStream::Stdout => dup2_stdout(fd),
                    StdStream::Stderr => dup2_stderr(fd),
                }
                .map_err(io::Error::from)
            }

            pub struct ReadEnd(OwnedFd);

            pub struct Redirect {
                stream: StdStream,
                saved: OwnedFd,
                read_end: OwnedFd,
            }

            impl Redirect {
                pub fn begin(stream: StdStream) -> Result<Redirect, String> {
                    let saved = dup(borrow(raw_fd(stream)))
                        .map_err(|e| format!("dup failed: {e}"))?;
                    let (read_end, write_end) =
                        pipe().map_err(|e| format!("pipe failed: {e}"))?;

                    redirect_onto(stream, &write_end)
                        .map_err(|e| format!("dup2 redirect failed: {e}"))?;
                    // `target` now refers to the same open file description as
                    // `write_end`; drop our standalone handle to it so `finish`
                    // observes EOF on the read end once `target` is restored.
                    drop(write_end);

                    Ok(Redirect { stream, saved, read_end })
                }

                pub fn finish(self) -> Result<ReadEnd, String> {
                    redirect_onto(self.stream, &self.saved)
                        .map_err(|e| format!("dup2 restore failed: {e}"))?;
                    Ok(ReadEnd(self.read_end))
                }
            }

            pub fn read_chunk(read_end: &ReadEnd, buf: &mut [u8]) -> io::Result<usize> {
                read(&read_end.0, buf).map_err(io::Error::from)
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn captures_writes_to_stderr_byte_for_byte() {
        let mut sink = Sink::new();
        sink.set_buffer(64);

        let capture = Capture::make(StdStream::Stderr).expect("capture begins");
        eprint!("1.60\n");
        capture.end(&mut sink);

        assert_eq!(sink.buffer().unwrap(), b"1.60\n");
    }
}
