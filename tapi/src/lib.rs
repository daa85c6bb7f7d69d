//! In-process unit testing via call-site mocking by binary patching.
//!
//! The headline capability: given a caller `F` and a callee `T` that `F`
//! invokes directly, [`mock::Mock`] rewrites the call instruction inside
//! `F` so it dispatches to a replacement instead, then restores the
//! original bytes on demand. A secondary [`capture`] subsystem redirects
//! a standard stream into a buffer or file for the duration of a test,
//! and [`runner`] sequences many such tests serially.
//!
//! Supported architectures: x86, x86-64, ARM (A32 and Thumb), and
//! AArch64. See the per-module docs for the architecture-specific
//! encoding rules.

pub mod arch;
pub mod capture;
mod config;
pub mod disasm;
pub mod error;
pub mod funcsize;
pub mod guard;
pub mod locate;
#[macro_use]
pub mod macros;
pub mod mock;
pub mod patch;
pub mod runner;
pub mod sink;

pub use arch::Arch;
pub use capture::{Capture, StdStream};
pub use error::TapiError;
pub use mock::Mock;
pub use runner::{Runner, Test, TestResult};
pub use sink::Sink;

use std::path::Path;

/// Install process-wide configuration before building any tests:
/// optionally override the probed architecture (useful for
/// cross-targeted unit tests run on a different host), and optionally
/// bind a file as the destination for this crate's own diagnostic log
/// lines.
pub fn setup(arch_override: Option<Arch>, log_path: Option<&Path>) {
    config::install(arch_override, log_path);
}
