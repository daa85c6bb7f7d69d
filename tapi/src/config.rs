//! Process-wide configuration, confined to a single opaque handle.
//!
//! Per the Design Notes ("confine them in a single opaque handle threaded
//! through public calls, or lazily evaluated behind a one-time
//! initializer"), architecture override and log path live behind one
//! [`OnceLock`], set once by [`crate::setup`].

use std::path::PathBuf;
use std::sync::OnceLock;

use crate::arch::Arch;

struct Config {
    arch_override: Option<Arch>,
}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Install the process-wide configuration. Calling this more than once is
/// a no-op after the first call (the original's `tapi_setup` is invoked
/// exactly once at library-load time via a constructor attribute; here it
/// is an explicit call the embedder makes before building any tests).
pub fn install(arch_override: Option<Arch>, log_path: Option<&std::path::Path>) {
    let _ = CONFIG.set(Config { arch_override });
    if let Some(path) = log_path {
        init_file_logger(path.to_path_buf());
    }
}

pub(crate) fn architecture_override() -> Option<Arch> {
    CONFIG.get().and_then(|c| c.arch_override)
}

fn init_file_logger(path: PathBuf) {
    use std::fs::OpenOptions;

    let file = match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(f) => f,
        Err(e) => {
            log::error!("tapi, setup; could not open log path {path:?}: {e}");
            return;
        }
    };
    let target = Box::new(file);
    // Best-effort: if a global logger is already installed (by the
    // embedding application, or by a previous call) this silently does
    // nothing rather than panicking, matching the library's policy of
    // never unwinding across its boundary.
    let _ = env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .try_init();
}
