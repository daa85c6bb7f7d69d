//! Internal error type.
//!
//! None of these variants ever cross the public API boundary as a typed
//! error — every public entry point logs the `Display` of a `TapiError`
//! via [`log::error!`]/[`log::warn!`] and returns `bool`/`Option` instead,
//! per the diagnostic-channel design (spec.md §7: "No structured error
//! codes are surfaced to callers").

/// Errors produced internally while locating and patching call sites.
#[derive(thiserror::Error, Debug)]
pub enum TapiError {
    #[error("could not allocate disassembler state")]
    DisasmAllocFailed,

    #[error("no direct call to the target address was found in the caller's body")]
    CallNotFound,

    #[error("call at {call_addr:#x} does not encode a relative target; not patchable")]
    NotRelative { call_addr: usize },

    #[error("new target is out of the architecture's encodable displacement range")]
    DisplacementOutOfRange,

    #[error("instruction at {call_addr:#x} does not have the expected opcode for {arch}")]
    WrongOpcode { call_addr: usize, arch: &'static str },

    #[error("failed to change page protection: {0}")]
    ProtectFailed(String),

    #[error("pipe/dup I/O failure during stream capture: {0}")]
    PipeIoFailed(String),

    #[error("cannot restore a mock that has not been applied")]
    RestoreUnapplied,
}
