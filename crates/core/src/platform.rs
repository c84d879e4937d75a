//! Trainer binary selection per host operating system.

use std::path::{Path, PathBuf};

use crate::error::CoreError;

/// Process exit code used when no trainer binary exists for the host OS.
///
/// This is the only condition that terminates the whole server.
pub const UNSUPPORTED_PLATFORM_EXIT_CODE: i32 = 34;

/// Map an OS identifier (as reported by [`std::env::consts::OS`]) to the
/// trainer binary file name shipped for it.
pub fn trainer_binary_name(os: &str) -> Result<&'static str, CoreError> {
    match os {
        "windows" => Ok("trainBPN.exe"),
        "linux" => Ok("trainBPN_linux"),
        "macos" => Ok("trainBPN_mac"),
        other => Err(CoreError::UnsupportedPlatform(other.to_string())),
    }
}

/// Resolve the trainer executable inside `bin_dir` for the given OS.
pub fn trainer_executable(bin_dir: &Path, os: &str) -> Result<PathBuf, CoreError> {
    trainer_binary_name(os).map(|name| bin_dir.join(name))
}

/// Resolve the trainer executable for the OS this process runs on.
pub fn host_trainer_executable(bin_dir: &Path) -> Result<PathBuf, CoreError> {
    trainer_executable(bin_dir, std::env::consts::OS)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
