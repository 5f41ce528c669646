//! Exit codes following sysexits.h conventions.
//!
//! These codes provide semantic meaning for different failure modes,
//! enabling scripts to tell a missing record from an unreachable store.

use fieldrec_core::FieldrecError;

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all, partially failed batches).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (bad selection, unknown field).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Data format error (corrupt document, invalid capture filename).
/// Maps to EX_DATAERR from sysexits.h.
pub const DATA_ERROR: i32 = 65;

/// Cannot open input (unknown record, unreadable file).
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// Service unavailable (storage area, share capability).
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const UNAVAILABLE: i32 = 69;

/// I/O error (cannot write output file).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        // Typed errors from the core crate decide first
        let typed = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<FieldrecError>())
            .map(|e| match e {
                FieldrecError::StorageUnavailable(_) => UNAVAILABLE,
                FieldrecError::CorruptDocument { .. } | FieldrecError::InvalidFilename { .. } => {
                    DATA_ERROR
                }
                FieldrecError::Export(_) => IO_ERROR,
                FieldrecError::Grid(_) => DATA_ERROR,
                FieldrecError::Storage(_) | FieldrecError::Serialization(_) => GENERAL_ERROR,
            });

        let code = typed.unwrap_or_else(|| {
            if message.contains("Failed to read") || message.contains("Unknown record") {
                INPUT_ERROR
            } else if message.contains("No records selected")
                || message.contains("Unknown field")
                || message.contains("out of range")
            {
                USAGE_ERROR
            } else if message.contains("not supported") || message.contains("unavailable") {
                UNAVAILABLE
            } else if message.contains("Invalid capture filename") {
                DATA_ERROR
            } else if message.contains("Failed to write") {
                IO_ERROR
            } else {
                GENERAL_ERROR
            }
        });

        Self {
            code,
            message: Some(message),
        }
    }
}
