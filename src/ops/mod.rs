//! High-level operations built on the vault store.
//!
//! This module provides the user-facing operations: plaintext export and bulk
//! import, and the command dispatcher shared by the binary and the
//! interactive shell.

pub mod commands;
pub mod transfer;

// Re-export commonly used functions
pub use commands::App;
pub use transfer::{
    default_export_file_name, export_all, import_all, import_file, parse_import,
    read_import_file, write_export, ExportBundle, ExportRecord, ExportReport, ImportReport,
};
