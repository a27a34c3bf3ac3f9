// Error types for shuangpin

use snafu::Snafu;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DrillError {
    // Session lifecycle misuse
    #[snafu(display("Invalid input: {reason}"))]
    InvalidInput { reason: String },
    #[snafu(display("Cannot {operation} while session is {state}"))]
    InvalidState { operation: String, state: String },

    // Scheme and data lookup
    #[snafu(display("Unknown shuangpin scheme: {name}"))]
    UnknownScheme { name: String },
    #[snafu(display("Invalid shuangpin scheme: {}", errors.join("; ")))]
    InvalidScheme { errors: Vec<String> },
    #[snafu(display("Unknown lesson: {id}"))]
    UnknownLesson { id: u32 },
    #[snafu(display("Embedded data file not found: {name}"))]
    DataFile { name: String },
    #[snafu(display("Error parsing data file"))]
    DataParse { source: serde_json::Error },

    // Persistence
    #[snafu(display("Statistics database error"))]
    Storage { source: rusqlite::Error },
    #[snafu(display("Could not find application data directory"))]
    NoDataDir,
    #[snafu(display("File operation failed"))]
    Io { source: io::Error },

    // Export and import
    #[snafu(display("Could not write CSV export"))]
    Csv { source: csv::Error },
    #[snafu(display("JSON error for {}", path.display()))]
    JsonFile {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl From<rusqlite::Error> for DrillError {
    fn from(source: rusqlite::Error) -> Self {
        DrillError::Storage { source }
    }
}

pub type Result<T, E = DrillError> = std::result::Result<T, E>;
