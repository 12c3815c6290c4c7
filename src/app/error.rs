use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Fatal conditions that stop a run before any file is processed.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Input folder not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Conversion engine `{0}` not found; install pandoc or set `enginePath`")]
    EngineUnavailable(String),

    #[error("Cannot prepare output folder {0}: {1}")]
    OutputRoot(PathBuf, #[source] std::io::Error),

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Output folder must differ from the input folder: {0}")]
    SameRoot(PathBuf),
}

/// Failure reported by a [`ConversionEngine`](crate::app::engine::ConversionEngine).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to run engine: {0}")]
    Io(#[source] std::io::Error),

    #[error("engine exited with {}: {}", fmt_exit(.exit_code), fmt_streams(.stderr, .stdout))]
    Failed {
        exit_code: Option<i32>,
        stderr: String,
        stdout: String,
    },

    #[error("engine timed out after {0:?}")]
    TimedOut(Duration),
}

/// Per-file failure; its `Display` becomes the `Failed` reason of the outcome.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("{path}: read failed: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Engine {
        path: String,
        #[source]
        source: EngineError,
    },

    #[error("{path}: write failed: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn fmt_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("code {c}"),
        None => "signal".to_string(),
    }
}

fn fmt_streams(stderr: &str, stdout: &str) -> String {
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    let stdout = stdout.trim();
    if stdout.is_empty() {
        "no output".to_string()
    } else {
        stdout.to_string()
    }
}
