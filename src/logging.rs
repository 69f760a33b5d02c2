//! Process-wide logging bootstrap.
//!
//! The library only emits through the `log` facade. Front ends call
//! [`init_logging`] once at startup to route records through `flexi_logger`,
//! either to rotating files in a directory or to stderr.

use std::path::{Path, PathBuf};

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::info;
use once_cell::sync::OnceCell;

use crate::error::{DeckBuddyError, Result};

const LOG_FILE_BASENAME: &str = "mtg-deck-buddy";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();

struct LoggingState {
    spec: String,
    log_dir: Option<PathBuf>,
    _logger: LoggerHandle,
}

/// Start logging with a `flexi_logger` spec such as
/// [`DEFAULT_LOG_SPEC`](crate::config::DEFAULT_LOG_SPEC).
///
/// Calling again with the same arguments is a no-op; different arguments
/// are rejected once logging is running.
pub fn init_logging(spec: &str, log_dir: Option<&Path>) -> Result<()> {
    let state = LOGGING_STATE.get_or_try_init(|| start(spec, log_dir))?;

    if state.spec != spec || state.log_dir.as_deref() != log_dir {
        return Err(DeckBuddyError::InvalidArgument(format!(
            "logging already initialized with `{}`; refusing to reconfigure",
            state.spec
        )));
    }
    Ok(())
}

fn start(spec: &str, log_dir: Option<&Path>) -> Result<LoggingState> {
    let logger = Logger::try_with_str(spec)
        .map_err(|e| DeckBuddyError::InvalidArgument(format!("invalid log spec `{}`: {}", spec, e)))?;

    let logger = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            logger
                .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
                .rotate(
                    Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(MAX_LOG_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
        }
        None => logger.log_to_stderr(),
    };

    let handle = logger
        .start()
        .map_err(|e| DeckBuddyError::InvalidArgument(format!("failed to start logger: {}", e)))?;

    info!("Logging started with `{}`.", spec);
    Ok(LoggingState {
        spec: spec.to_string(),
        log_dir: log_dir.map(Path::to_path_buf),
        _logger: handle,
    })
}

/// The active log spec and directory, if logging was started.
pub fn logging_status() -> Option<(String, Option<PathBuf>)> {
    LOGGING_STATE
        .get()
        .map(|state| (state.spec.clone(), state.log_dir.clone()))
}
