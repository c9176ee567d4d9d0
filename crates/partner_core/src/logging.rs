//! Process logging for the portal.
//!
//! # Responsibility
//! - Start one `flexi_logger` backend per process, to rolling files or stderr.
//! - Log panics as single-line, length-capped events.
//!
//! # Invariants
//! - Repeating [`init_logging`] with the same settings is a no-op.
//! - Asking for different settings after start is an error, never a panic.
//! - Events are `event=<name> module=<module> status=<..>` lines carrying
//!   metadata only; submitted form values are never logged.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "partner_portal";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_FILES: usize = 5;
const PANIC_SUMMARY_CHARS: usize = 160;
const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Rolling files inside this directory.
    Dir(PathBuf),
}

impl Display for LogTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stderr => write!(f, "stderr"),
            Self::Dir(dir) => write!(f, "{}", dir.display()),
        }
    }
}

/// Validated logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: &'static str,
    pub target: LogTarget,
}

impl LogSettings {
    /// Validates a level name and optional directory.
    ///
    /// Relative directories resolve against the current working directory.
    pub fn parse(level: &str, log_dir: Option<&str>) -> Result<Self, LoggingError> {
        let wanted = level.trim().to_ascii_lowercase();
        let wanted = if wanted == "warning" { "warn".to_string() } else { wanted };
        let level = LEVELS
            .iter()
            .copied()
            .find(|known| *known == wanted)
            .ok_or(LoggingError::UnknownLevel(wanted))?;

        let target = match log_dir.map(str::trim) {
            None => LogTarget::Stderr,
            Some("") => return Err(LoggingError::EmptyDirectory),
            Some(dir) => {
                let dir = Path::new(dir);
                if dir.is_absolute() {
                    LogTarget::Dir(dir.to_path_buf())
                } else {
                    let cwd = std::env::current_dir()
                        .map_err(|err| LoggingError::Directory(dir.to_path_buf(), err))?;
                    LogTarget::Dir(cwd.join(dir))
                }
            }
        };
        Ok(Self { level, target })
    }
}

/// Reasons logging could not be started.
#[derive(Debug)]
pub enum LoggingError {
    UnknownLevel(String),
    EmptyDirectory,
    Directory(PathBuf, std::io::Error),
    Backend(flexi_logger::FlexiLoggerError),
    /// Logging already runs with other settings.
    AlreadyStarted { active: LogSettings, requested: LogSettings },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected one of {}",
                LEVELS.join("|")
            ),
            Self::EmptyDirectory => write!(f, "log directory cannot be empty"),
            Self::Directory(dir, err) => {
                write!(f, "cannot use log directory `{}`: {err}", dir.display())
            }
            Self::Backend(err) => write!(f, "failed to start logger: {err}"),
            Self::AlreadyStarted { active, requested } => write!(
                f,
                "logging already started with {} to {}; refusing {} to {}",
                active.level, active.target, requested.level, requested.target
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Directory(_, err) => Some(err),
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

struct ActiveLogger {
    settings: LogSettings,
    _handle: LoggerHandle,
}

/// Starts process logging; see the module invariants.
pub fn init_logging(level: &str, log_dir: Option<&str>) -> Result<(), LoggingError> {
    let requested = LogSettings::parse(level, log_dir)?;
    let active = ACTIVE.get_or_try_init(|| start(&requested))?;
    if active.settings != requested {
        return Err(LoggingError::AlreadyStarted {
            active: active.settings.clone(),
            requested,
        });
    }
    Ok(())
}

/// Settings of the running logger, if any.
pub fn logging_status() -> Option<LogSettings> {
    ACTIVE.get().map(|active| active.settings.clone())
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start(settings: &LogSettings) -> Result<ActiveLogger, LoggingError> {
    let logger = Logger::try_with_str(settings.level).map_err(LoggingError::Backend)?;
    let logger = match &settings.target {
        LogTarget::Stderr => logger
            .log_to_stderr()
            .format_for_stderr(flexi_logger::detailed_format),
        LogTarget::Dir(dir) => {
            std::fs::create_dir_all(dir)
                .map_err(|err| LoggingError::Directory(dir.clone(), err))?;
            logger
                .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
                .rotate(
                    Criterion::Size(ROTATE_AT_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(KEEP_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
        }
    };
    let handle = logger.start().map_err(LoggingError::Backend)?;
    install_panic_hook();

    info!(
        "event=logging_start module=core status=ok level={} target={} os={} version={}",
        settings.level,
        settings.target,
        std::env::consts::OS,
        env!("CARGO_PKG_VERSION")
    );
    Ok(ActiveLogger {
        settings: settings.clone(),
        _handle: handle,
    })
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map_or_else(|| "unknown".to_string(), |loc| format!("{}:{}", loc.file(), loc.line()));
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=panic module=core status=error location={} payload={}",
            location,
            one_line(&payload, PANIC_SUMMARY_CHARS)
        );
        previous(panic_info);
    }));
}

/// Flattens newlines and caps length at `max_chars` (plus `...`).
fn one_line(value: &str, max_chars: usize) -> String {
    let flat = value.replace(['\n', '\r'], " ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut capped: String = flat.chars().take(max_chars).collect();
    capped.push_str("...");
    capped
}

#[cfg(test)]
mod tests {
    use super::{init_logging, logging_status, one_line, LogSettings, LogTarget, LoggingError};

    #[test]
    fn parse_normalizes_levels() {
        assert_eq!(LogSettings::parse(" WARNING ", None).unwrap().level, "warn");
        assert_eq!(LogSettings::parse("Info", None).unwrap().target, LogTarget::Stderr);
        assert!(matches!(
            LogSettings::parse("verbose", None),
            Err(LoggingError::UnknownLevel(_))
        ));
    }

    #[test]
    fn parse_resolves_relative_directories() {
        let settings = LogSettings::parse("info", Some("logs/portal")).unwrap();
        let LogTarget::Dir(dir) = settings.target else {
            panic!("expected a directory target");
        };
        assert!(dir.is_absolute());
        assert!(dir.ends_with("logs/portal"));
        assert!(matches!(
            LogSettings::parse("info", Some("  ")),
            Err(LoggingError::EmptyDirectory)
        ));
    }

    #[test]
    fn one_line_flattens_and_caps() {
        assert_eq!(one_line("a\nb", 10), "a b");
        assert_eq!(one_line("pincode\n100045\r", 8), "pincode ...");
    }

    #[test]
    fn init_is_idempotent_and_rejects_other_settings() {
        let dir = tempfile::tempdir().unwrap();
        let dir_str = dir.path().to_str().unwrap().to_string();

        init_logging("info", Some(&dir_str)).unwrap();
        init_logging("INFO", Some(&dir_str)).unwrap();

        assert!(matches!(
            init_logging("debug", Some(&dir_str)),
            Err(LoggingError::AlreadyStarted { .. })
        ));
        assert!(init_logging("info", None).is_err());

        let active = logging_status().unwrap();
        assert_eq!(active.level, "info");
        assert_eq!(active.target, LogTarget::Dir(dir.path().to_path_buf()));
    }
}
