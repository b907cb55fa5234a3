use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::LevelFilter;
use log4rs::Handle;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;

use crate::config::LogConfig;
use crate::errors::DbError;
use crate::telemetry::{self, AUDIT_TARGET, METRICS_TARGET};

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
const ROLL_SIZE: u64 = 10 * 1024 * 1024;

static HANDLE: OnceLock<Handle> = OnceLock::new();

fn config_error(e: impl std::fmt::Display) -> DbError {
    DbError::Configuration(format!("logging: {e}"))
}

/// Installs `config`, replacing whatever an earlier call in this process installed.
fn install(config: Config) -> Result<(), DbError> {
    if let Some(handle) = HANDLE.get() {
        handle.set_config(config);
        return Ok(());
    }
    let handle = log4rs::init_config(config).map_err(config_error)?;
    // a racing initializer lost to us above; its handle is never stored
    let _ = HANDLE.set(handle);
    Ok(())
}

/// Initializes logging from a log4rs YAML or TOML file.
///
/// # Errors
/// `Configuration` when the file cannot be read or a logger is already installed.
pub fn init_path(path: &Path) -> Result<(), DbError> {
    log4rs::init_file(path, log4rs::config::Deserializers::default()).map_err(config_error)
}

fn parse_level(level: Option<&str>) -> LevelFilter {
    level.and_then(|l| l.parse::<LevelFilter>().ok()).unwrap_or(LevelFilter::Info)
}

fn rolling(base: &Path, stem: &str, keep: u32) -> Result<RollingFileAppender, DbError> {
    let roller = FixedWindowRoller::builder()
        .build(&format!("{}", base.join(format!("{stem}.{{}}.log")).display()), keep)
        .map_err(config_error)?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(base.join(format!("{stem}.log")), Box::new(policy))
        .map_err(config_error)
}

/// Routes the root logger to `app.log`, the audit target to `audit.log` and the metrics
/// target to `metrics.log`, each rolled at 10 MiB keeping `retention` files.
///
/// - `dir`: base directory; the current directory when `None`
/// - `level`: error|warn|info|debug|trace, default info
/// - `retention`: default 7
///
/// # Errors
/// `Io` when the directory cannot be created, `Configuration` when log4rs rejects the setup.
pub fn configure_logging(dir: Option<&Path>, level: Option<&str>, retention: Option<u32>) -> Result<(), DbError> {
    let base = dir
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    std::fs::create_dir_all(&base)?;
    let keep = retention.unwrap_or(7);
    let lvl = parse_level(level);
    let config = Config::builder()
        .appender(Appender::builder().build("app", Box::new(rolling(&base, "app", keep)?)))
        .appender(Appender::builder().build("audit", Box::new(rolling(&base, "audit", keep)?)))
        .appender(Appender::builder().build("metrics", Box::new(rolling(&base, "metrics", keep)?)))
        .logger(Logger::builder().appender("audit").additive(false).build(AUDIT_TARGET, LevelFilter::Info))
        .logger(Logger::builder().appender("metrics").additive(false).build(METRICS_TARGET, lvl))
        .build(Root::builder().appender("app").build(lvl))
        .map_err(config_error)?;
    install(config)
}

/// Logs to stderr only.
///
/// # Errors
/// `Configuration` when log4rs rejects the setup.
pub fn configure_console(level: Option<&str>) -> Result<(), DbError> {
    let console = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(console)))
        .build(Root::builder().appender("stderr").build(parse_level(level)))
        .map_err(config_error)?;
    install(config)
}

/// Configures logging from `BSONITE_LOG_DIR`, `BSONITE_LOG_LEVEL` and
/// `BSONITE_LOG_RETENTION`.
///
/// # Errors
/// As [`configure_logging`].
pub fn configure_from_env() -> Result<(), DbError> {
    let dir = std::env::var("BSONITE_LOG_DIR").ok().map(PathBuf::from);
    let level = std::env::var("BSONITE_LOG_LEVEL").ok();
    let retention = std::env::var("BSONITE_LOG_RETENTION").ok().and_then(|s| s.parse::<u32>().ok());
    configure_logging(dir.as_deref(), level.as_deref(), retention)
}

/// Applies a `[log]` section: rolling files when `dir` is set, stderr otherwise.
///
/// # Errors
/// As [`configure_logging`].
pub fn init_from_config(cfg: &LogConfig) -> Result<(), DbError> {
    match &cfg.dir {
        Some(dir) => configure_logging(Some(dir), Some(&cfg.level), Some(cfg.retention)),
        None => configure_console(Some(&cfg.level)),
    }
}

/// Applies every runtime setting of `cfg`: logging and the slow query threshold.
///
/// # Errors
/// As [`init_from_config`].
pub fn init(cfg: &crate::config::Config) -> Result<(), DbError> {
    telemetry::set_slow_query_ms(cfg.query.slow_query_ms);
    init_from_config(&cfg.log)
}
