use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::config::LoggingConfig;

// Keep a guard for the non-blocking console writer so it is never dropped.
static CONSOLE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

fn parse_level(s: &str) -> LevelFilter {
    match s.to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" | "none" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

// ================= rotating file writer =================

#[derive(Clone)]
struct RotatingWriter(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl<'a> fmt::MakeWriter<'a> for RotatingWriter {
    type Writer = RotatingWriterHandle;

    fn make_writer(&'a self) -> Self::Writer {
        RotatingWriterHandle(Arc::clone(&self.0))
    }
}

struct RotatingWriterHandle(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl Write for RotatingWriterHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.lock().unwrap().flush()
    }
}

fn build_file_writer(cfg: &LoggingConfig, base_dir: &Path) -> Option<RotatingWriter> {
    if cfg.file.trim().is_empty() {
        return None;
    }
    let log_path = resolve_log_path(&cfg.file, base_dir);
    if let Some(parent) = log_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("Failed to create log dir '{}': {e}", parent.display());
            return None;
        }
    }

    // Retention policy: prefer MaxFiles if provided, else Age.
    let limit = match cfg.max_backups {
        Some(n) => FileLimit::MaxFiles(n),
        None => FileLimit::Age(chrono::Duration::days(cfg.max_age_days.unwrap_or(7) as i64)),
    };

    let rot = FileRotate::new(
        &log_path,
        AppendTimestamp::default(limit),
        ContentLimit::BytesSurpassed(cfg.max_size_mb as usize * 1024 * 1024),
        Compression::None,
        None,
    );
    Some(RotatingWriter(Arc::new(Mutex::new(rot))))
}

// ================= public init =================

/// Install the global tracing subscriber: human-friendly console output on
/// stderr plus an optional rotating JSON file sink. `RUST_LOG`, when set,
/// acts as a global upper bound for both.
pub fn init_logging(cfg: &LoggingConfig, base_dir: &Path) {
    use tracing_subscriber::{EnvFilter, Registry};

    // Bridge `log` → `tracing` before installing the subscriber.
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("LogTracer init skipped: {e}");
    }

    let env: Option<EnvFilter> = EnvFilter::try_from_default_env().ok();

    let (nb_stderr, guard) = tracing_appender::non_blocking(std::io::stderr());
    let _ = CONSOLE_GUARD.set(guard);

    let console_layer = fmt::layer()
        .with_writer(nb_stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(parse_level(&cfg.console_level));

    let file_layer = build_file_writer(cfg, base_dir).map(|writer| {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(true)
            .with_level(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(writer)
            .with_filter(parse_level(&cfg.file_level))
    });

    let _ = Registry::default()
        .with(env)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_parse_case_insensitively() {
        assert_eq!(parse_level("DEBUG"), LevelFilter::DEBUG);
        assert_eq!(parse_level("off"), LevelFilter::OFF);
        assert_eq!(parse_level("none"), LevelFilter::OFF);
        assert_eq!(parse_level("bogus"), LevelFilter::INFO);
    }

    #[test]
    fn relative_log_paths_resolve_under_base_dir() {
        let base = Path::new("/var/lib/medley");
        assert_eq!(
            resolve_log_path("logs/medley.log", base),
            PathBuf::from("/var/lib/medley/logs/medley.log")
        );
        assert_eq!(
            resolve_log_path("/tmp/medley.log", base),
            PathBuf::from("/tmp/medley.log")
        );
    }

    #[test]
    fn empty_file_setting_disables_the_file_sink() {
        let cfg = LoggingConfig::default();
        assert!(build_file_writer(&cfg, Path::new("/tmp")).is_none());
    }

    #[test]
    fn file_sink_is_created_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = LoggingConfig {
            file: "medley.log".to_string(),
            max_backups: Some(3),
            ..Default::default()
        };
        assert!(build_file_writer(&cfg, dir.path()).is_some());
    }
}
