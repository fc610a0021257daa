/// The four levels the engine itself distinguishes, mapped onto `log::Level` so every sink in the
/// workspace (stderr via `env_logger`, the debug console) speaks the same facade.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Info,
    Warning,
    Error,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> log::Level {
        match level {
            LogLevel::Trace => log::Level::Trace,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> LogLevel {
        match level {
            log::Level::Trace => LogLevel::Trace,
            log::Level::Debug | log::Level::Info => LogLevel::Info,
            log::Level::Warn => LogLevel::Warning,
            log::Level::Error => LogLevel::Error,
        }
    }
}

/// Something that wants to observe log output in addition to whatever `log` backend is installed
/// (the debug console, §4.7, implements this over its own text ring).
pub trait LogSink {
    fn on_log(&mut self, level: LogLevel, message: &str);
}
