use colored::*;

/// Enum representing the log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
}

/// Logs a message, dropping `Debug` lines unless `verbose` is set
pub fn verbose_log(level: LogLevel, message: &str, verbose: Option<bool>) {
    if should_log(level, verbose) {
        log(level, message);
    }
}

fn should_log(level: LogLevel, verbose: Option<bool>) -> bool {
    match verbose {
        Some(true) => true,
        _ => level != LogLevel::Debug,
    }
}

/// Logs messages to the console
pub fn log(level: LogLevel, message: &str) {
    match level {
        LogLevel::Info => println!("{}", format!("[INFO] {}", message).green()),
        LogLevel::Warn => eprintln!("{}", format!("[WARN] {}", message).yellow().bold()),
        LogLevel::Error => eprintln!("{}", format!("[ERROR] {}", message).red()),
        LogLevel::Debug => println!("{}", format!("[DEBUG] {}", message).yellow()),
    }
}
