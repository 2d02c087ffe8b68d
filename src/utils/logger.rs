use colored::Colorize;
use env_logger::Builder;
use log::{Level, LevelFilter, Record};
use std::io::Write;

/// `[costsweep] msg`, or `[costsweep LEVEL target] msg` for warnings and errors.
fn format_line(record: &Record) -> String {
    let name = env!("CARGO_PKG_NAME").cyan();
    let level = match record.level() {
        Level::Error => "ERROR".red(),
        Level::Warn => "WARN".yellow(),
        _ => return format!("[{}] {}", name, record.args()),
    };
    format!(
        "[{} {} {}] {}",
        name,
        level,
        record.target().white(),
        record.args()
    )
}

/// Dependencies log at WARN; this crate at INFO, or DEBUG when `verbose`. `RUST_LOG` still applies.
/// Safe to call more than once; later calls are ignored.
pub fn setup_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = Builder::from_default_env()
        .filter_level(LevelFilter::Warn)
        .filter_module(env!("CARGO_PKG_NAME"), level)
        .format(|buf, record| writeln!(buf, "{}", format_line(record)))
        .try_init();
}
