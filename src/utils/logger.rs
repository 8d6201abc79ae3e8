use chrono::Utc;
use log::info;
use std::io::Write;

/// Installs the global logger with one timestamped line per record.
///
/// `filter` uses the `env_logger` syntax (`info`, `bobple=debug`, ...).
/// `RUST_LOG`, when set, still wins.
pub fn init(filter: &str) {
    let installed = env_logger::Builder::new()
        .parse_filters(filter)
        .parse_env("RUST_LOG")
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] [{}:{}] {}",
                Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .try_init();

    if installed.is_ok() {
        info!("bobple logger initialized ({})", filter);
    }
}
