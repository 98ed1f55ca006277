//! Path resolution for the agenda database and config file.

fn home() -> String {
    std::env::var("HOME").unwrap_or_else(|_| ".".into())
}

/// Resolve the database path.
/// Checks `AGENDA_DB` env var, falls back to `$HOME/.agenda/agenda.db`.
pub fn db_path() -> String {
    std::env::var("AGENDA_DB").unwrap_or_else(|_| format!("{}/.agenda/agenda.db", home()))
}

/// Resolve the config file path.
/// Checks `AGENDA_CONFIG` env var, falls back to `$HOME/.agenda/config.toml`.
pub fn config_path() -> String {
    std::env::var("AGENDA_CONFIG").unwrap_or_else(|_| format!("{}/.agenda/config.toml", home()))
}
