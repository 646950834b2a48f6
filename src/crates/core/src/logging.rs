//! Log level handling
//!
//! The crate logs through the `log` facade only; hosts install the backend.
//! Raw gateway frames are logged under the `ai::` target prefix.

use log::LevelFilter;

pub fn parse_log_level(value: &str) -> Option<LevelFilter> {
    value.trim().parse::<LevelFilter>().ok()
}

/// Raise or lower the facade's max level; `source` names who asked.
pub fn apply_log_level(level: LevelFilter, source: &str) {
    let previous = log::max_level();
    if previous == level {
        return;
    }
    log::set_max_level(level);
    log::info!(
        "Log level changed: {} -> {} (source={})",
        previous,
        level,
        source
    );
}
