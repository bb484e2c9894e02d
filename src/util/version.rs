pub const APP_NAME: &str = "Craft Value Scanner";
pub const APP_BIN: &str = "craft-value-scanner";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version_label() -> String {
    format!("v{APP_VERSION}")
}

/// User agent sent to the game-data API.
pub fn user_agent() -> String {
    format!("{APP_BIN}/{APP_VERSION}")
}
