use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Vitalink";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is unset
pub fn default_log_filter() -> String {
    format!("{}=info", env!("CARGO_PKG_NAME"))
}

/// Get the application data directory
/// ~/Vitalink/ on all platforms (user-visible, per design requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Vitalink")
}

/// Get the database file path
pub fn database_path() -> PathBuf {
    app_data_dir().join("vitalink.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("Vitalink"));
    }

    #[test]
    fn database_under_app_data() {
        let db = database_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with("vitalink.db"));
    }

    #[test]
    fn default_filter_scopes_to_crate() {
        assert_eq!(default_log_filter(), "vitalink=info");
    }
}
