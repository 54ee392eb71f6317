/// Application-level constants
pub const APP_NAME: &str = "Formsift";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable pointing at a JSON pipeline configuration file.
pub const CONFIG_PATH_ENV: &str = "FORMSIFT_CONFIG";

/// Log filter used when `RUST_LOG` is unset.
/// Library internals at info, noisy HTTP stack at warn.
pub fn default_log_filter() -> &'static str {
    "formsift=info,reqwest=warn,hyper=warn"
}
