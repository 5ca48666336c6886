/// Build identifier baked in by `build.rs`.
pub const GIT_VERSION: &str = env!("GIT_VERSION");

/// Crate version plus build identifier, e.g. `0.1.0 (v0.1.0-3-gabc1234)`.
pub fn long_version() -> String {
    format!("{} ({})", env!("CARGO_PKG_VERSION"), GIT_VERSION)
}
