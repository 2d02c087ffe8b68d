//! Application constants and package-derived paths.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived file names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    db_filename: String,
    config_filename: String,
    export_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache paths from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                db_filename: format!(".{pkg}"),
                config_filename: format!("{pkg}.toml"),
                export_filename: format!("{pkg}_export.csv"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Local state database (status marks, processed folders, run marker).
    pub fn db_filename(&self) -> &str {
        &self.db_filename
    }

    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    pub fn export_filename(&self) -> &str {
        &self.export_filename
    }
}

// ---- Environment ----

/// Names of the secrets read from the environment (or `.env`).
pub struct EnvKeys;

impl EnvKeys {
    pub const GOOGLE_ACCESS_TOKEN: &'static str = "GOOGLE_ACCESS_TOKEN";
    pub const INSIGHTLY_API_KEY: &'static str = "INSIGHTLY_API_KEY";
    pub const BASE_URL: &'static str = "BASE_URL";
    pub const USER_TOKEN: &'static str = "USER_TOKEN";
    pub const TENANT_TOKEN: &'static str = "TENANT_TOKEN";
}

// ---- Run defaults ----

pub struct RunDefaults;

impl RunDefaults {
    pub const WORKERS: usize = crate::pipeline::DEFAULT_WORKERS;
    /// Seconds between folders that made rate-limited calls.
    pub const SLEEP_TIMEOUT_SECS: u64 = 1;
    /// Folders without an accepted offer are escalated to the CRM after this many days.
    pub const STALENESS_DAYS: i64 = 60;
}
