//! Process configuration (environment) and search tolerances (JSON file).

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

const DEFAULT_LOGIN_URL: &str = "https://austin.clareity.net/clp/login";
const DEFAULT_HOME_URL: &str =
    "https://matrix.abor.com/Matrix/Home?c=H4sIAAAAAAAEAItWMjc0NlHSySvNyRklyCeUDm*2jFE6PAk9JGMBdsmKSmEBAAA)&f=";
const DEFAULT_SEARCH_URL: &str = "https://matrix.abor.com/Matrix/Search/Residential/Residential";

#[derive(Debug, Clone)]
pub struct Config {
    pub login_url: String,
    pub home_url: String,
    pub search_url: String,
    pub username: String,
    pub password: String,
    pub report_path: PathBuf,
    pub tolerances_path: PathBuf,
    pub bind_addr: String,
    pub settle_ms: u64,
    pub headless: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            login_url: env::var("MLS_LOGIN_URL").unwrap_or_else(|_| DEFAULT_LOGIN_URL.to_string()),
            home_url: env::var("MLS_HOME_URL").unwrap_or_else(|_| DEFAULT_HOME_URL.to_string()),
            search_url: env::var("MLS_SEARCH_URL")
                .unwrap_or_else(|_| DEFAULT_SEARCH_URL.to_string()),
            username: env::var("MLS_USERNAME")?,
            password: env::var("MLS_PASSWORD")?,
            report_path: env::var("REPORT_PATH")
                .unwrap_or_else(|_| "Listing_Photos_Report.pdf".to_string())
                .into(),
            tolerances_path: env::var("TOLERANCES_PATH")
                .unwrap_or_else(|_| "config.json".to_string())
                .into(),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string()),
            settle_ms: env::var("SETTLE_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2000),
            headless: env::var("HEADLESS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),
        })
    }
}

/// Per-attribute search offsets applied around the subject property's values.
///
/// Every field is independently optional in the source document; a missing or
/// unreadable file is the same as an empty one.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct SearchTolerances {
    pub bedrooms: OffsetRange,
    pub bathrooms: OffsetRange,
    pub sqft: SqftTolerance,
    pub acres: AcresTolerance,
    pub year_built: YearTolerance,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct OffsetRange {
    pub min_offset: i64,
    pub max_offset: i64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SqftTolerance {
    #[serde(default = "default_sqft_offset")]
    pub offset: i64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AcresTolerance {
    #[serde(default = "default_acres_offset")]
    pub offset: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct YearTolerance {
    #[serde(default = "default_year_offset")]
    pub offset: i64,
}

fn default_sqft_offset() -> i64 {
    100
}

fn default_acres_offset() -> f64 {
    10.0
}

fn default_year_offset() -> i64 {
    5
}

impl Default for SqftTolerance {
    fn default() -> Self {
        Self {
            offset: default_sqft_offset(),
        }
    }
}

impl Default for AcresTolerance {
    fn default() -> Self {
        Self {
            offset: default_acres_offset(),
        }
    }
}

impl Default for YearTolerance {
    fn default() -> Self {
        Self {
            offset: default_year_offset(),
        }
    }
}

impl SearchTolerances {
    /// Loads the tolerances document. Never fails: a missing, unreadable, or
    /// malformed file resolves to the defaults.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&raw) {
            Ok(tolerances) => tolerances,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "malformed tolerances file, using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_offsets() {
        let t = SearchTolerances::default();
        assert_eq!(t.bedrooms.min_offset, 0);
        assert_eq!(t.bedrooms.max_offset, 0);
        assert_eq!(t.bathrooms.min_offset, 0);
        assert_eq!(t.bathrooms.max_offset, 0);
        assert_eq!(t.sqft.offset, 100);
        assert_eq!(t.acres.offset, 10.0);
        assert_eq!(t.year_built.offset, 5);
    }

    #[test]
    fn partial_document_keeps_defaults_for_missing_fields() {
        let t: SearchTolerances =
            serde_json::from_str(r#"{"sqft": {"offset": 250}, "bedrooms": {"min_offset": -1}}"#)
                .unwrap();
        assert_eq!(t.sqft.offset, 250);
        assert_eq!(t.bedrooms.min_offset, -1);
        assert_eq!(t.bedrooms.max_offset, 0);
        assert_eq!(t.acres.offset, 10.0);
        assert_eq!(t.year_built.offset, 5);
    }

    #[test]
    fn missing_file_resolves_to_defaults() {
        let t = SearchTolerances::load(Path::new("/nonexistent/tolerances.json"));
        assert_eq!(t.sqft.offset, 100);
    }

    #[test]
    fn malformed_file_resolves_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tolerances.json");
        fs::write(&path, "{not json").unwrap();
        let t = SearchTolerances::load(&path);
        assert_eq!(t.year_built.offset, 5);
    }
}
