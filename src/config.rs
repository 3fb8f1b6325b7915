use crate::{pipeline::enumerate::DEFAULT_PAGE_SIZE, services::connection::ConnectionSettings};
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::Parser;
use std::env;

pub const PAGE_SIZE_ENV: &str = "BLOB_MOVER_PAGE_SIZE";

/// Centralized run configuration.
/// Combines positional CLI arguments and environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub source_connection: ConnectionSettings,
    pub source_container: String,
    pub destination_connection: ConnectionSettings,
    pub destination_container: String,
    pub cutoff: DateTime<Utc>,
    pub page_size: usize,
}

/// Positional command-line arguments shared by both binaries.
#[derive(Parser, Debug)]
#[command(author, version, about = "Move blobs between storage containers by last-modified time")]
pub struct Args {
    /// Connection string of the source storage account
    pub source_connection: String,

    /// Container to move blobs out of
    pub source_container: String,

    /// Connection string of the destination storage account
    pub destination_connection: String,

    /// Container to copy blobs into
    pub destination_container: String,

    /// Cutoff instant (ISO 8601, e.g. 2023-03-01T00:00:00Z or 2023-03-01)
    pub cutoff: String,
}

impl AppConfig {
    /// Parse CLI args + environment into an AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();
        let page_size = match env::var(PAGE_SIZE_ENV) {
            Ok(value) => Some(value),
            Err(env::VarError::NotPresent) => None,
            Err(err) => return Err(err).context(format!("reading {PAGE_SIZE_ENV}")),
        };
        Self::from_parts(args, page_size)
    }

    /// Build a config from already-collected inputs.
    pub fn from_parts(args: Args, page_size: Option<String>) -> Result<Self> {
        let page_size = match page_size {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|size| *size > 0)
                .with_context(|| format!("parsing {PAGE_SIZE_ENV} value `{}`", value))?,
            None => DEFAULT_PAGE_SIZE,
        };

        Ok(Self {
            source_connection: args
                .source_connection
                .parse()
                .context("parsing source connection string")?,
            source_container: args.source_container,
            destination_connection: args
                .destination_connection
                .parse()
                .context("parsing destination connection string")?,
            destination_container: args.destination_container,
            cutoff: parse_cutoff(&args.cutoff)?,
            page_size,
        })
    }
}

/// Parse a cutoff instant.
///
/// Accepted forms:
/// - RFC 3339 with offset: `2023-03-01T10:30:00+02:00`, `2023-03-01T10:30:00Z`
/// - Date and time without offset, read as UTC: `2023-03-01T10:30:00`,
///   `2023-03-01 10:30:00`
/// - Date only, midnight UTC: `2023-03-01`
pub fn parse_cutoff(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| anyhow!("invalid date `{input}`"))?;
        return Ok(midnight.and_utc());
    }

    Err(anyhow!(
        "invalid cutoff `{input}`: expected ISO 8601 such as 2023-03-01T00:00:00Z or 2023-03-01"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine as _, engine::general_purpose};
    use chrono::TimeZone;

    fn args(cutoff: &str) -> Args {
        let key = general_purpose::STANDARD.encode(b"k");
        Args {
            source_connection: format!("AccountName=hot01;AccountKey={key}"),
            source_container: "incoming".into(),
            destination_connection: format!("AccountName=cold01;AccountKey={key}"),
            destination_container: "archive".into(),
            cutoff: cutoff.into(),
        }
    }

    #[test]
    fn cutoff_accepts_iso_forms() {
        let expected = Utc.with_ymd_and_hms(2023, 3, 1, 8, 0, 0).unwrap();
        assert_eq!(parse_cutoff("2023-03-01T08:00:00Z").unwrap(), expected);
        assert_eq!(parse_cutoff("2023-03-01T10:00:00+02:00").unwrap(), expected);
        assert_eq!(parse_cutoff("2023-03-01T08:00:00").unwrap(), expected);
        assert_eq!(parse_cutoff(" 2023-03-01 08:00:00 ").unwrap(), expected);
        assert_eq!(
            parse_cutoff("2023-03-01").unwrap(),
            Utc.with_ymd_and_hms(2023, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn cutoff_rejects_garbage() {
        assert!(parse_cutoff("last tuesday").is_err());
        assert!(parse_cutoff("2023-13-01").is_err());
    }

    #[test]
    fn page_size_defaults_and_overrides() {
        let cfg = AppConfig::from_parts(args("2023-03-01"), None).unwrap();
        assert_eq!(cfg.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(cfg.source_connection.account_name, "hot01");
        assert_eq!(cfg.destination_container, "archive");

        let cfg = AppConfig::from_parts(args("2023-03-01"), Some("250".into())).unwrap();
        assert_eq!(cfg.page_size, 250);
    }

    #[test]
    fn bad_page_size_or_connection_is_reported() {
        assert!(AppConfig::from_parts(args("2023-03-01"), Some("0".into())).is_err());
        assert!(AppConfig::from_parts(args("2023-03-01"), Some("many".into())).is_err());

        let mut broken = args("2023-03-01");
        broken.source_connection = "AccountName=hot01".into();
        let err = AppConfig::from_parts(broken, None).unwrap_err();
        assert!(format!("{err:#}").contains("source connection"));
    }
}
