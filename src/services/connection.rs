//! Connection strings and the directory of opened storage accounts.
//!
//! A connection string is a `;`-separated list of `Key=Value` pairs:
//!
//! ```text
//! AccountName=archive;AccountKey=<base64>;StorageDir=./data/archive;DatabaseUrl=sqlite://./data/archive/meta.db
//! ```
//!
//! `StorageDir` defaults to `./data/{AccountName}` and `DatabaseUrl` to a
//! `meta.db` file inside it.

use crate::services::{
    blob_service::{StoreError, StoreResult},
    local_store::{Account, LocalBlobStore},
};
use base64::{Engine as _, engine::general_purpose};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use std::{
    collections::HashMap,
    fmt,
    path::PathBuf,
    str::FromStr,
    sync::{Arc, RwLock},
};
use tokio::fs;
use tracing::{debug, info};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");
const ACCOUNT_NAME_MIN_LEN: usize = 3;
const ACCOUNT_NAME_MAX_LEN: usize = 24;

/// Parsed form of a storage connection string.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub account_name: String,
    pub account_key: Vec<u8>,
    pub storage_dir: PathBuf,
    pub database_url: String,
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("account_name", &self.account_name)
            .field("account_key", &"<redacted>")
            .field("storage_dir", &self.storage_dir)
            .field("database_url", &self.database_url)
            .finish()
    }
}

impl FromStr for ConnectionSettings {
    type Err = StoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = |msg: String| StoreError::InvalidConnectionString(msg);

        let mut account_name = None;
        let mut account_key = None;
        let mut storage_dir = None;
        let mut database_url = None;

        for part in value.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, val) = part
                .split_once('=')
                .ok_or_else(|| invalid(format!("`{part}` is not a Key=Value pair")))?;
            let val = val.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "accountname" => account_name = Some(val.to_string()),
                "accountkey" => {
                    let decoded = general_purpose::STANDARD
                        .decode(val)
                        .map_err(|_| invalid("AccountKey is not valid base64".into()))?;
                    if decoded.is_empty() {
                        return Err(invalid("AccountKey is empty".into()));
                    }
                    account_key = Some(decoded);
                }
                "storagedir" => storage_dir = Some(PathBuf::from(val)),
                "databaseurl" => database_url = Some(val.to_string()),
                other => return Err(invalid(format!("unknown key `{other}`"))),
            }
        }

        let account_name = account_name.ok_or_else(|| invalid("missing AccountName".into()))?;
        ensure_account_name_safe(&account_name)?;
        let account_key = account_key.ok_or_else(|| invalid("missing AccountKey".into()))?;
        let storage_dir =
            storage_dir.unwrap_or_else(|| PathBuf::from("./data").join(&account_name));
        let database_url = database_url
            .unwrap_or_else(|| format!("sqlite://{}", storage_dir.join("meta.db").display()));

        Ok(Self {
            account_name,
            account_key,
            storage_dir,
            database_url,
        })
    }
}

/// Accounts opened in this process, keyed by account name.
///
/// Copy sources named in a signed URI are resolved here, so a destination
/// can only read from accounts that were explicitly connected.
#[derive(Clone, Default)]
pub struct AccountDirectory {
    accounts: Arc<RwLock<HashMap<String, Arc<Account>>>>,
}

impl AccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or reuse) the account described by `settings`.
    ///
    /// Creates the storage directory, the SQLite file and the schema when
    /// missing.
    pub async fn connect(&self, settings: &ConnectionSettings) -> StoreResult<LocalBlobStore> {
        if let Some(existing) = self.get(&settings.account_name) {
            debug!(account = %settings.account_name, "reusing opened account");
            return Ok(LocalBlobStore::new(existing, self.clone()));
        }

        if !settings.storage_dir.exists() {
            fs::create_dir_all(&settings.storage_dir).await?;
            info!("Created storage directory at {}", settings.storage_dir.display());
        }

        let options = SqliteConnectOptions::from_str(&settings.database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await?;
                info!("Created missing directory {:?}", parent);
            }
        }
        debug!("Connecting using raw URL => {}", settings.database_url);

        let db = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        run_migrations(&db).await?;

        let account = Arc::new(Account::new(
            settings.account_name.clone(),
            settings.account_key.clone(),
            db,
            settings.storage_dir.clone(),
        ));
        self.insert(account.clone());
        info!(account = %settings.account_name, "storage account opened");

        Ok(LocalBlobStore::new(account, self.clone()))
    }

    pub(crate) fn lookup(&self, name: &str) -> StoreResult<Arc<Account>> {
        self.get(name)
            .ok_or_else(|| StoreError::UnknownAccount(name.to_string()))
    }

    fn get(&self, name: &str) -> Option<Arc<Account>> {
        self.accounts
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned()
    }

    fn insert(&self, account: Arc<Account>) {
        self.accounts
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(account.name.clone(), account);
    }
}

/// Apply the embedded schema, one statement at a time.
async fn run_migrations(db: &SqlitePool) -> StoreResult<()> {
    let statements = SCHEMA
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    debug!("Running {} migration statements...", statements.len());

    for stmt in statements {
        sqlx::query(stmt).execute(db).await?;
    }

    Ok(())
}

/// Account names are 3–24 lowercase letters or digits.
fn ensure_account_name_safe(name: &str) -> StoreResult<()> {
    let len = name.len();
    if !(ACCOUNT_NAME_MIN_LEN..=ACCOUNT_NAME_MAX_LEN).contains(&len)
        || !name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(StoreError::InvalidConnectionString(format!(
            "account name `{name}` must be 3-24 lowercase letters or digits"
        )));
    }
    Ok(())
}
