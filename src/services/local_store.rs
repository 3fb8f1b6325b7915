//! src/services/local_store.rs
//!
//! LocalBlobStore: a storage account backed by SQLite for blob metadata and
//! local disk for payloads sharded beneath
//! `base_path/{container}/{shard}/{shard}/{name}`.
//!
//! Service-side copies are accepted asynchronously: the destination records
//! a `pending` copy row, then a background task streams the payload from the
//! source account and publishes progress on the row as it goes.

use crate::{
    models::{
        container::Container,
        copy::{CopyState, CopyStatus},
        grant::{BlobOperation, SasPermissions, SignedAccessGrant},
        object::{BlobProperties, BlobRecord},
    },
    services::{
        blob_service::{BlobService, ListSegment, StoreError, StoreResult},
        connection::AccountDirectory,
        sas::{self, BlobLocator},
    },
};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt, pin_mut};
use md5::Context;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

const MAX_BLOB_NAME_LEN: usize = 1024;
const CONTAINER_NAME_MIN_LEN: usize = 3;
const CONTAINER_NAME_MAX_LEN: usize = 63;
pub const MAX_LIST_RESULTS: usize = 5000;
const COPY_BUFFER_BYTES: usize = 64 * 1024;
const PROGRESS_STEP_BYTES: i64 = 1024 * 1024;

const BLOB_COLUMNS: &str = "id, container_id, name, content_type, size_bytes, etag, \
     last_modified, is_deleted, copy_id, copy_status, copy_source, \
     copy_bytes_copied, copy_total_bytes, copy_status_description";

/// One storage account: its signing key, metadata pool and payload root.
pub struct Account {
    pub(crate) name: String,
    key: Vec<u8>,
    pub(crate) db: SqlitePool,
    pub(crate) base_path: PathBuf,
}

/// Optional attributes for [`LocalBlobStore::upload_blob_stream`].
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub content_type: Option<String>,
    /// Recorded modification time; defaults to the upload time. Used when
    /// importing blobs whose provenance is known.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Handle to a local storage account.
///
/// Cloning is cheap; clones share the pool and the account directory used to
/// resolve copy sources in other accounts.
#[derive(Clone)]
pub struct LocalBlobStore {
    account: Arc<Account>,
    directory: AccountDirectory,
}

/// Everything the background copy task needs once the request is accepted.
struct CopyJob {
    copy_id: String,
    destination: Container,
    name: String,
    source: BlobLocator,
    expires_on: DateTime<Utc>,
}

impl Account {
    pub(crate) fn new(name: String, key: Vec<u8>, db: SqlitePool, base_path: PathBuf) -> Self {
        Self {
            name,
            key,
            db,
            base_path,
        }
    }

    /// Compute the physical base folder path for a container.
    fn container_root(&self, container: &str) -> PathBuf {
        let mut path = self.base_path.clone();
        path.push(container);
        path
    }

    /// Two-level shard identifiers from MD5(container/name), 00–ff each.
    fn blob_shards(container: &str, name: &str) -> (String, String) {
        let digest = md5::compute(format!("{}/{}", container, name));
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Combines base_path/container/{shard}/{shard}/{name}.
    /// Parent directories may not exist yet.
    fn blob_path(&self, container: &str, name: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::blob_shards(container, name);
        let mut path = self.container_root(container);
        path.push(shard_a);
        path.push(shard_b);
        path.push(name);
        path
    }

    async fn fetch_container(&self, container: &str) -> StoreResult<Container> {
        ensure_container_name_safe(container)?;
        sqlx::query_as::<Sqlite, Container>(
            "SELECT id, name, created_at FROM containers WHERE name = ?",
        )
        .bind(container)
        .fetch_one(&self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => StoreError::ContainerNotFound(container.to_string()),
            other => StoreError::Sqlx(other),
        })
    }

    /// Fetch a live (not soft-deleted) blob row.
    async fn fetch_blob(&self, container: &Container, name: &str) -> StoreResult<BlobRecord> {
        sqlx::query_as::<Sqlite, BlobRecord>(&format!(
            "SELECT {BLOB_COLUMNS} FROM blobs
             WHERE name = ? AND container_id = ? AND is_deleted = 0"
        ))
        .bind(name)
        .bind(container.id)
        .fetch_one(&self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => StoreError::BlobNotFound {
                container: container.name.clone(),
                name: name.to_string(),
            },
            other => StoreError::Sqlx(other),
        })
    }

    /// Verify that `uri` is a valid grant for `op` on a blob in this account.
    fn authorize(&self, uri: &Url, op: BlobOperation) -> StoreResult<BlobLocator> {
        let (locator, token) = sas::parse_blob_uri(uri)?;
        if locator.account != self.name {
            return Err(StoreError::AuthorizationFailed(format!(
                "uri targets account `{}`, not `{}`",
                locator.account, self.name
            )));
        }
        let token = token.ok_or_else(|| {
            StoreError::AuthorizationFailed("uri carries no shared access signature".into())
        })?;
        sas::verify(&self.key, &locator, &token, op, Utc::now())?;
        Ok(locator)
    }

    /// Recursively remove empty directories up to the container root.
    async fn prune_empty_dirs(&self, start: &Path, stop: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

impl LocalBlobStore {
    pub(crate) fn new(account: Arc<Account>, directory: AccountDirectory) -> Self {
        Self { account, directory }
    }

    /// Verify a signed URI against this account's key.
    ///
    /// Returns the blob the grant is scoped to if `op` is permitted.
    pub fn authorize(&self, uri: &Url, op: BlobOperation) -> StoreResult<BlobLocator> {
        self.account.authorize(uri, op)
    }

    /// Stream-upload a blob to disk and upsert its metadata.
    ///
    /// - Writes bytes incrementally to a temporary file.
    /// - Computes MD5/etag and size while streaming.
    /// - Atomically renames into final location.
    /// - Overwrites any existing blob of the same name.
    pub async fn upload_blob_stream<S>(
        &self,
        container: &str,
        name: &str,
        options: UploadOptions,
        stream: S,
    ) -> StoreResult<BlobProperties>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        ensure_blob_name_safe(name)?;
        let container_rec = self.account.fetch_container(container).await?;

        let file_path = self.account.blob_path(&container_rec.name, name);
        let (tmp_path, mut file) = create_temp_file(&file_path).await?;

        let mut size_bytes: i64 = 0;
        let mut digest = Context::new();
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(StoreError::Io(err));
                }
            };
            size_bytes += chunk.len() as i64;
            digest.consume(&chunk);
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StoreError::Io(err));
            }
        }
        commit_temp_file(file, &tmp_path, &file_path).await?;

        let last_modified = options.last_modified.unwrap_or_else(Utc::now);
        let etag = format!("{:x}", digest.compute());

        let upsert = sqlx::query_as::<Sqlite, BlobRecord>(&format!(
            r#"
            INSERT INTO blobs (
                id, container_id, name, content_type, size_bytes, etag,
                last_modified, is_deleted
            ) VALUES (?, ?, ?, ?, ?, ?, ?, 0)
            ON CONFLICT(container_id, name) DO UPDATE SET
                content_type = excluded.content_type,
                size_bytes = excluded.size_bytes,
                etag = excluded.etag,
                last_modified = excluded.last_modified,
                is_deleted = 0,
                copy_id = NULL,
                copy_status = NULL,
                copy_source = NULL,
                copy_bytes_copied = NULL,
                copy_total_bytes = NULL,
                copy_status_description = NULL
            RETURNING {BLOB_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(container_rec.id)
        .bind(name)
        .bind(options.content_type)
        .bind(size_bytes)
        .bind(&etag)
        .bind(last_modified)
        .fetch_one(&self.account.db)
        .await;

        match upsert {
            Ok(record) => Ok(record.properties()),
            Err(err) => {
                let _ = fs::remove_file(&file_path).await;
                Err(StoreError::Sqlx(err))
            }
        }
    }

    /// Read a blob's whole payload.
    pub async fn download_blob(&self, container: &str, name: &str) -> StoreResult<Bytes> {
        ensure_blob_name_safe(name)?;
        let container_rec = self.account.fetch_container(container).await?;
        self.account.fetch_blob(&container_rec, name).await?;

        let file_path = self.account.blob_path(&container_rec.name, name);
        match fs::read(&file_path).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(StoreError::BlobNotFound {
                container: container.to_string(),
                name: name.to_string(),
            }),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    fn source_account(&self, account: &str) -> StoreResult<Arc<Account>> {
        if account == self.account.name {
            Ok(self.account.clone())
        } else {
            self.directory.lookup(account)
        }
    }
}

#[async_trait]
impl BlobService for LocalBlobStore {
    fn account_name(&self) -> &str {
        &self.account.name
    }

    async fn create_container_if_not_exists(&self, container: &str) -> StoreResult<bool> {
        ensure_container_name_safe(container)?;
        fs::create_dir_all(self.account.container_root(container)).await?;

        let result = sqlx::query(
            "INSERT INTO containers (id, name, created_at) VALUES (?, ?, ?)
             ON CONFLICT(name) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(container)
        .bind(Utc::now())
        .execute(&self.account.db)
        .await?;

        let created = result.rows_affected() > 0;
        if created {
            info!(account = %self.account.name, container, "created container");
        }
        Ok(created)
    }

    /// List live blobs in name order.
    ///
    /// The marker is the base64 of the last name on the previous page.
    async fn list_blobs_segment(
        &self,
        container: &str,
        marker: Option<&str>,
        max_results: usize,
    ) -> StoreResult<ListSegment> {
        let container_rec = self.account.fetch_container(container).await?;
        let max_results = max_results.clamp(1, MAX_LIST_RESULTS);
        let fetch_limit = max_results + 1;

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT name FROM blobs WHERE is_deleted = 0 AND container_id = ",
        );
        builder.push_bind(container_rec.id);

        if let Some(marker) = marker {
            builder.push(" AND name > ");
            builder.push_bind(decode_marker(marker)?);
        }

        builder.push(" ORDER BY name ASC LIMIT ");
        builder.push_bind(fetch_limit as i64);

        let mut names: Vec<String> = builder
            .build_query_scalar()
            .fetch_all(&self.account.db)
            .await?;

        let mut next_marker = None;
        if names.len() == fetch_limit {
            names.pop();
            next_marker = names.last().map(|last| encode_marker(last));
        }

        Ok(ListSegment { names, next_marker })
    }

    async fn get_properties(&self, container: &str, name: &str) -> StoreResult<BlobProperties> {
        ensure_blob_name_safe(name)?;
        let container_rec = self.account.fetch_container(container).await?;
        let record = self.account.fetch_blob(&container_rec, name).await?;
        Ok(record.properties())
    }

    fn sign_blob_uri(
        &self,
        container: &str,
        name: &str,
        permissions: SasPermissions,
        expires_on: DateTime<Utc>,
    ) -> StoreResult<SignedAccessGrant> {
        ensure_container_name_safe(container)?;
        ensure_blob_name_safe(name)?;
        sas::sign_blob_uri(
            &self.account.name,
            &self.account.key,
            container,
            name,
            permissions,
            None,
            expires_on,
        )
    }

    /// Accept a copy request and move the bytes in the background.
    ///
    /// The source grant is checked up front; its expiry is checked again
    /// for every chunk, so a copy outliving its grant fails.
    async fn start_copy_from_uri(
        &self,
        container: &str,
        name: &str,
        source: &Url,
    ) -> StoreResult<CopyState> {
        ensure_blob_name_safe(name)?;
        let destination = self.account.fetch_container(container).await?;

        let (requested, token) = sas::parse_blob_uri(source)?;
        let source_account = self.source_account(&requested.account)?;
        let locator = source_account.authorize(source, BlobOperation::Read)?;
        let expires_on = token
            .map(|t| t.expiry)
            .ok_or_else(|| StoreError::AuthorizationFailed("missing expiry".into()))?;

        let source_container = source_account.fetch_container(&locator.container).await?;
        let source_record = source_account
            .fetch_blob(&source_container, &locator.blob)
            .await?;
        let total_bytes = source_record.size_bytes;

        let copy_id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO blobs (
                id, container_id, name, content_type, size_bytes, etag,
                last_modified, is_deleted, copy_id, copy_status, copy_source,
                copy_bytes_copied, copy_total_bytes, copy_status_description
            ) VALUES (?, ?, ?, ?, 0, NULL, ?, 0, ?, ?, ?, 0, ?, NULL)
            ON CONFLICT(container_id, name) DO UPDATE SET
                content_type = excluded.content_type,
                last_modified = excluded.last_modified,
                is_deleted = 0,
                copy_id = excluded.copy_id,
                copy_status = excluded.copy_status,
                copy_source = excluded.copy_source,
                copy_bytes_copied = 0,
                copy_total_bytes = excluded.copy_total_bytes,
                copy_status_description = NULL
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(destination.id)
        .bind(name)
        .bind(source_record.content_type.clone())
        .bind(Utc::now())
        .bind(&copy_id)
        .bind(CopyStatus::Pending.as_str())
        .bind(sas::strip_signature(source))
        .bind(total_bytes)
        .execute(&self.account.db)
        .await?;

        debug!(
            copy_id = %copy_id,
            source = %sas::strip_signature(source),
            destination = %format!("{}/{}", container, name),
            "copy accepted"
        );

        let job = CopyJob {
            copy_id: copy_id.clone(),
            destination,
            name: name.to_string(),
            source: locator,
            expires_on,
        };
        let dest_account = self.account.clone();
        tokio::spawn(async move {
            run_copy(dest_account, source_account, job).await;
        });

        Ok(CopyState::pending(
            copy_id,
            0,
            Some(total_bytes.max(0) as u64),
        ))
    }

    async fn get_copy_state(&self, container: &str, name: &str) -> StoreResult<CopyState> {
        ensure_blob_name_safe(name)?;
        let container_rec = self.account.fetch_container(container).await?;
        let record = self.account.fetch_blob(&container_rec, name).await?;
        record.copy_state().ok_or_else(|| StoreError::NoCopyRecorded {
            container: container.to_string(),
            name: name.to_string(),
        })
    }

    /// Soft-delete a blob and remove its payload.
    ///
    /// - Sets `is_deleted = 1`
    /// - Deletes physical file best-effort
    /// - Prunes empty shard directories
    async fn delete_if_exists(&self, container: &str, name: &str) -> StoreResult<bool> {
        ensure_blob_name_safe(name)?;
        let container_rec = self.account.fetch_container(container).await?;

        let result = sqlx::query(
            "UPDATE blobs SET is_deleted = 1
             WHERE name = ? AND container_id = ? AND is_deleted = 0",
        )
        .bind(name)
        .bind(container_rec.id)
        .execute(&self.account.db)
        .await?;

        if result.rows_affected() == 0 {
            debug!(container, name, "delete target already absent");
            return Ok(false);
        }

        let file_path = self.account.blob_path(&container_rec.name, name);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed physical file {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("file {} already missing", file_path.display());
            }
            Err(err) => return Err(StoreError::Io(err)),
        }

        if let Some(parent) = file_path.parent() {
            let container_root = self.account.container_root(&container_rec.name);
            self.account.prune_empty_dirs(parent, &container_root).await;
        }

        Ok(true)
    }
}

/// Drive one accepted copy to a terminal status on the destination row.
async fn run_copy(destination: Arc<Account>, source: Arc<Account>, job: CopyJob) {
    let outcome = copy_payload(&destination, &source, &job).await;

    let update = match outcome {
        Ok((size_bytes, etag)) => {
            sqlx::query(
                "UPDATE blobs SET
                    size_bytes = ?, etag = ?, last_modified = ?,
                    copy_status = ?, copy_bytes_copied = ?, copy_total_bytes = ?
                 WHERE container_id = ? AND name = ? AND copy_id = ?",
            )
            .bind(size_bytes)
            .bind(etag)
            .bind(Utc::now())
            .bind(CopyStatus::Success.as_str())
            .bind(size_bytes)
            .bind(size_bytes)
            .bind(job.destination.id)
            .bind(&job.name)
            .bind(&job.copy_id)
            .execute(&destination.db)
            .await
        }
        Err(err) => {
            warn!(copy_id = %job.copy_id, name = %job.name, error = %err, "copy failed");
            sqlx::query(
                "UPDATE blobs SET copy_status = ?, copy_status_description = ?
                 WHERE container_id = ? AND name = ? AND copy_id = ?",
            )
            .bind(CopyStatus::Failed.as_str())
            .bind(err.to_string())
            .bind(job.destination.id)
            .bind(&job.name)
            .bind(&job.copy_id)
            .execute(&destination.db)
            .await
        }
    };

    if let Err(err) = update {
        warn!(copy_id = %job.copy_id, error = %err, "could not record copy outcome");
    }
}

/// Stream the source payload into the destination, publishing progress.
///
/// Returns the copied size and etag.
async fn copy_payload(
    destination: &Account,
    source: &Account,
    job: &CopyJob,
) -> StoreResult<(i64, String)> {
    let source_path = source.blob_path(&job.source.container, &job.source.blob);
    let source_file = File::open(&source_path).await.map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            StoreError::BlobNotFound {
                container: job.source.container.clone(),
                name: job.source.blob.clone(),
            }
        } else {
            StoreError::Io(err)
        }
    })?;

    let file_path = destination.blob_path(&job.destination.name, &job.name);
    let (tmp_path, mut file) = create_temp_file(&file_path).await?;

    let mut copied: i64 = 0;
    let mut published: i64 = 0;
    let mut digest = Context::new();
    let mut chunks = ReaderStream::with_capacity(source_file, COPY_BUFFER_BYTES);
    while let Some(chunk_res) = chunks.next().await {
        let step = async {
            let chunk = chunk_res?;
            if Utc::now() >= job.expires_on {
                return Err(StoreError::AuthorizationFailed(
                    "signed access grant expired during copy".into(),
                ));
            }
            file.write_all(&chunk).await?;
            digest.consume(&chunk);
            copied += chunk.len() as i64;
            if !progress_due(copied, published) {
                return Ok(());
            }
            sqlx::query(
                "UPDATE blobs SET copy_bytes_copied = ?
                 WHERE container_id = ? AND name = ? AND copy_id = ?",
            )
            .bind(copied)
            .bind(job.destination.id)
            .bind(&job.name)
            .bind(&job.copy_id)
            .execute(&destination.db)
            .await?;
            published = copied;
            Ok(())
        };
        if let Err(err) = step.await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err);
        }
    }
    commit_temp_file(file, &tmp_path, &file_path).await?;

    Ok((copied, format!("{:x}", digest.compute())))
}

/// Whether enough bytes moved since the last published count to write it
/// again. The final count is written with the terminal status.
fn progress_due(copied: i64, published: i64) -> bool {
    copied - published >= PROGRESS_STEP_BYTES
}

/// Create the parent directories of `final_path` and a fresh temp file
/// beside it.
async fn create_temp_file(final_path: &Path) -> StoreResult<(PathBuf, File)> {
    let parent = final_path.parent().map(Path::to_path_buf).ok_or_else(|| {
        StoreError::Io(io::Error::new(
            ErrorKind::Other,
            "blob path missing parent directory",
        ))
    })?;
    fs::create_dir_all(&parent).await?;
    let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
    let file = File::create(&tmp_path).await?;
    Ok((tmp_path, file))
}

/// Flush, fsync and rename the temp file over `final_path`.
///
/// Cleans up the temp file on error.
async fn commit_temp_file(mut file: File, tmp_path: &Path, final_path: &Path) -> StoreResult<()> {
    if let Err(err) = file.flush().await {
        let _ = fs::remove_file(tmp_path).await;
        return Err(StoreError::Io(err));
    }
    if let Err(err) = file.sync_all().await {
        let _ = fs::remove_file(tmp_path).await;
        return Err(StoreError::Io(err));
    }
    drop(file);

    if let Err(err) = fs::rename(tmp_path, final_path).await {
        if err.kind() == ErrorKind::AlreadyExists {
            fs::remove_file(final_path).await?;
            fs::rename(tmp_path, final_path).await?;
        } else {
            let _ = fs::remove_file(tmp_path).await;
            return Err(StoreError::Io(err));
        }
    }
    Ok(())
}

/// Basic blob name validation to avoid trivial path traversal vectors.
fn ensure_blob_name_safe(name: &str) -> StoreResult<()> {
    if name.is_empty() || name.len() > MAX_BLOB_NAME_LEN {
        return Err(StoreError::InvalidBlobName);
    }
    if name.starts_with('/') || name.ends_with('/') || name.contains("..") {
        return Err(StoreError::InvalidBlobName);
    }
    // URI paths drop `.` segments
    if name.split('/').any(|segment| segment == ".") {
        return Err(StoreError::InvalidBlobName);
    }
    if name
        .bytes()
        .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
    {
        return Err(StoreError::InvalidBlobName);
    }
    Ok(())
}

/// Validate container name format.
///
/// - 3–63 characters
/// - lowercase letters, digits and hyphens only
/// - starts and ends with a letter or digit
/// - no consecutive hyphens
fn ensure_container_name_safe(name: &str) -> StoreResult<()> {
    let invalid = |reason: &str| StoreError::InvalidContainerName {
        name: name.to_string(),
        reason: reason.into(),
    };

    let len = name.len();
    if len < CONTAINER_NAME_MIN_LEN || len > CONTAINER_NAME_MAX_LEN {
        return Err(invalid("must be between 3 and 63 characters"));
    }
    if !name
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '-'))
    {
        return Err(invalid(
            "allowed characters are lowercase letters, digits, and hyphens",
        ));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid("must start and end with a lowercase letter or digit"));
    }
    if name.contains("--") {
        return Err(invalid("cannot contain consecutive hyphens"));
    }
    Ok(())
}

fn encode_marker(name: &str) -> String {
    general_purpose::STANDARD.encode(name)
}

fn decode_marker(marker: &str) -> StoreResult<String> {
    general_purpose::STANDARD
        .decode(marker)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| StoreError::MalformedUri(format!("invalid listing marker `{marker}`")))
}
