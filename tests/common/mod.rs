#![allow(dead_code)]

use async_trait::async_trait;
use blob_mover::{
    models::{
        copy::{CopyState, CopyStatus},
        grant::{SasPermissions, SignedAccessGrant},
        object::BlobProperties,
    },
    pipeline::{progress::ProgressObserver, transfer::Clock},
    services::blob_service::{BlobService, ListSegment, StoreError, StoreResult},
};
use chrono::{DateTime, TimeZone, Utc};
use std::{
    collections::{BTreeMap, HashMap, HashSet, VecDeque},
    sync::Mutex,
    time::Duration,
};
use url::Url;

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

#[derive(Debug, Clone)]
pub struct FakeBlob {
    pub last_modified: DateTime<Utc>,
    pub size_bytes: u64,
}

/// Every call the double received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateContainer(String),
    ListPage(String),
    GetProperties(String),
    Sign(String),
    StartCopy(String),
    PollCopy(String),
    Delete(String),
}

#[derive(Default)]
struct State {
    containers: HashMap<String, BTreeMap<String, FakeBlob>>,
    copy_scripts: HashMap<String, VecDeque<CopyState>>,
    pending_copies: HashMap<String, (String, String, FakeBlob)>,
    failing_deletes: HashSet<String>,
    vanish_before_delete: HashSet<String>,
    vanish_before_properties: HashSet<String>,
    refuse_start: HashSet<String>,
    calls: Vec<Call>,
    widen_grants: bool,
}

/// In-memory [`BlobService`] whose copies follow a scripted sequence of
/// status observations per blob name.
///
/// Without a script a copy succeeds immediately. A copy source must be a
/// URI minted by [`ScriptedService::sign_blob_uri`] on a registered peer or
/// on this service itself.
pub struct ScriptedService {
    account: String,
    page_size_cap: usize,
    state: Mutex<State>,
    peers: Mutex<Vec<std::sync::Weak<ScriptedService>>>,
}

impl ScriptedService {
    pub fn new(account: &str) -> Self {
        Self {
            account: account.to_string(),
            page_size_cap: usize::MAX,
            state: Mutex::new(State::default()),
            peers: Mutex::new(Vec::new()),
        }
    }

    /// Force listings to return at most `cap` names per page.
    pub fn with_page_cap(mut self, cap: usize) -> Self {
        self.page_size_cap = cap;
        self
    }

    pub fn add_peer(&self, peer: &std::sync::Arc<ScriptedService>) {
        self.peers.lock().unwrap().push(std::sync::Arc::downgrade(peer));
    }

    pub fn add_container(&self, container: &str) {
        self.state
            .lock()
            .unwrap()
            .containers
            .entry(container.to_string())
            .or_default();
    }

    pub fn put(&self, container: &str, name: &str, last_modified: DateTime<Utc>, size_bytes: u64) {
        self.state
            .lock()
            .unwrap()
            .containers
            .entry(container.to_string())
            .or_default()
            .insert(
                name.to_string(),
                FakeBlob {
                    last_modified,
                    size_bytes,
                },
            );
    }

    pub fn remove(&self, container: &str, name: &str) {
        if let Some(blobs) = self.state.lock().unwrap().containers.get_mut(container) {
            blobs.remove(name);
        }
    }

    pub fn script_copy(&self, name: &str, states: Vec<CopyState>) {
        self.state
            .lock()
            .unwrap()
            .copy_scripts
            .insert(name.to_string(), states.into());
    }

    pub fn fail_delete(&self, name: &str) {
        self.state.lock().unwrap().failing_deletes.insert(name.to_string());
    }

    /// Simulate another actor deleting `name` just before our delete.
    pub fn vanish_before_delete(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .vanish_before_delete
            .insert(name.to_string());
    }

    /// Simulate `name` being deleted between listing and its property fetch.
    pub fn vanish_before_properties(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .vanish_before_properties
            .insert(name.to_string());
    }

    pub fn refuse_copy_start(&self, name: &str) {
        self.state.lock().unwrap().refuse_start.insert(name.to_string());
    }

    /// Make `sign_blob_uri` hand out grants with write permission.
    pub fn widen_grants(&self) {
        self.state.lock().unwrap().widen_grants = true;
    }

    pub fn has_container(&self, container: &str) -> bool {
        self.state.lock().unwrap().containers.contains_key(container)
    }

    pub fn names(&self, container: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .containers
            .get(container)
            .map(|blobs| blobs.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn read_blob(&self, container: &str, name: &str) -> Option<FakeBlob> {
        self.state
            .lock()
            .unwrap()
            .containers
            .get(container)
            .and_then(|blobs| blobs.get(name))
            .cloned()
    }

    fn resolve_source(&self, uri: &Url) -> StoreResult<FakeBlob> {
        let account = uri.host_str().unwrap_or_default().to_string();
        let mut segments = uri.path_segments().into_iter().flatten();
        let container = segments.next().unwrap_or_default().to_string();
        let name = segments.collect::<Vec<_>>().join("/");
        let has_read = uri
            .query_pairs()
            .any(|(k, v)| k == "sp" && v.contains('r'));
        if !has_read {
            return Err(StoreError::AuthorizationFailed("read not granted".into()));
        }

        let found = if account == self.account {
            self.read_blob(&container, &name)
        } else {
            self.peers
                .lock()
                .unwrap()
                .iter()
                .filter_map(|p| p.upgrade())
                .find(|p| p.account == account)
                .ok_or_else(|| StoreError::UnknownAccount(account.clone()))?
                .read_blob(&container, &name)
        };
        found.ok_or(StoreError::BlobNotFound { container, name })
    }

    fn finish_copy(&self, container: &str, name: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some((c, n, blob)) = state.pending_copies.remove(name) {
            debug_assert_eq!((c.as_str(), n.as_str()), (container, name));
            state
                .containers
                .entry(container.to_string())
                .or_default()
                .insert(
                    name.to_string(),
                    FakeBlob {
                        last_modified: Utc::now(),
                        size_bytes: blob.size_bytes,
                    },
                );
        }
    }

    fn next_observation(&self, container: &str, name: &str) -> CopyState {
        let observed = {
            let mut state = self.state.lock().unwrap();
            let total = state
                .pending_copies
                .get(name)
                .map(|(_, _, b)| b.size_bytes)
                .unwrap_or(0);
            state
                .copy_scripts
                .get_mut(name)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| CopyState::success("scripted", total))
        };
        if observed.status == CopyStatus::Success {
            self.finish_copy(container, name);
        }
        observed
    }
}

#[async_trait]
impl BlobService for ScriptedService {
    fn account_name(&self) -> &str {
        &self.account
    }

    async fn create_container_if_not_exists(&self, container: &str) -> StoreResult<bool> {
        self.record(Call::CreateContainer(container.to_string()));
        let mut state = self.state.lock().unwrap();
        if state.containers.contains_key(container) {
            Ok(false)
        } else {
            state.containers.insert(container.to_string(), BTreeMap::new());
            Ok(true)
        }
    }

    async fn list_blobs_segment(
        &self,
        container: &str,
        marker: Option<&str>,
        max_results: usize,
    ) -> StoreResult<ListSegment> {
        self.record(Call::ListPage(marker.unwrap_or("").to_string()));
        let state = self.state.lock().unwrap();
        let blobs = state
            .containers
            .get(container)
            .ok_or_else(|| StoreError::ContainerNotFound(container.to_string()))?;
        let limit = max_results.min(self.page_size_cap).max(1);
        let mut names: Vec<String> = blobs
            .keys()
            .filter(|name| marker.is_none_or(|m| name.as_str() > m))
            .take(limit + 1)
            .cloned()
            .collect();
        let next_marker = if names.len() > limit {
            names.truncate(limit);
            names.last().cloned()
        } else {
            None
        };
        Ok(ListSegment { names, next_marker })
    }

    async fn get_properties(&self, container: &str, name: &str) -> StoreResult<BlobProperties> {
        self.record(Call::GetProperties(name.to_string()));
        {
            let mut state = self.state.lock().unwrap();
            if state.vanish_before_properties.remove(name) {
                if let Some(blobs) = state.containers.get_mut(container) {
                    blobs.remove(name);
                }
            }
        }
        self.read_blob(container, name)
            .map(|blob| BlobProperties {
                last_modified: blob.last_modified,
                size_bytes: blob.size_bytes,
                content_type: None,
                etag: None,
            })
            .ok_or_else(|| StoreError::BlobNotFound {
                container: container.to_string(),
                name: name.to_string(),
            })
    }

    fn sign_blob_uri(
        &self,
        container: &str,
        name: &str,
        permissions: SasPermissions,
        expires_on: DateTime<Utc>,
    ) -> StoreResult<SignedAccessGrant> {
        self.record(Call::Sign(name.to_string()));
        let permissions = if self.state.lock().unwrap().widen_grants {
            SasPermissions {
                write: true,
                ..permissions
            }
        } else {
            permissions
        };
        let mut uri = Url::parse(&format!("blob://{}", self.account)).unwrap();
        uri.path_segments_mut()
            .unwrap()
            .push(container)
            .extend(name.split('/'));
        uri.query_pairs_mut()
            .append_pair("sp", &permissions.to_string())
            .append_pair("se", &expires_on.to_rfc3339())
            .append_pair("sig", "fake");
        Ok(SignedAccessGrant {
            uri,
            account: self.account.clone(),
            container: container.to_string(),
            blob: name.to_string(),
            permissions,
            expires_on,
        })
    }

    async fn start_copy_from_uri(
        &self,
        container: &str,
        name: &str,
        source: &Url,
    ) -> StoreResult<CopyState> {
        self.record(Call::StartCopy(name.to_string()));
        if self.state.lock().unwrap().refuse_start.contains(name) {
            return Err(StoreError::AuthorizationFailed("copy refused".into()));
        }
        if !self.has_container(container) {
            return Err(StoreError::ContainerNotFound(container.to_string()));
        }
        let blob = self.resolve_source(source)?;
        self.state.lock().unwrap().pending_copies.insert(
            name.to_string(),
            (container.to_string(), name.to_string(), blob),
        );
        Ok(self.next_observation(container, name))
    }

    async fn get_copy_state(&self, container: &str, name: &str) -> StoreResult<CopyState> {
        self.record(Call::PollCopy(name.to_string()));
        Ok(self.next_observation(container, name))
    }

    async fn delete_if_exists(&self, container: &str, name: &str) -> StoreResult<bool> {
        self.record(Call::Delete(name.to_string()));
        let mut state = self.state.lock().unwrap();
        if state.failing_deletes.contains(name) {
            return Err(StoreError::AuthorizationFailed("delete rejected".into()));
        }
        if state.vanish_before_delete.remove(name) {
            if let Some(blobs) = state.containers.get_mut(container) {
                blobs.remove(name);
            }
        }
        Ok(state
            .containers
            .get_mut(container)
            .and_then(|blobs| blobs.remove(name))
            .is_some())
    }
}

/// Returns immediately and remembers every requested delay.
#[derive(Default)]
pub struct RecordingClock {
    pub sleeps: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Clock for RecordingClock {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}

/// Sleeps for a short real interval regardless of the requested delay, so
/// background copies get to run.
pub struct ShortClock;

#[async_trait]
impl Clock for ShortClock {
    async fn sleep(&self, _duration: Duration) {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Collects progress events as the lines the binaries would print.
#[derive(Default)]
pub struct RecordingObserver {
    pub lines: Mutex<Vec<String>>,
    pub progress: Mutex<Vec<(String, u64, u64)>>,
}

impl RecordingObserver {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn progress_for(&self, name: &str) -> Vec<u64> {
        self.progress
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _, _)| n == name)
            .map(|(_, copied, _)| *copied)
            .collect()
    }
}

impl ProgressObserver for RecordingObserver {
    fn copy_progress(&self, name: &str, bytes_copied: u64, total_bytes: u64) {
        self.progress
            .lock()
            .unwrap()
            .push((name.to_string(), bytes_copied, total_bytes));
        self.lines.lock().unwrap().push(format!(
            "Blob: {name}, Copied: {bytes_copied} of {total_bytes}"
        ));
    }

    fn copy_completed(&self, name: &str) {
        self.lines.lock().unwrap().push(format!("Blob: {name} Complete"));
    }

    fn copy_failed(&self, name: &str, reason: &str) {
        self.lines
            .lock()
            .unwrap()
            .push(format!("Blob: {name} Failed: {reason}"));
    }

    fn reclaim_failed(&self, name: &str, reason: &str) {
        self.lines
            .lock()
            .unwrap()
            .push(format!("Blob: {name} Source delete failed: {reason}"));
    }
}
