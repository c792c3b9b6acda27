use std::{
    fs::{self, File},
    io::{self, Write},
    marker::PhantomData,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use chrono::Utc;
use fintrack_core::{ApiError, ApiResult, Backend};
use fintrack_domain::Entity;
use secrecy::SecretString;
use tokio::task;
use tracing::debug;
use uuid::Uuid;

const FILE_EXTENSION: &str = "json";
const TMP_SUFFIX: &str = "tmp";

/// Filesystem-backed JSON persistence for one entity collection.
///
/// Records live in `<root>/<resource>.json` as a single array. The storage plays
/// the server's role: it assigns UUID identifiers and stamps `createdAt`/`updatedAt`.
/// The credential is not inspected; stores gate access before calling in.
///
/// File I/O runs on tokio's blocking pool, so a tokio runtime is required.
pub struct JsonEntityStorage<T: Entity> {
    collection: Arc<Collection<T>>,
}

struct Collection<T: Entity> {
    root: PathBuf,
    // Serialises read-modify-write cycles on the collection file.
    lock: Mutex<()>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> std::fmt::Debug for JsonEntityStorage<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonEntityStorage")
            .field("resource", &T::RESOURCE)
            .field("path", &self.collection_path())
            .finish()
    }
}

impl<T: Entity> JsonEntityStorage<T> {
    pub fn new(root: PathBuf) -> ApiResult<Self> {
        fs::create_dir_all(&root)?;
        Ok(Self {
            collection: Arc::new(Collection {
                root,
                lock: Mutex::new(()),
                _entity: PhantomData,
            }),
        })
    }

    pub fn collection_path(&self) -> PathBuf {
        self.collection.path()
    }

    async fn blocking<R, F>(&self, job: F) -> ApiResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&Collection<T>) -> ApiResult<R> + Send + 'static,
    {
        let collection = Arc::clone(&self.collection);
        task::spawn_blocking(move || job(&collection))
            .await
            .unwrap_or_else(|err| Err(ApiError::Unknown(format!("storage task failed: {err}"))))
    }
}

impl<T: Entity> Collection<T> {
    fn path(&self) -> PathBuf {
        self.root.join(format!("{}.{}", T::RESOURCE, FILE_EXTENSION))
    }

    fn read_all(&self) -> ApiResult<Vec<T>> {
        let path = self.path();
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&data).map_err(serde_error)
    }

    fn write_all(&self, records: &[T]) -> ApiResult<()> {
        let path = self.path();
        let data = serde_json::to_string_pretty(records).map_err(serde_error)?;
        let tmp = tmp_path(&path);
        write_atomic(&tmp, &data)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn snapshot(&self) -> ApiResult<Vec<T>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read_all()
    }

    fn with_records<R>(&self, change: impl FnOnce(&mut Vec<T>) -> ApiResult<R>) -> ApiResult<R> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut records = self.read_all()?;
        let result = change(&mut records)?;
        self.write_all(&records)?;
        Ok(result)
    }
}

#[async_trait]
impl<T: Entity> Backend<T> for JsonEntityStorage<T> {
    async fn list_all(&self, _token: &SecretString) -> ApiResult<Vec<T>> {
        let records = self.blocking(|collection| collection.snapshot()).await?;
        debug!(resource = T::RESOURCE, count = records.len(), "listed records");
        Ok(records)
    }

    async fn get(&self, _token: &SecretString, id: &str) -> ApiResult<T> {
        let id = id.to_string();
        self.blocking(move |collection| {
            collection
                .snapshot()?
                .into_iter()
                .find(|record| record.has_id(&id))
                .ok_or_else(|| ApiError::not_found(id))
        })
        .await
    }

    async fn create(&self, _token: &SecretString, draft: &T::Draft) -> ApiResult<T> {
        let draft = draft.clone();
        self.blocking(move |collection| {
            collection.with_records(|records| {
                let mut record = T::from_draft(draft);
                let now = Utc::now();
                record.assign_id(Uuid::new_v4().to_string());
                record.set_timestamps(now, now);
                records.push(record.clone());
                debug!(resource = T::RESOURCE, id = record.id(), "record stored");
                Ok(record)
            })
        })
        .await
    }

    async fn update(&self, _token: &SecretString, id: &str, patch: &T::Patch) -> ApiResult<T> {
        let id = id.to_string();
        let patch = patch.clone();
        self.blocking(move |collection| {
            collection.with_records(|records| {
                let record = records
                    .iter_mut()
                    .find(|record| record.has_id(&id))
                    .ok_or_else(|| ApiError::not_found(id.as_str()))?;
                record.apply_patch(&patch);
                let now = Utc::now();
                let created_at = record.created_at().unwrap_or(now);
                record.set_timestamps(created_at, now);
                Ok(record.clone())
            })
        })
        .await
    }

    /// Removing an id that is not stored is a no-op.
    async fn delete(&self, _token: &SecretString, id: &str) -> ApiResult<()> {
        let id = id.to_string();
        self.blocking(move |collection| {
            collection.with_records(|records| {
                let before = records.len();
                records.retain(|record| !record.has_id(&id));
                if records.len() == before {
                    debug!(resource = T::RESOURCE, id = %id, "delete of unknown id ignored");
                }
                Ok(())
            })
        })
        .await
    }
}

fn serde_error(err: serde_json::Error) -> ApiError {
    ApiError::Unknown(format!("storage format error: {err}"))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}
