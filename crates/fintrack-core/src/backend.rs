use async_trait::async_trait;
use fintrack_domain::Entity;
use secrecy::SecretString;

use crate::ApiResult;

/// Abstraction over the persistence side of an entity store.
///
/// Implementations own identifier assignment and timestamps. Timeouts are the
/// implementation's concern; stores never retry.
#[async_trait]
pub trait Backend<T: Entity>: Send + Sync {
    async fn list_all(&self, token: &SecretString) -> ApiResult<Vec<T>>;

    async fn get(&self, token: &SecretString, id: &str) -> ApiResult<T>;

    /// Persists a new record and returns it with its assigned identifier.
    async fn create(&self, token: &SecretString, draft: &T::Draft) -> ApiResult<T>;

    /// Applies `patch` to the record `id` and returns the full stored representation.
    async fn update(&self, token: &SecretString, id: &str, patch: &T::Patch) -> ApiResult<T>;

    async fn delete(&self, token: &SecretString, id: &str) -> ApiResult<()>;
}
