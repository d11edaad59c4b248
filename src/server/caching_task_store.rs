//! Read-through cache wrapping any [`TaskStore`].
//!
//! Every `save` writes through to both the inner store and the cache, so
//! there is no invalidation race to get wrong — a cached entry is always
//! either the last-written value or absent. `list` and the push-notification
//! config methods pass straight through: list results depend on the filter
//! parameters given and aren't worth keying a cache on, and configs are read
//! far less often than individual tasks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::A2AResult;
use crate::types::{Task, TaskPushNotificationConfig};

use super::cache::TtlCache;
use super::task_store::{TaskListParams, TaskListResponse, TaskStore};

/// Wraps a [`TaskStore`], caching `get` reads in a [`TtlCache`].
pub struct CachingTaskStore {
    inner: Arc<dyn TaskStore>,
    cache: TtlCache<String, Task>,
}

impl CachingTaskStore {
    /// Wrap `inner` using the crate's default cache capacity and TTL.
    pub fn new(inner: Arc<dyn TaskStore>) -> Self {
        Self {
            inner,
            cache: TtlCache::with_defaults(),
        }
    }

    /// Wrap `inner` with a custom cache capacity and TTL.
    pub fn with_cache_config(inner: Arc<dyn TaskStore>, capacity: usize, ttl: Duration) -> Self {
        Self {
            inner,
            cache: TtlCache::new(capacity, ttl),
        }
    }
}

#[async_trait]
impl TaskStore for CachingTaskStore {
    async fn save(&self, task: Task) -> A2AResult<()> {
        let id = task.id.clone();
        self.inner.save(task.clone()).await?;
        self.cache.put(id, task).await;
        Ok(())
    }

    async fn get(&self, task_id: &str) -> A2AResult<Option<Task>> {
        if let Some(task) = self.cache.get(&task_id.to_string()).await {
            return Ok(Some(task));
        }

        let task = self.inner.get(task_id).await?;
        if let Some(ref t) = task {
            self.cache.put(task_id.to_string(), t.clone()).await;
        }
        Ok(task)
    }

    async fn delete(&self, task_id: &str) -> A2AResult<()> {
        self.inner.delete(task_id).await?;
        self.cache.invalidate(&task_id.to_string()).await;
        Ok(())
    }

    async fn list(&self, params: &TaskListParams) -> A2AResult<TaskListResponse> {
        self.inner.list(params).await
    }

    async fn save_push_config(&self, config: TaskPushNotificationConfig) -> A2AResult<()> {
        self.inner.save_push_config(config).await
    }

    async fn get_push_config(
        &self,
        task_id: &str,
        config_id: &str,
    ) -> A2AResult<Option<TaskPushNotificationConfig>> {
        self.inner.get_push_config(task_id, config_id).await
    }

    async fn list_push_configs(&self, task_id: &str) -> A2AResult<Vec<TaskPushNotificationConfig>> {
        self.inner.list_push_configs(task_id).await
    }

    async fn delete_push_config(&self, task_id: &str, config_id: &str) -> A2AResult<()> {
        self.inner.delete_push_config(task_id, config_id).await
    }
}
