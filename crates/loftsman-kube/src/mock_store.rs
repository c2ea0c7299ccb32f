//! Mock cluster store for testing
//!
//! Keeps ConfigMaps, Secrets and namespaces in memory, counts operations for
//! assertions, and can be told to fail specific operations.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{KubeError, Result};
use crate::store::ClusterStore;

/// Build a Kubernetes API error with the given status code and reason
pub fn api_error(code: u16, reason: &str) -> KubeError {
    KubeError::Api(kube::Error::Api(kube::core::ErrorResponse {
        status: "Failure".to_string(),
        message: format!("simulated {}", reason),
        reason: reason.to_string(),
        code,
    }))
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub namespace_ensures: usize,
    pub finds: usize,
    pub initializes: usize,
    pub patches: usize,
    pub secret_reads: usize,
}

/// Store operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    EnsureNamespace,
    Find,
    Initialize,
    Patch,
    SecretRead,
}

type Key = (String, String);

#[derive(Default)]
struct MockData {
    namespaces: HashSet<String>,
    config_maps: HashMap<Key, BTreeMap<String, String>>,
    secrets: HashMap<Key, BTreeMap<String, String>>,
    failing: HashSet<StoreOperation>,
}

/// In-memory [`ClusterStore`] for testing
#[derive(Clone, Default)]
pub struct MockStore {
    data: Arc<RwLock<MockData>>,
    operations: Arc<RwLock<OperationCounts>>,
}

impl MockStore {
    /// Create a new empty mock store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, MockData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MockData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn count(&self, bump: impl FnOnce(&mut OperationCounts)) {
        bump(&mut self.operations.write().unwrap_or_else(PoisonError::into_inner));
    }

    fn check(&self, operation: StoreOperation) -> Result<()> {
        if self.read().failing.contains(&operation) {
            return Err(api_error(500, "InternalError"));
        }
        Ok(())
    }

    /// Pre-populate a ConfigMap
    pub fn with_config_map(self, namespace: &str, name: &str, data: BTreeMap<String, String>) -> Self {
        self.write()
            .config_maps
            .insert((namespace.to_string(), name.to_string()), data);
        self
    }

    /// Pre-populate a Secret value
    pub fn with_secret(self, namespace: &str, name: &str, key: &str, value: &str) -> Self {
        self.write()
            .secrets
            .entry((namespace.to_string(), name.to_string()))
            .or_default()
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Make an operation fail with a non-retryable API error
    pub fn failing(self, operation: StoreOperation) -> Self {
        self.write().failing.insert(operation);
        self
    }

    /// Current data of a ConfigMap
    pub fn config_map(&self, namespace: &str, name: &str) -> Option<BTreeMap<String, String>> {
        self.read()
            .config_maps
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn has_namespace(&self, name: &str) -> bool {
        self.read().namespaces.contains(name)
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ClusterStore for MockStore {
    async fn ensure_namespace(&self, name: &str) -> Result<()> {
        self.count(|c| c.namespace_ensures += 1);
        self.check(StoreOperation::EnsureNamespace)?;
        self.write().namespaces.insert(name.to_string());
        Ok(())
    }

    async fn find_config_map(
        &self,
        name: &str,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> Result<Option<BTreeMap<String, String>>> {
        self.count(|c| c.finds += 1);
        self.check(StoreOperation::Find)?;
        Ok(self
            .config_map(namespace, name)
            .filter(|data| data.get(key).map(String::as_str) == Some(value)))
    }

    async fn initialize_config_map(
        &self,
        name: &str,
        namespace: &str,
        data: BTreeMap<String, String>,
    ) -> Result<()> {
        self.count(|c| c.initializes += 1);
        self.check(StoreOperation::Initialize)?;
        self.write()
            .config_maps
            .insert((namespace.to_string(), name.to_string()), data);
        Ok(())
    }

    async fn patch_config_map(
        &self,
        name: &str,
        namespace: &str,
        data: BTreeMap<String, String>,
    ) -> Result<()> {
        self.count(|c| c.patches += 1);
        self.check(StoreOperation::Patch)?;

        let mut store = self.write();
        let Some(existing) = store
            .config_maps
            .get_mut(&(namespace.to_string(), name.to_string()))
        else {
            return Err(api_error(404, "NotFound"));
        };
        existing.extend(data);
        Ok(())
    }

    async fn get_secret_value(&self, name: &str, namespace: &str, key: &str) -> Result<String> {
        self.count(|c| c.secret_reads += 1);
        self.check(StoreOperation::SecretRead)?;

        let store = self.read();
        let secret = store
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| api_error(404, "NotFound"))?;
        secret
            .get(key)
            .map(|v| v.trim().to_string())
            .ok_or_else(|| KubeError::SecretKeyMissing {
                secret: name.to_string(),
                namespace: namespace.to_string(),
                key: key.to_string(),
            })
    }
}
