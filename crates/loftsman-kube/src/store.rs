//! Cluster state store
//!
//! Ship records are ConfigMaps in the records namespace; repository
//! credentials are read from Secrets. Every call goes through the retry
//! policy, so transient API failures are absorbed before surfacing.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, ListParams, Patch, PatchParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{KubeError, Result};
use crate::retry::{RetryPolicy, retry_on};

/// Label applied to every object Loftsman creates
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

pub fn common_labels() -> BTreeMap<String, String> {
    BTreeMap::from([(MANAGED_BY_LABEL.to_string(), "loftsman".to_string())])
}

/// The cluster operations a ship needs
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Create the namespace unless it already exists
    async fn ensure_namespace(&self, name: &str) -> Result<()>;

    /// Data of the ConfigMap called `name` whose data has `key` set to
    /// `value`, if there is one
    async fn find_config_map(
        &self,
        name: &str,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> Result<Option<BTreeMap<String, String>>>;

    /// Create the ConfigMap with `data`, or reset an existing one to it
    async fn initialize_config_map(
        &self,
        name: &str,
        namespace: &str,
        data: BTreeMap<String, String>,
    ) -> Result<()>;

    /// Strategic-merge `data` into an existing ConfigMap
    async fn patch_config_map(
        &self,
        name: &str,
        namespace: &str,
        data: BTreeMap<String, String>,
    ) -> Result<()>;

    /// A single Secret value, trimmed of surrounding whitespace
    async fn get_secret_value(&self, name: &str, namespace: &str, key: &str) -> Result<String>;
}

/// [`ClusterStore`] backed by the Kubernetes API
pub struct KubeStore {
    client: Client,
    retry: RetryPolicy,
}

impl KubeStore {
    /// Connect using an explicit kubeconfig and/or context, falling back to
    /// the environment, then verify the cluster answers
    pub async fn connect(kubeconfig: Option<&Path>, context: Option<&str>) -> Result<Self> {
        let options = KubeConfigOptions {
            context: context.map(str::to_string),
            ..Default::default()
        };
        let context_label = context.unwrap_or("(current-context)");
        let config_error = |e: &dyn std::fmt::Display| {
            KubeError::InvalidConfig(format!(
                "could not get Kubernetes config for context {:?}: {}",
                context_label, e
            ))
        };

        let config = match kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path).map_err(|e| config_error(&e))?;
                Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .map_err(|e| config_error(&e))?
            }
            None if context.is_some() => Config::from_kubeconfig(&options)
                .await
                .map_err(|e| config_error(&e))?,
            None => Config::infer().await.map_err(|e| config_error(&e))?,
        };

        let client = Client::try_from(config)?;
        let store = Self::with_client(client);
        store.verify_connection().await?;
        Ok(store)
    }

    /// Create with an existing client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn verify_connection(&self) -> Result<()> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        namespaces
            .list(&ListParams::default().limit(1))
            .await
            .map_err(|e| KubeError::Connection(e.to_string()))?;
        Ok(())
    }

    fn config_maps(&self, namespace: &str) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ClusterStore for KubeStore {
    async fn ensure_namespace(&self, name: &str) -> Result<()> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let (api, namespace) = (&api, &namespace);

        retry_on(&self.retry, KubeError::is_transient, move || async move {
            match api.create(&PostParams::default(), namespace).await {
                Ok(_) => Ok(()),
                Err(e) => {
                    let err = KubeError::from(e);
                    if err.is_already_exists() { Ok(()) } else { Err(err) }
                }
            }
        })
        .await
    }

    async fn find_config_map(
        &self,
        name: &str,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> Result<Option<BTreeMap<String, String>>> {
        let api = self.config_maps(namespace);
        let params = ListParams::default().fields(&format!("metadata.name={}", name));
        let (api, params) = (&api, &params);

        let list = retry_on(&self.retry, KubeError::is_transient, move || async move {
            api.list(params).await.map_err(KubeError::from)
        })
        .await?;

        Ok(list
            .items
            .into_iter()
            .filter(|cm| cm.metadata.name.as_deref() == Some(name))
            .filter_map(|cm| cm.data)
            .find(|data| data.get(key).map(String::as_str) == Some(value)))
    }

    async fn initialize_config_map(
        &self,
        name: &str,
        namespace: &str,
        data: BTreeMap<String, String>,
    ) -> Result<()> {
        let api = self.config_maps(namespace);
        let config_map = ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                labels: Some(common_labels()),
                ..Default::default()
            },
            data: Some(data.clone()),
            ..Default::default()
        };
        let reset = Patch::Merge(serde_json::json!({
            "metadata": { "labels": common_labels() },
            "data": data,
        }));
        let (api, config_map, reset) = (&api, &config_map, &reset);

        retry_on(&self.retry, KubeError::is_transient, move || async move {
            match api.get_opt(name).await? {
                None => {
                    api.create(&PostParams::default(), config_map).await?;
                }
                Some(_) => {
                    api.patch(name, &PatchParams::default(), reset).await?;
                }
            }
            Ok::<(), KubeError>(())
        })
        .await
    }

    async fn patch_config_map(
        &self,
        name: &str,
        namespace: &str,
        data: BTreeMap<String, String>,
    ) -> Result<()> {
        let api = self.config_maps(namespace);
        let patch = Patch::Strategic(serde_json::json!({ "data": data }));
        let (api, patch) = (&api, &patch);

        retry_on(&self.retry, KubeError::is_transient, move || async move {
            api.patch(name, &PatchParams::default(), patch).await?;
            Ok::<(), KubeError>(())
        })
        .await
    }

    async fn get_secret_value(&self, name: &str, namespace: &str, key: &str) -> Result<String> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let api = &api;

        let secret = retry_on(&self.retry, KubeError::is_transient, move || async move {
            api.get(name).await.map_err(KubeError::from)
        })
        .await?;

        secret
            .data
            .as_ref()
            .and_then(|d| d.get(key))
            .map(|bytes| String::from_utf8_lossy(&bytes.0).trim().to_string())
            .ok_or_else(|| KubeError::SecretKeyMissing {
                secret: name.to_string(),
                namespace: namespace.to_string(),
                key: key.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RECORD_PATH: &str = "/api/v1/namespaces/loftsman/configmaps/loftsman-platform";

    fn status(code: u16, reason: &str) -> ResponseTemplate {
        ResponseTemplate::new(code).set_body_json(json!({
            "apiVersion": "v1",
            "kind": "Status",
            "metadata": {},
            "status": "Failure",
            "message": format!("simulated {}", reason),
            "reason": reason,
            "code": code,
        }))
    }

    fn config_map(data: serde_json::Value) -> serde_json::Value {
        json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": { "name": "loftsman-platform", "namespace": "loftsman" },
            "data": data,
        })
    }

    fn store_for(server: &MockServer) -> KubeStore {
        let config = Config::new(server.uri().parse().unwrap());
        let client = Client::try_from(config).unwrap();
        KubeStore::with_client(client).with_retry(RetryPolicy {
            steps: 3,
            initial: Duration::from_millis(1),
            factor: 1.0,
            jitter: 0.0,
        })
    }

    fn record(status: &str) -> BTreeMap<String, String> {
        BTreeMap::from([("status".to_string(), status.to_string())])
    }

    #[test]
    fn test_common_labels() {
        let labels = common_labels();
        assert_eq!(
            labels.get("app.kubernetes.io/managed-by").map(String::as_str),
            Some("loftsman")
        );
    }

    #[tokio::test]
    async fn test_secret_value_is_trimmed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/services/secrets/nexus-creds"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "apiVersion": "v1",
                "kind": "Secret",
                "metadata": { "name": "nexus-creds", "namespace": "services" },
                // "  s3cret\n" and "admin"
                "data": { "password": "ICBzM2NyZXQK", "username": "YWRtaW4=" },
            })))
            .mount(&server)
            .await;

        let store = store_for(&server);
        assert_eq!(
            store.get_secret_value("nexus-creds", "services", "password").await.unwrap(),
            "s3cret"
        );
        assert_eq!(
            store.get_secret_value("nexus-creds", "services", "username").await.unwrap(),
            "admin"
        );

        let err = store
            .get_secret_value("nexus-creds", "services", "token")
            .await
            .unwrap_err();
        assert!(matches!(err, KubeError::SecretKeyMissing { ref key, .. } if key == "token"));
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/services/secrets/nexus-creds"))
            .respond_with(status(503, "ServiceUnavailable"))
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/services/secrets/nexus-creds"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "apiVersion": "v1",
                "kind": "Secret",
                "metadata": { "name": "nexus-creds", "namespace": "services" },
                "data": { "username": "YWRtaW4=" },
            })))
            .mount(&server)
            .await;

        let store = store_for(&server);
        let value = store
            .get_secret_value("nexus-creds", "services", "username")
            .await
            .unwrap();

        assert_eq!(value, "admin");
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/services/secrets/nexus-creds"))
            .respond_with(status(403, "Forbidden"))
            .expect(1)
            .mount(&server)
            .await;

        let err = store_for(&server)
            .get_secret_value("nexus-creds", "services", "username")
            .await
            .unwrap_err();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_initialize_creates_missing_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RECORD_PATH))
            .respond_with(status(404, "NotFound"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/namespaces/loftsman/configmaps"))
            .and(body_partial_json(json!({
                "metadata": {
                    "name": "loftsman-platform",
                    "labels": { "app.kubernetes.io/managed-by": "loftsman" },
                },
                "data": { "status": "active" },
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(config_map(json!({ "status": "active" }))))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .respond_with(status(500, "InternalError"))
            .expect(0)
            .mount(&server)
            .await;

        store_for(&server)
            .initialize_config_map("loftsman-platform", "loftsman", record("active"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_initialize_resets_existing_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RECORD_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(config_map(json!({ "status": "failed" }))))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(RECORD_PATH))
            .and(header("content-type", "application/merge-patch+json"))
            .and(body_partial_json(json!({
                "metadata": { "labels": { "app.kubernetes.io/managed-by": "loftsman" } },
                "data": { "status": "active" },
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(config_map(json!({ "status": "active" }))))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(status(409, "AlreadyExists"))
            .expect(0)
            .mount(&server)
            .await;

        store_for(&server)
            .initialize_config_map("loftsman-platform", "loftsman", record("active"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_find_matches_on_data_value() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/loftsman/configmaps"))
            .and(query_param("fieldSelector", "metadata.name=loftsman-platform"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "apiVersion": "v1",
                "kind": "ConfigMapList",
                "metadata": { "resourceVersion": "1" },
                "items": [config_map(json!({ "status": "active", "log": "" }))],
            })))
            .mount(&server)
            .await;

        let store = store_for(&server);
        let active = store
            .find_config_map("loftsman-platform", "loftsman", "status", "active")
            .await
            .unwrap();
        assert_eq!(active.unwrap().get("status").map(String::as_str), Some("active"));

        let success = store
            .find_config_map("loftsman-platform", "loftsman", "status", "success")
            .await
            .unwrap();
        assert!(success.is_none());
    }
}
