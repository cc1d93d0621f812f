use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    Api,
    Client,
    api::{
        DeleteParams,
        ListParams,
        Patch,
        PatchParams,
        PostParams,
    },
};

/// Namespaced access to Kubernetes Secrets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecretStoreTrait: Send + Sync + 'static {
    async fn list(&self, label_selector: &str) -> Result<Vec<Secret>, kube::Error>;
    async fn get(&self, name: &str) -> Result<Secret, kube::Error>;
    async fn create(&self, secret: &Secret) -> Result<Secret, kube::Error>;

    /// Applies a JSON merge patch. `null` values delete the field.
    async fn patch(&self, name: &str, patch: &serde_json::Value) -> Result<Secret, kube::Error>;
    async fn delete(&self, name: &str) -> Result<(), kube::Error>;
}

pub type SecretStore = Arc<dyn SecretStoreTrait>;

#[derive(Clone)]
pub struct KubeSecretStore {
    api: Api<Secret>,
}

impl KubeSecretStore {
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
        }
    }
}

#[async_trait]
impl SecretStoreTrait for KubeSecretStore {
    async fn list(&self, label_selector: &str) -> Result<Vec<Secret>, kube::Error> {
        let params = ListParams::default().labels(label_selector);
        Ok(self.api.list(&params).await?.items)
    }

    async fn get(&self, name: &str) -> Result<Secret, kube::Error> {
        self.api.get(name).await
    }

    async fn create(&self, secret: &Secret) -> Result<Secret, kube::Error> {
        self.api.create(&PostParams::default(), secret).await
    }

    async fn patch(&self, name: &str, patch: &serde_json::Value) -> Result<Secret, kube::Error> {
        self.api.patch(name, &PatchParams::default(), &Patch::Merge(patch)).await
    }

    async fn delete(&self, name: &str) -> Result<(), kube::Error> {
        self.api.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }
}
