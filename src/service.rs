use std::collections::BTreeMap;

use k8s_openapi::{
    ByteString,
    api::core::v1::Secret,
};
use kube::api::ObjectMeta;
use serde_json::{
    Map,
    Value,
    json,
};
use tracing::{
    debug,
    info,
    warn,
};

use crate::{
    config::CredentialsConfig,
    credentials::{
        Credential,
        CredentialForm,
        CredentialsError,
    },
    store::SecretStore,
};

const ENABLED_ANNOTATION_VALUE: &str = "True";

/// Credential operations scoped to one namespace and owner label.
#[derive(Clone)]
pub struct CredentialService {
    store: SecretStore,
    config: CredentialsConfig,
}

impl CredentialService {
    pub fn new(store: SecretStore, config: CredentialsConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &CredentialsConfig {
        &self.config
    }

    pub async fn list(&self) -> Result<Vec<Credential>, CredentialsError> {
        let label_selector = self.config.label_selector();
        let secrets = self.store.list(&label_selector).await?;
        debug!(label_selector = %label_selector, count = secrets.len(), "Listed credentials");

        secrets.into_iter().map(Credential::try_from).collect()
    }

    /// Credentials exposed to `app`'s environment, or all of them when no app
    /// is given.
    pub async fn list_for_app(&self, app: Option<&str>) -> Result<Vec<Credential>, CredentialsError> {
        let credentials = self.list().await?;
        match app.filter(|app| !app.is_empty()) {
            None => Ok(credentials),
            Some(app) => Ok(credentials
                .into_iter()
                .filter(|c| c.is_enabled_for(&self.config.env_annotation_prefix, app))
                .collect()),
        }
    }

    pub async fn get(&self, name: &str) -> Result<Credential, CredentialsError> {
        let secret = self.read(name).await?;
        Credential::try_from(secret)
    }

    pub async fn create(&self, form: &CredentialForm) -> Result<(), CredentialsError> {
        if form.name.is_empty() {
            return Err(CredentialsError::EmptyName);
        }

        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(form.name.clone()),
                labels: Some(BTreeMap::from([(
                    self.config.owner_label_key.clone(),
                    self.config.owner_label_value.clone(),
                )])),
                ..Default::default()
            },
            data: Some(form.data()),
            type_: form.kind.clone(),
            ..Default::default()
        };

        self.store.create(&secret).await?;
        info!(name = %form.name, keys = form.entries.len(), "Created credential");
        Ok(())
    }

    /// Replaces the data of an owned credential. Keys missing from `form` are
    /// deleted.
    pub async fn update(&self, name: &str, form: &CredentialForm) -> Result<(), CredentialsError> {
        let existing = self.ensure_owned(name).await?;
        let existing_keys = existing.data.unwrap_or_default().into_keys();

        let patch = self.update_patch(existing_keys, form)?;
        self.store.patch(name, &patch).await?;
        info!(name = %name, keys = form.entries.len(), "Updated credential");
        Ok(())
    }

    /// Flips the app env annotation of an owned credential and returns whether
    /// it is now enabled.
    pub async fn toggle_app_env(&self, name: &str, app: &str) -> Result<bool, CredentialsError> {
        let secret = self.ensure_owned(name).await?;
        let annotation = self.config.env_annotation(app);

        let enabled = secret
            .metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(&annotation))
            .is_some_and(|v| !v.is_empty());
        let value = if enabled {
            Value::Null
        } else {
            Value::String(ENABLED_ANNOTATION_VALUE.to_string())
        };

        let mut annotations = Map::new();
        annotations.insert(annotation, value);
        let patch = json!({ "metadata": { "annotations": annotations } });

        self.store.patch(name, &patch).await?;
        info!(name = %name, app = %app, enabled = !enabled, "Toggled app environment");
        Ok(!enabled)
    }

    pub async fn delete(&self, name: &str) -> Result<(), CredentialsError> {
        self.ensure_owned(name).await?;
        self.store.delete(name).await?;
        info!(name = %name, "Deleted credential");
        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Secret, CredentialsError> {
        match self.store.get(name).await {
            Ok(secret) => Ok(secret),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Err(CredentialsError::NotFound(name.to_string())),
            Err(e) => Err(CredentialsError::Kube(e)),
        }
    }

    async fn ensure_owned(&self, name: &str) -> Result<Secret, CredentialsError> {
        let secret = self.read(name).await?;
        let owned = secret
            .metadata
            .labels
            .as_ref()
            .and_then(|labels| labels.get(&self.config.owner_label_key))
            .is_some_and(|v| *v == self.config.owner_label_value);

        if !owned {
            warn!(name = %name, "Credential is missing the owner label");
            return Err(CredentialsError::NotOwned(name.to_string()));
        }
        Ok(secret)
    }

    fn update_patch(
        &self,
        existing_keys: impl Iterator<Item = String>,
        form: &CredentialForm,
    ) -> Result<Value, CredentialsError> {
        let mut data: BTreeMap<String, Option<ByteString>> = existing_keys.map(|k| (k, None)).collect();
        data.extend(form.data().into_iter().map(|(k, v)| (k, Some(v))));

        let mut labels = Map::new();
        labels.insert(
            self.config.owner_label_key.clone(),
            Value::String(self.config.owner_label_value.clone()),
        );

        let mut patch = json!({
            "metadata": { "labels": labels },
            "data": serde_json::to_value(data)?,
        });
        if let Some(kind) = &form.kind {
            patch["type"] = Value::String(kind.clone());
        }
        Ok(patch)
    }
}
