//! Velero backup store
//!
//! Talks to the Velero CRDs through `DynamicObject`, so the webhook does not
//! need Velero's generated types. One client is created at startup and
//! shared by every request.

use async_trait::async_trait;
use kube::Client;
use kube::api::{Api, DeleteParams, DynamicObject, PostParams};
use serde::Serialize;
use tracing::debug;

use super::BackupStore;
use crate::error::{KubeError, Result};
use crate::velero::{Backup, Schedule, VeleroResource};

/// Backup store backed by Velero resources in one namespace
#[derive(Clone)]
pub struct VeleroStore {
    client: Client,
    namespace: String,
}

impl VeleroStore {
    /// Create a store using the default kubeconfig or in-cluster config
    pub async fn new(namespace: impl Into<String>) -> Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self::with_client(client, namespace))
    }

    /// Create with an existing client
    pub fn with_client(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn api<R: VeleroResource>(&self) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), &self.namespace, &R::api_resource())
    }

    async fn create<R: VeleroResource>(&self, resource: &R) -> Result<()> {
        let object = to_dynamic(resource)?;
        match self.api::<R>().create(&PostParams::default(), &object).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(resp)) if resp.code == 409 => Err(KubeError::AlreadyExists {
                kind: R::KIND.to_string(),
                name: resource.name().to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

fn to_dynamic<R: Serialize>(resource: &R) -> Result<DynamicObject> {
    Ok(serde_json::from_value(serde_json::to_value(resource)?)?)
}

#[async_trait]
impl BackupStore for VeleroStore {
    async fn schedule_exists(&self, name: &str) -> Result<bool> {
        let found = self.api::<Schedule>().get_opt(name).await?.is_some();
        debug!(schedule = %name, namespace = %self.namespace, found, "Looked up Velero schedule");
        Ok(found)
    }

    async fn create_schedule(&self, schedule: &Schedule) -> Result<()> {
        self.create(schedule).await
    }

    async fn create_backup(&self, backup: &Backup) -> Result<()> {
        self.create(backup).await
    }

    async fn delete_schedule(&self, name: &str) -> Result<()> {
        match self
            .api::<Schedule>()
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(resp)) if resp.code == 404 => Err(KubeError::ScheduleNotFound {
                name: name.to_string(),
                namespace: self.namespace.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}
