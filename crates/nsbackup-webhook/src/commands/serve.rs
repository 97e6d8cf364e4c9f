//! Serve command - run the admission webhook over HTTPS

use std::path::Path;
use std::sync::Arc;

use nsbackup_core::BackupConfig;
use nsbackup_kube::{LifecycleExecutor, VeleroStore};
use tracing::info;

use crate::error::Result;
use crate::server::{self, ServerConfig};
use crate::webhook::WebhookState;

pub async fn run(server_config: ServerConfig, config_path: Option<&Path>) -> Result<()> {
    let config = BackupConfig::load(config_path)?;
    info!(
        project = %config.project,
        velero_namespace = %config.velero_namespace,
        storage_location = %config.storage_location,
        schedule = %config.schedule,
        strict_delete = config.strict_delete,
        "Loaded backup configuration"
    );

    let store = VeleroStore::new(config.velero_namespace.clone()).await?;
    info!(velero_namespace = %store.namespace(), "Kubernetes client ready");
    let executor = LifecycleExecutor::new(Arc::new(store), Arc::new(config));
    let state = Arc::new(WebhookState::new(executor));

    server::serve(server_config, state).await
}
