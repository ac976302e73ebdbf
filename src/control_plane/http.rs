//! REST implementation of [`ControlPlane`] backed by `reqwest`.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::debug;

use crate::model::{CAS_TYPE_CSTOR, JobStatus};

use super::types::{
    BackupPayload, BackupSpec, JobObject, Metadata, RestorePayload, RestoreSpec,
};
use super::{
    BackupRequest, ControlPlane, ControlPlaneError, ControlPlaneFuture, JobHandle, JobKind,
    RestoreRequest,
};

/// Path of the backup collection relative to the service base URL.
pub const BACKUP_ENDPOINT: &str = "/latest/backups/";

/// Path of the restore collection relative to the service base URL.
pub const RESTORE_ENDPOINT: &str = "/latest/restore/";

/// Control-plane client speaking the management service's REST API.
#[derive(Clone, Debug)]
pub struct HttpControlPlane {
    client: Client,
    base_url: String,
}

impl HttpControlPlane {
    /// Creates a client whose every request is bounded by `request_timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::Client`] when the HTTP client cannot be
    /// built.
    pub fn new(
        base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, ControlPlaneError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|err| ControlPlaneError::Client {
                message: err.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        })
    }

    /// Base URL requests are issued against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(request: RequestBuilder) -> Result<Vec<u8>, ControlPlaneError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if status == StatusCode::OK {
            return Ok(body.to_vec());
        }

        Err(ControlPlaneError::Rejected {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

impl ControlPlane for HttpControlPlane {
    fn create_backup<'a>(&'a self, request: &'a BackupRequest) -> ControlPlaneFuture<'a, JobHandle> {
        Box::pin(async move {
            let payload = BackupPayload {
                metadata: Metadata {
                    namespace: request.namespace.clone(),
                },
                spec: BackupSpec {
                    backup_name: request.backup_base_name.clone(),
                    volume_name: request.volume_id.clone(),
                    snap_name: request.snapshot_name.clone(),
                    backup_dest: request.destination.clone(),
                },
            };
            debug!(
                volume = %request.volume_id,
                snapshot = %request.snapshot_name,
                series = %request.backup_base_name,
                "posting backup job"
            );
            Self::send(self.client.post(self.url(BACKUP_ENDPOINT)).json(&payload)).await?;
            Ok(JobHandle::for_backup(request))
        })
    }

    fn create_restore<'a>(
        &'a self,
        request: &'a RestoreRequest,
    ) -> ControlPlaneFuture<'a, JobHandle> {
        Box::pin(async move {
            let payload = RestorePayload {
                metadata: Metadata {
                    namespace: request.namespace.clone(),
                },
                spec: RestoreSpec {
                    restore_name: request.restore_name.clone(),
                    volume_name: request.volume_id.clone(),
                    restore_src: request.source.clone(),
                },
            };
            debug!(
                volume = %request.volume_id,
                restore = %request.restore_name,
                "posting restore job"
            );
            Self::send(self.client.post(self.url(RESTORE_ENDPOINT)).json(&payload)).await?;
            Ok(JobHandle::for_restore(request))
        })
    }

    fn delete_backup<'a>(
        &'a self,
        volume_id: &'a str,
        backup_name: &'a str,
        namespace: &'a str,
    ) -> ControlPlaneFuture<'a, ()> {
        Box::pin(async move {
            let url = self.url(&format!("{BACKUP_ENDPOINT}{backup_name}"));
            let request = self.client.delete(url).query(&[
                ("volume", volume_id),
                ("namespace", namespace),
                ("casType", CAS_TYPE_CSTOR),
            ]);
            Self::send(request).await?;
            Ok(())
        })
    }

    fn job_status<'a>(&'a self, job: &'a JobHandle) -> ControlPlaneFuture<'a, JobStatus> {
        Box::pin(async move {
            let collection = match job.kind {
                JobKind::Backup => BACKUP_ENDPOINT,
                JobKind::Restore => RESTORE_ENDPOINT,
            };
            let url = self.url(&format!("{collection}{}", job.name));
            let request = self.client.get(url).query(&[
                ("volume", job.volume_id.as_str()),
                ("namespace", job.namespace.as_str()),
            ]);
            let body = Self::send(request).await?;
            let object: JobObject = serde_json::from_slice(&body)?;
            Ok(object.status)
        })
    }
}
