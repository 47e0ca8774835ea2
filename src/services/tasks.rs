// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cloud Tasks fan-out for scheduled syncs.
//!
//! The scheduler hits `/tasks/sync-all` once; that handler queues one
//! `/tasks/sync-user` task per user so each sync gets its own retry budget
//! and the GitHub calls are spread by the queue's dispatch rate.
//!
//! Uses the official google-cloud-tasks-v2 SDK.

use crate::error::AppError;
use crate::error::Result;
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

const MAX_CONCURRENT_TASKS: usize = 100;

/// Payload of the per-user sync task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncUserPayload {
    pub user_id: u64,
}

/// Result of queueing a batch of user syncs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueResult {
    /// Number of users successfully queued.
    pub queued: u32,
    /// Number of users that failed to queue.
    pub failed: u32,
    /// User IDs that failed to queue.
    pub failed_ids: Vec<u64>,
}

impl QueueResult {
    pub fn is_complete_success(&self) -> bool {
        self.failed == 0
    }

    pub fn is_complete_failure(&self) -> bool {
        self.queued == 0 && self.failed > 0
    }
}

/// Cloud Tasks client wrapper.
pub struct TasksService {
    project_id: String,
    location: String,
    queue_name: String,
    /// Mock: user IDs that should fail when queued (test builds only).
    #[cfg(test)]
    mock_fail_ids: std::sync::Mutex<std::collections::HashSet<u64>>,
}

impl TasksService {
    pub fn new(project_id: &str, region: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            location: region.to_string(),
            queue_name: crate::config::SYNC_QUEUE_NAME.to_string(),
            #[cfg(test)]
            mock_fail_ids: std::sync::Mutex::new(std::collections::HashSet::new()),
        }
    }

    /// Set user IDs that should fail when queued (test builds only).
    #[cfg(test)]
    pub fn set_mock_fail_ids(&self, ids: impl IntoIterator<Item = u64>) {
        let mut guard = self.mock_fail_ids.lock().unwrap();
        guard.clear();
        guard.extend(ids);
    }

    /// Queue a sync of one user.
    pub async fn queue_user_sync(&self, service_url: &str, payload: SyncUserPayload) -> Result<()> {
        self.queue_task(service_url, "/tasks/sync-user", &payload)
            .await
    }

    async fn queue_task<T: Serialize>(
        &self,
        service_url: &str,
        endpoint: &str,
        payload: &T,
    ) -> Result<()> {
        use google_cloud_tasks_v2::client::CloudTasks;
        use google_cloud_tasks_v2::model::{HttpRequest, OidcToken, Task};

        let client = CloudTasks::builder()
            .build()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Cloud Tasks client error: {}", e)))?;

        let queue_path = format!(
            "projects/{}/locations/{}/queues/{}",
            self.project_id, self.location, self.queue_name
        );

        let body = serde_json::to_vec(payload)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JSON error: {}", e)))?;

        let http_request = HttpRequest::default()
            .set_url(format!("{}{}", service_url, endpoint))
            .set_http_method("POST")
            .set_body(axum::body::Bytes::from(body))
            .set_headers(std::collections::HashMap::from([(
                "Content-Type".to_string(),
                "application/json".to_string(),
            )]))
            .set_oidc_token(
                OidcToken::default()
                    .set_service_account_email(format!(
                        "streak-tracker-api@{}.iam.gserviceaccount.com",
                        self.project_id
                    ))
                    .set_audience(service_url.to_string()),
            );

        let task = Task::default().set_http_request(http_request);

        client
            .create_task()
            .set_parent(queue_path)
            .set_task(task)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Cloud Tasks create error: {}", e)))?;

        Ok(())
    }

    /// Queue a sync task for every user in `user_ids`.
    ///
    /// A user that fails to queue is reported in the result; it does not
    /// stop the others.
    pub async fn queue_scheduled_syncs(&self, service_url: &str, user_ids: Vec<u64>) -> QueueResult {
        let requested = user_ids.len();
        let queued = Arc::new(AtomicU32::new(0));
        let failed_ids = Arc::new(tokio::sync::Mutex::new(Vec::new()));

        stream::iter(user_ids)
            .for_each_concurrent(MAX_CONCURRENT_TASKS, |user_id| {
                let queued = Arc::clone(&queued);
                let failed_ids = Arc::clone(&failed_ids);
                async move {
                    #[cfg(test)]
                    {
                        let should_fail = self.mock_fail_ids.lock().unwrap().contains(&user_id);
                        if should_fail {
                            tracing::warn!(user_id, "Mock failure for user sync");
                            failed_ids.lock().await.push(user_id);
                            return;
                        }
                    }

                    match self
                        .queue_user_sync(service_url, SyncUserPayload { user_id })
                        .await
                    {
                        Ok(()) => {
                            queued.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            tracing::warn!(user_id, error = ?e, "Failed to queue user sync");
                            failed_ids.lock().await.push(user_id);
                        }
                    }
                }
            })
            .await;

        let mut failed_ids = std::mem::take(&mut *failed_ids.lock().await);
        failed_ids.sort_unstable();
        let failed = failed_ids.len() as u32;
        let queued = queued.load(Ordering::Relaxed);

        tracing::info!(requested, queued, failed, "Queued scheduled syncs");

        QueueResult {
            queued,
            failed,
            failed_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_result_states() {
        assert!(QueueResult::default().is_complete_success());
        assert!(!QueueResult::default().is_complete_failure());

        let partial = QueueResult {
            queued: 2,
            failed: 1,
            failed_ids: vec![3],
        };
        assert!(!partial.is_complete_success());
        assert!(!partial.is_complete_failure());

        let none = QueueResult {
            queued: 0,
            failed: 2,
            failed_ids: vec![1, 2],
        };
        assert!(none.is_complete_failure());
    }

    #[tokio::test]
    async fn queue_scheduled_syncs_mock_failures_reported() {
        let service = TasksService::new("test-project", "us-central1");
        service.set_mock_fail_ids([20, 30]);

        let result = service
            .queue_scheduled_syncs("http://localhost", vec![10, 20, 30])
            .await;

        // 20 and 30 fail by mock; 10 fails without a Cloud Tasks client.
        assert!(result.failed_ids.contains(&20));
        assert!(result.failed_ids.contains(&30));
        assert_eq!(result.failed as usize, result.failed_ids.len());
        assert_eq!(result.queued + result.failed, 3);
    }

    #[tokio::test]
    async fn queue_scheduled_syncs_empty_input() {
        let service = TasksService::new("test-project", "us-central1");

        let result = service.queue_scheduled_syncs("http://localhost", vec![]).await;

        assert!(result.is_complete_success());
        assert_eq!(result.queued, 0);
        assert!(result.failed_ids.is_empty());
    }

    #[test]
    fn sync_payload_wire_format() {
        let json = serde_json::to_value(SyncUserPayload { user_id: 42 }).unwrap();
        assert_eq!(json, serde_json::json!({ "user_id": 42 }));
    }
}
