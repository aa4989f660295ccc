#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use delivery_dash::api::{RemoteUploadState, ValidationResult};
use delivery_dash::config::UploadSettings;
use delivery_dash::error::TransportError;
use delivery_dash::transport::{ProgressSink, Transport};
use delivery_dash::upload::{UploadCoordinator, UploadEvent, UploadFile};
use delivery_dash::{DeliveryApi, TransportClient, UploadPolicy};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

/// How the fake server answers an upload of a given file name.
#[derive(Clone)]
pub enum UploadPlan {
    Accept { processed_records: Option<u64> },
    /// Sends half the bytes, then fails.
    FailMidway(TransportError),
    /// Acknowledges with `success: false`.
    Refuse { message: String, errors: Vec<String> },
}

/// In-memory stand-in for the delivery API.
#[derive(Default)]
pub struct FakeTransport {
    plans: Mutex<HashMap<String, UploadPlan>>,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    statuses: Mutex<HashMap<String, VecDeque<RemoteUploadState>>>,
    default_status: Mutex<Option<RemoteUploadState>>,
    responses: Mutex<HashMap<String, Result<Value, TransportError>>>,
    validations: Mutex<HashMap<String, ValidationResult>>,
    precheck_gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    prechecked: Mutex<Vec<String>>,
    started: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn plan(&self, file_name: &str, plan: UploadPlan) {
        self.plans.lock().insert(file_name.to_string(), plan);
    }

    /// Holds the upload of `file_name` at 50% until the returned sender fires.
    pub fn gate(&self, file_name: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().insert(file_name.to_string(), rx);
        tx
    }

    /// Status answers for `/api/upload-status/<upload id>`, consumed in order.
    /// Upload ids are `up-<file name>`.
    pub fn statuses(&self, file_name: &str, states: Vec<RemoteUploadState>) {
        self.statuses
            .lock()
            .insert(upload_id_for(file_name), states.into());
    }

    /// Status reported once a scripted sequence runs out (default: completed).
    pub fn default_status(&self, state: RemoteUploadState) {
        *self.default_status.lock() = Some(state);
    }

    pub fn respond(&self, path: &str, response: Result<Value, TransportError>) {
        self.responses.lock().insert(path.to_string(), response);
    }

    pub fn validation(&self, file_name: &str, result: ValidationResult) {
        self.validations
            .lock()
            .insert(file_name.to_string(), result);
    }

    /// Holds the server pre-check of `file_name` until the returned sender fires.
    pub fn gate_precheck(&self, file_name: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.precheck_gates.lock().insert(file_name.to_string(), rx);
        tx
    }

    /// File names the server pre-check was asked about, in order.
    pub fn prechecked(&self) -> Vec<String> {
        self.prechecked.lock().clone()
    }

    /// File names whose upload actually began, in order.
    pub fn started(&self) -> Vec<String> {
        self.started.lock().clone()
    }
}

pub fn upload_id_for(file_name: &str) -> String {
    format!("up-{}", file_name)
}

fn to_bytes(value: &Value) -> Bytes {
    Bytes::from(serde_json::to_vec(value).unwrap())
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, path: &str) -> Result<Bytes, TransportError> {
        if let Some(upload_id) = path.strip_prefix("/api/upload-status/") {
            let next = self
                .statuses
                .lock()
                .get_mut(upload_id)
                .and_then(|states| states.pop_front());
            let state = next
                .or(*self.default_status.lock())
                .unwrap_or(RemoteUploadState::Completed);
            let errors = if state == RemoteUploadState::Error {
                json!(["Row 4: unknown store"])
            } else {
                Value::Null
            };
            return Ok(to_bytes(&json!({
                "id": upload_id,
                "fileName": upload_id.trim_start_matches("up-"),
                "status": state,
                "progress": 100,
                "uploadedAt": "2024-05-01T10:00:00Z",
                "processedRecords": 12,
                "errors": errors,
            })));
        }

        match self.responses.lock().get(path) {
            Some(Ok(value)) => Ok(to_bytes(value)),
            Some(Err(e)) => Err(e.clone()),
            None => Err(TransportError::Http {
                status: 404,
                message: "Not Found".to_string(),
            }),
        }
    }

    async fn post_multipart(
        &self,
        _path: &str,
        file: UploadFile,
        progress: ProgressSink,
    ) -> Result<Bytes, TransportError> {
        let name = file.name().to_string();
        self.started.lock().push(name.clone());
        let plan = self
            .plans
            .lock()
            .get(&name)
            .cloned()
            .unwrap_or(UploadPlan::Accept {
                processed_records: Some(10),
            });

        for percent in [0u8, 25, 50] {
            progress.report_percent(percent);
            tokio::task::yield_now().await;
        }

        let gate = self.gates.lock().remove(&name);
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        if let UploadPlan::FailMidway(err) = &plan {
            return Err(err.clone());
        }

        for percent in [75u8, 100] {
            progress.report_percent(percent);
            tokio::task::yield_now().await;
        }

        let body = match plan {
            UploadPlan::Accept { processed_records } => json!({
                "success": true,
                "uploadId": upload_id_for(&name),
                "message": "File uploaded",
                "processedRecords": processed_records,
            }),
            UploadPlan::Refuse { message, errors } => json!({
                "success": false,
                "uploadId": "",
                "message": message,
                "errors": errors,
            }),
            UploadPlan::FailMidway(_) => unreachable!(),
        };
        Ok(to_bytes(&body))
    }

    async fn post_multipart_once(
        &self,
        _path: &str,
        file: UploadFile,
    ) -> Result<Bytes, TransportError> {
        self.prechecked.lock().push(file.name().to_string());
        let gate = self.precheck_gates.lock().remove(file.name());
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let result = self
            .validations
            .lock()
            .get(file.name())
            .cloned()
            .unwrap_or(ValidationResult {
                valid: true,
                errors: Vec::new(),
                warnings: Vec::new(),
                preview: None,
            });
        Ok(Bytes::from(serde_json::to_vec(&result).unwrap()))
    }
}

pub fn api(transport: &Arc<FakeTransport>) -> DeliveryApi {
    DeliveryApi::new(TransportClient::with_transport(transport.clone()))
}

pub fn settings() -> UploadSettings {
    UploadSettings {
        concurrency: 4,
        status_polling: true,
        poll_interval: Duration::from_millis(5),
        processing_timeout: Duration::from_secs(5),
        server_precheck: false,
    }
}

pub fn coordinator(transport: &Arc<FakeTransport>, settings: UploadSettings) -> UploadCoordinator {
    UploadCoordinator::new(
        api(transport),
        UploadPolicy::default(),
        settings,
        Handle::current(),
    )
}

pub fn xlsx(name: &str) -> UploadFile {
    UploadFile::new(name, vec![1u8; 2048])
}

/// Collects events until `batches` batch-complete events have been seen.
pub async fn collect_until_batches(
    events: &mut mpsc::UnboundedReceiver<UploadEvent>,
    batches: usize,
) -> Vec<UploadEvent> {
    let mut seen = Vec::new();
    let mut complete = 0;
    while complete < batches {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for upload events")
            .expect("coordinator dropped the event channel");
        if matches!(event, UploadEvent::BatchComplete(_)) {
            complete += 1;
        }
        seen.push(event);
    }
    seen
}

/// Gives spawned work a chance to run, then returns whatever else arrived.
pub async fn drain_after_settle(events: &mut mpsc::UnboundedReceiver<UploadEvent>) -> Vec<UploadEvent> {
    tokio::time::sleep(Duration::from_millis(50)).await;
    let mut rest = Vec::new();
    while let Ok(event) = events.try_recv() {
        rest.push(event);
    }
    rest
}

/// Waits until `predicate` holds for the coordinator, polling briefly.
pub async fn wait_for<F>(predicate: F)
where
    F: Fn() -> bool,
{
    for _ in 0..500 {
        if predicate() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not reached in time");
}
