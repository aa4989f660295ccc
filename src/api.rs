//! Typed endpoints of the delivery-operations API.

use crate::error::TransportError;
use crate::transport::{MultipartUpload, TransportClient};
use crate::upload::UploadFile;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub mod endpoints {
    pub const DASHBOARD_STATS: &str = "/api/dashboard-stats";
    pub const EMPLOYEE_ACTIVITY: &str = "/api/employee-activity";
    pub const STORE_PERFORMANCE: &str = "/api/store-performance";
    pub const WEEKLY_TRENDS: &str = "/api/weekly-trends";
    pub const OPERATIONS_SUMMARY: &str = "/api/operations-summary";
    pub const STORES: &str = "/api/stores";
    pub const EMPLOYEES: &str = "/api/employees";
    pub const VALIDATE_FILE: &str = "/api/validate-file";
    pub const UPLOAD_SCHEDULE: &str = "/api/upload-schedule";
    pub const UPLOAD_HISTORY: &str = "/api/upload-history";

    pub fn upload_status(upload_id: &str) -> String {
        format!("/api/upload-status/{}", upload_id)
    }

    pub fn download_template(kind: &str) -> String {
        format!("/api/download-template/{}", kind)
    }

    pub fn weekly_summary(company: &str) -> String {
        format!("/api/weekly-summary/{}", company)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsCard {
    pub title: String,
    pub value: String,
    pub change: String,
    pub change_type: ChangeType,
    pub icon: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmployeeStatus {
    Active,
    Idle,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeActivity {
    pub id: u64,
    pub name: String,
    pub store: String,
    pub hours_worked: f64,
    pub cases_delivered: u64,
    pub efficiency: f64,
    pub status: EmployeeStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorePerformance {
    pub store: String,
    pub total_cases: u64,
    pub delivery_count: u64,
    pub avg_cases_per_delivery: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyTrend {
    pub week: String,
    pub cases: u64,
    pub stores: u64,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationsSummary {
    pub total_deliveries: u64,
    pub total_cases: u64,
    pub total_hours: f64,
    pub recent_deliveries: u64,
    pub average_cases_per_delivery: f64,
    pub average_hours_per_employee: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePreview {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub total_rows: u64,
}

/// Structural pre-check of a file, as reported by `/api/validate-file`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub preview: Option<FilePreview>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub upload_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub processed_records: Option<u64>,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteUploadState {
    Pending,
    Uploading,
    Processing,
    Completed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadStatusReport {
    pub id: String,
    pub file_name: String,
    pub status: RemoteUploadState,
    pub progress: f64,
    pub uploaded_at: String,
    #[serde(default)]
    pub processed_records: Option<u64>,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStatus {
    Completed,
    Failed,
    Processing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadHistoryItem {
    pub id: String,
    pub file_name: String,
    pub upload_date: String,
    pub status: HistoryStatus,
    pub processed_records: u64,
    pub file_size: u64,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
}

/// Template documents offered by `/api/download-template/:type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemplateKind {
    #[default]
    Schedule,
    Employees,
}

impl TemplateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::Schedule => "schedule",
            TemplateKind::Employees => "employees",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}-template.xlsx", self.as_str())
    }
}

/// The delivery API as the dashboard and the upload surface see it.
#[derive(Debug, Clone)]
pub struct DeliveryApi {
    client: TransportClient,
}

impl DeliveryApi {
    pub fn new(client: TransportClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &TransportClient {
        &self.client
    }

    pub async fn dashboard_stats(&self) -> Result<Vec<StatsCard>, TransportError> {
        self.client.fetch_json(endpoints::DASHBOARD_STATS).await
    }

    pub async fn employee_activity(&self) -> Result<Vec<EmployeeActivity>, TransportError> {
        self.client.fetch_json(endpoints::EMPLOYEE_ACTIVITY).await
    }

    pub async fn store_performance(&self) -> Result<Vec<StorePerformance>, TransportError> {
        self.client.fetch_json(endpoints::STORE_PERFORMANCE).await
    }

    pub async fn weekly_trends(&self) -> Result<Vec<WeeklyTrend>, TransportError> {
        self.client.fetch_json(endpoints::WEEKLY_TRENDS).await
    }

    pub async fn operations_summary(&self) -> Result<OperationsSummary, TransportError> {
        self.client.fetch_json(endpoints::OPERATIONS_SUMMARY).await
    }

    // Older untyped endpoints still served by the backend.
    pub async fn stores(&self) -> Result<serde_json::Value, TransportError> {
        self.client.fetch_json(endpoints::STORES).await
    }

    pub async fn employees(&self) -> Result<serde_json::Value, TransportError> {
        self.client.fetch_json(endpoints::EMPLOYEES).await
    }

    pub async fn weekly_summary(&self, company: &str) -> Result<serde_json::Value, TransportError> {
        self.client
            .fetch_json(&endpoints::weekly_summary(company))
            .await
    }

    pub async fn validate_file(&self, file: UploadFile) -> Result<ValidationResult, TransportError> {
        self.client
            .post_multipart_json(endpoints::VALIDATE_FILE, file)
            .await
    }

    pub fn upload_schedule(&self, file: UploadFile) -> MultipartUpload<UploadResponse> {
        self.client.post_multipart(endpoints::UPLOAD_SCHEDULE, file)
    }

    pub async fn upload_status(&self, upload_id: &str) -> Result<UploadStatusReport, TransportError> {
        self.client
            .fetch_json(&endpoints::upload_status(upload_id))
            .await
    }

    pub async fn upload_history(&self) -> Result<Vec<UploadHistoryItem>, TransportError> {
        self.client.fetch_json(endpoints::UPLOAD_HISTORY).await
    }

    pub async fn download_template(&self, kind: TemplateKind) -> Result<Bytes, TransportError> {
        self.client
            .fetch_blob(&endpoints::download_template(kind.as_str()))
            .await
    }
}
