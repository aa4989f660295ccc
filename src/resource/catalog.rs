//! One resource constructor per dashboard read.

use super::RemoteResource;
use crate::api::{
    DeliveryApi, EmployeeActivity, OperationsSummary, StatsCard, StorePerformance,
    UploadHistoryItem, UploadStatusReport, WeeklyTrend,
};
use crate::error::TransportError;
use std::future::Future;
use tokio::runtime::Handle;

fn resource<T, F, Fut>(api: &DeliveryApi, runtime: &Handle, fetch: F) -> RemoteResource<T>
where
    T: Send + Sync + 'static,
    F: Fn(DeliveryApi) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, TransportError>> + Send + 'static,
{
    let api = api.clone();
    RemoteResource::activate(runtime.clone(), move || fetch(api.clone()))
}

pub fn dashboard_stats(api: &DeliveryApi, runtime: &Handle) -> RemoteResource<Vec<StatsCard>> {
    resource(api, runtime, |api| async move { api.dashboard_stats().await })
}

pub fn employee_activity(
    api: &DeliveryApi,
    runtime: &Handle,
) -> RemoteResource<Vec<EmployeeActivity>> {
    resource(api, runtime, |api| async move { api.employee_activity().await })
}

pub fn store_performance(
    api: &DeliveryApi,
    runtime: &Handle,
) -> RemoteResource<Vec<StorePerformance>> {
    resource(api, runtime, |api| async move { api.store_performance().await })
}

pub fn weekly_trends(api: &DeliveryApi, runtime: &Handle) -> RemoteResource<Vec<WeeklyTrend>> {
    resource(api, runtime, |api| async move { api.weekly_trends().await })
}

pub fn operations_summary(
    api: &DeliveryApi,
    runtime: &Handle,
) -> RemoteResource<OperationsSummary> {
    resource(api, runtime, |api| async move { api.operations_summary().await })
}

pub fn upload_history(
    api: &DeliveryApi,
    runtime: &Handle,
) -> RemoteResource<Vec<UploadHistoryItem>> {
    resource(api, runtime, |api| async move { api.upload_history().await })
}

/// Status of one server-side upload; each id gets its own resource.
pub fn upload_status(
    api: &DeliveryApi,
    runtime: &Handle,
    upload_id: impl Into<String>,
) -> RemoteResource<UploadStatusReport> {
    let upload_id = upload_id.into();
    resource(api, runtime, move |api| {
        let upload_id = upload_id.clone();
        async move { api.upload_status(&upload_id).await }
    })
}

pub fn weekly_summary(
    api: &DeliveryApi,
    runtime: &Handle,
    company: impl Into<String>,
) -> RemoteResource<serde_json::Value> {
    let company = company.into();
    resource(api, runtime, move |api| {
        let company = company.clone();
        async move { api.weekly_summary(&company).await }
    })
}
