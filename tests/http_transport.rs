use delivery_dash::api::{RemoteUploadState, TemplateKind};
use delivery_dash::config::ApiConfig;
use delivery_dash::upload::UploadFile;
use delivery_dash::{DeliveryApi, TransportClient, TransportError};
use mockito::Matcher;
use std::time::Duration;

fn api_for(base_url: String) -> DeliveryApi {
    let config = ApiConfig {
        base_url,
        request_timeout: Duration::from_secs(5),
    };
    DeliveryApi::new(TransportClient::http(&config).unwrap())
}

#[tokio::test]
async fn decodes_a_successful_read() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/operations-summary")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"totalDeliveries":120,"totalCases":4800,"totalHours":960.5,
                "recentDeliveries":14,"averageCasesPerDelivery":40.0,
                "averageHoursPerEmployee":36.2}"#,
        )
        .create_async()
        .await;

    let api = api_for(server.url());
    let summary = api.operations_summary().await.unwrap();

    assert_eq!(summary.total_deliveries, 120);
    assert_eq!(summary.recent_deliveries, 14);
    mock.assert_async().await;
}

#[tokio::test]
async fn non_success_status_is_an_http_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/dashboard-stats")
        .with_status(404)
        .with_body("no such route")
        .create_async()
        .await;

    let err = api_for(server.url()).dashboard_stats().await.unwrap_err();

    assert_eq!(
        err,
        TransportError::Http {
            status: 404,
            message: "no such route".to_string()
        }
    );
    assert_eq!(err.to_string(), "HTTP error! status: 404");
}

#[tokio::test]
async fn unexpected_body_is_a_decode_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/upload-history")
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create_async()
        .await;

    let err = api_for(server.url()).upload_history().await.unwrap_err();
    assert!(matches!(err, TransportError::Decode(_)), "{:?}", err);
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let err = api_for("http://127.0.0.1:1".to_string())
        .upload_history()
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Network(_)), "{:?}", err);
}

#[tokio::test]
async fn multipart_upload_reports_progress_to_completion() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/upload-schedule")
        .match_header(
            "content-type",
            Matcher::Regex("multipart/form-data; boundary=.*".to_string()),
        )
        .match_body(Matcher::Regex(r#"filename="week-1.csv""#.to_string()))
        .with_status(200)
        .with_body(r#"{"success":true,"uploadId":"u-77","message":"ok","processedRecords":3}"#)
        .create_async()
        .await;

    let rows = "store,cases\n".to_string() + &"12,40\n".repeat(40_000);
    let file = UploadFile::new("week-1.csv", rows.into_bytes()).with_mime_type("text/csv");
    let upload = api_for(server.url()).upload_schedule(file);

    let response = upload.outcome.await.unwrap();
    assert!(response.success);
    assert_eq!(response.upload_id, "u-77");
    assert_eq!(response.processed_records, Some(3));
    mock.assert_async().await;

    let mut progress = upload.progress;
    let mut seen = Vec::new();
    while let Ok(percent) = progress.try_recv() {
        seen.push(percent);
    }
    assert_eq!(seen.first(), Some(&0));
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.windows(2).all(|w| w[0] < w[1]), "{:?}", seen);
}

#[tokio::test]
async fn upload_status_and_template_download() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/upload-status/u-77")
        .with_status(200)
        .with_body(
            r#"{"id":"u-77","fileName":"week-1.csv","status":"completed","progress":100,
                "uploadedAt":"2024-05-01T10:00:00Z","processedRecords":3}"#,
        )
        .create_async()
        .await;
    server
        .mock("GET", "/api/download-template/schedule")
        .with_status(200)
        .with_header(
            "content-type",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        )
        .with_body(vec![0x50u8, 0x4b, 0x03, 0x04])
        .create_async()
        .await;

    let api = api_for(server.url());
    let report = api.upload_status("u-77").await.unwrap();
    assert_eq!(report.status, RemoteUploadState::Completed);

    let template = api.download_template(TemplateKind::default()).await.unwrap();
    assert_eq!(&template[..], &[0x50, 0x4b, 0x03, 0x04]);
}

#[tokio::test]
async fn validate_file_posts_without_progress() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/validate-file")
        .with_status(200)
        .with_body(r#"{"valid":false,"errors":["Missing column: Store"],"warnings":[]}"#)
        .create_async()
        .await;

    let file = UploadFile::new("roster.csv", b"name\nDana\n".to_vec());
    let result = api_for(server.url()).validate_file(file).await.unwrap();
    assert!(!result.valid);
    assert_eq!(result.errors, vec!["Missing column: Store"]);
}
