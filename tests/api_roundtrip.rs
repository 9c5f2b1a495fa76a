use std::net::TcpListener;
use std::path::Path;
use std::sync::Arc;

use actix_web::dev::ServerHandle;
use equiview::application::DatasetService;
use equiview::domain::error::AppError;
use equiview::infrastructure::api_client::{ClientConfig, DatasetApiClient};
use equiview::infrastructure::config::{AppConfig, AuthConfig};
use equiview::infrastructure::db::SqliteDatasetStore;
use equiview::infrastructure::storage::BlobStore;
use equiview::interfaces::http::start_server_on;
use tempfile::TempDir;

const SAMPLE: &str = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
                      Pump-1,Pump,10,5,100\n\
                      Pump-2,Pump,20,7,110\n\
                      Valve-1,Valve,15,6,90\n";

struct TestServer {
    base_url: String,
    handle: ServerHandle,
    data_dir: TempDir,
}

impl TestServer {
    async fn start(auth: Option<AuthConfig>) -> Self {
        let data_dir = tempfile::tempdir().unwrap();

        let mut config = AppConfig::default();
        config.storage.data_dir = data_dir.path().to_path_buf();
        config.auth = auth;

        let blobs = BlobStore::open(config.storage.blob_dir()).await.unwrap();
        let store = SqliteDatasetStore::connect(&config.storage.database_path(), blobs)
            .await
            .unwrap();
        let service = DatasetService::new(
            Arc::new(store),
            config.retention.limit,
            config.upload.max_bytes,
        )
        .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let server = start_server_on(listener, &config, Arc::new(service)).unwrap();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        Self {
            base_url,
            handle,
            data_dir,
        }
    }

    fn client(&self) -> DatasetApiClient {
        DatasetApiClient::new(ClientConfig::new(&self.base_url).unwrap()).unwrap()
    }

    fn blob_dir(&self) -> std::path::PathBuf {
        self.data_dir.path().join("datasets")
    }

    async fn stop(self) {
        self.handle.stop(true).await;
    }
}

fn blob_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[actix_web::test]
async fn upload_stats_and_report_end_to_end() {
    let server = TestServer::start(None).await;
    let client = server.client();

    let dataset = client
        .upload("equipment.csv", SAMPLE.as_bytes().to_vec())
        .await
        .unwrap();
    assert_eq!(dataset.original_name, "equipment.csv");
    assert_eq!(dataset.size_bytes, SAMPLE.len() as i64);

    let stats = client.stats(dataset.id).await.unwrap();
    assert_eq!(stats.total_count, 3);
    assert_eq!(stats.average_flowrate, Some(15.0));
    assert_eq!(stats.average_pressure, Some(6.0));
    assert_eq!(stats.average_temperature, Some(100.0));
    let distribution: Vec<(&str, usize)> = stats.type_distribution.iter().collect();
    assert_eq!(distribution, vec![("Pump", 2), ("Valve", 1)]);
    assert_eq!(stats.rows.len(), 3);
    assert_eq!(stats.rows[0].name, "Pump-1");

    let pdf = client.report(dataset.id).await.unwrap();
    assert!(pdf.starts_with(b"%PDF-"));
    let document = lopdf::Document::load_mem(&pdf).unwrap();
    assert_eq!(document.get_pages().len(), 1);

    server.stop().await;
}

#[actix_web::test]
async fn missing_column_is_reported_on_stats_not_upload() {
    let server = TestServer::start(None).await;
    let client = server.client();

    let csv = "Equipment Name,Type,Flowrate,Temperature\nPump-1,Pump,10,100\n";
    let dataset = client.upload("partial.csv", csv.as_bytes().to_vec()).await.unwrap();

    match client.stats(dataset.id).await {
        Err(AppError::Validation(message)) => {
            assert_eq!(message, "Missing required columns: Pressure")
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert!(matches!(
        client.report(dataset.id).await,
        Err(AppError::Validation(_))
    ));

    server.stop().await;
}

#[actix_web::test]
async fn sixth_upload_evicts_the_oldest() {
    let server = TestServer::start(None).await;
    let client = server.client();

    let mut uploaded = Vec::new();
    for i in 1..=6 {
        let dataset = client
            .upload(&format!("batch-{}.csv", i), SAMPLE.as_bytes().to_vec())
            .await
            .unwrap();
        uploaded.push(dataset);
    }

    let listed = client.list_datasets().await.unwrap();
    assert_eq!(listed.len(), 5);
    let listed_ids: Vec<i64> = listed.iter().map(|d| d.id).collect();
    let expected: Vec<i64> = uploaded.iter().skip(1).rev().map(|d| d.id).collect();
    assert_eq!(listed_ids, expected);

    let oldest = &uploaded[0];
    assert!(matches!(
        client.get_dataset(oldest.id).await,
        Err(AppError::NotFound(_))
    ));

    let blobs = blob_names(&server.blob_dir());
    assert_eq!(blobs.len(), 5);
    assert!(!blobs.contains(&oldest.file));

    server.stop().await;
}

#[actix_web::test]
async fn delete_removes_record_and_blob() {
    let server = TestServer::start(None).await;
    let client = server.client();

    let dataset = client.upload("gone.csv", SAMPLE.as_bytes().to_vec()).await.unwrap();
    client.delete_dataset(dataset.id).await.unwrap();

    assert!(matches!(
        client.get_dataset(dataset.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(blob_names(&server.blob_dir()).is_empty());
    assert!(matches!(
        client.delete_dataset(dataset.id).await,
        Err(AppError::NotFound(_))
    ));

    server.stop().await;
}

#[actix_web::test]
async fn credentials_are_enforced_when_configured() {
    let server = TestServer::start(Some(AuthConfig {
        username: "operator".to_string(),
        password: "s3cret".to_string(),
    }))
    .await;

    let anonymous = server.client();
    assert!(matches!(
        anonymous.verify_credentials().await,
        Err(AppError::Unauthorized)
    ));

    let wrong = DatasetApiClient::new(
        ClientConfig::new(&server.base_url)
            .unwrap()
            .with_credentials("operator", "guess"),
    )
    .unwrap();
    assert!(matches!(
        wrong.upload("x.csv", SAMPLE.as_bytes().to_vec()).await,
        Err(AppError::Unauthorized)
    ));

    let operator = DatasetApiClient::new(
        ClientConfig::new(&server.base_url)
            .unwrap()
            .with_credentials("operator", "s3cret"),
    )
    .unwrap();
    operator.verify_credentials().await.unwrap();
    let dataset = operator.upload("ok.csv", SAMPLE.as_bytes().to_vec()).await.unwrap();
    assert_eq!(operator.stats(dataset.id).await.unwrap().total_count, 3);

    server.stop().await;
}
