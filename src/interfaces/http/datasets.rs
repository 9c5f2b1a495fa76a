use actix_multipart::Multipart;
use actix_web::http::header::{self, ContentDisposition};
use actix_web::{delete, get, post, web, HttpRequest, HttpResponse};
use futures::StreamExt;
use tracing::info;

use super::auth::authorize;
use super::HttpState;
use crate::domain::dataset::{NewDataset, UPLOAD_FIELD};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::report::PDF_CONTENT_TYPE;

#[get("/datasets")]
async fn list_datasets(req: HttpRequest, data: web::Data<HttpState>) -> Result<HttpResponse> {
    authorize(data.auth.as_ref(), &req)?;
    let datasets = data.service.list().await?;
    Ok(HttpResponse::Ok().json(datasets))
}

#[post("/datasets")]
async fn upload_dataset(
    req: HttpRequest,
    data: web::Data<HttpState>,
    payload: Multipart,
) -> Result<HttpResponse> {
    authorize(data.auth.as_ref(), &req)?;

    let upload = read_upload(payload, data.service.max_upload_bytes()).await?;
    info!(original_name = %upload.original_name, size = upload.bytes.len(), "Upload received");

    let dataset = data.service.upload(upload).await?;
    Ok(HttpResponse::Created().json(dataset))
}

#[get("/datasets/{id}")]
async fn get_dataset(
    req: HttpRequest,
    data: web::Data<HttpState>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    authorize(data.auth.as_ref(), &req)?;
    let dataset = data.service.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(dataset))
}

#[delete("/datasets/{id}")]
async fn delete_dataset(
    req: HttpRequest,
    data: web::Data<HttpState>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    authorize(data.auth.as_ref(), &req)?;
    data.service.delete(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[get("/datasets/{id}/stats")]
async fn dataset_stats(
    req: HttpRequest,
    data: web::Data<HttpState>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    authorize(data.auth.as_ref(), &req)?;
    let stats = data.service.stats(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(stats))
}

#[get("/datasets/{id}/report")]
async fn dataset_report(
    req: HttpRequest,
    data: web::Data<HttpState>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    authorize(data.auth.as_ref(), &req)?;
    let report = data.service.report(path.into_inner()).await?;
    Ok(HttpResponse::Ok()
        .content_type(PDF_CONTENT_TYPE)
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", report.file_name),
        ))
        .body(report.bytes))
}

/// Pull the single `file` field out of the form, enforcing the size limit
/// while streaming. Other fields are drained and ignored.
async fn read_upload(mut payload: Multipart, max_bytes: usize) -> Result<NewDataset> {
    let mut upload: Option<NewDataset> = None;

    while let Some(field) = payload.next().await {
        let mut field = field.map_err(malformed)?;

        let disposition = field
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|value| ContentDisposition::from_raw(value).ok());
        let name = disposition.as_ref().and_then(|cd| cd.get_name());
        let file_name = disposition
            .as_ref()
            .and_then(|cd| cd.get_filename())
            .unwrap_or_default()
            .to_string();

        if name != Some(UPLOAD_FIELD) {
            while let Some(chunk) = field.next().await {
                chunk.map_err(malformed)?;
            }
            continue;
        }
        if upload.is_some() {
            return Err(AppError::Validation(
                "Only one file may be uploaded per request".to_string(),
            ));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(malformed)?;
            if bytes.len() + chunk.len() > max_bytes {
                return Err(AppError::Validation(format!(
                    "File is too large (limit {} bytes)",
                    max_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }
        upload = Some(NewDataset::new(&file_name, bytes));
    }

    upload.ok_or_else(|| {
        AppError::Validation(format!("No file submitted in the '{}' field", UPLOAD_FIELD))
    })
}

fn malformed(err: actix_multipart::MultipartError) -> AppError {
    AppError::Validation(format!("Malformed multipart body: {}", err))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_datasets)
        .service(upload_dataset)
        .service(get_dataset)
        .service(delete_dataset)
        .service(dataset_stats)
        .service(dataset_report);
}
