// src/handlers/documents.rs

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::signup::DocumentEntry,
};

// Nomes em cabeçalho HTTP: só ASCII seguro
fn header_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// Só para a documentação do multipart
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadDocumentForm {
    #[schema(example = "doc_foto")]
    pub key: String,
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
}

struct UploadParts {
    key: Option<String>,
    filename: Option<String>,
    mime: Option<String>,
    bytes: Option<Vec<u8>>,
}

async fn read_upload(mut multipart: Multipart) -> Result<UploadParts, AppError> {
    let mut parts = UploadParts {
        key: None,
        filename: None,
        mime: None,
        bytes: None,
    };

    let invalid = |e: axum::extract::multipart::MultipartError| {
        AppError::validation("file", format!("Upload inválido: {}", e.body_text()))
    };

    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "key" => parts.key = Some(field.text().await.map_err(invalid)?.trim().to_string()),
            "file" => {
                parts.filename = field.file_name().map(str::to_string);
                parts.mime = field.content_type().map(str::to_string);
                parts.bytes = Some(field.bytes().await.map_err(invalid)?.to_vec());
            }
            _ => {}
        }
    }
    Ok(parts)
}

// POST /api/signup-requests/{id}/documents
#[utoipa::path(
    post,
    path = "/api/signup-requests/{id}/documents",
    tag = "Signup",
    request_body(content = UploadDocumentForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Documento armazenado", body = DocumentEntry),
        (status = 400, description = "Arquivo ausente, grande demais ou de tipo não permitido"),
        (status = 409, description = "Solicitação não aceita mais uploads")
    ),
    params(("id" = Uuid, Path, description = "ID da solicitação"))
)]
pub async fn upload_document(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let upload = read_upload(multipart)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let (Some(key), Some(bytes)) = (upload.key, upload.bytes) else {
        return Err(AppError::validation("file", "Nenhum arquivo enviado").to_api_error(&locale));
    };
    let mime = upload
        .mime
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let entry = app_state
        .signup_service
        .upload_document(id, &key, upload.filename, &mime, bytes)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(entry)))
}

// GET /api/signup-requests/{id}/documents/{key}
#[utoipa::path(
    get,
    path = "/api/signup-requests/{id}/documents/{key}",
    tag = "Signup",
    responses(
        (status = 200, description = "Conteúdo do documento"),
        (status = 404, description = "Documento não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da solicitação"),
        ("key" = String, Path, description = "Tipo do documento (ex.: doc_foto)")
    )
)]
pub async fn download_document(
    State(app_state): State<AppState>,
    locale: Locale,
    Path((id, key)): Path<(Uuid, String)>,
) -> Result<Response, ApiError> {
    let (entry, bytes) = app_state
        .signup_service
        .download_document(id, &key)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let headers = [
        (header::CONTENT_TYPE, entry.mime),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", header_filename(&entry.filename)),
        ),
    ];

    Ok((headers, bytes).into_response())
}

// GET /api/signup-requests/{id}/contract
#[utoipa::path(
    get,
    path = "/api/signup-requests/{id}/contract",
    tag = "Signup",
    responses(
        (status = 200, description = "Texto do contrato gerado na aprovação", body = String, content_type = "text/plain"),
        (status = 404, description = "Contrato ainda não gerado")
    ),
    params(("id" = Uuid, Path, description = "ID da solicitação"))
)]
pub async fn get_contract(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let text = app_state
        .signup_service
        .contract_text(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let headers = [
        (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"contrato_{}.txt\"", id),
        ),
    ];

    Ok((headers, text).into_response())
}

// GET /api/signup-requests/{id}/contract.pdf
#[utoipa::path(
    get,
    path = "/api/signup-requests/{id}/contract.pdf",
    tag = "Signup",
    responses(
        (status = 200, description = "Contrato em PDF com QR code de assinatura"),
        (status = 404, description = "Contrato ainda não gerado")
    ),
    params(("id" = Uuid, Path, description = "ID da solicitação"))
)]
pub async fn get_contract_pdf(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let pdf_bytes = app_state
        .signup_service
        .contract_pdf(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    // Configura os Headers para o navegador baixar ou mostrar o PDF
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"contrato_{}.pdf\"", id),
        ),
    ];

    Ok((headers, pdf_bytes).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_are_header_safe() {
        assert_eq!(header_filename("CNH João.pdf"), "CNH_Jo_o.pdf");
        assert_eq!(header_filename("a\"b.txt"), "a_b.txt");
    }
}
