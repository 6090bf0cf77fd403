// src/services/upload_policy.rs

use image::{imageops::FilterType, GenericImageView, ImageOutputFormat};

use crate::common::error::AppError;

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
/// Acima disto (ou do lado máximo) a imagem é recomprimida.
pub const RECOMPRESS_ABOVE_BYTES: usize = 2 * 1024 * 1024;
pub const MAX_IMAGE_SIDE: u32 = 2048;
pub const JPEG_QUALITY: u8 = 80;

const DOCUMENT_TYPES: [(&str, &str); 6] = [
    ("application/pdf", "pdf"),
    ("application/msword", "doc"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "docx",
    ),
    ("text/plain", "txt"),
    ("application/rtf", "rtf"),
    ("application/vnd.oasis.opendocument.text", "odt"),
];

/// Arquivo pronto para ir ao blob store.
#[derive(Debug)]
pub struct PreparedUpload {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub extension: String,
}

pub fn is_allowed_mime(mime: &str) -> bool {
    mime.starts_with("image/") || DOCUMENT_TYPES.iter().any(|(m, _)| *m == mime)
}

pub fn extension_for(mime: &str) -> String {
    if let Some((_, ext)) = DOCUMENT_TYPES.iter().find(|(m, _)| *m == mime) {
        return ext.to_string();
    }
    // Subtipo vira parte do nome do arquivo: só alfanumérico
    let subtype = mime
        .strip_prefix("image/")
        .and_then(|rest| rest.split(['+', ';']).next())
        .map(str::trim)
        .unwrap_or_default();
    if subtype.is_empty() || subtype == "jpeg" || !subtype.chars().all(|c| c.is_ascii_alphanumeric()) {
        return "jpg".to_string();
    }
    subtype.to_ascii_lowercase()
}

/// Nome gravado: `<chave>_<millis>.<ext>`.
pub fn stored_filename(key: &str, millis: i64, extension: &str) -> String {
    format!("{key}_{millis}.{extension}")
}

/// Aplica a política de upload: tamanho, tipo e recompressão de imagens grandes.
/// CPU-bound; quem chama deve rodar em `spawn_blocking`.
pub fn prepare_upload(bytes: Vec<u8>, mime: &str) -> Result<PreparedUpload, AppError> {
    if bytes.is_empty() {
        return Err(AppError::validation("file", "Nenhum arquivo enviado"));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::validation("file", "Arquivo excede 10MB."));
    }
    let mime = mime.trim().to_lowercase();
    if !is_allowed_mime(&mime) {
        return Err(AppError::validation(
            "file",
            "Formato não permitido. Use imagens ou documentos (PDF, DOC, DOCX, etc.).",
        ));
    }

    if mime.starts_with("image/") {
        if let Some(jpeg) = recompress_if_needed(&bytes) {
            return Ok(PreparedUpload {
                bytes: jpeg,
                mime: "image/jpeg".to_string(),
                extension: "jpg".to_string(),
            });
        }
    }

    Ok(PreparedUpload {
        extension: extension_for(&mime),
        bytes,
        mime,
    })
}

// None: imagem pequena, formato não decodificável ou falha no encoder.
// Nos três casos o arquivo segue como foi enviado.
fn recompress_if_needed(bytes: &[u8]) -> Option<Vec<u8>> {
    let img = match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(e) => {
            tracing::debug!("Imagem não decodificada, armazenando original: {}", e);
            return None;
        }
    };

    let (width, height) = img.dimensions();
    let oversized = width.max(height) > MAX_IMAGE_SIDE;
    if !oversized && bytes.len() <= RECOMPRESS_ABOVE_BYTES {
        return None;
    }

    let img = if oversized {
        img.resize(MAX_IMAGE_SIDE, MAX_IMAGE_SIDE, FilterType::Triangle)
    } else {
        img
    };
    let rgb = image::DynamicImage::ImageRgb8(img.to_rgb8());

    let mut out = Vec::new();
    if let Err(e) = rgb.write_to(&mut out, ImageOutputFormat::Jpeg(JPEG_QUALITY)) {
        tracing::warn!("Falha ao recomprimir imagem: {}", e);
        return None;
    }
    tracing::debug!("Imagem recomprimida: {} -> {} bytes", bytes.len(), out.len());
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
        let mut out = Vec::new();
        img.write_to(&mut out, ImageOutputFormat::Png).unwrap();
        out
    }

    #[test]
    fn rejects_empty_oversized_and_unknown_types() {
        assert!(prepare_upload(Vec::new(), "application/pdf").is_err());
        assert!(prepare_upload(vec![0; MAX_UPLOAD_BYTES + 1], "application/pdf").is_err());
        assert!(prepare_upload(vec![1, 2, 3], "application/zip").is_err());
    }

    #[test]
    fn documents_pass_through_with_mapped_extension() {
        let prepared = prepare_upload(b"%PDF-1.4".to_vec(), "application/pdf").unwrap();
        assert_eq!(prepared.extension, "pdf");
        assert_eq!(prepared.bytes, b"%PDF-1.4");
    }

    #[test]
    fn small_images_are_kept() {
        let bytes = png(64, 64);
        let prepared = prepare_upload(bytes.clone(), "image/png").unwrap();
        assert_eq!(prepared.mime, "image/png");
        assert_eq!(prepared.extension, "png");
        assert_eq!(prepared.bytes, bytes);
    }

    #[test]
    fn wide_images_are_resized_to_jpeg() {
        let prepared = prepare_upload(png(3000, 20), "image/png").unwrap();
        assert_eq!(prepared.mime, "image/jpeg");
        assert_eq!(prepared.extension, "jpg");

        let decoded = image::load_from_memory(&prepared.bytes).unwrap();
        assert!(decoded.width() <= MAX_IMAGE_SIDE);
    }

    #[test]
    fn undecodable_images_are_stored_as_sent() {
        let prepared = prepare_upload(b"not really a png".to_vec(), "image/png").unwrap();
        assert_eq!(prepared.mime, "image/png");
        assert_eq!(prepared.bytes, b"not really a png");
    }

    #[test]
    fn filename_layout() {
        assert_eq!(stored_filename("doc_foto", 1700000000000, "jpg"), "doc_foto_1700000000000.jpg");
        assert_eq!(extension_for("image/svg+xml"), "svg");
        assert_eq!(extension_for("image/a/b"), "jpg");
        assert_eq!(extension_for("image/../../etc"), "jpg");
        assert_eq!(extension_for("image/we bp"), "jpg");
    }
}
