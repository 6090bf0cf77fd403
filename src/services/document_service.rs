// src/services/document_service.rs

use std::path::PathBuf;

use genpdf::{elements, style, Element};
use image::{DynamicImage, Luma};
use qrcode::QrCode;

use crate::common::error::AppError;

const FONT_FAMILY: &str = "Roboto";

/// Renderiza o contrato preenchido em PDF, com QR code do link de assinatura.
#[derive(Clone)]
pub struct DocumentService {
    fonts_dir: PathBuf,
}

impl DocumentService {
    pub fn new(fonts_dir: impl Into<PathBuf>) -> Self {
        Self {
            fonts_dir: fonts_dir.into(),
        }
    }

    pub async fn render_contract_pdf(
        &self,
        title: String,
        contract_text: String,
        sign_link: String,
    ) -> Result<Vec<u8>, AppError> {
        let fonts_dir = self.fonts_dir.clone();

        // genpdf é síncrono e pesado: roda fora do executor
        tokio::task::spawn_blocking(move || {
            render_contract(&fonts_dir, &title, &contract_text, &sign_link)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de geração do PDF: {}", e))?
    }
}

/// QR code do link em escala de cinza.
pub fn qr_image(link: &str) -> Result<DynamicImage, AppError> {
    let code = QrCode::new(link.as_bytes())
        .map_err(|e| AppError::DocumentGeneration(e.to_string()))?;
    let buffer = code.render::<Luma<u8>>().build();
    Ok(DynamicImage::ImageLuma8(buffer))
}

fn render_contract(
    fonts_dir: &std::path::Path,
    title: &str,
    contract_text: &str,
    sign_link: &str,
) -> Result<Vec<u8>, AppError> {
    // 1. Fonte da pasta FONTS_DIR
    let font_family = genpdf::fonts::from_files(fonts_dir, FONT_FAMILY, None).map_err(|e| {
        AppError::DocumentGeneration(format!(
            "Fonte {} não encontrada em {}: {}",
            FONT_FAMILY,
            fonts_dir.display(),
            e
        ))
    })?;

    let mut doc = genpdf::Document::new(font_family);
    doc.set_title(title);
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(15);
    doc.set_page_decorator(decorator);

    // 2. Cabeçalho
    doc.push(elements::Paragraph::new(title).styled(style::Style::new().bold().with_font_size(14)));
    doc.push(elements::Break::new(1.5));

    // 3. Corpo: uma linha do template por parágrafo, linhas vazias viram espaço
    for line in contract_text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            doc.push(elements::Break::new(0.5));
        } else {
            doc.push(elements::Paragraph::new(line).styled(style::Style::new().with_font_size(10)));
        }
    }

    doc.push(elements::Break::new(2));

    // 4. Assinatura eletrônica (QR code)
    doc.push(
        elements::Paragraph::new("ASSINATURA ELETRÔNICA")
            .styled(style::Style::new().bold().with_font_size(12)),
    );
    doc.push(elements::Paragraph::new(sign_link).styled(style::Style::new().with_font_size(9)));
    doc.push(elements::Break::new(1));

    let pdf_image = elements::Image::from_dynamic_image(qr_image(sign_link)?)
        .map_err(|e| AppError::DocumentGeneration(e.to_string()))?
        .with_scale(genpdf::Scale::new(0.5, 0.5));
    doc.push(pdf_image);

    // 5. Buffer em memória
    let mut buffer = Vec::new();
    doc.render(&mut buffer)
        .map_err(|e| AppError::DocumentGeneration(e.to_string()))?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qr_code_encodes_the_sign_link() {
        let img = qr_image("http://localhost:3000/cadastro/assinatura?id=abc").unwrap();
        assert!(img.to_luma8().width() > 20);
    }

    #[tokio::test]
    async fn missing_fonts_surface_as_document_error() {
        let service = DocumentService::new("/nonexistent/fonts");
        let err = service
            .render_contract_pdf("Contrato".into(), "texto".into(), "http://x".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DocumentGeneration(_)));
    }
}
