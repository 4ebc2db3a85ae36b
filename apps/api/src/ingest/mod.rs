//! File Ingestion: turns an uploaded file into raw word entries.
//!
//! CSV files are parsed locally; images go through the vision model. Anything
//! else fails fast with `IngestError::UnsupportedFormat`.

pub mod csv;
pub mod image;
pub mod prompts;

use bytes::Bytes;
use thiserror::Error;
use tracing::info;

use crate::models::flashcard::UploadedWord;
use self::image::VisionExtractor;

pub const UNSUPPORTED_FORMAT_MESSAGE: &str =
    "Unsupported file format. Please use CSV or image files.";
pub const SPREADSHEET_MESSAGE: &str = "Excel files not yet supported. Please use CSV format.";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{0}")]
    UnsupportedFormat(String),

    #[error("Failed to read file: {0}")]
    Unreadable(String),

    #[error("Failed to extract text from image: {0}")]
    Extraction(String),
}

/// An uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Image { media_type: &'static str },
}

fn unsupported() -> IngestError {
    IngestError::UnsupportedFormat(UNSUPPORTED_FORMAT_MESSAGE.to_string())
}

/// The extension decides. The MIME type is consulted only for names without one.
pub fn detect_file_kind(
    file_name: &str,
    content_type: Option<&str>,
) -> Result<FileKind, IngestError> {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("csv") => return Ok(FileKind::Csv),
        Some("xlsx" | "xls" | "ods") => {
            return Err(IngestError::UnsupportedFormat(SPREADSHEET_MESSAGE.to_string()))
        }
        Some(ext) => {
            return image_media_type(ext)
                .map(|media_type| FileKind::Image { media_type })
                .ok_or_else(unsupported)
        }
        None => {}
    }

    let mime = content_type
        .map(|c| c.split(';').next().unwrap_or(c).trim().to_ascii_lowercase());
    match mime.as_deref() {
        Some("text/csv") => Ok(FileKind::Csv),
        Some(mime) => mime
            .strip_prefix("image/")
            .and_then(image_media_type)
            .map(|media_type| FileKind::Image { media_type })
            .ok_or_else(unsupported),
        None => Err(unsupported()),
    }
}

fn image_media_type(subtype: &str) -> Option<&'static str> {
    match subtype {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Dispatches to the CSV or vision path. May return an empty list.
pub async fn ingest_file(
    file: &UploadedFile,
    vision: &dyn VisionExtractor,
) -> Result<Vec<UploadedWord>, IngestError> {
    let kind = detect_file_kind(&file.file_name, file.content_type.as_deref())?;
    info!("Ingesting {} as {:?}", file.file_name, kind);

    match kind {
        FileKind::Csv => {
            let content = std::str::from_utf8(&file.bytes)
                .map_err(|e| IngestError::Unreadable(format!("CSV is not valid UTF-8 ({e})")))?;
            Ok(csv::parse_csv(content))
        }
        FileKind::Image { media_type } => {
            image::extract_words_from_image(vision, &file.bytes, media_type).await
        }
    }
}
