//! Resume text extraction from uploaded bytes (PDF or plain text).

use crate::resumes::parser::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeFormat {
    Pdf,
    PlainText,
}

impl ResumeFormat {
    /// Picks the format from the declared content type, falling back to the file extension.
    pub fn detect(content_type: Option<&str>, file_name: Option<&str>) -> Result<Self, ParseError> {
        let mime = content_type
            .map(|c| c.split(';').next().unwrap_or(c).trim().to_lowercase())
            .unwrap_or_default();
        match mime.as_str() {
            "application/pdf" => return Ok(ResumeFormat::Pdf),
            "text/plain" | "text/markdown" => return Ok(ResumeFormat::PlainText),
            _ => {}
        }

        let extension = file_name
            .and_then(|n| n.rsplit_once('.'))
            .map(|(_, ext)| ext.to_lowercase());
        match extension.as_deref() {
            Some("pdf") => Ok(ResumeFormat::Pdf),
            Some("txt") | Some("md") => Ok(ResumeFormat::PlainText),
            _ => Err(ParseError::UnsupportedFormat(if mime.is_empty() {
                file_name.unwrap_or("unknown").to_string()
            } else {
                mime
            })),
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ResumeFormat::Pdf => "application/pdf",
            ResumeFormat::PlainText => "text/plain",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ResumeFormat::Pdf => "pdf",
            ResumeFormat::PlainText => "txt",
        }
    }
}

/// Extracts raw text. PDF extraction is CPU-bound; call it from `spawn_blocking`.
pub fn extract_text(bytes: &[u8], format: ResumeFormat) -> Result<String, ParseError> {
    let text = match format {
        ResumeFormat::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ParseError::Pdf(e.to_string()))?,
        ResumeFormat::PlainText => {
            String::from_utf8(bytes.to_vec()).map_err(|_| ParseError::Encoding)?
        }
    };

    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(text)
}
