//! MIME type policy for stored payloads.
//!
//! Data documents are always XML and form definitions are always served as XHTML.
//! Attachments keep whatever type the client declared; without a declaration the
//! type is guessed from the attachment name's extension, falling back to
//! `application/octet-stream`.

use crate::core::error::GatewayError;

/// Common MIME type constants.
pub mod types {
    pub const XML: &str = "application/xml";
    pub const XHTML: &str = "application/xhtml+xml";
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const CSS: &str = "text/css; charset=utf-8";
    pub const JAVASCRIPT: &str = "text/javascript; charset=utf-8";
    pub const JSON: &str = "application/json";
    pub const CSV: &str = "text/csv; charset=utf-8";

    pub const PDF: &str = "application/pdf";
    pub const OCTET_STREAM: &str = "application/octet-stream";
    pub const ZIP: &str = "application/zip";
    pub const GZIP: &str = "application/gzip";
    pub const DOCX: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
    pub const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
    pub const GIF: &str = "image/gif";
    pub const WEBP: &str = "image/webp";
    pub const SVG: &str = "image/svg+xml";
    pub const ICO: &str = "image/x-icon";
    pub const BMP: &str = "image/bmp";
    pub const TIFF: &str = "image/tiff";

    pub const MP3: &str = "audio/mpeg";
    pub const WAV: &str = "audio/wav";
    pub const MP4: &str = "video/mp4";
    pub const WEBM: &str = "video/webm";
}

/// Guess a MIME type from a file name's extension (ASCII case-insensitive).
pub fn from_name(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    from_extension(ext.as_deref())
}

pub fn from_extension(ext: Option<&str>) -> &'static str {
    match ext {
        Some("xml") => types::XML,
        Some("xhtml") => types::XHTML,
        Some("html" | "htm") => types::HTML,
        Some("txt") => types::PLAIN,
        Some("css") => types::CSS,
        Some("js") => types::JAVASCRIPT,
        Some("json") => types::JSON,
        Some("csv") => types::CSV,

        Some("pdf") => types::PDF,
        Some("zip") => types::ZIP,
        Some("gz" | "gzip") => types::GZIP,
        Some("docx") => types::DOCX,
        Some("xlsx") => types::XLSX,

        Some("png") => types::PNG,
        Some("jpg" | "jpeg") => types::JPEG,
        Some("gif") => types::GIF,
        Some("webp") => types::WEBP,
        Some("svg") => types::SVG,
        Some("ico") => types::ICO,
        Some("bmp") => types::BMP,
        Some("tif" | "tiff") => types::TIFF,

        Some("mp3") => types::MP3,
        Some("wav") => types::WAV,
        Some("mp4" | "m4v") => types::MP4,
        Some("webm") => types::WEBM,

        _ => types::OCTET_STREAM,
    }
}

/// `type/subtype` without parameters, lowercased.
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

pub fn is_xml(content_type: &str) -> bool {
    let essence = essence(content_type);
    essence == "text/xml" || essence == types::XML || essence.ends_with("+xml")
}

/// Decides which content types attachments are stored with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentPolicy {
    allowed: Vec<String>,
}

impl AttachmentPolicy {
    /// `allowed` lists accepted type essences; empty accepts everything.
    pub fn new(allowed: &[String]) -> Self {
        Self {
            allowed: allowed.iter().map(|t| essence(t)).collect(),
        }
    }

    /// Content type to store for attachment `name` given the declared request type.
    pub fn resolve(&self, declared: Option<&str>, name: &str) -> Result<String, GatewayError> {
        let content_type = match declared.map(str::trim) {
            Some(declared) if !declared.is_empty() => declared.to_string(),
            _ => from_name(name).to_string(),
        };
        if !self.allowed.is_empty() && !self.allowed.contains(&essence(&content_type)) {
            return Err(GatewayError::UnsupportedAttachmentType(content_type));
        }
        Ok(content_type)
    }
}
