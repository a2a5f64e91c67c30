//! Image payloads and multipart form building.

use reqwest::multipart::{Form, Part};

/// Image bytes with the file name and content type they are uploaded under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

impl ImageUpload {
    pub fn new(
        bytes: Vec<u8>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Builds an upload whose type is sniffed from the bytes.
    ///
    /// Recognized images are named `image.<ext>`; anything else is sent as JPEG.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match infer::get(&bytes).filter(|kind| kind.matcher_type() == infer::MatcherType::Image) {
            Some(kind) => {
                let file_name = format!("image.{}", kind.extension());
                let mime_type = kind.mime_type().to_string();
                Self::new(bytes, file_name, mime_type)
            }
            None => Self::new(bytes, "image.jpg", "image/jpeg"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

/// Builds a multipart body with the image under `file_field` followed by text fields.
///
/// reqwest generates a fresh random boundary for every form.
pub fn build_form(
    file_field: &str,
    image: &ImageUpload,
    fields: &[(&str, &str)],
) -> Result<Form, reqwest::Error> {
    let part = Part::bytes(image.bytes.clone())
        .file_name(image.file_name.clone())
        .mime_str(&image.mime_type)?;
    let mut form = Form::new().part(file_field.to_string(), part);
    for (name, value) in fields {
        form = form.text(name.to_string(), value.to_string());
    }
    Ok(form)
}
