use serde::Deserialize;

/// Profile-image upload: raw bytes plus their content type.
#[derive(Debug, Deserialize)]
pub struct UploadPhotoRequest {
    pub image: serde_bytes::ByteBuf,
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

fn default_content_type() -> String {
    "image/jpeg".into()
}
