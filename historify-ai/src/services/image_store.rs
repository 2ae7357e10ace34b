//! Image preparation and storage
//!
//! Uploads are sniffed, decoded, flattened onto white, downscaled to at most
//! 1200 px wide and re-encoded as JPEG. The prepared bytes are sent to
//! Firebase Storage when it is configured; otherwise, or when the upload
//! fails, they are written under `<root_folder>/uploads/`.

use async_trait::async_trait;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, Rgb, RgbImage};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const FIREBASE_UPLOAD_BASE_URL: &str = "https://firebasestorage.googleapis.com/upload/storage/v1/b";
const FIREBASE_PUBLIC_BASE_URL: &str = "https://firebasestorage.googleapis.com/v0/b";
const STORAGE_FOLDER: &str = "Analysis";
const LOCAL_URL_PREFIX: &str = "local_storage://";
const MAX_WIDTH: u32 = 1200;
const JPEG_QUALITY: u8 = 85;
const UPLOAD_TIMEOUT_SECS: u64 = 30;

/// Formats accepted by content sniffing
const SUPPORTED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Image preparation and storage errors
#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    #[error("Failed to encode image: {0}")]
    EncodeError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Upload failed {0}: {1}")]
    UploadError(u16, String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Image ready for storage and analysis
#[derive(Debug, Clone)]
pub struct PreparedImage {
    /// JPEG-encoded bytes
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Persist prepared image bytes and return their URL
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn store(&self, image: &PreparedImage, object_name: &str) -> Result<String, ImageStoreError>;
}

/// True when the URL points at the local fallback store
pub fn is_local_url(url: &str) -> bool {
    url.starts_with(LOCAL_URL_PREFIX)
}

/// MIME type of a supported image, `None` for anything else
pub fn sniff_image_type(bytes: &[u8]) -> Option<&'static str> {
    infer::get(bytes)
        .map(|kind| kind.mime_type())
        .filter(|mime| SUPPORTED_MIME_TYPES.contains(mime))
}

/// `Analysis/<YYYYmmdd_HHMMSS>_<index>_<sanitized base>.jpg`
///
/// The base is the file name up to its first `.`, with spaces replaced by
/// `_` and parentheses dropped.
pub fn object_name(image_name: &str, index: usize, stamp: &str) -> String {
    let base = image_name.split('.').next().unwrap_or_default();
    let sanitized: String = base
        .chars()
        .filter(|c| *c != '(' && *c != ')')
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();

    format!("{}/{}_{}_{}.jpg", STORAGE_FOLDER, stamp, index, sanitized)
}

/// Sniff, decode and optimize an uploaded image
pub fn prepare_image(bytes: &[u8]) -> Result<PreparedImage, ImageStoreError> {
    let mime = sniff_image_type(bytes).ok_or_else(|| {
        let detected = infer::get(bytes)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| "unrecognized".to_string());
        ImageStoreError::UnsupportedFormat(detected)
    })?;

    let decoded =
        image::load_from_memory(bytes).map_err(|e| ImageStoreError::DecodeError(e.to_string()))?;

    tracing::debug!(
        mime = %mime,
        width = decoded.width(),
        height = decoded.height(),
        "Decoded uploaded image"
    );

    let rgb = downscale(flatten_onto_white(&decoded));
    let (width, height) = rgb.dimensions();

    let mut jpeg = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
        .encode(rgb.as_raw(), width, height, ColorType::Rgb8)
        .map_err(|e| ImageStoreError::EncodeError(e.to_string()))?;

    Ok(PreparedImage {
        jpeg,
        width,
        height,
    })
}

fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    let mut rgb = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = pixel[3] as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        rgb.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }
    rgb
}

fn downscale(image: RgbImage) -> RgbImage {
    let (width, height) = image.dimensions();
    if width <= MAX_WIDTH {
        return image;
    }

    let ratio = MAX_WIDTH as f64 / width as f64;
    let new_height = ((height as f64 * ratio) as u32).max(1);
    image::imageops::resize(&image, MAX_WIDTH, new_height, FilterType::Lanczos3)
}

/// Firebase Storage credentials
#[derive(Debug, Clone)]
pub struct FirebaseSettings {
    pub api_key: String,
    pub bucket: String,
}

/// Firebase Storage with local filesystem fallback
pub struct FirebaseImageStore {
    http_client: reqwest::Client,
    firebase: Option<FirebaseSettings>,
    local_dir: PathBuf,
}

impl FirebaseImageStore {
    pub fn new(firebase: Option<FirebaseSettings>, local_dir: PathBuf) -> Result<Self, ImageStoreError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(UPLOAD_TIMEOUT_SECS))
            .build()
            .map_err(|e| ImageStoreError::NetworkError(e.to_string()))?;

        if firebase.is_none() {
            tracing::info!(
                local_dir = %local_dir.display(),
                "Firebase Storage not configured, images are stored locally"
            );
        }

        Ok(Self {
            http_client,
            firebase,
            local_dir,
        })
    }

    async fn upload(
        &self,
        firebase: &FirebaseSettings,
        image: &PreparedImage,
        object_name: &str,
    ) -> Result<String, ImageStoreError> {
        let url = format!("{}/{}/o", FIREBASE_UPLOAD_BASE_URL, firebase.bucket);

        tracing::debug!(object = %object_name, bytes = image.jpeg.len(), "Uploading to Firebase Storage");

        let response = self
            .http_client
            .post(&url)
            .query(&[
                ("name", object_name),
                ("uploadType", "media"),
                ("key", firebase.api_key.as_str()),
            ])
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(image.jpeg.clone())
            .send()
            .await
            .map_err(|e| ImageStoreError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ImageStoreError::UploadError(status.as_u16(), error_text));
        }

        Ok(format!(
            "{}/{}/o/{}?alt=media",
            FIREBASE_PUBLIC_BASE_URL,
            firebase.bucket,
            urlencoding::encode(object_name)
        ))
    }

    async fn store_locally(&self, image: &PreparedImage, object_name: &str) -> Result<String, ImageStoreError> {
        let path = self.local_dir.join(object_name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &image.jpeg).await?;

        tracing::info!(path = %path.display(), "Stored image locally");

        Ok(format!("{}{}", LOCAL_URL_PREFIX, path.display()))
    }
}

#[async_trait]
impl ImageStore for FirebaseImageStore {
    async fn store(&self, image: &PreparedImage, object_name: &str) -> Result<String, ImageStoreError> {
        if let Some(firebase) = &self.firebase {
            match self.upload(firebase, image, object_name).await {
                Ok(url) => {
                    tracing::info!(object = %object_name, "Uploaded image to Firebase Storage");
                    return Ok(url);
                }
                Err(e) => {
                    tracing::warn!(
                        object = %object_name,
                        error = %e,
                        "Firebase upload failed, falling back to local storage"
                    );
                }
            }
        }

        self.store_locally(image, object_name).await
    }
}
