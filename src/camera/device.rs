use std::{
    io::{self, Cursor},
    path::PathBuf,
};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, RgbImage};

use crate::error::{CaptureError, DeviceError};

/// One frame as the device hands it over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFrame {
    Rgb {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
    /// Already-encoded image bytes (JPEG, PNG, ...).
    Encoded(Vec<u8>),
}

/// A still frame ready for transport: a base64 data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    data_url: String,
    encoded_len: usize,
}

impl CapturedFrame {
    pub fn encode(raw: RawFrame) -> Result<Self, CaptureError> {
        let (mime, bytes) = match raw {
            RawFrame::Rgb {
                width,
                height,
                pixels,
            } => {
                if pixels.is_empty() {
                    return Err(CaptureError::Failed("device returned no data".into()));
                }
                let image = RgbImage::from_raw(width, height, pixels).ok_or_else(|| {
                    CaptureError::Failed("frame size does not match its dimensions".into())
                })?;
                ("image/jpeg", to_jpeg(DynamicImage::ImageRgb8(image))?)
            }
            RawFrame::Encoded(bytes) => {
                if bytes.is_empty() {
                    return Err(CaptureError::Failed("device returned no data".into()));
                }
                match image::guess_format(&bytes) {
                    Ok(ImageFormat::Jpeg) => ("image/jpeg", bytes),
                    Ok(ImageFormat::Png) => ("image/png", bytes),
                    _ => {
                        let decoded = image::load_from_memory(&bytes)
                            .map_err(|err| CaptureError::Failed(err.to_string()))?;
                        ("image/jpeg", to_jpeg(decoded)?)
                    }
                }
            }
        };

        Ok(Self {
            data_url: format!("data:{mime};base64,{}", STANDARD.encode(&bytes)),
            encoded_len: bytes.len(),
        })
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    pub fn encoded_len(&self) -> usize {
        self.encoded_len
    }

    pub fn into_data_url(self) -> String {
        self.data_url
    }
}

fn to_jpeg(image: DynamicImage) -> Result<Vec<u8>, CaptureError> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_to(&mut buffer, ImageFormat::Jpeg)
        .map_err(|err| CaptureError::Failed(format!("jpeg encoding failed: {err}")))?;
    Ok(buffer.into_inner())
}

/// A live claim on a capture device. Dropping it must free the device.
pub trait DeviceBinding: Send {
    /// `Ok(None)` when the device is up but produced nothing.
    fn grab(&mut self) -> Result<Option<RawFrame>, DeviceError>;

    fn release(&mut self) {}
}

/// Acquires capture devices. `open` resolves when the device is ready, which
/// may take arbitrarily long (permission prompts, contention).
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    async fn open(&self) -> Result<Box<dyn DeviceBinding>, DeviceError>;
}

/// Serves a still image from disk as if it were a camera.
pub struct StillImageBackend {
    path: PathBuf,
}

impl StillImageBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

struct StillImageBinding {
    frame: Option<RgbImage>,
}

impl DeviceBinding for StillImageBinding {
    fn grab(&mut self) -> Result<Option<RawFrame>, DeviceError> {
        Ok(self.frame.as_ref().map(|image| RawFrame::Rgb {
            width: image.width(),
            height: image.height(),
            pixels: image.as_raw().clone(),
        }))
    }

    fn release(&mut self) {
        self.frame = None;
    }
}

#[async_trait]
impl CaptureBackend for StillImageBackend {
    async fn open(&self) -> Result<Box<dyn DeviceBinding>, DeviceError> {
        let path = self.path.clone();
        let image = tokio::task::spawn_blocking(move || -> Result<RgbImage, DeviceError> {
            let bytes = std::fs::read(&path).map_err(device_error_from_io)?;
            let decoded = image::load_from_memory(&bytes)
                .map_err(|err| DeviceError::Other(format!("unreadable image: {err}")))?;
            Ok(decoded.to_rgb8())
        })
        .await
        .map_err(|err| DeviceError::Other(format!("capture worker join failed: {err}")))??;

        Ok(Box::new(StillImageBinding { frame: Some(image) }))
    }
}

fn device_error_from_io(err: io::Error) -> DeviceError {
    match err.kind() {
        io::ErrorKind::NotFound => DeviceError::Unavailable,
        io::ErrorKind::PermissionDenied => DeviceError::PermissionDenied,
        io::ErrorKind::WouldBlock => DeviceError::Busy,
        _ => DeviceError::Other(err.to_string()),
    }
}
