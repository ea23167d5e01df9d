//! Capability opening the device photo library. The shell returns the
//! chosen image's bytes along with its uri and mime type; the core stages
//! it until the user confirms the upload.

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_PICKED_IMAGE_BYTES: usize = 20 * 1024 * 1024;

#[derive(Clone)]
pub struct ImagePicker<E> {
    context: CapabilityContext<ImagePickerOperation, E>,
}

impl<Ev> Capability<Ev> for ImagePicker<Ev> {
    type Operation = ImagePickerOperation;
    type MappedSelf<MappedEv> = ImagePicker<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        ImagePicker::new(self.context.map_event(f))
    }
}

impl<E> ImagePicker<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<ImagePickerOperation, E>) -> Self {
        Self { context }
    }

    pub fn open<F>(&self, callback: F)
    where
        F: FnOnce(ImagePickerResult) -> E + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = context
                .request_from_shell(ImagePickerOperation::OpenLibrary)
                .await;
            context.update_app(callback(result));
        });
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImagePickerOperation {
    OpenLibrary,
}

impl Operation for ImagePickerOperation {
    type Output = ImagePickerResult;
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PickedImage {
    pub uri: String,
    pub mime_type: String,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

impl PickedImage {
    pub fn new(
        uri: impl Into<String>,
        mime_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Result<Self, ImagePickerError> {
        if data.is_empty() {
            return Err(ImagePickerError::InvalidImage {
                reason: "image data is empty".to_string(),
            });
        }
        if data.len() > MAX_PICKED_IMAGE_BYTES {
            return Err(ImagePickerError::ImageTooLarge {
                size: data.len(),
                max: MAX_PICKED_IMAGE_BYTES,
            });
        }
        Ok(Self {
            uri: uri.into(),
            mime_type: mime_type.into(),
            data,
        })
    }
}

impl std::fmt::Debug for PickedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PickedImage")
            .field("uri", &self.uri)
            .field("mime_type", &self.mime_type)
            .field("data_len", &self.data.len())
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImagePickerOutput {
    Image(PickedImage),
    Cancelled,
}

impl ImagePickerOutput {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    #[must_use]
    pub fn into_image(self) -> Option<PickedImage> {
        match self {
            Self::Image(image) => Some(image),
            Self::Cancelled => None,
        }
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImagePickerError {
    #[error("photo library permission denied")]
    PermissionDenied,

    #[error("photo library unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("image too large: {size} bytes exceeds maximum of {max} bytes")]
    ImageTooLarge { size: usize, max: usize },

    #[error("invalid image: {reason}")]
    InvalidImage { reason: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

pub type ImagePickerResult = Result<ImagePickerOutput, ImagePickerError>;
