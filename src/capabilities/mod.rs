mod auth;
mod image_picker;

pub use self::auth::{Auth, AuthError, AuthOperation, AuthOutput, AuthResult};
pub use self::image_picker::{
    ImagePicker, ImagePickerError, ImagePickerOperation, ImagePickerOutput, ImagePickerResult,
    PickedImage, MAX_PICKED_IMAGE_BYTES,
};

// Crux's built-in Render capability covers view invalidation; crux_http
// covers the Listings API transport.
pub use crux_core::render::Render;
pub use crux_http::Http;

use crate::app::App;
use crate::event::Event;

pub type AppHttp = Http<Event>;
pub type AppRender = Render<Event>;
pub type AppAuth = Auth<Event>;
pub type AppImagePicker = ImagePicker<Event>;

#[derive(crux_core::macros::Effect)]
#[effect(app = "App")]
pub struct Capabilities {
    pub http: Http<Event>,
    pub render: Render<Event>,
    pub auth: Auth<Event>,
    pub image_picker: ImagePicker<Event>,
}
