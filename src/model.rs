use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroize;

use crate::capabilities::PickedImage;
use crate::patch::{self, FieldMap, FieldValue};
use crate::{AppError, DEFAULT_IMAGE_FILENAME};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingId(pub String);

impl ListingId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bearer token for the Listings API. Redacted in Debug output and wiped
/// on drop.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdToken(String);

impl IdToken {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for IdToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Drop for IdToken {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingImage {
    pub uri: String,
}

/// Listing lifecycle status. The server owns the meaning; the client passes
/// the string through untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingStatus(pub String);

/// A wall-clock time of day in `"HH:MM"` form. Stored as the server sent
/// it; only parsed when two times need comparing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaleTime(pub String);

impl SaleTime {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Minutes since midnight, if the string parses as `HH:MM`.
    #[must_use]
    pub fn minutes(&self) -> Option<u32> {
        let (h, m) = self.0.split_once(':')?;
        let h: u32 = h.parse().ok()?;
        let m: u32 = m.parse().ok()?;
        if h > 23 || m > 59 {
            return None;
        }
        Some(h * 60 + m)
    }
}

/// The editable copy of a listing. Containers that edits leave untouched
/// are shared between successive drafts rather than copied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListingDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub address: Arc<Address>,
    #[serde(default)]
    pub dates: Vec<NaiveDate>,
    #[serde(default, rename = "startTime")]
    pub start_time: SaleTime,
    #[serde(default, rename = "endTime")]
    pub end_time: SaleTime,
    #[serde(default)]
    pub images: Arc<Vec<ListingImage>>,
    #[serde(default)]
    pub categories: Arc<BTreeSet<String>>,
    #[serde(default)]
    pub status: ListingStatus,

    /// Server fields the draft does not model. Flattened so they round-trip
    /// through a full-listing save unchanged.
    #[serde(default, flatten)]
    pub extra: FieldMap,
}

impl ListingDraft {
    /// Returns a draft with `value` applied at the dot-separated `path`.
    /// Known fields update their typed slot; anything else lands in
    /// `extra`. The receiver is not modified.
    #[must_use]
    pub fn with_field(&self, path: &str, value: FieldValue) -> Self {
        let mut next = self.clone();
        let segments = patch::split_path(path);

        let applied = match (segments.as_slice(), &value) {
            (["title"], FieldValue::Text(s)) => {
                next.title = s.clone();
                true
            }
            (["description"], FieldValue::Text(s)) => {
                next.description = s.clone();
                true
            }
            (["startTime"], FieldValue::Text(s)) => {
                next.start_time = SaleTime::new(s.clone());
                true
            }
            (["endTime"], FieldValue::Text(s)) => {
                next.end_time = SaleTime::new(s.clone());
                true
            }
            (["status"], FieldValue::Text(s)) => {
                next.status = ListingStatus(s.clone());
                true
            }
            (["address", sub], FieldValue::Text(s))
                if matches!(*sub, "street" | "city" | "state" | "zip") =>
            {
                let address = Arc::make_mut(&mut next.address);
                match *sub {
                    "street" => address.street = s.clone(),
                    "city" => address.city = s.clone(),
                    "state" => address.state = s.clone(),
                    _ => address.zip = s.clone(),
                }
                true
            }
            _ => false,
        };

        if !applied {
            next.extra = self.extra.with_path(&segments, value);
        }
        next
    }

    /// Adds the category if absent, removes it if present.
    pub fn toggle_category(&mut self, name: &str) {
        let categories = Arc::make_mut(&mut self.categories);
        if !categories.remove(name) {
            categories.insert(name.to_string());
        }
    }

    pub fn remove_category(&mut self, name: &str) {
        if self.categories.contains(name) {
            Arc::make_mut(&mut self.categories).remove(name);
        }
    }
}

/// An image chosen on the device, held until the user confirms the upload.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingImage {
    pub local_uri: String,
    pub mime_type: String,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

impl PendingImage {
    /// Filename for the upload form, taken from the last path segment of
    /// the device uri.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.local_uri
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_IMAGE_FILENAME)
    }
}

impl From<PickedImage> for PendingImage {
    fn from(picked: PickedImage) -> Self {
        Self {
            local_uri: picked.uri,
            mime_type: picked.mime_type,
            data: picked.data,
        }
    }
}

// Redact the image bytes; they can be large and are not useful in logs.
impl fmt::Debug for PendingImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingImage")
            .field("local_uri", &self.local_uri)
            .field("mime_type", &self.mime_type)
            .field("data_len", &self.data.len())
            .finish()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Model {
    pub listing_id: Option<ListingId>,
    pub id_token: Option<IdToken>,

    pub draft: Option<ListingDraft>,
    pub not_found: bool,

    pub fetch_in_flight: bool,
    pub image_op_in_flight: bool,

    /// Category selection staged in the picker sheet, applied wholesale on
    /// confirm.
    pub pending_categories: Option<BTreeSet<String>>,
    pub pending_image: Option<PendingImage>,

    pub active_error: Option<AppError>,
    pub active_toast: Option<String>,
}

impl Model {
    pub fn set_error(&mut self, error: AppError) {
        tracing::error!(code = error.code(), "{error}");
        self.active_error = Some(error);
    }

    pub fn show_toast(&mut self, message: impl Into<String>) {
        self.active_toast = Some(message.into());
    }
}
