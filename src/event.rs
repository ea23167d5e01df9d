use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::capabilities::{AuthResult, ImagePickerResult};
use crate::model::{ListingId, SaleTime};
use crate::patch::FieldValue;

/// Raw result of a Listings API call, handed back by the HTTP capability.
pub type HttpResult = crux_http::Result<crux_http::Response<Vec<u8>>>;

#[derive(Serialize, Deserialize)]
pub enum Event {
    // Screen lifecycle
    ScreenOpened { listing_id: ListingId },
    ScreenDismissed,

    // Token -> fetch chain
    AuthTokenResult(Box<AuthResult>),
    #[serde(skip)]
    FetchResponse(Box<HttpResult>),

    // Draft edits
    FieldEdited { path: String, value: FieldValue },
    StartTimePicked { time: SaleTime },
    EndTimePicked { time: SaleTime },

    // Calendar
    DayTapped { date: NaiveDate },
    #[serde(skip)]
    DatesSaveResponse(Box<HttpResult>),

    // Categories: direct edits on the draft
    CategoryToggled { name: String },
    CategoryRemoved { name: String },

    // Categories: staged picker sheet
    CategoryPickerOpened,
    PendingCategoryToggled { name: String },
    CategoryPickerConfirmed,
    CategoryPickerDismissed,

    // Images
    PickImageRequested,
    ImagePickerResult(Box<ImagePickerResult>),
    ImageSelectionCleared,
    AddPhotoRequested,
    #[serde(skip)]
    AddPhotoResponse(Box<HttpResult>),
    DeletePhotoRequested { uri: String },
    #[serde(skip)]
    DeletePhotoResponse(Box<HttpResult>),

    // Whole-listing save / delete
    SaveRequested,
    #[serde(skip)]
    SaveResponse(Box<HttpResult>),
    DeleteListingRequested,
    #[serde(skip)]
    DeleteListingResponse(Box<HttpResult>),

    // Transient UI state
    ErrorDismissed,
    ToastDismissed,
}
