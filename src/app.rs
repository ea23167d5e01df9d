use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::capabilities::{AuthOutput, Capabilities, ImagePickerOutput};
use crate::dates;
use crate::event::{Event, HttpResult};
use crate::model::{ListingDraft, ListingImage, Model, PendingImage};
use crate::multipart::MultipartForm;
use crate::patch::FieldValue;
use crate::{AppError, AppResult, ErrorKind, API_BASE_URL, CATEGORY_VOCABULARY};

#[derive(Default)]
pub struct App;

/// Wire shape of a fetched listing. The API wraps the listing in an
/// envelope, and some deployments wrap that envelope in a one-element
/// array.
#[derive(Debug, Default, Deserialize)]
struct ListingEnvelope {
    listing: Option<ListingDraft>,
}

/// Wire shape of a successful image-delete response.
#[derive(Debug, Deserialize)]
struct ImagesEnvelope {
    #[serde(default)]
    images: Vec<ListingImage>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DraftView {
    pub title: String,
    pub description: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub dates: Vec<String>,
    pub range_start: Option<String>,
    pub range_end: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub image_uris: Vec<String>,
    pub categories: Vec<String>,
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewModel {
    pub is_loading: bool,
    pub image_busy: bool,
    pub not_found: bool,
    pub draft: Option<DraftView>,
    pub category_vocabulary: Vec<String>,
    pub pending_categories: Option<Vec<String>>,
    pub pending_image_uri: Option<String>,
    pub error: Option<String>,
    pub toast: Option<String>,
}

impl App {
    fn listing_url(model: &Model) -> Option<String> {
        model
            .listing_id
            .as_ref()
            .map(|id| format!("{API_BASE_URL}/listings/{id}"))
    }

    fn send_fetch(model: &Model, caps: &Capabilities) {
        let (Some(url), Some(token)) = (Self::listing_url(model), &model.id_token) else {
            return;
        };
        let bearer = format!("Bearer {}", token.expose());

        caps.http
            .get(url)
            .header("Authorization", bearer.as_str())
            .send(|result| Event::FetchResponse(Box::new(result)));
    }

    /// Kicks off a fresh fetch of the listing unless one is already
    /// running. Used to resynchronize after image mutations.
    fn start_refetch(model: &mut Model, caps: &Capabilities) {
        if model.fetch_in_flight {
            warn!("listing fetch already in progress, skipping duplicate request");
            return;
        }
        if model.listing_id.is_none() || model.id_token.is_none() {
            return;
        }
        model.fetch_in_flight = true;
        Self::send_fetch(model, caps);
    }

    /// PUTs the entire draft. Both the explicit save and the implicit
    /// save-on-range-close go through here; they differ only in how the
    /// response is handled.
    fn send_listing_put<F>(model: &Model, caps: &Capabilities, make_event: F)
    where
        F: FnOnce(HttpResult) -> Event + Send + 'static,
    {
        let (Some(url), Some(draft)) = (Self::listing_url(model), &model.draft) else {
            return;
        };

        let builder = match caps.http.put(url).body_json(draft) {
            Ok(builder) => builder,
            Err(e) => {
                error!("failed to serialize listing body: {e}");
                return;
            }
        };

        let builder = if let Some(token) = &model.id_token {
            let bearer = format!("Bearer {}", token.expose());
            builder.header("Authorization", bearer.as_str())
        } else {
            builder
        };

        builder.send(make_event);
    }

    fn send_add_image(image: &PendingImage, model: &Model, caps: &Capabilities) {
        let Some(url) = Self::listing_url(model) else {
            return;
        };

        let mut form = MultipartForm::new();
        form.add_file_part("image", image.file_name(), &image.mime_type, &image.data);
        let content_type = form.content_type();

        let builder = caps
            .http
            .post(format!("{url}/images"))
            .body_bytes(form.finish())
            .header("Content-Type", content_type.as_str());

        let builder = if let Some(token) = &model.id_token {
            let bearer = format!("Bearer {}", token.expose());
            builder.header("Authorization", bearer.as_str())
        } else {
            builder
        };

        builder.send(|result| Event::AddPhotoResponse(Box::new(result)));
    }

    fn send_delete_image(uri: &str, model: &Model, caps: &Capabilities) {
        let Some(base) = Self::listing_url(model) else {
            return;
        };

        let mut url = match url::Url::parse(&format!("{base}/images")) {
            Ok(url) => url,
            Err(e) => {
                error!("failed to build image delete url: {e}");
                return;
            }
        };
        url.query_pairs_mut().append_pair("uri", uri);

        let builder = caps.http.delete(url.as_str());
        let builder = if let Some(token) = &model.id_token {
            let bearer = format!("Bearer {}", token.expose());
            builder.header("Authorization", bearer.as_str())
        } else {
            builder
        };

        builder.send(|result| Event::DeletePhotoResponse(Box::new(result)));
    }

    fn send_delete_listing(model: &Model, caps: &Capabilities) {
        let Some(url) = Self::listing_url(model) else {
            return;
        };

        let builder = caps.http.delete(url);
        let builder = if let Some(token) = &model.id_token {
            let bearer = format!("Bearer {}", token.expose());
            builder.header("Authorization", bearer.as_str())
        } else {
            builder
        };

        builder.send(|result| Event::DeleteListingResponse(Box::new(result)));
    }

    fn http_failure(error: &crux_http::Error) -> AppError {
        match error {
            crux_http::Error::Timeout => AppError::new(ErrorKind::Timeout, "Request timed out"),
            other => AppError::new(ErrorKind::Network, "Network request failed")
                .with_internal(other.to_string()),
        }
    }

    /// Unwraps a capability HTTP result into a response body, turning
    /// transport failures and non-2xx statuses into an [`AppError`].
    fn into_body(result: HttpResult) -> AppResult<Vec<u8>> {
        match result {
            Ok(mut response) => {
                let status: u16 = response.status().into();
                let body = response.take_body().unwrap_or_default();
                if (200..300).contains(&status) {
                    Ok(body)
                } else {
                    Err(AppError::from_http_status(status, Some(&body)))
                }
            }
            Err(e) => Err(Self::http_failure(&e)),
        }
    }

    fn parse_listing(body: &[u8]) -> AppResult<Option<ListingDraft>> {
        let envelope = match serde_json::from_slice::<ListingEnvelope>(body) {
            Ok(envelope) => envelope,
            Err(_) => serde_json::from_slice::<Vec<ListingEnvelope>>(body)
                .map_err(|e| {
                    AppError::new(ErrorKind::Deserialization, "Unexpected listing payload")
                        .with_internal(e.to_string())
                })?
                .into_iter()
                .next()
                .unwrap_or_default(),
        };
        Ok(envelope.listing)
    }

    fn is_known_category(name: &str) -> bool {
        CATEGORY_VOCABULARY.contains(&name)
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        match event {
            Event::ScreenOpened { listing_id } => {
                if model.fetch_in_flight {
                    warn!("listing fetch already in progress, skipping duplicate request");
                } else {
                    *model = Model {
                        listing_id: Some(listing_id),
                        fetch_in_flight: true,
                        ..Model::default()
                    };
                    caps.auth
                        .get_valid_id_token(|result| Event::AuthTokenResult(Box::new(result)));
                }
                caps.render.render();
            }

            Event::ScreenDismissed => {
                // Unsaved edits, staged categories and the staged image all
                // die with the screen.
                *model = Model::default();
                caps.render.render();
            }

            Event::AuthTokenResult(result) => {
                match *result {
                    Ok(AuthOutput::Token(token)) => {
                        model.id_token = Some(token);
                        Self::send_fetch(model, caps);
                    }
                    Ok(AuthOutput::Unavailable) => {
                        model.fetch_in_flight = false;
                        model.set_error(AppError::new(
                            ErrorKind::Authentication,
                            "You need to be signed in to edit a sale",
                        ));
                    }
                    Err(e) => {
                        model.fetch_in_flight = false;
                        model.set_error(
                            AppError::new(
                                ErrorKind::Authentication,
                                "Could not verify your session",
                            )
                            .with_internal(e.to_string()),
                        );
                    }
                }
                caps.render.render();
            }

            Event::FetchResponse(result) => {
                model.fetch_in_flight = false;
                match Self::into_body(*result).and_then(|body| Self::parse_listing(&body)) {
                    Ok(Some(listing)) => {
                        model.not_found = false;
                        model.draft = Some(listing);
                    }
                    Ok(None) => {
                        debug!("listing payload was empty, showing not-found state");
                        model.not_found = true;
                        model.draft = None;
                    }
                    Err(e) => model.set_error(e),
                }
                caps.render.render();
            }

            Event::FieldEdited { path, value } => {
                if let Some(draft) = &model.draft {
                    model.draft = Some(draft.with_field(&path, value));
                }
                caps.render.render();
            }

            Event::StartTimePicked { time } => {
                if let Some(draft) = &model.draft {
                    let end = draft.end_time.minutes();
                    if let (Some(start), Some(end)) = (time.minutes(), end) {
                        if end <= start {
                            model.set_error(AppError::new(
                                ErrorKind::Validation,
                                "End time must be after start time",
                            ));
                            caps.render.render();
                            return;
                        }
                    }
                    model.draft =
                        Some(draft.with_field("startTime", FieldValue::Text(time.0)));
                }
                caps.render.render();
            }

            Event::EndTimePicked { time } => {
                if let Some(draft) = &model.draft {
                    let start = draft.start_time.minutes();
                    if let (Some(start), Some(end)) = (start, time.minutes()) {
                        if end <= start {
                            model.set_error(AppError::new(
                                ErrorKind::Validation,
                                "End time must be after start time",
                            ));
                            caps.render.render();
                            return;
                        }
                    }
                    model.draft = Some(draft.with_field("endTime", FieldValue::Text(time.0)));
                }
                caps.render.render();
            }

            Event::DayTapped { date } => {
                let mut persist = false;
                if let Some(draft) = model.draft.as_mut() {
                    let outcome = dates::apply_day_tap(&draft.dates, date);
                    draft.dates = outcome.dates;
                    persist = outcome.persist;
                }
                if persist {
                    // A closed range is saved immediately, without waiting
                    // for an explicit save.
                    Self::send_listing_put(model, caps, |result| {
                        Event::DatesSaveResponse(Box::new(result))
                    });
                }
                caps.render.render();
            }

            Event::DatesSaveResponse(result) => {
                // Success is silent; the calendar already shows the range.
                if let Err(e) = Self::into_body(*result) {
                    model.set_error(e);
                }
                caps.render.render();
            }

            Event::CategoryToggled { name } => {
                if !Self::is_known_category(&name) {
                    warn!(category = %name, "ignoring unknown category");
                } else if let Some(draft) = model.draft.as_mut() {
                    draft.toggle_category(&name);
                }
                caps.render.render();
            }

            Event::CategoryRemoved { name } => {
                if let Some(draft) = model.draft.as_mut() {
                    draft.remove_category(&name);
                }
                caps.render.render();
            }

            Event::CategoryPickerOpened => {
                if let Some(draft) = &model.draft {
                    model.pending_categories = Some(draft.categories.as_ref().clone());
                }
                caps.render.render();
            }

            Event::PendingCategoryToggled { name } => {
                if !Self::is_known_category(&name) {
                    warn!(category = %name, "ignoring unknown category");
                } else if let Some(pending) = model.pending_categories.as_mut() {
                    if !pending.remove(&name) {
                        pending.insert(name);
                    }
                }
                caps.render.render();
            }

            Event::CategoryPickerConfirmed => {
                // Full replacement: confirming an empty staged selection
                // clears every category on the draft.
                if let Some(pending) = model.pending_categories.take() {
                    if let Some(draft) = model.draft.as_mut() {
                        draft.categories = Arc::new(pending);
                    }
                }
                caps.render.render();
            }

            Event::CategoryPickerDismissed => {
                model.pending_categories = None;
                caps.render.render();
            }

            Event::PickImageRequested => {
                caps.image_picker
                    .open(|result| Event::ImagePickerResult(Box::new(result)));
                caps.render.render();
            }

            Event::ImagePickerResult(result) => {
                match *result {
                    Ok(ImagePickerOutput::Image(picked)) => {
                        model.pending_image = Some(PendingImage::from(picked));
                    }
                    Ok(ImagePickerOutput::Cancelled) => {}
                    Err(e) => model.set_error(
                        AppError::new(ErrorKind::ImageSource, "Could not open the photo library")
                            .with_internal(e.to_string()),
                    ),
                }
                caps.render.render();
            }

            Event::ImageSelectionCleared => {
                model.pending_image = None;
                caps.render.render();
            }

            Event::AddPhotoRequested => {
                if model.image_op_in_flight {
                    warn!("image operation already in progress");
                } else if let Some(image) = &model.pending_image {
                    model.image_op_in_flight = true;
                    Self::send_add_image(image, model, caps);
                } else {
                    model.set_error(AppError::new(ErrorKind::Validation, "No image selected"));
                }
                caps.render.render();
            }

            Event::AddPhotoResponse(result) => {
                model.image_op_in_flight = false;
                match Self::into_body(*result) {
                    Ok(_) => {
                        // Upload confirmed: drop the staged image and pull
                        // the authoritative listing rather than trusting
                        // the response body.
                        model.pending_image = None;
                        model.show_toast("Image uploaded successfully");
                        Self::start_refetch(model, caps);
                    }
                    // On failure the staged image stays so the user can
                    // retry without re-picking.
                    Err(e) => model.set_error(e),
                }
                caps.render.render();
            }

            Event::DeletePhotoRequested { uri } => {
                if model.image_op_in_flight {
                    warn!("image operation already in progress");
                } else if let Some(draft) = &model.draft {
                    if draft.images.iter().any(|image| image.uri == uri) {
                        model.image_op_in_flight = true;
                        Self::send_delete_image(&uri, model, caps);
                    } else {
                        model.set_error(AppError::new(
                            ErrorKind::Validation,
                            "This photo is no longer on the sale",
                        ));
                    }
                }
                caps.render.render();
            }

            Event::DeletePhotoResponse(result) => {
                model.image_op_in_flight = false;
                match Self::into_body(*result) {
                    Ok(body) => {
                        match serde_json::from_slice::<ImagesEnvelope>(&body) {
                            Ok(envelope) => {
                                if let Some(draft) = model.draft.as_mut() {
                                    draft.images = Arc::new(envelope.images);
                                }
                            }
                            // The follow-up fetch below reconciles the
                            // image list either way.
                            Err(e) => warn!("could not parse delete response: {e}"),
                        }
                        model.show_toast("Photo deleted");
                    }
                    Err(e) => model.set_error(e),
                }
                // Whatever happened, resynchronize with the server. This is
                // the only consistency mechanism for image state.
                Self::start_refetch(model, caps);
                caps.render.render();
            }

            Event::SaveRequested => {
                Self::send_listing_put(model, caps, |result| {
                    Event::SaveResponse(Box::new(result))
                });
                caps.render.render();
            }

            Event::SaveResponse(result) => {
                match Self::into_body(*result) {
                    Ok(_) => model.show_toast("Sale updated successfully"),
                    Err(e) => model.set_error(e),
                }
                caps.render.render();
            }

            Event::DeleteListingRequested => {
                Self::send_delete_listing(model, caps);
                caps.render.render();
            }

            Event::DeleteListingResponse(result) => {
                match Self::into_body(*result) {
                    Ok(_) => {
                        model.draft = None;
                        model.show_toast("Sale deleted");
                    }
                    Err(e) => model.set_error(e),
                }
                caps.render.render();
            }

            Event::ErrorDismissed => {
                model.active_error = None;
                caps.render.render();
            }

            Event::ToastDismissed => {
                model.active_toast = None;
                caps.render.render();
            }
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        let draft = model.draft.as_ref().map(|draft| {
            let dates: Vec<String> = draft
                .dates
                .iter()
                .map(|d| d.format("%Y-%m-%d").to_string())
                .collect();

            DraftView {
                title: draft.title.clone(),
                description: draft.description.clone(),
                street: draft.address.street.clone(),
                city: draft.address.city.clone(),
                state: draft.address.state.clone(),
                zip: draft.address.zip.clone(),
                range_start: dates.first().cloned(),
                range_end: dates.last().cloned(),
                dates,
                start_time: draft.start_time.0.clone(),
                end_time: draft.end_time.0.clone(),
                image_uris: draft.images.iter().map(|i| i.uri.clone()).collect(),
                categories: draft.categories.iter().cloned().collect(),
                status: draft.status.0.clone(),
            }
        });

        ViewModel {
            is_loading: model.fetch_in_flight,
            image_busy: model.image_op_in_flight,
            not_found: model.not_found,
            draft,
            category_vocabulary: CATEGORY_VOCABULARY
                .iter()
                .map(ToString::to_string)
                .collect(),
            pending_categories: model
                .pending_categories
                .as_ref()
                .map(|set| set.iter().cloned().collect()),
            pending_image_uri: model
                .pending_image
                .as_ref()
                .map(|image| image.local_uri.clone()),
            error: model
                .active_error
                .as_ref()
                .map(AppError::user_facing_message),
            toast: model.active_toast.clone(),
        }
    }
}
