use chrono::NaiveDate;
use crux_core::testing::AppTester;
use crux_http::testing::ResponseBuilder;
use std::collections::BTreeSet;
use std::sync::Arc;
use yardhopper_core::capabilities::AuthOutput;
use yardhopper_core::model::{
    Address, IdToken, ListingDraft, ListingId, ListingImage, ListingStatus, PendingImage, SaleTime,
};
use yardhopper_core::patch::FieldMap;
use yardhopper_core::{App, Effect, ErrorKind, Event, Model};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn sample_draft() -> ListingDraft {
    ListingDraft {
        title: "Garage Sale".into(),
        description: "Everything must go".into(),
        address: Arc::new(Address {
            street: "12 Elm St".into(),
            city: "Springfield".into(),
            state: "IL".into(),
            zip: "62704".into(),
        }),
        dates: vec![],
        start_time: SaleTime::new("09:00"),
        end_time: SaleTime::new("15:00"),
        images: Arc::new(vec![ListingImage {
            uri: "https://cdn.example.com/a.jpg".into(),
        }]),
        categories: Arc::new(BTreeSet::from(["Furniture".to_string()])),
        status: ListingStatus("active".into()),
        extra: FieldMap::new(),
    }
}

fn ready_model() -> Model {
    Model {
        listing_id: Some(ListingId::new("sale-1")),
        id_token: Some(IdToken::new("token")),
        draft: Some(sample_draft()),
        ..Model::default()
    }
}

fn http_count(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|e| matches!(e, Effect::Http(_)))
        .count()
}

#[test]
fn open_runs_token_then_fetch_chain() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    // Opening the screen asks the shell for a token first.
    let update = app.update(
        Event::ScreenOpened {
            listing_id: ListingId::new("sale-1"),
        },
        &mut model,
    );
    assert!(model.fetch_in_flight);
    assert!(update.effects.iter().any(|e| matches!(e, Effect::Auth(_))));
    assert!(update.effects.iter().any(|e| matches!(e, Effect::Render(_))));

    // A second open while the fetch runs is ignored.
    let update = app.update(
        Event::ScreenOpened {
            listing_id: ListingId::new("sale-1"),
        },
        &mut model,
    );
    assert!(!update.effects.iter().any(|e| matches!(e, Effect::Auth(_))));
    assert_eq!(http_count(&update.effects), 0);

    // Token arrives, fetch goes out.
    let update = app.update(
        Event::AuthTokenResult(Box::new(Ok(AuthOutput::Token(IdToken::new("token"))))),
        &mut model,
    );
    assert_eq!(http_count(&update.effects), 1);

    // Listing arrives wrapped in the envelope.
    let body = serde_json::json!({
        "listing": {
            "title": "Garage Sale",
            "dates": ["2024-06-10"],
            "startTime": "09:00",
            "endTime": "15:00",
            "status": "active"
        }
    });
    let response = ResponseBuilder::ok()
        .body(serde_json::to_vec(&body).unwrap())
        .build();
    app.update(Event::FetchResponse(Box::new(Ok(response))), &mut model);

    assert!(!model.fetch_in_flight);
    assert!(!model.not_found);
    let draft = model.draft.as_ref().unwrap();
    assert_eq!(draft.title, "Garage Sale");
    assert_eq!(draft.dates, vec![d(2024, 6, 10)]);

    let view = app.view(&model);
    assert_eq!(view.draft.unwrap().title, "Garage Sale");
}

#[test]
fn token_unavailable_aborts_fetch() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    app.update(
        Event::ScreenOpened {
            listing_id: ListingId::new("sale-1"),
        },
        &mut model,
    );
    let update = app.update(
        Event::AuthTokenResult(Box::new(Ok(AuthOutput::Unavailable))),
        &mut model,
    );

    assert!(!model.fetch_in_flight);
    assert_eq!(http_count(&update.effects), 0);
    assert_eq!(
        model.active_error.as_ref().unwrap().kind,
        ErrorKind::Authentication
    );
}

#[test]
fn missing_listing_payload_shows_not_found() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model {
        listing_id: Some(ListingId::new("sale-1")),
        id_token: Some(IdToken::new("token")),
        fetch_in_flight: true,
        ..Model::default()
    };

    let response = ResponseBuilder::ok().body(b"{}".to_vec()).build();
    app.update(Event::FetchResponse(Box::new(Ok(response))), &mut model);

    assert!(model.not_found);
    assert!(model.draft.is_none());
    assert!(model.active_error.is_none());
    assert!(app.view(&model).not_found);
}

#[test]
fn day_taps_build_then_collapse_range() {
    let app = AppTester::<App, Effect>::default();
    let mut model = ready_model();
    model.draft.as_mut().unwrap().dates = vec![];

    // Anchor tap: local only.
    let update = app.update(Event::DayTapped { date: d(2024, 6, 10) }, &mut model);
    assert_eq!(http_count(&update.effects), 0);
    assert_eq!(model.draft.as_ref().unwrap().dates, vec![d(2024, 6, 10)]);

    // Closing tap: range materializes and saves immediately.
    let update = app.update(Event::DayTapped { date: d(2024, 6, 13) }, &mut model);
    assert_eq!(http_count(&update.effects), 1);
    assert_eq!(
        model.draft.as_ref().unwrap().dates,
        vec![d(2024, 6, 10), d(2024, 6, 11), d(2024, 6, 12), d(2024, 6, 13)]
    );

    // Tapping inside the range collapses to that day, without a save.
    let update = app.update(Event::DayTapped { date: d(2024, 6, 11) }, &mut model);
    assert_eq!(http_count(&update.effects), 0);
    assert_eq!(model.draft.as_ref().unwrap().dates, vec![d(2024, 6, 11)]);
}

#[test]
fn dates_save_failure_surfaces_error() {
    let app = AppTester::<App, Effect>::default();
    let mut model = ready_model();

    let response = ResponseBuilder::with_status(crux_http::http::StatusCode::InternalServerError)
        .body(b"".to_vec())
        .build();
    app.update(Event::DatesSaveResponse(Box::new(Ok(response))), &mut model);

    assert_eq!(
        model.active_error.as_ref().unwrap().kind,
        ErrorKind::Internal
    );
}

#[test]
fn end_time_must_follow_start_time() {
    let app = AppTester::<App, Effect>::default();
    let mut model = ready_model();

    app.update(
        Event::EndTimePicked {
            time: SaleTime::new("08:00"),
        },
        &mut model,
    );

    let error = model.active_error.as_ref().unwrap();
    assert_eq!(error.kind, ErrorKind::Validation);
    assert_eq!(error.message, "End time must be after start time");
    // The draft keeps its original end time.
    assert_eq!(model.draft.as_ref().unwrap().end_time, SaleTime::new("15:00"));
}

#[test]
fn category_picker_confirm_replaces_wholesale() {
    let app = AppTester::<App, Effect>::default();
    let mut model = ready_model();

    app.update(Event::CategoryPickerOpened, &mut model);
    assert_eq!(
        model.pending_categories.as_ref().unwrap(),
        &BTreeSet::from(["Furniture".to_string()])
    );

    // Stage a different selection; the draft is untouched until confirm.
    app.update(
        Event::PendingCategoryToggled {
            name: "Furniture".into(),
        },
        &mut model,
    );
    app.update(
        Event::PendingCategoryToggled {
            name: "Kids".into(),
        },
        &mut model,
    );
    assert!(model.draft.as_ref().unwrap().categories.contains("Furniture"));

    app.update(Event::CategoryPickerConfirmed, &mut model);
    let categories = &model.draft.as_ref().unwrap().categories;
    assert!(!categories.contains("Furniture"));
    assert!(categories.contains("Kids"));
    assert!(model.pending_categories.is_none());
}

#[test]
fn category_picker_dismiss_discards_staged_selection() {
    let app = AppTester::<App, Effect>::default();
    let mut model = ready_model();

    app.update(Event::CategoryPickerOpened, &mut model);
    app.update(
        Event::PendingCategoryToggled {
            name: "Kids".into(),
        },
        &mut model,
    );
    app.update(Event::CategoryPickerDismissed, &mut model);

    assert!(model.pending_categories.is_none());
    assert!(!model.draft.as_ref().unwrap().categories.contains("Kids"));
}

#[test]
fn unknown_category_is_ignored() {
    let app = AppTester::<App, Effect>::default();
    let mut model = ready_model();

    app.update(
        Event::CategoryToggled {
            name: "Timeshares".into(),
        },
        &mut model,
    );
    assert!(!model.draft.as_ref().unwrap().categories.contains("Timeshares"));
}

#[test]
fn add_photo_without_selection_is_rejected_locally() {
    let app = AppTester::<App, Effect>::default();
    let mut model = ready_model();

    let update = app.update(Event::AddPhotoRequested, &mut model);

    assert_eq!(http_count(&update.effects), 0);
    let error = model.active_error.as_ref().unwrap();
    assert_eq!(error.kind, ErrorKind::Validation);
    assert_eq!(error.message, "No image selected");
}

#[test]
fn add_photo_success_consumes_selection_and_refetches() {
    let app = AppTester::<App, Effect>::default();
    let mut model = ready_model();
    model.pending_image = Some(PendingImage {
        local_uri: "file:///tmp/IMG_1.jpg".into(),
        mime_type: "image/jpeg".into(),
        data: vec![0xFF, 0xD8],
    });

    let update = app.update(Event::AddPhotoRequested, &mut model);
    assert!(model.image_op_in_flight);
    assert_eq!(http_count(&update.effects), 1);

    let response = ResponseBuilder::ok().body(b"{}".to_vec()).build();
    let update = app.update(Event::AddPhotoResponse(Box::new(Ok(response))), &mut model);

    assert!(!model.image_op_in_flight);
    assert!(model.pending_image.is_none());
    assert!(model.fetch_in_flight);
    assert_eq!(http_count(&update.effects), 1);
}

#[test]
fn add_photo_failure_retains_selection_and_skips_refetch() {
    let app = AppTester::<App, Effect>::default();
    let mut model = ready_model();
    model.pending_image = Some(PendingImage {
        local_uri: "file:///tmp/IMG_1.jpg".into(),
        mime_type: "image/jpeg".into(),
        data: vec![0xFF, 0xD8],
    });
    model.image_op_in_flight = true;

    let response = ResponseBuilder::with_status(crux_http::http::StatusCode::BadRequest)
        .body(br#"{"message":"unsupported format"}"#.to_vec())
        .build();
    let update = app.update(Event::AddPhotoResponse(Box::new(Ok(response))), &mut model);

    assert!(!model.image_op_in_flight);
    assert!(model.pending_image.is_some());
    assert!(!model.fetch_in_flight);
    assert_eq!(http_count(&update.effects), 0);
    assert_eq!(
        model.active_error.as_ref().unwrap().message,
        "unsupported format"
    );
}

#[test]
fn delete_photo_requires_known_uri() {
    let app = AppTester::<App, Effect>::default();
    let mut model = ready_model();

    let update = app.update(
        Event::DeletePhotoRequested {
            uri: "https://cdn.example.com/other.jpg".into(),
        },
        &mut model,
    );

    assert_eq!(http_count(&update.effects), 0);
    assert_eq!(
        model.active_error.as_ref().unwrap().kind,
        ErrorKind::Validation
    );
}

#[test]
fn delete_photo_success_applies_server_list_and_refetches() {
    let app = AppTester::<App, Effect>::default();
    let mut model = ready_model();

    let update = app.update(
        Event::DeletePhotoRequested {
            uri: "https://cdn.example.com/a.jpg".into(),
        },
        &mut model,
    );
    assert!(model.image_op_in_flight);
    assert_eq!(http_count(&update.effects), 1);

    let response = ResponseBuilder::ok()
        .body(br#"{"images": []}"#.to_vec())
        .build();
    let update = app.update(
        Event::DeletePhotoResponse(Box::new(Ok(response))),
        &mut model,
    );

    assert!(model.draft.as_ref().unwrap().images.is_empty());
    assert!(model.fetch_in_flight);
    assert_eq!(http_count(&update.effects), 1);
}

#[test]
fn delete_photo_failure_still_issues_exactly_one_refetch() {
    let app = AppTester::<App, Effect>::default();
    let mut model = ready_model();
    model.image_op_in_flight = true;

    let response = ResponseBuilder::with_status(crux_http::http::StatusCode::InternalServerError)
        .body(br#"{"message":"storage backend down"}"#.to_vec())
        .build();
    let update = app.update(
        Event::DeletePhotoResponse(Box::new(Ok(response))),
        &mut model,
    );

    assert_eq!(
        model.active_error.as_ref().unwrap().message,
        "storage backend down"
    );
    // The reconciling fetch goes out even though the delete failed.
    assert_eq!(http_count(&update.effects), 1);
    assert!(model.fetch_in_flight);
    // The local image list is untouched until the fetch lands.
    assert_eq!(model.draft.as_ref().unwrap().images.len(), 1);
}

#[test]
fn save_success_shows_toast() {
    let app = AppTester::<App, Effect>::default();
    let mut model = ready_model();

    let update = app.update(Event::SaveRequested, &mut model);
    assert_eq!(http_count(&update.effects), 1);

    let response = ResponseBuilder::ok().body(b"{}".to_vec()).build();
    app.update(Event::SaveResponse(Box::new(Ok(response))), &mut model);

    assert_eq!(
        model.active_toast.as_deref(),
        Some("Sale updated successfully")
    );
}

#[test]
fn delete_listing_success_clears_draft() {
    let app = AppTester::<App, Effect>::default();
    let mut model = ready_model();

    let update = app.update(Event::DeleteListingRequested, &mut model);
    assert_eq!(http_count(&update.effects), 1);

    let response = ResponseBuilder::ok().body(b"{}".to_vec()).build();
    app.update(
        Event::DeleteListingResponse(Box::new(Ok(response))),
        &mut model,
    );

    assert!(model.draft.is_none());
    assert_eq!(model.active_toast.as_deref(), Some("Sale deleted"));
}

#[test]
fn dismiss_discards_all_staged_state() {
    let app = AppTester::<App, Effect>::default();
    let mut model = ready_model();
    model.pending_categories = Some(BTreeSet::from(["Kids".to_string()]));
    model.pending_image = Some(PendingImage {
        local_uri: "file:///tmp/IMG_1.jpg".into(),
        mime_type: "image/jpeg".into(),
        data: vec![1],
    });

    app.update(Event::ScreenDismissed, &mut model);

    assert!(model.draft.is_none());
    assert!(model.pending_categories.is_none());
    assert!(model.pending_image.is_none());
    assert!(model.listing_id.is_none());
}

#[test]
fn field_edit_flows_into_view() {
    let app = AppTester::<App, Effect>::default();
    let mut model = ready_model();

    app.update(
        Event::FieldEdited {
            path: "address.city".into(),
            value: yardhopper_core::patch::FieldValue::text("Shelbyville"),
        },
        &mut model,
    );

    let view = app.view(&model);
    assert_eq!(view.draft.unwrap().city, "Shelbyville");
}
