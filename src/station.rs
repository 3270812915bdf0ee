use {
    super::{
        authflow::User,
        checkin::{self, ScanOutcome},
        config::Config,
        date_helpers::format_time,
        query::{self, FilterSpec, SortColumn, SortDirection, SortSpec},
        roster::{self, CheckInStatus, EventState, RosterStore, SearchParticipantBy},
    },
    chrono::Utc,
    rocket::{
        form::{Form, Strict},
        request::FlashMessage,
        response::{Flash, Redirect},
        serde::json::Json,
        State,
    },
    rocket_dyn_templates::{context, Template},
    serde::{Deserialize, Serialize},
};

#[derive(Debug, Serialize)]
struct TemplateCheckIn {
    id: String,
    participant_name: String,
    pretty_time: String,
    can_undo: bool,
}

/// The check-in station: stats, the recent check-in list, and (when `q` is set) the
/// manual-entry candidates. Manual search also matches the registration id and never
/// offers someone already checked in.
#[get("/station?<q>")]
pub fn panel(
    store: &State<RosterStore>,
    config: &State<Config>,
    _user: User,
    flash: Option<FlashMessage<'_>>,
    q: Option<String>,
) -> Template {
    let query_text = q.unwrap_or_default();
    let (stats, recent, candidates) = store.read(|state| {
        let candidates = if query_text.trim().is_empty() {
            Vec::new()
        } else {
            let filter = FilterSpec {
                query: query_text.clone(),
                match_registration_id: true,
                ..FilterSpec::default()
            };
            let sort = SortSpec {
                column: SortColumn::Name,
                direction: SortDirection::Ascending,
            };
            let mut found = query::visible(&state.roster, &filter, &sort);
            found.retain(|record| record.status != CheckInStatus::Attended);
            found
        };
        (
            query::status_counts(&state.roster),
            state
                .recent_check_ins
                .iter()
                .map(|check_in| TemplateCheckIn {
                    id: check_in.id.clone(),
                    participant_name: check_in.participant_name.clone(),
                    pretty_time: format_time(check_in.timestamp),
                    can_undo: check_in.can_undo,
                })
                .collect::<Vec<_>>(),
            candidates,
        )
    });

    Template::render(
        "station",
        context! {
            flash: flash.map(|flash| flash.message().to_string()),
            stats,
            capacity: config.station_capacity,
            recent_check_ins: recent,
            query: query_text,
            candidates,
        },
    )
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    code: String,
}

/// The scanner posts decoded payloads here and renders whatever comes back; both
/// failure shapes (unknown code, already checked in) are plain messages.
#[post("/station/scan", format = "json", data = "<scan>")]
pub fn scan(
    store: &State<RosterStore>,
    _user: User,
    scan: Json<ScanRequest>,
) -> Json<ScanOutcome> {
    let now = Utc::now().naive_utc();
    let outcome = store.write(|state| checkin::scan(state, &scan.code, now));
    if !outcome.success {
        log::info!("Rejected scan of '{}': {}", scan.code, outcome.message);
    }
    Json(outcome)
}

#[derive(Debug, FromForm)]
pub struct ManualCheckInForm {
    participant_id: String,
}

/// Manual entry: picking a candidate checks them in through the same path a scan takes.
#[post("/station/checkin", data = "<form>")]
pub fn manual_check_in(
    store: &State<RosterStore>,
    _user: User,
    form: Form<Strict<ManualCheckInForm>>,
) -> Flash<Redirect> {
    let now = Utc::now().naive_utc();
    let outcome = store.write(|state| {
        let code = search_code(state, &form.participant_id)?;
        Some(checkin::scan(state, &code, now))
    });

    let redirect = Redirect::to(uri!(panel(q = _)));
    match outcome {
        None => Flash::error(redirect, "Participant not found."),
        Some(outcome) if outcome.success => Flash::success(redirect, outcome.message),
        Some(outcome) => Flash::error(redirect, outcome.message),
    }
}

fn search_code(state: &EventState, participant_id: &str) -> Option<String> {
    roster::search_participant(state, &SearchParticipantBy::Id(participant_id.to_string()))
        .map(|record| record.qr_code.clone())
}

#[derive(Debug, FromForm)]
pub struct UndoCheckInForm {
    check_in_id: String,
}

#[post("/station/undo", data = "<form>")]
pub fn undo_check_in(
    store: &State<RosterStore>,
    _user: User,
    form: Form<Strict<UndoCheckInForm>>,
) -> Flash<Redirect> {
    let redirect = Redirect::to(uri!(panel(q = _)));
    match store.write(|state| checkin::undo(state, &form.check_in_id)) {
        Ok(()) => Flash::success(redirect, "Check-in undone."),
        Err(err) => Flash::error(redirect, err.to_string()),
    }
}
