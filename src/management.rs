use {
    super::{
        authflow::Manager,
        date_helpers::{format_date, format_time, time_to_chrono_date},
        export,
        qr::{self, GenerationOptions},
        query::{self, FilterSpec, SortColumn, SortDirection, SortSpec, StatusFilter},
        roster::{self, CheckInStatus, ParticipantRecord, RosterStore},
        selection::SelectionSet,
        server_error,
    },
    chrono::Utc,
    lettre::Address,
    rocket::{
        form::{Form, Strict},
        http::Header,
        request::FlashMessage,
        response::{Flash, Redirect},
        State,
    },
    rocket_dyn_templates::{context, Template},
    serde::Serialize,
};

/// Just a shorthand for an error flash containing a redirect.
#[inline]
fn flash_error(message: &str) -> Flash<Redirect> {
    Flash::error(panel_redirect(), message)
}

fn panel_redirect() -> Redirect {
    Redirect::to(uri!(participants_panel(
        q = _,
        status = _,
        company = _,
        from = _,
        to = _,
        sort = _,
        dir = _
    )))
}

/// A participant row with the display strings the table needs next to the raw record.
#[derive(Debug, Serialize)]
struct TemplateParticipant {
    pretty_registration_date: String,
    pretty_check_in_time: Option<String>,
    participant: ParticipantRecord,
}

impl From<ParticipantRecord> for TemplateParticipant {
    fn from(participant: ParticipantRecord) -> Self {
        Self {
            pretty_registration_date: format_date(participant.registration_date),
            pretty_check_in_time: participant.check_in_time.map(format_time),
            participant,
        }
    }
}

/// One sortable column header: where clicking it leads.
#[derive(Debug, Serialize)]
struct SortLink {
    label: &'static str,
    column: &'static str,
    direction: &'static str,
    active: bool,
}

fn sort_links(current: SortSpec) -> Vec<SortLink> {
    [
        ("Name", SortColumn::Name),
        ("Email", SortColumn::Email),
        ("Company", SortColumn::Company),
        ("Registered", SortColumn::RegistrationDate),
        ("Status", SortColumn::Status),
    ]
    .into_iter()
    .map(|(label, column)| {
        let next = current.toggle(column);
        SortLink {
            label,
            column: column.as_str(),
            direction: next.direction.as_str(),
            active: current.column == column,
        }
    })
    .collect()
}

#[allow(clippy::too_many_arguments)]
#[get("/participants?<q>&<status>&<company>&<from>&<to>&<sort>&<dir>")]
pub fn participants_panel(
    store: &State<RosterStore>,
    _manager: Manager,
    flash: Option<FlashMessage<'_>>,
    q: Option<String>,
    status: Option<String>,
    company: Option<String>,
    from: Option<time::Date>,
    to: Option<time::Date>,
    sort: Option<String>,
    dir: Option<String>,
) -> Template {
    let filter = FilterSpec {
        query: q.unwrap_or_default(),
        status: status
            .as_deref()
            .map_or(StatusFilter::All, StatusFilter::parse),
        company: company.filter(|company| !company.is_empty()),
        registered_from: from.map(time_to_chrono_date),
        registered_to: to.map(time_to_chrono_date),
        match_registration_id: false,
    };
    let default_sort = SortSpec::default();
    let sort = SortSpec {
        column: sort
            .as_deref()
            .and_then(SortColumn::parse)
            .unwrap_or(default_sort.column),
        direction: dir
            .as_deref()
            .and_then(SortDirection::parse)
            .unwrap_or(default_sort.direction),
    };

    let (visible, stats, companies) = store.read(|state| {
        (
            query::visible(&state.roster, &filter, &sort),
            query::status_counts(&state.roster),
            query::companies(&state.roster),
        )
    });

    let shown = visible.len();
    let participants: Vec<TemplateParticipant> =
        visible.into_iter().map(TemplateParticipant::from).collect();

    Template::render(
        "management",
        context! {
            flash: flash.map(|flash| flash.message().to_string()),
            stats,
            shown,
            companies,
            participants,
            query: filter.query,
            status_filter: filter.status.as_str(),
            company_filter: filter.company.unwrap_or_default(),
            from: filter.registered_from.map(|date| date.to_string()).unwrap_or_default(),
            to: filter.registered_to.map(|date| date.to_string()).unwrap_or_default(),
            sort_column: sort.column.as_str(),
            sort_direction: sort.direction.as_str(),
            sort_links: sort_links(sort),
        },
    )
}

#[derive(Debug, FromForm)]
pub struct UpdateParticipantForm {
    id: String,
    name: String,
    email: String,
    company: String,
    phone: String,
    notes: String,
    status: String,
}

impl TryFrom<UpdateParticipantForm> for roster::UpdateParticipant {
    type Error = &'static str;

    fn try_from(source: UpdateParticipantForm) -> Result<roster::UpdateParticipant, Self::Error> {
        let email: Address = source.email.parse().map_err(|_| "Invalid email!")?;
        let status = CheckInStatus::parse(&source.status).ok_or("Invalid status!")?;
        Ok(roster::UpdateParticipant {
            id: source.id,
            name: source.name,
            email,
            company: source.company,
            phone: none_if_empty(source.phone),
            notes: none_if_empty(source.notes),
            status,
        })
    }
}

fn none_if_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[post("/participants/update", data = "<form>")]
pub fn update_participant(
    store: &State<RosterStore>,
    _manager: Manager,
    form: Form<Strict<UpdateParticipantForm>>,
) -> Result<Redirect, Flash<Redirect>> {
    let update: roster::UpdateParticipant = form
        .into_inner()
        .into_inner()
        .try_into()
        .map_err(flash_error)?;

    let now = Utc::now().naive_utc();
    store
        .write(|state| roster::update_participant(state, &update, now))
        .map_err(|err| flash_error(&err.to_string()))?;
    Ok(panel_redirect())
}

#[derive(Debug, FromForm)]
pub struct ChangeStatusForm {
    id: String,
    status: String,
}

#[post("/participants/status", data = "<form>")]
pub fn change_status(
    store: &State<RosterStore>,
    _manager: Manager,
    form: Form<Strict<ChangeStatusForm>>,
) -> Result<Redirect, Flash<Redirect>> {
    let status = CheckInStatus::parse(&form.status).ok_or_else(|| flash_error("Invalid status!"))?;
    let now = Utc::now().naive_utc();
    store
        .write(|state| roster::change_status(state, &form.id, status, now))
        .map_err(|err| flash_error(&err.to_string()))?;
    Ok(panel_redirect())
}

#[derive(Debug, FromForm)]
pub struct DeleteParticipantForm {
    id: String,
}

#[post("/participants/delete", data = "<form>")]
pub fn delete_participant(
    store: &State<RosterStore>,
    _manager: Manager,
    form: Form<Strict<DeleteParticipantForm>>,
) -> Result<Redirect, Flash<Redirect>> {
    store
        .write(|state| roster::delete_participant(state, &form.id))
        .map_err(|err| flash_error(&err.to_string()))?;
    Ok(panel_redirect())
}

/// A CSV file the browser downloads instead of rendering.
#[derive(Responder)]
#[response(content_type = "text/csv")]
pub struct CsvDownload {
    content: String,
    disposition: Header<'static>,
}

#[derive(Responder)]
pub enum BulkResponse {
    Csv(CsvDownload),
    Flash(Flash<Redirect>),
}

#[derive(Debug, FromForm)]
pub struct BulkActionForm {
    action: String,
    ids: Vec<String>,
}

/// The bulk actions bar: every action reads the posted selection, applies its transform
/// to the whole subset at once and (except for export) clears the selection by
/// redirecting to a fresh panel.
///
/// Parsed leniently: zero checked boxes means an empty id list, not a form error.
#[post("/participants/bulk", data = "<form>")]
pub fn bulk_action(
    store: &State<RosterStore>,
    _manager: Manager,
    form: Form<BulkActionForm>,
) -> Result<BulkResponse, Flash<Redirect>> {
    let form = form.into_inner();
    // checkbox ids are unique, so replaying them as toggles yields the checked set
    let mut selection = SelectionSet::new();
    for id in &form.ids {
        selection.toggle(id);
    }
    if selection.is_empty() {
        return Err(flash_error("No participants selected."));
    }

    let now = Utc::now().naive_utc();
    match form.action.as_str() {
        "mark-attended" => {
            let changed = store.write(|state| roster::mark_attended(state, &selection, now));
            Ok(BulkResponse::Flash(Flash::success(
                panel_redirect(),
                format!("Marked {changed} participants as attended."),
            )))
        }
        "delete" => {
            let removed = store.write(|state| roster::delete_many(state, &selection));
            Ok(BulkResponse::Flash(Flash::success(
                panel_redirect(),
                format!("Deleted {removed} participants."),
            )))
        }
        "export" => {
            let records: Vec<ParticipantRecord> = store.read(|state| {
                selection
                    .resolve(&state.roster)
                    .into_iter()
                    .cloned()
                    .collect()
            });
            let filename = export::export_filename(now.date());
            Ok(BulkResponse::Csv(CsvDownload {
                content: export::participants_csv(&records),
                disposition: Header::new(
                    "Content-Disposition",
                    format!("attachment; filename=\"{filename}\""),
                ),
            }))
        }
        "generate-qr" => {
            let generated = store
                .write(|state| {
                    qr::generate_batch(state, &selection, &GenerationOptions::default(), now)
                })
                .map_err(|err| flash_error(&err.to_string()))?;
            Ok(BulkResponse::Flash(Flash::success(
                panel_redirect(),
                format!(
                    "QR codes generated for {} participants.",
                    generated.codes.len()
                ),
            )))
        }
        unknown => Err(server_error(
            format!("Unknown bulk action '{unknown}' (form/UI out of sync?)"),
            "an error occurred while running the bulk action",
        )),
    }
}
