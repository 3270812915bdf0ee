use {
    super::{
        authflow::Manager,
        date_helpers::format_date,
        qr::{self, BatchRecord, GenerationOptions, GenerationProgress, OutputFormat},
        query::{self, FilterSpec, SortColumn, SortDirection, SortSpec},
        roster::{ParticipantRecord, RosterStore},
        selection::SelectionSet,
    },
    chrono::Utc,
    rocket::{
        form::{Form, Lenient},
        request::FlashMessage,
        response::{Flash, Redirect},
        State,
    },
    rocket_dyn_templates::{context, Template},
    serde::Serialize,
};

#[derive(Debug, Serialize)]
struct TemplateBatch {
    pretty_date: String,
    batch: BatchRecord,
}

fn picker_sort() -> SortSpec {
    SortSpec {
        column: SortColumn::Name,
        direction: SortDirection::Ascending,
    }
}

fn render_panel(
    store: &RosterStore,
    flash: Option<String>,
    query_text: String,
    generated: Option<qr::BatchOutcome>,
) -> Template {
    let filter = FilterSpec {
        query: query_text.clone(),
        ..FilterSpec::default()
    };
    let (participants, batches): (Vec<ParticipantRecord>, Vec<TemplateBatch>) =
        store.read(|state| {
            (
                query::visible(&state.roster, &filter, &picker_sort()),
                state
                    .batches
                    .iter()
                    .map(|batch| TemplateBatch {
                        pretty_date: format_date(batch.created_at.date()),
                        batch: batch.clone(),
                    })
                    .collect(),
            )
        });

    Template::render(
        "generator",
        context! {
            flash,
            query: query_text,
            participants,
            templates: qr::builtin_templates(),
            batches,
            progress: generated
                .as_ref()
                .map_or_else(GenerationProgress::idle, |outcome| outcome.progress),
            generated,
            default_size: GenerationOptions::default().size,
            default_batch_size: GenerationOptions::default().batch_size,
        },
    )
}

/// The generator page: participant picker, template catalog, options form, batch
/// history. `q` narrows the picker the same way the management search does.
#[get("/generator?<q>")]
pub fn panel(
    store: &State<RosterStore>,
    _manager: Manager,
    flash: Option<FlashMessage<'_>>,
    q: Option<String>,
) -> Template {
    render_panel(
        store,
        flash.map(|flash| flash.message().to_string()),
        q.unwrap_or_default(),
        None,
    )
}

#[derive(Debug, FromForm)]
pub struct GenerateForm {
    ids: Vec<String>,
    picker_q: String,
    select_all: Lenient<bool>,
    template: String,
    format: String,
    size: u32,
    include_participant_info: Lenient<bool>,
    batch_size: u32,
}

/// Runs a generation batch over the picked participants and shows the results along
/// with the finished progress readout.
///
/// Parsed leniently: an empty picker submits no ids at all, which still has to reach
/// the empty-selection message below.
#[post("/generator/generate", data = "<form>")]
pub fn generate(
    store: &State<RosterStore>,
    _manager: Manager,
    form: Form<GenerateForm>,
) -> Result<Template, Flash<Redirect>> {
    let form = form.into_inner();
    let redirect = || Redirect::to(uri!(panel(q = _)));

    let Some(format) = OutputFormat::parse(&form.format) else {
        return Err(Flash::error(redirect(), "Unknown output format."));
    };
    let options = GenerationOptions {
        format,
        size: form.size,
        include_participant_info: *form.include_participant_info,
        template: form.template,
        batch_size: form.batch_size,
    };

    let mut selection = SelectionSet::from_ids(form.ids);
    if *form.select_all {
        // "select all" means exactly what the picker currently shows
        let filter = FilterSpec {
            query: form.picker_q.clone(),
            ..FilterSpec::default()
        };
        let visible_ids: Vec<String> = store.read(|state| {
            query::visible(&state.roster, &filter, &picker_sort())
                .into_iter()
                .map(|record| record.id)
                .collect()
        });
        selection.select_all_visible(visible_ids);
    }

    let now = Utc::now().naive_utc();
    let outcome = store
        .write(|state| qr::generate_batch(state, &selection, &options, now))
        .map_err(|err| match err {
            qr::GenerateError::EmptySelection => Flash::error(
                redirect(),
                "Please select at least one participant to generate QR codes.",
            ),
        })?;

    log::info!(
        "Generated batch {} with {} codes (template {}, batch size {})",
        outcome.batch_id,
        outcome.codes.len(),
        options.template,
        options.batch_size,
    );
    Ok(render_panel(store, None, String::new(), Some(outcome)))
}
