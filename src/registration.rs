use {
    super::{
        date_helpers::format_date,
        qr,
        roster::{self, Event, NewParticipant, RegistrationError, RosterStore},
    },
    chrono::Utc,
    lettre::Address,
    rocket::{
        form::{Form, Strict},
        State,
    },
    rocket_dyn_templates::{context, Template},
    serde::Serialize,
};

/// Per-field validation errors, rendered inline next to their inputs. A failed
/// submission mutates nothing; the visitor corrects and resubmits.
#[derive(Debug, Default, Serialize)]
struct FormErrors {
    first_name: Option<&'static str>,
    last_name: Option<&'static str>,
    email: Option<&'static str>,
    phone: Option<&'static str>,
    company: Option<&'static str>,
    job_title: Option<&'static str>,
}

impl FormErrors {
    fn any(&self) -> bool {
        self.first_name.is_some()
            || self.last_name.is_some()
            || self.email.is_some()
            || self.phone.is_some()
            || self.company.is_some()
            || self.job_title.is_some()
    }
}

#[derive(Debug, Default, FromForm, Serialize)]
pub struct RegistrationFormData {
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    company: String,
    job_title: String,
    dietary_preferences: String,
    special_requirements: String,
}

fn validate_form(data: &RegistrationFormData) -> FormErrors {
    let mut errors = FormErrors::default();

    if data.first_name.trim().is_empty() {
        errors.first_name = Some("First name is required");
    }
    if data.last_name.trim().is_empty() {
        errors.last_name = Some("Last name is required");
    }
    if data.email.trim().is_empty() {
        errors.email = Some("Email is required");
    } else if data.email.trim().parse::<Address>().is_err() {
        errors.email = Some("Please enter a valid email address");
    }
    if data.phone.trim().is_empty() {
        errors.phone = Some("Phone number is required");
    } else if !valid_phone(&data.phone) {
        errors.phone = Some("Please enter a valid phone number");
    }
    if data.company.trim().is_empty() {
        errors.company = Some("Company name is required");
    }
    if data.job_title.trim().is_empty() {
        errors.job_title = Some("Job title is required");
    }

    errors
}

/// An optional leading `+`, then at least ten characters of digits, spaces, parens and
/// dashes.
fn valid_phone(phone: &str) -> bool {
    let trimmed = phone.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    digits.len() >= 10
        && digits
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '(' | ')' | '-'))
}

#[derive(Debug, Serialize)]
struct TemplateEvent {
    pretty_date: String,
    registered: usize,
    event: Event,
}

fn current_event(store: &RosterStore) -> TemplateEvent {
    store.read(|state| {
        let event = state
            .events
            .first()
            .expect("seed data contains no events")
            .clone();
        TemplateEvent {
            pretty_date: format_date(event.date),
            registered: state.roster.len(),
            event,
        }
    })
}

fn render_form(store: &RosterStore, values: RegistrationFormData, errors: FormErrors) -> Template {
    Template::render(
        "registration",
        context! {
            event: current_event(store),
            values,
            errors,
        },
    )
}

/// The public registration form. Attendees reach this without a session.
#[get("/register")]
pub fn form(store: &State<RosterStore>) -> Template {
    render_form(
        store,
        RegistrationFormData::default(),
        FormErrors::default(),
    )
}

#[post("/register", data = "<form>")]
pub fn submit(store: &State<RosterStore>, form: Form<Strict<RegistrationFormData>>) -> Template {
    let data = form.into_inner().into_inner();
    let errors = validate_form(&data);
    if errors.any() {
        return render_form(store, data, errors);
    }

    let new = NewParticipant {
        name: format!("{} {}", data.first_name.trim(), data.last_name.trim()),
        // the parse cannot fail, validate_form checked it above
        email: data.email.trim().parse().unwrap(),
        company: data.company.trim().to_string(),
        phone: Some(data.phone.trim().to_string()),
        job_title: Some(data.job_title.trim().to_string()),
        dietary_preferences: if data.dietary_preferences.is_empty()
            || data.dietary_preferences == "none"
        {
            None
        } else {
            Some(data.dietary_preferences.clone())
        },
        special_requirements: if data.special_requirements.trim().is_empty() {
            None
        } else {
            Some(data.special_requirements.trim().to_string())
        },
    };

    let now = Utc::now().naive_utc();
    let registered = store.write(|state| roster::register(state, new, now));
    match registered {
        Err(RegistrationError::EmailAlreadyInUse) => {
            let errors = FormErrors {
                email: Some(
                    "This email is already registered. Please use a different email or contact support.",
                ),
                ..FormErrors::default()
            };
            render_form(store, data, errors)
        }
        Ok(record) => {
            log::info!("Registered {} as {}", record.name, record.registration_id);
            let event = current_event(store);
            Template::render(
                "registration-success",
                context! {
                    participant_name: record.name,
                    registration_id: record.registration_id.clone(),
                    qr_url: qr::qr_image_url(&record.registration_id, 256),
                    event,
                },
            )
        }
    }
}
