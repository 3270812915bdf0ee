#[macro_use]
extern crate rocket;

mod authflow;
mod checkin;
mod config;
mod date_helpers;
mod export;
mod generator;
mod management;
mod qr;
mod query;
mod registration;
mod roster;
mod selection;
mod station;
#[cfg(test)]
mod tests;

use {
    authflow::User,
    date_helpers::{format_date, format_time},
    figment::{
        providers::{Env, Format, Toml},
        Figment,
    },
    query::{FilterSpec, SortSpec},
    rocket::{
        fairing::AdHoc,
        fs::FileServer,
        http::CookieJar,
        request::FlashMessage,
        response::{Flash, Redirect},
        State,
    },
    rocket_dyn_templates::{context, handlebars::handlebars_helper, Template},
    roster::{ActivityEntry, ParticipantRecord, RosterStore},
    serde::Serialize,
    std::fmt,
};

/// A shorthand function for logging an internal server error and redirecting to the page for that.
#[inline]
pub fn server_error(admin_err: impl fmt::Display, user_err: impl AsRef<str>) -> Flash<Redirect> {
    log::error!("{}", admin_err);
    Flash::error(Redirect::to(uri!(server_error_panel)), user_err.as_ref())
}

#[get("/servererror")]
fn server_error_panel(flash: FlashMessage<'_>) -> Template {
    #[derive(Debug, Serialize)]
    struct Context {
        error: String,
    }

    Template::render(
        "server-error",
        &Context {
            error: flash.message().to_string(),
        },
    )
}

#[get("/?<event>")]
fn dashboard(
    store: &State<RosterStore>,
    user: User,
    flash: Option<FlashMessage<'_>>,
    event: Option<String>,
) -> Template {
    #[derive(Debug, Serialize)]
    struct TemplateParticipant {
        pretty_date: String,
        participant: ParticipantRecord,
    }

    #[derive(Debug, Serialize)]
    struct TemplateActivity {
        pretty_time: String,
        entry: ActivityEntry,
    }

    let (events, selected, stats, recent, activity, display_name) = store.read(|state| {
        let selected = event
            .as_deref()
            .and_then(|id| state.events.iter().find(|event| event.id == id))
            .or_else(|| state.events.first())
            .cloned()
            .expect("seed data contains no events");

        let recent: Vec<TemplateParticipant> =
            query::visible(&state.roster, &FilterSpec::default(), &SortSpec::default())
                .into_iter()
                .take(5)
                .map(|participant| TemplateParticipant {
                    pretty_date: format_date(participant.registration_date),
                    participant,
                })
                .collect();

        let activity: Vec<TemplateActivity> = state
            .activity
            .iter()
            .take(10)
            .map(|entry| TemplateActivity {
                pretty_time: format_time(entry.timestamp),
                entry: entry.clone(),
            })
            .collect();

        (
            state.events.clone(),
            selected,
            query::status_counts(&state.roster),
            recent,
            activity,
            authflow::staff_display_name(state, user.email()).unwrap_or_else(|| user.email().to_string()),
        )
    });

    let flash = flash.map(|flashmsg| flashmsg.message().to_string());

    Template::render(
        "dashboard",
        context! {
            flash,
            user_name: display_name,
            user_role: user.role().as_str(),
            show_manager_controls: user.role().is_manager(),
            events,
            selected_event: &selected,
            event_date: format_date(selected.date),
            stats,
            check_in_rate: format!("{:.1}", stats.attendance_rate()),
            participants: recent,
            activity,
        },
    )
}

#[post("/logout")]
fn logout(_user: User, jar: &CookieJar<'_>) -> Redirect {
    jar.remove("auth-token");
    Redirect::to(uri!(authflow::index))
}

/// Rocket's own figment, a `Regiverse.toml` for deployment overrides, and
/// `REGIVERSE_`-prefixed environment variables, in ascending precedence.
fn figment() -> Figment {
    Figment::from(rocket::Config::figment())
        .merge(Toml::file("Regiverse.toml").nested())
        .merge(Env::prefixed("REGIVERSE_").global())
}

#[launch]
fn rocket() -> _ {
    rocket::custom(figment())
        .attach(Template::custom(|engines| {
            engines
                .handlebars
                .register_escape_fn(|input| ammonia::clean_text(input));

            handlebars_helper!(equals: |left_hand: String, right_hand: String| left_hand == right_hand);

            engines.handlebars.register_helper("equals", Box::new(equals));
        }))
        .attach(AdHoc::config::<config::Config>())
        .manage(RosterStore::new(roster::seed()))
        .mount(
            "/",
            routes![
                dashboard,
                logout,
                server_error_panel,
                management::participants_panel,
                management::update_participant,
                management::change_status,
                management::delete_participant,
                management::bulk_action,
                station::panel,
                station::scan,
                station::manual_check_in,
                station::undo_check_in,
                generator::panel,
                generator::generate,
                registration::form,
                registration::submit,
                authflow::index,
                authflow::login
            ],
        )
        .mount("/static", FileServer::from("./static"))
}
