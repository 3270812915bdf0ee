use {
    super::{
        authflow::{self, Role, StaffAccount},
        checkin::RecentCheckIn,
        qr::{BatchRecord, BatchStatus},
        selection::SelectionSet,
    },
    chrono::{NaiveDate, NaiveDateTime},
    lettre::Address,
    rand::{distributions::Alphanumeric, Rng},
    serde::{Deserialize, Serialize},
    std::sync::{PoisonError, RwLock},
    thiserror::Error,
};

/// How many activity feed entries are kept around for the dashboard.
const ACTIVITY_LIMIT: usize = 20;

/// Where a participant stands with respect to the event.
///
/// Defaults to [`CheckInStatus::Pending`] at creation; transitions are always caller-driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckInStatus {
    Pending,
    Attended,
    Absent,
}

impl CheckInStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Attended => "attended",
            Self::Absent => "absent",
        }
    }

    /// Parses the lowercase form used in query strings and form values.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "attended" => Some(Self::Attended),
            "absent" => Some(Self::Absent),
            _ => None,
        }
    }
}

/// A participant on the event roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub id: String,
    pub name: String,
    pub email: Address,
    pub company: String,
    pub phone: Option<String>,
    pub job_title: Option<String>,

    /// The token attendees present at the door. Encoded into the QR image and matched
    /// exactly on scan.
    pub registration_id: String,

    /// The payload a scanner reports. Defaults to [`ParticipantRecord::registration_id`]
    /// at creation, kept separate so reissued badges don't invalidate the registration.
    pub qr_code: String,

    pub registration_date: NaiveDate,
    pub status: CheckInStatus,

    /// Present iff `status` is [`CheckInStatus::Attended`]. [`set_status`] maintains this.
    pub check_in_time: Option<NaiveDateTime>,

    pub photo: Option<String>,
    pub notes: Option<String>,
    pub dietary_preferences: Option<String>,
    pub special_requirements: Option<String>,
}

/// An event selectable on the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub date: NaiveDate,
    pub location: String,
    pub capacity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityKind {
    #[serde(rename = "check-in")]
    CheckIn,
    #[serde(rename = "registration")]
    Registration,
}

/// One line of the dashboard activity feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: String,
    pub kind: ActivityKind,
    pub participant_name: String,
    pub timestamp: NaiveDateTime,
}

/// The whole in-memory application state. There is deliberately no persistence layer;
/// everything below is seeded at boot and mutated in place.
#[derive(Debug)]
pub struct EventState {
    pub events: Vec<Event>,
    pub roster: Vec<ParticipantRecord>,
    pub recent_check_ins: Vec<RecentCheckIn>,
    pub activity: Vec<ActivityEntry>,
    pub batches: Vec<BatchRecord>,
    pub staff: Vec<StaffAccount>,

    next_participant: u32,
    next_check_in: u32,
    next_batch: u32,
    next_activity: u32,
}

impl EventState {
    pub(crate) fn next_participant_id(&mut self) -> String {
        let id = format!("P{:03}", self.next_participant);
        self.next_participant += 1;
        id
    }

    pub(crate) fn next_check_in_id(&mut self) -> String {
        let id = format!("ci-{}", self.next_check_in);
        self.next_check_in += 1;
        id
    }

    pub(crate) fn next_batch_id(&mut self) -> String {
        let id = format!("BATCH{:03}", self.next_batch);
        self.next_batch += 1;
        id
    }

    fn next_activity_id(&mut self) -> String {
        let id = format!("act-{:03}", self.next_activity);
        self.next_activity += 1;
        id
    }
}

/// The shared handle routes reach the [`EventState`] through.
///
/// Rocket serves requests from multiple threads, so every mutation goes through this
/// lock; the read/write closures keep lock scopes as small as the callers make them.
pub struct RosterStore(RwLock<EventState>);

impl RosterStore {
    #[must_use]
    pub fn new(state: EventState) -> Self {
        Self(RwLock::new(state))
    }

    pub fn read<R>(&self, operation: impl FnOnce(&EventState) -> R) -> R {
        let state = self.0.read().unwrap_or_else(PoisonError::into_inner);
        operation(&state)
    }

    pub fn write<R>(&self, operation: impl FnOnce(&mut EventState) -> R) -> R {
        let mut state = self.0.write().unwrap_or_else(PoisonError::into_inner);
        operation(&mut state)
    }
}

pub enum SearchParticipantBy {
    /// Matches the opaque participant id.
    Id(String),

    /// Matches the email address, case-insensitively.
    Email(String),

    /// Matches a scanned payload against the QR code or the registration id, exactly.
    Code(String),
}

impl SearchParticipantBy {
    #[must_use]
    pub fn matches(&self, record: &ParticipantRecord) -> bool {
        match self {
            Self::Id(id) => &record.id == id,
            Self::Email(email) => record.email.to_string().eq_ignore_ascii_case(email),
            Self::Code(code) => &record.qr_code == code || &record.registration_id == code,
        }
    }
}

/// Looks a participant up by the given criteria. Returns [`None`] if nothing matches.
#[must_use]
pub fn search_participant<'roster>(
    state: &'roster EventState,
    by: &SearchParticipantBy,
) -> Option<&'roster ParticipantRecord> {
    state.roster.iter().find(|record| by.matches(record))
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Email is already registered")]
    EmailAlreadyInUse,
}

#[derive(Debug, Error)]
#[error("No participant with id '{0}'")]
pub struct UnknownParticipant(pub String);

/// What the registration form hands over for a new participant.
#[derive(Clone, Debug)]
pub struct NewParticipant {
    pub name: String,
    pub email: Address,
    pub company: String,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub dietary_preferences: Option<String>,
    pub special_requirements: Option<String>,
}

/// Registers a new participant: assigns an id and a fresh registration id, starts them
/// out pending, and notes the registration on the activity feed.
pub fn register(
    state: &mut EventState,
    new: NewParticipant,
    now: NaiveDateTime,
) -> Result<ParticipantRecord, RegistrationError> {
    let email = new.email.to_string();
    if search_participant(state, &SearchParticipantBy::Email(email)).is_some() {
        return Err(RegistrationError::EmailAlreadyInUse);
    }

    let registration_id = new_registration_id(state, now);
    let record = ParticipantRecord {
        id: state.next_participant_id(),
        name: new.name,
        email: new.email,
        company: new.company,
        phone: new.phone,
        job_title: new.job_title,
        qr_code: registration_id.clone(),
        registration_id,
        registration_date: now.date(),
        status: CheckInStatus::Pending,
        check_in_time: None,
        photo: None,
        notes: None,
        dietary_preferences: new.dietary_preferences,
        special_requirements: new.special_requirements,
    };

    state.roster.push(record.clone());
    push_activity(state, ActivityKind::Registration, record.name.clone(), now);
    Ok(record)
}

/// Generates a registration id of the shape `REG-<year>-<token>`, rerolling the random
/// token until it collides with nothing on the roster.
fn new_registration_id(state: &EventState, now: NaiveDateTime) -> String {
    use chrono::Datelike;

    loop {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(char::from)
            .collect();
        let candidate = format!("REG-{}-{}", now.date().year(), token.to_uppercase());
        let taken = state
            .roster
            .iter()
            .any(|record| record.registration_id == candidate || record.qr_code == candidate);
        if !taken {
            return candidate;
        }
    }
}

/// Parameters of a manual edit from the management page.
#[derive(Clone, Debug)]
pub struct UpdateParticipant {
    pub id: String,
    pub name: String,
    pub email: Address,
    pub company: String,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub status: CheckInStatus,
}

/// Applies a manual edit. The status goes through [`set_status`], so the
/// attended-timestamp invariant survives whatever the form submits.
pub fn update_participant(
    state: &mut EventState,
    update: &UpdateParticipant,
    now: NaiveDateTime,
) -> Result<(), UnknownParticipant> {
    let record = state
        .roster
        .iter_mut()
        .find(|record| record.id == update.id)
        .ok_or_else(|| UnknownParticipant(update.id.clone()))?;

    record.name = update.name.clone();
    record.email = update.email.clone();
    record.company = update.company.clone();
    record.phone = update.phone.clone();
    record.notes = update.notes.clone();
    set_status(record, update.status, now);
    Ok(())
}

/// Deletes a participant and any recent check-in entries still pointing at them.
/// **This action is irreversible.**
pub fn delete_participant(state: &mut EventState, id: &str) -> Result<(), UnknownParticipant> {
    let before = state.roster.len();
    state.roster.retain(|record| record.id != id);
    if state.roster.len() == before {
        return Err(UnknownParticipant(id.to_string()));
    }
    state
        .recent_check_ins
        .retain(|check_in| check_in.participant_id != id);
    Ok(())
}

/// Changes a single participant's status from the management table's row dropdown.
pub fn change_status(
    state: &mut EventState,
    id: &str,
    status: CheckInStatus,
    now: NaiveDateTime,
) -> Result<(), UnknownParticipant> {
    let record = state
        .roster
        .iter_mut()
        .find(|record| record.id == id)
        .ok_or_else(|| UnknownParticipant(id.to_string()))?;
    set_status(record, status, now);
    Ok(())
}

/// The single place status transitions happen. Entering attended stamps the check-in
/// time (keeping an existing one), every other status clears it.
pub fn set_status(record: &mut ParticipantRecord, status: CheckInStatus, now: NaiveDateTime) {
    record.status = status;
    match status {
        CheckInStatus::Attended => {
            if record.check_in_time.is_none() {
                record.check_in_time = Some(now);
            }
        }
        CheckInStatus::Pending | CheckInStatus::Absent => record.check_in_time = None,
    }
}

/// Bulk-marks every selected participant attended. Returns how many records changed
/// status. The caller clears the selection afterwards.
pub fn mark_attended(state: &mut EventState, selection: &SelectionSet, now: NaiveDateTime) -> usize {
    let mut changed = 0;
    for record in &mut state.roster {
        if selection.is_selected(&record.id) && record.status != CheckInStatus::Attended {
            set_status(record, CheckInStatus::Attended, now);
            changed += 1;
        }
    }
    changed
}

/// Bulk-deletes every selected participant. Returns how many records were removed.
/// **This action is irreversible.**
pub fn delete_many(state: &mut EventState, selection: &SelectionSet) -> usize {
    let before = state.roster.len();
    state
        .roster
        .retain(|record| !selection.is_selected(&record.id));
    state
        .recent_check_ins
        .retain(|check_in| !selection.is_selected(&check_in.participant_id));
    before - state.roster.len()
}

/// Prepends an entry to the activity feed, dropping the oldest past [`ACTIVITY_LIMIT`].
pub fn push_activity(
    state: &mut EventState,
    kind: ActivityKind,
    participant_name: String,
    now: NaiveDateTime,
) {
    let entry = ActivityEntry {
        id: state.next_activity_id(),
        kind,
        participant_name,
        timestamp: now,
    };
    state.activity.insert(0, entry);
    state.activity.truncate(ACTIVITY_LIMIT);
}

/// Builds the boot-time state: the mock roster, events, batch history, recent check-ins
/// and staff directory. Would be a REST/GraphQL fetch in a production system.
#[must_use]
pub fn seed() -> EventState {
    let day = |day: u32| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
    let event_day = |hour: u32, minute: u32| {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    };

    #[allow(clippy::type_complexity)]
    let rows: [(
        &str,
        &str,
        &str,
        &str,
        u32,
        CheckInStatus,
        Option<NaiveDateTime>,
        Option<&str>,
    ); 10] = [
        (
            "Sarah Johnson",
            "sarah.johnson@techcorp.com",
            "TechCorp Solutions",
            "+1 (555) 123-4567",
            15,
            CheckInStatus::Attended,
            Some(event_day(9, 12)),
            Some("VIP attendee"),
        ),
        (
            "Michael Chen",
            "michael.chen@innovate.io",
            "Innovate Labs",
            "+1 (555) 234-5678",
            16,
            CheckInStatus::Pending,
            None,
            None,
        ),
        (
            "Emily Rodriguez",
            "emily.r@datastream.com",
            "DataStream Inc",
            "+1 (555) 345-6789",
            17,
            CheckInStatus::Attended,
            Some(event_day(8, 47)),
            None,
        ),
        (
            "James Wilson",
            "j.wilson@cloudnine.net",
            "CloudNine Systems",
            "+1 (555) 456-7890",
            18,
            CheckInStatus::Absent,
            None,
            None,
        ),
        (
            "Aisha Patel",
            "aisha.patel@nexustech.com",
            "Nexus Technologies",
            "+1 (555) 567-8901",
            19,
            CheckInStatus::Pending,
            None,
            None,
        ),
        (
            "David Kim",
            "david.kim@quantum.ai",
            "Quantum AI",
            "+1 (555) 678-9012",
            20,
            CheckInStatus::Attended,
            Some(event_day(9, 30)),
            None,
        ),
        (
            "Lisa Anderson",
            "lisa.a@futuresoft.com",
            "FutureSoft",
            "+1 (555) 789-0123",
            21,
            CheckInStatus::Pending,
            None,
            None,
        ),
        (
            "Robert Martinez",
            "r.martinez@synergy.co",
            "Synergy Corp",
            "+1 (555) 890-1234",
            22,
            CheckInStatus::Attended,
            Some(event_day(10, 5)),
            None,
        ),
        (
            "Jennifer Lee",
            "jennifer.lee@vertex.io",
            "Vertex Solutions",
            "+1 (555) 901-2345",
            23,
            CheckInStatus::Absent,
            None,
            None,
        ),
        (
            "Thomas Brown",
            "t.brown@pinnacle.net",
            "Pinnacle Systems",
            "+1 (555) 012-3456",
            24,
            CheckInStatus::Pending,
            None,
            None,
        ),
    ];

    let roster: Vec<ParticipantRecord> = rows
        .into_iter()
        .enumerate()
        .map(
            |(i, (name, email, company, phone, reg_day, status, check_in_time, notes))| {
                let number = i + 1;
                ParticipantRecord {
                    id: format!("P{number:03}"),
                    name: name.to_string(),
                    email: email.parse().expect("invalid email in seed data"),
                    company: company.to_string(),
                    phone: Some(phone.to_string()),
                    job_title: None,
                    registration_id: format!("REG-2024-{number:03}"),
                    qr_code: format!("REG-2024-{number:03}"),
                    registration_date: day(reg_day),
                    status,
                    check_in_time,
                    photo: None,
                    notes: notes.map(str::to_string),
                    dietary_preferences: None,
                    special_requirements: None,
                }
            },
        )
        .collect();

    let events = vec![
        Event {
            id: "evt-001".to_string(),
            name: "Tech Conference 2024".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            location: "San Francisco Convention Center".to_string(),
            capacity: 500,
        },
        Event {
            id: "evt-002".to_string(),
            name: "Product Launch Event".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 4, 20).unwrap(),
            location: "New York Expo Center".to_string(),
            capacity: 300,
        },
        Event {
            id: "evt-003".to_string(),
            name: "Annual Summit 2024".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            location: "Chicago Grand Hall".to_string(),
            capacity: 750,
        },
    ];

    let recent_check_ins = vec![
        RecentCheckIn {
            id: "ci-2".to_string(),
            participant_id: "P008".to_string(),
            participant_name: "Robert Martinez".to_string(),
            timestamp: event_day(10, 5),
            can_undo: true,
        },
        RecentCheckIn {
            id: "ci-1".to_string(),
            participant_id: "P006".to_string(),
            participant_name: "David Kim".to_string(),
            timestamp: event_day(9, 30),
            can_undo: false,
        },
    ];

    let activity = vec![
        ActivityEntry {
            id: "act-004".to_string(),
            kind: ActivityKind::CheckIn,
            participant_name: "Robert Martinez".to_string(),
            timestamp: event_day(10, 5),
        },
        ActivityEntry {
            id: "act-003".to_string(),
            kind: ActivityKind::CheckIn,
            participant_name: "David Kim".to_string(),
            timestamp: event_day(9, 30),
        },
        ActivityEntry {
            id: "act-002".to_string(),
            kind: ActivityKind::Registration,
            participant_name: "Thomas Brown".to_string(),
            timestamp: day(24).and_hms_opt(14, 20, 0).unwrap(),
        },
        ActivityEntry {
            id: "act-001".to_string(),
            kind: ActivityKind::Registration,
            participant_name: "Jennifer Lee".to_string(),
            timestamp: day(23).and_hms_opt(11, 5, 0).unwrap(),
        },
    ];

    let batch = |number: u32, day: u32, hour: u32, minute: u32, total: usize| BatchRecord {
        id: format!("BATCH{number:03}"),
        created_at: NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap(),
        total_codes: total,
        status: BatchStatus::Completed,
        download_url: Some(format!("https://example.com/batch{number:03}.zip")),
    };
    let batches = vec![
        batch(1, 23, 10, 30, 150),
        batch(2, 22, 15, 45, 200),
        batch(3, 21, 9, 15, 75),
    ];

    let staff = vec![
        StaffAccount {
            email: "admin@regiverse.com".parse().unwrap(),
            display_name: "Admin User".to_string(),
            role: Role::Administrator,
            password_hash: authflow::hash_password("Admin@123"),
        },
        StaffAccount {
            email: "organizer@regiverse.com".parse().unwrap(),
            display_name: "Event Organizer".to_string(),
            role: Role::EventOrganizer,
            password_hash: authflow::hash_password("Organizer@123"),
        },
        StaffAccount {
            email: "staff@regiverse.com".parse().unwrap(),
            display_name: "Event Staff".to_string(),
            role: Role::EventStaff,
            password_hash: authflow::hash_password("Staff@123"),
        },
    ];

    EventState {
        events,
        roster,
        recent_check_ins,
        activity,
        batches,
        staff,
        next_participant: 11,
        next_check_in: 3,
        next_batch: 4,
        next_activity: 5,
    }
}
