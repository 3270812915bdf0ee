use {
    super::{
        date_helpers::format_time,
        roster::{
            self, ActivityKind, CheckInStatus, EventState, ParticipantRecord, SearchParticipantBy,
        },
    },
    chrono::NaiveDateTime,
    serde::{Deserialize, Serialize},
    thiserror::Error,
};

/// How many recent check-ins the station keeps for the undo list.
const RECENT_LIMIT: usize = 10;

/// One line of the station's recent check-in list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentCheckIn {
    pub id: String,
    pub participant_id: String,
    pub participant_name: String,
    pub timestamp: NaiveDateTime,
    pub can_undo: bool,
}

/// What a scan (or manual match) came back with. Failures are messages, not errors:
/// the roster is untouched and the operator just reads the message and moves on.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub success: bool,
    pub message: String,
    pub participant: Option<ParticipantRecord>,
    pub timestamp: NaiveDateTime,
}

impl ScanOutcome {
    fn failure(message: String, now: NaiveDateTime) -> Self {
        Self {
            success: false,
            message,
            participant: None,
            timestamp: now,
        }
    }
}

/// Resolves a scanned payload against the roster and checks the participant in.
///
/// An unknown code and a participant who already attended both leave every record
/// unchanged; the latter reports the original check-in time. A successful scan stamps
/// the record, prepends an undoable entry to the recent list and notes the check-in on
/// the activity feed.
pub fn scan(state: &mut EventState, code: &str, now: NaiveDateTime) -> ScanOutcome {
    let by = SearchParticipantBy::Code(code.to_string());
    let Some(index) = state.roster.iter().position(|record| by.matches(record)) else {
        return ScanOutcome::failure(
            "Invalid QR code. Participant not found in the system.".to_string(),
            now,
        );
    };

    if state.roster[index].status == CheckInStatus::Attended {
        let record = &state.roster[index];
        let checked_in_at = record
            .check_in_time
            .map_or_else(|| "an earlier time".to_string(), format_time);
        return ScanOutcome::failure(
            format!(
                "{} has already been checked in at {}.",
                record.name, checked_in_at
            ),
            now,
        );
    }

    roster::set_status(&mut state.roster[index], CheckInStatus::Attended, now);
    let record = state.roster[index].clone();

    let entry = RecentCheckIn {
        id: state.next_check_in_id(),
        participant_id: record.id.clone(),
        participant_name: record.name.clone(),
        timestamp: now,
        can_undo: true,
    };
    state.recent_check_ins.insert(0, entry);
    state.recent_check_ins.truncate(RECENT_LIMIT);

    roster::push_activity(state, ActivityKind::CheckIn, record.name.clone(), now);

    ScanOutcome {
        success: true,
        message: format!("Successfully checked in {}", record.name),
        participant: Some(record),
        timestamp: now,
    }
}

#[derive(Debug, Error)]
pub enum UndoError {
    #[error("No recent check-in with id '{0}'")]
    UnknownCheckIn(String),
    #[error("This check-in can no longer be undone")]
    NotUndoable,
}

/// Reverts a recent check-in: the participant goes back to pending, the timestamp is
/// cleared and the entry disappears from the list.
pub fn undo(state: &mut EventState, check_in_id: &str) -> Result<(), UndoError> {
    let Some(position) = state
        .recent_check_ins
        .iter()
        .position(|check_in| check_in.id == check_in_id)
    else {
        return Err(UndoError::UnknownCheckIn(check_in_id.to_string()));
    };

    if !state.recent_check_ins[position].can_undo {
        return Err(UndoError::NotUndoable);
    }

    let entry = state.recent_check_ins.remove(position);
    if let Some(record) = state
        .roster
        .iter_mut()
        .find(|record| record.id == entry.participant_id)
    {
        // attended -> pending, which never carries a timestamp
        record.status = CheckInStatus::Pending;
        record.check_in_time = None;
    }
    Ok(())
}
