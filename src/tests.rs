use {
    super::{
        authflow, checkin, export,
        qr::{self, GenerationOptions, GenerationStatus},
        query::{self, FilterSpec, SortColumn, SortDirection, SortSpec, StatusFilter},
        roster::{
            self, CheckInStatus, NewParticipant, ParticipantRecord, RegistrationError,
            SearchParticipantBy,
        },
        selection::SelectionSet,
    },
    chrono::{NaiveDate, NaiveDateTime},
};

fn noon() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 15)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

/// A hand-rolled record for the pure query tests; stateful tests go through
/// [`roster::seed`] instead.
fn participant(
    id: &str,
    name: &str,
    email: &str,
    company: &str,
    day: u32,
    status: CheckInStatus,
) -> ParticipantRecord {
    ParticipantRecord {
        id: id.to_string(),
        name: name.to_string(),
        email: email.parse().unwrap(),
        company: company.to_string(),
        phone: None,
        job_title: None,
        registration_id: format!("REG-2024-{id}"),
        qr_code: format!("REG-2024-{id}"),
        registration_date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
        status,
        check_in_time: if status == CheckInStatus::Attended {
            Some(
                NaiveDate::from_ymd_opt(2024, 3, 15)
                    .unwrap()
                    .and_hms_opt(9, 30, 0)
                    .unwrap(),
            )
        } else {
            None
        },
        photo: None,
        notes: None,
        dietary_preferences: None,
        special_requirements: None,
    }
}

fn fixture_roster() -> Vec<ParticipantRecord> {
    vec![
        participant(
            "A1",
            "Alice Beta",
            "alice@techcorp.example",
            "TechCorp",
            15,
            CheckInStatus::Pending,
        ),
        participant(
            "B2",
            "Bob Echo",
            "bob@innovate.example",
            "Innovate Labs",
            16,
            CheckInStatus::Attended,
        ),
        participant(
            "C3",
            "Carol Delta",
            "carol@techcorp.example",
            "TechCorp",
            17,
            CheckInStatus::Pending,
        ),
        participant(
            "D4",
            "Dave Foxtrot",
            "dave@vertex.example",
            "Vertex",
            18,
            CheckInStatus::Absent,
        ),
    ]
}

#[test]
fn unconstrained_filter_returns_permutation() {
    let roster = fixture_roster();
    let result = query::visible(&roster, &FilterSpec::default(), &SortSpec::default());

    assert_eq!(result.len(), roster.len());
    let mut expected: Vec<&str> = roster.iter().map(|r| r.id.as_str()).collect();
    let mut got: Vec<&str> = result.iter().map(|r| r.id.as_str()).collect();
    expected.sort_unstable();
    got.sort_unstable();
    assert_eq!(got, expected);
}

#[test]
fn every_result_satisfies_all_predicates() {
    let roster = fixture_roster();
    let filter = FilterSpec {
        query: "techcorp".to_string(),
        status: StatusFilter::Pending,
        company: Some("TechCorp".to_string()),
        registered_from: Some(NaiveDate::from_ymd_opt(2024, 1, 16).unwrap()),
        registered_to: None,
        match_registration_id: false,
    };
    let result = query::visible(&roster, &filter, &SortSpec::default());

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].id, "C3");
    for record in &roster {
        let included = result.iter().any(|r| r.id == record.id);
        assert_eq!(included, filter.matches(record));
    }
}

#[test]
fn query_matches_name_email_company_case_insensitively() {
    let roster = fixture_roster();
    let by_name = FilterSpec {
        query: "aLiCe".to_string(),
        ..FilterSpec::default()
    };
    assert_eq!(query::visible(&roster, &by_name, &SortSpec::default()).len(), 1);

    let by_email = FilterSpec {
        query: "vertex.example".to_string(),
        ..FilterSpec::default()
    };
    assert_eq!(
        query::visible(&roster, &by_email, &SortSpec::default())[0].id,
        "D4"
    );

    // registration ids only match when the page opts in
    let by_registration = FilterSpec {
        query: "reg-2024-b2".to_string(),
        ..FilterSpec::default()
    };
    assert!(query::visible(&roster, &by_registration, &SortSpec::default()).is_empty());
    let with_registration = FilterSpec {
        match_registration_id: true,
        ..by_registration
    };
    assert_eq!(
        query::visible(&roster, &with_registration, &SortSpec::default())[0].id,
        "B2"
    );
}

#[test]
fn date_range_is_inclusive_and_inverted_range_matches_nothing() {
    let roster = fixture_roster();
    let filter = FilterSpec {
        registered_from: Some(NaiveDate::from_ymd_opt(2024, 1, 16).unwrap()),
        registered_to: Some(NaiveDate::from_ymd_opt(2024, 1, 17).unwrap()),
        ..FilterSpec::default()
    };
    let result = query::visible(&roster, &filter, &SortSpec::default());
    let ids: Vec<&str> = result.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["C3", "B2"]); // default sort: registration date descending

    let inverted = FilterSpec {
        registered_from: Some(NaiveDate::from_ymd_opt(2024, 1, 20).unwrap()),
        registered_to: Some(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()),
        ..FilterSpec::default()
    };
    assert!(query::visible(&roster, &inverted, &SortSpec::default()).is_empty());
}

#[test]
fn sorting_is_deterministic_and_reversible() {
    let roster = fixture_roster();
    let by_company = SortSpec {
        column: SortColumn::Company,
        direction: SortDirection::Ascending,
    };

    let first = query::visible(&roster, &FilterSpec::default(), &by_company);
    let second = query::visible(&roster, &FilterSpec::default(), &by_company);
    assert_eq!(first, second);
    // the two TechCorp records tie on the column and fall back to id order
    let ids: Vec<&str> = first.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["B2", "A1", "C3", "D4"]);

    // distinct keys reverse exactly
    let by_name = SortSpec {
        column: SortColumn::Name,
        direction: SortDirection::Ascending,
    };
    let ascending = query::visible(&roster, &FilterSpec::default(), &by_name);
    let descending = query::visible(
        &roster,
        &FilterSpec::default(),
        &SortSpec {
            direction: SortDirection::Descending,
            ..by_name
        },
    );
    let mut reversed = ascending.clone();
    reversed.reverse();
    assert_eq!(descending, reversed);
}

#[test]
fn sort_toggle_flips_same_column_and_resets_new_one() {
    let initial = SortSpec::default();
    assert_eq!(initial.column, SortColumn::RegistrationDate);
    assert_eq!(initial.direction, SortDirection::Descending);

    let by_name = initial.toggle(SortColumn::Name);
    assert_eq!(by_name.column, SortColumn::Name);
    assert_eq!(by_name.direction, SortDirection::Ascending);

    let flipped = by_name.toggle(SortColumn::Name);
    assert_eq!(flipped.direction, SortDirection::Descending);
    let flipped_back = flipped.toggle(SortColumn::Name);
    assert_eq!(flipped_back.direction, SortDirection::Ascending);
}

#[test]
fn status_and_company_filter_over_seeded_roster() {
    let state = roster::seed();
    let filter = FilterSpec {
        status: StatusFilter::Attended,
        company: Some("TechCorp Solutions".to_string()),
        ..FilterSpec::default()
    };
    let result = query::visible(&state.roster, &filter, &SortSpec::default());

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].id, "P001");
    assert_eq!(result[0].status, CheckInStatus::Attended);
}

#[test]
fn status_counts_cover_the_whole_roster() {
    let state = roster::seed();
    let counts = query::status_counts(&state.roster);
    assert_eq!(counts.total, 10);
    assert_eq!(counts.attended, 4);
    assert_eq!(counts.pending, 4);
    assert_eq!(counts.absent, 2);
    assert!((counts.attendance_rate() - 40.0).abs() < f64::EPSILON);
}

#[test]
fn select_all_visible_of_empty_result_is_empty() {
    let roster = fixture_roster();
    let filter = FilterSpec {
        query: "matches absolutely nothing".to_string(),
        ..FilterSpec::default()
    };
    let visible = query::visible(&roster, &filter, &SortSpec::default());

    let mut selection = SelectionSet::from_ids(["A1".to_string(), "B2".to_string()]);
    selection.select_all_visible(visible.iter().map(|r| r.id.clone()));
    assert!(selection.is_empty());
}

#[test]
fn selection_toggle_and_resolve() {
    let roster = fixture_roster();
    let mut selection = SelectionSet::new();

    selection.toggle("C3");
    selection.toggle("A1");
    selection.toggle("C3"); // and off again
    assert_eq!(selection.len(), 1);
    assert!(selection.is_selected("A1"));

    selection.toggle("B2");
    let resolved = selection.resolve(&roster);
    let ids: Vec<&str> = resolved.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["A1", "B2"]); // roster order, not insertion order

    selection.clear();
    assert!(selection.resolve(&roster).is_empty());
}

#[test]
fn scan_of_unknown_code_changes_nothing() {
    let mut state = roster::seed();
    let before = state.roster.clone();

    let outcome = checkin::scan(&mut state, "XYZ", noon());
    assert!(!outcome.success);
    assert!(outcome.message.contains("not found"));
    assert_eq!(state.roster, before);
}

#[test]
fn scan_of_already_attended_reports_original_time() {
    let mut state = roster::seed();
    let before = state.roster.clone();

    // P001 was seeded checked-in at 9:12
    let outcome = checkin::scan(&mut state, "REG-2024-001", noon());
    assert!(!outcome.success);
    assert!(outcome.message.contains("already"));
    assert!(outcome.message.contains("9:12 AM"));
    assert_eq!(state.roster, before);
}

#[test]
fn scan_checks_in_and_undo_restores() {
    let mut state = roster::seed();

    let outcome = checkin::scan(&mut state, "REG-2024-002", noon());
    assert!(outcome.success);
    assert!(outcome.message.contains("Michael Chen"));

    let record = roster::search_participant(&state, &SearchParticipantBy::Id("P002".to_string()))
        .unwrap();
    assert_eq!(record.status, CheckInStatus::Attended);
    assert_eq!(record.check_in_time, Some(noon()));

    let entry = state.recent_check_ins.first().unwrap().clone();
    assert_eq!(entry.participant_id, "P002");
    assert!(entry.can_undo);

    checkin::undo(&mut state, &entry.id).unwrap();
    let record = roster::search_participant(&state, &SearchParticipantBy::Id("P002".to_string()))
        .unwrap();
    assert_eq!(record.status, CheckInStatus::Pending);
    assert_eq!(record.check_in_time, None);
    assert!(state.recent_check_ins.iter().all(|ci| ci.id != entry.id));
}

#[test]
fn scan_outcome_serializes_for_the_wire() {
    let mut state = roster::seed();

    let outcome = checkin::scan(&mut state, "XYZ", noon());
    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value["success"], serde_json::json!(false));
    assert!(value["message"].as_str().unwrap().contains("not found"));
    assert!(value["participant"].is_null());

    let outcome = checkin::scan(&mut state, "REG-2024-002", noon());
    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value["participant"]["status"], serde_json::json!("attended"));
}

#[test]
fn undo_refuses_stale_entries() {
    let mut state = roster::seed();

    // ci-1 is seeded past its undo window
    assert!(matches!(
        checkin::undo(&mut state, "ci-1"),
        Err(checkin::UndoError::NotUndoable)
    ));
    assert!(matches!(
        checkin::undo(&mut state, "ci-999"),
        Err(checkin::UndoError::UnknownCheckIn(_))
    ));
}

#[test]
fn bulk_mark_attended_stamps_and_keeps_existing_times() {
    let mut state = roster::seed();
    let selection = SelectionSet::from_ids([
        "P001".to_string(), // already attended since 9:12
        "P002".to_string(),
        "P005".to_string(),
        "P010".to_string(),
    ]);

    let changed = roster::mark_attended(&mut state, &selection, noon());
    assert_eq!(changed, 3);

    for id in ["P002", "P005", "P010"] {
        let record =
            roster::search_participant(&state, &SearchParticipantBy::Id(id.to_string())).unwrap();
        assert_eq!(record.status, CheckInStatus::Attended);
        assert_eq!(record.check_in_time, Some(noon()));
    }
    let sarah = roster::search_participant(&state, &SearchParticipantBy::Id("P001".to_string()))
        .unwrap();
    assert_eq!(
        sarah.check_in_time.map(super::date_helpers::format_time),
        Some("9:12 AM".to_string())
    );
}

#[test]
fn bulk_delete_prunes_recent_check_ins() {
    let mut state = roster::seed();
    let selection = SelectionSet::from_ids(["P008".to_string(), "P009".to_string()]);

    let removed = roster::delete_many(&mut state, &selection);
    assert_eq!(removed, 2);
    assert_eq!(state.roster.len(), 8);
    assert!(state
        .recent_check_ins
        .iter()
        .all(|ci| ci.participant_id != "P008"));
}

#[test]
fn register_assigns_ids_and_rejects_duplicate_email() {
    let mut state = roster::seed();
    let new = NewParticipant {
        name: "Nina Osei".to_string(),
        email: "nina.osei@horizon.example".parse().unwrap(),
        company: "Horizon Group".to_string(),
        phone: Some("+1 (555) 111-2222".to_string()),
        job_title: Some("CTO".to_string()),
        dietary_preferences: None,
        special_requirements: None,
    };

    let record = roster::register(&mut state, new.clone(), noon()).unwrap();
    assert_eq!(record.id, "P011");
    assert!(record.registration_id.starts_with("REG-2024-"));
    assert_eq!(record.qr_code, record.registration_id);
    assert_eq!(record.status, CheckInStatus::Pending);
    assert_eq!(record.registration_date, noon().date());

    let latest = state.activity.first().unwrap();
    assert_eq!(latest.participant_name, "Nina Osei");

    // same address, different case
    let duplicate = NewParticipant {
        email: "Nina.Osei@horizon.example".parse().unwrap(),
        ..new
    };
    assert!(matches!(
        roster::register(&mut state, duplicate, noon()),
        Err(RegistrationError::EmailAlreadyInUse)
    ));
}

#[test]
fn manual_edit_maintains_the_attended_timestamp_invariant() {
    let mut state = roster::seed();

    roster::change_status(&mut state, "P002", CheckInStatus::Attended, noon()).unwrap();
    let record = roster::search_participant(&state, &SearchParticipantBy::Id("P002".to_string()))
        .unwrap();
    assert_eq!(record.check_in_time, Some(noon()));

    roster::change_status(&mut state, "P002", CheckInStatus::Absent, noon()).unwrap();
    let record = roster::search_participant(&state, &SearchParticipantBy::Id("P002".to_string()))
        .unwrap();
    assert_eq!(record.check_in_time, None);

    assert!(roster::change_status(&mut state, "P999", CheckInStatus::Pending, noon()).is_err());
}

#[test]
fn csv_export_escapes_embedded_delimiters() {
    let mut records = vec![participant(
        "A1",
        "Alice Beta",
        "alice@techcorp.example",
        "TechCorp",
        15,
        CheckInStatus::Pending,
    )];
    records[0].company = "Acme, Inc.".to_string();
    records[0].name = "Alice \"Ally\" Beta".to_string();

    let csv = export::participants_csv(&records);
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("Name,Email,Company,Registration Date,Status")
    );
    assert_eq!(
        lines.next(),
        Some("\"Alice \"\"Ally\"\" Beta\",alice@techcorp.example,\"Acme, Inc.\",1/15/2024,pending")
    );
    assert_eq!(lines.next(), None);

    assert_eq!(
        export::export_filename(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()),
        "participants-2024-03-15.csv"
    );
}

#[test]
fn generation_progress_arithmetic() {
    let start = qr::GenerationProgress::at_step(8, 0, 0);
    assert_eq!(start.percentage, 0);
    assert_eq!(start.seconds_remaining, 16);
    assert_eq!(start.status, GenerationStatus::Generating);

    let halfway = qr::GenerationProgress::at_step(8, 4, 0);
    assert_eq!(halfway.percentage, 50);
    assert_eq!(halfway.seconds_remaining, 8);

    let done = qr::GenerationProgress::at_step(8, 7, 1);
    assert_eq!(done.percentage, 100);
    assert_eq!(done.seconds_remaining, 0);
    assert_eq!(done.status, GenerationStatus::Completed);
}

#[test]
fn generate_batch_counts_unknown_ids_as_failed() {
    let mut state = roster::seed();
    let selection = SelectionSet::from_ids(["P001".to_string(), "P404".to_string()]);

    let outcome =
        qr::generate_batch(&mut state, &selection, &GenerationOptions::default(), noon()).unwrap();
    assert_eq!(outcome.batch_id, "BATCH004");
    assert_eq!(outcome.codes.len(), 1);
    assert_eq!(outcome.progress.failed, 1);
    assert_eq!(outcome.progress.status, GenerationStatus::Completed);
    assert!(outcome.codes[0].image_url.contains("REG-2024-001"));

    let newest = state.batches.first().unwrap();
    assert_eq!(newest.id, "BATCH004");
    assert_eq!(newest.total_codes, 1);

    let empty = SelectionSet::new();
    assert!(matches!(
        qr::generate_batch(&mut state, &empty, &GenerationOptions::default(), noon()),
        Err(qr::GenerateError::EmptySelection)
    ));
}

#[test]
fn qr_image_url_escapes_the_payload() {
    let url = qr::qr_image_url("REG-2024-001", 256);
    assert_eq!(
        url,
        "https://api.qrserver.com/v1/create-qr-code/?size=256x256&data=REG-2024-001"
    );

    let odd = qr::qr_image_url("code with spaces&=", 128);
    assert!(odd.ends_with("data=code%20with%20spaces%26%3D"));
}

#[test]
fn password_hashes_verify() {
    let hash = authflow::hash_password("Admin@123");
    assert!(authflow::verify_password("Admin@123", &hash));
    assert!(!authflow::verify_password("Admin@124", &hash));
    assert!(!authflow::verify_password("Admin@123", "not a phc string"));
}
