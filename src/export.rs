use {super::roster::ParticipantRecord, chrono::Datelike, chrono::NaiveDate, std::borrow::Cow};

/// Builds the participant export: a header row, then one row per record with the
/// registration date in the en-US short form.
///
/// Fields are quoted per RFC 4180 whenever they carry delimiters, so a company name
/// like `Acme, Inc.` survives the round trip.
#[must_use]
pub fn participants_csv(records: &[ParticipantRecord]) -> String {
    let mut csv = String::from("Name,Email,Company,Registration Date,Status\n");
    for record in records {
        let email = record.email.to_string();
        let row = [
            escape_field(&record.name),
            escape_field(&email),
            escape_field(&record.company),
            Cow::Owned(short_date(record.registration_date)),
            Cow::Borrowed(record.status.as_str()),
        ];
        csv.push_str(&row.join(","));
        csv.push('\n');
    }
    csv
}

/// `M/D/YYYY`, no padding, the en-US short form spreadsheets expect.
fn short_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.month(), date.day(), date.year())
}

fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains(['"', ',', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// The download name for an export requested on `today`.
#[must_use]
pub fn export_filename(today: NaiveDate) -> String {
    format!("participants-{}.csv", today.format("%Y-%m-%d"))
}
