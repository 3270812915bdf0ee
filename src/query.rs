use {
    super::roster::{CheckInStatus, ParticipantRecord},
    chrono::NaiveDate,
    serde::Serialize,
    std::{cmp::Ordering, collections::BTreeSet},
};

/// Status constraint of a [`FilterSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Attended,
    Absent,
}

impl StatusFilter {
    /// Parses the query-string form; anything unknown counts as no constraint.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match CheckInStatus::parse(value) {
            Some(CheckInStatus::Pending) => Self::Pending,
            Some(CheckInStatus::Attended) => Self::Attended,
            Some(CheckInStatus::Absent) => Self::Absent,
            None => Self::All,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Pending => "pending",
            Self::Attended => "attended",
            Self::Absent => "absent",
        }
    }

    #[must_use]
    pub fn matches(self, status: CheckInStatus) -> bool {
        match self {
            Self::All => true,
            Self::Pending => status == CheckInStatus::Pending,
            Self::Attended => status == CheckInStatus::Attended,
            Self::Absent => status == CheckInStatus::Absent,
        }
    }
}

/// What a list view wants to see of a roster. An unset field imposes no constraint;
/// everything that is set must hold at once.
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    /// Case-insensitive substring match against name, email and company.
    pub query: String,

    pub status: StatusFilter,

    /// Exact company match.
    pub company: Option<String>,

    /// Inclusive bounds on the registration date; either side may stay open. A start
    /// after the end simply matches nothing.
    pub registered_from: Option<NaiveDate>,
    pub registered_to: Option<NaiveDate>,

    /// Whether `query` also searches the registration id. The check-in station's manual
    /// entry wants this, the management and generator pickers don't.
    pub match_registration_id: bool,
}

impl FilterSpec {
    #[must_use]
    pub fn matches(&self, record: &ParticipantRecord) -> bool {
        let query = self.query.trim().to_lowercase();
        let matches_query = query.is_empty()
            || record.name.to_lowercase().contains(&query)
            || record.email.to_string().to_lowercase().contains(&query)
            || record.company.to_lowercase().contains(&query)
            || (self.match_registration_id
                && record.registration_id.to_lowercase().contains(&query));

        let matches_company = match &self.company {
            Some(company) if !company.is_empty() => &record.company == company,
            _ => true,
        };

        let matches_range = self
            .registered_from
            .map_or(true, |from| record.registration_date >= from)
            && self
                .registered_to
                .map_or(true, |to| record.registration_date <= to);

        matches_query && self.status.matches(record.status) && matches_company && matches_range
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Name,
    Email,
    Company,
    RegistrationDate,
    Status,
}

impl SortColumn {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "name" => Some(Self::Name),
            "email" => Some(Self::Email),
            "company" => Some(Self::Company),
            "registration_date" => Some(Self::RegistrationDate),
            "status" => Some(Self::Status),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Company => "company",
            Self::RegistrationDate => "registration_date",
            Self::Status => "status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Ascending),
            "desc" => Some(Self::Descending),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

/// The single active sort of a list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    /// Newest registrations first, the management table's initial view.
    fn default() -> Self {
        Self {
            column: SortColumn::RegistrationDate,
            direction: SortDirection::Descending,
        }
    }
}

impl SortSpec {
    /// Clicking a column header: the same column flips direction, a new column starts
    /// ascending.
    #[must_use]
    pub fn toggle(self, column: SortColumn) -> Self {
        let direction = if self.column == column && self.direction == SortDirection::Ascending {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        Self { column, direction }
    }

    /// Compares the selected column on two records: strings case-insensitively, dates by
    /// instant, ties broken by id so reruns come out identical. Descending reverses the
    /// whole thing.
    #[must_use]
    pub fn compare(&self, a: &ParticipantRecord, b: &ParticipantRecord) -> Ordering {
        let by_column = match self.column {
            SortColumn::Name => compare_text(&a.name, &b.name),
            SortColumn::Email => compare_text(&a.email.to_string(), &b.email.to_string()),
            SortColumn::Company => compare_text(&a.company, &b.company),
            SortColumn::RegistrationDate => a.registration_date.cmp(&b.registration_date),
            SortColumn::Status => a.status.as_str().cmp(b.status.as_str()),
        };
        let ordering = by_column.then_with(|| a.id.cmp(&b.id));
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Aggregate counts by status. Computed over the unfiltered roster for dashboard
/// statistics and over a filtered result for "N of M shown" readouts; callers track
/// which one they need.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub attended: usize,
    pub absent: usize,
}

impl StatusCounts {
    /// Attended share as a percentage with one decimal, for the dashboard's check-in
    /// rate card. An empty roster has a rate of zero.
    #[must_use]
    pub fn attendance_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let rate = self.attended as f64 / self.total as f64 * 100.0;
        (rate * 10.0).round() / 10.0
    }
}

#[must_use]
pub fn status_counts(records: &[ParticipantRecord]) -> StatusCounts {
    let mut counts = StatusCounts {
        total: records.len(),
        ..StatusCounts::default()
    };
    for record in records {
        match record.status {
            CheckInStatus::Pending => counts.pending += 1,
            CheckInStatus::Attended => counts.attended += 1,
            CheckInStatus::Absent => counts.absent += 1,
        }
    }
    counts
}

/// The ordered view a list page shows: every record passing the filter, stably sorted.
/// Does not mutate the roster.
#[must_use]
pub fn visible(
    roster: &[ParticipantRecord],
    filter: &FilterSpec,
    sort: &SortSpec,
) -> Vec<ParticipantRecord> {
    let mut result: Vec<ParticipantRecord> = roster
        .iter()
        .filter(|record| filter.matches(record))
        .cloned()
        .collect();
    result.sort_by(|a, b| sort.compare(a, b));
    result
}

/// Distinct companies on the roster, sorted, for the filter dropdown.
#[must_use]
pub fn companies(roster: &[ParticipantRecord]) -> Vec<String> {
    roster
        .iter()
        .map(|record| record.company.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
