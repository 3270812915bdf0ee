use {
    super::{roster::EventState, selection::SelectionSet},
    chrono::NaiveDateTime,
    serde::Serialize,
    std::fmt::Write,
    thiserror::Error,
};

/// The third-party endpoint that renders QR images. Regiverse only builds URLs against
/// it; no image bytes ever pass through this process.
const RENDER_ENDPOINT: &str = "https://api.qrserver.com/v1/create-qr-code/";

/// Nominal rendering time per code, used for the progress readout.
const SECONDS_PER_CODE: u64 = 2;

/// Builds the rendering URL for an opaque payload (a registration id).
#[must_use]
pub fn qr_image_url(payload: &str, size: u32) -> String {
    format!(
        "{RENDER_ENDPOINT}?size={size}x{size}&data={}",
        percent_escape(payload)
    )
}

/// Minimal percent-escaping for the `data` query value. Registration ids are plain
/// ASCII tokens, but a reissued badge payload could be anything.
fn percent_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                escaped.push(byte as char);
            }
            _ => {
                let _ = write!(escaped, "%{byte:02X}");
            }
        }
    }
    escaped
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Pdf,
    Zip,
}

impl OutputFormat {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "png" => Some(Self::Png),
            "pdf" => Some(Self::Pdf),
            "zip" => Some(Self::Zip),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeLayout {
    Standard,
    Badge,
    Ticket,
}

/// A design template codes can be generated against.
#[derive(Debug, Clone, Serialize)]
pub struct QrTemplate {
    pub id: String,
    pub name: String,
    pub description: String,
    pub layout: BadgeLayout,
    pub include_photo: bool,
    pub include_logo: bool,
}

/// The built-in template catalog. Static; there is no template editor.
#[must_use]
pub fn builtin_templates() -> Vec<QrTemplate> {
    vec![
        QrTemplate {
            id: "template-1".to_string(),
            name: "Standard QR Code".to_string(),
            description: "Simple QR code with participant information below".to_string(),
            layout: BadgeLayout::Standard,
            include_photo: false,
            include_logo: true,
        },
        QrTemplate {
            id: "template-2".to_string(),
            name: "Event Badge".to_string(),
            description: "Professional badge layout with photo and QR code".to_string(),
            layout: BadgeLayout::Badge,
            include_photo: true,
            include_logo: true,
        },
        QrTemplate {
            id: "template-3".to_string(),
            name: "Entry Ticket".to_string(),
            description: "Ticket-style design with QR code and event details".to_string(),
            layout: BadgeLayout::Ticket,
            include_photo: false,
            include_logo: true,
        },
    ]
}

/// Knobs of one generation run.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub format: OutputFormat,
    pub size: u32,
    pub include_participant_info: bool,
    pub template: String,
    pub batch_size: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Png,
            size: 256,
            include_participant_info: true,
            template: "template-1".to_string(),
            batch_size: 50,
        }
    }
}

/// One rendered code of a batch.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedCode {
    pub participant_id: String,
    pub participant_name: String,
    pub image_url: String,
    pub generated_at: NaiveDateTime,
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Idle,
    Generating,
    Completed,
}

/// Progress readout of a run. Generation itself is synchronous; the intermediate steps
/// only exist for the progress display's arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GenerationProgress {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub percentage: u8,
    pub status: GenerationStatus,
    pub seconds_remaining: u64,
}

impl GenerationProgress {
    #[must_use]
    pub fn idle() -> Self {
        Self {
            total: 0,
            completed: 0,
            failed: 0,
            percentage: 0,
            status: GenerationStatus::Idle,
            seconds_remaining: 0,
        }
    }

    /// The readout after `completed` successes and `failed` misses out of `total`.
    #[must_use]
    pub fn at_step(total: usize, completed: usize, failed: usize) -> Self {
        let done = completed + failed;
        let percentage = if total == 0 {
            100
        } else {
            (done * 100 / total) as u8
        };
        let remaining = total.saturating_sub(done);
        Self {
            total,
            completed,
            failed,
            percentage,
            status: if remaining == 0 {
                GenerationStatus::Completed
            } else {
                GenerationStatus::Generating
            },
            seconds_remaining: remaining as u64 * SECONDS_PER_CODE,
        }
    }
}

/// Generation is synchronous, so a recorded batch is already past the pending and
/// processing states a queued design would have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Completed,
    Failed,
}

/// One line of the batch history.
#[derive(Debug, Clone, Serialize)]
pub struct BatchRecord {
    pub id: String,
    pub created_at: NaiveDateTime,
    pub total_codes: usize,
    pub status: BatchStatus,
    pub download_url: Option<String>,
}

/// Everything a finished run hands back to the page.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub batch_id: String,
    pub codes: Vec<GeneratedCode>,
    pub progress: GenerationProgress,
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("No participants selected")]
    EmptySelection,
}

/// Renders one code per selected participant and appends the run to the batch history.
///
/// Selected ids no longer on the roster count as failed; the run itself is total and
/// synchronous, any perceived latency is the caller's business.
pub fn generate_batch(
    state: &mut EventState,
    selection: &SelectionSet,
    options: &GenerationOptions,
    now: NaiveDateTime,
) -> Result<BatchOutcome, GenerateError> {
    if selection.is_empty() {
        return Err(GenerateError::EmptySelection);
    }

    let codes: Vec<GeneratedCode> = selection
        .resolve(&state.roster)
        .into_iter()
        .map(|record| GeneratedCode {
            participant_id: record.id.clone(),
            participant_name: if options.include_participant_info {
                record.name.clone()
            } else {
                String::new()
            },
            image_url: qr_image_url(&record.qr_code, options.size),
            generated_at: now,
            format: options.format,
        })
        .collect();
    let failed = selection.len() - codes.len();

    let batch_id = state.next_batch_id();
    state.batches.insert(
        0,
        BatchRecord {
            id: batch_id.clone(),
            created_at: now,
            total_codes: codes.len(),
            status: if codes.is_empty() {
                BatchStatus::Failed
            } else {
                BatchStatus::Completed
            },
            download_url: None,
        },
    );

    Ok(BatchOutcome {
        batch_id,
        codes,
        progress: GenerationProgress::at_step(selection.len(), selection.len() - failed, failed),
    })
}
