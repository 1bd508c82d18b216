//! Summary step of the intake wizard: loading → ready/error → confirmed.
//!
//! The view owns the normalized record for one wizard session and renders it
//! as a printable Markdown document. Confirming hands the record (plus a fresh
//! record id) to the completion step. There is no way back from `Confirmed`,
//! and an in-flight request cannot be cancelled from here.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::pipeline::summary::{ClinicalSummaryResult, NormalizedSummary, SummaryError, VitalSigns};

/// Length of the record id shown on the document.
pub const RECORD_ID_LEN: usize = 9;

const MISSING_VITAL: &str = "...........";

const DISCLAIMER: &str = "Thông tin này được tổng hợp bởi Medi AI nhằm phục vụ cho công tác khám chữa bệnh được hiệu quả, KHÔNG LÀ CHẨN ĐOÁN CUỐI CÙNG TỪ BÁC SĨ.";

// ─── Types ────────────────────────────────────────────────────────────────────

/// What the summary step passes on to the completion step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionHandoff {
    pub summary_data: ClinicalSummaryResult,
    pub record_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryState {
    Loading,
    Ready(NormalizedSummary),
    /// User-facing message; the view offers a retry.
    Error(String),
    Confirmed(CompletionHandoff),
}

impl SummaryState {
    pub fn name(&self) -> &'static str {
        match self {
            SummaryState::Loading => "loading",
            SummaryState::Ready(_) => "ready",
            SummaryState::Error(_) => "error",
            SummaryState::Confirmed(_) => "confirmed",
        }
    }
}

/// Intake: a freshly generated summary awaiting patient confirmation.
/// Review: a doctor's past record, read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Intake,
    Review,
}

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("Cannot {action} while summary is {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },
}

/// A medication line on a doctor's record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prescription {
    pub name: String,
    pub dosage: String,
}

/// A doctor-authored visit record opened from the patient's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub id: u64,
    pub date: String,
    pub doctor: String,
    pub diagnosis: String,
    #[serde(default)]
    pub meds: Vec<Prescription>,
    #[serde(default, alias = "vitals")]
    pub vital_signs: VitalSigns,
}

impl VisitRecord {
    pub fn to_summary(&self) -> ClinicalSummaryResult {
        ClinicalSummaryResult {
            symptoms: vec![self.diagnosis.clone()],
            medicines: self
                .meds
                .iter()
                .map(|m| format!("{} ({})", m.name, m.dosage))
                .collect(),
            vital_signs: self.vital_signs.clone(),
            clinical_note: format!("Chẩn đoán bởi {}", self.doctor),
        }
    }
}

// ─── View ─────────────────────────────────────────────────────────────────────

pub struct SummaryView {
    state: SummaryState,
    mode: ViewMode,
    record_id: String,
    signed_at: DateTime<Local>,
    doctor: Option<String>,
}

impl SummaryView {
    /// A new intake summary waiting on its model call.
    pub fn loading() -> Self {
        Self {
            state: SummaryState::Loading,
            mode: ViewMode::Intake,
            record_id: generate_record_id(),
            signed_at: Local::now(),
            doctor: None,
        }
    }

    /// Read-only view over a doctor's record. Starts (and stays) ready.
    pub fn from_visit_record(record: &VisitRecord) -> Self {
        Self {
            state: SummaryState::Ready(NormalizedSummary::Parsed(record.to_summary())),
            mode: ViewMode::Review,
            record_id: format!("{:0width$}", record.id, width = RECORD_ID_LEN),
            signed_at: Local::now(),
            doctor: Some(record.doctor.clone()),
        }
    }

    pub fn state(&self) -> &SummaryState {
        &self.state
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn is_loading(&self) -> bool {
        self.state == SummaryState::Loading
    }

    pub fn summary(&self) -> Option<&NormalizedSummary> {
        match &self.state {
            SummaryState::Ready(summary) => Some(summary),
            _ => None,
        }
    }

    /// Settle the outstanding request. Only valid while loading.
    pub fn resolve(
        &mut self,
        outcome: Result<NormalizedSummary, SummaryError>,
    ) -> Result<(), ViewError> {
        self.expect_state(SummaryState::Loading.name(), "resolve")?;
        self.state = match outcome {
            Ok(summary) => SummaryState::Ready(summary),
            Err(e) => {
                tracing::warn!(error = %e, record_id = %self.record_id, "Summary request failed");
                SummaryState::Error(user_message(&e))
            }
        };
        Ok(())
    }

    /// Retry after an error: back to loading.
    pub fn retry(&mut self) -> Result<(), ViewError> {
        self.expect_state("error", "retry")?;
        self.state = SummaryState::Loading;
        Ok(())
    }

    pub fn can_confirm(&self) -> bool {
        self.mode == ViewMode::Intake && matches!(self.state, SummaryState::Ready(_))
    }

    /// Accept the record and produce the completion hand-off.
    pub fn confirm(&mut self) -> Result<CompletionHandoff, ViewError> {
        if !self.can_confirm() {
            return Err(ViewError::InvalidTransition {
                state: match self.mode {
                    ViewMode::Review => "read-only",
                    ViewMode::Intake => self.state.name(),
                },
                action: "confirm",
            });
        }
        let summary = self.summary().map(NormalizedSummary::result).unwrap_or_default();
        let handoff = CompletionHandoff {
            summary_data: summary,
            record_id: self.record_id.clone(),
        };
        tracing::info!(record_id = %handoff.record_id, "Summary confirmed");
        self.state = SummaryState::Confirmed(handoff.clone());
        Ok(handoff)
    }

    /// Printable record. `None` unless ready or confirmed.
    pub fn render_document(&self, transcript: &str) -> Option<String> {
        let (result, degraded) = match &self.state {
            SummaryState::Ready(summary) => (summary.result(), summary.is_degraded()),
            SummaryState::Confirmed(handoff) => (handoff.summary_data.clone(), false),
            _ => return None,
        };
        Some(self.render(&result, degraded, transcript))
    }

    fn render(&self, result: &ClinicalSummaryResult, degraded: bool, transcript: &str) -> String {
        let mut doc = String::new();

        let title = match self.mode {
            ViewMode::Intake => "HỒ SƠ BỆNH ÁN ĐIỆN TỬ SƠ BỘ",
            ViewMode::Review => "HỒ SƠ CHẨN ĐOÁN ĐIỆN TỬ",
        };
        doc.push_str(&format!("# {title}\n\n"));
        doc.push_str(&format!(
            "Mã hồ sơ: {} · Ngày thực hiện: {}\n",
            self.record_id,
            self.signed_at.format("%d/%m/%Y %H:%M")
        ));
        match &self.doctor {
            Some(doctor) => doc.push_str(&format!("Bác sĩ thực hiện: {doctor}\n")),
            None => doc.push_str("Chi tiết hồ sơ bệnh án khởi tạo bởi Medi AI\n"),
        }

        doc.push_str("\n## Triệu chứng sơ bộ\n\n");
        push_list(&mut doc, &result.symptoms, "Chưa ghi nhận triệu chứng");

        let quote = match self.mode {
            ViewMode::Review if transcript.trim().is_empty() => {
                "Hồ sơ được khởi tạo từ dữ liệu khám lâm sàng."
            }
            _ => transcript.trim(),
        };
        if !quote.is_empty() {
            doc.push_str(&format!("\n> \"{quote}\"\n"));
        }

        doc.push_str("\n## Thuốc\n\n");
        push_list(&mut doc, &result.medicines, "Chưa ghi nhận thuốc");

        doc.push_str("\n## Dấu hiệu sinh tồn\n\n");
        for (label, value) in vital_rows(&result.vital_signs) {
            let shown = value.filter(|v| !v.trim().is_empty()).unwrap_or(MISSING_VITAL);
            doc.push_str(&format!("- {label}: {shown}\n"));
        }

        doc.push_str("\n## Ghi chú lâm sàng\n\n");
        if result.clinical_note.trim().is_empty() {
            doc.push_str(&format!("{MISSING_VITAL}\n"));
        } else {
            doc.push_str(result.clinical_note.trim());
            doc.push('\n');
        }

        if degraded {
            doc.push_str(
                "\n> Lưu ý: AI không trả về dữ liệu có cấu trúc, nội dung gốc được giữ nguyên ở phần ghi chú.\n",
            );
        }

        doc.push_str(&format!("\n---\n\n_{DISCLAIMER}_\n"));
        doc
    }

    fn expect_state(&self, expected: &'static str, action: &'static str) -> Result<(), ViewError> {
        if self.state.name() == expected {
            Ok(())
        } else {
            Err(ViewError::InvalidTransition {
                state: self.state.name(),
                action,
            })
        }
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// 9 uppercase base-36 characters.
pub fn generate_record_id() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..RECORD_ID_LEN)
        .map(|_| {
            let digit = rng.gen_range(0..36u32);
            std::char::from_digit(digit, 36)
                .unwrap_or('0')
                .to_ascii_uppercase()
        })
        .collect()
}

fn user_message(error: &SummaryError) -> String {
    match error {
        SummaryError::Configuration(_) => {
            "Không tìm thấy API Key trong cấu hình hệ thống.".to_string()
        }
        SummaryError::Validation(detail) => detail.clone(),
        other => format!("Lỗi: {other}"),
    }
}

fn vital_rows(vitals: &VitalSigns) -> [(&'static str, Option<&str>); 6] {
    [
        ("Mạch (L/ph)", vitals.pulse.as_deref()),
        ("Nhiệt độ (°C)", vitals.temperature.as_deref()),
        ("Huyết áp (mmHg)", vitals.blood_pressure.as_deref()),
        ("Nhịp thở (L/ph)", vitals.respiratory_rate.as_deref()),
        ("Chiều cao (cm)", vitals.height.as_deref()),
        ("Cân nặng (kg)", vitals.weight.as_deref()),
    ]
}

fn push_list(doc: &mut String, items: &[String], empty: &str) {
    let items: Vec<&str> = items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        doc.push_str(&format!("_{empty}_\n"));
    } else {
        for item in items {
            doc.push_str(&format!("- {item}\n"));
        }
    }
}
