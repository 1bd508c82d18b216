//! Three-step intake wizard: Intake → Summary → Completion.
//!
//! The session keeps the intake request across steps so the patient can go back
//! and edit it. It also owns the one outstanding summary request: each
//! submission or retry hands out a `SummaryTicket`, and only the holder of the
//! current ticket may settle the summary view.

use serde::Serialize;
use uuid::Uuid;

use crate::pipeline::summary::{ClinicalSummaryRequest, NormalizedSummary, SummaryError};
use crate::summary_view::{CompletionHandoff, SummaryState, SummaryView, ViewError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardStep {
    Intake,
    Summary,
    Completion,
}

impl WizardStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            WizardStep::Intake => "intake",
            WizardStep::Summary => "summary",
            WizardStep::Completion => "completion",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("A summary request is already in progress")]
    SubmissionInFlight,

    #[error("Missing transcript or images")]
    EmptyIntake,

    #[error("Summary ticket does not match the outstanding request")]
    StaleTicket,

    #[error("Cannot {action} at the {step} step")]
    InvalidStep {
        step: &'static str,
        action: &'static str,
    },

    #[error(transparent)]
    View(#[from] ViewError),
}

/// Proof of the outstanding summary request. Not `Clone`: one ticket, one settle.
#[derive(Debug, PartialEq, Eq)]
pub struct SummaryTicket(Uuid);

impl SummaryTicket {
    pub fn id(&self) -> Uuid {
        self.0
    }
}

pub struct WizardSession {
    id: Uuid,
    step: WizardStep,
    request: ClinicalSummaryRequest,
    view: Option<SummaryView>,
    pending: Option<Uuid>,
    handoff: Option<CompletionHandoff>,
}

impl Default for WizardSession {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            step: WizardStep::Intake,
            request: ClinicalSummaryRequest::default(),
            view: None,
            pending: None,
            handoff: None,
        }
    }

    /// Sent as `x-session-id` so the server applies the same single-flight rule.
    pub fn session_id(&self) -> String {
        self.id.to_string()
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn request(&self) -> &ClinicalSummaryRequest {
        &self.request
    }

    pub fn view(&self) -> Option<&SummaryView> {
        self.view.as_ref()
    }

    pub fn handoff(&self) -> Option<&CompletionHandoff> {
        self.handoff.as_ref()
    }

    pub fn is_in_flight(&self) -> bool {
        self.pending.is_some()
    }

    /// Move from intake to the summary step and start a request.
    pub fn submit_intake(
        &mut self,
        request: ClinicalSummaryRequest,
    ) -> Result<SummaryTicket, WizardError> {
        if self.pending.is_some() {
            return Err(WizardError::SubmissionInFlight);
        }
        self.require_step(WizardStep::Intake, "submit intake")?;
        if !request.has_content() {
            return Err(WizardError::EmptyIntake);
        }

        tracing::debug!(
            session_id = %self.id,
            images = request.image_count(),
            "Intake submitted"
        );
        self.request = request;
        self.view = Some(SummaryView::loading());
        self.step = WizardStep::Summary;
        Ok(self.take_slot())
    }

    /// Settle the outstanding request and free the slot.
    pub fn resolve_summary(
        &mut self,
        ticket: SummaryTicket,
        outcome: Result<NormalizedSummary, SummaryError>,
    ) -> Result<(), WizardError> {
        if self.pending != Some(ticket.0) {
            return Err(WizardError::StaleTicket);
        }
        self.pending = None;
        let view = self.summary_view_mut("resolve summary")?;
        view.resolve(outcome)?;
        Ok(())
    }

    /// Re-run the summary request after an error, with the same intake.
    pub fn retry_summary(&mut self) -> Result<SummaryTicket, WizardError> {
        if self.pending.is_some() {
            return Err(WizardError::SubmissionInFlight);
        }
        self.summary_view_mut("retry summary")?.retry()?;
        Ok(self.take_slot())
    }

    /// Back to intake from a settled summary. The request is kept for editing.
    pub fn edit_intake(&mut self) -> Result<&ClinicalSummaryRequest, WizardError> {
        if self.pending.is_some() {
            return Err(WizardError::SubmissionInFlight);
        }
        let settled = matches!(
            self.summary_view_mut("edit intake")?.state(),
            SummaryState::Ready(_) | SummaryState::Error(_)
        );
        if !settled {
            return Err(WizardError::InvalidStep {
                step: self.step.as_str(),
                action: "edit intake",
            });
        }
        self.view = None;
        self.step = WizardStep::Intake;
        Ok(&self.request)
    }

    /// Accept the summary and move on to completion.
    pub fn confirm(&mut self) -> Result<&CompletionHandoff, WizardError> {
        let handoff = self.summary_view_mut("confirm")?.confirm()?;
        self.step = WizardStep::Completion;
        Ok(&*self.handoff.insert(handoff))
    }

    fn take_slot(&mut self) -> SummaryTicket {
        let id = Uuid::new_v4();
        self.pending = Some(id);
        SummaryTicket(id)
    }

    fn require_step(&self, step: WizardStep, action: &'static str) -> Result<(), WizardError> {
        if self.step == step {
            Ok(())
        } else {
            Err(WizardError::InvalidStep {
                step: self.step.as_str(),
                action,
            })
        }
    }

    fn summary_view_mut(&mut self, action: &'static str) -> Result<&mut SummaryView, WizardError> {
        self.require_step(WizardStep::Summary, action)?;
        self.view.as_mut().ok_or(WizardError::InvalidStep {
            step: WizardStep::Summary.as_str(),
            action,
        })
    }
}
