use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

use crate::ai::prompt::prompt_for_mode;
use crate::ai::{request_completion, AbortController, AbortSignal, Mode, VisionModel};
use crate::document::Document;
use crate::error::{AnalysisError, ClientError, SessionError};
use crate::extraction::{normalize, Normalized};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", content = "detail")]
pub enum ViewState {
    Idle,
    FileSelected,
    Loading,
    Success(Normalized),
    Failed(String),
}

impl ViewState {
    fn name(&self) -> &'static str {
        match self {
            ViewState::Idle => "idle",
            ViewState::FileSelected => "file selected",
            ViewState::Loading => "loading",
            ViewState::Success(_) => "showing a result",
            ViewState::Failed(_) => "showing an error",
        }
    }
}

/// Everything a single analysis needs once the session lock is released.
#[derive(Debug, Clone)]
pub struct AnalysisTicket {
    pub generation: u64,
    pub mode: Mode,
    pub document: Arc<Document>,
    pub signal: AbortSignal,
}

/// View-layer state for one upload panel.
///
/// At most one analysis is in flight. Starting another, picking a new file,
/// switching mode or resetting aborts it, and its generation stops being
/// current so a late completion is never shown.
pub struct SessionManager {
    mode: Mode,
    document: Option<Arc<Document>>,
    state: ViewState,
    generation: u64,
    in_flight: Option<AbortController>,
}

impl SessionManager {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            document: None,
            state: ViewState::Idle,
            generation: 0,
            in_flight: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loading(&self) -> bool {
        self.state == ViewState::Loading
    }

    pub fn select_file(&mut self, document: Document) {
        self.abort_in_flight();
        log::debug!("Selected {} ({})", document.name, document.kind.mime());
        self.document = Some(Arc::new(document));
        self.state = ViewState::FileSelected;
    }

    /// Switching schema mid-result is not supported: everything is cleared.
    pub fn set_mode(&mut self, mode: Mode) {
        if mode == self.mode {
            return;
        }
        log::debug!("Mode {} -> {}", self.mode, mode);
        self.mode = mode;
        self.reset();
    }

    pub fn reset(&mut self) {
        self.abort_in_flight();
        self.document = None;
        self.state = ViewState::Idle;
    }

    /// Aborts the in-flight analysis, keeping the selected file.
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        if !self.is_loading() {
            return Err(SessionError::InvalidTransition {
                action: "cancel",
                state: self.state.name(),
            });
        }
        self.abort_in_flight();
        self.state = ViewState::FileSelected;
        Ok(())
    }

    pub fn begin_analysis(&mut self) -> Result<AnalysisTicket, SessionError> {
        let document = self.document.clone().ok_or(SessionError::NoDocument)?;

        self.abort_in_flight();
        let controller = AbortController::new();
        let signal = controller.signal();
        self.in_flight = Some(controller);
        self.generation += 1;
        self.state = ViewState::Loading;
        log::debug!("Analysis #{} of {} started", self.generation, document.name);

        Ok(AnalysisTicket {
            generation: self.generation,
            mode: self.mode,
            document,
            signal,
        })
    }

    pub fn retry(&mut self) -> Result<AnalysisTicket, SessionError> {
        match self.state {
            ViewState::Success(_) | ViewState::Failed(_) => self.begin_analysis(),
            _ => Err(SessionError::InvalidTransition {
                action: "retry",
                state: self.state.name(),
            }),
        }
    }

    /// Applies an outcome. Returns `false` when it was dropped as stale or aborted.
    pub fn complete(
        &mut self,
        generation: u64,
        outcome: Result<Normalized, AnalysisError>,
    ) -> bool {
        if generation != self.generation || !self.is_loading() {
            log::debug!(
                "Dropping outcome of analysis #{} (current #{}, {})",
                generation,
                self.generation,
                self.state.name()
            );
            return false;
        }

        self.state = match outcome {
            Ok(result) => ViewState::Success(result),
            Err(e) if e.is_silent() => return false,
            Err(e) => {
                log::warn!("Analysis #{} failed: {}", generation, e);
                ViewState::Failed(e.user_message())
            }
        };
        self.in_flight = None;
        true
    }

    fn abort_in_flight(&mut self) {
        if let Some(controller) = self.in_flight.take() {
            controller.abort();
        }
    }
}

/// Calls the model and normalizes its answer. The Normalizer never runs for an
/// aborted ticket.
pub async fn run_analysis(
    model: &dyn VisionModel,
    ticket: &AnalysisTicket,
) -> Result<Normalized, AnalysisError> {
    let response = request_completion(
        model,
        prompt_for_mode(ticket.mode),
        &ticket.document,
        &ticket.signal,
    )
    .await?;

    if ticket.signal.is_aborted() {
        return Err(ClientError::Aborted.into());
    }

    log::info!(
        "{} answered for {} via {}",
        response.provider,
        ticket.document.name,
        response.model
    );
    Ok(normalize(&response.content, ticket.mode)?)
}

/// Starts an analysis for the selected file and applies its outcome, without
/// holding the session lock across the network call.
pub async fn analyze(
    session: &Arc<Mutex<SessionManager>>,
    model: &dyn VisionModel,
) -> Result<bool, SessionError> {
    let ticket = session.lock().begin_analysis()?;
    let outcome = run_analysis(model, &ticket).await;
    Ok(session.lock().complete(ticket.generation, outcome))
}
