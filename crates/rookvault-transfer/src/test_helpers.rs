//! In-memory [`StageRunner`] for tests.

use crate::runner::{StageKind, StageOutput, StageRunner};
use async_trait::async_trait;
use rookvault_core::AppError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub kind: StageKind,
    pub args: Vec<String>,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<RecordedCall>,
    responses: HashMap<StageKind, StageOutput>,
    delay: Option<Duration>,
    in_flight: usize,
    max_in_flight: usize,
}

/// Records every call and answers with scripted outputs (success with empty output by default).
///
/// `Export` behaves like `rbd export` on success: it writes a file at its destination argument,
/// so tests can observe what the pipeline leaves on disk. `Download` does the same for the
/// destination of `s3 cp`.
#[derive(Clone, Default)]
pub struct FakeRunner {
    state: Arc<Mutex<FakeState>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every later `kind` call with `output`.
    pub fn respond(&self, kind: StageKind, output: StageOutput) -> &Self {
        self.state().responses.insert(kind, output);
        self
    }

    /// Make `kind` exit with status 1 and `output`.
    pub fn fail(&self, kind: StageKind, output: &str) -> &Self {
        self.respond(kind, StageOutput::failure(Some(1), output))
    }

    /// Hold every call for `delay` before answering.
    pub fn with_delay(&self, delay: Duration) -> &Self {
        self.state().delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    pub fn kinds(&self) -> Vec<StageKind> {
        self.state().calls.iter().map(|c| c.kind).collect()
    }

    pub fn count(&self, kind: StageKind) -> usize {
        self.state().calls.iter().filter(|c| c.kind == kind).count()
    }

    /// Highest number of calls that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.state().max_in_flight
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl StageRunner for FakeRunner {
    async fn run(&self, kind: StageKind, args: &[String]) -> Result<StageOutput, AppError> {
        let (output, delay) = {
            let mut state = self.state();
            state.calls.push(RecordedCall {
                kind,
                args: args.to_vec(),
            });
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            let output = state
                .responses
                .get(&kind)
                .cloned()
                .unwrap_or_else(|| StageOutput::success(""));
            (output, state.delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let written = match destination(kind, args) {
            Some(target) if output.is_success() => tokio::fs::write(target, b"image-bytes").await,
            _ => Ok(()),
        };

        self.state().in_flight -= 1;
        written.map_err(|e| AppError::Internal(format!("fake {kind} could not write: {e}")))?;
        Ok(output)
    }
}

/// File a stage produces: `rbd export <pool/image> <file>` and `s3 cp <url> <file> ...`.
fn destination(kind: StageKind, args: &[String]) -> Option<&String> {
    match kind {
        StageKind::Export => args.get(2),
        StageKind::Download => args.get(3),
        _ => None,
    }
}
