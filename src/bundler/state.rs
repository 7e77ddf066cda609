//! Pipeline state tracking.

use crate::bundler::error::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Phase of a packaging run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PackagerPhase {
    /// Nothing written yet
    Init,
    /// App folder, jar, resources and runtime in place
    StructureAssembled,
    /// Launcher created and executable
    PlatformAppCreated,
    /// Installers and generic bundles written
    InstallersGenerated,
    /// Artifacts returned to the caller
    Done,
    /// A stage failed; the run is over
    Failed,
}

impl PackagerPhase {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PackagerPhase::Done | PackagerPhase::Failed)
    }

    fn can_advance_to(self, next: PackagerPhase) -> bool {
        use PackagerPhase::*;
        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Init, StructureAssembled)
            | (StructureAssembled, PlatformAppCreated)
            | (PlatformAppCreated, InstallersGenerated)
            | (PlatformAppCreated, Done)
            | (InstallersGenerated, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PackagerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PackagerPhase::Init => "init",
            PackagerPhase::StructureAssembled => "structure assembled",
            PackagerPhase::PlatformAppCreated => "platform app created",
            PackagerPhase::InstallersGenerated => "installers generated",
            PackagerPhase::Done => "done",
            PackagerPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One entry of the phase history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseRecord {
    /// Phase entered
    pub phase: PackagerPhase,
    /// What happened on entry, e.g. the failure message
    pub note: Option<String>,
}

/// Current phase of a run and how it got there.
#[derive(Debug, Clone, Serialize)]
pub struct PackagerState {
    current: PackagerPhase,
    history: Vec<PhaseRecord>,
}

impl Default for PackagerState {
    fn default() -> Self {
        Self::new()
    }
}

impl PackagerState {
    /// Starts in [`PackagerPhase::Init`].
    pub fn new() -> Self {
        Self {
            current: PackagerPhase::Init,
            history: vec![PhaseRecord {
                phase: PackagerPhase::Init,
                note: None,
            }],
        }
    }

    /// Current phase.
    pub fn current(&self) -> PackagerPhase {
        self.current
    }

    /// Every phase entered, in order.
    pub fn history(&self) -> &[PhaseRecord] {
        &self.history
    }

    /// Moves to `next`, rejecting transitions the pipeline never makes.
    pub fn advance(&mut self, next: PackagerPhase, note: Option<String>) -> Result<()> {
        if !self.current.can_advance_to(next) {
            return Err(Error::GenericError(format!(
                "illegal packager state transition from {} to {}",
                self.current, next
            )));
        }
        log::debug!("packager state: {} -> {}", self.current, next);
        self.current = next;
        self.history.push(PhaseRecord { phase: next, note });
        Ok(())
    }

    /// Records a failure. Ignored once the run is already over.
    pub fn fail(&mut self, reason: impl Into<String>) {
        let _ = self.advance(PackagerPhase::Failed, Some(reason.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PackagerPhase::*;

    #[test]
    fn full_run_is_recorded() {
        let mut state = PackagerState::new();
        for phase in [StructureAssembled, PlatformAppCreated, InstallersGenerated, Done] {
            state.advance(phase, None).unwrap();
        }
        let phases: Vec<_> = state.history().iter().map(|r| r.phase).collect();
        assert_eq!(
            phases,
            vec![
                Init,
                StructureAssembled,
                PlatformAppCreated,
                InstallersGenerated,
                Done
            ]
        );
    }

    #[test]
    fn installers_may_be_skipped() {
        let mut state = PackagerState::new();
        state.advance(StructureAssembled, None).unwrap();
        state.advance(PlatformAppCreated, None).unwrap();
        state.advance(Done, None).unwrap();
        assert_eq!(state.current(), Done);
    }

    #[test]
    fn skipping_a_stage_is_rejected() {
        let mut state = PackagerState::new();
        assert!(state.advance(PlatformAppCreated, None).is_err());
        assert_eq!(state.current(), Init);
    }

    #[test]
    fn failure_is_terminal() {
        let mut state = PackagerState::new();
        state.advance(StructureAssembled, None).unwrap();
        state.fail("jlink failed");
        assert_eq!(state.current(), Failed);
        assert_eq!(state.history().last().unwrap().note.as_deref(), Some("jlink failed"));
        assert!(state.advance(PlatformAppCreated, None).is_err());
        state.fail("again");
        assert_eq!(state.history().len(), 3);
    }
}
