//! Issue and Verify state machines.
//!
//! Both protocols move strictly forward through their states. A
//! [`Machine`] records every state it passes through and refuses any
//! transition other than the next one in sequence, or a move to `Failed`
//! from a non-terminal state.

use std::fmt::Debug;

use tracing::debug;

use crate::error::{Stage, StageFailure, VaultError};

/// Shared behaviour of the two protocol state types.
pub trait ProtocolState: Copy + Debug + PartialEq {
    /// Protocol name, for logs.
    const PROTOCOL: &'static str;

    /// The starting state.
    fn initial() -> Self;

    /// Whether `next` is a legal successor of `self`.
    fn allows(&self, next: Self) -> bool;

    /// The stage that a failure in this state is attributed to.
    fn pending_stage(&self) -> Option<Stage>;

    /// The terminal failure state for `stage`.
    fn failed(stage: Stage) -> Self;

    fn is_terminal(&self) -> bool {
        self.pending_stage().is_none()
    }
}

/// Issue protocol states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueState {
    Idle,
    /// The issuer answered the request.
    Requested,
    /// The issuer's signature and document were checked.
    Signed,
    Encrypted,
    Published,
    /// The vault record is persisted.
    Done,
    Failed(Stage),
}

impl ProtocolState for IssueState {
    const PROTOCOL: &'static str = "issue";

    fn initial() -> Self {
        IssueState::Idle
    }

    fn allows(&self, next: Self) -> bool {
        use IssueState::*;
        match (self, next) {
            (Idle, Requested)
            | (Requested, Signed)
            | (Signed, Encrypted)
            | (Encrypted, Published)
            | (Published, Done) => true,
            (from, Failed(_)) => !from.is_terminal(),
            _ => false,
        }
    }

    fn pending_stage(&self) -> Option<Stage> {
        match self {
            IssueState::Idle => Some(Stage::Request),
            IssueState::Requested => Some(Stage::Sign),
            IssueState::Signed => Some(Stage::Encrypt),
            IssueState::Encrypted => Some(Stage::Publish),
            IssueState::Published => Some(Stage::Persist),
            IssueState::Done | IssueState::Failed(_) => None,
        }
    }

    fn failed(stage: Stage) -> Self {
        IssueState::Failed(stage)
    }
}

/// Verify protocol states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyState {
    Idle,
    Fetching,
    Decrypting,
    Validating,
    Verified,
    Rejected,
    Failed(Stage),
}

impl ProtocolState for VerifyState {
    const PROTOCOL: &'static str = "verify";

    fn initial() -> Self {
        VerifyState::Idle
    }

    fn allows(&self, next: Self) -> bool {
        use VerifyState::*;
        match (self, next) {
            (Idle, Fetching)
            | (Fetching, Decrypting)
            | (Decrypting, Validating)
            | (Validating, Verified)
            | (Validating, Rejected) => true,
            (from, Failed(_)) => !from.is_terminal(),
            _ => false,
        }
    }

    fn pending_stage(&self) -> Option<Stage> {
        match self {
            VerifyState::Idle | VerifyState::Fetching => Some(Stage::Fetch),
            VerifyState::Decrypting => Some(Stage::Decrypt),
            VerifyState::Validating => Some(Stage::Validate),
            VerifyState::Verified | VerifyState::Rejected | VerifyState::Failed(_) => None,
        }
    }

    fn failed(stage: Stage) -> Self {
        VerifyState::Failed(stage)
    }
}

/// A running protocol instance.
#[derive(Debug, Clone)]
pub struct Machine<S: ProtocolState> {
    state: S,
    trace: Vec<S>,
}

impl<S: ProtocolState> Default for Machine<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ProtocolState> Machine<S> {
    pub fn new() -> Self {
        let initial = S::initial();
        Self {
            state: initial,
            trace: vec![initial],
        }
    }

    /// Current state.
    pub fn state(&self) -> S {
        self.state
    }

    /// Every state visited, in order.
    pub fn trace(&self) -> &[S] {
        &self.trace
    }

    /// Move to `next`, failing if the transition is not allowed.
    pub fn advance(&mut self, next: S) -> Result<(), StageFailure> {
        if !self.state.allows(next) {
            return Err(StageFailure::new(
                self.current_stage(),
                VaultError::IllegalTransition(format!("{:?} -> {:?}", self.state, next)),
            ));
        }
        debug!(protocol = S::PROTOCOL, from = ?self.state, to = ?next, "state transition");
        self.state = next;
        self.trace.push(next);
        Ok(())
    }

    /// Move to the terminal failure state for the current stage.
    pub fn fail(&mut self, error: impl Into<VaultError>) -> StageFailure {
        let error = error.into();
        let stage = self.current_stage();
        if !self.state.is_terminal() {
            let failed = S::failed(stage);
            debug!(protocol = S::PROTOCOL, from = ?self.state, %stage, %error, "state transition");
            self.state = failed;
            self.trace.push(failed);
        }
        StageFailure { stage, error }
    }

    /// The stage in progress, or the last one worked on once terminal.
    fn current_stage(&self) -> Stage {
        self.trace
            .iter()
            .rev()
            .find_map(|s| s.pending_stage())
            .unwrap_or(Stage::Request)
    }
}
