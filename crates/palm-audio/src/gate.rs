//! Gate states and transitions

use palm_core::{PipelineError, PipelineResult};

/// Where the audio context stands with respect to platform unlock policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GateState {
    /// No user gesture yet; playback is forbidden.
    Locked,
    /// A gesture was consumed and the context resume is in flight.
    Unlocking,
    /// The context is running; playback is allowed.
    Unlocked,
}

/// Proof that a genuine user gesture happened.
///
/// The token is not `Clone` and has exactly one constructor, so every
/// unlock attempt is backed by one real gesture. Call
/// [`from_user_event`](Self::from_user_event) only from an input event
/// handler.
#[derive(Debug)]
pub struct UserActivation {
    _gesture: (),
}

impl UserActivation {
    pub fn from_user_event() -> Self {
        UserActivation { _gesture: () }
    }
}

/// The unlock gate for an audio context.
#[derive(Debug)]
pub struct AudioGate {
    state: GateState,
}

impl AudioGate {
    pub fn new() -> Self {
        AudioGate {
            state: GateState::Locked,
        }
    }

    #[inline]
    pub fn state(&self) -> GateState {
        self.state
    }

    /// True only while the context is unlocked and running.
    #[inline]
    pub fn playback_allowed(&self) -> bool {
        self.state == GateState::Unlocked
    }

    /// Consume a user gesture and start the resume attempt.
    ///
    /// Only meaningful from `Locked`; in any other state the token is
    /// consumed and nothing changes.
    pub fn begin_unlock(&mut self, _activation: UserActivation) {
        if self.state == GateState::Locked {
            tracing::debug!("audio unlock started");
            self.state = GateState::Unlocking;
        }
    }

    /// The platform resume completed.
    pub fn confirm_resumed(&mut self) {
        if self.state == GateState::Unlocking {
            tracing::info!("audio context unlocked");
            self.state = GateState::Unlocked;
        }
    }

    /// The platform resume failed. The gate stays in `Unlocking`: the user
    /// retries the interaction, and the next resume outcome arrives through
    /// [`confirm_resumed`](Self::confirm_resumed) or here again.
    pub fn resume_failed(&mut self) -> PipelineResult<()> {
        if self.state == GateState::Unlocking {
            tracing::warn!("audio context resume failed; awaiting retry");
            return Err(PipelineError::AudioUnlockFailed);
        }
        Ok(())
    }

    /// The audio context was invalidated from outside (device change,
    /// context teardown). Forces `Locked` from any state.
    pub fn invalidate(&mut self) {
        if self.state != GateState::Locked {
            tracing::info!(from = ?self.state, "audio context invalidated; gate relocked");
        }
        self.state = GateState::Locked;
    }
}

impl Default for AudioGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_locked_and_silent() {
        let gate = AudioGate::new();
        assert_eq!(gate.state(), GateState::Locked);
        assert!(!gate.playback_allowed());
    }

    #[test]
    fn test_full_unlock_path() {
        let mut gate = AudioGate::new();

        gate.begin_unlock(UserActivation::from_user_event());
        assert_eq!(gate.state(), GateState::Unlocking);
        assert!(!gate.playback_allowed());

        gate.confirm_resumed();
        assert_eq!(gate.state(), GateState::Unlocked);
        assert!(gate.playback_allowed());
    }

    #[test]
    fn test_resume_failure_awaits_retry() {
        let mut gate = AudioGate::new();

        gate.begin_unlock(UserActivation::from_user_event());
        assert_eq!(
            gate.resume_failed(),
            Err(PipelineError::AudioUnlockFailed)
        );
        assert_eq!(gate.state(), GateState::Unlocking);
        assert!(!gate.playback_allowed());

        // A retried resume can still succeed.
        gate.confirm_resumed();
        assert!(gate.playback_allowed());
    }

    #[test]
    fn test_redundant_gesture_is_ignored_once_unlocked() {
        let mut gate = AudioGate::new();
        gate.begin_unlock(UserActivation::from_user_event());
        gate.confirm_resumed();

        gate.begin_unlock(UserActivation::from_user_event());
        assert_eq!(gate.state(), GateState::Unlocked);
    }

    #[test]
    fn test_confirm_without_attempt_does_nothing() {
        let mut gate = AudioGate::new();
        gate.confirm_resumed();
        assert_eq!(gate.state(), GateState::Locked);

        assert_eq!(gate.resume_failed(), Ok(()));
        assert_eq!(gate.state(), GateState::Locked);
    }

    #[test]
    fn test_invalidation_forces_locked_from_any_state() {
        let mut gate = AudioGate::new();
        gate.begin_unlock(UserActivation::from_user_event());
        gate.confirm_resumed();
        assert!(gate.playback_allowed());

        gate.invalidate();
        assert_eq!(gate.state(), GateState::Locked);
        assert!(!gate.playback_allowed());

        // Idempotent from Locked.
        gate.invalidate();
        assert_eq!(gate.state(), GateState::Locked);
    }
}
