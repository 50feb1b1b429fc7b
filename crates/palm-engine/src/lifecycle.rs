//! Scoped ownership of a running engine
//!
//! Teardown has exactly one entry point. Whoever owns the guard can call
//! [`teardown`](ScopedEngine::teardown) early (page hide, navigation); if
//! nobody does, `Drop` runs the same path. Both routes funnel into the
//! engine's idempotent `destroy`, so redundant invocations are harmless.

use std::ops::{Deref, DerefMut};

use crate::engine::{Engine, Renderer};

/// Lifecycle guard owning an [`Engine`].
pub struct ScopedEngine<R: Renderer> {
    engine: Engine<R>,
}

impl<R: Renderer> ScopedEngine<R> {
    pub fn new(engine: Engine<R>) -> Self {
        ScopedEngine { engine }
    }

    /// Destroy the engine now instead of at scope exit. Idempotent.
    pub fn teardown(&mut self) {
        self.engine.destroy();
    }
}

impl<R: Renderer> Deref for ScopedEngine<R> {
    type Target = Engine<R>;

    fn deref(&self) -> &Self::Target {
        &self.engine
    }
}

impl<R: Renderer> DerefMut for ScopedEngine<R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.engine
    }
}

impl<R: Renderer> Drop for ScopedEngine<R> {
    fn drop(&mut self) {
        self.engine.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineConfig, EngineState, RenderFrame};
    use crate::event::topic;
    use palm_bus::EventBus;
    use palm_channel::Frame;
    use std::sync::Arc;

    struct NullRenderer;

    impl Renderer for NullRenderer {
        fn draw(&mut self, _frame: &RenderFrame<'_>) {}
    }

    fn scoped(bus: &Arc<EventBus<crate::event::EngineEvent>>) -> ScopedEngine<NullRenderer> {
        let engine = Engine::new(
            |_: &Frame| -> Option<palm_channel::RawLandmarks> { None },
            NullRenderer,
            Arc::clone(bus),
            EngineConfig::default(),
        )
        .unwrap();
        ScopedEngine::new(engine)
    }

    #[test]
    fn test_drop_destroys_the_engine() {
        let bus = Arc::new(EventBus::new());
        {
            let mut guard = scoped(&bus);
            guard.start();
            let sub = bus.subscribe(topic::SCORE, |_| {});
            guard.track_subscription(sub);
            assert_eq!(bus.subscription_count(), 1);
        }
        assert_eq!(bus.subscription_count(), 0);
    }

    #[test]
    fn test_explicit_teardown_then_drop() {
        let bus = Arc::new(EventBus::new());
        let mut guard = scoped(&bus);
        guard.start();

        guard.teardown();
        guard.teardown();
        assert_eq!(guard.state(), EngineState::Destroyed);
        // Drop at scope exit hits destroy a third time; still fine.
    }
}
