use crate::core::event_engine::{Effect, Event};

/// Effect invocation trait.
///
/// An invocation is an intention to run an effect. The effect dispatcher
/// uses intents to schedule actual effect execution.
pub(crate) trait EffectInvocation {
    type Effect: Effect;
    type Event: Event;

    /// Unique effect invocation identifier.
    fn id(&self) -> &str;

    /// Whether the invoked effect lifetime should be managed by the
    /// dispatcher or not.
    ///
    /// Managed effects are kept by the dispatcher while they run so a
    /// cancelling invocation may abort them.
    fn is_managed(&self) -> bool;

    /// Whether the invocation cancels a managed effect instead of creating
    /// an effect of its own.
    fn is_cancelling(&self) -> bool;

    /// Whether the invocation cancels the specific managed `effect` or not.
    fn cancelling_effect(&self, effect: &Self::Effect) -> bool;

    /// Whether the invocation terminates the event engine processing loop.
    fn is_terminating(&self) -> bool;
}
