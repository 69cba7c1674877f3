use crate::core::event_engine::EffectInvocation;

/// State machine effect trait.
///
/// An effect is the actual work associated with an invocation: a long-poll
/// request, a listener notification and so on. Effects run detached from the
/// dispatcher loop and report resulting events on completion.
#[async_trait::async_trait]
pub(crate) trait Effect: Send + Sync {
    type Invocation: EffectInvocation;

    /// Effect name.
    ///
    /// Used only for logging purposes.
    fn name(&self) -> String;

    /// Unique effect instance identifier.
    fn id(&self) -> String;

    /// Run work associated with the effect.
    ///
    /// Resolves with the list of events which should be processed by the
    /// state machine. A cancelled effect resolves with an empty list.
    async fn run(&self) -> Vec<<Self::Invocation as EffectInvocation>::Event>;

    /// Cancel any ongoing effect work.
    fn cancel(&self);
}
