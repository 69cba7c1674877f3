use crate::core::event_engine::{Effect, EffectInvocation};

/// State machine effects factory.
///
/// The handler owns everything required to materialize an effect from an
/// effect invocation (executor functions, cancellation pipe and so on).
pub(crate) trait EffectHandler<I, E>
where
    I: EffectInvocation,
    E: Effect,
{
    /// Create an effect using information from the effect `invocation`.
    ///
    /// `None` is returned for invocations which don't have their own effect
    /// body (cancelling and terminating invocations).
    fn create(&self, invocation: &I) -> Option<E>;
}
