use crate::core::event_engine::{EffectInvocation, State};

/// State machine transition type.
///
/// State transition with information about the target state and the ordered
/// list of effect invocations which should be dispatched on the way there.
pub(crate) struct Transition<S, I>
where
    S: State,
    I: EffectInvocation,
{
    /// Target state machine state.
    pub state: S,

    /// List of effect invocations which should be scheduled during
    /// transition.
    pub invocations: Vec<I>,
}
