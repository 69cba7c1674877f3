use crate::core::event_engine::{EffectInvocation, Transition};

/// State machine state trait.
///
/// For a transition, the state machine needs to know which effects should be
/// dispatched during the move to the target state in response to a specific
/// event.
///
/// Types which are expected to be used as states should implement the trait.
pub(crate) trait State: Clone + Sized {
    type Invocation: EffectInvocation;

    /// State enter effect invocations.
    ///
    /// The list of effect invocations that should be called when the event
    /// engine enters the state.
    fn enter(&self) -> Option<Vec<Self::Invocation>>;

    /// State exit effect invocations.
    ///
    /// The list of effect invocations that should be called when the event
    /// engine leaves the state.
    fn exit(&self) -> Option<Vec<Self::Invocation>>;

    /// System event handler.
    ///
    /// The state knows the next state into which the state machine should
    /// switch and the list of effect invocations which should be scheduled.
    /// `None` means that the event is not expected in the receiver state and
    /// should be ignored.
    fn transition(
        &self,
        event: &<Self::Invocation as EffectInvocation>::Event,
    ) -> Option<Transition<Self, Self::Invocation>>;

    /// [`Transition`] build helper.
    ///
    /// The final invocations list is ordered as: transition `invocations`,
    /// then receiver's [`exit`] invocations, then target state's [`enter`]
    /// invocations. The exit invocation cancels any request outstanding for
    /// the receiver state and must stay behind the transition invocations
    /// which scheduled its replacement.
    ///
    /// [`exit`]: State::exit
    /// [`enter`]: State::enter
    fn transition_to(
        &self,
        state: Self,
        invocations: Option<Vec<Self::Invocation>>,
    ) -> Transition<Self, Self::Invocation> {
        let on_enter_invocations = state.enter().unwrap_or_default();

        Transition {
            invocations: invocations
                .unwrap_or_default()
                .into_iter()
                .chain(self.exit().unwrap_or_default())
                .chain(on_enter_invocations)
                .collect(),
            state,
        }
    }
}
