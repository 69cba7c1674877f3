//! Event Engine module
//!
//! Generic state machine infrastructure: states with transition functions,
//! effect invocations with a processing queue and a dispatcher which runs
//! and cancels the corresponding effects.

use async_channel::Sender;
use log::{debug, error};
use spin::RwLock;

use crate::core::Runtime;

use std::sync::Arc;

#[doc(inline)]
pub(crate) use effect::Effect;
pub(crate) mod effect;

#[doc(inline)]
pub(crate) use effect_dispatcher::EffectDispatcher;
pub(crate) mod effect_dispatcher;

#[doc(inline)]
pub(crate) use effect_handler::EffectHandler;
pub(crate) mod effect_handler;

#[doc(inline)]
pub(crate) use effect_invocation::EffectInvocation;
pub(crate) mod effect_invocation;

#[doc(inline)]
pub(crate) use event::Event;
pub(crate) mod event;

#[doc(inline)]
pub(crate) use state::State;
pub(crate) mod state;

#[doc(inline)]
pub(crate) use transition::Transition;
pub(crate) mod transition;

#[doc(inline)]
pub(crate) use cancel::CancellationTask;
pub(crate) mod cancel;

/// State machine's event engine.
///
/// [`EventEngine`] manages the current system state and processes events
/// which may move the system into a new state, dispatching the effect
/// invocations produced by each transition.
pub(crate) struct EventEngine<S, EH, EF, EI>
where
    S: State<Invocation = EI> + Send + Sync,
    EH: EffectHandler<EI, EF>,
    EF: Effect<Invocation = EI>,
    EI: EffectInvocation<Effect = EF> + Send + Sync,
{
    /// Effects dispatcher.
    ///
    /// Dispatcher responsible for effect invocations processing.
    effect_dispatcher: Arc<EffectDispatcher<EH, EF, EI>>,

    /// `Effect invocation` submission channel.
    ///
    /// Channel used to submit invocations for new effect executions.
    effect_dispatcher_channel: Sender<EI>,

    /// Current event engine state.
    current_state: RwLock<S>,

    /// Whether the event engine is still active.
    ///
    /// The flag drops on termination (unsubscribe all / client destruction)
    /// after which events are not processed anymore.
    active: RwLock<bool>,
}

impl<S, EH, EF, EI> EventEngine<S, EH, EF, EI>
where
    S: State<Invocation = EI> + Send + Sync + 'static,
    EH: EffectHandler<EI, EF> + Send + Sync + 'static,
    EF: Effect<Invocation = EI> + 'static,
    EI: EffectInvocation<Effect = EF> + Send + Sync + 'static,
{
    /// Create an [`EventEngine`] with initial state for the state machine.
    pub fn new<R>(handler: EH, state: S, runtime: R) -> Arc<Self>
    where
        R: Runtime + 'static,
    {
        let (channel_tx, channel_rx) = async_channel::bounded::<EI>(100);
        let effect_dispatcher = Arc::new(EffectDispatcher::new(handler, channel_rx));

        let engine = Arc::new(EventEngine {
            effect_dispatcher,
            effect_dispatcher_channel: channel_tx,
            current_state: RwLock::new(state),
            active: RwLock::new(true),
        });

        engine.start(runtime);

        engine
    }

    /// Retrieve the current engine state.
    ///
    /// > Note: Code actually used in tests.
    #[allow(dead_code)]
    pub(crate) fn current_state(&self) -> S {
        (*self.current_state.read()).clone()
    }

    /// Process an external event.
    ///
    /// Runs the current state's transition function and performs the
    /// required transition if the event is expected in this state.
    pub fn process(&self, event: &<EI as EffectInvocation>::Event) {
        if !*self.active.read() {
            debug!("Can't process events because the event engine is not active.");
            return;
        }

        debug!("Processing event: {}", event.id());

        let transition = {
            let state = self.current_state.read();
            state.transition(event)
        };

        match transition {
            Some(transition) => self.process_transition(transition),
            None => debug!("Event '{}' ignored in the current state", event.id()),
        }
    }

    /// Process a transition.
    ///
    /// The target state is installed before any of the transition
    /// invocations are dispatched, so effects always observe the
    /// post-transition state.
    fn process_transition(&self, transition: Transition<S, EI>) {
        if !*self.active.read() {
            debug!("Can't process transition because the event engine is not active.");
            return;
        }

        {
            let mut writable_state = self.current_state.write();
            *writable_state = transition.state;
        }

        transition.invocations.into_iter().for_each(|invocation| {
            if let Err(err) = self.effect_dispatcher_channel.send_blocking(invocation) {
                error!("Unable to dispatch invocation: {err:?}");
            }
        });
    }

    /// Start the state machine.
    fn start<R>(self: &Arc<Self>, runtime: R)
    where
        R: Runtime + 'static,
    {
        let engine = self.clone();

        self.effect_dispatcher.start(
            move |events| events.iter().for_each(|event| engine.process(event)),
            runtime,
        );
    }

    /// Stop the state machine using a specific invocation.
    ///
    /// The provided invocation should respond with `true` to the
    /// `is_terminating` method call.
    pub fn stop(&self, invocation: EI) {
        {
            *self.active.write() = false;
        }

        if let Err(err) = self.effect_dispatcher_channel.send_blocking(invocation) {
            error!("Unable to dispatch invocation: {err:?}");
        }
    }
}

#[cfg(test)]
mod should {
    use super::*;
    use crate::providers::futures_tokio::RuntimeTokio;

    #[derive(Debug, Clone, PartialEq)]
    enum TestState {
        NotStarted,
        Started,
        InProgress,
        Completed,
    }

    impl State for TestState {
        type Invocation = TestInvocation;

        fn enter(&self) -> Option<Vec<Self::Invocation>> {
            matches!(self, Self::Started).then(|| vec![TestInvocation::One])
        }

        fn exit(&self) -> Option<Vec<Self::Invocation>> {
            matches!(self, Self::Started).then(|| vec![TestInvocation::Two])
        }

        fn transition(
            &self,
            event: &<Self::Invocation as EffectInvocation>::Event,
        ) -> Option<Transition<Self, Self::Invocation>> {
            match event {
                TestEvent::One => {
                    if matches!(self, Self::NotStarted) {
                        Some(self.transition_to(Self::Started, None))
                    } else if matches!(self, Self::Completed) {
                        Some(
                            self.transition_to(
                                Self::NotStarted,
                                Some(vec![TestInvocation::Three]),
                            ),
                        )
                    } else {
                        None
                    }
                }
                TestEvent::Two => matches!(self, Self::Started)
                    .then(|| self.transition_to(Self::InProgress, None)),
                TestEvent::Three => matches!(self, Self::InProgress).then(|| {
                    self.transition_to(Self::Completed, Some(vec![TestInvocation::One]))
                }),
            }
        }
    }

    enum TestEvent {
        One,
        Two,
        Three,
    }

    impl Event for TestEvent {
        fn id(&self) -> &str {
            match self {
                TestEvent::One => "EVENT_ONE",
                TestEvent::Two => "EVENT_TWO",
                TestEvent::Three => "EVENT_THREE",
            }
        }
    }

    #[derive(Debug, PartialEq)]
    enum TestEffect {
        One,
        Two,
        Three,
    }

    #[async_trait::async_trait]
    impl Effect for TestEffect {
        type Invocation = TestInvocation;

        fn name(&self) -> String {
            match self {
                Self::One => "EFFECT_ONE",
                Self::Two => "EFFECT_TWO",
                Self::Three => "EFFECT_THREE",
            }
            .into()
        }

        fn id(&self) -> String {
            self.name()
        }

        async fn run(&self) -> Vec<TestEvent> {
            vec![]
        }

        fn cancel(&self) {
            // Test effects can't be cancelled.
        }
    }

    enum TestInvocation {
        One,
        Two,
        Three,
        Terminate,
    }

    impl EffectInvocation for TestInvocation {
        type Effect = TestEffect;
        type Event = TestEvent;

        fn id(&self) -> &str {
            match self {
                Self::One => "EFFECT_ONE_INVOCATION",
                Self::Two => "EFFECT_TWO_INVOCATION",
                Self::Three => "EFFECT_THREE_INVOCATION",
                Self::Terminate => "TERMINATE",
            }
        }

        fn is_managed(&self) -> bool {
            matches!(self, Self::Two | Self::Three)
        }

        fn is_cancelling(&self) -> bool {
            false
        }

        fn cancelling_effect(&self, _effect: &Self::Effect) -> bool {
            false
        }

        fn is_terminating(&self) -> bool {
            matches!(self, Self::Terminate)
        }
    }

    struct TestEffectHandler {}

    impl EffectHandler<TestInvocation, TestEffect> for TestEffectHandler {
        fn create(&self, invocation: &TestInvocation) -> Option<TestEffect> {
            match invocation {
                TestInvocation::One => Some(TestEffect::One),
                TestInvocation::Two => Some(TestEffect::Two),
                TestInvocation::Three => Some(TestEffect::Three),
                TestInvocation::Terminate => None,
            }
        }
    }

    fn event_engine(
        state: TestState,
    ) -> Arc<EventEngine<TestState, TestEffectHandler, TestEffect, TestInvocation>> {
        EventEngine::new(TestEffectHandler {}, state, RuntimeTokio)
    }

    #[tokio::test]
    async fn set_initial_state() {
        let engine = event_engine(TestState::NotStarted);
        assert!(matches!(engine.current_state(), TestState::NotStarted));
    }

    #[tokio::test]
    async fn transit_to_new_state() {
        let engine = event_engine(TestState::NotStarted);
        engine.process(&TestEvent::One);
        assert!(matches!(engine.current_state(), TestState::Started));
    }

    #[tokio::test]
    async fn transit_between_states() {
        let engine = event_engine(TestState::NotStarted);

        engine.process(&TestEvent::One);
        assert!(matches!(engine.current_state(), TestState::Started));

        engine.process(&TestEvent::Two);
        assert!(matches!(engine.current_state(), TestState::InProgress));

        engine.process(&TestEvent::Three);
        assert!(matches!(engine.current_state(), TestState::Completed));

        engine.process(&TestEvent::One);
        assert!(matches!(engine.current_state(), TestState::NotStarted));
    }

    #[tokio::test]
    async fn not_transit_for_unexpected_event() {
        let engine = event_engine(TestState::NotStarted);

        engine.process(&TestEvent::One);
        assert!(matches!(engine.current_state(), TestState::Started));

        engine.process(&TestEvent::Three);
        assert!(matches!(engine.current_state(), TestState::Started));
    }

    #[tokio::test]
    async fn not_process_events_after_stop() {
        let engine = event_engine(TestState::NotStarted);

        engine.stop(TestInvocation::Terminate);
        engine.process(&TestEvent::One);

        assert!(matches!(engine.current_state(), TestState::NotStarted));
    }
}
