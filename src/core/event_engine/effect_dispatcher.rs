//! Effects dispatcher module.
//!
//! The dispatcher drains the engine's invocation channel, materializes
//! effects and runs them as detached tasks, feeding resulting events back
//! into the state machine.

use async_channel::Receiver;
use log::{debug, error};
use spin::RwLock;

use crate::core::{
    event_engine::{Effect, EffectHandler, EffectInvocation},
    Runtime,
};

use std::{marker::PhantomData, sync::Arc};

/// State machine effects dispatcher.
pub(crate) struct EffectDispatcher<EH, EF, EI>
where
    EI: EffectInvocation<Effect = EF>,
    EH: EffectHandler<EI, EF>,
    EF: Effect,
{
    /// Effect invocation handler.
    ///
    /// Factory which maps invocations onto actual effect implementations.
    handler: EH,

    /// Dispatched effects managed by the dispatcher.
    ///
    /// There are effects whose lifetime should be managed by the dispatcher:
    /// long-running effects which a cancelling invocation may need to abort
    /// before their natural completion.
    managed: RwLock<Vec<Arc<EF>>>,

    /// `Effect invocation` processing channel.
    ///
    /// The engine submits invocations for new effect executions through this
    /// channel.
    invocations_channel: Receiver<EI>,

    _invocation: PhantomData<EI>,
}

impl<EH, EF, EI> EffectDispatcher<EH, EF, EI>
where
    EI: EffectInvocation<Effect = EF> + Send + Sync + 'static,
    EH: EffectHandler<EI, EF> + Send + Sync + 'static,
    EF: Effect<Invocation = EI> + 'static,
{
    /// Create a new effects dispatcher.
    pub fn new(handler: EH, channel: Receiver<EI>) -> Self {
        EffectDispatcher {
            handler,
            managed: RwLock::new(Vec::new()),
            invocations_channel: channel,
            _invocation: Default::default(),
        }
    }

    /// Start the dispatcher processing loop.
    ///
    /// The loop runs as a detached task until a terminating invocation is
    /// received or the invocations channel is closed. Events produced by
    /// completed effects are passed to `completion`.
    pub fn start<C, R>(self: &Arc<Self>, completion: C, runtime: R)
    where
        C: Fn(Vec<<EI as EffectInvocation>::Event>) + Clone + Send + Sync + 'static,
        R: Runtime + 'static,
    {
        let dispatcher = self.clone();
        let effect_runtime = runtime.clone();

        runtime.spawn(async move {
            loop {
                match dispatcher.invocations_channel.recv().await {
                    Ok(invocation) => {
                        if invocation.is_terminating() {
                            debug!("Terminating event engine");
                            break;
                        }

                        dispatcher.dispatch(&invocation, completion.clone(), &effect_runtime);
                    }
                    Err(err) => {
                        error!("Invocations channel closed: {err}");
                        break;
                    }
                }
            }
        });
    }

    /// Dispatch the effect associated with `invocation`.
    fn dispatch<C, R>(self: &Arc<Self>, invocation: &EI, completion: C, runtime: &R)
    where
        C: Fn(Vec<<EI as EffectInvocation>::Event>) + Send + Sync + 'static,
        R: Runtime,
    {
        if let Some(effect) = self.handler.create(invocation) {
            let effect = Arc::new(effect);

            if invocation.is_managed() {
                self.managed.write().push(effect.clone());
            }

            debug!("Dispatching effect: {}", effect.name());

            let dispatcher = self.clone();
            runtime.spawn(async move {
                let events = effect.run().await;
                dispatcher.remove_managed_effect(&effect.id());
                completion(events);
            });
        } else if invocation.is_cancelling() {
            self.cancel_effect(invocation);
        }
    }

    /// Handle effect cancellation.
    ///
    /// Effects with managed lifecycle can be aborted by the corresponding
    /// cancelling invocation. At most one effect is cancelled per
    /// invocation.
    fn cancel_effect(&self, invocation: &EI) {
        let cancelled = {
            let mut managed = self.managed.write();
            managed
                .iter()
                .position(|effect| invocation.cancelling_effect(effect))
                .map(|position| managed.remove(position))
        };

        if let Some(effect) = cancelled {
            debug!("Cancelling effect: {}", effect.name());
            effect.cancel();
        }
    }

    /// Forget a managed effect which completed on its own.
    fn remove_managed_effect(&self, effect_id: &str) {
        let mut managed = self.managed.write();
        if let Some(position) = managed.iter().position(|effect| effect.id() == effect_id) {
            managed.remove(position);
        }
    }
}
