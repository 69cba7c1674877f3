/// Event engine external event.
///
/// The state machine uses events to calculate the transition path and the
/// list of effect invocations.
///
/// Types which are expected to be used as events should implement this
/// trait.
pub(crate) trait Event {
    /// Event identifier.
    fn id(&self) -> &str;
}
