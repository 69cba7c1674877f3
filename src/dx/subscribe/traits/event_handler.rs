use crate::subscribe::{event_engine::SubscriptionInput, SubscriptionCursor, Update};

/// Registered real-time events handler.
///
/// The subscription facade doesn't know about concrete subscription types;
/// it routes received events to everything registered through this trait.
pub(crate) trait EventHandler: Send + Sync {
    /// Handle received real-time events.
    ///
    /// The implementation should filter out events which don't match the
    /// handler's own subscription input and deliver the rest to attached
    /// listener streams.
    ///
    /// # Arguments
    ///
    /// * `cursor` - Time cursor of the next portion of events.
    /// * `events` - A slice of real-time events from the multiplexed
    ///   subscription.
    fn handle_events(&self, cursor: SubscriptionCursor, events: &[Update]);

    /// The subscription input associated with this event handler.
    ///
    /// # Arguments
    ///
    /// * `include_inactive` - Whether entities without active subscriptions
    ///   should be included into the input or not.
    fn subscription_input(&self, include_inactive: bool) -> SubscriptionInput;

    /// Invalidate the event handler.
    ///
    /// Terminates attached listener streams and marks the handler as not
    /// subscribed.
    fn invalidate(&self);

    /// Unique event handler identifier.
    fn id(&self) -> &String;
}
