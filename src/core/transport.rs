//! # Transport module
//!
//! This module contains the [`Transport`] trait and the request types
//! consumed by it.
//!
//! The Fanline client never talks to the wire itself: everything which
//! requires network access is expressed as a semantic request
//! ([`SubscribeRequest`], [`LeaveRequest`], [`HeartbeatRequest`]) and handed
//! to the [`Transport`] implementation. Encoding of the request and parsing
//! of the service response stay on the transport side.

use crate::{
    core::FanlineError,
    subscribe::{SubscribeResult, SubscriptionCursor},
};

/// Long-poll subscribe request.
///
/// Asks the service for real-time updates on a set of channels and channel
/// groups starting from `cursor`.
#[derive(Clone, Debug, PartialEq)]
pub struct SubscribeRequest {
    /// Channel names which should be the source of real-time updates.
    ///
    /// Presence-enabled subscriptions contribute their `<name>-pnpres`
    /// companion channel here as well.
    pub channels: Vec<String>,

    /// Channel group names which should be the source of real-time updates.
    pub channel_groups: Vec<String>,

    /// Time cursor.
    ///
    /// A cursor with a timetoken starting from `'0'` requests a handshake
    /// (no catch-up); any other value positions the long-poll right after
    /// the previous response.
    pub cursor: SubscriptionCursor,

    /// Expression used by the service to filter updates before delivery.
    pub filter_expression: Option<String>,

    /// Presence timeout in seconds announced together with the request.
    pub heartbeat: u64,
}

/// Presence leave request.
///
/// Announces that the client is not interested in listed channels and
/// channel groups anymore.
#[derive(Clone, Debug, PartialEq)]
pub struct LeaveRequest {
    /// Channel names to leave.
    pub channels: Vec<String>,

    /// Channel group names to leave.
    pub channel_groups: Vec<String>,
}

/// Presence heartbeat request.
///
/// Announces that the client is still interested in listed channels and
/// channel groups.
#[derive(Clone, Debug, PartialEq)]
pub struct HeartbeatRequest {
    /// Channel names for which presence should be announced.
    pub channels: Vec<String>,

    /// Channel group names for which presence should be announced.
    pub channel_groups: Vec<String>,

    /// Presence timeout in seconds.
    pub heartbeat: u64,
}

/// This trait is used to send requests to the Fanline service.
///
/// You can implement this trait for your own types to plug any HTTP stack
/// under the client.
///
/// An implementation is expected to map service and socket failures onto
/// [`FanlineError`] variants: timeouts to [`FanlineError::Timeout`],
/// non-2xx service responses to [`FanlineError::API`] and everything else
/// to [`FanlineError::Transport`]. Cancellation is driven by the client
/// (the request future is dropped) and shouldn't be reported by the
/// transport itself.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Start a long-poll subscribe request.
    ///
    /// Resolves with the next time cursor and the list of raw real-time
    /// update envelopes parsed from the service response.
    ///
    /// # Errors
    ///
    /// Returns a [`FanlineError`] when the request can't be performed or the
    /// service responds with an error.
    async fn subscribe(&self, request: SubscribeRequest) -> Result<SubscribeResult, FanlineError>;

    /// Announce leave for channels and channel groups.
    ///
    /// # Errors
    ///
    /// Returns a [`FanlineError`] when the request can't be performed or the
    /// service responds with an error.
    async fn leave(&self, request: LeaveRequest) -> Result<(), FanlineError>;

    /// Announce presence for channels and channel groups.
    ///
    /// # Errors
    ///
    /// Returns a [`FanlineError`] when the request can't be performed or the
    /// service responds with an error.
    async fn heartbeat(&self, request: HeartbeatRequest) -> Result<(), FanlineError>;
}
