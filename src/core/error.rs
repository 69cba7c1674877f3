//! # Error types
//!
//! This module contains the error types for the [`fanline`] crate.
//!
//! [`fanline`]: ../index.html

use snafu::Snafu;

/// Fanline error type.
///
/// Used as the error type of every fallible operation in the crate. Errors
/// reported by the service or the transport layer are preserved so callers
/// (and subscription status listeners) can inspect what exactly went wrong.
#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FanlineError {
    /// Transport layer failed to perform a request.
    #[snafu(display("Transport error: {details}"))]
    Transport {
        /// Description of the failure reported by the transport layer.
        details: String,
    },

    /// Request which has been sent to the service didn't complete in time.
    #[snafu(display("Request timeout: {details}"))]
    Timeout {
        /// Description of the operation which timed out.
        details: String,
    },

    /// Service responded with a non-success status code.
    #[snafu(display("API error: {message}"))]
    API {
        /// Operation status (HTTP) code.
        status: u16,

        /// A message explaining what went wrong.
        message: String,

        /// List of channels which is affected by error.
        affected_channels: Option<Vec<String>>,

        /// List of channel groups which is affected by error.
        affected_channel_groups: Option<Vec<String>>,
    },

    /// In-flight request has been cancelled before completion.
    ///
    /// Cancellation is not a failure: the subscribe event engine consumes
    /// this variant internally and never surfaces it through status
    /// listeners.
    #[snafu(display("Effect cancelled"))]
    EffectCanceled,

    /// Client instance can't be created with provided configuration.
    #[snafu(display("Client initialization error: {details}"))]
    ClientInitialization {
        /// Description of the configuration problem.
        details: String,
    },

    /// Provided parameters can't be used to perform an operation.
    #[snafu(display("Invalid parameters: {details}"))]
    InvalidParameters {
        /// Description of which parameter is wrong and why.
        details: String,
    },

    /// Operation requires a subscription which is not known to the receiver.
    #[snafu(display("Subscription not found: {details}"))]
    SubscriptionNotFound {
        /// Description of the missing subscription.
        details: String,
    },

    /// Subscription with the same entity already added.
    #[snafu(display("Subscription already exists: {details}"))]
    SubscriptionAlreadyExists {
        /// Description of the duplicated subscription.
        details: String,
    },
}

impl FanlineError {
    /// Whether the error represents cancellation of an in-flight effect.
    pub(crate) fn is_cancellation(&self) -> bool {
        matches!(self, Self::EffectCanceled)
    }
}
