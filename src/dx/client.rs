//! Fanline client module
//!
//! This module contains the [`FanlineClient`] struct which is used to
//! interact with the Fanline service.
//!
//! The client is transport-layer agnostic, so you can use any transport
//! layer that implements the [`Transport`] trait.

use log::info;
use spin::RwLock;

use crate::{
    core::{
        validate_entity_name, Channel, ChannelGroup, ChannelMetadata, FanlineEntity, FanlineError,
        Runtime, RuntimeSupport, Transport, UserMetadata,
    },
    subscribe::{SubscriptionManager, SubscriptionOptions, SubscriptionSet},
};

use std::{ops::Deref, sync::{Arc, Weak}};

/// Smallest presence timeout value accepted by the service.
///
/// Values below this limit are silently clamped up.
pub(crate) const MINIMUM_HEARTBEAT_VALUE: u64 = 20;

/// Default presence timeout value in seconds.
pub(crate) const DEFAULT_HEARTBEAT_VALUE: u64 = 300;

/// Fanline client.
///
/// Client for the Fanline service with the subscribe feature. The client
/// is transport-layer agnostic; construct it with any [`Transport`]
/// implementation through the [`FanlineClientBuilder`].
///
/// Clients are cheap to clone: all clones share the same state.
pub struct FanlineClientInstance<T> {
    pub(crate) inner: Arc<FanlineClientRef<T>>,
}

/// Convenience alias for the client type.
pub type FanlineClient<T> = FanlineClientInstance<T>;

/// Fanline client reference.
///
/// This struct contains the actual client state. It is wrapped in an `Arc`
/// by [`FanlineClientInstance`] and uses interior mutability for its
/// internal state.
///
/// Not intended to be used directly. Use [`FanlineClientInstance`] instead.
pub struct FanlineClientRef<T> {
    /// Transport layer used to reach the Fanline service.
    transport: T,

    /// Client configuration.
    config: FanlineConfig,

    /// Expression used by the service to filter updates before delivery.
    filter_expression: RwLock<Option<String>>,

    /// Presence timeout announced with subscribe and heartbeat calls.
    heartbeat_value: RwLock<u64>,

    /// Subscription module.
    ///
    /// Initialized on first demand.
    pub(crate) subscription: RwLock<Option<Arc<SubscriptionManager>>>,

    /// Runtime used to spawn the subscription loop tasks.
    runtime: RuntimeSupport,
}

/// Fanline client configuration.
#[derive(Debug, Clone)]
pub(crate) struct FanlineConfig {
    /// Subscribe key which identifies the application.
    pub subscribe_key: String,

    /// Identifier of the user for presence announcements.
    pub user_id: String,

    /// Interval in seconds at which the presence heartbeat watcher
    /// announces the client, if configured.
    pub heartbeat_interval: Option<u64>,
}

/// Keys used by the client to access the Fanline service.
#[derive(Debug, Clone)]
pub struct Keyset<S>
where
    S: Into<String>,
{
    /// Subscribe key which identifies the application.
    pub subscribe_key: S,
}

impl<T> FanlineClientInstance<T> {
    /// Update the expression used by the service to filter real-time
    /// updates before delivery.
    ///
    /// The next subscribe call uses the latest value.
    pub fn set_filter_expression<S>(&self, expression: S)
    where
        S: Into<String>,
    {
        *self.filter_expression.write() = Some(expression.into());
    }

    /// Update the presence timeout announced with subscribe and heartbeat
    /// calls.
    ///
    /// Values below the service-defined minimum are silently clamped up.
    pub fn set_heartbeat(&self, seconds: u64) {
        *self.heartbeat_value.write() = seconds.max(MINIMUM_HEARTBEAT_VALUE);
    }

    pub(crate) fn filter_expression(&self) -> Option<String> {
        self.filter_expression.read().clone()
    }

    pub(crate) fn heartbeat_value(&self) -> u64 {
        *self.heartbeat_value.read()
    }

    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    pub(crate) fn config(&self) -> &FanlineConfig {
        &self.config
    }

    pub(crate) fn runtime(&self) -> &RuntimeSupport {
        &self.runtime
    }

    pub(crate) fn downgrade(&self) -> Weak<FanlineClientRef<T>> {
        Arc::downgrade(&self.inner)
    }

    /// Subscription module, when it has already been initialized.
    pub(crate) fn existing_subscription_manager(&self) -> Option<Arc<SubscriptionManager>> {
        self.subscription.read().clone()
    }

    /// Create a [`Channel`] entity.
    ///
    /// # Errors
    ///
    /// Returns [`FanlineError::InvalidParameters`] when `name` is empty or
    /// longer than the service accepts.
    pub fn channel<S>(&self, name: S) -> Result<Channel<T>, FanlineError>
    where
        S: Into<String>,
    {
        let name = name.into();
        Self::validated(&name)?;

        Ok(Channel::new(self, name))
    }

    /// Create a list of [`Channel`] entities.
    pub fn channels(&self, names: &[&str]) -> Result<Vec<Channel<T>>, FanlineError> {
        names.iter().map(|name| self.channel(*name)).collect()
    }

    /// Create a [`ChannelGroup`] entity.
    ///
    /// # Errors
    ///
    /// Returns [`FanlineError::InvalidParameters`] when `name` is empty or
    /// longer than the service accepts.
    pub fn channel_group<S>(&self, name: S) -> Result<ChannelGroup<T>, FanlineError>
    where
        S: Into<String>,
    {
        let name = name.into();
        Self::validated(&name)?;

        Ok(ChannelGroup::new(self, name))
    }

    /// Create a [`ChannelMetadata`] entity.
    pub fn channel_metadata<S>(&self, id: S) -> Result<ChannelMetadata<T>, FanlineError>
    where
        S: Into<String>,
    {
        let id = id.into();
        Self::validated(&id)?;

        Ok(ChannelMetadata::new(self, id))
    }

    /// Create a [`UserMetadata`] entity.
    pub fn user_metadata<S>(&self, id: S) -> Result<UserMetadata<T>, FanlineError>
    where
        S: Into<String>,
    {
        let id = id.into();
        Self::validated(&id)?;

        Ok(UserMetadata::new(self, id))
    }

    fn validated(name: &str) -> Result<(), FanlineError> {
        match validate_entity_name(name) {
            Some(details) => Err(FanlineError::InvalidParameters { details }),
            None => Ok(()),
        }
    }
}

impl<T> FanlineClientInstance<T>
where
    T: Transport + Send + Sync + 'static,
{
    /// Create a subscription set for a list of entities.
    ///
    /// The set can be used to subscribe and attach listener streams for all
    /// entities at once.
    pub fn subscription_set(
        &self,
        entities: Vec<FanlineEntity<T>>,
        options: Option<Vec<SubscriptionOptions>>,
    ) -> SubscriptionSet<T> {
        SubscriptionSet::new(self.clone(), entities, options)
    }
}

impl<T> Deref for FanlineClientInstance<T> {
    type Target = FanlineClientRef<T>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> Clone for FanlineClientInstance<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> From<Arc<FanlineClientRef<T>>> for FanlineClientInstance<T> {
    fn from(inner: Arc<FanlineClientRef<T>>) -> Self {
        Self { inner }
    }
}

impl<T> Drop for FanlineClientRef<T> {
    fn drop(&mut self) {
        if let Some(manager) = self.subscription.read().clone() {
            manager.terminate();
        }
    }
}

impl<T> core::fmt::Debug for FanlineClientInstance<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "FanlineClient {{ user_id: {}, subscribe_key: {} }}",
            self.config.user_id, self.config.subscribe_key
        )
    }
}

/// Fanline client builder.
///
/// Use the builder to create an instance of a client with a specific
/// transport implementation.
///
/// ```
/// use fanline::{FanlineClientBuilder, Keyset};
/// # use fanline::core::{FanlineError, Transport, SubscribeRequest, LeaveRequest, HeartbeatRequest};
/// # use fanline::subscribe::SubscribeResult;
/// #
/// # struct MyTransport;
/// #
/// # #[async_trait::async_trait]
/// # impl Transport for MyTransport {
/// #     async fn subscribe(&self, _: SubscribeRequest) -> Result<SubscribeResult, FanlineError> {
/// #         unimplemented!()
/// #     }
/// #     async fn leave(&self, _: LeaveRequest) -> Result<(), FanlineError> { Ok(()) }
/// #     async fn heartbeat(&self, _: HeartbeatRequest) -> Result<(), FanlineError> { Ok(()) }
/// # }
///
/// # fn main() -> Result<(), FanlineError> {
/// let client = FanlineClientBuilder::with_transport(MyTransport)
///     .with_keyset(Keyset { subscribe_key: "demo" })
///     .with_user_id("user")
///     .build()?;
/// #     Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FanlineClientBuilder;

impl FanlineClientBuilder {
    /// Start building a client around the provided transport.
    ///
    /// The subscription loop will run on the Tokio runtime.
    #[cfg(feature = "tokio")]
    pub fn with_transport<T>(transport: T) -> FanlineClientKeysetBuilder<T> {
        use crate::providers::futures_tokio::RuntimeTokio;

        Self::with_transport_and_runtime(transport, RuntimeTokio)
    }

    /// Start building a client around the provided transport and runtime.
    pub fn with_transport_and_runtime<T, R>(
        transport: T,
        runtime: R,
    ) -> FanlineClientKeysetBuilder<T>
    where
        R: Runtime + 'static,
    {
        FanlineClientKeysetBuilder {
            transport,
            runtime: RuntimeSupport::new(runtime),
        }
    }
}

/// Client builder stage which expects the application keyset.
pub struct FanlineClientKeysetBuilder<T> {
    transport: T,
    runtime: RuntimeSupport,
}

impl<T> FanlineClientKeysetBuilder<T> {
    /// Provide the application keyset.
    pub fn with_keyset<S>(self, keyset: Keyset<S>) -> FanlineClientUserIdBuilder<T>
    where
        S: Into<String>,
    {
        FanlineClientUserIdBuilder {
            transport: self.transport,
            runtime: self.runtime,
            subscribe_key: keyset.subscribe_key.into(),
        }
    }
}

/// Client builder stage which expects the user identifier.
pub struct FanlineClientUserIdBuilder<T> {
    transport: T,
    runtime: RuntimeSupport,
    subscribe_key: String,
}

impl<T> FanlineClientUserIdBuilder<T> {
    /// Provide the identifier under which the client should be visible in
    /// presence information.
    pub fn with_user_id<S>(self, user_id: S) -> FanlineClientConfigBuilder<T>
    where
        S: Into<String>,
    {
        FanlineClientConfigBuilder {
            transport: self.transport,
            runtime: self.runtime,
            subscribe_key: self.subscribe_key,
            user_id: user_id.into(),
            heartbeat_value: DEFAULT_HEARTBEAT_VALUE,
            heartbeat_interval: None,
            filter_expression: None,
        }
    }
}

/// Final client builder stage with optional configuration.
pub struct FanlineClientConfigBuilder<T> {
    transport: T,
    runtime: RuntimeSupport,
    subscribe_key: String,
    user_id: String,
    heartbeat_value: u64,
    heartbeat_interval: Option<u64>,
    filter_expression: Option<String>,
}

impl<T> FanlineClientConfigBuilder<T> {
    /// Presence timeout in seconds.
    ///
    /// Values below the service-defined minimum are silently clamped up.
    pub fn with_heartbeat_value(mut self, value: u64) -> Self {
        self.heartbeat_value = value.max(MINIMUM_HEARTBEAT_VALUE);
        self
    }

    /// Interval in seconds at which the client should announce its
    /// presence.
    pub fn with_heartbeat_interval(mut self, interval: u64) -> Self {
        self.heartbeat_interval = Some(interval);
        self
    }

    /// Expression used by the service to filter real-time updates before
    /// delivery.
    pub fn with_filter_expression<S>(mut self, expression: S) -> Self
    where
        S: Into<String>,
    {
        self.filter_expression = Some(expression.into());
        self
    }

    /// Build a [`FanlineClientInstance`].
    ///
    /// # Errors
    ///
    /// Returns [`FanlineError::ClientInitialization`] when the provided
    /// configuration can't be used to create a client.
    pub fn build(self) -> Result<FanlineClientInstance<T>, FanlineError> {
        if self.subscribe_key.is_empty() {
            return Err(FanlineError::ClientInitialization {
                details: "Subscribe key is empty".into(),
            });
        }

        if self.user_id.is_empty() {
            return Err(FanlineError::ClientInitialization {
                details: "User id is empty".into(),
            });
        }

        info!("Creating client for user: {}", self.user_id);

        Ok(FanlineClientInstance {
            inner: Arc::new(FanlineClientRef {
                transport: self.transport,
                config: FanlineConfig {
                    subscribe_key: self.subscribe_key,
                    user_id: self.user_id,
                    heartbeat_interval: self.heartbeat_interval,
                },
                filter_expression: RwLock::new(self.filter_expression),
                heartbeat_value: RwLock::new(self.heartbeat_value),
                subscription: RwLock::new(None),
                runtime: self.runtime,
            }),
        })
    }
}
