//! # User metadata entity module

use spin::RwLock;

use crate::{
    core::{FanlineEntity, Transport},
    dx::client::FanlineClientInstance,
    subscribe::{Subscribable, SubscribableType, Subscriber, Subscription, SubscriptionOptions},
};

use std::{
    fmt::{Debug, Formatter, Result},
    ops::Deref,
    sync::Arc,
};

/// User metadata entity.
///
/// Subscription to a user metadata object delivers real-time updates of the
/// associated application context.
pub struct UserMetadata<T> {
    inner: Arc<UserMetadataRef<T>>,
}

/// User metadata entity reference.
///
/// Not intended to be used directly. Use [`UserMetadata`] instead.
pub struct UserMetadataRef<T> {
    client: FanlineClientInstance<T>,

    /// Unique user metadata object identifier.
    pub id: String,

    subscriptions_count: RwLock<usize>,
}

impl<T> UserMetadata<T> {
    pub(crate) fn new<S>(client: &FanlineClientInstance<T>, id: S) -> UserMetadata<T>
    where
        S: Into<String>,
    {
        Self {
            inner: Arc::new(UserMetadataRef {
                client: client.clone(),
                id: id.into(),
                subscriptions_count: RwLock::new(0),
            }),
        }
    }

    pub(crate) fn increase_subscriptions_count(&self) {
        let mut subscriptions_count_slot = self.subscriptions_count.write();
        *subscriptions_count_slot += 1;
    }

    pub(crate) fn decrease_subscriptions_count(&self) {
        let mut subscriptions_count_slot = self.subscriptions_count.write();
        if *subscriptions_count_slot > 0 {
            *subscriptions_count_slot -= 1;
        }
    }

    pub(crate) fn subscriptions_count(&self) -> usize {
        *self.subscriptions_count.read()
    }
}

impl<T> Deref for UserMetadata<T> {
    type Target = UserMetadataRef<T>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> Clone for UserMetadata<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for UserMetadata<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id.eq(&other.id)
    }
}

impl<T> From<UserMetadata<T>> for FanlineEntity<T> {
    fn from(value: UserMetadata<T>) -> Self {
        FanlineEntity::UserMetadata(value)
    }
}

impl<T> Debug for UserMetadata<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(
            f,
            "UserMetadata {{ id: {}, subscriptions_count: {} }}",
            self.id,
            self.subscriptions_count()
        )
    }
}

impl<T> Subscribable<T> for UserMetadata<T> {
    fn names(&self, presence: bool) -> Vec<String> {
        let mut names = vec![self.id.clone()];
        presence.then(|| names.push(format!("{}-pnpres", self.id)));

        names
    }

    fn r#type(&self) -> SubscribableType {
        SubscribableType::Channel
    }

    fn client(&self) -> FanlineClientInstance<T> {
        self.client.clone()
    }
}

impl<T> Subscriber<T> for UserMetadata<T>
where
    T: Transport + Send + Sync + 'static,
{
    fn subscription(&self, options: Option<Vec<SubscriptionOptions>>) -> Subscription<T> {
        Subscription::new(self.client(), self.clone().into(), options)
    }
}
