//! Subscribe event engine module types.
//!
//! This module contains the [`SubscriptionInput`] type, which represents the
//! aggregated set of channels and channel groups for which real-time updates
//! should be retrieved from the Fanline service.

use crate::subscribe::SubscriptionCursor;

use std::{
    collections::HashSet,
    ops::{Add, AddAssign, Sub, SubAssign},
};

/// Channels and channel groups aggregated for subscription.
///
/// The input is an unordered unique set per name kind. Inputs support union
/// (`+`) and subtraction (`-`), which the subscribe facade uses to compute
/// the subscribables contributed or abandoned by a particular subscription.
#[derive(Clone, Debug, PartialEq)]
pub struct SubscriptionInput {
    /// Optional unique set of channels.
    ///
    /// The list is optional if there is at least one channel group provided.
    channels: Option<HashSet<String>>,

    /// Optional unique set of channel groups.
    channel_groups: Option<HashSet<String>>,
}

impl SubscriptionInput {
    pub fn new(channels: &Option<Vec<String>>, channel_groups: &Option<Vec<String>>) -> Self {
        Self {
            channels: channels
                .as_ref()
                .map(|channels| channels.iter().cloned().collect()),
            channel_groups: channel_groups
                .as_ref()
                .map(|groups| groups.iter().cloned().collect()),
        }
    }

    /// Whether the input contains no channels and no channel groups.
    pub fn is_empty(&self) -> bool {
        let channels_is_empty = self.channels.as_ref().map_or(true, HashSet::is_empty);
        let groups_is_empty = self.channel_groups.as_ref().map_or(true, HashSet::is_empty);

        channels_is_empty && groups_is_empty
    }

    pub fn channels(&self) -> Option<Vec<String>> {
        self.channels
            .as_ref()
            .map(|channels| channels.iter().cloned().collect())
    }

    pub fn channel_groups(&self) -> Option<Vec<String>> {
        self.channel_groups
            .as_ref()
            .map(|groups| groups.iter().cloned().collect())
    }

    pub fn contains_channel(&self, channel: &str) -> bool {
        self.channels
            .as_ref()
            .map_or(false, |channels| channels.contains(channel))
    }

    pub fn contains_channel_group(&self, channel_group: &str) -> bool {
        self.channel_groups
            .as_ref()
            .map_or(false, |groups| groups.contains(channel_group))
    }

    /// Whether the subscribable `name` is part of the input, no matter of
    /// its kind.
    pub fn contains(&self, name: &str) -> bool {
        self.contains_channel(name) || self.contains_channel_group(name)
    }

    fn join_sets(
        lhs: &Option<HashSet<String>>,
        rhs: &Option<HashSet<String>>,
    ) -> Option<HashSet<String>> {
        match (lhs, rhs) {
            (Some(lhs), Some(rhs)) => Some(lhs.union(rhs).cloned().collect()),
            (Some(lhs), None) => Some(lhs.clone()),
            (None, Some(rhs)) => Some(rhs.clone()),
            _ => None,
        }
    }

    fn sub_sets(
        lhs: &Option<HashSet<String>>,
        rhs: &Option<HashSet<String>>,
    ) -> Option<HashSet<String>> {
        match (lhs, rhs) {
            (Some(lhs), Some(rhs)) => Some(lhs - rhs).filter(|diff| !diff.is_empty()),
            (Some(lhs), None) => Some(lhs.clone()),
            _ => None,
        }
    }
}

impl Default for SubscriptionInput {
    fn default() -> Self {
        SubscriptionInput::new(&None, &None)
    }
}

impl Add for SubscriptionInput {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            channels: Self::join_sets(&self.channels, &rhs.channels),
            channel_groups: Self::join_sets(&self.channel_groups, &rhs.channel_groups),
        }
    }
}

impl AddAssign for SubscriptionInput {
    fn add_assign(&mut self, rhs: Self) {
        self.channels = Self::join_sets(&self.channels, &rhs.channels);
        self.channel_groups = Self::join_sets(&self.channel_groups, &rhs.channel_groups);
    }
}

impl Sub for SubscriptionInput {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            channels: Self::sub_sets(&self.channels, &rhs.channels),
            channel_groups: Self::sub_sets(&self.channel_groups, &rhs.channel_groups),
        }
    }
}

impl SubAssign for SubscriptionInput {
    fn sub_assign(&mut self, rhs: Self) {
        self.channels = Self::sub_sets(&self.channels, &rhs.channels);
        self.channel_groups = Self::sub_sets(&self.channel_groups, &rhs.channel_groups);
    }
}

/// Parameters handed to the subscribe effect executor.
#[derive(Clone)]
pub(crate) struct SubscriptionParams<'execution> {
    /// Channels from which real-time updates should be received.
    pub channels: &'execution Option<Vec<String>>,

    /// Channel groups from which real-time updates should be received.
    pub channel_groups: &'execution Option<Vec<String>>,

    /// Time cursor.
    pub cursor: Option<&'execution SubscriptionCursor>,

    /// Whether presence should be announced before the long-poll starts.
    pub send_heartbeat: bool,

    /// Identifier of the effect which requested the call.
    pub effect_id: &'execution str,
}

#[cfg(test)]
mod it_should {
    use super::*;

    fn input(channels: &[&str], groups: &[&str]) -> SubscriptionInput {
        SubscriptionInput::new(
            &(!channels.is_empty()).then(|| channels.iter().map(|c| c.to_string()).collect()),
            &(!groups.is_empty()).then(|| groups.iter().map(|g| g.to_string()).collect()),
        )
    }

    #[test]
    fn create_empty_input() {
        assert!(SubscriptionInput::new(&None, &None).is_empty());
    }

    #[test]
    fn create_input_with_unique_channels() {
        let input = input(&["channel-1", "channel-2", "channel-1"], &[]);

        assert!(!input.is_empty());
        assert_eq!(input.channels().unwrap().len(), 2);
        assert!(input.contains_channel("channel-1"));
        assert!(input.contains_channel("channel-2"));
    }

    #[test]
    fn create_input_with_unique_channel_groups() {
        let input = input(&[], &["group-1", "group-2", "group-2"]);

        assert!(!input.is_empty());
        assert_eq!(input.channel_groups().unwrap().len(), 2);
        assert!(input.contains_channel_group("group-1"));
        assert!(input.contains("group-2"));
    }

    #[test]
    fn join_channels_and_channel_groups() {
        let lhs = input(&["channel-1", "channel-2"], &["group-1"]);
        let rhs = input(&["channel-2", "channel-3"], &["group-2"]);

        let joint = lhs + rhs;

        assert_eq!(joint.channels().unwrap().len(), 3);
        assert_eq!(joint.channel_groups().unwrap().len(), 2);
    }

    #[test]
    fn join_with_empty_input() {
        let joint = SubscriptionInput::default() + input(&["channel-1"], &[]);

        assert!(!joint.is_empty());
        assert_eq!(joint.channels().unwrap(), vec!["channel-1".to_string()]);
        assert!(joint.channel_groups().is_none());
    }

    #[test]
    fn subtract_channels_and_channel_groups() {
        let lhs = input(&["channel-1", "channel-2", "channel-3"], &["group-1", "group-2"]);
        let rhs = input(&["channel-3"], &["group-2"]);

        let diff = lhs - rhs;

        assert_eq!(diff.channels().unwrap().len(), 2);
        assert_eq!(diff.channel_groups().unwrap(), vec!["group-1".to_string()]);
        assert!(!diff.contains_channel("channel-3"));
    }

    #[test]
    fn subtract_whole_input() {
        let lhs = input(&["channel-1"], &["group-1"]);
        let rhs = lhs.clone();

        let diff = lhs - rhs;

        assert!(diff.is_empty());
        assert!(diff.channels().is_none());
        assert!(diff.channel_groups().is_none());
    }

    #[test]
    fn subtract_and_join_round_trip() {
        let base = input(&["channel-1", "channel-2"], &["group-1"]);
        let extra = input(&["channel-3"], &["group-2"]);

        let result = (base.clone() + extra.clone()) - extra;

        assert_eq!(result, base);
    }

    #[test]
    fn mutate_in_place() {
        let mut accumulated = input(&["channel-1"], &[]);
        accumulated += input(&["channel-2"], &["group-1"]);
        assert_eq!(accumulated.channels().unwrap().len(), 2);

        accumulated -= input(&["channel-1", "channel-2"], &[]);
        assert!(accumulated.channels().is_none());
        assert!(accumulated.contains_channel_group("group-1"));
    }
}
