//! Registered users and their day streaks.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::ledger::UserId;

/// Per-user streak state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    #[serde(default)]
    pub day_streak: u32,
    #[serde(default)]
    pub last_day_complete: Option<NaiveDate>,
    #[serde(default)]
    pub longest_streak: u32,
    #[serde(default)]
    pub joined_on: Option<NaiveDate>,
}

impl UserRecord {
    pub fn new(user_id: UserId, joined_on: NaiveDate) -> Self {
        Self {
            user_id,
            day_streak: 0,
            last_day_complete: None,
            longest_streak: 0,
            joined_on: Some(joined_on),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawUsers {
    Records(Vec<UserRecord>),
    Tables(BTreeMap<String, BTreeMap<String, UserRecord>>),
}

/// All known users, keyed by id. Users are never deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Users {
    users: BTreeMap<UserId, UserRecord>,
}

impl Serialize for Users {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.users.values())
    }
}

impl<'de> Deserialize<'de> for Users {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let records: Vec<UserRecord> = match RawUsers::deserialize(deserializer)? {
            RawUsers::Records(records) => records,
            RawUsers::Tables(tables) => tables
                .into_values()
                .flat_map(|table| table.into_values())
                .collect(),
        };
        // Older registries never stored a best streak.
        Ok(Users {
            users: records
                .into_iter()
                .map(|mut u| {
                    u.longest_streak = u.longest_streak.max(u.day_streak);
                    (u.user_id, u)
                })
                .collect(),
        })
    }
}

impl Users {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user on first interaction. Returns true if newly added.
    pub fn add_user(&mut self, user_id: UserId, today: NaiveDate) -> bool {
        if self.users.contains_key(&user_id) {
            return false;
        }
        self.users.insert(user_id, UserRecord::new(user_id, today));
        true
    }

    pub fn get(&self, user_id: UserId) -> Option<&UserRecord> {
        self.users.get(&user_id)
    }

    pub(crate) fn get_mut(&mut self, user_id: UserId) -> Option<&mut UserRecord> {
        self.users.get_mut(&user_id)
    }

    pub fn ids(&self) -> Vec<UserId> {
        self.users.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserRecord> {
        self.users.values()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Current streak, 0 for unknown users.
    pub fn day_streak(&self, user_id: UserId) -> u32 {
        self.get(user_id).map(|u| u.day_streak).unwrap_or(0)
    }
}
