//! Daily correction quota for free users

use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::storage::{Repository, USER_KEY};
use crate::types::{PremiumStatus, UserStatus};

pub const DEFAULT_DAILY_LIMIT: u32 = 20;

/// Source of the current calendar date
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local calendar date of the host
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to one date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Corrections left for today; `Unbounded` serializes as `null`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Remaining {
    Unbounded,
    Limited(u32),
}

impl Remaining {
    pub fn is_exhausted(self) -> bool {
        self == Remaining::Limited(0)
    }
}

pub struct QuotaManager {
    repository: Repository,
    clock: Box<dyn Clock>,
    daily_limit: u32,
}

impl QuotaManager {
    pub fn new(repository: Repository, clock: Box<dyn Clock>, daily_limit: u32) -> Self {
        Self {
            repository,
            clock,
            daily_limit,
        }
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    /// Current status, with the counter reset when the stored day is not today
    pub fn status(&self) -> UserStatus {
        let today = self.clock.today();
        let stored: Option<UserStatus> = self.repository.load_or_default(USER_KEY, || None);

        let Some(mut status) = stored else {
            return UserStatus::fresh(today);
        };

        if status.last_used != today {
            tracing::debug!(
                "Day changed ({} -> {}), resetting correction count",
                status.last_used,
                today
            );
            status.correction_count = 0;
            status.last_used = today;
            self.save(&status);
        }

        status
    }

    /// Use one correction; `false` when the free daily limit is reached
    pub fn try_consume(&self) -> bool {
        let mut status = self.status();

        if status.is_premium() {
            return true;
        }

        if status.correction_count >= self.daily_limit {
            tracing::info!("Daily correction limit of {} reached", self.daily_limit);
            return false;
        }

        status.correction_count += 1;
        self.save(&status);
        true
    }

    pub fn remaining(&self) -> Remaining {
        let status = self.status();
        if status.is_premium() {
            Remaining::Unbounded
        } else {
            Remaining::Limited(self.daily_limit.saturating_sub(status.correction_count))
        }
    }

    pub fn set_premium(&self, premium_status: PremiumStatus) -> UserStatus {
        let mut status = self.status();
        status.premium_status = premium_status;
        self.save(&status);
        tracing::info!("Premium status set to {:?}", premium_status);
        status
    }

    fn save(&self, status: &UserStatus) {
        self.repository.save_or_log(USER_KEY, status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::UnavailableStore;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn manager(repository: &Repository, today: NaiveDate) -> QuotaManager {
        QuotaManager::new(repository.clone(), Box::new(FixedClock(today)), DEFAULT_DAILY_LIMIT)
    }

    fn stored(repository: &Repository) -> Option<UserStatus> {
        repository.load(USER_KEY).unwrap()
    }

    #[test]
    fn test_fresh_status() {
        let repo = Repository::in_memory();
        let quota = manager(&repo, date(2026, 10, 17));

        assert_eq!(quota.status(), UserStatus::fresh(date(2026, 10, 17)));
        assert_eq!(quota.remaining(), Remaining::Limited(20));
    }

    #[test]
    fn test_status_resets_on_new_day() {
        let repo = Repository::in_memory();
        repo.save(
            USER_KEY,
            &UserStatus {
                correction_count: 12,
                premium_status: PremiumStatus::Free,
                last_used: date(2026, 10, 16),
            },
        )
        .unwrap();

        let quota = manager(&repo, date(2026, 10, 17));
        let status = quota.status();

        assert_eq!(status.correction_count, 0);
        assert_eq!(status.last_used, date(2026, 10, 17));
        // Reset is persisted immediately
        assert_eq!(stored(&repo), Some(status));
    }

    #[test]
    fn test_status_same_day_keeps_count() {
        let repo = Repository::in_memory();
        let today = date(2026, 10, 17);
        let record = UserStatus {
            correction_count: 5,
            premium_status: PremiumStatus::Free,
            last_used: today,
        };
        repo.save(USER_KEY, &record).unwrap();

        assert_eq!(manager(&repo, today).status(), record);
    }

    #[test]
    fn test_consume_until_limit() {
        let repo = Repository::in_memory();
        let quota = manager(&repo, date(2026, 10, 17));

        for _ in 0..20 {
            assert!(quota.try_consume());
        }
        assert_eq!(quota.status().correction_count, 20);
        assert_eq!(quota.remaining(), Remaining::Limited(0));
        assert!(quota.remaining().is_exhausted());

        assert!(!quota.try_consume());
        assert_eq!(quota.status().correction_count, 20);
    }

    #[test]
    fn test_consume_at_limit_leaves_record_unchanged() {
        let repo = Repository::in_memory();
        let today = date(2026, 10, 17);
        let record = UserStatus {
            correction_count: 20,
            premium_status: PremiumStatus::Free,
            last_used: today,
        };
        repo.save(USER_KEY, &record).unwrap();

        assert!(!manager(&repo, today).try_consume());
        assert_eq!(stored(&repo), Some(record));
    }

    #[test]
    fn test_premium_never_counts() {
        let repo = Repository::in_memory();
        let today = date(2026, 10, 17);
        let record = UserStatus {
            correction_count: 25,
            premium_status: PremiumStatus::Premium,
            last_used: today,
        };
        repo.save(USER_KEY, &record).unwrap();
        let quota = manager(&repo, today);

        for _ in 0..50 {
            assert!(quota.try_consume());
        }
        assert_eq!(quota.status().correction_count, 25);
        assert_eq!(quota.remaining(), Remaining::Unbounded);
    }

    #[test]
    fn test_remaining_never_negative() {
        let repo = Repository::in_memory();
        let today = date(2026, 10, 17);
        repo.save(
            USER_KEY,
            &UserStatus {
                correction_count: 30,
                premium_status: PremiumStatus::Free,
                last_used: today,
            },
        )
        .unwrap();

        assert_eq!(manager(&repo, today).remaining(), Remaining::Limited(0));
    }

    #[test]
    fn test_set_premium() {
        let repo = Repository::in_memory();
        let quota = manager(&repo, date(2026, 10, 17));
        quota.try_consume();

        let status = quota.set_premium(PremiumStatus::Premium);
        assert!(status.is_premium());
        assert_eq!(status.correction_count, 1);
        assert_eq!(stored(&repo), Some(status));
    }

    #[test]
    fn test_custom_limit() {
        let repo = Repository::in_memory();
        let quota = QuotaManager::new(repo, Box::new(FixedClock(date(2026, 1, 1))), 2);

        assert!(quota.try_consume());
        assert!(quota.try_consume());
        assert!(!quota.try_consume());
    }

    #[test]
    fn test_corrupt_record_degrades_to_fresh() {
        let repo = Repository::in_memory();
        repo.save(USER_KEY, "garbage").unwrap();
        let quota = manager(&repo, date(2026, 10, 17));

        assert_eq!(quota.status(), UserStatus::fresh(date(2026, 10, 17)));
        assert!(quota.try_consume());
        assert_eq!(quota.status().correction_count, 1);
    }

    #[test]
    fn test_unavailable_storage_allows_use() {
        let repo = Repository::new(Arc::new(UnavailableStore));
        let quota = manager(&repo, date(2026, 10, 17));

        assert!(quota.try_consume());
        // Nothing is remembered without storage
        assert_eq!(quota.remaining(), Remaining::Limited(20));
    }

    #[test]
    fn test_remaining_serializes_unbounded_as_null() {
        assert_eq!(serde_json::to_string(&Remaining::Unbounded).unwrap(), "null");
        assert_eq!(serde_json::to_string(&Remaining::Limited(4)).unwrap(), "4");
    }
}
