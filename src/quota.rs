//! Per-category daily generation quotas.

use crate::{error::StoreError, store::QuotaStore};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    pub remaining: i32,
    pub generated: i32,
    pub target: i32,
}

impl Quota {
    fn new(generated: i32, target: i32) -> Quota {
        Quota {
            remaining: (target - generated).max(0),
            generated,
            target,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryQuota {
    pub category: String,
    #[serde(flatten)]
    pub quota: Quota,
}

type Clock = Box<dyn Fn() -> NaiveDate + Send + Sync>;

pub struct QuotaTracker {
    store: Arc<dyn QuotaStore>,
    categories: Vec<String>,
    default_target: i32,
    today: Clock,
}

impl QuotaTracker {
    pub fn new(
        store: Arc<dyn QuotaStore>,
        categories: Vec<String>,
        default_target: i32,
    ) -> QuotaTracker {
        QuotaTracker {
            store,
            categories,
            default_target,
            today: Box::new(|| Local::today().naive_local()),
        }
    }

    pub fn with_clock<F>(mut self, today: F) -> Self
    where
        F: Fn() -> NaiveDate + Send + Sync + 'static,
    {
        self.today = Box::new(today);
        self
    }

    pub fn today(&self) -> NaiveDate {
        (self.today)()
    }

    pub fn remaining_quota(&self, category: &str) -> Result<Quota, StoreError> {
        let quota = match self.store.quota(self.today(), category)? {
            Some(row) => Quota::new(row.generated, row.target),
            None => Quota::new(0, self.default_target),
        };
        Ok(quota)
    }

    /// Counts one generated article against today's quota for `category`.
    pub fn record_generation(&self, category: &str) -> Result<Quota, StoreError> {
        let row = self
            .store
            .increment_generated(self.today(), category, self.default_target)?;
        log::debug!(
            "Quota for {} on {}: {}/{}",
            category,
            row.day,
            row.generated,
            row.target
        );
        Ok(Quota::new(row.generated, row.target))
    }

    /// Quotas for every configured category, in configuration order.
    pub fn all_category_quotas(&self) -> Result<Vec<CategoryQuota>, StoreError> {
        self.categories
            .iter()
            .map(|category| {
                Ok(CategoryQuota {
                    category: category.clone(),
                    quota: self.remaining_quota(category)?,
                })
            })
            .collect()
    }

    /// Categories with quota left, most remaining first. Ties keep
    /// configuration order.
    pub fn categories_needing_content(&self) -> Result<Vec<String>, StoreError> {
        let mut quotas: Vec<CategoryQuota> = self
            .all_category_quotas()?
            .into_iter()
            .filter(|q| q.quota.remaining > 0)
            .collect();
        quotas.sort_by(|a, b| b.quota.remaining.cmp(&a.quota.remaining));
        Ok(quotas.into_iter().map(|q| q.category).collect())
    }

    pub fn set_daily_target(&self, category: &str, target: i32) -> Result<Quota, StoreError> {
        if target <= 0 {
            return Err(StoreError::Invalid(format!(
                "daily target must be positive, got {}",
                target
            )));
        }
        let row = self.store.upsert_target(self.today(), category, target)?;
        log::info!("Daily target for {} set to {}", category, target);
        Ok(Quota::new(row.generated, row.target))
    }
}
