//! Insert-or-update of the per-day metric record and the per-user goals row.
//!
//! Both are a read followed by a write. The pair runs under a lock keyed by
//! the natural key, so two saves for the same key in this process never both
//! take the insert branch.

use crate::errors::StoreError;
use crate::locks::KeyedLocks;
use crate::models::{GoalValues, HealthMetric, MetricFields, MetricInput, NewHealthMetric, UserGoals};
use crate::store::HealthStore;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome<T> {
    Created(T),
    Updated(T),
}

impl<T> SaveOutcome<T> {
    pub fn record(&self) -> &T {
        match self {
            Self::Created(r) | Self::Updated(r) => r,
        }
    }

    pub fn into_record(self) -> T {
        match self {
            Self::Created(r) | Self::Updated(r) => r,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Updated(_) => "updated",
        }
    }
}

pub const METRIC_ADDED: &str = "Health data added successfully";
pub const METRIC_UPDATED: &str = "Health data updated successfully";

/// Banner text for an outcome label; anything but `created` or `updated` has none.
pub fn metric_saved_message(outcome_label: &str) -> Option<&'static str> {
    match outcome_label {
        "created" => Some(METRIC_ADDED),
        "updated" => Some(METRIC_UPDATED),
        _ => None,
    }
}

pub struct DailyRecordResolver {
    store: Arc<dyn HealthStore>,
    locks: KeyedLocks<(Uuid, NaiveDate)>,
}

impl DailyRecordResolver {
    pub fn new(store: Arc<dyn HealthStore>) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
        }
    }

    pub async fn resolve(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        input: &MetricInput,
    ) -> Result<SaveOutcome<HealthMetric>, StoreError> {
        let fields = MetricFields::from_input(input);
        let _guard = self.locks.lock((user_id, date)).await;

        match self.store.find_metric(user_id, date).await? {
            Some(existing) => {
                let record = self
                    .store
                    .update_metric(existing.id, fields, Utc::now())
                    .await?;
                info!(user_id = %user_id, %date, id = %record.id, "health data updated");
                Ok(SaveOutcome::Updated(record))
            }
            None => {
                let record = self
                    .store
                    .insert_metric(NewHealthMetric {
                        user_id,
                        date,
                        fields,
                    })
                    .await?;
                info!(user_id = %user_id, %date, id = %record.id, "health data added");
                Ok(SaveOutcome::Created(record))
            }
        }
    }
}

pub struct GoalsResolver {
    store: Arc<dyn HealthStore>,
    locks: KeyedLocks<Uuid>,
}

impl GoalsResolver {
    pub fn new(store: Arc<dyn HealthStore>) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
        }
    }

    pub async fn resolve(
        &self,
        user_id: Uuid,
        goals: GoalValues,
    ) -> Result<SaveOutcome<UserGoals>, StoreError> {
        let _guard = self.locks.lock(user_id).await;

        match self.store.find_goals(user_id).await? {
            Some(existing) => {
                let row = self.store.update_goals(existing.id, goals, Utc::now()).await?;
                info!(user_id = %user_id, "goals updated");
                Ok(SaveOutcome::Updated(row))
            }
            None => {
                let row = self.store.insert_goals(user_id, goals).await?;
                info!(user_id = %user_id, "goals created");
                Ok(SaveOutcome::Created(row))
            }
        }
    }
}

/// The goals a user's progress is measured against: their saved row, or the
/// defaults when they have never saved one.
pub async fn goals_in_effect(
    store: &dyn HealthStore,
    user_id: Uuid,
) -> Result<(bool, GoalValues), StoreError> {
    Ok(match store.find_goals(user_id).await? {
        Some(row) => (true, GoalValues::from(&row)),
        None => (false, GoalValues::default()),
    })
}
