//! The data store the rest of the app talks to.
//!
//! `HealthStore` covers the `health_metrics` and `user_goals` tables,
//! `UserStore` the `users` and `sessions` tables the session provider owns.
//! `FileStore` implements both over a single JSON file.

use crate::errors::StoreError;
use crate::models::{
    AppData, GoalValues, HealthMetric, MetricFields, NewHealthMetric, Session, User, UserGoals,
};
use crate::storage::{load_data, persist_data};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::path::PathBuf;
use tokio::sync::Mutex;
use uuid::Uuid;

#[async_trait]
pub trait HealthStore: Send + Sync {
    async fn find_metric(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<HealthMetric>, StoreError>;

    /// Inserts a new row; the store assigns `id`, `created_at` and `updated_at`.
    async fn insert_metric(&self, record: NewHealthMetric) -> Result<HealthMetric, StoreError>;

    async fn update_metric(
        &self,
        id: Uuid,
        fields: MetricFields,
        updated_at: DateTime<Utc>,
    ) -> Result<HealthMetric, StoreError>;

    /// Rows with `start <= date <= end`, most recent first.
    async fn metrics_in_range(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HealthMetric>, StoreError>;

    async fn find_goals(&self, user_id: Uuid) -> Result<Option<UserGoals>, StoreError>;

    async fn insert_goals(&self, user_id: Uuid, goals: GoalValues) -> Result<UserGoals, StoreError>;

    async fn update_goals(
        &self,
        id: Uuid,
        goals: GoalValues,
        updated_at: DateTime<Utc>,
    ) -> Result<UserGoals, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// `email` is expected in normalized (trimmed, lowercase) form.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Fails with `StoreError::Conflict` when the email is already registered.
    async fn insert_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;

    async fn insert_session(&self, session: Session) -> Result<(), StoreError>;

    async fn find_session(&self, token: &str) -> Result<Option<Session>, StoreError>;

    /// Returns whether a session was removed.
    async fn delete_session(&self, token: &str) -> Result<bool, StoreError>;

    /// Drops sessions created before `cutoff` and returns how many went.
    async fn delete_sessions_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError>;
}

pub struct FileStore {
    path: Option<PathBuf>,
    data: Mutex<AppData>,
}

impl FileStore {
    pub async fn open(path: PathBuf) -> Result<Self, StoreError> {
        let data = load_data(&path).await?;
        Ok(Self {
            path: Some(path),
            data: Mutex::new(data),
        })
    }

    /// A store that never touches the disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: Mutex::new(AppData::default()),
        }
    }

    async fn read<T>(&self, query: impl FnOnce(&AppData) -> T) -> T {
        let data = self.data.lock().await;
        query(&data)
    }

    /// Applies `change` to a copy of the tables and swaps it in only once the
    /// copy is on disk, so a failed write leaves memory and file in agreement.
    async fn write<T, F>(&self, change: F) -> Result<T, StoreError>
    where
        T: Send,
        F: FnOnce(&mut AppData) -> Result<T, StoreError> + Send,
    {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        let out = change(&mut next)?;
        if let Some(path) = &self.path {
            persist_data(path, &next).await?;
        }
        *data = next;
        Ok(out)
    }
}

#[async_trait]
impl HealthStore for FileStore {
    async fn find_metric(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<HealthMetric>, StoreError> {
        Ok(self
            .read(|data| {
                data.health_metrics
                    .iter()
                    .find(|row| row.user_id == user_id && row.date == date)
                    .cloned()
            })
            .await)
    }

    async fn insert_metric(&self, record: NewHealthMetric) -> Result<HealthMetric, StoreError> {
        self.write(|data| {
            let now = Utc::now();
            let row = HealthMetric {
                id: Uuid::new_v4(),
                user_id: record.user_id,
                date: record.date,
                steps: record.fields.steps,
                water_intake: record.fields.water_intake,
                weight: record.fields.weight,
                sleep_hours: record.fields.sleep_hours,
                created_at: now,
                updated_at: now,
            };
            data.health_metrics.push(row.clone());
            Ok(row)
        })
        .await
    }

    async fn update_metric(
        &self,
        id: Uuid,
        fields: MetricFields,
        updated_at: DateTime<Utc>,
    ) -> Result<HealthMetric, StoreError> {
        self.write(|data| {
            let row = data
                .health_metrics
                .iter_mut()
                .find(|row| row.id == id)
                .ok_or_else(|| StoreError::NotFound {
                    table: "health_metrics",
                    id: id.to_string(),
                })?;
            row.steps = fields.steps;
            row.water_intake = fields.water_intake;
            row.weight = fields.weight;
            row.sleep_hours = fields.sleep_hours;
            row.updated_at = updated_at;
            Ok(row.clone())
        })
        .await
    }

    async fn metrics_in_range(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HealthMetric>, StoreError> {
        let mut rows = self
            .read(|data| {
                data.health_metrics
                    .iter()
                    .filter(|row| row.user_id == user_id && row.date >= start && row.date <= end)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await;
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(rows)
    }

    async fn find_goals(&self, user_id: Uuid) -> Result<Option<UserGoals>, StoreError> {
        Ok(self
            .read(|data| {
                data.user_goals
                    .iter()
                    .find(|row| row.user_id == user_id)
                    .cloned()
            })
            .await)
    }

    async fn insert_goals(&self, user_id: Uuid, goals: GoalValues) -> Result<UserGoals, StoreError> {
        self.write(|data| {
            let now = Utc::now();
            let row = UserGoals {
                id: Uuid::new_v4(),
                user_id,
                steps_goal: goals.steps_goal,
                water_goal: goals.water_goal,
                weight_goal: goals.weight_goal,
                sleep_goal: goals.sleep_goal,
                created_at: now,
                updated_at: now,
            };
            data.user_goals.push(row.clone());
            Ok(row)
        })
        .await
    }

    async fn update_goals(
        &self,
        id: Uuid,
        goals: GoalValues,
        updated_at: DateTime<Utc>,
    ) -> Result<UserGoals, StoreError> {
        self.write(|data| {
            let row = data
                .user_goals
                .iter_mut()
                .find(|row| row.id == id)
                .ok_or_else(|| StoreError::NotFound {
                    table: "user_goals",
                    id: id.to_string(),
                })?;
            row.steps_goal = goals.steps_goal;
            row.water_goal = goals.water_goal;
            row.weight_goal = goals.weight_goal;
            row.sleep_goal = goals.sleep_goal;
            row.updated_at = updated_at;
            Ok(row.clone())
        })
        .await
    }
}

#[async_trait]
impl UserStore for FileStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .read(|data| data.users.iter().find(|user| user.email == email).cloned())
            .await)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self
            .read(|data| data.users.iter().find(|user| user.id == id).cloned())
            .await)
    }

    async fn insert_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        self.write(|data| {
            if data.users.iter().any(|user| user.email == email) {
                return Err(StoreError::Conflict {
                    table: "users",
                    key: email.to_string(),
                });
            }
            let user = User {
                id: Uuid::new_v4(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                created_at: Utc::now(),
            };
            data.users.push(user.clone());
            Ok(user)
        })
        .await
    }

    async fn insert_session(&self, session: Session) -> Result<(), StoreError> {
        self.write(|data| {
            data.sessions.push(session);
            Ok(())
        })
        .await
    }

    async fn find_session(&self, token: &str) -> Result<Option<Session>, StoreError> {
        Ok(self
            .read(|data| data.sessions.iter().find(|s| s.token == token).cloned())
            .await)
    }

    async fn delete_session(&self, token: &str) -> Result<bool, StoreError> {
        self.write(|data| {
            let before = data.sessions.len();
            data.sessions.retain(|s| s.token != token);
            Ok(data.sessions.len() != before)
        })
        .await
    }

    async fn delete_sessions_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let stale = self
            .read(|data| data.sessions.iter().filter(|s| s.created_at < cutoff).count())
            .await;
        if stale == 0 {
            return Ok(0);
        }
        self.write(|data| {
            let before = data.sessions.len();
            data.sessions.retain(|s| s.created_at >= cutoff);
            Ok(before - data.sessions.len())
        })
        .await
    }
}
