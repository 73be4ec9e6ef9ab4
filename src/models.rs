use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_STEPS_GOAL: u32 = 10_000;
pub const DEFAULT_WATER_GOAL: f64 = 2.5;
pub const DEFAULT_WEIGHT_GOAL: f64 = 70.0;
pub const DEFAULT_SLEEP_GOAL: f64 = 8.0;

/// One day's logged values for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMetric {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub steps: u32,
    pub water_intake: f64,
    pub weight: f64,
    pub sleep_hours: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The four values a save writes onto a metric record.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricFields {
    pub steps: u32,
    pub water_intake: f64,
    pub weight: f64,
    pub sleep_hours: f64,
}

impl MetricFields {
    /// Absent, non-finite or negative inputs become 0; steps are truncated.
    pub fn from_input(input: &MetricInput) -> Self {
        Self {
            steps: non_negative(input.steps).floor().min(f64::from(u32::MAX)) as u32,
            water_intake: non_negative(input.water_intake),
            weight: non_negative(input.weight),
            sleep_hours: non_negative(input.sleep_hours),
        }
    }
}

fn non_negative(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

impl From<&HealthMetric> for MetricFields {
    fn from(record: &HealthMetric) -> Self {
        Self {
            steps: record.steps,
            water_intake: record.water_intake,
            weight: record.weight,
            sleep_hours: record.sleep_hours,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricInput {
    #[serde(default)]
    pub steps: Option<f64>,
    #[serde(default)]
    pub water_intake: Option<f64>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub sleep_hours: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHealthMetric {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub fields: MetricFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserGoals {
    pub id: Uuid,
    pub user_id: Uuid,
    pub steps_goal: u32,
    pub water_goal: f64,
    pub weight_goal: f64,
    pub sleep_goal: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalValues {
    pub steps_goal: u32,
    pub water_goal: f64,
    pub weight_goal: f64,
    pub sleep_goal: f64,
}

impl Default for GoalValues {
    fn default() -> Self {
        Self {
            steps_goal: DEFAULT_STEPS_GOAL,
            water_goal: DEFAULT_WATER_GOAL,
            weight_goal: DEFAULT_WEIGHT_GOAL,
            sleep_goal: DEFAULT_SLEEP_GOAL,
        }
    }
}

impl From<&UserGoals> for GoalValues {
    fn from(goals: &UserGoals) -> Self {
        Self {
            steps_goal: goals.steps_goal,
            water_goal: goals.water_goal,
            weight_goal: goals.weight_goal,
            sleep_goal: goals.sleep_goal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// What request handlers see of a signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Everything the file store persists, one field per table.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppData {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub health_metrics: Vec<HealthMetric>,
    #[serde(default)]
    pub user_goals: Vec<UserGoals>,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignInResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Deserialize)]
pub struct SaveMetricRequest {
    pub date: Option<NaiveDate>,
    #[serde(flatten)]
    pub values: MetricInput,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SaveMetricResponse {
    pub outcome: String,
    pub message: String,
    pub record: HealthMetric,
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub page: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GoalsResponse {
    pub saved: bool,
    pub goals: GoalValues,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetricProgress {
    pub key: String,
    pub title: String,
    pub value: f64,
    pub goal: f64,
    pub suffix: String,
    pub percent: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub date: NaiveDate,
    pub record: Option<HealthMetric>,
    pub goals: GoalValues,
    pub metrics: Vec<MetricProgress>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub steps: Vec<u32>,
    pub water: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub records: Vec<HealthMetric>,
    pub chart: ChartSeries,
}
