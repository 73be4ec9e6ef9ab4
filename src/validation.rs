//! Declarative form rules, checked before anything reaches a resolver.
//!
//! Each form is a table of [`FieldRule`]s. The same tables drive the HTML
//! inputs (`min`, `max`, `step`, `required`) and the server-side checks.

use crate::models::{GoalValues, MetricInput};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Date,
    Integer,
    Decimal,
    Email,
    Password,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Limit {
    Inclusive(f64),
    Exclusive(f64),
}

impl Limit {
    pub fn value(self) -> f64 {
        match self {
            Self::Inclusive(v) | Self::Exclusive(v) => v,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Shown when a required field is missing.
    pub message: &'static str,
    pub min: Option<Limit>,
    pub max: Option<Limit>,
    pub step: Option<f64>,
    pub min_len: Option<usize>,
}

impl FieldRule {
    const fn new(name: &'static str, label: &'static str, kind: FieldKind, message: &'static str) -> Self {
        Self {
            name,
            label,
            kind,
            required: true,
            message,
            min: None,
            max: None,
            step: None,
            min_len: None,
        }
    }

    const fn min(mut self, limit: Limit) -> Self {
        self.min = Some(limit);
        self
    }

    const fn max(mut self, limit: Limit) -> Self {
        self.max = Some(limit);
        self
    }

    const fn step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    const fn min_len(mut self, len: usize) -> Self {
        self.min_len = Some(len);
        self
    }
}

pub const METRIC_RULES: &[FieldRule] = &[
    FieldRule::new("date", "Date", FieldKind::Date, "Please select a date"),
    FieldRule::new("steps", "Steps", FieldKind::Integer, "Please enter steps")
        .min(Limit::Inclusive(0.0))
        .max(Limit::Inclusive(u32::MAX as f64))
        .step(1.0),
    FieldRule::new("water_intake", "Water Intake (Liters)", FieldKind::Decimal, "Please enter water intake")
        .min(Limit::Inclusive(0.0))
        .step(0.1),
    FieldRule::new("weight", "Weight (kg)", FieldKind::Decimal, "Please enter weight")
        .min(Limit::Inclusive(0.0))
        .step(0.1),
    FieldRule::new("sleep_hours", "Sleep Hours", FieldKind::Decimal, "Please enter sleep hours")
        .min(Limit::Inclusive(0.0))
        .max(Limit::Inclusive(24.0))
        .step(0.5),
];

pub const GOAL_RULES: &[FieldRule] = &[
    FieldRule::new("steps_goal", "Daily Steps Goal", FieldKind::Integer, "Please enter steps goal")
        .min(Limit::Exclusive(0.0))
        .max(Limit::Inclusive(u32::MAX as f64))
        .step(1.0),
    FieldRule::new("water_goal", "Daily Water Intake Goal (Liters)", FieldKind::Decimal, "Please enter water goal")
        .min(Limit::Exclusive(0.0))
        .step(0.1),
    FieldRule::new("weight_goal", "Target Weight (kg)", FieldKind::Decimal, "Please enter weight goal")
        .min(Limit::Exclusive(0.0))
        .step(0.1),
    FieldRule::new("sleep_goal", "Daily Sleep Goal (Hours)", FieldKind::Decimal, "Please enter sleep goal")
        .min(Limit::Exclusive(0.0))
        .max(Limit::Inclusive(24.0))
        .step(0.5),
];

pub const LOGIN_RULES: &[FieldRule] = &[
    FieldRule::new("email", "Email", FieldKind::Email, "Please enter a valid email"),
    FieldRule::new("password", "Password", FieldKind::Password, "Please enter your password"),
];

pub const SIGNUP_RULES: &[FieldRule] = &[
    FieldRule::new("email", "Email", FieldKind::Email, "Please enter a valid email"),
    FieldRule::new(
        "password",
        "Password",
        FieldKind::Password,
        "Password must be at least 6 characters",
    )
    .min_len(6),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

pub type FormValues = HashMap<String, String>;

/// Checks every rule and returns all failures, in rule order.
pub fn validate(rules: &[FieldRule], form: &FormValues) -> Vec<FieldError> {
    collect_errors(rules, form, true)
}

/// Like [`validate`], but absent fields pass. Used by the JSON API, where a
/// missing metric is saved as 0.
pub fn validate_present(rules: &[FieldRule], form: &FormValues) -> Vec<FieldError> {
    collect_errors(rules, form, false)
}

fn collect_errors(rules: &[FieldRule], form: &FormValues, enforce_required: bool) -> Vec<FieldError> {
    rules
        .iter()
        .filter_map(|rule| {
            let raw = form.get(rule.name).map(|v| v.trim()).filter(|v| !v.is_empty());
            check(rule, raw, enforce_required).map(|message| FieldError {
                field: rule.name,
                message,
            })
        })
        .collect()
}

fn check(rule: &FieldRule, raw: Option<&str>, enforce_required: bool) -> Option<String> {
    let Some(raw) = raw else {
        return (rule.required && enforce_required).then(|| rule.message.to_string());
    };

    match rule.kind {
        FieldKind::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .err()
            .map(|_| format!("{} must be a date (YYYY-MM-DD)", rule.label)),
        FieldKind::Email => (!looks_like_email(raw)).then(|| rule.message.to_string()),
        FieldKind::Password => match rule.min_len {
            Some(len) if raw.chars().count() < len => Some(rule.message.to_string()),
            _ => None,
        },
        FieldKind::Integer | FieldKind::Decimal => check_number(rule, raw),
    }
}

fn check_number(rule: &FieldRule, raw: &str) -> Option<String> {
    let value = match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => return Some(format!("{} must be a number", rule.label)),
    };
    if rule.kind == FieldKind::Integer && value.fract() != 0.0 {
        return Some(format!("{} must be a whole number", rule.label));
    }
    match rule.min {
        Some(Limit::Inclusive(min)) if value < min => {
            return Some(format!("{} must be at least {min}", rule.label));
        }
        Some(Limit::Exclusive(min)) if value <= min => {
            return Some(format!("{} must be greater than {min}", rule.label));
        }
        _ => {}
    }
    match rule.max {
        Some(Limit::Inclusive(max)) if value > max => Some(format!("{} must be at most {max}", rule.label)),
        Some(Limit::Exclusive(max)) if value >= max => Some(format!("{} must be less than {max}", rule.label)),
        _ => None,
    }
}

fn looks_like_email(raw: &str) -> bool {
    if raw.chars().any(char::is_whitespace) {
        return false;
    }
    match raw.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn number(form: &FormValues, name: &str) -> Option<f64> {
    form.get(name).and_then(|v| v.trim().parse::<f64>().ok())
}

/// A validated metric form: the target date and its values.
pub fn parse_metric_form(form: &FormValues) -> Result<(NaiveDate, MetricInput), Vec<FieldError>> {
    let errors = validate(METRIC_RULES, form);
    if !errors.is_empty() {
        return Err(errors);
    }
    let date = form
        .get("date")
        .and_then(|v| NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").ok())
        .ok_or_else(|| {
            vec![FieldError {
                field: "date",
                message: "Please select a date".to_string(),
            }]
        })?;
    Ok((
        date,
        MetricInput {
            steps: number(form, "steps"),
            water_intake: number(form, "water_intake"),
            weight: number(form, "weight"),
            sleep_hours: number(form, "sleep_hours"),
        },
    ))
}

pub fn parse_goals_form(form: &FormValues) -> Result<GoalValues, Vec<FieldError>> {
    let errors = validate(GOAL_RULES, form);
    if !errors.is_empty() {
        return Err(errors);
    }
    let defaults = GoalValues::default();
    Ok(GoalValues {
        steps_goal: number(form, "steps_goal").map_or(defaults.steps_goal, |v| v as u32),
        water_goal: number(form, "water_goal").unwrap_or(defaults.water_goal),
        weight_goal: number(form, "weight_goal").unwrap_or(defaults.weight_goal),
        sleep_goal: number(form, "sleep_goal").unwrap_or(defaults.sleep_goal),
    })
}

/// Trimmed, lowercased email and the password as entered.
pub fn parse_credentials(
    rules: &[FieldRule],
    form: &FormValues,
) -> Result<(String, String), Vec<FieldError>> {
    let errors = validate(rules, form);
    if !errors.is_empty() {
        return Err(errors);
    }
    let email = form.get("email").map(|v| normalize_email(v)).unwrap_or_default();
    let password = form.get("password").cloned().unwrap_or_default();
    Ok((email, password))
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Joins error messages for places that show a single line.
pub fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> FormValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn metric_form() -> FormValues {
        form(&[
            ("date", "2026-01-05"),
            ("steps", "5000"),
            ("water_intake", "1.5"),
            ("weight", "70"),
            ("sleep_hours", "7"),
        ])
    }

    #[test]
    fn complete_metric_form_parses() {
        let (date, input) = parse_metric_form(&metric_form()).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
        assert_eq!(input.steps, Some(5000.0));
        assert_eq!(input.sleep_hours, Some(7.0));
    }

    #[test]
    fn missing_fields_report_their_messages() {
        let errors = validate(METRIC_RULES, &form(&[("date", "2026-01-05"), ("steps", " ")]));
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["steps", "water_intake", "weight", "sleep_hours"]);
        assert_eq!(errors[0].message, "Please enter steps");
    }

    #[test]
    fn ranges_and_kinds_are_enforced() {
        let mut values = metric_form();
        values.insert("sleep_hours".into(), "25".into());
        values.insert("steps".into(), "10.5".into());
        values.insert("weight".into(), "-1".into());
        values.insert("water_intake".into(), "lots".into());
        let errors = validate(METRIC_RULES, &values);
        let messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Steps must be a whole number",
                "Water Intake (Liters) must be a number",
                "Weight (kg) must be at least 0",
                "Sleep Hours must be at most 24",
            ]
        );
    }

    #[test]
    fn steps_beyond_u32_are_rejected() {
        let values = form(&[("date", "2026-01-05"), ("steps", "5000000000")]);
        let errors = validate_present(METRIC_RULES, &values);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "steps");
        assert_eq!(errors[0].message, "Steps must be at most 4294967295");

        let at_limit = form(&[("steps", "4294967295")]);
        assert!(validate_present(METRIC_RULES, &at_limit).is_empty());
    }

    #[test]
    fn partial_validation_skips_missing_but_checks_present() {
        let values = form(&[("date", "2026-01-05"), ("sleep_hours", "30")]);
        let errors = validate_present(METRIC_RULES, &values);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "sleep_hours");
        assert!(validate_present(METRIC_RULES, &form(&[])).is_empty());
    }

    #[test]
    fn zero_goals_are_rejected() {
        let values = form(&[
            ("steps_goal", "0"),
            ("water_goal", "2.5"),
            ("weight_goal", "70"),
            ("sleep_goal", "24"),
        ]);
        let errors = parse_goals_form(&values).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "steps_goal");
        assert_eq!(errors[0].message, "Daily Steps Goal must be greater than 0");
    }

    #[test]
    fn goals_form_parses() {
        let values = form(&[
            ("steps_goal", "8000"),
            ("water_goal", "3"),
            ("weight_goal", "65.5"),
            ("sleep_goal", "7.5"),
        ]);
        let goals = parse_goals_form(&values).unwrap();
        assert_eq!(goals.steps_goal, 8000);
        assert_eq!(goals.weight_goal, 65.5);
    }

    #[test]
    fn credentials_are_normalized_and_checked() {
        let (email, password) = parse_credentials(
            SIGNUP_RULES,
            &form(&[("email", "  Ana@Example.COM "), ("password", "secret1")]),
        )
        .unwrap();
        assert_eq!(email, "ana@example.com");
        assert_eq!(password, "secret1");

        let errors = parse_credentials(
            SIGNUP_RULES,
            &form(&[("email", "not-an-email"), ("password", "123")]),
        )
        .unwrap_err();
        assert_eq!(
            summarize(&errors),
            "Please enter a valid email; Password must be at least 6 characters"
        );

        assert!(parse_credentials(LOGIN_RULES, &form(&[("email", "a@b.co"), ("password", "1")])).is_ok());
    }
}
