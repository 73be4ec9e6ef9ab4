use crate::auth::{CurrentUser, MaybeUser, ThemePref, clear_session_cookie, session_cookie};
use crate::errors::{AppError, AuthError};
use crate::history::{DateRange, build_history, paginate, query_history};
use crate::models::{
    CredentialsRequest, DashboardResponse, DateQuery, GoalValues, GoalsResponse, HealthMetric,
    HistoryQuery, HistoryResponse, MetricInput, SaveMetricRequest, SaveMetricResponse,
    SignInResponse, UserProfile,
};
use crate::progress::build_dashboard;
use crate::resolver::{METRIC_ADDED, METRIC_UPDATED, SaveOutcome, goals_in_effect, metric_saved_message};
use crate::session::SessionProvider;
use crate::state::AppState;
use crate::store::HealthStore;
use crate::ui::{
    ADD_DATA_PAGE, Notice, SETTINGS_PAGE, render_auth, render_dashboard, render_form_page,
    render_history,
};
use crate::validation::{
    FieldError, FormValues, LOGIN_RULES, METRIC_RULES, SIGNUP_RULES, parse_credentials,
    parse_goals_form, parse_metric_form, summarize, validate_present,
};
use axum::{
    Form, Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

const SAVE_FAILED: &str = "Failed to save data";
const GOALS_FAILED: &str = "Failed to update goals";
const SIGN_IN_FAILED: &str = "Invalid credentials";
const SIGN_UP_FAILED: &str = "Failed to create account";

#[derive(Debug, Deserialize)]
pub struct NoticeQuery {
    pub notice: Option<String>,
    pub saved: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ThemeForm {
    pub return_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GoalsRequest {
    pub steps_goal: Option<f64>,
    pub water_goal: Option<f64>,
    pub weight_goal: Option<f64>,
    pub sleep_goal: Option<f64>,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn with_cookie(cookie: String, response: impl IntoResponse) -> Response {
    ([(header::SET_COOKIE, cookie)], response).into_response()
}

/// Loads today's record and goals for display; fetch failures are logged and
/// the dashboard falls back to an empty day against default goals.
async fn load_dashboard(state: &AppState, user_id: Uuid, date: NaiveDate) -> DashboardResponse {
    let record = state
        .store
        .find_metric(user_id, date)
        .await
        .unwrap_or_else(|err| {
            error!("failed to load health data: {err}");
            None
        });
    let goals = load_goals(state, user_id).await.1;
    build_dashboard(date, record, goals)
}

async fn load_goals(state: &AppState, user_id: Uuid) -> (bool, GoalValues) {
    goals_in_effect(state.store.as_ref(), user_id)
        .await
        .unwrap_or_else(|err| {
            error!("failed to load goals: {err}");
            (false, GoalValues::default())
        })
}

fn metric_form_values(date: NaiveDate, record: Option<&HealthMetric>) -> FormValues {
    let mut values = FormValues::new();
    values.insert("date".to_string(), date.to_string());
    if let Some(r) = record {
        values.insert("steps".to_string(), r.steps.to_string());
        values.insert("water_intake".to_string(), r.water_intake.to_string());
        values.insert("weight".to_string(), r.weight.to_string());
        values.insert("sleep_hours".to_string(), r.sleep_hours.to_string());
    }
    values
}

fn goal_form_values(goals: GoalValues) -> FormValues {
    [
        ("steps_goal", goals.steps_goal.to_string()),
        ("water_goal", goals.water_goal.to_string()),
        ("weight_goal", goals.weight_goal.to_string()),
        ("sleep_goal", goals.sleep_goal.to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn insert_number(values: &mut FormValues, name: &str, value: Option<f64>) {
    if let Some(v) = value {
        values.insert(name.to_string(), v.to_string());
    }
}

fn credentials_form(payload: &CredentialsRequest) -> FormValues {
    let mut values = FormValues::new();
    values.insert("email".to_string(), payload.email.clone());
    values.insert("password".to_string(), payload.password.clone());
    values
}

fn log_auth_failure(action: &str, err: &AuthError) {
    match err {
        AuthError::Store(_) | AuthError::Hash(_) => error!("{action} failed: {err}"),
        _ => warn!("{action} rejected: {err}"),
    }
}

pub async fn auth_page(
    MaybeUser(user): MaybeUser,
    ThemePref(theme): ThemePref,
    Query(query): Query<NoticeQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    let notice = match query.notice.as_deref() {
        Some("signed_up") => Some(Notice {
            ok: true,
            text: "Account created! Please log in.",
        }),
        Some("signed_out") => Some(Notice {
            ok: true,
            text: "Signed out",
        }),
        _ => None,
    };
    Html(render_auth(theme, "", notice.as_ref())).into_response()
}

pub async fn login(
    State(state): State<AppState>,
    ThemePref(theme): ThemePref,
    Form(form): Form<FormValues>,
) -> Response {
    let entered_email = form.get("email").cloned().unwrap_or_default();
    let failure = |text: &str| {
        let notice = Notice { ok: false, text };
        (
            StatusCode::UNAUTHORIZED,
            Html(render_auth(theme, &entered_email, Some(&notice))),
        )
            .into_response()
    };

    let (email, password) = match parse_credentials(LOGIN_RULES, &form) {
        Ok(credentials) => credentials,
        Err(errors) => return failure(summarize(&errors).as_str()),
    };
    match state.sessions.sign_in(&email, &password).await {
        Ok((token, _)) => with_cookie(session_cookie(&token), Redirect::to("/")),
        Err(err) => {
            log_auth_failure("sign-in", &err);
            failure(SIGN_IN_FAILED)
        }
    }
}

pub async fn signup(
    State(state): State<AppState>,
    ThemePref(theme): ThemePref,
    Form(form): Form<FormValues>,
) -> Response {
    let failure = |text: &str| {
        let notice = Notice { ok: false, text };
        (
            StatusCode::BAD_REQUEST,
            Html(render_auth(theme, "", Some(&notice))),
        )
            .into_response()
    };

    let (email, password) = match parse_credentials(SIGNUP_RULES, &form) {
        Ok(credentials) => credentials,
        Err(errors) => return failure(summarize(&errors).as_str()),
    };
    match state.sessions.sign_up(&email, &password).await {
        Ok(_) => Redirect::to("/auth?notice=signed_up").into_response(),
        Err(err) => {
            log_auth_failure("sign-up", &err);
            failure(SIGN_UP_FAILED)
        }
    }
}

pub async fn logout(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> Response {
    if let Some(current) = user {
        if let Err(err) = state.sessions.sign_out(&current.token).await {
            error!("failed to end session: {err}");
        }
    }
    with_cookie(clear_session_cookie(), Redirect::to("/auth?notice=signed_out"))
}

pub async fn dashboard(
    State(state): State<AppState>,
    user: MaybeUser,
    ThemePref(theme): ThemePref,
    Query(query): Query<NoticeQuery>,
) -> Response {
    let current = match user.require() {
        Ok(current) => current,
        Err(redirect) => return redirect.into_response(),
    };
    let view = load_dashboard(&state, current.user.id, today()).await;
    let notice = query
        .saved
        .as_deref()
        .and_then(metric_saved_message)
        .map(|text| Notice { ok: true, text });
    Html(render_dashboard(theme, &current.user, &view, notice.as_ref())).into_response()
}

pub async fn add_page(
    State(state): State<AppState>,
    user: MaybeUser,
    ThemePref(theme): ThemePref,
    Query(query): Query<DateQuery>,
) -> Response {
    let current = match user.require() {
        Ok(current) => current,
        Err(redirect) => return redirect.into_response(),
    };
    let date = query.date.unwrap_or_else(today);
    let record = state
        .store
        .find_metric(current.user.id, date)
        .await
        .unwrap_or_else(|err| {
            error!("failed to load health data: {err}");
            None
        });
    let values = metric_form_values(date, record.as_ref());
    Html(render_form_page(theme, &current.user, ADD_DATA_PAGE, &values, &[], None)).into_response()
}

pub async fn add_submit(
    State(state): State<AppState>,
    user: MaybeUser,
    ThemePref(theme): ThemePref,
    Form(form): Form<FormValues>,
) -> Response {
    let current = match user.require() {
        Ok(current) => current,
        Err(redirect) => return redirect.into_response(),
    };
    let rerender = |status: StatusCode, errors: &[FieldError], notice: Option<&Notice<'_>>| {
        (
            status,
            Html(render_form_page(theme, &current.user, ADD_DATA_PAGE, &form, errors, notice)),
        )
            .into_response()
    };

    let (date, input) = match parse_metric_form(&form) {
        Ok(parsed) => parsed,
        Err(errors) => return rerender(StatusCode::BAD_REQUEST, &errors, None),
    };
    match state.metrics.resolve(current.user.id, date, &input).await {
        Ok(outcome) => Redirect::to(&format!("/?saved={}", outcome.label())).into_response(),
        Err(err) => {
            error!("failed to save health data: {err}");
            let notice = Notice {
                ok: false,
                text: SAVE_FAILED,
            };
            rerender(StatusCode::INTERNAL_SERVER_ERROR, &[], Some(&notice))
        }
    }
}

pub async fn history_page(
    State(state): State<AppState>,
    user: MaybeUser,
    ThemePref(theme): ThemePref,
    Query(query): Query<HistoryQuery>,
) -> Result<Response, AppError> {
    let current = match user.require() {
        Ok(current) => current,
        Err(redirect) => return Ok(redirect.into_response()),
    };
    let range = DateRange::resolve(query.start, query.end, today())
        .map_err(|err| AppError::bad_request(err.to_string()))?;
    let rows = query_history(state.store.as_ref(), current.user.id, range)
        .await
        .unwrap_or_else(|err| {
            error!("failed to load history: {err}");
            Vec::new()
        });
    let page = paginate(&rows, query.page);
    Ok(Html(render_history(theme, &current.user, range, &page)).into_response())
}

pub async fn settings_page(
    State(state): State<AppState>,
    user: MaybeUser,
    ThemePref(theme): ThemePref,
) -> Response {
    let current = match user.require() {
        Ok(current) => current,
        Err(redirect) => return redirect.into_response(),
    };
    let (_, goals) = load_goals(&state, current.user.id).await;
    let values = goal_form_values(goals);
    Html(render_form_page(theme, &current.user, SETTINGS_PAGE, &values, &[], None)).into_response()
}

pub async fn settings_submit(
    State(state): State<AppState>,
    user: MaybeUser,
    ThemePref(theme): ThemePref,
    Form(form): Form<FormValues>,
) -> Response {
    let current = match user.require() {
        Ok(current) => current,
        Err(redirect) => return redirect.into_response(),
    };
    let render = |status: StatusCode, errors: &[FieldError], notice: &Notice<'_>| {
        (
            status,
            Html(render_form_page(theme, &current.user, SETTINGS_PAGE, &form, errors, Some(notice))),
        )
            .into_response()
    };

    let goals = match parse_goals_form(&form) {
        Ok(goals) => goals,
        Err(errors) => {
            let notice = Notice {
                ok: false,
                text: "Please fix the highlighted goals",
            };
            return render(StatusCode::BAD_REQUEST, &errors, &notice);
        }
    };
    match state.goals.resolve(current.user.id, goals).await {
        Ok(_) => render(
            StatusCode::OK,
            &[],
            &Notice {
                ok: true,
                text: "Goals updated successfully",
            },
        ),
        Err(err) => {
            error!("failed to save goals: {err}");
            render(
                StatusCode::INTERNAL_SERVER_ERROR,
                &[],
                &Notice {
                    ok: false,
                    text: GOALS_FAILED,
                },
            )
        }
    }
}

pub async fn toggle_theme(ThemePref(theme): ThemePref, Form(form): Form<ThemeForm>) -> Response {
    let target = form
        .return_to
        .filter(|path| path.starts_with('/') && !path.starts_with("//"))
        .unwrap_or_else(|| "/".to_string());
    with_cookie(theme.toggled().cookie(), Redirect::to(&target))
}

pub async fn api_signup(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    let (email, password) = parse_credentials(SIGNUP_RULES, &credentials_form(&payload))
        .map_err(|errors| AppError::bad_request(summarize(&errors)))?;
    match state.sessions.sign_up(&email, &password).await {
        Ok(user) => Ok((StatusCode::CREATED, Json(user))),
        Err(err) => {
            log_auth_failure("sign-up", &err);
            Err(AppError::bad_request(SIGN_UP_FAILED))
        }
    }
}

pub async fn api_login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<SignInResponse>, AppError> {
    let (email, password) = parse_credentials(LOGIN_RULES, &credentials_form(&payload))
        .map_err(|errors| AppError::bad_request(summarize(&errors)))?;
    match state.sessions.sign_in(&email, &password).await {
        Ok((token, user)) => Ok(Json(SignInResponse { token, user })),
        Err(err) => {
            log_auth_failure("sign-in", &err);
            Err(AppError::unauthorized(SIGN_IN_FAILED))
        }
    }
}

pub async fn api_logout(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<StatusCode, AppError> {
    state
        .sessions
        .sign_out(&current.token)
        .await
        .map_err(AppError::internal)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn api_session(current: CurrentUser) -> Json<UserProfile> {
    Json(current.user)
}

pub async fn get_today(State(state): State<AppState>, current: CurrentUser) -> Json<DashboardResponse> {
    Json(load_dashboard(&state, current.user.id, today()).await)
}

pub async fn get_metric(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<DateQuery>,
) -> Result<Json<Option<HealthMetric>>, AppError> {
    let date = query.date.unwrap_or_else(today);
    let record = state.store.find_metric(current.user.id, date).await?;
    Ok(Json(record))
}

pub async fn save_metric(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<SaveMetricRequest>,
) -> Result<(StatusCode, Json<SaveMetricResponse>), AppError> {
    let date = payload.date.unwrap_or_else(today);
    let values = metric_request_values(date, &payload.values);
    let errors = validate_present(METRIC_RULES, &values);
    if !errors.is_empty() {
        return Err(AppError::bad_request(summarize(&errors)));
    }

    let outcome = state
        .metrics
        .resolve(current.user.id, date, &payload.values)
        .await
        .map_err(|err| {
            error!("failed to save health data: {err}");
            AppError::save_failed(SAVE_FAILED)
        })?;
    let (status, message) = match outcome {
        SaveOutcome::Created(_) => (StatusCode::CREATED, METRIC_ADDED),
        SaveOutcome::Updated(_) => (StatusCode::OK, METRIC_UPDATED),
    };
    Ok((
        status,
        Json(SaveMetricResponse {
            outcome: outcome.label().to_string(),
            message: message.to_string(),
            record: outcome.into_record(),
        }),
    ))
}

fn metric_request_values(date: NaiveDate, input: &MetricInput) -> FormValues {
    let mut values = FormValues::new();
    values.insert("date".to_string(), date.to_string());
    insert_number(&mut values, "steps", input.steps);
    insert_number(&mut values, "water_intake", input.water_intake);
    insert_number(&mut values, "weight", input.weight);
    insert_number(&mut values, "sleep_hours", input.sleep_hours);
    values
}

pub async fn get_history(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let range = DateRange::resolve(query.start, query.end, today())
        .map_err(|err| AppError::bad_request(err.to_string()))?;
    let rows = query_history(state.store.as_ref(), current.user.id, range).await?;
    Ok(Json(build_history(range, rows)))
}

pub async fn get_goals(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<GoalsResponse>, AppError> {
    let (saved, goals) = goals_in_effect(state.store.as_ref(), current.user.id).await?;
    Ok(Json(GoalsResponse { saved, goals }))
}

pub async fn put_goals(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<GoalsRequest>,
) -> Result<Json<GoalsResponse>, AppError> {
    let mut values = FormValues::new();
    insert_number(&mut values, "steps_goal", payload.steps_goal);
    insert_number(&mut values, "water_goal", payload.water_goal);
    insert_number(&mut values, "weight_goal", payload.weight_goal);
    insert_number(&mut values, "sleep_goal", payload.sleep_goal);
    let goals = parse_goals_form(&values).map_err(|errors| AppError::bad_request(summarize(&errors)))?;

    let outcome = state
        .goals
        .resolve(current.user.id, goals)
        .await
        .map_err(|err| {
            error!("failed to save goals: {err}");
            AppError::save_failed(GOALS_FAILED)
        })?;
    info!(user_id = %current.user.id, outcome = outcome.label(), "goals saved");
    Ok(Json(GoalsResponse {
        saved: true,
        goals: GoalValues::from(outcome.record()),
    }))
}
