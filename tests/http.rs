use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode, redirect};
use serde::Deserialize;
use serde_json::{Value, json};
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct SignInResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct SaveMetricResponse {
    outcome: String,
    message: String,
    record: Value,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_suffix() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}_{}", std::process::id(), nanos)
}

fn unique_data_path() -> String {
    let mut path = std::env::temp_dir();
    path.push(format!("health_dashboard_http_{}.json", unique_suffix()));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/auth")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let child = Command::new(env!("CARGO_BIN_EXE_health_dashboard"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", unique_data_path())
        .env("HEALTH_BCRYPT_COST", "4")
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

/// Signs up a fresh account and returns its bearer token.
async fn signed_in(server: &TestServer, client: &Client) -> String {
    let email = format!("user_{}@example.com", unique_suffix());
    let credentials = json!({ "email": email, "password": "secret1" });

    let created = client
        .post(format!("{}/api/auth/signup", server.base_url))
        .json(&credentials)
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);

    let session: SignInResponse = client
        .post(format!("{}/api/auth/login", server.base_url))
        .json(&credentials)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    session.token
}

async fn get_json(client: &Client, url: String, token: &str) -> Value {
    let response = client.get(url).bearer_auth(token).send().await.unwrap();
    assert!(response.status().is_success(), "{}", response.status());
    response.json().await.unwrap()
}

async fn save(
    server: &TestServer,
    client: &Client,
    token: &str,
    body: Value,
) -> (StatusCode, SaveMetricResponse) {
    let response = client
        .post(format!("{}/api/metrics", server.base_url))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

fn metric<'a>(today: &'a Value, key: &str) -> &'a Value {
    today["metrics"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["key"] == key)
        .expect("missing metric")
}

#[tokio::test]
async fn http_first_save_creates_and_dashboard_reflects_it() {
    let server = shared_server().await;
    let client = Client::new();
    let token = signed_in(&server, &client).await;

    let before = get_json(&client, format!("{}/api/today", server.base_url), &token).await;
    assert!(before["record"].is_null());
    for key in ["steps", "water_intake", "weight", "sleep_hours"] {
        assert_eq!(metric(&before, key)["value"], 0.0);
    }
    let date = before["date"].as_str().unwrap().to_string();

    let (status, saved) = save(
        &server,
        &client,
        &token,
        json!({ "date": date, "steps": 5000, "water_intake": 1.5, "weight": 70, "sleep_hours": 7 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(saved.outcome, "created");
    assert_eq!(saved.message, "Health data added successfully");

    let after = get_json(&client, format!("{}/api/today", server.base_url), &token).await;
    assert_eq!(after["record"]["id"], saved.record["id"]);
    let steps = metric(&after, "steps");
    assert_eq!(steps["value"], 5000.0);
    assert_eq!(steps["goal"], 10000.0);
    assert_eq!(steps["percent"], 50.0);
}

#[tokio::test]
async fn http_second_save_updates_the_same_row_and_caps_progress() {
    let server = shared_server().await;
    let client = Client::new();
    let token = signed_in(&server, &client).await;
    let today = get_json(&client, format!("{}/api/today", server.base_url), &token).await;
    let date = today["date"].as_str().unwrap().to_string();

    let (_, first) = save(&server, &client, &token, json!({ "date": date, "steps": 5000 })).await;
    let (status, second) = save(&server, &client, &token, json!({ "date": date, "steps": 12000 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second.outcome, "updated");
    assert_eq!(second.record["id"], first.record["id"]);
    assert_eq!(second.record["created_at"], first.record["created_at"]);
    assert_eq!(second.record["water_intake"], 0.0);

    let after = get_json(&client, format!("{}/api/today", server.base_url), &token).await;
    assert_eq!(metric(&after, "steps")["percent"], 100.0);

    let history = get_json(
        &client,
        format!("{}/api/history?start={date}&end={date}", server.base_url),
        &token,
    )
    .await;
    assert_eq!(history["records"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn http_history_filters_range_and_orders_descending() {
    let server = shared_server().await;
    let client = Client::new();
    let token = signed_in(&server, &client).await;

    for (date, steps) in [
        ("2025-03-01", 100),
        ("2025-03-10", 1000),
        ("2025-03-05", 500),
        ("2025-03-20", 2000),
    ] {
        let (status, _) = save(&server, &client, &token, json!({ "date": date, "steps": steps })).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let history = get_json(
        &client,
        format!("{}/api/history?start=2025-03-02&end=2025-03-15", server.base_url),
        &token,
    )
    .await;
    let dates: Vec<&str> = history["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["date"].as_str().unwrap())
        .collect();
    assert_eq!(dates, vec!["2025-03-10", "2025-03-05"]);
    assert_eq!(history["chart"]["labels"], json!(["Mar 05", "Mar 10"]));
    assert_eq!(history["chart"]["steps"], json!([500, 1000]));

    let inverted = client
        .get(format!("{}/api/history?start=2025-03-15&end=2025-03-02", server.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(inverted.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_goals_default_until_saved() {
    let server = shared_server().await;
    let client = Client::new();
    let token = signed_in(&server, &client).await;

    let defaults = get_json(&client, format!("{}/api/goals", server.base_url), &token).await;
    assert_eq!(defaults["saved"], false);
    assert_eq!(defaults["goals"]["steps_goal"], 10000);
    assert_eq!(defaults["goals"]["water_goal"], 2.5);
    assert_eq!(defaults["goals"]["weight_goal"], 70.0);
    assert_eq!(defaults["goals"]["sleep_goal"], 8.0);

    let rejected = client
        .put(format!("{}/api/goals", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "steps_goal": 0, "water_goal": 2.5, "weight_goal": 70, "sleep_goal": 8 }))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

    let saved: Value = client
        .put(format!("{}/api/goals", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "steps_goal": 8000, "water_goal": 3, "weight_goal": 65, "sleep_goal": 7.5 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(saved["saved"], true);

    let today = get_json(&client, format!("{}/api/today", server.base_url), &token).await;
    assert_eq!(metric(&today, "steps")["goal"], 8000.0);
}

#[tokio::test]
async fn http_protected_routes_require_a_session() {
    let server = shared_server().await;
    let client = Client::builder()
        .redirect(redirect::Policy::none())
        .build()
        .unwrap();

    let api = client
        .get(format!("{}/api/today", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(api.status(), StatusCode::UNAUTHORIZED);

    let page = client.get(format!("{}/", server.base_url)).send().await.unwrap();
    assert_eq!(page.status(), StatusCode::SEE_OTHER);
    assert_eq!(page.headers()["location"], "/auth");

    let token = signed_in(&server, &client).await;
    let login_page = client
        .get(format!("{}/auth", server.base_url))
        .header("cookie", format!("health_session={token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(login_page.status(), StatusCode::SEE_OTHER);
    assert_eq!(login_page.headers()["location"], "/");
}

#[tokio::test]
async fn http_bad_password_and_sign_out() {
    let server = shared_server().await;
    let client = Client::new();
    let email = format!("user_{}@example.com", unique_suffix());

    client
        .post(format!("{}/api/auth/signup", server.base_url))
        .json(&json!({ "email": email, "password": "secret1" }))
        .send()
        .await
        .unwrap();

    let wrong = client
        .post(format!("{}/api/auth/login", server.base_url))
        .json(&json!({ "email": email, "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.text().await.unwrap(), "Invalid credentials");

    let session: SignInResponse = client
        .post(format!("{}/api/auth/login", server.base_url))
        .json(&json!({ "email": email, "password": "secret1" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let out = client
        .post(format!("{}/api/auth/logout", server.base_url))
        .bearer_auth(&session.token)
        .send()
        .await
        .unwrap();
    assert_eq!(out.status(), StatusCode::NO_CONTENT);

    let after = client
        .get(format!("{}/api/session", server.base_url))
        .bearer_auth(&session.token)
        .send()
        .await
        .unwrap();
    assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn http_add_form_validates_and_redirects() {
    let server = shared_server().await;
    let client = Client::builder()
        .redirect(redirect::Policy::none())
        .build()
        .unwrap();
    let token = signed_in(&server, &client).await;
    let cookie = format!("health_session={token}");

    let invalid = client
        .post(format!("{}/add", server.base_url))
        .header("cookie", &cookie)
        .form(&[("date", "2025-04-01"), ("steps", "100"), ("water_intake", "1"), ("weight", "70"), ("sleep_hours", "30")])
        .send()
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    let body = invalid.text().await.unwrap();
    assert!(body.contains("Sleep Hours must be at most 24"));
    assert!(body.contains(r#"name="steps" value="100""#));

    let valid = client
        .post(format!("{}/add", server.base_url))
        .header("cookie", &cookie)
        .form(&[("date", "2025-04-01"), ("steps", "100"), ("water_intake", "1"), ("weight", "70"), ("sleep_hours", "8")])
        .send()
        .await
        .unwrap();
    assert_eq!(valid.status(), StatusCode::SEE_OTHER);
    assert_eq!(valid.headers()["location"], "/?saved=created");
}

#[tokio::test]
async fn http_dashboard_banner_only_for_known_outcomes() {
    let server = shared_server().await;
    let client = Client::new();
    let token = signed_in(&server, &client).await;
    let cookie = format!("health_session={token}");

    let page = |saved: &'static str| {
        client
            .get(format!("{}/?saved={saved}", server.base_url))
            .header("cookie", cookie.clone())
            .send()
    };

    let created = page("created").await.unwrap().text().await.unwrap();
    assert!(created.contains("Health data added successfully"));

    let bogus = page("whatever").await.unwrap().text().await.unwrap();
    assert!(!bogus.contains("Health data added successfully"));
    assert!(!bogus.contains("Health data updated successfully"));
}

#[tokio::test]
async fn http_steps_beyond_range_are_rejected() {
    let server = shared_server().await;
    let client = Client::new();
    let token = signed_in(&server, &client).await;

    let response = client
        .post(format!("{}/api/metrics", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "date": "2025-05-01", "steps": 5_000_000_000u64 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.text().await.unwrap().contains("Steps must be at most"));
}

#[tokio::test]
async fn http_history_with_earliest_end_date_does_not_fail() {
    let server = shared_server().await;
    let client = Client::new();
    let token = signed_in(&server, &client).await;

    let history = get_json(
        &client,
        format!("{}/api/history?end=-262143-01-05", server.base_url),
        &token,
    )
    .await;
    assert!(history["records"].as_array().unwrap().is_empty());
}
