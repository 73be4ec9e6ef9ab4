use crate::history::{DateRange, Page, format_table_date, format_thousands};
use crate::models::{DashboardResponse, UserProfile};
use crate::theme::Theme;
use crate::validation::{FieldError, FieldKind, FieldRule, FormValues, Limit};

pub struct Notice<'a> {
    pub ok: bool,
    pub text: &'a str,
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn notice_html(notice: Option<&Notice<'_>>) -> String {
    match notice {
        Some(n) => format!(
            r#"<div class="notice" data-type="{}">{}</div>"#,
            if n.ok { "ok" } else { "error" },
            escape(n.text)
        ),
        None => String::new(),
    }
}

fn layout(title: &str, theme: Theme, user: Option<&UserProfile>, active: &str, body: &str) -> String {
    let nav = match user {
        Some(user) => {
            let links = [
                ("/", "Dashboard"),
                ("/add", "Add Data"),
                ("/history", "History"),
                ("/settings", "Goals"),
            ]
            .iter()
            .map(|(href, label)| {
                let class = if *href == active { " class=\"active\"" } else { "" };
                format!(r#"<a href="{href}"{class}>{label}</a>"#)
            })
            .collect::<String>();
            let toggle_label = match theme {
                Theme::Light => "Dark mode",
                Theme::Dark => "Light mode",
            };
            format!(
                r#"<nav class="sider">
      <div class="logo">Healthify</div>
      {links}
    </nav>
    <div class="header-actions">
      <span class="who">{email}</span>
      <form method="post" action="/theme/toggle">
        <input type="hidden" name="return_to" value="{active}" />
        <button class="btn-text" type="submit">{toggle_label}</button>
      </form>
      <form method="post" action="/auth/logout">
        <button class="btn-text danger" type="submit">Logout</button>
      </form>
    </div>"#,
                email = escape(&user.email),
            )
        }
        None => String::new(),
    };

    LAYOUT_HTML
        .replace("{{TITLE}}", &escape(title))
        .replace("{{THEME}}", theme.as_str())
        .replace("{{NAV}}", &nav)
        .replace("{{BODY}}", body)
}

pub fn render_auth(theme: Theme, email: &str, notice: Option<&Notice<'_>>) -> String {
    let email = escape(email);
    let body = format!(
        r#"<section class="auth-card card">
      <header class="auth-header">
        <h1>Health Monitor</h1>
        <p class="subtitle">Track your health metrics daily</p>
      </header>
      {notice}
      <div class="auth-forms">
        <form method="post" action="/auth/login" class="stack">
          <h2>Login</h2>
          <input type="email" name="email" placeholder="Email" value="{email}" required />
          <input type="password" name="password" placeholder="Password" required />
          <button class="btn-primary" type="submit">Log In</button>
        </form>
        <form method="post" action="/auth/signup" class="stack">
          <h2>Sign Up</h2>
          <input type="email" name="email" placeholder="Email" required />
          <input type="password" name="password" placeholder="Password" minlength="6" required />
          <button class="btn-primary" type="submit">Sign Up</button>
        </form>
      </div>
    </section>"#,
        notice = notice_html(notice),
    );
    layout("Sign in", theme, None, "/auth", &body)
}

pub fn render_dashboard(
    theme: Theme,
    user: &UserProfile,
    view: &DashboardResponse,
    notice: Option<&Notice<'_>>,
) -> String {
    let empty = if view.record.is_none() {
        r#"<div class="empty-state card">
        <p>No data for today yet</p>
        <a class="btn-primary" href="/add">Add Your First Entry</a>
      </div>"#
    } else {
        ""
    };

    let cards = view
        .metrics
        .iter()
        .map(|m| {
            format!(
                r#"<div class="metric-card card" data-metric="{key}">
          <span class="label">{title}</span>
          <span class="value">{value} <small>{suffix}</small></span>
          <span class="goal">Goal: {goal} {suffix}</span>
          <div class="progress"><div class="bar" style="width: {percent:.1}%"></div></div>
          <span class="percent">{percent:.0}%</span>
        </div>"#,
                key = m.key,
                title = escape(&m.title),
                value = m.value,
                goal = m.goal,
                suffix = escape(&m.suffix),
                percent = m.percent,
            )
        })
        .collect::<String>();

    let body = format!(
        r#"<header class="page-header">
      <div>
        <h1>Health Dashboard</h1>
        <p class="subtitle">Track your daily health metrics ({date})</p>
      </div>
      <a class="btn-primary" href="/add">Add Today's Data</a>
    </header>
    {notice}
    {empty}
    <section class="panel">
      {cards}
    </section>"#,
        date = view.date,
        notice = notice_html(notice),
    );
    layout("Dashboard", theme, Some(user), "/", &body)
}

fn render_field(rule: &FieldRule, values: &FormValues, errors: &[FieldError]) -> String {
    let value = values.get(rule.name).map(|v| escape(v)).unwrap_or_default();
    let input_type = match rule.kind {
        FieldKind::Date => "date",
        FieldKind::Integer | FieldKind::Decimal => "number",
        FieldKind::Email => "email",
        FieldKind::Password => "password",
    };
    let mut attrs = String::new();
    if rule.required {
        attrs.push_str(" required");
    }
    if let Some(min) = rule.min {
        attrs.push_str(&format!(r#" min="{}""#, min.value()));
    }
    if let Some(max) = rule.max.filter(|max| matches!(max, Limit::Inclusive(_))) {
        attrs.push_str(&format!(r#" max="{}""#, max.value()));
    }
    if let Some(step) = rule.step {
        attrs.push_str(&format!(r#" step="{step}""#));
    }
    let error = errors
        .iter()
        .find(|e| e.field == rule.name)
        .map(|e| format!(r#"<span class="field-error">{}</span>"#, escape(&e.message)))
        .unwrap_or_default();

    format!(
        r#"<label class="field">
          <span>{label}</span>
          <input type="{input_type}" name="{name}" value="{value}"{attrs} />
          {error}
        </label>"#,
        label = escape(rule.label),
        name = rule.name,
    )
}

pub fn render_form_page(
    theme: Theme,
    user: &UserProfile,
    page: FormPage,
    values: &FormValues,
    errors: &[FieldError],
    notice: Option<&Notice<'_>>,
) -> String {
    let fields = page
        .rules
        .iter()
        .map(|rule| render_field(rule, values, errors))
        .collect::<String>();
    let body = format!(
        r#"<section class="form-card card">
      <h1>{title}</h1>
      {notice}
      <form method="post" action="{action}" class="stack">
        {fields}
        <button class="btn-primary" type="submit">{submit}</button>
      </form>
    </section>"#,
        title = page.title,
        action = page.action,
        submit = page.submit,
        notice = notice_html(notice),
    );
    layout(page.title, theme, Some(user), page.action, &body)
}

#[derive(Debug, Clone, Copy)]
pub struct FormPage {
    pub title: &'static str,
    pub action: &'static str,
    pub submit: &'static str,
    pub rules: &'static [FieldRule],
}

pub const ADD_DATA_PAGE: FormPage = FormPage {
    title: "Add / Update Health Data",
    action: "/add",
    submit: "Save Health Data",
    rules: crate::validation::METRIC_RULES,
};

pub const SETTINGS_PAGE: FormPage = FormPage {
    title: "Daily Health Goals",
    action: "/settings",
    submit: "Save Goals",
    rules: crate::validation::GOAL_RULES,
};

pub fn render_history(
    theme: Theme,
    user: &UserProfile,
    range: DateRange,
    page: &Page<'_>,
) -> String {
    let rows = if page.rows.is_empty() {
        r#"<tr><td colspan="5" class="empty">No data</td></tr>"#.to_string()
    } else {
        page.rows
            .iter()
            .map(|r| {
                format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    format_table_date(r.date),
                    format_thousands(r.steps),
                    r.water_intake,
                    r.weight,
                    r.sleep_hours
                )
            })
            .collect::<String>()
    };

    let link = |number: usize| {
        format!(
            "/history?start={}&amp;end={}&amp;page={number}",
            range.start, range.end
        )
    };
    let prev = if page.number > 1 {
        format!(r#"<a href="{}">Previous</a>"#, link(page.number - 1))
    } else {
        String::new()
    };
    let next = if page.number < page.total_pages {
        format!(r#"<a href="{}">Next</a>"#, link(page.number + 1))
    } else {
        String::new()
    };

    let body = HISTORY_HTML
        .replace("{{START}}", &range.start.to_string())
        .replace("{{END}}", &range.end.to_string())
        .replace("{{ROWS}}", &rows)
        .replace("{{PREV}}", &prev)
        .replace("{{NEXT}}", &next)
        .replace("{{PAGE}}", &page.number.to_string())
        .replace("{{PAGES}}", &page.total_pages.to_string())
        .replace("{{TOTAL}}", &page.total_rows.to_string());
    layout("History", theme, Some(user), "/history", &body)
}

const LAYOUT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en" data-theme="{{THEME}}">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}} · Healthify</title>
  <style>
    :root {
      --bg: #f4f7f2;
      --ink: #1f2a1c;
      --muted: #6b7468;
      --card: #ffffff;
      --line: rgba(31, 42, 28, 0.1);
      --primary: #52c41a;
      --danger: #d4380d;
      --steps: #52c41a;
      --water: #1890ff;
    }

    [data-theme="dark"] {
      --bg: #141414;
      --ink: #e8e8e8;
      --muted: #9a9a9a;
      --card: #1f1f1f;
      --line: rgba(255, 255, 255, 0.12);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: var(--bg);
      color: var(--ink);
      font-family: "Segoe UI", "Helvetica Neue", sans-serif;
      display: grid;
      grid-template-columns: auto 1fr;
    }

    .sider {
      display: flex;
      flex-direction: column;
      gap: 6px;
      padding: 24px 16px;
      min-width: 180px;
      border-right: 1px solid var(--line);
    }

    .sider a {
      color: var(--ink);
      text-decoration: none;
      padding: 8px 12px;
      border-radius: 12px;
    }

    .sider a.active {
      background: var(--primary);
      color: white;
    }

    .logo {
      font-weight: 700;
      font-size: 1.3rem;
      margin-bottom: 16px;
    }

    main {
      padding: 24px 32px;
      display: grid;
      gap: 24px;
      align-content: start;
    }

    .header-actions {
      position: absolute;
      top: 16px;
      right: 24px;
      display: flex;
      gap: 8px;
      align-items: center;
    }

    .who {
      color: var(--muted);
      font-size: 0.9rem;
    }

    .card {
      background: var(--card);
      border: 1px solid var(--line);
      border-radius: 12px;
      padding: 20px;
    }

    .page-header {
      display: flex;
      justify-content: space-between;
      align-items: center;
      gap: 16px;
    }

    h1 {
      margin: 0;
    }

    .subtitle {
      margin: 4px 0 0;
      color: var(--muted);
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
      gap: 24px;
    }

    .metric-card {
      display: grid;
      gap: 8px;
    }

    .metric-card .label {
      text-transform: uppercase;
      letter-spacing: 0.1em;
      font-size: 0.8rem;
      color: var(--muted);
    }

    .metric-card .value {
      font-size: 1.8rem;
      font-weight: 600;
    }

    .metric-card .goal,
    .metric-card .percent {
      color: var(--muted);
      font-size: 0.9rem;
    }

    .progress {
      height: 8px;
      background: var(--line);
      border-radius: 999px;
      overflow: hidden;
    }

    .progress .bar {
      height: 100%;
      background: var(--primary);
    }

    .stack {
      display: grid;
      gap: 14px;
    }

    .field {
      display: grid;
      gap: 6px;
    }

    input {
      padding: 10px 12px;
      border-radius: 8px;
      border: 1px solid var(--line);
      background: var(--card);
      color: var(--ink);
      font-size: 1rem;
    }

    .field-error {
      color: var(--danger);
      font-size: 0.85rem;
    }

    button,
    .btn-primary {
      appearance: none;
      border: none;
      border-radius: 8px;
      padding: 10px 18px;
      font-size: 1rem;
      cursor: pointer;
      text-decoration: none;
      text-align: center;
    }

    .btn-primary {
      background: var(--primary);
      color: white;
    }

    .btn-text {
      background: transparent;
      color: var(--ink);
    }

    .btn-text.danger {
      color: var(--danger);
    }

    .notice {
      padding: 10px 14px;
      border-radius: 8px;
      border: 1px solid var(--line);
    }

    .notice[data-type="ok"] {
      border-color: var(--primary);
    }

    .notice[data-type="error"] {
      border-color: var(--danger);
      color: var(--danger);
    }

    .empty-state {
      text-align: center;
      display: grid;
      gap: 12px;
      justify-items: center;
    }

    .auth-card,
    .form-card {
      max-width: 560px;
    }

    .auth-forms {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(220px, 1fr));
      gap: 24px;
    }

    table {
      width: 100%;
      border-collapse: collapse;
    }

    th,
    td {
      text-align: left;
      padding: 10px 8px;
      border-bottom: 1px solid var(--line);
    }

    .pager {
      display: flex;
      gap: 16px;
      align-items: center;
      margin-top: 12px;
      color: var(--muted);
    }

    .chart-card svg {
      width: 100%;
      height: 300px;
    }

    .chart-grid {
      stroke: var(--line);
    }

    .chart-label {
      fill: var(--muted);
      font-size: 11px;
    }

    .chart-line {
      fill: none;
      stroke-width: 2.5;
    }

    .chart-line.steps {
      stroke: var(--steps);
    }

    .chart-line.water {
      stroke: var(--water);
    }
  </style>
</head>
<body>
  {{NAV}}
  <main>
    {{BODY}}
  </main>
</body>
</html>
"#;

const HISTORY_HTML: &str = r#"<header class="page-header">
      <h1>Health History</h1>
      <form method="get" action="/history" class="range">
        <input type="date" name="start" value="{{START}}" required />
        <input type="date" name="end" value="{{END}}" required />
        <button class="btn-primary" type="submit">Apply</button>
      </form>
    </header>

    <section class="chart-card card">
      <h2>Health Metrics Over Time</h2>
      <svg id="chart" viewBox="0 0 640 300" aria-label="Steps and water over time" role="img"></svg>
      <div class="status" id="status"></div>
    </section>

    <section class="table-card card">
      <h2>Data Table</h2>
      <table>
        <thead>
          <tr><th>Date</th><th>Steps</th><th>Water (L)</th><th>Weight (kg)</th><th>Sleep (hrs)</th></tr>
        </thead>
        <tbody>{{ROWS}}</tbody>
      </table>
      <div class="pager">{{PREV}}<span>Page {{PAGE}} of {{PAGES}} ({{TOTAL}} entries)</span>{{NEXT}}</div>
    </section>

  <script>
    const chartEl = document.getElementById('chart');
    const statusEl = document.getElementById('status');

    const formatAxisValue = (value) => {
      const rounded = Math.round(value * 10) / 10;
      return Number.isInteger(rounded) ? rounded.toString() : rounded.toFixed(1);
    };

    const scale = (values) => {
      let min = Math.min(0, ...values);
      let max = Math.max(0, ...values);
      if (min === max) {
        max += 1;
      }
      return { min, max };
    };

    const renderChart = (chart) => {
      if (!chart.labels.length) {
        chartEl.innerHTML = '<text class="chart-label" x="50%" y="50%" text-anchor="middle">No data in this range</text>';
        return;
      }

      const width = 640;
      const height = 300;
      const paddingX = 52;
      const paddingY = 34;
      const top = 24;
      const count = chart.labels.length;
      const xStep = count > 1 ? (width - paddingX * 2) / (count - 1) : 0;
      const x = (index) => paddingX + index * xStep;

      const left = scale(chart.steps);
      const right = scale(chart.water);
      const y = (axis, value) =>
        height - paddingY - ((value - axis.min) / (axis.max - axis.min)) * (height - top - paddingY);

      const path = (values, axis) =>
        values
          .map((value, index) => `${index === 0 ? 'M' : 'L'} ${x(index).toFixed(2)} ${y(axis, value).toFixed(2)}`)
          .join(' ');

      const ticks = 4;
      let grid = '';
      for (let i = 0; i <= ticks; i += 1) {
        const yPos = height - paddingY - ((height - top - paddingY) * i) / ticks;
        const leftValue = left.min + ((left.max - left.min) * i) / ticks;
        const rightValue = right.min + ((right.max - right.min) * i) / ticks;
        grid += `<line class="chart-grid" x1="${paddingX}" y1="${yPos}" x2="${width - paddingX}" y2="${yPos}" />`;
        grid += `<text class="chart-label" x="${paddingX - 8}" y="${yPos + 4}" text-anchor="end">${formatAxisValue(leftValue)}</text>`;
        grid += `<text class="chart-label" x="${width - paddingX + 8}" y="${yPos + 4}" text-anchor="start">${formatAxisValue(rightValue)}</text>`;
      }

      const labelEvery = Math.max(1, Math.ceil(count / 10));
      const xLabels = chart.labels
        .map((label, index) =>
          index % labelEvery === 0
            ? `<text class="chart-label" x="${x(index)}" y="${height - paddingY + 18}" text-anchor="middle">${label}</text>`
            : '')
        .join('');

      chartEl.innerHTML = `
        ${grid}
        <path class="chart-line steps" d="${path(chart.steps, left)}" />
        <path class="chart-line water" d="${path(chart.water, right)}" />
        ${xLabels}
      `;
    };

    const loadHistory = async () => {
      const res = await fetch('/api/history?start={{START}}&end={{END}}', { credentials: 'same-origin' });
      if (!res.ok) {
        throw new Error('Unable to load history');
      }
      const data = await res.json();
      renderChart(data.chart);
    };

    loadHistory().catch((err) => {
      statusEl.textContent = err.message;
    });
  </script>"#;
