//! In-process fake of the account site
//!
//! Renders the same HTML contract as the real server: a `_csrf` hidden input
//! on every form, `.alert-*` flash banners and `/r/<channel>` links. Faults
//! can be switched on to make individual pages misbehave.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Router};
use tokio::task::JoinHandle;
use uuid::Uuid;

use account_e2e::ClientConfig;

type Shared = Arc<Mutex<SiteState>>;
type Fields = Form<HashMap<String, String>>;

/// Misbehaviours a test can switch on
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// `GET /register` answers 500
    pub broken_register: bool,
    /// `POST /login` answers 200 without any banner
    pub silent_login: bool,
    /// `POST /account/delete` skips the confirmation check
    pub ignore_delete_confirmation: bool,
}

#[derive(Debug)]
struct User {
    password: String,
    channels: Vec<String>,
}

#[derive(Debug)]
struct Session {
    csrf: String,
    user: Option<String>,
}

#[derive(Debug, Default)]
struct SiteState {
    faults: Faults,
    users: HashMap<String, User>,
    sessions: HashMap<String, Session>,
    channels: HashMap<String, String>,
}

pub struct FakeSite {
    pub addr: SocketAddr,
    state: Shared,
    server: JoinHandle<()>,
}

impl FakeSite {
    pub async fn start() -> Self {
        Self::start_with(Faults::default()).await
    }

    pub async fn start_with(faults: Faults) -> Self {
        let state: Shared = Arc::new(Mutex::new(SiteState {
            faults,
            ..Default::default()
        }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake site");
        let addr = listener.local_addr().expect("fake site address");

        let app = router(state.clone());
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve fake site");
        });

        Self { addr, state, server }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(self.addr.ip().to_string(), self.addr.port())
    }

    pub fn user_exists(&self, name: &str) -> bool {
        self.state.lock().unwrap().users.contains_key(name)
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.state.lock().unwrap().channels.keys().cloned().collect()
    }

    pub fn channel_owner(&self, channel: &str) -> Option<String> {
        self.state.lock().unwrap().channels.get(channel).cloned()
    }
}

impl Drop for FakeSite {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/register", get(register_page).post(register_submit))
        .route("/login", get(login_page).post(login_submit))
        .route("/account/channels", get(channels_page).post(channels_submit))
        .route("/account/delete", get(delete_page).post(delete_submit))
        .route("/account/profile", get(profile_page))
        .route("/account/edit", get(edit_page))
        .route("/cookies/set/:name/:value", get(set_cookie))
        .route("/cookies/pair", get(set_cookie_pair))
        .route("/echo", get(echo).post(echo_post))
        .route("/redirect", get(redirect))
        .route("/slow", get(slow))
        .with_state(state)
}

/// Session id from the request, creating a session (and its `Set-Cookie`)
/// when the request has none
fn session(state: &mut SiteState, request: &HeaderMap, out: &mut HeaderMap) -> String {
    if let Some(sid) = cookie(request, "sid") {
        if state.sessions.contains_key(&sid) {
            return sid;
        }
    }

    let sid = Uuid::new_v4().to_string();
    state.sessions.insert(
        sid.clone(),
        Session {
            csrf: Uuid::new_v4().simple().to_string(),
            user: None,
        },
    );
    out.append(
        SET_COOKIE,
        HeaderValue::from_str(&format!("sid={}; Path=/; HttpOnly", sid)).unwrap(),
    );
    sid
}

fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?.to_str().ok()?;
    header
        .split("; ")
        .filter_map(|pair| pair.split_once('='))
        .find(|(n, _)| *n == name)
        .map(|(_, v)| v.to_string())
}

/// Logged-in user of the session, if the account still exists
fn current_user(state: &SiteState, sid: &str) -> Option<String> {
    let user = state.sessions.get(sid)?.user.clone()?;
    state.users.contains_key(&user).then_some(user)
}

fn csrf_valid(state: &SiteState, sid: &str, form: &HashMap<String, String>) -> bool {
    match (state.sessions.get(sid), form.get("_csrf")) {
        (Some(session), Some(token)) => session.csrf == *token,
        _ => false,
    }
}

fn render(status: StatusCode, headers: HeaderMap, title: &str, content: &str) -> Response {
    let body = format!(
        "<!doctype html><html><head><title>{}</title></head><body><h1>{}</h1>{}</body></html>",
        title, title, content
    );
    (status, headers, Html(body)).into_response()
}

fn alert(kind: &str, extra: &str, summary: &str, detail: &str) -> String {
    format!(
        r#"<div class="alert alert-{}{}"><strong>{}</strong><p>{}</p></div>"#,
        kind, extra, summary, detail
    )
}

fn form(csrf: &str, fields: &str) -> String {
    format!(
        r#"<form method="post"><input type="hidden" name="_csrf" value="{}">{}<button type="submit">Submit</button></form>"#,
        csrf, fields
    )
}

fn csrf_of(state: &SiteState, sid: &str) -> String {
    state.sessions.get(sid).map(|s| s.csrf.clone()).unwrap_or_default()
}

fn unauthorized(headers: HeaderMap) -> Response {
    render(
        StatusCode::UNAUTHORIZED,
        headers,
        "Authorization Required",
        "<p>You must be logged in to view this page.</p>",
    )
}

fn forbidden(headers: HeaderMap) -> Response {
    render(StatusCode::FORBIDDEN, headers, "Forbidden", "<p>Invalid CSRF token</p>")
}

async fn register_page(State(state): State<Shared>, request: HeaderMap) -> Response {
    let mut state = state.lock().unwrap();
    let mut out = HeaderMap::new();
    if state.faults.broken_register {
        return render(StatusCode::INTERNAL_SERVER_ERROR, out, "Error", "<p>Internal error</p>");
    }

    let sid = session(&mut state, &request, &mut out);
    let fields = r#"<input name="name"><input name="password" type="password"><input name="email">"#;
    render(StatusCode::OK, out, "Register", &form(&csrf_of(&state, &sid), fields))
}

async fn register_submit(State(state): State<Shared>, request: HeaderMap, Form(fields): Fields) -> Response {
    let mut state = state.lock().unwrap();
    let mut out = HeaderMap::new();
    let sid = session(&mut state, &request, &mut out);
    if !csrf_valid(&state, &sid, &fields) {
        return forbidden(out);
    }

    let name = fields.get("name").cloned().unwrap_or_default();
    let password = fields.get("password").cloned().unwrap_or_default();

    let banner = if name.is_empty() || password.is_empty() {
        alert("danger", "", "Registration Failed", "Username and password are required")
    } else if state.users.contains_key(&name) {
        alert("danger", "", "Registration Failed", "That username is already taken")
    } else {
        state.users.insert(
            name.clone(),
            User {
                password,
                channels: Vec::new(),
            },
        );
        alert("success", "", "Registration Successful", &format!("Welcome, {}", name))
    };
    render(StatusCode::OK, out, "Register", &banner)
}

async fn login_page(State(state): State<Shared>, request: HeaderMap) -> Response {
    let mut state = state.lock().unwrap();
    let mut out = HeaderMap::new();
    let sid = session(&mut state, &request, &mut out);
    let fields = r#"<input name="name"><input name="password" type="password">"#;
    render(StatusCode::OK, out, "Login", &form(&csrf_of(&state, &sid), fields))
}

async fn login_submit(State(state): State<Shared>, request: HeaderMap, Form(fields): Fields) -> Response {
    let mut state = state.lock().unwrap();
    let mut out = HeaderMap::new();
    let sid = session(&mut state, &request, &mut out);
    if !csrf_valid(&state, &sid, &fields) {
        return forbidden(out);
    }
    if state.faults.silent_login {
        return render(StatusCode::OK, out, "Login", "<p>Something happened</p>");
    }

    let name = fields.get("name").cloned().unwrap_or_default();
    let password = fields.get("password").cloned().unwrap_or_default();

    let password_matches = state.users.get(&name).map(|user| user.password == password);
    let banner = match password_matches {
        None => alert("danger", "", "Login Failed", "User does not exist"),
        Some(false) => alert("danger", "", "Login Failed", "Invalid username/password combination"),
        Some(true) => {
            if let Some(session) = state.sessions.get_mut(&sid) {
                session.user = Some(name.clone());
            }
            out.append(
                SET_COOKIE,
                HeaderValue::from_str(&format!("auth={}:{}; Path=/; HttpOnly; Max-Age=604800", name, Uuid::new_v4().simple()))
                    .unwrap(),
            );
            alert("success", "", "Login Successful", &format!("Logged in as {}", name))
        }
    };
    render(StatusCode::OK, out, "Login", &banner)
}

fn channel_list(state: &SiteState, user: &str) -> String {
    let links: Vec<String> = state
        .users
        .get(user)
        .map(|u| u.channels.clone())
        .unwrap_or_default()
        .iter()
        .map(|c| format!(r#"<li><a href="/r/{}">{}</a></li>"#, c, c))
        .collect();
    format!("<ul>{}</ul>", links.join(""))
}

async fn channels_page(State(state): State<Shared>, request: HeaderMap) -> Response {
    let mut state = state.lock().unwrap();
    let mut out = HeaderMap::new();
    let sid = session(&mut state, &request, &mut out);
    let Some(user) = current_user(&state, &sid) else {
        return unauthorized(out);
    };

    let fields = r#"<input name="name"><input type="hidden" name="action" value="new_channel">"#;
    let content = format!("{}{}", channel_list(&state, &user), form(&csrf_of(&state, &sid), fields));
    render(StatusCode::OK, out, "My Channels", &content)
}

async fn channels_submit(State(state): State<Shared>, request: HeaderMap, Form(fields): Fields) -> Response {
    let mut state = state.lock().unwrap();
    let mut out = HeaderMap::new();
    let sid = session(&mut state, &request, &mut out);
    let Some(user) = current_user(&state, &sid) else {
        return unauthorized(out);
    };
    if !csrf_valid(&state, &sid, &fields) {
        return forbidden(out);
    }
    if fields.get("action").map(String::as_str) != Some("new_channel") {
        return render(StatusCode::BAD_REQUEST, out, "Bad Request", "<p>Unknown action</p>");
    }

    let channel = fields.get("name").cloned().unwrap_or_default();
    let banner = if channel.is_empty() || state.channels.contains_key(&channel) {
        alert(
            "danger",
            " messagebox",
            "Channel Registration Failed",
            &format!("Channel '{}' is already registered", channel),
        )
    } else {
        state.channels.insert(channel.clone(), user.clone());
        if let Some(owner) = state.users.get_mut(&user) {
            owner.channels.push(channel);
        }
        String::new()
    };

    let content = format!("{}{}", banner, channel_list(&state, &user));
    render(StatusCode::OK, out, "My Channels", &content)
}

async fn delete_page(State(state): State<Shared>, request: HeaderMap) -> Response {
    let mut state = state.lock().unwrap();
    let mut out = HeaderMap::new();
    let sid = session(&mut state, &request, &mut out);
    if current_user(&state, &sid).is_none() {
        return unauthorized(out);
    }

    let fields = r#"<input name="password" type="password"><input name="confirmed" type="checkbox" value="true">"#;
    render(StatusCode::OK, out, "Delete Account", &form(&csrf_of(&state, &sid), fields))
}

async fn delete_submit(State(state): State<Shared>, request: HeaderMap, Form(fields): Fields) -> Response {
    let mut state = state.lock().unwrap();
    let mut out = HeaderMap::new();
    let sid = session(&mut state, &request, &mut out);
    let Some(user) = current_user(&state, &sid) else {
        return unauthorized(out);
    };
    if !csrf_valid(&state, &sid, &fields) {
        return forbidden(out);
    }

    let confirmed = fields.get("confirmed").map(String::as_str) == Some("true");
    if !confirmed && !state.faults.ignore_delete_confirmation {
        let content = alert(
            "danger",
            "",
            "Error",
            "You must check the box to confirm you want to delete your account",
        );
        return render(StatusCode::OK, out, "Delete Account", &content);
    }

    let password = fields.get("password").cloned().unwrap_or_default();
    let owns_channels = match state.users.get(&user) {
        Some(account) if account.password != password => {
            let content = alert("danger", "", "Error", "Password was incorrect");
            return render(StatusCode::FORBIDDEN, out, "Delete Account", &content);
        }
        Some(account) => !account.channels.is_empty(),
        None => false,
    };

    if owns_channels {
        let content = alert(
            "danger",
            "",
            "Error",
            "Cannot delete account: you have one or more channels registered. Delete them first.",
        );
        return render(StatusCode::OK, out, "Delete Account", &content);
    }

    state.users.remove(&user);
    for session in state.sessions.values_mut() {
        if session.user.as_deref() == Some(user.as_str()) {
            session.user = None;
        }
    }
    let content = alert("success", "", "Account Deleted", "Your account has been deleted");
    render(StatusCode::OK, out, "Delete Account", &content)
}

async fn profile_page(State(state): State<Shared>, request: HeaderMap) -> Response {
    account_page(state, request, "Profile")
}

async fn edit_page(State(state): State<Shared>, request: HeaderMap) -> Response {
    account_page(state, request, "Edit Account")
}

fn account_page(state: Shared, request: HeaderMap, title: &str) -> Response {
    let mut state = state.lock().unwrap();
    let mut out = HeaderMap::new();
    let sid = session(&mut state, &request, &mut out);
    match current_user(&state, &sid) {
        Some(user) => render(StatusCode::OK, out, title, &format!("<p>{}</p>", user)),
        None => unauthorized(out),
    }
}

async fn set_cookie(Path((name, value)): Path<(String, String)>) -> Response {
    let mut out = HeaderMap::new();
    out.append(
        SET_COOKIE,
        HeaderValue::from_str(&format!("{}={}; Path=/; HttpOnly", name, value)).unwrap(),
    );
    render(StatusCode::OK, out, "Cookie set", "")
}

async fn set_cookie_pair() -> Response {
    let mut out = HeaderMap::new();
    out.append(SET_COOKIE, HeaderValue::from_static("first=1; Path=/"));
    out.append(SET_COOKIE, HeaderValue::from_static("second=two==; Path=/; Secure"));
    out.append(SET_COOKIE, HeaderValue::from_static("not-a-cookie"));
    render(StatusCode::OK, out, "Cookies set", "")
}

/// Body is the request's `Cookie` header, or empty when there was none
async fn echo(request: HeaderMap) -> String {
    request
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Body is `<content-type>\n<content-length>\n<cookie>\n<body>`
async fn echo_post(request: HeaderMap, body: String) -> String {
    let header = |name: HeaderName| {
        request
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    format!(
        "{}\n{}\n{}\n{}",
        header(CONTENT_TYPE),
        header(CONTENT_LENGTH),
        header(COOKIE),
        body
    )
}

async fn redirect() -> impl IntoResponse {
    (
        StatusCode::FOUND,
        [
            ("location", "/login"),
            ("set-cookie", "flash=moved; Path=/"),
        ],
    )
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "finally"
}
