//! Account lifecycle scenarios
//!
//! Every scenario gets a fresh [`ScenarioContext`] and builds its own clients
//! from it. Account deletion scenarios start from a newly registered user so
//! they never depend on each other.

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::client::{HttpClient, Registration};
use crate::config::ClientConfig;
use crate::error::{E2eError, E2eResult};
use crate::form::FormBody;
use crate::logging::Logger;
use crate::response::Response;

/// Password given to every account the suite registers
pub const PASSWORD: &str = "test";

pub type ScenarioFn = fn(ScenarioContext) -> BoxFuture<'static, E2eResult<()>>;

/// A named, tagged test case
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: &'static str,
    pub tags: &'static [&'static str],
    pub run: ScenarioFn,
}

impl Scenario {
    pub const fn new(name: &'static str, tags: &'static [&'static str], run: ScenarioFn) -> Self {
        Self { name, tags, run }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(&tag)
    }
}

/// What a scenario needs to reach the server under test
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    pub config: ClientConfig,
    pub log: Logger,
}

impl ScenarioContext {
    pub fn client(&self) -> E2eResult<HttpClient> {
        HttpClient::new(&self.config, self.log.clone())
    }
}

/// `prefix` followed by the current time in milliseconds and a process-wide
/// counter, so names stay unique within one millisecond
pub fn unique_name(prefix: &str) -> String {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}{}{}", prefix, Utc::now().timestamp_millis(), n)
}

/// The full suite in a stable order
pub fn all() -> Vec<Scenario> {
    vec![
        Scenario::new("register_then_login", &["register", "login"], |ctx| {
            register_then_login(ctx).boxed()
        }),
        Scenario::new("account_delete_succeeds", &["account-delete"], |ctx| {
            account_delete_succeeds(ctx).boxed()
        }),
        Scenario::new("account_delete_requires_login", &["account-delete", "auth"], |ctx| {
            account_delete_requires_login(ctx).boxed()
        }),
        Scenario::new("account_delete_requires_csrf", &["account-delete", "csrf"], |ctx| {
            account_delete_requires_csrf(ctx).boxed()
        }),
        Scenario::new("account_delete_requires_confirmation", &["account-delete"], |ctx| {
            account_delete_requires_confirmation(ctx).boxed()
        }),
        Scenario::new("account_delete_rejects_wrong_password", &["account-delete"], |ctx| {
            account_delete_rejects_wrong_password(ctx).boxed()
        }),
        Scenario::new("account_delete_rejects_channel_owner", &["account-delete", "channels"], |ctx| {
            account_delete_rejects_channel_owner(ctx).boxed()
        }),
        Scenario::new("deleted_account_cannot_log_in", &["account-delete", "login"], |ctx| {
            deleted_account_cannot_log_in(ctx).boxed()
        }),
        Scenario::new("deleted_account_profile_requires_authorization", &["account-delete", "auth"], |ctx| {
            deleted_account_page_requires_authorization(ctx, "/account/profile").boxed()
        }),
        Scenario::new("deleted_account_edit_requires_authorization", &["account-delete", "auth"], |ctx| {
            deleted_account_page_requires_authorization(ctx, "/account/edit").boxed()
        }),
        Scenario::new("deleted_account_channels_require_authorization", &["account-delete", "auth"], |ctx| {
            deleted_account_page_requires_authorization(ctx, "/account/channels").boxed()
        }),
    ]
}

pub async fn register_then_login(ctx: ScenarioContext) -> E2eResult<()> {
    let (mut client, name) = registered(&ctx).await?;
    client.login(&name, PASSWORD).await?;

    match client.get_cookie("auth") {
        Some(value) if !value.is_empty() => Ok(()),
        _ => Err(E2eError::AssertionFailed(
            "Expected auth cookie after logging in".to_string(),
        )),
    }
}

pub async fn account_delete_succeeds(ctx: ScenarioContext) -> E2eResult<()> {
    let (mut client, _) = logged_in(&ctx).await?;

    let result = client.delete_account(PASSWORD, true).await?;
    expect_status(&result, 200, "Delete failed")?;
    expect_body(&result, "Account Deleted", "Expected success message")
}

pub async fn account_delete_requires_login(ctx: ScenarioContext) -> E2eResult<()> {
    let (mut client, name) = registered(&ctx).await?;

    let page = client.get("/account/delete").await?;
    expect_status(&page, 401, "Expected GET before login to be rejected")?;

    client.login(&name, PASSWORD).await?;
    let page = client.get("/account/delete").await?;
    expect_status(&page, 200, "Expected GET after login to succeed")
}

pub async fn account_delete_requires_csrf(ctx: ScenarioContext) -> E2eResult<()> {
    let (mut client, _) = logged_in(&ctx).await?;

    let page = client.get("/account/delete").await?;
    expect_status(&page, 200, "Expected GET to return 200")?;

    let form = FormBody::new()
        .field("password", PASSWORD)
        .field("confirmed", true);
    let result = client.post("/account/delete", &form).await?;
    expect_status(&result, 403, "Expected delete without CSRF token to fail")
}

pub async fn account_delete_requires_confirmation(ctx: ScenarioContext) -> E2eResult<()> {
    let (mut client, _) = logged_in(&ctx).await?;

    let result = client.delete_account(PASSWORD, false).await?;
    expect_status(&result, 200, "Expected unconfirmed delete to re-render the form")?;
    expect_body(
        &result,
        "You must check the box to confirm you want to delete your account",
        "Expected error due to missing confirmation",
    )
}

pub async fn account_delete_rejects_wrong_password(ctx: ScenarioContext) -> E2eResult<()> {
    let (mut client, _) = logged_in(&ctx).await?;

    let result = client.delete_account("not the password", true).await?;
    expect_status(&result, 403, "Expected wrong password to be rejected")?;
    expect_body(&result, "Password was incorrect", "Expected error due to wrong password")
}

pub async fn account_delete_rejects_channel_owner(ctx: ScenarioContext) -> E2eResult<()> {
    let (mut client, name) = logged_in(&ctx).await?;

    client.register_channel(&unique_name("C")).await?;

    let result = client.delete_account(PASSWORD, true).await?;
    expect_status(&result, 200, "Expected delete with channels to re-render the form")?;
    expect_body(
        &result,
        "you have one or more channels",
        "Expected error due to channels registered",
    )?;

    // The account must have survived.
    let mut fresh = ctx.client()?;
    fresh.login(&name, PASSWORD).await.map_err(|e| {
        E2eError::AssertionFailed(format!("Expected account with channels to survive deletion: {}", e))
    })
}

pub async fn deleted_account_cannot_log_in(ctx: ScenarioContext) -> E2eResult<()> {
    let (mut client, name) = deleted(&ctx).await?;

    match client.login(&name, PASSWORD).await {
        Ok(()) => Err(E2eError::AssertionFailed(
            "Expected login to fail due to missing user".to_string(),
        )),
        Err(e) if e.to_string().contains("User does not exist") => Ok(()),
        Err(e) => Err(E2eError::AssertionFailed(format!(
            "Expected error to be caused by user does not exist, got: {}",
            e
        ))),
    }
}

pub async fn deleted_account_page_requires_authorization(ctx: ScenarioContext, path: &'static str) -> E2eResult<()> {
    let (mut client, _) = deleted(&ctx).await?;

    let page = client.get(path).await?;
    expect_body(
        &page,
        "Authorization Required",
        &format!("Expected {} to require logging in again", path),
    )
}

async fn registered(ctx: &ScenarioContext) -> E2eResult<(HttpClient, String)> {
    let mut client = ctx.client()?;
    let name = unique_name("U");
    client.register(Registration::new(&name, PASSWORD)).await?;
    Ok((client, name))
}

async fn logged_in(ctx: &ScenarioContext) -> E2eResult<(HttpClient, String)> {
    let (mut client, name) = registered(ctx).await?;
    client.login(&name, PASSWORD).await?;
    Ok((client, name))
}

async fn deleted(ctx: &ScenarioContext) -> E2eResult<(HttpClient, String)> {
    let (mut client, name) = logged_in(ctx).await?;
    let result = client.delete_account(PASSWORD, true).await?;
    expect_status(&result, 200, "Delete failed")?;
    Ok((client, name))
}

fn expect_status(response: &Response, status: u16, context: &str) -> E2eResult<()> {
    if response.status != status {
        return Err(E2eError::AssertionFailed(format!(
            "{}: expected HTTP {}, got {}",
            context, status, response.status
        )));
    }
    Ok(())
}

fn expect_body(response: &Response, needle: &str, context: &str) -> E2eResult<()> {
    if !response.body_contains(needle) {
        return Err(E2eError::AssertionFailed(format!(
            "{}: body does not contain '{}'",
            context, needle
        )));
    }
    Ok(())
}
