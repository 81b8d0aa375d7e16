//! Session-aware HTTP client driving the server under test
//!
//! Behaves like a browser operated by hand: it keeps the cookies the server
//! hands out, submits the hidden CSRF field of each form, and reads the flash
//! banner of the page it lands on.

use std::marker::PhantomData;
use std::time::Duration;

use reqwest::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, COOKIE};
use reqwest::redirect::Policy;
use reqwest::{Method, RequestBuilder, Url};
use tracing::{debug, info, trace, warn};

use crate::config::ClientConfig;
use crate::cookies::CookieJar;
use crate::error::{E2eError, E2eResult};
use crate::form::FormBody;
use crate::html::{self, Banner, HtmlDocument, ScraperDocument};
use crate::logging::Logger;
use crate::response::Response;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Account details submitted on `/register`
#[derive(Debug, Clone, Copy)]
pub struct Registration<'a> {
    pub name: &'a str,
    pub password: &'a str,
    pub email: Option<&'a str>,
}

impl<'a> Registration<'a> {
    pub fn new(name: &'a str, password: &'a str) -> Self {
        Self {
            name,
            password,
            email: None,
        }
    }

    pub fn with_email(mut self, email: &'a str) -> Self {
        self.email = Some(email);
        self
    }
}

/// Banners that decide the outcome of a register or login submission
struct Outcome {
    flow: &'static str,
    failure_summary: &'static str,
    success_summary: &'static str,
}

const REGISTER: Outcome = Outcome {
    flow: "Registration",
    failure_summary: "Registration Failed",
    success_summary: "Registration Successful",
};

const LOGIN: Outcome = Outcome {
    flow: "Login",
    failure_summary: "Login Failed",
    success_summary: "Login Successful",
};

/// HTTP client with a private cookie jar, used strictly sequentially
pub struct HttpClient<D = ScraperDocument> {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    cookies: CookieJar,
    log: Logger,
    _document: PhantomData<fn() -> D>,
}

impl HttpClient {
    /// Client that scrapes pages with [`ScraperDocument`]
    pub fn new(config: &ClientConfig, log: Logger) -> E2eResult<Self> {
        Self::with_document(config, log)
    }
}

impl<D: HtmlDocument> HttpClient<D> {
    /// Client that scrapes pages with a caller-chosen [`HtmlDocument`]
    pub fn with_document(config: &ClientConfig, log: Logger) -> E2eResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|e| E2eError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url()?,
            timeout: config.timeout,
            cookies: CookieJar::new(),
            log: log.named("http-client"),
            _document: PhantomData,
        })
    }

    /// Read-only view of the cookie jar
    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name)
    }

    /// Seed a cookie by hand, e.g. to forge a bad session
    pub fn set_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.set(name, value);
    }

    /// Issue a GET. The status code is not interpreted.
    pub async fn get(&mut self, path: &str) -> E2eResult<Response> {
        let request = self.request(Method::GET, path)?;
        self.send(request, "GET", path).await
    }

    /// Issue a form-encoded POST. The status code is not interpreted.
    pub async fn post(&mut self, path: &str, form: &FormBody) -> E2eResult<Response> {
        let encoded = form.encode()?;
        self.log.scope(|| trace!("POST {} body = {}", path, encoded));

        let request = self
            .request(Method::POST, path)?
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(CONTENT_LENGTH, encoded.len())
            .body(encoded);
        self.send(request, "POST", path).await
    }

    /// Value of the page's `_csrf` input
    pub fn extract_csrf_token(&self, body: &str) -> E2eResult<String> {
        html::csrf_token(&D::parse(body))
    }

    /// Create an account through `/register`
    pub async fn register(&mut self, account: Registration<'_>) -> E2eResult<()> {
        let form = FormBody::new()
            .field("name", account.name)
            .field("password", account.password)
            .field("email", account.email.unwrap_or_default());

        let page = self.submit("/register", form).await?;
        check_outcome::<D>(&page.body, &REGISTER)?;

        self.log.scope(|| info!("Registered user {}", account.name));
        Ok(())
    }

    /// Log in through `/login`; the session cookies land in the jar
    pub async fn login(&mut self, name: &str, password: &str) -> E2eResult<()> {
        let form = FormBody::new()
            .field("name", name)
            .field("password", password);

        let page = self.submit("/login", form).await?;
        check_outcome::<D>(&page.body, &LOGIN)?;

        self.log.scope(|| {
            info!("Logged in as {}", name);
            for (cookie, value) in self.cookies.iter() {
                trace!("cookie {} = {}", cookie, value);
            }
        });
        Ok(())
    }

    /// Register a channel owned by the logged-in account
    pub async fn register_channel(&mut self, name: &str) -> E2eResult<()> {
        let form = FormBody::new()
            .field("name", name)
            .field("action", "new_channel");

        let page = self.submit("/account/channels", form).await?;
        check_channel_registered::<D>(&page.body, name)?;

        self.log.scope(|| info!("Registered channel {}", name));
        Ok(())
    }

    /// Submit the account deletion form and hand back the raw result page.
    /// `confirmed = false` leaves the confirmation checkbox unticked.
    pub async fn delete_account(&mut self, password: &str, confirmed: bool) -> E2eResult<Response> {
        let page = self.get("/account/delete").await?;
        expect_ok("GET", "/account/delete", &page)?;

        let mut form = FormBody::new()
            .field("_csrf", self.extract_csrf_token(&page.body)?)
            .field("password", password);
        if confirmed {
            form.insert("confirmed", true);
        }

        self.post("/account/delete", &form).await
    }

    /// GET a form page, then POST `form` back with the page's CSRF token.
    /// Both requests must answer 200.
    async fn submit(&mut self, path: &str, form: FormBody) -> E2eResult<Response> {
        let page = self.get(path).await?;
        expect_ok("GET", path, &page)?;

        let mut with_token = FormBody::new().field("_csrf", self.extract_csrf_token(&page.body)?);
        for (name, value) in form.fields() {
            with_token.insert(name, value.clone());
        }

        let result = self.post(path, &with_token).await?;
        expect_ok("POST", path, &result)?;
        Ok(result)
    }

    fn request(&self, method: Method, path: &str) -> E2eResult<RequestBuilder> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| E2eError::Config(format!("invalid request path '{}': {}", path, e)))?;

        let mut request = self.http.request(method, url);
        if let Some(cookie) = self.cookies.header_value() {
            let value = HeaderValue::from_str(&cookie).map_err(|e| E2eError::InvalidCookie(e.to_string()))?;
            request = request.header(COOKIE, value);
        }
        Ok(request)
    }

    async fn send(&mut self, request: RequestBuilder, method: &str, path: &str) -> E2eResult<Response> {
        self.log.scope(|| debug!("{} {}", method, path));

        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(method, path, e))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(method, path, e))?;

        // The jar only changes once the whole response has arrived
        let rejected = self.cookies.absorb(&headers);
        self.log.scope(|| {
            for line in &rejected {
                warn!("Ignoring malformed Set-Cookie line: {}", line);
            }
            debug!("{} {} -> HTTP {}", method, path, status);
            trace!("{} {} response headers = {:?}", method, path, headers);
        });

        Ok(Response { status, headers, body })
    }

    fn transport_error(&self, method: &str, path: &str, err: reqwest::Error) -> E2eError {
        let request = format!("{} {}", method, path);
        if err.is_timeout() {
            E2eError::Timeout(format!("{} (no response within {:?})", request, self.timeout))
        } else {
            E2eError::Network { request, source: err }
        }
    }
}

fn expect_ok(method: &str, path: &str, response: &Response) -> E2eResult<()> {
    if response.status != 200 {
        return Err(E2eError::UnexpectedStatusCode {
            request: format!("{} {}", method, path),
            status: response.status,
        });
    }
    Ok(())
}

fn check_outcome<D: HtmlDocument>(body: &str, outcome: &Outcome) -> E2eResult<()> {
    let doc = D::parse(body);

    if let Some(banner) = Banner::find(&doc, ".alert-danger")? {
        if banner.summary == outcome.failure_summary {
            return Err(E2eError::FlowFailure {
                flow: outcome.flow.to_string(),
                message: banner.detail,
            });
        }
    }

    match Banner::find(&doc, ".alert-success")? {
        Some(banner) if banner.summary == outcome.success_summary => Ok(()),
        _ => Err(E2eError::MissingExpectedElement(format!(
            ".alert-success reading '{}'",
            outcome.success_summary
        ))),
    }
}

fn check_channel_registered<D: HtmlDocument>(body: &str, name: &str) -> E2eResult<()> {
    let doc = D::parse(body);

    if let Some(banner) = Banner::find(&doc, ".alert-danger.messagebox")? {
        if banner.summary == "Channel Registration Failed" {
            return Err(E2eError::FlowFailure {
                flow: "Channel registration".to_string(),
                message: banner.detail,
            });
        }
    }

    let link = html::link_selector(&format!("/r/{}", name));
    if doc.exists(&link)? {
        Ok(())
    } else {
        Err(E2eError::MissingExpectedElement(link))
    }
}
