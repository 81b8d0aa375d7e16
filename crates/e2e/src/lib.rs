//! Account lifecycle E2E Test Framework
//!
//! This crate drives a server-rendered web application over plain HTTP the
//! way a person with a browser would:
//! - Keeps the session cookies the server hands out
//! - Submits the hidden `_csrf` field of every form
//! - Reads the flash banner of the resulting page to judge the outcome
//! - Runs the account registration/login/deletion scenarios as a suite
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   SuiteRunner (tests/e2e.rs)                │
//! │    ├── run_all(scenarios) -> SuiteResult                    │
//! │    ├── run_tagged / run_named                               │
//! │    └── write_results() -> test-results.json                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  HttpClient<D: HtmlDocument>                                │
//! │    ├── get(path) / post(path, FormBody) -> Response         │
//! │    ├── CookieJar  (Set-Cookie in, Cookie out)               │
//! │    ├── extract_csrf_token(body)                             │
//! │    └── register / login / register_channel / delete_account │
//! ├─────────────────────────────────────────────────────────────┤
//! │  HtmlDocument (ScraperDocument)   Logger (tracing Dispatch) │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod cookies;
pub mod error;
pub mod form;
pub mod html;
pub mod logging;
pub mod response;
pub mod runner;
pub mod scenarios;

pub use client::{HttpClient, Registration};
pub use config::ClientConfig;
pub use error::{E2eError, E2eResult};
pub use form::FormBody;
pub use logging::Logger;
pub use response::Response;
pub use runner::SuiteRunner;
