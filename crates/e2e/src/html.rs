//! HTML queries over rendered pages
//!
//! Flows only need to find an element by CSS selector and read its text or
//! an attribute. [`HtmlDocument`] captures exactly that so the parser behind
//! it can be swapped; [`ScraperDocument`] is the default implementation.

use scraper::{Html, Selector};

use crate::error::{E2eError, E2eResult};

/// Selector of the hidden anti-forgery field
pub const CSRF_SELECTOR: &str = r#"input[name="_csrf"]"#;

/// A parsed page that can answer selector queries
pub trait HtmlDocument: Sized {
    fn parse(html: &str) -> Self;

    /// Whitespace-trimmed text of the first element matching `selector`
    fn text(&self, selector: &str) -> E2eResult<Option<String>>;

    /// Whitespace-trimmed text of the first `child` inside the first element
    /// matching `selector`. Later matches of `selector` are never searched.
    fn child_text(&self, selector: &str, child: &str) -> E2eResult<Option<String>>;

    /// Attribute `name` of the first element matching `selector`
    fn attr(&self, selector: &str, name: &str) -> E2eResult<Option<String>>;

    fn exists(&self, selector: &str) -> E2eResult<bool> {
        Ok(self.text(selector)?.is_some())
    }
}

/// [`HtmlDocument`] backed by the `scraper` crate
pub struct ScraperDocument {
    html: Html,
}

impl HtmlDocument for ScraperDocument {
    fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    fn text(&self, selector: &str) -> E2eResult<Option<String>> {
        let selector = compile(selector)?;
        Ok(self
            .html
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string()))
    }

    fn child_text(&self, selector: &str, child: &str) -> E2eResult<Option<String>> {
        let selector = compile(selector)?;
        let child = compile(child)?;
        Ok(self
            .html
            .select(&selector)
            .next()
            .and_then(|el| el.select(&child).next())
            .map(|el| el.text().collect::<String>().trim().to_string()))
    }

    fn attr(&self, selector: &str, name: &str) -> E2eResult<Option<String>> {
        let selector = compile(selector)?;
        Ok(self
            .html
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr(name))
            .map(str::to_owned))
    }

    fn exists(&self, selector: &str) -> E2eResult<bool> {
        let selector = compile(selector)?;
        Ok(self.html.select(&selector).next().is_some())
    }
}

fn compile(selector: &str) -> E2eResult<Selector> {
    Selector::parse(selector).map_err(|e| E2eError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// A flash-style alert: `<strong>` summary plus `<p>` detail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub summary: String,
    pub detail: String,
}

impl Banner {
    /// Read the first banner matching `selector`, if the page has one
    pub fn find<D: HtmlDocument>(doc: &D, selector: &str) -> E2eResult<Option<Self>> {
        if !doc.exists(selector)? {
            return Ok(None);
        }

        let summary = doc.child_text(selector, "strong")?.unwrap_or_default();
        let detail = doc.child_text(selector, "p")?.unwrap_or_default();
        Ok(Some(Self { summary, detail }))
    }
}

/// Value of the first `_csrf` input. A page without one is an error.
pub fn csrf_token<D: HtmlDocument>(doc: &D) -> E2eResult<String> {
    doc.attr(CSRF_SELECTOR, "value")?.ok_or_else(|| {
        E2eError::MissingExpectedElement(format!("{} with a value attribute", CSRF_SELECTOR))
    })
}

/// Selector for an anchor pointing at `href`
pub fn link_selector(href: &str) -> String {
    let escaped = href.replace('\\', "\\\\").replace('"', "\\\"");
    format!(r#"a[href="{}"]"#, escaped)
}
