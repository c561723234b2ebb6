//! robots.txt and sitemap.xml
//!
//! Pure renderings of the current store contents; boosted profiles are the
//! only dynamic pages advertised.

use chrono::NaiveDate;
use reqwest::Url;
use std::sync::Arc;

use crate::account::{Account, AccountStore};
use crate::error::{PaymentError, Result};

pub fn robots_txt(base_url: &str) -> String {
    format!(
        "User-agent: *\nAllow: /\nDisallow: /webhook\n\nSitemap: {}/sitemap.xml\n",
        base_url.trim_end_matches('/')
    )
}

pub fn sitemap_xml(base_url: &str, accounts: &[Account], today: NaiveDate) -> Result<String> {
    let base_url = base_url.trim_end_matches('/');
    let base = Url::parse(base_url)
        .map_err(|e| PaymentError::Config(format!("invalid public base URL {base_url:?}: {e}")))?;
    let lastmod = today.format("%Y-%m-%d").to_string();

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    xml.push_str(&url_entry(&format!("{base_url}/"), &lastmod, "daily", "1.0"));

    for account in accounts {
        let loc = profile_url(&base, &account.id)?;
        xml.push_str(&url_entry(&loc, &lastmod, "weekly", "0.8"));
    }

    xml.push_str("</urlset>\n");
    Ok(xml)
}

/// `<base>/profile/<id>` with the id percent-encoded as one path segment
fn profile_url(base: &Url, account_id: &str) -> Result<String> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| PaymentError::Config(format!("public base URL {base} cannot hold a path")))?
        .pop_if_empty()
        .push("profile")
        .push(account_id);
    Ok(url.to_string())
}

fn url_entry(loc: &str, lastmod: &str, changefreq: &str, priority: &str) -> String {
    format!(
        "  <url>\n    <loc>{}</loc>\n    <lastmod>{lastmod}</lastmod>\n    <changefreq>{changefreq}</changefreq>\n    <priority>{priority}</priority>\n  </url>\n",
        escape_xml(loc)
    )
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Renders SEO artifacts from the account store
pub struct SeoGenerator {
    accounts: Arc<dyn AccountStore>,
    base_url: String,
}

impl SeoGenerator {
    pub fn new(accounts: Arc<dyn AccountStore>, base_url: impl Into<String>) -> Self {
        Self {
            accounts,
            base_url: base_url.into(),
        }
    }

    pub fn robots(&self) -> String {
        robots_txt(&self.base_url)
    }

    pub async fn render_sitemap(&self) -> Result<String> {
        let accounts = self.accounts.list_boosted().await?;
        tracing::debug!(profiles = accounts.len(), "Rendering sitemap");
        sitemap_xml(&self.base_url, &accounts, chrono::Utc::now().date_naive())
    }
}
