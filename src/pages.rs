//! Server-rendered HTML pages.
//!
//! Plain string templates: a login form, the paste/process page with its
//! results table, and the dashboard embed. All user-supplied text passes
//! through [`escape`].

use crate::config::{DashboardConfig, HeaderLabels};
use crate::queue::SubmissionQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl NoticeLevel {
    fn class(self) -> &'static str {
        match self {
            NoticeLevel::Success => "success",
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        }
    }
}

/// Inline status message shown above the page content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    fn render(&self) -> String {
        format!(
            r#"<div class="notice {}">{}</div>"#,
            self.level.class(),
            escape(&self.message)
        )
    }
}

const STYLE: &str = "body{font-family:sans-serif;max-width:1200px;margin:2rem auto;padding:0 1rem}\
h1{text-align:center;color:#4B0082}\
nav a{margin-right:1rem}\
textarea{width:100%;font-family:monospace}\
table{border-collapse:collapse;width:100%;margin-top:1rem}\
td,th{border:1px solid #ccc;padding:.3rem .5rem;text-align:left}\
.notice{padding:.6rem;margin:1rem 0;border-radius:4px}\
.success{background:#e6f4ea}.info{background:#e8f0fe}\
.warning{background:#fef7e0}.error{background:#fce8e6}\
form.inline{display:inline}";

fn layout(title: &str, nav: bool, body: &str) -> String {
    let nav_html = if nav {
        r#"<nav><a href="/">Input</a><a href="/dashboard">Dashboard</a>
<form class="inline" method="post" action="/logout"><button type="submit">Log out</button></form></nav>"#
    } else {
        ""
    };
    format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>{title} · InstaMon</title>\
<style>{STYLE}</style></head><body>{nav_html}\n{body}\n</body></html>",
        title = escape(title),
    )
}

pub fn login_page(notice: Option<&Notice>) -> String {
    let notice_html = notice.map(Notice::render).unwrap_or_default();
    let body = format!(
        r#"<h1>InstaMon</h1>
{notice_html}
<form method="post" action="/login">
<p><label>Username <input name="username" autocomplete="username"></label></p>
<p><label>Password <input name="password" type="password" autocomplete="current-password"></label></p>
<p><button type="submit">Log in</button></p>
</form>"#
    );
    layout("Login", false, &body)
}

pub fn input_page(
    queue: &SubmissionQueue,
    labels: &HeaderLabels,
    notice: Option<&Notice>,
) -> String {
    let notice_html = notice.map(Notice::render).unwrap_or_default();

    let results = if queue.is_empty() {
        r#"<div class="notice info">No data processed yet.</div>"#.to_string()
    } else {
        let rows: String = queue
            .all()
            .iter()
            .map(|r| {
                format!(
                    "<tr><td>{}</td><td>{}</td><td><a href=\"{}\">{}</a></td></tr>\n",
                    escape(&r.caption),
                    escape(&r.date),
                    escape(&r.link),
                    escape(&r.link)
                )
            })
            .collect();
        format!(
            r#"<p>{total} records in this session, {batch} in the last batch.
<a href="/export.csv">Download CSV</a></p>
<table><thead><tr><th>{caption}</th><th>{date}</th><th>{link}</th></tr></thead>
<tbody>
{rows}</tbody></table>"#,
            total = queue.all().len(),
            batch = queue.last_batch().len(),
            caption = escape(&labels.caption),
            date = escape(&labels.date),
            link = escape(&labels.link),
        )
    };

    let body = format!(
        r#"<h1>InstaMon Recap</h1>
{notice_html}
<p>Paste bookmarklet output below, one <code>link,caption,timestamp</code> row per post.</p>
<form method="post" action="/process">
<textarea name="text" rows="8" placeholder="&quot;https://www.instagram.com/p/xxxx/&quot;,&quot;Caption&quot;,&quot;2024-01-01T00:00:00.000Z&quot;"></textarea>
<p><button type="submit">Process</button></p>
</form>
<form class="inline" method="post" action="/submit"><button type="submit">Send last batch to spreadsheet</button></form>
<form class="inline" method="post" action="/reset"><button type="submit">Reset data</button></form>
<h2>Results</h2>
{results}"#
    );
    layout("Input", true, &body)
}

pub fn dashboard_page(config: &DashboardConfig) -> String {
    let content = if config.embed_url.trim().is_empty() {
        r#"<div class="notice warning">Dashboard is not linked yet.</div>"#.to_string()
    } else {
        format!(
            r#"<iframe src="{}" width="{}" height="{}" style="border:0" allowfullscreen></iframe>"#,
            escape(&config.embed_url),
            config.width,
            config.height
        )
    };
    let body = format!("<h1>Dashboard Monitoring</h1>\n{content}");
    layout("Dashboard", true, &body)
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
