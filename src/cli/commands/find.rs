use anyhow::{anyhow, Context};
use clap::{Args, ValueEnum};
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::cli::{output, OutputFormat};
use crate::presenter::{NavAction, Paginator, ToastQueue};
use crate::services::PageResult;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Resource {
    Expedientes,
    Users,
}

impl Resource {
    fn path(&self) -> &'static str {
        match self {
            Resource::Expedientes => "api/expedientes",
            Resource::Users => "api/users",
        }
    }
}

#[derive(Debug, Args)]
pub struct FindArgs {
    #[arg(value_enum, default_value = "expedientes", help = "Collection to list")]
    pub resource: Resource,

    #[arg(long, env = "EXPEDIENTES_SERVER", default_value = "http://localhost:3000", help = "Server base URL")]
    pub server: String,

    #[arg(long, env = "EXPEDIENTES_TOKEN", help = "Bearer token for the API")]
    pub token: Option<String>,

    #[arg(long, help = "1-based page number")]
    pub page: Option<u64>,

    #[arg(long, help = "Records per page")]
    pub limit: Option<u64>,

    #[arg(long, help = "Column to sort by")]
    pub sort_by: Option<String>,

    #[arg(long, help = "asc or desc")]
    pub sort_order: Option<String>,

    #[arg(long = "filter", short = 'f', value_name = "FIELD=VALUE", help = "Column filter, repeatable")]
    pub filters: Vec<String>,

    #[arg(long, help = "Earliest registration date (YYYY-MM-DD)")]
    pub from: Option<String>,

    #[arg(long, help = "Latest registration date (YYYY-MM-DD)")]
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SuccessEnvelope {
    data: PageResult<Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

pub async fn handle(args: FindArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let url = build_url(&args)?;
    let mut toasts = ToastQueue::default();

    let client = reqwest::Client::new();
    let mut request = client.get(url.clone()).timeout(std::time::Duration::from_secs(30));
    if let Some(token) = &args.token {
        request = request.bearer_auth(token);
    }

    tracing::debug!("GET {}", url);
    let response = request
        .send()
        .await
        .with_context(|| format!("request to {} failed", args.server))?;

    let status = response.status();
    if !status.is_success() {
        let body: Option<ErrorEnvelope> = response.json().await.ok();
        let (message, code) = match body {
            Some(e) => (e.message, e.code),
            None => (status.to_string(), None),
        };
        toasts.error("Request failed", Some(message.clone()));
        let notifications = output::flush_toasts(output_format, &mut toasts);
        if output_format == OutputFormat::Json {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "success": false,
                    "error": message,
                    "error_code": code,
                    "notifications": notifications,
                }))?
            );
        }
        return Err(anyhow!("server responded {}: {}", status.as_u16(), message));
    }

    let page = response
        .json::<SuccessEnvelope>()
        .await
        .context("unexpected response body")?
        .data;
    let paginator = Paginator::from_page(&page);

    if page.total == 0 {
        toasts.info("No records match");
    } else if page.items.is_empty() {
        toasts.warning(format!("Page {} is past the last page ({})", page.page, page.total_pages));
    } else {
        toasts.success(format!("Loaded {} of {} records", page.items.len(), page.total));
    }

    match output_format {
        OutputFormat::Json => {
            let notifications = output::flush_toasts(output_format, &mut toasts);
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "success": true,
                    "data": page,
                    "range": paginator.display_range(),
                    "notifications": notifications,
                }))?
            );
        }
        OutputFormat::Text => {
            for item in &page.items {
                println!("{}", summarize(item));
            }
            println!();
            println!("Showing {}", paginator.display_range());
            for hint in navigation_hints(&paginator) {
                println!("  {}", hint);
            }
            output::flush_toasts(output_format, &mut toasts);
        }
    }

    Ok(())
}

fn build_url(args: &FindArgs) -> anyhow::Result<Url> {
    // Joining a relative path onto a base ending in '/' keeps any path prefix.
    let mut base = Url::parse(&args.server).with_context(|| format!("invalid server URL: {}", args.server))?;
    if !base.path().ends_with('/') {
        base.set_path(&format!("{}/", base.path()));
    }
    base.set_query(None);
    let mut url = base
        .join(args.resource.path())
        .with_context(|| format!("invalid server URL: {}", args.server))?;

    {
        let mut query = url.query_pairs_mut();
        if let Some(page) = args.page {
            query.append_pair("page", &page.to_string());
        }
        if let Some(limit) = args.limit {
            query.append_pair("limit", &limit.to_string());
        }
        if let Some(sort_by) = &args.sort_by {
            query.append_pair("sortBy", sort_by);
        }
        if let Some(sort_order) = &args.sort_order {
            query.append_pair("sortOrder", sort_order);
        }
        if let Some(from) = &args.from {
            query.append_pair("fecha_inicio", from);
        }
        if let Some(to) = &args.to {
            query.append_pair("fecha_fin", to);
        }
        for filter in &args.filters {
            let (field, value) = filter
                .split_once('=')
                .ok_or_else(|| anyhow!("filter '{}' must look like FIELD=VALUE", filter))?;
            query.append_pair(field.trim(), value.trim());
        }
    }

    if url.query() == Some("") {
        url.set_query(None);
    }
    Ok(url)
}

/// One line per record; expedientes and users get their identifying columns.
fn summarize(item: &Value) -> String {
    let text = |key: &str| item.get(key).and_then(Value::as_str).unwrap_or("-").to_string();

    if item.get("cip").is_some() {
        format!(
            "{:<10} {:<8} {:<40} {:<6} {}",
            text("cip"),
            text("grado"),
            text("apellidos_nombres"),
            text("estado"),
            text("ubicacion"),
        )
    } else if item.get("email").is_some() {
        format!("{:<32} {} {}", text("email"), text("nombre"), text("apellido"))
    } else {
        item.to_string()
    }
}

fn navigation_hints(paginator: &Paginator) -> Vec<String> {
    if !paginator.shows_navigation() {
        return Vec::new();
    }

    let pages: Vec<String> = paginator
        .visible_pages(5)
        .into_iter()
        .map(|n| if n == paginator.page() { format!("[{}]", n) } else { n.to_string() })
        .collect();
    let mut hints = vec![format!("Page {} of {}  {}", paginator.page(), paginator.total_pages(), pages.join(" "))];
    let actions = [
        ("first", NavAction::First),
        ("previous", NavAction::Previous),
        ("next", NavAction::Next),
        ("last", NavAction::Last),
    ];
    for (label, action) in actions {
        let mut next = *paginator;
        if next.apply(action) {
            hints.push(format!("{}: --page {}", label, next.page()));
        }
    }
    hints
}
