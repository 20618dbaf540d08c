use std::time::Instant;

use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::presenter::{Toast, ToastKind, ToastQueue};

/// Output a success message in the appropriate format
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

fn toast_symbol(kind: ToastKind) -> &'static str {
    match kind {
        ToastKind::Success => "✓",
        ToastKind::Error => "✗",
        ToastKind::Info => "ℹ",
        ToastKind::Warning => "!",
    }
}

pub fn render_toast(toast: &Toast) -> String {
    match &toast.message {
        Some(message) => format!("{} {}: {}", toast_symbol(toast.kind), toast.title, message),
        None => format!("{} {}", toast_symbol(toast.kind), toast.title),
    }
}

/// Shows every queued notification in order. Text goes to stderr so
/// stdout stays pipeable.
pub fn flush_toasts(output_format: OutputFormat, queue: &mut ToastQueue) -> Vec<Value> {
    let shown = queue.drain(Instant::now());
    match output_format {
        OutputFormat::Text => {
            for toast in &shown {
                eprintln!("{}", render_toast(toast));
            }
            Vec::new()
        }
        OutputFormat::Json => shown
            .iter()
            .map(|t| json!({ "kind": t.kind, "title": t.title, "message": t.message }))
            .collect(),
    }
}
