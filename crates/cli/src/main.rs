//! Herald CLI -- submit notifications to a running Herald server.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

/// Herald CLI -- interact with the Herald notification service.
#[derive(Parser, Debug)]
#[command(name = "herald", version, about)]
struct Cli {
    /// Herald API endpoint URL.
    #[arg(
        long,
        env = "HERALD_ENDPOINT",
        default_value = "http://localhost:8080",
        global = true
    )]
    endpoint: String,

    /// Bearer token for authentication.
    #[arg(long, env = "HERALD_TOKEN", global = true)]
    token: Option<String>,

    /// Tenant id to act under.
    #[arg(long, env = "HERALD_TENANT", global = true)]
    tenant: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, env = "HERALD_TIMEOUT_SECONDS", default_value_t = 30, global = true)]
    timeout_seconds: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a notification.
    Send(SendArgs),
}

#[derive(Args, Debug)]
struct SendArgs {
    /// Notification channel: `email` or `sms`.
    #[arg(long = "type", value_name = "TYPE", default_value = "email")]
    kind: String,

    /// Recipient address (email address or E.164 phone number).
    #[arg(long)]
    recipient: String,

    /// Subject line (email only).
    #[arg(long)]
    subject: Option<String>,

    /// Message body.
    #[arg(long)]
    message: String,

    /// RFC 3339 instant to deliver at; omitted means immediately.
    #[arg(long)]
    schedule: Option<String>,

    /// File to attach (repeatable, email only).
    #[arg(long = "attachment", value_name = "PATH")]
    attachments: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Command::Send(args) => send(&cli, args).await,
    }
}

async fn send(cli: &Cli, args: &SendArgs) -> anyhow::Result<()> {
    let token = cli
        .token
        .as_deref()
        .context("a bearer token is required (--token or HERALD_TOKEN)")?;
    let tenant = cli
        .tenant
        .as_deref()
        .context("a tenant id is required (--tenant or HERALD_TENANT)")?;

    let mut attachments = Vec::with_capacity(args.attachments.len());
    for path in &args.attachments {
        let data = std::fs::read(path)
            .with_context(|| format!("cannot read attachment {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .with_context(|| format!("attachment path {} has no file name", path.display()))?;
        attachments.push(serde_json::json!({
            "filename": filename,
            "content_type": guess_content_type(path),
            "data": B64.encode(data),
        }));
    }

    let mut body = serde_json::json!({
        "tenant_id": tenant,
        "type": args.kind,
        "recipient": args.recipient,
        "message": args.message,
        "attachments": attachments,
    });
    if let Some(subject) = &args.subject {
        body["subject"] = serde_json::json!(subject);
    }
    if let Some(schedule) = &args.schedule {
        body["scheduled_time"] = serde_json::json!(schedule);
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(cli.timeout_seconds))
        .build()
        .context("cannot build HTTP client")?;

    let url = format!("{}/v1/notifications", cli.endpoint.trim_end_matches('/'));
    let response = client
        .post(&url)
        .bearer_auth(token)
        .header("x-tenant-id", tenant)
        .json(&body)
        .send()
        .await
        .with_context(|| format!("request to {url} failed"))?;

    let status = response.status();
    let payload: serde_json::Value = response
        .json()
        .await
        .context("server returned an unreadable response")?;

    println!("{}", serde_json::to_string_pretty(&payload)?);
    if !status.is_success() {
        bail!("server rejected the notification ({status})");
    }
    Ok(())
}

/// Best-effort content type from the file extension; the server defaults
/// anything unknown to `application/octet-stream`.
fn guess_content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("txt") => "text/plain",
        Some("html" | "htm") => "text/html",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_guessing() {
        assert_eq!(guess_content_type(Path::new("report.PDF")), "application/pdf");
        assert_eq!(guess_content_type(Path::new("notes.txt")), "text/plain");
        assert_eq!(guess_content_type(Path::new("blob")), "application/octet-stream");
        assert_eq!(guess_content_type(Path::new("archive.unknown")), "application/octet-stream");
    }

    #[test]
    fn cli_parses_a_send_invocation() {
        let cli = Cli::parse_from([
            "herald",
            "--endpoint",
            "http://localhost:9999",
            "--token",
            "tok",
            "--tenant",
            "t1",
            "send",
            "--type",
            "sms",
            "--recipient",
            "+15550001111",
            "--message",
            "hello",
        ]);
        assert_eq!(cli.endpoint, "http://localhost:9999");
        let Command::Send(args) = &cli.command;
        assert_eq!(args.kind, "sms");
        assert_eq!(args.recipient, "+15550001111");
        assert!(args.schedule.is_none());
    }
}
