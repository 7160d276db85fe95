use std::fs;
use std::io::{self, Read};
use std::time::{SystemTime, UNIX_EPOCH};

use anchor::AnchorOptions;
use clap::{Args, Parser, Subcommand};
use overlay::CommentStore;
use overlay::http::HttpCommentStore;
use overlay::popup::DetailView;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use wire::{AnnotationRecord, Envelope, RenderRequest, RenderResponse};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing session token; pass --session-token or set ANNOTATE_SESSION_TOKEN")]
    MissingSessionToken,
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("http client setup failed: {0}")]
    Client(#[from] overlay::http::HttpStoreError),
    #[error("comment store error: {0}")]
    Store(#[from] overlay::StoreError),
    #[error("server returned {status}: {message}")]
    ServerError { status: u16, message: String },
    #[error("annotation list carries an error: {0}")]
    Envelope(#[from] wire::WireError),
    #[error("threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),
    #[error("failed to read {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "annotate", about = "Context annotation engine and service CLI")]
struct Cli {
    #[arg(long, env = "ANNOTATE_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[arg(long, env = "ANNOTATE_SESSION_TOKEN")]
    session_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone)]
struct CliContext {
    base_url: String,
    session_token: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the service is up.
    Ping,
    /// Anchor annotations into a local document, without the service.
    Anchor(AnchorArgs),
    /// List the highlight markers already present in a rendered document.
    Markers {
        #[arg(long, default_value = "-", help = "Content file path, or - for stdin")]
        content: String,
    },
    Api(ApiCommand),
}

#[derive(Args, Debug)]
struct AnchorArgs {
    #[arg(long, default_value = "-", help = "Content file path, or - for stdin")]
    content: String,

    #[arg(long, help = "JSON list of annotations, bare or inside a list envelope")]
    annotations: String,

    #[arg(long, conflicts_with = "strict")]
    threshold: Option<f64>,

    #[arg(long, default_value_t = false)]
    strict: bool,

    #[arg(long, default_value_t = false)]
    container: bool,

    #[arg(long, default_value_t = false, help = "Print only the rendered content")]
    html: bool,
}

#[derive(Args, Debug)]
struct ApiCommand {
    #[command(subcommand)]
    command: ApiSubcommand,
}

#[derive(Subcommand, Debug)]
enum ApiSubcommand {
    List {
        document_id: String,
    },
    Create {
        document_id: String,
        #[arg(long)]
        context: String,
        #[arg(long)]
        comment: String,
    },
    Show {
        comment_id: Uuid,
    },
    Render {
        document_id: String,
        #[arg(long, default_value = "-", help = "Content file path, or - for stdin")]
        content: String,
        #[arg(long, default_value_t = false)]
        strict: bool,
        #[arg(long, default_value_t = false)]
        container: bool,
    },
    Me,
    DevSession,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = CliContext { base_url: cli.base_url, session_token: cli.session_token };

    match cli.command {
        Command::Ping => run_ping(&ctx).await,
        Command::Anchor(args) => run_anchor(&args),
        Command::Markers { content } => run_markers(&content),
        Command::Api(api) => run_api(&ctx, api).await,
    }
}

async fn run_ping(cli: &CliContext) -> Result<(), CliError> {
    let client = reqwest::Client::new();
    let url = format!("{}/healthz", cli.base_url.trim_end_matches('/'));
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::ServerError { status: status.as_u16(), message: "health check failed".to_owned() });
    }
    println!("ok");
    Ok(())
}

// =============================================================================
// LOCAL ENGINE
// =============================================================================

fn run_anchor(args: &AnchorArgs) -> Result<(), CliError> {
    let content = read_input(&args.content)?;
    let records = parse_annotations(&read_input(&args.annotations)?)?;
    let options = anchor_options(args.threshold, args.strict)?;

    let annotations: Vec<_> = records.into_iter().map(AnnotationRecord::into_annotation).collect();
    let anchored = anchor::anchor(&content, &annotations, &options);
    tracing::info!(total = annotations.len(), matched = anchored.matched_count(), "anchored");

    let content = if args.container { anchor::marker::wrap_container(&anchored.content) } else { anchored.content };
    if args.html {
        println!("{content}");
        return Ok(());
    }
    print_json(&serde_json::to_value(RenderResponse { content, results: anchored.results })?)
}

fn run_markers(path: &str) -> Result<(), CliError> {
    let content = read_input(path)?;
    let markers: Vec<Value> = anchor::markers(&content)
        .into_iter()
        .map(|m| json!({ "id": m.id, "comment": m.comment, "text": m.text, "offset": m.source_start }))
        .collect();
    print_json(&Value::Array(markers))
}

fn anchor_options(threshold: Option<f64>, strict: bool) -> Result<AnchorOptions, CliError> {
    match threshold {
        Some(t) if !(0.0..=1.0).contains(&t) => Err(CliError::InvalidThreshold(t)),
        Some(t) => Ok(AnchorOptions::new(t)),
        None if strict => Ok(AnchorOptions::strict()),
        None => Ok(AnchorOptions::default()),
    }
}

/// Accept either a bare list or the list action's envelope.
fn parse_annotations(raw: &str) -> Result<Vec<AnnotationRecord>, CliError> {
    let value: Value = serde_json::from_str(raw)?;
    if value.get("success").is_some() {
        let envelope: Envelope<Vec<AnnotationRecord>> = serde_json::from_value(value)?;
        return envelope.into_result().map_err(CliError::from);
    }
    Ok(serde_json::from_value(value)?)
}

// =============================================================================
// SERVICE
// =============================================================================

async fn run_api(cli: &CliContext, api: ApiCommand) -> Result<(), CliError> {
    match api.command {
        ApiSubcommand::List { document_id } => {
            let records = store(cli)?.list_approved(&document_id).await?;
            print_json(&serde_json::to_value(records)?)
        }
        ApiSubcommand::Create { document_id, context, comment } => {
            if cli.session_token.is_none() {
                return Err(CliError::MissingSessionToken);
            }
            let created = store(cli)?.create(&document_id, &context, &comment, None).await?;
            print_json(&serde_json::to_value(created)?)
        }
        ApiSubcommand::Show { comment_id } => {
            let detail = store(cli)?.get_by_id(comment_id).await?;
            print_json(&show_json(detail, now_ms())?)
        }
        ApiSubcommand::Render { document_id, content, strict, container } => {
            let body = RenderRequest { content: read_input(&content)?, strict, container };
            let path = format!("/api/documents/{}/render", anchor::marker::encode_component(&document_id));
            let json = api_request(cli, reqwest::Method::POST, &path, Some(serde_json::to_value(body)?)).await?;
            print_json(&json)
        }
        ApiSubcommand::Me => {
            let json = api_request(cli, reqwest::Method::GET, "/api/auth/me", None).await?;
            print_json(&json)
        }
        ApiSubcommand::DevSession => {
            let json = api_request(cli, reqwest::Method::POST, "/api/dev/session", None).await?;
            print_json(&json)
        }
    }
}

/// Detail payload plus the byline a popup would show.
fn show_json(detail: wire::AnnotationDetail, now_ms: i64) -> Result<Value, CliError> {
    let byline = DetailView::from_detail(detail.clone()).byline(now_ms);
    let mut value = serde_json::to_value(detail)?;
    if let Some(map) = value.as_object_mut() {
        map.insert("byline".to_owned(), byline.map_or(Value::Null, Value::String));
    }
    Ok(value)
}

fn now_ms() -> i64 {
    let Ok(duration) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(duration.as_millis()).unwrap_or(0)
}

fn store(cli: &CliContext) -> Result<HttpCommentStore, CliError> {
    Ok(HttpCommentStore::new(&cli.base_url, cli.session_token.as_deref())?)
}

async fn api_request(
    cli: &CliContext,
    method: reqwest::Method,
    path: &str,
    body: Option<Value>,
) -> Result<Value, CliError> {
    let mut headers = HeaderMap::new();
    if let Some(token) = cli.session_token.as_deref() {
        headers.insert(COOKIE, HeaderValue::from_str(&format!("session_token={token}"))?);
    }

    let client = reqwest::Client::builder().default_headers(headers).build()?;
    let url = format!("{}{}", cli.base_url.trim_end_matches('/'), path);

    let request = client.request(method, &url);
    let request = if let Some(json) = body { request.json(&json) } else { request };

    let response = request.send().await?;
    let status = response.status();
    let value = response.json::<Value>().await.unwrap_or(Value::Null);

    if !status.is_success() {
        return Err(CliError::ServerError { status: status.as_u16(), message: error_message(&value) });
    }

    Ok(value.get("data").cloned().unwrap_or(value))
}

/// Message of a failure envelope, or the raw body.
fn error_message(value: &Value) -> String {
    value
        .get("error")
        .and_then(|e| {
            let code = e.get("code")?.as_str()?;
            let message = e.get("message").and_then(Value::as_str).unwrap_or_default();
            Some(format!("{code}: {message}"))
        })
        .unwrap_or_else(|| value.to_string())
}

fn read_input(path: &str) -> Result<String, CliError> {
    let read_err = |source| CliError::Read { path: path.to_owned(), source };
    if path == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).map_err(read_err)?;
        return Ok(buf);
    }
    fs::read_to_string(path).map_err(read_err)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
