//! Raw API request commands.

use anyhow::{Context, Result, anyhow};
use clap::Args;

use drivedesk_http::{Method, PendingRequest};

use crate::cli::ApiArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Path below the API URL (e.g. /api/registrations)
    pub path: String,

    /// Query parameter as key=value; repeatable
    #[arg(long, value_parser = parse_key_val)]
    pub query: Vec<(String, String)>,

    /// Extra header as name:value; repeatable
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,
}

#[derive(Args, Debug)]
pub struct BodyArgs {
    /// Path below the API URL (e.g. /api/registrations)
    pub path: String,

    /// JSON request body
    #[arg(long)]
    pub data: Option<String>,

    /// Extra header as name:value; repeatable
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,
}

pub async fn run_query(api: &ApiArgs, method: Method, args: QueryArgs) -> Result<()> {
    let request = args
        .query
        .into_iter()
        .fold(PendingRequest::new(method, args.path), |request, (k, v)| {
            request.query(k, v)
        });

    send(api, with_headers(request, &args.headers)?).await
}

pub async fn run_body(api: &ApiArgs, method: Method, args: BodyArgs) -> Result<()> {
    let mut request = PendingRequest::new(method, args.path);

    if let Some(data) = &args.data {
        let body: serde_json::Value =
            serde_json::from_str(data).context("--data is not valid JSON")?;
        request = request.json(&body)?;
    }

    send(api, with_headers(request, &args.headers)?).await
}

async fn send(api: &ApiArgs, request: PendingRequest) -> Result<()> {
    let (client, _store) = session::connect(api)?;
    client.require_session().context(session::NO_SESSION)?;

    let description = format!("{} {}", request.method(), request.path());
    let body: serde_json::Value = client
        .send_json(request)
        .await
        .with_context(|| format!("{} failed", description))?;

    output::json(&body, true)
}

fn with_headers(request: PendingRequest, headers: &[(String, String)]) -> Result<PendingRequest> {
    headers.iter().try_fold(request, |request, (name, value)| {
        request
            .header(name, value)
            .with_context(|| format!("Invalid header '{}'", name))
    })
}

fn parse_header(s: &str) -> Result<(String, String)> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| anyhow!("expected name:value, got '{}'", s))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}

fn parse_key_val(s: &str) -> Result<(String, String)> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected key=value, got '{}'", s))?;
    Ok((key.to_string(), value.to_string()))
}
