#![forbid(unsafe_code)]

//! `iqc-ctl`: command-line companion for `iqc-tracker`.
//!
//! Talks to the REST API of a running server. Intended for operators
//! who want to trigger a sync or record a verdict without the web UI.

use clap::{Parser, Subcommand, ValueEnum};
use reqwest::{Client, Method, StatusCode, Url};
use serde_json::{json, Value};

#[derive(Debug, Parser)]
#[command(
    name = "iqc-ctl",
    about = "Command-line client for the iqc-tracker server",
    version,
    long_about = None
)]
struct Cli {
    /// Base URL of the running server.
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum VerdictArg {
    Pass,
    Fail,
}

impl VerdictArg {
    fn label(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Pull pending warehouse invoices into the task queue.
    Sync,

    /// List tasks.
    Tasks {
        /// Only show tasks with this status label.
        #[arg(long)]
        status: Option<String>,
        /// Only show tasks still waiting for a verdict.
        #[arg(long)]
        active: bool,
        /// Free-text search over invoice, part, vendor, and lot.
        #[arg(long)]
        search: Option<String>,
    },

    /// Show the sampling plan for a task.
    Plan {
        /// Task ID.
        id: String,
    },

    /// Start inspecting a task.
    Start {
        /// Task ID.
        id: String,
        #[arg(long)]
        inspector: String,
    },

    /// Record a verdict for a task.
    Submit {
        /// Task ID.
        id: String,
        #[arg(long, value_enum)]
        verdict: VerdictArg,
        #[arg(long)]
        inspector: String,
        /// Units inspected; defaults to the sample size.
        #[arg(long)]
        qty_inspected: Option<i64>,
        /// Units found defective.
        #[arg(long)]
        qty_failed: Option<i64>,
        #[arg(long)]
        remark: Option<String>,
    },

    /// List recorded inspection results.
    Results {
        /// Restrict to one task.
        #[arg(long)]
        task: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Cli::parse();
    let base = args.url.trim_end_matches('/').to_owned();

    let (method, path, query, body) = match args.command {
        Command::Sync => (Method::POST, "/api/sync".to_owned(), Vec::new(), None),
        Command::Tasks {
            status,
            active,
            search,
        } => {
            let mut query = Vec::new();
            if let Some(status) = status {
                query.push(("status", status));
            }
            if active {
                query.push(("active", "true".to_owned()));
            }
            if let Some(search) = search {
                query.push(("q", search));
            }
            (Method::GET, "/api/tasks".to_owned(), query, None)
        }
        Command::Plan { id } => (
            Method::GET,
            format!("/api/tasks/{id}/sampling"),
            Vec::new(),
            None,
        ),
        Command::Start { id, inspector } => (
            Method::POST,
            format!("/api/tasks/{id}/start"),
            Vec::new(),
            Some(json!({ "inspector": inspector })),
        ),
        Command::Submit {
            id,
            verdict,
            inspector,
            qty_inspected,
            qty_failed,
            remark,
        } => {
            let mut req = json!({ "verdict": verdict.label(), "inspector": inspector });
            if let Some(qty) = qty_inspected {
                req["qty_inspected"] = json!(qty);
            }
            if let Some(qty) = qty_failed {
                req["qty_failed"] = json!(qty);
            }
            if let Some(remark) = remark {
                req["remark"] = Value::String(remark);
            }
            (
                Method::POST,
                format!("/api/tasks/{id}/inspection"),
                Vec::new(),
                Some(req),
            )
        }
        Command::Results { task } => {
            let query = task.map(|task| vec![("task_id", task)]).unwrap_or_default();
            (Method::GET, "/api/results".to_owned(), query, None)
        }
    };

    match send(&base, method, &path, &query, body.as_ref()).await {
        Ok((status, response)) if status.is_success() => {
            println!(
                "{}",
                serde_json::to_string_pretty(&response).unwrap_or_default()
            );
        }
        Ok((status, response)) => {
            let kind = response
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            let details = response
                .get("details")
                .and_then(Value::as_str)
                .unwrap_or_default();
            eprintln!("Error ({status}): {kind}: {details}");
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("Failed to reach server: {err}");
            eprintln!("Is iqc-tracker running at '{base}'?");
            std::process::exit(1);
        }
    }
}

/// Send one request and decode the JSON reply (empty bodies become `null`).
async fn send(
    base: &str,
    method: Method,
    path: &str,
    query: &[(&str, String)],
    body: Option<&Value>,
) -> std::result::Result<(StatusCode, Value), Box<dyn std::error::Error>> {
    let mut url = Url::parse(&format!("{base}{path}"))?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }

    let client = Client::new();
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(body);
    }

    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;
    let value = serde_json::from_str(&text).unwrap_or(Value::Null);
    Ok((status, value))
}
