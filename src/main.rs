use anyhow::{Context, Result, bail};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use placesfetch::api::{
    PlacesRequest, QueryEncoding, QueryParameters, ReqwestClient, SearchCategory,
};
use placesfetch::config::FileConfig;

/// Fetch raw responses from places search endpoints
///
/// Examples:
///   # Nearby search around a point
///   placesfetch -p key=API_KEY -p location=-33.8670522,151.1957362 -p radius=1500
///
///   # Place details, pretty-printed
///   placesfetch -c detail -p key=API_KEY -p place_id=ChIJN1t_tDeuEmsRUsoyG83frY4 --pretty
///
///   # Photo bytes written to a file
///   placesfetch -c photo -p key=API_KEY -p maxwidth=400 -p photo_reference=REF -o photo.jpg
///
///   # Any other URL (scheme-relative URLs get https:)
///   placesfetch -u //maps.googleapis.com/maps/api/place/textsearch/json?query=pizza
#[derive(Parser, Debug)]
#[command(name = "placesfetch")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to config file (optional, auto-searches placesfetch.toml if not provided)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Search category (defaults to nearby, or custom when --url is given)
    #[arg(short = 'c', long)]
    category: Option<SearchCategory>,

    /// Query parameter as key=value (repeatable)
    #[arg(short = 'p', long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,

    /// Custom request URL, replaces the category endpoint and parameters
    #[arg(short = 'u', long)]
    url: Option<String>,

    /// Percent-encode query keys and values
    #[arg(long)]
    encode: bool,

    /// Pretty-print JSON responses
    #[arg(long)]
    pretty: bool,

    /// Write the response body to a file instead of stdout
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, _)) if key.is_empty() => Err(format!("empty parameter name in '{}'", raw)),
        Some((key, value)) => Ok((key.to_string(), value.to_string())),
        None => Err(format!("expected key=value, got '{}'", raw)),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let (file_config, skipped) = match args.config {
        Some(ref path) => {
            if !path.exists() {
                bail!("Config file not found: {:?}", path);
            }
            (FileConfig::from_path(path)?, Vec::new())
        }
        None => {
            let (config, skipped) = FileConfig::load();
            (config.unwrap_or_default(), skipped)
        }
    };

    let verbose = args.verbose || file_config.verbose;
    init_tracing(verbose)?;
    for e in &skipped {
        tracing::warn!(error = %e, "skipping config file");
    }

    let category = resolve_category(
        args.category,
        args.url.is_some(),
        file_config.category,
        file_config.url.is_some(),
    );
    let url = args.url.clone().or_else(|| file_config.url.clone());

    let mut params: QueryParameters = file_config.params.clone();
    params.extend(args.params.iter().cloned());

    let encoding = if args.encode || file_config.encode_query {
        QueryEncoding::Percent
    } else {
        QueryEncoding::Verbatim
    };
    let pretty = args.pretty || file_config.pretty;
    let output = args.output.clone().or_else(|| file_config.output.clone());

    let request = build_request(category, params, url.as_deref(), encoding)?;
    tracing::debug!(
        category = %request.category(),
        url = %request.resolved_url(),
        "resolved request"
    );

    let client = match file_config.user_agent {
        Some(ref ua) => ReqwestClient::with_user_agent(ua),
        None => ReqwestClient::new(),
    }
    .context("Failed to create HTTP client")?;

    let spinner = if std::io::stderr().is_terminal() {
        Some(create_spinner(&format!("Fetching {}...", category))?)
    } else {
        None
    };
    let start = Instant::now();
    let body = request.fetch_blocking(&client);

    let Some(body) = body else {
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        bail!("No data received from {}", request.resolved_url());
    };

    if let Some(spinner) = spinner {
        spinner.finish_with_message(format!(
            "Fetched {} bytes [{:.1}s]",
            body.len(),
            start.elapsed().as_secs_f32()
        ));
    }

    let body = if pretty { prettify(body) } else { body };

    match output {
        Some(path) => std::fs::write(&path, &body)
            .context(format!("Failed to write response to {:?}", path))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&body).context("Failed to write response")?;
            stdout.flush()?;
        }
    }

    Ok(())
}

/// Command-line choices win over the config file. Within each source an
/// explicit category wins over one implied by a URL.
fn resolve_category(
    cli_category: Option<SearchCategory>,
    cli_url: bool,
    file_category: Option<SearchCategory>,
    file_url: bool,
) -> SearchCategory {
    let implied = |has_url: bool| has_url.then_some(SearchCategory::Custom);

    cli_category
        .or_else(|| implied(cli_url))
        .or(file_category)
        .or_else(|| implied(file_url))
        .unwrap_or_default()
}

fn build_request(
    category: SearchCategory,
    params: QueryParameters,
    url: Option<&str>,
    encoding: QueryEncoding,
) -> Result<PlacesRequest> {
    if category != SearchCategory::Custom {
        if url.is_some() {
            tracing::warn!(%category, "ignoring --url for non-custom category");
        }
        let params = (!params.is_empty()).then_some(params);
        return Ok(PlacesRequest::with_encoding(category, params, encoding));
    }

    let Some(url) = url else {
        bail!("The custom category requires --url");
    };
    if !params.is_empty() {
        tracing::warn!("query parameters are not applied to custom URLs");
    }
    Ok(PlacesRequest::custom(url))
}

/// Re-indent JSON bodies; anything else passes through untouched.
fn prettify(body: Vec<u8>) -> Vec<u8> {
    match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(value) => match serde_json::to_vec_pretty(&value) {
            Ok(mut pretty) => {
                pretty.push(b'\n');
                pretty
            }
            Err(_) => body,
        },
        Err(_) => body,
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn create_spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")?
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    Ok(pb)
}
