//! Ingest one product page and print the published record as JSON.
//!
//! Fetches through the render service named by `RENDER_API_URL`, or reads a
//! saved page with `--html-file`. Errors are printed as `{"error": ...}` and
//! exit with a non-zero status.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use rs_product_extract::{encoding, Error, FetchConfig, Ingestor, Options, PdfConfig, RenderMode};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ingest", about = "Extract a normalized product record from a product page")]
struct Cli {
    /// Product page URL
    url: String,

    /// Read the page from a file instead of fetching it
    #[arg(long)]
    html_file: Option<PathBuf>,

    /// Render service base URL
    #[arg(long, env = "RENDER_API_URL")]
    render_api_url: Option<String>,

    /// Bearer token for the render service
    #[arg(long, env = "RENDER_API_TOKEN", hide_env_values = true)]
    render_api_token: Option<String>,

    /// CSS selector the renderer waits for
    #[arg(long)]
    selector: Option<String>,

    /// Extra settle time for the renderer, in milliseconds
    #[arg(long)]
    wait: Option<u64>,

    /// Render-side timeout, in milliseconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Render mode (fast or full)
    #[arg(long, default_value = "fast")]
    mode: String,

    /// Minimum inferred image dimension in pixels
    #[arg(long, default_value_t = 200)]
    min_image_px: u32,

    /// Drop PNG images
    #[arg(long)]
    exclude_png: bool,

    /// Relax image filters
    #[arg(long)]
    aggressive: bool,

    /// Harvest tabbed and accordion content
    #[arg(long)]
    harvest: bool,

    /// Run the post-hoc cleanup pass
    #[arg(long)]
    sanitize: bool,

    /// Add markdown renderings
    #[arg(long)]
    markdown: bool,

    /// Include timings, warnings and QA findings
    #[arg(long)]
    debug: bool,

    /// Download and mine linked PDF manuals
    #[arg(long)]
    enrich_manuals: bool,

    /// Overall request budget in seconds (advisory)
    #[arg(long, default_value_t = 90)]
    request_timeout: u64,

    /// Manuals processed concurrently
    #[arg(long, default_value_t = 2)]
    pdf_workers: usize,

    /// Skip DNS resolution in the internal-address guard
    #[arg(long)]
    no_resolve: bool,
}

impl Cli {
    fn options(&self) -> Options {
        Options {
            url: Some(self.url.clone()),
            selector: self.selector.clone(),
            wait: self.wait,
            timeout: self.timeout,
            mode: RenderMode::parse(&self.mode),
            min_image_px: self.min_image_px,
            exclude_png: self.exclude_png,
            aggressive: self.aggressive,
            harvest: self.harvest,
            sanitize: self.sanitize,
            markdown: self.markdown,
            debug: self.debug,
            enrich_manuals: self.enrich_manuals,
            request_timeout: Duration::from_secs(self.request_timeout),
            ..Options::default()
        }
    }

    fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            render_api_url: self.render_api_url.clone(),
            render_api_token: self.render_api_token.clone(),
            resolve_hosts: !self.no_resolve,
            ..FetchConfig::default()
        }
    }

    fn pdf_config(&self) -> PdfConfig {
        PdfConfig {
            workers: self.pdf_workers,
            resolve_hosts: !self.no_resolve,
            ..PdfConfig::default()
        }
    }
}

async fn run(cli: &Cli) -> Result<String, Error> {
    let options = cli.options();
    let ingestor = Ingestor::new(cli.fetch_config(), cli.pdf_config())?;

    let output = match &cli.html_file {
        Some(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| Error::Internal(format!("cannot read {}: {e}", path.display())))?;
            ingestor.ingest_html(&encoding::decode_body(&bytes, None), &options).await?
        }
        None => ingestor.ingest(&cli.url, &options).await?,
    };

    serde_json::to_string_pretty(&output.published(&options)).map_err(|e| Error::Internal(e.to_string()))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli).await {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            let body = serde_json::to_string(&err.to_body()).unwrap_or_else(|_| format!("{{\"error\":\"{err}\"}}"));
            println!("{body}");
            tracing::error!(status = err.status_code(), "ingestion failed");
            ExitCode::FAILURE
        }
    }
}
