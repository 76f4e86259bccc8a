//! Simple CLI that reads HTML from stdin and prints the published record as JSON.
//!
//! The first argument, when present, is used as the page URL for resolving
//! relative links. Tab harvesting and markdown renderings are always on.

use std::io::{self, Read};

use rs_product_extract::{extract_product_bytes, Options};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let mut html = Vec::new();
    if io::stdin().read_to_end(&mut html).is_err() {
        eprintln!("Failed to read from stdin");
        std::process::exit(1);
    }

    let options = Options {
        url: std::env::args().nth(1),
        harvest: true,
        markdown: true,
        ..Options::default()
    };

    let json = match extract_product_bytes(&html, &options) {
        Ok(output) => serde_json::to_string(&output.published(&options)),
        Err(err) => {
            println!("{}", serde_json::to_string(&err.to_body()).unwrap_or_default());
            std::process::exit(2);
        }
    };

    println!("{}", json.unwrap_or_default());
}
