//! Proxy - re-frame a multipart body read from stdin under a new boundary.
//!
//! # Running
//!
//! ```text
//! cargo run --example proxy -- 'multipart/form-data; boundary=abc' < body.bin > out.bin
//! ```
//!
//! Parts are decoded one at a time and re-encoded as they arrive; the new
//! `Content-Type` value is printed to stderr.

use std::io;

use partstream::decoder::{DecoderConfig, PartReader};
use partstream::{parse_boundary, Encoder};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let content_type = std::env::args()
        .nth(1)
        .ok_or("usage: proxy <content-type>")?;
    let boundary = parse_boundary(&content_type)?;

    let config = DecoderConfig {
        read_chunk_size: 64 * 1024,
        ..DecoderConfig::default()
    };
    let parts = PartReader::with_config(io::stdin(), &boundary, config)?;

    let mut encoder = Encoder::new(parts)?;
    eprintln!("Content-Type: {}", encoder.form_data_content_type());
    let written = encoder.write_to(&mut io::stdout())?;

    tracing::info!("Re-framed body: {} bytes", written);
    Ok(())
}
