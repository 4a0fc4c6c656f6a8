//! Encode Form - stream files as multipart/form-data to stdout.
//!
//! This example demonstrates:
//! - Feeding parts from an async task through a bounded channel
//! - Running the blocking encoder on a blocking thread
//! - Content types from file extensions
//!
//! # Running
//!
//! ```text
//! RUST_LOG=partstream=trace cargo run --example encode_form -- notes.txt photo.png > body.bin
//! ```
//!
//! The `Content-Type` header value for the body is printed to stderr.

use std::fs::File;
use std::io;

use partstream::{part_channel, Encoder, Part};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    let (tx, rx) = part_channel(1);

    let producer = tokio::spawn(async move {
        tx.send(Part::new().with_form_name("count").with_content_string(paths.len().to_string()))
            .await?;
        for path in paths {
            let file = match File::open(&path) {
                Ok(file) => file,
                Err(e) => return tx.fail(e).await,
            };
            let part = Part::new()
                .with_form_name("file")
                .with_file_name(&path)
                .with_content_type_by_extension()
                .with_content(file);
            tx.send(part).await?;
        }
        Ok::<(), partstream::MultipartError>(())
    });

    let encoder = tokio::task::spawn_blocking(move || -> partstream::Result<u64> {
        let mut encoder = Encoder::new(rx)?;
        eprintln!("Content-Type: {}", encoder.form_data_content_type());
        Ok(encoder.write_to(&mut io::stdout())?)
    });

    let written = encoder.await??;
    // the producer only fails once the encoder has stopped reading
    if let Err(e) = producer.await? {
        tracing::warn!("Producer stopped early: {}", e);
    }
    tracing::info!("Wrote {} bytes", written);
    Ok(())
}
