//! # Trestle
//!
//! A bridge orchestration service that moves tokens between chains.
use clap::Parser;
use trestle::cli::Args;

#[tokio::main]
async fn main() {
    // Enable backtraces unless a RUST_BACKTRACE value has already been explicitly provided.
    if std::env::var_os("RUST_BACKTRACE").is_none() {
        // SAFETY: no other threads exist yet.
        unsafe { std::env::set_var("RUST_BACKTRACE", "1") };
    }

    let args = Args::parse();
    if let Err(err) = args.run().await {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}
