use anyhow::Result;
use careline::cli::CliArgs;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    careline::run(args).await
}
