use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let params = cli::params::Params::parse();
    let failures = cli::start(params).await?;
    if failures > 0 {
        anyhow::bail!("{failures} instance(s) failed to reconcile");
    }
    Ok(())
}
