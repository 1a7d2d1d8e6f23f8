use anyhow::Context;
use reqwest::Client;

use fake_news_api::benchmark::benchmark_client::run_benchmark;
use fake_news_api::benchmark::test_cases::TEST_CASES;
use fake_news_api::utils::{init_tracing, load_config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = load_config().benchmark;

    // No timeout: an unresponsive server stalls the run
    let client = Client::new();
    run_benchmark(&client, &config, &TEST_CASES)
        .await
        .context("Benchmark run aborted")?;
    Ok(())
}
