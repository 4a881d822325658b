use fanout::config::Config;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let config = Config::load()?;
    fanout::run(config).await
}
