use anyhow::Result;
use shiftfeed_core::Config;
use shiftfeed_schedule::RunContext;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Every "is this shift upcoming" decision uses this instant
    let started = chrono::Utc::now().timestamp_millis();

    shiftfeed_core::init()?;

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(e.exit_code());
        }
    };

    let ctx = RunContext::new(started, &config.timezone)?;

    if let Err(e) = shiftfeed_schedule::sync::run(&config, &ctx).await {
        tracing::error!("{}", e.user_message());
        return Err(e.into());
    }

    Ok(())
}
