use anyhow::Result;
use demand_submit::config::Config;
use demand_submit::utils::{logger, logging};
use demand_submit::App;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logging::init_log_file(&config.output_log_file)?;
    logger::init(config.verbose_logging, Some(&config.output_log_file));

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
