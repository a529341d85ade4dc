use demand_submit::browser::{connect_to_browser_and_page, PageFormDriver};
use demand_submit::config::Config;
use demand_submit::infrastructure::{FormDriver, JsExecutor};
use demand_submit::logger;
use std::time::Duration;

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_open_entry_and_first_village() {
    // 初始化日志
    logger::init(true, None);

    // 加载配置
    let config = Config::load().expect("加载配置失败");

    // 连接已登录的浏览器
    let (_browser, page) = connect_to_browser_and_page(config.browser_debug_port, &config.target_url)
        .await
        .expect("连接浏览器失败");

    let mut driver = PageFormDriver::new(
        JsExecutor::new(page),
        config.target_url.clone(),
        config.demand.panchayat.clone(),
        Duration::from_secs(config.call_timeout_secs),
        Duration::from_secs(config.response_wait_secs),
    );

    driver.open_entry().await.expect("打开申报页面失败");

    // 注意：请根据实际情况修改村庄编号
    let village = std::env::var("TEST_VILLAGE_KEY").unwrap_or_else(|_| "001".to_string());
    driver
        .select_sub_unit(&village)
        .await
        .expect("切换村庄失败");
}

#[tokio::test]
#[ignore]
async fn test_browser_connection() {
    // 初始化日志
    logger::init(false, None);

    // 加载配置
    let config = Config::load().expect("加载配置失败");

    // 测试浏览器连接
    let result = connect_to_browser_and_page(config.browser_debug_port, &config.target_url).await;

    assert!(result.is_ok(), "应该能够成功连接浏览器");
}
