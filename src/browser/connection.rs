use anyhow::{Context, Result};
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::AppError;

/// 连接到已登录的浏览器并获取申报页面
///
/// 申报系统需要人工登录，所以优先复用同一站点下已经打开的标签页，
/// 找不到时才新建页面。
pub async fn connect_to_browser_and_page(port: u16, target_url: &str) -> Result<(Browser, Page)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        AppError::browser_connection_failed(port, e)
    })?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let pages = browser.pages().await.context("获取标签页列表失败")?;
    debug!("获取到 {} 个页面", pages.len());

    let site = site_of(target_url);
    for p in pages.iter() {
        if let Ok(Some(url)) = p.url().await {
            debug!("检查页面: {}", url);
            if site_of(&url) == site {
                info!("✓ 复用已登录的页面: {}", url);
                return Ok((browser, p.clone()));
            }
        }
    }

    debug!("没有同站点的页面，创建新页面并导航到: {}", target_url);
    let page = browser.new_page(target_url).await.map_err(|e| {
        error!("导航到 {} 失败: {}", target_url, e);
        AppError::navigation_failed(target_url, e)
    })?;
    info!("已导航到: {}", target_url);

    Ok((browser, page))
}

/// 协议 + 主机部分，用来判断两个页面是否同站
fn site_of(url: &str) -> &str {
    let after_scheme = url.find("://").map_or(0, |i| i + 3);
    let end = url[after_scheme..]
        .find('/')
        .map_or(url.len(), |i| after_scheme + i);
    &url[..end]
}
