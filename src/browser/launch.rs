use std::path::Path;

use anyhow::Result;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::BrowserSettings;
use crate::error::AppError;

/// 连接后抹掉 webdriver 痕迹
const WEBDRIVER_PATCH: &str =
    "Object.defineProperty(navigator, 'webdriver', {get: () => undefined})";

/// 启动受控浏览器并导航到指定 URL
///
/// 使用持久化用户目录（保持登录态）并关闭自动化特征。
pub async fn launch_browser(
    settings: &BrowserSettings,
    profile_dir: &str,
    url: &str,
) -> Result<(Browser, Page)> {
    info!("🚀 启动浏览器...");
    debug!("目标 URL: {}", url);

    // 用户数据目录需要提前就位
    std::fs::create_dir_all(Path::new(profile_dir).join("Default"))?;

    // 配置浏览器
    let config = BrowserConfig::builder()
        .with_head()
        .chrome_executable(Path::new(&settings.executable_path))
        .user_data_dir(Path::new(profile_dir))
        .args(vec![
            "--profile-directory=Default",
            "--disable-blink-features=AutomationControlled", // 关闭自动化特征
            "--no-first-run",
            "--disable-dev-shm-usage", // 防止共享内存不足
        ])
        .build()
        .map_err(|e| {
            error!("配置浏览器失败: {}", e);
            anyhow::anyhow!("配置浏览器失败: {}", e)
        })?;

    // 启动浏览器
    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        AppError::browser_launch_failed(e)
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    // 创建新页面并导航
    let page = browser.new_page(url).await.map_err(|e| {
        error!("创建页面失败: {}", e);
        AppError::page_creation_failed(e)
    })?;

    if let Err(e) = page.evaluate(WEBDRIVER_PATCH).await {
        debug!("webdriver 修补失败（忽略）: {}", e);
    }

    info!("✅ 浏览器已导航到: {}", url);
    Ok((browser, page))
}
