use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use chromiumoxide::Browser;
use tracing::{info, warn};

use crate::browser;
use crate::config::{BrowserSettings, Config};
use crate::infrastructure::Session;
use crate::models::filters::FilterConfig;
use crate::orchestrator::pager::{self, RunStats};
use crate::services::autofill_kb::AutofillKb;
use crate::services::job_filter::JobFilter;

/// 应用主结构
pub struct App {
    config: Config,
    // Browser 句柄必须活到运行结束，掉了会话就断了
    _browser: Browser,
    session: Session,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        init_log_file(&config)?;
        log_startup(&config);

        // 过滤配置的透传字段决定搜索 URL 上的查询参数
        let filters = FilterConfig::load(&config.filters_path)?;
        let search_url = filters.search_url(&config.target_url);

        let (browser, page) = if config.attach_existing {
            browser::connect_to_browser_and_page(
                config.browser_debug_port,
                Some(&search_url),
                None,
            )
            .await?
        } else {
            let settings = BrowserSettings::load(&config.browser_settings_path)?;
            browser::launch_browser(&settings, &config.profile_dir, &search_url).await?
        };

        Ok(Self {
            config,
            _browser: browser,
            session: Session::new(page),
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        let filters = FilterConfig::load(&self.config.filters_path)?;
        let filter = JobFilter::new(&filters);
        info!("过滤设置: {}", filter.summary());

        let mut kb = AutofillKb::load(&self.config.autofill_path)?;

        // Ctrl-C → 协作式取消；进行中的操作总是做完再停
        let running = Arc::new(AtomicBool::new(true));
        {
            let running = running.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("收到 Ctrl-C，将在当前操作完成后停止");
                    running.store(false, Ordering::SeqCst);
                }
            });
        }
        let should_continue = {
            let running = running.clone();
            move || running.load(Ordering::SeqCst)
        };

        let stats = pager::process_listing_pages(
            &self.session,
            &filter,
            &mut kb,
            &self.config,
            should_continue,
        )
        .await?;

        print_final_stats(&stats, &self.config);
        Ok(())
    }
}

// ========== 日志辅助函数 ==========

fn init_log_file(config: &Config) -> Result<()> {
    let log_header = format!(
        "{}\n职位申请日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(&config.output_log_file, log_header)?;
    Ok(())
}

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 快速申请自动化");
    info!("📋 知识库: {}", config.autofill_path);
    info!("📋 过滤配置: {}", config.filters_path);
    info!("📋 步数上限: {}", config.step_limit);
    info!("{}", "=".repeat(60));
}

fn print_final_stats(stats: &RunStats, config: &Config) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 提交成功: {}", stats.applied);
    info!("↩️ 此前已申请: {}", stats.already_applied);
    info!("⏭️ 跳过: {}", stats.skipped);
    info!("❌ 失败: {}", stats.failed);
    info!("📄 处理页数: {}", stats.pages);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", config.output_log_file);
}
