//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：写日志文件头、连接（或启动）浏览器、创建页面驱动
//! 2. **加载名册**：读取 CSV，取出选中的申请人
//! 3. **后台运行**：把驱动交给 `DemandRun` 的后台任务，前台只消费事件
//! 4. **取消**：Ctrl-C 触发取消信号
//! 5. **导出**：把台账写成 CSV 报告并输出统计
//!
//! ## 设计特点
//!
//! - **资源所有者**：唯一持有 Browser 的模块，页面随驱动一起移交给运行任务
//! - **单向通信**：运行任务只发事件，从不等待前台

use anyhow::{Context, Result};
use chromiumoxide::Browser;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::browser::{self, PageFormDriver};
use crate::config::Config;
use crate::error::AppError;
use crate::infrastructure::JsExecutor;
use crate::models::{load_roster_csv, Roster};
use crate::orchestrator::demand_run::DemandRun;
use crate::services::ResultWriter;
use crate::utils::logging;
use crate::workflow::{CancelFlag, RunEvent, RunSummary};

/// 应用主结构
pub struct App {
    config: Config,
    _browser: Browser,
    driver: PageFormDriver,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config);

        let (browser, page) = if config.headless {
            browser::launch_headless_browser(&config.target_url, config.chrome_executable.as_deref())
                .await?
        } else {
            browser::connect_to_browser_and_page(config.browser_debug_port, &config.target_url)
                .await?
        };

        // 回发等待要留在单次调用的超时之内
        let call_timeout = Duration::from_secs(config.call_timeout_secs);
        let driver = PageFormDriver::new(
            JsExecutor::new(page),
            config.target_url.clone(),
            config.demand.panchayat.clone(),
            call_timeout * 3 / 4,
            Duration::from_secs(config.response_wait_secs),
        );

        Ok(Self {
            config,
            _browser: browser,
            driver,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(self) -> Result<()> {
        let roster = self.load_roster().await?;
        let selected = roster.selected();
        logging::log_roster_loaded(roster.len(), selected.len());

        if selected.is_empty() {
            warn!("⚠️ 名册中没有选中的申请人，程序结束");
            return Ok(());
        }

        let cancel = CancelFlag::new();
        let run = DemandRun::new(
            &self.config.demand,
            Duration::from_secs(self.config.call_timeout_secs),
            cancel.clone(),
        )
        .context("初始化响应分类规则失败")?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = run.spawn(self.driver, selected, tx);
        let ctrl_c = tokio::spawn(listen_for_ctrl_c(cancel));

        let mut finished: Option<RunSummary> = None;
        let mut recorded = 0usize;
        while let Some(event) = rx.recv().await {
            match event {
                RunEvent::Status(line) => debug!("状态: {}", line),
                RunEvent::Record(record) => {
                    recorded += 1;
                    debug!("进度 {} 条: {} → {}", recorded, record.worker_name, record.outcome);
                }
                RunEvent::Critical(message) => error!("🛑 运行中止: {}", message),
                RunEvent::Finished(summary) => finished = Some(summary),
            }
        }
        ctrl_c.abort();

        let (ledger, result) = handle.await.context("申报任务异常退出")?;
        let summary = finished.unwrap_or_default();

        let writer = ResultWriter::new(&self.config.output_dir);
        let file_name = ResultWriter::default_file_name(self.config.demand.panchayat.as_deref());
        let report_path = writer.write(&file_name, &ledger.snapshot())?;

        logging::print_final_stats(
            &summary,
            &self.config.output_log_file,
            Some(&report_path.display().to_string()),
        );

        result.map_err(AppError::from)?;
        Ok(())
    }

    /// 加载名册
    async fn load_roster(&self) -> Result<Roster> {
        info!("\n📁 正在读取名册: {}", self.config.roster_path);
        load_roster_csv(Path::new(&self.config.roster_path)).await
    }
}

async fn listen_for_ctrl_c(cancel: CancelFlag) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("⏹️ 收到 Ctrl-C，当前分组处理完后停止");
        cancel.cancel();
    }
}
