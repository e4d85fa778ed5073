//! # Easy Apply Bot
//!
//! 自动化投递"快速申请"职位的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露 DOM 能力
//! - `Session` - 唯一的 page owner，实现 `Dom` trait
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，互不知晓流程
//! - `Locator` - 弹性元素定位能力
//! - `JobFilter` - 标题 / 描述过滤能力
//! - `AutofillKb` - 自动填充知识库 load/merge/save 能力
//! - `dialog` - 意外弹窗处理能力
//! - `listings` - 职位列表读取能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一份申请"的完整处理流程
//! - `JobCtx` - 上下文封装（页码 + 职位序号）
//! - `ApplicationWizard` - 多步申请向导状态机
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/pager` - 搜索结果逐页编排，协作式取消
//! - `App` - 装配配置、浏览器与统计
//!
//! ## 模块结构

pub mod app;
pub mod browser;
pub mod config;
pub mod dom;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use config::{BrowserSettings, Config, Pace};
pub use dom::{Dom, DomElement, Query};
pub use error::{AppError, AppResult};
pub use infrastructure::Session;
pub use models::autofill::AutofillDocument;
pub use models::filters::FilterConfig;
pub use models::listing::JobListing;
pub use orchestrator::pager::RunStats;
pub use services::autofill_kb::AutofillKb;
pub use services::job_filter::{JobFilter, SkipReason};
pub use services::locator::Locator;
pub use workflow::job_ctx::JobCtx;
pub use workflow::wizard::{ApplicationWizard, FailureReason, WizardOutcome};
