use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, AppResult, ConfigError};

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 浏览器调试端口（附加模式）
    pub browser_debug_port: u16,
    /// 是否附加到已运行的浏览器（否则自行启动）
    pub attach_existing: bool,
    /// 职位搜索页 URL（过滤配置的透传字段会在此基础上追加参数）
    pub target_url: String,
    /// 自动填充知识库文档路径
    pub autofill_path: String,
    /// 过滤配置文档路径
    pub filters_path: String,
    /// 浏览器设置文档路径
    pub browser_settings_path: String,
    /// 浏览器用户数据目录
    pub profile_dir: String,
    /// 向导单次申请的最大步数
    pub step_limit: usize,
    /// 定位轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 短暂停（毫秒）
    pub short_delay_ms: u64,
    /// 页面动作后的沉降等待（毫秒）
    pub settle_delay_ms: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_port: 9222,
            attach_existing: false,
            target_url: "https://www.linkedin.com/jobs/search/?".to_string(),
            autofill_path: "DB/form_autofill.json".to_string(),
            filters_path: "DB/user_filters.json".to_string(),
            browser_settings_path: "DB/browser_settings.json".to_string(),
            profile_dir: "chrome_profile".to_string(),
            step_limit: 10,
            poll_interval_ms: 250,
            short_delay_ms: 500,
            settle_delay_ms: 2000,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.browser_debug_port),
            attach_existing: std::env::var("ATTACH_EXISTING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.attach_existing),
            target_url: std::env::var("TARGET_URL").unwrap_or(default.target_url),
            autofill_path: std::env::var("AUTOFILL_PATH").unwrap_or(default.autofill_path),
            filters_path: std::env::var("FILTERS_PATH").unwrap_or(default.filters_path),
            browser_settings_path: std::env::var("BROWSER_SETTINGS_PATH").unwrap_or(default.browser_settings_path),
            profile_dir: std::env::var("PROFILE_DIR").unwrap_or(default.profile_dir),
            step_limit: std::env::var("STEP_LIMIT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.step_limit),
            poll_interval_ms: std::env::var("POLL_INTERVAL_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.poll_interval_ms),
            short_delay_ms: std::env::var("SHORT_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.short_delay_ms),
            settle_delay_ms: std::env::var("SETTLE_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.settle_delay_ms),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
        }
    }
}

/// 固定节奏的等待间隔集合
///
/// 所有等待都是有界轮询加固定短睡眠，没有任何无限阻塞。
#[derive(Clone, Debug)]
pub struct Pace {
    /// 定位轮询间隔
    pub poll: Duration,
    /// 短暂停（点击前后的小间隙）
    pub short: Duration,
    /// 页面动作后的沉降等待
    pub settle: Duration,
}

impl Pace {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll: Duration::from_millis(config.poll_interval_ms),
            short: Duration::from_millis(config.short_delay_ms),
            settle: Duration::from_millis(config.settle_delay_ms),
        }
    }

    /// 全部归零（测试用）
    pub fn instant() -> Self {
        Self {
            poll: Duration::ZERO,
            short: Duration::ZERO,
            settle: Duration::ZERO,
        }
    }
}

/// 浏览器设置（桌面配置界面维护的 browser_settings.json）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrowserSettings {
    #[serde(default)]
    pub executable_path: String,
}

impl BrowserSettings {
    /// 从设置文档加载并校验可执行文件路径
    pub fn load(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path, e))?;
        let settings: Self = serde_json::from_str(&content)
            .map_err(|e| AppError::json_parse_failed(path, e))?;
        if !std::path::Path::new(&settings.executable_path).exists() {
            return Err(AppError::Config(ConfigError::ExecutableNotFound {
                path: settings.executable_path,
            }));
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let config = Config::default();
        assert_eq!(config.step_limit, 10);
        assert!(config.poll_interval_ms < config.settle_delay_ms);
        assert!(config.autofill_path.ends_with("form_autofill.json"));
    }

    #[test]
    fn instant_pace_is_zero() {
        let pace = Pace::instant();
        assert!(pace.poll.is_zero() && pace.short.is_zero() && pace.settle.is_zero());
    }
}
