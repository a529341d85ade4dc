use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::str::FromStr;

use crate::error::{AppError, AppResult, ConfigError, FileError};
use crate::models::{parse_demand_date, SubUnitKeyRule};

/// 默认配置文件名（可用 `DEMAND_CONFIG` 覆盖）
pub const DEFAULT_CONFIG_FILE: &str = "demand_config.toml";

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 申报入口页面
    pub target_url: String,
    /// 是否自行启动无头浏览器（否则连接已登录的浏览器）
    pub headless: bool,
    /// 无头模式使用的浏览器可执行文件
    pub chrome_executable: Option<String>,
    /// 名册 CSV
    pub roster_path: String,
    /// 结果导出目录
    pub output_dir: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 单次驱动调用的超时（秒）
    pub call_timeout_secs: u64,
    /// 提交后等待响应的时间（秒）
    pub response_wait_secs: u64,
    /// 申报参数
    pub demand: DemandSettings,
}

/// 申报参数
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DemandSettings {
    /// 每个分组每财年的天数上限
    pub day_cap_per_group: u32,
    /// 每人申请天数
    pub requested_days_per_worker: u32,
    /// 子单元键推导规则
    pub sub_unit_key_rule: SubUnitKeyRule,
    /// 申报起始日期，不填则用当天
    #[serde(deserialize_with = "deserialize_demand_date")]
    pub demand_date_override: Option<NaiveDate>,
    /// 乡镇名称；乡镇级登录时不需要
    pub panchayat: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_port: 9222,
            target_url: "https://nregade4.nic.in/Netnrega/demand_new.aspx".to_string(),
            headless: false,
            chrome_executable: None,
            roster_path: "applicants.csv".to_string(),
            output_dir: "demand_reports".to_string(),
            verbose_logging: false,
            output_log_file: "demand_log.txt".to_string(),
            call_timeout_secs: 20,
            response_wait_secs: 5,
            demand: DemandSettings::default(),
        }
    }
}

impl Default for DemandSettings {
    fn default() -> Self {
        Self {
            day_cap_per_group: 100,
            requested_days_per_worker: 14,
            sub_unit_key_rule: SubUnitKeyRule::default(),
            demand_date_override: None,
            panchayat: None,
        }
    }
}

impl DemandSettings {
    /// 申报起始日期
    pub fn demand_date(&self) -> NaiveDate {
        self.demand_date_override
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

impl Config {
    /// 默认值 → 配置文件（如果存在） → 环境变量，后者覆盖前者
    pub fn load() -> AppResult<Self> {
        let file = std::env::var("DEMAND_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let base = if Path::new(&file).exists() {
            Self::from_file(Path::new(&file))?
        } else {
            Self::default()
        };

        let config = base.with_env()?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    pub fn from_toml_str(content: &str, source_name: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| {
            AppError::File(FileError::TomlParseFailed {
                path: source_name.to_string(),
                source: e,
            })
        })
    }

    /// 用环境变量覆盖
    pub fn with_env(mut self) -> Result<Self, ConfigError> {
        if let Some(v) = env_parse("BROWSER_DEBUG_PORT")? {
            self.browser_debug_port = v;
        }
        if let Ok(v) = std::env::var("TARGET_URL") {
            self.target_url = v;
        }
        if let Some(v) = env_parse("HEADLESS")? {
            self.headless = v;
        }
        if let Ok(v) = std::env::var("CHROME_EXECUTABLE") {
            self.chrome_executable = Some(v);
        }
        if let Ok(v) = std::env::var("ROSTER_PATH") {
            self.roster_path = v;
        }
        if let Ok(v) = std::env::var("OUTPUT_DIR") {
            self.output_dir = v;
        }
        if let Some(v) = env_parse("VERBOSE_LOGGING")? {
            self.verbose_logging = v;
        }
        if let Ok(v) = std::env::var("OUTPUT_LOG_FILE") {
            self.output_log_file = v;
        }
        if let Some(v) = env_parse("CALL_TIMEOUT_SECS")? {
            self.call_timeout_secs = v;
        }
        if let Some(v) = env_parse("RESPONSE_WAIT_SECS")? {
            self.response_wait_secs = v;
        }
        if let Some(v) = env_parse("DAY_CAP_PER_GROUP")? {
            self.demand.day_cap_per_group = v;
        }
        if let Some(v) = env_parse("REQUESTED_DAYS_PER_WORKER")? {
            self.demand.requested_days_per_worker = v;
        }
        if let Some(n) = env_parse("SUB_UNIT_SUFFIX_LENGTH")? {
            self.demand.sub_unit_key_rule = SubUnitKeyRule::FixedSuffixLength { n };
        }
        if let Ok(v) = std::env::var("DEMAND_DATE") {
            let date = parse_demand_date(&v).ok_or_else(|| ConfigError::EnvVarParseFailed {
                var_name: "DEMAND_DATE".to_string(),
                value: v.clone(),
                expected_type: "日期 (DD/MM/YYYY)".to_string(),
            })?;
            self.demand.demand_date_override = Some(date);
        }
        if let Ok(v) = std::env::var("PANCHAYAT") {
            let v = v.trim().to_string();
            self.demand.panchayat = if v.is_empty() { None } else { Some(v) };
        }
        Ok(self)
    }

    /// 校验取值范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        let demand = &self.demand;
        if demand.day_cap_per_group == 0 {
            return Err(ConfigError::InvalidValue {
                field: "day_cap_per_group".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        if demand.requested_days_per_worker == 0
            || demand.requested_days_per_worker > demand.day_cap_per_group
        {
            return Err(ConfigError::InvalidValue {
                field: "requested_days_per_worker".to_string(),
                reason: format!("必须在 1..={} 之间", demand.day_cap_per_group),
            });
        }
        if let SubUnitKeyRule::FixedSuffixLength { n: 0 } = demand.sub_unit_key_rule {
            return Err(ConfigError::InvalidValue {
                field: "sub_unit_key_rule.n".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        if self.call_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "call_timeout_secs".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        Ok(())
    }
}

fn env_parse<T: FromStr>(var_name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            }),
        Err(_) => Ok(None),
    }
}

// 日期既可以写成 DD/MM/YYYY，也可以写成 YYYY-MM-DD
fn deserialize_demand_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let text: Option<String> = Option::deserialize(deserializer)?;
    match text {
        None => Ok(None),
        Some(text) if text.trim().is_empty() => Ok(None),
        Some(text) => parse_demand_date(&text)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("无法解析日期: {}", text))),
    }
}
