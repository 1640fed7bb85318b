//! 配置管理模块
//!
//! 支持多文件分层加载、环境变量覆盖，以及类型安全的配置访问。

use chrono::FixedOffset;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub use crate::observability::ObservabilityConfig;
pub use crate::retry::RetryPolicy;

/// 积分过期策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpirationPolicyKind {
    /// 锚点日期 + N 个月
    RollingMonths,
    /// 锚点次年的 12 月 31 日
    FixedYearEnd,
    /// 首单周年日，且距锚点不少于 N 个月
    FirstOrderAnniversary,
}

impl ExpirationPolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RollingMonths => "ROLLING_MONTHS",
            Self::FixedYearEnd => "FIXED_YEAR_END",
            Self::FirstOrderAnniversary => "FIRST_ORDER_ANNIVERSARY",
        }
    }
}

/// 单个市场的业务参数
#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    /// IANA 时区名，仅用于展示
    pub timezone: String,
    /// 相对 UTC 的固定偏移（小时），三个市场均无夏令时
    pub utc_offset_hours: i32,
    pub expiration_policy: ExpirationPolicyKind,
    pub expiration_months: u32,
    /// 每个自然年允许回收的件数上限
    pub recycle_yearly_limit: u32,
    pub recycle_points_per_item: i64,
}

impl MarketConfig {
    /// 内置市场默认值
    pub fn builtin() -> Vec<(&'static str, MarketConfig)> {
        vec![
            (
                "JP",
                MarketConfig {
                    timezone: "Asia/Tokyo".to_string(),
                    utc_offset_hours: 9,
                    expiration_policy: ExpirationPolicyKind::RollingMonths,
                    expiration_months: 12,
                    recycle_yearly_limit: 12,
                    recycle_points_per_item: 50,
                },
            ),
            (
                "HK",
                MarketConfig {
                    timezone: "Asia/Hong_Kong".to_string(),
                    utc_offset_hours: 8,
                    expiration_policy: ExpirationPolicyKind::FixedYearEnd,
                    expiration_months: 12,
                    recycle_yearly_limit: 10,
                    recycle_points_per_item: 30,
                },
            ),
            (
                "TW",
                MarketConfig {
                    timezone: "Asia/Taipei".to_string(),
                    utc_offset_hours: 8,
                    expiration_policy: ExpirationPolicyKind::FirstOrderAnniversary,
                    expiration_months: 24,
                    recycle_yearly_limit: 10,
                    recycle_points_per_item: 20,
                },
            ),
        ]
    }

    pub fn utc_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
    }
}

/// 引擎数据源配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 分类规则文件所在目录
    pub rules_dir: PathBuf,
    pub campaigns_file: PathBuf,
    /// CLI 使用的种子消费者档案
    pub consumers_file: PathBuf,
    /// 是否记录逐条件评估追踪
    pub trace_rules: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rules_dir: PathBuf::from("data/rules"),
            campaigns_file: PathBuf::from("data/campaigns.json"),
            consumers_file: PathBuf::from("data/consumers.json"),
            trace_rules: false,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub observability: ObservabilityConfig,
    pub engine: EngineConfig,
    /// 账本版本冲突的重试策略
    pub retry: RetryPolicy,
    /// 市场代码（大写）-> 市场参数
    pub markets: HashMap<String, MarketConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "points-engine".to_string(),
            environment: "development".to_string(),
            observability: ObservabilityConfig::default(),
            engine: EngineConfig::default(),
            retry: RetryPolicy::default(),
            markets: MarketConfig::builtin()
                .into_iter()
                .map(|(code, market)| (code.to_string(), market))
                .collect(),
        }
    }
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. 内置默认值（含 JP / HK / TW 市场参数）
    /// 2. config/default.toml
    /// 3. config/{environment}.toml
    /// 4. config/{service_name}.toml
    /// 5. 环境变量（LOYALTY_ 前缀，`__` 分隔层级，如
    ///    LOYALTY_ENGINE__RULES_DIR -> engine.rules_dir）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
        Self::load_from(service_name, Path::new(&config_dir))
    }

    /// 从指定目录加载配置
    pub fn load_from(service_name: &str, config_dir: &Path) -> Result<Self, ConfigError> {
        let env = std::env::var("LOYALTY_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .set_default("observability.service_name", service_name)?;

        let builder = Self::market_defaults(builder)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", env))).required(false))
            .add_source(
                File::from(config_dir.join(format!("{}.toml", service_name))).required(false),
            )
            .add_source(
                Environment::with_prefix("LOYALTY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut config: Self = builder.build()?.try_deserialize()?;
        config.markets = config
            .markets
            .into_iter()
            .map(|(code, market)| (code.to_ascii_uppercase(), market))
            .collect();

        Ok(config)
    }

    /// 以小写键写入市场默认值，与环境变量解析出的键保持一致
    fn market_defaults(
        mut builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        for (code, market) in MarketConfig::builtin() {
            let prefix = format!("markets.{}", code.to_ascii_lowercase());
            builder = builder
                .set_default(format!("{prefix}.timezone"), market.timezone)?
                .set_default(
                    format!("{prefix}.utc_offset_hours"),
                    i64::from(market.utc_offset_hours),
                )?
                .set_default(
                    format!("{prefix}.expiration_policy"),
                    market.expiration_policy.as_str(),
                )?
                .set_default(
                    format!("{prefix}.expiration_months"),
                    i64::from(market.expiration_months),
                )?
                .set_default(
                    format!("{prefix}.recycle_yearly_limit"),
                    i64::from(market.recycle_yearly_limit),
                )?
                .set_default(
                    format!("{prefix}.recycle_points_per_item"),
                    market.recycle_points_per_item,
                )?;
        }
        Ok(builder)
    }

    /// 查找市场参数（市场代码大小写不敏感）
    pub fn market(&self, code: &str) -> Option<&MarketConfig> {
        self.markets.get(&code.to_ascii_uppercase())
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
