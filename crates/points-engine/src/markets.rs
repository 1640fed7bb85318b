//! 市场参数
//!
//! 把配置中的市场段解析为带固定时区偏移的运行时参数。

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use loyalty_shared::{AppConfig, ExpirationPolicyKind, MarketConfig};
use std::collections::HashMap;

use crate::error::{PointsError, Result};

/// 单个市场的运行时参数
#[derive(Debug, Clone)]
pub struct MarketProfile {
    pub code: String,
    pub timezone: String,
    pub offset: FixedOffset,
    pub expiration_policy: ExpirationPolicyKind,
    pub expiration_months: u32,
    pub recycle_yearly_limit: u32,
    pub recycle_points_per_item: i64,
}

impl MarketProfile {
    pub fn from_config(code: &str, config: &MarketConfig) -> Result<Self> {
        let offset = config.utc_offset().ok_or_else(|| {
            PointsError::Config(format!(
                "市场 {} 的 utc_offset_hours 非法: {}",
                code, config.utc_offset_hours
            ))
        })?;

        Ok(Self {
            code: code.to_ascii_uppercase(),
            timezone: config.timezone.clone(),
            offset,
            expiration_policy: config.expiration_policy,
            expiration_months: config.expiration_months,
            recycle_yearly_limit: config.recycle_yearly_limit,
            recycle_points_per_item: config.recycle_points_per_item,
        })
    }

    /// UTC 时间对应的市场本地日期
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }
}

/// 市场注册表
#[derive(Debug, Clone, Default)]
pub struct MarketRegistry {
    markets: HashMap<String, MarketProfile>,
}

impl MarketRegistry {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut markets = HashMap::with_capacity(config.markets.len());
        for (code, market) in &config.markets {
            let profile = MarketProfile::from_config(code, market)?;
            markets.insert(profile.code.clone(), profile);
        }
        Ok(Self { markets })
    }

    /// 内置 JP / HK / TW 参数
    pub fn builtin() -> Result<Self> {
        Self::from_config(&AppConfig::default())
    }

    pub fn get(&self, code: &str) -> Option<&MarketProfile> {
        self.markets.get(&code.to_ascii_uppercase())
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }
}
