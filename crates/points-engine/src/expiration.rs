//! 积分过期策略
//!
//! 纯函数：相同的 (市场, 最后下单日, 首次下单日, 注册日) 总是得到相同的过期日。

use chrono::{Datelike, Months, NaiveDate};
use loyalty_shared::ExpirationPolicyKind;

use crate::markets::MarketProfile;
use crate::models::{Balance, ExpirationDetail, TransactionRecord};

/// 没有任何锚点日期时的规则名
pub const NO_EXPIRATION: &str = "NO_EXPIRATION";

/// 过期计算的输入
#[derive(Debug, Clone, Copy)]
pub struct ExpirationInput<'a> {
    pub history: &'a [TransactionRecord],
    pub balance: Balance,
    pub last_order_date: Option<NaiveDate>,
    pub first_order_date: Option<NaiveDate>,
    pub registration_date: Option<NaiveDate>,
}

/// 计算下一个过期日
///
/// 未显式给出的下单日期从流水中最新 / 最早的 PURCHASE 推出（市场本地日期）。
pub fn expiration_details(market: &MarketProfile, input: ExpirationInput<'_>) -> ExpirationDetail {
    let purchase_dates = || {
        input
            .history
            .iter()
            .filter(|t| t.event_type == crate::models::EventType::Purchase)
            .map(|t| market.local_date(t.timestamp))
    };
    let last_order = input.last_order_date.or_else(|| purchase_dates().max());
    let first_order = input.first_order_date.or_else(|| purchase_dates().min());

    let anchor = last_order.or(input.registration_date);
    let (next_expiration, rule) = match anchor {
        None => (None, NO_EXPIRATION.to_string()),
        Some(anchor) => {
            let months = market.expiration_months;
            match market.expiration_policy {
                ExpirationPolicyKind::RollingMonths => (
                    rolling(anchor, months),
                    format!("ROLLING_{}_MONTHS", months),
                ),
                ExpirationPolicyKind::FixedYearEnd => {
                    (year_end_after(anchor), "FIXED_YEAR_END".to_string())
                }
                ExpirationPolicyKind::FirstOrderAnniversary => match first_order {
                    Some(first) => (
                        anniversary_after(first, anchor, months),
                        format!("FIRST_ORDER_ANNIVERSARY_{}_MONTHS", months),
                    ),
                    None => (
                        rolling(anchor, months),
                        format!("ROLLING_{}_MONTHS", months),
                    ),
                },
            }
        }
    };

    ExpirationDetail {
        next_expiration,
        expiration_rule: rule,
        timezone: market.timezone.clone(),
        expiring_points: input.balance.available,
    }
}

fn rolling(anchor: NaiveDate, months: u32) -> Option<NaiveDate> {
    anchor.checked_add_months(Months::new(months))
}

/// 锚点次年的 12 月 31 日
fn year_end_after(anchor: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(anchor.year() + 1, 12, 31)
}

/// 首单周年日中第一个不早于 anchor + N 个月的日期
fn anniversary_after(first: NaiveDate, anchor: NaiveDate, months: u32) -> Option<NaiveDate> {
    let earliest = rolling(anchor, months)?;
    let mut year = earliest.year();
    loop {
        let candidate = anniversary_in(first, year)?;
        if candidate >= earliest {
            return Some(candidate);
        }
        year += 1;
    }
}

/// 2 月 29 日在平年取 2 月 28 日
fn anniversary_in(first: NaiveDate, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, first.month(), first.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, first.month(), first.day() - 1))
}
