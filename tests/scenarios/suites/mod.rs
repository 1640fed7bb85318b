//! 场景测试套件

pub mod campaign;
pub mod interaction;
pub mod ledger;
pub mod recycling;
pub mod redemption;
