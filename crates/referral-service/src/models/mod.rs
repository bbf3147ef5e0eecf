//! 推荐码领域模型
//!
//! 包含推荐码系统的所有核心实体定义

pub mod code;
pub mod enums;
pub mod redemption;
pub mod user;

pub use code::{GeneralCode, PERSONAL_CODE_QUOTA, PersonalCode, PersonalCodeInsert};
pub use enums::CodeType;
pub use redemption::{RedeemOutcome, RedemptionRecord, RedemptionTarget};
pub use user::ReferralUser;
