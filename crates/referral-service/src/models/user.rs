//! 用户目录中的推荐相关视图

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 推荐用户
///
/// 用户实体由外部用户目录持有，这里只读取推荐激活开关。
/// `is_referral_activated` 只会从 false 翻转为 true，且只翻转一次。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReferralUser {
    pub id: Uuid,
    pub is_referral_activated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReferralUser {
    /// 是否可以领取自己的个人码（自己必须先被推荐激活）
    pub fn is_eligible_for_codes(&self) -> bool {
        self.is_referral_activated
    }
}
