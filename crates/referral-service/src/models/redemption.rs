//! 兑换账本实体定义
//!
//! 账本只追加、不更新、不删除，是通用码使用次数的唯一来源

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::CodeType;

/// 兑换记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionRecord {
    pub id: Uuid,
    pub redeemed_by_user_id: Uuid,
    pub code_type: CodeType,
    /// 按 code_type 指向通用码或个人码
    pub code_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl RedemptionRecord {
    pub fn new(redeemed_by_user_id: Uuid, target: RedemptionTarget) -> Self {
        Self {
            id: Uuid::now_v7(),
            redeemed_by_user_id,
            code_type: target.code_type(),
            code_id: Some(target.code_id()),
            created_at: Utc::now(),
        }
    }
}

/// 兑换目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedemptionTarget {
    General(Uuid),
    Personal(Uuid),
}

impl RedemptionTarget {
    pub fn code_type(&self) -> CodeType {
        match self {
            Self::General(_) => CodeType::General,
            Self::Personal(_) => CodeType::Personal,
        }
    }

    pub fn code_id(&self) -> Uuid {
        match self {
            Self::General(id) | Self::Personal(id) => *id,
        }
    }
}

/// 原子兑换结果
///
/// 条件更新影响 0 行时返回对应的前置条件失败，而不是静默成功
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedeemOutcome {
    /// 用户标记、码标记与账本写入已在同一事务中提交
    Redeemed(RedemptionRecord),
    /// 用户已被其他请求激活
    UserAlreadyActivated,
    /// 个人码已被其他用户抢先兑换
    CodeAlreadyUsed,
}
