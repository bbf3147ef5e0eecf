//! 推荐码实体定义
//!
//! 通用码与个人码是两个相互独立的码空间，码文本均按大小写不敏感比较

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 每个用户最多持有的个人码数量
pub const PERSONAL_CODE_QUOTA: usize = 5;

/// 通用推荐码
///
/// 由管理员发放，可被不同用户无限次兑换。使用次数由账本聚合得出，不落库
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GeneralCode {
    pub id: Uuid,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 个人推荐码
///
/// 归属唯一用户，生成后不会重新生成或删除；`is_activated` 只翻转一次
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PersonalCode {
    pub id: Uuid,
    pub owner_user_id: Uuid,
    pub code: String,
    pub is_activated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PersonalCode {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_user_id == user_id
    }
}

/// 个人码写入结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonalCodeInsert {
    /// 写入成功
    Inserted(PersonalCode),
    /// 码文本已被占用（唯一索引冲突），调用方应重新生成
    CodeTaken,
    /// 用户名下个人码已满额（并发补发已完成）
    QuotaFull,
}
