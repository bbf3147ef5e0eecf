//! 推荐码枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化

use serde::{Deserialize, Serialize};

/// 推荐码类型
///
/// 区分管理员发放的通用码与用户名下的个人码，账本据此解释 code_id 的指向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum CodeType {
    /// 通用码 - 不限次数
    General,
    /// 个人码 - 仅可兑换一次
    Personal,
}

impl CodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Personal => "personal",
        }
    }
}

impl std::fmt::Display for CodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
