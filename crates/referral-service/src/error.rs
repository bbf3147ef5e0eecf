//! 推荐码服务错误类型
//!
//! 定义服务层的业务错误和系统错误。业务拒绝（资格、无效码、重复激活、被抢先兑换）
//! 在服务边界被转换为 `{success: false, message}` 结果，系统错误向调用方传播。

use referral_shared::error::SharedError;
use thiserror::Error;
use uuid::Uuid;

/// 推荐码服务错误类型
#[derive(Debug, Error)]
pub enum ReferralError {
    // === 业务拒绝 ===
    #[error("用户尚未激活推荐，不能领取个人码: user_id={0}")]
    NotEligible(Uuid),

    #[error("推荐码无效")]
    InvalidCode,

    #[error("用户已激活推荐: user_id={0}")]
    AlreadyActivated(Uuid),

    #[error("推荐码已被使用")]
    CodeAlreadyUsed,

    #[error("不能兑换自己的个人码: user_id={0}")]
    SelfRedemption(Uuid),

    // === 查询与管理 ===
    #[error("用户不存在: {0}")]
    UserNotFound(Uuid),

    #[error("通用码不存在: {0}")]
    GeneralCodeNotFound(String),

    #[error("通用码已存在: {0}")]
    DuplicateGeneralCode(String),

    #[error("参数校验失败: {0}")]
    Validation(String),

    // === 生成错误 ===
    #[error("推荐码空间耗尽: 连续 {attempts} 次生成均冲突")]
    CodeSpaceExhausted { attempts: u32 },

    #[error("随机数源不可用: {0}")]
    RandomnessUnavailable(String),

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("缓存错误: {0}")]
    Cache(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 推荐码服务 Result 类型别名
pub type Result<T> = std::result::Result<T, ReferralError>;

impl From<SharedError> for ReferralError {
    fn from(err: SharedError) -> Self {
        match err {
            SharedError::Database(e) => Self::Persistence(e),
            SharedError::Redis(e) => Self::Cache(e.to_string()),
            SharedError::Serialization(e) => Self::Cache(e.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl ReferralError {
    /// 是否为可恢复的业务拒绝
    ///
    /// 这些结果在服务边界转换为 `{success: false, message}`，不作为异常传播
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::NotEligible(_)
                | Self::InvalidCode
                | Self::AlreadyActivated(_)
                | Self::CodeAlreadyUsed
                | Self::SelfRedemption(_)
        )
    }

    /// 面向用户的拒绝文案，非业务拒绝返回 None
    pub fn rejection_message(&self) -> Option<&'static str> {
        match self {
            Self::NotEligible(_) => Some("User has not activated referral feature"),
            Self::InvalidCode => Some("Referral code is invalid"),
            Self::AlreadyActivated(_) => Some("User has already activated referral code"),
            Self::CodeAlreadyUsed => Some("Referral code already activated"),
            Self::SelfRedemption(_) => Some("Cannot redeem your own referral code"),
            _ => None,
        }
    }

    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Cache(_))
    }

    /// 获取错误码（用于调用方映射响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotEligible(_) => "NOT_ELIGIBLE",
            Self::InvalidCode => "INVALID_CODE",
            Self::AlreadyActivated(_) => "ALREADY_ACTIVATED",
            Self::CodeAlreadyUsed => "CODE_ALREADY_USED",
            Self::SelfRedemption(_) => "SELF_REDEMPTION",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::GeneralCodeNotFound(_) => "GENERAL_CODE_NOT_FOUND",
            Self::DuplicateGeneralCode(_) => "DUPLICATE_GENERAL_CODE",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::CodeSpaceExhausted { .. } => "CODE_SPACE_EXHAUSTED",
            Self::RandomnessUnavailable(_) => "RANDOMNESS_UNAVAILABLE",
            Self::Persistence(_) => "PERSISTENCE_FAILURE",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
