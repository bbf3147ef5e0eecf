//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于服务层依赖抽象而非具体实现，支持 mock 测试

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    GeneralCode, PersonalCode, PersonalCodeInsert, RedeemOutcome, RedemptionRecord,
    RedemptionTarget, ReferralUser,
};

/// 用户目录接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<ReferralUser>>;
}

/// 通用码仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GeneralCodeRepositoryTrait: Send + Sync {
    /// 按码文本查询（大小写不敏感）
    async fn find_by_code(&self, code: &str) -> Result<Option<GeneralCode>>;
    async fn exists_by_code(&self, code: &str) -> Result<bool>;
    async fn get(&self, id: Uuid) -> Result<Option<GeneralCode>>;

    // 管理操作
    async fn create(&self, code: &str) -> Result<GeneralCode>;
    async fn update_code(&self, id: Uuid, code: &str) -> Result<Option<GeneralCode>>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<GeneralCode>>;
    async fn count(&self) -> Result<i64>;
}

/// 个人码仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PersonalCodeRepositoryTrait: Send + Sync {
    /// 按码文本查询尚未激活的个人码（大小写不敏感）
    async fn find_redeemable_by_code(&self, code: &str) -> Result<Option<PersonalCode>>;
    /// 码文本是否已存在（不论是否激活、归属何人）
    async fn exists_by_code(&self, code: &str) -> Result<bool>;
    /// 按创建时间升序列出用户名下的个人码
    async fn list_by_owner(&self, owner_user_id: Uuid) -> Result<Vec<PersonalCode>>;
    /// 在额度内为用户写入一个新码，码文本冲突或额度已满时不写入
    async fn insert_for_owner(
        &self,
        owner_user_id: Uuid,
        code: &str,
        quota: usize,
    ) -> Result<PersonalCodeInsert>;
}

/// 兑换账本仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RedemptionLedgerRepositoryTrait: Send + Sync {
    /// 通用码被兑换的次数
    async fn count_general_usage(&self, general_code_id: Uuid) -> Result<i64>;
    /// 用户的兑换记录，按时间升序
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<RedemptionRecord>>;
    /// 原子兑换：翻转用户激活标记、（个人码时）翻转码激活标记并追加账本记录
    async fn redeem(&self, user_id: Uuid, target: RedemptionTarget) -> Result<RedeemOutcome>;
}
