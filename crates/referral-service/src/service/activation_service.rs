//! 推荐激活服务
//!
//! 处理用户提交推荐码激活推荐功能的完整流程：
//! - 前置检查（用户是否已激活）
//! - 码解析（通用码优先）
//! - 自兑换检查
//! - 原子兑换（用户标记、码标记、账本写入同一事务）
//! - 使用次数缓存版本号自增
//!
//! 业务拒绝在本层转换为 `ActivationResult { success: false }`，系统错误继续向上传播。

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use referral_shared::observability::metrics::record_activation;
use referral_shared::observability::tracing::mask_code;

use crate::error::{ReferralError, Result};
use crate::models::{CodeType, RedeemOutcome, RedemptionRecord, RedemptionTarget};
use crate::repository::{
    GeneralCodeRepositoryTrait, PersonalCodeRepositoryTrait, RedemptionLedgerRepositoryTrait,
    UserDirectory,
};
use crate::service::dto::ActivationResult;
use crate::service::resolver::{CodeResolver, ResolvedCode};
use crate::usage_cache::UsageCountCache;

/// 推荐激活服务
pub struct ActivationService<U, G, P, L>
where
    U: UserDirectory,
    G: GeneralCodeRepositoryTrait,
    P: PersonalCodeRepositoryTrait,
    L: RedemptionLedgerRepositoryTrait,
{
    users: Arc<U>,
    resolver: CodeResolver<G, P>,
    ledger_repo: Arc<L>,
    cache: Option<Arc<dyn UsageCountCache>>,
    allow_self_redemption: bool,
}

impl<U, G, P, L> ActivationService<U, G, P, L>
where
    U: UserDirectory,
    G: GeneralCodeRepositoryTrait,
    P: PersonalCodeRepositoryTrait,
    L: RedemptionLedgerRepositoryTrait,
{
    pub fn new(
        users: Arc<U>,
        resolver: CodeResolver<G, P>,
        ledger_repo: Arc<L>,
        cache: Option<Arc<dyn UsageCountCache>>,
        allow_self_redemption: bool,
    ) -> Self {
        Self {
            users,
            resolver,
            ledger_repo,
            cache,
            allow_self_redemption,
        }
    }

    /// 使用推荐码激活用户的推荐功能
    ///
    /// 流程：
    /// 1. 查询用户，已激活则拒绝
    /// 2. 解析码文本，无效则拒绝
    /// 3. 个人码归属本人时按配置拒绝
    /// 4. 单事务原子兑换，条件更新失败转换为对应拒绝
    /// 5. 通用码兑换提交后自增使用次数缓存的版本号
    #[instrument(skip(self, code_text), fields(user_id = %user_id, code = %mask_code(code_text)))]
    pub async fn resolve_and_activate(
        &self,
        user_id: Uuid,
        code_text: &str,
    ) -> Result<ActivationResult> {
        let started = Instant::now();
        let outcome = self.try_activate(user_id, code_text).await;
        let elapsed = started.elapsed().as_secs_f64();

        match outcome {
            Ok(record) => {
                record_activation(record.code_type.as_str(), "activated", elapsed);
                info!(
                    user_id = %user_id,
                    code_type = %record.code_type,
                    redemption_id = %record.id,
                    "推荐激活成功"
                );
                Ok(ActivationResult::activated(record.code_type))
            }
            Err(e) => match ActivationResult::from_rejection(&e) {
                Some(result) => {
                    record_activation(rejection_kind(&e), e.error_code(), elapsed);
                    info!(user_id = %user_id, reason = e.error_code(), "推荐激活被拒绝");
                    Ok(result)
                }
                None => {
                    record_activation("none", "error", elapsed);
                    error!(
                        user_id = %user_id,
                        code = %mask_code(code_text),
                        error = %e,
                        "推荐激活失败"
                    );
                    Err(e)
                }
            },
        }
    }

    /// 查询用户的兑换记录
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_user_redemptions(&self, user_id: Uuid) -> Result<Vec<RedemptionRecord>> {
        self.ledger_repo.list_by_user(user_id).await
    }

    async fn try_activate(&self, user_id: Uuid, code_text: &str) -> Result<RedemptionRecord> {
        // 1. 前置检查
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or(ReferralError::UserNotFound(user_id))?;

        if user.is_referral_activated {
            return Err(ReferralError::AlreadyActivated(user_id));
        }

        // 2. 解析
        let target = match self.resolver.resolve(code_text).await? {
            ResolvedCode::Invalid => return Err(ReferralError::InvalidCode),
            ResolvedCode::General(general) => RedemptionTarget::General(general.id),
            ResolvedCode::Personal(personal) => {
                // 3. 自兑换
                if personal.is_owned_by(user_id) && !self.allow_self_redemption {
                    return Err(ReferralError::SelfRedemption(user_id));
                }
                RedemptionTarget::Personal(personal.id)
            }
        };

        // 4. 原子兑换
        let record = match self.ledger_repo.redeem(user_id, target).await? {
            RedeemOutcome::Redeemed(record) => record,
            RedeemOutcome::UserAlreadyActivated => {
                return Err(ReferralError::AlreadyActivated(user_id));
            }
            RedeemOutcome::CodeAlreadyUsed => return Err(ReferralError::CodeAlreadyUsed),
        };

        // 5. 缓存失效
        if let RedemptionTarget::General(code_id) = target {
            self.invalidate_usage_count(code_id).await;
        }

        Ok(record)
    }

    /// 失效通用码使用次数缓存，失败只记录警告
    ///
    /// 必须在账本提交之后调用；并发读者写入的旧计数落在旧版本键上
    async fn invalidate_usage_count(&self, code_id: Uuid) {
        let Some(cache) = &self.cache else {
            return;
        };

        if let Err(e) = cache.bump_version(code_id).await {
            warn!(code_id = %code_id, error = %e, "Cache invalidation failed");
        }
    }
}

/// 拒绝指标中的码类型标签
fn rejection_kind(err: &ReferralError) -> &'static str {
    match err {
        ReferralError::CodeAlreadyUsed | ReferralError::SelfRedemption(_) => {
            CodeType::Personal.as_str()
        }
        _ => "none",
    }
}
