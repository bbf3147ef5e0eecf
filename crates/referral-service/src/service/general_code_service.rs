//! 通用码服务
//!
//! 提供通用码的有效性检查、使用次数查询以及管理操作。
//! 使用次数始终由账本聚合得出；配置了缓存时按版本号读穿缓存，兑换提交后自增版本号。

use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use referral_shared::observability::tracing::mask_code;

use crate::error::{ReferralError, Result};
use crate::models::GeneralCode;
use crate::repository::{
    GeneralCodeRepositoryTrait, PersonalCodeRepositoryTrait, RedemptionLedgerRepositoryTrait,
};
use crate::service::dto::{GeneralCodePage, GeneralCodeSummary};
use crate::usage_cache::UsageCountCache;

/// 通用码文本最大长度
pub const MAX_GENERAL_CODE_LENGTH: usize = 64;

/// 分页大小上限
const MAX_PAGE_SIZE: i64 = 100;

/// 通用码服务
pub struct GeneralCodeService<G, P, L>
where
    G: GeneralCodeRepositoryTrait,
    P: PersonalCodeRepositoryTrait,
    L: RedemptionLedgerRepositoryTrait,
{
    general_repo: Arc<G>,
    personal_repo: Arc<P>,
    ledger_repo: Arc<L>,
    cache: Option<Arc<dyn UsageCountCache>>,
}

impl<G, P, L> GeneralCodeService<G, P, L>
where
    G: GeneralCodeRepositoryTrait,
    P: PersonalCodeRepositoryTrait,
    L: RedemptionLedgerRepositoryTrait,
{
    pub fn new(
        general_repo: Arc<G>,
        personal_repo: Arc<P>,
        ledger_repo: Arc<L>,
        cache: Option<Arc<dyn UsageCountCache>>,
    ) -> Self {
        Self {
            general_repo,
            personal_repo,
            ledger_repo,
            cache,
        }
    }

    /// 通用码是否存在（大小写不敏感）
    pub async fn is_valid_general_code(&self, code_text: &str) -> Result<bool> {
        let code = code_text.trim();
        if code.is_empty() {
            return Ok(false);
        }

        self.general_repo.exists_by_code(code).await
    }

    /// 通用码被兑换的次数
    #[instrument(skip(self, code_text), fields(code = %mask_code(code_text)))]
    pub async fn get_usage_count(&self, code_text: &str) -> Result<i64> {
        let code = code_text.trim();
        let general = self
            .general_repo
            .find_by_code(code)
            .await?
            .ok_or_else(|| ReferralError::GeneralCodeNotFound(code.to_string()))?;

        self.usage_count(general.id).await
    }

    /// 读穿缓存的使用次数
    ///
    /// 版本号必须先于账本查询读取；缓存任一步失败都记录警告并以账本为准
    async fn usage_count(&self, code_id: Uuid) -> Result<i64> {
        let Some(cache) = &self.cache else {
            return self.ledger_repo.count_general_usage(code_id).await;
        };

        let version = match cache.current_version(code_id).await {
            Ok(version) => version,
            Err(e) => {
                warn!(
                    code_id = %code_id,
                    error = %e,
                    "Cache version read failed, falling back to ledger"
                );
                return self.ledger_repo.count_general_usage(code_id).await;
            }
        };

        match cache.get_count(code_id, version).await {
            Ok(Some(count)) => return Ok(count),
            Ok(None) => {}
            Err(e) => {
                warn!(
                    code_id = %code_id,
                    version,
                    error = %e,
                    "Cache get failed, falling back to ledger"
                );
            }
        }

        let count = self.ledger_repo.count_general_usage(code_id).await?;

        if let Err(e) = cache.put_count(code_id, version, count).await {
            warn!(code_id = %code_id, version, error = %e, "Cache set failed");
        }

        Ok(count)
    }

    /// 码文本已作为个人码发放时拒绝
    async fn ensure_not_personal_code(&self, code: &str) -> Result<()> {
        if self.personal_repo.exists_by_code(code).await? {
            return Err(ReferralError::DuplicateGeneralCode(code.to_string()));
        }
        Ok(())
    }

    // ==================== 管理操作 ====================

    /// 创建通用码
    ///
    /// 与已有通用码或已发放的个人码文本相同（大小写不敏感）时拒绝，
    /// 否则解析时通用码优先，会让个人码永远无法兑换
    #[instrument(skip(self, code_text), fields(code = %mask_code(code_text)))]
    pub async fn create_general_code(&self, code_text: &str) -> Result<GeneralCode> {
        let code = validate_code_text(code_text)?;

        if self.general_repo.exists_by_code(code).await? {
            return Err(ReferralError::DuplicateGeneralCode(code.to_string()));
        }
        self.ensure_not_personal_code(code).await?;

        let created = self.general_repo.create(code).await?;
        info!(code_id = %created.id, code = %mask_code(&created.code), "通用码已创建");

        Ok(created)
    }

    pub async fn get_general_code(&self, id: Uuid) -> Result<GeneralCode> {
        self.general_repo
            .get(id)
            .await?
            .ok_or_else(|| ReferralError::GeneralCodeNotFound(id.to_string()))
    }

    /// 修改通用码文本
    ///
    /// 新文本与其他通用码或个人码冲突（大小写不敏感）时拒绝；仅改变大小写视为同一个码
    #[instrument(skip(self, code_text), fields(code_id = %id, code = %mask_code(code_text)))]
    pub async fn update_general_code(&self, id: Uuid, code_text: &str) -> Result<GeneralCode> {
        let code = validate_code_text(code_text)?;

        if let Some(existing) = self.general_repo.find_by_code(code).await? {
            if existing.id != id {
                return Err(ReferralError::DuplicateGeneralCode(code.to_string()));
            }
        }
        self.ensure_not_personal_code(code).await?;

        let updated = self
            .general_repo
            .update_code(id, code)
            .await?
            .ok_or_else(|| ReferralError::GeneralCodeNotFound(id.to_string()))?;

        info!(code_id = %updated.id, code = %mask_code(&updated.code), "通用码已修改");
        Ok(updated)
    }

    /// 删除通用码
    ///
    /// 账本记录保留，已激活的用户不受影响
    #[instrument(skip(self))]
    pub async fn delete_general_code(&self, id: Uuid) -> Result<()> {
        if !self.general_repo.delete(id).await? {
            return Err(ReferralError::GeneralCodeNotFound(id.to_string()));
        }

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.bump_version(id).await {
                warn!(code_id = %id, error = %e, "Cache invalidation failed");
            }
        }

        info!(code_id = %id, "通用码已删除");
        Ok(())
    }

    /// 分页列出通用码及其使用次数
    #[instrument(skip(self))]
    pub async fn list_general_codes(&self, limit: i64, offset: i64) -> Result<GeneralCodePage> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let offset = offset.max(0);

        let codes = self.general_repo.list(limit, offset).await?;
        let total = self.general_repo.count().await?;

        let mut summaries = Vec::with_capacity(codes.len());
        for code in codes {
            let usage_count = self.usage_count(code.id).await?;
            summaries.push(GeneralCodeSummary::new(code, usage_count));
        }

        Ok(GeneralCodePage {
            codes: summaries,
            total,
            limit,
            offset,
        })
    }
}

/// 校验并规整通用码文本
fn validate_code_text(code_text: &str) -> Result<&str> {
    let code = code_text.trim();

    if code.is_empty() {
        return Err(ReferralError::Validation("通用码不能为空".to_string()));
    }
    if code.chars().count() > MAX_GENERAL_CODE_LENGTH {
        return Err(ReferralError::Validation(format!(
            "通用码长度不能超过 {} 个字符",
            MAX_GENERAL_CODE_LENGTH
        )));
    }
    if code.chars().any(char::is_whitespace) {
        return Err(ReferralError::Validation("通用码不能包含空白字符".to_string()));
    }

    Ok(code)
}
