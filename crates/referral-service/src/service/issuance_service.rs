//! 个人码补发服务
//!
//! 已激活推荐的用户可以领取自己的个人码，每人固定 5 个。
//! 补发是幂等的：已有的码不会被替换或回收，只补足缺少的部分。
//!
//! ## 唯一性
//!
//! 生成器只产出候选码，全局唯一性由存储的唯一索引保证。
//! 候选码冲突时重新生成，重试次数有上限，超过后返回 `CodeSpaceExhausted`。

use std::sync::Arc;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use referral_shared::observability::metrics::{record_code_collision, record_code_issuance};

use crate::error::{ReferralError, Result};
use crate::generator::CodeGenerator;
use crate::models::{PERSONAL_CODE_QUOTA, PersonalCode, PersonalCodeInsert};
use crate::repository::{GeneralCodeRepositoryTrait, PersonalCodeRepositoryTrait, UserDirectory};

/// 单个码位的补发结果
#[derive(Debug)]
enum SlotOutcome {
    Issued(PersonalCode),
    /// 并发补发已将额度填满
    QuotaFilled,
    Exhausted { attempts: u32 },
}

/// 个人码补发服务
pub struct IssuanceService<U, G, P, C>
where
    U: UserDirectory,
    G: GeneralCodeRepositoryTrait,
    P: PersonalCodeRepositoryTrait,
    C: CodeGenerator,
{
    users: Arc<U>,
    general_repo: Arc<G>,
    personal_repo: Arc<P>,
    generator: Arc<C>,
    max_attempts: u32,
}

impl<U, G, P, C> IssuanceService<U, G, P, C>
where
    U: UserDirectory,
    G: GeneralCodeRepositoryTrait,
    P: PersonalCodeRepositoryTrait,
    C: CodeGenerator,
{
    pub fn new(
        users: Arc<U>,
        general_repo: Arc<G>,
        personal_repo: Arc<P>,
        generator: Arc<C>,
        max_attempts: u32,
    ) -> Self {
        Self {
            users,
            general_repo,
            personal_repo,
            generator,
            max_attempts: max_attempts.max(1),
        }
    }

    /// 获取用户的个人码，不足 5 个时补足
    ///
    /// 流程：
    /// 1. 校验用户已激活推荐
    /// 2. 按创建时间列出已有码，满额则原样返回
    /// 3. 逐个码位生成并立即持久化
    ///
    /// 中途失败时已写入的码不回滚，重新调用即可补足剩余码位
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_or_generate_codes(&self, user_id: Uuid) -> Result<Vec<PersonalCode>> {
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or(ReferralError::UserNotFound(user_id))?;

        if !user.is_eligible_for_codes() {
            record_code_issuance("not_eligible", 0);
            info!(user_id = %user_id, "用户尚未激活推荐，拒绝补发个人码");
            return Err(ReferralError::NotEligible(user_id));
        }

        let mut codes = self.personal_repo.list_by_owner(user_id).await?;
        if codes.len() >= PERSONAL_CODE_QUOTA {
            record_code_issuance("noop", 0);
            return Ok(codes);
        }

        let needed = PERSONAL_CODE_QUOTA - codes.len();
        let mut issued: u64 = 0;

        for _ in 0..needed {
            let outcome = match self.issue_slot(user_id).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    record_code_issuance("error", issued);
                    error!(user_id = %user_id, issued, error = %e, "个人码补发失败");
                    return Err(e);
                }
            };

            match outcome {
                SlotOutcome::Issued(code) => {
                    codes.push(code);
                    issued += 1;
                }
                SlotOutcome::QuotaFilled => {
                    codes = self.personal_repo.list_by_owner(user_id).await?;
                    break;
                }
                SlotOutcome::Exhausted { attempts } => {
                    record_code_issuance("exhausted", issued);
                    error!(
                        user_id = %user_id,
                        attempts,
                        issued,
                        "推荐码空间耗尽，放弃补发"
                    );
                    return Err(ReferralError::CodeSpaceExhausted { attempts });
                }
            }
        }

        record_code_issuance("issued", issued);
        info!(user_id = %user_id, issued, total = codes.len(), "个人码补发完成");

        Ok(codes)
    }

    /// 为一个码位生成并写入个人码
    ///
    /// 与通用码文本相同的候选码也视为冲突，避免被解析优先级遮蔽
    async fn issue_slot(&self, user_id: Uuid) -> Result<SlotOutcome> {
        for attempt in 1..=self.max_attempts {
            let candidate = self.generator.generate()?;

            if self.general_repo.exists_by_code(&candidate).await? {
                record_code_collision();
                warn!(user_id = %user_id, attempt, "候选码与通用码冲突，重新生成");
                continue;
            }

            match self
                .personal_repo
                .insert_for_owner(user_id, &candidate, PERSONAL_CODE_QUOTA)
                .await?
            {
                PersonalCodeInsert::Inserted(code) => return Ok(SlotOutcome::Issued(code)),
                PersonalCodeInsert::QuotaFull => return Ok(SlotOutcome::QuotaFilled),
                PersonalCodeInsert::CodeTaken => {
                    record_code_collision();
                    warn!(user_id = %user_id, attempt, "候选码已被占用，重新生成");
                }
            }
        }

        Ok(SlotOutcome::Exhausted {
            attempts: self.max_attempts,
        })
    }
}
