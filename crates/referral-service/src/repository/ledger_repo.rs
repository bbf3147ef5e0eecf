//! 兑换账本仓储
//!
//! 账本只追加。兑换在单个事务内完成用户标记翻转、个人码标记翻转与账本写入，
//! 任何一步的条件更新失败都会整体回滚。

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::personal_code_repo::PersonalCodeRepository;
use super::traits::RedemptionLedgerRepositoryTrait;
use super::user_repo::UserRepository;
use crate::error::Result;
use crate::models::{RedeemOutcome, RedemptionRecord, RedemptionTarget};

/// 兑换账本仓储
pub struct RedemptionLedgerRepository {
    pool: PgPool,
}

impl RedemptionLedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 通用码被兑换的次数
    pub async fn count_general_usage(&self, general_code_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM referral_redemptions
            WHERE code_type = 'general' AND code_id = $1
            "#,
        )
        .bind(general_code_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<RedemptionRecord>> {
        let records = sqlx::query_as::<_, RedemptionRecord>(
            r#"
            SELECT id, redeemed_by_user_id, code_type, code_id, created_at
            FROM referral_redemptions
            WHERE redeemed_by_user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// 在事务中追加账本记录
    pub async fn create_in_tx(
        tx: &mut PgConnection,
        record: &RedemptionRecord,
    ) -> Result<RedemptionRecord> {
        let created = sqlx::query_as::<_, RedemptionRecord>(
            r#"
            INSERT INTO referral_redemptions
                (id, redeemed_by_user_id, code_type, code_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, redeemed_by_user_id, code_type, code_id, created_at
            "#,
        )
        .bind(record.id)
        .bind(record.redeemed_by_user_id)
        .bind(record.code_type)
        .bind(record.code_id)
        .bind(record.created_at)
        .fetch_one(tx)
        .await?;

        Ok(created)
    }

    /// 原子兑换
    ///
    /// 1. 条件翻转用户激活标记，0 行则回滚并返回 UserAlreadyActivated
    /// 2. 个人码时条件翻转码激活标记，0 行则回滚并返回 CodeAlreadyUsed
    /// 3. 追加账本记录并提交
    pub async fn redeem(&self, user_id: Uuid, target: RedemptionTarget) -> Result<RedeemOutcome> {
        let mut tx = self.pool.begin().await?;

        if !UserRepository::mark_referral_activated_in_tx(&mut tx, user_id).await? {
            tx.rollback().await?;
            return Ok(RedeemOutcome::UserAlreadyActivated);
        }

        if let RedemptionTarget::Personal(code_id) = target {
            if !PersonalCodeRepository::mark_activated_in_tx(&mut tx, code_id).await? {
                tx.rollback().await?;
                return Ok(RedeemOutcome::CodeAlreadyUsed);
            }
        }

        let record = RedemptionRecord::new(user_id, target);
        let created = Self::create_in_tx(&mut tx, &record).await?;

        tx.commit().await?;

        Ok(RedeemOutcome::Redeemed(created))
    }
}

#[async_trait]
impl RedemptionLedgerRepositoryTrait for RedemptionLedgerRepository {
    async fn count_general_usage(&self, general_code_id: Uuid) -> Result<i64> {
        self.count_general_usage(general_code_id).await
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<RedemptionRecord>> {
        self.list_by_user(user_id).await
    }

    async fn redeem(&self, user_id: Uuid, target: RedemptionTarget) -> Result<RedeemOutcome> {
        self.redeem(user_id, target).await
    }
}
