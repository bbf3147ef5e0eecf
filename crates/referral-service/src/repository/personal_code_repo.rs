//! 个人码仓储
//!
//! 码文本的全局唯一性由 `LOWER(code)` 唯一索引保证；
//! 用户额度通过锁定归属用户行后重新计数保证。

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::traits::PersonalCodeRepositoryTrait;
use super::user_repo::UserRepository;
use crate::error::{ReferralError, Result};
use crate::models::{PersonalCode, PersonalCodeInsert};

/// 个人码仓储
pub struct PersonalCodeRepository {
    pool: PgPool,
}

impl PersonalCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_redeemable_by_code(&self, code: &str) -> Result<Option<PersonalCode>> {
        let personal = sqlx::query_as::<_, PersonalCode>(
            r#"
            SELECT id, owner_user_id, code, is_activated, created_at, updated_at
            FROM personal_referral_codes
            WHERE LOWER(code) = LOWER($1) AND is_activated = FALSE
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(personal)
    }

    pub async fn exists_by_code(&self, code: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM personal_referral_codes WHERE LOWER(code) = LOWER($1))",
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    pub async fn list_by_owner(&self, owner_user_id: Uuid) -> Result<Vec<PersonalCode>> {
        let codes = sqlx::query_as::<_, PersonalCode>(
            r#"
            SELECT id, owner_user_id, code, is_activated, created_at, updated_at
            FROM personal_referral_codes
            WHERE owner_user_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(owner_user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(codes)
    }

    /// 在额度内写入一个个人码
    ///
    /// 单独事务：
    /// 1. 锁定归属用户行，串行化同一用户的并发补发
    /// 2. 重新计数，已满额则返回 QuotaFull
    /// 3. `ON CONFLICT DO NOTHING` 写入，未返回行即码文本已被占用
    pub async fn insert_for_owner(
        &self,
        owner_user_id: Uuid,
        code: &str,
        quota: usize,
    ) -> Result<PersonalCodeInsert> {
        let mut tx = self.pool.begin().await?;

        if !UserRepository::lock_user_in_tx(&mut tx, owner_user_id).await? {
            return Err(ReferralError::UserNotFound(owner_user_id));
        }

        let owned = Self::count_by_owner_in_tx(&mut tx, owner_user_id).await?;
        if owned >= quota as i64 {
            tx.rollback().await?;
            return Ok(PersonalCodeInsert::QuotaFull);
        }

        let inserted = sqlx::query_as::<_, PersonalCode>(
            r#"
            INSERT INTO personal_referral_codes
                (id, owner_user_id, code, is_activated, created_at, updated_at)
            VALUES ($1, $2, $3, FALSE, NOW(), NOW())
            ON CONFLICT DO NOTHING
            RETURNING id, owner_user_id, code, is_activated, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(owner_user_id)
        .bind(code)
        .fetch_optional(&mut *tx)
        .await?;

        match inserted {
            Some(personal) => {
                tx.commit().await?;
                Ok(PersonalCodeInsert::Inserted(personal))
            }
            None => {
                tx.rollback().await?;
                Ok(PersonalCodeInsert::CodeTaken)
            }
        }
    }

    async fn count_by_owner_in_tx(tx: &mut PgConnection, owner_user_id: Uuid) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM personal_referral_codes WHERE owner_user_id = $1")
                .bind(owner_user_id)
                .fetch_one(tx)
                .await?;

        Ok(count)
    }

    /// 在事务中翻转个人码激活标记
    ///
    /// 条件更新：仅当码仍未激活时生效。并发兑换同一个码时，后到的事务会在行锁上等待，
    /// 前者提交后重新评估条件得到 0 行，返回 false。
    pub async fn mark_activated_in_tx(tx: &mut PgConnection, code_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE personal_referral_codes
            SET is_activated = TRUE, updated_at = NOW()
            WHERE id = $1 AND is_activated = FALSE
            "#,
        )
        .bind(code_id)
        .execute(tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl PersonalCodeRepositoryTrait for PersonalCodeRepository {
    async fn find_redeemable_by_code(&self, code: &str) -> Result<Option<PersonalCode>> {
        self.find_redeemable_by_code(code).await
    }

    async fn exists_by_code(&self, code: &str) -> Result<bool> {
        self.exists_by_code(code).await
    }

    async fn list_by_owner(&self, owner_user_id: Uuid) -> Result<Vec<PersonalCode>> {
        self.list_by_owner(owner_user_id).await
    }

    async fn insert_for_owner(
        &self,
        owner_user_id: Uuid,
        code: &str,
        quota: usize,
    ) -> Result<PersonalCodeInsert> {
        self.insert_for_owner(owner_user_id, code, quota).await
    }
}
