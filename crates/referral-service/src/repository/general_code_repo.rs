//! 通用码仓储
//!
//! 通用码由管理员维护，本服务主要做大小写不敏感的读取

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::is_unique_violation;
use super::traits::GeneralCodeRepositoryTrait;
use crate::error::{ReferralError, Result};
use crate::models::GeneralCode;

/// 通用码仓储
pub struct GeneralCodeRepository {
    pool: PgPool,
}

impl GeneralCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<GeneralCode>> {
        let general = sqlx::query_as::<_, GeneralCode>(
            r#"
            SELECT id, code, created_at, updated_at
            FROM general_referral_codes
            WHERE LOWER(code) = LOWER($1)
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(general)
    }

    pub async fn exists_by_code(&self, code: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM general_referral_codes WHERE LOWER(code) = LOWER($1))",
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<GeneralCode>> {
        let general = sqlx::query_as::<_, GeneralCode>(
            "SELECT id, code, created_at, updated_at FROM general_referral_codes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(general)
    }

    /// 创建通用码
    ///
    /// 码文本大小写不敏感唯一，冲突时返回 DuplicateGeneralCode
    pub async fn create(&self, code: &str) -> Result<GeneralCode> {
        sqlx::query_as::<_, GeneralCode>(
            r#"
            INSERT INTO general_referral_codes (id, code, created_at, updated_at)
            VALUES ($1, $2, NOW(), NOW())
            RETURNING id, code, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(code)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_duplicate(e, code))
    }

    pub async fn update_code(&self, id: Uuid, code: &str) -> Result<Option<GeneralCode>> {
        sqlx::query_as::<_, GeneralCode>(
            r#"
            UPDATE general_referral_codes
            SET code = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, code, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_duplicate(e, code))
    }

    /// 删除通用码
    ///
    /// 账本中的历史记录保留，code_id 成为悬挂引用
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM general_referral_codes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<GeneralCode>> {
        let codes = sqlx::query_as::<_, GeneralCode>(
            r#"
            SELECT id, code, created_at, updated_at
            FROM general_referral_codes
            ORDER BY created_at ASC, id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(codes)
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM general_referral_codes")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

fn map_duplicate(err: sqlx::Error, code: &str) -> ReferralError {
    if is_unique_violation(&err) {
        ReferralError::DuplicateGeneralCode(code.to_string())
    } else {
        ReferralError::Persistence(err)
    }
}

#[async_trait]
impl GeneralCodeRepositoryTrait for GeneralCodeRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<GeneralCode>> {
        self.find_by_code(code).await
    }

    async fn exists_by_code(&self, code: &str) -> Result<bool> {
        self.exists_by_code(code).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<GeneralCode>> {
        self.get(id).await
    }

    async fn create(&self, code: &str) -> Result<GeneralCode> {
        self.create(code).await
    }

    async fn update_code(&self, id: Uuid, code: &str) -> Result<Option<GeneralCode>> {
        self.update_code(id, code).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.delete(id).await
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<GeneralCode>> {
        self.list(limit, offset).await
    }

    async fn count(&self) -> Result<i64> {
        self.count().await
    }
}
