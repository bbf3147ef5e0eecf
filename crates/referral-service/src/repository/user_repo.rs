//! 用户目录仓储
//!
//! 只读取和翻转用户的推荐激活标记，用户的其他字段由外部用户目录维护

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::traits::UserDirectory;
use crate::error::Result;
use crate::models::ReferralUser;

/// 用户仓储
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 查询用户
    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<ReferralUser>> {
        let user = sqlx::query_as::<_, ReferralUser>(
            r#"
            SELECT id, is_referral_activated, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// 在事务中锁定用户行（FOR UPDATE）
    ///
    /// 返回用户是否存在
    pub async fn lock_user_in_tx(tx: &mut PgConnection, user_id: Uuid) -> Result<bool> {
        let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(tx)
            .await?;

        Ok(row.is_some())
    }

    /// 在事务中翻转用户推荐激活标记
    ///
    /// 条件更新：仅当标记仍为 false 时生效，返回是否翻转成功。
    /// 返回 false 表示用户已被激活（或不存在），调用方应回滚。
    pub async fn mark_referral_activated_in_tx(
        tx: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_referral_activated = TRUE, updated_at = NOW()
            WHERE id = $1 AND is_referral_activated = FALSE
            "#,
        )
        .bind(user_id)
        .execute(tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<ReferralUser>> {
        self.get_user(user_id).await
    }
}
