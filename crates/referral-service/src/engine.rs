//! 推荐码引擎
//!
//! 组装仓储、生成器与服务，对调用方（HTTP 层等）暴露四个核心操作：
//! - `resolve_and_activate`：使用推荐码激活推荐
//! - `get_or_generate_codes`：获取或补发个人码
//! - `get_usage_count`：通用码使用次数
//! - `is_valid_general_code`：通用码是否存在

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use referral_shared::cache::Cache;
use referral_shared::config::{AppConfig, ReferralConfig};
use referral_shared::database::Database;

use crate::error::Result;
use crate::generator::{CodeGenerator, SecureCodeGenerator};
use crate::models::RedemptionRecord;
use crate::repository::{
    GeneralCodeRepository, GeneralCodeRepositoryTrait, PersonalCodeRepository,
    PersonalCodeRepositoryTrait, RedemptionLedgerRepository, RedemptionLedgerRepositoryTrait,
    UserDirectory, UserRepository,
};
use crate::service::{
    ActivationResult, ActivationService, CodeResolver, GeneralCodeService, IssuanceService,
    PersonalCodeView,
};
use crate::usage_cache::{RedisUsageCache, UsageCountCache};

/// 基于 Postgres 的推荐码引擎
pub type PgReferralEngine = ReferralEngine<
    UserRepository,
    GeneralCodeRepository,
    PersonalCodeRepository,
    RedemptionLedgerRepository,
    SecureCodeGenerator,
>;

/// 推荐码引擎
pub struct ReferralEngine<U, G, P, L, C>
where
    U: UserDirectory,
    G: GeneralCodeRepositoryTrait,
    P: PersonalCodeRepositoryTrait,
    L: RedemptionLedgerRepositoryTrait,
    C: CodeGenerator,
{
    activation: ActivationService<U, G, P, L>,
    issuance: IssuanceService<U, G, P, C>,
    general_codes: GeneralCodeService<G, P, L>,
}

impl PgReferralEngine {
    /// 按配置连接数据库（以及可选的 Redis）并组装引擎
    ///
    /// Redis 不可用时记录警告，引擎在无缓存模式下运行
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let db = Database::connect(&config.database).await?;
        let pool = db.pool().clone();
        info!("Database connection established");

        let cache = if config.redis.enabled {
            match Self::connect_cache(config).await {
                Ok(cache) => {
                    info!("Redis connection established");
                    let ttl = Duration::from_secs(config.referral.usage_cache_ttl_seconds);
                    Some(Arc::new(RedisUsageCache::new(cache, ttl)) as Arc<dyn UsageCountCache>)
                }
                Err(e) => {
                    warn!(error = %e, "Redis unavailable, usage counts will be read from the ledger");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self::from_parts(
            Arc::new(UserRepository::new(pool.clone())),
            Arc::new(GeneralCodeRepository::new(pool.clone())),
            Arc::new(PersonalCodeRepository::new(pool.clone())),
            Arc::new(RedemptionLedgerRepository::new(pool)),
            Arc::new(SecureCodeGenerator::new()),
            cache,
            &config.referral,
        ))
    }

    async fn connect_cache(config: &AppConfig) -> Result<Arc<Cache>> {
        let cache = Cache::new(&config.redis)?;
        cache.health_check().await?;
        Ok(Arc::new(cache))
    }
}

impl<U, G, P, L, C> ReferralEngine<U, G, P, L, C>
where
    U: UserDirectory,
    G: GeneralCodeRepositoryTrait,
    P: PersonalCodeRepositoryTrait,
    L: RedemptionLedgerRepositoryTrait,
    C: CodeGenerator,
{
    /// 由任意仓储实现组装引擎
    pub fn from_parts(
        users: Arc<U>,
        general_repo: Arc<G>,
        personal_repo: Arc<P>,
        ledger_repo: Arc<L>,
        generator: Arc<C>,
        cache: Option<Arc<dyn UsageCountCache>>,
        config: &ReferralConfig,
    ) -> Self {
        let activation = ActivationService::new(
            users.clone(),
            CodeResolver::new(general_repo.clone(), personal_repo.clone()),
            ledger_repo.clone(),
            cache.clone(),
            config.allow_self_redemption,
        );

        let issuance = IssuanceService::new(
            users,
            general_repo.clone(),
            personal_repo.clone(),
            generator,
            config.generation_attempts(),
        );

        let general_codes = GeneralCodeService::new(general_repo, personal_repo, ledger_repo, cache);

        Self {
            activation,
            issuance,
            general_codes,
        }
    }

    /// 使用推荐码激活推荐，业务拒绝以 `success = false` 返回
    pub async fn resolve_and_activate(
        &self,
        user_id: Uuid,
        code_text: &str,
    ) -> Result<ActivationResult> {
        self.activation.resolve_and_activate(user_id, code_text).await
    }

    /// 获取用户的个人码，不足 5 个时补足，按创建顺序返回
    pub async fn get_or_generate_codes(&self, user_id: Uuid) -> Result<Vec<PersonalCodeView>> {
        let codes = self.issuance.get_or_generate_codes(user_id).await?;
        Ok(codes.into_iter().map(PersonalCodeView::from).collect())
    }

    pub async fn get_usage_count(&self, code_text: &str) -> Result<i64> {
        self.general_codes.get_usage_count(code_text).await
    }

    pub async fn is_valid_general_code(&self, code_text: &str) -> Result<bool> {
        self.general_codes.is_valid_general_code(code_text).await
    }

    pub async fn list_user_redemptions(&self, user_id: Uuid) -> Result<Vec<RedemptionRecord>> {
        self.activation.list_user_redemptions(user_id).await
    }

    /// 通用码管理
    pub fn general_codes(&self) -> &GeneralCodeService<G, P, L> {
        &self.general_codes
    }
}
