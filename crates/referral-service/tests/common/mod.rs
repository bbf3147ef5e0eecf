//! 集成测试公共设施
//!
//! `MemoryStore` 在单把互斥锁下实现四个仓储接口，提供与 Postgres 相同的约束：
//! 码文本大小写不敏感唯一、条件翻转、个人码额度、兑换原子性。
//! 每次存储访问前让出一次调度，让并发测试能交错执行。
//! `MemoryUsageCache` 以同样的方式实现按版本号分键的使用次数缓存，可切换为不可用。

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use referral::error::{ReferralError, Result};
use referral::generator::{CodeGenerator, SecureCodeGenerator};
use referral::models::{
    GeneralCode, PersonalCode, PersonalCodeInsert, RedeemOutcome, RedemptionRecord,
    RedemptionTarget, ReferralUser,
};
use referral::repository::{
    GeneralCodeRepositoryTrait, PersonalCodeRepositoryTrait, RedemptionLedgerRepositoryTrait,
    UserDirectory,
};
use referral::usage_cache::UsageCountCache;
use referral::ReferralEngine;
use referral_shared::config::ReferralConfig;

pub type MemoryEngine<C> = ReferralEngine<MemoryStore, MemoryStore, MemoryStore, MemoryStore, C>;

#[derive(Default)]
struct State {
    users: HashMap<Uuid, ReferralUser>,
    general: Vec<GeneralCode>,
    personal: Vec<PersonalCode>,
    ledger: Vec<RedemptionRecord>,
}

fn same_code(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// 内存存储
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed_user(&self, activated: bool) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.state.lock().users.insert(
            id,
            ReferralUser {
                id,
                is_referral_activated: activated,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    pub fn seed_general_code(&self, code: &str) -> GeneralCode {
        let now = Utc::now();
        let general = GeneralCode {
            id: Uuid::now_v7(),
            code: code.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.state.lock().general.push(general.clone());
        general
    }

    pub fn seed_personal_code(&self, owner: Uuid, code: &str, activated: bool) -> PersonalCode {
        let now = Utc::now();
        let personal = PersonalCode {
            id: Uuid::now_v7(),
            owner_user_id: owner,
            code: code.to_string(),
            is_activated: activated,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().personal.push(personal.clone());
        personal
    }

    pub fn user(&self, user_id: Uuid) -> Option<ReferralUser> {
        self.state.lock().users.get(&user_id).cloned()
    }

    pub fn personal_code(&self, code: &str) -> Option<PersonalCode> {
        self.state
            .lock()
            .personal
            .iter()
            .find(|p| same_code(&p.code, code))
            .cloned()
    }

    pub fn all_personal_codes(&self) -> Vec<PersonalCode> {
        self.state.lock().personal.clone()
    }

    pub fn codes_owned_by(&self, owner: Uuid) -> usize {
        self.state
            .lock()
            .personal
            .iter()
            .filter(|p| p.owner_user_id == owner)
            .count()
    }

    pub fn ledger(&self) -> Vec<RedemptionRecord> {
        self.state.lock().ledger.clone()
    }

    pub fn ledger_for(&self, user_id: Uuid) -> Vec<RedemptionRecord> {
        self.state
            .lock()
            .ledger
            .iter()
            .filter(|r| r.redeemed_by_user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<ReferralUser>> {
        tokio::task::yield_now().await;
        Ok(self.user(user_id))
    }
}

#[async_trait]
impl GeneralCodeRepositoryTrait for MemoryStore {
    async fn find_by_code(&self, code: &str) -> Result<Option<GeneralCode>> {
        tokio::task::yield_now().await;
        Ok(self
            .state
            .lock()
            .general
            .iter()
            .find(|g| same_code(&g.code, code))
            .cloned())
    }

    async fn exists_by_code(&self, code: &str) -> Result<bool> {
        Ok(self.find_by_code(code).await?.is_some())
    }

    async fn get(&self, id: Uuid) -> Result<Option<GeneralCode>> {
        Ok(self.state.lock().general.iter().find(|g| g.id == id).cloned())
    }

    async fn create(&self, code: &str) -> Result<GeneralCode> {
        let mut state = self.state.lock();
        if state.general.iter().any(|g| same_code(&g.code, code)) {
            return Err(ReferralError::DuplicateGeneralCode(code.to_string()));
        }

        let now = Utc::now();
        let general = GeneralCode {
            id: Uuid::now_v7(),
            code: code.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.general.push(general.clone());
        Ok(general)
    }

    async fn update_code(&self, id: Uuid, code: &str) -> Result<Option<GeneralCode>> {
        let mut state = self.state.lock();
        if state
            .general
            .iter()
            .any(|g| g.id != id && same_code(&g.code, code))
        {
            return Err(ReferralError::DuplicateGeneralCode(code.to_string()));
        }

        Ok(state.general.iter_mut().find(|g| g.id == id).map(|g| {
            g.code = code.to_string();
            g.updated_at = Utc::now();
            g.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.lock();
        let before = state.general.len();
        state.general.retain(|g| g.id != id);
        Ok(state.general.len() < before)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<GeneralCode>> {
        Ok(self
            .state
            .lock()
            .general
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.state.lock().general.len() as i64)
    }
}

#[async_trait]
impl PersonalCodeRepositoryTrait for MemoryStore {
    async fn find_redeemable_by_code(&self, code: &str) -> Result<Option<PersonalCode>> {
        tokio::task::yield_now().await;
        Ok(self
            .state
            .lock()
            .personal
            .iter()
            .find(|p| !p.is_activated && same_code(&p.code, code))
            .cloned())
    }

    async fn exists_by_code(&self, code: &str) -> Result<bool> {
        tokio::task::yield_now().await;
        Ok(self.personal_code(code).is_some())
    }

    async fn list_by_owner(&self, owner_user_id: Uuid) -> Result<Vec<PersonalCode>> {
        tokio::task::yield_now().await;
        Ok(self
            .state
            .lock()
            .personal
            .iter()
            .filter(|p| p.owner_user_id == owner_user_id)
            .cloned()
            .collect())
    }

    async fn insert_for_owner(
        &self,
        owner_user_id: Uuid,
        code: &str,
        quota: usize,
    ) -> Result<PersonalCodeInsert> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();

        if !state.users.contains_key(&owner_user_id) {
            return Err(ReferralError::UserNotFound(owner_user_id));
        }

        let owned = state
            .personal
            .iter()
            .filter(|p| p.owner_user_id == owner_user_id)
            .count();
        if owned >= quota {
            return Ok(PersonalCodeInsert::QuotaFull);
        }

        if state.personal.iter().any(|p| same_code(&p.code, code)) {
            return Ok(PersonalCodeInsert::CodeTaken);
        }

        let now = Utc::now();
        let personal = PersonalCode {
            id: Uuid::now_v7(),
            owner_user_id,
            code: code.to_string(),
            is_activated: false,
            created_at: now,
            updated_at: now,
        };
        state.personal.push(personal.clone());

        Ok(PersonalCodeInsert::Inserted(personal))
    }
}

#[async_trait]
impl RedemptionLedgerRepositoryTrait for MemoryStore {
    async fn count_general_usage(&self, general_code_id: Uuid) -> Result<i64> {
        Ok(self
            .state
            .lock()
            .ledger
            .iter()
            .filter(|r| r.code_id == Some(general_code_id))
            .filter(|r| r.code_type == referral::models::CodeType::General)
            .count() as i64)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<RedemptionRecord>> {
        Ok(self.ledger_for(user_id))
    }

    async fn redeem(&self, user_id: Uuid, target: RedemptionTarget) -> Result<RedeemOutcome> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();

        // 锁内先检查全部条件再写入，相当于事务回滚
        match state.users.get(&user_id) {
            Some(user) if !user.is_referral_activated => {}
            _ => return Ok(RedeemOutcome::UserAlreadyActivated),
        }

        if let RedemptionTarget::Personal(code_id) = target {
            let redeemable = state
                .personal
                .iter()
                .any(|p| p.id == code_id && !p.is_activated);
            if !redeemable {
                return Ok(RedeemOutcome::CodeAlreadyUsed);
            }
        }

        let now = Utc::now();
        if let Some(user) = state.users.get_mut(&user_id) {
            user.is_referral_activated = true;
            user.updated_at = now;
        }
        if let RedemptionTarget::Personal(code_id) = target {
            if let Some(code) = state.personal.iter_mut().find(|p| p.id == code_id) {
                code.is_activated = true;
                code.updated_at = now;
            }
        }

        let record = RedemptionRecord::new(user_id, target);
        state.ledger.push(record.clone());

        Ok(RedeemOutcome::Redeemed(record))
    }
}

/// 先按脚本产出候选码，脚本用完后改用安全随机生成器
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<String>>,
    fallback: SecureCodeGenerator,
}

impl ScriptedGenerator {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(codes.into_iter().map(Into::into).collect()),
            fallback: SecureCodeGenerator::new(),
        }
    }
}

impl CodeGenerator for ScriptedGenerator {
    fn generate(&self) -> Result<String> {
        match self.script.lock().pop_front() {
            Some(code) => Ok(code),
            None => self.fallback.generate(),
        }
    }
}

#[derive(Default)]
struct CacheState {
    versions: HashMap<Uuid, i64>,
    counts: HashMap<(Uuid, i64), i64>,
}

/// 内存使用次数缓存
#[derive(Default)]
pub struct MemoryUsageCache {
    state: Mutex<CacheState>,
    unavailable: AtomicBool,
    hits: AtomicUsize,
}

impl MemoryUsageCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 模拟 Redis 不可达：之后所有操作返回错误
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// 命中缓存的读取次数
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn version(&self, code_id: Uuid) -> i64 {
        self.state.lock().versions.get(&code_id).copied().unwrap_or(0)
    }

    pub fn cached_count(&self, code_id: Uuid, version: i64) -> Option<i64> {
        self.state.lock().counts.get(&(code_id, version)).copied()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ReferralError::Cache("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UsageCountCache for MemoryUsageCache {
    async fn current_version(&self, code_id: Uuid) -> Result<i64> {
        tokio::task::yield_now().await;
        self.check_available()?;
        Ok(self.version(code_id))
    }

    async fn get_count(&self, code_id: Uuid, version: i64) -> Result<Option<i64>> {
        tokio::task::yield_now().await;
        self.check_available()?;
        let count = self.cached_count(code_id, version);
        if count.is_some() {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
        Ok(count)
    }

    async fn put_count(&self, code_id: Uuid, version: i64, count: i64) -> Result<()> {
        tokio::task::yield_now().await;
        self.check_available()?;
        self.state.lock().counts.insert((code_id, version), count);
        Ok(())
    }

    async fn bump_version(&self, code_id: Uuid) -> Result<i64> {
        tokio::task::yield_now().await;
        self.check_available()?;
        let mut state = self.state.lock();
        let version = state.versions.entry(code_id).or_insert(0);
        *version += 1;
        Ok(*version)
    }
}

/// 由同一个内存存储组装引擎
pub fn engine_with<C: CodeGenerator>(
    store: &Arc<MemoryStore>,
    generator: C,
    config: &ReferralConfig,
) -> MemoryEngine<C> {
    ReferralEngine::from_parts(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(generator),
        None,
        config,
    )
}

pub fn engine(store: &Arc<MemoryStore>) -> MemoryEngine<SecureCodeGenerator> {
    engine_with(store, SecureCodeGenerator::new(), &ReferralConfig::default())
}

/// 带使用次数缓存的引擎
pub fn engine_with_cache(
    store: &Arc<MemoryStore>,
    cache: &Arc<MemoryUsageCache>,
) -> MemoryEngine<SecureCodeGenerator> {
    ReferralEngine::from_parts(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(SecureCodeGenerator::new()),
        Some(cache.clone() as Arc<dyn UsageCountCache>),
        &ReferralConfig::default(),
    )
}
