//! 推荐码服务
//!
//! 管理推荐码的发放与兑换。
//!
//! ## 核心功能
//!
//! - **推荐激活**：用户提交通用码或他人的个人码，一次性激活推荐功能
//! - **个人码补发**：已激活的用户领取 5 个个人码，补发幂等
//! - **使用次数**：通用码的使用次数由只追加的兑换账本聚合得出
//! - **通用码管理**：创建、修改、删除、分页查询通用码
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `generator`: 个人码生成器
//! - `repository`: 数据库仓储层
//! - `service`: 业务服务层
//! - `usage_cache`: 通用码使用次数缓存
//! - `engine`: 对外暴露的引擎入口

pub mod engine;
pub mod error;
pub mod generator;
pub mod models;
pub mod repository;
pub mod service;
pub mod usage_cache;

pub use engine::{PgReferralEngine, ReferralEngine};
pub use error::{ReferralError, Result};
pub use generator::{CodeGenerator, SecureCodeGenerator};
pub use models::*;
pub use repository::{
    GeneralCodeRepository, PersonalCodeRepository, RedemptionLedgerRepository, UserRepository,
};
pub use service::{ActivationService, GeneralCodeService, IssuanceService, dto};
pub use usage_cache::{RedisUsageCache, UsageCountCache};
