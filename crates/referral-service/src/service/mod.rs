//! 服务层
//!
//! 实现推荐码业务逻辑，协调仓储层、生成器和缓存层。
//!
//! ## 模块结构
//!
//! - `dto`: 数据传输对象定义
//! - `resolver`: 推荐码解析（通用码优先，其次未激活的个人码）
//! - `activation_service`: 推荐激活
//! - `issuance_service`: 个人码补发
//! - `general_code_service`: 通用码查询、使用次数与管理

pub mod activation_service;
pub mod dto;
pub mod general_code_service;
pub mod issuance_service;
pub mod resolver;

pub use activation_service::ActivationService;
pub use dto::*;
pub use general_code_service::GeneralCodeService;
pub use issuance_service::IssuanceService;
pub use resolver::{CodeResolver, ResolvedCode};
