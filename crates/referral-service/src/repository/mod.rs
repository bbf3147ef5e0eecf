//! 数据库仓储层
//!
//! 提供所有实体的数据访问接口，封装 SQL 操作细节。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据持久化，不包含业务逻辑
//! - 使用 SQLx 进行数据库操作，码文本统一按 `LOWER(code)` 比较
//! - 唯一性与“只翻转一次”由数据库约束和条件更新保证，而非应用层预检
//! - 定义 trait 接口以支持 mock 测试和替换存储实现

mod general_code_repo;
mod ledger_repo;
mod personal_code_repo;
mod traits;
mod user_repo;

pub use general_code_repo::GeneralCodeRepository;
pub use ledger_repo::RedemptionLedgerRepository;
pub use personal_code_repo::PersonalCodeRepository;
pub use traits::*;
pub use user_repo::UserRepository;

/// Postgres 唯一约束冲突的 SQLSTATE
const UNIQUE_VIOLATION: &str = "23505";

/// 判断是否为唯一约束冲突
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|e| e.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION)
}
