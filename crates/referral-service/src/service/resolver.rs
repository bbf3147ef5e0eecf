//! 推荐码解析
//!
//! 按固定优先级做大小写不敏感的精确匹配：
//! 1. 通用码
//! 2. 尚未激活的个人码
//! 3. 其余均为无效码（包括已激活的个人码）

use std::sync::Arc;

use crate::error::Result;
use crate::models::{GeneralCode, PersonalCode};
use crate::repository::{GeneralCodeRepositoryTrait, PersonalCodeRepositoryTrait};

/// 解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedCode {
    General(GeneralCode),
    Personal(PersonalCode),
    Invalid,
}

/// 推荐码解析器
pub struct CodeResolver<G, P>
where
    G: GeneralCodeRepositoryTrait,
    P: PersonalCodeRepositoryTrait,
{
    general_repo: Arc<G>,
    personal_repo: Arc<P>,
}

impl<G, P> CodeResolver<G, P>
where
    G: GeneralCodeRepositoryTrait,
    P: PersonalCodeRepositoryTrait,
{
    pub fn new(general_repo: Arc<G>, personal_repo: Arc<P>) -> Self {
        Self {
            general_repo,
            personal_repo,
        }
    }

    /// 解析用户输入的码文本
    ///
    /// 去除首尾空白，空输入直接视为无效，不访问存储
    pub async fn resolve(&self, input: &str) -> Result<ResolvedCode> {
        let code = input.trim();
        if code.is_empty() {
            return Ok(ResolvedCode::Invalid);
        }

        if let Some(general) = self.general_repo.find_by_code(code).await? {
            return Ok(ResolvedCode::General(general));
        }

        if let Some(personal) = self.personal_repo.find_redeemable_by_code(code).await? {
            return Ok(ResolvedCode::Personal(personal));
        }

        Ok(ResolvedCode::Invalid)
    }
}
