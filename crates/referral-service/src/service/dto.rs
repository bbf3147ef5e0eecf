//! 服务层数据传输对象
//!
//! 定义服务层与外部交互使用的 DTO，与内部领域模型解耦

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ReferralError;
use crate::models::{CodeType, GeneralCode, PersonalCode};

/// 激活结果
///
/// 业务拒绝不作为错误传播，而是以 `success = false` 加文案返回
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationResult {
    pub success: bool,
    pub message: String,
}

impl ActivationResult {
    pub fn activated(code_type: CodeType) -> Self {
        let message = match code_type {
            CodeType::General => "General referral code activated successfully",
            CodeType::Personal => "Personal referral code activated successfully",
        };

        Self {
            success: true,
            message: message.to_string(),
        }
    }

    /// 由业务拒绝构造结果，非业务拒绝返回 None
    pub fn from_rejection(err: &ReferralError) -> Option<Self> {
        err.rejection_message().map(|message| Self {
            success: false,
            message: message.to_string(),
        })
    }
}

/// 个人码视图
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalCodeView {
    pub code: String,
    pub is_activated: bool,
}

impl From<PersonalCode> for PersonalCodeView {
    fn from(code: PersonalCode) -> Self {
        Self {
            code: code.code,
            is_activated: code.is_activated,
        }
    }
}

/// 通用码摘要，附带由账本聚合的使用次数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralCodeSummary {
    pub id: Uuid,
    pub code: String,
    pub usage_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GeneralCodeSummary {
    pub fn new(code: GeneralCode, usage_count: i64) -> Self {
        Self {
            id: code.id,
            code: code.code,
            usage_count,
            created_at: code.created_at,
            updated_at: code.updated_at,
        }
    }
}

/// 通用码分页结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralCodePage {
    pub codes: Vec<GeneralCodeSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}
