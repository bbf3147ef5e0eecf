//! 个人码生成器
//!
//! 生成 8 位大写字母数字码，每一位独立、均匀地从 36 个符号中抽取。
//! 生成器只负责产出候选码，唯一性校验与重试由补发服务负责。

use rand::{TryRngCore, rngs::OsRng};

use crate::error::{ReferralError, Result};

/// 码字符表：A-Z 与 0-9
pub const CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// 码长度
pub const CODE_LENGTH: usize = 8;

/// 256 以内 36 的最大倍数，超出部分拒绝采样以保证均匀
const ACCEPT_BELOW: u8 = 252;

/// 单次生成允许的最大取随机字节轮数
const MAX_FILL_ROUNDS: usize = 8;

/// 推荐码生成接口
#[cfg_attr(test, mockall::automock)]
pub trait CodeGenerator: Send + Sync {
    /// 产出一个候选码，随机源失败时返回 RandomnessUnavailable
    fn generate(&self) -> Result<String>;
}

/// 基于操作系统安全随机源的生成器
#[derive(Debug, Clone, Copy, Default)]
pub struct SecureCodeGenerator;

impl SecureCodeGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl CodeGenerator for SecureCodeGenerator {
    fn generate(&self) -> Result<String> {
        let mut rng = OsRng;
        sample_code(|buf| {
            rng.try_fill_bytes(buf)
                .map_err(|e| ReferralError::RandomnessUnavailable(e.to_string()))
        })
    }
}

/// 校验码文本是否符合个人码格式
pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}

/// 从字节源拒绝采样出一个码
fn sample_code<F>(mut fill: F) -> Result<String>
where
    F: FnMut(&mut [u8]) -> Result<()>,
{
    let mut code = String::with_capacity(CODE_LENGTH);
    let mut buf = [0u8; 16];

    for _ in 0..MAX_FILL_ROUNDS {
        fill(&mut buf)?;

        for &byte in buf.iter().filter(|&&b| b < ACCEPT_BELOW) {
            code.push(CODE_ALPHABET[(byte % 36) as usize] as char);
            if code.len() == CODE_LENGTH {
                return Ok(code);
            }
        }
    }

    Err(ReferralError::RandomnessUnavailable(
        "entropy source produced degenerate output".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_secure_generator_format() {
        let generator = SecureCodeGenerator::new();

        for _ in 0..200 {
            let code = generator.generate().unwrap();
            assert!(is_well_formed(&code), "malformed code: {}", code);
        }
    }

    #[test]
    fn test_secure_generator_is_not_constant() {
        let generator = SecureCodeGenerator::new();
        let codes: HashSet<String> = (0..50).map(|_| generator.generate().unwrap()).collect();
        assert!(codes.len() > 45);
    }

    #[test]
    fn test_sample_code_maps_bytes_to_alphabet() {
        let code = sample_code(|buf| {
            for (i, b) in buf.iter_mut().enumerate() {
                *b = i as u8;
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(code, "ABCDEFGH");
    }

    #[test]
    fn test_sample_code_rejects_biased_bytes() {
        // 252..=255 被拒绝，35 映射到 '9'，36 回绕到 'A'
        let code = sample_code(|buf| {
            buf.copy_from_slice(&[255, 252, 35, 36, 253, 71, 0, 1, 254, 2, 3, 4, 5, 6, 7, 8]);
            Ok(())
        })
        .unwrap();

        assert_eq!(code, "9A9ABCDE");
    }

    #[test]
    fn test_sample_code_propagates_source_failure() {
        let result = sample_code(|_| Err(ReferralError::RandomnessUnavailable("closed".into())));
        assert!(matches!(result, Err(ReferralError::RandomnessUnavailable(_))));
    }

    #[test]
    fn test_sample_code_gives_up_on_degenerate_source() {
        let result = sample_code(|buf| {
            buf.fill(0xFF);
            Ok(())
        });
        assert!(matches!(result, Err(ReferralError::RandomnessUnavailable(_))));
    }

    #[test]
    fn test_is_well_formed() {
        assert!(is_well_formed("AB12CD34"));
        assert!(!is_well_formed("ab12cd34"));
        assert!(!is_well_formed("AB12CD3"));
        assert!(!is_well_formed("AB12-D34"));
    }
}
