//! test_utils 模块的集成测试

use referral_shared::test_utils::*;

#[test]
fn test_user_ids_are_unique() {
    assert_ne!(test_user_id(), test_user_id());
}

#[test]
fn test_general_code_shape() {
    let code = test_general_code("launch");
    assert_eq!(code.len(), 12);
    assert!(code.starts_with("LAUNCH"));
    assert_eq!(code, code.to_uppercase());
}

#[test]
fn test_redis_config_is_enabled_for_tests() {
    assert!(test_redis_config().enabled);
    assert_eq!(test_database_config().max_connections, 5);
}
