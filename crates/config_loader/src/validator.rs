//! 配置校验模块
//!
//! 校验规则：
//! - 至少一个 category
//! - category 名称唯一且非空
//! - pool_size >= 1，至少一个 lookup 地址 (validator derive)
//! - lookup 地址为 `host:port`，不带 scheme

use std::collections::HashSet;
use validator::Validate;

use contracts::{ContractError, ManagerConfig, ProducerManagerConfig};

/// 校验 ManagerConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &ManagerConfig) -> Result<(), ContractError> {
    validate_not_empty(config)?;
    validate_categories(config)?;
    validate_category_names(config)?;
    validate_lookup_addresses(config)?;
    Ok(())
}

fn validate_not_empty(config: &ManagerConfig) -> Result<(), ContractError> {
    if config.categories.is_empty() {
        return Err(ContractError::config_validation(
            "categories",
            "at least one category is required",
        ));
    }
    Ok(())
}

/// 字段级规则 (validator derive)
fn validate_categories(config: &ManagerConfig) -> Result<(), ContractError> {
    for (idx, category) in config.categories.iter().enumerate() {
        category.validate().map_err(|e| {
            ContractError::config_validation(
                format!("categories[{idx}] ({})", category.category),
                e.to_string(),
            )
        })?;
    }
    Ok(())
}

/// 校验 category 唯一性
fn validate_category_names(config: &ManagerConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for category in &config.categories {
        if !seen.insert(&category.category) {
            return Err(ContractError::config_validation(
                format!("categories[category={}]", category.category),
                "duplicate category",
            ));
        }
    }
    Ok(())
}

/// 校验 lookup 地址格式
fn validate_lookup_addresses(config: &ManagerConfig) -> Result<(), ContractError> {
    for category in &config.categories {
        for (idx, address) in category.lookup_addresses().iter().enumerate() {
            check_address(category, idx, address)?;
        }
    }
    Ok(())
}

fn check_address(
    category: &ProducerManagerConfig,
    idx: usize,
    address: &str,
) -> Result<(), ContractError> {
    let field = || format!("{}.producer_configs[{idx}].address", category.category);

    if address.contains("://") {
        return Err(ContractError::config_validation(
            field(),
            format!("'{address}' must be host:port without a scheme"),
        ));
    }

    let valid_port = address
        .rsplit_once(':')
        .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
    if !valid_port {
        return Err(ContractError::config_validation(
            field(),
            format!("'{address}' is not a host:port address"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> ManagerConfig {
        ManagerConfig {
            categories: vec![
                ProducerManagerConfig::new("orders", ["lookup-a:4161"], 2),
                ProducerManagerConfig::new("audit", ["lookup-a:4161", "lookup-b:4161"], 1),
            ],
        }
        .with_defaults()
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&minimal_config()).is_ok());
    }

    #[test]
    fn test_no_categories() {
        let err = validate(&ManagerConfig::default()).unwrap_err().to_string();
        assert!(err.contains("at least one category"), "got: {err}");
    }

    #[test]
    fn test_duplicate_category() {
        let mut config = minimal_config();
        config.categories.push(config.categories[0].clone());
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("duplicate category"), "got: {err}");
    }

    #[test]
    fn test_zero_pool_size() {
        let mut config = minimal_config();
        config.categories[1].pool_size = 0;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("pool_size must be >= 1"), "got: {err}");
    }

    #[test]
    fn test_empty_category_name() {
        let mut config = minimal_config();
        config.categories[0].category = String::new();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("category cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_no_lookup_addresses() {
        let mut config = minimal_config();
        config.categories[0].producer_configs.clear();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("at least one lookup address"), "got: {err}");
    }

    #[test]
    fn test_address_with_scheme() {
        let mut config = minimal_config();
        config.categories[0].producer_configs[0].address = "http://lookup-a:4161".into();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("without a scheme"), "got: {err}");
    }

    #[test]
    fn test_address_without_port() {
        let mut config = minimal_config();
        config.categories[0].producer_configs[0].address = "lookup-a".into();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("not a host:port"), "got: {err}");
    }
}
