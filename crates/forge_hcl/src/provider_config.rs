//! `terraform.tf` and `providers.tf` contents for the providers in use.

use std::sync::Arc;

use forge_core::hcl::escape_hcl_string;
use forge_core::ProviderConfig;
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::config::BackendConfig;

/// Minimum Terraform version written to `required_version`.
pub const DEFAULT_TERRAFORM_VERSION: &str = ">= 1.0";

#[derive(Default)]
pub struct ProviderConfigBuilder {
    providers: IndexMap<String, (Arc<dyn ProviderConfig>, Map<String, Value>)>,
}

impl ProviderConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_provider(&mut self, config: Arc<dyn ProviderConfig>, user_config: Map<String, Value>) {
        self.providers.insert(config.id().to_string(), (config, user_config));
    }

    pub fn active_provider_ids(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    /// The `terraform { ... }` block with required providers and backend.
    pub fn generate_terraform_block(&self, terraform_version: &str, backend: Option<&BackendConfig>) -> String {
        let mut lines = vec![
            "terraform {".to_string(),
            format!("  required_version = \"{}\"", terraform_version),
            String::new(),
        ];

        if !self.providers.is_empty() {
            lines.push("  required_providers {".to_string());
            for (config, _) in self.providers.values() {
                lines.push(config.generate_required_provider());
            }
            lines.push("  }".to_string());
        }

        if let Some(backend) = backend {
            lines.push(String::new());
            lines.push(format!("  backend \"{}\" {{", backend.backend_type));
            for (key, value) in &backend.config {
                lines.push(format!("    {} = \"{}\"", key, escape_hcl_string(value)));
            }
            lines.push("  }".to_string());
        }

        lines.push("}".to_string());
        lines.join("\n")
    }

    /// One `provider` block per active provider.
    pub fn generate_provider_blocks(&self) -> String {
        self.providers
            .values()
            .map(|(config, user_config)| config.generate_provider_block(user_config))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestProvider;

    impl ProviderConfig for TestProvider {
        fn id(&self) -> &str {
            "azurerm"
        }

        fn display_name(&self) -> &str {
            "Azure"
        }

        fn source(&self) -> &str {
            "hashicorp/azurerm"
        }

        fn version(&self) -> &str {
            "~> 4.0"
        }

        fn generate_provider_block(&self, config: &Map<String, Value>) -> String {
            format!("provider \"azurerm\" {{\n  features {{}}\n  # {} setting(s)\n}}", config.len())
        }
    }

    #[test]
    fn test_terraform_block_without_providers() {
        let builder = ProviderConfigBuilder::new();
        assert_eq!(
            builder.generate_terraform_block(DEFAULT_TERRAFORM_VERSION, None),
            "terraform {\n  required_version = \">= 1.0\"\n\n}"
        );
        assert_eq!(builder.generate_provider_blocks(), "");
    }

    #[test]
    fn test_terraform_block_with_provider_and_backend() {
        let mut builder = ProviderConfigBuilder::new();
        builder.add_provider(Arc::new(TestProvider), Map::new());

        let mut config = IndexMap::new();
        config.insert("resource_group_name".to_string(), "rg-state".to_string());
        config.insert("key".to_string(), "prod.tfstate".to_string());
        let backend = BackendConfig {
            backend_type: "azurerm".to_string(),
            config,
        };

        let expected = r#"terraform {
  required_version = ">= 1.0"

  required_providers {
    azurerm = {
      source  = "hashicorp/azurerm"
      version = "~> 4.0"
    }
  }

  backend "azurerm" {
    resource_group_name = "rg-state"
    key = "prod.tfstate"
  }
}"#;
        assert_eq!(builder.generate_terraform_block(">= 1.0", Some(&backend)), expected);
        assert_eq!(builder.active_provider_ids(), vec!["azurerm"]);
    }

    #[test]
    fn test_provider_blocks_receive_user_config() {
        let mut builder = ProviderConfigBuilder::new();
        let mut user = Map::new();
        user.insert("subscription_id".to_string(), Value::String("abc".to_string()));
        builder.add_provider(Arc::new(TestProvider), user);
        assert!(builder.generate_provider_blocks().contains("# 1 setting(s)"));
    }
}
