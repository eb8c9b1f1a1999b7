//! Edge legality checks driven by registered connection rules.

use serde::{Deserialize, Serialize};

use crate::connection::{ConnectionRule, ReferenceSide};
use crate::schema::ResourceTypeId;

/// Prefix of dynamic computed-output source handles, e.g. `out-connection_string`.
pub const OUTPUT_HANDLE_PREFIX: &str = "out-";

/// A target handle that accepts edges from any `out-*` port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputAcceptingHandle {
    pub type_id: ResourceTypeId,
    pub handle_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeValidationResult {
    pub valid: bool,
    pub rule: Option<ConnectionRule>,
    pub reason: Option<String>,
}

impl EdgeValidationResult {
    fn allowed(rule: ConnectionRule) -> Self {
        Self {
            valid: true,
            rule: Some(rule),
            reason: None,
        }
    }

    fn rejected(reason: String) -> Self {
        Self {
            valid: false,
            rule: None,
            reason: Some(reason),
        }
    }
}

/// Where a connection writes its reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceWrite {
    /// Instance that receives the reference.
    pub instance_id: String,
    pub property_key: String,
    pub side: ReferenceSide,
}

/// Decides whether two node handles may be connected.
#[derive(Debug, Clone, Default)]
pub struct EdgeRuleValidator {
    rules: Vec<ConnectionRule>,
    output_handles: Vec<OutputAcceptingHandle>,
}

impl EdgeRuleValidator {
    pub fn new(rules: Vec<ConnectionRule>, output_handles: Vec<OutputAcceptingHandle>) -> Self {
        Self { rules, output_handles }
    }

    pub fn rules(&self) -> &[ConnectionRule] {
        &self.rules
    }

    pub fn output_handles(&self) -> &[OutputAcceptingHandle] {
        &self.output_handles
    }

    fn accepts_outputs(&self, type_id: &ResourceTypeId, handle: &str) -> bool {
        self.output_handles
            .iter()
            .any(|h| &h.type_id == type_id && h.handle_id == handle)
    }

    fn synthesize_binding(
        source_type: &ResourceTypeId,
        source_handle: &str,
        target_type: &ResourceTypeId,
        target_handle: &str,
    ) -> Option<ConnectionRule> {
        let attribute = source_handle.strip_prefix(OUTPUT_HANDLE_PREFIX)?;
        Some(
            ConnectionRule::new(source_type.clone(), source_handle, target_type.clone(), target_handle)
                .with_label(format!("Binds {}", attribute))
                .with_output_binding(attribute),
        )
    }

    /// Check a prospective edge. Exact rules win over synthesized output bindings.
    pub fn validate(
        &self,
        source_type: &ResourceTypeId,
        source_handle: &str,
        target_type: &ResourceTypeId,
        target_handle: &str,
    ) -> EdgeValidationResult {
        if let Some(rule) = self
            .rules
            .iter()
            .find(|r| r.matches(source_type, source_handle, target_type, target_handle))
        {
            return EdgeValidationResult::allowed(rule.clone());
        }

        if source_handle.starts_with(OUTPUT_HANDLE_PREFIX) && self.accepts_outputs(target_type, target_handle) {
            if let Some(rule) = Self::synthesize_binding(source_type, source_handle, target_type, target_handle) {
                return EdgeValidationResult::allowed(rule);
            }
        }

        EdgeValidationResult::rejected(format!(
            "No connection rule allows {}[{}] -> {}[{}]",
            source_type, source_handle, target_type, target_handle
        ))
    }

    /// Every rule an edge starting at `(source_type, source_handle)` could follow.
    pub fn get_valid_targets(&self, source_type: &ResourceTypeId, source_handle: &str) -> Vec<ConnectionRule> {
        let mut targets: Vec<ConnectionRule> = self
            .rules
            .iter()
            .filter(|r| &r.source_type == source_type && r.source_handle == source_handle)
            .cloned()
            .collect();

        if source_handle.starts_with(OUTPUT_HANDLE_PREFIX) {
            for handle in &self.output_handles {
                let already = targets
                    .iter()
                    .any(|r| r.target_type == handle.type_id && r.target_handle == handle.handle_id);
                if already {
                    continue;
                }
                if let Some(rule) = Self::synthesize_binding(source_type, source_handle, &handle.type_id, &handle.handle_id) {
                    targets.push(rule);
                }
            }
        }

        targets
    }

    /// Every declared rule ending at `(target_type, target_handle)`.
    pub fn get_valid_sources(&self, target_type: &ResourceTypeId, target_handle: &str) -> Vec<ConnectionRule> {
        self.rules
            .iter()
            .filter(|r| &r.target_type == target_type && r.target_handle == target_handle)
            .cloned()
            .collect()
    }

    /// Reference implied by a connected edge. With `side == Source` the
    /// source is the referenced resource, so the target stores the reference.
    pub fn get_reference_from_rule(
        &self,
        rule: &ConnectionRule,
        source_instance_id: &str,
        target_instance_id: &str,
    ) -> Option<ReferenceWrite> {
        let creates = rule.creates_reference.as_ref()?;
        let instance_id = match creates.side {
            ReferenceSide::Source => target_instance_id,
            ReferenceSide::Target => source_instance_id,
        };
        Some(ReferenceWrite {
            instance_id: instance_id.to_string(),
            property_key: creates.property_key.clone(),
            side: creates.side,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nsg() -> ResourceTypeId {
        ResourceTypeId::new("azurerm/networking/network_security_group")
    }

    fn subnet() -> ResourceTypeId {
        ResourceTypeId::new("azurerm/networking/subnet")
    }

    fn key_vault() -> ResourceTypeId {
        ResourceTypeId::new("azurerm/security/key_vault")
    }

    fn validator() -> EdgeRuleValidator {
        EdgeRuleValidator::new(
            vec![ConnectionRule::new(nsg(), "nsg-out", subnet(), "nsg-in")
                .creates_reference(ReferenceSide::Source, "network_security_group_id")],
            vec![OutputAcceptingHandle {
                type_id: key_vault(),
                handle_id: "secret-in".to_string(),
            }],
        )
    }

    #[test]
    fn test_exact_rule_match() {
        let result = validator().validate(&nsg(), "nsg-out", &subnet(), "nsg-in");
        assert!(result.valid);
        assert!(result.rule.unwrap().creates_reference.is_some());
    }

    #[test]
    fn test_unknown_edge_rejected_with_reason() {
        let result = validator().validate(&subnet(), "nsg-in", &nsg(), "nsg-out");
        assert!(!result.valid);
        assert!(result.reason.unwrap().contains("No connection rule allows"));
    }

    #[test]
    fn test_output_binding_synthesized() {
        let sql = ResourceTypeId::new("azurerm/database/mssql_server");
        let result = validator().validate(&sql, "out-connection_string", &key_vault(), "secret-in");
        assert!(result.valid);
        let rule = result.rule.unwrap();
        assert_eq!(rule.output_binding.unwrap().source_attribute, "connection_string");
    }

    #[test]
    fn test_output_port_to_plain_handle_rejected() {
        let sql = ResourceTypeId::new("azurerm/database/mssql_server");
        assert!(!validator().validate(&sql, "out-id", &subnet(), "nsg-in").valid);
    }

    #[test]
    fn test_valid_targets_include_output_handles() {
        let sql = ResourceTypeId::new("azurerm/database/mssql_server");
        let targets = validator().get_valid_targets(&sql, "out-fqdn");
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].target_type, key_vault());

        assert_eq!(validator().get_valid_targets(&nsg(), "nsg-out").len(), 1);
        assert!(validator().get_valid_targets(&nsg(), "other").is_empty());
    }

    #[test]
    fn test_valid_sources() {
        let sources = validator().get_valid_sources(&subnet(), "nsg-in");
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].source_type, nsg());
    }

    #[test]
    fn test_reference_write_side() {
        let v = validator();
        let rule = &v.rules()[0];
        let write = v.get_reference_from_rule(rule, "nsg-1", "subnet-1").unwrap();
        assert_eq!(write.instance_id, "subnet-1");
        assert_eq!(write.property_key, "network_security_group_id");

        let plain = ConnectionRule::new(nsg(), "a", subnet(), "b");
        assert!(v.get_reference_from_rule(&plain, "x", "y").is_none());
    }
}
