//! Naming convention templates.
//!
//! Templates use `{type}`, `{env}`, `{name}`, `{region}` and `{org}` tokens,
//! e.g. `{org}-{type}-{env}-{name}`. The first three are always substituted;
//! `{region}` and `{org}` are optional and vanish together with one adjacent
//! separator when absent.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::schema::ResourceSchema;

/// Stand-in for `{name}` when deriving the template's prefix and suffix.
/// Lowercase so it survives the `lowercase` constraint.
const SLUG_SENTINEL: &str = "___slug___";

static REGION_TOKEN: Lazy<Regex> = Lazy::new(|| optional_token_pattern("region"));
static ORG_TOKEN: Lazy<Regex> = Lazy::new(|| optional_token_pattern("org"));
static NON_IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_]").unwrap());
static LEADING_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9_]+").unwrap());

/// Leading separator, trailing separator, or the bare token, in that order.
fn optional_token_pattern(key: &str) -> Regex {
    Regex::new(&format!(
        r"(?:[-_.]\{{{key}\}}|\{{{key}\}}[-_.]|\{{{key}\}})",
        key = key
    ))
    .unwrap()
}

/// Resource-specific restrictions applied after substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamingConstraints {
    #[serde(default)]
    pub lowercase: bool,
    #[serde(default)]
    pub no_hyphens: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

impl NamingConstraints {
    pub fn lowercase() -> Self {
        Self {
            lowercase: true,
            ..Self::default()
        }
    }

    /// Storage-account style: lowercase alphanumerics with a length cap.
    pub fn compact(max_length: usize) -> Self {
        Self {
            lowercase: true,
            no_hyphens: true,
            max_length: Some(max_length),
        }
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }
}

/// Project-level naming convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamingConvention {
    #[serde(default)]
    pub enabled: bool,
    pub template: String,
    pub env: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self {
            enabled: false,
            template: "{type}-{env}-{name}".to_string(),
            env: "dev".to_string(),
            region: None,
            org: None,
        }
    }
}

impl NamingConvention {
    /// Full resource name for `slug` under this convention.
    pub fn resource_name(&self, schema: &ResourceSchema, slug: &str) -> String {
        let abbreviation = schema.caf_abbreviation.as_deref().unwrap_or(schema.type_id.resource());
        let tokens = build_tokens(self, abbreviation, slug);
        apply_naming_template(&self.template, &tokens, schema.naming_constraints.as_ref())
    }

    /// Inverse of [`resource_name`](Self::resource_name).
    pub fn slug_of(&self, schema: &ResourceSchema, full_name: &str) -> String {
        let abbreviation = schema.caf_abbreviation.as_deref().unwrap_or(schema.type_id.resource());
        let tokens = build_tokens(self, abbreviation, "");
        extract_slug(full_name, &self.template, &tokens, schema.naming_constraints.as_ref())
    }
}

/// Token values for a single substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamingTokens {
    pub resource_type: String,
    pub env: String,
    pub name: String,
    pub region: Option<String>,
    pub org: Option<String>,
}

impl NamingTokens {
    pub fn new(resource_type: impl Into<String>, env: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            env: env.into(),
            name: name.into(),
            region: None,
            org: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_org(mut self, org: impl Into<String>) -> Self {
        self.org = Some(org.into());
        self
    }
}

/// Token map from a convention plus a resource's CAF abbreviation.
pub fn build_tokens(convention: &NamingConvention, caf_abbreviation: &str, name: &str) -> NamingTokens {
    NamingTokens {
        resource_type: caf_abbreviation.to_string(),
        env: convention.env.clone(),
        name: name.to_string(),
        region: convention.region.clone(),
        org: convention.org.clone(),
    }
}

fn substitute_optional(result: String, pattern: &Regex, token: &str, value: Option<&str>) -> String {
    match value.filter(|v| !v.is_empty()) {
        Some(v) => result.replace(token, v),
        None => pattern.replace_all(&result, "").into_owned(),
    }
}

/// Substitute tokens into `template` and apply `constraints`.
///
/// Constraints run in a fixed order: lowercase, hyphen stripping, truncation.
pub fn apply_naming_template(template: &str, tokens: &NamingTokens, constraints: Option<&NamingConstraints>) -> String {
    let mut result = template
        .replace("{type}", &tokens.resource_type)
        .replace("{env}", &tokens.env)
        .replace("{name}", &tokens.name);

    result = substitute_optional(result, &REGION_TOKEN, "{region}", tokens.region.as_deref());
    result = substitute_optional(result, &ORG_TOKEN, "{org}", tokens.org.as_deref());

    if let Some(constraints) = constraints {
        if constraints.lowercase {
            result = result.to_lowercase();
        }
        if constraints.no_hyphens {
            result = result.replace('-', "");
        }
        if let Some(max) = constraints.max_length {
            if result.chars().count() > max {
                result = result.chars().take(max).collect();
            }
        }
    }

    result
}

/// Recover the `{name}` slug from a full name generated by `template`.
///
/// Names that do not follow the template (hand-edited, truncated) come back
/// unchanged.
pub fn extract_slug(
    full_name: &str,
    template: &str,
    tokens: &NamingTokens,
    constraints: Option<&NamingConstraints>,
) -> String {
    // Truncation would eat the sentinel, so the shape is taken untruncated.
    let shape_constraints = constraints.map(|c| NamingConstraints {
        max_length: None,
        ..c.clone()
    });
    let sentinel_tokens = NamingTokens {
        name: SLUG_SENTINEL.to_string(),
        ..tokens.clone()
    };
    let with_sentinel = apply_naming_template(template, &sentinel_tokens, shape_constraints.as_ref());

    let parts: Vec<&str> = with_sentinel.split(SLUG_SENTINEL).collect();
    let &[prefix, suffix] = parts.as_slice() else {
        return full_name.to_string();
    };

    let Some(without_prefix) = full_name.strip_prefix(prefix) else {
        return full_name.to_string();
    };
    let Some(slug) = without_prefix.strip_suffix(suffix) else {
        return full_name.to_string();
    };

    if slug.is_empty() {
        full_name.to_string()
    } else {
        slug.to_string()
    }
}

/// Convert a cloud resource name into a valid Terraform identifier.
pub fn sanitize_terraform_name(name: &str) -> String {
    let replaced = NON_IDENTIFIER.replace_all(name, "_").to_lowercase();
    let trimmed = LEADING_DIGITS.replace(&replaced, "");
    if trimmed.is_empty() {
        "resource".to_string()
    } else {
        trimmed.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> NamingTokens {
        NamingTokens::new("vm", "dev", "web")
    }

    #[test]
    fn test_required_tokens() {
        assert_eq!(apply_naming_template("{type}-{name}-{env}", &tokens(), None), "vm-web-dev");
    }

    #[test]
    fn test_missing_optional_token_takes_separator() {
        assert_eq!(apply_naming_template("{org}-{name}", &tokens(), None), "web");
        assert_eq!(apply_naming_template("{name}-{org}", &tokens(), None), "web");
        assert_eq!(apply_naming_template("{type}-{region}-{env}-{name}", &tokens(), None), "vm-dev-web");
        assert_eq!(apply_naming_template("{type}_{org}_{name}", &tokens(), None), "vm_web");
        assert_eq!(apply_naming_template("{org}", &tokens(), None), "");
    }

    #[test]
    fn test_present_optional_tokens() {
        let t = tokens().with_org("contoso").with_region("eus2");
        assert_eq!(
            apply_naming_template("{org}-{type}-{region}-{env}-{name}", &t, None),
            "contoso-vm-eus2-dev-web"
        );
    }

    #[test]
    fn test_empty_optional_value_counts_as_absent() {
        let t = tokens().with_org("");
        assert_eq!(apply_naming_template("{org}-{name}", &t, None), "web");
    }

    #[test]
    fn test_constraints_order() {
        let t = NamingTokens::new("ST", "Dev", "My-Logs");
        let c = NamingConstraints::compact(10);
        // lowercase -> "st-dev-my-logs", no hyphens -> "stdevmylogs", truncate -> 10 chars
        assert_eq!(apply_naming_template("{type}-{env}-{name}", &t, Some(&c)), "stdevmylog");
    }

    #[test]
    fn test_extract_slug_roundtrip() {
        let t = tokens().with_org("contoso");
        let template = "{org}-{type}-{env}-{name}";
        let full = apply_naming_template(template, &NamingTokens { name: "api".into(), ..t.clone() }, None);
        assert_eq!(full, "contoso-vm-dev-api");
        assert_eq!(extract_slug(&full, template, &t, None), "api");
    }

    #[test]
    fn test_extract_slug_with_suffix() {
        let t = tokens();
        assert_eq!(extract_slug("vm-api-dev", "{type}-{name}-{env}", &t, None), "api");
    }

    #[test]
    fn test_extract_slug_with_lowercase_constraint() {
        let t = NamingTokens::new("KV", "Prod", "");
        let c = NamingConstraints::lowercase();
        assert_eq!(extract_slug("kv-prod-secrets", "{type}-{env}-{name}", &t, Some(&c)), "secrets");
    }

    #[test]
    fn test_extract_slug_falls_back_on_mismatch() {
        let t = tokens();
        assert_eq!(extract_slug("hand-edited", "{type}-{env}-{name}", &t, None), "hand-edited");
        assert_eq!(extract_slug("vm-dev-", "{type}-{env}-{name}", &t, None), "vm-dev-");
        assert_eq!(extract_slug("anything", "{type}-{env}", &t, None), "anything");
    }

    #[test]
    fn test_sanitize_terraform_name() {
        assert_eq!(sanitize_terraform_name("rg-My-App"), "rg_my_app");
        assert_eq!(sanitize_terraform_name("web.api@1"), "web_api_1");
        assert_eq!(sanitize_terraform_name("1st-vnet"), "st_vnet");
        assert_eq!(sanitize_terraform_name("---"), "resource");
    }

    #[test]
    fn test_convention_resource_name() {
        let schema = ResourceSchema::new("azurerm/storage/storage_account", "Storage Account", "azurerm_storage_account")
            .with_naming("st", NamingConstraints::compact(24));
        let convention = NamingConvention {
            enabled: true,
            template: "{type}-{org}-{env}-{name}".into(),
            env: "prod".into(),
            region: None,
            org: Some("Contoso".into()),
        };
        assert_eq!(convention.resource_name(&schema, "logs"), "stcontosoprodlogs");
    }
}
