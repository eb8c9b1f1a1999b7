//! Groups sorted blocks into output files.

use std::fs;
use std::path::{Path, PathBuf};

use forge_core::{BlockType, HclBlock};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::HclResult;

/// Generated Terraform configuration, one field per file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFiles {
    #[serde(rename = "terraform.tf")]
    pub terraform_tf: String,
    #[serde(rename = "providers.tf")]
    pub providers_tf: String,
    #[serde(rename = "main.tf")]
    pub main_tf: String,
    #[serde(rename = "variables.tf")]
    pub variables_tf: String,
    #[serde(rename = "outputs.tf")]
    pub outputs_tf: String,
    #[serde(rename = "locals.tf")]
    pub locals_tf: String,
    #[serde(rename = "terraform.tfvars", default, skip_serializing_if = "Option::is_none")]
    pub terraform_tfvars: Option<String>,
}

impl GeneratedFiles {
    /// `(file name, contents)` pairs in a fixed order.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        let mut entries = vec![
            ("terraform.tf", self.terraform_tf.as_str()),
            ("providers.tf", self.providers_tf.as_str()),
            ("main.tf", self.main_tf.as_str()),
            ("variables.tf", self.variables_tf.as_str()),
            ("outputs.tf", self.outputs_tf.as_str()),
            ("locals.tf", self.locals_tf.as_str()),
        ];
        if let Some(tfvars) = &self.terraform_tfvars {
            entries.push(("terraform.tfvars", tfvars.as_str()));
        }
        entries
    }

    pub fn get(&self, file_name: &str) -> Option<&str> {
        self.entries()
            .into_iter()
            .find(|(name, _)| *name == file_name)
            .map(|(_, content)| content)
    }

    /// Write every file into `dir`, creating it if needed. Each file ends
    /// with a trailing newline.
    pub fn write_to(&self, dir: &Path) -> HclResult<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let mut written = Vec::new();
        for (name, content) in self.entries() {
            let path = dir.join(name);
            let mut body = content.to_string();
            if !body.is_empty() && !body.ends_with('\n') {
                body.push('\n');
            }
            fs::write(&path, body)?;
            written.push(path);
        }
        info!("Wrote {} Terraform files to {}", written.len(), dir.display());
        Ok(written)
    }
}

#[derive(Debug, Default)]
pub struct HclBlockBuilder;

impl HclBlockBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Route resource and data blocks to `main.tf`. Variable, output and
    /// locals blocks emitted by generators are appended after the
    /// collected ones in their own files.
    pub fn assemble(
        &self,
        sorted_blocks: &[HclBlock],
        terraform_block: String,
        provider_blocks: String,
        variables_hcl: String,
        outputs_hcl: String,
        locals_hcl: String,
    ) -> GeneratedFiles {
        GeneratedFiles {
            terraform_tf: terraform_block,
            providers_tf: provider_blocks,
            main_tf: contents_of(sorted_blocks, &[BlockType::Resource, BlockType::Data]).join("\n\n"),
            variables_tf: join_sections(&variables_hcl, contents_of(sorted_blocks, &[BlockType::Variable])),
            outputs_tf: join_sections(&outputs_hcl, contents_of(sorted_blocks, &[BlockType::Output])),
            locals_tf: join_sections(&locals_hcl, contents_of(sorted_blocks, &[BlockType::Locals])),
            terraform_tfvars: None,
        }
    }
}

fn contents_of<'a>(blocks: &'a [HclBlock], types: &[BlockType]) -> Vec<&'a str> {
    blocks
        .iter()
        .filter(|b| types.contains(&b.block_type))
        .map(|b| b.content.as_str())
        .collect()
}

fn join_sections(head: &str, extra: Vec<&str>) -> String {
    std::iter::once(head)
        .chain(extra)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn assemble(blocks: &[HclBlock], variables: &str) -> GeneratedFiles {
        HclBlockBuilder::new().assemble(
            blocks,
            "terraform {}".into(),
            "provider \"azurerm\" {}".into(),
            variables.into(),
            String::new(),
            String::new(),
        )
    }

    #[test]
    fn test_blocks_routed_by_type() {
        let blocks = vec![
            HclBlock::resource("azurerm_resource_group", "rg", "resource \"azurerm_resource_group\" \"rg\" {}"),
            HclBlock::anonymous(BlockType::Variable, "variable \"extra\" {}"),
            HclBlock::data("azurerm_client_config", "current", "data \"azurerm_client_config\" \"current\" {}"),
            HclBlock::anonymous(BlockType::Output, "output \"o\" {}"),
        ];
        let files = assemble(&blocks, "variable \"collected\" {}");

        assert_eq!(
            files.main_tf,
            "resource \"azurerm_resource_group\" \"rg\" {}\n\ndata \"azurerm_client_config\" \"current\" {}"
        );
        assert_eq!(files.variables_tf, "variable \"collected\" {}\n\nvariable \"extra\" {}");
        assert_eq!(files.outputs_tf, "output \"o\" {}");
        assert_eq!(files.locals_tf, "");
    }

    #[test]
    fn test_write_to_directory() {
        let dir = tempdir().unwrap();
        let mut files = assemble(&[], "");
        files.terraform_tfvars = Some("location = \"eastus\"".into());

        let written = files.write_to(&dir.path().join("out")).unwrap();
        assert_eq!(written.len(), 7);
        let tfvars = fs::read_to_string(dir.path().join("out/terraform.tfvars")).unwrap();
        assert_eq!(tfvars, "location = \"eastus\"\n");
        assert_eq!(fs::read_to_string(dir.path().join("out/main.tf")).unwrap(), "");
        assert_eq!(files.get("providers.tf"), Some("provider \"azurerm\" {}"));
    }

    #[test]
    fn test_serialized_file_names() {
        let json = serde_json::to_value(assemble(&[], "")).unwrap();
        assert!(json.get("main.tf").is_some());
        assert!(json.get("terraform.tfvars").is_none());
    }
}
