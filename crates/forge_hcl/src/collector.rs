//! Variables and outputs registered by generators during a run.
//!
//! Both collectors deduplicate by name: the first registration wins and
//! later ones are ignored.

use forge_core::hcl::{escape_hcl_string, format_hcl_value};
use forge_core::{TerraformOutput, TerraformVariable};
use indexmap::IndexMap;
use tracing::debug;

#[derive(Debug, Default)]
pub struct VariableCollector {
    variables: IndexMap<String, TerraformVariable>,
}

impl VariableCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, variable: TerraformVariable) {
        if self.variables.contains_key(&variable.name) {
            debug!("Variable {} already collected; keeping first", variable.name);
            return;
        }
        self.variables.insert(variable.name.clone(), variable);
    }

    pub fn get_all(&self) -> Vec<TerraformVariable> {
        self.variables.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Contents of `variables.tf`.
    pub fn generate_variables_hcl(&self) -> String {
        self.variables
            .values()
            .map(render_variable)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn render_variable(v: &TerraformVariable) -> String {
    let mut lines = vec![
        format!("variable \"{}\" {{", v.name),
        format!("  type        = {}", v.var_type),
        format!("  description = \"{}\"", escape_hcl_string(&v.description)),
    ];
    if let Some(default) = &v.default_value {
        lines.push(format!("  default     = {}", format_hcl_value(default)));
    }
    if v.sensitive {
        lines.push("  sensitive   = true".to_string());
    }
    if let Some(validation) = &v.validation {
        lines.push("  validation {".to_string());
        lines.push(format!("    condition     = {}", validation.condition));
        lines.push(format!(
            "    error_message = \"{}\"",
            escape_hcl_string(&validation.error_message)
        ));
        lines.push("  }".to_string());
    }
    lines.push("}".to_string());
    lines.join("\n")
}

#[derive(Debug, Default)]
pub struct OutputCollector {
    outputs: IndexMap<String, TerraformOutput>,
}

impl OutputCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, output: TerraformOutput) {
        if !self.outputs.contains_key(&output.name) {
            self.outputs.insert(output.name.clone(), output);
        }
    }

    pub fn get_all(&self) -> Vec<TerraformOutput> {
        self.outputs.values().cloned().collect()
    }

    /// Contents of `outputs.tf`.
    pub fn generate_outputs_hcl(&self) -> String {
        self.outputs
            .values()
            .map(|o| {
                let mut lines = vec![
                    format!("output \"{}\" {{", o.name),
                    format!("  value       = {}", o.value),
                    format!("  description = \"{}\"", escape_hcl_string(&o.description)),
                ];
                if o.sensitive {
                    lines.push("  sensitive   = true".to_string());
                }
                lines.push("}".to_string());
                lines.join("\n")
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
