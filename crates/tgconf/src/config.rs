//! the evaluated configuration
use crate::decode::ConfigFile;
use crate::dependency::Dependency;
use crate::error::Error;
use crate::value::{value_to_generic_map, GenericMap};

/// The `terraform` block
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize)]
pub struct TerraformConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Result of evaluating a configuration
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ResolvedConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terraform: Option<TerraformConfig>,
    pub terraform_binary: String,
    pub inputs: GenericMap,
    pub dependencies: Vec<Dependency>,
}

/// Combine the decoded file with the dependencies of the first pass
///
/// The second pass decodes the dependency blocks again but knows nothing about their outputs, those are taken from
/// `resolved` by name.
pub fn assemble(file: ConfigFile, resolved: &[Dependency]) -> Result<ResolvedConfiguration, Error> {
    let dependencies = file
        .dependencies
        .into_iter()
        .map(|mut dependency| {
            dependency.rendered_outputs = resolved
                .iter()
                .find(|candidate| candidate.name == dependency.name)
                .and_then(|candidate| candidate.rendered_outputs.clone());
            dependency
        })
        .collect();

    let inputs = match &file.inputs {
        Some(inputs) => value_to_generic_map(inputs)?,
        None => GenericMap::new(),
    };

    Ok(ResolvedConfiguration {
        terraform: file.terraform,
        terraform_binary: file.terraform_binary.unwrap_or_default(),
        inputs,
        dependencies,
    })
}
