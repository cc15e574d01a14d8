//! structural decoding of configuration bodies
//!
//! Decoding checks the shape of a body (known attributes and blocks, label counts, no duplicates) and evaluates
//! attribute expressions against an [EvalContext]. There are two entry points:
//! - [Decoder::decode_dependencies]: only `dependency` blocks, everything else is ignored (first pass)
//! - [Decoder::decode_config_file]: the whole document (second pass)
//!
//! Supported document shape:
//!
//! ```hcl
//! terraform {
//!   source = "git::https://example.com/modules.git//app"
//! }
//!
//! terraform_binary = "tofu"
//!
//! include "root" { /* not decoded */ }
//!
//! dependency "db" {
//!   config_path                             = "../db"
//!   skip_outputs                            = false
//!   mock_outputs                            = { endpoint = "10.0.0.5" }
//!   mock_outputs_allowed_terraform_commands = ["validate", "plan"]
//!   mock_outputs_merge_with_state           = true
//! }
//!
//! inputs = {
//!   endpoint = dependency.db.outputs.endpoint
//! }
//! ```
use crate::config::TerraformConfig;
use crate::context::{EvalContext, DEPENDENCY_VARIABLE};
use crate::dependency::Dependency;
use crate::document::Document;
use crate::error::{DecodeError, DecodeErrorKind};
use crate::value::Value;
use crate::visit::VisitTraversals;
use hcl::eval::Evaluate;
use hcl::{Attribute, Block, Body, Expression, Structure, Traversal, TraversalOperator};
use indexmap::IndexMap;

const TERRAFORM: &str = "terraform";
const TERRAFORM_BINARY: &str = "terraform_binary";
const INPUTS: &str = "inputs";
const DEPENDENCY: &str = "dependency";
const INCLUDE: &str = "include";

const CONFIG_PATH: &str = "config_path";
const SKIP_OUTPUTS: &str = "skip_outputs";
const MOCK_OUTPUTS: &str = "mock_outputs";
const MOCK_OUTPUTS_ALLOWED_TERRAFORM_COMMANDS: &str = "mock_outputs_allowed_terraform_commands";
const MOCK_OUTPUTS_MERGE_WITH_STATE: &str = "mock_outputs_merge_with_state";
const SOURCE: &str = "source";

/// Decode target of the second pass
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConfigFile {
    pub terraform: Option<TerraformConfig>,
    pub terraform_binary: Option<String>,
    pub inputs: Option<Value>,
    pub dependencies: Vec<Dependency>,
    pub includes: Vec<Include>,
}

/// An `include` block
///
/// The body is not evaluated (includes are not followed) but kept for callers that resolve includes themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct Include {
    pub name: String,
    pub body: Body,
}

pub struct Decoder<'a> {
    filename: &'a str,
    context: hcl::eval::Context<'static>,
}

impl<'a> Decoder<'a> {
    pub fn new(filename: &'a str, context: &EvalContext) -> Self {
        Self {
            filename,
            context: context.to_hcl(),
        }
    }

    fn error(&self, kind: DecodeErrorKind) -> DecodeError {
        DecodeError::new(self.filename.to_string(), kind)
    }

    /// Decode all `dependency` blocks and ignore everything else
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn decode_dependencies(&self, body: &Body) -> Result<Vec<Dependency>, DecodeError> {
        let mut dependencies: Vec<Dependency> = vec![];

        for block in body.blocks().filter(|block| block.identifier() == DEPENDENCY) {
            let dependency = self.decode_dependency(block)?;
            self.push_dependency(&mut dependencies, dependency)?;
        }

        Ok(dependencies)
    }

    /// Decode the whole document
    ///
    /// Returns `None` for a body without any attributes or blocks.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn decode_config_file(&self, body: &Body) -> Result<Option<ConfigFile>, DecodeError> {
        if body.iter().next().is_none() {
            return Ok(None);
        }

        let mut file = ConfigFile::default();
        let mut seen_attributes: Vec<&str> = vec![];

        for structure in body.iter() {
            match structure {
                Structure::Attribute(attribute) => {
                    let key = attribute.key();
                    if seen_attributes.contains(&key) {
                        return Err(self.error(DecodeErrorKind::DuplicateArgument {
                            name: key.to_string(),
                        }));
                    }
                    seen_attributes.push(key);

                    match key {
                        TERRAFORM_BINARY => file.terraform_binary = self.string(attribute)?,
                        INPUTS => file.inputs = Some(self.value(attribute)?),
                        _ => {
                            return Err(self.error(DecodeErrorKind::UnsupportedArgument {
                                name: key.to_string(),
                            }))
                        }
                    }
                }
                Structure::Block(block) => match block.identifier() {
                    TERRAFORM => {
                        if file.terraform.is_some() {
                            return Err(self.error(DecodeErrorKind::DuplicateBlock {
                                name: TERRAFORM.to_string(),
                            }));
                        }
                        file.terraform = Some(self.decode_terraform(block)?);
                    }
                    DEPENDENCY => {
                        let dependency = self.decode_dependency(block)?;
                        self.push_dependency(&mut file.dependencies, dependency)?;
                    }
                    INCLUDE => {
                        let name = self.single_label(block)?;
                        file.includes.push(Include {
                            name,
                            body: block.body().clone(),
                        });
                    }
                    other => {
                        return Err(self.error(DecodeErrorKind::UnsupportedBlock {
                            name: other.to_string(),
                        }))
                    }
                },
            }
        }

        Ok(Some(file))
    }

    fn push_dependency(
        &self,
        dependencies: &mut Vec<Dependency>,
        dependency: Dependency,
    ) -> Result<(), DecodeError> {
        if dependencies
            .iter()
            .any(|existing| existing.name == dependency.name)
        {
            return Err(self.error(DecodeErrorKind::DuplicateDependency {
                name: dependency.name,
            }));
        }

        dependencies.push(dependency);
        Ok(())
    }

    fn decode_terraform(&self, block: &Block) -> Result<TerraformConfig, DecodeError> {
        self.expect_labels(block, 0)?;
        self.reject_blocks(block.body())?;
        let attributes = self.attributes(block.body(), &[SOURCE])?;

        Ok(TerraformConfig {
            source: attributes
                .get(SOURCE)
                .map(|attribute| self.string(attribute))
                .transpose()?
                .flatten(),
        })
    }

    fn decode_dependency(&self, block: &Block) -> Result<Dependency, DecodeError> {
        let name = self.single_label(block)?;
        self.reject_blocks(block.body())?;
        self.reject_dependency_references(&name, block.body())?;

        let attributes = self.attributes(
            block.body(),
            &[
                CONFIG_PATH,
                SKIP_OUTPUTS,
                MOCK_OUTPUTS,
                MOCK_OUTPUTS_ALLOWED_TERRAFORM_COMMANDS,
                MOCK_OUTPUTS_MERGE_WITH_STATE,
            ],
        )?;

        let missing_config_path = || {
            self.error(DecodeErrorKind::MissingArgument {
                block: DEPENDENCY.to_string(),
                name: CONFIG_PATH.to_string(),
            })
        };
        let config_path = match attributes.get(CONFIG_PATH) {
            Some(attribute) => self.string(attribute)?.ok_or_else(missing_config_path)?,
            None => return Err(missing_config_path()),
        };

        let bool_attribute = |key: &str| -> Result<Option<bool>, DecodeError> {
            Ok(attributes
                .get(key)
                .map(|attribute| self.bool(attribute))
                .transpose()?
                .flatten())
        };

        let dependency = Dependency {
            config_path,
            skip_outputs: bool_attribute(SKIP_OUTPUTS)?,
            mock_outputs: attributes
                .get(MOCK_OUTPUTS)
                .map(|attribute| self.value(attribute))
                .transpose()?,
            mock_outputs_allowed_terraform_commands: attributes
                .get(MOCK_OUTPUTS_ALLOWED_TERRAFORM_COMMANDS)
                .map(|attribute| self.string_list(attribute))
                .transpose()?
                .flatten(),
            mock_outputs_merge_with_state: bool_attribute(MOCK_OUTPUTS_MERGE_WITH_STATE)?,
            rendered_outputs: None,
            name,
        };

        tracing::trace!(?dependency, "decoded dependency");
        Ok(dependency)
    }

    /// Dependencies are resolved before any of them is known, so they cannot refer to each other
    fn reject_dependency_references(&self, name: &str, body: &Body) -> Result<(), DecodeError> {
        let mut reference = None;
        body.visit_traversals(&mut |traversal: &Traversal| {
            if reference.is_none() {
                reference = dependency_reference(traversal);
            }
        });

        match reference {
            Some(reference) => Err(self.error(DecodeErrorKind::DependencyReference {
                dependency: name.to_string(),
                reference,
            })),
            None => Ok(()),
        }
    }

    fn expect_labels(&self, block: &Block, expected: usize) -> Result<(), DecodeError> {
        let found = block.labels().len();
        if found != expected {
            return Err(self.error(DecodeErrorKind::LabelCount {
                block: block.identifier().to_string(),
                expected,
                found,
            }));
        }
        Ok(())
    }

    fn single_label(&self, block: &Block) -> Result<String, DecodeError> {
        self.expect_labels(block, 1)?;
        Ok(block.labels()[0].as_str().to_string())
    }

    fn reject_blocks(&self, body: &Body) -> Result<(), DecodeError> {
        match body.blocks().next() {
            Some(block) => Err(self.error(DecodeErrorKind::UnsupportedBlock {
                name: block.identifier().to_string(),
            })),
            None => Ok(()),
        }
    }

    /// Attributes of `body` by key, only `allowed` keys are accepted
    fn attributes<'b>(
        &self,
        body: &'b Body,
        allowed: &[&str],
    ) -> Result<IndexMap<&'b str, &'b Attribute>, DecodeError> {
        let mut attributes = IndexMap::new();
        for attribute in body.attributes() {
            let key = attribute.key();
            if !allowed.contains(&key) {
                return Err(self.error(DecodeErrorKind::UnsupportedArgument {
                    name: key.to_string(),
                }));
            }
            if attributes.insert(key, attribute).is_some() {
                return Err(self.error(DecodeErrorKind::DuplicateArgument {
                    name: key.to_string(),
                }));
            }
        }
        Ok(attributes)
    }

    fn evaluate(&self, attribute: &Attribute) -> Result<hcl::Value, DecodeError> {
        attribute.expr().evaluate(&self.context).map_err(|source| {
            self.error(DecodeErrorKind::Evaluation {
                name: attribute.key().to_string(),
                source,
            })
        })
    }

    fn mismatch(&self, attribute: &Attribute, expected: &'static str, found: &hcl::Value) -> DecodeError {
        self.error(DecodeErrorKind::TypeMismatch {
            name: attribute.key().to_string(),
            expected,
            found: Value::from(found.clone()).ty().to_string(),
        })
    }

    fn value(&self, attribute: &Attribute) -> Result<Value, DecodeError> {
        self.evaluate(attribute).map(Value::from)
    }

    /// A string attribute, numbers and booleans are converted. `null` is treated as not set.
    fn string(&self, attribute: &Attribute) -> Result<Option<String>, DecodeError> {
        let value = self.evaluate(attribute)?;
        match to_string(&value) {
            Some(string) => Ok(Some(string)),
            None if value.is_null() => Ok(None),
            None => Err(self.mismatch(attribute, "string", &value)),
        }
    }

    /// A bool attribute, `"true"` and `"false"` are converted. `null` is treated as not set.
    fn bool(&self, attribute: &Attribute) -> Result<Option<bool>, DecodeError> {
        let value = self.evaluate(attribute)?;
        match &value {
            hcl::Value::Null => Ok(None),
            hcl::Value::Bool(b) => Ok(Some(*b)),
            hcl::Value::String(s) if s == "true" => Ok(Some(true)),
            hcl::Value::String(s) if s == "false" => Ok(Some(false)),
            _ => Err(self.mismatch(attribute, "bool", &value)),
        }
    }

    /// A list of strings. `null` is treated as not set.
    fn string_list(&self, attribute: &Attribute) -> Result<Option<Vec<String>>, DecodeError> {
        let value = self.evaluate(attribute)?;
        match &value {
            hcl::Value::Null => Ok(None),
            hcl::Value::Array(elements) => elements
                .iter()
                .map(|element| {
                    to_string(element).ok_or_else(|| self.mismatch(attribute, "list of string", &value))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            _ => Err(self.mismatch(attribute, "list of string", &value)),
        }
    }
}

/// Decode `document` completely (second pass)
pub fn decode_config_file(
    document: &Document,
    context: &EvalContext,
) -> Result<Option<ConfigFile>, DecodeError> {
    Decoder::new(document.filename(), context).decode_config_file(document.body())
}

fn to_string(value: &hcl::Value) -> Option<String> {
    match value {
        hcl::Value::String(s) => Some(s.clone()),
        hcl::Value::Number(n) => Some(n.to_string()),
        hcl::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `dependency.<name>` if `traversal` starts at the dependency variable
fn dependency_reference(traversal: &Traversal) -> Option<String> {
    let Expression::Variable(var) = &traversal.expr else {
        return None;
    };

    if var.as_str() != DEPENDENCY_VARIABLE {
        return None;
    }

    match traversal.operators.first() {
        Some(TraversalOperator::GetAttr(name)) => Some(format!("{DEPENDENCY_VARIABLE}.{name}")),
        _ => Some(DEPENDENCY_VARIABLE.to_string()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document::test::document;
    use pretty_assertions::assert_eq;

    fn decode_dependencies(source: &str) -> Result<Vec<Dependency>, DecodeError> {
        let document = document(source);
        Decoder::new(document.filename(), &EvalContext::default()).decode_dependencies(document.body())
    }

    fn decode(source: &str, context: &EvalContext) -> Result<Option<ConfigFile>, DecodeError> {
        decode_config_file(&document(source), context)
    }

    fn decode_error(source: &str) -> DecodeErrorKind {
        decode(source, &EvalContext::default())
            .expect_err("must error")
            .kind
    }

    #[test]
    fn dependency_attributes() {
        let dependencies = decode_dependencies(
            r#"
            dependency "db" {
              config_path                             = "../db"
              skip_outputs                            = false
              mock_outputs                            = { endpoint = "10.0.0.5" }
              mock_outputs_allowed_terraform_commands = ["validate", "plan"]
              mock_outputs_merge_with_state           = "true"
            }
            "#,
        )
        .unwrap();

        let expected = Dependency {
            name: "db".to_string(),
            config_path: "../db".to_string(),
            skip_outputs: Some(false),
            mock_outputs: Some(Value::Object(IndexMap::from([(
                "endpoint".to_string(),
                Value::from("10.0.0.5"),
            )]))),
            mock_outputs_allowed_terraform_commands: Some(vec![
                "validate".to_string(),
                "plan".to_string(),
            ]),
            mock_outputs_merge_with_state: Some(true),
            rendered_outputs: None,
        };

        assert_eq!(dependencies, vec![expected]);
    }

    #[test]
    fn first_pass_ignores_other_content() {
        let dependencies = decode_dependencies(
            r#"
            unknown_block {}
            inputs = { x = local.undefined }
            dependency "vpc" {
              config_path = "../vpc"
            }
            "#,
        )
        .unwrap();

        assert_eq!(dependencies.len(), 1);
        assert_eq!(dependencies[0].name, "vpc");
        assert_eq!(dependencies[0].mock_outputs, None);
    }

    #[test]
    fn config_path_is_required() {
        let error = decode_dependencies("dependency \"vpc\" {\n  skip_outputs = true\n}\n").unwrap_err();
        assert!(matches!(
            error.kind,
            DecodeErrorKind::MissingArgument { name, .. } if name == CONFIG_PATH
        ));
    }

    #[test]
    fn dependency_names_are_unique() {
        let error = decode_dependencies(
            r#"
            dependency "vpc" { config_path = "../a" }
            dependency "vpc" { config_path = "../b" }
            "#,
        )
        .unwrap_err();
        assert!(matches!(error.kind, DecodeErrorKind::DuplicateDependency { name } if name == "vpc"));
    }

    #[test]
    fn dependencies_cannot_reference_dependencies() {
        let error = decode_dependencies(
            r#"
            dependency "vpc" { config_path = "../vpc" }
            dependency "app" {
              config_path  = "../app"
              mock_outputs = { vpc_id = dependency.vpc.outputs.id }
            }
            "#,
        )
        .unwrap_err();

        assert!(matches!(
            error.kind,
            DecodeErrorKind::DependencyReference { dependency, reference }
                if dependency == "app" && reference == "dependency.vpc"
        ));
    }

    #[test]
    fn dependency_label_count() {
        let error = decode_dependencies("dependency { config_path = \"../vpc\" }\n").unwrap_err();
        assert!(matches!(
            error.kind,
            DecodeErrorKind::LabelCount {
                expected: 1,
                found: 0,
                ..
            }
        ));
    }

    #[test]
    fn full_document() {
        let file = decode(
            r#"
            terraform {
              source = "git::https://example.com/modules.git//app"
            }
            terraform_binary = "tofu"
            include "root" {
              path = find_in_parent_folders()
            }
            dependency "db" {
              config_path = "../db"
            }
            inputs = {
              name = "app"
            }
            "#,
            &EvalContext::default(),
        )
        .unwrap()
        .expect("a config file");

        assert_eq!(
            file.terraform,
            Some(TerraformConfig {
                source: Some("git::https://example.com/modules.git//app".to_string())
            })
        );
        assert_eq!(file.terraform_binary.as_deref(), Some("tofu"));
        assert_eq!(file.includes.len(), 1);
        assert_eq!(file.includes[0].name, "root");
        assert_eq!(file.dependencies.len(), 1);
        assert_eq!(
            file.inputs,
            Some(Value::Object(IndexMap::from([(
                "name".to_string(),
                Value::from("app")
            )])))
        );
    }

    #[test]
    fn empty_document_decodes_to_nothing() {
        assert_eq!(decode("# only a comment\n", &EvalContext::default()).unwrap(), None);
    }

    #[test]
    fn inputs_use_context() {
        let dependencies = Value::Object(IndexMap::from([(
            "db".to_string(),
            Value::Object(IndexMap::from([(
                "outputs".to_string(),
                Value::Object(IndexMap::from([(
                    "endpoint".to_string(),
                    Value::from("10.0.0.5"),
                )])),
            )])),
        )]));

        let file = decode(
            "inputs = { endpoint_used = dependency.db.outputs.endpoint }\n",
            &EvalContext::build(Some(dependencies)),
        )
        .unwrap()
        .unwrap();

        assert_eq!(
            file.inputs.as_ref().and_then(|inputs| inputs.get("endpoint_used")),
            Some(&Value::from("10.0.0.5"))
        );
    }

    #[test]
    fn undefined_variables() {
        let kind = decode_error("inputs = { x = dependency.db.outputs.x }\n");
        assert!(kind.is_undefined_variable());
    }

    #[test]
    fn shape_errors() {
        assert!(matches!(
            decode_error("unknown = 1\n"),
            DecodeErrorKind::UnsupportedArgument { name } if name == "unknown"
        ));
        assert!(matches!(
            decode_error("locals {}\n"),
            DecodeErrorKind::UnsupportedBlock { name } if name == "locals"
        ));
        assert!(matches!(
            decode_error("terraform {}\nterraform {}\n"),
            DecodeErrorKind::DuplicateBlock { .. }
        ));
        assert!(matches!(
            decode_error("terraform {\n  version = \"1\"\n}\n"),
            DecodeErrorKind::UnsupportedArgument { name } if name == "version"
        ));
        assert!(matches!(
            decode_error("include \"a\" \"b\" {}\n"),
            DecodeErrorKind::LabelCount {
                expected: 1,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn repeated_arguments_are_syntax_errors() {
        let error = Document::parse(
            b"terraform_binary = \"a\"\nterraform_binary = \"b\"\n",
            "app.hcl",
        )
        .unwrap_err();
        assert!(matches!(error, crate::error::Error::Syntax { .. }));
    }

    #[test]
    fn repeated_arguments_in_built_bodies() {
        let body = Body::builder()
            .add_attribute(Attribute::new(TERRAFORM_BINARY.to_string(), "terraform".to_string()))
            .add_attribute(Attribute::new(TERRAFORM_BINARY.to_string(), "tofu".to_string()))
            .build();

        let error = Decoder::new("app.hcl", &EvalContext::default())
            .decode_config_file(&body)
            .unwrap_err();
        assert!(matches!(
            error.kind,
            DecodeErrorKind::DuplicateArgument { name } if name == TERRAFORM_BINARY
        ));
    }

    #[test]
    fn type_errors() {
        assert!(matches!(
            decode_error("terraform_binary = [\"tofu\"]\n"),
            DecodeErrorKind::TypeMismatch { expected: "string", .. }
        ));
        assert!(matches!(
            decode_error("dependency \"a\" {\n  config_path = \"../a\"\n  skip_outputs = \"maybe\"\n}\n"),
            DecodeErrorKind::TypeMismatch { expected: "bool", .. }
        ));
        assert!(matches!(
            decode_error(
                "dependency \"a\" {\n  config_path = \"../a\"\n  mock_outputs_allowed_terraform_commands = [[\"plan\"]]\n}\n"
            ),
            DecodeErrorKind::TypeMismatch {
                expected: "list of string",
                ..
            }
        ));
    }

    #[test]
    fn scalar_conversion() {
        let file = decode("terraform_binary = 42\n", &EvalContext::default())
            .unwrap()
            .unwrap();
        assert_eq!(file.terraform_binary.as_deref(), Some("42"));
    }
}
