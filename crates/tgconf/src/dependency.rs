//! dependency resolution (first pass)
//!
//! A `dependency` block makes the outputs of another module available to the including configuration:
//!
//! ```hcl
//! dependency "db" {
//!   config_path  = "../db"
//!   mock_outputs = { endpoint = "10.0.0.5" }
//! }
//!
//! inputs = {
//!   endpoint = dependency.db.outputs.endpoint
//! }
//! ```
//!
//! Resolution decodes only the dependency blocks of a document (with an empty [EvalContext]) and renders the outputs
//! of each dependency. Outputs are taken from, in order of precedence:
//! 1. the [OutputRetriever] (the dependency's state), unless `skip_outputs = true`
//! 2. `mock_outputs`, if mocks are allowed for the current terraform command
//!
//! With `mock_outputs_merge_with_state = true` mock outputs fill in names missing from the state.
//!
//! The result is an object `{ <name> = { outputs = <rendered outputs> } }`, a dependency without outputs is an empty
//! object. Referencing `dependency.<name>.outputs` of such a dependency fails in the second pass.
use crate::context::EvalContext;
use crate::decode::Decoder;
use crate::document::Document;
use crate::error::{Error, RetrievalError};
use crate::value::json::{marshal, unmarshal};
use crate::value::{ConversionError, Type, Value};
use indexmap::IndexMap;

/// Name of the field holding the rendered outputs of a dependency
pub const OUTPUTS: &str = "outputs";

/// A decoded `dependency` block
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Dependency {
    pub name: String,
    pub config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_outputs: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mock_outputs: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mock_outputs_allowed_terraform_commands: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mock_outputs_merge_with_state: Option<bool>,
    /// Filled in by the resolver
    #[serde(rename = "outputs", skip_serializing_if = "Option::is_none")]
    pub rendered_outputs: Option<Value>,
}

impl Dependency {
    pub fn skips_outputs(&self) -> bool {
        self.skip_outputs.unwrap_or(false)
    }

    pub fn merges_with_state(&self) -> bool {
        self.mock_outputs_merge_with_state.unwrap_or(false)
    }

    /// Mock outputs may be used for `command`
    ///
    /// Without an allow list, or without a known command, mocks are always allowed.
    pub fn mocks_allowed(&self, command: Option<&str>) -> bool {
        match (&self.mock_outputs_allowed_terraform_commands, command) {
            (Some(allowed), Some(command)) => allowed.iter().any(|allowed| allowed == command),
            _ => true,
        }
    }
}

/// A single output as written by `terraform output -json`
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize, derive_new::new)]
pub struct OutputMeta {
    #[serde(default)]
    pub sensitive: bool,
    #[serde(rename = "type")]
    pub ty: Type,
    pub value: serde_json::Value,
}

/// Outputs of a dependency by name
pub type OutputMap = IndexMap<String, OutputMeta>;

/// Parse the output of `terraform output -json`
pub fn parse_output_json(content: &[u8]) -> Result<OutputMap, ConversionError> {
    Ok(serde_json::from_slice(content)?)
}

/// The outputs as an object value
pub fn outputs_to_value(outputs: &OutputMap) -> Result<Value, ConversionError> {
    let fields = outputs
        .iter()
        .map(|(name, output)| Ok((name.clone(), unmarshal(&output.value, &output.ty)?)))
        .collect::<Result<IndexMap<_, _>, ConversionError>>()?;

    Ok(Value::Object(fields))
}

/// Describe a `mock_outputs` value the way terraform describes outputs
///
/// `null` is treated like an empty object.
pub fn output_map_from_value(value: &Value) -> Result<OutputMap, ConversionError> {
    if value.is_null() {
        return Ok(OutputMap::new());
    }

    let Some(fields) = value.as_record() else {
        return Err(ConversionError::NotARecord(value.ty()));
    };

    fields
        .iter()
        .map(|(name, value)| {
            let ty = value.ty();
            let json = marshal(value, &ty)?;
            Ok::<_, ConversionError>((name.clone(), OutputMeta::new(false, ty, json)))
        })
        .collect()
}

/// Source of the real outputs of a dependency
///
/// `Ok(None)` (or an empty map) means the dependency has no outputs (yet), an error aborts the evaluation.
pub trait OutputRetriever: Send + Sync {
    fn retrieve(&self, dependency: &Dependency) -> Result<Option<OutputMap>, RetrievalError>;
}

// blanket impl for Fn
impl<F> OutputRetriever for F
where
    F: Fn(&Dependency) -> Result<Option<OutputMap>, RetrievalError> + Send + Sync,
{
    fn retrieve(&self, dependency: &Dependency) -> Result<Option<OutputMap>, RetrievalError> {
        self(dependency)
    }
}

/// Retriever for configurations without access to any state, only mocks are used
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRemoteState;

impl OutputRetriever for NoRemoteState {
    fn retrieve(&self, _dependency: &Dependency) -> Result<Option<OutputMap>, RetrievalError> {
        Ok(None)
    }
}

#[derive(derive_new::new)]
pub struct Resolver<'a> {
    retriever: &'a dyn OutputRetriever,
    terraform_command: Option<&'a str>,
}

impl<'a> Resolver<'a> {
    /// Decode the dependency blocks of `document` and render their outputs
    ///
    /// Returns `None` for the dependency value when there are no dependency blocks.
    #[tracing::instrument(level = "debug", skip_all, fields(filename = document.filename()))]
    pub fn resolve(
        &self,
        document: &Document,
        context: &EvalContext,
    ) -> Result<(Option<Value>, Vec<Dependency>), Error> {
        let decoder = Decoder::new(document.filename(), context);
        let mut dependencies = decoder.decode_dependencies(document.body())?;

        if dependencies.is_empty() {
            tracing::debug!("no dependencies");
            return Ok((None, dependencies));
        }

        let mut by_name = IndexMap::new();
        for dependency in &mut dependencies {
            dependency.rendered_outputs = self.render_outputs(dependency)?;

            let encoded = match &dependency.rendered_outputs {
                Some(outputs) => {
                    Value::Object(IndexMap::from([(OUTPUTS.to_string(), outputs.clone())]))
                }
                None => Value::empty_object(),
            };
            by_name.insert(dependency.name.clone(), encoded);
        }

        let value = Value::Object(by_name);
        tracing::debug!(r#type = %value.ty(), "resolved dependencies");
        Ok((Some(value), dependencies))
    }

    #[tracing::instrument(level = "debug", skip_all, fields(dependency = %dependency.name))]
    fn render_outputs(&self, dependency: &Dependency) -> Result<Option<Value>, Error> {
        let state = self.state_outputs(dependency)?;
        let mocks = self.mock_outputs(dependency)?;

        let outputs = match (state, mocks) {
            (Some(mut state), Some(mocks)) if dependency.merges_with_state() => {
                tracing::debug!("merging mock outputs with state");
                for (name, output) in mocks {
                    state.entry(name).or_insert(output);
                }
                state
            }
            (Some(state), _) => state,
            (None, Some(mocks)) => {
                tracing::debug!("using mock outputs");
                mocks
            }
            (None, None) => {
                tracing::warn!(
                    config_path = %dependency.config_path,
                    "dependency has no outputs"
                );
                return Ok(None);
            }
        };

        Ok(Some(outputs_to_value(&outputs)?))
    }

    fn state_outputs(&self, dependency: &Dependency) -> Result<Option<OutputMap>, Error> {
        if dependency.skips_outputs() {
            tracing::trace!("skipping outputs");
            return Ok(None);
        }

        match self.retriever.retrieve(dependency) {
            Ok(Some(outputs)) if !outputs.is_empty() => Ok(Some(outputs)),
            Ok(_) => Ok(None),
            Err(source) => Err(Error::DependencyOutputUnavailable {
                name: dependency.name.clone(),
                source,
            }),
        }
    }

    fn mock_outputs(&self, dependency: &Dependency) -> Result<Option<OutputMap>, ConversionError> {
        let Some(mock_outputs) = &dependency.mock_outputs else {
            return Ok(None);
        };

        if !dependency.mocks_allowed(self.terraform_command) {
            tracing::debug!(
                command = ?self.terraform_command,
                "mock outputs are not allowed for this command"
            );
            return Ok(None);
        }

        output_map_from_value(mock_outputs).map(Some)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document::test::document;
    use pretty_assertions::assert_eq;

    const STATE: &str = r#"{
      "endpoint": { "sensitive": false, "type": "string", "value": "db.internal" },
      "port": { "sensitive": false, "type": "number", "value": 5432 }
    }"#;

    fn from_state(_dependency: &Dependency) -> Result<Option<OutputMap>, RetrievalError> {
        Ok(Some(parse_output_json(STATE.as_bytes())?))
    }

    fn unavailable(_dependency: &Dependency) -> Result<Option<OutputMap>, RetrievalError> {
        Err("state bucket not reachable".into())
    }

    fn resolve_with(
        source: &str,
        retriever: &dyn OutputRetriever,
        command: Option<&str>,
    ) -> Result<(Option<Value>, Vec<Dependency>), Error> {
        Resolver::new(retriever, command).resolve(&document(source), &EvalContext::default())
    }

    fn outputs(source: &str, retriever: &dyn OutputRetriever, command: Option<&str>) -> Option<Value> {
        let (value, _) = resolve_with(source, retriever, command).unwrap();
        value
            .expect("dependencies")
            .get("db")
            .expect("db dependency")
            .get(OUTPUTS)
            .cloned()
    }

    fn object<const N: usize>(fields: [(&str, Value); N]) -> Value {
        Value::Object(
            fields
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
        )
    }

    #[test]
    fn no_dependencies() {
        let (value, dependencies) =
            resolve_with("inputs = { a = 1 }\n", &NoRemoteState, None).unwrap();
        assert_eq!(value, None);
        assert!(dependencies.is_empty());
    }

    #[test]
    fn mock_outputs() {
        let source = r#"
        dependency "db" {
          config_path  = "../db"
          mock_outputs = { a = 1, b = "x" }
        }
        "#;

        let (value, dependencies) = resolve_with(source, &NoRemoteState, None).unwrap();

        let expected = object([("a", Value::from(1i64)), ("b", Value::from("x"))]);
        assert_eq!(
            value,
            Some(object([("db", object([(OUTPUTS, expected.clone())]))]))
        );
        assert_eq!(dependencies[0].rendered_outputs, Some(expected));
    }

    #[test]
    fn without_outputs() {
        let (value, dependencies) = resolve_with(
            "dependency \"db\" {\n  config_path = \"../db\"\n}\n",
            &NoRemoteState,
            None,
        )
        .unwrap();

        assert_eq!(value, Some(object([("db", Value::empty_object())])));
        assert_eq!(dependencies[0].rendered_outputs, None);
    }

    #[test]
    fn state_takes_precedence() {
        let source = r#"
        dependency "db" {
          config_path  = "../db"
          mock_outputs = { endpoint = "10.0.0.5", user = "admin" }
        }
        "#;

        assert_eq!(
            outputs(source, &from_state, None),
            Some(object([
                ("endpoint", Value::from("db.internal")),
                ("port", Value::from(5432i64)),
            ]))
        );
    }

    #[test]
    fn merge_with_state() {
        let source = r#"
        dependency "db" {
          config_path                   = "../db"
          mock_outputs                  = { endpoint = "10.0.0.5", user = "admin" }
          mock_outputs_merge_with_state = true
        }
        "#;

        assert_eq!(
            outputs(source, &from_state, None),
            Some(object([
                ("endpoint", Value::from("db.internal")),
                ("port", Value::from(5432i64)),
                ("user", Value::from("admin")),
            ]))
        );
    }

    #[test]
    fn empty_state_falls_back_to_mocks() {
        let empty = |_: &Dependency| -> Result<Option<OutputMap>, RetrievalError> {
            Ok(Some(OutputMap::new()))
        };
        let source = r#"
        dependency "db" {
          config_path  = "../db"
          mock_outputs = { endpoint = "10.0.0.5" }
        }
        "#;

        assert_eq!(
            outputs(source, &empty, None),
            Some(object([("endpoint", Value::from("10.0.0.5"))]))
        );
    }

    #[test]
    fn skip_outputs_does_not_retrieve() {
        let source = r#"
        dependency "db" {
          config_path  = "../db"
          skip_outputs = true
          mock_outputs = { endpoint = "10.0.0.5" }
        }
        "#;

        assert_eq!(
            outputs(source, &unavailable, None),
            Some(object([("endpoint", Value::from("10.0.0.5"))]))
        );
    }

    #[test]
    fn retrieval_failure() {
        let error = resolve_with(
            "dependency \"db\" {\n  config_path = \"../db\"\n}\n",
            &unavailable,
            None,
        )
        .unwrap_err();

        assert!(matches!(error, Error::DependencyOutputUnavailable { name, .. } if name == "db"));
    }

    #[test]
    fn allowed_commands() {
        let source = r#"
        dependency "db" {
          config_path                             = "../db"
          mock_outputs                            = { endpoint = "10.0.0.5" }
          mock_outputs_allowed_terraform_commands = ["validate", "plan"]
        }
        "#;
        let mocked = Some(object([("endpoint", Value::from("10.0.0.5"))]));

        assert_eq!(outputs(source, &NoRemoteState, Some("plan")), mocked);
        assert_eq!(outputs(source, &NoRemoteState, None), mocked);
        assert_eq!(outputs(source, &NoRemoteState, Some("apply")), None);
    }

    #[test]
    fn mock_outputs_must_be_an_object() {
        let error = resolve_with(
            "dependency \"db\" {\n  config_path = \"../db\"\n  mock_outputs = [\"a\"]\n}\n",
            &NoRemoteState,
            None,
        )
        .unwrap_err();

        assert!(matches!(
            error,
            Error::ConversionFailed(ConversionError::NotARecord(_))
        ));
    }

    #[test]
    fn null_mock_outputs() {
        assert_eq!(
            output_map_from_value(&Value::Null).unwrap(),
            OutputMap::new()
        );
    }

    #[test]
    fn terraform_output_json() {
        let outputs = parse_output_json(
            br#"{
              "subnets": { "sensitive": false, "type": ["list", "string"], "value": ["a", "b"] },
              "password": { "sensitive": true, "type": "string", "value": "hunter2" }
            }"#,
        )
        .unwrap();

        assert_eq!(outputs["subnets"].ty, Type::list(Type::String));
        assert!(outputs["password"].sensitive);
        assert_eq!(
            outputs_to_value(&outputs).unwrap(),
            object([
                ("subnets", Value::List(vec!["a".into(), "b".into()])),
                ("password", Value::from("hunter2")),
            ])
        );
    }

    #[test]
    fn malformed_output_json() {
        assert!(matches!(
            parse_output_json(b"{ \"a\": 1 }"),
            Err(ConversionError::Json(_))
        ));
    }
}
