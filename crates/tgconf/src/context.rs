//! variables available to expressions while decoding
//!
//! The scope is deliberately small: the only variable is `dependency`, and only when the document declares
//! dependencies. No functions are declared.
use crate::value::Value;
use indexmap::IndexMap;

/// Name under which the resolved dependencies are exposed
pub const DEPENDENCY_VARIABLE: &str = "dependency";

/// Immutable variable scope, passed from one decoding pass to the next
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalContext {
    variables: IndexMap<String, Value>,
}

impl EvalContext {
    /// Scope for the second pass
    ///
    /// `dependencies` is the value produced by the dependency resolver, `None` when the document has no dependency
    /// blocks.
    pub fn build(dependencies: Option<Value>) -> Self {
        let mut variables = IndexMap::new();
        if let Some(dependencies) = dependencies {
            variables.insert(DEPENDENCY_VARIABLE.to_string(), dependencies);
        }

        Self { variables }
    }

    pub fn variables(&self) -> &IndexMap<String, Value> {
        &self.variables
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Context for the hcl expression evaluator
    pub(crate) fn to_hcl(&self) -> hcl::eval::Context<'static> {
        let mut context = hcl::eval::Context::new();
        for (name, value) in &self.variables {
            context.declare_var(
                hcl::Identifier::unchecked(name.as_str()),
                hcl::Value::from(value.clone()),
            );
        }
        context
    }
}
