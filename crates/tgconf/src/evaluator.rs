//! the evaluation pipeline
//!
//! bytes -> [Document] -> [normalized] -> dependencies (first pass) -> [EvalContext] -> [decode_config_file]
//! (second pass) -> [assemble]
use crate::config::{assemble, ResolvedConfiguration};
use crate::context::EvalContext;
use crate::decode::decode_config_file;
use crate::dependency::{Dependency, NoRemoteState, OutputRetriever, Resolver};
use crate::document::{Document, DEFAULT_FILENAME};
use crate::error::Error;
use crate::normalize::normalized;
use crate::value::Value;

/// Evaluation options
pub struct Evaluator {
    filename: String,
    terraform_command: Option<String>,
    retriever: Box<dyn OutputRetriever>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(DEFAULT_FILENAME)
    }
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("filename", &self.filename)
            .field("terraform_command", &self.terraform_command)
            .finish_non_exhaustive()
    }
}

impl Evaluator {
    /// Evaluator without access to dependency state
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            terraform_command: None,
            retriever: Box::new(NoRemoteState),
        }
    }

    /// The terraform command the configuration is evaluated for, restricts the use of mock outputs
    pub fn with_terraform_command(mut self, command: impl Into<String>) -> Self {
        self.terraform_command = Some(command.into());
        self
    }

    pub fn with_retriever(mut self, retriever: impl OutputRetriever + 'static) -> Self {
        self.retriever = Box::new(retriever);
        self
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Parse `content` and evaluate it
    pub fn evaluate(&self, content: &[u8]) -> Result<ResolvedConfiguration, Error> {
        let document = Document::parse(content, self.filename.as_str())?;
        self.evaluate_document(document)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(filename = document.filename()))]
    pub fn evaluate_document(&self, document: Document) -> Result<ResolvedConfiguration, Error> {
        let document = normalized(document)?;

        let (dependencies, resolved) =
            self.resolve_dependencies(&document, &EvalContext::default())?;
        let context = EvalContext::build(dependencies);

        let Some(file) = decode_config_file(&document, &context)? else {
            return Err(Error::NoConfigurationFound {
                filename: document.filename().to_string(),
            });
        };

        let config = assemble(file, &resolved)?;
        tracing::debug!(
            dependencies = config.dependencies.len(),
            inputs = config.inputs.len(),
            "evaluated configuration"
        );
        Ok(config)
    }

    /// First pass: decode the dependency blocks and render their outputs
    ///
    /// Returns the value bound to `dependency` (`None` without dependency blocks) and the decoded dependencies.
    pub fn resolve_dependencies(
        &self,
        document: &Document,
        context: &EvalContext,
    ) -> Result<(Option<Value>, Vec<Dependency>), Error> {
        Resolver::new(self.retriever.as_ref(), self.terraform_command.as_deref())
            .resolve(document, context)
    }
}

/// Evaluate `content` with default options
pub fn parse_config(content: &[u8]) -> Result<ResolvedConfiguration, Error> {
    Evaluator::default().evaluate(content)
}
