//! parsed configuration documents
//!
//! A [Document] keeps
//! - the logical filename, used to attribute errors
//! - the source text
//! - the lossless [hcl_edit] tree, which can be rewritten (see [crate::normalize])
//! - the evaluable [hcl::Body] used for decoding
//!
//! Documents are never modified after parsing. Rewrites produce new source text which is parsed into a new document
//! with the same filename.
use crate::error::{Error, SyntaxError};
use std::path::Path;

/// Filename used when none is provided
pub const DEFAULT_FILENAME: &str = "terragrunt.hcl";

#[derive(Debug, Clone)]
pub struct Document {
    filename: String,
    source: String,
    tree: hcl_edit::structure::Body,
    body: hcl::Body,
}

impl Document {
    pub fn parse(content: &[u8], filename: impl Into<String>) -> Result<Self, Error> {
        let filename = filename.into();
        match std::str::from_utf8(content) {
            Ok(source) => Self::parse_source(source.to_string(), filename),
            Err(e) => Err(Error::Syntax {
                filename,
                source: e.into(),
            }),
        }
    }

    /// Parse `source` as a new version of this document
    pub fn reparse(&self, source: String) -> Result<Self, Error> {
        Self::parse_source(source, self.filename.clone())
    }

    pub fn load_file(path: &Path) -> Result<Self, Error> {
        tracing::info!(path=%path.display(), "loading file");
        let content = std::fs::read(path)?;
        Self::parse(&content, path.display().to_string())
    }

    #[tracing::instrument(level = "trace", skip(source))]
    fn parse_source(source: String, filename: String) -> Result<Self, Error> {
        let tree = match hcl_edit::parser::parse_body(&source) {
            Ok(tree) => tree,
            Err(e) => {
                return Err(Error::Syntax {
                    filename,
                    source: SyntaxError::Hcl(e),
                })
            }
        };
        let body = hcl::Body::from(tree.clone());

        Ok(Self {
            filename,
            source,
            tree,
            body,
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn body(&self) -> &hcl::Body {
        &self.body
    }

    pub(crate) fn tree(&self) -> &hcl_edit::structure::Body {
        &self.tree
    }

    /// The document has neither attributes nor blocks
    pub fn is_empty(&self) -> bool {
        self.body.iter().next().is_none()
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// Parse a document, panics on invalid input
    pub(crate) fn document(source: &str) -> Document {
        Document::parse(source.as_bytes(), DEFAULT_FILENAME).expect("document must parse")
    }

    #[test]
    fn parse() {
        let document = document(
            r#"
            terraform_binary = "tofu"
            dependency "vpc" {
              config_path = "../vpc"
            }
            "#,
        );

        assert_eq!(document.body().attributes().count(), 1);
        assert_eq!(document.body().blocks().count(), 1);
        assert!(!document.is_empty());
    }

    #[test]
    fn comments_only_is_empty() {
        assert!(document("# nothing to see\n// here either\n").is_empty());
    }

    #[test]
    fn syntax_error_keeps_filename() {
        let error = Document::parse(b"not = valid = hcl", "live/app.hcl").unwrap_err();
        assert!(matches!(
            error,
            Error::Syntax { filename, source: SyntaxError::Hcl(_) } if filename == "live/app.hcl"
        ));
    }

    #[test]
    fn invalid_utf8() {
        let error = Document::parse(&[0x61, 0x20, 0x3d, 0x20, 0xff], "app.hcl").unwrap_err();
        assert!(matches!(
            error,
            Error::Syntax {
                source: SyntaxError::Utf8(_),
                ..
            }
        ));
    }

    #[test]
    fn reparse_keeps_filename() {
        let original = Document::parse(b"a = 1", "live/app.hcl").unwrap();
        let reparsed = original.reparse("b = 2".to_string()).unwrap();
        assert_eq!(reparsed.filename(), "live/app.hcl");
        assert_eq!(reparsed.source(), "b = 2");
    }
}
