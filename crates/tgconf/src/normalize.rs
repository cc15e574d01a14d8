//! labeling of bare `include` blocks
//!
//! Decoding requires a fixed number of labels per block type. `include` blocks are labeled
//! (`include "root" {}`) but a single unlabeled include (`include {}`) is accepted as well. Before decoding, such a
//! bare include is given the empty string as label.
//!
//! The rewrite happens on the [hcl_edit] tree and produces new source text, which then has to be parsed again.
//! Only one bare include is allowed per document, more would collide on the empty label.
use crate::document::Document;
use crate::error::Error;
use hcl_edit::structure::BlockLabel;
use hcl_edit::Decorated;

const INCLUDE: &str = "include";
const BARE_INCLUDE_LABEL: &str = "";

/// Label the bare include block of `document`
///
/// Returns the (possibly) rewritten source and whether anything changed.
pub fn normalize(document: &Document) -> Result<(String, bool), Error> {
    let mut changed = false;
    let mut tree = document.tree().clone();

    for block in tree.blocks_mut() {
        if block.ident.value().as_str() != INCLUDE || !block.labels.is_empty() {
            continue;
        }

        if changed {
            return Err(Error::MultipleBareIncludes {
                filename: document.filename().to_string(),
            });
        }

        block.labels.push(BlockLabel::String(Decorated::new(
            BARE_INCLUDE_LABEL.to_string(),
        )));
        changed = true;
    }

    if !changed {
        return Ok((document.source().to_string(), false));
    }

    Ok((tree.to_string(), true))
}

/// [normalize] `document` and parse it again if it was changed
#[tracing::instrument(level = "debug", skip_all, fields(filename = document.filename()))]
pub fn normalized(document: Document) -> Result<Document, Error> {
    let (source, changed) = normalize(&document)?;
    if !changed {
        return Ok(document);
    }

    tracing::debug!("labeled bare include block");
    tracing::trace!(%source, "rewritten document");
    document.reparse(source)
}
