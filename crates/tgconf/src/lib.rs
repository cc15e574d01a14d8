//! # tgconf - terragrunt configuration evaluator
//!
//! Evaluates a single terragrunt flavoured `.hcl` document into a fully resolved configuration.
//!
//! ## Introduction for developers
//!
//! Read this to understand how `tgconf` works internally.
//!
//! ### HCL Terms
//!
//! In hcl terms...
//! - a file gets parsed as a `body`
//! - ...which is just a list of `structures`
//! - ...where there are two kinds:
//!   - `attribute`: a "key = value" pair
//!   - or `block`:
//!     - 1 `identifier`
//!     - followed by 0 or more `labels`
//!     - and a `body` enclosed in `{` and `}`
//!
//! A configuration looks like this:
//! ```hcl
//! include "root" {
//!   path = find_in_parent_folders()
//! }
//!
//! terraform {
//!   source = "../modules/app"
//! }
//!
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
//! ### Parsing
//!
//! see [document::Document::parse]
//!
//! A document is parsed twice: into a lossless [hcl_edit::structure::Body] which can be rewritten, and into a
//! [hcl::Body] whose expressions can be evaluated. Only valid HCL is accepted at this point.
//!
//! ### Normalization
//!
//! see [normalize::normalized]
//!
//! Decoding expects exactly one label on `include` blocks. A single bare `include {}` is given the empty label and the
//! rewritten source is parsed again.
//!
//! ### First pass: dependencies
//!
//! see [dependency::Resolver]
//!
//! `inputs` may reference outputs of other modules (`dependency.<name>.outputs.<output>`), so those have to be known
//! before the document can be evaluated. The first pass decodes the `dependency` blocks only and renders the outputs
//! of each dependency, either from state (via an [dependency::OutputRetriever]) or from `mock_outputs`.
//!
//! ### Second pass: the configuration
//!
//! see [decode::decode_config_file]
//!
//! The rendered outputs are exposed to expressions as the `dependency` variable ([context::EvalContext]) and the whole
//! document is decoded. No functions are available while evaluating.
//!
//! ### Output
//!
//! see [config::assemble]
//!
//! `inputs` are converted from a dynamic [value::Value] into plain json ([value::value_to_generic_map]) and the
//! [config::ResolvedConfiguration] is serialized via [serde].
//!
pub mod config;
pub mod context;
pub mod decode;
pub mod dependency;
pub mod document;
pub mod error;
pub mod evaluator;
pub mod normalize;
pub mod value;
mod visit;

pub use config::ResolvedConfiguration;
pub use error::Error;
pub use evaluator::{parse_config, Evaluator};
