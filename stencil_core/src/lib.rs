//! `stencil_core` renders text templates that declare their own inputs. A
//! template marks the variables it needs with require tokens and the text it
//! generates with inject tokens; the engine checks the inputs, strips the
//! declarations and replaces each inject token with the output of its
//! expression body.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Template text + parameters
//!   -> Token scanner (finds delimited regions for a start/end/escape marker triple)
//!   -> Requirement extractor (parses require token bodies into typed declarations)
//!   -> Evaluator (checks parameters, runs inject bodies, splices results back)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading from `stencil.toml`, including marker
//!   overrides and default parameters.
//! - [`project`]: Directory scanning that yields [`Template`]s lazily.
//! - [`parameters`]: Parameter files (JSON, TOML, YAML) and `name=value`
//!   assignments.
//!
//! ## Token Syntax
//!
//! ```text
//! /*[REQUIRE]
//! text customer - Name printed on the invoice
//! int:1-100 quantity - Number of items
//! */
//! Dear /*[INJECT] write(customer) */,
//! ```
//!
//! Placing `[ESCAPE]` directly before an end marker keeps that marker as
//! literal content.
//!
//! ## Quick Start
//!
//! ```rust
//! use stencil_core::Parameters;
//! use stencil_core::TemplateConfig;
//! use stencil_core::evaluate;
//!
//! let template = "/*[REQUIRE]\ntext name - Who to greet\n*/Hello /*[INJECT] write(name) */!";
//! let mut parameters = Parameters::new();
//! parameters.insert("name".into(), "world".into());
//!
//! let output = evaluate(template, &TemplateConfig::default(), &mut parameters, None).unwrap();
//! assert_eq!(output, "Hello world!");
//! ```

pub use config::*;
pub use engine::*;
pub use error::*;
pub use files::*;
pub use project::Template;
pub use requirements::*;
pub use tokens::*;

pub mod config;
mod engine;
#[allow(unused_assignments)]
mod error;
mod files;
pub mod parameters;
pub mod project;
mod requirements;
mod tokens;

#[cfg(test)]
mod __tests;
