//! # Weft Evaluator
//!
//! Evaluates weft expressions and renders weft templates.
//!
//! ## Purpose
//!
//! The evaluator half walks expression ASTs against a module registry and
//! a layered scope stack. The template half clones a stored fragment and
//! rewrites the clone in one forward pass, dispatching directive
//! attributes in a fixed order and rendering text interpolations.
//!
//! ## Re-evaluation Guarantees
//!
//! **INVARIANT: generated content is never re-interpreted.**
//!
//! Every directive that produces final content replaces its node as a
//! leading insertion, behind the traversal cursor, so interpolation
//! delimiters arriving through data stay verbatim in the output. The one
//! structural directive (`remove` in `tag` mode) promotes children ahead
//! of the cursor on purpose: their own directives still run.
//!
//! ## Failure Model
//!
//! A render either returns a fragment or raises a [`RenderError`] whose
//! chain names the failing command and carries a serialized snippet of
//! the offending node. Missing symbols evaluate to null; missing modules,
//! functions and methods are hard failures. Nothing is retried and there
//! is no partial-output contract.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use weft_evaluator::{ModuleRegistry, Template, Value};
//!
//! let modules = ModuleRegistry::new()
//!     .with_module_function("math", "isEven", |_, args| {
//!         match args.first() {
//!             Some(Value::Number(n)) => Ok(Value::Boolean(n % 2.0 == 0.0)),
//!             _ => Ok(Value::Boolean(false)),
//!         }
//!     });
//!
//! let template = Template::from_html(
//!     "<li data-tpl-each=\"self\" data-tpl-if=\"#math:isEven(self)\">{{self}}</li>",
//!     modules,
//! )?;
//! let html = template.with_data(Value::from(vec![1i64, 2, 3, 4])).render_to_string()?;
//! ```

pub mod error;
pub mod evaluator;
pub mod modules;
pub mod scope;
pub mod template;
pub mod value;

mod directives;

pub use error::{EvalError, EvalResult, RenderError, RenderResult};
pub use evaluator::{interpret, Evaluator, OutputSegment};
pub use modules::ModuleRegistry;
pub use scope::ScopeStack;
pub use template::Template;
pub use value::{HostFunction, Value};

pub use weft_dom::{Dom, Fragment, NodeId};

#[cfg(test)]
mod tests_expressions;
#[cfg(test)]
mod tests_template;
