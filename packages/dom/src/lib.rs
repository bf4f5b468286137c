pub mod cursor;
pub mod error;
mod parse;
mod serialize;
pub mod tree;

pub use cursor::{FilterDecision, TreeCursor};
pub use error::{DomError, DomResult};
pub use tree::{Dom, Fragment, NodeId};
