use thiserror::Error;
use weft_dom::DomError;
use weft_parser::ParseError;

pub type EvalResult<T> = Result<T, EvalError>;
pub type RenderResult<T> = Result<T, RenderError>;

/// Expression evaluation failure. Missing symbols are not failures (they
/// resolve to null); missing modules, functions and methods always are.
#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Module \"{0}\" not found")]
    ModuleNotFound(String),

    #[error("Function \"#{0}\" not found")]
    FunctionNotFound(String),

    #[error("Method missing \"{0}\"")]
    MethodMissing(String),

    #[error("Cannot read property \"{0}\" of null")]
    NullNavigation(String),

    #[error("Cannot iterate over {0}")]
    NotIterable(&'static str),

    #[error("Type error: {0}")]
    Type(String),

    #[error("{0}")]
    Host(String),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl EvalError {
    pub fn module_not_found(name: impl Into<String>) -> Self {
        Self::ModuleNotFound(name.into())
    }

    pub fn function_not_found(module: Option<&str>, name: &str) -> Self {
        let reference = match module {
            Some(module) => format!("{}:{}", module, name),
            None => name.to_string(),
        };
        Self::FunctionNotFound(reference)
    }

    pub fn method_missing(selector: impl Into<String>) -> Self {
        Self::MethodMissing(selector.into())
    }

    pub fn null_navigation(selector: impl Into<String>) -> Self {
        Self::NullNavigation(selector.into())
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }

    pub fn host(message: impl Into<String>) -> Self {
        Self::Host(message.into())
    }
}

/// Rendering failure: an evaluation or tree failure enriched with the
/// node context it happened in, re-wrapped once more at the render root.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Error evaluating command {command} in {context}")]
    Command {
        command: String,
        context: String,
        #[source]
        source: Box<RenderError>,
    },

    #[error("Error evaluating text node in {context}")]
    TextNode {
        context: String,
        #[source]
        source: Box<RenderError>,
    },

    #[error("Error rendering template in {context}")]
    Template {
        context: String,
        #[source]
        source: Box<RenderError>,
    },

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Dom(#[from] DomError),
}

impl RenderError {
    pub(crate) fn command(command: impl Into<String>, context: impl Into<String>, source: RenderError) -> Self {
        Self::Command {
            command: command.into(),
            context: context.into(),
            source: Box::new(source),
        }
    }

    pub(crate) fn text_node(context: impl Into<String>, source: RenderError) -> Self {
        Self::TextNode {
            context: context.into(),
            source: Box::new(source),
        }
    }

    pub(crate) fn template(context: impl Into<String>, source: RenderError) -> Self {
        Self::Template {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

impl From<ParseError> for RenderError {
    fn from(err: ParseError) -> Self {
        Self::Eval(EvalError::Parse(err))
    }
}
