//! Expression evaluation against a module registry and a scope stack.
//!
//! Evaluation is a separate pass from parsing and never mutates its
//! inputs. Logical, ternary, elvis and null-coalescing operators
//! short-circuit: the branch that does not decide the result is never
//! visited. Access chains fold left-to-right carrying (current, previous)
//! values so that method calls can bind the previous value as receiver.

use weft_parser::{
    parse_expression, ComparisonOp, Expr, EqualityOp, Segment, TemplateSegment,
};

use crate::error::{EvalError, EvalResult};
use crate::modules::ModuleRegistry;
use crate::scope::ScopeStack;
use crate::value::Value;

/// One evaluated segment of templated text, tagged with its output kind
/// for the renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputSegment {
    /// Escaped text content
    Text(Value),
    /// Markup to be parsed into nodes
    Html(Value),
    /// A pre-built node inserted verbatim
    Node(Value),
}

/// Visitor walking an expression AST.
pub struct Evaluator<'a> {
    modules: &'a ModuleRegistry,
    stack: &'a ScopeStack,
}

/// Parse and evaluate an expression in one step.
pub fn interpret(modules: &ModuleRegistry, stack: &ScopeStack, source: &str) -> EvalResult<Value> {
    let expr = parse_expression(source)?;
    Evaluator::new(modules, stack).evaluate(&expr)
}

impl<'a> Evaluator<'a> {
    pub fn new(modules: &'a ModuleRegistry, stack: &'a ScopeStack) -> Self {
        Self { modules, stack }
    }

    pub fn evaluate(&self, expr: &Expr) -> EvalResult<Value> {
        match expr {
            Expr::String { value } => Ok(Value::String(value.clone())),

            Expr::Number { value } => Ok(Value::Number(*value)),

            Expr::Boolean { value } => Ok(Value::Boolean(*value)),

            Expr::Symbol { name } => Ok(self.resolve_symbol(name)),

            Expr::Array { items } => {
                let values = items
                    .iter()
                    .map(|item| self.evaluate(item))
                    .collect::<EvalResult<_>>()?;
                Ok(Value::Array(values))
            }

            Expr::Dict { entries } => {
                let mut map = std::collections::HashMap::with_capacity(entries.len());
                for entry in entries {
                    map.insert(entry.key.clone(), self.evaluate(&entry.value)?);
                }
                Ok(Value::Object(map))
            }

            Expr::Not { expr } => Ok(Value::Boolean(!self.evaluate(expr)?.is_truthy())),

            Expr::And { lhs, rhs } => {
                let lhs = self.evaluate(lhs)?;
                if !lhs.is_truthy() {
                    Ok(lhs)
                } else {
                    self.evaluate(rhs)
                }
            }

            Expr::Or { lhs, rhs } => {
                let lhs = self.evaluate(lhs)?;
                if lhs.is_truthy() {
                    Ok(lhs)
                } else {
                    self.evaluate(rhs)
                }
            }

            Expr::Equality { op, lhs, rhs } => {
                let eq = self.evaluate(lhs)? == self.evaluate(rhs)?;
                Ok(Value::Boolean(match op {
                    EqualityOp::Equals => eq,
                    EqualityOp::NotEquals => !eq,
                }))
            }

            Expr::Comparison { op, lhs, rhs } => {
                let lhs = self.evaluate(lhs)?;
                let rhs = self.evaluate(rhs)?;
                self.compare(*op, &lhs, &rhs)
            }

            Expr::Ternary {
                cond,
                if_true,
                if_false,
            } => {
                if self.evaluate(cond)?.is_truthy() {
                    self.evaluate(if_true)
                } else {
                    self.evaluate(if_false)
                }
            }

            Expr::Elvis { cond, fallback } => {
                let cond = self.evaluate(cond)?;
                if cond.is_truthy() {
                    Ok(cond)
                } else {
                    self.evaluate(fallback)
                }
            }

            Expr::NullCoalesce { value, fallback } => {
                let value = self.evaluate(value)?;
                if !value.is_null() {
                    Ok(value)
                } else {
                    self.evaluate(fallback)
                }
            }

            Expr::ModuleCall {
                module,
                function,
                args,
            } => self.call_module_function(module.as_deref(), function, args),

            Expr::Access { base, segments } => self.walk_chain(base, segments),
        }
    }

    /// Evaluate templated-text segments into typed output segments.
    pub fn evaluate_templated(
        &self,
        segments: &[TemplateSegment],
    ) -> EvalResult<Vec<OutputSegment>> {
        segments
            .iter()
            .map(|segment| {
                Ok(match segment {
                    TemplateSegment::Literal { text } => {
                        OutputSegment::Text(Value::String(text.clone()))
                    }
                    TemplateSegment::Text { expr } => OutputSegment::Text(self.evaluate(expr)?),
                    TemplateSegment::Html { expr } => OutputSegment::Html(self.evaluate(expr)?),
                    TemplateSegment::Node { expr } => OutputSegment::Node(self.evaluate(expr)?),
                })
            })
            .collect()
    }

    fn resolve_symbol(&self, name: &str) -> Value {
        if name == "self" {
            return self.stack.top().cloned().unwrap_or(Value::Null);
        }
        self.stack.lookup(name).unwrap_or(Value::Null)
    }

    fn compare(&self, op: ComparisonOp, lhs: &Value, rhs: &Value) -> EvalResult<Value> {
        let ordering = match (lhs, rhs) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => {
                return Err(EvalError::type_error(format!(
                    "Cannot compare {} with {}",
                    lhs.type_name(),
                    rhs.type_name()
                )))
            }
        };
        let result = match (op, ordering) {
            (_, None) => false, // NaN never orders
            (ComparisonOp::GreaterThan, Some(o)) => o.is_gt(),
            (ComparisonOp::LessThan, Some(o)) => o.is_lt(),
            (ComparisonOp::GreaterThanOrEqual, Some(o)) => o.is_ge(),
            (ComparisonOp::LessThanOrEqual, Some(o)) => o.is_le(),
        };
        Ok(Value::Boolean(result))
    }

    fn call_module_function(
        &self,
        module: Option<&str>,
        function: &str,
        args: &[Expr],
    ) -> EvalResult<Value> {
        let table = match module {
            None => self.modules.default_functions(),
            Some(name) => self
                .modules
                .module(name)
                .ok_or_else(|| EvalError::module_not_found(name))?,
        };
        let f = table
            .get(function)
            .cloned()
            .ok_or_else(|| EvalError::function_not_found(module, function))?;

        let args = args
            .iter()
            .map(|arg| self.evaluate(arg))
            .collect::<EvalResult<Vec<_>>>()?;
        let receiver = self.stack.top().cloned().unwrap_or(Value::Null);
        f(&receiver, &args)
    }

    fn walk_chain(&self, base: &Expr, segments: &[Segment]) -> EvalResult<Value> {
        let mut current = self.evaluate(base)?;
        let mut previous = Value::Null;
        // Tracks the name a failing method call is reported under.
        let mut selector = match base {
            Expr::Symbol { name } => name.clone(),
            _ => String::new(),
        };

        for segment in segments {
            match segment {
                Segment::Member { name, null_safe } => {
                    if current.is_null() {
                        if *null_safe {
                            return Ok(Value::Null);
                        }
                        return Err(EvalError::null_navigation(name.clone()));
                    }
                    let next = match &current {
                        Value::Object(map) => map.get(name).cloned().unwrap_or(Value::Null),
                        _ => Value::Null,
                    };
                    previous = std::mem::replace(&mut current, next);
                    selector = name.clone();
                }

                Segment::Subscript { index, null_safe } => {
                    if current.is_null() && *null_safe {
                        return Ok(Value::Null);
                    }
                    let key = self.evaluate(index)?;
                    if current.is_null() {
                        return Err(EvalError::null_navigation(key.to_display_string()));
                    }
                    let next = index_value(&current, &key);
                    previous = std::mem::replace(&mut current, next);
                    selector = key.to_display_string();
                }

                Segment::Call { args, null_safe } => {
                    if current.is_null() && *null_safe {
                        return Ok(Value::Null);
                    }
                    let f = match &current {
                        Value::Function(f) => f.clone(),
                        _ => return Err(EvalError::method_missing(selector.clone())),
                    };
                    let args = args
                        .iter()
                        .map(|arg| self.evaluate(arg))
                        .collect::<EvalResult<Vec<_>>>()?;
                    let result = f(&previous, &args)?;
                    previous = std::mem::replace(&mut current, result);
                }
            }
        }

        Ok(current)
    }
}

fn index_value(container: &Value, key: &Value) -> Value {
    match (container, key) {
        (Value::Object(map), Value::String(key)) => map.get(key).cloned().unwrap_or(Value::Null),
        (Value::Array(items), Value::Number(n)) => {
            if n.fract() == 0.0 && *n >= 0.0 {
                items.get(*n as usize).cloned().unwrap_or(Value::Null)
            } else {
                Value::Null
            }
        }
        _ => Value::Null,
    }
}
