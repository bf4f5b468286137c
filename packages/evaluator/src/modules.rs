use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::EvalResult;
use crate::value::{HostFunction, Value};

/// Host functions callable from expressions via `#name(...)` and
/// `#module:name(...)`.
///
/// The registry owns a default table for unqualified calls plus named
/// nested modules. It is immutable per render; the `with_*` builders
/// derive extended copies, so templates sharing a registry never observe
/// each other's additions.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    functions: HashMap<String, HostFunction>,
    modules: HashMap<String, HashMap<String, HostFunction>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function in the default (unqualified) table.
    pub fn with_function<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> EvalResult<Value> + 'static,
    {
        self.functions.insert(name.into(), Rc::new(f));
        self
    }

    /// Register a function under a named module.
    pub fn with_module_function<F>(
        mut self,
        module: impl Into<String>,
        name: impl Into<String>,
        f: F,
    ) -> Self
    where
        F: Fn(&Value, &[Value]) -> EvalResult<Value> + 'static,
    {
        self.modules
            .entry(module.into())
            .or_default()
            .insert(name.into(), Rc::new(f));
        self
    }

    /// Register an empty named module.
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.modules.entry(module.into()).or_default();
        self
    }

    pub(crate) fn default_functions(&self) -> &HashMap<String, HostFunction> {
        &self.functions
    }

    pub(crate) fn module(&self, name: &str) -> Option<&HashMap<String, HostFunction>> {
        self.modules.get(name)
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut functions: Vec<&String> = self.functions.keys().collect();
        functions.sort();
        let mut modules: Vec<&String> = self.modules.keys().collect();
        modules.sort();
        f.debug_struct("ModuleRegistry")
            .field("functions", &functions)
            .field("modules", &modules)
            .finish()
    }
}
