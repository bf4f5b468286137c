use crate::value::Value;

/// Layered data context for symbol lookup.
///
/// Overlays are scanned newest to oldest; the first mapping overlay that
/// owns the key wins. Non-mapping overlays (a scalar or list element
/// pushed by iteration) are skipped by key lookup but are still what
/// `self` resolves to when on top. Stacks are never mutated in place:
/// derived renders extend a copy.
#[derive(Debug, Clone, Default)]
pub struct ScopeStack {
    overlays: Vec<Value>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_overlays(overlays: Vec<Value>) -> Self {
        Self { overlays }
    }

    /// New stack with one more overlay on top.
    pub fn with_overlay(&self, overlay: Value) -> Self {
        let mut overlays = self.overlays.clone();
        overlays.push(overlay);
        Self { overlays }
    }

    pub fn top(&self) -> Option<&Value> {
        self.overlays.last()
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        for overlay in self.overlays.iter().rev() {
            if let Value::Object(map) = overlay {
                if let Some(value) = map.get(name) {
                    return Some(value.clone());
                }
            }
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }
}
