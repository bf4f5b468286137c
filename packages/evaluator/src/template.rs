use std::rc::Rc;

use tracing::{debug, instrument};
use weft_dom::{Dom, FilterDecision, Fragment, NodeId, TreeCursor};
use weft_parser::parse_templated;

use crate::directives::{self, Directive, DIRECTIVE_PREFIX};
use crate::error::{EvalError, EvalResult, RenderError, RenderResult};
use crate::evaluator::{interpret, Evaluator, OutputSegment};
use crate::modules::ModuleRegistry;
use crate::scope::ScopeStack;
use crate::value::Value;

/// A template: a stored fragment bound to a module registry and a data
/// stack.
///
/// Templates are immutable; `with_fragment` / `with_data` derive new
/// values sharing the registry. Rendering clones the fragment, so one
/// template can be rendered any number of times.
#[derive(Clone)]
pub struct Template {
    fragment: Rc<Fragment>,
    modules: Rc<ModuleRegistry>,
    stack: ScopeStack,
}

impl Template {
    pub fn from_html(html: &str, modules: ModuleRegistry) -> RenderResult<Self> {
        Ok(Self::from_fragment(Fragment::parse(html)?, modules))
    }

    pub fn from_fragment(fragment: Fragment, modules: ModuleRegistry) -> Self {
        Self {
            fragment: Rc::new(fragment),
            modules: Rc::new(modules),
            stack: ScopeStack::new(),
        }
    }

    /// Same registry and data stack over a different fragment.
    pub fn with_fragment(&self, fragment: Fragment) -> Self {
        Self {
            fragment: Rc::new(fragment),
            modules: Rc::clone(&self.modules),
            stack: self.stack.clone(),
        }
    }

    /// New template with one more data overlay on the stack.
    pub fn with_data(&self, overlay: impl Into<Value>) -> Self {
        Self {
            fragment: Rc::clone(&self.fragment),
            modules: Rc::clone(&self.modules),
            stack: self.stack.with_overlay(overlay.into()),
        }
    }

    /// Evaluate an expression against this template's bindings.
    pub fn evaluate(&self, source: &str) -> EvalResult<Value> {
        interpret(&self.modules, &self.stack, source)
    }

    /// Render the template: clone the fragment and rewrite the clone.
    #[instrument(skip_all, level = "debug")]
    pub fn render(&self) -> RenderResult<Fragment> {
        let mut out = Fragment::new();
        let root = out.root();
        for &child in self.fragment.children() {
            let imported = out.dom_mut().import(self.fragment.dom(), child);
            out.dom_mut().append_child(root, imported);
        }

        match self.rewrite(&mut out) {
            Ok(()) => Ok(out),
            Err(err) => Err(RenderError::template(self.fragment.to_html(), err)),
        }
    }

    pub fn render_with(&self, overlay: impl Into<Value>) -> RenderResult<Fragment> {
        self.with_data(overlay).render()
    }

    pub fn render_to_string(&self) -> RenderResult<String> {
        Ok(self.render()?.to_html())
    }

    // One forward pass over the clone. The pending-visit queue reproduces
    // the skip-already-passed guarantee: nodes inserted before the cursor
    // (leading) are final, children left queued (trailing) still run.
    fn rewrite(&self, out: &mut Fragment) -> RenderResult<()> {
        let mut ops = NodeOps::default();
        let mut cursor = TreeCursor::new([out.root()]);

        while let Some(node) = cursor.next(out.dom(), directive_filter) {
            ops.cleanup(out.dom_mut());
            let context = out.dom().to_html_shallow(node);

            if out.dom().is_text(node) {
                self.rewrite_text_node(out, node, &mut ops)
                    .map_err(|err| RenderError::text_node(context.clone(), err))?;
                continue;
            }

            for directive in Directive::ORDERED {
                let attr = directive.attribute();
                let Some(source) = out.dom_mut().take_attribute(node, attr) else {
                    continue;
                };
                debug!(command = attr, "applying directive");
                directives::apply(directive, self, out, node, &source, &mut ops)
                    .map_err(|err| RenderError::command(attr, context.clone(), err))?;
            }

            // Whatever reserved-namespace attributes remain are generic
            // bindings, applied in document order.
            let names: Vec<String> = out
                .dom()
                .attribute_names(node)
                .into_iter()
                .filter(|name| name.starts_with(DIRECTIVE_PREFIX))
                .collect();
            for name in names {
                let Some(source) = out.dom_mut().take_attribute(node, &name) else {
                    continue;
                };
                self.apply_generic_binding(out, node, &name, &source)
                    .map_err(|err| RenderError::command(name.clone(), context.clone(), err))?;
            }
        }

        ops.cleanup(out.dom_mut());
        Ok(())
    }

    // Evaluate a templated text node and replace it, leading, with its
    // rendered segments.
    fn rewrite_text_node(
        &self,
        out: &mut Fragment,
        node: NodeId,
        ops: &mut NodeOps,
    ) -> RenderResult<()> {
        let source = out.dom().text(node).unwrap_or_default().to_string();
        let segments = parse_templated(&source)?;
        let outputs = Evaluator::new(&self.modules, &self.stack).evaluate_templated(&segments)?;

        let mut new_nodes = Vec::new();
        for output in outputs {
            match output {
                OutputSegment::Text(value) => {
                    let content = value.to_display_string();
                    if !content.is_empty() {
                        new_nodes.push(out.dom_mut().create_text(content));
                    }
                }
                OutputSegment::Html(value) => {
                    let holder = out.dom_mut().create_fragment();
                    out.dom_mut()
                        .parse_markup(holder, &value.to_display_string())?;
                    new_nodes.extend(out.dom().children(holder).to_vec());
                }
                OutputSegment::Node(value) => match value {
                    Value::Null => {}
                    Value::Node(fragment) => {
                        for &child in fragment.children() {
                            new_nodes.push(out.dom_mut().import(fragment.dom(), child));
                        }
                    }
                    other => {
                        return Err(EvalError::type_error(format!(
                            "Expected a node value, got {}",
                            other.type_name()
                        ))
                        .into())
                    }
                },
            }
        }

        for new in new_nodes {
            out.dom_mut().insert_before(node, new)?;
        }
        ops.remove(out.dom_mut(), node);
        Ok(())
    }

    // Boolean results toggle a same-named plain attribute; non-null
    // results set it to the display string; null is a no-op.
    fn apply_generic_binding(
        &self,
        out: &mut Fragment,
        node: NodeId,
        attr_name: &str,
        source: &str,
    ) -> RenderResult<()> {
        let target = attr_name
            .strip_prefix(DIRECTIVE_PREFIX)
            .unwrap_or(attr_name)
            .to_string();
        let value = self.evaluate(source)?;
        match value {
            Value::Boolean(true) => {
                let name = target.clone();
                out.dom_mut().set_attribute(node, target, name);
            }
            Value::Boolean(false) => out.dom_mut().remove_attribute(node, &target),
            Value::Null => {}
            other => out
                .dom_mut()
                .set_attribute(node, target, other.to_display_string()),
        }
        Ok(())
    }
}

// Accept text nodes carrying both interpolation delimiters and elements
// carrying at least one reserved-namespace attribute.
fn directive_filter(dom: &Dom, id: NodeId) -> FilterDecision {
    if dom.is_text(id) {
        let text = dom.text(id).unwrap_or("");
        return if text.contains("{{") && text.contains("}}") {
            FilterDecision::Accept
        } else {
            FilterDecision::Reject
        };
    }
    if dom.is_element(id) && dom.has_attribute_with_prefix(id, DIRECTIVE_PREFIX) {
        return FilterDecision::Accept;
    }
    FilterDecision::Skip
}

/// Mutation helper shared by the directive handlers.
///
/// Removal is two-phase: marking clears children and strips the node's
/// remaining reserved-namespace attributes immediately (which also ends
/// command dispatch for the node), while detaching is deferred to the
/// next visit so the traversal position stays stable.
#[derive(Default)]
pub(crate) struct NodeOps {
    for_removal: Vec<NodeId>,
}

impl NodeOps {
    pub(crate) fn remove(&mut self, dom: &mut Dom, node: NodeId) {
        dom.clear_children(node);
        for name in dom.attribute_names(node) {
            if name.starts_with(DIRECTIVE_PREFIX) {
                dom.remove_attribute(node, &name);
            }
        }
        self.for_removal.push(node);
    }

    /// Leading replacement: the new nodes land behind the cursor and are
    /// never re-visited.
    pub(crate) fn replace(
        &mut self,
        dom: &mut Dom,
        node: NodeId,
        new_nodes: &[NodeId],
    ) -> RenderResult<()> {
        for &new in new_nodes {
            dom.insert_before(node, new)?;
        }
        self.remove(dom, node);
        Ok(())
    }

    pub(crate) fn cleanup(&mut self, dom: &mut Dom) {
        while let Some(node) = self.for_removal.pop() {
            dom.detach(node);
        }
    }
}
