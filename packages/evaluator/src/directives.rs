use std::collections::HashMap;

use tracing::debug;
use weft_dom::{DomError, Fragment, NodeId};

use crate::error::{EvalError, EvalResult, RenderResult};
use crate::template::{NodeOps, Template};
use crate::value::Value;

/// Reserved attribute namespace for directives.
pub(crate) const DIRECTIVE_PREFIX: &str = "data-tpl-";

/// Companion attribute naming the overlay binding for `with` / `each`.
const VAR_ATTRIBUTE: &str = "data-tpl-var";

/// The directive command set, in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Directive {
    If,
    With,
    Each,
    Value,
    ClassAppend,
    AttrAppend,
    Text,
    Html,
    Remove,
}

impl Directive {
    pub(crate) const ORDERED: [Directive; 9] = [
        Directive::If,
        Directive::With,
        Directive::Each,
        Directive::Value,
        Directive::ClassAppend,
        Directive::AttrAppend,
        Directive::Text,
        Directive::Html,
        Directive::Remove,
    ];

    pub(crate) fn attribute(self) -> &'static str {
        match self {
            Directive::If => "data-tpl-if",
            Directive::With => "data-tpl-with",
            Directive::Each => "data-tpl-each",
            Directive::Value => "data-tpl-value",
            Directive::ClassAppend => "data-tpl-class-append",
            Directive::AttrAppend => "data-tpl-attr-append",
            Directive::Text => "data-tpl-text",
            Directive::Html => "data-tpl-html",
            Directive::Remove => "data-tpl-remove",
        }
    }
}

pub(crate) fn apply(
    directive: Directive,
    template: &Template,
    out: &mut Fragment,
    node: NodeId,
    source: &str,
    ops: &mut NodeOps,
) -> RenderResult<()> {
    match directive {
        Directive::If => apply_if(template, out, node, source, ops),
        Directive::With => apply_with(template, out, node, source, ops),
        Directive::Each => apply_each(template, out, node, source, ops),
        Directive::Value => apply_value(template, out, node, source),
        Directive::ClassAppend => apply_class_append(template, out, node, source),
        Directive::AttrAppend => apply_attr_append(template, out, node, source),
        Directive::Text => apply_text(template, out, node, source, ops),
        Directive::Html => apply_html(template, out, node, source, ops),
        Directive::Remove => apply_remove(out, node, source, ops),
    }
}

fn apply_if(
    template: &Template,
    out: &mut Fragment,
    node: NodeId,
    source: &str,
    ops: &mut NodeOps,
) -> RenderResult<()> {
    let accept = template.evaluate(source)?;
    if !accept.is_truthy() {
        ops.remove(out.dom_mut(), node);
    }
    Ok(())
}

// Render the node as a one-node sub-template with one more overlay; the
// result replaces the node as a leading insertion.
fn apply_with(
    template: &Template,
    out: &mut Fragment,
    node: NodeId,
    source: &str,
    ops: &mut NodeOps,
) -> RenderResult<()> {
    let evaluated = template.evaluate(source)?;
    let var = out.dom_mut().take_attribute(node, VAR_ATTRIBUTE);
    let sub = Fragment::from_subtree(out.dom(), node);
    let rendered = template
        .with_fragment(sub)
        .with_data(named_overlay(var, evaluated))
        .render()?;
    let imported = import_children(out, &rendered);
    ops.replace(out.dom_mut(), node, &imported)
}

// One sub-render per element, concatenated in iteration order.
fn apply_each(
    template: &Template,
    out: &mut Fragment,
    node: NodeId,
    source: &str,
    ops: &mut NodeOps,
) -> RenderResult<()> {
    let var = out.dom_mut().take_attribute(node, VAR_ATTRIBUTE);
    let evaluated = template.evaluate(source)?;
    let items = match evaluated {
        Value::Array(items) => items,
        other => return Err(EvalError::NotIterable(other.type_name()).into()),
    };

    debug!(items = items.len(), "iterating");
    let sub_template = template.with_fragment(Fragment::from_subtree(out.dom(), node));
    let mut new_nodes = Vec::new();
    for item in items {
        let rendered = sub_template
            .with_data(named_overlay(var.clone(), item))
            .render()?;
        new_nodes.extend(import_children(out, &rendered));
    }
    ops.replace(out.dom_mut(), node, &new_nodes)
}

// Live property, not a markup attribute; the node stays in place.
fn apply_value(
    template: &Template,
    out: &mut Fragment,
    node: NodeId,
    source: &str,
) -> RenderResult<()> {
    let value = template.evaluate(source)?;
    let json = value.to_json()?;
    out.dom_mut().set_property(node, "value", json);
    Ok(())
}

fn apply_class_append(
    template: &Template,
    out: &mut Fragment,
    node: NodeId,
    source: &str,
) -> RenderResult<()> {
    let value = template.evaluate(source)?;
    let classes = match value {
        Value::String(class) => vec![class],
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(class) => Ok(class),
                other => Err(EvalError::type_error(format!(
                    "Expected a string class name, got {}",
                    other.type_name()
                ))),
            })
            .collect::<EvalResult<_>>()?,
        other => {
            return Err(EvalError::type_error(format!(
                "Expected a string or array of strings, got {}",
                other.type_name()
            ))
            .into())
        }
    };
    for class in classes {
        out.dom_mut().class_list_add(node, &class);
    }
    Ok(())
}

// A `[name, value]` pair or an array of such pairs; empty is a no-op.
fn apply_attr_append(
    template: &Template,
    out: &mut Fragment,
    node: NodeId,
    source: &str,
) -> RenderResult<()> {
    let value = template.evaluate(source)?;
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(EvalError::type_error(format!(
                "Expected an attribute pair or array of pairs, got {}",
                other.type_name()
            ))
            .into())
        }
    };
    if items.is_empty() {
        return Ok(());
    }

    let pairs: Vec<Vec<Value>> = if matches!(items[0], Value::Array(_)) {
        items
            .into_iter()
            .map(|item| match item {
                Value::Array(pair) => Ok(pair),
                other => Err(EvalError::type_error(format!(
                    "Expected an attribute pair, got {}",
                    other.type_name()
                ))),
            })
            .collect::<EvalResult<_>>()?
    } else {
        vec![items]
    };

    for pair in pairs {
        if pair.len() != 2 {
            return Err(EvalError::type_error(format!(
                "Expected a [name, value] pair, got {} elements",
                pair.len()
            ))
            .into());
        }
        let name = match &pair[0] {
            Value::String(name) => name.clone(),
            other => {
                return Err(EvalError::type_error(format!(
                    "Expected a string attribute name, got {}",
                    other.type_name()
                ))
                .into())
            }
        };
        out.dom_mut()
            .set_attribute(node, name, pair[1].to_display_string());
    }
    Ok(())
}

// The result becomes the node's only text content, never re-parsed for
// interpolation.
fn apply_text(
    template: &Template,
    out: &mut Fragment,
    node: NodeId,
    source: &str,
    ops: &mut NodeOps,
) -> RenderResult<()> {
    let value = template.evaluate(source)?;
    let clone = replacement_clone(out, node);
    let content = value.to_display_string();
    if !content.is_empty() {
        let text = out.dom_mut().create_text(content);
        out.dom_mut().append_child(clone, text);
    }
    ops.replace(out.dom_mut(), node, &[clone])
}

// The result is parsed as markup into a fresh copy of the node.
fn apply_html(
    template: &Template,
    out: &mut Fragment,
    node: NodeId,
    source: &str,
    ops: &mut NodeOps,
) -> RenderResult<()> {
    let value = template.evaluate(source)?;
    let clone = replacement_clone(out, node);
    out.dom_mut()
        .parse_markup(clone, &value.to_display_string())?;
    ops.replace(out.dom_mut(), node, &[clone])
}

// `tag` promotes children trailing, ahead of the cursor, so nested
// directives still run after the unwrap; `body` and `all` remove content
// that is already behind it.
fn apply_remove(
    out: &mut Fragment,
    node: NodeId,
    source: &str,
    ops: &mut NodeOps,
) -> RenderResult<()> {
    match source.trim().to_ascii_lowercase().as_str() {
        "tag" => {
            let parent = out.dom().parent(node).ok_or(DomError::DetachedReference)?;
            let next = out.dom().next_sibling(node);
            let children: Vec<NodeId> = out.dom().children(node).to_vec();
            for child in children {
                match next {
                    Some(next) => out.dom_mut().insert_before(next, child)?,
                    None => out.dom_mut().append_child(parent, child),
                }
            }
            ops.remove(out.dom_mut(), node);
        }
        "body" => out.dom_mut().clear_children(node),
        "all" => ops.remove(out.dom_mut(), node),
        other => {
            return Err(
                EvalError::type_error(format!("Unknown remove mode \"{}\"", other)).into(),
            )
        }
    }
    Ok(())
}

fn named_overlay(var: Option<String>, value: Value) -> Value {
    match var {
        Some(name) if !name.is_empty() => {
            let mut map = HashMap::new();
            map.insert(name, value);
            Value::Object(map)
        }
        _ => value,
    }
}

fn import_children(out: &mut Fragment, rendered: &Fragment) -> Vec<NodeId> {
    rendered
        .children()
        .iter()
        .map(|&child| out.dom_mut().import(rendered.dom(), child))
        .collect()
}

// Shallow copy of the node with any leftover directive attributes
// dropped, used as the replacement shell for `text` / `html`.
fn replacement_clone(out: &mut Fragment, node: NodeId) -> NodeId {
    let clone = out.dom_mut().clone_shallow(node);
    for name in out.dom().attribute_names(clone) {
        if name.starts_with(DIRECTIVE_PREFIX) {
            out.dom_mut().remove_attribute(clone, &name);
        }
    }
    clone
}
