use std::collections::HashMap;
use std::error::Error;

use serde_json::json;

use crate::error::RenderError;
use crate::modules::ModuleRegistry;
use crate::template::Template;
use crate::value::Value;
use weft_dom::Fragment;

fn modules() -> ModuleRegistry {
    ModuleRegistry::new().with_module_function("math", "isEven", |_, args| {
        match args.first() {
            Some(Value::Number(n)) => Ok(Value::Boolean(n % 2.0 == 0.0)),
            _ => Ok(Value::Boolean(false)),
        }
    })
}

fn render(html: &str, data: serde_json::Value) -> String {
    Template::from_html(html, modules())
        .unwrap()
        .with_data(data)
        .render_to_string()
        .unwrap()
}

fn render_value(html: &str, data: Value) -> String {
    Template::from_html(html, modules())
        .unwrap()
        .with_data(data)
        .render_to_string()
        .unwrap()
}

fn overlay_with_node(name: &str, markup: &str) -> Value {
    let mut map = HashMap::new();
    map.insert(
        name.to_string(),
        Value::node(Fragment::parse(markup).unwrap()),
    );
    Value::Object(map)
}

#[test]
fn test_each_iterates() {
    assert_eq!(
        render("<div data-tpl-each=\"self\">{{self}}</div>", json!([1, 2])),
        "<div>1</div><div>2</div>"
    );
}

#[test]
fn test_if_false_skips_rendering() {
    assert_eq!(
        render("<div data-tpl-if=\"false\">{{v}}</div>", json!({})),
        ""
    );
}

#[test]
fn test_if_true_renders() {
    assert_eq!(
        render("<div data-tpl-if=\"true\">{{a}}</div>", json!({"a": 1})),
        "<div>1</div>"
    );
}

#[test]
fn test_if_true_is_equivalent_to_no_directive() {
    assert_eq!(
        render("<div data-tpl-if=\"true\"><span>x</span></div>", json!({})),
        render("<div><span>x</span></div>", json!({}))
    );
}

#[test]
fn test_html_from_attribute() {
    assert_eq!(
        render(
            "<div data-tpl-html=\"a\">nope</div>",
            json!({"a": "<h1>test</h1>"})
        ),
        "<div><h1>test</h1></div>"
    );
}

#[test]
fn test_null_html_yields_empty() {
    assert_eq!(
        render("<div data-tpl-html=\"a\">nope</div>", json!({"a": null})),
        "<div></div>"
    );
    assert_eq!(
        render("<div data-tpl-html=\"a\">nope</div>", json!({})),
        "<div></div>"
    );
}

#[test]
fn test_text_from_attribute_is_escaped() {
    assert_eq!(
        render(
            "<div data-tpl-text=\"a\">nope</div>",
            json!({"a": "<h1>test</h1>"})
        ),
        "<div>&lt;h1&gt;test&lt;/h1&gt;</div>"
    );
}

#[test]
fn test_null_text_yields_empty() {
    assert_eq!(
        render("<div data-tpl-text=\"a\">nope</div>", json!({"a": null})),
        "<div></div>"
    );
    assert_eq!(
        render("<div data-tpl-text=\"a\">nope</div>", json!({})),
        "<div></div>"
    );
}

#[test]
fn test_text_interpolation_is_escaped() {
    assert_eq!(
        render("<div>b{{a}}d</div>", json!({"a": "<>"})),
        "<div>b&lt;&gt;d</div>"
    );
}

#[test]
fn test_null_text_interpolation_is_empty() {
    assert_eq!(render("<div>b{{a}}d</div>", json!({"a": null})), "<div>bd</div>");
    assert_eq!(render("<div>b{{a}}d</div>", json!({})), "<div>bd</div>");
}

#[test]
fn test_html_interpolation() {
    assert_eq!(
        render("<div>b{{{a}}}d</div>", json!({"a": "<span></span>"})),
        "<div>b<span></span>d</div>"
    );
}

#[test]
fn test_null_html_interpolation_is_empty() {
    assert_eq!(render("<div>b{{{a}}}d</div>", json!({"a": null})), "<div>bd</div>");
    assert_eq!(render("<div>b{{{a}}}d</div>", json!({})), "<div>bd</div>");
}

#[test]
fn test_node_interpolation() {
    assert_eq!(
        render_value(
            "<div>b{{{{a}}}}d</div>",
            overlay_with_node("a", "<span></span>")
        ),
        "<div>b<span></span>d</div>"
    );
}

#[test]
fn test_null_node_interpolation_is_empty() {
    assert_eq!(
        render("<div>b{{{{a}}}}d</div>", json!({"a": null})),
        "<div>bd</div>"
    );
    assert_eq!(render("<div>b{{{{a}}}}d</div>", json!({})), "<div>bd</div>");
}

#[test]
fn test_generic_attribute_bindings() {
    assert_eq!(
        render(
            "<div data-tpl-former=\"a\" data-tpl-latter=\"b\">content</div>",
            json!({"a": 1, "b": 2})
        ),
        "<div former=\"1\" latter=\"2\">content</div>"
    );
}

#[test]
fn test_boolean_generic_attribute_toggles_presence() {
    assert_eq!(
        render("<div data-tpl-hidden=\"a\">x</div>", json!({"a": true})),
        "<div hidden=\"hidden\">x</div>"
    );
    assert_eq!(
        render("<div data-tpl-hidden=\"a\">x</div>", json!({"a": false})),
        "<div>x</div>"
    );
    // Null results leave the attribute off entirely.
    assert_eq!(
        render("<div data-tpl-hidden=\"a\">x</div>", json!({})),
        "<div>x</div>"
    );
}

#[test]
fn test_remove_tag_unwraps() {
    assert_eq!(
        render("<div data-tpl-remove=\"tag\">123</div>", json!([1, 2, 3, 4])),
        "123"
    );
}

#[test]
fn test_remove_tag_does_not_cause_double_evaluation() {
    assert_eq!(
        render(
            "<div data-tpl-remove=\"tag\">{{a}}</div>",
            json!({"a": "{{'1'}}"})
        ),
        "{{'1'}}"
    );
}

#[test]
fn test_remove_tag_from_each() {
    assert_eq!(
        render(
            "<div data-tpl-each=\"self\" data-tpl-remove=\"tag\">{{ self }}</div>",
            json!([1, 2, 3, 4])
        ),
        "1234"
    );
}

#[test]
fn test_remove_tag_from_if() {
    assert_eq!(
        render(
            "<div data-tpl-if=\"true\" data-tpl-remove=\"tag\">{{ 1 }}</div>",
            json!({})
        ),
        "1"
    );
}

#[test]
fn test_remove_body_keeps_element() {
    assert_eq!(
        render("<div data-tpl-remove=\"body\"><span>x</span></div>", json!({})),
        "<div></div>"
    );
}

#[test]
fn test_remove_mode_is_case_insensitive() {
    assert_eq!(
        render("<div data-tpl-remove=\"ALL\"><span>x</span></div>", json!({})),
        ""
    );
}

#[test]
fn test_unknown_remove_mode_is_an_error() {
    let err = Template::from_html("<div data-tpl-remove=\"nope\"></div>", modules())
        .unwrap()
        .render()
        .unwrap_err();
    assert!(format!("{:?}", err).contains("Unknown remove mode \"nope\""));
}

#[test]
fn test_nested_each_then_if() {
    assert_eq!(
        render(
            "<div data-tpl-each=\"self\"><span data-tpl-if=\"#math:isEven(self)\">{{ self }}</span></div>",
            json!([1, 2, 3, 4])
        ),
        "<div></div><div><span>2</span></div><div></div><div><span>4</span></div>"
    );
}

#[test]
fn test_nested_each_then_if_removing_tags() {
    assert_eq!(
        render(
            "<div data-tpl-each=\"self\" data-tpl-remove=\"tag\"><span data-tpl-if=\"#math:isEven(self)\" data-tpl-remove=\"tag\">{{ self }}</span></div>",
            json!([1, 2, 3, 4])
        ),
        "24"
    );
}

#[test]
fn test_nested_if_then_each() {
    assert_eq!(
        render(
            "<div data-tpl-if=\"#math:isEven(2)\"><span data-tpl-each=\"self\">{{ self }}</span></div>",
            json!([1, 2, 3, 4])
        ),
        "<div><span>1</span><span>2</span><span>3</span><span>4</span></div>"
    );
}

#[test]
fn test_nested_if_then_each_removing_tags() {
    assert_eq!(
        render(
            "<div data-tpl-if=\"#math:isEven(2)\" data-tpl-remove=\"tag\"><span data-tpl-each=\"self\" data-tpl-remove=\"tag\">{{ self }}</span></div>",
            json!([1, 2, 3, 4])
        ),
        "1234"
    );
}

#[test]
fn test_text_directive_output_is_not_reevaluated() {
    assert_eq!(
        render("<div data-tpl-text=\"'{{a}}'\"></div>", json!({"a": 1})),
        "<div>{{a}}</div>"
    );
}

#[test]
fn test_html_directive_output_is_not_reevaluated() {
    assert_eq!(
        render("<div data-tpl-html=\"'{{a}}'\"></div>", json!({"a": 1})),
        "<div>{{a}}</div>"
    );
}

#[test]
fn test_each_output_is_not_reevaluated() {
    assert_eq!(
        render(
            "<div data-tpl-each=\"self\">{{self}}</div>",
            json!(["{{'1'}}", "{{'2'}}"])
        ),
        "<div>{{'1'}}</div><div>{{'2'}}</div>"
    );
}

#[test]
fn test_with_binds_a_named_overlay() {
    assert_eq!(
        render(
            "<div data-tpl-with=\"user\" data-tpl-var=\"u\"><span data-tpl-text=\"u.name\"></span></div>",
            json!({"user": {"name": "ada"}})
        ),
        "<div><span>ada</span></div>"
    );
}

#[test]
fn test_with_without_var_pushes_the_value_itself() {
    assert_eq!(
        render(
            "<div data-tpl-with=\"user\"><span data-tpl-text=\"name\"></span></div>",
            json!({"user": {"name": "ada"}})
        ),
        "<div><span>ada</span></div>"
    );
}

#[test]
fn test_each_with_var_names_the_element() {
    assert_eq!(
        render(
            "<li data-tpl-each=\"self\" data-tpl-var=\"n\">{{n}}</li>",
            json!([1, 2])
        ),
        "<li>1</li><li>2</li>"
    );
}

#[test]
fn test_each_over_non_iterable_is_an_error() {
    let err = Template::from_html("<div data-tpl-each=\"a\"></div>", modules())
        .unwrap()
        .with_data(json!({"a": 1}))
        .render()
        .unwrap_err();
    assert!(format!("{:?}", err).contains("Cannot iterate over number"));
}

#[test]
fn test_value_directive_sets_a_live_property() {
    let fragment = Template::from_html("<input data-tpl-value=\"a\">", modules())
        .unwrap()
        .with_data(json!({"a": 5}))
        .render()
        .unwrap();
    let input = fragment.children()[0];
    assert_eq!(fragment.dom().property(input, "value"), Some(&json!(5.0)));
    // The property never becomes a markup attribute.
    assert_eq!(fragment.to_html(), "<input>");
}

#[test]
fn test_class_append_keeps_existing_classes() {
    assert_eq!(
        render(
            "<div class=\"x\" data-tpl-class-append=\"a\"></div>",
            json!({"a": "y"})
        ),
        "<div class=\"x y\"></div>"
    );
    assert_eq!(
        render(
            "<div data-tpl-class-append=\"a\"></div>",
            json!({"a": ["y", "z"]})
        ),
        "<div class=\"y z\"></div>"
    );
}

#[test]
fn test_attr_append_single_pair_and_pair_list() {
    assert_eq!(
        render(
            "<div data-tpl-attr-append=\"a\"></div>",
            json!({"a": ["t", "1"]})
        ),
        "<div t=\"1\"></div>"
    );
    assert_eq!(
        render(
            "<div data-tpl-attr-append=\"a\"></div>",
            json!({"a": [["t", "1"], ["u", "2"]]})
        ),
        "<div t=\"1\" u=\"2\"></div>"
    );
    // Empty result is a no-op.
    assert_eq!(
        render("<div data-tpl-attr-append=\"a\"></div>", json!({"a": []})),
        "<div></div>"
    );
}

#[test]
fn test_command_error_carries_node_context() {
    let template = Template::from_html(
        "<div id=\"container\"><span>something ignored</span><div data-tpl-each=\"self\">{{self.boom()}}</div></div>",
        modules(),
    )
    .unwrap()
    .with_data(json!([1, 2]));

    let err = template.render().unwrap_err();
    let top = err.to_string();
    assert!(top.starts_with("Error rendering template in "), "got: {}", top);

    let mut messages = Vec::new();
    let mut source: Option<&dyn Error> = Some(&err);
    while let Some(current) = source {
        messages.push(current.to_string());
        source = current.source();
    }
    let chain = messages.join("\n");
    assert!(chain.contains("Error evaluating command data-tpl-each"), "got: {}", chain);
    assert!(chain.contains("Method missing \"boom\""), "got: {}", chain);
}

#[test]
fn test_text_node_error_carries_node_context() {
    let template = Template::from_html("<p>{{self.boom()}}</p>", modules())
        .unwrap()
        .with_data(json!([1, 2]));

    let err = template.render().unwrap_err();
    assert!(matches!(err, RenderError::Template { .. }));

    let mut messages = Vec::new();
    let mut source: Option<&dyn Error> = Some(&err);
    while let Some(current) = source {
        messages.push(current.to_string());
        source = current.source();
    }
    let chain = messages.join("\n");
    assert!(chain.contains("Error evaluating text node"), "got: {}", chain);
    assert!(chain.contains("Method missing \"boom\""), "got: {}", chain);
}

#[test]
fn test_syntax_error_in_directive_surfaces_as_command_error() {
    let err = Template::from_html("<div data-tpl-if=\"a &&\"></div>", modules())
        .unwrap()
        .render()
        .unwrap_err();
    assert!(format!("{:?}", err).contains("Command"));
}

#[test]
fn test_derived_templates_leave_the_original_alone() {
    let base = Template::from_html("<div>{{a}}</div>", modules())
        .unwrap()
        .with_data(json!({"a": 1}));
    let derived = base.with_data(json!({"a": 2}));
    assert_eq!(base.render_to_string().unwrap(), "<div>1</div>");
    assert_eq!(derived.render_to_string().unwrap(), "<div>2</div>");
    // The same template renders repeatedly from the pristine fragment.
    assert_eq!(base.render_to_string().unwrap(), "<div>1</div>");
}
