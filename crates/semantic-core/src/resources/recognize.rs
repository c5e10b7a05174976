// Pattern recognition (spec §4.4): four recognizers run per class, in
// order, each producing at most one candidate. The first matching
// recognizer wins per class.

use super::canon::{camel_case, canonical_aliases, is_valid_element_name, kebab_case, lower_trim};
use super::{AttributeLike, Bindable, BindingMode, Candidate, ElementLike, EvidenceSourceKind, NameOnly, ResourceDef};
use crate::eval::EvaluatedClass;
use crate::gaps::{Gap, GapKind};
use crate::source::{NormalizedPath, SourceFileId, SourceSpan, Sourced};
use crate::value::{AnalyzableValue, Literal};
use std::collections::HashMap;

/// Decorator names this recognizer understands, mapped to the resource kind
/// they declare.
const ELEMENT_DECORATORS: &[&str] = &["customElement"];
const ATTRIBUTE_DECORATORS: &[&str] = &["customAttribute", "templateController"];
const CONVERTER_DECORATORS: &[&str] = &["valueConverter"];
const BEHAVIOR_DECORATORS: &[&str] = &["bindingBehavior"];

/// Run the four recognizers over one class, in priority order, returning the
/// first candidate found plus any gaps it raised.
pub fn recognize_class(
    class: &EvaluatedClass,
    file: &NormalizedPath,
    next_id: &mut u32,
    sibling_html_exists: impl Fn(&NormalizedPath) -> bool,
) -> (Option<Candidate>, Vec<Gap>) {
    let mut gaps = Vec::new();

    if let Some(c) = recognize_decorator(class, file, next_id, &mut gaps) {
        return (Some(c), gaps);
    }
    if let Some(c) = recognize_static_shape(class, file, next_id, &mut gaps) {
        return (Some(c), gaps);
    }
    if let Some(c) = recognize_convention(class, file, next_id, sibling_html_exists) {
        return (Some(c), gaps);
    }
    (None, gaps)
}

/// Recognizer 1: explicit decorator annotations.
fn recognize_decorator(
    class: &EvaluatedClass,
    file: &NormalizedPath,
    next_id: &mut u32,
    gaps: &mut Vec<Gap>,
) -> Option<Candidate> {
    for deco in &class.decorators {
        let opts = deco.args.first();
        if ELEMENT_DECORATORS.contains(&deco.name.as_str()) {
            let (name, aliases, bindables, containerless, dependencies) = read_element_options(class, opts, gaps, file, deco.span);
            let def = ResourceDef::CustomElement(ElementLike {
                name,
                class_name: class.name.clone(),
                file: file.clone(),
                aliases,
                bindables,
                containerless,
                inline_template: None,
                dependencies,
            });
            return Some(make_candidate(next_id, def, EvidenceSourceKind::AnalysisExplicitDecoratorOrDefine));
        }
        if ATTRIBUTE_DECORATORS.contains(&deco.name.as_str()) {
            let is_tc = deco.name == "templateController";
            let (name, aliases, bindables, no_multi, dependencies) = read_attribute_options(class, opts, gaps, file, deco.span);
            let attr = AttributeLike {
                name,
                class_name: class.name.clone(),
                file: file.clone(),
                aliases,
                bindables,
                is_template_controller: is_tc,
                no_multi_bindings: no_multi,
                dependencies,
            };
            let def = if is_tc { ResourceDef::TemplateController(attr) } else { ResourceDef::CustomAttribute(attr) };
            return Some(make_candidate(next_id, def, EvidenceSourceKind::AnalysisExplicitDecoratorOrDefine));
        }
        if CONVERTER_DECORATORS.contains(&deco.name.as_str()) || BEHAVIOR_DECORATORS.contains(&deco.name.as_str()) {
            let name = read_name_only(class, opts, gaps, file, deco.span);
            let name_only = NameOnly { name, class_name: class.name.clone(), file: file.clone(), aliases: vec![] };
            let def = if CONVERTER_DECORATORS.contains(&deco.name.as_str()) {
                ResourceDef::ValueConverter(name_only)
            } else {
                ResourceDef::BindingBehavior(name_only)
            };
            return Some(make_candidate(next_id, def, EvidenceSourceKind::AnalysisExplicitDecoratorOrDefine));
        }
    }
    None
}

/// Recognizer 2: a static property bearing a compile-time configuration
/// object, e.g. `static $au = { type: 'custom-element', name: 'foo-bar' }`.
fn recognize_static_shape(
    class: &EvaluatedClass,
    file: &NormalizedPath,
    next_id: &mut u32,
    gaps: &mut Vec<Gap>,
) -> Option<Candidate> {
    let (_, shape) = class.static_properties.iter().find(|(k, _)| k == "$au")?;
    let AnalyzableValue::Object { properties, .. } = shape else {
        return None;
    };
    let type_value = properties.iter().find(|(k, _)| k == "type").map(|(_, v)| v)?;
    let AnalyzableValue::Literal(Literal::String(type_str)) = type_value else {
        return None;
    };
    let span = SourceSpan::new(class.span.span, class.span.file.unwrap_or(SourceFileId(0)));
    let def = match type_str.as_str() {
        "custom-element" => {
            let (name, aliases, bindables, containerless, dependencies) = read_element_properties(properties, class, gaps, file, span);
            ResourceDef::CustomElement(ElementLike {
                name,
                class_name: class.name.clone(),
                file: file.clone(),
                aliases,
                bindables,
                containerless,
                inline_template: None,
                dependencies,
            })
        }
        "custom-attribute" | "template-controller" => {
            let (name, aliases, bindables, no_multi, dependencies) = read_attribute_properties(properties, class, gaps, file, span);
            let attr = AttributeLike {
                name,
                class_name: class.name.clone(),
                file: file.clone(),
                aliases,
                bindables,
                is_template_controller: type_str == "template-controller",
                no_multi_bindings: no_multi,
                dependencies,
            };
            if type_str == "template-controller" {
                ResourceDef::TemplateController(attr)
            } else {
                ResourceDef::CustomAttribute(attr)
            }
        }
        "value-converter" | "binding-behavior" => {
            let name = read_name_only_from_properties(properties, class, span);
            let name_only = NameOnly { name, class_name: class.name.clone(), file: file.clone(), aliases: vec![] };
            if type_str == "value-converter" {
                ResourceDef::ValueConverter(name_only)
            } else {
                ResourceDef::BindingBehavior(name_only)
            }
        }
        _ => return None,
    };
    Some(make_candidate(next_id, def, EvidenceSourceKind::AnalysisExplicitStaticShape))
}

/// Recognizer 3: class-name + sibling-file inference (`foo.ts` + `foo.html`
/// => element `foo`). Only applies to exported classes with no other
/// evidence.
fn recognize_convention(
    class: &EvaluatedClass,
    file: &NormalizedPath,
    next_id: &mut u32,
    sibling_html_exists: impl Fn(&NormalizedPath) -> bool,
) -> Option<Candidate> {
    if !class.is_exported {
        return None;
    }
    let sibling = file.with_extension("html");
    if !sibling_html_exists(&sibling) {
        return None;
    }
    let canonical = kebab_case(&class.name);
    let span = SourceSpan::new(class.span.span, class.span.file.unwrap_or(SourceFileId(0)));
    let def = ResourceDef::CustomElement(ElementLike {
        name: Sourced::new(canonical, span),
        class_name: class.name.clone(),
        file: file.clone(),
        aliases: vec![],
        bindables: HashMap::new(),
        containerless: false,
        inline_template: None,
        dependencies: vec![],
    });
    Some(make_candidate(next_id, def, EvidenceSourceKind::AnalysisConvention))
}

/// Recognizer 4: a top-level factory call registered on the host API, e.g.
/// `CustomElement.define({ name: 'foo-bar' }, FooBar)`.
pub fn recognize_define_call(
    call_path: &[String],
    args: &[AnalyzableValue],
    class_name_hint: Option<&str>,
    file: &NormalizedPath,
    span: SourceSpan,
    next_id: &mut u32,
    gaps: &mut Vec<Gap>,
) -> Option<Candidate> {
    let kind = match call_path.last().map(String::as_str) {
        Some("define") => call_path.get(call_path.len().wrapping_sub(2)).map(String::as_str),
        _ => None,
    }?;
    let class_name = class_name_hint.unwrap_or("Anonymous").to_string();
    let def = match kind {
        "CustomElement" => {
            let AnalyzableValue::Object { properties, .. } = args.first()? else { return None };
            let (name, aliases, bindables, containerless, dependencies) =
                read_element_properties(properties, &placeholder_class(&class_name, span), gaps, file, span);
            ResourceDef::CustomElement(ElementLike { name, class_name, file: file.clone(), aliases, bindables, containerless, inline_template: None, dependencies })
        }
        "CustomAttribute" => {
            let AnalyzableValue::Object { properties, .. } = args.first()? else { return None };
            let (name, aliases, bindables, no_multi, dependencies) =
                read_attribute_properties(properties, &placeholder_class(&class_name, span), gaps, file, span);
            ResourceDef::CustomAttribute(AttributeLike { name, class_name, file: file.clone(), aliases, bindables, is_template_controller: false, no_multi_bindings: no_multi, dependencies })
        }
        "ValueConverter" => {
            let AnalyzableValue::Object { properties, .. } = args.first()? else { return None };
            let name = read_name_only_from_properties(properties, &placeholder_class(&class_name, span), span);
            ResourceDef::ValueConverter(NameOnly { name, class_name, file: file.clone(), aliases: vec![] })
        }
        "BindingBehavior" => {
            let AnalyzableValue::Object { properties, .. } = args.first()? else { return None };
            let name = read_name_only_from_properties(properties, &placeholder_class(&class_name, span), span);
            ResourceDef::BindingBehavior(NameOnly { name, class_name, file: file.clone(), aliases: vec![] })
        }
        _ => return None,
    };
    Some(make_candidate(next_id, def, EvidenceSourceKind::AnalysisExplicitDecoratorOrDefine))
}

fn placeholder_class(name: &str, span: SourceSpan) -> EvaluatedClass {
    EvaluatedClass {
        name: name.to_string(),
        span,
        decorators: vec![],
        static_properties: vec![],
        is_exported: false,
        is_default_export: false,
    }
}

fn make_candidate(next_id: &mut u32, def: ResourceDef, source_kind: EvidenceSourceKind) -> Candidate {
    let id = *next_id;
    *next_id += 1;
    Candidate { id, def, source_kind, evidence_rank: 0 }
}

fn option_properties(opts: Option<&AnalyzableValue>) -> Vec<(String, AnalyzableValue)> {
    match opts {
        Some(AnalyzableValue::Object { properties, .. }) => properties.clone(),
        Some(AnalyzableValue::Literal(Literal::String(s))) => {
            vec![("name".to_string(), AnalyzableValue::Literal(Literal::String(s.clone())))]
        }
        _ => vec![],
    }
}

#[allow(clippy::type_complexity)]
fn read_element_options(
    class: &EvaluatedClass,
    opts: Option<&AnalyzableValue>,
    gaps: &mut Vec<Gap>,
    file: &NormalizedPath,
    span: SourceSpan,
) -> (Sourced<String>, Vec<String>, HashMap<String, Bindable>, bool, Vec<String>) {
    let props = option_properties(opts);
    read_element_properties(&props, class, gaps, file, span)
}

#[allow(clippy::type_complexity)]
fn read_element_properties(
    props: &[(String, AnalyzableValue)],
    class: &EvaluatedClass,
    gaps: &mut Vec<Gap>,
    file: &NormalizedPath,
    span: SourceSpan,
) -> (Sourced<String>, Vec<String>, HashMap<String, Bindable>, bool, Vec<String>) {
    let name = read_name_from_properties(props, class, gaps, file, span);
    let aliases = read_aliases(props);
    let bindables = read_bindables(props, span);
    let containerless = read_bool(props, "containerless");
    let dependencies = read_string_array(props, "dependencies");
    (name, aliases, bindables, containerless, dependencies)
}

#[allow(clippy::type_complexity)]
fn read_attribute_options(
    class: &EvaluatedClass,
    opts: Option<&AnalyzableValue>,
    gaps: &mut Vec<Gap>,
    file: &NormalizedPath,
    span: SourceSpan,
) -> (Sourced<String>, Vec<String>, HashMap<String, Bindable>, bool, Vec<String>) {
    let props = option_properties(opts);
    read_attribute_properties(&props, class, gaps, file, span)
}

#[allow(clippy::type_complexity)]
fn read_attribute_properties(
    props: &[(String, AnalyzableValue)],
    class: &EvaluatedClass,
    gaps: &mut Vec<Gap>,
    file: &NormalizedPath,
    span: SourceSpan,
) -> (Sourced<String>, Vec<String>, HashMap<String, Bindable>, bool, Vec<String>) {
    let name = read_name_from_properties(props, class, gaps, file, span);
    let aliases = read_aliases(props);
    let bindables = read_bindables(props, span);
    let no_multi = read_bool(props, "noMultiBindings");
    let dependencies = read_string_array(props, "dependencies");
    (name, aliases, bindables, no_multi, dependencies)
}

fn read_name_only(
    class: &EvaluatedClass,
    opts: Option<&AnalyzableValue>,
    _gaps: &mut Vec<Gap>,
    _file: &NormalizedPath,
    span: SourceSpan,
) -> Sourced<String> {
    let props = option_properties(opts);
    read_name_only_from_properties(&props, class, span)
}

/// Name canonicalization for value-converters and binding-behaviors, which
/// use lowercase-trimmed identifiers rather than kebab-case.
fn read_name_only_from_properties(props: &[(String, AnalyzableValue)], class: &EvaluatedClass, span: SourceSpan) -> Sourced<String> {
    let raw = props.iter().find(|(k, _)| k == "name").and_then(|(_, v)| string_literal(v));
    let canonical = match raw {
        Some(s) => lower_trim(&s),
        None => lower_trim(&class.name),
    };
    Sourced::new(canonical, span)
}

fn read_name_from_properties(
    props: &[(String, AnalyzableValue)],
    class: &EvaluatedClass,
    gaps: &mut Vec<Gap>,
    file: &NormalizedPath,
    span: SourceSpan,
) -> Sourced<String> {
    let raw = props.iter().find(|(k, _)| k == "name").and_then(|(_, v)| string_literal(v));
    let (canonical, from_convention) = match raw {
        Some(s) => (kebab_case(&s), false),
        None => (kebab_case(&class.name), true),
    };
    if !is_valid_element_name(&canonical) && !from_convention {
        gaps.push(
            Gap::new(
                GapKind::InvalidResourceName,
                format!("resource name `{canonical}` on class `{}`", class.name),
                "the resource name does not canonicalize to a valid identifier for its kind",
            )
            .at(span)
            .suggest(format!("use a kebab-case name with a hyphen, e.g. `{}-view`", class.name.to_lowercase())),
        );
    }
    let _ = file;
    Sourced::new(canonical, span)
}

fn read_aliases(props: &[(String, AnalyzableValue)]) -> Vec<String> {
    let raw = read_string_array(props, "aliases");
    canonical_aliases(raw)
}

fn read_string_array(props: &[(String, AnalyzableValue)], key: &str) -> Vec<String> {
    match props.iter().find(|(k, _)| k == key).map(|(_, v)| v) {
        Some(AnalyzableValue::Array(items)) => items.iter().filter_map(string_literal).collect(),
        _ => vec![],
    }
}

fn read_bool(props: &[(String, AnalyzableValue)], key: &str) -> bool {
    matches!(
        props.iter().find(|(k, _)| k == key).map(|(_, v)| v),
        Some(AnalyzableValue::Literal(Literal::Bool(true)))
    )
}

fn read_bindables(props: &[(String, AnalyzableValue)], span: SourceSpan) -> HashMap<String, Bindable> {
    let mut out = HashMap::new();
    match props.iter().find(|(k, _)| k == "bindables").map(|(_, v)| v) {
        Some(AnalyzableValue::Array(items)) => {
            for item in items {
                match item {
                    AnalyzableValue::Literal(Literal::String(name)) => {
                        let canonical = camel_case(name);
                        out.insert(
                            canonical.clone(),
                            Bindable { name: Sourced::new(canonical, span), attribute: None, mode: None, primary: false },
                        );
                    }
                    AnalyzableValue::Object { properties, .. } => {
                        if let Some(name) = properties.iter().find(|(k, _)| k == "name").and_then(|(_, v)| string_literal(v)) {
                            let canonical = camel_case(&name);
                            let attribute = properties.iter().find(|(k, _)| k == "attribute").and_then(|(_, v)| string_literal(v));
                            let mode = properties
                                .iter()
                                .find(|(k, _)| k == "mode")
                                .and_then(|(_, v)| string_literal(v))
                                .and_then(|m| binding_mode_from_str(&m));
                            let primary = matches!(
                                properties.iter().find(|(k, _)| k == "primary").map(|(_, v)| v),
                                Some(AnalyzableValue::Literal(Literal::Bool(true)))
                            );
                            out.insert(
                                canonical.clone(),
                                Bindable { name: Sourced::new(canonical, span), attribute, mode, primary },
                            );
                        }
                    }
                    _ => {}
                }
            }
        }
        Some(AnalyzableValue::Object { properties, .. }) => {
            for (name, _) in properties {
                let canonical = camel_case(name);
                out.insert(
                    canonical.clone(),
                    Bindable { name: Sourced::new(canonical, span), attribute: None, mode: None, primary: false },
                );
            }
        }
        _ => {}
    }
    out
}

fn binding_mode_from_str(s: &str) -> Option<BindingMode> {
    match s {
        "oneTime" | "one-time" => Some(BindingMode::OneTime),
        "toView" | "to-view" => Some(BindingMode::ToView),
        "fromView" | "from-view" => Some(BindingMode::FromView),
        "twoWay" | "two-way" => Some(BindingMode::TwoWay),
        "default" => Some(BindingMode::Default),
        _ => None,
    }
}

fn string_literal(v: &AnalyzableValue) -> Option<String> {
    match v {
        AnalyzableValue::Literal(Literal::String(s)) => Some(s.clone()),
        AnalyzableValue::Reference { resolved: Some(inner), .. } => string_literal(inner),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{SourceFileId, Span};

    fn class_with_decorator(deco_name: &str, name_literal: &str, bindables: Vec<&str>) -> EvaluatedClass {
        let bindables_value = AnalyzableValue::Array(
            bindables
                .into_iter()
                .map(|b| AnalyzableValue::Literal(Literal::String(b.to_string())))
                .collect(),
        );
        EvaluatedClass {
            name: "FooBar".to_string(),
            span: SourceSpan::synthetic(),
            decorators: vec![crate::eval::EvaluatedDecorator {
                name: deco_name.to_string(),
                args: vec![AnalyzableValue::Object {
                    properties: vec![
                        ("name".to_string(), AnalyzableValue::Literal(Literal::String(name_literal.to_string()))),
                        ("bindables".to_string(), bindables_value),
                    ],
                    methods: vec![],
                }],
                span: SourceSpan::new(Span::new(0, 5), SourceFileId(0)),
            }],
            static_properties: vec![],
            is_exported: true,
            is_default_export: false,
        }
    }

    #[test]
    fn decorator_recognizer_produces_custom_element() {
        let class = class_with_decorator("customElement", "foo-bar", vec!["value"]);
        let file = NormalizedPath::new("/p/src/foo-bar.ts");
        let mut next_id = 0;
        let (candidate, gaps) = recognize_class(&class, &file, &mut next_id, |_| false);
        assert!(gaps.is_empty());
        let candidate = candidate.unwrap();
        match candidate.def {
            ResourceDef::CustomElement(ref e) => {
                assert_eq!(e.name.value, "foo-bar");
                assert!(e.bindables.contains_key("value"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn convention_recognizer_requires_sibling_html() {
        let class = EvaluatedClass {
            name: "Widget".to_string(),
            span: SourceSpan::synthetic(),
            decorators: vec![],
            static_properties: vec![],
            is_exported: true,
            is_default_export: false,
        };
        let file = NormalizedPath::new("/p/src/widget.ts");
        let mut next_id = 0;
        let (none, _) = recognize_class(&class, &file, &mut next_id, |_| false);
        assert!(none.is_none());
        let (some, _) = recognize_class(&class, &file, &mut next_id, |p| p.as_str() == "/p/src/widget.html");
        let candidate = some.unwrap();
        match candidate.def {
            ResourceDef::CustomElement(ref e) => assert_eq!(e.name.value, "widget"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
