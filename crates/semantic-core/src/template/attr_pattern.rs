// Attribute-syntax classification (spec §4.6): decides whether an attribute
// is a binding command, an interpolation, a controller shorthand, or a
// plain static attribute.
//
// Modeled as a registry rather than a hardcoded `match` so a host can extend
// it with custom attribute patterns (spec §3.3 "default binding commands/
// attribute patterns" living in the root scope) — the same
// registry-over-hardcoding shape `resources::ResourceCollections` uses for
// resource lookup.

use serde::{Deserialize, Serialize};

/// The binding commands a `target.command` attribute name can carry (spec
/// §4.6). `Unknown` preserves the literal command text for a gap at link
/// time rather than rejecting it during lowering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindingCommand {
    Bind,
    OneTime,
    ToView,
    FromView,
    TwoWay,
    Trigger,
    Capture,
    For,
    Ref,
    Call,
    Unknown(String),
}

impl BindingCommand {
    fn parse(s: &str) -> Self {
        match s {
            "bind" => BindingCommand::Bind,
            "one-time" => BindingCommand::OneTime,
            "to-view" => BindingCommand::ToView,
            "from-view" => BindingCommand::FromView,
            "two-way" => BindingCommand::TwoWay,
            "trigger" => BindingCommand::Trigger,
            "capture" => BindingCommand::Capture,
            "for" => BindingCommand::For,
            "ref" => BindingCommand::Ref,
            "call" => BindingCommand::Call,
            other => BindingCommand::Unknown(other.to_string()),
        }
    }
}

/// The known command suffixes (spec §4.6 "names containing
/// `.bind|.one-time|.to-view|.from-view|.two-way|.trigger|.capture|.for|.ref`").
/// An attribute whose suffix is not in this list but still contains a dot is
/// still treated as a binding command with `Unknown`, since a host may
/// register additional commands — it is never silently treated as static.
const KNOWN_COMMANDS: &[&str] = &["bind", "one-time", "to-view", "from-view", "two-way", "trigger", "capture", "for", "ref", "call"];

/// Template controllers recognized by shorthand attribute syntax even before
/// registration analysis runs, so lowering can synthesize their nested
/// template (spec §3.3 root-scope built-ins).
pub const BUILTIN_CONTROLLERS: &[&str] = &["if", "else", "repeat", "with", "switch", "case", "default-case", "promise", "then", "catch", "portal"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeClassification {
    /// `target.command="expr"` — a binding command attribute.
    BindingCommand { target: String, command: BindingCommand },
    /// A static attribute with no binding syntax and no interpolation.
    Static,
    /// A static-looking attribute whose value contains `${...}`.
    Interpolation,
}

/// Registry of attribute-syntax recognizers. The default registry
/// understands the built-in `target.command` dot syntax; a host may extend
/// it with custom patterns (e.g. `ref-target`, ADL-style shorthand) by
/// pushing additional recognizers.
#[derive(Debug, Clone, Default)]
pub struct AttributePatternRegistry {
    custom_patterns: Vec<CustomPattern>,
}

#[derive(Debug, Clone)]
struct CustomPattern {
    /// A literal attribute name this pattern matches exactly (e.g. a
    /// custom shorthand registered by a `@attributePattern`-equivalent).
    name: String,
    target: String,
    command: BindingCommand,
}

impl AttributePatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_custom(&mut self, name: impl Into<String>, target: impl Into<String>, command: BindingCommand) {
        self.custom_patterns.push(CustomPattern { name: name.into(), target: target.into(), command });
    }

    /// Classify one attribute's name+value pair.
    pub fn classify(&self, name: &str, value: Option<&str>) -> AttributeClassification {
        if let Some(custom) = self.custom_patterns.iter().find(|p| p.name == name) {
            return AttributeClassification::BindingCommand { target: custom.target.clone(), command: custom.command.clone() };
        }
        // Some controllers are authored bare, with no `.command` suffix
        // (`else`, `default-case`), since they carry no expression of their
        // own — still a controller shorthand, not a static attribute.
        if BUILTIN_CONTROLLERS.contains(&name) {
            return AttributeClassification::BindingCommand { target: name.to_string(), command: BindingCommand::Bind };
        }
        if let Some((target, command)) = name.rsplit_once('.') {
            if KNOWN_COMMANDS.contains(&command) || !target.is_empty() {
                return AttributeClassification::BindingCommand { target: target.to_string(), command: BindingCommand::parse(command) };
            }
        }
        if value.map(|v| v.contains("${")).unwrap_or(false) {
            return AttributeClassification::Interpolation;
        }
        AttributeClassification::Static
    }

    pub fn is_controller(&self, target: &str) -> bool {
        BUILTIN_CONTROLLERS.contains(&target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_dot_bind_as_binding_command() {
        let registry = AttributePatternRegistry::new();
        match registry.classify("value.bind", Some("user.name")) {
            AttributeClassification::BindingCommand { target, command } => {
                assert_eq!(target, "value");
                assert_eq!(command, BindingCommand::Bind);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn classifies_repeat_for_as_for_command() {
        let registry = AttributePatternRegistry::new();
        match registry.classify("repeat.for", Some("item of items")) {
            AttributeClassification::BindingCommand { target, command } => {
                assert_eq!(target, "repeat");
                assert_eq!(command, BindingCommand::For);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn classifies_plain_attribute_with_interpolation() {
        let registry = AttributePatternRegistry::new();
        assert_eq!(registry.classify("title", Some("Hello ${name}")), AttributeClassification::Interpolation);
    }

    #[test]
    fn classifies_plain_static_attribute() {
        let registry = AttributePatternRegistry::new();
        assert_eq!(registry.classify("class", Some("container")), AttributeClassification::Static);
    }
}
