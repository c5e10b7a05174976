// Name canonicalization (spec §3.2 invariants, §8 property 1/2).
//
// Every canonicalizer here is total and idempotent: `c(c(x)) == c(x)`.

/// kebab-case, used for custom-element and custom-attribute names.
pub fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower_or_digit = false;
    for ch in name.chars() {
        if ch == '_' || ch == ' ' {
            if !out.ends_with('-') && !out.is_empty() {
                out.push('-');
            }
            prev_lower_or_digit = false;
            continue;
        }
        if ch == '-' {
            if !out.ends_with('-') && !out.is_empty() {
                out.push('-');
            }
            prev_lower_or_digit = false;
            continue;
        }
        if ch.is_uppercase() {
            if prev_lower_or_digit && !out.ends_with('-') {
                out.push('-');
            }
            out.extend(ch.to_lowercase());
            prev_lower_or_digit = false;
        } else {
            out.push(ch);
            prev_lower_or_digit = ch.is_alphanumeric();
        }
    }
    out.trim_matches('-').to_string()
}

/// lowercase-trimmed, used for value-converter and binding-behavior names.
pub fn lower_trim(name: &str) -> String {
    name.trim().to_lowercase()
}

/// camelCase, used for bindable property names.
pub fn camel_case(name: &str) -> String {
    let kebab = kebab_case(name);
    let mut out = String::with_capacity(kebab.len());
    let mut capitalize_next = false;
    for (i, part) in kebab.split('-').enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            out.push_str(part);
        } else {
            let mut chars = part.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
        capitalize_next = true;
    }
    let _ = capitalize_next;
    out
}

/// Validate that a canonicalized element/attribute name is a legal custom
/// element name shape: lowercase, contains a hyphen, does not start with a
/// digit (spec §7 `invalid-resource-name`).
pub fn is_valid_element_name(canonical: &str) -> bool {
    !canonical.is_empty()
        && canonical.contains('-')
        && canonical.chars().next().map(|c| c.is_ascii_lowercase()).unwrap_or(false)
        && canonical.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Canonicalize and deduplicate an alias list: sorted, unique, kebab-cased
/// (spec §3.2, §8 property 2).
pub fn canonical_aliases(aliases: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<String> {
    let mut out: Vec<String> = aliases.into_iter().map(|a| kebab_case(a.as_ref())).collect();
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kebab_case_is_idempotent() {
        for input in ["FooBar", "foo_bar", "foo-bar", "FOOBar", "fooBar2Baz"] {
            let once = kebab_case(input);
            let twice = kebab_case(&once);
            assert_eq!(once, twice, "not idempotent for {input}");
        }
    }

    #[test]
    fn kebab_case_converts_pascal_case_class_name() {
        assert_eq!(kebab_case("FooBar"), "foo-bar");
        assert_eq!(kebab_case("HTTPHeader"), "http-header");
    }

    #[test]
    fn camel_case_is_idempotent() {
        for input in ["foo-bar", "fooBar", "FooBar", "value"] {
            let once = camel_case(input);
            let twice = camel_case(&once);
            assert_eq!(once, twice, "not idempotent for {input}");
        }
    }

    #[test]
    fn canonical_aliases_sorts_dedupes_and_kebabs() {
        let aliases = canonical_aliases(vec!["FooBar", "foo-bar", "Baz"]);
        assert_eq!(aliases, vec!["baz".to_string(), "foo-bar".to_string()]);
    }

    #[test]
    fn element_name_validation() {
        assert!(is_valid_element_name("foo-bar"));
        assert!(!is_valid_element_name("foobar"));
        assert!(!is_valid_element_name("Foo-Bar"));
        assert!(!is_valid_element_name("1-foo"));
    }
}
