//! Query-by-example.
//!
//! A probe lists the values it carries; every non-null, non-ignored value
//! becomes a predicate. Text matching is case-sensitive unless the matcher
//! asks for `ignore_case`: exact text compiles to `=`, prefix/substring/
//! suffix to `GLOB`, and any case-insensitive text match to `LIKE`.
//! Identity and audit fields are never part of a probe.

use crate::query::descriptor::{Operator, QueryDescriptor};
use crate::query::value::Value;
use crate::schema::EntitySchema;
use std::collections::BTreeSet;

/// A partially filled value used as a query template.
pub trait Probe {
    fn schema() -> &'static EntitySchema;
    /// `(path, value)` pairs; `Value::Null` means "not constrained".
    fn probe_values(&self) -> Vec<(&'static str, Value)>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StringMatcher {
    #[default]
    Exact,
    StartsWith,
    Contains,
    EndsWith,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExampleMatcher {
    ignored: BTreeSet<String>,
    strings: StringMatcher,
    ignore_case: bool,
}

impl ExampleMatcher {
    pub fn matching() -> Self {
        Self::default()
    }

    pub fn with_ignore_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_string_matcher(mut self, strings: StringMatcher) -> Self {
        self.strings = strings;
        self
    }

    /// ASCII case-insensitive text matching for every string matcher.
    pub fn with_ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        self.ignored.contains(path)
    }
}

#[derive(Debug, Clone)]
pub struct Example<P> {
    probe: P,
    matcher: ExampleMatcher,
}

impl<P: Probe> Example<P> {
    pub fn of(probe: P) -> Self {
        Self::with_matcher(probe, ExampleMatcher::matching())
    }

    pub fn with_matcher(probe: P, matcher: ExampleMatcher) -> Self {
        Self { probe, matcher }
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    pub fn to_descriptor(&self) -> QueryDescriptor {
        let mut descriptor = QueryDescriptor::new();
        for (path, value) in self.probe.probe_values() {
            if value.is_null() || self.matcher.is_ignored(path) {
                continue;
            }
            descriptor = match value.as_text() {
                Some(text) => text_predicate(descriptor, path, text, &self.matcher),
                None => descriptor.eq(path, value.clone()),
            };
        }
        descriptor
    }
}

fn text_predicate(
    descriptor: QueryDescriptor,
    path: &str,
    text: &str,
    matcher: &ExampleMatcher,
) -> QueryDescriptor {
    if matcher.ignore_case {
        let text = escape_like(text);
        let pattern = match matcher.strings {
            StringMatcher::Exact => text,
            StringMatcher::StartsWith => format!("{text}%"),
            StringMatcher::Contains => format!("%{text}%"),
            StringMatcher::EndsWith => format!("%{text}"),
        };
        return descriptor.filter(path, Operator::Like, pattern);
    }
    let text_glob = escape_glob(text);
    let pattern = match matcher.strings {
        StringMatcher::Exact => return descriptor.eq(path, text),
        StringMatcher::StartsWith => format!("{text_glob}*"),
        StringMatcher::Contains => format!("*{text_glob}*"),
        StringMatcher::EndsWith => format!("*{text_glob}"),
    };
    descriptor.filter(path, Operator::Glob, pattern)
}

/// Wraps `GLOB` metacharacters in single-character classes.
pub fn escape_glob(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '*' | '?' | '[' => {
                escaped.push('[');
                escaped.push(ch);
                escaped.push(']');
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Escapes `LIKE` wildcards with `\`.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::{escape_glob, escape_like, Example, ExampleMatcher, Probe, StringMatcher};
    use crate::query::descriptor::Operator;
    use crate::query::value::Value;
    use crate::schema::{EntitySchema, MEMBER_SCHEMA};

    struct NameAge(&'static str, i64);

    impl Probe for NameAge {
        fn schema() -> &'static EntitySchema {
            &MEMBER_SCHEMA
        }

        fn probe_values(&self) -> Vec<(&'static str, Value)> {
            vec![
                ("username", Value::from(self.0)),
                ("age", Value::from(self.1)),
                ("team.name", Value::Null),
            ]
        }
    }

    #[test]
    fn ignored_and_null_paths_are_skipped() {
        let example = Example::with_matcher(
            NameAge("m1", 0),
            ExampleMatcher::matching().with_ignore_paths(["age"]),
        );
        let descriptor = example.to_descriptor();
        assert_eq!(descriptor.predicates.len(), 1);
        assert_eq!(descriptor.predicates[0].field, "username");
        assert_eq!(descriptor.predicates[0].op, Operator::Eq);
    }

    #[test]
    fn string_matcher_builds_case_sensitive_glob() {
        let example = Example::with_matcher(
            NameAge("m*1", 3),
            ExampleMatcher::matching().with_string_matcher(StringMatcher::StartsWith),
        );
        let descriptor = example.to_descriptor();
        assert_eq!(descriptor.predicates[0].op, Operator::Glob);
        assert_eq!(descriptor.predicates[0].value, Value::from("m[*]1*"));
        assert_eq!(descriptor.predicates[1].op, Operator::Eq);
    }

    #[test]
    fn ignore_case_switches_text_matching_to_escaped_like() {
        let contains = Example::with_matcher(
            NameAge("m_1", 3),
            ExampleMatcher::matching()
                .with_string_matcher(StringMatcher::Contains)
                .with_ignore_case(),
        )
        .to_descriptor();
        assert_eq!(contains.predicates[0].op, Operator::Like);
        assert_eq!(contains.predicates[0].value, Value::from("%m\\_1%"));

        let exact = Example::with_matcher(
            NameAge("M1", 3),
            ExampleMatcher::matching().with_ignore_case(),
        )
        .to_descriptor();
        assert_eq!(exact.predicates[0].op, Operator::Like);
        assert_eq!(exact.predicates[0].value, Value::from("M1"));
        assert_eq!(exact.predicates[1].op, Operator::Eq);
    }

    #[test]
    fn escape_glob_brackets_metacharacters() {
        assert_eq!(escape_glob("a*b?c[d]"), "a[*]b[?]c[[]d]");
    }

    #[test]
    fn escape_like_handles_all_wildcards() {
        assert_eq!(escape_like(r"50%_\"), r"50\%\_\\");
    }
}
