//! Resolution of unresolved configuration trees
//!
//! Turns the parser's intermediate tree into a fully resolved [`Config`]:
//! include markers are spliced with pre-loaded trees, substitution
//! references are looked up (first in the tree being resolved, supporting
//! forward references, then in the fallback chain), adjacent values are
//! concatenated or merged, and illegal reference cycles are rejected.
//!
//! The resolver performs no I/O. Loading include resources is the job of
//! the surrounding IO layer, which hands the results in as an
//! [`IncludeMap`] before resolution starts.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};

use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::key::Key;
use crate::origin::Origin;
use crate::parser::{ConcatPart, IncludeResource, RawField, RawObject, RawValue, UnresolvedConfig};
use crate::value::{merge_objects, merge_values, ConfigValue, Field, ObjectValue};

/// Pre-loaded include resources, keyed by resource identity. The map values
/// are the parse results (or load failures) supplied by the caller.
pub type IncludeMap = IndexMap<IncludeResource, Result<UnresolvedConfig>>;

pub(crate) fn resolve(
    unresolved: &UnresolvedConfig,
    origin: Origin,
    fallback: &Config,
    includes: &IncludeMap,
) -> Result<Config> {
    if let Some(err) = ConfigError::from_parser_failures(unresolved.failures()) {
        return Err(err);
    }
    log::debug!("resolving configuration document with origin {}", origin);
    let mut splice_stack = Vec::new();
    let spliced = splice_object(&unresolved.root, includes, &mut splice_stack)?;
    let expanded = expand_object(spliced);
    let mut ctx = ResolutionContext {
        root: expanded,
        origin,
        fallback,
        resolved: HashMap::new(),
        active: Vec::new(),
    };
    let root = ctx.resolve_root()?;
    Ok(Config::Object {
        root,
        origin: ctx.origin,
        fallback: Box::new(fallback.clone()),
    })
}

/// Replace every include marker with the fields of the corresponding
/// pre-loaded tree. Included documents may themselves contain includes,
/// looked up in the same map.
fn splice_object(
    obj: &RawObject,
    includes: &IncludeMap,
    stack: &mut Vec<IncludeResource>,
) -> Result<RawObject> {
    let mut fields = Vec::new();
    for field in &obj.fields {
        match &field.value {
            RawValue::Include(resource) => {
                if let Some(spliced) = load_include(resource, includes, stack)? {
                    fields.extend(spliced);
                }
            }
            other => fields.push(RawField {
                key: field.key.clone(),
                value: splice_value(other, includes, stack)?,
            }),
        }
    }
    Ok(RawObject { fields })
}

fn splice_value(
    value: &RawValue,
    includes: &IncludeMap,
    stack: &mut Vec<IncludeResource>,
) -> Result<RawValue> {
    match value {
        RawValue::Object(obj) => Ok(RawValue::Object(splice_object(obj, includes, stack)?)),
        RawValue::Array(items) => {
            let spliced: Result<Vec<RawValue>> = items
                .iter()
                .map(|item| splice_value(item, includes, stack))
                .collect();
            Ok(RawValue::Array(spliced?))
        }
        RawValue::Concat(parts) => {
            let spliced: Result<Vec<ConcatPart>> = parts
                .iter()
                .map(|part| {
                    Ok(ConcatPart {
                        separator: part.separator.clone(),
                        value: splice_value(&part.value, includes, stack)?,
                    })
                })
                .collect();
            Ok(RawValue::Concat(spliced?))
        }
        other => Ok(other.clone()),
    }
}

fn load_include(
    resource: &IncludeResource,
    includes: &IncludeMap,
    stack: &mut Vec<IncludeResource>,
) -> Result<Option<Vec<RawField>>> {
    if stack.contains(resource) {
        return Err(ConfigError::resource(format!(
            "circular include of resource '{}'",
            resource.resource_id()
        )));
    }
    match includes.get(resource) {
        None => {
            if resource.is_required() {
                Err(ConfigError::resource(format!(
                    "missing include resource: '{}'",
                    resource.resource_id()
                )))
            } else {
                log::debug!(
                    "optional include resource '{}' not provided, ignored",
                    resource.resource_id()
                );
                Ok(None)
            }
        }
        Some(Err(error)) => {
            if resource.is_required() {
                Err(error.clone())
            } else {
                log::debug!(
                    "optional include resource '{}' failed to load, ignored: {}",
                    resource.resource_id(),
                    error
                );
                Ok(None)
            }
        }
        Some(Ok(document)) => {
            // a resource that was supplied but does not parse is an error
            // even for optional includes
            if let Some(err) = ConfigError::from_parser_failures(document.failures()) {
                return Err(err);
            }
            stack.push(resource.clone());
            let spliced = splice_object(&document.root, includes, stack)?;
            stack.pop();
            log::trace!(
                "spliced include resource '{}' ({} fields)",
                resource.resource_id(),
                spliced.fields.len()
            );
            Ok(Some(spliced.fields))
        }
    }
}

/// Expand dotted field keys into nested single-segment objects, so that
/// duplicate dotted paths form proper merge stacks.
fn expand_object(obj: RawObject) -> RawObject {
    RawObject {
        fields: obj.fields.into_iter().map(expand_field).collect(),
    }
}

fn expand_field(field: RawField) -> RawField {
    let value = expand_value(field.value);
    let segments = field.key.segments();
    if segments.len() <= 1 {
        return RawField {
            key: field.key,
            value,
        };
    }
    let mut current = value;
    for segment in segments[1..].iter().rev() {
        current = RawValue::Object(RawObject {
            fields: vec![RawField {
                key: Key::from_segments([segment.clone()]),
                value: current,
            }],
        });
    }
    RawField {
        key: Key::from_segments([segments[0].clone()]),
        value: current,
    }
}

fn expand_value(value: RawValue) -> RawValue {
    match value {
        RawValue::Object(obj) => RawValue::Object(expand_object(obj)),
        RawValue::Array(items) => {
            RawValue::Array(items.into_iter().map(expand_value).collect())
        }
        RawValue::Concat(parts) => RawValue::Concat(
            parts
                .into_iter()
                .map(|part| ConcatPart {
                    separator: part.separator,
                    value: expand_value(part.value),
                })
                .collect(),
        ),
        other => other,
    }
}

struct ResolutionContext<'a> {
    /// The expanded tree being resolved; all field keys are single-segment.
    root: RawObject,
    origin: Origin,
    fallback: &'a Config,
    /// Memoized results per path; `None` marks a path that resolved to
    /// "absent" (optional substitution without a value).
    resolved: HashMap<Key, Option<ConfigValue>>,
    /// Paths currently being resolved, for cycle detection.
    active: Vec<Key>,
}

impl ResolutionContext<'_> {
    fn resolve_root(&mut self) -> Result<ObjectValue> {
        let names: IndexSet<String> = self
            .root
            .fields
            .iter()
            .filter_map(|f| f.key.segments().first().cloned())
            .collect();
        let mut fields = Vec::new();
        for name in names {
            let key = Key::from_segments([name.clone()]);
            if let Some(value) = self.resolve_path(&key)? {
                fields.push(Field::new(name, value, self.origin.clone()));
            }
        }
        Ok(ObjectValue::from_fields(fields))
    }

    /// Resolve the merged value at a path, consulting the tree first and
    /// the fallback chain second. Returns `Ok(None)` when the path has no
    /// value anywhere.
    fn resolve_path(&mut self, key: &Key) -> Result<Option<ConfigValue>> {
        if let Some(cached) = self.resolved.get(key) {
            return Ok(cached.clone());
        }
        self.check_cycle(key)?;
        self.active.push(key.clone());
        let stack: Vec<RawValue> = stack_at(&self.root, key.segments())
            .into_iter()
            .cloned()
            .collect();
        let result = if stack.is_empty() {
            self.resolve_through_parent(key)
        } else {
            self.resolve_stack(key, stack)
        };
        self.active.pop();
        let value = result?;
        self.resolved.insert(key.clone(), value.clone());
        Ok(value)
    }

    /// A path without a direct definition may still pass through a
    /// substitution, e.g. `a = ${b}` makes `a.c` reachable through the
    /// resolved value of `a`. Falls back to the fallback chain otherwise.
    fn resolve_through_parent(&mut self, key: &Key) -> Result<Option<ConfigValue>> {
        if key.depth() > 1 && !self.active.contains(&key.parent()) {
            if let Some(ConfigValue::Object(parent)) = self.resolve_path(&key.parent())? {
                if let Some(name) = key.local_name() {
                    if let Some(value) = parent.get(name) {
                        return Ok(Some(value.clone()));
                    }
                }
            }
        }
        Ok(self.fallback_lookup(key))
    }

    fn fallback_lookup(&self, key: &Key) -> Option<ConfigValue> {
        self.fallback.lookup(key).map(|(value, _)| value)
    }

    fn check_cycle(&self, key: &Key) -> Result<()> {
        if self.active.contains(key) {
            let chain: Vec<String> = self
                .active
                .iter()
                .map(|k| format!("'{}'", k))
                .chain(std::iter::once(format!("'{}'", key)))
                .collect();
            return Err(ConfigError::resolver(format!(
                "circular reference involving {}",
                chain.join(" -> ")
            )));
        }
        Ok(())
    }

    /// Fold an ordered definition stack for one path, later definitions
    /// winning per leaf. The accumulated value doubles as the "previous
    /// definition" that a direct self-reference resolves against.
    fn resolve_stack(&mut self, key: &Key, stack: Vec<RawValue>) -> Result<Option<ConfigValue>> {
        let mut acc: Option<ConfigValue> = None;
        for raw in stack {
            let value = self.resolve_value(raw, key, &acc)?;
            acc = merge_opt(acc, value);
        }
        Ok(acc)
    }

    fn resolve_value(
        &mut self,
        raw: RawValue,
        path: &Key,
        prev: &Option<ConfigValue>,
    ) -> Result<Option<ConfigValue>> {
        match raw {
            RawValue::Scalar(value) => Ok(Some(value)),
            RawValue::Array(items) => {
                let mut resolved = Vec::new();
                for item in items {
                    if let Some(value) = self.resolve_value(item, path, prev)? {
                        resolved.push(value);
                    }
                }
                Ok(Some(ConfigValue::Array(resolved)))
            }
            RawValue::Object(obj) => self
                .resolve_object_entry(obj, path, prev)
                .map(|o| Some(ConfigValue::Object(o))),
            RawValue::Concat(parts) => self.resolve_concat(parts, path, prev),
            RawValue::Substitution { key, optional } => {
                self.resolve_substitution(&key, optional, path, prev)
            }
            RawValue::Include(resource) => Err(ConfigError::resource(format!(
                "unexpected include of '{}' during resolution",
                resource.resource_id()
            ))),
            RawValue::Invalid(failure) => Err(ConfigError::Parser(failure)),
        }
    }

    /// Resolve one object-shaped definition. Only this entry's own fields
    /// are materialized; merging with earlier definitions happens in the
    /// enclosing stack fold.
    fn resolve_object_entry(
        &mut self,
        obj: RawObject,
        path: &Key,
        prev: &Option<ConfigValue>,
    ) -> Result<ObjectValue> {
        let prev_obj = prev.as_ref().and_then(|v| v.as_object());
        let names: IndexSet<String> = obj
            .fields
            .iter()
            .filter_map(|f| f.key.segments().first().cloned())
            .collect();
        let mut fields = Vec::new();
        for name in names {
            let child_path = path.child(name.clone());
            let child_stack: Vec<RawValue> = obj
                .fields
                .iter()
                .filter(|f| f.key.segments().first() == Some(&name))
                .map(|f| f.value.clone())
                .collect();
            let child_prev: Option<ConfigValue> = prev_obj.and_then(|po| po.get(&name).cloned());
            self.check_cycle(&child_path)?;
            self.active.push(child_path.clone());
            let mut acc: Option<ConfigValue> = None;
            for raw in child_stack {
                let effective_prev = merge_opt(child_prev.clone(), acc.clone());
                let value = self.resolve_value(raw, &child_path, &effective_prev);
                match value {
                    Ok(value) => acc = merge_opt(acc, value),
                    Err(err) => {
                        self.active.pop();
                        return Err(err);
                    }
                }
            }
            self.active.pop();
            if let Some(value) = acc {
                fields.push(Field::new(name, value, self.origin.clone()));
            }
        }
        Ok(ObjectValue::from_fields(fields))
    }

    /// Concatenate adjacent values: objects deep-merge, arrays append,
    /// scalars join as strings with their original separators. Absent
    /// optional substitutions drop out together with their separator.
    fn resolve_concat(
        &mut self,
        parts: Vec<ConcatPart>,
        path: &Key,
        prev: &Option<ConfigValue>,
    ) -> Result<Option<ConfigValue>> {
        let mut resolved: Vec<(String, ConfigValue)> = Vec::new();
        for part in parts {
            if let Some(value) = self.resolve_value(part.value, path, prev)? {
                resolved.push((part.separator, value));
            }
        }
        if resolved.is_empty() {
            return Ok(None);
        }
        if resolved.len() == 1 {
            return Ok(Some(resolved.remove(0).1));
        }
        let objects = resolved.iter().filter(|(_, v)| v.is_object()).count();
        let arrays = resolved.iter().filter(|(_, v)| v.is_array()).count();
        if objects == resolved.len() {
            let mut merged = ObjectValue::empty();
            for (_, value) in resolved {
                if let ConfigValue::Object(obj) = value {
                    merged = merge_objects(&merged, &obj);
                }
            }
            return Ok(Some(ConfigValue::Object(merged)));
        }
        if arrays == resolved.len() {
            let mut items = Vec::new();
            for (_, value) in resolved {
                if let ConfigValue::Array(mut elements) = value {
                    items.append(&mut elements);
                }
            }
            return Ok(Some(ConfigValue::Array(items)));
        }
        if objects == 0 && arrays == 0 {
            let mut out = String::new();
            for (i, (separator, value)) in resolved.iter().enumerate() {
                if i > 0 {
                    out.push_str(separator);
                }
                match value {
                    ConfigValue::String(s) => out.push_str(s),
                    other => out.push_str(&other.to_string()),
                }
            }
            return Ok(Some(ConfigValue::String(out)));
        }
        let kinds: Vec<&str> = resolved.iter().map(|(_, v)| v.type_name()).collect();
        Err(ConfigError::resolver(format!(
            "invalid concatenation of values of kinds: {}",
            kinds.join(", ")
        )))
    }

    fn resolve_substitution(
        &mut self,
        reference: &Key,
        optional: bool,
        path: &Key,
        prev: &Option<ConfigValue>,
    ) -> Result<Option<ConfigValue>> {
        if reference == path {
            // direct self-reference: resolves against the previous
            // definition of the same key, or the fallback chain
            if let Some(value) = prev {
                return Ok(Some(value.clone()));
            }
            if let Some(value) = self.fallback_lookup(reference) {
                return Ok(Some(value));
            }
            if optional {
                return Ok(None);
            }
            return Err(ConfigError::resolver(format!(
                "self-reference '${{{}}}' has no previous definition",
                reference
            )));
        }
        log::trace!("resolving substitution '${{{}}}'", reference);
        match self.resolve_path(reference)? {
            Some(value) => Ok(Some(value)),
            None if optional => Ok(None),
            None => Err(ConfigError::resolver(format!(
                "unresolved required substitution: '${{{}}}'",
                reference
            ))),
        }
    }
}

fn merge_opt(base: Option<ConfigValue>, overlay: Option<ConfigValue>) -> Option<ConfigValue> {
    match (base, overlay) {
        (Some(base), Some(overlay)) => Some(merge_values(base, overlay)),
        (base, None) => base,
        (None, overlay) => overlay,
    }
}

/// Collect the ordered definition stack at a path, descending through all
/// object-shaped definitions (including objects inside concatenations).
fn stack_at<'a>(root: &'a RawObject, segments: &[String]) -> Vec<&'a RawValue> {
    if segments.is_empty() {
        return Vec::new();
    }
    let mut objects: Vec<&RawObject> = vec![root];
    for (i, segment) in segments.iter().enumerate() {
        let mut values: Vec<&RawValue> = Vec::new();
        for obj in &objects {
            for field in &obj.fields {
                if field.key.segments().first() == Some(segment) {
                    values.push(&field.value);
                }
            }
        }
        if i == segments.len() - 1 {
            return values;
        }
        objects = values.into_iter().flat_map(object_parts).collect();
    }
    Vec::new()
}

fn object_parts<'a>(value: &'a RawValue) -> Vec<&'a RawObject> {
    match value {
        RawValue::Object(obj) => vec![obj],
        RawValue::Concat(parts) => parts
            .iter()
            .flat_map(|part| object_parts(&part.value))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::parser::ConfigParser;
    use pretty_assertions::assert_eq;

    fn resolve_with_fallback(text: &str, fallback: &Config) -> Result<Config> {
        ConfigParser::parse(text).resolve(Origin::root(), fallback, &IncludeMap::new())
    }

    #[test]
    fn test_forward_reference() {
        let config = Config::parse("y = ${x}\nx = 1").unwrap();
        assert_eq!(config.get::<i64>("y"), Ok(1));
    }

    #[test]
    fn test_required_and_optional_substitutions() {
        let config = Config::parse("x = 1\ny = ${x}\nz = ${?w}").unwrap();
        assert_eq!(config.get::<i64>("x"), Ok(1));
        assert_eq!(config.get::<i64>("y"), Ok(1));
        assert!(!config.has_key("z"));
    }

    #[test]
    fn test_unresolved_required_substitution_fails() {
        let err = Config::parse("a = ${missing.path}").unwrap_err();
        assert_eq!(
            err,
            ConfigError::resolver("unresolved required substitution: '${missing.path}'")
        );
    }

    #[test]
    fn test_substitution_resolves_from_fallback() {
        let fallback = Config::parse("host = example.com").unwrap();
        let config = resolve_with_fallback("url = ${host}/docs", &fallback).unwrap();
        assert_eq!(config.get::<String>("url"), Ok("example.com/docs".into()));
    }

    #[test]
    fn test_document_value_shadows_fallback_in_substitutions() {
        let fallback = Config::parse("host = fallback.example.com").unwrap();
        let config =
            resolve_with_fallback("host = local.example.com\nurl = ${host}", &fallback).unwrap();
        assert_eq!(
            config.get::<String>("url"),
            Ok("local.example.com".into())
        );
    }

    #[test]
    fn test_self_reference_additivity() {
        let config = Config::parse("a = [1, 2]\na = ${a} [3]").unwrap();
        assert_eq!(config.get::<Vec<i64>>("a"), Ok(vec![1, 2, 3]));
    }

    #[test]
    fn test_self_reference_against_fallback() {
        let fallback = Config::parse("a = [1, 2]").unwrap();
        let config = resolve_with_fallback("a = ${a} [3]", &fallback).unwrap();
        assert_eq!(config.get::<Vec<i64>>("a"), Ok(vec![1, 2, 3]));
    }

    #[test]
    fn test_self_reference_string_append() {
        let config = Config::parse("path = /root\npath = ${path}/sub").unwrap();
        assert_eq!(config.get::<String>("path"), Ok("/root/sub".into()));
    }

    #[test]
    fn test_plus_equals_appends() {
        let config = Config::parse("a = [1]\na += 2").unwrap();
        assert_eq!(config.get::<Vec<i64>>("a"), Ok(vec![1, 2]));
    }

    #[test]
    fn test_plus_equals_without_previous_definition() {
        let config = Config::parse("a += 1").unwrap();
        assert_eq!(config.get::<Vec<i64>>("a"), Ok(vec![1]));
    }

    #[test]
    fn test_self_reference_without_previous_definition_fails() {
        let err = Config::parse("a = ${a} [1]").unwrap_err();
        assert_eq!(
            err,
            ConfigError::resolver("self-reference '${a}' has no previous definition")
        );
    }

    #[test]
    fn test_cycle_is_rejected() {
        let err = Config::parse("a = ${b}\nb = ${a}").unwrap_err();
        match err {
            ConfigError::ResolverError(message) => {
                assert!(message.contains("circular reference"), "{}", message);
                assert!(message.contains("'a'"), "{}", message);
                assert!(message.contains("'b'"), "{}", message);
            }
            other => panic!("expected resolver error, got {:?}", other),
        }
    }

    #[test]
    fn test_transitive_cycle_is_rejected() {
        let err = Config::parse("a = ${b}\nb = ${c}\nc = ${a}").unwrap_err();
        assert!(matches!(err, ConfigError::ResolverError(_)));
    }

    #[test]
    fn test_optional_substitution_drops_from_string_concat() {
        let config = Config::parse("greeting = Hello ${?name} World").unwrap();
        assert_eq!(config.get::<String>("greeting"), Ok("Hello World".into()));
    }

    #[test]
    fn test_optional_substitution_present_in_string_concat() {
        let config = Config::parse("name = Folio\ngreeting = Hello ${?name} World").unwrap();
        assert_eq!(
            config.get::<String>("greeting"),
            Ok("Hello Folio World".into())
        );
    }

    #[test]
    fn test_optional_substitution_drops_from_array_concat() {
        let config = Config::parse("a = [1] ${?missing} [2]").unwrap();
        assert_eq!(config.get::<Vec<i64>>("a"), Ok(vec![1, 2]));
    }

    #[test]
    fn test_object_concatenation_merges() {
        let config = Config::parse("a = { x = 1 } { y = 2 }").unwrap();
        assert_eq!(config.get::<i64>("a.x"), Ok(1));
        assert_eq!(config.get::<i64>("a.y"), Ok(2));
    }

    #[test]
    fn test_array_concatenation_appends() {
        let config = Config::parse("a = [1, 2] [3]").unwrap();
        assert_eq!(config.get::<Vec<i64>>("a"), Ok(vec![1, 2, 3]));
    }

    #[test]
    fn test_scalar_concatenation_joins_as_string() {
        let config = Config::parse("v = 1 true x").unwrap();
        assert_eq!(config.get::<String>("v"), Ok("1 true x".into()));
    }

    #[test]
    fn test_mixed_concatenation_fails() {
        let err = Config::parse("a = [1] { b = 2 }").unwrap_err();
        match err {
            ConfigError::ResolverError(message) => {
                assert!(message.contains("invalid concatenation"), "{}", message)
            }
            other => panic!("expected resolver error, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_object_keys_merge() {
        let config = Config::parse("a { x = 1 }\na { y = 2 }\na { x = 10 }").unwrap();
        assert_eq!(config.get::<i64>("a.x"), Ok(10));
        assert_eq!(config.get::<i64>("a.y"), Ok(2));
    }

    #[test]
    fn test_duplicate_scalar_keys_later_wins() {
        let config = Config::parse("a = 1\na = 2").unwrap();
        assert_eq!(config.get::<i64>("a"), Ok(2));
    }

    #[test]
    fn test_scalar_definition_resets_object_merging() {
        let config = Config::parse("a { x = 1 }\na = 5\na { y = 2 }").unwrap();
        assert_eq!(config.get::<i64>("a.y"), Ok(2));
        assert!(config.get::<i64>("a.x").is_err());
    }

    #[test]
    fn test_dotted_keys_expand_and_merge() {
        let config = Config::parse("a.b = 1\na.c = 2\na { d = 3 }").unwrap();
        assert_eq!(config.get::<i64>("a.b"), Ok(1));
        assert_eq!(config.get::<i64>("a.c"), Ok(2));
        assert_eq!(config.get::<i64>("a.d"), Ok(3));
    }

    #[test]
    fn test_substitution_through_substitution() {
        let config = Config::parse("b { c = 1 }\na = ${b}\nx = ${a.c}").unwrap();
        assert_eq!(config.get::<i64>("x"), Ok(1));
    }

    #[test]
    fn test_substitution_of_whole_object() {
        let config = Config::parse("defaults { depth = 2 }\nnav = ${defaults}").unwrap();
        assert_eq!(config.get::<i64>("nav.depth"), Ok(2));
    }

    #[test]
    fn test_parser_failures_abort_resolution() {
        let err = Config::parse("a = \"unterminated").unwrap_err();
        assert!(matches!(err, ConfigError::Parser(_)));
        let err = Config::parse("a = \"one\nb = \"two").unwrap_err();
        assert!(matches!(err, ConfigError::MultipleParserErrors(_)));
    }

    #[test]
    fn test_include_splicing() {
        let mut includes = IncludeMap::new();
        includes.insert(
            IncludeResource::Any {
                resource_id: "common.conf".into(),
                required: false,
            },
            Ok(ConfigParser::parse("shared = 2")),
        );
        let config = ConfigParser::parse("include \"common.conf\"\nlocal = 1")
            .resolve(Origin::root(), &Config::empty(), &includes)
            .unwrap();
        assert_eq!(config.get::<i64>("local"), Ok(1));
        assert_eq!(config.get::<i64>("shared"), Ok(2));
    }

    #[test]
    fn test_nested_includes() {
        let mut includes = IncludeMap::new();
        includes.insert(
            IncludeResource::Any {
                resource_id: "outer.conf".into(),
                required: false,
            },
            Ok(ConfigParser::parse("include \"inner.conf\"\nouter = 1")),
        );
        includes.insert(
            IncludeResource::Any {
                resource_id: "inner.conf".into(),
                required: false,
            },
            Ok(ConfigParser::parse("inner = 2")),
        );
        let config = ConfigParser::parse("include \"outer.conf\"")
            .resolve(Origin::root(), &Config::empty(), &includes)
            .unwrap();
        assert_eq!(config.get::<i64>("outer"), Ok(1));
        assert_eq!(config.get::<i64>("inner"), Ok(2));
    }

    #[test]
    fn test_missing_optional_include_is_ignored() {
        let config = Config::parse("include \"absent.conf\"\na = 1").unwrap();
        assert_eq!(config.get::<i64>("a"), Ok(1));
    }

    #[test]
    fn test_missing_required_include_fails() {
        let err = Config::parse("include required(file(\"absent.conf\"))\na = 1").unwrap_err();
        assert_eq!(
            err,
            ConfigError::resource("missing include resource: 'absent.conf'")
        );
    }

    #[test]
    fn test_failed_required_include_propagates_load_error() {
        let resource = IncludeResource::Url {
            resource_id: "http://cfg".into(),
            required: true,
        };
        let mut includes = IncludeMap::new();
        includes.insert(
            resource.clone(),
            Err(ConfigError::resource("connection refused")),
        );
        let err = ConfigParser::parse("include required(url(\"http://cfg\"))")
            .resolve(Origin::root(), &Config::empty(), &includes)
            .unwrap_err();
        assert_eq!(err, ConfigError::resource("connection refused"));
    }

    #[test]
    fn test_failed_optional_include_is_ignored() {
        let resource = IncludeResource::Any {
            resource_id: "flaky.conf".into(),
            required: false,
        };
        let mut includes = IncludeMap::new();
        includes.insert(resource, Err(ConfigError::resource("connection refused")));
        let config = ConfigParser::parse("include \"flaky.conf\"\na = 1")
            .resolve(Origin::root(), &Config::empty(), &includes)
            .unwrap();
        assert_eq!(config.get::<i64>("a"), Ok(1));
    }

    #[test]
    fn test_circular_includes_are_rejected() {
        let a = IncludeResource::Any {
            resource_id: "a.conf".into(),
            required: false,
        };
        let b = IncludeResource::Any {
            resource_id: "b.conf".into(),
            required: false,
        };
        let mut includes = IncludeMap::new();
        includes.insert(a, Ok(ConfigParser::parse("include \"b.conf\"")));
        includes.insert(b, Ok(ConfigParser::parse("include \"a.conf\"")));
        let err = ConfigParser::parse("include \"a.conf\"")
            .resolve(Origin::root(), &Config::empty(), &includes)
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::resource("circular include of resource 'a.conf'")
        );
    }

    #[test]
    fn test_origin_stamping() {
        let origin = Origin::new("/docs/chapter/page.md");
        let config = ConfigParser::parse("a = 1\nnav { depth = 2 }")
            .resolve(origin.clone(), &Config::empty(), &IncludeMap::new())
            .unwrap();
        match &config {
            Config::Object { root, .. } => {
                assert_eq!(root.field("a").map(|f| &f.origin), Some(&origin));
                let nav = root.field("nav").unwrap();
                assert_eq!(nav.origin, origin);
            }
            Config::Empty => panic!("expected a non-empty config"),
        }
    }

    #[test]
    fn test_fallback_fields_keep_their_origin_through_lookup() {
        let theirs = Origin::new("/defaults/directory.conf");
        let fallback = ConfigParser::parse("nav { logo = img.png }")
            .resolve(theirs.clone(), &Config::empty(), &IncludeMap::new())
            .unwrap();
        let config = ConfigParser::parse("nav { depth = 1 }")
            .resolve(
                Origin::new("/docs/page.md"),
                &fallback,
                &IncludeMap::new(),
            )
            .unwrap();
        // merge on lookup inherits the fallback field with its own origin
        let (value, _) = config.lookup(&Key::parse("nav")).unwrap();
        let nav = value.as_object().unwrap();
        assert_eq!(nav.field("logo").map(|f| &f.origin), Some(&theirs));
    }
}

