//! HOCON document parsing
//!
//! Parses configuration source text into an unresolved intermediate tree in
//! which substitution references and include markers are retained as
//! first-class nodes. The parser performs no I/O and is a pure function of
//! its input string; include resources it discovers are reported through
//! [`UnresolvedConfig::includes`] so the surrounding IO layer can load them
//! before resolution.
//!
//! Parsing is resilient: a malformed value records a structured failure and
//! the parser skips to the next field boundary, so independent failures
//! across elements are all reported instead of masking one another.

use crate::config::Config;
use crate::error::{ParserFailure, Result};
use crate::key::Key;
use crate::origin::Origin;
use crate::resolver::{self, IncludeMap};
use crate::value::ConfigValue;

/// An external resource requested by an include directive.
///
/// Loading is delegated entirely to the caller; the resolver only splices
/// pre-loaded trees back in, looked up by resource identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IncludeResource {
    /// `include "resource"` - the loader decides how to interpret the id.
    Any { resource_id: String, required: bool },
    /// `include file("path")`
    File { resource_id: String, required: bool },
    /// `include url("uri")`
    Url { resource_id: String, required: bool },
}

impl IncludeResource {
    pub fn resource_id(&self) -> &str {
        match self {
            IncludeResource::Any { resource_id, .. }
            | IncludeResource::File { resource_id, .. }
            | IncludeResource::Url { resource_id, .. } => resource_id,
        }
    }

    /// Whether a missing resource aborts resolution. Bare includes are
    /// optional; `include required(...)` makes them mandatory.
    pub fn is_required(&self) -> bool {
        match self {
            IncludeResource::Any { required, .. }
            | IncludeResource::File { required, .. }
            | IncludeResource::Url { required, .. } => *required,
        }
    }

    fn into_required(self) -> IncludeResource {
        match self {
            IncludeResource::Any { resource_id, .. } => IncludeResource::Any {
                resource_id,
                required: true,
            },
            IncludeResource::File { resource_id, .. } => IncludeResource::File {
                resource_id,
                required: true,
            },
            IncludeResource::Url { resource_id, .. } => IncludeResource::Url {
                resource_id,
                required: true,
            },
        }
    }
}

/// One part of a value concatenation, together with the whitespace that
/// separated it from the previous part (used verbatim when string fragments
/// are joined).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ConcatPart {
    pub separator: String,
    pub value: RawValue,
}

/// An unresolved value as produced by the parser.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawValue {
    Scalar(ConfigValue),
    Array(Vec<RawValue>),
    Object(RawObject),
    Concat(Vec<ConcatPart>),
    Substitution { key: Key, optional: bool },
    Include(IncludeResource),
    Invalid(ParserFailure),
}

/// A field of an unresolved object. The key may still be dotted; expansion
/// into nested single-segment objects happens in the resolver so that
/// duplicate dotted paths merge correctly.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawField {
    pub key: Key,
    pub value: RawValue,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct RawObject {
    pub fields: Vec<RawField>,
}

/// The unresolved result of parsing one configuration document.
#[derive(Debug, Clone)]
pub struct UnresolvedConfig {
    pub(crate) root: RawObject,
    failures: Vec<ParserFailure>,
}

impl UnresolvedConfig {
    /// All include resources requested anywhere in the document,
    /// recursively.
    pub fn includes(&self) -> Vec<IncludeResource> {
        let mut out = Vec::new();
        for field in &self.root.fields {
            collect_includes(&field.value, &mut out);
        }
        out
    }

    /// The syntax failures captured during parsing, in input order.
    pub fn failures(&self) -> &[ParserFailure] {
        &self.failures
    }

    /// Resolve this document into a [`Config`].
    ///
    /// `includes` maps every resource reported by [`Self::includes`] (and by
    /// the includes of included documents) to its pre-loaded parse result.
    /// Captured syntax failures abort resolution up front.
    pub fn resolve(&self, origin: Origin, fallback: &Config, includes: &IncludeMap) -> Result<Config> {
        resolver::resolve(self, origin, fallback, includes)
    }
}

fn collect_includes(value: &RawValue, out: &mut Vec<IncludeResource>) {
    match value {
        RawValue::Include(resource) => out.push(resource.clone()),
        RawValue::Object(obj) => {
            for field in &obj.fields {
                collect_includes(&field.value, out);
            }
        }
        RawValue::Array(items) => {
            for item in items {
                collect_includes(item, out);
            }
        }
        RawValue::Concat(parts) => {
            for part in parts {
                collect_includes(&part.value, out);
            }
        }
        _ => {}
    }
}

/// Parser for HOCON configuration documents.
pub struct ConfigParser;

impl ConfigParser {
    /// Parse a single document. Root braces are optional.
    pub fn parse(input: &str) -> UnresolvedConfig {
        let mut cursor = Cursor::new(input);
        let mut failures = Vec::new();
        cursor.skip_whitespace_and_comments();
        let root = if cursor.current() == Some('{') {
            cursor.advance();
            let obj = parse_object_body(&mut cursor, Some('}'), &Key::root(), &mut failures);
            cursor.skip_whitespace_and_comments();
            if !cursor.at_end() {
                failures.push(cursor.failure("unexpected content after root object"));
            }
            obj
        } else {
            parse_object_body(&mut cursor, None, &Key::root(), &mut failures)
        };
        log::trace!(
            "parsed configuration document: {} top-level fields, {} failures",
            root.fields.len(),
            failures.len()
        );
        UnresolvedConfig { root, failures }
    }
}

/// Characters that terminate unquoted strings and unquoted key segments.
fn is_reserved(c: char) -> bool {
    matches!(
        c,
        '$' | '"' | '{' | '}' | '[' | ']' | ':' | '=' | ',' | '+' | '#' | '`' | '^' | '?' | '!'
            | '@' | '*' | '&' | '\\'
    )
}

#[derive(Clone, Copy)]
struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Cursor { input, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn advance(&mut self) {
        if let Some(c) = self.current() {
            self.pos += c.len_utf8();
        }
    }

    fn advance_bytes(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    /// Skip horizontal whitespace.
    fn skip_spaces(&mut self) {
        while let Some(c) = self.current() {
            if c == ' ' || c == '\t' || c == '\r' {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Consume and return horizontal whitespace, preserved verbatim as a
    /// concatenation separator.
    fn take_spaces(&mut self) -> String {
        let start = self.pos;
        self.skip_spaces();
        self.input[start..self.pos].to_string()
    }

    fn at_comment(&self) -> bool {
        self.current() == Some('#') || self.starts_with("//")
    }

    /// Skip a comment to the end of the line, not consuming the newline.
    fn skip_comment(&mut self) {
        while let Some(c) = self.current() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.current() {
                Some(c) if c.is_whitespace() => self.advance(),
                Some(_) if self.at_comment() => self.skip_comment(),
                _ => break,
            }
        }
    }

    fn failure(&self, message: impl Into<String>) -> ParserFailure {
        let consumed = &self.input[..self.pos];
        let line = consumed.matches('\n').count() + 1;
        let column = consumed.chars().rev().take_while(|c| *c != '\n').count() + 1;
        ParserFailure {
            message: message.into(),
            line,
            column,
        }
    }
}

/// Skip field separators: whitespace (including newlines), comments and
/// commas.
fn skip_separators(cursor: &mut Cursor) {
    loop {
        match cursor.current() {
            Some(c) if c.is_whitespace() || c == ',' => cursor.advance(),
            Some(_) if cursor.at_comment() => cursor.skip_comment(),
            _ => break,
        }
    }
}

/// Skip to the next field boundary after a failure, leaving closing
/// delimiters for the enclosing structure to consume.
fn recover(cursor: &mut Cursor) {
    while let Some(c) = cursor.current() {
        match c {
            '\n' | ',' => {
                cursor.advance();
                break;
            }
            '}' | ']' => break,
            _ => cursor.advance(),
        }
    }
}

fn parse_object_body(
    cursor: &mut Cursor,
    closing: Option<char>,
    prefix: &Key,
    failures: &mut Vec<ParserFailure>,
) -> RawObject {
    let mut fields = Vec::new();
    loop {
        skip_separators(cursor);
        match cursor.current() {
            None => {
                if closing.is_some() {
                    failures.push(cursor.failure("unexpected end of input, expected '}'"));
                }
                break;
            }
            Some(c) if Some(c) == closing => {
                cursor.advance();
                break;
            }
            Some('}') => {
                failures.push(cursor.failure("unexpected '}'"));
                cursor.advance();
            }
            Some(_) => {
                if at_include_directive(cursor) {
                    cursor.advance_bytes("include".len());
                    cursor.skip_spaces();
                    match parse_include_resource(cursor, false) {
                        Ok(resource) => fields.push(RawField {
                            key: Key::root(),
                            value: RawValue::Include(resource),
                        }),
                        Err(failure) => {
                            failures.push(failure);
                            recover(cursor);
                        }
                    }
                } else {
                    match parse_field(cursor, prefix, failures) {
                        Ok(field) => fields.push(field),
                        Err(failure) => {
                            failures.push(failure);
                            recover(cursor);
                        }
                    }
                }
            }
        }
    }
    RawObject { fields }
}

/// Check whether the cursor sits on an include directive rather than a
/// field whose key happens to start with the word `include`.
fn at_include_directive(cursor: &Cursor) -> bool {
    if !cursor.starts_with("include") {
        return false;
    }
    let mut probe = *cursor;
    probe.advance_bytes("include".len());
    if !matches!(probe.current(), Some(' ') | Some('\t')) {
        return false;
    }
    probe.skip_spaces();
    probe.current() == Some('"')
        || probe.starts_with("file(")
        || probe.starts_with("url(")
        || probe.starts_with("required(")
}

fn parse_include_resource(
    cursor: &mut Cursor,
    required: bool,
) -> std::result::Result<IncludeResource, ParserFailure> {
    cursor.skip_spaces();
    if cursor.current() == Some('"') {
        let resource_id = parse_quoted_string(cursor)?;
        return Ok(IncludeResource::Any {
            resource_id,
            required,
        });
    }
    if cursor.starts_with("required(") {
        cursor.advance_bytes("required(".len());
        let inner = parse_include_resource(cursor, true)?;
        expect_closing_paren(cursor)?;
        return Ok(inner.into_required());
    }
    if cursor.starts_with("file(") {
        cursor.advance_bytes("file(".len());
        cursor.skip_spaces();
        let resource_id = parse_quoted_string(cursor)?;
        expect_closing_paren(cursor)?;
        return Ok(IncludeResource::File {
            resource_id,
            required,
        });
    }
    if cursor.starts_with("url(") {
        cursor.advance_bytes("url(".len());
        cursor.skip_spaces();
        let resource_id = parse_quoted_string(cursor)?;
        expect_closing_paren(cursor)?;
        return Ok(IncludeResource::Url {
            resource_id,
            required,
        });
    }
    Err(cursor.failure("invalid include syntax, expected a quoted resource, file(...), url(...) or required(...)"))
}

fn expect_closing_paren(cursor: &mut Cursor) -> std::result::Result<(), ParserFailure> {
    cursor.skip_spaces();
    if cursor.current() == Some(')') {
        cursor.advance();
        Ok(())
    } else {
        Err(cursor.failure("expected ')' in include directive"))
    }
}

fn parse_field(
    cursor: &mut Cursor,
    prefix: &Key,
    failures: &mut Vec<ParserFailure>,
) -> std::result::Result<RawField, ParserFailure> {
    let key = parse_key(cursor)?;
    let path = prefix.child_key(&key);
    cursor.skip_spaces();
    let value = match cursor.current() {
        Some('{') => {
            cursor.advance();
            RawValue::Object(parse_object_body(cursor, Some('}'), &path, failures))
        }
        Some('=') | Some(':') => {
            cursor.advance();
            cursor.skip_spaces();
            parse_concat_value(cursor, &path, failures)
        }
        Some('+') if cursor.peek() == Some('=') => {
            cursor.advance();
            cursor.advance();
            cursor.skip_spaces();
            // `a += x` is shorthand for the additive self-reference
            // `a = ${?a} [x]`.
            let element = parse_concat_value(cursor, &path, failures);
            RawValue::Concat(vec![
                ConcatPart {
                    separator: String::new(),
                    value: RawValue::Substitution {
                        key: path.clone(),
                        optional: true,
                    },
                },
                ConcatPart {
                    separator: " ".to_string(),
                    value: RawValue::Array(vec![element]),
                },
            ])
        }
        _ => {
            return Err(cursor.failure(format!("expected separator after key '{}'", key)));
        }
    };
    Ok(RawField { key, value })
}

fn parse_key(cursor: &mut Cursor) -> std::result::Result<Key, ParserFailure> {
    let mut segments: Vec<String> = Vec::new();
    loop {
        if cursor.current() == Some('"') {
            // A quoted key is a single segment; dots inside it are literal.
            segments.push(parse_quoted_string(cursor)?);
        } else {
            let start = cursor.pos;
            while let Some(c) = cursor.current() {
                if c.is_whitespace() || c == '.' || is_reserved(c) {
                    break;
                }
                cursor.advance();
            }
            if cursor.pos == start {
                return Err(cursor.failure("expected a key"));
            }
            segments.push(cursor.input[start..cursor.pos].to_string());
        }
        if cursor.current() == Some('.') {
            cursor.advance();
        } else {
            break;
        }
    }
    Ok(Key::from_segments(segments))
}

/// Parse a full field or array-element value: one or more single values on
/// the same line, forming a concatenation when there is more than one.
fn parse_concat_value(
    cursor: &mut Cursor,
    path: &Key,
    failures: &mut Vec<ParserFailure>,
) -> RawValue {
    let mut parts: Vec<ConcatPart> = Vec::new();
    let mut separator = String::new();
    loop {
        match cursor.current() {
            None | Some('\n') | Some(',') | Some('}') | Some(']') => break,
            Some(_) if cursor.at_comment() => break,
            Some(_) => {}
        }
        match parse_single_value(cursor, path, failures) {
            Ok(value) => parts.push(ConcatPart {
                separator: std::mem::take(&mut separator),
                value,
            }),
            Err(failure) => {
                failures.push(failure.clone());
                recover(cursor);
                return RawValue::Invalid(failure);
            }
        }
        separator = cursor.take_spaces();
    }
    if parts.is_empty() {
        let failure = cursor.failure("expected a value");
        failures.push(failure.clone());
        return RawValue::Invalid(failure);
    }
    if parts.len() == 1 {
        return parts.remove(0).value;
    }
    RawValue::Concat(parts)
}

fn parse_single_value(
    cursor: &mut Cursor,
    path: &Key,
    failures: &mut Vec<ParserFailure>,
) -> std::result::Result<RawValue, ParserFailure> {
    match cursor.current() {
        Some('{') => {
            cursor.advance();
            Ok(RawValue::Object(parse_object_body(
                cursor,
                Some('}'),
                path,
                failures,
            )))
        }
        Some('[') => parse_array(cursor, path, failures),
        Some('"') if cursor.starts_with("\"\"\"") => parse_multiline_string(cursor),
        Some('"') => {
            parse_quoted_string(cursor).map(|s| RawValue::Scalar(ConfigValue::String(s)))
        }
        Some('$') if cursor.peek() == Some('{') => parse_substitution(cursor),
        Some(_) => parse_unquoted(cursor),
        None => Err(cursor.failure("unexpected end of input, expected a value")),
    }
}

fn parse_array(
    cursor: &mut Cursor,
    path: &Key,
    failures: &mut Vec<ParserFailure>,
) -> std::result::Result<RawValue, ParserFailure> {
    cursor.advance(); // [
    let mut items = Vec::new();
    loop {
        skip_separators(cursor);
        match cursor.current() {
            None => return Err(cursor.failure("unexpected end of input, expected ']'")),
            Some(']') => {
                cursor.advance();
                break;
            }
            Some(_) => items.push(parse_concat_value(cursor, path, failures)),
        }
    }
    Ok(RawValue::Array(items))
}

fn parse_quoted_string(cursor: &mut Cursor) -> std::result::Result<String, ParserFailure> {
    cursor.advance(); // opening quote
    let mut result = String::new();
    loop {
        match cursor.current() {
            None | Some('\n') => return Err(cursor.failure("unterminated string literal")),
            Some('"') => {
                cursor.advance();
                return Ok(result);
            }
            Some('\\') => {
                cursor.advance();
                match cursor.current() {
                    Some('"') => result.push('"'),
                    Some('\\') => result.push('\\'),
                    Some('/') => result.push('/'),
                    Some('b') => result.push('\u{0008}'),
                    Some('f') => result.push('\u{000C}'),
                    Some('n') => result.push('\n'),
                    Some('r') => result.push('\r'),
                    Some('t') => result.push('\t'),
                    Some('u') => {
                        cursor.advance();
                        let rest = &cursor.input[cursor.pos..];
                        let hex: String = rest.chars().take(4).collect();
                        if hex.len() < 4 {
                            return Err(cursor.failure("incomplete unicode escape"));
                        }
                        let code = u32::from_str_radix(&hex, 16)
                            .map_err(|_| cursor.failure("invalid unicode escape"))?;
                        let c = char::from_u32(code)
                            .ok_or_else(|| cursor.failure("invalid unicode code point"))?;
                        result.push(c);
                        cursor.advance_bytes(hex.len());
                        continue;
                    }
                    Some(other) => {
                        return Err(cursor.failure(format!("invalid escape sequence '\\{}'", other)))
                    }
                    None => return Err(cursor.failure("unterminated string literal")),
                }
                cursor.advance();
            }
            Some(c) => {
                result.push(c);
                cursor.advance();
            }
        }
    }
}

fn parse_multiline_string(cursor: &mut Cursor) -> std::result::Result<RawValue, ParserFailure> {
    cursor.advance_bytes(3); // opening """
    let rest = &cursor.input[cursor.pos..];
    match rest.find("\"\"\"") {
        Some(mut end) => {
            // quotes adjacent to the terminator belong to the content,
            // the closing quotes are the last three
            while rest[end + 3..].starts_with('"') {
                end += 1;
            }
            let content = rest[..end].to_string();
            cursor.advance_bytes(end + 3);
            Ok(RawValue::Scalar(ConfigValue::String(content)))
        }
        None => Err(cursor.failure("unterminated multiline string")),
    }
}

fn parse_substitution(cursor: &mut Cursor) -> std::result::Result<RawValue, ParserFailure> {
    cursor.advance(); // $
    cursor.advance(); // {
    let optional = if cursor.current() == Some('?') {
        cursor.advance();
        true
    } else {
        false
    };
    let start = cursor.pos;
    loop {
        match cursor.current() {
            None | Some('\n') => return Err(cursor.failure("unterminated substitution reference")),
            Some('}') => break,
            Some(_) => cursor.advance(),
        }
    }
    let path = cursor.input[start..cursor.pos].trim();
    cursor.advance(); // }
    if path.is_empty() {
        return Err(cursor.failure("empty substitution reference"));
    }
    Ok(RawValue::Substitution {
        key: Key::parse(path),
        optional,
    })
}

fn parse_unquoted(cursor: &mut Cursor) -> std::result::Result<RawValue, ParserFailure> {
    let start = cursor.pos;
    while let Some(c) = cursor.current() {
        if c.is_whitespace() || is_reserved(c) || cursor.starts_with("//") {
            break;
        }
        cursor.advance();
    }
    if cursor.pos == start {
        let found = cursor.current().map(|c| c.to_string()).unwrap_or_default();
        return Err(cursor.failure(format!("unexpected character '{}'", found)));
    }
    let token = &cursor.input[start..cursor.pos];
    let value = match token {
        "true" => ConfigValue::Boolean(true),
        "false" => ConfigValue::Boolean(false),
        "null" => ConfigValue::Null,
        _ => {
            let numeric_start = token
                .chars()
                .next()
                .map(|c| c.is_ascii_digit() || c == '-')
                .unwrap_or(false);
            if numeric_start {
                if let Ok(n) = token.parse::<i64>() {
                    ConfigValue::Long(n)
                } else if let Ok(x) = token.parse::<f64>() {
                    ConfigValue::Double(x)
                } else {
                    ConfigValue::String(token.to_string())
                }
            } else {
                ConfigValue::String(token.to_string())
            }
        }
    };
    Ok(RawValue::Scalar(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_ok(input: &str) -> RawObject {
        let parsed = ConfigParser::parse(input);
        assert_eq!(parsed.failures(), &[] as &[ParserFailure], "unexpected failures");
        parsed.root
    }

    fn field<'a>(obj: &'a RawObject, key: &str) -> &'a RawValue {
        &obj.fields
            .iter()
            .find(|f| f.key == Key::parse(key))
            .unwrap_or_else(|| panic!("no field '{}'", key))
            .value
    }

    #[test]
    fn test_parse_scalars() {
        let root = parse_ok("a = 1\nb = 1.5\nc = true\nd = null\ne = foo\nf = \"bar\"");
        assert_eq!(field(&root, "a"), &RawValue::Scalar(ConfigValue::Long(1)));
        assert_eq!(field(&root, "b"), &RawValue::Scalar(ConfigValue::Double(1.5)));
        assert_eq!(
            field(&root, "c"),
            &RawValue::Scalar(ConfigValue::Boolean(true))
        );
        assert_eq!(field(&root, "d"), &RawValue::Scalar(ConfigValue::Null));
        assert_eq!(
            field(&root, "e"),
            &RawValue::Scalar(ConfigValue::String("foo".into()))
        );
        assert_eq!(
            field(&root, "f"),
            &RawValue::Scalar(ConfigValue::String("bar".into()))
        );
    }

    #[test]
    fn test_parse_colon_separator_and_comments() {
        let root = parse_ok("# leading comment\na: 1 // trailing comment\nb: 2\n");
        assert_eq!(field(&root, "a"), &RawValue::Scalar(ConfigValue::Long(1)));
        assert_eq!(field(&root, "b"), &RawValue::Scalar(ConfigValue::Long(2)));
    }

    #[test]
    fn test_parse_root_braces() {
        let root = parse_ok("{ a = 1 }");
        assert_eq!(root.fields.len(), 1);
    }

    #[test]
    fn test_parse_nested_object_without_separator() {
        let root = parse_ok("nav { depth = 3 }");
        match field(&root, "nav") {
            RawValue::Object(obj) => {
                assert_eq!(field(obj, "depth"), &RawValue::Scalar(ConfigValue::Long(3)));
            }
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_dotted_key_is_kept_unexpanded() {
        let root = parse_ok("a.b.c = 1");
        assert_eq!(root.fields[0].key, Key::parse("a.b.c"));
    }

    #[test]
    fn test_parse_quoted_key_keeps_dots() {
        let root = parse_ok("\"a.b\" = 1");
        assert_eq!(root.fields[0].key.segments(), &["a.b"]);
    }

    #[test]
    fn test_parse_array() {
        let root = parse_ok("a = [1, 2, 3]");
        assert_eq!(
            field(&root, "a"),
            &RawValue::Array(vec![
                RawValue::Scalar(ConfigValue::Long(1)),
                RawValue::Scalar(ConfigValue::Long(2)),
                RawValue::Scalar(ConfigValue::Long(3)),
            ])
        );
    }

    #[test]
    fn test_parse_array_newline_separated() {
        let root = parse_ok("a = [\n  one\n  two\n]");
        assert_eq!(
            field(&root, "a"),
            &RawValue::Array(vec![
                RawValue::Scalar(ConfigValue::String("one".into())),
                RawValue::Scalar(ConfigValue::String("two".into())),
            ])
        );
    }

    #[test]
    fn test_parse_multiline_string() {
        let root = parse_ok("a = \"\"\"line 1\nline \\n \"2\" end\"\"\"");
        // raw content up to the closing triple quote, no escape processing
        assert_eq!(
            field(&root, "a"),
            &RawValue::Scalar(ConfigValue::String("line 1\nline \\n \"2\" end".into()))
        );
    }

    #[test]
    fn test_parse_multiline_string_trailing_quote_belongs_to_content() {
        let root = parse_ok("a = \"\"\"quoted\"\"\"\"");
        assert_eq!(
            field(&root, "a"),
            &RawValue::Scalar(ConfigValue::String("quoted\"".into()))
        );
    }

    #[test]
    fn test_parse_escapes() {
        let root = parse_ok(r#"a = "tab\there é""#);
        assert_eq!(
            field(&root, "a"),
            &RawValue::Scalar(ConfigValue::String("tab\there \u{00e9}".into()))
        );
    }

    #[test]
    fn test_parse_substitutions() {
        let root = parse_ok("a = ${x.y}\nb = ${?x.y}");
        assert_eq!(
            field(&root, "a"),
            &RawValue::Substitution {
                key: Key::parse("x.y"),
                optional: false
            }
        );
        assert_eq!(
            field(&root, "b"),
            &RawValue::Substitution {
                key: Key::parse("x.y"),
                optional: true
            }
        );
    }

    #[test]
    fn test_parse_string_concatenation_preserves_separators() {
        let root = parse_ok("a = foo  ${x} bar");
        match field(&root, "a") {
            RawValue::Concat(parts) => {
                assert_eq!(parts.len(), 3);
                assert_eq!(parts[0].separator, "");
                assert_eq!(parts[1].separator, "  ");
                assert_eq!(parts[2].separator, " ");
            }
            other => panic!("expected concat, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_unquoted_words_concatenate() {
        let root = parse_ok("a = foo bar");
        match field(&root, "a") {
            RawValue::Concat(parts) => assert_eq!(parts.len(), 2),
            other => panic!("expected concat, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_plus_equals_desugars_to_self_reference() {
        let root = parse_ok("a += 1");
        match field(&root, "a") {
            RawValue::Concat(parts) => {
                assert_eq!(
                    parts[0].value,
                    RawValue::Substitution {
                        key: Key::parse("a"),
                        optional: true
                    }
                );
                assert_eq!(
                    parts[1].value,
                    RawValue::Array(vec![RawValue::Scalar(ConfigValue::Long(1))])
                );
            }
            other => panic!("expected concat, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_plus_equals_in_nested_object_uses_full_path() {
        let root = parse_ok("nav { entries += 1 }");
        match field(&root, "nav") {
            RawValue::Object(obj) => match field(obj, "entries") {
                RawValue::Concat(parts) => assert_eq!(
                    parts[0].value,
                    RawValue::Substitution {
                        key: Key::parse("nav.entries"),
                        optional: true
                    }
                ),
                other => panic!("expected concat, got {:?}", other),
            },
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_duplicate_keys_are_retained_in_order() {
        let root = parse_ok("a = 1\na = 2");
        assert_eq!(root.fields.len(), 2);
    }

    #[test]
    fn test_parse_include_directives() {
        let parsed = ConfigParser::parse(
            "include \"common.conf\"\ninclude file(\"nav.conf\")\ninclude required(url(\"http://cfg\"))\na = 1",
        );
        assert_eq!(parsed.failures(), &[] as &[ParserFailure]);
        assert_eq!(
            parsed.includes(),
            vec![
                IncludeResource::Any {
                    resource_id: "common.conf".into(),
                    required: false
                },
                IncludeResource::File {
                    resource_id: "nav.conf".into(),
                    required: false
                },
                IncludeResource::Url {
                    resource_id: "http://cfg".into(),
                    required: true
                },
            ]
        );
    }

    #[test]
    fn test_parse_include_discovered_in_nested_object() {
        let parsed = ConfigParser::parse("nav { include \"nav.conf\" }");
        assert_eq!(parsed.includes().len(), 1);
    }

    #[test]
    fn test_include_as_plain_key_is_a_field() {
        let parsed = ConfigParser::parse("include = 5");
        assert_eq!(parsed.includes(), vec![]);
        assert_eq!(
            field(&parsed.root, "include"),
            &RawValue::Scalar(ConfigValue::Long(5))
        );
    }

    #[test]
    fn test_parse_failure_has_position() {
        let parsed = ConfigParser::parse("a = 1\nb = \"unterminated");
        assert_eq!(parsed.failures().len(), 1);
        assert_eq!(parsed.failures()[0].line, 2);
    }

    #[test]
    fn test_parse_failures_aggregate_across_fields() {
        let parsed = ConfigParser::parse("a = \"open\nb = 2\nc = \"also open");
        assert_eq!(parsed.failures().len(), 2);
        // the well-formed field in between still parses
        assert_eq!(field(&parsed.root, "b"), &RawValue::Scalar(ConfigValue::Long(2)));
    }

    #[test]
    fn test_parse_missing_value_is_failure() {
        let parsed = ConfigParser::parse("a =\nb = 2");
        assert_eq!(parsed.failures().len(), 1);
    }

    #[test]
    fn test_parse_number_like_strings_stay_strings() {
        let root = parse_ok("a = 1.2.3\nb = 10s");
        assert_eq!(
            field(&root, "a"),
            &RawValue::Scalar(ConfigValue::String("1.2.3".into()))
        );
        assert_eq!(
            field(&root, "b"),
            &RawValue::Scalar(ConfigValue::String("10s".into()))
        );
    }

    #[test]
    fn test_parse_exponent_number() {
        let root = parse_ok("a = 1.5e3\nb = -42");
        assert_eq!(
            field(&root, "a"),
            &RawValue::Scalar(ConfigValue::Double(1500.0))
        );
        assert_eq!(field(&root, "b"), &RawValue::Scalar(ConfigValue::Long(-42)));
    }
}
