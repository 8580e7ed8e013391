//! waymark-pattern: URL pattern compiler
//!
//! Turns route patterns into anchored regular expressions and reverses them
//! back into concrete URLs. Shared by route paths, domain constraints and
//! partial-group prefix guards in waymark-core.
//!
//! ## Pattern Syntax
//! - `{name}` - Required parameter (one or more non-slash characters)
//! - `{name?}` - Optional parameter (zero or more non-slash characters)
//! - `{name:regex}` / `{name?:regex}` - Parameter with an inline constraint
//!
//! Optional parameters must form a trailing run: an optional parameter may
//! only be followed by other optional parameters. A trailing slash is always
//! optional, so `/users` also matches `/users/`.
//!
//! ## Example
//! ```
//! use waymark_pattern::{compile, Params, PatternKind};
//!
//! let pattern = compile("/post/{id:\\d+}/{slug?}", PatternKind::Path).unwrap();
//!
//! let params = pattern.captures("/post/42/hello-world").unwrap();
//! assert_eq!(params.get("id"), Some("42"));
//! assert_eq!(params.get("slug"), Some("hello-world"));
//!
//! let url = pattern.reverse(&Params::from_iter([("id", "7")])).unwrap();
//! assert_eq!(url, "/post/7");
//! ```

mod cache;
mod error;
mod params;

pub use cache::PatternCache;
pub use error::{PatternError, Result};
pub use params::Params;

use regex::Regex;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};

/// Constraints applied to parameters that carry no inline regex, by name
pub type Constraints = BTreeMap<String, String>;

/// What a pattern is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    /// Full request path, trailing slash optional
    Path,
    /// Leading part of a request path, ending on a segment boundary
    Prefix,
    /// Request host, case-insensitive, parameters span one label
    Host,
}

impl PatternKind {
    fn default_constraint(self, required: bool) -> &'static str {
        match (self, required) {
            (PatternKind::Host, true) => "[^.]+",
            (PatternKind::Host, false) => "[^.]*",
            (_, true) => "[^/]+",
            (_, false) => "[^/]*",
        }
    }

    fn is_path(self) -> bool {
        !matches!(self, PatternKind::Host)
    }
}

/// A parameter token: `{name}`, `{name?}` or `{name:regex}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub required: bool,
    /// Explicit constraint, `None` means the kind's default
    pub constraint: Option<String>,
}

/// One piece of a compiled pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(ParamSpec),
}

/// Immutable matcher derived from a raw pattern
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    raw: String,
    kind: PatternKind,
    segments: Vec<Segment>,
    regex: Regex,
    /// Capture group name per parameter, in pattern order
    groups: Vec<String>,
}

/// Compile a pattern with default constraints
pub fn compile(raw: &str, kind: PatternKind) -> Result<CompiledPattern> {
    compile_with(raw, kind, &Constraints::new())
}

/// Compile a pattern, applying `constraints` to parameters without an inline regex
pub fn compile_with(raw: &str, kind: PatternKind, constraints: &Constraints) -> Result<CompiledPattern> {
    let mut segments = parse(raw)?;

    for segment in &mut segments {
        if let Segment::Param(spec) = segment {
            if spec.constraint.is_none() {
                if let Some(constraint) = constraints.get(&spec.name) {
                    check_constraint(&spec.name, constraint)?;
                    spec.constraint = Some(constraint.clone());
                }
            }
        }
    }

    validate(raw, &segments)?;

    let (expr, groups) = build_expression(&segments, kind);
    let regex = Regex::new(&expr).map_err(|source| PatternError::InvalidRegex {
        pattern: raw.to_string(),
        source,
    })?;

    Ok(CompiledPattern {
        raw: raw.to_string(),
        kind,
        segments,
        regex,
        groups,
    })
}

impl CompiledPattern {
    /// The pattern as written
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The generated matcher
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Parameter descriptors in pattern order
    pub fn params(&self) -> impl Iterator<Item = &ParamSpec> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Param(spec) => Some(spec),
            Segment::Literal(_) => None,
        })
    }

    /// True when the pattern has no parameters
    pub fn is_static(&self) -> bool {
        self.params().next().is_none()
    }

    pub fn is_match(&self, input: &str) -> bool {
        self.regex.is_match(&self.prepare(input))
    }

    /// Match `input` and extract parameter values.
    ///
    /// Path kinds are matched against the percent-decoded path, so
    /// constraints see the same text that [`reverse`](Self::reverse) was
    /// given. Optional parameters that captured nothing are left out.
    pub fn captures(&self, input: &str) -> Option<Params> {
        let input = self.prepare(input);
        let caps = self.regex.captures(&input)?;
        let mut params = Params::new();

        for (spec, group) in self.params().zip(&self.groups) {
            let value = match caps.name(group) {
                Some(m) if !m.as_str().is_empty() => m.as_str(),
                _ => continue,
            };
            let value = if self.kind.is_path() {
                urlencoding::decode(value).unwrap_or(Cow::Borrowed(value))
            } else {
                Cow::Borrowed(value)
            };
            params.insert(spec.name.as_str(), value.into_owned());
        }

        Some(params)
    }

    fn prepare<'a>(&self, input: &'a str) -> Cow<'a, str> {
        if self.kind.is_path() {
            decode_path(input)
        } else {
            Cow::Borrowed(input)
        }
    }

    /// Substitute `params` back into the pattern.
    ///
    /// Every required parameter needs a value. Once an optional parameter is
    /// omitted, the optional parameters after it are omitted as well, so the
    /// result always matches back to the same values.
    pub fn reverse(&self, params: &Params) -> Result<String> {
        let mut url = String::with_capacity(self.raw.len());
        let mut omitted = false;

        for segment in &self.segments {
            let spec = match segment {
                Segment::Literal(text) => {
                    url.push_str(text);
                    continue;
                }
                Segment::Param(spec) => spec,
            };

            let value = params.get(&spec.name).filter(|v| !v.is_empty());
            match value {
                Some(value) if !omitted => {
                    if self.kind.is_path() {
                        url.push_str(&urlencoding::encode(value));
                    } else {
                        url.push_str(value);
                    }
                }
                _ if spec.required => {
                    return Err(PatternError::MissingParameter {
                        pattern: self.raw.clone(),
                        name: spec.name.clone(),
                    });
                }
                _ => {
                    omitted = true;
                    if self.kind.is_path() && url.ends_with('/') {
                        url.pop();
                    }
                }
            }
        }

        if self.kind.is_path() {
            while url.len() > 1 && url.ends_with('/') {
                url.pop();
            }
            if url.is_empty() {
                url.push('/');
            }
        }

        Ok(url)
    }
}

/// Percent-decode a request path, leaving `%2F` and `%25` escaped.
///
/// An encoded slash must not split a segment, and keeping `%` escaped lets
/// captured values be decoded exactly once. Paths that do not decode to
/// UTF-8 are returned untouched.
pub fn decode_path(input: &str) -> Cow<'_, str> {
    if !input.contains('%') {
        return Cow::Borrowed(input);
    }

    let mut bytes = Vec::with_capacity(input.len());
    let mut rest = input;
    while let Some(at) = find_reserved_escape(rest) {
        bytes.extend_from_slice(&urlencoding::decode_binary(rest[..at].as_bytes()));
        bytes.extend_from_slice(rest[at..at + 3].to_ascii_uppercase().as_bytes());
        rest = &rest[at + 3..];
    }
    bytes.extend_from_slice(&urlencoding::decode_binary(rest.as_bytes()));

    match String::from_utf8(bytes) {
        Ok(decoded) => Cow::Owned(decoded),
        Err(_) => Cow::Borrowed(input),
    }
}

fn find_reserved_escape(input: &str) -> Option<usize> {
    input.match_indices('%').map(|(at, _)| at).find(|&at| {
        matches!(input.get(at + 1..at + 3), Some(hex) if hex.eq_ignore_ascii_case("2f") || hex == "25")
    })
}

fn parse(raw: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = raw.char_indices();

    while let Some((position, c)) = chars.next() {
        match c {
            '{' => {
                let body = take_token(raw, position, &mut chars)?;
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Param(parse_param(raw, body)?));
            }
            '}' => {
                return Err(PatternError::UnexpectedBrace {
                    pattern: raw.to_string(),
                    position,
                })
            }
            _ => literal.push(c),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    Ok(segments)
}

/// Consume up to the `}` closing the token opened at `open`.
/// Braces inside a constraint (`\d{2,4}`) nest; `\` escapes one character.
fn take_token<'a>(raw: &'a str, open: usize, chars: &mut std::str::CharIndices<'a>) -> Result<&'a str> {
    let mut depth = 0usize;
    let mut escaped = false;

    for (position, c) in chars.by_ref() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' if depth == 0 => return Ok(&raw[open + 1..position]),
            '}' => depth -= 1,
            _ => {}
        }
    }

    Err(PatternError::Unclosed {
        pattern: raw.to_string(),
        position: open,
    })
}

fn parse_param(raw: &str, body: &str) -> Result<ParamSpec> {
    let (head, constraint) = match body.split_once(':') {
        Some((head, constraint)) => (head, Some(constraint)),
        None => (body, None),
    };
    let (name, required) = match head.strip_suffix('?') {
        Some(name) => (name, false),
        None => (head, true),
    };

    if !is_valid_name(name) {
        return Err(PatternError::InvalidName {
            pattern: raw.to_string(),
            name: name.to_string(),
        });
    }

    let constraint = match constraint {
        Some(constraint) => {
            check_constraint(name, constraint)?;
            Some(constraint.to_string())
        }
        None => None,
    };

    Ok(ParamSpec {
        name: name.to_string(),
        required,
        constraint,
    })
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_constraint(name: &str, constraint: &str) -> Result<()> {
    Regex::new(constraint)
        .map(|_| ())
        .map_err(|source| PatternError::InvalidConstraint {
            name: name.to_string(),
            source,
        })
}

fn validate(raw: &str, segments: &[Segment]) -> Result<()> {
    let mut seen = HashSet::new();
    let mut first_optional: Option<&str> = None;

    for segment in segments {
        let Segment::Param(spec) = segment else {
            continue;
        };

        if !seen.insert(spec.name.as_str()) {
            return Err(PatternError::DuplicateParameter {
                pattern: raw.to_string(),
                name: spec.name.clone(),
            });
        }

        match (spec.required, first_optional) {
            (true, Some(optional)) => {
                return Err(PatternError::OptionalBeforeRequired {
                    pattern: raw.to_string(),
                    optional: optional.to_string(),
                    required: spec.name.clone(),
                })
            }
            (false, None) => first_optional = Some(spec.name.as_str()),
            _ => {}
        }
    }

    Ok(())
}

/// Assemble the anchored regex. Parameters become named groups `p0`, `p1`, ...
/// so user constraints with their own groups cannot shift the indices.
fn build_expression(segments: &[Segment], kind: PatternKind) -> (String, Vec<String>) {
    let mut expr = String::from(if kind == PatternKind::Host { "(?i)^" } else { "^" });
    let mut groups = Vec::new();
    let last = segments.len().saturating_sub(1);

    for (index, segment) in segments.iter().enumerate() {
        match segment {
            Segment::Literal(text) => {
                let mut text = text.as_str();
                if kind.is_path() {
                    let before_optional = matches!(
                        segments.get(index + 1),
                        Some(Segment::Param(spec)) if !spec.required
                    );
                    // The slash before an optional parameter goes inside its group
                    if before_optional {
                        text = text.strip_suffix('/').unwrap_or(text);
                    }
                    if index == last {
                        text = text.trim_end_matches('/');
                    }
                }
                expr.push_str(&regex::escape(text));
            }
            Segment::Param(spec) => {
                let group = format!("p{}", groups.len());
                let body = spec
                    .constraint
                    .as_deref()
                    .unwrap_or_else(|| kind.default_constraint(spec.required));
                let capture = format!("(?P<{}>(?:{}))", group, body);

                if spec.required {
                    expr.push_str(&capture);
                } else {
                    let slash_led = kind.is_path()
                        && index
                            .checked_sub(1)
                            .and_then(|prev| segments.get(prev))
                            .map_or(false, |prev| matches!(prev, Segment::Literal(t) if t.ends_with('/')));
                    if slash_led {
                        expr.push_str(&format!("(?:/{})?", capture));
                    } else {
                        expr.push_str(&format!("(?:{})?", capture));
                    }
                }
                groups.push(group);
            }
        }
    }

    expr.push_str(match kind {
        PatternKind::Path => "/?$",
        PatternKind::Prefix => "(?:/|$)",
        PatternKind::Host => "$",
    });

    (expr, groups)
}
