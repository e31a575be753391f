//! Route template parsing.
//!
//! [`parse_template`] turns a template string such as
//! `{controller}/{action}/{id?}` into a [`RouteTemplate`], rejecting
//! malformed input with a [`RouteError::TemplateParse`] that cites the
//! character offset of the problem.
//!
//! Grammar:
//!
//! ```text
//! template   := "~/"? "/"? segment ("/" segment)*
//! segment    := part+
//! part       := literal | "{" param "}"
//! param      := "*"? name ("=" default)? ("?")? (":" constraint)*
//! ```
//!
//! Literal text may contain `{{` and `}}` as escaped braces; the same
//! escapes are honoured inside a parameter body so that regex constraints
//! can use repetition counts (`{id:regex(^\d{{4}}$)}`).

use routex_core::{RouteError, RouteResult, TemplateParseErrorKind};

use crate::template::{ParameterPart, RoutePart, RouteSegment, RouteTemplate};

/// Parses a route template string into a [`RouteTemplate`].
///
/// A leading `~/` or `/` is stripped before parsing; the stripped form is
/// the canonical text stored on the template. An empty template (or a bare
/// `/`) is valid and matches only the root path.
///
/// # Errors
///
/// Returns [`RouteError::TemplateParse`] with the offending offset and a
/// [`TemplateParseErrorKind`] describing the cause.
///
/// # Examples
///
/// ```
/// use routex_template::parse_template;
///
/// let template = parse_template("/{controller}/{action}/{id?}").unwrap();
/// assert_eq!(template.text(), "{controller}/{action}/{id?}");
/// assert_eq!(template.segments().len(), 3);
/// ```
pub fn parse_template(input: &str) -> RouteResult<RouteTemplate> {
    let mut base = 0;
    let mut text = input;
    if let Some(rest) = text.strip_prefix("~/") {
        text = rest;
        base = 2;
    }
    if let Some(rest) = text.strip_prefix('/') {
        text = rest;
        base += 1;
    }

    let mut segments: Vec<Vec<(RoutePart, usize)>> = Vec::new();
    if !text.is_empty() {
        let mut start = 0;
        loop {
            let end = text[start..].find('/').map_or(text.len(), |i| start + i);
            segments.push(parse_segment(&text[start..end], base + start)?);
            if end == text.len() {
                break;
            }
            start = end + 1;
        }
    }

    validate(&segments)?;

    let segments = segments
        .into_iter()
        .map(|parts| RouteSegment::new(parts.into_iter().map(|(p, _)| p).collect()))
        .collect();
    Ok(RouteTemplate::new(text.to_string(), segments))
}

/// Parses one `/`-delimited segment into its parts, tagging each part with
/// its offset in the original input for error reporting.
fn parse_segment(segment: &str, offset: usize) -> RouteResult<Vec<(RoutePart, usize)>> {
    if segment.is_empty() {
        return Err(RouteError::parse(offset, TemplateParseErrorKind::EmptySegment));
    }

    let bytes = segment.as_bytes();
    let mut parts: Vec<(RoutePart, usize)> = Vec::new();
    let mut literal = String::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                literal.push('{');
                i += 2;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                literal.push('}');
                i += 2;
            }
            b'}' => {
                return Err(RouteError::parse(
                    offset + i,
                    TemplateParseErrorKind::UnbalancedBrace,
                ));
            }
            b'{' => {
                if !literal.is_empty() {
                    parts.push((RoutePart::Literal(literal), offset + literal_start));
                    literal = String::new();
                }
                let (part, next) = parse_parameter(segment, i, offset)?;
                parts.push((part, offset + i));
                i = next;
                literal_start = i;
            }
            _ => {
                if literal.is_empty() {
                    literal_start = i;
                }
                // Segments are ASCII-delimited; copy whole UTF-8 scalars.
                let ch_len = utf8_len(bytes[i]);
                literal.push_str(&segment[i..i + ch_len]);
                i += ch_len;
            }
        }
    }
    if !literal.is_empty() {
        parts.push((RoutePart::Literal(literal), offset + literal_start));
    }

    reclassify_separators(&mut parts);
    Ok(parts)
}

const fn utf8_len(first_byte: u8) -> usize {
    match first_byte {
        b if b < 0x80 => 1,
        b if b < 0xE0 => 2,
        b if b < 0xF0 => 3,
        _ => 4,
    }
}

/// Literal text flanked by parameters on both sides is a separator part.
fn reclassify_separators(parts: &mut [(RoutePart, usize)]) {
    for i in 1..parts.len().saturating_sub(1) {
        let between = parts[i - 1].0.parameter().is_some() && parts[i + 1].0.parameter().is_some();
        if between {
            if let RoutePart::Literal(text) = &parts[i].0 {
                parts[i].0 = RoutePart::Separator(text.clone());
            }
        }
    }
}

/// Parses a `{...}` parameter starting at byte `open` (which holds `{`).
/// Returns the part and the index just past the closing brace.
fn parse_parameter(
    segment: &str,
    open: usize,
    offset: usize,
) -> RouteResult<(RoutePart, usize)> {
    let bytes = segment.as_bytes();
    let mut body = String::new();
    let mut i = open + 1;
    let close = loop {
        match bytes.get(i) {
            None => {
                return Err(RouteError::parse(
                    offset + open,
                    TemplateParseErrorKind::UnbalancedBrace,
                ));
            }
            Some(b'}') if bytes.get(i + 1) == Some(&b'}') => {
                body.push('}');
                i += 2;
            }
            Some(b'}') => break i,
            Some(b'{') if bytes.get(i + 1) == Some(&b'{') => {
                body.push('{');
                i += 2;
            }
            Some(b'{') => {
                return Err(RouteError::parse(
                    offset + i,
                    TemplateParseErrorKind::UnbalancedBrace,
                ));
            }
            Some(&b) => {
                let ch_len = utf8_len(b);
                body.push_str(&segment[i..i + ch_len]);
                i += ch_len;
            }
        }
    };

    let part = parse_parameter_body(&body, offset + open)?;
    Ok((RoutePart::Parameter(part), close + 1))
}

/// Parses the text between the braces: `*? name (= default)? (?)?
/// (: constraint)*`.
fn parse_parameter_body(body: &str, offset: usize) -> RouteResult<ParameterPart> {
    let (is_catch_all, body) = match body.strip_prefix('*') {
        Some(rest) => (true, rest),
        None => (false, body),
    };

    let sections = split_constraints(body);
    let head = sections.first().map_or("", String::as_str);
    let inline_constraints: Vec<String> = sections
        .iter()
        .skip(1)
        .filter(|s| !s.is_empty())
        .cloned()
        .collect();

    let (mut name, mut default_value) = match head.split_once('=') {
        Some((n, d)) => (n, Some(d.to_string())),
        None => (head, None),
    };

    let mut is_optional = false;
    if let Some(d) = &default_value {
        if let Some(stripped) = d.strip_suffix('?') {
            // `{id=5?}`: both a default and the optional marker
            default_value = Some(stripped.to_string());
            is_optional = true;
        }
    } else if let Some(stripped) = name.strip_suffix('?') {
        name = stripped;
        is_optional = true;
    }

    if name.is_empty() {
        return Err(RouteError::parse(offset, TemplateParseErrorKind::EmptyName));
    }
    if is_catch_all && is_optional {
        return Err(RouteError::parse(
            offset,
            TemplateParseErrorKind::OptionalCatchAll,
        ));
    }
    if is_catch_all && default_value.is_some() {
        return Err(RouteError::parse(
            offset,
            TemplateParseErrorKind::DefaultOnCatchAll,
        ));
    }
    if is_optional && default_value.is_some() {
        return Err(RouteError::parse(
            offset,
            TemplateParseErrorKind::DefaultOnOptional,
        ));
    }

    Ok(ParameterPart {
        name: name.to_string(),
        is_optional,
        is_catch_all,
        default_value,
        inline_constraints,
    })
}

/// Splits a parameter body on `:` at parenthesis depth zero, so constraint
/// arguments such as `regex((?:a)+)` keep their own colons.
fn split_constraints(body: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for ch in body.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ':' if depth == 0 => sections.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    sections.push(current);
    sections
}

/// Cross-segment validation: unique names, catch-all placement, optional
/// placement.
fn validate(segments: &[Vec<(RoutePart, usize)>]) -> RouteResult<()> {
    let mut seen: Vec<String> = Vec::new();
    let last_segment = segments.len().saturating_sub(1);

    for (si, parts) in segments.iter().enumerate() {
        let last_part = parts.len() - 1;
        for (pi, (part, part_offset)) in parts.iter().enumerate() {
            let Some(p) = part.parameter() else { continue };

            let lower = p.name.to_ascii_lowercase();
            if seen.contains(&lower) {
                return Err(RouteError::parse(
                    *part_offset,
                    TemplateParseErrorKind::DuplicateName,
                ));
            }
            seen.push(lower);

            if p.is_catch_all && (si != last_segment || pi != last_part) {
                return Err(RouteError::parse(
                    *part_offset,
                    TemplateParseErrorKind::CatchAllNotLast,
                ));
            }

            if p.is_optional {
                // The optional must be alone in its segment and every
                // later segment must also be a lone optional parameter.
                let trailing_ok = parts.len() == 1
                    && segments[si + 1..].iter().all(|s| {
                        s.len() == 1
                            && s[0].0.parameter().is_some_and(|q| q.is_optional)
                    });
                if !trailing_ok {
                    return Err(RouteError::parse(
                        *part_offset,
                        TemplateParseErrorKind::OptionalNotTrailing,
                    ));
                }
            }
        }
    }
    Ok(())
}
