//! `${key}` placeholder templates
//!
//! `$${` produces a literal `${`. Substituted text is never re-scanned.

/// Template parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaceholderError {
    #[error("unterminated placeholder in '{0}'")]
    Unterminated(String),

    #[error("empty placeholder in '{0}'")]
    EmptyKey(String),

    #[error("no value for placeholder '{0}'")]
    Unresolved(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

fn parse(template: &str) -> Result<Vec<Segment<'_>>, PlaceholderError> {
    let mut segments = Vec::new();
    let mut rest = template;

    while let Some(pos) = rest.find("${") {
        if rest[..pos].ends_with('$') {
            if pos > 1 {
                segments.push(Segment::Literal(&rest[..pos - 1]));
            }
            segments.push(Segment::Literal("${"));
            rest = &rest[pos + 2..];
            continue;
        }

        if pos > 0 {
            segments.push(Segment::Literal(&rest[..pos]));
        }
        let after = &rest[pos + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| PlaceholderError::Unterminated(template.to_string()))?;
        let key = after[..end].trim();
        if key.is_empty() {
            return Err(PlaceholderError::EmptyKey(template.to_string()));
        }
        segments.push(Segment::Placeholder(key));
        rest = &after[end + 1..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }
    Ok(segments)
}

/// Override keys referenced by `template`, in order of appearance
pub fn references(template: &str) -> Result<Vec<&str>, PlaceholderError> {
    Ok(parse(template)?
        .into_iter()
        .filter_map(|s| match s {
            Segment::Placeholder(key) => Some(key),
            Segment::Literal(_) => None,
        })
        .collect())
}

/// True when `template` contains placeholder syntax (including escapes)
pub fn has_placeholders(template: &str) -> bool {
    template.contains("${")
}

/// Render `template`, resolving each key through `lookup`.
///
/// Fails with `Unresolved` on the first key `lookup` has no value for.
pub fn render<'v, F>(template: &str, mut lookup: F) -> Result<String, PlaceholderError>
where
    F: FnMut(&str) -> Option<&'v str>,
{
    let mut out = String::with_capacity(template.len());
    for segment in parse(template)? {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Placeholder(key) => {
                let value =
                    lookup(key).ok_or_else(|| PlaceholderError::Unresolved(key.to_string()))?;
                out.push_str(value);
            }
        }
    }
    Ok(out)
}
