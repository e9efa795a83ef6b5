//! Documentation block parsing.
//!
//! A route call site may be preceded by a `/** ... */` block carrying `@tag value` directives:
//!
//! ```text
//! /**
//!  * @summary Create an order
//!  * @tag Orders
//!  * @queries dryRun: validate only, notify: send mail
//!  * @body {sku: string, qty: number}
//!  * @response Order
//!  */
//! router.post('/orders', auth(), async (req, res) => { ... })
//! ```
//!
//! Tags are case-sensitive and unordered. A valued tag takes the rest of its line after the
//! first occurrence. `@ignore` and `@manual` are flags.

/// Directives recovered from one documentation block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations {
    /// `@ignore`: leave the endpoint out of every document
    pub ignore: bool,
    /// `@manual`: reuse the previously published operation
    pub manual: bool,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub tag: Option<String>,
    /// `@queries`: `(name, description)` pairs, in order
    pub queries: Vec<(String, Option<String>)>,
    /// `@body`: registry name or inline literal
    pub body: Option<String>,
    /// `@response`: registry name or inline literal
    pub response: Option<String>,
}

impl Annotations {
    /// Parses the content of a documentation block (the text between `/**` and `*/`).
    ///
    /// `@ignore` short-circuits: when present, no other field is filled.
    pub fn parse(block: &str) -> Self {
        if has_tag(block, "ignore") {
            return Self {
                ignore: true,
                ..Self::default()
            };
        }

        Self {
            ignore: false,
            manual: has_tag(block, "manual"),
            description: tag_value(block, "description"),
            summary: tag_value(block, "summary"),
            tag: tag_value(block, "tag"),
            queries: tag_value(block, "queries")
                .map(|value| parse_queries(&value))
                .unwrap_or_default(),
            body: tag_value(block, "body").filter(|v| !v.is_empty()),
            response: tag_value(block, "response").filter(|v| !v.is_empty()),
        }
    }

    /// Annotations of a call site without a documentation block.
    pub fn none() -> Self {
        Self::default()
    }
}

/// Byte offset right after the first `@name` that is not the prefix of a longer word.
fn find_tag(block: &str, name: &str) -> Option<usize> {
    let needle = format!("@{}", name);
    let mut from = 0;
    while let Some(pos) = block[from..].find(&needle) {
        let end = from + pos + needle.len();
        let boundary = block[end..]
            .chars()
            .next()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_'));
        if boundary {
            return Some(end);
        }
        from = end;
    }
    None
}

fn has_tag(block: &str, name: &str) -> bool {
    find_tag(block, name).is_some()
}

/// The trimmed rest of the line after the first `@name`.
fn tag_value(block: &str, name: &str) -> Option<String> {
    let start = find_tag(block, name)?;
    let rest = &block[start..];
    let line = rest.split('\n').next().unwrap_or("");
    Some(line.trim().to_string())
}

/// Splits `a: first, b: second` into ordered pairs. Entries without a name are dropped.
fn parse_queries(value: &str) -> Vec<(String, Option<String>)> {
    value
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(':');
            let name = parts.next().unwrap_or("").trim();
            if name.is_empty() {
                return None;
            }
            let description = parts
                .next()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string);
            Some((name.to_string(), description))
        })
        .collect()
}
