use regex::Regex;
use serde_json::{Map, Value, json};

/// Marker substituted for every redacted value. Opaque on purpose: the marker
/// itself never matches a key-derived pattern, which is what makes redaction
/// idempotent.
pub const FILTERED_MARKER: &str = "[FILTERED]";

/// Header names scrubbed unconditionally, on top of whatever the configured
/// policy contains. Holds even when the configured pattern list is empty.
const ALWAYS_FILTER_HEADERS: [&str; 5] = [
    "authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
    "x-auth-token",
];

/// KeyMatcher
///
/// One compiled pattern. Plain patterns match a key by case-insensitive
/// equality or substring containment; patterns containing `*` become an
/// anchored regex with each `*` expanded to "zero or more characters".
enum KeyMatcher {
    Literal(String),
    Wildcard(Regex),
}

impl KeyMatcher {
    fn compile(pattern: &str) -> Self {
        let lowered = pattern.to_lowercase();
        if lowered.contains('*') {
            let body = lowered
                .split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(".*");
            // Escaped segments joined by `.*` always form a valid expression.
            let re = Regex::new(&format!("^{}$", body)).expect("wildcard pattern compiles");
            KeyMatcher::Wildcard(re)
        } else {
            KeyMatcher::Literal(lowered)
        }
    }

    /// Expects a pre-lowercased key.
    fn matches(&self, key: &str) -> bool {
        match self {
            KeyMatcher::Literal(lit) => key == lit || key.contains(lit.as_str()),
            KeyMatcher::Wildcard(re) => re.is_match(key),
        }
    }
}

/// FilterPolicy
///
/// The sensitive-field redaction engine. Compiled once from the configured
/// pattern list at startup; afterwards it holds no mutable state and is safe
/// to apply concurrently from any number of requests.
///
/// `redact` is total and pure: it never fails, never drops unknown shapes,
/// and passes primitives through unchanged.
pub struct FilterPolicy {
    matchers: Vec<KeyMatcher>,
    // Configured patterns plus the fixed security-sensitive header names.
    header_matchers: Vec<KeyMatcher>,
}

impl FilterPolicy {
    pub fn new(patterns: &[String]) -> Self {
        let matchers = patterns.iter().map(|p| KeyMatcher::compile(p)).collect();
        let header_matchers = patterns
            .iter()
            .map(String::as_str)
            .chain(ALWAYS_FILTER_HEADERS)
            .map(KeyMatcher::compile)
            .collect();

        Self {
            matchers,
            header_matchers,
        }
    }

    /// True when the key matches any configured pattern (exact, substring,
    /// or wildcard - all case-insensitive).
    pub fn matches(&self, key: &str) -> bool {
        let key_lower = key.to_lowercase();
        self.matchers.iter().any(|m| m.matches(&key_lower))
    }

    /// redact
    ///
    /// Recursively walks maps and sequences. A map entry whose key matches
    /// gets its value replaced with the marker - even a nested structure is
    /// replaced wholesale, never descended into. Sequences are processed
    /// element-wise; primitives are copied unchanged.
    pub fn redact(&self, value: &Value) -> Value {
        apply(value, &self.matchers)
    }

    /// Header view: the configured patterns plus the fixed sensitive-header
    /// list. `Authorization` and `Cookie` are scrubbed even under an empty
    /// configured policy.
    pub fn redact_headers(&self, headers: &Value) -> Value {
        apply(headers, &self.header_matchers)
    }

    /// Query parameters use the same extended set as headers: tokens and API
    /// keys leak through URLs as easily as through headers.
    pub fn redact_query_params(&self, params: &Value) -> Value {
        apply(params, &self.header_matchers)
    }

    /// sanitize_url
    ///
    /// Replaces the values of matching query parameters in a URL string with
    /// the marker, preserving everything else byte-for-byte.
    pub fn sanitize_url(&self, url: &str) -> String {
        let Some((base, query)) = url.split_once('?') else {
            return url.to_string();
        };

        let sanitized: Vec<String> = query
            .split('&')
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => {
                    let key_lower = key.to_lowercase();
                    if self.header_matchers.iter().any(|m| m.matches(&key_lower)) {
                        format!("{}={}", key, FILTERED_MARKER)
                    } else {
                        format!("{}={}", key, value)
                    }
                }
                None => pair.to_string(),
            })
            .collect();

        format!("{}?{}", base, sanitized.join("&"))
    }
}

fn apply(value: &Value, matchers: &[KeyMatcher]) -> Value {
    match value {
        Value::Object(map) => {
            let mut filtered = Map::with_capacity(map.len());
            for (key, entry) in map {
                let key_lower = key.to_lowercase();
                if matchers.iter().any(|m| m.matches(&key_lower)) {
                    filtered.insert(key.clone(), json!(FILTERED_MARKER));
                } else {
                    filtered.insert(key.clone(), apply(entry, matchers));
                }
            }
            Value::Object(filtered)
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| apply(v, matchers)).collect()),
        primitive => primitive.clone(),
    }
}
