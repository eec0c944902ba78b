//! Postman collection document model.
//!
//! Only the parts the runner needs are typed; unknown fields are ignored.
//! Absent or `null` child lists deserialize as empty so the tree walk never
//! has to special-case them.

use crate::error::RunError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub info: Option<CollectionInfo>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub item: Vec<Item>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub variable: Vec<Variable>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
}

/// A folder or a request. Folders carry children, requests carry `request`;
/// the format allows both on one item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub request: Option<RequestSpec>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub item: Vec<Item>,
}

/// The format allows a bare URL string or a request object. Anything else is
/// kept as-is: it still counts as a request, and the runner reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestSpec {
    Url(String),
    Detailed(RequestDef),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestDef {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub url: Option<UrlSpec>,
    #[serde(default)]
    pub header: Option<HeaderList>,
    #[serde(default)]
    pub body: Option<Body>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UrlSpec {
    Raw(String),
    Structured {
        #[serde(default)]
        raw: Option<String>,
    },
}

/// Headers are a list of entries or a raw `Key: Value` block, one per line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderList {
    Entries(Vec<Header>),
    Raw(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Header {
    #[serde(default, deserialize_with = "any_as_string")]
    pub key: String,
    #[serde(default, deserialize_with = "any_as_string")]
    pub value: String,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Body {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub raw: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Variable {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub disabled: bool,
}

/// One request found by the depth-first walk.
#[derive(Debug, Clone, Copy)]
pub struct RequestRef<'a> {
    pub name: Option<&'a str>,
    pub request: &'a RequestSpec,
}

impl RequestRef<'_> {
    pub fn label(&self) -> &str {
        self.name.unwrap_or("Request")
    }
}

fn json_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn any_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(json_to_string(&serde_json::Value::deserialize(deserializer)?))
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Collection {
    /// Read and parse a collection file.
    pub async fn load(path: &Path) -> Result<Self, RunError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| RunError::ReadCollection {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(&raw).map_err(|source| RunError::ParseCollection {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn name(&self) -> Option<&str> {
        self.info.as_ref().and_then(|i| i.name.as_deref())
    }

    /// Every item carrying a request, depth-first in document order.
    pub fn requests(&self) -> Vec<RequestRef<'_>> {
        let mut out = Vec::new();
        collect_requests(&self.item, &mut out);
        out
    }

    /// Number of items carrying a request, at any nesting depth.
    pub fn request_count(&self) -> u64 {
        count_requests(&self.item)
    }

    /// Enabled collection variables as plain strings.
    pub fn variables(&self) -> HashMap<String, String> {
        self.variable
            .iter()
            .filter(|v| !v.disabled)
            .map(|v| (v.key.clone(), json_to_string(&v.value)))
            .collect()
    }
}

fn count_requests(items: &[Item]) -> u64 {
    items
        .iter()
        .map(|item| u64::from(item.request.is_some()) + count_requests(&item.item))
        .sum()
}

fn collect_requests<'a>(items: &'a [Item], out: &mut Vec<RequestRef<'a>>) {
    for item in items {
        if let Some(request) = item.request.as_ref() {
            out.push(RequestRef {
                name: item.name.as_deref(),
                request,
            });
        }
        collect_requests(&item.item, out);
    }
}

/// Parse a raw header block. Lines starting with `//` are disabled.
fn parse_header_block(block: &str) -> Vec<Header> {
    block
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("//"))
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            Some(Header {
                key: key.trim().to_string(),
                value: value.trim().to_string(),
                disabled: false,
            })
        })
        .collect()
}

impl RequestSpec {
    /// False for shapes the runner cannot send.
    pub fn is_supported(&self) -> bool {
        !matches!(self, RequestSpec::Other(_))
    }

    pub fn method(&self) -> &str {
        match self {
            RequestSpec::Detailed(def) => def.method.as_deref().unwrap_or("GET"),
            _ => "GET",
        }
    }

    pub fn raw_url(&self) -> Option<&str> {
        match self {
            RequestSpec::Url(url) => Some(url),
            RequestSpec::Detailed(def) => match def.url.as_ref()? {
                UrlSpec::Raw(url) => Some(url),
                UrlSpec::Structured { raw } => raw.as_deref(),
            },
            RequestSpec::Other(_) => None,
        }
    }

    /// Enabled headers.
    pub fn headers(&self) -> Vec<Header> {
        let list = match self {
            RequestSpec::Detailed(RequestDef {
                header: Some(list), ..
            }) => list,
            _ => return Vec::new(),
        };
        match list {
            HeaderList::Entries(entries) => {
                entries.iter().filter(|h| !h.disabled).cloned().collect()
            }
            HeaderList::Raw(block) => parse_header_block(block),
        }
    }

    pub fn raw_body(&self) -> Option<&str> {
        match self {
            RequestSpec::Detailed(def) => def.body.as_ref()?.raw.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_nested_requests_structurally() {
        // Two top-level items: a folder with three requests, and a request.
        let doc = r#"{
            "item": [
                { "name": "folder", "item": [
                    { "name": "a", "request": "https://example.com/a" },
                    { "name": "b", "request": "https://example.com/b" },
                    { "name": "c", "request": "https://example.com/c" }
                ]},
                { "name": "d", "request": { "method": "POST", "url": "https://example.com/d" } }
            ]
        }"#;
        let c = Collection::parse(doc).unwrap();
        assert_eq!(c.request_count(), 4);
    }

    #[test]
    fn counts_requests_at_three_levels() {
        let doc = r#"{
            "item": [
                { "name": "l1", "request": "http://x/1", "item": [
                    { "name": "l2", "request": "http://x/2", "item": [
                        { "name": "l3", "request": "http://x/3" }
                    ]}
                ]}
            ]
        }"#;
        let c = Collection::parse(doc).unwrap();
        assert_eq!(c.request_count(), 3);
        let names: Vec<_> = c.requests().iter().map(|r| r.label().to_string()).collect();
        assert_eq!(names, ["l1", "l2", "l3"]);
    }

    #[test]
    fn walk_preserves_document_order() {
        let doc = r#"{
            "item": [
                { "name": "f", "item": [ { "name": "one", "request": "http://x/1" } ] },
                { "name": "two", "request": "http://x/2" },
                { "name": "g", "item": [
                    { "name": "h", "item": [ { "name": "three", "request": "http://x/3" } ] }
                ]}
            ]
        }"#;
        let c = Collection::parse(doc).unwrap();
        let names: Vec<_> = c.requests().iter().map(|r| r.label().to_string()).collect();
        assert_eq!(names, ["one", "two", "three"]);
    }

    #[test]
    fn missing_and_null_item_lists_are_empty() {
        assert_eq!(Collection::parse("{}").unwrap().request_count(), 0);
        assert_eq!(
            Collection::parse(r#"{"item": null}"#).unwrap().request_count(),
            0
        );
        let c = Collection::parse(r#"{"item": [{"name": "x", "item": null}]}"#).unwrap();
        assert_eq!(c.request_count(), 0);
    }

    #[test]
    fn null_request_is_not_counted() {
        let c = Collection::parse(r#"{"item": [{"name": "x", "request": null}]}"#).unwrap();
        assert_eq!(c.request_count(), 0);
    }

    #[test]
    fn non_object_document_is_rejected() {
        assert!(Collection::parse("[1, 2]").is_err());
        assert!(Collection::parse("not json").is_err());
    }

    #[test]
    fn request_accessors_cover_both_shapes() {
        let doc = r#"{
            "item": [
                { "name": "short", "request": "https://example.com/short" },
                { "name": "full", "request": {
                    "method": "PUT",
                    "url": { "raw": "https://example.com/full", "host": ["example", "com"] },
                    "header": [
                        { "key": "X-On", "value": "1" },
                        { "key": "X-Off", "value": "0", "disabled": true }
                    ],
                    "body": { "mode": "raw", "raw": "{\"a\":1}" }
                }}
            ]
        }"#;
        let c = Collection::parse(doc).unwrap();
        let reqs = c.requests();
        assert_eq!(reqs[0].request.method(), "GET");
        assert_eq!(reqs[0].request.raw_url(), Some("https://example.com/short"));
        assert_eq!(reqs[1].request.method(), "PUT");
        assert_eq!(reqs[1].request.raw_url(), Some("https://example.com/full"));
        let headers: Vec<_> = reqs[1]
            .request
            .headers()
            .into_iter()
            .map(|h| h.key)
            .collect();
        assert_eq!(headers, ["X-On"]);
        assert_eq!(reqs[1].request.raw_body(), Some("{\"a\":1}"));
    }

    #[test]
    fn variables_skip_disabled_entries() {
        let doc = r#"{
            "variable": [
                { "key": "host", "value": "example.com" },
                { "key": "port", "value": 8080 },
                { "key": "off", "value": "x", "disabled": true }
            ]
        }"#;
        let vars = Collection::parse(doc).unwrap().variables();
        assert_eq!(vars.get("host").map(String::as_str), Some("example.com"));
        assert_eq!(vars.get("port").map(String::as_str), Some("8080"));
        assert!(!vars.contains_key("off"));
    }

    #[test]
    fn string_header_block_is_accepted() {
        let doc = r#"{"item": [
            {"name": "a", "request": {"method": "GET", "url": "http://x",
                "header": "Accept: */*\n// X-Off: 1\nX-Trace:  abc "}},
            {"name": "b", "request": "http://y"}
        ]}"#;
        let c = Collection::parse(doc).unwrap();
        assert_eq!(c.request_count(), 2);

        let headers = c.requests()[0].request.headers();
        let pairs: Vec<_> = headers
            .iter()
            .map(|h| (h.key.as_str(), h.value.as_str()))
            .collect();
        assert_eq!(pairs, [("Accept", "*/*"), ("X-Trace", "abc")]);
        assert_eq!(c.requests()[0].request.method(), "GET");
    }

    #[test]
    fn non_string_header_values_are_stringified() {
        let doc = r#"{"item": [{"name": "a", "request": {
            "url": "http://x",
            "header": [{"key": "n", "value": 5}, {"key": "flag", "value": true}, {"key": "none", "value": null}]
        }}]}"#;
        let c = Collection::parse(doc).unwrap();
        let headers = c.requests()[0].request.headers();
        let values: Vec<_> = headers.iter().map(|h| h.value.as_str()).collect();
        assert_eq!(values, ["5", "true", ""]);
    }

    #[test]
    fn unknown_request_shape_still_counts() {
        let doc = r#"{"item": [
            {"name": "odd", "request": 42},
            {"name": "weird", "request": {"method": ["GET"]}},
            {"name": "ok", "request": "http://x"}
        ]}"#;
        let c = Collection::parse(doc).unwrap();
        assert_eq!(c.request_count(), 3);
        let reqs = c.requests();
        assert!(!reqs[0].request.is_supported());
        assert!(!reqs[1].request.is_supported());
        assert!(reqs[2].request.is_supported());
        assert_eq!(reqs[0].request.raw_url(), None);
    }

    #[test]
    fn unnamed_request_uses_default_label() {
        let c = Collection::parse(r#"{"item": [{"request": "http://x"}]}"#).unwrap();
        assert_eq!(c.requests()[0].label(), "Request");
    }
}
