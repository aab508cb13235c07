use serde_json::{Map, Value};

/// Flat request parameter map. Query strings fold `key[]=a&key[]=b` into a sequence;
/// a repeated plain key keeps the last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParams(Map<String, Value>);

impl RequestParams {
    pub fn from_query(query: &str) -> Self {
        let mut map = Map::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = Value::String(value.into_owned());
            match key.find('[') {
                Some(idx) if key.ends_with(']') && idx > 0 => {
                    let base = key[..idx].to_string();
                    match map.get_mut(&base) {
                        Some(Value::Array(items)) => items.push(value),
                        _ => {
                            map.insert(base, Value::Array(vec![value]));
                        }
                    }
                }
                _ => {
                    map.insert(key.into_owned(), value);
                }
            }
        }
        Self(map)
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Present and not null, not "", not an empty sequence
    pub fn filled(&self, key: &str) -> Option<&Value> {
        self.get(key).filter(|v| !is_blank(v))
    }

    /// Scalar value of a present, non-blank parameter rendered as text
    pub fn str(&self, key: &str) -> Option<String> {
        self.filled(key).and_then(scalar_text)
    }

    /// A parameter read as a list: sequences are taken element-wise, strings are split on commas.
    /// Elements are trimmed and empties dropped.
    pub fn list(&self, key: &str) -> Option<Vec<String>> {
        self.filled(key).map(value_list)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.filled(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
            }
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

pub fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        _ => None,
    }
}

pub fn value_list(value: &Value) -> Vec<String> {
    let raw: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
        other => scalar_text(other)
            .map(|s| s.split(',').map(str::to_string).collect())
            .unwrap_or_default(),
    };
    raw.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bracket_keys_fold_into_sequences() {
        let params = RequestParams::from_query("group_by[]=status&group_by[]=city&name=ann");
        assert_eq!(params.get("group_by"), Some(&json!(["status", "city"])));
        assert_eq!(params.get("name"), Some(&json!("ann")));
    }

    #[test]
    fn repeated_plain_key_keeps_last() {
        let params = RequestParams::from_query("a=1&a=2");
        assert_eq!(params.get("a"), Some(&json!("2")));
    }

    #[test]
    fn percent_decoding_applies() {
        let params = RequestParams::from_query("search=john%20doe&x=a+b");
        assert_eq!(params.str("search").as_deref(), Some("john doe"));
        assert_eq!(params.str("x").as_deref(), Some("a b"));
    }

    #[test]
    fn blank_values() {
        let params = RequestParams::from_map(
            json!({ "a": "", "b": null, "c": [], "d": "0", "e": 0 }).as_object().unwrap().clone(),
        );
        assert!(params.filled("a").is_none());
        assert!(params.filled("b").is_none());
        assert!(params.filled("c").is_none());
        assert!(params.filled("d").is_some());
        assert!(params.filled("e").is_some());
        assert!(params.contains("a"));
    }

    #[test]
    fn lists_from_strings_and_sequences() {
        let params = RequestParams::from_map(
            json!({ "s": " a, b ,,c", "q": ["x", " y ", "", 3] }).as_object().unwrap().clone(),
        );
        assert_eq!(params.list("s").unwrap(), vec!["a", "b", "c"]);
        assert_eq!(params.list("q").unwrap(), vec!["x", "y", "3"]);
    }

    #[test]
    fn integers_from_text() {
        let params = RequestParams::from_query("limit=20&page=3.0&bad=abc");
        assert_eq!(params.int("limit"), Some(20));
        assert_eq!(params.int("page"), Some(3));
        assert_eq!(params.int("bad"), None);
        assert_eq!(params.int("missing"), None);
    }
}
