use edn_format as edn;
use edn_format::Keyword;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
#[error("Could not decode EDN value: {0}")]
pub struct DecodingError(pub String);

impl DecodingError {
    pub fn expected(what: &str, value: &edn::Value) -> DecodingError {
        DecodingError(format!("expected {}, got {}", what, edn::emit_str(value)))
    }
}

pub trait Decoder<T> {
    fn decode(&self, value: &edn::Value) -> Result<T, DecodingError>;
}

impl<F, T> Decoder<T> for F
where
    F: Fn(&edn::Value) -> Result<T, DecodingError>,
{
    fn decode(&self, value: &edn::Value) -> Result<T, DecodingError> {
        self(value)
    }
}

pub fn keyword(value: &edn::Value) -> Result<&Keyword, DecodingError> {
    match value {
        edn::Value::Keyword(keyword) => Ok(keyword),
        _ => Err(DecodingError::expected("a keyword", value)),
    }
}

/// Keyword name with its namespace folded in as `ns/name`.
pub fn qualified_name(keyword: &Keyword) -> String {
    match keyword.namespace() {
        Some(ns) => format!("{}/{}", ns, keyword.name()),
        None => keyword.name().to_owned(),
    }
}

/// Inverse of [`qualified_name`].
pub fn keyword_from_qualified(name: &str) -> Keyword {
    match name.split_once('/') {
        Some((ns, name)) if !ns.is_empty() && !name.is_empty() => {
            Keyword::from_namespace_and_name(ns, name)
        }
        _ => Keyword::from_name(name),
    }
}

pub fn string(value: &edn::Value) -> Result<&str, DecodingError> {
    match value {
        edn::Value::String(s) => Ok(s),
        _ => Err(DecodingError::expected("a string", value)),
    }
}

pub fn integer(value: &edn::Value) -> Result<i64, DecodingError> {
    match value {
        edn::Value::Integer(i) => Ok(*i),
        _ => Err(DecodingError::expected("an integer", value)),
    }
}

pub fn non_negative(value: &edn::Value) -> Result<u64, DecodingError> {
    let i = integer(value)?;
    if i < 0 {
        Err(DecodingError::expected("a non-negative integer", value))
    } else {
        Ok(i as u64)
    }
}

/// `nil` decodes to `None`, anything else through `inner`.
pub fn nilable<T>(value: &edn::Value, inner: &dyn Decoder<T>) -> Result<Option<T>, DecodingError> {
    match value {
        edn::Value::Nil => Ok(None),
        other => inner.decode(other).map(Some),
    }
}

/// Decodes a map whose keys are all keywords, returning entries keyed by
/// their qualified names.
pub fn keyword_map(value: &edn::Value) -> Result<BTreeMap<String, &edn::Value>, DecodingError> {
    match value {
        edn::Value::Map(map) => {
            let mut entries = BTreeMap::new();
            for (k, v) in map {
                entries.insert(qualified_name(keyword(k)?), v);
            }
            Ok(entries)
        }
        _ => Err(DecodingError::expected("a map", value)),
    }
}

pub fn vector<T>(value: &edn::Value, value_decoder: &dyn Decoder<T>) -> Result<Vec<T>, DecodingError> {
    match value {
        edn::Value::Vector(vector) | edn::Value::List(vector) => {
            let mut values = Vec::with_capacity(vector.len());
            for value in vector {
                values.push(value_decoder.decode(value)?);
            }
            Ok(values)
        }
        _ => Err(DecodingError::expected("a vector", value)),
    }
}

pub fn one_of<T>(
    value: &edn::Value,
    decoder_a: &dyn Decoder<T>,
    decoder_b: &dyn Decoder<T>,
) -> Result<T, DecodingError> {
    match decoder_a.decode(value) {
        Ok(result) => Ok(result),
        Err(_) => decoder_b.decode(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_names() {
        assert_eq!(qualified_name(&Keyword::from_name("name")), "name");
        assert_eq!(
            qualified_name(&Keyword::from_namespace_and_name("node", "title")),
            "node/title"
        );
        assert_eq!(
            keyword_from_qualified("node/title"),
            Keyword::from_namespace_and_name("node", "title")
        );
        assert_eq!(keyword_from_qualified("/"), Keyword::from_name("/"));
    }

    #[test]
    fn test_nilable() {
        let decoder = |v: &edn::Value| integer(v);
        assert_eq!(nilable(&edn::Value::Nil, &decoder), Ok(None));
        assert_eq!(nilable(&edn::Value::Integer(3), &decoder), Ok(Some(3)));
        assert!(nilable(&edn::Value::Boolean(true), &decoder).is_err());
    }

    #[test]
    fn test_vector_and_one_of() {
        let value = edn::parse_str("[1 \"two\" 3]").unwrap();
        let as_int = |v: &edn::Value| integer(v).map(|i| i.to_string());
        let as_str = |v: &edn::Value| string(v).map(|s| s.to_owned());
        let either = |v: &edn::Value| one_of(v, &as_int, &as_str);
        assert_eq!(
            vector(&value, &either),
            Ok(vec!["1".to_owned(), "two".to_owned(), "3".to_owned()])
        );
        assert!(vector(&value, &as_int).is_err());
    }

    #[test]
    fn test_keyword_map() {
        let value = edn::parse_str("{:a 1 :x/b 2}").unwrap();
        let map = keyword_map(&value).unwrap();
        assert_eq!(map.get("a"), Some(&&edn::Value::Integer(1)));
        assert_eq!(map.get("x/b"), Some(&&edn::Value::Integer(2)));
        assert!(keyword_map(&edn::parse_str("{1 2}").unwrap()).is_err());
    }
}
