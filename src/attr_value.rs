use crate::edn_decode::{keyword_from_qualified, qualified_name, DecodingError};
use crate::error::EncodingError;
use crate::node_id::NodeId;
use chrono::{DateTime, FixedOffset};
use edn_format as edn;
use ordered_float::OrderedFloat;
use serde_derive::{Deserialize, Serialize};
use std::convert::TryFrom;
use uuid::Uuid;

/// A single attribute value carried by a node.
///
/// Values are totally ordered (variant first, then value) so that any
/// attribute can be used as a sort key for child queries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AttrValue {
    Boolean(bool),
    Long(i64),
    Double(OrderedFloat<f64>),
    String(String),
    Keyword(String),
    Instant(DateTime<FixedOffset>),
    Uuid(Uuid),
    Ref(NodeId),
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::String(s.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::String(s)
    }
}

impl From<i64> for AttrValue {
    fn from(l: i64) -> Self {
        AttrValue::Long(l)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Boolean(b)
    }
}

impl From<f64> for AttrValue {
    fn from(d: f64) -> Self {
        AttrValue::Double(OrderedFloat(d))
    }
}

fn ref_tag() -> edn::Symbol {
    edn::Symbol::from_namespace_and_name("nestedset", "ref")
}

impl TryFrom<AttrValue> for edn::Value {
    type Error = EncodingError;

    fn try_from(value: AttrValue) -> Result<edn::Value, EncodingError> {
        Ok(match value {
            AttrValue::Boolean(b) => edn::Value::Boolean(b),
            AttrValue::Long(l) => edn::Value::Integer(l),
            AttrValue::Double(d) => edn::Value::Float(d),
            AttrValue::String(s) => edn::Value::String(s),
            AttrValue::Keyword(k) => edn::Value::Keyword(keyword_from_qualified(&k)),
            AttrValue::Instant(inst) => edn::Value::Inst(inst),
            AttrValue::Uuid(uuid) => edn::Value::Uuid(uuid),
            AttrValue::Ref(id) => {
                let raw = i64::try_from(id.to_u64()).map_err(|_| EncodingError::RefOutOfRange(id))?;
                edn::Value::TaggedElement(ref_tag(), Box::new(edn::Value::Integer(raw)))
            }
        })
    }
}

impl TryFrom<&edn::Value> for AttrValue {
    type Error = DecodingError;

    fn try_from(value: &edn::Value) -> Result<Self, Self::Error> {
        match value {
            edn::Value::Boolean(b) => Ok(AttrValue::Boolean(*b)),
            edn::Value::Integer(i) => Ok(AttrValue::Long(*i)),
            edn::Value::Float(f) => Ok(AttrValue::Double(*f)),
            edn::Value::String(s) => Ok(AttrValue::String(s.clone())),
            edn::Value::Keyword(k) => Ok(AttrValue::Keyword(qualified_name(k))),
            edn::Value::Inst(inst) => Ok(AttrValue::Instant(*inst)),
            edn::Value::Uuid(uuid) => Ok(AttrValue::Uuid(*uuid)),
            edn::Value::TaggedElement(tag, element) if tag == &ref_tag() => match **element {
                edn::Value::Integer(i) if i >= 0 => Ok(AttrValue::Ref(NodeId::from_u64(i as u64))),
                _ => Err(DecodingError::expected("a non-negative node id", element)),
            },
            _ => Err(DecodingError::expected("an attribute value", value)),
        }
    }
}
