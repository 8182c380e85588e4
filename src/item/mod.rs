//! # Item Type System
//!
//! The heterogeneous value algebra every expression iterator streams:
//! atomic items, JSON-structured items (array/object), and function items.
//! Mirrors the teacher's `value::Value`/`Tuple` split — `Item` is the value,
//! a `Sequence` (`Vec<Item>`, never itself an item) is the stream unit.
//!
//! ## Usage
//!
//! ```rust
//! use jsoniq_core::item::{Item, ObjectItem};
//!
//! let obj = ObjectItem::try_from_pairs(vec![
//!     ("a".to_string(), Item::Integer(1)),
//!     ("b".to_string(), Item::Integer(2)),
//! ]).unwrap();
//! let item = Item::Object(obj);
//! assert!(item.is_object());
//! ```

pub mod duration;
pub mod ordering;

use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::ast::ExprNode;
use crate::context::DynamicContext;
use crate::error::{JResult, JsoniqError};
use duration::DurationValue;

pub type Sequence = Vec<Item>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryEncoding {
    Hex,
    Base64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryItem {
    pub encoding: BinaryEncoding,
    pub bytes: Vec<u8>,
}

/// An object's keys are unique and insertion-ordered; a plain `Vec` avoids
/// pulling in an ordered-map dependency the teacher's own stack has no use
/// for elsewhere.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectItem {
    entries: Vec<(String, Item)>,
}

impl ObjectItem {
    pub fn new() -> Self {
        ObjectItem { entries: Vec::new() }
    }

    pub fn try_from_pairs(pairs: Vec<(String, Item)>) -> JResult<Self> {
        let mut obj = ObjectItem::new();
        for (k, v) in pairs {
            obj.insert(k, v)?;
        }
        Ok(obj)
    }

    /// Fails if `key` is already present — object construction must reject
    /// duplicate keys (§3).
    pub fn insert(&mut self, key: String, value: Item) -> JResult<()> {
        if self.entries.iter().any(|(k, _)| k == &key) {
            return Err(JsoniqError::dynamic(format!(
                "duplicate object key '{key}' during construction"
            )));
        }
        self.entries.push((key, value));
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Item> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Item> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(String, Item)] {
        &self.entries
    }
}

/// A function item's closure: captured environment, formal parameters, and
/// body AST (§3). Two function items are never equal by value, so identity
/// is tracked with a generated id purely for debugging/tracing.
#[derive(Clone)]
pub struct FunctionItem {
    pub id: uuid::Uuid,
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Arc<ExprNode>,
    pub closure: Arc<DynamicContext>,
}

impl PartialEq for FunctionItem {
    fn eq(&self, _other: &Self) -> bool {
        false
    }
}

impl std::fmt::Debug for FunctionItem {
    /// Prints id/name/params only — the closure's captured context isn't
    /// meaningfully printable and isn't needed for tracing identity.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionItem")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Null,
    Boolean,
    String,
    Integer,
    Decimal,
    Double,
    Duration,
    DateTime,
    Date,
    Time,
    Binary,
    Array,
    Object,
    Function,
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TypeTag::Null => "null",
            TypeTag::Boolean => "boolean",
            TypeTag::String => "string",
            TypeTag::Integer => "integer",
            TypeTag::Decimal => "decimal",
            TypeTag::Double => "double",
            TypeTag::Duration => "duration",
            TypeTag::DateTime => "dateTime",
            TypeTag::Date => "date",
            TypeTag::Time => "time",
            TypeTag::Binary => "binary",
            TypeTag::Array => "array",
            TypeTag::Object => "object",
            TypeTag::Function => "function",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Null,
    Boolean(bool),
    String(String),
    Integer(i64),
    Decimal(Decimal),
    Double(f64),
    Duration(DurationValue),
    DateTime(chrono::DateTime<chrono::FixedOffset>),
    Date(chrono::NaiveDate),
    Time(chrono::NaiveTime),
    Binary(BinaryItem),
    Array(Vec<Item>),
    Object(ObjectItem),
    Function(FunctionItem),
}

impl Item {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Item::Null => TypeTag::Null,
            Item::Boolean(_) => TypeTag::Boolean,
            Item::String(_) => TypeTag::String,
            Item::Integer(_) => TypeTag::Integer,
            Item::Decimal(_) => TypeTag::Decimal,
            Item::Double(_) => TypeTag::Double,
            Item::Duration(_) => TypeTag::Duration,
            Item::DateTime(_) => TypeTag::DateTime,
            Item::Date(_) => TypeTag::Date,
            Item::Time(_) => TypeTag::Time,
            Item::Binary(_) => TypeTag::Binary,
            Item::Array(_) => TypeTag::Array,
            Item::Object(_) => TypeTag::Object,
            Item::Function(_) => TypeTag::Function,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Item::Null)
    }

    pub fn is_atomic(&self) -> bool {
        !matches!(self, Item::Array(_) | Item::Object(_) | Item::Function(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Item::Integer(_) | Item::Decimal(_) | Item::Double(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Item::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Item::Object(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Item::Function(_))
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Item::Array(_) | Item::Object(_))
    }

    /// JSONiq effective boolean value for a *singleton* item (§4.3 Where).
    pub fn effective_boolean_value(&self) -> JResult<bool> {
        match self {
            Item::Boolean(b) => Ok(*b),
            Item::Integer(n) => Ok(*n != 0),
            Item::Double(d) => Ok(*d != 0.0 && !d.is_nan()),
            Item::Decimal(d) => Ok(!d.is_zero()),
            Item::String(s) => Ok(!s.is_empty()),
            // Any other single item (array/object/function/temporal/binary)
            // is true, per §4.3's "any other single node is true".
            other => Ok(!matches!(other, Item::Null)),
        }
    }
}

/// Effective boolean value of a whole sequence (§4.3 Where, §4.5 Logical).
///
/// - empty sequence is false
/// - a single boolean is itself
/// - a single numeric is true iff nonzero and non-NaN
/// - a single string is true iff nonempty
/// - any other single item is true
/// - any other multi-item sequence is an error
pub fn sequence_effective_boolean_value(seq: &[Item]) -> JResult<bool> {
    match seq {
        [] => Ok(false),
        [single] => single.effective_boolean_value(),
        _ => Err(JsoniqError::dynamic(
            "effective boolean value is undefined for a sequence of more than one item unless all items are nodes",
        )),
    }
}

/// The numeric promotion lattice: integer ≤ decimal ≤ double (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NumericRank {
    Integer,
    Decimal,
    Double,
}

#[derive(Debug, Clone, Copy)]
pub enum PromotedNumeric {
    Integer(i64),
    Decimal(Decimal),
    Double(f64),
}

fn numeric_rank(item: &Item) -> Option<NumericRank> {
    match item {
        Item::Integer(_) => Some(NumericRank::Integer),
        Item::Decimal(_) => Some(NumericRank::Decimal),
        Item::Double(_) => Some(NumericRank::Double),
        _ => None,
    }
}

/// Promotes two numeric items to their least upper bound on the lattice.
pub fn promote_pair(a: &Item, b: &Item) -> JResult<(PromotedNumeric, PromotedNumeric)> {
    let ra = numeric_rank(a).ok_or_else(|| JsoniqError::unexpected_type("numeric", a.type_tag().to_string()))?;
    let rb = numeric_rank(b).ok_or_else(|| JsoniqError::unexpected_type("numeric", b.type_tag().to_string()))?;
    let target = ra.max(rb);
    Ok((promote_to(a, target)?, promote_to(b, target)?))
}

fn promote_to(item: &Item, target: NumericRank) -> JResult<PromotedNumeric> {
    match (item, target) {
        (Item::Integer(n), NumericRank::Integer) => Ok(PromotedNumeric::Integer(*n)),
        (Item::Integer(n), NumericRank::Decimal) => Ok(PromotedNumeric::Decimal(Decimal::from(*n))),
        (Item::Integer(n), NumericRank::Double) => Ok(PromotedNumeric::Double(*n as f64)),
        (Item::Decimal(d), NumericRank::Decimal) => Ok(PromotedNumeric::Decimal(*d)),
        (Item::Decimal(d), NumericRank::Double) => Ok(PromotedNumeric::Double(
            d.to_string().parse::<f64>().unwrap_or(f64::NAN),
        )),
        (Item::Double(d), NumericRank::Double) => Ok(PromotedNumeric::Double(*d)),
        _ => Err(JsoniqError::type_error("cannot demote a numeric item to a lower lattice rank")),
    }
}

/// Compares two promoted numerics of the *same* rank (`promote_pair`
/// guarantees this).
pub fn compare_promoted(a: PromotedNumeric, b: PromotedNumeric) -> CmpOrdering {
    match (a, b) {
        (PromotedNumeric::Integer(x), PromotedNumeric::Integer(y)) => x.cmp(&y),
        (PromotedNumeric::Decimal(x), PromotedNumeric::Decimal(y)) => x.cmp(&y),
        (PromotedNumeric::Double(x), PromotedNumeric::Double(y)) => {
            x.partial_cmp(&y).unwrap_or(CmpOrdering::Equal)
        }
        _ => unreachable!("promote_pair always yields matching ranks"),
    }
}

/// Item equality per §3: numeric promotion, codepoint string order,
/// duration-family comparison, and cross-type equality is always `false`
/// except within the numeric/duration families (where it can also error).
pub fn items_equal(a: &Item, b: &Item) -> JResult<bool> {
    if a.is_numeric() && b.is_numeric() {
        let (pa, pb) = promote_pair(a, b)?;
        return Ok(compare_promoted(pa, pb) == CmpOrdering::Equal);
    }
    match (a, b) {
        (Item::Duration(x), Item::Duration(y)) => Ok(x.compare(y)? == CmpOrdering::Equal),
        (Item::Binary(_), Item::Binary(_)) => {
            Err(JsoniqError::type_error("binary items are not orderable/comparable"))
        }
        (Item::Array(_), _) | (Item::Object(_), _) | (Item::Function(_), _) => {
            Err(JsoniqError::type_error("cannot compare structured or function items for value equality"))
        }
        _ => Ok(a == b),
    }
}

impl Serialize for Item {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        match self {
            Item::Null => serializer.serialize_none(),
            Item::Boolean(b) => serializer.serialize_bool(*b),
            Item::String(s) => serializer.serialize_str(s),
            Item::Integer(n) => serializer.serialize_i64(*n),
            Item::Decimal(d) => serializer.serialize_str(&d.to_string()),
            Item::Double(d) => serializer.serialize_f64(*d),
            Item::Duration(d) => serializer.serialize_str(&format!("{}M{}ms", d.months, d.millis)),
            Item::DateTime(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            Item::Date(d) => serializer.serialize_str(&d.to_string()),
            Item::Time(t) => serializer.serialize_str(&t.to_string()),
            Item::Binary(b) => serializer.serialize_str(&hex::encode(&b.bytes)),
            Item::Array(items) => items.serialize(serializer),
            Item::Object(obj) => {
                let mut map = serializer.serialize_map(Some(obj.len()))?;
                for (k, v) in obj.entries() {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Item::Function(_) => Err(serde::ser::Error::custom("function items cannot be serialized")),
        }
    }
}

/// The inverse of `Serialize` for the JSON-native subset (§8 "parse ∘
/// serialize = identity"): null, boolean, numbers, strings, arrays, and
/// objects round-trip exactly. Decimal/duration/dateTime/date/time/binary
/// items serialize to plain strings with no type tag to recover from, so
/// they are not invertible through bare JSON and are out of scope here —
/// a lossless wire format for those would need a tagged envelope this
/// module doesn't impose on ordinary JSON output.
impl TryFrom<serde_json::Value> for Item {
    type Error = JsoniqError;

    fn try_from(value: serde_json::Value) -> JResult<Item> {
        match value {
            serde_json::Value::Null => Ok(Item::Null),
            serde_json::Value::Bool(b) => Ok(Item::Boolean(b)),
            serde_json::Value::String(s) => Ok(Item::String(s)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Item::Integer(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Item::Double(f))
                } else {
                    Err(JsoniqError::dynamic(format!("number '{n}' is out of range for this item model")))
                }
            }
            serde_json::Value::Array(items) => {
                let converted = items.into_iter().map(Item::try_from).collect::<JResult<Vec<_>>>()?;
                Ok(Item::Array(converted))
            }
            serde_json::Value::Object(map) => {
                let pairs = map
                    .into_iter()
                    .map(|(k, v)| Ok((k, Item::try_from(v)?)))
                    .collect::<JResult<Vec<_>>>()?;
                Ok(Item::Object(ObjectItem::try_from_pairs(pairs)?))
            }
        }
    }
}

/// Minimal hex codec so `Item`'s `Serialize` impl doesn't need a dedicated
/// crate for the one binary-item code path.
mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        let mut s = String::with_capacity(bytes.len() * 2);
        for b in bytes {
            s.push_str(&format!("{b:02x}"));
        }
        s
    }
}
