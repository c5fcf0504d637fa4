use serde::{Deserialize, Serialize};
use std::fmt;

/// A single extractor output. Anything an extractor or group function returns is converted
/// into one of these, which keeps every group key hashable, comparable and serializable.
///
/// Every integer that fits in an `i64` becomes `Int`, whatever its Rust type, so a `usize`
/// extractor output matches a plain integer literal. `UInt` only holds values above `i64::MAX`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GroupValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Char(char),
    Text(String),
}

macro_rules! group_value_from {
    ($variant:ident: $($ty:ty),+) => {
        $(
            impl From<$ty> for GroupValue {
                fn from(value: $ty) -> Self {
                    GroupValue::$variant(value.into())
                }
            }
        )+
    };
}

group_value_from!(Bool: bool);
group_value_from!(Int: i8, i16, i32, i64, u8, u16, u32);
group_value_from!(Char: char);
group_value_from!(Text: String);

impl From<u64> for GroupValue {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(GroupValue::UInt(value), GroupValue::Int)
    }
}

impl From<usize> for GroupValue {
    fn from(value: usize) -> Self {
        GroupValue::from(value as u64)
    }
}

impl From<&str> for GroupValue {
    fn from(value: &str) -> Self {
        GroupValue::Text(value.to_string())
    }
}

impl From<&String> for GroupValue {
    fn from(value: &String) -> Self {
        GroupValue::Text(value.clone())
    }
}

impl From<()> for GroupValue {
    fn from(_: ()) -> Self {
        GroupValue::Null
    }
}

impl<T: Into<GroupValue>> From<Option<T>> for GroupValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(GroupValue::Null, Into::into)
    }
}

impl fmt::Display for GroupValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupValue::Null => f.write_str("null"),
            GroupValue::Bool(value) => write!(f, "{value}"),
            GroupValue::Int(value) => write!(f, "{value}"),
            GroupValue::UInt(value) => write!(f, "{value}"),
            GroupValue::Char(value) => write!(f, "{value:?}"),
            GroupValue::Text(value) => write!(f, "{value:?}"),
        }
    }
}

/// The key an element is filed under in an index: one [`GroupValue`] per extractor, or the
/// output of a custom group function.
///
/// Group keys are always lists. Converting a scalar produces a singleton list, so a lookup
/// `using: true` and a group function returning `true` both mean `[true]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey(Vec<GroupValue>);

impl GroupKey {
    pub fn new<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<GroupValue>,
    {
        values.into_iter().map(Into::into).collect()
    }

    pub fn single(value: impl Into<GroupValue>) -> Self {
        GroupKey(vec![value.into()])
    }

    pub fn values(&self) -> &[GroupValue] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<GroupValue> for GroupKey {
    fn from_iter<I: IntoIterator<Item = GroupValue>>(iter: I) -> Self {
        GroupKey(iter.into_iter().collect())
    }
}

macro_rules! group_key_from_scalar {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for GroupKey {
                fn from(value: $ty) -> Self {
                    GroupKey::single(value)
                }
            }
        )+
    };
}

group_key_from_scalar!(
    GroupValue, bool, i8, i16, i32, i64, u8, u16, u32, u64, usize, char, String, &String, ()
);

impl From<&str> for GroupKey {
    fn from(value: &str) -> Self {
        GroupKey::single(value)
    }
}

impl<T: Into<GroupValue>> From<Option<T>> for GroupKey {
    fn from(value: Option<T>) -> Self {
        GroupKey::single(value)
    }
}

impl<T: Into<GroupValue>> From<Vec<T>> for GroupKey {
    fn from(values: Vec<T>) -> Self {
        GroupKey::new(values)
    }
}

impl<T: Into<GroupValue>, const N: usize> From<[T; N]> for GroupKey {
    fn from(values: [T; N]) -> Self {
        GroupKey::new(values)
    }
}

impl From<&GroupKey> for GroupKey {
    fn from(key: &GroupKey) -> Self {
        key.clone()
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (position, value) in self.0.iter().enumerate() {
            if position > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str("]")
    }
}

/// Names of the extractors an index groups by, in order. A single name is a one-element
/// selector, so `"is_odd"` and `["is_odd"]` identify the same index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selector(Vec<String>);

impl Selector {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selector(names.into_iter().map(Into::into).collect())
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Selector {
    fn from(name: &str) -> Self {
        Selector(vec![name.to_string()])
    }
}

impl From<String> for Selector {
    fn from(name: String) -> Self {
        Selector(vec![name])
    }
}

impl From<&[&str]> for Selector {
    fn from(names: &[&str]) -> Self {
        Selector::new(names.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for Selector {
    fn from(names: [&str; N]) -> Self {
        Selector::new(names)
    }
}

impl From<Vec<&str>> for Selector {
    fn from(names: Vec<&str>) -> Self {
        Selector::new(names)
    }
}

impl From<Vec<String>> for Selector {
    fn from(names: Vec<String>) -> Self {
        Selector(names)
    }
}

impl From<&Selector> for Selector {
    fn from(selector: &Selector) -> Self {
        selector.clone()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_become_singleton_keys() {
        assert_eq!(GroupKey::from(true), GroupKey::new([true]));
        assert_eq!(GroupKey::from("mango"), GroupKey::new(["mango"]));
        assert_eq!(GroupKey::from(3).values(), &[GroupValue::Int(3)]);
    }

    #[test]
    fn integer_widths_share_a_representation() {
        assert_eq!(GroupValue::from(3_i32), GroupValue::from(3_i64));
        assert_eq!(GroupValue::from(3_u8), GroupValue::Int(3));
        assert_eq!(GroupValue::from(3_usize), GroupValue::from(3));
        assert_eq!(GroupValue::from(3_u64), GroupValue::Int(3));
        assert_eq!(GroupValue::from(u64::MAX), GroupValue::UInt(u64::MAX));
        assert_eq!(GroupKey::from(5_usize), GroupKey::from(5_i32));
    }

    #[test]
    fn options_map_none_to_null() {
        assert_eq!(GroupValue::from(None::<i64>), GroupValue::Null);
        assert_eq!(GroupValue::from(Some("x")), GroupValue::Text("x".into()));
    }

    #[test]
    fn selectors_normalize_single_names() {
        assert_eq!(Selector::from("is_odd"), Selector::from(["is_odd"]));
        assert_eq!(
            Selector::from(vec!["is_even".to_string(), "is_zero".to_string()]).to_string(),
            "[is_even, is_zero]"
        );
    }

    #[test]
    fn mixed_keys_display_in_order() {
        let key = GroupKey::new([GroupValue::from(3), "mango".into(), GroupValue::Null]);

        assert_eq!(key.to_string(), "[3, \"mango\", null]");
    }
}
