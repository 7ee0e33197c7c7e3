//! Tagged metric values.
//!
//! A metric that a source did not report is `Unknown`, never a silent zero.
//! Scoring and alerting match on the variant, so the "missing data contributes
//! the least" rule is enforced by the type rather than by convention.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric<T> {
    Known(T),
    Unknown,
}

impl<T> Default for Metric<T> {
    fn default() -> Self {
        Metric::Unknown
    }
}

impl<T> Metric<T> {
    #[must_use]
    pub fn is_known(&self) -> bool {
        matches!(self, Metric::Known(_))
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Metric::Unknown)
    }

    #[must_use]
    pub fn as_ref(&self) -> Metric<&T> {
        match self {
            Metric::Known(v) => Metric::Known(v),
            Metric::Unknown => Metric::Unknown,
        }
    }

    #[must_use]
    pub fn known(self) -> Option<T> {
        match self {
            Metric::Known(v) => Some(v),
            Metric::Unknown => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Metric<U> {
        match self {
            Metric::Known(v) => Metric::Known(f(v)),
            Metric::Unknown => Metric::Unknown,
        }
    }

    /// Returns the known value or `fallback`.
    pub fn value_or(self, fallback: T) -> T {
        match self {
            Metric::Known(v) => v,
            Metric::Unknown => fallback,
        }
    }
}

impl<T> From<Option<T>> for Metric<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Metric::Unknown, Metric::Known)
    }
}

impl<T> From<Metric<T>> for Option<T> {
    fn from(value: Metric<T>) -> Self {
        value.known()
    }
}

impl Metric<String> {
    /// Treats blank text as `Unknown`.
    #[must_use]
    pub fn non_blank(value: Option<String>) -> Self {
        match value {
            Some(s) if !s.trim().is_empty() => Metric::Known(s.trim().to_string()),
            _ => Metric::Unknown,
        }
    }
}

impl<T: Serialize> Serialize for Metric<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Metric::Known(v) => serializer.serialize_some(v),
            Metric::Unknown => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Metric<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Metric::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_conversion_keeps_variant() {
        assert_eq!(Metric::from(Some(3_u64)), Metric::Known(3));
        assert_eq!(Metric::<u64>::from(None), Metric::Unknown);
        assert_eq!(Option::from(Metric::Known(1.5_f64)), Some(1.5));
    }

    #[test]
    fn blank_keyword_is_unknown() {
        assert_eq!(Metric::non_blank(Some("   ".to_string())), Metric::Unknown);
        assert_eq!(Metric::non_blank(None), Metric::Unknown);
        assert_eq!(
            Metric::non_blank(Some(" ubuntu ssh ".to_string())),
            Metric::Known("ubuntu ssh".to_string())
        );
    }

    #[test]
    fn serializes_as_nullable_value() {
        let known = serde_json::to_string(&Metric::Known(42_u64)).unwrap();
        let unknown = serde_json::to_string(&Metric::<u64>::Unknown).unwrap();
        assert_eq!(known, "42");
        assert_eq!(unknown, "null");

        let back: Metric<u64> = serde_json::from_str("null").unwrap();
        assert!(back.is_unknown());
    }

    #[test]
    fn value_or_falls_back_only_for_unknown() {
        assert_eq!(Metric::Known(0_u64).value_or(9), 0);
        assert_eq!(Metric::<u64>::Unknown.value_or(9), 9);
    }
}
