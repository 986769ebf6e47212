use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

/// A typed cell value.
///
/// `Number` holds an exact decimal, so equality is numeric: `19.00` and `19`
/// compare equal. `Absent` stands for an empty cell, or a money cell that
/// could not be parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Number(Decimal),
    Absent,
}

impl FieldValue {
    /// Identifier cells are kept byte-for-byte, empty or not.
    pub fn identifier(raw: &str) -> Self {
        Self::String(raw.to_string())
    }

    pub fn text(raw: &str) -> Self {
        if raw.is_empty() {
            Self::Absent
        } else {
            Self::String(raw.to_string())
        }
    }

    pub fn money(raw: &str) -> Self {
        match parse_money(raw) {
            Some(d) => Self::Number(d),
            None => Self::Absent,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Zero amount. Strings are read as money, like [`Self::same_as`].
    pub fn is_zero(&self) -> bool {
        self.as_number().is_some_and(|d| d.is_zero())
    }

    /// Numeric view of the value. Strings are read as money.
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Self::Number(d) => Some(*d),
            Self::String(s) => parse_money(s),
            Self::Absent => None,
        }
    }

    /// Value equality used for change detection.
    ///
    /// Numbers compare numerically. A string compared against a number is
    /// read as money first, so a text cell holding `"$19.00"` is the same
    /// value as `Number(19)`.
    pub fn same_as(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (Self::Absent, Self::Absent) => true,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Number(n), Self::String(s)) | (Self::String(s), Self::Number(n)) => {
                parse_money(s).is_some_and(|parsed| parsed == *n)
            }
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(d) => write!(f, "{d}"),
            Self::Absent => Ok(()),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::String(s) => serializer.serialize_str(s),
            Self::Number(d) => serializer.serialize_str(&d.to_string()),
            Self::Absent => serializer.serialize_none(),
        }
    }
}

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥'];

fn is_currency(c: &char) -> bool {
    CURRENCY_SYMBOLS.contains(c)
}

/// Parse a money string:
/// - Trim surrounding whitespace, strip currency symbols and
///   thousands-separator commas
/// - Whitespace inside the value is allowed only next to a currency symbol
///   (`$ 12.00`, `12.00 €`)
/// - Handle `(123.45)` → `-123.45`
/// - Returns None for empty input or if non-numeric characters remain
pub fn parse_money(s: &str) -> Option<Decimal> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (is_negative, inner) = if trimmed.starts_with('(') && trimmed.ends_with(')') {
        (true, trimmed[1..trimmed.len() - 1].trim())
    } else {
        (false, trimmed)
    };

    let chars: Vec<char> = inner.chars().collect();
    let mut cleaned = String::with_capacity(chars.len());
    for (i, c) in chars.iter().enumerate() {
        if is_currency(c) || *c == ',' {
            continue;
        }
        if c.is_whitespace() {
            let after_symbol = chars[..i]
                .iter()
                .rev()
                .find(|p| !p.is_whitespace())
                .is_some_and(is_currency);
            let before_symbol = chars[i + 1..]
                .iter()
                .find(|n| !n.is_whitespace())
                .is_some_and(is_currency);
            if after_symbol || before_symbol {
                continue;
            }
            return None;
        }
        cleaned.push(*c);
    }

    if cleaned.is_empty() {
        return None;
    }

    for (i, c) in cleaned.chars().enumerate() {
        match c {
            '0'..='9' | '.' => {}
            '-' | '+' if i == 0 && !is_negative => {}
            _ => return None,
        }
    }

    let value = Decimal::from_str(&cleaned).ok()?;
    Some(if is_negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn parse_money_basic() {
        assert_eq!(parse_money("123.45"), Some(dec("123.45")));
        assert_eq!(parse_money("-50"), Some(dec("-50")));
        assert_eq!(parse_money("0"), Some(Decimal::ZERO));
    }

    #[test]
    fn parse_money_currency_and_commas() {
        assert_eq!(parse_money("$685.00"), Some(dec("685.00")));
        assert_eq!(parse_money("$1,234.56"), Some(dec("1234.56")));
        assert_eq!(parse_money("-$5.00"), Some(dec("-5.00")));
        assert_eq!(parse_money("€ 12"), Some(dec("12")));
    }

    #[test]
    fn parse_money_parens() {
        assert_eq!(parse_money("(500.00)"), Some(dec("-500.00")));
        assert_eq!(parse_money("($1,234.56)"), Some(dec("-1234.56")));
    }

    #[test]
    fn parse_money_blank_and_garbage() {
        assert_eq!(parse_money(""), None);
        assert_eq!(parse_money("   "), None);
        assert_eq!(parse_money("$"), None);
        assert_eq!(parse_money("N/A"), None);
        assert_eq!(parse_money("12abc"), None);
        assert_eq!(parse_money("1.2.3"), None);
    }

    #[test]
    fn parse_money_inner_whitespace() {
        assert_eq!(parse_money("12 34"), None);
        assert_eq!(parse_money("1 234.00"), None);
        assert_eq!(parse_money("  12.50  "), Some(dec("12.50")));
        assert_eq!(parse_money("12.00 €"), Some(dec("12.00")));
        assert_eq!(parse_money("( $ 7.25 )"), Some(dec("-7.25")));
        assert!(FieldValue::money("12 34").is_absent());
    }

    #[test]
    fn money_keeps_scale_for_display() {
        assert_eq!(FieldValue::money("8.50").to_string(), "8.50");
        assert_eq!(FieldValue::money("$1,000").to_string(), "1000");
        assert_eq!(FieldValue::money("").to_string(), "");
    }

    #[test]
    fn numeric_equality_ignores_formatting() {
        assert_eq!(FieldValue::money("19.00"), FieldValue::money("19"));
        assert!(FieldValue::money("19.0").same_as(&FieldValue::money("$19")));
        assert!(!FieldValue::money("19.01").same_as(&FieldValue::money("19")));
    }

    #[test]
    fn same_as_across_string_and_number() {
        let text = FieldValue::String("$19.00".into());
        assert!(text.same_as(&FieldValue::Number(dec("19"))));
        assert!(FieldValue::Number(dec("19")).same_as(&text));
        assert!(!FieldValue::String("abc".into()).same_as(&FieldValue::Number(dec("1"))));
        assert!(!FieldValue::Absent.same_as(&FieldValue::Number(Decimal::ZERO)));
        assert!(FieldValue::Absent.same_as(&FieldValue::Absent));
    }

    #[test]
    fn identifier_is_verbatim() {
        assert_eq!(FieldValue::identifier("007A"), FieldValue::String("007A".into()));
        assert_eq!(FieldValue::identifier(" 00123 ").to_string(), " 00123 ");
        assert_eq!(FieldValue::identifier(""), FieldValue::String(String::new()));
    }

    #[test]
    fn text_empty_is_absent() {
        assert!(FieldValue::text("").is_absent());
        assert_eq!(FieldValue::text(" "), FieldValue::String(" ".into()));
    }

    #[test]
    fn zero_detection() {
        assert!(FieldValue::money("0.00").is_zero());
        assert!(FieldValue::money("$0").is_zero());
        assert!(!FieldValue::money("0.01").is_zero());
        assert!(FieldValue::String("0.00".into()).is_zero());
        assert!(FieldValue::String("$ 0".into()).is_zero());
        assert!(!FieldValue::String("n/a".into()).is_zero());
        assert!(!FieldValue::Absent.is_zero());
    }

    #[test]
    fn serializes_numbers_as_strings() {
        let json = serde_json::to_string(&vec![
            FieldValue::money("8.50"),
            FieldValue::Absent,
            FieldValue::identifier("007A"),
        ])
        .unwrap();
        assert_eq!(json, r#"["8.50",null,"007A"]"#);
    }
}
