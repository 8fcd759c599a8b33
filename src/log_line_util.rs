use crate::error::{MergeError, MergeResult};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Ordering key pulled out of a record. Integers and floats compare with each
/// other numerically, strings compare bytewise. Numbers and strings have no
/// order between them.
#[derive(Debug, Clone, PartialEq)]
pub enum Timestamp {
    Int(i128),
    Float(f64),
    Text(String),
}

impl Timestamp {
    fn from_value(value: &Value) -> Result<Timestamp, String> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Timestamp::Int(i as i128))
                } else if let Some(u) = n.as_u64() {
                    Ok(Timestamp::Int(u as i128))
                } else if let Some(f) = n.as_f64() {
                    Ok(Timestamp::Float(f))
                } else {
                    Err(format!("unsupported numeric {} {}", TIMESTAMP_FIELD, n))
                }
            }
            Value::String(s) => Ok(Timestamp::Text(s.clone())),
            Value::Null => Err(format!("{} is null", TIMESTAMP_FIELD)),
            other => Err(format!(
                "{} must be a number or a string, got {}",
                TIMESTAMP_FIELD, other
            )),
        }
    }

    /// `None` when the two keys are of incomparable kinds.
    pub fn compare(&self, other: &Timestamp) -> Option<Ordering> {
        match (self, other) {
            (Timestamp::Int(a), Timestamp::Int(b)) => Some(a.cmp(b)),
            (Timestamp::Float(a), Timestamp::Float(b)) => a.partial_cmp(b),
            (Timestamp::Int(a), Timestamp::Float(b)) => compare_int_float(*a, *b),
            (Timestamp::Float(a), Timestamp::Int(b)) => compare_int_float(*b, *a).map(Ordering::reverse),
            (Timestamp::Text(a), Timestamp::Text(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            _ => None,
        }
    }
}

/// Exact ordering of an integer against a float, without rounding the integer
/// to f64 (which is lossy above 2^53).
fn compare_int_float(int: i128, float: f64) -> Option<Ordering> {
    if float.is_nan() {
        return None;
    }
    // i128::MIN as f64 is exactly -2^127, i128::MAX as f64 rounds up to 2^127
    if float >= i128::MAX as f64 {
        return Some(Ordering::Less);
    }
    if float < i128::MIN as f64 {
        return Some(Ordering::Greater);
    }
    let floor = float.floor();
    match int.cmp(&(floor as i128)) {
        Ordering::Equal if float > floor => Some(Ordering::Less),
        ordering => Some(ordering),
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Int(i) => write!(f, "{}", i),
            Timestamp::Float(x) => write!(f, "{}", x),
            Timestamp::Text(s) => write!(f, "{:?}", s),
        }
    }
}

/// One record: the raw text exactly as read, plus its parsed timestamp.
#[derive(Debug, Clone)]
pub struct LogLine {
    raw: String,
    timestamp: Timestamp,
    line_number: usize,
}

impl LogLine {
    pub fn parse(raw: String, source_name: &str, line_number: usize) -> MergeResult<LogLine> {
        let value: Value = serde_json::from_str(&raw)
            .map_err(|e| MergeError::parse(source_name, line_number, format!("malformed record: {}", e)))?;
        let object = value.as_object().ok_or_else(|| {
            MergeError::parse(source_name, line_number, "record is not a JSON object")
        })?;
        let field = object.get(TIMESTAMP_FIELD).ok_or_else(|| {
            MergeError::parse(
                source_name,
                line_number,
                format!("record has no {} field", TIMESTAMP_FIELD),
            )
        })?;
        let timestamp = Timestamp::from_value(field)
            .map_err(|reason| MergeError::parse(source_name, line_number, reason))?;
        Ok(LogLine {
            raw,
            timestamp,
            line_number,
        })
    }

    pub fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.raw.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use crate::log_line_util::{LogLine, Timestamp};
    use ::function_name::named;
    use std::cmp::Ordering;

    #[test]
    #[named]
    fn parse_integer_timestamp() {
        let line = LogLine::parse("{\"timestamp\":42,\"msg\":\"x\"}\n".to_string(), "a.jsonl", 1).unwrap();
        assert!(line.timestamp() == &Timestamp::Int(42), "{} failed", function_name!());
        assert!(
            line.as_str() == "{\"timestamp\":42,\"msg\":\"x\"}\n",
            "{} failed",
            function_name!()
        );
    }

    #[test]
    #[named]
    fn parse_keeps_crlf_verbatim() {
        let raw = "{\"msg\":\"x\", \"timestamp\":\"2021-01-01 00:00:00\"}\r\n".to_string();
        let line = LogLine::parse(raw.clone(), "a.jsonl", 3).unwrap();
        assert!(line.as_str() == raw, "{} failed", function_name!());
        assert!(line.line_number() == 3, "{} failed", function_name!());
        assert!(
            line.timestamp() == &Timestamp::Text("2021-01-01 00:00:00".to_string()),
            "{} failed",
            function_name!()
        );
    }

    #[test]
    #[named]
    fn malformed_line_is_parse_error() {
        let err = LogLine::parse("not-json\n".to_string(), "b.jsonl", 7).unwrap_err();
        assert!(err.is_parse(), "{} failed", function_name!());
        assert!(err.to_string().starts_with("b.jsonl:7:"), "{} failed", function_name!());
    }

    #[test]
    #[named]
    fn empty_line_is_parse_error() {
        let err = LogLine::parse("\n".to_string(), "b.jsonl", 2).unwrap_err();
        assert!(err.is_parse(), "{} failed", function_name!());
    }

    #[test]
    #[named]
    fn missing_timestamp_is_parse_error() {
        let err = LogLine::parse("{\"msg\":\"no time\"}\n".to_string(), "a.jsonl", 4).unwrap_err();
        assert!(err.is_parse(), "{} failed", function_name!());
        assert!(err.to_string().contains("no timestamp field"), "{} failed", function_name!());
    }

    #[test]
    #[named]
    fn null_and_bool_timestamps_are_rejected() {
        assert!(
            LogLine::parse("{\"timestamp\":null}".to_string(), "a", 1).unwrap_err().is_parse(),
            "{} failed",
            function_name!()
        );
        assert!(
            LogLine::parse("{\"timestamp\":true}".to_string(), "a", 1).unwrap_err().is_parse(),
            "{} failed",
            function_name!()
        );
    }

    #[test]
    #[named]
    fn non_object_record_is_rejected() {
        let err = LogLine::parse("[1, 2, 3]\n".to_string(), "a", 1).unwrap_err();
        assert!(err.to_string().contains("not a JSON object"), "{} failed", function_name!());
    }

    #[test]
    #[named]
    fn mixed_numeric_kinds_compare_numerically() {
        let int = Timestamp::Int(2);
        let float = Timestamp::Float(1.5);
        assert!(int.compare(&float) == Some(Ordering::Greater), "{} failed", function_name!());
        assert!(float.compare(&int) == Some(Ordering::Less), "{} failed", function_name!());
        assert!(
            Timestamp::Int(3).compare(&Timestamp::Float(3.0)) == Some(Ordering::Equal),
            "{} failed",
            function_name!()
        );
    }

    #[test]
    #[named]
    fn number_and_text_are_incomparable() {
        let n = Timestamp::Int(1);
        let s = Timestamp::Text("1".to_string());
        assert!(n.compare(&s).is_none(), "{} failed", function_name!());
        assert!(s.compare(&n).is_none(), "{} failed", function_name!());
    }

    #[test]
    #[named]
    fn integer_against_float_is_exact_above_2_pow_53() {
        let int = Timestamp::Int(9_007_199_254_740_993);
        let float = Timestamp::Float(9_007_199_254_740_992.0);
        assert!(int.compare(&float) == Some(Ordering::Greater), "{} failed", function_name!());
        assert!(float.compare(&int) == Some(Ordering::Less), "{} failed", function_name!());
        assert!(
            Timestamp::Int(9_007_199_254_740_992).compare(&float) == Some(Ordering::Equal),
            "{} failed",
            function_name!()
        );
    }

    #[test]
    #[named]
    fn integer_against_fractional_float() {
        assert!(
            Timestamp::Int(-2).compare(&Timestamp::Float(-1.5)) == Some(Ordering::Less),
            "{} failed",
            function_name!()
        );
        assert!(
            Timestamp::Int(-1).compare(&Timestamp::Float(-1.5)) == Some(Ordering::Greater),
            "{} failed",
            function_name!()
        );
        assert!(
            Timestamp::Int(i128::MAX).compare(&Timestamp::Float(1e40)) == Some(Ordering::Less),
            "{} failed",
            function_name!()
        );
        assert!(
            Timestamp::Int(i128::MIN).compare(&Timestamp::Float(-1e40)) == Some(Ordering::Greater),
            "{} failed",
            function_name!()
        );
    }

    #[test]
    #[named]
    fn large_unsigned_timestamp_is_integer() {
        let line = LogLine::parse("{\"timestamp\":18446744073709551615}".to_string(), "a", 1).unwrap();
        assert!(
            line.timestamp() == &Timestamp::Int(u64::MAX as i128),
            "{} failed",
            function_name!()
        );
    }
}
