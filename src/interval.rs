//! Numeric intervals, comparisons and piecewise-linear interpolation.
//!
//! Definitions write intervals as strings (`"min~max"`, `"~max"`, `"min~"`),
//! bare numbers, or `{ min, max }` tables. They are parsed once at load time
//! into [`Interval`]; the original text is kept for diagnostics only.

use serde::{Deserialize, Serialize};

/// A closed numeric interval. Bounds may be infinite.
///
/// Bounds are stored as written: a score interval `"10~0"` interpolates
/// downwards. Containment always uses the ordered bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub lo: f64,
    pub hi: f64,
}

impl Interval {
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    /// A single-point interval.
    pub fn point(v: f64) -> Self {
        Self { lo: v, hi: v }
    }

    /// The unbounded interval.
    pub fn any() -> Self {
        Self {
            lo: f64::NEG_INFINITY,
            hi: f64::INFINITY,
        }
    }

    pub fn min(&self) -> f64 {
        self.lo.min(self.hi)
    }

    pub fn max(&self) -> f64 {
        self.lo.max(self.hi)
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.min() && v <= self.max()
    }

    /// Single-point or unbounded: interpolation yields a constant.
    pub fn is_degenerate(&self) -> bool {
        let (lo, hi) = (self.min(), self.max());
        !lo.is_finite() || !hi.is_finite() || (hi - lo).abs() < f64::EPSILON
    }

    /// Parse `"min~max"`, `"~max"`, `"min~"` or a bare number.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some((left, right)) = text.split_once('~') {
            let lo = parse_bound(left, f64::NEG_INFINITY)?;
            let hi = parse_bound(right, f64::INFINITY)?;
            Some(Self { lo, hi })
        } else {
            text.parse::<f64>().ok().filter(|v| !v.is_nan()).map(Self::point)
        }
    }

    /// Build from the raw definition form.
    pub fn from_repr(repr: &IntervalRepr) -> Option<Self> {
        match repr {
            IntervalRepr::Number(v) if !v.is_nan() => Some(Self::point(*v)),
            IntervalRepr::Number(_) => None,
            IntervalRepr::Text(text) => Self::parse(text),
            IntervalRepr::Table { min, max } => Some(Self {
                lo: min.unwrap_or(f64::NEG_INFINITY),
                hi: max.unwrap_or(f64::INFINITY),
            }),
        }
    }
}

fn parse_bound(s: &str, open: f64) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return Some(open);
    }
    s.parse::<f64>().ok().filter(|v| !v.is_nan())
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.lo == self.hi {
            return write!(f, "{}", self.lo);
        }
        if self.lo.is_finite() {
            write!(f, "{}", self.lo)?;
        }
        f.write_str("~")?;
        if self.hi.is_finite() {
            write!(f, "{}", self.hi)?;
        }
        Ok(())
    }
}

/// How an interval may be written in a definition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntervalRepr {
    Number(f64),
    Text(String),
    Table { min: Option<f64>, max: Option<f64> },
}

impl std::fmt::Display for IntervalRepr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(t) => f.write_str(t),
            Self::Table { min, max } => write!(f, "{{ min = {min:?}, max = {max:?} }}"),
        }
    }
}

/// Map `value` from `validity` onto `score` linearly.
///
/// Values outside `validity` clamp to the nearest score bound. A degenerate
/// validity interval (single point or unbounded) yields `score.lo`.
pub fn interpolate(validity: &Interval, score: &Interval, value: f64) -> f64 {
    if validity.is_degenerate() || value.is_nan() {
        return score.lo;
    }
    let (lo, hi) = (validity.min(), validity.max());
    let t = ((value - lo) / (hi - lo)).clamp(0.0, 1.0);
    score.lo + t * (score.hi - score.lo)
}

// ---------------------------------------------------------------------------
// Comparisons
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Ge,
    Le,
    Gt,
    Lt,
    Eq,
    Ne,
}

impl CmpOp {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            ">=" => Some(Self::Ge),
            "<=" => Some(Self::Le),
            ">" => Some(Self::Gt),
            "<" => Some(Self::Lt),
            "==" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            _ => None,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }
}

/// A numeric predicate from a filter tag or comparison string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Comparison {
    Cmp { op: CmpOp, value: f64 },
    InRange(Interval),
    /// Could not be parsed. Passes every value.
    Unparsed(String),
}

impl Comparison {
    /// Build from an operator and right-hand side, e.g. (`">="`, `"0.5"`).
    ///
    /// `"="` takes an interval on the right (`"=1~2"`).
    pub fn from_parts(op: &str, rhs: &str) -> Self {
        if op == "=" {
            return match Interval::parse(rhs) {
                Some(interval) => Self::InRange(interval),
                None => Self::Unparsed(format!("{op}{rhs}")),
            };
        }
        match (CmpOp::parse(op), rhs.trim().parse::<f64>()) {
            (Some(op), Ok(value)) if !value.is_nan() => Self::Cmp { op, value },
            _ => Self::Unparsed(format!("{op}{rhs}")),
        }
    }

    /// Parse a standalone expression: `">=0.5"`, `"<3"`, `"1.0~2.0"`, `"4"`.
    pub fn parse(expr: &str) -> Self {
        let expr = expr.trim();
        for op in [">=", "<=", "==", "!=", ">", "<", "="] {
            if let Some(rhs) = expr.strip_prefix(op) {
                return Self::from_parts(op, rhs);
            }
        }
        match Interval::parse(expr) {
            Some(interval) => Self::InRange(interval),
            None => Self::Unparsed(expr.to_string()),
        }
    }

    pub fn is_parsed(&self) -> bool {
        !matches!(self, Self::Unparsed(_))
    }

    pub fn passes(&self, v: f64) -> bool {
        match self {
            Self::Cmp { op, value } => match op {
                CmpOp::Ge => v >= *value,
                CmpOp::Le => v <= *value,
                CmpOp::Gt => v > *value,
                CmpOp::Lt => v < *value,
                CmpOp::Eq => (v - value).abs() < f64::EPSILON,
                CmpOp::Ne => (v - value).abs() >= f64::EPSILON,
            },
            Self::InRange(interval) => interval.contains(v),
            Self::Unparsed(_) => true,
        }
    }
}

impl std::fmt::Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cmp { op, value } => write!(f, "{}{value}", op.symbol()),
            Self::InRange(interval) => write!(f, "={interval}"),
            Self::Unparsed(text) => f.write_str(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_interval_forms() {
        assert_eq!(Interval::parse("1~2"), Some(Interval::new(1.0, 2.0)));
        assert_eq!(Interval::parse(" 0.5 ~ 3 "), Some(Interval::new(0.5, 3.0)));
        assert_eq!(Interval::parse("5"), Some(Interval::point(5.0)));
        let open_low = Interval::parse("~10").unwrap();
        assert!(open_low.lo.is_infinite() && open_low.hi == 10.0);
        let open_high = Interval::parse("3~").unwrap();
        assert!(open_high.lo == 3.0 && open_high.hi.is_infinite());
        assert_eq!(Interval::parse("a~b"), None);
        assert_eq!(Interval::parse(""), None);
    }

    #[test]
    fn interval_from_table_repr() {
        let repr = IntervalRepr::Table {
            min: Some(1.0),
            max: None,
        };
        let i = Interval::from_repr(&repr).unwrap();
        assert!(i.contains(1.0) && i.contains(1e9) && !i.contains(0.9));
    }

    #[test]
    fn descending_interval_contains_by_ordered_bounds() {
        let i = Interval::new(10.0, 0.0);
        assert!(i.contains(5.0));
        assert!(!i.contains(11.0));
    }

    #[test]
    fn interpolation_cases() {
        let validity = Interval::new(1.0, 2.0);
        let score = Interval::new(10.0, 20.0);
        assert_eq!(interpolate(&validity, &score, 1.0), 10.0);
        assert_eq!(interpolate(&validity, &score, 1.5), 15.0);
        assert_eq!(interpolate(&validity, &score, 2.0), 20.0);
        assert_eq!(interpolate(&validity, &score, 5.0), 20.0);
        assert_eq!(interpolate(&validity, &score, -3.0), 10.0);
    }

    #[test]
    fn interpolation_descending_score() {
        let validity = Interval::new(0.0, 10.0);
        let score = Interval::new(10.0, 0.0);
        assert_eq!(interpolate(&validity, &score, 0.0), 10.0);
        assert_eq!(interpolate(&validity, &score, 2.5), 7.5);
        assert_eq!(interpolate(&validity, &score, 10.0), 0.0);
    }

    #[test]
    fn degenerate_validity_returns_constant() {
        let score = Interval::new(4.0, 8.0);
        assert_eq!(interpolate(&Interval::point(3.0), &score, 3.0), 4.0);
        assert_eq!(interpolate(&Interval::parse("5~").unwrap(), &score, 100.0), 4.0);
        assert_eq!(interpolate(&Interval::new(0.0, 1.0), &score, f64::NAN), 4.0);
    }

    #[test]
    fn comparison_parse_and_pass() {
        assert!(Comparison::parse(">=0.5").passes(0.5));
        assert!(!Comparison::parse(">=0.5").passes(0.4));
        assert!(Comparison::parse("<3").passes(2.9));
        assert!(Comparison::parse("!=1").passes(2.0));
        assert!(Comparison::parse("==1").passes(1.0));
        assert!(Comparison::parse("1.0~2.0").passes(1.5));
        assert!(!Comparison::parse("1.0~2.0").passes(2.5));
        assert!(Comparison::parse("=1~2").passes(2.0));
    }

    #[test]
    fn unparsable_comparison_passes_everything() {
        let c = Comparison::parse(">=lots");
        assert!(!c.is_parsed());
        assert!(c.passes(-1e9));
        assert!(c.passes(0.0));
        assert!(Comparison::parse("whatever").passes(3.0));
    }

    #[test]
    fn display_round_trips_through_parse() {
        for text in ["1~2", "~10", "3~", "7"] {
            let i = Interval::parse(text).unwrap();
            assert_eq!(Interval::parse(&i.to_string()), Some(i));
        }
    }
}
