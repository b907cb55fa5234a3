//! IEEE-754-2008 decimal128 in the binary integer decimal (BID) encoding used by BSON.
//!
//! Only the operations the store needs are implemented: parsing, formatting, numeric
//! comparison, addition for `$inc`, and explicit conversions to host number types. Every
//! conversion that can lose information is fallible and names the loss.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::errors::DbError;

const EXPONENT_BIAS: i32 = 6176;
const MAX_EXPONENT: i32 = 6111;
const MIN_EXPONENT: i32 = -6176;
const MAX_DIGITS: usize = 34;
const MAX_COEFFICIENT: u128 = 9_999_999_999_999_999_999_999_999_999_999;

const SIGN_BIT: u64 = 1 << 63;
const COMBINATION_INFINITY: u64 = 0x1e;
const COMBINATION_NAN: u64 = 0x1f;
const COEFFICIENT_HIGH_MASK: u64 = (1 << 49) - 1;

/// A 128-bit decimal stored as its 16 little-endian BSON bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal128 {
    bytes: [u8; 16],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parts {
    Finite { negative: bool, coefficient: u128, exponent: i32 },
    Infinity { negative: bool },
    NaN,
}

impl Decimal128 {
    pub const NAN: Self = Self::from_high_low(COMBINATION_NAN << 58, 0);
    pub const INFINITY: Self = Self::from_high_low(COMBINATION_INFINITY << 58, 0);
    pub const NEG_INFINITY: Self = Self::from_high_low(SIGN_BIT | (COMBINATION_INFINITY << 58), 0);

    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self { bytes }
    }

    #[must_use]
    pub const fn bytes(&self) -> [u8; 16] {
        self.bytes
    }

    const fn from_high_low(high: u64, low: u64) -> Self {
        let lo = low.to_le_bytes();
        let hi = high.to_le_bytes();
        let mut bytes = [0u8; 16];
        let mut i = 0;
        while i < 8 {
            bytes[i] = lo[i];
            bytes[i + 8] = hi[i];
            i += 1;
        }
        Self { bytes }
    }

    fn high_low(&self) -> (u64, u64) {
        let mut lo = [0u8; 8];
        let mut hi = [0u8; 8];
        lo.copy_from_slice(&self.bytes[..8]);
        hi.copy_from_slice(&self.bytes[8..]);
        (u64::from_le_bytes(hi), u64::from_le_bytes(lo))
    }

    fn from_parts(negative: bool, coefficient: u128, exponent: i32) -> Self {
        debug_assert!(coefficient <= MAX_COEFFICIENT);
        debug_assert!((MIN_EXPONENT..=MAX_EXPONENT).contains(&exponent));
        let biased = u64::try_from(exponent + EXPONENT_BIAS).unwrap_or(0);
        let mut high = (biased << 49) | ((coefficient >> 64) as u64 & COEFFICIENT_HIGH_MASK);
        if negative {
            high |= SIGN_BIT;
        }
        Self::from_high_low(high, coefficient as u64)
    }

    fn parts(&self) -> Parts {
        let (high, low) = self.high_low();
        let negative = high & SIGN_BIT != 0;
        let combination = (high >> 58) & 0x1f;
        if combination == COMBINATION_NAN {
            return Parts::NaN;
        }
        if combination == COMBINATION_INFINITY {
            return Parts::Infinity { negative };
        }
        if (high >> 61) & 0b11 == 0b11 {
            // The implicit 0b100 prefix puts the coefficient above 10^34: non-canonical, read as zero.
            let biased = ((high >> 47) & 0x3fff) as i32;
            return Parts::Finite { negative, coefficient: 0, exponent: biased - EXPONENT_BIAS };
        }
        let biased = ((high >> 49) & 0x3fff) as i32;
        let mut coefficient = (u128::from(high & COEFFICIENT_HIGH_MASK) << 64) | u128::from(low);
        if coefficient > MAX_COEFFICIENT {
            coefficient = 0;
        }
        Parts::Finite { negative, coefficient, exponent: biased - EXPONENT_BIAS }
    }

    #[must_use]
    pub fn is_nan(&self) -> bool {
        matches!(self.parts(), Parts::NaN)
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        matches!(self.parts(), Parts::Finite { .. })
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        match self.parts() {
            Parts::Finite { negative, .. } | Parts::Infinity { negative } => negative,
            Parts::NaN => false,
        }
    }

    /// Parses decimal text such as `420.69`, `-1.5E+3`, `NaN` or `Infinity`.
    ///
    /// # Errors
    /// `TypeMismatch` for text that is not a decimal literal, `ConversionPrecisionLoss` when
    /// the value needs more than 34 significant digits or its exponent is out of range.
    pub fn parse(text: &str) -> Result<Self, DbError> {
        let s = text.trim();
        let (negative, body) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        if body.eq_ignore_ascii_case("nan") {
            return Ok(Self::NAN);
        }
        if body.eq_ignore_ascii_case("inf") || body.eq_ignore_ascii_case("infinity") {
            return Ok(if negative { Self::NEG_INFINITY } else { Self::INFINITY });
        }

        let invalid = || DbError::TypeMismatch(format!("cannot parse '{text}' as Decimal128"));
        let (mantissa, exp_part) = match body.find(['e', 'E']) {
            Some(pos) => (&body[..pos], Some(&body[pos + 1..])),
            None => (body, None),
        };
        let mut digits = String::with_capacity(mantissa.len());
        let mut fraction_digits = 0i32;
        let mut seen_point = false;
        for c in mantissa.chars() {
            match c {
                '0'..='9' => {
                    digits.push(c);
                    if seen_point {
                        fraction_digits = fraction_digits.checked_add(1).ok_or_else(invalid)?;
                    }
                }
                '.' if !seen_point => seen_point = true,
                _ => return Err(invalid()),
            }
        }
        if digits.is_empty() {
            return Err(invalid());
        }
        let exp_value = match exp_part {
            Some(e) if !e.is_empty() => e.parse::<i32>().map_err(|_| invalid())?,
            Some(_) => return Err(invalid()),
            None => 0,
        };
        let mut exponent = exp_value.checked_sub(fraction_digits).ok_or_else(invalid)?;

        let trimmed = digits.trim_start_matches('0');
        let mut significant = if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() };
        let out_of_range = || {
            DbError::ConversionPrecisionLoss(format!("'{text}' exponent is outside the decimal128 range"))
        };
        while significant.len() > MAX_DIGITS && significant.ends_with('0') {
            significant.pop();
            exponent = exponent.checked_add(1).ok_or_else(out_of_range)?;
        }
        if significant.len() > MAX_DIGITS {
            return Err(DbError::ConversionPrecisionLoss(format!(
                "'{text}' has more than {MAX_DIGITS} significant digits"
            )));
        }
        let mut coefficient: u128 = significant.parse().map_err(|_| invalid())?;
        Self::clamp(negative, &mut coefficient, &mut exponent, text)?;
        Ok(Self::from_parts(negative, coefficient, exponent))
    }

    fn clamp(negative: bool, coefficient: &mut u128, exponent: &mut i32, text: &str) -> Result<(), DbError> {
        if *coefficient == 0 {
            *exponent = (*exponent).clamp(MIN_EXPONENT, MAX_EXPONENT);
            return Ok(());
        }
        while *exponent > MAX_EXPONENT
            && let Some(scaled) = coefficient.checked_mul(10).filter(|c| *c <= MAX_COEFFICIENT)
        {
            *coefficient = scaled;
            *exponent -= 1;
        }
        while *exponent < MIN_EXPONENT && *coefficient % 10 == 0 {
            *coefficient /= 10;
            *exponent += 1;
        }
        if (MIN_EXPONENT..=MAX_EXPONENT).contains(exponent) {
            Ok(())
        } else {
            let sign = if negative { "-" } else { "" };
            Err(DbError::ConversionPrecisionLoss(format!(
                "'{sign}{text}' exponent is outside the decimal128 range"
            )))
        }
    }

    /// Parses text that uses `separator` as its decimal point (e.g. `,` in many locales).
    ///
    /// # Errors
    /// `ConversionPrecisionLoss` when the text also contains `.` while another separator was
    /// requested, since the intermediate cannot round-trip unambiguously.
    pub fn parse_with_separator(text: &str, separator: char) -> Result<Self, DbError> {
        if separator == '.' {
            return Self::parse(text);
        }
        if text.contains('.') {
            return Err(DbError::ConversionPrecisionLoss(format!(
                "'{text}' contains '.' but the decimal separator is '{separator}'"
            )));
        }
        Self::parse(&text.replace(separator, "."))
    }

    #[must_use]
    pub fn to_string_with_separator(&self, separator: char) -> String {
        let s = self.to_string();
        if separator == '.' { s } else { s.replace('.', &separator.to_string()) }
    }

    /// Explicit, possibly lossy, conversion to a binary float.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        match self.parts() {
            Parts::NaN => f64::NAN,
            Parts::Infinity { negative: false } => f64::INFINITY,
            Parts::Infinity { negative: true } => f64::NEG_INFINITY,
            Parts::Finite { .. } => self.to_string().parse::<f64>().unwrap_or(f64::NAN),
        }
    }

    /// Converts to `f64` only when the float represents exactly the same number.
    ///
    /// # Errors
    /// `ConversionPrecisionLoss` when the nearest float differs from the decimal.
    pub fn to_f64_exact(&self) -> Result<f64, DbError> {
        let f = self.to_f64();
        if !self.is_finite() {
            return Ok(f);
        }
        let back = Self::try_from(f)?;
        if back.cmp_numeric(self) == Some(Ordering::Equal) {
            Ok(f)
        } else {
            Err(DbError::ConversionPrecisionLoss(format!("{self} is not exactly representable as f64 ({f})")))
        }
    }

    /// Converts to a fixed-point integer holding `value * 10^scale`.
    ///
    /// # Errors
    /// `ConversionPrecisionLoss` when digits would be dropped or the result overflows, and
    /// for NaN and infinities.
    pub fn to_scaled_i128(&self, scale: u32) -> Result<i128, DbError> {
        let Parts::Finite { negative, coefficient, exponent } = self.parts() else {
            return Err(DbError::ConversionPrecisionLoss(format!("{self} has no fixed-point value")));
        };
        let loss = || DbError::ConversionPrecisionLoss(format!("{self} does not fit scale {scale}"));
        let shift = i32::try_from(scale).ok().and_then(|s| exponent.checked_add(s)).ok_or_else(loss)?;
        let magnitude = if shift >= 0 {
            let factor = 10u128.checked_pow(shift.unsigned_abs()).ok_or_else(loss)?;
            coefficient.checked_mul(factor).ok_or_else(loss)?
        } else {
            let Some(divisor) = 10u128.checked_pow(shift.unsigned_abs()) else {
                return if coefficient == 0 { Ok(0) } else { Err(loss()) };
            };
            if coefficient % divisor != 0 {
                return Err(loss());
            }
            coefficient / divisor
        };
        let magnitude = i128::try_from(magnitude).map_err(|_| loss())?;
        Ok(if negative { -magnitude } else { magnitude })
    }

    /// The same number with trailing zeros removed from the coefficient; zero loses its
    /// sign and exponent. NaN and infinities are returned unchanged.
    #[must_use]
    pub fn normalized(&self) -> Self {
        match self.parts() {
            Parts::Finite { coefficient: 0, .. } => Self::from_parts(false, 0, 0),
            Parts::Finite { negative, mut coefficient, mut exponent } => {
                while exponent < MAX_EXPONENT && coefficient % 10 == 0 {
                    coefficient /= 10;
                    exponent += 1;
                }
                Self::from_parts(negative, coefficient, exponent)
            }
            _ => *self,
        }
    }

    /// Numeric ordering; `None` when either side is NaN. `1.0` and `1.00` compare equal.
    #[must_use]
    pub fn cmp_numeric(&self, other: &Self) -> Option<Ordering> {
        match (self.parts(), other.parts()) {
            (Parts::NaN, _) | (_, Parts::NaN) => None,
            (Parts::Infinity { negative: a }, Parts::Infinity { negative: b }) => Some(b.cmp(&a)),
            (Parts::Infinity { negative }, Parts::Finite { .. }) => {
                Some(if negative { Ordering::Less } else { Ordering::Greater })
            }
            (Parts::Finite { .. }, Parts::Infinity { negative }) => {
                Some(if negative { Ordering::Greater } else { Ordering::Less })
            }
            (
                Parts::Finite { negative: na, coefficient: ca, exponent: ea },
                Parts::Finite { negative: nb, coefficient: cb, exponent: eb },
            ) => {
                if ca == 0 && cb == 0 {
                    return Some(Ordering::Equal);
                }
                let na = na && ca != 0;
                let nb = nb && cb != 0;
                if na != nb {
                    return Some(if na { Ordering::Less } else { Ordering::Greater });
                }
                let magnitude = cmp_magnitude(ca, ea, cb, eb);
                Some(if na { magnitude.reverse() } else { magnitude })
            }
        }
    }

    /// Exact sum used by `$inc`.
    ///
    /// # Errors
    /// `ConversionPrecisionLoss` when the exact sum needs more than 34 digits.
    pub fn checked_add(&self, other: &Self) -> Result<Self, DbError> {
        let (a, b) = match (self.parts(), other.parts()) {
            (Parts::NaN, _) | (_, Parts::NaN) => return Ok(Self::NAN),
            (Parts::Infinity { negative: x }, Parts::Infinity { negative: y }) if x != y => return Ok(Self::NAN),
            (Parts::Infinity { .. }, _) => return Ok(*self),
            (_, Parts::Infinity { .. }) => return Ok(*other),
            (a, b) => (a, b),
        };
        let (Parts::Finite { negative: na, coefficient: ca, exponent: ea }, Parts::Finite { negative: nb, coefficient: cb, exponent: eb }) = (a, b) else {
            return Ok(Self::NAN);
        };
        let loss = || DbError::ConversionPrecisionLoss(format!("{self} + {other} exceeds decimal128 precision"));
        let exponent = ea.min(eb);
        let scale = |c: u128, e: i32| -> Result<i128, DbError> {
            let factor = 10u128.checked_pow((e - exponent).unsigned_abs()).ok_or_else(loss)?;
            let scaled = c.checked_mul(factor).ok_or_else(loss)?;
            i128::try_from(scaled).map_err(|_| loss())
        };
        let sa = scale(ca, ea)?;
        let sb = scale(cb, eb)?;
        let sum = (if na { -sa } else { sa }).checked_add(if nb { -sb } else { sb }).ok_or_else(loss)?;
        let negative = sum < 0 || (sum == 0 && na && nb);
        let mut coefficient = sum.unsigned_abs();
        let mut exponent = exponent;
        while coefficient > MAX_COEFFICIENT && coefficient % 10 == 0 {
            coefficient /= 10;
            exponent += 1;
        }
        if coefficient > MAX_COEFFICIENT {
            return Err(loss());
        }
        Self::clamp(negative, &mut coefficient, &mut exponent, &self.to_string())?;
        Ok(Self::from_parts(negative, coefficient, exponent))
    }
}

fn strip_trailing_zeros(mut coefficient: u128, mut exponent: i32) -> (u128, i32) {
    while coefficient != 0 && coefficient % 10 == 0 {
        coefficient /= 10;
        exponent += 1;
    }
    (coefficient, exponent)
}

fn cmp_magnitude(ca: u128, ea: i32, cb: u128, eb: i32) -> Ordering {
    match (ca == 0, cb == 0) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) => {}
    }
    let (ca, ea) = strip_trailing_zeros(ca, ea);
    let (cb, eb) = strip_trailing_zeros(cb, eb);
    let da = ca.to_string();
    let db = cb.to_string();
    let adjusted_a = ea + i32::try_from(da.len()).unwrap_or(0) - 1;
    let adjusted_b = eb + i32::try_from(db.len()).unwrap_or(0) - 1;
    adjusted_a.cmp(&adjusted_b).then_with(|| {
        let width = da.len().max(db.len());
        format!("{da:0<width$}").cmp(&format!("{db:0<width$}"))
    })
}

impl fmt::Display for Decimal128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (negative, coefficient, exponent) = match self.parts() {
            Parts::NaN => return f.write_str("NaN"),
            Parts::Infinity { negative } => return f.write_str(if negative { "-Infinity" } else { "Infinity" }),
            Parts::Finite { negative, coefficient, exponent } => (negative, coefficient, exponent),
        };
        if negative {
            f.write_str("-")?;
        }
        let digits = coefficient.to_string();
        let len = i32::try_from(digits.len()).unwrap_or(i32::MAX);
        let adjusted = exponent + len - 1;
        if exponent <= 0 && adjusted >= -6 {
            if exponent == 0 {
                return f.write_str(&digits);
            }
            let point = len + exponent;
            if point > 0 {
                let (int_part, frac_part) = digits.split_at(point.unsigned_abs() as usize);
                write!(f, "{int_part}.{frac_part}")
            } else {
                write!(f, "0.{}{digits}", "0".repeat(point.unsigned_abs() as usize))
            }
        } else {
            let (first, rest) = digits.split_at(1);
            f.write_str(first)?;
            if !rest.is_empty() {
                write!(f, ".{rest}")?;
            }
            write!(f, "E{}{adjusted}", if adjusted >= 0 { "+" } else { "" })
        }
    }
}

impl fmt::Debug for Decimal128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal128({self})")
    }
}

impl FromStr for Decimal128 {
    type Err = DbError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<i32> for Decimal128 {
    fn from(v: i32) -> Self {
        Self::from(i64::from(v))
    }
}

impl From<i64> for Decimal128 {
    fn from(v: i64) -> Self {
        Self::from_parts(v < 0, u128::from(v.unsigned_abs()), 0)
    }
}

impl TryFrom<f64> for Decimal128 {
    type Error = DbError;

    /// Goes through the shortest round-trip text of the float, so `30.99` becomes exactly
    /// `30.99` rather than the binary expansion.
    fn try_from(v: f64) -> Result<Self, Self::Error> {
        if v.is_nan() {
            return Ok(Self::NAN);
        }
        if v.is_infinite() {
            return Ok(if v > 0.0 { Self::INFINITY } else { Self::NEG_INFINITY });
        }
        Self::parse(&format!("{v}"))
    }
}
