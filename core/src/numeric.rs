use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

// ============================================================================
// Numeric Type System
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub enum NumericType {
    /// Integer arithmetic is checked; overflow is an error, not a wrap
    Int(i64),

    /// IEEE 754 double precision floating point
    Float(f64),
}

/// Failure of a numeric operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumericError {
    #[error("integer overflow in {0}")]
    Overflow(&'static str),
    #[error("division by zero")]
    DivisionByZero,
}

// ============================================================================
// Display Implementation
// ============================================================================

impl fmt::Display for NumericType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NumericType::Int(n) => write!(f, "{n}"),
            NumericType::Float(x) => {
                if x.is_nan() {
                    write!(f, "NaN")
                } else if x.is_infinite() {
                    let sign = if *x > 0.0 { "Inf" } else { "-Inf" };
                    write!(f, "{sign}")
                } else {
                    write!(f, "{x:?}")
                }
            }
        }
    }
}

// ============================================================================
// Equality and Comparison
// ============================================================================

impl PartialEq for NumericType {
    fn eq(&self, other: &Self) -> bool {
        use NumericType::*;

        match (self, other) {
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Int(a), Float(b)) => (*a as f64) == *b,
            (Float(a), Int(b)) => *a == (*b as f64),
        }
    }
}

impl PartialOrd for NumericType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        use NumericType::*;

        match (self, other) {
            (Int(a), Int(b)) => a.partial_cmp(b),
            (Float(a), Float(b)) => a.partial_cmp(b),
            (Int(a), Float(b)) => (*a as f64).partial_cmp(b),
            (Float(a), Int(b)) => a.partial_cmp(&(*b as f64)),
        }
    }
}

impl NumericType {
    /// Convert to float (may lose precision)
    pub fn to_float(&self) -> f64 {
        match self {
            NumericType::Int(n) => *n as f64,
            NumericType::Float(x) => *x,
        }
    }
}

// ============================================================================
// Arithmetic Operations
// ============================================================================

impl NumericType {
    /// Apply an integer op with overflow checking, or a float op if either
    /// side is a float.
    fn combine(
        &self,
        other: &NumericType,
        op_name: &'static str,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> Result<NumericType, NumericError> {
        use NumericType::*;

        match (self, other) {
            (Int(a), Int(b)) => int_op(*a, *b)
                .map(Int)
                .ok_or(NumericError::Overflow(op_name)),
            _ => Ok(Float(float_op(self.to_float(), other.to_float()))),
        }
    }

    pub fn add(&self, other: &NumericType) -> Result<NumericType, NumericError> {
        self.combine(other, "addition", i64::checked_add, |a, b| a + b)
    }

    pub fn sub(&self, other: &NumericType) -> Result<NumericType, NumericError> {
        self.combine(other, "subtraction", i64::checked_sub, |a, b| a - b)
    }

    pub fn mul(&self, other: &NumericType) -> Result<NumericType, NumericError> {
        self.combine(other, "multiplication", i64::checked_mul, |a, b| a * b)
    }

    /// Division stays integral when it is exact, otherwise produces a float.
    /// Dividing by an integer zero is an error; float division follows IEEE.
    pub fn div(&self, other: &NumericType) -> Result<NumericType, NumericError> {
        use NumericType::*;

        match (self, other) {
            (Int(_), Int(0)) => Err(NumericError::DivisionByZero),
            (Int(a), Int(b)) => match a.checked_rem(*b) {
                Some(0) => a
                    .checked_div(*b)
                    .map(Int)
                    .ok_or(NumericError::Overflow("division")),
                Some(_) => Ok(Float(*a as f64 / *b as f64)),
                None => Err(NumericError::Overflow("division")),
            },
            _ => Ok(Float(self.to_float() / other.to_float())),
        }
    }

    pub fn neg(&self) -> Result<NumericType, NumericError> {
        match self {
            NumericType::Int(n) => n
                .checked_neg()
                .map(NumericType::Int)
                .ok_or(NumericError::Overflow("negation")),
            NumericType::Float(x) => Ok(NumericType::Float(-x)),
        }
    }
}
