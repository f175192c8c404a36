use thiserror::Error;

use super::EmployeeType;

/// Starting number and prefix for one employee type's code series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeScheme {
    pub default_start: u64,
    pub prefix: &'static str,
}

impl EmployeeType {
    pub fn code_scheme(self) -> CodeScheme {
        match self {
            EmployeeType::Daily => CodeScheme {
                default_start: 20000,
                prefix: "",
            },
            EmployeeType::Monthly => CodeScheme {
                default_start: 60000,
                prefix: "P",
            },
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AllocationError {
    #[error("employee code {raw:?} is too large to increment")]
    Overflow { raw: String },
}

/// Code column of the newest data row. The first row is the header.
pub fn last_observed_code(rows: &[Vec<String>]) -> Option<&str> {
    if rows.len() <= 1 {
        return None;
    }
    rows.last()
        .and_then(|row| row.get(2))
        .map(String::as_str)
}

/// Compute the code for the next registration of `employee_type`.
///
/// The previous number is the digits of the newest row's code, or the
/// scheme's default when there is no data row or the code has no digits.
/// The result is always previous + 1, so the very first code of a series is
/// default + 1.
pub fn next_code(employee_type: EmployeeType, rows: &[Vec<String>]) -> Result<String, AllocationError> {
    let scheme = employee_type.code_scheme();

    let previous = match last_observed_code(rows) {
        Some(raw) => numeric_part(raw)?.unwrap_or(scheme.default_start),
        None => scheme.default_start,
    };

    let next = previous.checked_add(1).ok_or_else(|| AllocationError::Overflow {
        raw: previous.to_string(),
    })?;

    Ok(format!("{}{}", scheme.prefix, next))
}

/// Value of a decimal digit, ASCII or Thai (`๐`..`๙`).
fn digit_value(c: char) -> Option<u64> {
    c.to_digit(10)
        .or_else(|| ('๐'..='๙').contains(&c).then(|| c as u32 - '๐' as u32))
        .map(u64::from)
}

fn numeric_part(raw: &str) -> Result<Option<u64>, AllocationError> {
    let overflow = || AllocationError::Overflow { raw: raw.to_string() };
    let mut value: Option<u64> = None;
    for digit in raw.chars().filter_map(digit_value) {
        let next = value
            .unwrap_or(0)
            .checked_mul(10)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(overflow)?;
        value = Some(next);
    }
    Ok(value)
}
