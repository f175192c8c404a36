use std::sync::LazyLock;

use regex::Regex;

use super::parser::FieldMap;
use super::{
    EmployeeType, RegistrationRequest, Rejection, BRANCH, EMPLOYEE_TYPE, NAME, NICKNAME, POSITION,
    REQUIRED_FIELDS, START_DATE,
};

static START_DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}-\d{1,2}-\d{4}$").expect("start date pattern compiles"));

/// Turn parsed fields into a registration request.
///
/// Checks run in a fixed order: label set, start date shape, employee type.
/// The first failure wins, so a message that is wrong in several ways always
/// gets the same reply.
pub fn validate(fields: &FieldMap) -> Result<RegistrationRequest, Rejection> {
    let missing: Vec<&'static str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|label| !fields.contains_key(*label))
        .collect();
    if !missing.is_empty() || fields.len() != REQUIRED_FIELDS.len() {
        return Err(Rejection::MissingFields { missing });
    }

    let field = |label: &str| fields.get(label).cloned().unwrap_or_default();

    let start_date = field(START_DATE);
    if !START_DATE_PATTERN.is_match(&start_date) {
        return Err(Rejection::InvalidDateFormat { value: start_date });
    }

    let raw_type = field(EMPLOYEE_TYPE);
    let employee_type = EmployeeType::from_token(&raw_type)
        .ok_or(Rejection::InvalidEmployeeType { value: raw_type })?;

    Ok(RegistrationRequest {
        name: field(NAME),
        nickname: field(NICKNAME),
        branch: field(BRANCH),
        position: field(POSITION),
        start_date,
        employee_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn complete(start: &str, kind: &str) -> FieldMap {
        fields(&[
            (NAME, "สมชาย ใจดี"),
            (NICKNAME, "ชาย"),
            (BRANCH, "สาขา 1"),
            (POSITION, "แคชเชียร์"),
            (START_DATE, start),
            (EMPLOYEE_TYPE, kind),
        ])
    }

    #[test]
    fn test_valid_request() {
        let request = validate(&complete("01-02-2025", "รายเดือน")).unwrap();
        assert_eq!(request.name, "สมชาย ใจดี");
        assert_eq!(request.branch, "สาขา 1");
        assert_eq!(request.start_date, "01-02-2025");
        assert_eq!(request.employee_type, EmployeeType::Monthly);
    }

    #[test]
    fn test_missing_labels_listed_in_form_order() {
        let map = fields(&[
            (NAME, "a"),
            ("ชื่อเล้น", "typo"),
            (BRANCH, "b"),
            (POSITION, "c"),
            ("เริ่มงาน (DD-MM-YYYY)", "1-1-2024"),
            (EMPLOYEE_TYPE, "รายวัน"),
        ]);
        assert_eq!(
            validate(&map),
            Err(Rejection::MissingFields {
                missing: vec![NICKNAME, START_DATE],
            })
        );
    }

    #[test]
    fn test_missing_labels_reported_before_bad_date() {
        let mut map = complete("2024-01-01", "อื่นๆ");
        map.remove(BRANCH);
        assert_eq!(
            validate(&map),
            Err(Rejection::MissingFields {
                missing: vec![BRANCH],
            })
        );
    }

    #[test]
    fn test_start_date_shapes() {
        for ok in ["1-1-2024", "01-12-2024", "31-1-1999"] {
            assert!(validate(&complete(ok, "รายวัน")).is_ok(), "{ok} should pass");
        }
        for bad in ["2024-01-01", "1/1/2024", "1-1-24", "001-1-2024", "", "1-1-2024 extra"] {
            assert_eq!(
                validate(&complete(bad, "รายวัน")),
                Err(Rejection::InvalidDateFormat {
                    value: bad.to_string(),
                }),
                "{bad} should fail"
            );
        }
    }

    #[test]
    fn test_bad_date_reported_before_bad_type() {
        assert!(matches!(
            validate(&complete("2024-01-01", "พาร์ทไทม์")),
            Err(Rejection::InvalidDateFormat { .. })
        ));
    }

    #[test]
    fn test_unknown_employee_type() {
        assert_eq!(
            validate(&complete("1-1-2024", "พาร์ทไทม์")),
            Err(Rejection::InvalidEmployeeType {
                value: "พาร์ทไทม์".to_string(),
            })
        );
    }
}
