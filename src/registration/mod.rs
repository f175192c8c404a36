pub mod allocator;
pub mod handler;
pub mod parser;
pub mod validator;

use thiserror::Error;

pub use handler::{HandlerSettings, RegistrationHandler};

pub const NAME: &str = "ชื่อ";
pub const NICKNAME: &str = "ชื่อเล่น";
pub const BRANCH: &str = "สาขา";
pub const POSITION: &str = "ตำแหน่ง";
pub const START_DATE: &str = "เริ่มงาน";
pub const EMPLOYEE_TYPE: &str = "ประเภท";

/// The labels a registration message must carry, in the order the blank form shows them.
pub const REQUIRED_FIELDS: [&str; 6] = [NAME, NICKNAME, BRANCH, POSITION, START_DATE, EMPLOYEE_TYPE];

pub const DAILY_TOKEN: &str = "รายวัน";
pub const MONTHLY_TOKEN: &str = "รายเดือน";

/// Header written into an empty local worksheet.
pub const SHEET_HEADER: [&str; 11] = [
    "ลำดับ",
    "สาขา",
    "รหัสพนักงาน",
    "ชื่อ",
    "ชื่อเล่น",
    "ตำแหน่ง",
    "วันเริ่มงาน",
    "หมายเหตุ",
    "ประเภท",
    "ผู้ส่ง",
    "เวลาลงทะเบียน",
];

pub const CLOSED_TEXT: &str =
    "⚠️ ขณะนี้ระบบลงทะเบียนปิดให้บริการชั่วคราว\nโปรดลองใหม่อีกครั้งภายหลัง";

/// Blank form shown to users who send the wrong number of lines.
pub fn form_template() -> String {
    "ชื่อ:\nชื่อเล่น:\nสาขา:\nตำแหน่ง:\nเริ่มงาน (DD-MM-YYYY):\nประเภท:".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmployeeType {
    Daily,
    Monthly,
}

impl EmployeeType {
    /// Resolve a user-supplied type token. Surrounding whitespace and case are ignored.
    pub fn from_token(token: &str) -> Option<Self> {
        let normalized = token.trim().to_lowercase();
        match normalized.as_str() {
            DAILY_TOKEN => Some(EmployeeType::Daily),
            MONTHLY_TOKEN => Some(EmployeeType::Monthly),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            EmployeeType::Daily => DAILY_TOKEN,
            EmployeeType::Monthly => MONTHLY_TOKEN,
        }
    }
}

impl std::fmt::Display for EmployeeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmployeeType::Daily => write!(f, "daily"),
            EmployeeType::Monthly => write!(f, "monthly"),
        }
    }
}

/// A registration that passed every validation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub name: String,
    pub nickname: String,
    pub branch: String,
    pub position: String,
    /// DD-MM-YYYY as typed by the user; only the shape is checked.
    pub start_date: String,
    pub employee_type: EmployeeType,
}

impl RegistrationRequest {
    /// Lay the registration out in worksheet column order.
    pub fn to_sheet_row(&self, employee_code: &str, sender_id: &str, timestamp: &str) -> Vec<String> {
        vec![
            String::new(),
            self.branch.clone(),
            employee_code.to_string(),
            self.name.clone(),
            self.nickname.clone(),
            self.position.clone(),
            self.start_date.clone(),
            String::new(),
            self.employee_type.token().to_string(),
            sender_id.to_string(),
            timestamp.to_string(),
        ]
    }
}

/// Why a message was turned away before anything touched the worksheet.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Rejection {
    #[error("expected 6 lines, found {found}")]
    LineCount { found: usize },
    #[error("line {line_number} has no ':' separator: {line:?}")]
    MalformedLine { line_number: usize, line: String },
    #[error("missing fields: {}", .missing.join(", "))]
    MissingFields { missing: Vec<&'static str> },
    #[error("start date {value:?} is not DD-MM-YYYY")]
    InvalidDateFormat { value: String },
    #[error("unknown employee type {value:?}")]
    InvalidEmployeeType { value: String },
}

impl Rejection {
    pub fn reply_text(&self) -> String {
        match self {
            Rejection::LineCount { .. } => {
                format!("❌ ต้องกรอกข้อมูล 6 บรรทัดเท่านั้น:\n{}", form_template())
            }
            Rejection::MalformedLine { .. } => {
                "❌ ทุกบรรทัดต้องมีเครื่องหมาย ':' เช่น ตำแหน่ง: เจ้าหน้าที่".to_string()
            }
            Rejection::MissingFields { missing } => format!("❌ ขาดข้อมูล: {}", missing.join(", ")),
            Rejection::InvalidDateFormat { .. } => {
                "❌ รูปแบบวันเริ่มงานไม่ถูกต้อง (ต้องเป็น DD-MM-YYYY)".to_string()
            }
            Rejection::InvalidEmployeeType { .. } => {
                format!("❌ ประเภทต้องเป็น '{}' หรือ '{}' เท่านั้น", DAILY_TOKEN, MONTHLY_TOKEN)
            }
        }
    }
}

/// Failures after validation; these surface as the generic error reply.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    CodeAllocation(#[from] allocator::AllocationError),
    #[error("could not read worksheet {sheet}: {reason}")]
    SheetRead { sheet: String, reason: String },
    #[error("could not append to worksheet {sheet}: {reason}")]
    AppendFailure { sheet: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegistrationRequest {
        RegistrationRequest {
            name: "สมชาย ใจดี".to_string(),
            nickname: "ชาย".to_string(),
            branch: "สาขา 1".to_string(),
            position: "แคชเชียร์".to_string(),
            start_date: "1-2-2025".to_string(),
            employee_type: EmployeeType::Monthly,
        }
    }

    #[test]
    fn test_employee_type_tokens() {
        assert_eq!(EmployeeType::from_token("รายวัน"), Some(EmployeeType::Daily));
        assert_eq!(EmployeeType::from_token("  รายเดือน \t"), Some(EmployeeType::Monthly));
        assert_eq!(EmployeeType::from_token("daily"), None);
        assert_eq!(EmployeeType::from_token(""), None);
    }

    #[test]
    fn test_sheet_row_layout() {
        let row = request().to_sheet_row("P60006", "U123", "01/02/2025 09:30");
        assert_eq!(row.len(), 11);
        assert_eq!(row[0], "");
        assert_eq!(row[1], "สาขา 1");
        assert_eq!(row[2], "P60006");
        assert_eq!(row[3], "สมชาย ใจดี");
        assert_eq!(row[4], "ชาย");
        assert_eq!(row[5], "แคชเชียร์");
        assert_eq!(row[6], "1-2-2025");
        assert_eq!(row[7], "");
        assert_eq!(row[8], "รายเดือน");
        assert_eq!(row[9], "U123");
        assert_eq!(row[10], "01/02/2025 09:30");
    }

    #[test]
    fn test_missing_fields_reply_lists_labels() {
        let rejection = Rejection::MissingFields {
            missing: vec![NICKNAME, START_DATE],
        };
        assert_eq!(rejection.reply_text(), "❌ ขาดข้อมูล: ชื่อเล่น, เริ่มงาน");
    }

    #[test]
    fn test_line_count_reply_includes_template() {
        let text = Rejection::LineCount { found: 2 }.reply_text();
        assert!(text.starts_with("❌ ต้องกรอกข้อมูล 6 บรรทัดเท่านั้น:"));
        assert!(text.contains("เริ่มงาน (DD-MM-YYYY):"));
    }
}
