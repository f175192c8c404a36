use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use tokio::sync::Mutex;
use tracing::{error, info};

use super::allocator;
use super::parser::parse_fields;
use super::validator::validate;
use super::{EmployeeType, RegistrationError, RegistrationRequest, Rejection, CLOSED_TEXT};
use crate::config::Config;
use crate::notify::{self, Notifier};
use crate::platform::IncomingMessage;
use crate::sheets::SheetStore;

pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Settings read once at startup and fixed for the handler's lifetime.
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    pub active: bool,
    pub daily_worksheet: String,
    pub monthly_worksheet: String,
    pub utc_offset: FixedOffset,
    pub serialize_code_allocation: bool,
}

impl HandlerSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            active: config.registration.active,
            daily_worksheet: config.sheets.daily_worksheet.clone(),
            monthly_worksheet: config.sheets.monthly_worksheet.clone(),
            utc_offset: config.utc_offset()?,
            serialize_code_allocation: config.registration.serialize_code_allocation,
        })
    }

    pub fn worksheet(&self, employee_type: EmployeeType) -> &str {
        match employee_type {
            EmployeeType::Daily => &self.daily_worksheet,
            EmployeeType::Monthly => &self.monthly_worksheet,
        }
    }
}

/// What the sender is told after a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub employee_code: String,
    pub name: String,
    pub position: String,
    pub branch: String,
    pub start_date: String,
}

/// Result of handling one message. Every variant renders exactly one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Closed,
    Registered(Confirmation),
    Rejected(Rejection),
    Failed(String),
}

impl Outcome {
    pub fn reply_text(&self) -> String {
        match self {
            Outcome::Closed => CLOSED_TEXT.to_string(),
            Outcome::Registered(c) => format!(
                "✅ ลงทะเบียนสำเร็จ\n\
                 รหัสพนักงาน: {}\n\
                 ชื่อ: {}\n\
                 ตำแหน่งงาน: {}\n\
                 สาขา: {}\n\
                 วันเริ่มงาน: {}\n\
                 📌 โปรดแจ้งหัวหน้างาน/พนักงาน ล่วงหน้าก่อนเริ่มงาน",
                c.employee_code, c.name, c.position, c.branch, c.start_date
            ),
            Outcome::Rejected(rejection) => rejection.reply_text(),
            Outcome::Failed(description) => format!("เกิดข้อผิดพลาด: {}", description),
        }
    }
}

/// One lock per employee type, held from reading the last code until the append lands.
#[derive(Default)]
struct AllocationLocks {
    daily: Mutex<()>,
    monthly: Mutex<()>,
}

impl AllocationLocks {
    fn for_type(&self, employee_type: EmployeeType) -> &Mutex<()> {
        match employee_type {
            EmployeeType::Daily => &self.daily,
            EmployeeType::Monthly => &self.monthly,
        }
    }
}

/// Turns a registration message into a worksheet row and a reply.
pub struct RegistrationHandler {
    settings: HandlerSettings,
    sheets: Arc<dyn SheetStore>,
    notifier: Option<Arc<dyn Notifier>>,
    locks: Option<AllocationLocks>,
}

impl RegistrationHandler {
    pub fn new(
        settings: HandlerSettings,
        sheets: Arc<dyn SheetStore>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        let locks = settings
            .serialize_code_allocation
            .then(AllocationLocks::default);
        Self {
            settings,
            sheets,
            notifier,
            locks,
        }
    }

    pub fn is_active(&self) -> bool {
        self.settings.active
    }

    /// Handle one incoming message. Never fails; errors become reply text.
    pub async fn handle(&self, message: &IncomingMessage) -> Outcome {
        if !self.settings.active {
            info!(
                "Registration closed, ignoring {} message from {}",
                message.platform, message.user_id
            );
            return Outcome::Closed;
        }

        let request = match parse_fields(&message.text).and_then(|fields| validate(&fields)) {
            Ok(request) => request,
            Err(rejection) => {
                info!(
                    "Rejected {} message from {}: {}",
                    message.platform, message.user_id, rejection
                );
                return Outcome::Rejected(rejection);
            }
        };

        match self.register(&request, &message.user_id).await {
            Ok(confirmation) => {
                info!(
                    "Registered {} as {} ({})",
                    confirmation.name, confirmation.employee_code, request.employee_type
                );
                Outcome::Registered(confirmation)
            }
            Err(e) => {
                error!("Registration from {} failed: {}", message.user_id, e);
                Outcome::Failed(e.to_string())
            }
        }
    }

    async fn register(
        &self,
        request: &RegistrationRequest,
        sender_id: &str,
    ) -> Result<Confirmation, RegistrationError> {
        let sheet = self.settings.worksheet(request.employee_type);

        let _guard = match &self.locks {
            Some(locks) => Some(locks.for_type(request.employee_type).lock().await),
            None => None,
        };

        let rows = self
            .sheets
            .get_all_rows(sheet)
            .await
            .map_err(|e| RegistrationError::SheetRead {
                sheet: sheet.to_string(),
                reason: format!("{:#}", e),
            })?;

        let employee_code = allocator::next_code(request.employee_type, &rows)?;
        let timestamp = format_timestamp(&Utc::now().with_timezone(&self.settings.utc_offset));
        let row = request.to_sheet_row(&employee_code, sender_id, &timestamp);

        self.sheets
            .append_row(sheet, &row)
            .await
            .map_err(|e| RegistrationError::AppendFailure {
                sheet: sheet.to_string(),
                reason: format!("{:#}", e),
            })?;

        if let Some(notifier) = &self.notifier {
            notify::dispatch(notifier.clone(), sheet.to_string());
        }

        Ok(Confirmation {
            employee_code,
            name: request.name.clone(),
            position: request.position.clone(),
            branch: request.branch.clone(),
            start_date: request.start_date.clone(),
        })
    }
}

pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}
