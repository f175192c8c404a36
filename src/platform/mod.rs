pub mod line;
pub mod telegram;

use crate::registration::RegistrationHandler;

/// A message received from any platform
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Platform identifier (e.g., "line", "telegram")
    pub platform: String,
    /// Platform-specific user ID as string; stored in the worksheet row
    pub user_id: String,
    /// The message text
    pub text: String,
}

/// Reply for the help commands every platform understands, if `text` is one.
pub fn command_reply(text: &str) -> Option<String> {
    match text.trim() {
        "/start" | "/form" => Some(format!(
            "กรุณากรอกข้อมูลตามแบบฟอร์มนี้ (6 บรรทัด):\n{}",
            crate::registration::form_template()
        )),
        _ => None,
    }
}

/// Reply text for one message. Help commands are answered only while
/// registration is open; a closed handler answers everything with its notice.
pub async fn respond(handler: &RegistrationHandler, incoming: &IncomingMessage) -> String {
    match command_reply(&incoming.text) {
        Some(help) if handler.is_active() => help,
        _ => handler.handle(incoming).await.reply_text(),
    }
}
