//! Canned reply texts.

pub const ADMIN_APPROVED: &str = "Message approved.";
pub const ADMIN_BLOCKED: &str = "Message blocked.";
pub const ADMIN_CONFIRM_MANUAL: &str = "Are you certain you wish to send this message?";
pub const ADMIN_INVALID_STATE: &str =
    "I cannot perform that function at the present time. (Invalid state.)";
pub const ADMIN_MANUAL_SENT: &str = "Manual message sent.";
pub const ADMIN_RESET: &str = "What function do you require?";
pub const ADMIN_SEND_MANUAL: &str = "Enter your custom message here:";
pub const ADMIN_UNKNOWN_COMMAND: &str = "That command is not recognised.";
pub const ADMIN_NO_CONTENT: &str = "No approved feels are available to send.";
pub const INVALID_USER: &str = "You are not a recognised user for this bot. Sorry.";
pub const RECIPIENT_UNKNOWN_COMMAND: &str = "Sorry, I'm not smart enough to understand. Try looking for the response buttons or just tell me 'Get more feels'.";
pub const RECIPIENT_RESET: &str = "What can I help you with?";
pub const MULTIPLE_ERRORS: &str = "Multiple error statuses when processing an incoming server message. See error logs for details.";

/// Admin status report.
pub fn status_report(total: i64, pending: i64, blocked: i64) -> String {
    format!("Total feels: {total}\nAwaiting approval: {pending}\nBlocked: {blocked}")
}
