//! Trigger sources for content broadcasts and their per-audience wording.

/// What caused a content item to be broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerSource {
    #[default]
    Unknown,
    Twitter,
    Push,
    Admin,
    Recipient,
    Manual,
    Schedule,
}

impl TriggerSource {
    /// Parse a source label from an external trigger. Unrecognized labels map to `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "twitter" => Self::Twitter,
            "push" => Self::Push,
            "admin" => Self::Admin,
            "recipient" => Self::Recipient,
            "manual" => Self::Manual,
            "schedule" => Self::Schedule,
            _ => Self::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Twitter => "twitter",
            Self::Push => "push",
            Self::Admin => "admin",
            Self::Recipient => "recipient",
            Self::Manual => "manual",
            Self::Schedule => "schedule",
        }
    }

    /// Lead-in for the admin's notification copy.
    pub fn admin_prefix(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown trigger source:",
            Self::Twitter => "Triggered by lack of twitter:",
            Self::Push => "Triggered by Zapier push:",
            Self::Admin => "Triggered by admin request:",
            Self::Recipient => "Triggered by recipient request:",
            Self::Manual => "Manual message sent:",
            Self::Schedule => "Triggered as scheduled:",
        }
    }

    /// Lead-in for the recipient's copy. Empty for sources that need no framing.
    pub fn recipient_prefix(&self) -> &'static str {
        match self {
            Self::Twitter => {
                "You haven't sent a public tweet today, so just in case you're feeling a bit down, have this message:"
            }
            Self::Push | Self::Admin => {
                "Someone thought you might be feeling a bit down, so have this message:"
            }
            Self::Recipient => "As requested, another message in case you need more feels:",
            Self::Unknown | Self::Manual | Self::Schedule => "",
        }
    }
}

impl std::fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_back() {
        for source in [
            TriggerSource::Unknown,
            TriggerSource::Twitter,
            TriggerSource::Push,
            TriggerSource::Admin,
            TriggerSource::Recipient,
            TriggerSource::Manual,
            TriggerSource::Schedule,
        ] {
            assert_eq!(TriggerSource::from_label(source.label()), source);
        }
    }

    #[test]
    fn unrecognized_label_is_unknown() {
        assert_eq!(TriggerSource::from_label("carrier pigeon"), TriggerSource::Unknown);
        assert_eq!(TriggerSource::from_label(""), TriggerSource::Unknown);
    }

    #[test]
    fn parse_is_lenient_on_case_and_padding() {
        assert_eq!(TriggerSource::from_label(" Schedule "), TriggerSource::Schedule);
    }

    #[test]
    fn wording_differs_per_audience() {
        let src = TriggerSource::Recipient;
        assert_ne!(src.admin_prefix(), src.recipient_prefix());
        assert!(TriggerSource::Schedule.recipient_prefix().is_empty());
    }
}
