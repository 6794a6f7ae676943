/// Text markup understood by the messenger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParseMode {
    Plain,
    #[default]
    Html,
    MarkdownV2,
}

/// Per-message delivery options shared by every recipient of a broadcast.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliveryOptions {
    pub parse_mode: ParseMode,
    pub disable_link_preview: bool,
    /// Deliver silently (no sound/vibration on the recipient's device).
    pub disable_notification: bool,
}

impl DeliveryOptions {
    pub fn html() -> Self {
        Self::default()
    }

    pub fn plain() -> Self {
        Self {
            parse_mode: ParseMode::Plain,
            ..Self::default()
        }
    }

    pub fn without_link_preview(mut self) -> Self {
        self.disable_link_preview = true;
        self
    }

    pub fn silent(mut self) -> Self {
        self.disable_notification = true;
        self
    }
}

