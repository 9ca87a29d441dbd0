//! Platform abstraction for the actions result items can trigger.
//!
//! [`SystemActions`] is the seam between items and the desktop. The default
//! `desktop` feature provides [`DesktopActions`], backed by `arboard` and
//! `open`.

use crate::error::QalcResult;

/// Operations result item actions need from the system
pub trait SystemActions: Send + Sync {
    fn set_clipboard_text(&self, text: &str) -> QalcResult<()>;

    fn open_url(&self, url: &str) -> QalcResult<()>;
}

#[cfg(feature = "desktop")]
pub use desktop::DesktopActions;

#[cfg(feature = "desktop")]
mod desktop {
    use std::sync::Mutex;

    use super::SystemActions;
    use crate::error::{QalcError, QalcResult};

    /// Clipboard through `arboard`, URLs through `open`
    ///
    /// The clipboard is opened on first use, so constructing this never
    /// fails on headless systems.
    #[derive(Default)]
    pub struct DesktopActions {
        clipboard: Mutex<Option<arboard::Clipboard>>,
    }

    impl DesktopActions {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl SystemActions for DesktopActions {
        fn set_clipboard_text(&self, text: &str) -> QalcResult<()> {
            let mut guard = self
                .clipboard
                .lock()
                .map_err(|e| QalcError::Clipboard(e.to_string()))?;
            let clipboard = match guard.as_mut() {
                Some(clipboard) => clipboard,
                None => {
                    let clipboard = arboard::Clipboard::new()
                        .map_err(|e| QalcError::Clipboard(e.to_string()))?;
                    guard.insert(clipboard)
                }
            };
            clipboard
                .set_text(text)
                .map_err(|e| QalcError::Clipboard(e.to_string()))
        }

        fn open_url(&self, url: &str) -> QalcResult<()> {
            open::that(url).map_err(|e| QalcError::OpenUrl(e.to_string()))
        }
    }
}
