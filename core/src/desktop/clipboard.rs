use super::{Clipboard, DesktopError};

/// Clipboard backed by `arboard`
///
/// A handle is opened per copy; on X11 the contents stay available only while
/// some handle is alive, which a short-lived CLI process cannot guarantee.
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn copy(&self, text: &str) -> Result<(), DesktopError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| DesktopError::Clipboard(e.to_string()))?;
        clipboard
            .set_text(text.to_string())
            .map_err(|e| DesktopError::Clipboard(e.to_string()))
    }
}
