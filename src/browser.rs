use crate::login::BrowserLauncher;
use crate::{AuthError, Result};

/// Open a URL in the user's default web browser
///
/// Best effort: the login flow treats a launch failure as non-fatal and
/// falls back to the printed URL.
pub fn open_browser(url: &str) -> Result<()> {
    webbrowser::open(url).map_err(|e| AuthError::BrowserLaunch(e.to_string()))
}

/// [`BrowserLauncher`] backed by the system default browser
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open_url(&self, url: &str) -> Result<()> {
        open_browser(url)
    }
}
