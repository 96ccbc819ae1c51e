//! Adapter between the tracker core and the system tray toolkit.
//!
//! The toolkit side of the tray (icon widget, context menu, event loop)
//! lives outside this crate; it consumes icon paths and produces a quit
//! request. This module maps indicator keys to icon files and watches
//! the indicator channel so the toolkit only ever sees "display this
//! file".

use std::path::PathBuf;

use tokio::sync::watch;
use tracing::{info, warn};

use glazetray_tracker::Indicator;

/// Icon lookup by indicator key.
pub struct IconTheme {
    dir: PathBuf,
}

impl IconTheme {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the icon file for an indicator, `<dir>/<key>.ico`.
    pub fn icon_path(&self, indicator: &Indicator) -> PathBuf {
        self.dir.join(format!("{}.ico", indicator.icon_key()))
    }

    /// Like [`icon_path`](Self::icon_path), but falls back to the
    /// default icon when no file exists for the key (e.g. a workspace
    /// without a dedicated icon).
    pub fn resolve(&self, indicator: &Indicator) -> PathBuf {
        let path = self.icon_path(indicator);
        if path.is_file() {
            return path;
        }
        if !matches!(indicator, Indicator::Default) {
            warn!(path = %path.display(), "icon file missing, using default");
        }
        self.icon_path(&Indicator::Default)
    }
}

/// Follows indicator changes and hands the matching icon file to the
/// tray toolkit. Returns when the tracker side goes away.
pub async fn run_icon_loop(theme: IconTheme, mut indicator_rx: watch::Receiver<Indicator>) {
    loop {
        let indicator = indicator_rx.borrow_and_update().clone();
        let icon = theme.resolve(&indicator);
        info!(key = %indicator.icon_key(), icon = %icon.display(), "indicator changed");

        if indicator_rx.changed().await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn icon_paths_follow_the_key() {
        let theme = IconTheme::new("icons");
        assert_eq!(
            theme.icon_path(&Indicator::Workspace("2".into())),
            Path::new("icons/2.ico")
        );
        assert_eq!(
            theme.icon_path(&Indicator::Default),
            Path::new("icons/default.ico")
        );
        assert_eq!(
            theme.icon_path(&Indicator::Error),
            Path::new("icons/error.ico")
        );
    }

    #[test]
    fn missing_icon_falls_back_to_default() {
        let theme = IconTheme::new("/nonexistent");
        let resolved = theme.resolve(&Indicator::Workspace("9".into()));
        assert_eq!(resolved, Path::new("/nonexistent/default.ico"));
    }
}
