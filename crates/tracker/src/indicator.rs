//! The indicator state shown by the UI shell.

/// The single piece of state the UI shell displays.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Indicator {
    /// A workspace has focus; its name keys the icon lookup.
    Workspace(String),
    /// No focused workspace could be determined.
    #[default]
    Default,
    /// The window manager is unreachable.
    Error,
}

impl Indicator {
    /// Icon lookup key for the UI shell.
    pub fn icon_key(&self) -> &str {
        match self {
            Indicator::Workspace(name) => name,
            Indicator::Default => "default",
            Indicator::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icon_keys() {
        assert_eq!(Indicator::Workspace("2".into()).icon_key(), "2");
        assert_eq!(Indicator::Default.icon_key(), "default");
        assert_eq!(Indicator::Error.icon_key(), "error");
    }

    #[test]
    fn default_is_the_fallback() {
        assert_eq!(Indicator::default(), Indicator::Default);
    }
}
