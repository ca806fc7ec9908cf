//! Terminal capability hints.
//!
//! The encoders never inspect the environment. Callers build a
//! [`Capabilities`] once, either from the process environment or from an
//! explicit variable list, and pass the relevant flags down.

use std::collections::HashMap;

/// Graphics protocol to emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    Sixel,
    Kitty,
    Iterm,
}

/// What the surrounding terminal appears to support.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Running inside tmux or GNU screen
    pub multiplexer: bool,
    /// Kitty graphics protocol
    pub kitty: bool,
    /// iTerm2 inline images (iTerm2, WezTerm, mintty)
    pub iterm: bool,
}

const VARS: [&str; 4] = ["TERM", "TERM_PROGRAM", "TMUX", "KITTY_WINDOW_ID"];

impl Capabilities {
    /// Inspect the current process environment.
    pub fn from_env() -> Self {
        Self::from_vars(VARS.iter().filter_map(|&name| {
            std::env::var(name).ok().map(|value| (name, value))
        }))
    }

    /// Derive capabilities from `(name, value)` pairs.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let env: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_owned(), v.as_ref().trim().to_lowercase()))
            .collect();
        let get = |name: &str| env.get(name).map(String::as_str).unwrap_or("");

        let term = get("TERM");
        let term_program = get("TERM_PROGRAM");

        // TERM_PROGRAM isn't passed through tmux
        Self {
            multiplexer: term.starts_with("screen")
                || term.starts_with("tmux")
                || !get("TMUX").is_empty(),
            kitty: !get("KITTY_WINDOW_ID").is_empty() || term_program == "wezterm",
            iterm: matches!(term_program, "iterm.app" | "wezterm") || term == "mintty",
        }
    }

    /// Best protocol for this terminal. SIXEL is the fallback, since its
    /// support can't be told from the environment alone.
    pub fn preferred_protocol(&self) -> Protocol {
        if self.kitty {
            Protocol::Kitty
        } else if self.iterm {
            Protocol::Iterm
        } else {
            Protocol::Sixel
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_env() {
        let caps = Capabilities::from_vars(Vec::<(&str, &str)>::new());
        assert_eq!(caps, Capabilities::default());
        assert_eq!(caps.preferred_protocol(), Protocol::Sixel);
    }

    #[test]
    fn test_multiplexer() {
        assert!(Capabilities::from_vars([("TERM", "screen.xterm-256color")]).multiplexer);
        assert!(Capabilities::from_vars([("TERM", "tmux-256color")]).multiplexer);
        assert!(Capabilities::from_vars([("TMUX", "/tmp/tmux-1000/default,1,0")]).multiplexer);
        assert!(!Capabilities::from_vars([("TERM", "xterm-256color")]).multiplexer);
    }

    #[test]
    fn test_kitty_and_wezterm() {
        let kitty = Capabilities::from_vars([("KITTY_WINDOW_ID", "1")]);
        assert_eq!(kitty.preferred_protocol(), Protocol::Kitty);

        let wez = Capabilities::from_vars([("TERM_PROGRAM", " WezTerm ")]);
        assert!(wez.kitty && wez.iterm);
    }

    #[test]
    fn test_iterm() {
        let caps = Capabilities::from_vars([("TERM_PROGRAM", "iTerm.app")]);
        assert_eq!(caps.preferred_protocol(), Protocol::Iterm);
        assert!(Capabilities::from_vars([("TERM", "mintty")]).iterm);
    }
}
