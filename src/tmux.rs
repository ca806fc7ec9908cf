//! tmux/screen pass-through wrapping.
//!
//! A multiplexer swallows escape sequences it doesn't understand. Wrapping
//! them in `ESC P tmux ; ... ESC \` with every inner `ESC` doubled makes it
//! forward the payload verbatim to the real terminal.

const PASSTHROUGH_OPEN: &str = "\x1bPtmux;";
const ESC: &str = "\x1b";
const ESC_ESC: &str = "\x1b\x1b";

/// Rewrite an opening/closing escape sequence pair for multiplexer pass-through.
pub fn tmux_wrap(open: &str, close: &str) -> (String, String) {
    let open = format!("{PASSTHROUGH_OPEN}{}", open.replace(ESC, ESC_ESC));
    let close = format!("{}{}", close.replace(ESC, ESC_ESC), crate::ST);
    (open, close)
}

/// Return the pair unchanged, or wrapped when `escape` is set.
pub(crate) fn open_close(open: &str, close: &str, escape: bool) -> (String, String) {
    if escape {
        tmux_wrap(open, close)
    } else {
        (open.to_owned(), close.to_owned())
    }
}
