//! Header Rendering
//!
//! Renders `#define NAME "value"` lines for the generated C header.
//! Values are escaped so that any string, including quotes, backslashes and
//! control characters, ends up as a well-formed C string literal.

use std::fmt::Write as _;
use zeroize::Zeroizing;

/// Text written for a variable that is not set
pub const ABSENT_PLACEHOLDER: &str = "None";

/// One macro in the generated header and the environment key it is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacroBinding {
    pub macro_name: &'static str,
    pub env_key: &'static str,
    /// Value must never appear in logs
    pub secret: bool,
}

/// Macros written to env_config.h, in output order
pub const WIFI_BINDINGS: [MacroBinding; 2] = [
    MacroBinding {
        macro_name: "WIFI_SSID",
        env_key: "WIFI_SSID",
        secret: false,
    },
    MacroBinding {
        macro_name: "WIFI_PASSWORD",
        env_key: "WIFI_PASSWORD",
        secret: true,
    },
];

/// Append a single `#define` line (newline-terminated) to `out`
pub fn push_define(out: &mut String, macro_name: &str, value: &str) {
    out.push_str("#define ");
    out.push_str(macro_name);
    out.push_str(" \"");
    push_escaped(out, value);
    out.push_str("\"\n");
}

/// Upper bound on the length of one rendered `#define` line
///
/// Every escaped byte expands to at most four bytes (`\ooo`).
pub fn max_define_len(macro_name: &str, value: &str) -> usize {
    "#define ".len() + macro_name.len() + " \"".len() + value.len() * 4 + "\"\n".len()
}

/// Render a full header from (macro, value) pairs
///
/// `None` values are rendered as [`ABSENT_PLACEHOLDER`]. The buffer is sized
/// up front so it never reallocates and leaves unzeroed copies behind.
pub fn render<'a, I>(defines: I) -> Zeroizing<String>
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    let defines: Vec<(&str, &str)> = defines
        .into_iter()
        .map(|(name, value)| (name, value.unwrap_or(ABSENT_PLACEHOLDER)))
        .collect();
    let capacity = defines
        .iter()
        .map(|(name, value)| max_define_len(name, value))
        .sum();

    let mut out = Zeroizing::new(String::with_capacity(capacity));
    for (macro_name, value) in defines {
        push_define(&mut out, macro_name, value);
    }
    out
}

/// Escape `value` for the inside of a C string literal
///
/// Octal escapes are always three digits so a following digit in the value
/// cannot be absorbed into the escape sequence.
pub fn push_escaped(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                // Writing to a String cannot fail
                let _ = write!(out, "\\{:03o}", c as u32);
            }
            c => out.push(c),
        }
    }
}
