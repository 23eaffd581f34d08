use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use crossterm::execute;
use crossterm::style::Print;
use std::io::{self, Write};

/// Writes `text` to the terminal clipboard through an OSC 52 escape.
pub fn copy_to_clipboard<W: Write>(out: &mut W, text: &str) -> io::Result<()> {
    execute!(out, Print(osc52_sequence(text)))
}

fn osc52_sequence(text: &str) -> String {
    let encoded = STANDARD.encode(text.as_bytes());
    format!("\x1b]52;c;{encoded}\x1b\\")
}
