//! ANSI escape stripping for plain-text previews.

const ESC: char = '\x1b';
const BEL: char = '\x07';

/// Remove CSI, OSC, and two-byte escape sequences, keeping everything else.
///
/// CSI runs through the first final byte in `0x40..=0x7E`. OSC runs through
/// BEL or `ESC \`. Any other escape consumes exactly one following char.
pub fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != ESC {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('[') => {
                for c in chars.by_ref() {
                    if ('\x40'..='\x7e').contains(&c) {
                        break;
                    }
                }
            }
            Some(']') => {
                while let Some(c) = chars.next() {
                    if c == BEL {
                        break;
                    }
                    if c == ESC && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            Some(_) | None => {}
        }
    }
    out
}
