#![forbid(unsafe_code)]

//! Render kernel: cells, buffers, dirty runs, and flush.

pub mod buffer;
pub mod cell;
pub mod diff;
pub mod flush;
pub mod headless;

mod text_width {
    use unicode_width::UnicodeWidthChar;

    #[inline]
    fn ascii_width(text: &str) -> Option<usize> {
        if text.bytes().all(|b| (0x20..=0x7E).contains(&b)) {
            Some(text.len())
        } else {
            None
        }
    }

    /// Terminal columns occupied by a single character.
    ///
    /// Control characters report 0.
    #[inline]
    pub(crate) fn char_width(c: char) -> usize {
        if c.is_ascii() {
            return usize::from((0x20..=0x7E).contains(&(c as u8)));
        }
        UnicodeWidthChar::width(c).unwrap_or(0)
    }

    /// Terminal columns occupied by a string.
    #[inline]
    pub fn display_width(text: &str) -> usize {
        if let Some(width) = ascii_width(text) {
            return width;
        }
        text.chars().map(char_width).sum()
    }
}

pub(crate) use text_width::char_width;
pub use text_width::display_width;
