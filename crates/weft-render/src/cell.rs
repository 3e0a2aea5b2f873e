#![forbid(unsafe_code)]

//! Cell types and invariants.
//!
//! A `Cell` is one character position of the grid. It is exactly 16 bytes
//! (content, foreground, background, attributes) so four cells share a cache
//! line and row comparisons stay cheap.

use crate::char_width;

/// Cell content: a Unicode scalar, empty, or a wide-character continuation.
///
/// # Special Values
///
/// - `EMPTY` (0x0): nothing drawn, width 0
/// - `CONTINUATION` (0x7FFF_FFFF): trailing column of a wide character
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct CellContent(u32);

impl CellContent {
    /// Empty cell content (no character).
    pub const EMPTY: Self = Self(0);

    /// Continuation marker for wide characters.
    ///
    /// Outside the valid scalar range, so it never collides with a real char.
    pub const CONTINUATION: Self = Self(0x7FFF_FFFF);

    /// Create content from a single Unicode character.
    #[inline]
    pub const fn from_char(c: char) -> Self {
        Self(c as u32)
    }

    /// Check if this is a continuation cell (part of a wide character).
    #[inline]
    pub const fn is_continuation(self) -> bool {
        self.0 == Self::CONTINUATION.0
    }

    /// Check if this cell is empty.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == Self::EMPTY.0
    }

    /// The character, unless this is empty or a continuation.
    #[inline]
    pub fn as_char(self) -> Option<char> {
        if self.is_empty() || self.is_continuation() {
            None
        } else {
            char::from_u32(self.0)
        }
    }

    /// Display width of this content (0 for empty and continuation cells).
    #[inline]
    pub fn width(self) -> usize {
        match self.as_char() {
            Some(c) => char_width(c),
            None => 0,
        }
    }

    /// Raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl Default for CellContent {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl core::fmt::Debug for CellContent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_empty() {
            write!(f, "CellContent::EMPTY")
        } else if self.is_continuation() {
            write!(f, "CellContent::CONTINUATION")
        } else if let Some(c) = self.as_char() {
            write!(f, "CellContent::Char({c:?})")
        } else {
            write!(f, "CellContent(0x{:08x})", self.0)
        }
    }
}

/// A compact RGBA color, laid out as `0xRRGGBBAA`.
///
/// Alpha 0 means "terminal default" to the flush layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(transparent)]
pub struct PackedRgba(pub u32);

impl PackedRgba {
    /// Fully transparent (alpha = 0).
    pub const TRANSPARENT: Self = Self(0);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Opaque red.
    pub const RED: Self = Self::rgb(255, 0, 0);
    /// Opaque green.
    pub const GREEN: Self = Self::rgb(0, 255, 0);
    /// Opaque blue.
    pub const BLUE: Self = Self::rgb(0, 0, 255);

    /// Create an opaque RGB color (alpha = 255).
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Create an RGBA color with explicit alpha.
    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(((r as u32) << 24) | ((g as u32) << 16) | ((b as u32) << 8) | (a as u32))
    }

    /// Red channel.
    #[inline]
    pub const fn r(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Green channel.
    #[inline]
    pub const fn g(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Blue channel.
    #[inline]
    pub const fn b(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Alpha channel.
    #[inline]
    pub const fn a(self) -> u8 {
        self.0 as u8
    }
}

bitflags::bitflags! {
    /// 8-bit cell style flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StyleFlags: u8 {
        /// Bold / increased intensity.
        const BOLD          = 0b0000_0001;
        /// Dim / decreased intensity.
        const DIM           = 0b0000_0010;
        /// Italic text.
        const ITALIC        = 0b0000_0100;
        /// Underlined text.
        const UNDERLINE     = 0b0000_1000;
        /// Blinking text.
        const BLINK         = 0b0001_0000;
        /// Reverse video (swap fg/bg).
        const REVERSE       = 0b0010_0000;
        /// Strikethrough text.
        const STRIKETHROUGH = 0b0100_0000;
        /// Hidden / invisible text.
        const HIDDEN        = 0b1000_0000;
    }
}

/// Packed cell attributes. Bits 31..24 hold [`StyleFlags`]; the rest is reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(transparent)]
pub struct CellAttrs(u32);

impl CellAttrs {
    /// No attributes.
    pub const NONE: Self = Self(0);

    /// Create attributes from style flags.
    #[inline]
    pub const fn new(flags: StyleFlags) -> Self {
        Self((flags.bits() as u32) << 24)
    }

    /// Extract the style flags.
    #[inline]
    pub fn flags(self) -> StyleFlags {
        StyleFlags::from_bits_truncate((self.0 >> 24) as u8)
    }

    /// Check whether a specific flag is set.
    #[inline]
    pub fn has_flag(self, flag: StyleFlags) -> bool {
        self.flags().contains(flag)
    }
}

/// A single grid cell (16 bytes).
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C, align(16))]
pub struct Cell {
    /// Character content.
    pub content: CellContent,
    /// Foreground color.
    pub fg: PackedRgba,
    /// Background color.
    pub bg: PackedRgba,
    /// Style flags.
    pub attrs: CellAttrs,
}

const _: () = assert!(core::mem::size_of::<Cell>() == 16);

impl Cell {
    /// A continuation cell (trailing column of a wide character).
    pub const CONTINUATION: Self = Self {
        content: CellContent::CONTINUATION,
        fg: PackedRgba::TRANSPARENT,
        bg: PackedRgba::TRANSPARENT,
        attrs: CellAttrs::NONE,
    };

    /// The blank cell every buffer starts with.
    pub const BLANK: Self = Self::new(CellContent::EMPTY);

    /// Create a new cell with the given content and default colors.
    #[inline]
    pub const fn new(content: CellContent) -> Self {
        Self {
            content,
            fg: PackedRgba::TRANSPARENT,
            bg: PackedRgba::TRANSPARENT,
            attrs: CellAttrs::NONE,
        }
    }

    /// Create a cell from a single character.
    #[inline]
    pub const fn from_char(c: char) -> Self {
        Self::new(CellContent::from_char(c))
    }

    /// Check if this is a continuation cell.
    #[inline]
    pub const fn is_continuation(&self) -> bool {
        self.content.is_continuation()
    }

    /// Check if this cell is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Bitwise equality comparison.
    ///
    /// Non-short-circuiting so the four comparisons lower to one wide compare.
    #[inline]
    pub fn bits_eq(&self, other: &Self) -> bool {
        (self.content.raw() == other.content.raw())
            & (self.fg == other.fg)
            & (self.bg == other.bg)
            & (self.attrs == other.attrs)
    }

    /// Set the cell content to a character, preserving other fields.
    #[inline]
    pub const fn with_char(mut self, c: char) -> Self {
        self.content = CellContent::from_char(c);
        self
    }

    /// Set the foreground color.
    #[inline]
    pub const fn with_fg(mut self, fg: PackedRgba) -> Self {
        self.fg = fg;
        self
    }

    /// Set the background color.
    #[inline]
    pub const fn with_bg(mut self, bg: PackedRgba) -> Self {
        self.bg = bg;
        self
    }

    /// Set the style attributes.
    #[inline]
    pub const fn with_attrs(mut self, attrs: CellAttrs) -> Self {
        self.attrs = attrs;
        self
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::BLANK
    }
}

impl core::fmt::Debug for Cell {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Cell")
            .field("content", &self.content)
            .field("fg", &self.fg)
            .field("bg", &self.bg)
            .field("attrs", &self.attrs)
            .finish()
    }
}

/// Optional overrides applied on top of a base cell.
///
/// `None` fields leave the base untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub fg: Option<PackedRgba>,
    pub bg: Option<PackedRgba>,
    pub flags: Option<StyleFlags>,
}

impl Style {
    /// An empty style.
    pub const fn new() -> Self {
        Self {
            fg: None,
            bg: None,
            flags: None,
        }
    }

    /// Set the foreground color.
    pub const fn fg(mut self, fg: PackedRgba) -> Self {
        self.fg = Some(fg);
        self
    }

    /// Set the background color.
    pub const fn bg(mut self, bg: PackedRgba) -> Self {
        self.bg = Some(bg);
        self
    }

    /// Set the style flags.
    pub const fn flags(mut self, flags: StyleFlags) -> Self {
        self.flags = Some(flags);
        self
    }

    /// Check if the style overrides nothing.
    pub const fn is_empty(&self) -> bool {
        self.fg.is_none() && self.bg.is_none() && self.flags.is_none()
    }

    /// Produce the cell this style paints with, starting from a blank cell.
    #[inline]
    pub fn to_cell(self) -> Cell {
        let mut cell = Cell::BLANK;
        if let Some(fg) = self.fg {
            cell.fg = fg;
        }
        if let Some(bg) = self.bg {
            cell.bg = bg;
        }
        if let Some(flags) = self.flags {
            cell.attrs = CellAttrs::new(flags);
        }
        cell
    }
}
