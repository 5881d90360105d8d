//! System TrueType font discovery and PDF embedding.
//!
//! The rebuilder renders translated text with the first usable TrueType
//! font found on the host. The font is embedded as a *simple* font with
//! WinAnsiEncoding rather than a CID font: the byte-per-glyph model keeps
//! the rebuilt text layer trivially extractable, at the cost of limiting
//! rendered output to the CP1252 repertoire.
//!
//! # PDF Font Structure
//!
//! - **Font dictionary** (Subtype /TrueType) with /FirstChar, /LastChar
//!   and a /Widths array, referencing:
//!   - **FontDescriptor**: font metrics (flags, bbox, ascent/descent)
//!   - **FontFile2**: the embedded TrueType font program

use std::path::{Path, PathBuf};

use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use ttf_parser::Face;

use crate::error::{Error, Result};
use crate::pdf_encoding;

/// Directories searched for TrueType fonts, in order.
fn font_search_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![
        PathBuf::from("/usr/share/fonts"),
        PathBuf::from("/usr/local/share/fonts"),
        PathBuf::from("/System/Library/Fonts"),
        PathBuf::from("C:\\Windows\\Fonts"),
    ];
    if let Some(home) = std::env::var_os("HOME") {
        let home = PathBuf::from(home);
        dirs.push(home.join(".fonts"));
        dirs.push(home.join(".local/share/fonts"));
    }
    dirs
}

/// A parsed TrueType font with the metrics needed for PDF embedding.
///
/// Metrics are extracted once at load time so the struct owns plain data
/// and can be shared freely.
pub struct SystemFont {
    data: Vec<u8>,
    base_name: String,
    units_per_em: u16,
    ascent: i16,
    descent: i16,
    cap_height: i16,
    bbox: [i16; 4],
    /// Glyph advance for WinAnsi codes 32..=255, in font units
    widths: Vec<u16>,
}

impl SystemFont {
    /// Find and load the first usable TrueType font on this host.
    ///
    /// Returns `Error::FontUnavailable` when no directory yields a
    /// parseable font — a fatal condition for PDF rebuilding.
    pub fn discover() -> Result<Self> {
        for dir in font_search_dirs() {
            if let Some(font) = Self::first_in_dir(&dir, 0) {
                tracing::debug!(font = %font.base_name, "using system font");
                return Ok(font);
            }
        }
        Err(Error::FontUnavailable)
    }

    fn first_in_dir(dir: &Path, depth: usize) -> Option<Self> {
        // Font trees are shallow; a small depth cap avoids symlink cycles
        if depth > 4 {
            return None;
        }
        let entries = std::fs::read_dir(dir).ok()?;
        let mut subdirs = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                subdirs.push(path);
            } else if path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("ttf"))
                && let Ok(data) = std::fs::read(&path)
                && let Ok(font) = Self::from_bytes(data)
            {
                return Some(font);
            }
        }
        subdirs
            .into_iter()
            .find_map(|sub| Self::first_in_dir(&sub, depth + 1))
    }

    /// Load a font from a specific file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_bytes(data)
    }

    /// Parse raw TrueType data and precompute embedding metrics.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let face = Face::parse(&data, 0).map_err(|_| Error::FontUnavailable)?;

        // A font that cannot render basic Latin is useless for us
        face.glyph_index('A').ok_or(Error::FontUnavailable)?;

        let units_per_em = face.units_per_em();
        let bbox_rect = face.global_bounding_box();
        let space_advance = face
            .glyph_index(' ')
            .and_then(|g| face.glyph_hor_advance(g))
            .unwrap_or(units_per_em / 4);

        let widths = (32u16..=255)
            .map(|code| {
                #[allow(clippy::cast_possible_truncation)]
                let c = pdf_encoding::byte_to_char(code as u8);
                face.glyph_index(c)
                    .and_then(|g| face.glyph_hor_advance(g))
                    .unwrap_or(space_advance)
            })
            .collect();

        let base_name = face
            .names()
            .into_iter()
            .find(|n| n.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
            .and_then(|n| n.to_string())
            .unwrap_or_else(|| "EmbeddedFont".to_string())
            // PDF names must not contain whitespace
            .replace(char::is_whitespace, "");

        Ok(Self {
            base_name,
            units_per_em,
            ascent: face.ascender(),
            descent: face.descender(),
            cap_height: face.capital_height().unwrap_or_else(|| face.ascender()),
            bbox: [
                bbox_rect.x_min,
                bbox_rect.y_min,
                bbox_rect.x_max,
                bbox_rect.y_max,
            ],
            widths,
            data,
        })
    }

    /// Raw TrueType bytes (also consumed by the image caption renderer).
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Scale a font-unit value into the PDF's 1000-unit glyph space.
    #[allow(clippy::cast_possible_truncation)]
    fn to_glyph_space(&self, value: i32) -> i64 {
        i64::from(value) * 1000 / i64::from(self.units_per_em)
    }

    /// Width of `text` in PDF points at the given font size.
    #[allow(clippy::cast_precision_loss)]
    pub fn string_width(&self, text: &str, font_size: f32) -> f32 {
        let total_units: u32 = text
            .chars()
            .map(|c| {
                let code = pdf_encoding::char_to_byte(c).unwrap_or(b'?');
                u32::from(self.widths[usize::from(code.max(32)) - 32])
            })
            .sum();
        total_units as f32 * font_size / f32::from(self.units_per_em)
    }

    /// Embed this font into a PDF document.
    ///
    /// Returns the font dictionary's object id, ready to be referenced
    /// from a page resources dictionary.
    pub fn embed_in_document(&self, doc: &mut Document) -> ObjectId {
        #[allow(clippy::cast_possible_wrap)] // font sizes fit comfortably in i64
        let length1 = self.data.len() as i64;
        let font_file_id = doc.add_object(Object::Stream(
            Stream::new(dictionary! { "Length1" => length1 }, self.data.clone())
                .with_compression(true),
        ));

        let descriptor_id = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => self.base_name.as_str(),
            // Nonsymbolic (bit 6)
            "Flags" => 32,
            "FontBBox" => vec![
                Object::Integer(self.to_glyph_space(i32::from(self.bbox[0]))),
                Object::Integer(self.to_glyph_space(i32::from(self.bbox[1]))),
                Object::Integer(self.to_glyph_space(i32::from(self.bbox[2]))),
                Object::Integer(self.to_glyph_space(i32::from(self.bbox[3]))),
            ],
            "ItalicAngle" => 0,
            "Ascent" => self.to_glyph_space(i32::from(self.ascent)),
            "Descent" => self.to_glyph_space(i32::from(self.descent)),
            "CapHeight" => self.to_glyph_space(i32::from(self.cap_height)),
            "StemV" => 80,
            "FontFile2" => font_file_id,
        });

        let widths: Vec<Object> = self
            .widths
            .iter()
            .map(|&w| Object::Integer(self.to_glyph_space(i32::from(w))))
            .collect();

        doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "TrueType",
            "BaseFont" => self.base_name.as_str(),
            "FirstChar" => 32,
            "LastChar" => 255,
            "Widths" => widths,
            "FontDescriptor" => descriptor_id,
            "Encoding" => "WinAnsiEncoding",
        })
    }
}

impl std::fmt::Debug for SystemFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemFont")
            .field("base_name", &self.base_name)
            .field("units_per_em", &self.units_per_em)
            .field("bytes", &self.data.len())
            .finish()
    }
}
