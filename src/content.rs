//! Content model – the declarative input to the composition engine.
//!
//! A [`DocumentConfig`] describes one document: page geometry, fonts,
//! optional cover/header/footer/TOC templates, and an ordered list of
//! sections made of typed [`ContentItem`]s. The model is pure data and
//! serde-derived, so a content tree is transmissible as JSON; binary
//! payloads (fonts, images, embedded PDFs) travel either as raw byte
//! arrays or base64 data URIs.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use serde::de::{self, Deserializer};
use serde::ser::{self, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Page geometry
// ---------------------------------------------------------------------------

/// Page dimensions in PDF points (1 pt = 1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// A4: 210 mm × 297 mm = 595.28 × 841.89 points.
    pub fn a4() -> Self {
        Self {
            width: 595.28,
            height: 841.89,
        }
    }

    /// US Letter: 612 × 792 points.
    pub fn letter() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
        }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::a4()
    }
}

/// Page margins in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    pub fn uniform(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(40.0)
    }
}

// ---------------------------------------------------------------------------
// Deferred geometry
// ---------------------------------------------------------------------------

/// Render-state snapshot passed to [`Coord::Computed`] functions.
///
/// Carries everything a deferred geometry value may depend on: page
/// dimensions, content margins, the current flow cursor, and the current
/// page number.
#[derive(Debug, Clone, Copy)]
pub struct PageContext {
    pub page_width: f32,
    pub page_height: f32,
    pub margins: Margins,
    pub cursor_y: f32,
    pub page_number: u32,
}

impl PageContext {
    /// Width of the content area between the left and right margins.
    pub fn content_width(&self) -> f32 {
        self.page_width - self.margins.left - self.margins.right
    }

    /// X coordinate of the right edge of the content area.
    pub fn content_right(&self) -> f32 {
        self.page_width - self.margins.right
    }
}

/// A deferred geometry function.
pub type CoordFn = fn(&PageContext) -> f32;

/// A geometry value that is either a literal point value or a function of
/// the render context, resolved immediately before each use.
#[derive(Debug, Clone, Copy)]
pub enum Coord {
    Literal(f32),
    Computed(CoordFn),
}

impl Coord {
    pub fn resolve(&self, ctx: &PageContext) -> f32 {
        match self {
            Coord::Literal(v) => *v,
            Coord::Computed(f) => f(ctx),
        }
    }
}

impl From<f32> for Coord {
    fn from(v: f32) -> Self {
        Coord::Literal(v)
    }
}

// Only literals survive serialization; computed values exist solely on
// trees constructed in code.
impl Serialize for Coord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Coord::Literal(v) => serializer.serialize_f32(*v),
            Coord::Computed(_) => Err(ser::Error::custom(
                "computed coordinates cannot be serialized",
            )),
        }
    }
}

impl<'de> Deserialize<'de> for Coord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let v = f32::deserialize(deserializer)?;
        Ok(Coord::Literal(v))
    }
}

// ---------------------------------------------------------------------------
// Colors
// ---------------------------------------------------------------------------

/// An RGB color, serialized as a `#rrggbb` hex string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub fn from_hex(s: &str) -> Result<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::Content(format!("invalid color: {s:?}")));
        }
        let channel = |range: std::ops::Range<usize>| -> f32 {
            u8::from_str_radix(&hex[range], 16).unwrap_or(0) as f32 / 255.0
        };
        Ok(Self {
            r: channel(0..2),
            g: channel(2..4),
            b: channel(4..6),
        })
    }

    pub fn to_hex(self) -> String {
        format!(
            "#{:02x}{:02x}{:02x}",
            (self.r * 255.0).round() as u8,
            (self.g * 255.0).round() as u8,
            (self.b * 255.0).round() as u8
        )
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_hex(&s).map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Binary payloads
// ---------------------------------------------------------------------------

/// A binary payload: raw bytes, or a base64 `data:` URI when the tree came
/// in as JSON.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Binary {
    DataUri(String),
    Bytes(Vec<u8>),
}

impl Binary {
    /// Decode to raw bytes. Data URIs are decoded on each call; callers in
    /// hot paths should hold the result.
    pub fn bytes(&self) -> Result<Cow<'_, [u8]>> {
        match self {
            Binary::Bytes(b) => Ok(Cow::Borrowed(b)),
            Binary::DataUri(uri) => parse_data_uri(uri).map(Cow::Owned),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Binary::Bytes(b) => b.is_empty(),
            Binary::DataUri(s) => s.is_empty(),
        }
    }
}

impl fmt::Debug for Binary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binary::Bytes(b) => write!(f, "Binary::Bytes({} bytes)", b.len()),
            Binary::DataUri(s) => write!(f, "Binary::DataUri({} chars)", s.len()),
        }
    }
}

impl Default for Binary {
    fn default() -> Self {
        Binary::Bytes(Vec::new())
    }
}

impl From<Vec<u8>> for Binary {
    fn from(bytes: Vec<u8>) -> Self {
        Binary::Bytes(bytes)
    }
}

/// Parse a `data:<mime>;base64,<data>` URI and return the decoded bytes.
fn parse_data_uri(src: &str) -> Result<Vec<u8>> {
    let rest = src
        .strip_prefix("data:")
        .ok_or_else(|| Error::Asset(format!("not a data URI: {:.40}", src)))?;
    let comma_pos = rest
        .find(',')
        .ok_or_else(|| Error::Asset("invalid data URI: missing `,` separator".to_string()))?;
    let header = &rest[..comma_pos];
    if !header.contains(";base64") {
        return Err(Error::Asset(
            "only base64-encoded data URIs are supported".to_string(),
        ));
    }
    BASE64_STD
        .decode(rest[comma_pos + 1..].trim())
        .map_err(|e| Error::Asset(format!("base64 decode error: {e}")))
}

// ---------------------------------------------------------------------------
// Shared item fields
// ---------------------------------------------------------------------------

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// Font weight; bold resolves to the `-Bold` variant of the active family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

/// Placement fields common to all item variants.
///
/// `relative` selects flow placement: the item is laid out at the cursor
/// and advances it by `margin_top + height + margin_bottom`. Absolute
/// items position themselves from `top`/`left` and leave the cursor alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Placement {
    pub top: Option<Coord>,
    pub left: Option<Coord>,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub relative: bool,
    pub is_title: bool,
    #[serde(rename = "isSubTitle")]
    pub is_subtitle: bool,
}

// ---------------------------------------------------------------------------
// Content items
// ---------------------------------------------------------------------------

/// A text value: one string, or a list of lines rendered one under another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextValue {
    Plain(String),
    Lines(Vec<String>),
}

impl TextValue {
    pub fn first(&self) -> &str {
        match self {
            TextValue::Plain(s) => s,
            TextValue::Lines(lines) => lines.first().map(String::as_str).unwrap_or(""),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            TextValue::Plain(s) => s.is_empty(),
            TextValue::Lines(lines) => lines.is_empty(),
        }
    }
}

impl Default for TextValue {
    fn default() -> Self {
        TextValue::Plain(String::new())
    }
}

impl From<&str> for TextValue {
    fn from(s: &str) -> Self {
        TextValue::Plain(s.to_string())
    }
}

impl From<String> for TextValue {
    fn from(s: String) -> Self {
        TextValue::Plain(s)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextItem {
    #[serde(flatten)]
    pub placement: Placement,
    pub value: TextValue,
    pub color: Option<Color>,
    pub size: Option<f32>,
    pub weight: FontWeight,
    pub align: Option<Align>,
    pub width: Option<Coord>,
    pub full_width: bool,
    /// Extra gap between wrapped lines, in points.
    pub line_gap: Option<f32>,
    /// Extra gap appended after the paragraph, in points.
    pub paragraph_gap: Option<f32>,
    pub move_down: Option<f32>,
    /// Marks a header/footer slot whose value is replaced with the page's
    /// displayed number before each stamp.
    pub page_number: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListItem {
    #[serde(flatten)]
    pub placement: Placement,
    pub value: Vec<String>,
    pub color: Option<Color>,
    pub size: Option<f32>,
    pub line_gap: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableColumn {
    pub header: Option<String>,
    pub data_index: String,
    /// Explicit width in points; measured from cell content when absent.
    pub width: Option<f32>,
    /// Flex columns split the width left over after explicit and measured
    /// columns evenly among themselves.
    pub flex: bool,
    pub align: Option<Align>,
    pub weight: FontWeight,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableTitle {
    pub value: String,
    pub color: Option<Color>,
    pub background_color: Option<Color>,
    pub padding_top: f32,
    pub padding_right: f32,
    pub padding_bottom: f32,
    pub padding_left: f32,
}

/// Shared styling for a table's header row or data cells.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CellDefaults {
    pub color: Option<Color>,
    /// Header fill, or zebra stripe fill for odd data rows.
    pub background_color: Option<Color>,
    pub padding_top: f32,
    pub padding_right: f32,
    pub padding_bottom: f32,
    pub padding_left: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableSummary {
    pub value: String,
    pub color: Option<Color>,
    pub background_color: Option<Color>,
    pub align: Option<Align>,
    pub padding_top: f32,
    pub padding_right: f32,
    pub padding_bottom: f32,
    pub padding_left: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableItem {
    #[serde(flatten)]
    pub placement: Placement,
    pub title: Option<TableTitle>,
    /// Render the header row (and repeat it on continuation pages).
    pub columns_header: Option<bool>,
    pub header_defaults: CellDefaults,
    pub column_defaults: CellDefaults,
    pub columns: Vec<TableColumn>,
    pub rows: Vec<BTreeMap<String, String>>,
    pub summary: Option<TableSummary>,
    pub size: Option<f32>,
    pub color: Option<Color>,
    pub line_color: Option<Color>,
    pub line_gap: Option<f32>,
    pub paragraph_gap: Option<f32>,
}

impl TableItem {
    pub fn columns_header(&self) -> bool {
        self.columns_header.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageItem {
    #[serde(flatten)]
    pub placement: Placement,
    pub value: Binary,
    pub width: Option<Coord>,
    pub height: Option<f32>,
    pub align: Option<Align>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GalleryFigure {
    pub description: String,
    pub image: Binary,
}

/// Caption styling for gallery figures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaptionDefaults {
    pub color: Option<Color>,
    pub size: Option<f32>,
    pub padding_top: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GalleryItem {
    #[serde(flatten)]
    pub placement: Placement,
    /// Figure width; defaults to half the content width minus the gutter.
    pub width: Option<f32>,
    /// Image height for every figure.
    pub height: f32,
    /// Gutter between the two figures of a row.
    pub margin: f32,
    pub values: Vec<GalleryFigure>,
    pub description_defaults: CaptionDefaults,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SignatureItem {
    #[serde(flatten)]
    pub placement: Placement,
    pub title: Option<String>,
    pub printed_name: Option<String>,
    pub signature: Option<Binary>,
    pub license_number: Option<String>,
    /// US state printed in the license-number label.
    pub state: Option<String>,
    pub date: Option<String>,
    pub color: Option<Color>,
    pub size: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RectItem {
    #[serde(flatten)]
    pub placement: Placement,
    pub width: Option<Coord>,
    pub height: f32,
    pub full_width: bool,
    pub background_color: Option<Color>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PolygonItem {
    #[serde(flatten)]
    pub placement: Placement,
    /// Whitespace-separated `x y x y ...` coordinate list.
    pub points: String,
    pub background_color: Option<Color>,
}

impl PolygonItem {
    /// Parse `points` into coordinate pairs; odd trailing values are
    /// dropped.
    pub fn point_pairs(&self) -> Vec<(f32, f32)> {
        let values: Vec<f32> = self
            .points
            .split_whitespace()
            .filter_map(|p| p.parse().ok())
            .collect();
        values.chunks_exact(2).map(|c| (c[0], c[1])).collect()
    }
}

/// The TOC body placeholder; entries are injected from the render session
/// when the table-of-contents page is produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TopicsItem {
    #[serde(flatten)]
    pub placement: Placement,
    pub color: Option<Color>,
    pub size: Option<f32>,
    pub weight: FontWeight,
    pub line_gap: Option<f32>,
}

/// An externally produced sub-document to splice in at this section's
/// position. `value` is the title recorded in the TOC.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PdfItem {
    pub value: Option<String>,
    pub pdf: Option<Binary>,
}

/// The smallest renderable unit. Dispatch is a closed tagged union; an
/// unrecognized `type` tag is a deserialization error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentItem {
    Text(TextItem),
    List(ListItem),
    Table(TableItem),
    Image(ImageItem),
    Gallery(GalleryItem),
    Signature(SignatureItem),
    Rect(RectItem),
    Polygon(PolygonItem),
    Topics(TopicsItem),
    Pdf(PdfItem),
}

impl ContentItem {
    /// The title this item registers in the TOC, if any.
    pub fn title_text(&self) -> Option<&str> {
        match self {
            ContentItem::Text(t) => Some(t.value.first()),
            ContentItem::Pdf(p) => p.value.as_deref(),
            _ => None,
        }
    }

    pub fn placement(&self) -> Option<&Placement> {
        match self {
            ContentItem::Text(i) => Some(&i.placement),
            ContentItem::List(i) => Some(&i.placement),
            ContentItem::Table(i) => Some(&i.placement),
            ContentItem::Image(i) => Some(&i.placement),
            ContentItem::Gallery(i) => Some(&i.placement),
            ContentItem::Signature(i) => Some(&i.placement),
            ContentItem::Rect(i) => Some(&i.placement),
            ContentItem::Polygon(i) => Some(&i.placement),
            ContentItem::Topics(i) => Some(&i.placement),
            ContentItem::Pdf(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Sections and the document
// ---------------------------------------------------------------------------

/// A top-level content grouping corresponding to one TOC entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Section {
    /// Marks an embed placeholder: the section's pages come from an
    /// externally supplied sub-document instead of rendered items.
    pub embed: bool,
    pub items: Vec<ContentItem>,
}

impl Section {
    /// The external payload of an embed placeholder, when present.
    pub fn embed_payload(&self) -> Option<&Binary> {
        if !self.embed {
            return None;
        }
        match self.items.first() {
            Some(ContentItem::Pdf(p)) => p.pdf.as_ref(),
            _ => None,
        }
    }
}

/// Items rendered onto a single logical page: covers, the running header
/// and footer, and the table-of-contents page all share this shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageTemplate {
    pub items: Vec<ContentItem>,
}

/// A font registered by name; bold text resolves `<name>-Bold` first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontSpec {
    pub name: String,
    pub data: Binary,
}

/// The full declarative description of one document build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocumentConfig {
    /// Document title embedded in the PDF metadata.
    pub title: String,
    pub size: PageSize,
    pub margins: Margins,
    pub default_font: String,
    pub fonts: Vec<FontSpec>,
    pub draft_cover: Option<PageTemplate>,
    pub cover: Option<PageTemplate>,
    pub header: Option<PageTemplate>,
    pub footer: Option<PageTemplate>,
    pub table_of_contents: Option<PageTemplate>,
    pub sections: Vec<Section>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            title: "pdf-compose output".to_string(),
            size: PageSize::default(),
            margins: Margins::default(),
            default_font: "Helvetica".to_string(),
            fonts: Vec::new(),
            draft_cover: None,
            cover: None,
            header: None,
            footer: None,
            table_of_contents: None,
            sections: Vec::new(),
        }
    }
}

impl DocumentConfig {
    /// Number of front-matter pages preceding the master body (draft cover
    /// and cover). The auto TOC page lives inside the master itself.
    pub fn page_step(&self) -> u32 {
        self.draft_cover.is_some() as u32 + self.cover.is_some() as u32
    }

    pub fn has_toc(&self) -> bool {
        self.table_of_contents.is_some()
    }

    /// Structural validation, run once before any page is produced.
    pub fn validate(&self) -> Result<()> {
        if self.size.width <= 0.0 || self.size.height <= 0.0 {
            return Err(Error::Configuration(format!(
                "page size must be positive, got {} x {}",
                self.size.width, self.size.height
            )));
        }
        if self.margins.left + self.margins.right >= self.size.width
            || self.margins.top + self.margins.bottom >= self.size.height
        {
            return Err(Error::Configuration(
                "margins leave no content area".to_string(),
            ));
        }
        for (i, section) in self.sections.iter().enumerate() {
            if !section.embed && section.items.is_empty() {
                return Err(Error::Content(format!(
                    "section {} has no content items",
                    i + 1
                )));
            }
            if section.embed {
                if let Some(item) = section.items.first() {
                    if !matches!(item, ContentItem::Pdf(_)) {
                        return Err(Error::Content(format!(
                            "embed section {} must start with a pdf item",
                            i + 1
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_tagged_text_item() {
        let json = r##"{"type": "text", "value": "Hello", "relative": true, "size": 12}"##;
        let item: ContentItem = serde_json::from_str(json).unwrap();
        match item {
            ContentItem::Text(t) => {
                assert_eq!(t.value.first(), "Hello");
                assert!(t.placement.relative);
                assert_eq!(t.size, Some(12.0));
            }
            other => panic!("Expected text item, got {other:?}"),
        }
    }

    #[test]
    fn unknown_item_type_is_rejected() {
        let json = r##"{"type": "marquee", "value": "nope"}"##;
        let result: std::result::Result<ContentItem, _> = serde_json::from_str(json);
        assert!(result.is_err(), "unknown type tag must not deserialize");
    }

    #[test]
    fn coord_roundtrips_as_number() {
        let coord: Coord = serde_json::from_str("42.5").unwrap();
        assert!(matches!(coord, Coord::Literal(v) if (v - 42.5).abs() < f32::EPSILON));
        assert_eq!(serde_json::to_string(&coord).unwrap(), "42.5");
    }

    #[test]
    fn computed_coord_resolves_against_context() {
        let ctx = PageContext {
            page_width: 595.28,
            page_height: 841.89,
            margins: Margins::uniform(40.0),
            cursor_y: 100.0,
            page_number: 1,
        };
        let coord = Coord::Computed(|ctx| ctx.content_right() - 50.0);
        assert!((coord.resolve(&ctx) - (595.28 - 40.0 - 50.0)).abs() < 0.01);
    }

    #[test]
    fn color_hex_parse() {
        let c = Color::from_hex("#336699").unwrap();
        assert!((c.r - 0.2).abs() < 0.01);
        assert_eq!(c.to_hex(), "#336699");
        assert!(Color::from_hex("bogus").is_err());
    }

    #[test]
    fn binary_data_uri_decodes() {
        let b = Binary::DataUri("data:image/png;base64,aGVsbG8=".to_string());
        assert_eq!(b.bytes().unwrap().as_ref(), b"hello");
    }

    #[test]
    fn validate_rejects_empty_body_section() {
        let config = DocumentConfig {
            sections: vec![Section::default()],
            ..DocumentConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Content(_))));
    }

    #[test]
    fn embed_payload_extraction() {
        let section = Section {
            embed: true,
            items: vec![ContentItem::Pdf(PdfItem {
                value: Some("Appendix".to_string()),
                pdf: Some(Binary::Bytes(vec![1, 2, 3])),
            })],
        };
        assert!(section.embed_payload().is_some());
        assert_eq!(section.items[0].title_text(), Some("Appendix"));
    }
}
