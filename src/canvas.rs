//! Buffered multi-page canvas – records drawing ops per page and emits PDF
//! bytes using `printpdf` (v0.8 ops-based API).
//!
//! Pages are kept in memory until the whole body is laid out, so headers,
//! footers, and the table of contents can be stamped over already-rendered
//! pages before serialization. Coordinates use a top-left origin; the
//! conversion to PDF's bottom-left origin happens here.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use printpdf::*;

use crate::content::{Color as ContentColor, FontWeight, Margins, PageSize};
use crate::error::{Error, Result};

/// Baseline offset from the top of a text line, as a fraction of the font
/// size (ascender approximation for the built-in faces).
const ASCENDER_FACTOR: f32 = 0.75;

/// A registered XObject together with the pixel dimensions of the source
/// image.
struct ImageResource {
    xobj_id: XObjectId,
    px_width: u32,
    px_height: u32,
}

/// Map a font family name onto the nearest built-in PDF font for drawing.
/// Measurement uses registered TTF metrics (see [`crate::fonts`]); drawing
/// sticks to the 14 standard faces.
pub fn builtin_font(family: &str, weight: FontWeight) -> BuiltinFont {
    let bold = weight == FontWeight::Bold || family.ends_with("-Bold");
    let base = family.trim_end_matches("-Bold");
    if base.starts_with("Times") {
        if bold {
            BuiltinFont::TimesBold
        } else {
            BuiltinFont::TimesRoman
        }
    } else if base.starts_with("Courier") {
        if bold {
            BuiltinFont::CourierBold
        } else {
            BuiltinFont::Courier
        }
    } else if bold {
        BuiltinFont::HelveticaBold
    } else {
        BuiltinFont::Helvetica
    }
}

/// Convert a UTF-8 string to raw Windows-1252 bytes then wrap in a String
/// so printpdf writes the bytes unchanged into the PDF stream (builtin
/// fonts use WinAnsiEncoding, so each glyph is one byte 0x00–0xFF).
fn to_winlatin(s: &str) -> String {
    let bytes: Vec<u8> = s
        .chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80, // euro
            '\u{201A}' => 0x82, // single low-9 quote
            '\u{201E}' => 0x84, // double low-9 quote
            '\u{2026}' => 0x85, // ellipsis
            '\u{2018}' => 0x91, // left single quote
            '\u{2019}' => 0x92, // right single quote
            '\u{201C}' => 0x93, // left double quote
            '\u{201D}' => 0x94, // right double quote
            '\u{2022}' => 0x95, // bullet
            '\u{2013}' => 0x96, // en-dash
            '\u{2014}' => 0x97, // em-dash
            '\u{2122}' => 0x99, // trademark
            '\u{00A0}' => 0x20, // non-breaking space -> space
            c if (c as u32) < 256 => c as u8,
            _ => b'?',
        })
        .collect();
    // SAFETY: intentionally non-UTF-8 for 0x80-0x9F range; printpdf passes
    // these bytes straight to the PDF stream, decoded by WinAnsiEncoding.
    #[allow(unsafe_code)]
    unsafe {
        String::from_utf8_unchecked(bytes)
    }
}

fn rgb(c: ContentColor) -> Color {
    Color::Rgb(Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
        icc_profile: None,
    })
}

/// A buffered multi-page drawing surface.
pub struct Canvas {
    doc: PdfDocument,
    pages: Vec<Vec<Op>>,
    current: usize,
    page_width: f32,
    page_height: f32,
    margins: Margins,
    images: HashMap<u64, ImageResource>,
}

impl Canvas {
    pub fn new(title: &str, size: PageSize, margins: Margins) -> Self {
        Self {
            doc: PdfDocument::new(title),
            pages: Vec::new(),
            current: 0,
            page_width: size.width,
            page_height: size.height,
            margins,
            images: HashMap::new(),
        }
    }

    pub fn page_width(&self) -> f32 {
        self.page_width
    }

    pub fn page_height(&self) -> f32 {
        self.page_height
    }

    pub fn margins(&self) -> Margins {
        self.margins
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Append a fresh page and make it current.
    pub fn add_page(&mut self) {
        self.pages.push(Vec::new());
        self.current = self.pages.len() - 1;
    }

    /// Make an already-buffered page current for further drawing.
    pub fn switch_to_page(&mut self, index: usize) {
        debug_assert!(index < self.pages.len(), "page {index} not buffered");
        self.current = index.min(self.pages.len().saturating_sub(1));
    }

    fn ops(&mut self) -> &mut Vec<Op> {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        &mut self.pages[self.current]
    }

    /// Draw one line of text with its top edge at `y`.
    pub fn draw_text_line(
        &mut self,
        x: f32,
        y: f32,
        text: &str,
        family: &str,
        weight: FontWeight,
        size: f32,
        color: ContentColor,
    ) {
        if text.is_empty() {
            return;
        }
        let font = builtin_font(family, weight);
        let pdf_y = self.page_height - y - size * ASCENDER_FACTOR;
        let ops = self.ops();
        ops.push(Op::StartTextSection);
        ops.push(Op::SetTextCursor {
            pos: Point {
                x: Pt(x),
                y: Pt(pdf_y),
            },
        });
        ops.push(Op::SetFontSizeBuiltinFont {
            size: Pt(size),
            font,
        });
        ops.push(Op::SetFillColor { col: rgb(color) });
        ops.push(Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(to_winlatin(text))],
            font,
        });
        ops.push(Op::EndTextSection);
    }

    /// Draw pre-wrapped lines stacked `line_height` apart, top edge at `y`.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_text_lines(
        &mut self,
        x: f32,
        y: f32,
        lines: &[String],
        family: &str,
        weight: FontWeight,
        size: f32,
        color: ContentColor,
        line_height: f32,
    ) {
        for (i, line) in lines.iter().enumerate() {
            self.draw_text_line(x, y + i as f32 * line_height, line, family, weight, size, color);
        }
    }

    /// Filled rectangle with its top-left corner at `(x, y)`.
    pub fn draw_rect(&mut self, x: f32, y: f32, width: f32, height: f32, fill: ContentColor) {
        let y_bottom = self.page_height - y - height;
        let y_top = self.page_height - y;
        let points = [
            (x, y_bottom),
            (x + width, y_bottom),
            (x + width, y_top),
            (x, y_top),
        ];
        let ring = PolygonRing {
            points: points
                .iter()
                .map(|&(px, py)| LinePoint {
                    p: Point {
                        x: Pt(px),
                        y: Pt(py),
                    },
                    bezier: false,
                })
                .collect(),
        };
        let ops = self.ops();
        ops.push(Op::SetFillColor { col: rgb(fill) });
        ops.push(Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![ring],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            },
        });
    }

    /// Stroked line between two top-left-origin points.
    pub fn draw_line(
        &mut self,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        color: ContentColor,
        thickness: f32,
    ) {
        let page_height = self.page_height;
        let ops = self.ops();
        ops.push(Op::SetOutlineColor { col: rgb(color) });
        ops.push(Op::SetOutlineThickness { pt: Pt(thickness) });
        ops.push(Op::DrawLine {
            line: Line {
                points: vec![
                    LinePoint {
                        p: Point {
                            x: Pt(x1),
                            y: Pt(page_height - y1),
                        },
                        bezier: false,
                    },
                    LinePoint {
                        p: Point {
                            x: Pt(x2),
                            y: Pt(page_height - y2),
                        },
                        bezier: false,
                    },
                ],
                is_closed: false,
            },
        });
    }

    /// Filled polygon from top-left-origin points.
    pub fn draw_polygon(&mut self, points: &[(f32, f32)], fill: ContentColor) {
        if points.len() < 3 {
            return;
        }
        let page_height = self.page_height;
        let ring = PolygonRing {
            points: points
                .iter()
                .map(|&(px, py)| LinePoint {
                    p: Point {
                        x: Pt(px),
                        y: Pt(page_height - py),
                    },
                    bezier: false,
                })
                .collect(),
        };
        let ops = self.ops();
        ops.push(Op::SetFillColor { col: rgb(fill) });
        ops.push(Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![ring],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            },
        });
    }

    /// Draw an image with its top-left corner at `(x, y)`.
    ///
    /// Missing dimensions are filled in from the source aspect ratio.
    /// Returns the `(width, height)` actually occupied. Identical byte
    /// payloads share one XObject.
    pub fn draw_image(
        &mut self,
        bytes: &[u8],
        x: f32,
        y: f32,
        width: Option<f32>,
        height: Option<f32>,
    ) -> Result<(f32, f32)> {
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        let key = hasher.finish();

        if !self.images.contains_key(&key) {
            let dyn_img = ::image::load_from_memory(bytes)
                .map_err(|e| Error::Asset(format!("image decode error: {e}")))?;
            let (px_width, px_height) = (dyn_img.width(), dyn_img.height());

            let mut warnings: Vec<PdfWarnMsg> = Vec::new();
            let raw = RawImage::decode_from_bytes(bytes, &mut warnings)
                .map_err(|e| Error::Asset(format!("image encode error: {e}")))?;
            let xobj_id = self.doc.add_image(&raw);
            self.images.insert(
                key,
                ImageResource {
                    xobj_id,
                    px_width,
                    px_height,
                },
            );
        }
        let res = &self.images[&key];

        let (px_w, px_h) = (res.px_width.max(1) as f32, res.px_height.max(1) as f32);
        let (w, h) = match (width, height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => (w, w * px_h / px_w),
            (None, Some(h)) => (h * px_w / px_h, h),
            (None, None) => (px_w, px_h),
        };

        // At dpi=72 printpdf renders 1 px = 1 pt, so scale = pt / px.
        let transform = XObjectTransform {
            translate_x: Some(Pt(x)),
            translate_y: Some(Pt(self.page_height - y - h)),
            dpi: Some(72.0),
            scale_x: Some(w / px_w),
            scale_y: Some(h / px_h),
            rotate: None,
        };
        let id = res.xobj_id.clone();
        self.ops().push(Op::UseXobject { id, transform });
        Ok((w, h))
    }

    /// Serialize all buffered pages to PDF bytes.
    pub fn serialize(mut self) -> Vec<u8> {
        let page_w = Mm(self.page_width * 0.352778); // pt → mm
        let page_h = Mm(self.page_height * 0.352778);

        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        let pages: Vec<PdfPage> = self
            .pages
            .into_iter()
            .map(|ops| PdfPage::new(page_w, page_h, ops))
            .collect();

        self.doc.with_pages(pages);
        self.doc.save(&PdfSaveOptions::default(), &mut Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_canvas() -> Canvas {
        Canvas::new("test", PageSize::a4(), Margins::uniform(40.0))
    }

    #[test]
    fn builtin_font_mapping() {
        assert_eq!(
            builtin_font("Times-Roman", FontWeight::Normal),
            BuiltinFont::TimesRoman
        );
        assert_eq!(
            builtin_font("Times-Roman", FontWeight::Bold),
            BuiltinFont::TimesBold
        );
        assert_eq!(
            builtin_font("Times-Roman-Bold", FontWeight::Normal),
            BuiltinFont::TimesBold
        );
        assert_eq!(
            builtin_font("Anything Else", FontWeight::Normal),
            BuiltinFont::Helvetica
        );
    }

    #[test]
    fn serialize_empty_canvas_is_valid_pdf() {
        let bytes = test_canvas().serialize();
        assert!(bytes.len() > 100);
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn pages_accumulate_and_switch() {
        let mut canvas = test_canvas();
        canvas.add_page();
        canvas.add_page();
        assert_eq!(canvas.page_count(), 2);

        canvas.switch_to_page(0);
        canvas.draw_text_line(
            40.0,
            40.0,
            "back on page one",
            "Helvetica",
            FontWeight::Normal,
            12.0,
            ContentColor::BLACK,
        );
        let bytes = canvas.serialize();
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn draw_image_rejects_garbage() {
        let mut canvas = test_canvas();
        canvas.add_page();
        let err = canvas
            .draw_image(&[0u8; 16], 0.0, 0.0, Some(100.0), None)
            .unwrap_err();
        assert!(matches!(err, Error::Asset(_)));
    }

    #[test]
    fn winlatin_maps_smart_punctuation() {
        let s = to_winlatin("a\u{2013}b");
        assert_eq!(s.as_bytes(), &[b'a', 0x96, b'b']);
    }
}
