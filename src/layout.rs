//! Layout engine – converts sections of content items into a linear page
//! sequence on a [`Canvas`], producing table-of-contents records as pages
//! are discovered.
//!
//! All layout state lives in an explicit [`RenderSession`] owned by one
//! engine for the life of one build: the flow cursor, the current page and
//! section, and the TOC map. Flow (`relative`) items advance the cursor by
//! `margin_top + height + margin_bottom`; absolute items ignore it.
//!
//! The overflow rule: before placing an item, if the cursor plus the item
//! height passes the bottom margin, a new page starts first. An item
//! taller than a whole page's content area is rendered anyway on that one
//! page, which guarantees termination.

use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::canvas::Canvas;
use crate::content::{
    Align, Color, ContentItem, FontWeight, GalleryItem, ImageItem, ListItem, PageContext,
    PageTemplate, PolygonItem, RectItem, Section, SignatureItem, TableItem, TextItem, TextValue,
    TopicsItem,
};
use crate::error::{Error, Result};
use crate::fonts::FontManager;

/// Font size used when an item does not specify one.
pub const DEFAULT_FONT_SIZE: f32 = 12.0;

/// Indent applied per TOC nesting level, in points.
const TOPIC_INDENT: f32 = 20.0;

/// A section or subsection title with its resolved page numbers.
///
/// `original_page` is fixed the first time a page starts for the section;
/// `page` starts equal to it and is only ever rewritten by the pagination
/// reconciler once embedded page counts are known.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TocEntry {
    pub title: String,
    pub original_page: Option<u32>,
    pub page: u32,
    pub children: Vec<TocEntry>,
}

impl TocEntry {
    fn at_page(title: &str, page: u32) -> Self {
        Self {
            title: title.to_string(),
            original_page: Some(page),
            page,
            children: Vec::new(),
        }
    }
}

/// Mutable state threaded through one layout pass. Never shared across
/// documents.
#[derive(Debug)]
pub struct RenderSession {
    /// Displayed number of the current page, including the front-matter
    /// offset and one reserved number per embed placeholder.
    pub current_page: u32,
    /// 1-based index of the section being rendered; 0 outside sections.
    pub current_section: usize,
    /// Flow cursor, top-left origin.
    pub cursor_y: f32,
    /// When false (covers, header/footer stamping) overflow is accepted
    /// instead of starting new pages.
    pub paginate: bool,
    /// TOC entries keyed by 1-based section index.
    pub toc: BTreeMap<usize, TocEntry>,
}

impl RenderSession {
    pub fn new(starting_page: u32) -> Self {
        Self {
            current_page: starting_page,
            current_section: 0,
            cursor_y: 0.0,
            paginate: true,
            toc: BTreeMap::new(),
        }
    }
}

/// Drives one layout pass over a canvas.
pub struct LayoutEngine<'a> {
    canvas: &'a mut Canvas,
    fonts: &'a FontManager,
    default_font: String,
    pub session: RenderSession,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(
        canvas: &'a mut Canvas,
        fonts: &'a FontManager,
        default_font: &str,
        starting_page: u32,
    ) -> Self {
        Self {
            canvas,
            fonts,
            default_font: default_font.to_string(),
            session: RenderSession::new(starting_page),
        }
    }

    // -- geometry helpers ---------------------------------------------------

    fn content_top(&self) -> f32 {
        self.canvas.margins().top
    }

    fn content_bottom(&self) -> f32 {
        self.canvas.page_height() - self.canvas.margins().bottom
    }

    fn content_left(&self) -> f32 {
        self.canvas.margins().left
    }

    fn content_right(&self) -> f32 {
        self.canvas.page_width() - self.canvas.margins().right
    }

    fn content_width(&self) -> f32 {
        self.content_right() - self.content_left()
    }

    fn ctx(&self) -> PageContext {
        PageContext {
            page_width: self.canvas.page_width(),
            page_height: self.canvas.page_height(),
            margins: self.canvas.margins(),
            cursor_y: self.session.cursor_y,
            page_number: self.session.current_page,
        }
    }

    // -- page flow ----------------------------------------------------------

    /// Start a new page: advance the page number, reset the cursor, and
    /// record the section's first page the first time one starts for it.
    pub fn start_page(&mut self) {
        self.canvas.add_page();
        self.session.current_page += 1;
        self.session.cursor_y = self.content_top();

        let page = self.session.current_page;
        if let Some(entry) = self.session.toc.get_mut(&self.session.current_section) {
            if entry.original_page.is_none() {
                entry.original_page = Some(page);
                entry.page = page;
            }
        }
    }

    /// The overflow rule: break to a new page when `height` does not fit
    /// below the cursor, unless the cursor is already at the top of a
    /// fresh page (oversized items render there and overflow is accepted).
    fn break_page_if_needed(&mut self, height: f32) {
        if !self.session.paginate {
            return;
        }
        if self.session.cursor_y + height > self.content_bottom()
            && self.session.cursor_y > self.content_top() + 0.01
        {
            self.start_page();
        }
    }

    // -- sections -----------------------------------------------------------

    /// Render all sections. When `reserve_toc_page` is set the first page
    /// of the canvas is left for the table of contents, rendered after
    /// reconciliation.
    pub fn render_sections(&mut self, sections: &[Section], reserve_toc_page: bool) -> Result<()> {
        if reserve_toc_page {
            self.start_page();
        }

        for (i, section) in sections.iter().enumerate() {
            self.session.current_section = i + 1;

            if !section.embed {
                self.session
                    .toc
                    .insert(self.session.current_section, TocEntry::default());
                self.start_page();
                self.render_items(&section.items)?;
            } else if let Some(item) = section.items.first() {
                // Embed placeholder: reserve exactly one page number; the
                // real pages are spliced in by the composer.
                self.session.current_page += 1;
                self.session.toc.insert(
                    self.session.current_section,
                    TocEntry::at_page(
                        item.title_text().unwrap_or_default(),
                        self.session.current_page,
                    ),
                );
            }
        }
        Ok(())
    }

    /// Render a template onto the current page from the top margin, with
    /// pagination disabled (covers, headers, footers).
    pub fn render_overlay(&mut self, items: &[ContentItem]) -> Result<()> {
        let was_paginating = self.session.paginate;
        self.session.paginate = false;
        self.session.cursor_y = self.content_top();
        let result = self.render_items(items);
        self.session.paginate = was_paginating;
        result
    }

    /// Render the table-of-contents template onto the reserved first page.
    /// Runs after reconciliation; a TOC long enough to overflow continues
    /// on pages appended after the body.
    pub fn render_contents_page(&mut self, items: &[ContentItem]) -> Result<()> {
        if self.canvas.page_count() == 0 {
            self.start_page();
        }
        self.canvas.switch_to_page(0);
        self.session.cursor_y = self.content_top();
        self.render_items(items)
    }

    /// Stamp the running header and footer over every buffered page. The
    /// footer's page-number slot displays the page's final 1-based
    /// position: physical index + 1 + the front-matter offset.
    pub fn stamp_headers_footers(
        &mut self,
        header: Option<&PageTemplate>,
        footer: Option<&PageTemplate>,
        page_step: u32,
    ) -> Result<()> {
        for i in 0..self.canvas.page_count() {
            self.canvas.switch_to_page(i);
            if let Some(header) = header {
                self.render_overlay(&header.items)?;
            }
            if let Some(footer) = footer {
                let display = i as u32 + 1 + page_step;
                let items = substitute_page_number(&footer.items, display);
                self.render_overlay(&items)?;
            }
        }
        Ok(())
    }

    // -- item dispatch ------------------------------------------------------

    pub fn render_items(&mut self, items: &[ContentItem]) -> Result<()> {
        for item in items {
            if let Some(placement) = item.placement() {
                if placement.is_title {
                    if let (Some(entry), Some(title)) = (
                        self.session.toc.get_mut(&self.session.current_section),
                        item.title_text(),
                    ) {
                        entry.title = title.to_string();
                    }
                } else if placement.is_subtitle {
                    let page = self.session.current_page;
                    if let (Some(entry), Some(title)) = (
                        self.session.toc.get_mut(&self.session.current_section),
                        item.title_text(),
                    ) {
                        entry.children.push(TocEntry::at_page(title, page));
                    }
                }
            }

            match item {
                ContentItem::Text(text) => self.render_text(text)?,
                ContentItem::List(list) => self.render_list(list)?,
                ContentItem::Table(table) => self.render_table(table)?,
                ContentItem::Image(image) => self.render_image(image)?,
                ContentItem::Gallery(gallery) => self.render_gallery(gallery)?,
                ContentItem::Signature(signature) => self.render_signature(signature)?,
                ContentItem::Rect(rect) => self.render_rect(rect)?,
                ContentItem::Polygon(polygon) => self.render_polygon(polygon)?,
                ContentItem::Topics(topics) => {
                    let entries: Vec<TocEntry> = self.session.toc.values().cloned().collect();
                    self.render_topics(topics, &entries)?;
                }
                // The payload is consumed by the reconciler; nothing draws.
                ContentItem::Pdf(_) => {}
            }
        }
        Ok(())
    }

    // -- text ---------------------------------------------------------------

    /// Wrap, align, and draw one string. Returns the height consumed.
    #[allow(clippy::too_many_arguments)]
    fn draw_wrapped(
        &mut self,
        x: f32,
        y: f32,
        text: &str,
        weight: FontWeight,
        size: f32,
        color: Color,
        width: Option<f32>,
        align: Align,
        line_gap: Option<f32>,
    ) -> f32 {
        let family = self.default_font.clone();
        let line_height = self.fonts.line_height(size, line_gap);
        let lines = match width {
            Some(w) => self.fonts.wrap_text(text, &family, weight, size, w),
            None => text.split('\n').map(str::to_string).collect(),
        };
        self.draw_lines_aligned(x, y, &lines, weight, size, color, width, align, line_height);
        lines.len() as f32 * line_height
    }

    fn render_text(&mut self, item: &TextItem) -> Result<()> {
        let size = item.size.unwrap_or(DEFAULT_FONT_SIZE);
        let color = item.color.unwrap_or(Color::BLACK);
        let align = item.align.unwrap_or_default();
        let ctx = self.ctx();
        let width = if item.full_width {
            Some(ctx.content_width())
        } else {
            item.width.map(|w| w.resolve(&ctx))
        };

        let family = self.default_font.clone();
        let lines: Vec<String> = match &item.value {
            TextValue::Plain(s) => match width {
                Some(w) => self.fonts.wrap_text(s, &family, item.weight, size, w),
                None => s.split('\n').map(str::to_string).collect(),
            },
            TextValue::Lines(rows) => rows
                .iter()
                .flat_map(|row| match width {
                    Some(w) => self.fonts.wrap_text(row, &family, item.weight, size, w),
                    None => vec![row.clone()],
                })
                .collect(),
        };

        let line_height = self.fonts.line_height(size, item.line_gap);
        let height = lines.len() as f32 * line_height + item.paragraph_gap.unwrap_or(0.0);

        if item.placement.relative {
            self.session.cursor_y += item.placement.margin_top;
            self.break_page_if_needed(height);
            let x = item
                .placement
                .left
                .map(|l| l.resolve(&self.ctx()))
                .unwrap_or_else(|| self.content_left());
            let y = self.session.cursor_y;
            self.draw_lines_aligned(x, y, &lines, item.weight, size, color, width, align, line_height);
            self.session.cursor_y += height + item.placement.margin_bottom;
        } else {
            let ctx = self.ctx();
            let x = item
                .placement
                .left
                .map(|l| l.resolve(&ctx))
                .unwrap_or_else(|| self.content_left());
            let y = item
                .placement
                .top
                .map(|t| t.resolve(&ctx))
                .unwrap_or(self.session.cursor_y);
            self.draw_lines_aligned(x, y, &lines, item.weight, size, color, width, align, line_height);
        }

        if let Some(n) = item.move_down {
            self.session.cursor_y += n * line_height;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_lines_aligned(
        &mut self,
        x: f32,
        y: f32,
        lines: &[String],
        weight: FontWeight,
        size: f32,
        color: Color,
        width: Option<f32>,
        align: Align,
        line_height: f32,
    ) {
        let family = self.default_font.clone();
        for (i, line) in lines.iter().enumerate() {
            let line_x = match (align, width) {
                (Align::Left, _) | (_, None) => x,
                (a, Some(w)) => {
                    let lw = self.fonts.measure_width(line, &family, weight, size);
                    match a {
                        Align::Center => x + (w - lw) / 2.0,
                        Align::Right => x + w - lw,
                        Align::Left => x,
                    }
                }
            };
            self.canvas.draw_text_line(
                line_x,
                y + i as f32 * line_height,
                line,
                &family,
                weight,
                size,
                color,
            );
        }
    }

    fn render_list(&mut self, item: &ListItem) -> Result<()> {
        let size = item.size.unwrap_or(DEFAULT_FONT_SIZE);
        let color = item.color.unwrap_or(Color::BLACK);
        let line_height = self.fonts.line_height(size, item.line_gap);
        let height = item.value.len() as f32 * line_height;

        let (x, y) = if item.placement.relative {
            self.session.cursor_y += item.placement.margin_top;
            self.break_page_if_needed(height);
            (self.content_left(), self.session.cursor_y)
        } else {
            let ctx = self.ctx();
            (
                item.placement
                    .left
                    .map(|l| l.resolve(&ctx))
                    .unwrap_or_else(|| self.content_left()),
                item.placement
                    .top
                    .map(|t| t.resolve(&ctx))
                    .unwrap_or(self.session.cursor_y),
            )
        };

        let family = self.default_font.clone();
        for (i, entry) in item.value.iter().enumerate() {
            let line = format!("\u{2022} {entry}");
            self.canvas.draw_text_line(
                x,
                y + i as f32 * line_height,
                &line,
                &family,
                FontWeight::Normal,
                size,
                color,
            );
        }

        if item.placement.relative {
            self.session.cursor_y += height + item.placement.margin_bottom;
        }
        Ok(())
    }

    // -- tables -------------------------------------------------------------

    fn render_table(&mut self, item: &TableItem) -> Result<()> {
        if item.columns.is_empty() {
            return Err(Error::Content("table has no columns".to_string()));
        }

        let size = item.size.unwrap_or(DEFAULT_FONT_SIZE);
        let color = item.color.unwrap_or(Color::BLACK);
        let line_height = self.fonts.line_height(size, item.line_gap);
        let content_width = self.content_width();
        let x0 = self.content_left();

        self.session.cursor_y += item.placement.margin_top + 2.0 * line_height;

        let widths =
            resolve_column_widths(self.fonts, &self.default_font, item, content_width, size);

        self.render_table_title(item, false, size, color)?;
        self.render_table_header(item, &widths, size, color)?;

        if let Some(line_color) = item.line_color {
            let y = self.session.cursor_y;
            self.canvas
                .draw_line(x0, y, self.content_right(), y, line_color, 0.5);
        }

        let pad = &item.column_defaults;
        for (r, row) in item.rows.iter().enumerate() {
            // Tallest cell decides the row height.
            let mut cell_height = 0.0f32;
            for (c, column) in item.columns.iter().enumerate() {
                if let Some(value) = row.get(&column.data_index) {
                    let cell_width = widths[c] - pad.padding_left - pad.padding_right;
                    let h = self.fonts.measure_height(
                        value,
                        &self.default_font,
                        column.weight,
                        size,
                        Some(cell_width.max(1.0)),
                        item.line_gap,
                        None,
                    );
                    cell_height = cell_height.max(h);
                }
            }
            cell_height += pad.padding_top + pad.padding_bottom;

            if self.session.paginate
                && self.session.cursor_y + cell_height > self.content_bottom()
            {
                self.start_page();
                self.render_table_title(item, true, size, color)?;
                self.render_table_header(item, &widths, size, color)?;
            }

            if let Some(stripe) = pad.background_color {
                if r % 2 != 0 {
                    self.canvas.draw_rect(
                        x0,
                        self.session.cursor_y,
                        content_width,
                        cell_height,
                        stripe,
                    );
                }
            }

            let mut cell_x = x0;
            let y = self.session.cursor_y;
            for (c, column) in item.columns.iter().enumerate() {
                let value = row.get(&column.data_index).cloned().unwrap_or_default();
                let cell_width = widths[c] - pad.padding_left - pad.padding_right;
                self.draw_wrapped(
                    cell_x + pad.padding_left,
                    y + pad.padding_top,
                    &value,
                    column.weight,
                    size,
                    pad.color.unwrap_or(color),
                    Some(cell_width.max(1.0)),
                    column.align.unwrap_or_default(),
                    item.line_gap,
                );
                cell_x += widths[c];

                if let Some(line_color) = item.line_color {
                    if c < item.columns.len() - 1 {
                        self.canvas
                            .draw_line(cell_x, y, cell_x, y + cell_height, line_color, 0.5);
                    }
                }
            }

            self.session.cursor_y += cell_height;

            if let Some(line_color) = item.line_color {
                let y = self.session.cursor_y;
                self.canvas
                    .draw_line(x0, y, self.content_right(), y, line_color, 0.5);
            }
        }

        if let Some(summary) = &item.summary {
            let summary_width =
                content_width - summary.padding_left - summary.padding_right;
            let text_height = self.fonts.measure_height(
                &summary.value,
                &self.default_font,
                FontWeight::Bold,
                size,
                Some(summary_width.max(1.0)),
                item.line_gap,
                None,
            );
            let summary_height = text_height + summary.padding_top + summary.padding_bottom;
            self.break_page_if_needed(summary_height);

            let y = self.session.cursor_y;
            if let Some(bg) = summary.background_color {
                self.canvas
                    .draw_rect(x0, y, content_width, summary_height, bg);
            }
            self.draw_wrapped(
                x0 + summary.padding_left,
                y + summary.padding_top,
                &summary.value,
                FontWeight::Bold,
                size,
                summary.color.unwrap_or(color),
                Some(summary_width.max(1.0)),
                summary.align.unwrap_or_default(),
                item.line_gap,
            );
            self.session.cursor_y += summary_height;

            if let Some(line_color) = item.line_color {
                let y = self.session.cursor_y;
                self.canvas
                    .draw_line(x0, y, self.content_right(), y, line_color, 0.5);
            }
        }

        self.session.cursor_y += 2.0 * line_height + item.placement.margin_bottom;
        Ok(())
    }

    /// Table title bar; `continued` re-renders it on a continuation page
    /// with the `" continued"` suffix.
    fn render_table_title(
        &mut self,
        item: &TableItem,
        continued: bool,
        size: f32,
        color: Color,
    ) -> Result<()> {
        let Some(title) = &item.title else {
            return Ok(());
        };
        if title.value.is_empty() {
            return Ok(());
        }

        let value = if continued {
            format!("{} continued", title.value)
        } else {
            title.value.clone()
        };

        let content_width = self.content_width();
        let x0 = self.content_left();
        let text_width = content_width - title.padding_right;
        let text_height = self.fonts.measure_height(
            &value,
            &self.default_font,
            FontWeight::Bold,
            size,
            Some(text_width.max(1.0)),
            item.line_gap,
            None,
        );
        let title_height = text_height + title.padding_top + title.padding_bottom;

        // Doubled check keeps the title on the same page as the first row.
        if self.session.paginate
            && self.session.cursor_y + 2.0 * title_height > self.content_bottom()
            && self.session.cursor_y > self.content_top() + 0.01
        {
            self.start_page();
        }

        let y = self.session.cursor_y;
        let text_color = if title.background_color.is_some() {
            title.color.unwrap_or(color)
        } else {
            color
        };
        if let Some(bg) = title.background_color {
            self.canvas.draw_rect(x0, y, content_width, title_height, bg);
        }
        self.draw_wrapped(
            x0 + title.padding_left,
            y + title.padding_top,
            &value,
            FontWeight::Bold,
            size,
            text_color,
            Some(text_width.max(1.0)),
            Align::Left,
            item.line_gap,
        );
        self.session.cursor_y += title_height;
        Ok(())
    }

    /// Header row; repeated with the same widths on continuation pages.
    fn render_table_header(
        &mut self,
        item: &TableItem,
        widths: &[f32],
        size: f32,
        color: Color,
    ) -> Result<()> {
        if !item.columns_header() {
            return Ok(());
        }

        let defaults = &item.header_defaults;
        let mut header_height = 0.0f32;
        for (c, column) in item.columns.iter().enumerate() {
            let value = column.header.as_deref().unwrap_or("");
            let h = self.fonts.measure_height(
                value,
                &self.default_font,
                FontWeight::Bold,
                size,
                Some(widths[c].max(1.0)),
                item.line_gap,
                None,
            );
            header_height = header_height.max(h);
        }
        header_height += defaults.padding_top + defaults.padding_bottom;

        // Doubled check keeps the header with at least one data row.
        if self.session.paginate
            && self.session.cursor_y + 2.0 * header_height > self.content_bottom()
            && self.session.cursor_y > self.content_top() + 0.01
        {
            self.start_page();
        }

        let y = self.session.cursor_y;
        let mut header_x = self.content_left();
        for (c, column) in item.columns.iter().enumerate() {
            let value = column.header.as_deref().unwrap_or("");

            if let Some(bg) = defaults.background_color {
                self.canvas.draw_rect(header_x, y, widths[c], header_height, bg);
            }

            let cell_width = widths[c] - defaults.padding_left - defaults.padding_right;
            self.draw_wrapped(
                header_x + defaults.padding_left,
                y + defaults.padding_top,
                value,
                FontWeight::Bold,
                size,
                defaults.color.unwrap_or(color),
                Some(cell_width.max(1.0)),
                column.align.unwrap_or_default(),
                item.line_gap,
            );
            header_x += widths[c];
        }

        self.session.cursor_y += header_height;
        Ok(())
    }

    // -- images and galleries -----------------------------------------------

    fn render_image(&mut self, item: &ImageItem) -> Result<()> {
        let ctx = self.ctx();
        let width = item.width.map(|w| w.resolve(&ctx));

        let bytes = match item.value.bytes() {
            Ok(b) => b.into_owned(),
            Err(e) => {
                warn!("Skipping image — {e}");
                return Ok(());
            }
        };

        let (x, y) = if item.placement.relative {
            self.session.cursor_y += item.placement.margin_top;
            if let Some(h) = item.height {
                self.break_page_if_needed(h);
            }
            (self.content_left(), self.session.cursor_y)
        } else {
            let ctx = self.ctx();
            (
                item.placement
                    .left
                    .map(|l| l.resolve(&ctx))
                    .unwrap_or_else(|| self.content_left()),
                item.placement
                    .top
                    .map(|t| t.resolve(&ctx))
                    .unwrap_or(self.session.cursor_y),
            )
        };

        let x = if item.align == Some(Align::Center) {
            self.canvas.page_width() / 2.0 - width.unwrap_or(0.0) / 2.0
        } else {
            x
        };

        match self.canvas.draw_image(&bytes, x, y, width, item.height) {
            Ok((_, drawn_height)) => {
                if item.placement.relative {
                    self.session.cursor_y += drawn_height + item.placement.margin_bottom;
                }
            }
            Err(e) => warn!("Skipping image — {e}"),
        }
        Ok(())
    }

    fn render_gallery(&mut self, item: &GalleryItem) -> Result<()> {
        if item.values.is_empty() {
            return Ok(());
        }
        if item.height <= 0.0 {
            return Err(Error::Content("gallery requires a figure height".to_string()));
        }

        let caption_size = item.description_defaults.size.unwrap_or(DEFAULT_FONT_SIZE);
        let caption_color = item.description_defaults.color.unwrap_or(Color::BLACK);
        let caption_line_height = self.fonts.line_height(caption_size, None);
        let content_width = self.content_width();
        let width = item
            .width
            .unwrap_or((content_width - item.margin) / 2.0);
        let x0 = self.content_left();

        self.session.cursor_y += item.placement.margin_top + 2.0 * caption_line_height;

        let family = self.default_font.clone();
        let mut left = x0;
        let mut last_text_height = 0.0;

        for (i, figure) in item.values.iter().enumerate() {
            let text_height = self.fonts.measure_height(
                &figure.description,
                &family,
                FontWeight::Normal,
                caption_size,
                Some(width.max(1.0)),
                None,
                None,
            ) + item.description_defaults.padding_top;
            last_text_height = text_height;

            self.break_page_if_needed(item.height + text_height);

            match figure.image.bytes() {
                Ok(bytes) => {
                    if let Err(e) = self.canvas.draw_image(
                        &bytes,
                        left,
                        self.session.cursor_y,
                        Some(width),
                        Some(item.height),
                    ) {
                        warn!("Skipping gallery figure {} — {e}", i + 1);
                    }
                }
                Err(e) => warn!("Skipping gallery figure {} — {e}", i + 1),
            }

            // Caption: bold figure index, description flowing after it.
            let caption_y = self.session.cursor_y
                + item.height
                + item.description_defaults.padding_top;
            let prefix = format!("Figure {}. ", i + 1);
            let prefix_width =
                self.fonts
                    .measure_width(&prefix, &family, FontWeight::Bold, caption_size);
            self.canvas.draw_text_line(
                left,
                caption_y,
                &prefix,
                &family,
                FontWeight::Bold,
                caption_size,
                caption_color,
            );

            // First caption line shares the row with the bold prefix;
            // the remaining words wrap to the full figure width below.
            let first_width = (width - prefix_width).max(1.0);
            let words: Vec<&str> = figure.description.split_whitespace().collect();
            let mut taken = 0;
            let mut first_line = String::new();
            for word in &words {
                let candidate = if first_line.is_empty() {
                    (*word).to_string()
                } else {
                    format!("{first_line} {word}")
                };
                let w = self
                    .fonts
                    .measure_width(&candidate, &family, FontWeight::Normal, caption_size);
                if w > first_width && !first_line.is_empty() {
                    break;
                }
                first_line = candidate;
                taken += 1;
            }
            self.canvas.draw_text_line(
                left + prefix_width,
                caption_y,
                &first_line,
                &family,
                FontWeight::Normal,
                caption_size,
                caption_color,
            );
            if taken < words.len() {
                let rest = words[taken..].join(" ");
                let remaining =
                    self.fonts
                        .wrap_text(&rest, &family, FontWeight::Normal, caption_size, width);
                self.canvas.draw_text_lines(
                    left,
                    caption_y + caption_line_height,
                    &remaining,
                    &family,
                    FontWeight::Normal,
                    caption_size,
                    caption_color,
                    caption_line_height,
                );
            }

            // Two figures per row; wrap after the second.
            if (i + 1) % 2 != 0 {
                left += item.margin + width;
            } else {
                left = x0;
                self.session.cursor_y += item.margin + item.height + text_height;
            }
        }

        // A trailing odd figure still consumes its row.
        if item.values.len() % 2 != 0 {
            self.session.cursor_y += item.margin + item.height + last_text_height;
        }

        self.session.cursor_y += 2.0 * caption_line_height + item.placement.margin_bottom;
        Ok(())
    }

    // -- signatures ---------------------------------------------------------

    fn render_signature(&mut self, item: &SignatureItem) -> Result<()> {
        const LABEL_GAP: f32 = 24.0;
        const SIGNATURE_IMAGE_WIDTH: f32 = 137.0;
        const SIGNATURE_LINE_LENGTH: f32 = 160.0;

        let size = item.size.unwrap_or(DEFAULT_FONT_SIZE);
        let color = item.color.unwrap_or(Color::BLACK);
        let row_height = self.fonts.line_height(size, Some(16.0));
        let family = self.default_font.clone();
        let x0 = self.content_left();

        let rows = item.title.is_some() as usize
            + item.printed_name.is_some() as usize
            + item.signature.is_some() as usize
            + item.license_number.is_some() as usize
            + item.date.is_some() as usize;
        let block_height = rows as f32 * row_height + 2.0 * row_height;

        self.session.cursor_y += item.placement.margin_top + row_height;
        self.break_page_if_needed(block_height);

        let label = "Printed Name";
        let label_width = self
            .fonts
            .measure_width(label, &family, FontWeight::Bold, size);
        let value_x = x0 + label_width + LABEL_GAP;

        if let Some(title) = &item.title {
            self.canvas.draw_text_line(
                x0,
                self.session.cursor_y,
                title,
                &family,
                FontWeight::Bold,
                size,
                color,
            );
            self.session.cursor_y += row_height;
        }

        if let Some(printed_name) = &item.printed_name {
            self.canvas.draw_text_line(
                x0,
                self.session.cursor_y,
                label,
                &family,
                FontWeight::Bold,
                size,
                color,
            );
            self.canvas.draw_text_line(
                value_x,
                self.session.cursor_y,
                printed_name,
                &family,
                FontWeight::Normal,
                size,
                color,
            );
            self.session.cursor_y += row_height;
        }

        if let Some(signature) = &item.signature {
            self.session.cursor_y += 16.0;
            let y = self.session.cursor_y;
            self.canvas.draw_text_line(
                x0,
                y,
                "Signature",
                &family,
                FontWeight::Bold,
                size,
                color,
            );

            let bytes = signature
                .bytes()
                .map_err(|e| Error::Asset(format!("signature image: {e}")))?;
            self.canvas
                .draw_image(&bytes, value_x, y - 24.0, Some(SIGNATURE_IMAGE_WIDTH), None)?;
            self.canvas.draw_line(
                value_x,
                y + 12.0,
                value_x + SIGNATURE_LINE_LENGTH,
                y + 12.0,
                color,
                0.5,
            );
            self.session.cursor_y += row_height;
        }

        if let Some(license_number) = &item.license_number {
            let state = item.state.as_deref().unwrap_or_default();
            let license_label = format!("{state} Professional Engineering License No.");
            self.canvas.draw_text_line(
                x0,
                self.session.cursor_y,
                &license_label,
                &family,
                FontWeight::Bold,
                size,
                color,
            );
            self.canvas.draw_text_line(
                value_x + 130.0,
                self.session.cursor_y,
                license_number,
                &family,
                FontWeight::Normal,
                size,
                color,
            );
            self.session.cursor_y += row_height;
        }

        if let Some(date) = &item.date {
            self.canvas.draw_text_line(
                x0,
                self.session.cursor_y,
                "Date",
                &family,
                FontWeight::Bold,
                size,
                color,
            );
            self.canvas.draw_text_line(
                value_x,
                self.session.cursor_y,
                date,
                &family,
                FontWeight::Normal,
                size,
                color,
            );
            self.session.cursor_y += row_height;
        }

        self.session.cursor_y += row_height + item.placement.margin_bottom;
        Ok(())
    }

    // -- primitives ---------------------------------------------------------

    fn render_rect(&mut self, item: &RectItem) -> Result<()> {
        let ctx = self.ctx();
        let width = if item.full_width {
            self.canvas.page_width()
        } else {
            item.width.map(|w| w.resolve(&ctx)).unwrap_or(0.0)
        };

        let (x, y) = if item.placement.relative {
            self.session.cursor_y += item.placement.margin_top;
            self.break_page_if_needed(item.height);
            (self.content_left(), self.session.cursor_y)
        } else {
            (
                item.placement
                    .left
                    .map(|l| l.resolve(&ctx))
                    .unwrap_or(0.0),
                item.placement
                    .top
                    .map(|t| t.resolve(&ctx))
                    .unwrap_or(self.session.cursor_y),
            )
        };

        if let Some(fill) = item.background_color {
            self.canvas.draw_rect(x, y, width, item.height, fill);
        }

        if item.placement.relative {
            self.session.cursor_y += item.height + item.placement.margin_bottom;
        }
        Ok(())
    }

    fn render_polygon(&mut self, item: &PolygonItem) -> Result<()> {
        let points = item.point_pairs();
        if let Some(fill) = item.background_color {
            self.canvas.draw_polygon(&points, fill);
        }
        Ok(())
    }

    // -- table of contents body ---------------------------------------------

    /// Render a TOC tree with per-depth indentation and the final page
    /// number right-aligned on each row. Runs after reconciliation, so
    /// only the rewritten `page` values are ever displayed.
    pub fn render_topics(&mut self, item: &TopicsItem, entries: &[TocEntry]) -> Result<()> {
        let size = item.size.unwrap_or(DEFAULT_FONT_SIZE);
        let color = item.color.unwrap_or(Color::BLACK);

        self.session.cursor_y += item.placement.margin_top;
        self.render_topic_level(entries, 0.0, item, size, color);
        self.session.cursor_y += item.placement.margin_bottom;
        Ok(())
    }

    fn render_topic_level(
        &mut self,
        entries: &[TocEntry],
        indent: f32,
        item: &TopicsItem,
        size: f32,
        color: Color,
    ) {
        let family = self.default_font.clone();
        let line_height = self.fonts.line_height(size, item.line_gap);

        for entry in entries {
            if !entry.title.is_empty() {
                if self.session.paginate
                    && self.session.cursor_y + line_height > self.content_bottom()
                {
                    self.start_page();
                }

                let y = self.session.cursor_y;
                self.canvas.draw_text_line(
                    self.content_left() + indent,
                    y,
                    &entry.title,
                    &family,
                    item.weight,
                    size,
                    color,
                );

                let number = entry.page.to_string();
                let number_width =
                    self.fonts
                        .measure_width(&number, &family, item.weight, size);
                self.canvas.draw_text_line(
                    self.content_right() - number_width,
                    y,
                    &number,
                    &family,
                    item.weight,
                    size,
                    color,
                );

                self.session.cursor_y += line_height;
            }

            if !entry.children.is_empty() {
                self.render_topic_level(&entry.children, indent + TOPIC_INDENT, item, size, color);
            }
        }
    }
}

/// Clone footer items, substituting the displayed page number into any
/// text item flagged as the page-number slot.
fn substitute_page_number(items: &[ContentItem], display: u32) -> Vec<ContentItem> {
    items
        .iter()
        .map(|item| match item {
            ContentItem::Text(text) if text.page_number => {
                let mut text = text.clone();
                text.value = TextValue::Plain(display.to_string());
                ContentItem::Text(text)
            }
            other => other.clone(),
        })
        .collect()
}

/// Resolve table column widths once per table: explicit width when given,
/// otherwise the maximum measured cell width for that column; whatever
/// page width remains is split evenly among `flex` columns.
pub(crate) fn resolve_column_widths(
    fonts: &FontManager,
    family: &str,
    item: &TableItem,
    content_width: f32,
    size: f32,
) -> Vec<f32> {
    let mut widths = vec![0.0f32; item.columns.len()];
    let mut fixed_total = 0.0f32;
    let mut flex_count = 0usize;

    for (c, column) in item.columns.iter().enumerate() {
        if let Some(width) = column.width {
            widths[c] = width;
            fixed_total += width;
        } else if column.flex {
            flex_count += 1;
        } else {
            let mut max = 0.0f32;
            for row in &item.rows {
                if let Some(value) = row.get(&column.data_index) {
                    let w = fonts.measure_width(value, family, column.weight, size);
                    if w > max {
                        max = w;
                    }
                }
            }
            widths[c] = max;
            fixed_total += max;
        }
    }

    if flex_count > 0 {
        let flex_width = (content_width - fixed_total) / flex_count as f32;
        for (c, column) in item.columns.iter().enumerate() {
            if column.flex && column.width.is_none() {
                widths[c] = flex_width;
            }
        }
    }

    widths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Margins, PageSize, Placement, TableColumn};

    fn table(columns: Vec<TableColumn>, rows: Vec<Vec<(&str, &str)>>) -> TableItem {
        TableItem {
            columns,
            rows: rows
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect()
                })
                .collect(),
            ..TableItem::default()
        }
    }

    fn column(data_index: &str) -> TableColumn {
        TableColumn {
            data_index: data_index.to_string(),
            ..TableColumn::default()
        }
    }

    #[test]
    fn column_widths_fill_content_area() {
        let fonts = FontManager::new();
        let item = table(
            vec![
                TableColumn {
                    width: Some(100.0),
                    ..column("a")
                },
                column("b"),
                TableColumn {
                    flex: true,
                    ..column("c")
                },
                TableColumn {
                    flex: true,
                    ..column("d")
                },
            ],
            vec![vec![("a", "x"), ("b", "some cell content"), ("c", ""), ("d", "")]],
        );

        let content_width = 500.0;
        let widths = resolve_column_widths(&fonts, "Helvetica", &item, content_width, 12.0);
        let total: f32 = widths.iter().sum();
        assert!(
            (total - content_width).abs() < 0.01,
            "widths {widths:?} should fill {content_width}"
        );
        assert!((widths[0] - 100.0).abs() < 0.01);
        assert!(widths[1] > 0.0, "autosized column must measure content");
        assert!((widths[2] - widths[3]).abs() < 0.01, "flex columns split evenly");
    }

    #[test]
    fn autosized_column_takes_widest_cell() {
        let fonts = FontManager::new();
        let item = table(
            vec![column("a")],
            vec![vec![("a", "short")], vec![("a", "a much longer cell value")]],
        );
        let widths = resolve_column_widths(&fonts, "Helvetica", &item, 500.0, 12.0);
        let expected = fonts.measure_width(
            "a much longer cell value",
            "Helvetica",
            FontWeight::Normal,
            12.0,
        );
        assert!((widths[0] - expected).abs() < 0.01);
    }

    fn engine_fixture<'a>(canvas: &'a mut Canvas, fonts: &'a FontManager) -> LayoutEngine<'a> {
        LayoutEngine::new(canvas, fonts, "Helvetica", 0)
    }

    #[test]
    fn sections_each_start_a_page_and_register_toc() {
        let fonts = FontManager::new();
        let mut canvas = Canvas::new("test", PageSize::a4(), Margins::uniform(40.0));
        let mut engine = engine_fixture(&mut canvas, &fonts);

        let section = |title: &str| Section {
            embed: false,
            items: vec![ContentItem::Text(TextItem {
                placement: Placement {
                    relative: true,
                    is_title: true,
                    ..Placement::default()
                },
                value: title.into(),
                ..TextItem::default()
            })],
        };

        engine
            .render_sections(&[section("One"), section("Two")], false)
            .unwrap();

        assert_eq!(canvas.page_count(), 2);
    }

    #[test]
    fn toc_pages_are_strictly_increasing() {
        let fonts = FontManager::new();
        let mut canvas = Canvas::new("test", PageSize::a4(), Margins::uniform(40.0));
        let mut engine = engine_fixture(&mut canvas, &fonts);

        let sections: Vec<Section> = (0..3)
            .map(|i| Section {
                embed: false,
                items: vec![ContentItem::Text(TextItem {
                    placement: Placement {
                        relative: true,
                        is_title: true,
                        ..Placement::default()
                    },
                    value: format!("Section {}", i + 1).into(),
                    ..TextItem::default()
                })],
            })
            .collect();

        engine.render_sections(&sections, false).unwrap();
        let toc = engine.session.toc;

        let pages: Vec<u32> = toc.values().map(|e| e.page).collect();
        assert_eq!(pages, vec![1, 2, 3]);
        for entry in toc.values() {
            assert_eq!(entry.original_page, Some(entry.page));
        }
    }

    #[test]
    fn oversized_item_consumes_one_extra_page_only() {
        let fonts = FontManager::new();
        let mut canvas = Canvas::new("test", PageSize::a4(), Margins::uniform(40.0));
        let mut engine = engine_fixture(&mut canvas, &fonts);
        engine.start_page();

        // Fill a little of the page, then render something taller than the
        // whole content area.
        engine.session.cursor_y += 100.0;
        let tall = ContentItem::Rect(RectItem {
            placement: Placement {
                relative: true,
                ..Placement::default()
            },
            height: 2000.0,
            full_width: true,
            background_color: Some(Color::BLACK),
            ..RectItem::default()
        });
        engine.render_items(std::slice::from_ref(&tall)).unwrap();

        assert_eq!(canvas.page_count(), 2, "exactly one page break");
    }

    #[test]
    fn embed_section_reserves_one_page_number() {
        use crate::content::{Binary, PdfItem};

        let fonts = FontManager::new();
        let mut canvas = Canvas::new("test", PageSize::a4(), Margins::uniform(40.0));
        let mut engine = engine_fixture(&mut canvas, &fonts);

        let body = Section {
            embed: false,
            items: vec![ContentItem::Text(TextItem {
                placement: Placement {
                    relative: true,
                    ..Placement::default()
                },
                value: "body".into(),
                ..TextItem::default()
            })],
        };
        let embed = Section {
            embed: true,
            items: vec![ContentItem::Pdf(PdfItem {
                value: Some("Appendix".to_string()),
                pdf: Some(Binary::Bytes(vec![0u8; 4])),
            })],
        };

        engine
            .render_sections(&[body.clone(), embed, body], false)
            .unwrap();

        let toc = engine.session.toc;
        assert_eq!(toc[&1].page, 1);
        assert_eq!(toc[&2].page, 2);
        assert_eq!(toc[&2].title, "Appendix");
        assert_eq!(toc[&3].page, 3);
        // Only two physical pages exist; the embed reserved a number.
        assert_eq!(canvas.page_count(), 2);
    }
}
