//! Sample content trees for testing and demonstration.
//!
//! Each template exercises different parts of the engine: the minimal
//! document, a full report with cover/TOC/header/footer, a long table
//! that forces continuation pages, and a photo gallery.

use std::io::Cursor;

use crate::content::{
    Align, Binary, CaptionDefaults, CellDefaults, Color, ContentItem, Coord, DocumentConfig,
    FontWeight, GalleryFigure, GalleryItem, ListItem, PageTemplate, Placement, RectItem, Section,
    TableColumn, TableItem, TableTitle, TextItem, TopicsItem,
};

fn title_text(value: &str, size: f32) -> ContentItem {
    ContentItem::Text(TextItem {
        placement: Placement {
            relative: true,
            is_title: true,
            margin_bottom: 8.0,
            ..Placement::default()
        },
        value: value.into(),
        size: Some(size),
        weight: FontWeight::Bold,
        ..TextItem::default()
    })
}

fn body_text(value: &str) -> ContentItem {
    ContentItem::Text(TextItem {
        placement: Placement {
            relative: true,
            margin_bottom: 6.0,
            ..Placement::default()
        },
        value: value.into(),
        full_width: true,
        ..TextItem::default()
    })
}

/// A deterministic solid-color PNG, used by gallery samples and tests.
pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([120, 140, 180, 255]));
    let mut bytes = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut bytes, image::ImageFormat::Png)
        .expect("encoding an in-memory PNG cannot fail");
    bytes.into_inner()
}

/// Smallest useful document: one section, one paragraph.
pub fn minimal() -> DocumentConfig {
    DocumentConfig {
        title: "Minimal".to_string(),
        sections: vec![Section {
            embed: false,
            items: vec![title_text("Overview", 16.0), body_text("A single page.")],
        }],
        ..DocumentConfig::default()
    }
}

/// Full report shape: cover, auto TOC, running header/footer, and three
/// sections (text, table, list).
pub fn report() -> DocumentConfig {
    let accent = Color::from_hex("#1a365d").expect("static color");
    let stripe = Color::from_hex("#e8edf4").expect("static color");

    let cover = PageTemplate {
        items: vec![
            ContentItem::Rect(RectItem {
                placement: Placement {
                    top: Some(Coord::Literal(0.0)),
                    left: Some(Coord::Literal(0.0)),
                    ..Placement::default()
                },
                full_width: true,
                height: 180.0,
                background_color: Some(accent),
                ..RectItem::default()
            }),
            ContentItem::Text(TextItem {
                placement: Placement {
                    top: Some(Coord::Literal(80.0)),
                    left: Some(Coord::Literal(60.0)),
                    ..Placement::default()
                },
                value: "Annual Energy Assessment".into(),
                size: Some(28.0),
                weight: FontWeight::Bold,
                color: Some(Color::from_hex("#ffffff").expect("static color")),
                ..TextItem::default()
            }),
            ContentItem::Text(TextItem {
                placement: Placement {
                    top: Some(Coord::Literal(260.0)),
                    left: Some(Coord::Literal(60.0)),
                    ..Placement::default()
                },
                value: "Prepared for Example Property Holdings".into(),
                size: Some(14.0),
                ..TextItem::default()
            }),
        ],
    };

    let table_of_contents = PageTemplate {
        items: vec![
            ContentItem::Text(TextItem {
                placement: Placement {
                    relative: true,
                    margin_bottom: 16.0,
                    ..Placement::default()
                },
                value: "Table of Contents".into(),
                size: Some(20.0),
                weight: FontWeight::Bold,
                ..TextItem::default()
            }),
            ContentItem::Topics(TopicsItem {
                placement: Placement {
                    relative: true,
                    ..Placement::default()
                },
                size: Some(12.0),
                line_gap: Some(4.0),
                ..TopicsItem::default()
            }),
        ],
    };

    let footer = PageTemplate {
        items: vec![ContentItem::Text(TextItem {
            placement: Placement {
                // Bottom strip, outside the flow.
                top: Some(Coord::Computed(|ctx| ctx.page_height - 28.0)),
                left: Some(Coord::Computed(|ctx| ctx.content_right() - 40.0)),
                ..Placement::default()
            },
            value: "0".into(),
            size: Some(9.0),
            page_number: true,
            ..TextItem::default()
        })],
    };

    let findings_table = ContentItem::Table(TableItem {
        placement: Placement {
            relative: true,
            ..Placement::default()
        },
        title: Some(TableTitle {
            value: "Measured Savings by System".to_string(),
            background_color: Some(accent),
            color: Some(Color::from_hex("#ffffff").expect("static color")),
            padding_top: 4.0,
            padding_bottom: 4.0,
            padding_left: 6.0,
            ..TableTitle::default()
        }),
        header_defaults: CellDefaults {
            background_color: Some(stripe),
            padding_top: 3.0,
            padding_bottom: 3.0,
            padding_left: 4.0,
            padding_right: 4.0,
            ..CellDefaults::default()
        },
        column_defaults: CellDefaults {
            padding_top: 2.0,
            padding_bottom: 2.0,
            padding_left: 4.0,
            padding_right: 4.0,
            ..CellDefaults::default()
        },
        columns: vec![
            TableColumn {
                header: Some("System".to_string()),
                data_index: "system".to_string(),
                flex: true,
                ..TableColumn::default()
            },
            TableColumn {
                header: Some("Baseline kWh".to_string()),
                data_index: "baseline".to_string(),
                align: Some(Align::Right),
                ..TableColumn::default()
            },
            TableColumn {
                header: Some("Measured kWh".to_string()),
                data_index: "measured".to_string(),
                align: Some(Align::Right),
                ..TableColumn::default()
            },
        ],
        rows: [
            ("Lighting", "48,200", "31,400"),
            ("HVAC", "112,750", "94,020"),
            ("Envelope", "22,310", "19,880"),
        ]
        .iter()
        .map(|(system, baseline, measured)| {
            [
                ("system".to_string(), system.to_string()),
                ("baseline".to_string(), baseline.to_string()),
                ("measured".to_string(), measured.to_string()),
            ]
            .into_iter()
            .collect()
        })
        .collect(),
        line_color: Some(stripe),
        ..TableItem::default()
    });

    DocumentConfig {
        title: "Annual Energy Assessment".to_string(),
        cover: Some(cover),
        table_of_contents: Some(table_of_contents),
        footer: Some(footer),
        sections: vec![
            Section {
                embed: false,
                items: vec![
                    title_text("Executive Summary", 16.0),
                    body_text(
                        "This report summarizes the measured performance of the building \
                         systems over the assessment period and compares each against its \
                         modeled baseline.",
                    ),
                ],
            },
            Section {
                embed: false,
                items: vec![title_text("Measured Results", 16.0), findings_table],
            },
            Section {
                embed: false,
                items: vec![
                    title_text("Recommendations", 16.0),
                    ContentItem::List(ListItem {
                        placement: Placement {
                            relative: true,
                            ..Placement::default()
                        },
                        value: vec![
                            "Rebalance air handler schedules".to_string(),
                            "Extend lighting controls to storage areas".to_string(),
                            "Re-commission economizer dampers".to_string(),
                        ],
                        ..ListItem::default()
                    }),
                ],
            },
        ],
        ..DocumentConfig::default()
    }
}

/// A single section holding a table with `rows` data rows; used to force
/// continuation pages.
pub fn long_table(rows: usize) -> DocumentConfig {
    let table = ContentItem::Table(TableItem {
        placement: Placement {
            relative: true,
            ..Placement::default()
        },
        title: Some(TableTitle {
            value: "Fixture Schedule".to_string(),
            ..TableTitle::default()
        }),
        columns: vec![
            TableColumn {
                header: Some("Tag".to_string()),
                data_index: "tag".to_string(),
                width: Some(80.0),
                ..TableColumn::default()
            },
            TableColumn {
                header: Some("Description".to_string()),
                data_index: "description".to_string(),
                flex: true,
                ..TableColumn::default()
            },
        ],
        rows: (0..rows)
            .map(|i| {
                [
                    ("tag".to_string(), format!("F-{:03}", i + 1)),
                    (
                        "description".to_string(),
                        format!("Recessed LED troffer, zone {}", i % 7 + 1),
                    ),
                ]
                .into_iter()
                .collect()
            })
            .collect(),
        column_defaults: CellDefaults {
            padding_top: 14.0,
            padding_bottom: 14.0,
            ..CellDefaults::default()
        },
        ..TableItem::default()
    });

    DocumentConfig {
        title: "Fixture Schedule".to_string(),
        sections: vec![Section {
            embed: false,
            items: vec![title_text("Schedule", 16.0), table],
        }],
        ..DocumentConfig::default()
    }
}

/// One section holding a gallery of `figures` captioned photos.
pub fn gallery(figures: usize) -> DocumentConfig {
    let image = sample_png(64, 48);
    DocumentConfig {
        title: "Site Photos".to_string(),
        sections: vec![Section {
            embed: false,
            items: vec![
                title_text("Site Photos", 16.0),
                ContentItem::Gallery(GalleryItem {
                    placement: Placement {
                        relative: true,
                        ..Placement::default()
                    },
                    height: 160.0,
                    margin: 12.0,
                    values: (0..figures)
                        .map(|i| GalleryFigure {
                            description: format!("Unit {} as observed during the site visit", i + 1),
                            image: Binary::Bytes(image.clone()),
                        })
                        .collect(),
                    description_defaults: CaptionDefaults {
                        size: Some(10.0),
                        padding_top: 4.0,
                        ..CaptionDefaults::default()
                    },
                    ..GalleryItem::default()
                }),
            ],
        }],
        ..DocumentConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_png_decodes() {
        let bytes = sample_png(8, 8);
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!((img.width(), img.height()), (8, 8));
    }

    #[test]
    fn templates_pass_validation() {
        minimal().validate().unwrap();
        report().validate().unwrap();
        long_table(10).validate().unwrap();
        gallery(5).validate().unwrap();
    }

    #[test]
    fn report_serializes_without_computed_coords_in_sections() {
        // The footer uses computed coordinates, so only the sections are
        // expected to round-trip through JSON.
        let report = report();
        let json = serde_json::to_string(&report.sections).unwrap();
        let parsed: Vec<Section> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), report.sections.len());
    }
}
