//! Single-page PDF renderer.
//!
//! Layout: centered bold title, wrapped body text, then every image stacked
//! below at a fixed width. Nothing flows onto a second page; content that
//! does not fit runs off the bottom edge.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, StringFormat, dictionary};

use nobestudy_shared::{ExportRequest, NobestudyError, Result};

use crate::images::LoadedImage;

/// A4 portrait, in points.
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;

/// 10 mm.
const MARGIN: f32 = 28.35;

const TITLE_SIZE: f32 = 16.0;
const BODY_SIZE: f32 = 12.0;
const BODY_LEADING: f32 = 14.0;

/// 100 mm.
const IMAGE_WIDTH: f32 = 283.46;
const IMAGE_GAP: f32 = 5.0;

/// Render the request as PDF bytes.
pub fn render(request: &ExportRequest, images: &[LoadedImage]) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let body_font = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let title_font = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut operations = Vec::new();

    // Title
    let title = request.title_line();
    let title_width = text_width(&title, TITLE_SIZE, Font::HelveticaBold);
    let title_x = ((PAGE_WIDTH - title_width) / 2.0).max(MARGIN);
    let title_y = PAGE_HEIGHT - MARGIN - TITLE_SIZE;
    operations.extend([
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F2".into(), Object::Real(TITLE_SIZE)]),
        Operation::new("Td", vec![Object::Real(title_x), Object::Real(title_y)]),
        Operation::new("Tj", vec![pdf_string(&title)]),
        Operation::new("ET", vec![]),
    ]);

    // Body
    let lines = wrap_text(&request.content, PAGE_WIDTH - 2.0 * MARGIN, BODY_SIZE);
    let body_top = title_y - 2.0 * BODY_LEADING;
    operations.extend([
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), Object::Real(BODY_SIZE)]),
        Operation::new("TL", vec![Object::Real(BODY_LEADING)]),
        Operation::new("Td", vec![Object::Real(MARGIN), Object::Real(body_top)]),
    ]);
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("Tj", vec![pdf_string(line)]));
    }
    operations.push(Operation::new("ET", vec![]));

    // Images
    let mut xobjects = Dictionary::new();
    let mut cursor = body_top - lines.len() as f32 * BODY_LEADING - IMAGE_GAP;
    for (i, img) in images.iter().enumerate() {
        let name = format!("Im{}", i + 1);
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => Object::Integer(i64::from(img.width())),
                "Height" => Object::Integer(i64::from(img.height())),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => Object::Integer(8),
            },
            img.rgb_pixels(),
        );
        let image_id = doc.add_object(stream);
        xobjects.set(name.as_bytes().to_vec(), image_id);

        let height = img.scaled_height(f64::from(IMAGE_WIDTH)) as f32;
        cursor -= height;
        operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(IMAGE_WIDTH),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(height),
                    Object::Real(MARGIN),
                    Object::Real(cursor),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        cursor -= IMAGE_GAP;
    }

    let content = Content { operations };
    let encoded = content
        .encode()
        .map_err(|e| NobestudyError::render(format!("PDF content stream: {e}")))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    let mut resources = dictionary! {
        "Font" => dictionary! {
            "F1" => body_font,
            "F2" => title_font,
        },
    };
    if !xobjects.is_empty() {
        resources.set("XObject", xobjects);
    }
    let resources_id = doc.add_object(resources);

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
    });

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => Object::Integer(1),
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(PAGE_WIDTH),
            Object::Real(PAGE_HEIGHT),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => pdf_string(&title),
        "Producer" => Object::string_literal(concat!("Nobestudy ", env!("CARGO_PKG_VERSION"))),
        "CreationDate" => Object::string_literal(
            chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string(),
        ),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| NobestudyError::render(format!("PDF serialization: {e}")))?;
    Ok(out)
}

/// Encode text for a WinAnsi Type 1 font. Anything outside Latin-1 becomes `?`.
fn pdf_string(text: &str) -> Object {
    Object::String(encode_win_ansi(text), StringFormat::Literal)
}

fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x09 | 0x0A | 0x0D => b' ',
            cp @ (0x20..=0x7E | 0xA0..=0xFF) => cp as u8,
            _ => b'?',
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Text measurement and wrapping
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Font {
    Helvetica,
    HelveticaBold,
}

/// Glyph widths for U+0020..=U+007E, in 1/1000 em (Adobe core font metrics).
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

const FALLBACK_WIDTH: u16 = 556;

fn glyph_width(byte: u8, font: Font) -> u16 {
    let table = match font {
        Font::Helvetica => &HELVETICA_WIDTHS,
        Font::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
    };
    match byte {
        0x20..=0x7E => table[usize::from(byte - 0x20)],
        _ => FALLBACK_WIDTH,
    }
}

fn text_width(text: &str, size: f32, font: Font) -> f32 {
    let units: u32 = encode_win_ansi(text)
        .into_iter()
        .map(|b| u32::from(glyph_width(b, font)))
        .sum();
    units as f32 * size / 1000.0
}

/// Greedy word wrap to `max_width` points. Explicit newlines start a new line;
/// a word wider than the line is split across lines.
pub(crate) fn wrap_text(text: &str, max_width: f32, size: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for raw_line in text.lines() {
        let mut current = String::new();

        for word in raw_line.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };

            if text_width(&candidate, size, Font::Helvetica) <= max_width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }

            // Hard-split words that cannot fit on a line of their own.
            for ch in word.chars() {
                let mut next = current.clone();
                next.push(ch);
                if !current.is_empty() && text_width(&next, size, Font::Helvetica) > max_width {
                    lines.push(std::mem::take(&mut current));
                    current.push(ch);
                } else {
                    current = next;
                }
            }
        }

        lines.push(current);
    }

    lines
}
