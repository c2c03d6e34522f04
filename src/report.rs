//! Photo report composition.
//!
//! Lays fetched photos into a letter-sized PDF: a fixed 3-column, 4-row grid
//! per page, each page headed by the listing's id and price. A new page
//! starts for every listing and again whenever a listing's running photo
//! count crosses the page capacity.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use thiserror::Error;
use tracing::{debug, info};

use crate::photos::ListingPhotos;

pub const PHOTOS_PER_PAGE: usize = 12;
const GRID_COLS: usize = 3;

// Letter geometry in points, mirroring the original layout: 10 mm outer
// margin, 5 mm gutters, cells at a fixed 4:3 aspect ratio.
const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 28.35;
const GUTTER: f32 = 14.2;
const CELL_WIDTH: f32 = (PAGE_WIDTH - 113.4) / 3.0;
const CELL_HEIGHT: f32 = CELL_WIDTH * 0.75;
const HEADER_FONT_SIZE: f32 = 14.0;
const HEADER_LINE_HEIGHT: f32 = 20.0;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("pdf assembly failed: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ReportSummary {
    pub path: PathBuf,
    pub pages: usize,
}

/// Writes the multi-page photo report and returns where it landed. Listings
/// without photos contribute no pages.
pub fn compose_report(
    listings: &[ListingPhotos],
    path: &Path,
) -> Result<ReportSummary, ReportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });

    let mut page_ids: Vec<ObjectId> = Vec::new();
    for listing in listings {
        for chunk in listing.photos.chunks(PHOTOS_PER_PAGE) {
            let page_id = compose_page(&mut doc, pages_id, font_id, listing, chunk)?;
            page_ids.push(page_id);
        }
    }

    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();
    let count = page_ids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path)?;

    info!(path = %path.display(), pages = page_ids.len(), "report written");
    Ok(ReportSummary {
        path: path.to_path_buf(),
        pages: page_ids.len(),
    })
}

fn compose_page(
    doc: &mut Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    listing: &ListingPhotos,
    photos: &[Vec<u8>],
) -> Result<ObjectId, ReportError> {
    let mut xobjects = Dictionary::new();
    let mut ops: Vec<Operation> = Vec::new();

    let id_line = format!("Listing {}", listing.ordinal);
    let price_line = format!("Price: {}", listing.price.as_deref().unwrap_or("N/A"));
    let mut text_y = PAGE_HEIGHT - MARGIN - HEADER_FONT_SIZE;
    for line in [id_line.as_str(), price_line.as_str()] {
        let x = centered_x(line);
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new("Tf", vec!["F1".into(), real(HEADER_FONT_SIZE)]));
        ops.push(Operation::new("Td", vec![real(x), real(text_y)]));
        ops.push(Operation::new("Tj", vec![Object::string_literal(line)]));
        ops.push(Operation::new("ET", vec![]));
        text_y -= HEADER_LINE_HEIGHT;
    }

    let grid_top = text_y - 5.0;
    for (i, bytes) in photos.iter().enumerate() {
        let stream = match image_xobject(bytes) {
            Ok(stream) => stream,
            Err(e) => {
                debug!(listing = listing.ordinal, error = %e, "skipping undecodable photo");
                continue;
            }
        };
        let name = format!("Im{i}");
        let xobject_id = doc.add_object(stream);
        xobjects.set(name.clone(), Object::Reference(xobject_id));

        let col = (i % GRID_COLS) as f32;
        let row = (i / GRID_COLS) as f32;
        let x = MARGIN + col * (CELL_WIDTH + GUTTER);
        let y = grid_top - (row + 1.0) * CELL_HEIGHT - row * GUTTER;

        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new(
            "cm",
            vec![
                real(CELL_WIDTH),
                Object::Integer(0),
                Object::Integer(0),
                real(CELL_HEIGHT),
                real(x),
                real(y),
            ],
        ));
        ops.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
        ops.push(Operation::new("Q", vec![]));
    }

    let content = Content { operations: ops };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(612),
            Object::Integer(792),
        ],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
            "XObject" => xobjects,
        },
    });
    Ok(page_id)
}

fn real(value: f32) -> Object {
    Object::Real(value.into())
}

/// Crude Helvetica width estimate, enough to center the header lines.
fn centered_x(line: &str) -> f32 {
    let width = line.len() as f32 * HEADER_FONT_SIZE * 0.55;
    ((PAGE_WIDTH - width) / 2.0).max(MARGIN)
}

/// Builds an image XObject. JPEG bytes are embedded as-is under DCTDecode;
/// anything else decodable is transcoded to JPEG once on the way in.
fn image_xobject(bytes: &[u8]) -> Result<Stream, ReportError> {
    let format = image::guess_format(bytes)?;
    let decoded = image::load_from_memory(bytes)?;
    let (width, height) = (decoded.width(), decoded.height());
    let color_space = if decoded.color().has_color() {
        "DeviceRGB"
    } else {
        "DeviceGray"
    };

    let jpeg = if format == ImageFormat::Jpeg {
        bytes.to_vec()
    } else {
        let mut out = Cursor::new(Vec::new());
        decoded.write_to(&mut out, ImageFormat::Jpeg)?;
        out.into_inner()
    };

    Ok(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8i64,
            "Filter" => "DCTDecode",
        },
        jpeg,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    fn tiny_jpeg() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, image::Rgb([120, 40, 40])));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Jpeg).unwrap();
        out.into_inner()
    }

    #[test]
    fn thirteen_photos_make_two_pages_with_the_same_header() {
        let listing = ListingPhotos {
            ordinal: 1,
            price: Some("$300,000".to_string()),
            photos: vec![tiny_jpeg(); 13],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");

        let summary = compose_report(&[listing], &path).unwrap();
        assert_eq!(summary.pages, 2);

        let doc = Document::load(&path).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 2);
        for page_id in pages.values() {
            let content = doc.get_page_content(*page_id).unwrap();
            let content = String::from_utf8_lossy(&content);
            assert!(content.contains("Listing 1"));
        }
    }

    #[test]
    fn photos_group_by_listing_across_pages() {
        let listings = vec![
            ListingPhotos {
                ordinal: 1,
                price: Some("$300,000".to_string()),
                photos: vec![tiny_jpeg(); 2],
            },
            ListingPhotos {
                ordinal: 2,
                price: None,
                photos: vec![tiny_jpeg(); 2],
            },
        ];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        let summary = compose_report(&listings, &path).unwrap();
        // each listing starts its own page even when the previous one had room
        assert_eq!(summary.pages, 2);
    }

    #[test]
    fn undecodable_photo_is_skipped() {
        let listing = ListingPhotos {
            ordinal: 3,
            price: None,
            photos: vec![b"not an image".to_vec(), tiny_jpeg()],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        let summary = compose_report(&[listing], &path).unwrap();
        assert_eq!(summary.pages, 1);
    }

    #[test]
    fn listing_without_photos_adds_no_page() {
        let listing = ListingPhotos {
            ordinal: 4,
            price: Some("$1".to_string()),
            photos: Vec::new(),
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        let summary = compose_report(&[listing], &path).unwrap();
        assert_eq!(summary.pages, 0);
        assert!(path.exists());
    }
}
