//! Minimal PDF document builder on top of lopdf.
//!
//! Pages are added with a ready-made content stream; fonts are the
//! standard Type1 set from [`StandardFont`], images are XObjects created
//! with [`PdfWriter::add_image`].

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::font::StandardFont;
use crate::error::{Error, Result};

/// A4 portrait in points.
pub const A4: PageSize = PageSize {
    width: 595.28,
    height: 841.89,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// The same sheet turned on its side.
    #[must_use]
    pub const fn landscape(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }
}

/// Pixel data ready to be placed on a page.
#[derive(Debug, Clone)]
pub enum ImageData {
    /// A baseline JPEG stream embedded unchanged
    Jpeg { bytes: Vec<u8>, gray: bool },
    /// 8-bit RGB samples with an optional 8-bit alpha plane
    Rgb { rgb: Vec<u8>, alpha: Option<Vec<u8>> },
}

#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    pub width: u32,
    pub height: u32,
    pub data: ImageData,
}

/// Incrementally built PDF document.
pub struct PdfWriter {
    doc: Document,
    pages_id: ObjectId,
    fonts: Dictionary,
    kids: Vec<ObjectId>,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        for font in StandardFont::ALL {
            let font_id = doc.add_object(Dictionary::from_iter([
                ("Type", Object::Name(b"Font".to_vec())),
                ("Subtype", Object::Name(b"Type1".to_vec())),
                ("BaseFont", Object::Name(font.base_font().as_bytes().to_vec())),
                ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
            ]));
            fonts.set(font.resource_name(), Object::Reference(font_id));
        }

        Self {
            doc,
            pages_id,
            fonts,
            kids: Vec::new(),
        }
    }

    /// Add an image XObject and return its id for use with [`Self::add_page`].
    pub fn add_image(&mut self, image: &EmbeddedImage) -> ObjectId {
        let mut dict = Dictionary::from_iter([
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Image".to_vec())),
            ("Width", Object::Integer(i64::from(image.width))),
            ("Height", Object::Integer(i64::from(image.height))),
            ("BitsPerComponent", Object::Integer(8)),
        ]);

        let stream = match &image.data {
            ImageData::Jpeg { bytes, gray } => {
                let space: &[u8] = if *gray { b"DeviceGray" } else { b"DeviceRGB" };
                dict.set("ColorSpace", Object::Name(space.to_vec()));
                dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
                Stream::new(dict, bytes.clone()).with_compression(false)
            }
            ImageData::Rgb { rgb, alpha } => {
                dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
                if let Some(alpha) = alpha {
                    let mask = Stream::new(
                        Dictionary::from_iter([
                            ("Type", Object::Name(b"XObject".to_vec())),
                            ("Subtype", Object::Name(b"Image".to_vec())),
                            ("Width", Object::Integer(i64::from(image.width))),
                            ("Height", Object::Integer(i64::from(image.height))),
                            ("ColorSpace", Object::Name(b"DeviceGray".to_vec())),
                            ("BitsPerComponent", Object::Integer(8)),
                        ]),
                        alpha.clone(),
                    );
                    let mask_id = self.doc.add_object(mask);
                    dict.set("SMask", Object::Reference(mask_id));
                }
                Stream::new(dict, rgb.clone())
            }
        };

        self.doc.add_object(stream)
    }

    /// Append a page drawn by `content`.
    ///
    /// `images` maps resource names used by `Do` operators to XObject ids.
    pub fn add_page(&mut self, size: PageSize, content: String, images: &[(&str, ObjectId)]) {
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let mut resources = Dictionary::from_iter([(
            "Font",
            Object::Dictionary(self.fonts.clone()),
        )]);
        if !images.is_empty() {
            let xobjects = images
                .iter()
                .map(|(name, id)| (*name, Object::Reference(*id)))
                .collect::<Dictionary>();
            resources.set("XObject", Object::Dictionary(xobjects));
        }

        let page_id = self.doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(self.pages_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Dictionary(resources)),
            (
                "MediaBox",
                Object::Array(vec![
                    0.into(),
                    0.into(),
                    Object::Real(size.width),
                    Object::Real(size.height),
                ]),
            ),
        ]));
        self.kids.push(page_id);
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Close the page tree and serialize the document.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        if self.kids.is_empty() {
            return Err(Error::RenderFault("document has no pages".to_string()));
        }

        #[allow(clippy::cast_possible_wrap)]
        let count = self.kids.len() as i64;
        let pages = Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            (
                "Kids",
                Object::Array(self.kids.iter().map(|id| Object::Reference(*id)).collect()),
            ),
            ("Count", Object::Integer(count)),
        ]);
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]));
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        self.doc.compress();

        let mut output = Vec::new();
        self.doc
            .save_to(&mut output)
            .map_err(|e| Error::PdfSave(format!("Failed to save PDF: {e}")))?;
        Ok(output)
    }
}
