//! Builds small TIFF files carrying EXIF fields for tests.

use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use std::io::Cursor;

#[derive(Debug, Default)]
pub(crate) struct ExifFixture {
    gps: Option<(f64, f64)>,
    taken: Option<String>,
    modified: Option<String>,
    make: Option<String>,
    model: Option<String>,
}

impl ExifFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gps(mut self, latitude: f64, longitude: f64) -> Self {
        self.gps = Some((latitude, longitude));
        self
    }

    pub fn taken(mut self, datetime: &str) -> Self {
        self.taken = Some(datetime.to_string());
        self
    }

    pub fn modified(mut self, datetime: &str) -> Self {
        self.modified = Some(datetime.to_string());
        self
    }

    pub fn make(mut self, make: &str) -> Self {
        self.make = Some(make.to_string());
        self
    }

    pub fn device(mut self, make: &str, model: &str) -> Self {
        self.make = Some(make.to_string());
        self.model = Some(model.to_string());
        self
    }

    pub fn to_tiff(&self) -> Vec<u8> {
        let mut fields = Vec::new();

        if let Some(ref make) = self.make {
            fields.push(ascii(Tag::Make, make));
        }
        if let Some(ref model) = self.model {
            fields.push(ascii(Tag::Model, model));
        }
        if let Some(ref modified) = self.modified {
            fields.push(ascii(Tag::DateTime, modified));
        }
        if let Some(ref taken) = self.taken {
            fields.push(ascii(Tag::DateTimeOriginal, taken));
        }
        if let Some((lat, lon)) = self.gps {
            fields.push(ascii(Tag::GPSLatitudeRef, if lat < 0.0 { "S" } else { "N" }));
            fields.push(dms(Tag::GPSLatitude, lat.abs()));
            fields.push(ascii(Tag::GPSLongitudeRef, if lon < 0.0 { "W" } else { "E" }));
            fields.push(dms(Tag::GPSLongitude, lon.abs()));
        }

        let mut writer = Writer::new();
        for field in &fields {
            writer.push_field(field);
        }

        let mut buf = Cursor::new(Vec::new());
        writer.write(&mut buf, true).expect("write tiff fixture");
        buf.into_inner()
    }

    /// The same EXIF block inside a minimal JPEG: SOI, an APP1 `Exif` segment
    /// and EOI, the layout camera and browser captures arrive in.
    pub fn to_jpeg(&self) -> Vec<u8> {
        let tiff = self.to_tiff();
        let segment_len = u16::try_from(2 + 6 + tiff.len()).expect("APP1 segment fits in u16");

        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
        jpeg.extend_from_slice(&segment_len.to_be_bytes());
        jpeg.extend_from_slice(b"Exif\0\0");
        jpeg.extend_from_slice(&tiff);
        jpeg.extend_from_slice(&[0xFF, 0xD9]);
        jpeg
    }
}

fn ascii(tag: Tag, text: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![text.as_bytes().to_vec()]),
    }
}

fn dms(tag: Tag, decimal: f64) -> Field {
    let degrees = decimal.trunc();
    let minutes = ((decimal - degrees) * 60.0).trunc();
    let seconds = (decimal - degrees - minutes / 60.0) * 3600.0;

    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Rational(vec![
            Rational { num: degrees as u32, denom: 1 },
            Rational { num: minutes as u32, denom: 1 },
            Rational { num: (seconds * 1000.0).round() as u32, denom: 1000 },
        ]),
    }
}
