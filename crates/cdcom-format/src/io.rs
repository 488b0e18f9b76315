// crates/cdcom-format/src/io.rs
//
// Byte-level primitives shared by the reader and writer. All integers
// are little-endian; strings carry a 7-bit variable-length byte count
// followed by UTF-8.

use cdcom_core::{
    ComponentPoint, ConnectionEdge, PointAnchor, PropertyType, PropertyValue, TextAlignment,
    TextRunFormatting,
};
use chrono::{DateTime, Utc};
use glam::DVec2;

use crate::consts::{TICKS_PER_SECOND, UNIX_EPOCH_TICKS};
use crate::{FormatError, Result};

const TAG_TEXT: u8 = 1;
const TAG_NUMERIC: u8 = 2;
const TAG_BOOLEAN: u8 = 3;

/// Cursor over a byte buffer. Every read is bounds-checked; running
/// off the end is an error, never a default value.
pub struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn seek(&mut self, position: usize) -> Result<()> {
        if position > self.data.len() {
            return Err(FormatError::UnexpectedEnd(position));
        }
        self.position = position;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.seek(self.position + count)
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        if self.remaining() < count {
            return Err(FormatError::UnexpectedEnd(self.data.len()));
        }
        let bytes = &self.data[self.position..self.position + count];
        self.position += count;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let bytes = self.read_bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(i64::from_le_bytes(buf))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let bytes = self.read_bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(f64::from_le_bytes(buf))
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// 7-bit length prefix followed by UTF-8 bytes.
    pub fn read_string(&mut self) -> Result<String> {
        let mut length: u32 = 0;
        let mut shift = 0;
        loop {
            let byte = self.read_u8()?;
            length |= ((byte & 0x7F) as u32) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
            if shift > 28 {
                return Err(FormatError::InvalidData(
                    "string length prefix too long".to_owned(),
                ));
            }
        }
        let bytes = self.read_bytes(length as usize)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| FormatError::InvalidData("string is not valid UTF-8".to_owned()))
    }

    pub fn read_tagged_value(&mut self) -> Result<PropertyValue> {
        match self.read_u8()? {
            TAG_TEXT => Ok(PropertyValue::Text(self.read_string()?)),
            TAG_NUMERIC => Ok(PropertyValue::Numeric(self.read_f64()?)),
            TAG_BOOLEAN => Ok(PropertyValue::Boolean(self.read_bool()?)),
            tag => Err(FormatError::InvalidData(format!(
                "unknown value tag {}",
                tag
            ))),
        }
    }

    pub fn read_dvec2(&mut self) -> Result<DVec2> {
        let x = self.read_f64()?;
        let y = self.read_f64()?;
        Ok(DVec2::new(x, y))
    }

    pub fn read_point(&mut self) -> Result<ComponentPoint> {
        let relative_to_x = anchor_from_u32(self.read_u32()?)?;
        let relative_to_y = anchor_from_u32(self.read_u32()?)?;
        let offset = self.read_dvec2()?;
        Ok(ComponentPoint::new(relative_to_x, relative_to_y, offset))
    }
}

/// Growable byte sink mirroring [`ByteReader`].
#[derive(Default)]
pub struct ByteWriter {
    data: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.data.push(value as u8);
    }

    pub fn write_string(&mut self, value: &str) {
        let mut remaining = value.len() as u32;
        while remaining >= 0x80 {
            self.data.push((remaining as u8) | 0x80);
            remaining >>= 7;
        }
        self.data.push(remaining as u8);
        self.data.extend_from_slice(value.as_bytes());
    }

    pub fn write_tagged_value(&mut self, value: &PropertyValue) {
        match value {
            PropertyValue::Text(s) => {
                self.write_u8(TAG_TEXT);
                self.write_string(s);
            }
            PropertyValue::Numeric(n) => {
                self.write_u8(TAG_NUMERIC);
                self.write_f64(*n);
            }
            PropertyValue::Boolean(b) => {
                self.write_u8(TAG_BOOLEAN);
                self.write_bool(*b);
            }
        }
    }

    pub fn write_dvec2(&mut self, value: DVec2) {
        self.write_f64(value.x);
        self.write_f64(value.y);
    }

    pub fn write_point(&mut self, point: &ComponentPoint) {
        self.write_u32(anchor_to_u32(point.relative_to_x));
        self.write_u32(anchor_to_u32(point.relative_to_y));
        self.write_dvec2(point.offset);
    }
}

pub(crate) fn anchor_to_u32(anchor: PointAnchor) -> u32 {
    match anchor {
        PointAnchor::Start => 0,
        PointAnchor::Middle => 1,
        PointAnchor::End => 2,
    }
}

pub(crate) fn anchor_from_u32(value: u32) -> Result<PointAnchor> {
    match value {
        0 => Ok(PointAnchor::Start),
        1 => Ok(PointAnchor::Middle),
        2 => Ok(PointAnchor::End),
        other => Err(FormatError::InvalidData(format!(
            "unknown point anchor {}",
            other
        ))),
    }
}

pub(crate) fn edge_to_i32(edge: ConnectionEdge) -> i32 {
    match edge {
        ConnectionEdge::None => 0,
        ConnectionEdge::Start => 1,
        ConnectionEdge::End => 2,
        ConnectionEdge::Both => 3,
    }
}

pub(crate) fn edge_from_i32(value: i32) -> Result<ConnectionEdge> {
    match value {
        0 => Ok(ConnectionEdge::None),
        1 => Ok(ConnectionEdge::Start),
        2 => Ok(ConnectionEdge::End),
        3 => Ok(ConnectionEdge::Both),
        other => Err(FormatError::InvalidData(format!(
            "unknown connection edge {}",
            other
        ))),
    }
}

pub(crate) fn alignment_to_u32(alignment: TextAlignment) -> u32 {
    match alignment {
        TextAlignment::TopLeft => 0,
        TextAlignment::TopCentre => 1,
        TextAlignment::TopRight => 2,
        TextAlignment::CentreLeft => 3,
        TextAlignment::CentreCentre => 4,
        TextAlignment::CentreRight => 5,
        TextAlignment::BottomLeft => 6,
        TextAlignment::BottomCentre => 7,
        TextAlignment::BottomRight => 8,
    }
}

pub(crate) fn alignment_from_u32(value: u32) -> Result<TextAlignment> {
    match value {
        0 => Ok(TextAlignment::TopLeft),
        1 => Ok(TextAlignment::TopCentre),
        2 => Ok(TextAlignment::TopRight),
        3 => Ok(TextAlignment::CentreLeft),
        4 => Ok(TextAlignment::CentreCentre),
        5 => Ok(TextAlignment::CentreRight),
        6 => Ok(TextAlignment::BottomLeft),
        7 => Ok(TextAlignment::BottomCentre),
        8 => Ok(TextAlignment::BottomRight),
        other => Err(FormatError::InvalidData(format!(
            "unknown text alignment {}",
            other
        ))),
    }
}

pub(crate) fn property_type_to_u8(kind: PropertyType) -> u8 {
    match kind {
        PropertyType::Text => 0,
        PropertyType::Decimal => 1,
        PropertyType::Integer => 2,
        PropertyType::Boolean => 3,
        PropertyType::Enumeration => 4,
    }
}

pub(crate) fn property_type_from_u8(value: u8) -> Result<PropertyType> {
    match value {
        0 => Ok(PropertyType::Text),
        1 => Ok(PropertyType::Decimal),
        2 => Ok(PropertyType::Integer),
        3 => Ok(PropertyType::Boolean),
        4 => Ok(PropertyType::Enumeration),
        other => Err(FormatError::InvalidData(format!(
            "unknown property kind {}",
            other
        ))),
    }
}

pub(crate) fn formatting_to_u32(formatting: TextRunFormatting) -> u32 {
    match formatting {
        TextRunFormatting::Normal => 0,
        TextRunFormatting::Subscript => 1,
        TextRunFormatting::Superscript => 2,
    }
}

pub(crate) fn formatting_from_u32(value: u32) -> Result<TextRunFormatting> {
    match value {
        0 => Ok(TextRunFormatting::Normal),
        1 => Ok(TextRunFormatting::Subscript),
        2 => Ok(TextRunFormatting::Superscript),
        other => Err(FormatError::InvalidData(format!(
            "unknown text formatting {}",
            other
        ))),
    }
}

/// Ticks are 100 ns intervals since 0001-01-01T00:00:00Z.
pub(crate) fn datetime_from_ticks(ticks: i64) -> Result<DateTime<Utc>> {
    // Widen so the epoch shift cannot overflow near the ends of the
    // i64 range.
    let unix_ticks = i128::from(ticks) - i128::from(UNIX_EPOCH_TICKS);
    let ticks_per_second = i128::from(TICKS_PER_SECOND);
    let secs = unix_ticks.div_euclid(ticks_per_second);
    let nanos = (unix_ticks.rem_euclid(ticks_per_second) * 100) as u32;
    i64::try_from(secs)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, nanos))
        .ok_or_else(|| FormatError::InvalidData(format!("timestamp out of range: {} ticks", ticks)))
}

pub(crate) fn datetime_to_ticks(datetime: &DateTime<Utc>) -> Result<i64> {
    let ticks = i128::from(UNIX_EPOCH_TICKS)
        + i128::from(datetime.timestamp()) * i128::from(TICKS_PER_SECOND)
        + i128::from(datetime.timestamp_subsec_nanos() / 100);
    i64::try_from(ticks).map_err(|_| {
        FormatError::InvalidData(format!("timestamp {} not representable in ticks", datetime))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_string_framing() {
        let mut writer = ByteWriter::new();
        writer.write_string("");
        writer.write_string("ohm");
        let long = "r".repeat(200);
        writer.write_string(&long);

        let buffer = writer.into_inner();
        // 200 needs a two-byte length prefix.
        assert_eq!(buffer.len(), 1 + (1 + 3) + (2 + 200));

        let mut reader = ByteReader::new(&buffer);
        assert_eq!(reader.read_string().unwrap(), "");
        assert_eq!(reader.read_string().unwrap(), "ohm");
        assert_eq!(reader.read_string().unwrap(), long);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_tagged_values() {
        let values = [
            PropertyValue::Text("4.7k\u{2126}".to_owned()),
            PropertyValue::Numeric(-0.5),
            PropertyValue::Boolean(true),
        ];

        let mut writer = ByteWriter::new();
        for value in &values {
            writer.write_tagged_value(value);
        }

        let buffer = writer.into_inner();
        let mut reader = ByteReader::new(&buffer);
        for value in &values {
            assert_eq!(&reader.read_tagged_value().unwrap(), value);
        }
    }

    #[test]
    fn test_unknown_value_tag_fails() {
        let mut reader = ByteReader::new(&[9, 0, 0]);
        assert!(matches!(
            reader.read_tagged_value(),
            Err(FormatError::InvalidData(_))
        ));
    }

    #[test]
    fn test_point_round_trip() {
        let point = ComponentPoint::new(
            PointAnchor::Middle,
            PointAnchor::End,
            DVec2::new(-4.0, 12.5),
        );
        let mut writer = ByteWriter::new();
        writer.write_point(&point);

        let buffer = writer.into_inner();
        let mut reader = ByteReader::new(&buffer);
        assert_eq!(reader.read_point().unwrap(), point);
    }

    #[test]
    fn test_truncated_read_fails() {
        let mut reader = ByteReader::new(&[1, 2]);
        assert!(matches!(
            reader.read_u32(),
            Err(FormatError::UnexpectedEnd(_))
        ));
    }

    #[test]
    fn test_ticks_at_unix_epoch() {
        let epoch = DateTime::<Utc>::UNIX_EPOCH;
        assert_eq!(datetime_to_ticks(&epoch).unwrap(), UNIX_EPOCH_TICKS);
        assert_eq!(datetime_from_ticks(UNIX_EPOCH_TICKS).unwrap(), epoch);
    }

    #[test]
    fn test_ticks_round_trip() {
        let moment = Utc.with_ymd_and_hms(2012, 7, 19, 21, 2, 15).unwrap();
        assert_eq!(
            datetime_from_ticks(datetime_to_ticks(&moment).unwrap()).unwrap(),
            moment
        );
    }

    #[test]
    fn test_ticks_before_unix_epoch() {
        let ticks = UNIX_EPOCH_TICKS - 5_000_000;
        let moment = datetime_from_ticks(ticks).unwrap();
        assert_eq!(
            moment,
            DateTime::from_timestamp(-1, 500_000_000).unwrap()
        );
        assert_eq!(datetime_to_ticks(&moment).unwrap(), ticks);
    }

    #[test]
    fn test_extreme_ticks_convert_without_overflow() {
        let earliest = datetime_from_ticks(i64::MIN).unwrap();
        assert_eq!(datetime_to_ticks(&earliest).unwrap(), i64::MIN);

        let latest = datetime_from_ticks(i64::MAX).unwrap();
        assert_eq!(datetime_to_ticks(&latest).unwrap(), i64::MAX);
    }

    #[test]
    fn test_far_future_datetime_fails_to_encode() {
        // Within chrono's range but past what i64 ticks can hold.
        let moment = DateTime::from_timestamp(4_000_000_000_000, 0).unwrap();
        assert!(matches!(
            datetime_to_ticks(&moment),
            Err(FormatError::InvalidData(_))
        ));
    }
}
