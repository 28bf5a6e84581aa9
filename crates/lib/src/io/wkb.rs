//! Well-Known Binary encoding: one byte of endianness, one type tag, a
//! flags byte, then the payload. HexWKB is the same stream in ASCII hex.
//!
//! Temporal flags byte: bit 0 has-X, bit 1 has-T, bit 4 has-Z, bit 5
//! geodetic, bit 6 has-SRID, bit 7 linear interpolation. Span bounds
//! byte: bit 0 lower_inc, bit 1 upper_inc. Temporal subtypes are 1 =
//! instant, 2 = instant set, 3 = sequence, 4 = sequence set.

use smol_str::SmolStr;

use tempora_core::datum::Datum;
use tempora_core::errors::{TemporalError, TemporalResult};
use tempora_core::geo::GeoPoint;
use tempora_core::set::Set;
use tempora_core::span::Span;
use tempora_core::spanset::SpanSet;
use tempora_core::stbox::{STBox, SpatialDims};
use tempora_core::tbox::TBox;
use tempora_core::temporal::{
    TInstant, TInstantSet, TSequence, TSequenceSet, Temporal, TemporalOps,
};
use tempora_core::timestamp::{Date, TimestampTz};
use tempora_core::types::{BaseType, Interp, TempType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    /// Little endian (NDR), the default on every platform we meet.
    #[default]
    Ndr,
    /// Big endian (XDR).
    Xdr,
}

/// The closed type-tag table of the binary format.
mod tag {
    pub const BOOL: u8 = 1;
    pub const TEXT: u8 = 2;
    pub const DATE: u8 = 3;
    pub const TIMESTAMPTZ: u8 = 4;
    pub const FLOAT8: u8 = 5;
    pub const FLOATSPAN: u8 = 6;
    pub const INT4: u8 = 7;
    pub const INTSPAN: u8 = 8;
    pub const INTSPANSET: u8 = 9;
    pub const PERIOD: u8 = 10;
    pub const PERIODSET: u8 = 11;
    pub const STBOX: u8 = 12;
    pub const TBOOL: u8 = 13;
    pub const TBOX: u8 = 14;
    pub const FLOATSPANSET: u8 = 15;
    pub const INTSET: u8 = 16;
    pub const FLOATSET: u8 = 17;
    pub const TSTZSET: u8 = 18;
    pub const TFLOAT: u8 = 19;
    pub const TTEXT: u8 = 20;
    pub const TGEOMPOINT: u8 = 21;
    pub const TINT: u8 = 22;
    pub const TGEOGPOINT: u8 = 23;
    pub const TEXTSET: u8 = 24;
    pub const DATESPAN: u8 = 25;
}

const FLAG_X: u8 = 0x01;
const FLAG_T: u8 = 0x02;
const FLAG_Z: u8 = 0x10;
const FLAG_GEODETIC: u8 = 0x20;
const FLAG_SRID: u8 = 0x40;
const FLAG_LINEAR: u8 = 0x80;

/*************************** writer ***************************/

struct Writer {
    buf: Vec<u8>,
    endian: Endian,
}

impl Writer {
    fn new(endian: Endian) -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.push(match endian {
            Endian::Ndr => 0x01,
            Endian::Xdr => 0x00,
        });
        Self { buf, endian }
    }

    fn byte(&mut self, value: u8) {
        self.buf.push(value);
    }

    fn i32(&mut self, value: i32) {
        match self.endian {
            Endian::Ndr => self.buf.extend_from_slice(&value.to_le_bytes()),
            Endian::Xdr => self.buf.extend_from_slice(&value.to_be_bytes()),
        }
    }

    fn i64(&mut self, value: i64) {
        match self.endian {
            Endian::Ndr => self.buf.extend_from_slice(&value.to_le_bytes()),
            Endian::Xdr => self.buf.extend_from_slice(&value.to_be_bytes()),
        }
    }

    fn f64(&mut self, value: f64) {
        match self.endian {
            Endian::Ndr => self.buf.extend_from_slice(&value.to_le_bytes()),
            Endian::Xdr => self.buf.extend_from_slice(&value.to_be_bytes()),
        }
    }

    fn text(&mut self, value: &str) {
        self.i32(value.len() as i32);
        self.buf.extend_from_slice(value.as_bytes());
    }

    fn bounds_byte(&mut self, lower_inc: bool, upper_inc: bool) {
        let mut bounds = 0;
        if lower_inc {
            bounds |= 0x01;
        }
        if upper_inc {
            bounds |= 0x02;
        }
        self.byte(bounds);
    }
}

fn base_value_tag(basetype: BaseType) -> TemporalResult<u8> {
    Ok(match basetype {
        BaseType::Bool => tag::BOOL,
        BaseType::Text => tag::TEXT,
        BaseType::Date => tag::DATE,
        BaseType::Timestamp => tag::TIMESTAMPTZ,
        BaseType::Float => tag::FLOAT8,
        BaseType::Int => tag::INT4,
        other => {
            return Err(TemporalError::mismatch(format!(
                "{} has no binary form",
                <&'static str>::from(other)
            )));
        }
    })
}

fn span_tag(basetype: BaseType) -> TemporalResult<u8> {
    Ok(match basetype {
        BaseType::Int => tag::INTSPAN,
        BaseType::Float => tag::FLOATSPAN,
        BaseType::Timestamp => tag::PERIOD,
        BaseType::Date => tag::DATESPAN,
        other => {
            return Err(TemporalError::mismatch(format!(
                "no span tag for {}",
                <&'static str>::from(other)
            )));
        }
    })
}

fn set_tag(basetype: BaseType) -> TemporalResult<u8> {
    Ok(match basetype {
        BaseType::Int => tag::INTSET,
        BaseType::Float => tag::FLOATSET,
        BaseType::Timestamp => tag::TSTZSET,
        BaseType::Text => tag::TEXTSET,
        other => {
            return Err(TemporalError::mismatch(format!(
                "no set tag for {}",
                <&'static str>::from(other)
            )));
        }
    })
}

fn spanset_tag(basetype: BaseType) -> TemporalResult<u8> {
    Ok(match basetype {
        BaseType::Int => tag::INTSPANSET,
        BaseType::Float => tag::FLOATSPANSET,
        BaseType::Timestamp => tag::PERIODSET,
        other => {
            return Err(TemporalError::mismatch(format!(
                "no span set tag for {}",
                <&'static str>::from(other)
            )));
        }
    })
}

fn temporal_tag(temptype: TempType) -> TemporalResult<u8> {
    Ok(match temptype {
        TempType::Tbool => tag::TBOOL,
        TempType::Tint => tag::TINT,
        TempType::Tfloat => tag::TFLOAT,
        TempType::Ttext => tag::TTEXT,
        TempType::Tgeompoint => tag::TGEOMPOINT,
        TempType::Tgeogpoint => tag::TGEOGPOINT,
        other => {
            return Err(TemporalError::mismatch(format!(
                "{} has no binary form",
                <&'static str>::from(other)
            )));
        }
    })
}

fn write_scalar(writer: &mut Writer, value: &Datum) -> TemporalResult<()> {
    match value {
        Datum::Bool(v) => writer.byte(u8::from(*v)),
        Datum::Int(v) => writer.i32(*v),
        Datum::Float(v) => writer.f64(*v),
        Datum::Text(v) => writer.text(v),
        Datum::Timestamp(v) => writer.i64(v.micros()),
        Datum::Date(v) => writer.i32(v.days()),
        other => {
            return Err(TemporalError::mismatch(format!(
                "{} has no scalar binary form",
                <&'static str>::from(other.basetype())
            )));
        }
    }
    Ok(())
}

fn write_span_body(writer: &mut Writer, span: &Span) -> TemporalResult<()> {
    writer.bounds_byte(span.lower_inc, span.upper_inc);
    write_scalar(writer, &span.lower)?;
    write_scalar(writer, &span.upper)
}

pub fn base_as_wkb(value: &Datum, endian: Endian) -> TemporalResult<Vec<u8>> {
    let mut writer = Writer::new(endian);
    writer.byte(base_value_tag(value.basetype())?);
    write_scalar(&mut writer, value)?;
    Ok(writer.buf)
}

pub fn span_as_wkb(span: &Span, endian: Endian) -> TemporalResult<Vec<u8>> {
    let mut writer = Writer::new(endian);
    writer.byte(span_tag(span.basetype)?);
    write_span_body(&mut writer, span)?;
    Ok(writer.buf)
}

pub fn set_as_wkb(set: &Set, endian: Endian) -> TemporalResult<Vec<u8>> {
    let mut writer = Writer::new(endian);
    writer.byte(set_tag(set.basetype())?);
    writer.i32(set.len() as i32);
    for value in set.values() {
        write_scalar(&mut writer, value)?;
    }
    Ok(writer.buf)
}

pub fn spanset_as_wkb(spans: &SpanSet, endian: Endian) -> TemporalResult<Vec<u8>> {
    let mut writer = Writer::new(endian);
    writer.byte(spanset_tag(spans.basetype())?);
    writer.i32(spans.len() as i32);
    for span in spans.spans() {
        write_span_body(&mut writer, span)?;
    }
    Ok(writer.buf)
}

pub fn tbox_as_wkb(tbox: &TBox, endian: Endian) -> TemporalResult<Vec<u8>> {
    let mut writer = Writer::new(endian);
    writer.byte(tag::TBOX);
    let mut flags = 0;
    if tbox.has_x() {
        flags |= FLAG_X;
    }
    if tbox.has_t() {
        flags |= FLAG_T;
    }
    writer.byte(flags);
    if let Some(span) = tbox.x() {
        writer.byte(span_tag(span.basetype)?);
        write_span_body(&mut writer, span)?;
    }
    if let Some(period) = tbox.t() {
        write_span_body(&mut writer, period)?;
    }
    Ok(writer.buf)
}

pub fn stbox_as_wkb(stbox: &STBox, endian: Endian) -> TemporalResult<Vec<u8>> {
    let mut writer = Writer::new(endian);
    writer.byte(tag::STBOX);
    let mut flags = 0;
    if stbox.has_space() {
        flags |= FLAG_X;
    }
    if stbox.has_z() {
        flags |= FLAG_Z;
    }
    if stbox.has_t() {
        flags |= FLAG_T;
    }
    if stbox.is_geodetic() {
        flags |= FLAG_GEODETIC;
    }
    if stbox.srid() != 0 {
        flags |= FLAG_SRID;
    }
    writer.byte(flags);
    if stbox.srid() != 0 {
        writer.i32(stbox.srid());
    }
    if let Some(period) = stbox.t() {
        write_span_body(&mut writer, period)?;
    }
    if let Some(dims) = stbox.space() {
        writer.f64(dims.xmin);
        writer.f64(dims.xmax);
        writer.f64(dims.ymin);
        writer.f64(dims.ymax);
        if let Some((zmin, zmax)) = dims.z {
            writer.f64(zmin);
            writer.f64(zmax);
        }
    }
    Ok(writer.buf)
}

fn temporal_flags(temp: &Temporal) -> u8 {
    let mut flags = FLAG_X | FLAG_T;
    if temp.interp() == Interp::Linear {
        flags |= FLAG_LINEAR;
    }
    if let Some(inst) = temp.inst_n(0) {
        if let Some(point) = inst.value().as_point() {
            if point.has_z() {
                flags |= FLAG_Z;
            }
            if point.geodetic {
                flags |= FLAG_GEODETIC;
            }
            if point.srid != 0 {
                flags |= FLAG_SRID;
            }
        }
    }
    flags
}

fn write_temporal_value(writer: &mut Writer, value: &Datum) -> TemporalResult<()> {
    match value {
        Datum::Geom(point) | Datum::Geog(point) => {
            writer.f64(point.x);
            writer.f64(point.y);
            if let Some(z) = point.z {
                writer.f64(z);
            }
            Ok(())
        }
        other => write_scalar(writer, other),
    }
}

fn write_instant(writer: &mut Writer, inst: &TInstant) -> TemporalResult<()> {
    write_temporal_value(writer, inst.value())?;
    writer.i64(inst.timestamp().micros());
    Ok(())
}

fn write_sequence(writer: &mut Writer, seq: &TSequence) -> TemporalResult<()> {
    writer.i32(seq.num_instants() as i32);
    writer.bounds_byte(seq.lower_inc(), seq.upper_inc());
    for inst in seq.instants() {
        write_instant(writer, inst)?;
    }
    Ok(())
}

pub fn temporal_as_wkb(temp: &Temporal, endian: Endian) -> TemporalResult<Vec<u8>> {
    let mut writer = Writer::new(endian);
    writer.byte(temporal_tag(temp.temptype())?);
    let flags = temporal_flags(temp);
    writer.byte(flags);
    let subtype = match temp {
        Temporal::Instant(_) => 1,
        Temporal::InstantSet(_) => 2,
        Temporal::Sequence(_) => 3,
        Temporal::SequenceSet(_) => 4,
    };
    writer.byte(subtype);
    if flags & FLAG_SRID != 0 {
        let srid = temp
            .inst_n(0)
            .and_then(|inst| inst.value().as_point().map(|p| p.srid))
            .unwrap_or(0);
        writer.i32(srid);
    }
    match temp {
        Temporal::Instant(inst) => write_instant(&mut writer, inst)?,
        Temporal::InstantSet(iset) => {
            writer.i32(iset.num_instants() as i32);
            for inst in iset.instants() {
                write_instant(&mut writer, inst)?;
            }
        }
        Temporal::Sequence(seq) => write_sequence(&mut writer, seq)?,
        Temporal::SequenceSet(ss) => {
            writer.i32(ss.len() as i32);
            for seq in ss.sequences() {
                write_sequence(&mut writer, seq)?;
            }
        }
    }
    Ok(writer.buf)
}

pub fn as_hexwkb(wkb: &[u8]) -> String {
    hex::encode_upper(wkb)
}

/*************************** reader ***************************/

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> TemporalResult<Self> {
        let mut reader = Self {
            buf,
            pos: 0,
            endian: Endian::Ndr,
        };
        reader.endian = match reader.byte()? {
            0x01 => Endian::Ndr,
            0x00 => Endian::Xdr,
            other => {
                return Err(TemporalError::parse(
                    format!("invalid endian byte {other:#04x}"),
                    0,
                ));
            }
        };
        Ok(reader)
    }

    fn error(&self, message: impl Into<String>) -> TemporalError {
        TemporalError::parse(message, self.pos)
    }

    fn take(&mut self, n: usize) -> TemporalResult<&'a [u8]> {
        if self.pos + n > self.buf.len() {
            return Err(self.error("unexpected end of input"));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn byte(&mut self) -> TemporalResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn i32(&mut self) -> TemporalResult<i32> {
        let bytes: [u8; 4] = self.take(4)?.try_into().unwrap();
        Ok(match self.endian {
            Endian::Ndr => i32::from_le_bytes(bytes),
            Endian::Xdr => i32::from_be_bytes(bytes),
        })
    }

    fn i64(&mut self) -> TemporalResult<i64> {
        let bytes: [u8; 8] = self.take(8)?.try_into().unwrap();
        Ok(match self.endian {
            Endian::Ndr => i64::from_le_bytes(bytes),
            Endian::Xdr => i64::from_be_bytes(bytes),
        })
    }

    fn f64(&mut self) -> TemporalResult<f64> {
        Ok(f64::from_bits(match self.endian {
            Endian::Ndr => u64::from_le_bytes(self.take(8)?.try_into().unwrap()),
            Endian::Xdr => u64::from_be_bytes(self.take(8)?.try_into().unwrap()),
        }))
    }

    fn text(&mut self) -> TemporalResult<SmolStr> {
        let len = self.i32()?;
        if len < 0 {
            return Err(self.error("negative text length"));
        }
        let bytes = self.take(len as usize)?;
        std::str::from_utf8(bytes)
            .map(SmolStr::new)
            .map_err(|_| self.error("text payload is not UTF-8"))
    }

    fn bounds(&mut self) -> TemporalResult<(bool, bool)> {
        let bounds = self.byte()?;
        Ok((bounds & 0x01 != 0, bounds & 0x02 != 0))
    }

    fn scalar(&mut self, basetype: BaseType) -> TemporalResult<Datum> {
        Ok(match basetype {
            BaseType::Bool => Datum::Bool(self.byte()? != 0),
            BaseType::Int => Datum::Int(self.i32()?),
            BaseType::Float => Datum::Float(self.f64()?),
            BaseType::Text => Datum::Text(self.text()?),
            BaseType::Timestamp => Datum::Timestamp(TimestampTz::from_micros(self.i64()?)),
            BaseType::Date => Datum::Date(Date::from_days(self.i32()?)),
            other => {
                return Err(self.error(format!(
                    "{} has no scalar binary form",
                    <&'static str>::from(other)
                )));
            }
        })
    }

    fn span_body(&mut self, basetype: BaseType) -> TemporalResult<Span> {
        let (lower_inc, upper_inc) = self.bounds()?;
        let lower = self.scalar(basetype)?;
        let upper = self.scalar(basetype)?;
        Span::new(lower, upper, lower_inc, upper_inc)
    }
}

fn span_basetype_of_tag(tag_byte: u8) -> Option<BaseType> {
    match tag_byte {
        tag::INTSPAN => Some(BaseType::Int),
        tag::FLOATSPAN => Some(BaseType::Float),
        tag::PERIOD => Some(BaseType::Timestamp),
        tag::DATESPAN => Some(BaseType::Date),
        _ => None,
    }
}

/// Any value the binary format can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum WkbValue {
    Base(Datum),
    Span(Span),
    Set(Set),
    SpanSet(SpanSet),
    TBox(TBox),
    STBox(STBox),
    Temporal(Temporal),
}

pub fn from_wkb(buf: &[u8]) -> TemporalResult<WkbValue> {
    let mut reader = Reader::new(buf)?;
    let type_tag = reader.byte()?;
    match type_tag {
        tag::BOOL => Ok(WkbValue::Base(reader.scalar(BaseType::Bool)?)),
        tag::TEXT => Ok(WkbValue::Base(reader.scalar(BaseType::Text)?)),
        tag::DATE => Ok(WkbValue::Base(reader.scalar(BaseType::Date)?)),
        tag::TIMESTAMPTZ => Ok(WkbValue::Base(reader.scalar(BaseType::Timestamp)?)),
        tag::FLOAT8 => Ok(WkbValue::Base(reader.scalar(BaseType::Float)?)),
        tag::INT4 => Ok(WkbValue::Base(reader.scalar(BaseType::Int)?)),
        tag::INTSPAN | tag::FLOATSPAN | tag::PERIOD | tag::DATESPAN => {
            let basetype = span_basetype_of_tag(type_tag).unwrap();
            Ok(WkbValue::Span(reader.span_body(basetype)?))
        }
        tag::INTSET | tag::FLOATSET | tag::TSTZSET | tag::TEXTSET => {
            let basetype = match type_tag {
                tag::INTSET => BaseType::Int,
                tag::FLOATSET => BaseType::Float,
                tag::TSTZSET => BaseType::Timestamp,
                _ => BaseType::Text,
            };
            let count = reader.i32()?;
            let mut values = Vec::with_capacity(count.max(0) as usize);
            for _ in 0..count {
                values.push(reader.scalar(basetype)?);
            }
            Ok(WkbValue::Set(Set::new(values)?))
        }
        tag::INTSPANSET | tag::FLOATSPANSET | tag::PERIODSET => {
            let basetype = match type_tag {
                tag::INTSPANSET => BaseType::Int,
                tag::FLOATSPANSET => BaseType::Float,
                _ => BaseType::Timestamp,
            };
            let count = reader.i32()?;
            let mut spans = Vec::with_capacity(count.max(0) as usize);
            for _ in 0..count {
                spans.push(reader.span_body(basetype)?);
            }
            Ok(WkbValue::SpanSet(SpanSet::new(spans)?))
        }
        tag::TBOX => {
            let flags = reader.byte()?;
            let x = if flags & FLAG_X != 0 {
                let span_tag_byte = reader.byte()?;
                let basetype = span_basetype_of_tag(span_tag_byte).ok_or_else(|| {
                    TemporalError::parse(
                        format!("invalid span tag {span_tag_byte}"),
                        reader.pos,
                    )
                })?;
                Some(reader.span_body(basetype)?)
            } else {
                None
            };
            let t = if flags & FLAG_T != 0 {
                Some(reader.span_body(BaseType::Timestamp)?)
            } else {
                None
            };
            Ok(WkbValue::TBox(TBox::new(x, t)?))
        }
        tag::STBOX => {
            let flags = reader.byte()?;
            let srid = if flags & FLAG_SRID != 0 { reader.i32()? } else { 0 };
            let t = if flags & FLAG_T != 0 {
                Some(reader.span_body(BaseType::Timestamp)?)
            } else {
                None
            };
            let space = if flags & FLAG_X != 0 {
                let xmin = reader.f64()?;
                let xmax = reader.f64()?;
                let ymin = reader.f64()?;
                let ymax = reader.f64()?;
                let z = if flags & FLAG_Z != 0 {
                    Some((reader.f64()?, reader.f64()?))
                } else {
                    None
                };
                Some(SpatialDims {
                    xmin,
                    xmax,
                    ymin,
                    ymax,
                    z,
                })
            } else {
                None
            };
            Ok(WkbValue::STBox(STBox::new(
                space,
                t,
                srid,
                flags & FLAG_GEODETIC != 0,
            )?))
        }
        tag::TBOOL | tag::TINT | tag::TFLOAT | tag::TTEXT | tag::TGEOMPOINT
        | tag::TGEOGPOINT => {
            let temptype = match type_tag {
                tag::TBOOL => TempType::Tbool,
                tag::TINT => TempType::Tint,
                tag::TFLOAT => TempType::Tfloat,
                tag::TTEXT => TempType::Ttext,
                tag::TGEOMPOINT => TempType::Tgeompoint,
                _ => TempType::Tgeogpoint,
            };
            Ok(WkbValue::Temporal(read_temporal(&mut reader, temptype)?))
        }
        other => Err(TemporalError::parse(
            format!("unknown type tag {other}"),
            1,
        )),
    }
}

fn read_temporal(reader: &mut Reader<'_>, temptype: TempType) -> TemporalResult<Temporal> {
    let flags = reader.byte()?;
    let subtype = reader.byte()?;
    let srid = if flags & FLAG_SRID != 0 { reader.i32()? } else { 0 };
    let interp = if flags & FLAG_LINEAR != 0 {
        Interp::Linear
    } else {
        Interp::Step
    };
    let geodetic = flags & FLAG_GEODETIC != 0;
    let has_z = flags & FLAG_Z != 0;

    let read_value = |reader: &mut Reader<'_>| -> TemporalResult<Datum> {
        match temptype {
            TempType::Tgeompoint | TempType::Tgeogpoint => {
                let x = reader.f64()?;
                let y = reader.f64()?;
                let z = if has_z { Some(reader.f64()?) } else { None };
                let point = GeoPoint {
                    x,
                    y,
                    z,
                    srid,
                    geodetic,
                };
                Ok(if temptype == TempType::Tgeogpoint {
                    Datum::Geog(point)
                } else {
                    Datum::Geom(point)
                })
            }
            _ => reader.scalar(temptype.basetype()),
        }
    };
    let read_instant = |reader: &mut Reader<'_>| -> TemporalResult<TInstant> {
        let value = read_value(reader)?;
        let t = TimestampTz::from_micros(reader.i64()?);
        TInstant::new(temptype, value, t)
    };
    let read_sequence = |reader: &mut Reader<'_>| -> TemporalResult<TSequence> {
        let count = reader.i32()?;
        let (lower_inc, upper_inc) = reader.bounds()?;
        let mut instants = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            instants.push(read_instant(reader)?);
        }
        TSequence::new(instants, interp, lower_inc, upper_inc)
    };

    match subtype {
        1 => Ok(Temporal::Instant(read_instant(reader)?)),
        2 => {
            let count = reader.i32()?;
            let mut instants = Vec::with_capacity(count.max(0) as usize);
            for _ in 0..count {
                instants.push(read_instant(reader)?);
            }
            Ok(Temporal::InstantSet(TInstantSet::new(instants)?))
        }
        3 => Ok(Temporal::Sequence(read_sequence(reader)?)),
        4 => {
            let count = reader.i32()?;
            let mut sequences = Vec::with_capacity(count.max(0) as usize);
            for _ in 0..count {
                sequences.push(read_sequence(reader)?);
            }
            Ok(Temporal::SequenceSet(TSequenceSet::new(sequences)?))
        }
        other => Err(TemporalError::parse(
            format!("invalid temporal subtype {other}"),
            2,
        )),
    }
}

pub fn from_hexwkb(text: &str) -> TemporalResult<WkbValue> {
    let bytes = hex::decode(text.trim())
        .map_err(|e| TemporalError::parse(format!("invalid hex: {e}"), 0))?;
    from_wkb(&bytes)
}
