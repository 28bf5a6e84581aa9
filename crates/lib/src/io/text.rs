//! Canonical textual representation: output with a decimal-digit knob,
//! and hand-written recursive-descent parsers that report the byte
//! offset of the first offending character.

use itertools::Itertools;

use tempora_core::datum::Datum;
use tempora_core::errors::{TemporalError, TemporalResult};
use tempora_core::geo::{Cbuffer, GeoPoint, Npoint};
use tempora_core::set::Set;
use tempora_core::span::Span;
use tempora_core::spanset::SpanSet;
use tempora_core::stbox::{STBox, SpatialDims};
use tempora_core::tbox::TBox;
use tempora_core::temporal::{
    TInstant, TInstantSet, TSequence, TSequenceSet, Temporal, TemporalOps,
};
use tempora_core::timestamp::TimestampTz;
use tempora_core::types::{BaseType, Interp, TempType};

pub const DEFAULT_DECIMAL_DIGITS: usize = 15;

/*************************** output ***************************/

/// Format a float with at most `digits` decimals, trimming the trailing
/// zeros the rounding leaves behind.
pub fn float_out(value: f64, digits: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let mut text = format!("{value:.digits$}");
    if text.contains('.') {
        while text.ends_with('0') {
            text.pop();
        }
        if text.ends_with('.') {
            text.pop();
        }
    }
    text
}

pub fn datum_out(value: &Datum, digits: usize) -> String {
    match value {
        Datum::Float(v) => float_out(*v, digits),
        Datum::Geom(p) | Datum::Geog(p) => point_out(p, digits),
        Datum::Cbuffer(c) => format!(
            "Cbuffer({},{})",
            point_out(&c.center, digits),
            float_out(c.radius, digits)
        ),
        other => other.to_string(),
    }
}

fn point_out(point: &GeoPoint, digits: usize) -> String {
    match point.z {
        Some(z) => format!(
            "POINT Z ({} {} {})",
            float_out(point.x, digits),
            float_out(point.y, digits),
            float_out(z, digits)
        ),
        None => format!(
            "POINT({} {})",
            float_out(point.x, digits),
            float_out(point.y, digits)
        ),
    }
}

pub fn span_out(span: &Span, digits: usize) -> String {
    format!(
        "{}{}, {}{}",
        if span.lower_inc { '[' } else { '(' },
        datum_out(&span.lower, digits),
        datum_out(&span.upper, digits),
        if span.upper_inc { ']' } else { ')' },
    )
}

pub fn set_out(set: &Set, digits: usize) -> String {
    format!(
        "{{{}}}",
        set.values().iter().map(|v| datum_out(v, digits)).join(", ")
    )
}

pub fn spanset_out(spans: &SpanSet, digits: usize) -> String {
    format!(
        "{{{}}}",
        spans.spans().iter().map(|s| span_out(s, digits)).join(", ")
    )
}

pub fn tbox_out(tbox: &TBox, digits: usize) -> String {
    match (tbox.x(), tbox.t()) {
        (Some(x), Some(t)) => format!("TBOX XT({}, {})", span_out(x, digits), span_out(t, digits)),
        (Some(x), None) => format!("TBOX X({})", span_out(x, digits)),
        (None, Some(t)) => format!("TBOX T({})", span_out(t, digits)),
        (None, None) => "TBOX()".to_string(),
    }
}

pub fn stbox_out(stbox: &STBox, digits: usize) -> String {
    let tag = if stbox.is_geodetic() { "GEODSTBOX" } else { "STBOX" };
    let prefix = if stbox.srid() != 0 {
        format!("SRID={};", stbox.srid())
    } else {
        String::new()
    };
    match (stbox.space(), stbox.t()) {
        (Some(dims), t) => {
            let zt = match (dims.z, t) {
                (Some(_), Some(_)) => "ZT",
                (Some(_), None) => "Z",
                (None, Some(_)) => "XT",
                (None, None) => "X",
            };
            let corner = |x: f64, y: f64, z: Option<f64>| match z {
                Some(z) => format!(
                    "({} {} {})",
                    float_out(x, digits),
                    float_out(y, digits),
                    float_out(z, digits)
                ),
                None => format!("({} {})", float_out(x, digits), float_out(y, digits)),
            };
            let mut body = corner(dims.xmin, dims.ymin, dims.z.map(|z| z.0));
            body.push(',');
            body.push_str(&corner(dims.xmax, dims.ymax, dims.z.map(|z| z.1)));
            if let Some(period) = t {
                body.push(',');
                body.push_str(&span_out(period, digits));
            }
            format!("{prefix}{tag} {zt}({body})")
        }
        (None, Some(period)) => format!("{prefix}{tag} T({})", span_out(period, digits)),
        (None, None) => format!("{prefix}{tag}()"),
    }
}

pub fn stbox_in(text: &str) -> TemporalResult<STBox> {
    let mut parser = Parser::new(text);
    let mut srid = 0;
    if parser.eat_keyword("srid=") {
        srid = parser.number()? as i32;
        parser.eat(';')?;
    }
    let geodetic = if parser.eat_keyword("geodstbox") {
        true
    } else if parser.eat_keyword("stbox") {
        false
    } else {
        return Err(parser.error("expected STBOX or GEODSTBOX"));
    };
    let (has_space, has_z, has_t) = if parser.eat_keyword("zt") {
        (true, true, true)
    } else if parser.eat_keyword("z") {
        (true, true, false)
    } else if parser.eat_keyword("xt") {
        (true, false, true)
    } else if parser.eat_keyword("x") {
        (true, false, false)
    } else if parser.eat_keyword("t") {
        (false, false, true)
    } else {
        return Err(parser.error("expected one of X, Z, T, XT or ZT"));
    };
    parser.eat('(')?;

    // A time-only box goes straight to the period.
    if !has_space {
        let period = parser.span(BaseType::Timestamp)?;
        parser.eat(')')?;
        parser.ensure_done()?;
        return STBox::new(None, Some(period), srid, geodetic);
    }

    let mut corner = |parser: &mut Parser<'_>| -> TemporalResult<(f64, f64, Option<f64>)> {
        parser.eat('(')?;
        let x = parser.number()?;
        let y = parser.number()?;
        let z = if has_z { Some(parser.number()?) } else { None };
        parser.eat(')')?;
        Ok((x, y, z))
    };
    let (xmin, ymin, zmin) = corner(&mut parser)?;
    parser.eat(',')?;
    let (xmax, ymax, zmax) = corner(&mut parser)?;
    let t = if has_t {
        parser.eat(',')?;
        Some(parser.span(BaseType::Timestamp)?)
    } else {
        None
    };
    parser.eat(')')?;
    parser.ensure_done()?;
    STBox::new(
        Some(SpatialDims {
            xmin,
            xmax,
            ymin,
            ymax,
            z: zmin.zip(zmax),
        }),
        t,
        srid,
        geodetic,
    )
}

fn instant_out(inst: &TInstant, digits: usize) -> String {
    format!(
        "{}@{}",
        datum_out(inst.value(), digits),
        inst.timestamp()
    )
}

fn sequence_out(seq: &TSequence, digits: usize) -> String {
    let prefix = if seq.interp() == Interp::Step && seq.temptype().is_continuous() {
        "Interp=Step;"
    } else {
        ""
    };
    format!(
        "{prefix}{}{}{}",
        if seq.lower_inc() { '[' } else { '(' },
        seq.instants().iter().map(|i| instant_out(i, digits)).join(", "),
        if seq.upper_inc() { ']' } else { ')' },
    )
}

/// The WKT form of any temporal value.
pub fn temporal_out(temp: &Temporal, digits: usize) -> String {
    match temp {
        Temporal::Instant(inst) => instant_out(inst, digits),
        Temporal::InstantSet(iset) => format!(
            "{{{}}}",
            iset.instants().iter().map(|i| instant_out(i, digits)).join(", ")
        ),
        Temporal::Sequence(seq) => sequence_out(seq, digits),
        Temporal::SequenceSet(ss) => format!(
            "{}{{{}}}",
            if ss.interp() == Interp::Step && ss.temptype().is_continuous() {
                "Interp=Step;"
            } else {
                ""
            },
            ss.sequences()
                .iter()
                .map(|seq| {
                    format!(
                        "{}{}{}",
                        if seq.lower_inc() { '[' } else { '(' },
                        seq.instants().iter().map(|i| instant_out(i, digits)).join(", "),
                        if seq.upper_inc() { ']' } else { ')' },
                    )
                })
                .join(", ")
        ),
    }
}

/// Extended WKT: the SRID prefixes the value for spatial temporals.
pub fn temporal_as_ewkt(temp: &Temporal, digits: usize) -> String {
    let srid = temp
        .inst_n(0)
        .and_then(|inst| inst.value().as_point())
        .map(|p| p.srid)
        .unwrap_or(0);
    if srid != 0 {
        format!("SRID={srid};{}", temporal_out(temp, digits))
    } else {
        temporal_out(temp, digits)
    }
}

/*************************** parser ***************************/

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn error(&self, message: impl Into<String>) -> TemporalError {
        TemporalError::parse(message, self.pos)
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.text.len() - trimmed.len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.rest().chars().next()
    }

    fn eat(&mut self, expected: char) -> TemporalResult<()> {
        self.skip_ws();
        if self.rest().starts_with(expected) {
            self.pos += expected.len_utf8();
            Ok(())
        } else {
            Err(self.error(format!("expected {expected:?}")))
        }
    }

    fn eat_if(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.rest().starts_with(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        self.skip_ws();
        let rest = self.rest();
        if rest.len() >= keyword.len() && rest[..keyword.len()].eq_ignore_ascii_case(keyword) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn ensure_done(&mut self) -> TemporalResult<()> {
        self.skip_ws();
        if self.rest().is_empty() {
            Ok(())
        } else {
            Err(self.error("trailing characters after the value"))
        }
    }

    /// The raw token up to the next structural delimiter.
    fn token_until(&mut self, delimiters: &[char]) -> &'a str {
        self.skip_ws();
        let rest = self.rest();
        let end = rest
            .find(|c| delimiters.contains(&c))
            .unwrap_or(rest.len());
        let token = rest[..end].trim_end();
        self.pos += end;
        token
    }

    fn number(&mut self) -> TemporalResult<f64> {
        self.skip_ws();
        let rest = self.rest();
        let end = rest
            .find(|c: char| !(c.is_ascii_digit() || "+-.eE".contains(c)))
            .unwrap_or(rest.len());
        let token = &rest[..end];
        let value = token
            .parse::<f64>()
            .map_err(|_| self.error(format!("invalid number {token:?}")))?;
        self.pos += end;
        Ok(value)
    }

    fn timestamp(&mut self) -> TemporalResult<TimestampTz> {
        let token = self.token_until(&[',', ')', ']', '}', '@']);
        if token.is_empty() {
            return Err(self.error("expected a timestamp"));
        }
        TimestampTz::parse(token).map_err(|_| self.error(format!("invalid timestamp {token:?}")))
    }

    fn quoted_text(&mut self) -> TemporalResult<&'a str> {
        self.eat('"')?;
        let rest = self.rest();
        let end = rest
            .find('"')
            .ok_or_else(|| self.error("unterminated string"))?;
        let content = &rest[..end];
        self.pos += end + 1;
        Ok(content)
    }

    fn point(&mut self, geodetic: bool, srid: i32) -> TemporalResult<GeoPoint> {
        if !self.eat_keyword("point") {
            return Err(self.error("expected a point"));
        }
        let has_z = self.eat_keyword("z");
        self.eat('(')?;
        let x = self.number()?;
        let y = self.number()?;
        let z = if has_z { Some(self.number()?) } else { None };
        self.eat(')')?;
        Ok(GeoPoint {
            x,
            y,
            z,
            srid,
            geodetic,
        })
    }

    fn base_value(&mut self, basetype: BaseType, srid: i32) -> TemporalResult<Datum> {
        match basetype {
            BaseType::Bool => {
                if self.eat_keyword("true") || self.eat_keyword("t") {
                    Ok(Datum::Bool(true))
                } else if self.eat_keyword("false") || self.eat_keyword("f") {
                    Ok(Datum::Bool(false))
                } else {
                    Err(self.error("expected a boolean"))
                }
            }
            BaseType::Int => {
                let value = self.number()?;
                if value.fract() != 0.0 {
                    return Err(self.error("expected an integer"));
                }
                Ok(Datum::Int(value as i32))
            }
            BaseType::Float => Ok(Datum::Float(self.number()?)),
            BaseType::Text => Ok(Datum::text(self.quoted_text()?)),
            BaseType::Timestamp => Ok(Datum::Timestamp(self.timestamp()?)),
            BaseType::Date => {
                let token = self.token_until(&[',', ')', ']', '}', '@']);
                tempora_core::timestamp::Date::parse(token)
                    .map(Datum::Date)
                    .map_err(|_| self.error(format!("invalid date {token:?}")))
            }
            BaseType::Geom => Ok(Datum::Geom(self.point(false, srid)?)),
            BaseType::Geog => Ok(Datum::Geog(self.point(true, srid)?)),
            BaseType::Npoint => {
                if !self.eat_keyword("npoint") {
                    return Err(self.error("expected an npoint"));
                }
                self.eat('(')?;
                let route = self.number()? as i64;
                self.eat(',')?;
                let pos = self.number()?;
                self.eat(')')?;
                Ok(Datum::Npoint(Npoint::new(route, pos)?))
            }
            BaseType::Cbuffer => {
                if !self.eat_keyword("cbuffer") {
                    return Err(self.error("expected a cbuffer"));
                }
                self.eat('(')?;
                let center = self.point(false, srid)?;
                self.eat(',')?;
                let radius = self.number()?;
                self.eat(')')?;
                Ok(Datum::Cbuffer(Cbuffer::new(center, radius)?))
            }
            other => Err(self.error(format!(
                "{} has no textual form",
                <&'static str>::from(other)
            ))),
        }
    }

    fn span(&mut self, basetype: BaseType) -> TemporalResult<Span> {
        let lower_inc = if self.eat_if('[') {
            true
        } else if self.eat_if('(') {
            false
        } else {
            return Err(self.error("expected '[' or '('"));
        };
        let lower = self.base_value(basetype, 0)?;
        self.eat(',')?;
        let upper = self.base_value(basetype, 0)?;
        let upper_inc = if self.eat_if(']') {
            true
        } else if self.eat_if(')') {
            false
        } else {
            return Err(self.error("expected ']' or ')'"));
        };
        Span::new(lower, upper, lower_inc, upper_inc)
    }

    fn instant(&mut self, temptype: TempType, srid: i32) -> TemporalResult<TInstant> {
        let value = self.base_value(temptype.basetype(), srid)?;
        self.eat('@')?;
        let t = self.timestamp()?;
        TInstant::new(temptype, value, t)
    }

    fn sequence(
        &mut self,
        temptype: TempType,
        interp: Interp,
        srid: i32,
    ) -> TemporalResult<TSequence> {
        let lower_inc = if self.eat_if('[') {
            true
        } else if self.eat_if('(') {
            false
        } else {
            return Err(self.error("expected '[' or '('"));
        };
        let mut instants = vec![self.instant(temptype, srid)?];
        while self.eat_if(',') {
            instants.push(self.instant(temptype, srid)?);
        }
        let upper_inc = if self.eat_if(']') {
            true
        } else if self.eat_if(')') {
            false
        } else {
            return Err(self.error("expected ']' or ')'"));
        };
        if instants.len() == 1 {
            return TSequence::new(instants, interp, true, true);
        }
        TSequence::new(instants, interp, lower_inc, upper_inc)
    }
}

pub fn span_in(text: &str, basetype: BaseType) -> TemporalResult<Span> {
    let mut parser = Parser::new(text);
    let span = parser.span(basetype)?;
    parser.ensure_done()?;
    Ok(span)
}

pub fn set_in(text: &str, basetype: BaseType) -> TemporalResult<Set> {
    let mut parser = Parser::new(text);
    parser.eat('{')?;
    let mut values = vec![parser.base_value(basetype, 0)?];
    while parser.eat_if(',') {
        values.push(parser.base_value(basetype, 0)?);
    }
    parser.eat('}')?;
    parser.ensure_done()?;
    Set::new(values)
}

pub fn spanset_in(text: &str, basetype: BaseType) -> TemporalResult<SpanSet> {
    let mut parser = Parser::new(text);
    parser.eat('{')?;
    let mut spans = vec![parser.span(basetype)?];
    while parser.eat_if(',') {
        spans.push(parser.span(basetype)?);
    }
    parser.eat('}')?;
    parser.ensure_done()?;
    SpanSet::new(spans)
}

pub fn tbox_in(text: &str) -> TemporalResult<TBox> {
    let mut parser = Parser::new(text);
    if !parser.eat_keyword("tbox") {
        return Err(parser.error("expected TBOX"));
    }
    let (has_x, has_t) = if parser.eat_keyword("xt") {
        (true, true)
    } else if parser.eat_keyword("x") {
        (true, false)
    } else if parser.eat_keyword("t") {
        (false, true)
    } else {
        return Err(parser.error("expected one of XT, X or T"));
    };
    parser.eat('(')?;
    let x = if has_x {
        // Integer spans parse as floats here; the span keeps the wider
        // base type, which every mixed-type predicate accepts.
        let span = parser.span(BaseType::Float)?;
        if has_t {
            parser.eat(',')?;
        }
        Some(span)
    } else {
        None
    };
    let t = if has_t {
        Some(parser.span(BaseType::Timestamp)?)
    } else {
        None
    };
    parser.eat(')')?;
    parser.ensure_done()?;
    TBox::new(x, t)
}

/// Parse a temporal value of a known type. Accepts the optional
/// `SRID=n;` and `Interp=Step;` prefixes.
pub fn temporal_in(text: &str, temptype: TempType) -> TemporalResult<Temporal> {
    let mut parser = Parser::new(text);

    let mut srid = 0;
    if parser.eat_keyword("srid=") {
        srid = parser.number()? as i32;
        parser.eat(';')?;
    }
    let mut interp = Interp::default_for(temptype);
    if parser.eat_keyword("interp=step;") {
        interp = Interp::Step;
    } else if parser.eat_keyword("interp=linear;") {
        interp = Interp::Linear;
    }

    let result = match parser.peek() {
        Some('[') | Some('(') => Temporal::Sequence(parser.sequence(temptype, interp, srid)?),
        Some('{') => {
            parser.eat('{')?;
            match parser.peek() {
                Some('[') | Some('(') => {
                    let mut sequences = vec![parser.sequence(temptype, interp, srid)?];
                    while parser.eat_if(',') {
                        sequences.push(parser.sequence(temptype, interp, srid)?);
                    }
                    parser.eat('}')?;
                    Temporal::SequenceSet(TSequenceSet::new(sequences)?)
                }
                _ => {
                    let mut instants = vec![parser.instant(temptype, srid)?];
                    while parser.eat_if(',') {
                        instants.push(parser.instant(temptype, srid)?);
                    }
                    parser.eat('}')?;
                    Temporal::InstantSet(TInstantSet::new(instants)?)
                }
            }
        }
        Some(_) => Temporal::Instant(parser.instant(temptype, srid)?),
        None => return Err(parser.error("empty input")),
    };
    parser.ensure_done()?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn ts(s: &str) -> TimestampTz {
        TimestampTz::parse(s).unwrap()
    }

    #[test]
    fn float_formatting_trims_zeros() {
        assert_eq!(float_out(1.5, 15), "1.5");
        assert_eq!(float_out(2.0, 15), "2");
        assert_eq!(float_out(1.0 / 3.0, 3), "0.333");
    }

    #[test]
    fn span_text_round_trip() {
        let span = span_in("[1.0, 2.0)", BaseType::Float).unwrap();
        assert_eq!(span, Span::float(1.0, 2.0, true, false).unwrap());
        assert_eq!(span_out(&span, 15), "[1, 2)");

        span_in("[2.0, 1.0)", BaseType::Float).unwrap_err();
        let err = span_in("[1.0; 2.0)", BaseType::Float).unwrap_err();
        let TemporalError::Parse { position, .. } = err else {
            panic!("expected a parse error");
        };
        assert_eq!(position, 4);
    }

    #[test]
    fn period_set_round_trip() {
        let text = "{[2000-01-01 00:00:00+00, 2000-01-02 00:00:00+00), [2000-01-03 00:00:00+00, 2000-01-04 00:00:00+00)}";
        let spans = spanset_in(text, BaseType::Timestamp).unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spanset_out(&spans, 15), text);
    }

    #[test]
    fn set_round_trip() {
        let set = set_in("{3, 1, 2, 3}", BaseType::Int).unwrap();
        assert_eq!(set_out(&set, 15), "{1, 2, 3}");
    }

    #[test]
    fn instant_and_sequence_parse() {
        let inst = temporal_in("1.5@2000-01-01", TempType::Tfloat).unwrap();
        assert_eq!(
            inst.value_at(ts("2000-01-01")),
            Some(Datum::Float(1.5))
        );

        let seq = temporal_in(
            "[1@2000-01-01 00:00:00+00, 5@2000-01-05 00:00:00+00]",
            TempType::Tfloat,
        )
        .unwrap();
        assert_eq!(seq.interp(), Interp::Linear);
        assert_eq!(
            seq.value_at(ts("2000-01-03")),
            Some(Datum::Float(3.0))
        );
        assert_eq!(
            temporal_out(&seq, 15),
            "[1@2000-01-01 00:00:00+00, 5@2000-01-05 00:00:00+00]"
        );
    }

    #[test]
    fn step_prefix_round_trip() {
        let text = "Interp=Step;[1.5@2000-01-01 00:00:00+00, 2.5@2000-01-02 00:00:00+00]";
        let seq = temporal_in(text, TempType::Tfloat).unwrap();
        assert_eq!(seq.interp(), Interp::Step);
        assert_eq!(temporal_out(&seq, 15), text);
    }

    #[test]
    fn point_instant_parse() {
        let temp = temporal_in("Point(1 2)@2000-01-01", TempType::Tgeompoint).unwrap();
        let value = temp.value_at(ts("2000-01-01")).unwrap();
        assert_eq!(value.as_point().unwrap().x, 1.0);

        let with_srid =
            temporal_in("SRID=4326;Point(1 2)@2000-01-01", TempType::Tgeompoint).unwrap();
        assert_eq!(
            with_srid.value_at(ts("2000-01-01")).unwrap().as_point().unwrap().srid,
            4326
        );
        assert!(temporal_as_ewkt(&with_srid, 15).starts_with("SRID=4326;"));
    }

    #[test]
    fn sequence_set_parse() {
        let ss = temporal_in(
            "{[1@2000-01-01, 2@2000-01-02), [5@2000-01-03, 6@2000-01-04]}",
            TempType::Tfloat,
        )
        .unwrap();
        assert_eq!(ss.subtype(), tempora_core::types::TempSubtype::SequenceSet);
        assert_eq!(ss.num_instants(), 4);
    }

    #[test]
    fn stbox_text_round_trip() {
        use tempora_core::stbox::SpatialDims;
        let stbox = STBox::new(
            Some(SpatialDims {
                xmin: 1.0,
                xmax: 2.0,
                ymin: 3.0,
                ymax: 4.0,
                z: None,
            }),
            Some(Span::period(ts("2000-01-01"), ts("2000-01-02"), true, true).unwrap()),
            4326,
            false,
        )
        .unwrap();
        let text = stbox_out(&stbox, 15);
        assert!(text.starts_with("SRID=4326;STBOX XT((1 3),(2 4),"));
        assert_eq!(stbox_in(&text).unwrap(), stbox);

        let t_only = stbox_in("STBOX T([2000-01-01, 2000-01-02])").unwrap();
        assert!(!t_only.has_space() && t_only.has_t());

        let geodetic = stbox_in("GEODSTBOX Z((0 0 0),(1 1 1))").unwrap();
        assert!(geodetic.is_geodetic() && geodetic.has_z());
    }

    #[test]
    fn tbox_parse() {
        let tbox = tbox_in("TBOX XT([1, 2], [2000-01-01, 2000-01-02])").unwrap();
        assert!(tbox.has_x() && tbox.has_t());
        let x_only = tbox_in("TBOX X([1, 2])").unwrap();
        assert!(x_only.has_x() && !x_only.has_t());
        let t_only = tbox_in("TBOX T([2000-01-01, 2000-01-02])").unwrap();
        assert!(!t_only.has_x() && t_only.has_t());
    }
}
