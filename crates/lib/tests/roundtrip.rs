//! Round-trip properties: WKB in both byte orders across every
//! constructible shape, and partition-independence of aggregation.

use pretty_assertions::assert_eq;

use tempora_core::datum::Datum;
use tempora_core::geo::GeoPoint;
use tempora_core::set::Set;
use tempora_core::span::Span;
use tempora_core::spanset::SpanSet;
use tempora_core::temporal::{TInstant, TInstantSet, TSequence, TSequenceSet, Temporal, TemporalOps};
use tempora_core::timestamp::TimestampTz;
use tempora_core::types::{Interp, TempType};
use tempora_helpers::CancelToken;
use tempora_lib::aggregate::{tagg_combinefn, tagg_finalfn, tsum_transfn};
use tempora_lib::io::text::{temporal_in, temporal_out};
use tempora_lib::io::wkb::{
    as_hexwkb, from_hexwkb, from_wkb, set_as_wkb, span_as_wkb, spanset_as_wkb, temporal_as_wkb,
    Endian, WkbValue,
};

fn ts(s: &str) -> TimestampTz {
    TimestampTz::parse(s).unwrap()
}

fn sample_temporals() -> Vec<Temporal> {
    let instant = Temporal::Instant(TInstant::tfloat(1.25, ts("2000-01-01")));
    let iset = Temporal::InstantSet(
        TInstantSet::new(vec![
            TInstant::tint(1, ts("2000-01-01")),
            TInstant::tint(3, ts("2000-01-02")),
        ])
        .unwrap(),
    );
    let seq = Temporal::Sequence(
        TSequence::tfloat_linear(&[(0.5, ts("2000-01-01")), (2.5, ts("2000-01-03"))]).unwrap(),
    );
    let step_seq = Temporal::Sequence(
        TSequence::new(
            vec![
                TInstant::tbool(true, ts("2000-01-01")),
                TInstant::tbool(false, ts("2000-01-02")),
            ],
            Interp::Step,
            true,
            false,
        )
        .unwrap(),
    );
    let ss = Temporal::SequenceSet(
        TSequenceSet::new(vec![
            TSequence::tfloat_linear(&[(1.0, ts("2000-01-01")), (2.0, ts("2000-01-02"))])
                .unwrap(),
            TSequence::tfloat_linear(&[(7.0, ts("2000-01-05")), (8.0, ts("2000-01-06"))])
                .unwrap(),
        ])
        .unwrap(),
    );
    let geo = Temporal::Sequence(
        TSequence::new(
            vec![
                TInstant::new(
                    TempType::Tgeompoint,
                    Datum::Geom(GeoPoint::new_3d(1.0, 2.0, 3.0, 3857)),
                    ts("2000-01-01"),
                )
                .unwrap(),
                TInstant::new(
                    TempType::Tgeompoint,
                    Datum::Geom(GeoPoint::new_3d(4.0, 5.0, 6.0, 3857)),
                    ts("2000-01-02"),
                )
                .unwrap(),
            ],
            Interp::Linear,
            true,
            true,
        )
        .unwrap(),
    );
    vec![instant, iset, seq, step_seq, ss, geo]
}

#[test]
fn wkb_round_trips_every_shape_in_both_endians() {
    for temp in sample_temporals() {
        for endian in [Endian::Ndr, Endian::Xdr] {
            let wkb = temporal_as_wkb(&temp, endian).unwrap();
            assert_eq!(
                from_wkb(&wkb).unwrap(),
                WkbValue::Temporal(temp.clone()),
                "shape {temp:?} under {endian:?}"
            );
        }
    }
}

#[test]
fn hexwkb_round_trips() {
    for temp in sample_temporals() {
        let wkb = temporal_as_wkb(&temp, Endian::Ndr).unwrap();
        let hexed = as_hexwkb(&wkb);
        assert!(hexed.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(from_hexwkb(&hexed).unwrap(), WkbValue::Temporal(temp));
    }
}

#[test]
fn span_and_set_wkb_round_trips() {
    let span = Span::float(1.5, 2.5, true, false).unwrap();
    let set = Set::new(vec![Datum::text("a"), Datum::text("b")]).unwrap();
    let spans = SpanSet::new(vec![
        Span::period(ts("2000-01-01"), ts("2000-01-02"), true, false).unwrap(),
        Span::period(ts("2000-01-03"), ts("2000-01-04"), true, false).unwrap(),
    ])
    .unwrap();

    for endian in [Endian::Ndr, Endian::Xdr] {
        assert_eq!(
            from_wkb(&span_as_wkb(&span, endian).unwrap()).unwrap(),
            WkbValue::Span(span.clone())
        );
        assert_eq!(
            from_wkb(&set_as_wkb(&set, endian).unwrap()).unwrap(),
            WkbValue::Set(set.clone())
        );
        assert_eq!(
            from_wkb(&spanset_as_wkb(&spans, endian).unwrap()).unwrap(),
            WkbValue::SpanSet(spans.clone())
        );
    }
}

#[test]
fn text_round_trips_through_the_parser() {
    for temp in sample_temporals() {
        if temp.temptype().is_spatial() {
            continue; // EWKT carries the SRID; plain WKT does not.
        }
        let text = temporal_out(&temp, 15);
        let back = temporal_in(&text, temp.temptype()).unwrap();
        assert_eq!(back, temp, "through {text}");
    }
}

#[test]
fn aggregation_is_partition_independent() {
    let pieces: Vec<Temporal> = vec![
        temporal_in(
            "Interp=Step;[1@2000-01-01 00:00:00+00, 2@2000-01-04 00:00:00+00]",
            TempType::Tfloat,
        )
        .unwrap(),
        temporal_in(
            "Interp=Step;[10@2000-01-02 00:00:00+00, 20@2000-01-03 00:00:00+00]",
            TempType::Tfloat,
        )
        .unwrap(),
        temporal_in("5@2000-01-02 12:00:00+00", TempType::Tfloat).unwrap(),
        temporal_in(
            "Interp=Step;[7@2000-01-03 12:00:00+00, 7@2000-01-05 00:00:00+00]",
            TempType::Tfloat,
        )
        .unwrap(),
    ];

    // One worker, in order.
    let mut single = None;
    for piece in &pieces {
        single = Some(tsum_transfn(single, piece).unwrap());
    }
    let sequential = tagg_finalfn(single).unwrap().unwrap();

    // Two workers with an uneven partition, combined.
    let token = CancelToken::ignored();
    let mut w1 = None;
    for piece in &pieces[..1] {
        w1 = Some(tsum_transfn(w1, piece).unwrap());
    }
    let mut w2 = None;
    for piece in &pieces[1..] {
        w2 = Some(tsum_transfn(w2, piece).unwrap());
    }
    let combined = tagg_combinefn(w1, w2, &|a, b| a.add(b), false, &token).unwrap();
    let parallel = tagg_finalfn(combined).unwrap().unwrap();

    for probe in [
        "2000-01-01 00:00:00+00",
        "2000-01-01 12:00:00+00",
        "2000-01-02 00:00:00+00",
        "2000-01-02 12:00:00+00",
        "2000-01-02 18:00:00+00",
        "2000-01-03 00:00:00+00",
        "2000-01-03 12:00:00+00",
        "2000-01-04 00:00:00+00",
        "2000-01-04 12:00:00+00",
        "2000-01-05 00:00:00+00",
    ] {
        assert_eq!(
            sequential.value_at(ts(probe)),
            parallel.value_at(ts(probe)),
            "diverged at {probe}"
        );
    }
}
