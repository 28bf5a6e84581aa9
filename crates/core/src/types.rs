//! The closed tag enums every polymorphic dispatch starts from.
//!
//! The base-type registry of the engine is the [`BaseType`] enum plus the
//! capability predicates below; the per-tag operation table (compare, hash,
//! arithmetic, distance, text and binary I/O) lives as match arms on
//! [`crate::datum::Datum`], which the compiler folds into the same jump
//! tables a function-pointer registry would produce.

use crate::errors::{TemporalError, TemporalResult};

/// Tag of every base value a span, set or temporal can be parameterized by.
#[derive(
    Debug,
    PartialEq,
    Eq,
    Clone,
    Copy,
    Hash,
    PartialOrd,
    Ord,
    strum_macros::EnumString,
    strum_macros::IntoStaticStr,
    strum_macros::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum BaseType {
    Bool,
    Int,
    Float,
    Text,
    Timestamp,
    Date,
    Geom,
    Geog,
    Npoint,
    Nsegment,
    Cbuffer,
    /// Internal accumulator pairs for tavg; never user-visible.
    Double2,
    Double3,
    Double4,
}

impl BaseType {
    /// Base types stored inline in a datum word rather than behind a
    /// pointer in the original layout. Retained because the WKB writer
    /// sizes payloads from it.
    pub fn is_by_value(self) -> bool {
        matches!(
            self,
            Self::Bool | Self::Int | Self::Float | Self::Timestamp | Self::Date
        )
    }

    /// Whether values of this type admit a total order.
    pub fn is_ordered(self) -> bool {
        !matches!(
            self,
            Self::Geom
                | Self::Geog
                | Self::Nsegment
                | Self::Cbuffer
                | Self::Double2
                | Self::Double3
                | Self::Double4
        )
    }

    /// Continuous base types support linear interpolation between instants.
    pub fn is_continuous(self) -> bool {
        matches!(
            self,
            Self::Float
                | Self::Geom
                | Self::Geog
                | Self::Npoint
                | Self::Cbuffer
                | Self::Double2
                | Self::Double3
                | Self::Double4
        )
    }

    pub fn is_number(self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }

    pub fn is_spatial(self) -> bool {
        matches!(
            self,
            Self::Geom | Self::Geog | Self::Npoint | Self::Nsegment | Self::Cbuffer
        )
    }

    pub fn is_time(self) -> bool {
        matches!(self, Self::Timestamp | Self::Date)
    }

    /// Base types over which spans can be built.
    pub fn is_span_basetype(self) -> bool {
        matches!(self, Self::Int | Self::Float | Self::Timestamp | Self::Date)
    }

    /// Internal accumulator types are rejected at every I/O boundary.
    pub fn is_internal(self) -> bool {
        matches!(self, Self::Double2 | Self::Double3 | Self::Double4)
    }

    pub fn ensure_span_basetype(self) -> TemporalResult<()> {
        if self.is_span_basetype() {
            Ok(())
        } else {
            Err(TemporalError::mismatch(format!(
                "spans cannot be built over {}",
                <&'static str>::from(self)
            )))
        }
    }
}

/// Tag of a temporal type, pairing a base type with time.
#[derive(
    Debug,
    PartialEq,
    Eq,
    Clone,
    Copy,
    Hash,
    PartialOrd,
    Ord,
    strum_macros::EnumString,
    strum_macros::IntoStaticStr,
    strum_macros::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum TempType {
    Tbool,
    Tint,
    Tfloat,
    Ttext,
    Tgeompoint,
    Tgeogpoint,
    Tnpoint,
    Tcbuffer,
    /// Internal accumulator types backing the average aggregates; never
    /// part of the user interface.
    Tdouble2,
    Tdouble3,
    Tdouble4,
}

impl TempType {
    pub fn basetype(self) -> BaseType {
        match self {
            Self::Tbool => BaseType::Bool,
            Self::Tint => BaseType::Int,
            Self::Tfloat => BaseType::Float,
            Self::Ttext => BaseType::Text,
            Self::Tgeompoint => BaseType::Geom,
            Self::Tgeogpoint => BaseType::Geog,
            Self::Tnpoint => BaseType::Npoint,
            Self::Tcbuffer => BaseType::Cbuffer,
            Self::Tdouble2 => BaseType::Double2,
            Self::Tdouble3 => BaseType::Double3,
            Self::Tdouble4 => BaseType::Double4,
        }
    }

    pub fn is_internal(self) -> bool {
        matches!(self, Self::Tdouble2 | Self::Tdouble3 | Self::Tdouble4)
    }

    pub fn from_basetype(basetype: BaseType) -> Option<Self> {
        match basetype {
            BaseType::Bool => Some(Self::Tbool),
            BaseType::Int => Some(Self::Tint),
            BaseType::Float => Some(Self::Tfloat),
            BaseType::Text => Some(Self::Ttext),
            BaseType::Geom => Some(Self::Tgeompoint),
            BaseType::Geog => Some(Self::Tgeogpoint),
            BaseType::Npoint => Some(Self::Tnpoint),
            BaseType::Cbuffer => Some(Self::Tcbuffer),
            BaseType::Double2 => Some(Self::Tdouble2),
            BaseType::Double3 => Some(Self::Tdouble3),
            BaseType::Double4 => Some(Self::Tdouble4),
            _ => None,
        }
    }

    pub fn is_continuous(self) -> bool {
        self.basetype().is_continuous()
    }

    pub fn is_number(self) -> bool {
        self.basetype().is_number()
    }

    pub fn is_spatial(self) -> bool {
        self.basetype().is_spatial()
    }
}

/// The four temporal subtypes.
#[derive(
    Debug,
    PartialEq,
    Eq,
    Clone,
    Copy,
    Hash,
    PartialOrd,
    Ord,
    strum_macros::EnumString,
    strum_macros::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum TempSubtype {
    Instant,
    InstantSet,
    Sequence,
    SequenceSet,
}

impl TempSubtype {
    /// The coarser of two subtypes, used when lifting binary operations.
    pub fn coarser(self, other: Self) -> Self {
        self.max(other)
    }
}

/// Interpolation discipline between consecutive instants.
#[derive(
    Debug,
    PartialEq,
    Eq,
    Clone,
    Copy,
    Hash,
    PartialOrd,
    Ord,
    strum_macros::EnumString,
    strum_macros::IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Interp {
    Discrete,
    Step,
    Linear,
}

impl Interp {
    /// The default interpolation of a sequence over the given temporal type.
    pub fn default_for(temptype: TempType) -> Self {
        if temptype.is_continuous() {
            Self::Linear
        } else {
            Self::Step
        }
    }

    pub fn ensure_valid(self, temptype: TempType) -> TemporalResult<()> {
        if self == Self::Linear && !temptype.is_continuous() {
            return Err(TemporalError::mismatch(format!(
                "{} does not support linear interpolation",
                <&'static str>::from(temptype)
            )));
        }
        Ok(())
    }
}
