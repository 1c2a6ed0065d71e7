use crate::error::MatcherError;

/// Distance metric used to compare two descriptors.
///
/// The integer codes follow the numbering used by most computer vision
/// toolkits, so configuration files written for them can be reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NormType {
    /// Maximum absolute element difference.
    Inf,
    /// Sum of absolute element differences.
    L1,
    /// Euclidean distance.
    L2,
    /// Squared Euclidean distance.
    L2Sqr,
    /// Number of differing bits.
    Hamming,
    /// Number of differing 2-bit cells, for descriptors built from 2-bit tests.
    Hamming2,
}

impl NormType {
    /// Map a norm code to a [`NormType`].
    ///
    /// Code `3` sits inside the numeric range but names no norm and is rejected.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Inf),
            2 => Some(Self::L1),
            4 => Some(Self::L2),
            5 => Some(Self::L2Sqr),
            6 => Some(Self::Hamming),
            7 => Some(Self::Hamming2),
            _ => None,
        }
    }

    /// The integer code of this norm.
    pub fn code(self) -> i32 {
        match self {
            Self::Inf => 1,
            Self::L1 => 2,
            Self::L2 => 4,
            Self::L2Sqr => 5,
            Self::Hamming => 6,
            Self::Hamming2 => 7,
        }
    }

    /// Whether the norm operates on the bits of the descriptor.
    pub fn is_binary(self) -> bool {
        matches!(self, Self::Hamming | Self::Hamming2)
    }
}

/// Element type of a descriptor row.
pub trait DescriptorElement: Copy + Send + Sync {
    /// Whether bitwise norms are defined for this element type.
    const SUPPORTS_HAMMING: bool;

    /// Absolute difference between two elements.
    fn abs_delta(self, other: Self) -> f32;

    /// Number of differing bits.
    fn hamming(self, _other: Self) -> u32 {
        0
    }

    /// Number of differing 2-bit cells.
    fn hamming2(self, _other: Self) -> u32 {
        0
    }
}

impl DescriptorElement for u8 {
    const SUPPORTS_HAMMING: bool = true;

    #[inline]
    fn abs_delta(self, other: Self) -> f32 {
        (self as f32 - other as f32).abs()
    }

    #[inline]
    fn hamming(self, other: Self) -> u32 {
        (self ^ other).count_ones()
    }

    #[inline]
    fn hamming2(self, other: Self) -> u32 {
        let v = self ^ other;
        ((v | (v >> 1)) & 0x55).count_ones()
    }
}

impl DescriptorElement for f32 {
    const SUPPORTS_HAMMING: bool = false;

    #[inline]
    fn abs_delta(self, other: Self) -> f32 {
        (self - other).abs()
    }
}

/// Check that `norm` can be evaluated on descriptors made of `T`.
pub fn check_norm<T: DescriptorElement>(norm: NormType) -> Result<(), MatcherError> {
    if norm.is_binary() && !T::SUPPORTS_HAMMING {
        return Err(MatcherError::IncompatibleNorm { norm });
    }
    Ok(())
}

/// Distance between two descriptor rows under `norm`.
///
/// Callers are expected to have validated the norm with [`check_norm`]; a
/// bitwise norm on an element type without bits evaluates to zero.
#[inline]
pub fn distance<T: DescriptorElement>(norm: NormType, a: &[T], b: &[T]) -> f32 {
    let pairs = a.iter().zip(b.iter());
    match norm {
        NormType::Inf => pairs.map(|(&x, &y)| x.abs_delta(y)).fold(0.0, f32::max),
        NormType::L1 => pairs.map(|(&x, &y)| x.abs_delta(y)).sum(),
        NormType::L2 => pairs
            .map(|(&x, &y)| {
                let d = x.abs_delta(y);
                d * d
            })
            .sum::<f32>()
            .sqrt(),
        NormType::L2Sqr => pairs
            .map(|(&x, &y)| {
                let d = x.abs_delta(y);
                d * d
            })
            .sum(),
        NormType::Hamming => pairs.map(|(&x, &y)| x.hamming(y)).sum::<u32>() as f32,
        NormType::Hamming2 => pairs.map(|(&x, &y)| x.hamming2(y)).sum::<u32>() as f32,
    }
}
