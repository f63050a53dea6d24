//! Linear scales and extents over metric values

use dv_core::MetricValue;

/// Extent of the present values; `NoData` never contributes
pub fn extent<I>(values: I) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = MetricValue>,
{
    values
        .into_iter()
        .filter_map(MetricValue::value)
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Maps a continuous domain onto a continuous range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    /// Scale over the extent of `values`, or `None` if every value is missing
    pub fn from_extent<I>(values: I, range: (f64, f64)) -> Option<Self>
    where
        I: IntoIterator<Item = MetricValue>,
    {
        extent(values).map(|domain| Self::new(domain, range))
    }

    /// A degenerate domain maps everything to the start of the range
    pub fn scale(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return r0;
        }
        r0 + (value - d0) / (d1 - d0) * (r1 - r0)
    }

    pub fn invert(&self, position: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if r1 == r0 {
            return d0;
        }
        d0 + (position - r0) / (r1 - r0) * (d1 - d0)
    }
}
