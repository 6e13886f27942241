// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! How interpolation is done along each axis.

use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr,
)]
pub enum AxisKind {
    #[strum(serialize = "TIME")]
    Time,

    #[strum(serialize = "FREQUENCY")]
    Frequency,

    #[strum(serialize = "ANTENNA")]
    Antenna,

    #[strum(serialize = "FIELD")]
    Field,

    #[strum(serialize = "SPW")]
    Spw,

    #[strum(serialize = "OBSERVATION")]
    Observation,
}

impl AxisKind {
    /// Categorical axes are matched exactly, never interpolated.
    pub fn is_categorical(self) -> bool {
        !matches!(self, AxisKind::Time | AxisKind::Frequency)
    }

    /// The unit of this axis' coordinates (empty for categorical axes).
    pub fn unit(self) -> &'static str {
        match self {
            AxisKind::Time => "s",
            AxisKind::Frequency => "Hz",
            _ => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpType {
    Nearest,
    Linear,

    /// A least-squares polynomial of this order.
    Polynomial(u8),

    /// A natural cubic spline.
    Spline,
}

impl std::fmt::Display for InterpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterpType::Nearest => write!(f, "nearest"),
            InterpType::Linear => write!(f, "linear"),
            InterpType::Polynomial(order) => write!(f, "polynomial (order {order})"),
            InterpType::Spline => write!(f, "spline"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Weighting {
    /// Combine weights by reciprocal variance, and weight polynomial fits.
    #[strum(serialize = "weighted")]
    Weighted,

    #[strum(serialize = "unweighted")]
    Unweighted,
}

/// What to do when a query lies outside the span of the samples available for
/// interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum EdgePolicy {
    /// Use the nearest edge sample.
    #[default]
    #[strum(serialize = "nearest")]
    Nearest,

    /// Evaluate the interpolant outside of its span.
    #[strum(serialize = "extrapolate")]
    Extrapolate,
}

/// The interpolation configuration of one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpolationAxis {
    pub kind: AxisKind,
    pub interp: InterpType,
    pub weighting: Weighting,

    /// The furthest a sample may be from a query and still be used, in the
    /// axis' unit. `None` is unbounded.
    pub window: Option<f64>,

    pub edge: EdgePolicy,

    /// Flag results if any sample around the query is flagged, even though
    /// the value only uses unflagged samples.
    pub propagate_flags: bool,
}

impl InterpolationAxis {
    /// An unweighted, unbounded axis that clamps at its edges.
    pub fn new(kind: AxisKind, interp: InterpType) -> InterpolationAxis {
        InterpolationAxis {
            kind,
            interp,
            weighting: Weighting::Unweighted,
            window: None,
            edge: EdgePolicy::Nearest,
            propagate_flags: false,
        }
    }

    /// Linear for time and frequency, nearest (i.e. exact) for everything
    /// else.
    pub fn default_for(kind: AxisKind) -> InterpolationAxis {
        if kind.is_categorical() {
            InterpolationAxis::new(kind, InterpType::Nearest)
        } else {
            InterpolationAxis::new(kind, InterpType::Linear)
        }
    }

    pub fn with_window(mut self, window: f64) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_weighting(mut self, weighting: Weighting) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn with_edge(mut self, edge: EdgePolicy) -> Self {
        self.edge = edge;
        self
    }

    pub fn with_flag_propagation(mut self, propagate_flags: bool) -> Self {
        self.propagate_flags = propagate_flags;
        self
    }

    pub fn is_weighted(&self) -> bool {
        self.weighting == Weighting::Weighted
    }
}
