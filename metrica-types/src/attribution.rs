//! Conversion-attribution models and per-model containers.

use core::fmt;
use core::ops::AddAssign;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::MetricaError;

/// Rule for assigning conversion credit to a marketing touchpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionModel {
    /// Credits the most recent non-direct session.
    LastNonDirect,
    /// Credits the first qualifying touch in a fixed priority order.
    #[default]
    OriginStack,
}

impl AttributionModel {
    /// Every model, baseline first.
    pub const ALL: [Self; 2] = [Self::LastNonDirect, Self::OriginStack];

    /// Reference model for delta metrics.
    pub const BASELINE: Self = Self::LastNonDirect;

    /// Stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LastNonDirect => "last_non_direct",
            Self::OriginStack => "origin_stack",
        }
    }

    /// The other model.
    #[must_use]
    pub const fn counterpart(self) -> Self {
        match self {
            Self::LastNonDirect => Self::OriginStack,
            Self::OriginStack => Self::LastNonDirect,
        }
    }
}

impl fmt::Display for AttributionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributionModel {
    type Err = MetricaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last_non_direct" | "last-non-direct" => Ok(Self::LastNonDirect),
            "origin_stack" | "origin-stack" => Ok(Self::OriginStack),
            other => Err(MetricaError::InvalidArg(format!(
                "unknown attribution model: {other}"
            ))),
        }
    }
}

/// One value per attribution model.
///
/// Both slots are always populated so consumers can switch the active model
/// or compare models without re-fetching.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ByModel<T> {
    /// Value under the last-non-direct model.
    pub last_non_direct: T,
    /// Value under the origin-stack model.
    pub origin_stack: T,
}

impl<T> ByModel<T> {
    /// Build by evaluating `f` once per model.
    pub fn from_fn(mut f: impl FnMut(AttributionModel) -> T) -> Self {
        Self {
            last_non_direct: f(AttributionModel::LastNonDirect),
            origin_stack: f(AttributionModel::OriginStack),
        }
    }

    /// Borrow the value for `model`.
    #[must_use]
    pub const fn get(&self, model: AttributionModel) -> &T {
        match model {
            AttributionModel::LastNonDirect => &self.last_non_direct,
            AttributionModel::OriginStack => &self.origin_stack,
        }
    }

    /// Transform every slot.
    pub fn map<U>(&self, mut f: impl FnMut(AttributionModel, &T) -> U) -> ByModel<U> {
        ByModel {
            last_non_direct: f(AttributionModel::LastNonDirect, &self.last_non_direct),
            origin_stack: f(AttributionModel::OriginStack, &self.origin_stack),
        }
    }

    /// Iterate `(model, value)` pairs, baseline first.
    pub fn iter(&self) -> impl Iterator<Item = (AttributionModel, &T)> {
        AttributionModel::ALL.into_iter().map(move |m| (m, self.get(m)))
    }
}

impl<T: AddAssign + Copy> AddAssign for ByModel<T> {
    fn add_assign(&mut self, rhs: Self) {
        self.last_non_direct += rhs.last_non_direct;
        self.origin_stack += rhs.origin_stack;
    }
}

/// Conversion counts and revenue credited by one attribution model.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Transactions of any kind.
    pub transactions: u64,
    /// Gross revenue.
    pub revenue: f64,
    /// First-purchase transactions.
    pub transactions_first: u64,
    /// First-purchase revenue.
    pub revenue_first: f64,
}

impl AddAssign for ModelMetrics {
    fn add_assign(&mut self, rhs: Self) {
        self.transactions = self.transactions.saturating_add(rhs.transactions);
        self.revenue += rhs.revenue;
        self.transactions_first = self
            .transactions_first
            .saturating_add(rhs.transactions_first);
        self.revenue_first += rhs.revenue_first;
    }
}
