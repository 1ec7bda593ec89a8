//! Unit-price analyses built from priced resource lines.
//!
//! An analysis lists the resources consumed by one unit of a budget item together with
//! their quantities. Its cost is always read from the hub, so a price edited in any row
//! is reflected in every analysis that uses the resource.

use crate::error::{PriceSyncError, Result};
use crate::hub::{Price, PriceHub, ResourceId};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Category of a resource in a cost breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Material,
    Labor,
    Equipment,
    Subcontract,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Material,
        ResourceKind::Labor,
        ResourceKind::Equipment,
        ResourceKind::Subcontract,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Material => "material",
            ResourceKind::Labor => "labor",
            ResourceKind::Equipment => "equipment",
            ResourceKind::Subcontract => "subcontract",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ResourceKind {
    type Err = PriceSyncError;

    /// Accepts the English labels and the Spanish ones used in budget exports.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "material" | "materiales" => Ok(ResourceKind::Material),
            "labor" | "mano_de_obra" | "mano de obra" => Ok(ResourceKind::Labor),
            "equipment" | "equipo" | "equipos" => Ok(ResourceKind::Equipment),
            "subcontract" | "subcontrato" | "subcontratos" => Ok(ResourceKind::Subcontract),
            other => Err(PriceSyncError::other(format!("unknown resource kind '{other}'"))),
        }
    }
}

/// One resource consumed by an analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceLine {
    pub resource_id: ResourceId,
    pub kind: ResourceKind,
    /// Quantity per unit of the analysed item
    pub quantity: f64,
}

impl ResourceLine {
    pub fn new(resource_id: impl Into<ResourceId>, kind: ResourceKind, quantity: f64) -> Self {
        Self {
            resource_id: resource_id.into(),
            kind,
            quantity,
        }
    }

    /// `quantity × price`; a resource with no known price contributes nothing.
    pub fn partial(&self, hub: &PriceHub) -> Price {
        hub.get_price(self.resource_id.as_str())
            .map_or(0.0, |price| self.quantity * price)
    }
}

/// Unit-price analysis of one budget item.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitPriceAnalysis {
    pub code: String,
    pub description: String,
    pub lines: Vec<ResourceLine>,
}

impl UnitPriceAnalysis {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            lines: Vec::new(),
        }
    }

    pub fn with_line(mut self, line: ResourceLine) -> Self {
        self.lines.push(line);
        self
    }

    /// Unit cost at current hub prices.
    pub fn total(&self, hub: &PriceHub) -> Price {
        self.lines.iter().map(|line| line.partial(hub)).sum()
    }

    /// Unit cost split by resource kind; kinds with no lines are omitted.
    pub fn totals_by_kind(&self, hub: &PriceHub) -> BTreeMap<ResourceKind, Price> {
        let mut totals = BTreeMap::new();
        for line in &self.lines {
            *totals.entry(line.kind).or_insert(0.0) += line.partial(hub);
        }
        totals
    }

    /// Resources of this analysis that have no price yet.
    pub fn unpriced(&self, hub: &PriceHub) -> Vec<&ResourceId> {
        self.lines
            .iter()
            .filter(|line| hub.get_price(line.resource_id.as_str()).is_none())
            .map(|line| &line.resource_id)
            .collect()
    }
}
