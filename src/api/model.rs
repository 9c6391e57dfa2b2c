use serde::Deserialize;
use serde_json::Value;

/// `meta` block attached to entities and list responses
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub next_href: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Reference to a sub-resource, e.g. `"positions": { "meta": {...} }`
#[derive(Debug, Deserialize, Clone, Default)]
pub struct MetaRef {
    #[serde(default)]
    pub meta: Meta,
}

impl MetaRef {
    pub fn href(&self) -> Option<&str> {
        self.meta.href.as_deref().filter(|href| !href.is_empty())
    }
}

/// One page of a list endpoint
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub meta: Option<Meta>,
    pub rows: Option<Vec<T>>,
}

/// Shipment or customer return document
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Document {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub positions: Option<MetaRef>,
}

impl Document {
    pub fn positions_href(&self) -> Option<&str> {
        self.positions.as_ref().and_then(MetaRef::href)
    }
}

/// Incoming commission agent report
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct CommissionReport {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub commission_period_start: Option<String>,
    #[serde(default)]
    pub commission_period_end: Option<String>,
    #[serde(default)]
    pub positions: Option<MetaRef>,
    #[serde(default)]
    pub return_to_commissioner_positions: Option<MetaRef>,
}

impl CommissionReport {
    pub fn sold_href(&self) -> Option<&str> {
        self.positions.as_ref().and_then(MetaRef::href)
    }

    pub fn returned_href(&self) -> Option<&str> {
        self.return_to_commissioner_positions
            .as_ref()
            .and_then(MetaRef::href)
    }
}

/// Document line item, fetched with `expand=assortment`
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RawPosition {
    #[serde(default)]
    pub quantity: Option<Value>,
    /// Price in minor currency units (kopecks)
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub assortment: Option<Assortment>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Assortment {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub article: Option<String>,
}

/// Entry of the project directory
#[derive(Debug, Deserialize, Clone)]
pub struct RemoteProject {
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub name: Option<String>,
}
