use rust_decimal::Decimal;
use serde_json::Value;

use crate::api::RawPosition;
use crate::error::{ReportError, Result};

/// Prices arrive in minor units (kopecks)
const PRICE_SCALE: Decimal = Decimal::ONE_HUNDRED;

/// One product row of the report
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub article: String,
    pub name: String,
    pub quantity: Decimal,
    pub price: Decimal,
    /// Highlighted in the returns column of the report
    pub flagged: bool,
}

/// Human readable document number, e.g. "Отгрузка № 00012"
pub type DocumentLabel = String;

/// Document category a position is taken from. Each category fixes the sign
/// of its rows and whether they carry the flagged marker.
pub trait Category {
    const RETURN: bool;
    const FLAGGED: bool;
}

/// Shipment (demand) positions
pub struct Shipment;

/// Positions sold by the commission agent
pub struct CommissionSold;

/// Positions returned to the commissioner inside a commission report
pub struct CommissionReturn;

/// Customer return positions
pub struct CustomerReturn;

impl Category for Shipment {
    const RETURN: bool = false;
    const FLAGGED: bool = false;
}

impl Category for CommissionSold {
    const RETURN: bool = false;
    const FLAGGED: bool = false;
}

impl Category for CommissionReturn {
    const RETURN: bool = true;
    const FLAGGED: bool = false;
}

impl Category for CustomerReturn {
    const RETURN: bool = true;
    const FLAGGED: bool = true;
}

/// Turn a raw API position into a report row of category `C`.
///
/// Quantity and price are taken by magnitude and signed by the category:
/// returns are always negative, everything else positive. The price is
/// converted from minor units.
pub fn classify<C: Category>(raw: &RawPosition) -> Result<ReportLine> {
    let assortment = raw
        .assortment
        .as_ref()
        .ok_or_else(|| ReportError::malformed("position", "missing 'assortment'"))?;

    let name = assortment
        .name
        .clone()
        .ok_or_else(|| ReportError::malformed("position", "missing 'assortment.name'"))?;
    let article = assortment.article.clone().unwrap_or_default();

    let quantity = decimal_field(raw.quantity.as_ref(), "quantity")?.abs();
    let price = decimal_field(raw.price.as_ref(), "price")?.abs() / PRICE_SCALE;

    let (quantity, price) = if C::RETURN {
        (-quantity, -price)
    } else {
        (quantity, price)
    };

    Ok(ReportLine {
        article,
        name,
        quantity,
        price,
        flagged: C::FLAGGED,
    })
}

fn decimal_field(value: Option<&Value>, field: &str) -> Result<Decimal> {
    let value = value.ok_or_else(|| ReportError::malformed("position", format!("missing '{field}'")))?;
    let number = value
        .as_number()
        .ok_or_else(|| ReportError::malformed("position", format!("'{field}' is not a number: {value}")))?;

    let text = number.to_string();
    text.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| ReportError::malformed("position", format!("'{field}' out of range: {e}")))
}
