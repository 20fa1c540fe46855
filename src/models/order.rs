//! Order request model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the customer asks for: a handmade piece or a print product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderType {
    Original,
    Derivative,
    Custom,
    Tshirt,
    Mug,
    Notebook,
    Poster,
    Canvas,
    Sticker,
    ToteBag,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Derivative => "derivative",
            Self::Custom => "custom",
            Self::Tshirt => "tshirt",
            Self::Mug => "mug",
            Self::Notebook => "notebook",
            Self::Poster => "poster",
            Self::Canvas => "canvas",
            Self::Sticker => "sticker",
            Self::ToteBag => "tote-bag",
        }
    }

    /// Dutch label used in notification emails and mailto links
    pub fn label(&self) -> &'static str {
        match self {
            Self::Original => "Origineel werk",
            Self::Derivative => "Afgeleide versie",
            Self::Custom => "Custom origineel",
            Self::Tshirt => "T-shirt print",
            Self::Mug => "Mok print",
            Self::Notebook => "Notebook print",
            Self::Poster => "Poster print",
            Self::Canvas => "Canvas print",
            Self::Sticker => "Sticker print",
            Self::ToteBag => "Tote bag print",
        }
    }

    /// Print-on-demand products are produced from the artwork's digital file
    pub fn is_print_on_demand(&self) -> bool {
        !matches!(self, Self::Original | Self::Derivative | Self::Custom)
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "original" => Ok(Self::Original),
            "derivative" => Ok(Self::Derivative),
            "custom" => Ok(Self::Custom),
            "tshirt" => Ok(Self::Tshirt),
            "mug" => Ok(Self::Mug),
            "notebook" => Ok(Self::Notebook),
            "poster" => Ok(Self::Poster),
            "canvas" => Ok(Self::Canvas),
            "sticker" => Ok(Self::Sticker),
            "tote-bag" => Ok(Self::ToteBag),
            _ => Err(format!("Invalid order type: {}", s)),
        }
    }
}

/// Adjustments requested for a derivative piece
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinner_wood: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub different_finish: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fewer_colors: Option<bool>,
}

impl OrderOptions {
    /// Dutch labels of the options that are switched on
    pub fn selected_labels(&self) -> Vec<&'static str> {
        [
            (self.thinner_wood, "Dunner hout"),
            (self.different_finish, "Andere afwerking"),
            (self.fewer_colors, "Minder kleuren"),
        ]
        .into_iter()
        .filter(|(on, _)| *on == Some(true))
        .map(|(_, label)| label)
        .collect()
    }
}

/// Customer contact details attached to an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Order request entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork_id: Option<String>,
    pub order_type: OrderType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<OrderOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspiration: Option<String>,
    pub contact_info: ContactInfo,
    pub created_at: DateTime<Utc>,
}

/// Contact details as submitted, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactInfoInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
}

/// Input for submitting an order request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderInput {
    pub artwork_id: Option<String>,
    pub order_type: Option<String>,
    pub options: Option<OrderOptions>,
    pub inspiration: Option<String>,
    pub contact_info: Option<ContactInfoInput>,
}
