//! Artwork model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::double_option;

/// Gallery category of an artwork
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtworkCategory {
    GrafischeKunst,
    Gedichten,
    Tekst,
    Combinatie,
}

impl ArtworkCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GrafischeKunst => "grafische-kunst",
            Self::Gedichten => "gedichten",
            Self::Tekst => "tekst",
            Self::Combinatie => "combinatie",
        }
    }
}

impl std::fmt::Display for ArtworkCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ArtworkCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grafische-kunst" => Ok(Self::GrafischeKunst),
            "gedichten" => Ok(Self::Gedichten),
            "tekst" => Ok(Self::Tekst),
            "combinatie" => Ok(Self::Combinatie),
            _ => Err(format!("Invalid category: {}", s)),
        }
    }
}

/// Print-on-demand product an artwork can be printed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductType {
    Tshirt,
    Mug,
    Notebook,
    Poster,
    Canvas,
    Sticker,
    ToteBag,
}

impl ProductType {
    pub const ALL: [ProductType; 7] = [
        Self::Tshirt,
        Self::Mug,
        Self::Notebook,
        Self::Poster,
        Self::Canvas,
        Self::Sticker,
        Self::ToteBag,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tshirt => "tshirt",
            Self::Mug => "mug",
            Self::Notebook => "notebook",
            Self::Poster => "poster",
            Self::Canvas => "canvas",
            Self::Sticker => "sticker",
            Self::ToteBag => "tote-bag",
        }
    }
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Artwork entity
///
/// Serialized in camelCase, which is both the API shape and the layout of
/// `artworks.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artwork {
    pub id: String,
    pub title: String,
    pub image: String,
    pub category: ArtworkCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_available")]
    pub available: bool,
    /// Display rotation in degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_products: Option<Vec<ProductType>>,
    /// File name under the digital uploads directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digital_file: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_available() -> bool {
    true
}

/// Input for creating an artwork
///
/// Required fields are optional here so a missing one maps to the
/// "Title, image, and category are required" response instead of a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateArtworkInput {
    pub title: Option<String>,
    pub image: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub available: Option<bool>,
    pub rotation: Option<f64>,
    pub available_products: Option<Vec<ProductType>>,
}

/// Partial artwork update
///
/// Absent fields are left untouched. For the optional fields an explicit
/// `null` clears the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkPatch {
    pub title: Option<String>,
    pub image: Option<String>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub available: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub rotation: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub available_products: Option<Option<Vec<ProductType>>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trips_through_str() {
        for category in [
            ArtworkCategory::GrafischeKunst,
            ArtworkCategory::Gedichten,
            ArtworkCategory::Tekst,
            ArtworkCategory::Combinatie,
        ] {
            assert_eq!(category.as_str().parse::<ArtworkCategory>(), Ok(category));
        }
        assert!("schilderij".parse::<ArtworkCategory>().is_err());
    }

    #[test]
    fn test_product_type_serializes_kebab_case() {
        let json = serde_json::to_string(&ProductType::ToteBag).unwrap();
        assert_eq!(json, "\"tote-bag\"");
        for product in ProductType::ALL {
            let json = serde_json::to_string(&product).unwrap();
            assert_eq!(json, format!("\"{}\"", product.as_str()));
        }
    }

    #[test]
    fn test_artwork_reads_legacy_json() {
        let json = r#"{
            "id": "abc123",
            "title": "Zaanse molen",
            "image": "/images/molen.jpg",
            "category": "grafische-kunst",
            "createdAt": "2024-03-01T10:00:00.000Z",
            "updatedAt": "2024-03-01T10:00:00.000Z"
        }"#;

        let artwork: Artwork = serde_json::from_str(json).unwrap();
        assert!(artwork.available);
        assert_eq!(artwork.category, ArtworkCategory::GrafischeKunst);
        assert!(artwork.digital_file.is_none());

        let out = serde_json::to_value(&artwork).unwrap();
        assert!(out.get("digitalFile").is_none());
        assert_eq!(out["createdAt"], "2024-03-01T10:00:00Z");
    }

    #[test]
    fn test_patch_distinguishes_null_from_absent() {
        let patch: ArtworkPatch =
            serde_json::from_str(r#"{"description": null, "available": false}"#).unwrap();

        assert_eq!(patch.description, Some(None));
        assert_eq!(patch.rotation, None);
        assert_eq!(patch.available, Some(false));
        assert!(patch.title.is_none());
    }
}
