//! Order request service
//!
//! Stores order requests from the order wizard and builds the prefilled
//! `mailto:` link the customer uses to follow up with the studio.

use crate::db::repositories::{ArtworkRepository, OrderRepository};
use crate::models::{ContactInfo, CreateOrderInput, OrderRequest, OrderType};
use crate::services::validation::{is_valid_email, non_blank, trimmed};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Error types for order service operations
#[derive(Debug, thiserror::Error)]
pub enum OrderServiceError {
    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Order request service
pub struct OrderService {
    repo: Arc<dyn OrderRepository>,
    artworks: Arc<dyn ArtworkRepository>,
    studio_email: String,
}

impl OrderService {
    pub fn new(
        repo: Arc<dyn OrderRepository>,
        artworks: Arc<dyn ArtworkRepository>,
        studio_email: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            artworks,
            studio_email: studio_email.into(),
        }
    }

    /// Validate and store a new order request
    pub async fn create(&self, input: CreateOrderInput) -> Result<OrderRequest, OrderServiceError> {
        let contact = input.contact_info.unwrap_or_default();
        let (Some(order_type), Some(name), Some(email)) = (
            non_blank(input.order_type.as_deref()),
            non_blank(contact.name.as_deref()),
            non_blank(contact.email.as_deref()),
        ) else {
            return Err(OrderServiceError::ValidationError(
                "Order type and contact info (name, email) are required".to_string(),
            ));
        };

        if !is_valid_email(email) {
            return Err(OrderServiceError::ValidationError(
                "Invalid email format".to_string(),
            ));
        }
        let order_type: OrderType = order_type
            .trim()
            .parse()
            .map_err(OrderServiceError::ValidationError)?;

        let order = OrderRequest {
            id: Uuid::new_v4().simple().to_string(),
            artwork_id: trimmed(input.artwork_id.as_deref()),
            order_type,
            options: input.options,
            inspiration: trimmed(input.inspiration.as_deref()),
            contact_info: ContactInfo {
                name: name.trim().to_string(),
                email: email.to_string(),
                phone: trimmed(contact.phone.as_deref()),
                message: trimmed(contact.message.as_deref()),
            },
            created_at: Utc::now(),
        };

        let created = self
            .repo
            .create(&order)
            .await
            .context("Failed to create order request")?;
        tracing::info!(
            "Created order request {} ({})",
            created.id,
            created.order_type
        );
        Ok(created)
    }

    /// All order requests, newest first
    pub async fn list(&self) -> Result<Vec<OrderRequest>, OrderServiceError> {
        Ok(self.repo.list().await.context("Failed to list orders")?)
    }

    /// Title of the ordered artwork, if any. Lookup failures are logged and
    /// treated as unknown.
    pub async fn artwork_title(&self, order: &OrderRequest) -> Option<String> {
        let id = order.artwork_id.as_deref()?;
        match self.artworks.get_by_id(id).await {
            Ok(artwork) => artwork.map(|a| a.title),
            Err(e) => {
                tracing::warn!("Failed to look up artwork {} for order: {:#}", id, e);
                None
            }
        }
    }

    /// Prefilled `mailto:` link addressed to the studio
    pub fn generate_order_email(&self, order: &OrderRequest, artwork_title: Option<&str>) -> String {
        order_email_link(&self.studio_email, order, artwork_title)
    }
}

/// Build the `mailto:` link for an order with URL-encoded subject and body
pub fn order_email_link(studio_email: &str, order: &OrderRequest, artwork_title: Option<&str>) -> String {
    let label = order.order_type.label();
    let subject = format!(
        "Offerte aanvraag voor {} - {}",
        artwork_title.unwrap_or("kunstwerk"),
        label
    );

    let mut body = String::from("Beste Zaanse Plankjes Maffia,\n\nIk ben geïnteresseerd in:\n");
    body.push_str(&format!(
        "- Kunstwerk: {}\n",
        artwork_title.unwrap_or("Niet gespecificeerd")
    ));
    body.push_str(&format!("- Type: {}", label));
    if order.order_type.is_print_on_demand() {
        body.push_str(
            "\n- Opmerking: Dit is een print-on-demand product. Digitaal bestand wordt gebruikt voor productie.",
        );
    }

    let options = order
        .options
        .as_ref()
        .map(|o| o.selected_labels())
        .unwrap_or_default();
    if !options.is_empty() {
        body.push_str(&format!("\n- Opties: {}", options.join(", ")));
    }
    if let Some(inspiration) = &order.inspiration {
        body.push_str(&format!("\n- Inspiratie/verzoek: {}", inspiration));
    }

    let contact = &order.contact_info;
    body.push_str("\n\nMijn contactgegevens:\n");
    body.push_str(&format!("- Naam: {}\n- Email: {}", contact.name, contact.email));
    if let Some(phone) = &contact.phone {
        body.push_str(&format!("\n- Telefoon: {}", phone));
    }
    if let Some(message) = &contact.message {
        body.push_str(&format!("\n\nExtra bericht:\n{}", message));
    }
    body.push_str(&format!("\n\nMet vriendelijke groet,\n{}", contact.name));

    format!(
        "mailto:{}?subject={}&body={}",
        studio_email,
        urlencoding::encode(&subject),
        urlencoding::encode(&body)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::JsonArtworkRepository;
    use crate::db::repositories::JsonOrderRepository;
    use crate::models::{Artwork, ArtworkCategory, ContactInfoInput, OrderOptions};
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> (OrderService, Arc<dyn ArtworkRepository>) {
        let artworks = JsonArtworkRepository::boxed(dir.path());
        let service = OrderService::new(
            JsonOrderRepository::boxed(dir.path()),
            artworks.clone(),
            "info@plankjesmaffia.nl",
        );
        (service, artworks)
    }

    fn input(order_type: &str, email: &str) -> CreateOrderInput {
        CreateOrderInput {
            artwork_id: Some("art-1".to_string()),
            order_type: Some(order_type.to_string()),
            options: None,
            inspiration: None,
            contact_info: Some(ContactInfoInput {
                name: Some("Jan".to_string()),
                email: Some(email.to_string()),
                phone: None,
                message: None,
            }),
        }
    }

    fn decode_body(link: &str) -> String {
        let body = link.split("&body=").nth(1).unwrap();
        urlencoding::decode(body).unwrap().into_owned()
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let dir = TempDir::new().unwrap();
        let (service, _) = service(&dir);

        let missing = service
            .create(CreateOrderInput {
                contact_info: None,
                ..input("original", "jan@example.nl")
            })
            .await;
        assert!(matches!(
            missing,
            Err(OrderServiceError::ValidationError(msg))
                if msg == "Order type and contact info (name, email) are required"
        ));

        let bad_email = service.create(input("original", "jan-at-example")).await;
        assert!(matches!(
            bad_email,
            Err(OrderServiceError::ValidationError(msg)) if msg == "Invalid email format"
        ));
        let padded = service.create(input("original", " jan@example.nl ")).await;
        assert!(matches!(
            padded,
            Err(OrderServiceError::ValidationError(msg)) if msg == "Invalid email format"
        ));

        assert!(matches!(
            service.create(input("keychain", "jan@example.nl")).await,
            Err(OrderServiceError::ValidationError(_))
        ));

        let order = service.create(input("mug", "jan@example.nl")).await.unwrap();
        assert_eq!(order.order_type, OrderType::Mug);
        assert_eq!(service.list().await.unwrap(), vec![order]);
    }

    #[tokio::test]
    async fn test_artwork_title_lookup() {
        let dir = TempDir::new().unwrap();
        let (service, artworks) = service(&dir);
        let now = Utc::now();
        artworks
            .create(&Artwork {
                id: "art-1".to_string(),
                title: "Zaanse Schans".to_string(),
                image: "/img/schans.jpg".to_string(),
                category: ArtworkCategory::Combinatie,
                description: None,
                available: true,
                rotation: None,
                available_products: None,
                digital_file: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let order = service.create(input("original", "jan@example.nl")).await.unwrap();
        assert_eq!(service.artwork_title(&order).await.as_deref(), Some("Zaanse Schans"));

        let unknown = service
            .create(CreateOrderInput {
                artwork_id: Some("gone".to_string()),
                ..input("original", "jan@example.nl")
            })
            .await
            .unwrap();
        assert_eq!(service.artwork_title(&unknown).await, None);
    }

    #[test]
    fn test_email_link_for_print_on_demand() {
        let order = OrderRequest {
            id: "o1".to_string(),
            artwork_id: Some("art-1".to_string()),
            order_type: OrderType::Tshirt,
            options: None,
            inspiration: None,
            contact_info: ContactInfo {
                name: "Jan".to_string(),
                email: "jan@example.nl".to_string(),
                phone: Some("0612345678".to_string()),
                message: None,
            },
            created_at: Utc::now(),
        };

        let link = order_email_link("info@plankjesmaffia.nl", &order, Some("Molen"));
        assert!(link.starts_with(
            "mailto:info@plankjesmaffia.nl?subject=Offerte%20aanvraag%20voor%20Molen%20-%20T-shirt%20print&body="
        ));

        let body = decode_body(&link);
        assert_eq!(
            body,
            "Beste Zaanse Plankjes Maffia,\n\n\
             Ik ben geïnteresseerd in:\n\
             - Kunstwerk: Molen\n\
             - Type: T-shirt print\n\
             - Opmerking: Dit is een print-on-demand product. Digitaal bestand wordt gebruikt voor productie.\n\n\
             Mijn contactgegevens:\n\
             - Naam: Jan\n\
             - Email: jan@example.nl\n\
             - Telefoon: 0612345678\n\n\
             Met vriendelijke groet,\n\
             Jan"
        );
    }

    #[test]
    fn test_email_link_with_options_and_message() {
        let order = OrderRequest {
            id: "o2".to_string(),
            artwork_id: None,
            order_type: OrderType::Derivative,
            options: Some(OrderOptions {
                thinner_wood: Some(true),
                different_finish: Some(false),
                fewer_colors: Some(true),
            }),
            inspiration: Some("Meer blauw".to_string()),
            contact_info: ContactInfo {
                name: "Els".to_string(),
                email: "els@example.nl".to_string(),
                phone: None,
                message: Some("Graag voor december".to_string()),
            },
            created_at: Utc::now(),
        };

        let link = order_email_link("studio@example.nl", &order, None);
        assert!(link.contains("subject=Offerte%20aanvraag%20voor%20kunstwerk%20-%20Afgeleide%20versie"));

        let body = decode_body(&link);
        assert!(body.contains("- Kunstwerk: Niet gespecificeerd\n"));
        assert!(body.contains("- Opties: Dunner hout, Minder kleuren\n"));
        assert!(body.contains("- Inspiratie/verzoek: Meer blauw\n"));
        assert!(body.contains("\n\nExtra bericht:\nGraag voor december\n\n"));
        assert!(!body.contains("Opmerking"));
        assert!(!body.contains("Telefoon"));
    }
}
