//! Back-office dashboard statistics

use crate::db::repositories::{
    ArtworkRepository, ContactRepository, NewsletterRepository, OrderRepository,
};
use crate::models::ContactStatus;
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Orders newer than this count as recent
const RECENT_ORDER_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub artworks: ArtworkStats,
    pub orders: OrderStats,
    pub newsletter: NewsletterStats,
    pub contact: ContactStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtworkStats {
    pub total: usize,
    pub available: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderStats {
    pub total: usize,
    pub recent: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsletterStats {
    pub total: usize,
    pub active: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactStats {
    pub total: usize,
    pub unread: usize,
}

/// Aggregates counts across all stores
pub struct DashboardService {
    artworks: Arc<dyn ArtworkRepository>,
    orders: Arc<dyn OrderRepository>,
    newsletter: Arc<dyn NewsletterRepository>,
    contact: Arc<dyn ContactRepository>,
}

impl DashboardService {
    pub fn new(
        artworks: Arc<dyn ArtworkRepository>,
        orders: Arc<dyn OrderRepository>,
        newsletter: Arc<dyn NewsletterRepository>,
        contact: Arc<dyn ContactRepository>,
    ) -> Self {
        Self {
            artworks,
            orders,
            newsletter,
            contact,
        }
    }

    pub async fn stats(&self) -> Result<DashboardStats> {
        let (artworks, orders, subscriptions, submissions) = tokio::try_join!(
            async { self.artworks.list().await.context("Failed to list artworks") },
            async { self.orders.list().await.context("Failed to list orders") },
            async { self.newsletter.list_all().await.context("Failed to list subscriptions") },
            async { self.contact.list().await.context("Failed to list contact submissions") },
        )?;

        let recent_cutoff = Utc::now() - Duration::days(RECENT_ORDER_DAYS);

        Ok(DashboardStats {
            artworks: ArtworkStats {
                total: artworks.len(),
                available: artworks.iter().filter(|a| a.available).count(),
            },
            orders: OrderStats {
                total: orders.len(),
                recent: orders.iter().filter(|o| o.created_at > recent_cutoff).count(),
            },
            newsletter: NewsletterStats {
                total: subscriptions.len(),
                active: subscriptions.iter().filter(|s| s.is_active()).count(),
            },
            contact: ContactStats {
                total: submissions.len(),
                unread: submissions
                    .iter()
                    .filter(|s| s.status == ContactStatus::New)
                    .count(),
            },
        })
    }
}
