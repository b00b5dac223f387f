//! In-process product matching and a contact sink that only logs.
//! Used when no remote endpoints are configured.

use super::interface::{BackendError, ContactSink, ContactSubmission, Product, ProductMatcher};
use crate::dialogue::types::UserPreferences;
use async_trait::async_trait;
use rand::seq::SliceRandom;

/// Match weight of a product: mood and location matches count triple, size
/// and style matches double, everything multiplied together.
pub fn match_weight(product: &Product, preferences: &UserPreferences) -> u32 {
    fn factor(matches: bool, weight: u32) -> u32 {
        if matches {
            weight
        } else {
            1
        }
    }

    factor(preferences.mood.map(|m| m.key()) == Some(product.mood.as_str()), 3)
        * factor(preferences.location.map(|l| l.key()) == Some(product.location.as_str()), 3)
        * factor(preferences.size.map(|s| s.key()) == Some(product.size.as_str()), 2)
        * factor(preferences.style.map(|s| s.key()) == Some(product.style.as_str()), 2)
}

pub struct LocalCatalog {
    products: Vec<Product>,
}

impl LocalCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Best-weighted available products; ties are all returned.
    pub fn best_matches(&self, preferences: &UserPreferences) -> Vec<&Product> {
        let scored: Vec<(u32, &Product)> = self
            .products
            .iter()
            .filter(|p| p.available)
            .map(|p| (match_weight(p, preferences), p))
            .collect();
        let Some(best) = scored.iter().map(|(w, _)| *w).max() else {
            return Vec::new();
        };
        scored
            .into_iter()
            .filter(|(w, _)| *w == best)
            .map(|(_, p)| p)
            .collect()
    }

    /// A small demo assortment.
    pub fn demo() -> Self {
        let item = |id: &str, name: &str, description: &str, tags: [&str; 4], price: &str| Product {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            image_url: format!("https://example.com/products/{}.png", id),
            mood: tags[0].to_string(),
            location: tags[1].to_string(),
            size: tags[2].to_string(),
            style: tags[3].to_string(),
            available: true,
            price_range: Some(price.to_string()),
        };
        Self::new(vec![
            item("moss-globe", "Moss Globe", "A tiny forest sealed in glass.", ["calm", "home", "small", "warm"], "1500-2500"),
            item("fern-tower", "Fern Tower", "A tall fern in a ceramic column.", ["calm", "office", "large", "minimal"], "4000-6000"),
            item("cactus-trio", "Cactus Trio", "Three prickly friends on a shelf.", ["vibrant", "cafe", "small", "industrial"], "1200-2000"),
            item("olive-tree", "Olive Tree", "A sun-loving olive for bright rooms.", ["vibrant", "home", "large", "warm"], "7000-9000"),
            item("bonsai-gift", "Bonsai Gift Box", "A juniper bonsai, ready to give.", ["minimal", "gift", "medium", "minimal"], "3000-4500"),
            item("ivy-frame", "Ivy Frame", "Living ivy stretched over a steel frame.", ["minimal", "office", "medium", "industrial"], "2500-3500"),
        ])
    }
}

#[async_trait]
impl ProductMatcher for LocalCatalog {
    async fn match_product(&self, preferences: &UserPreferences) -> Result<Product, BackendError> {
        let best = self.best_matches(preferences);
        let product = best
            .choose(&mut rand::thread_rng())
            .map(|p| (*p).clone())
            .ok_or(BackendError::NotFound)?;
        tracing::debug!("[Backend] Local catalog picked '{}'", product.id);
        Ok(product)
    }
}

/// Accepts every submission and writes a summary to the log.
#[derive(Debug, Default)]
pub struct LoggingContactSink;

#[async_trait]
impl ContactSink for LoggingContactSink {
    async fn submit(&self, submission: &ContactSubmission) -> Result<(), BackendError> {
        let name = if submission.name.is_empty() {
            "(no name)"
        } else {
            submission.name.as_str()
        };
        tracing::info!(
            "[Backend] Contact request from {} <{}>: mood={:?} location={:?} size={:?} style={:?} message={:?}",
            name,
            submission.contact,
            submission.preferences.mood.map(|m| m.key()),
            submission.preferences.location.map(|l| l.key()),
            submission.preferences.size.map(|s| s.key()),
            submission.preferences.style.map(|s| s.key()),
            submission.message
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::types::{Choice, LocationChoice, MoodChoice, SizeChoice, StyleChoice};

    fn prefs(mood: MoodChoice, location: LocationChoice, size: SizeChoice, style: StyleChoice) -> UserPreferences {
        let mut p = UserPreferences::default();
        p.record(Choice::Mood(mood));
        p.record(Choice::Location(location));
        p.record(Choice::Size(size));
        p.record(Choice::Style(style));
        p
    }

    #[test]
    fn weights_multiply() {
        let catalog = LocalCatalog::demo();
        let globe = &catalog.products[0];
        let full = prefs(MoodChoice::Calm, LocationChoice::Home, SizeChoice::Small, StyleChoice::Warm);
        assert_eq!(match_weight(globe, &full), 36);
        assert_eq!(match_weight(globe, &UserPreferences::default()), 1);

        let mood_only = prefs(MoodChoice::Calm, LocationChoice::Cafe, SizeChoice::Large, StyleChoice::Industrial);
        assert_eq!(match_weight(globe, &mood_only), 3);
    }

    #[test]
    fn exact_match_wins() {
        let catalog = LocalCatalog::demo();
        let wanted = prefs(MoodChoice::Vibrant, LocationChoice::Cafe, SizeChoice::Small, StyleChoice::Industrial);
        let product = tokio_test::block_on(catalog.match_product(&wanted)).unwrap();
        assert_eq!(product.id, "cactus-trio");
    }

    #[tokio::test]
    async fn unavailable_products_are_skipped() {
        let mut catalog = LocalCatalog::demo();
        for p in &mut catalog.products {
            p.available = p.id == "ivy-frame";
        }
        let wanted = prefs(MoodChoice::Calm, LocationChoice::Home, SizeChoice::Small, StyleChoice::Warm);
        assert_eq!(catalog.match_product(&wanted).await.unwrap().id, "ivy-frame");
    }

    #[tokio::test]
    async fn empty_catalog_is_not_found() {
        let catalog = LocalCatalog::new(vec![]);
        let err = catalog
            .match_product(&UserPreferences::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotFound));
    }

    #[tokio::test]
    async fn ties_are_all_candidates() {
        let catalog = LocalCatalog::demo();
        // nothing set: every available product ties at weight 1
        assert_eq!(
            catalog.best_matches(&UserPreferences::default()).len(),
            catalog.products.len()
        );
    }
}
