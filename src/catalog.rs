//! Marketplace listings and the client-side filters the discover screen
//! composes over them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Electronics,
    Furniture,
    Clothing,
    Books,
    Sports,
    Toys,
    Home,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Electronics,
        Category::Furniture,
        Category::Clothing,
        Category::Books,
        Category::Sports,
        Category::Toys,
        Category::Home,
        Category::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Electronics => "Electronics",
            Category::Furniture => "Furniture",
            Category::Clothing => "Clothing",
            Category::Books => "Books",
            Category::Sports => "Sports",
            Category::Toys => "Toys",
            Category::Home => "Home",
            Category::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingKind {
    Sell,
    Trade,
    Giveaway,
}

impl ListingKind {
    pub const ALL: [ListingKind; 3] = [
        ListingKind::Sell,
        ListingKind::Trade,
        ListingKind::Giveaway,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ListingKind::Sell => "For sale",
            ListingKind::Trade => "Trade",
            ListingKind::Giveaway => "Free",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    pub kind: ListingKind,
    /// Asking price in cents; `None` for give-aways and open trades.
    #[serde(default)]
    pub price_cents: Option<u64>,
    #[serde(default)]
    pub location: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    pub fn price_label(&self) -> String {
        match (self.kind, self.price_cents) {
            (ListingKind::Giveaway, _) => "Free".to_string(),
            (_, Some(cents)) => format!("${}.{:02}", cents / 100, cents % 100),
            (ListingKind::Trade, None) => "Trade".to_string(),
            (ListingKind::Sell, None) => "Make an offer".to_string(),
        }
    }

    fn matches_text(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Newest,
    PriceAscending,
    PriceDescending,
}

/// Filters applied one after another; unset filters match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingQuery {
    pub category: Option<Category>,
    pub kind: Option<ListingKind>,
    pub search: String,
    pub min_price_cents: Option<u64>,
    pub max_price_cents: Option<u64>,
    pub exclude_owner: Option<String>,
    pub sort: SortOrder,
}

impl ListingQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn kind(mut self, kind: ListingKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = text.into();
        self
    }

    pub fn price_between(mut self, min_cents: Option<u64>, max_cents: Option<u64>) -> Self {
        self.min_price_cents = min_cents;
        self.max_price_cents = max_cents;
        self
    }

    /// Hides the signed-in user's own listings.
    pub fn excluding_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.exclude_owner = Some(owner_id.into());
        self
    }

    pub fn sorted(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        if self.category.is_some_and(|c| c != listing.category) {
            return false;
        }
        if self.kind.is_some_and(|k| k != listing.kind) {
            return false;
        }
        if self
            .exclude_owner
            .as_deref()
            .is_some_and(|owner| owner == listing.owner_id)
        {
            return false;
        }
        let needle = self.search.trim().to_lowercase();
        if !needle.is_empty() && !listing.matches_text(&needle) {
            return false;
        }
        // Unpriced listings only pass a price filter when it has no minimum.
        let price = listing.price_cents.unwrap_or(0);
        if self.min_price_cents.is_some_and(|min| price < min) {
            return false;
        }
        if self.max_price_cents.is_some_and(|max| price > max) {
            return false;
        }
        true
    }

    pub fn apply<'a>(&self, listings: &'a [Listing]) -> Vec<&'a Listing> {
        let mut found: Vec<&Listing> = listings.iter().filter(|l| self.matches(l)).collect();
        match self.sort {
            SortOrder::Newest => found.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::PriceAscending => found.sort_by_key(|l| l.price_cents.unwrap_or(0)),
            SortOrder::PriceDescending => {
                found.sort_by(|a, b| b.price_cents.unwrap_or(0).cmp(&a.price_cents.unwrap_or(0)))
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(
        id: &str,
        title: &str,
        category: Category,
        kind: ListingKind,
        price: Option<u64>,
        age_days: i64,
    ) -> Listing {
        Listing {
            id: id.to_string(),
            title: title.to_string(),
            description: format!("{title} in good condition"),
            category,
            kind,
            price_cents: price,
            location: "Riverside".to_string(),
            owner_id: if id == "mine" { "alice" } else { "bob" }.to_string(),
            created_at: Utc::now() - chrono::Duration::days(age_days),
        }
    }

    fn sample() -> Vec<Listing> {
        vec![
            listing("bike", "Road Bike", Category::Sports, ListingKind::Sell, Some(12_000), 3),
            listing("sofa", "Grey Sofa", Category::Furniture, ListingKind::Giveaway, None, 1),
            listing("books", "Sci-fi Books", Category::Books, ListingKind::Trade, None, 5),
            listing("lamp", "Desk Lamp", Category::Home, ListingKind::Sell, Some(1_500), 2),
            listing("mine", "Old Phone", Category::Electronics, ListingKind::Sell, Some(4_000), 0),
        ]
    }

    fn ids(found: Vec<&Listing>) -> Vec<&str> {
        found.into_iter().map(|l| l.id.as_str()).collect()
    }

    #[test]
    fn empty_query_returns_everything_newest_first() {
        let listings = sample();
        assert_eq!(
            ids(ListingQuery::new().apply(&listings)),
            ["mine", "sofa", "lamp", "bike", "books"]
        );
    }

    #[test]
    fn blank_search_matches_all() {
        let listings = sample();
        assert_eq!(ListingQuery::new().search("   ").apply(&listings).len(), 5);
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_description() {
        let listings = sample();
        assert_eq!(ids(ListingQuery::new().search("BIKE").apply(&listings)), ["bike"]);
        assert_eq!(ListingQuery::new().search("good condition").apply(&listings).len(), 5);
    }

    #[test]
    fn filters_compose() {
        let listings = sample();
        let query = ListingQuery::new()
            .kind(ListingKind::Sell)
            .price_between(Some(1_000), Some(10_000))
            .excluding_owner("alice")
            .sorted(SortOrder::PriceAscending);
        assert_eq!(ids(query.apply(&listings)), ["lamp"]);

        let query = ListingQuery::new().category(Category::Furniture).kind(ListingKind::Giveaway);
        assert_eq!(ids(query.apply(&listings)), ["sofa"]);
    }

    #[test]
    fn price_sorting_treats_unpriced_as_zero() {
        let listings = sample();
        let found = ListingQuery::new().sorted(SortOrder::PriceDescending).apply(&listings);
        assert_eq!(found[0].id, "bike");
        assert_eq!(found.last().unwrap().price_cents, None);
    }

    #[test]
    fn price_labels() {
        let listings = sample();
        assert_eq!(listings[0].price_label(), "$120.00");
        assert_eq!(listings[1].price_label(), "Free");
        assert_eq!(listings[2].price_label(), "Trade");
    }
}
