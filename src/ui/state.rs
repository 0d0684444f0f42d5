use std::collections::HashSet;

use chrono::{DateTime, Utc};
use eframe::egui;
use hopeswap::catalog::{Listing, ListingQuery};

const MAX_ACTIVITY: usize = 100;

/// One line in the activity log shown under the filters.
#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Local state of the discover screen.
pub struct AppState {
    pub listings: Vec<Listing>,
    pub query: ListingQuery,
    pub liked: Vec<Listing>,
    /// Listings already swiped either way; kept out of rebuilt decks.
    pub decided: HashSet<String>,
    /// Accumulated pointer travel of the current drag.
    pub drag_total: egui::Vec2,
    pub activity: Vec<ActivityEntry>,
}

impl AppState {
    pub fn new(listings: Vec<Listing>, query: ListingQuery) -> Self {
        Self {
            listings,
            query,
            liked: Vec::new(),
            decided: HashSet::new(),
            drag_total: egui::Vec2::ZERO,
            activity: Vec::new(),
        }
    }

    /// Listings the deck should currently hold, in display order.
    pub fn visible_listings(&self) -> Vec<Listing> {
        self.query
            .apply(&self.listings)
            .into_iter()
            .filter(|listing| !self.decided.contains(&listing.id))
            .cloned()
            .collect()
    }

    pub fn record_decision(&mut self, listing: Listing, liked: bool) {
        self.decided.insert(listing.id.clone());
        if liked {
            self.push_activity(format!("Liked {}", listing.title));
            self.liked.push(listing);
        } else {
            self.push_activity(format!("Passed on {}", listing.title));
        }
    }

    pub fn push_activity(&mut self, message: String) {
        self.activity.push(ActivityEntry {
            timestamp: Utc::now(),
            message,
        });

        if self.activity.len() > MAX_ACTIVITY {
            self.activity.remove(0);
        }
    }
}
