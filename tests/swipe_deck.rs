use std::time::{Duration, Instant};

use chrono::Utc;
use hopeswap::catalog::{Category, Listing, ListingKind, ListingQuery};
use hopeswap::swipe::{CardDeck, DeckEvent, Decision, DragSample, Offset, Phase, SwipeConfig};

fn listing(id: &str, category: Category, owner: &str) -> Listing {
    Listing {
        id: id.to_string(),
        title: id.to_string(),
        description: String::new(),
        category,
        kind: ListingKind::Sell,
        price_cents: Some(1_000),
        location: "Riverside".to_string(),
        owner_id: owner.to_string(),
        created_at: Utc::now(),
    }
}

fn release(
    deck: &mut CardDeck<Listing>,
    sample: DragSample,
    start: Instant,
) -> Vec<DeckEvent<Listing>> {
    deck.begin_drag();
    deck.update_drag(sample);
    deck.end_drag(sample, start);
    let mut events = Vec::new();
    for frame in 0..=60 {
        events.extend(deck.advance(start + Duration::from_millis(frame * 16)));
    }
    events
}

fn decisions(events: &[DeckEvent<Listing>]) -> Vec<(String, Decision)> {
    events
        .iter()
        .filter_map(|event| match event {
            DeckEvent::Decided { item, decision } => Some((item.id.clone(), *decision)),
            DeckEvent::Removed { .. } => None,
        })
        .collect()
}

#[test]
fn filtered_listings_are_swiped_in_order() {
    let listings = vec![
        listing("chair", Category::Furniture, "bob"),
        listing("phone", Category::Electronics, "bob"),
        listing("table", Category::Furniture, "bob"),
        listing("my-desk", Category::Furniture, "alice"),
    ];
    let query = ListingQuery::new()
        .category(Category::Furniture)
        .excluding_owner("alice");
    let mut deck = CardDeck::from_items(
        query.apply(&listings).into_iter().cloned(),
        SwipeConfig::default(),
    );
    assert_eq!(deck.len(), 2);

    let mut clock = Instant::now();
    let mut all = Vec::new();
    for sample in [
        DragSample::at(140.0, 0.0),
        DragSample::new(Offset::new(-10.0, 0.0), Offset::new(-260.0, 0.0)),
    ] {
        all.extend(release(&mut deck, sample, clock));
        clock += Duration::from_secs(2);
    }

    let decided = decisions(&all);
    assert_eq!(decided.len(), 2);
    assert_eq!(decided[0].1, Decision::Accept);
    assert_eq!(decided[1].1, Decision::Reject);
    assert_ne!(decided[0].0, decided[1].0);
    assert!(deck.is_empty());
}

#[test]
fn hesitant_drag_returns_the_card() {
    let lamp = listing("lamp", Category::Home, "bob");
    let mut deck = CardDeck::from_items([lamp], SwipeConfig::default());
    let events = release(&mut deck, DragSample::at(60.0, 30.0), Instant::now());

    assert!(events.is_empty());
    assert_eq!(deck.head_phase(), Some(Phase::Idle));
    assert_eq!(deck.head_card().map(|card| card.offset()), Some(Offset::ZERO));
}

#[test]
fn lower_threshold_from_config_commits_shorter_drags() {
    let config = SwipeConfig {
        distance_threshold: 50.0,
        ..SwipeConfig::default()
    };
    let mut deck = CardDeck::from_items([listing("lamp", Category::Home, "bob")], config);
    let events = release(&mut deck, DragSample::at(-60.0, 0.0), Instant::now());

    assert_eq!(decisions(&events), [("lamp".to_string(), Decision::Reject)]);
    assert!(matches!(events.last(), Some(DeckEvent::Removed { item }) if item.id == "lamp"));
}
