use std::error::Error;
use std::time::{Duration, Instant};

use chrono::Utc;
use hopeswap::catalog::{Category, Listing, ListingKind, ListingQuery};
use hopeswap::common::{Conversation, Message};
use hopeswap::error::StoreError;
use hopeswap::services::AppServices;
use hopeswap::swipe::{CardDeck, DeckEvent, DragSample};
use hopeswap::sync::SessionEvent;

pub const DEMO_SELLER_ID: &str = "demo-seller";

/// Each signed-in user gets their own conversation with the demo seller.
pub fn conversation_id_for(user_id: &str) -> String {
    format!("demo-conversation-{user_id}")
}

pub fn sample_listings() -> Vec<Listing> {
    let now = Utc::now();
    let listing = |(id, title, description): (&str, &str, &str),
                   category: Category,
                   kind: ListingKind,
                   price_cents: Option<u64>,
                   hours_ago: i64| Listing {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        category,
        kind,
        price_cents,
        location: "Riverside".to_string(),
        owner_id: DEMO_SELLER_ID.to_string(),
        created_at: now - chrono::Duration::hours(hours_ago),
    };
    vec![
        listing(
            ("l-bike", "Road Bike", "Aluminium frame, new tyres"),
            Category::Sports,
            ListingKind::Sell,
            Some(12_000),
            2,
        ),
        listing(
            ("l-sofa", "Grey Sofa", "Three seater, pick up only"),
            Category::Furniture,
            ListingKind::Giveaway,
            None,
            5,
        ),
        listing(
            ("l-books", "Sci-fi Paperbacks", "Box of twenty classics"),
            Category::Books,
            ListingKind::Trade,
            None,
            9,
        ),
        listing(
            ("l-lamp", "Desk Lamp", "Warm LED, adjustable arm"),
            Category::Home,
            ListingKind::Sell,
            Some(1_500),
            1,
        ),
        listing(
            ("l-jacket", "Rain Jacket", "Size M, barely worn"),
            Category::Clothing,
            ListingKind::Sell,
            Some(3_000),
            20,
        ),
        listing(
            ("l-lego", "Lego Bucket", "Mixed bricks, about 2kg"),
            Category::Toys,
            ListingKind::Trade,
            None,
            30,
        ),
    ]
}

/// Writes a conversation between `user_id` and the demo seller with a short
/// unread history. An existing conversation is returned untouched.
pub async fn seed(services: &AppServices, user_id: &str) -> Result<Conversation, StoreError> {
    let conversation_id = conversation_id_for(user_id);
    if let Some(existing) = services.store.get_conversation(&conversation_id).await? {
        log::debug!("Conversation {conversation_id} already seeded");
        return Ok(existing);
    }
    let conversation = Conversation::new(conversation_id.as_str(), user_id, DEMO_SELLER_ID)?
        .with_listing("l-bike");
    services.store.put_conversation(&conversation).await?;

    let lines = [
        "Hi! The bike is still available.",
        "Happy to meet at the station on Saturday.",
    ];
    let base = Utc::now() - chrono::Duration::minutes(10);
    for (minute, text) in lines.into_iter().enumerate() {
        let mut message = Message::new(conversation_id.as_str(), DEMO_SELLER_ID, user_id, text);
        message.timestamp = base + chrono::Duration::minutes(minute as i64);
        services.store.put_message(&message).await?;
        services
            .store
            .update_last_message(&conversation_id, &message.text, message.timestamp)
            .await?;
    }
    log::info!("Seeded conversation {conversation_id} for {user_id}");
    Ok(conversation)
}

/// Scripted run without a window: one chat round trip, then a few swipes on
/// a simulated clock.
pub async fn run(services: &AppServices, conversation_id: &str) -> Result<(), Box<dyn Error>> {
    let mut session = services.open_chat(conversation_id).await?;

    while let Some(event) = session.next_event().await {
        if event == SessionEvent::MessagesChanged {
            break;
        }
    }
    log::info!("Loaded {} messages", session.messages().len());

    let issued = session.mark_read();
    log::info!("Marking {issued} messages read");

    let sent = session.send_message("Saturday works, see you at 10!")?;
    log::info!(
        "Sent {} optimistically; {} messages visible",
        sent.id,
        session.messages().len()
    );
    let deadline = tokio::time::sleep(Duration::from_secs(5));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            event = session.next_event() => match event {
                Some(SessionEvent::MessageSent { message_id }) if message_id == sent.id => {
                    log::info!("Store accepted {message_id}");
                    break;
                }
                Some(SessionEvent::SendFailed { message_id, error }) => {
                    log::warn!("Send of {message_id} failed: {error}");
                    break;
                }
                Some(other) => log::debug!("Session event: {other:?}"),
                None => break,
            },
            _ = &mut deadline => {
                log::warn!("Timed out waiting for the write of {}", sent.id);
                break;
            }
        }
    }
    session.close().await;

    let listings = sample_listings();
    let mut query = ListingQuery::new();
    if let Some(user_id) = services.current_user_id() {
        query = query.excluding_owner(user_id);
    }
    let mut deck = CardDeck::from_items(
        query.apply(&listings).into_iter().cloned(),
        services.config.swipe,
    );

    let mut clock = Instant::now();
    for x in [180.0, -40.0, -220.0] {
        deck.begin_drag();
        let sample = DragSample::at(x, 10.0);
        deck.update_drag(sample);
        deck.end_drag(sample, clock);
        for _ in 0..120 {
            clock += Duration::from_millis(16);
            for event in deck.advance(clock) {
                match event {
                    DeckEvent::Decided { item, decision } => {
                        log::info!("{decision:?} {} ({})", item.title, item.price_label())
                    }
                    DeckEvent::Removed { item } => log::debug!("Removed card {}", item.id),
                }
            }
        }
    }
    log::info!("{} listings left in the deck", deck.len());
    Ok(())
}
