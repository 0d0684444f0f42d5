use std::collections::VecDeque;
use std::time::Instant;

use super::card::{Phase, SwipeCard};
use super::{Decision, DragSample, SwipeConfig};

/// Cards drawn behind the head; deeper ones are hidden.
const VISIBLE_DEPTH: usize = 3;

/// Outcome of a finished swipe, in delivery order: `Decided` always comes
/// immediately before the matching `Removed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeckEvent<T> {
    Decided { item: T, decision: Decision },
    Removed { item: T },
}

/// Placement of a card in the stack; index 0 is the head.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackSlot {
    pub scale: f32,
    pub y_offset: f32,
    pub opacity: f32,
}

pub fn stack_slot(index: usize) -> StackSlot {
    if index >= VISIBLE_DEPTH {
        return StackSlot {
            scale: 0.85,
            y_offset: 8.0 * VISIBLE_DEPTH as f32,
            opacity: 0.0,
        };
    }
    let i = index as f32;
    StackSlot {
        scale: 1.0 - 0.05 * i,
        y_offset: 8.0 * i,
        opacity: 1.0 - 0.15 * i,
    }
}

struct Entry<T> {
    item: T,
    card: SwipeCard,
}

/// Ordered queue of items awaiting a decision. Only the head card takes
/// drag input; it leaves the queue once its exit animation completes.
pub struct CardDeck<T> {
    entries: VecDeque<Entry<T>>,
    config: SwipeConfig,
}

impl<T: Clone> CardDeck<T> {
    pub fn new(config: SwipeConfig) -> Self {
        Self {
            entries: VecDeque::new(),
            config,
        }
    }

    pub fn from_items(items: impl IntoIterator<Item = T>, config: SwipeConfig) -> Self {
        let mut deck = Self::new(config);
        deck.extend(items);
        deck
    }

    pub fn push(&mut self, item: T) {
        self.entries.push_back(Entry {
            item,
            card: SwipeCard::new(self.config),
        });
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = T>) {
        for item in items {
            self.push(item);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn head(&self) -> Option<&T> {
        self.entries.front().map(|entry| &entry.item)
    }

    pub fn head_card(&self) -> Option<&SwipeCard> {
        self.entries.front().map(|entry| &entry.card)
    }

    pub fn head_phase(&self) -> Option<Phase> {
        self.head_card().map(SwipeCard::phase)
    }

    pub fn begin_drag(&mut self) -> bool {
        self.entries
            .front_mut()
            .is_some_and(|entry| entry.card.begin_drag())
    }

    pub fn update_drag(&mut self, sample: DragSample) {
        if let Some(entry) = self.entries.front_mut() {
            entry.card.update_drag(sample);
        }
    }

    pub fn end_drag(&mut self, sample: DragSample, now: Instant) -> Option<Phase> {
        self.entries
            .front_mut()
            .map(|entry| entry.card.end_drag(sample, now))
    }

    /// Steps the head card's animation. When its exit completes the card is
    /// popped and reported as `Decided` then `Removed`.
    pub fn advance(&mut self, now: Instant) -> Vec<DeckEvent<T>> {
        let Some(head) = self.entries.front_mut() else {
            return Vec::new();
        };
        let Some(decision) = head.card.advance(now) else {
            return Vec::new();
        };
        let Some(entry) = self.entries.pop_front() else {
            return Vec::new();
        };
        vec![
            DeckEvent::Decided {
                item: entry.item.clone(),
                decision,
            },
            DeckEvent::Removed { item: entry.item },
        ]
    }

    /// Removes the first item matching `predicate` without reporting a
    /// decision. Returns `None` (and does nothing) if no item matches.
    pub fn remove_where(&mut self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        let index = self.entries.iter().position(|entry| predicate(&entry.item))?;
        let mut entry = self.entries.remove(index)?;
        entry.card.dispose();
        Some(entry.item)
    }

    /// Drops every card; in-flight exits are cancelled.
    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            entry.card.dispose();
        }
        self.entries.clear();
    }

    /// Cards in back-to-front paint order with their stack placement.
    pub fn stack(&self) -> impl Iterator<Item = (&T, &SwipeCard, StackSlot)> {
        self.entries
            .iter()
            .enumerate()
            .take(VISIBLE_DEPTH)
            .rev()
            .map(|(index, entry)| (&entry.item, &entry.card, stack_slot(index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swipe::Offset;
    use std::time::Duration;

    fn deck_of(n: usize) -> CardDeck<String> {
        CardDeck::from_items((0..n).map(|i| format!("listing-{i}")), SwipeConfig::default())
    }

    fn swipe(
        deck: &mut CardDeck<String>,
        x: f32,
        predicted: f32,
        start: Instant,
    ) -> Vec<DeckEvent<String>> {
        deck.begin_drag();
        let sample = DragSample::new(Offset::new(x, 0.0), Offset::new(predicted, 0.0));
        deck.update_drag(sample);
        deck.end_drag(sample, start);

        let mut events = Vec::new();
        let mut t = Duration::ZERO;
        while t <= Duration::from_secs(2) {
            events.extend(deck.advance(start + t));
            t += Duration::from_millis(16);
        }
        events
    }

    #[test]
    fn swipe_right_decides_then_removes_head() {
        let mut deck = deck_of(3);
        let events = swipe(&mut deck, 150.0, 150.0, Instant::now());

        assert_eq!(
            events,
            [
                DeckEvent::Decided {
                    item: "listing-0".to_string(),
                    decision: Decision::Accept
                },
                DeckEvent::Removed {
                    item: "listing-0".to_string()
                },
            ]
        );
        assert_eq!(deck.len(), 2);
        assert_eq!(deck.head().map(String::as_str), Some("listing-1"));
        assert_eq!(deck.head_phase(), Some(Phase::Idle));
    }

    #[test]
    fn release_within_thresholds_keeps_card() {
        let mut deck = deck_of(2);
        let events = swipe(&mut deck, -100.0, -150.0, Instant::now());
        assert!(events.is_empty());
        assert_eq!(deck.len(), 2);
        assert_eq!(deck.head().map(String::as_str), Some("listing-0"));
    }

    #[test]
    fn zero_offset_uses_predicted_direction() {
        let mut deck = deck_of(2);
        let events = swipe(&mut deck, 0.0, -300.0, Instant::now());
        assert!(matches!(
            events.first(),
            Some(DeckEvent::Decided { decision: Decision::Reject, .. })
        ));
        assert_eq!(deck.len(), 1);
    }

    #[test]
    fn only_head_receives_input() {
        let mut deck = deck_of(2);
        let start = Instant::now();
        deck.begin_drag();
        deck.update_drag(DragSample::at(400.0, 0.0));
        deck.end_drag(DragSample::at(400.0, 0.0), start);

        // While the head is exiting, input goes nowhere.
        assert!(!deck.begin_drag());
        deck.update_drag(DragSample::at(50.0, 0.0));
        let second = deck.stack().find(|(item, _, _)| *item == "listing-1").unwrap().1;
        assert_eq!(second.phase(), Phase::Idle);
        assert_eq!(second.offset().x, 0.0);
    }

    #[test]
    fn removing_a_missing_item_is_a_no_op() {
        let mut deck = deck_of(1);
        assert_eq!(deck.remove_where(|item| item == "listing-9"), None);
        assert_eq!(deck.len(), 1);
    }

    #[test]
    fn removing_an_exiting_head_cancels_its_callbacks() {
        let mut deck = deck_of(2);
        let start = Instant::now();
        deck.begin_drag();
        deck.end_drag(DragSample::at(200.0, 0.0), start);
        assert_eq!(deck.remove_where(|item| item == "listing-0").as_deref(), Some("listing-0"));

        let events = deck.advance(start + Duration::from_secs(1));
        assert!(events.is_empty());
        assert_eq!(deck.head().map(String::as_str), Some("listing-1"));
    }

    #[test]
    fn stack_is_painted_back_to_front_with_depth() {
        let deck = deck_of(5);
        let order: Vec<(&String, StackSlot)> =
            deck.stack().map(|(item, _, slot)| (item, slot)).collect();
        assert_eq!(order.len(), 3);
        assert_eq!(order[0].0, "listing-2");
        assert_eq!(order[2].0, "listing-0");
        assert_eq!(order[2].1, stack_slot(0));
        assert!(order[0].1.scale < order[2].1.scale);
        assert_eq!(stack_slot(7).opacity, 0.0);
    }
}
