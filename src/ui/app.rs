use std::time::Instant;

use eframe::egui;
use hopeswap::catalog::{Listing, ListingQuery};
use hopeswap::swipe::{CardDeck, DeckEvent, Decision, SwipeConfig};
use hopeswap::sync::{ChatSession, SessionEvent};

use super::components::{
    card_stack, chat_area, input_bar,
    sidebar::{self, SidebarActions},
};
use super::state::AppState;

pub struct HopeSwapApp {
    state: AppState,
    session: Option<ChatSession>,
    deck: CardDeck<Listing>,
}

impl HopeSwapApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        session: Option<ChatSession>,
        listings: Vec<Listing>,
        query: ListingQuery,
        swipe_config: SwipeConfig,
    ) -> Self {
        let state = AppState::new(listings, query);
        let deck = CardDeck::from_items(state.visible_listings(), swipe_config);
        Self {
            state,
            session,
            deck,
        }
    }

    fn handle_session_events(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        for event in session.poll() {
            match event {
                SessionEvent::SendFailed { error, .. } => {
                    self.state.push_activity(format!("Message not sent: {error}"));
                }
                SessionEvent::SubscriptionLost { error, retry_in } => {
                    let retry = retry_in
                        .map(|delay| format!("retrying in {:.1}s", delay.as_secs_f32()))
                        .unwrap_or_else(|| "giving up".to_string());
                    self.state
                        .push_activity(format!("Chat disconnected ({error}); {retry}"));
                }
                SessionEvent::ReadFailed { message_id, error } => {
                    log::warn!("Failed to mark {message_id} read: {error}");
                }
                other => log::debug!("Session event: {other:?}"),
            }
        }
    }

    fn handle_deck_events(&mut self, events: Vec<DeckEvent<Listing>>) {
        for event in events {
            if let DeckEvent::Decided { item, decision } = event {
                self.state
                    .record_decision(item, decision == Decision::Accept);
            }
        }
    }

    fn rebuild_deck(&mut self) {
        self.deck.clear();
        self.deck.extend(self.state.visible_listings());
    }
}

impl eframe::App for HopeSwapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_session_events();
        let events = self.deck.advance(Instant::now());
        self.handle_deck_events(events);

        egui::SidePanel::left("filters")
            .resizable(true)
            .default_width(220.0)
            .show(ctx, |ui| {
                let actions: SidebarActions = sidebar::render(ui, &mut self.state);
                if actions.filters_changed {
                    self.rebuild_deck();
                }
            });

        egui::SidePanel::right("chat")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| match self.session.as_mut() {
                Some(session) => {
                    ui.heading("Messages");
                    ui.separator();
                    session.mark_read();
                    chat_area::render(ui, session);

                    ui.separator();
                    if input_bar::render(ui, session.input_mut()) {
                        if let Err(err) = session.send_input() {
                            log::warn!("Failed to send message: {err}");
                            self.state.push_activity(format!("Cannot send: {err}"));
                        }
                    }
                }
                None => {
                    ui.heading("Messages");
                    ui.label("Sign in to chat with sellers.");
                }
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("HopeSwap");
            ui.separator();
            card_stack::render(ui, &mut self.deck, &mut self.state.drag_total);
        });

        ctx.request_repaint();
    }
}
