use std::time::Instant;

use eframe::egui;
use eframe::egui::emath::Rot2;
use hopeswap::catalog::Listing;
use hopeswap::swipe::{BadgeVisuals, CardDeck, DragSample, Offset};

const CARD_SIZE: egui::Vec2 = egui::vec2(300.0, 400.0);
/// Seconds of current pointer velocity projected onto the release point.
const MOMENTUM_WINDOW: f32 = 0.25;

/// Draws the visible part of the deck and feeds pointer drags to its head.
pub fn render(ui: &mut egui::Ui, deck: &mut CardDeck<Listing>, drag_total: &mut egui::Vec2) {
    let (rect, response) = ui.allocate_exact_size(ui.available_size(), egui::Sense::drag());
    let now = Instant::now();

    if response.drag_started() {
        *drag_total = egui::Vec2::ZERO;
        deck.begin_drag();
    }
    if response.dragged() {
        *drag_total += response.drag_delta();
        deck.update_drag(DragSample::at(drag_total.x, drag_total.y));
    }
    if response.drag_stopped() {
        let velocity = ui.input(|i| i.pointer.velocity());
        let predicted = *drag_total + velocity * MOMENTUM_WINDOW;
        deck.end_drag(
            DragSample::new(offset(*drag_total), offset(predicted)),
            now,
        );
        *drag_total = egui::Vec2::ZERO;
    }

    let painter = ui.painter_at(rect);
    if deck.is_empty() {
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            "No more listings nearby",
            egui::FontId::proportional(18.0),
            ui.visuals().weak_text_color(),
        );
        return;
    }

    for (listing, card, slot) in deck.stack() {
        let visuals = card.visuals();
        let opacity = (visuals.opacity * slot.opacity).clamp(0.0, 1.0);
        if opacity <= 0.0 {
            continue;
        }
        let half = CARD_SIZE * 0.5 * slot.scale;
        let center =
            rect.center() + egui::vec2(visuals.offset.x, visuals.offset.y + slot.y_offset);
        // Rotation pivots on the middle of the bottom edge.
        let pivot = center + egui::vec2(0.0, half.y);
        let rotation = Rot2::from_angle(visuals.rotation_degrees.to_radians());
        let place = |local: egui::Vec2| pivot + rotation * (local - egui::vec2(0.0, half.y));

        let corners = vec![
            place(egui::vec2(-half.x, -half.y)),
            place(egui::vec2(half.x, -half.y)),
            place(egui::vec2(half.x, half.y)),
            place(egui::vec2(-half.x, half.y)),
        ];
        painter.add(egui::Shape::convex_polygon(
            corners,
            ui.visuals().extreme_bg_color.gamma_multiply(opacity),
            egui::Stroke::new(1.0, egui::Color32::GRAY.gamma_multiply(opacity)),
        ));

        let text_color = ui.visuals().text_color().gamma_multiply(opacity);
        painter.text(
            place(egui::vec2(0.0, -half.y * 0.6)),
            egui::Align2::CENTER_CENTER,
            &listing.title,
            egui::FontId::proportional(22.0 * slot.scale),
            text_color,
        );
        painter.text(
            place(egui::vec2(0.0, -half.y * 0.35)),
            egui::Align2::CENTER_CENTER,
            format!("{} · {}", listing.category.label(), listing.price_label()),
            egui::FontId::proportional(15.0 * slot.scale),
            text_color,
        );
        painter.text(
            place(egui::vec2(0.0, 0.0)),
            egui::Align2::CENTER_CENTER,
            &listing.description,
            egui::FontId::proportional(13.0 * slot.scale),
            text_color,
        );
        painter.text(
            place(egui::vec2(0.0, half.y * 0.7)),
            egui::Align2::CENTER_CENTER,
            &listing.location,
            egui::FontId::proportional(12.0 * slot.scale),
            ui.visuals().weak_text_color().gamma_multiply(opacity),
        );

        badge(
            &painter,
            place(egui::vec2(-half.x * 0.55, -half.y * 0.85)),
            "LIKE",
            egui::Color32::GREEN,
            visuals.accept_badge,
        );
        badge(
            &painter,
            place(egui::vec2(half.x * 0.55, -half.y * 0.85)),
            "NOPE",
            egui::Color32::RED,
            visuals.reject_badge,
        );
    }
}

fn badge(
    painter: &egui::Painter,
    at: egui::Pos2,
    label: &str,
    color: egui::Color32,
    badge: BadgeVisuals,
) {
    let opacity = badge.opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 {
        return;
    }
    painter.text(
        at,
        egui::Align2::CENTER_CENTER,
        label,
        egui::FontId::proportional(28.0 * badge.scale),
        color.gamma_multiply(opacity),
    );
}

fn offset(v: egui::Vec2) -> Offset {
    Offset::new(v.x, v.y)
}
