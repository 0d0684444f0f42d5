use eframe::egui;
use hopeswap::common::DeliveryState;
use hopeswap::sync::ChatSession;

pub fn render(ui: &mut egui::Ui, session: &ChatSession) {
    if !session.is_connected() {
        ui.colored_label(egui::Color32::YELLOW, "Reconnecting…");
    }

    let messages = session.messages();
    egui::ScrollArea::vertical()
        .stick_to_bottom(true)
        .max_height((ui.available_height() - 40.0).max(80.0))
        .show(ui, |ui| {
            for message in messages.iter() {
                let outgoing = session.is_outgoing(message);
                let layout = if outgoing {
                    egui::Layout::right_to_left(egui::Align::TOP)
                } else {
                    egui::Layout::left_to_right(egui::Align::TOP)
                };
                ui.with_layout(layout, |ui| {
                    let time = message.timestamp.format("%H:%M");
                    let suffix = match session.delivery_state(&message.id) {
                        Some(DeliveryState::Pending) => " (sending)",
                        Some(DeliveryState::Failed) => " (failed)",
                        _ => "",
                    };
                    let text = egui::RichText::new(format!("{}{suffix}", message.text));
                    let text = if outgoing {
                        text.color(egui::Color32::LIGHT_BLUE)
                    } else {
                        text
                    };
                    ui.label(text);
                    ui.label(egui::RichText::new(time.to_string()).weak().small());
                });
            }

            for failed in session.failed_messages() {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::TOP), |ui| {
                    ui.colored_label(egui::Color32::RED, format!("Not sent: {}", failed.text));
                });
            }

            if let Some(seen) = session.last_seen() {
                let local = seen.with_timezone(&chrono::Local);
                ui.label(
                    egui::RichText::new(format!("Seen {}", local.format("%H:%M")))
                        .weak()
                        .small(),
                );
            }
        });
}
