use eframe::egui;
use hopeswap::catalog::{Category, ListingKind, SortOrder};

use crate::ui::state::AppState;

#[derive(Default)]
pub struct SidebarActions {
    pub filters_changed: bool,
}

pub fn render(ui: &mut egui::Ui, state: &mut AppState) -> SidebarActions {
    let before = state.query.clone();

    ui.heading("Discover");
    ui.separator();

    ui.label("Search:");
    ui.text_edit_singleline(&mut state.query.search);

    egui::ComboBox::from_label("Category")
        .selected_text(state.query.category.map_or("All", Category::label))
        .show_ui(ui, |ui| {
            ui.selectable_value(&mut state.query.category, None, "All");
            for category in Category::ALL {
                ui.selectable_value(&mut state.query.category, Some(category), category.label());
            }
        });

    egui::ComboBox::from_label("Type")
        .selected_text(state.query.kind.map_or("Any", ListingKind::label))
        .show_ui(ui, |ui| {
            ui.selectable_value(&mut state.query.kind, None, "Any");
            for kind in ListingKind::ALL {
                ui.selectable_value(&mut state.query.kind, Some(kind), kind.label());
            }
        });

    ui.horizontal(|ui| {
        ui.label("Sort:");
        ui.selectable_value(&mut state.query.sort, SortOrder::Newest, "Newest");
        ui.selectable_value(&mut state.query.sort, SortOrder::PriceAscending, "Price ↑");
        ui.selectable_value(&mut state.query.sort, SortOrder::PriceDescending, "Price ↓");
    });

    ui.separator();
    ui.label("Liked:");
    if state.liked.is_empty() {
        ui.label(egui::RichText::new("Nothing yet").weak());
    } else {
        for listing in &state.liked {
            ui.horizontal(|ui| {
                ui.colored_label(egui::Color32::GREEN, "♥");
                ui.label(&listing.title);
                ui.label(egui::RichText::new(listing.price_label()).weak());
            });
        }
    }

    ui.separator();
    ui.label("Activity:");
    egui::ScrollArea::vertical().show(ui, |ui| {
        for entry in state.activity.iter().rev() {
            ui.label(
                egui::RichText::new(format!(
                    "[{}] {}",
                    entry.timestamp.format("%H:%M:%S"),
                    entry.message
                ))
                .small(),
            );
        }
    });

    SidebarActions {
        filters_changed: state.query != before,
    }
}
