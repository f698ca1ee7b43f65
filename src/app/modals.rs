//! Modal dialogs (add infrastructure form, location alert)

use super::App;
use crate::state::Action;
use crate::theme;
use crate::types::FormOutcome;
use crate::ui::components::text_field;
use eframe::egui;

impl App {
    // ========================================================================
    // ADD INFRASTRUCTURE FORM
    // ========================================================================

    pub(crate) fn render_add_form(&mut self, ctx: &egui::Context) {
        if self.add_form.is_none() {
            return;
        }
        let categories: Vec<String> = self.state.categories().into_iter().map(String::from).collect();
        let Some(form) = self.add_form.as_mut() else {
            return;
        };

        let mut outcome = None;
        let modal = egui::Modal::new(egui::Id::new("add_infrastructure_modal"))
            .backdrop_color(egui::Color32::from_black_alpha(180))
            .frame(theme::modal_frame());
        let modal_response = modal.show(ctx, |ui| {
            ui.set_width(theme::MODAL_WIDTH);

            ui.add(
                egui::Label::new(
                    egui::RichText::new(format!("{}  Add Infrastructure", egui_phosphor::regular::MAP_PIN))
                        .size(theme::FONT_TITLE)
                        .strong(),
                )
                .selectable(false),
            );
            ui.add(
                egui::Label::new(
                    egui::RichText::new(format!("Placed at map center {}", form.at))
                        .size(theme::FONT_SMALL)
                        .color(theme::TEXT_DIM),
                )
                .selectable(false),
            );
            ui.add_space(theme::SPACING_SM);
            ui.separator();
            ui.add_space(theme::SPACING_SM);

            let name = text_field(ui, "Name", &mut form.draft.name, "e.g. North Substation", false);
            if form.focus_name {
                form.focus_name = false;
                name.request_focus();
            }
            ui.add_space(theme::SPACING_MD);

            text_field(ui, "Category", &mut form.draft.category, "e.g. Energy", false);
            if !categories.is_empty() {
                ui.add_space(theme::SPACING_XS);
                ui.horizontal_wrapped(|ui| {
                    for category in &categories {
                        let active = form.draft.category.trim().eq_ignore_ascii_case(category);
                        let (_, fg) = theme::category_colors(category);
                        let chip = ui.selectable_label(
                            active,
                            egui::RichText::new(category).size(theme::FONT_SMALL).color(fg),
                        );
                        if chip.clicked() {
                            form.draft.category = category.clone();
                        }
                    }
                });
            }
            ui.add_space(theme::SPACING_MD);

            text_field(
                ui,
                "Description",
                &mut form.draft.description,
                "What does this facility do?",
                true,
            );
            ui.add_space(theme::SPACING_LG);

            let validation = form.draft.validate();
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let save = ui
                    .add_enabled(
                        validation.is_ok(),
                        theme::button_accent(format!("{}  Save", egui_phosphor::regular::CHECK)),
                    )
                    .on_disabled_hover_text(match &validation {
                        Err(e) => e.to_string(),
                        Ok(_) => String::new(),
                    });
                let submit_shortcut =
                    ui.input(|i| i.modifiers.command && i.key_pressed(egui::Key::Enter));
                if save.clicked() || submit_shortcut {
                    outcome = Some(FormOutcome::Submitted(form.draft.clone()));
                }
                if ui.add(theme::button("Cancel")).clicked() {
                    outcome = Some(FormOutcome::Cancelled);
                }
            });
        });

        // Escape or a click on the backdrop
        if outcome.is_none() && modal_response.should_close() {
            outcome = Some(FormOutcome::Cancelled);
        }
        if let Some(outcome) = outcome {
            self.close_add_form(outcome);
        }
    }

    // ========================================================================
    // ALERT
    // ========================================================================

    pub(crate) fn render_alert(&mut self, ctx: &egui::Context) {
        let Some(message) = self.state.alert.clone() else {
            return;
        };

        let mut dismissed = false;
        let modal_response = egui::Modal::new(egui::Id::new("alert_modal"))
            .backdrop_color(egui::Color32::from_black_alpha(180))
            .frame(theme::modal_frame())
            .show(ctx, |ui| {
                ui.set_width(theme::MODAL_WIDTH);
                ui.vertical_centered(|ui| {
                    ui.add_space(theme::SPACING_MD);
                    ui.label(
                        egui::RichText::new(egui_phosphor::regular::WARNING_CIRCLE)
                            .size(36.0)
                            .color(theme::ACCENT),
                    );
                    ui.add_space(theme::SPACING_MD);
                    ui.label(egui::RichText::new(&message).color(theme::TEXT_SECONDARY));
                    ui.add_space(theme::SPACING_XL);
                    let ok_btn = ui.add(theme::button_accent(format!("{}  OK", egui_phosphor::regular::CHECK)));
                    if ok_btn.clicked() || ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                        dismissed = true;
                    }
                });
            });

        if dismissed || modal_response.should_close() {
            self.dispatch(Action::DismissAlert);
        }
    }
}
