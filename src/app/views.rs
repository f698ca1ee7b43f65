//! View rendering (sidebar list, map panel, marker popups)

use super::App;
use crate::map::MarkerId;
use crate::theme;
use crate::types::PointId;
use crate::ui::components::{point_details, point_row};
use eframe::egui;

impl App {
    // ========================================================================
    // KEYBOARD
    // ========================================================================

    /// Arrow keys walk the list, Escape closes an open popup
    pub(crate) fn handle_keyboard(&mut self, ctx: &egui::Context) {
        if self.add_form.is_some() || self.state.alert.is_some() || ctx.wants_keyboard_input() {
            return;
        }
        let (down, up, escape) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::ArrowDown),
                i.key_pressed(egui::Key::ArrowUp),
                i.key_pressed(egui::Key::Escape),
            )
        });
        let delta = match (down, up) {
            (true, false) => 1,
            (false, true) => -1,
            _ => 0,
        };
        if delta != 0 {
            if let Some(id) = self.state.neighbour(delta) {
                self.focus_on_infrastructure(id);
            }
        }
        if escape {
            self.map.close_popup();
        }
    }

    // ========================================================================
    // SIDEBAR
    // ========================================================================

    pub(crate) fn render_sidebar(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("infrastructure_panel")
            .exact_width(theme::SIDEBAR_WIDTH)
            .resizable(false)
            .show_separator_line(false)
            .frame(
                egui::Frame::new()
                    .fill(theme::BG_BASE)
                    .inner_margin(egui::Margin { left: 16, right: 8, top: 16, bottom: 16 }),
            )
            .show(ctx, |ui| {
                ui.add(
                    egui::Label::new(
                        egui::RichText::new(format!("{}  INFRASTRUCTURE MAP", egui_phosphor::regular::MAP_TRIFOLD))
                            .size(theme::FONT_LABEL)
                            .color(theme::TEXT_DIM),
                    )
                    .selectable(false),
                );
                ui.add_space(theme::SPACING_LG);

                let width = ui.available_width();
                let button_size = egui::vec2(width, theme::BUTTON_HEIGHT_LARGE);

                let locating = self.locator.is_pending();
                let locate_text = if locating {
                    format!("{}  Locating...", egui_phosphor::regular::CIRCLE_NOTCH)
                } else {
                    format!("{}  Find My Location", egui_phosphor::regular::CROSSHAIR)
                };
                let locate = ui
                    .add_enabled(!locating, theme::button(locate_text).min_size(button_size))
                    .on_hover_text("Center the map on your current position");
                if locate.clicked() {
                    self.find_my_location(ctx);
                }
                ui.add_space(theme::SPACING_SM);

                let add = ui
                    .add(
                        theme::button_accent(format!("{}  Add Infrastructure", egui_phosphor::regular::PLUS))
                            .min_size(button_size),
                    )
                    .on_hover_text("Add a point at the map center");
                if add.clicked() {
                    self.add_infrastructure();
                }
                ui.add_space(theme::SPACING_XL);

                ui.horizontal(|ui| {
                    ui.add(
                        egui::Label::new(
                            egui::RichText::new("Infrastructure")
                                .size(theme::FONT_HEADING)
                                .strong()
                                .color(theme::TEXT_PRIMARY),
                        )
                        .selectable(false),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.add(
                            egui::Label::new(
                                egui::RichText::new(self.state.points.len().to_string())
                                    .size(theme::FONT_SMALL)
                                    .color(theme::TEXT_DIM),
                            )
                            .selectable(false),
                        );
                    });
                });
                ui.add_space(theme::SPACING_SM);

                let mut clicked: Option<PointId> = None;
                let scroll_to_selected = std::mem::take(&mut self.scroll_to_selected);
                theme::section_frame()
                    .inner_margin(egui::Margin::same(4))
                    .show(ui, |ui| {
                        egui::ScrollArea::vertical()
                            .auto_shrink([false, false])
                            .show(ui, |ui| {
                                ui.spacing_mut().item_spacing.y = theme::SPACING_XS;
                                for point in &self.state.points {
                                    let selected = self.state.is_selected(point.id);
                                    let row = point_row(ui, point, selected)
                                        .on_hover_text(point.description.as_str());
                                    if selected && scroll_to_selected {
                                        row.scroll_to_me(Some(egui::Align::Center));
                                    }
                                    if row.clicked() {
                                        clicked = Some(point.id);
                                    }
                                }
                            });
                    });
                if let Some(id) = clicked {
                    self.focus_on_infrastructure(id);
                }
            });
    }

    // ========================================================================
    // MAP PANEL
    // ========================================================================

    pub(crate) fn render_map_panel(&mut self, ctx: &egui::Context) {
        let popup = egui::CentralPanel::default()
            .frame(
                egui::Frame::new()
                    .fill(theme::BG_BASE)
                    .inner_margin(egui::Margin { left: 8, right: 16, top: 16, bottom: 16 }),
            )
            .show(ctx, |ui| {
                // Header bar with point count and tracked view
                ui.horizontal(|ui| {
                    let status = format!(
                        "{} points  ·  center {}  ·  zoom {}",
                        self.state.points.len(),
                        self.state.center,
                        self.state.zoom,
                    );
                    ui.add(
                        egui::Label::new(egui::RichText::new(status).color(theme::TEXT_MUTED))
                            .selectable(false),
                    );
                    if let Some(point) = self.state.selected_point() {
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            ui.add(
                                egui::Label::new(
                                    egui::RichText::new(format!("{}  {}", egui_phosphor::regular::MAP_PIN, point.name))
                                        .color(theme::ACCENT),
                                )
                                .selectable(false),
                            );
                        });
                    }
                });
                ui.add_space(theme::SPACING_MD);

                let now = ui.input(|i| i.time);
                self.apply_camera_request(now);
                let markers = self.map_markers();
                let output = self.map.show(ui, &mut self.tiles, &markers);
                self.handle_map_events(&output.events);
                output.popup
            })
            .inner;

        if let Some((id, anchor)) = popup {
            self.render_popup(ctx, id, anchor);
        }
    }

    // ========================================================================
    // MARKER POPUPS
    // ========================================================================

    fn render_popup(&mut self, ctx: &egui::Context, id: MarkerId, anchor: egui::Pos2) {
        let mut close = false;
        egui::Area::new(egui::Id::new("marker_popup"))
            .order(egui::Order::Foreground)
            .fixed_pos(anchor - egui::vec2(0.0, theme::SPACING_SM))
            .pivot(egui::Align2::CENTER_BOTTOM)
            .show(ctx, |ui| {
                theme::popup_frame().show(ui, |ui| {
                    ui.set_width(theme::POPUP_WIDTH);
                    ui.horizontal_top(|ui| {
                        ui.vertical(|ui| {
                            ui.set_width(theme::POPUP_WIDTH - 24.0);
                            match id {
                                MarkerId::Point(point_id) => match self.state.point(point_id) {
                                    Some(point) => point_details(ui, point),
                                    None => close = true,
                                },
                                MarkerId::UserLocation => {
                                    popup_title(ui, "Your Location");
                                    if let Some(pos) = self.state.user_location {
                                        popup_caption(ui, &pos.to_string());
                                    }
                                }
                                MarkerId::Tracked => {
                                    popup_title(ui, "You are here");
                                    if let Some(pos) = self.location_tracker.position() {
                                        popup_caption(ui, &pos.to_string());
                                    }
                                    if let Some(at) = self.location_tracker.located_at() {
                                        popup_caption(ui, &format!("Located at {}", at.format("%H:%M:%S")));
                                    }
                                }
                            }
                        });
                        let x = ui.add(egui::Button::new(egui_phosphor::regular::X).frame(false));
                        if x.on_hover_text("Close").clicked() {
                            close = true;
                        }
                    });
                });
            });
        if close {
            self.map.close_popup();
        }
    }
}

fn popup_title(ui: &mut egui::Ui, text: &str) {
    ui.add(
        egui::Label::new(
            egui::RichText::new(text)
                .size(theme::FONT_HEADING)
                .strong()
                .color(theme::TEXT_PRIMARY),
        )
        .selectable(false),
    );
}

fn popup_caption(ui: &mut egui::Ui, text: &str) {
    ui.add(
        egui::Label::new(egui::RichText::new(text).size(theme::FONT_SMALL).color(theme::TEXT_DIM))
            .selectable(false),
    );
}
