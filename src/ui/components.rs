//! Reusable UI components: list rows, form fields, category badges and
//! the body of a marker popup.

use crate::theme;
use crate::types::PointOfInterest;
use eframe::egui;

/// Small pill with the category name in its category colour
pub fn category_badge(ui: &mut egui::Ui, category: &str) -> egui::Response {
    let (bg, fg) = theme::category_colors(category);
    egui::Frame::new()
        .fill(bg)
        .stroke(egui::Stroke::new(theme::STROKE_DEFAULT, fg.gamma_multiply(0.4)))
        .corner_radius(theme::RADIUS_DEFAULT)
        .inner_margin(egui::Margin::symmetric(6, 1))
        .show(ui, |ui| {
            ui.add(
                egui::Label::new(egui::RichText::new(category).size(theme::FONT_SMALL).color(fg))
                    .selectable(false),
            );
        })
        .response
}

/// One entry of the infrastructure list. Returns the row response.
pub fn point_row(ui: &mut egui::Ui, point: &PointOfInterest, selected: bool) -> egui::Response {
    let width = ui.available_width();
    let (rect, response) =
        ui.allocate_exact_size(egui::vec2(width, theme::ROW_HEIGHT), egui::Sense::click());

    if ui.is_rect_visible(rect) {
        let base = if selected { theme::TABLE_ROW_SELECTED } else { theme::BG_BASE };
        let painter = ui.painter();
        painter.rect_filled(rect, theme::RADIUS_DEFAULT, theme::row_fill(&response, base));
        if selected {
            let bar = egui::Rect::from_min_size(rect.min, egui::vec2(3.0, rect.height()));
            painter.rect_filled(bar, theme::RADIUS_SMALL, theme::ACCENT);
        }

        let text_x = rect.min.x + theme::SPACING_LG;
        let name_color = if selected { theme::ACCENT } else { theme::TEXT_SECONDARY };
        painter.text(
            egui::pos2(text_x, rect.min.y + 12.0),
            egui::Align2::LEFT_CENTER,
            &point.name,
            egui::FontId::proportional(theme::FONT_BODY),
            name_color,
        );

        let badge_rect = egui::Rect::from_min_max(
            egui::pos2(text_x, rect.min.y + 22.0),
            egui::pos2(rect.max.x - theme::SPACING_SM, rect.max.y - theme::SPACING_XS),
        );
        // Child ui so the badge does not move the parent's cursor
        let mut badge_ui = ui.new_child(
            egui::UiBuilder::new()
                .max_rect(badge_rect)
                .layout(egui::Layout::left_to_right(egui::Align::Center)),
        );
        category_badge(&mut badge_ui, &point.category);
    }

    if response.hovered() {
        ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
    }
    response
}

/// Labelled single-line input styled like the rest of the app's inputs
pub fn text_field(
    ui: &mut egui::Ui,
    label: &str,
    value: &mut String,
    hint: &str,
    multiline: bool,
) -> egui::Response {
    ui.add(
        egui::Label::new(egui::RichText::new(label).size(theme::FONT_LABEL).color(theme::TEXT_MUTED))
            .selectable(false),
    );
    ui.add_space(theme::SPACING_XS);
    egui::Frame::new()
        .fill(theme::BG_INPUT)
        .stroke(egui::Stroke::new(theme::STROKE_DEFAULT, theme::BORDER_SUBTLE))
        .corner_radius(theme::RADIUS_DEFAULT)
        .inner_margin(egui::Margin::symmetric(8, 6))
        .show(ui, |ui| {
            let edit = if multiline {
                egui::TextEdit::multiline(value).desired_rows(3)
            } else {
                egui::TextEdit::singleline(value)
            };
            ui.add(
                edit.hint_text(hint)
                    .frame(false)
                    .desired_width(ui.available_width()),
            )
        })
        .inner
}

/// Title, category and description shown inside a marker popup
pub fn point_details(ui: &mut egui::Ui, point: &PointOfInterest) {
    ui.add(
        egui::Label::new(
            egui::RichText::new(&point.name)
                .size(theme::FONT_HEADING)
                .strong()
                .color(theme::TEXT_PRIMARY),
        )
        .wrap(),
    );
    ui.add_space(theme::SPACING_XS);
    ui.horizontal(|ui| {
        ui.add(
            egui::Label::new(egui::RichText::new("Type").size(theme::FONT_SMALL).color(theme::TEXT_DIM))
                .selectable(false),
        );
        category_badge(ui, &point.category);
    });
    ui.add_space(theme::SPACING_SM);
    ui.add(egui::Label::new(egui::RichText::new(&point.description).color(theme::TEXT_MUTED)).wrap());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::sample_infrastructure;

    /// Draw the rows in one headless frame; returns row rects and painted texts
    fn render_rows(points: &[PointOfInterest]) -> (Vec<egui::Rect>, Vec<String>) {
        let ctx = egui::Context::default();
        let input = egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(400.0, 600.0))),
            ..Default::default()
        };
        let mut rects = Vec::new();
        let output = ctx.run(input, |ctx| {
            rects.clear();
            egui::CentralPanel::default().show(ctx, |ui| {
                for point in points {
                    rects.push(point_row(ui, point, false).rect);
                }
            });
        });
        let texts = output
            .shapes
            .iter()
            .filter_map(|clipped| match &clipped.shape {
                egui::Shape::Text(text) => Some(text.galley.text().to_string()),
                _ => None,
            })
            .collect();
        (rects, texts)
    }

    #[test]
    fn test_point_row_shows_name_and_category_badge() {
        let points = sample_infrastructure();
        let (_, texts) = render_rows(&points[..1]);
        assert!(texts.iter().any(|t| t == "Central Hospital"));
        assert!(texts.iter().any(|t| t == "Healthcare"));
    }

    #[test]
    fn test_point_rows_stack_without_overlap() {
        let points = sample_infrastructure();
        let (rects, _) = render_rows(&points);
        assert_eq!(rects.len(), points.len());
        for pair in rects.windows(2) {
            assert_eq!(pair[0].height(), theme::ROW_HEIGHT);
            assert!(pair[1].min.y >= pair[0].max.y);
        }
    }
}
