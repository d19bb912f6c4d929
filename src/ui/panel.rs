//! Debug panel drawn from a [`PanelModel`]
//!
//! The panel never touches the scene. It only reports what the user changed as
//! [`ParamEdit`]s, which the sandbox applies through the parameter registry.

use crate::config::PanelConfig;
use crate::params::{PanelEntry, PanelModel, ParamEdit, ParamKind, ParamValue};

/// Draws one frame of the panel and returns the edits made in it
pub fn draw_panel(ui: &imgui::Ui, model: &PanelModel, config: &PanelConfig) -> Vec<ParamEdit> {
    let display_size = ui.io().display_size;
    if display_size[0] <= 0.0 || display_size[1] <= 0.0 {
        return Vec::new();
    }

    let mut edits = Vec::new();
    let header_flags = if config.start_collapsed {
        imgui::TreeNodeFlags::empty()
    } else {
        imgui::TreeNodeFlags::DEFAULT_OPEN
    };
    let width = config.width.min(display_size[0]);

    ui.window(&model.title)
        .size([width, 0.0], imgui::Condition::FirstUseEver)
        .position(
            [display_size[0] - width - 10.0, 10.0],
            imgui::Condition::FirstUseEver,
        )
        .always_auto_resize(true)
        .build(|| {
            for folder in model.folders() {
                if !ui.collapsing_header(folder, header_flags) {
                    continue;
                }
                for entry in model.entries.iter().filter(|entry| entry.folder == folder) {
                    if let Some(edit) = draw_entry(ui, entry) {
                        edits.push(edit);
                    }
                }
            }
        });

    edits
}

fn draw_entry(ui: &imgui::Ui, entry: &PanelEntry) -> Option<ParamEdit> {
    let id = format!("{}##{}", entry.label, entry.index);
    let index = entry.index;

    match (&entry.kind, entry.value) {
        (ParamKind::Action, _) => ui.button(&id).then_some(ParamEdit::Trigger { index }),
        (ParamKind::Scalar(constraint), Some(ParamValue::Scalar(mut value))) => {
            let changed = match constraint.step {
                Some(step) => imgui::Drag::new(&id)
                    .range(constraint.min, constraint.max)
                    .speed(step)
                    .build(ui, &mut value),
                None => ui.slider(&id, constraint.min, constraint.max, &mut value),
            };
            changed.then_some(ParamEdit::Set {
                index,
                value: ParamValue::Scalar(value),
            })
        }
        (ParamKind::Color, Some(ParamValue::Color(mut color))) => {
            ui.color_edit3(&id, &mut color)
                .then_some(ParamEdit::Set {
                    index,
                    value: ParamValue::Color(color),
                })
        }
        (ParamKind::Vector2([x_range, y_range]), Some(ParamValue::Vector2(mut pair))) => {
            ui.text(entry.label);
            let x_changed = ui.slider(
                format!("x##{}", entry.index),
                x_range.min,
                x_range.max,
                &mut pair[0],
            );
            let y_changed = ui.slider(
                format!("y##{}", entry.index),
                y_range.min,
                y_range.max,
                &mut pair[1],
            );
            (x_changed || y_changed).then_some(ParamEdit::Set {
                index,
                value: ParamValue::Vector2(pair),
            })
        }
        (ParamKind::Choice(options), Some(ParamValue::Choice(mut selected))) => ui
            .combo_simple_string(&id, &mut selected, options.as_slice())
            .then_some(ParamEdit::Set {
                index,
                value: ParamValue::Choice(selected),
            }),
        _ => {
            ui.text_disabled(format!("{} (unavailable)", entry.label));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Constraint;

    #[test]
    fn test_untouched_panel_reports_no_edits() {
        let mut context = imgui::Context::create();
        context.set_ini_filename(None);
        context.io_mut().display_size = [800.0, 600.0];
        context.fonts().build_rgba32_texture();

        let model = PanelModel {
            title: "Debug".to_string(),
            entries: vec![
                PanelEntry {
                    index: 0,
                    folder: "Cube",
                    label: "posY",
                    kind: ParamKind::Scalar(Constraint::stepped(-3.0, 3.0, 0.01)),
                    value: Some(ParamValue::Scalar(0.0)),
                },
                PanelEntry {
                    index: 1,
                    folder: "Cube",
                    label: "spin",
                    kind: ParamKind::Action,
                    value: None,
                },
            ],
        };
        let config = PanelConfig {
            start_collapsed: false,
            ..Default::default()
        };

        let ui = context.new_frame();
        let edits = draw_panel(ui, &model, &config);
        context.render();
        assert!(edits.is_empty());
    }
}
