//! Modal notices and the unsaved-changes prompt

use eframe::egui;

use crate::core::session::LeaveChoice;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Warning,
    Error,
}

/// A message shown in a centred window until dismissed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }

    fn title(&self) -> &'static str {
        match self.kind {
            NoticeKind::Warning => "Warning",
            NoticeKind::Error => "Error",
        }
    }
}

/// Show the pending notice, clearing it once OK is clicked
pub fn show_notice(ctx: &egui::Context, notice: &mut Option<Notice>) {
    let Some(current) = notice.as_ref() else {
        return;
    };

    let mut dismissed = false;
    egui::Window::new(current.title())
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.label(egui::RichText::new("⚠").size(24.0));
            ui.label(&current.message);
            ui.separator();
            if ui.button("OK").clicked() {
                dismissed = true;
            }
        });

    if dismissed {
        *notice = None;
    }
}

/// Ask whether to save `name` before leaving it
pub fn unsaved_prompt(ctx: &egui::Context, name: &str) -> Option<LeaveChoice> {
    let mut choice = None;
    egui::Window::new("Unsaved Changes")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.label(format!("\"{}\" has unsaved changes. Save them?", name));
            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Save").clicked() {
                    choice = Some(LeaveChoice::Save);
                }
                if ui.button("Discard").clicked() {
                    choice = Some(LeaveChoice::Discard);
                }
                if ui.button("Cancel").clicked() {
                    choice = Some(LeaveChoice::Cancel);
                }
            });
        });
    choice
}
