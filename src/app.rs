//! Main application state and screen coordination

use std::path::PathBuf;

use eframe::egui;

use crate::core::config::AppConfig;
use crate::core::recents::JsonRecentsStore;
use crate::core::session::{EditorSession, LeaveAction, LeaveChoice, LeaveOutcome};
use crate::ui::editor::{pick_save_path, EditorAction, EditorView};
use crate::ui::notice::{self, Notice};
use crate::ui::welcome::{pick_document, WelcomeAction, WelcomeView};

/// Screen shown at launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartScreen {
    Welcome,
    /// The editor, on the given document or an empty one
    Editor(Option<PathBuf>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Welcome,
    Editor,
}

/// Main application state
pub struct BookwrightApp {
    /// Application configuration
    config: AppConfig,
    /// Recent books index shared by both screens
    recents: JsonRecentsStore,
    screen: Screen,
    welcome: WelcomeView,
    editor: EditorView,
    /// The document open in the editor
    session: EditorSession,
    /// Modal message waiting for OK
    notice: Option<Notice>,
    /// Set once closing has been confirmed, so the next close request goes through
    allow_close: bool,
}

impl BookwrightApp {
    /// Create a new application instance
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig, start: StartScreen) -> Self {
        egui_extras::install_image_loaders(&cc.egui_ctx);
        cc.egui_ctx.set_visuals(if config.ui.dark_mode {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        });

        let recents_path = config.recents_path().unwrap_or_else(|e| {
            tracing::warn!("{}, keeping recent books in the working directory", e);
            PathBuf::from("livros_recentes.json")
        });
        tracing::info!("Recent books index: {}", recents_path.display());
        let recents = JsonRecentsStore::new(recents_path);

        let mut welcome = WelcomeView::new();
        welcome.refresh(&recents);
        if let Err(e) = welcome.watch(recents.path()) {
            tracing::warn!("Not watching the recent books index: {}", e);
        }

        let session = EditorSession::new(config.default_char_style(), config.editor.undo_depth);

        let mut app = Self {
            config,
            recents,
            screen: Screen::Welcome,
            welcome,
            editor: EditorView::new(),
            session,
            notice: None,
            allow_close: false,
        };

        if let StartScreen::Editor(path) = start {
            app.open_editor(path);
        }
        app
    }

    /// Switch to the editor on `path`, or on an empty document when the path
    /// is missing or does not exist
    fn open_editor(&mut self, path: Option<PathBuf>) {
        self.editor.reset();
        match path.filter(|p| p.exists()) {
            Some(path) => match self.session.load(&path, &mut self.recents) {
                Ok(()) => self.screen = Screen::Editor,
                Err(e) => {
                    tracing::error!("Failed to open document: {}", e);
                    self.notice = Some(Notice::error(e.to_string()));
                }
            },
            None => {
                self.session.new_document();
                self.screen = Screen::Editor;
            }
        }
    }

    fn go_home(&mut self) {
        tracing::debug!("Back to the welcome screen");
        self.screen = Screen::Welcome;
        self.welcome.refresh(&self.recents);
    }

    /// Carry out an action that leaves the current document
    fn perform(&mut self, ctx: &egui::Context, action: LeaveAction) {
        match action {
            LeaveAction::Home => self.go_home(),
            LeaveAction::CloseWindow => {
                self.allow_close = true;
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
            LeaveAction::NewDocument => {
                self.editor.reset();
                self.session.new_document();
            }
            LeaveAction::OpenDocument => {
                if let Some(path) = pick_document() {
                    self.open_editor(Some(path));
                }
            }
        }
    }

    fn request_leave(&mut self, ctx: &egui::Context, action: LeaveAction) {
        if let Some(action) = self.session.request_leave(action) {
            self.perform(ctx, action);
        }
    }

    /// Intercept window close while the document has unsaved changes
    fn handle_close_request(&mut self, ctx: &egui::Context) {
        if !ctx.input(|i| i.viewport().close_requested()) || self.allow_close {
            return;
        }
        if self.screen == Screen::Editor && self.session.is_dirty() {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.session.request_leave(LeaveAction::CloseWindow);
        }
    }

    fn show_unsaved_prompt(&mut self, ctx: &egui::Context) {
        if self.session.pending_leave().is_none() {
            return;
        }
        let Some(choice) = notice::unsaved_prompt(ctx, &self.session.display_name()) else {
            return;
        };

        let outcome = if choice == LeaveChoice::Save && self.session.path().is_none() {
            match pick_save_path(&self.session) {
                Some(path) => self.session.resolve_leave_saving_to(&path, &mut self.recents),
                None => self.session.resolve_leave(LeaveChoice::Cancel, &mut self.recents),
            }
        } else {
            self.session.resolve_leave(choice, &mut self.recents)
        };

        match outcome {
            LeaveOutcome::Proceed(action) => self.perform(ctx, action),
            LeaveOutcome::Stay => {}
            LeaveOutcome::Failed(e) => {
                tracing::error!("Failed to save document: {}", e);
                self.notice = Some(Notice::error(e.to_string()));
            }
        }
    }

    fn window_title(&self) -> String {
        match self.screen {
            Screen::Welcome => "Bookwright".to_string(),
            Screen::Editor => {
                let marker = if self.session.is_dirty() { "*" } else { "" };
                format!("{}{} - Bookwright", self.session.display_name(), marker)
            }
        }
    }
}

impl eframe::App for BookwrightApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_close_request(ctx);
        ctx.send_viewport_cmd(egui::ViewportCommand::Title(self.window_title()));

        let interactive = self.notice.is_none() && self.session.pending_leave().is_none();

        match self.screen {
            Screen::Welcome => {
                match self.welcome.show(ctx, &mut self.recents, interactive) {
                    Some(WelcomeAction::Open(path)) => self.open_editor(Some(path)),
                    Some(WelcomeAction::NewDocument) => self.open_editor(None),
                    Some(WelcomeAction::Notice(n)) => self.notice = Some(n),
                    None => {}
                }
            }
            Screen::Editor => {
                match self
                    .editor
                    .show(ctx, &mut self.session, &mut self.recents, interactive)
                {
                    Some(EditorAction::Leave(action)) => self.request_leave(ctx, action),
                    Some(EditorAction::Notice(n)) => self.notice = Some(n),
                    None => {}
                }
            }
        }

        self.show_unsaved_prompt(ctx);
        notice::show_notice(ctx, &mut self.notice);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        tracing::info!("Bookwright exiting");
    }
}
