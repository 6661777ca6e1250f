//! Welcome screen listing recent books

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};

use eframe::egui;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

use super::new_book::{NewBookDialog, NewBookOutcome};
use super::notice::Notice;
use crate::core::error::BookError;
use crate::core::recents::{RecentBook, RecentsRepository};

/// A recent book plus whether its document still exists
#[derive(Debug, Clone)]
pub struct WelcomeEntry {
    pub book: RecentBook,
    pub available: bool,
}

/// What the welcome screen asks the app to do
#[derive(Debug)]
pub enum WelcomeAction {
    Open(PathBuf),
    /// Start the editor on an empty document
    NewDocument,
    Notice(Notice),
}

#[derive(Default)]
pub struct WelcomeView {
    entries: Vec<WelcomeEntry>,
    new_book: Option<NewBookDialog>,
    /// Dropping the watcher stops the watch
    _watcher: Option<RecommendedWatcher>,
    watch_rx: Option<Receiver<notify::Result<Event>>>,
    watched_file: Option<PathBuf>,
}

impl WelcomeView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[WelcomeEntry] {
        &self.entries
    }

    /// Reload the list from the index
    pub fn refresh(&mut self, recents: &dyn RecentsRepository) {
        self.entries = recents
            .load()
            .into_iter()
            .map(|book| WelcomeEntry {
                available: book.is_available(),
                book,
            })
            .collect();
        tracing::debug!("Welcome list refreshed: {} books", self.entries.len());
    }

    /// Document to open for the entry at `index`, if it is still there
    pub fn select(&self, index: usize) -> Option<PathBuf> {
        let entry = self.entries.get(index)?;
        if entry.book.is_available() {
            Some(entry.book.html_path.clone())
        } else {
            tracing::warn!("{} no longer exists", entry.book.html_path.display());
            None
        }
    }

    /// Reload whenever the index file changes on disk
    pub fn watch(&mut self, index_file: &Path) -> notify::Result<()> {
        let Some(dir) = index_file.parent() else {
            return Ok(());
        };
        std::fs::create_dir_all(dir).map_err(notify::Error::io)?;

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |event| {
            let _ = tx.send(event);
        })?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        self.watch_rx = Some(rx);
        self._watcher = Some(watcher);
        self.watched_file = Some(index_file.to_path_buf());
        Ok(())
    }

    /// Drain watcher events, returning whether the index file was touched
    fn index_changed(&self) -> bool {
        let (Some(rx), Some(file)) = (&self.watch_rx, &self.watched_file) else {
            return false;
        };
        let mut changed = false;
        while let Ok(event) = rx.try_recv() {
            if let Ok(ev) = event {
                changed |= ev.paths.iter().any(|p| p.file_name() == file.file_name());
            }
        }
        changed
    }

    pub fn show(
        &mut self,
        ctx: &egui::Context,
        recents: &mut dyn RecentsRepository,
        interactive: bool,
    ) -> Option<WelcomeAction> {
        if self.index_changed() {
            self.refresh(recents);
        }

        let mut action = None;

        if let Some(dialog) = &mut self.new_book {
            match dialog.show(ctx, recents) {
                Some(NewBookOutcome::Created(book)) => {
                    self.new_book = None;
                    self.refresh(recents);
                    action = Some(WelcomeAction::Open(book.html_path));
                }
                Some(NewBookOutcome::Failed(e)) => {
                    let notice = match &e {
                        BookError::Validation(msg) => Notice::warning(msg.clone()),
                        _ => Notice::error(e.to_string()),
                    };
                    tracing::warn!("Book creation failed: {}", e);
                    action = Some(WelcomeAction::Notice(notice));
                }
                Some(NewBookOutcome::Cancelled) => self.new_book = None,
                None => {}
            }
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_enabled_ui(interactive && self.new_book.is_none(), |ui| {
                ui.vertical_centered(|ui| {
                    ui.add_space(40.0);
                    ui.heading("Bookwright");
                    ui.add_space(20.0);

                    ui.horizontal(|ui| {
                        if ui.button("New book...").clicked() {
                            self.new_book = Some(NewBookDialog::new());
                        }
                        if ui.button("Open...").clicked() {
                            if let Some(path) = pick_document() {
                                action = Some(WelcomeAction::Open(path));
                            }
                        }
                        if ui.button("Blank document").clicked() {
                            action = Some(WelcomeAction::NewDocument);
                        }
                        if ui.button("⟳ Refresh").clicked() {
                            self.refresh(recents);
                        }
                    });

                    ui.add_space(20.0);
                    ui.separator();
                    ui.label(egui::RichText::new("Recent books").strong());
                });

                egui::ScrollArea::vertical()
                    .id_salt("recent_books")
                    .show(ui, |ui| {
                        if self.entries.is_empty() {
                            ui.label("No recent books yet.");
                        }
                        for index in 0..self.entries.len() {
                            if let Some(a) = self.show_entry(ui, index) {
                                action = Some(a);
                            }
                        }
                    });
            });
        });

        action
    }

    fn show_entry(&self, ui: &mut egui::Ui, index: usize) -> Option<WelcomeAction> {
        let entry = &self.entries[index];
        let mut action = None;

        ui.horizontal(|ui| {
            if entry.available {
                let response = ui
                    .selectable_label(false, &entry.book.name)
                    .on_hover_text(entry.book.html_path.display().to_string());
                if response.clicked() {
                    action = self.select(index).map(WelcomeAction::Open);
                }
            } else {
                ui.add_enabled(false, egui::Label::new(&entry.book.name));
                ui.label(egui::RichText::new("(missing)").weak().italics());
            }

            ui.label(
                egui::RichText::new(entry.book.created_at.format("%Y-%m-%d").to_string()).weak(),
            );

            if entry.book.folder.is_dir() && ui.small_button("Show folder").clicked() {
                if let Err(e) = open::that(&entry.book.folder) {
                    tracing::warn!("Could not open {}: {}", entry.book.folder.display(), e);
                    action = Some(WelcomeAction::Notice(Notice::error(format!(
                        "Could not open {}: {}",
                        entry.book.folder.display(),
                        e
                    ))));
                }
            }
        });

        action
    }
}

/// Ask for an existing HTML document
pub fn pick_document() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter("HTML", &["html", "htm"])
        .pick_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::recents::MemoryRecents;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_refresh_flags_missing_books() {
        let dir = TempDir::new().unwrap();
        let present = dir.path().join("Here.html");
        fs::write(&present, "<p>x</p>").unwrap();

        let mut recents = MemoryRecents::default();
        recents.books = vec![
            RecentBook::for_document(&present),
            RecentBook::for_document(&dir.path().join("Gone.html")),
        ];

        let mut view = WelcomeView::new();
        view.refresh(&recents);

        let flags: Vec<_> = view.entries().iter().map(|e| e.available).collect();
        assert_eq!(flags, vec![true, false]);
        assert_eq!(view.entries()[0].book.name, "Here");
    }

    #[test]
    fn test_select_only_returns_existing_documents() {
        let dir = TempDir::new().unwrap();
        let present = dir.path().join("Here.html");
        fs::write(&present, "<p>x</p>").unwrap();

        let mut recents = MemoryRecents::default();
        recents.books = vec![
            RecentBook::for_document(&present),
            RecentBook::for_document(&dir.path().join("Gone.html")),
        ];
        let mut view = WelcomeView::new();
        view.refresh(&recents);

        assert_eq!(view.select(0), Some(present));
        assert_eq!(view.select(1), None);
        assert_eq!(view.select(7), None);
    }

    #[test]
    fn test_select_rechecks_the_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Soon.html");
        fs::write(&path, "<p>x</p>").unwrap();

        let mut recents = MemoryRecents::default();
        recents.books = vec![RecentBook::for_document(&path)];
        let mut view = WelcomeView::new();
        view.refresh(&recents);

        fs::remove_file(&path).unwrap();
        assert_eq!(view.select(0), None);
    }
}
