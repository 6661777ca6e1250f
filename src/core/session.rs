//! Editing session for one HTML document

use std::fs;
use std::path::{Path, PathBuf};

use super::error::SessionError;
use super::history::{EditKind, History};
use super::recents::{RecentBook, RecentKey, RecentsRepository};
use crate::document::html;
use crate::document::{CharStyle, RichDocument};

/// Lifecycle of the document in the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    /// Nothing loaded yet
    Unloaded,
    /// Matches what is on disk (or a fresh untitled document)
    Clean,
    /// Has edits that were not saved
    Dirty,
}

/// Something that replaces or closes the current document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveAction {
    Home,
    CloseWindow,
    NewDocument,
    OpenDocument,
}

/// Answer to the "save changes?" prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveChoice {
    Save,
    Discard,
    Cancel,
}

#[derive(Debug)]
pub enum LeaveOutcome {
    /// Go ahead with the action
    Proceed(LeaveAction),
    /// Stay on the document
    Stay,
    /// Saving failed, stay on the document
    Failed(SessionError),
}

/// A document open in the editor
pub struct EditorSession {
    path: Option<PathBuf>,
    /// Document content
    pub document: RichDocument,
    state: EditorState,
    history: History,
    default_style: CharStyle,
    pending_leave: Option<LeaveAction>,
}

impl EditorSession {
    pub fn new(default_style: CharStyle, undo_depth: usize) -> Self {
        Self {
            path: None,
            document: RichDocument::blank("", default_style.clone()),
            state: EditorState::Unloaded,
            history: History::new(undo_depth),
            default_style,
            pending_leave: None,
        }
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.state == EditorState::Dirty
    }

    /// File the document is saved to
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn default_style(&self) -> &CharStyle {
        &self.default_style
    }

    /// Name shown in the window title
    pub fn display_name(&self) -> String {
        self.path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Untitled".to_string())
    }

    /// Read `path` and replace the current document with it
    pub fn load(
        &mut self,
        path: &Path,
        recents: &mut dyn RecentsRepository,
    ) -> Result<(), SessionError> {
        let content = fs::read_to_string(path).map_err(|source| SessionError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        let mut document = html::from_html(&content).map_err(|source| SessionError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        document.ensure_editable(&self.default_style);

        self.document = document;
        self.path = Some(path.to_path_buf());
        self.state = EditorState::Clean;
        self.history.clear();

        if let Err(e) = recents.promote(path) {
            tracing::warn!("Could not update recent books: {}", e);
        }
        tracing::info!("Loaded document: {}", path.display());
        Ok(())
    }

    /// Start an empty untitled document
    pub fn new_document(&mut self) {
        self.document = RichDocument::blank("", self.default_style.clone());
        self.path = None;
        self.state = EditorState::Clean;
        self.history.clear();
    }

    /// Run `edit` on the document. When it reports a change the previous
    /// content goes on the undo stack and the session becomes dirty.
    pub fn edit(&mut self, kind: EditKind, edit: impl FnOnce(&mut RichDocument) -> bool) -> bool {
        let before = self.document.clone();
        let changed = edit(&mut self.document);
        if changed {
            self.history.record(&before, kind);
            self.mark_dirty();
        }
        changed
    }

    pub fn mark_dirty(&mut self) {
        self.state = EditorState::Dirty;
    }

    pub fn undo(&mut self) -> bool {
        let undone = self.history.undo(&mut self.document);
        if undone {
            self.mark_dirty();
        }
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.history.redo(&mut self.document);
        if redone {
            self.mark_dirty();
        }
        redone
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Save to the bound path
    pub fn save(&mut self, recents: &mut dyn RecentsRepository) -> Result<PathBuf, SessionError> {
        let path = self.path.clone().ok_or(SessionError::NoPath)?;
        self.save_to(&path, recents)?;
        Ok(path)
    }

    /// Write the document to `path` and make it the bound path. Relative
    /// image sources are rewritten when `path` is in another folder.
    pub fn save_to(
        &mut self,
        path: &Path,
        recents: &mut dyn RecentsRepository,
    ) -> Result<(), SessionError> {
        let mut document = self.document.clone();
        if document.title.is_empty() {
            if let Some(stem) = path.file_stem() {
                document.title = stem.to_string_lossy().to_string();
            }
        }
        let old_dir = self.path.as_deref().and_then(Path::parent);
        if let (Some(from), Some(to)) = (old_dir, path.parent()) {
            if document.rebase_images(from, to) {
                tracing::debug!(
                    "Rebased image sources from {} to {}",
                    from.display(),
                    to.display()
                );
            }
        }

        let content = html::to_html(&document);
        fs::write(path, content).map_err(|source| SessionError::Save {
            path: path.to_path_buf(),
            source,
        })?;

        self.document = document;
        self.path = Some(path.to_path_buf());
        self.state = EditorState::Clean;
        tracing::info!("Saved document: {}", path.display());

        let entry = recents
            .find_by_html(path)
            .unwrap_or_else(|| RecentBook::for_document(path));
        if let Err(e) = recents.touch_or_insert(entry, RecentKey::HtmlPath) {
            tracing::warn!("Could not update recent books: {}", e);
        }
        Ok(())
    }

    /// Ask to leave the document. Returns the action right away when there
    /// is nothing to lose; otherwise remembers it until the prompt is
    /// answered through [`EditorSession::resolve_leave`].
    pub fn request_leave(&mut self, action: LeaveAction) -> Option<LeaveAction> {
        if self.is_dirty() {
            self.pending_leave = Some(action);
            None
        } else {
            Some(action)
        }
    }

    /// The action waiting on the unsaved-changes prompt
    pub fn pending_leave(&self) -> Option<&LeaveAction> {
        self.pending_leave.as_ref()
    }

    /// Answer the unsaved-changes prompt
    pub fn resolve_leave(
        &mut self,
        choice: LeaveChoice,
        recents: &mut dyn RecentsRepository,
    ) -> LeaveOutcome {
        self.finish_leave(choice, None, recents)
    }

    /// Answer "save" for a document with no bound path by writing it to
    /// `path`. The path is only bound once the write succeeds.
    pub fn resolve_leave_saving_to(
        &mut self,
        path: &Path,
        recents: &mut dyn RecentsRepository,
    ) -> LeaveOutcome {
        self.finish_leave(LeaveChoice::Save, Some(path), recents)
    }

    fn finish_leave(
        &mut self,
        choice: LeaveChoice,
        target: Option<&Path>,
        recents: &mut dyn RecentsRepository,
    ) -> LeaveOutcome {
        let Some(action) = self.pending_leave.take() else {
            return LeaveOutcome::Stay;
        };

        match choice {
            LeaveChoice::Cancel => LeaveOutcome::Stay,
            LeaveChoice::Discard => LeaveOutcome::Proceed(action),
            LeaveChoice::Save => {
                let saved = match target {
                    Some(path) => self.save_to(path, recents),
                    None => self.save(recents).map(|_| ()),
                };
                match saved {
                    Ok(()) => LeaveOutcome::Proceed(action),
                    Err(e) => LeaveOutcome::Failed(e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::book::scaffold_html;
    use crate::core::recents::MemoryRecents;
    use crate::document::{resolve_src, Block, ImageBlock, TextBlock};
    use tempfile::TempDir;

    fn session() -> EditorSession {
        EditorSession::new(CharStyle::default(), 50)
    }

    fn write_book(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("Book.html");
        fs::write(&path, scaffold_html("Book")).unwrap();
        path
    }

    fn type_text(session: &mut EditorSession, text: &str) {
        session.edit(EditKind::Typing, |doc| {
            doc.blocks
                .push(Block::Text(TextBlock::paragraph(text, CharStyle::default())));
            true
        });
    }

    #[test]
    fn test_load_marks_clean() {
        let dir = TempDir::new().unwrap();
        let path = write_book(&dir);
        let mut recents = MemoryRecents::default();
        let mut session = session();
        assert_eq!(session.state(), EditorState::Unloaded);

        session.load(&path, &mut recents).unwrap();

        assert_eq!(session.state(), EditorState::Clean);
        assert_eq!(session.path(), Some(path.as_path()));
        assert_eq!(session.document.plain_text(), "Book\nYour book starts here...");
    }

    #[test]
    fn test_load_missing_file_keeps_session() {
        let dir = TempDir::new().unwrap();
        let mut session = session();
        let err = session
            .load(&dir.path().join("missing.html"), &mut MemoryRecents::default())
            .unwrap_err();

        assert!(matches!(err, SessionError::Load { .. }));
        assert_eq!(session.state(), EditorState::Unloaded);
        assert!(session.path().is_none());
    }

    #[test]
    fn test_load_then_save_is_equivalent() {
        let dir = TempDir::new().unwrap();
        let path = write_book(&dir);
        let mut recents = MemoryRecents::default();
        let mut session = session();
        session.load(&path, &mut recents).unwrap();
        let before = session.document.clone();

        session.save(&mut recents).unwrap();

        let reloaded = html::from_html(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reloaded, before);
        assert_eq!(recents.books[0].html_path, path);
    }

    #[test]
    fn test_save_keeps_existing_recent_entry() {
        let dir = TempDir::new().unwrap();
        let path = write_book(&dir);
        let mut recents = MemoryRecents::default();
        let mut entry = RecentBook::for_document(&path);
        entry.name = "My Novel".to_string();
        entry.cover_path = PathBuf::from("/covers/novel.png");
        recents.books = vec![RecentBook::for_document(&dir.path().join("Other.html")), entry];

        let mut session = session();
        session.load(&path, &mut recents).unwrap();
        type_text(&mut session, "more");
        session.save(&mut recents).unwrap();

        assert_eq!(recents.books.len(), 2);
        assert_eq!(recents.books[0].name, "My Novel");
        assert_eq!(recents.books[0].cover(), Some(Path::new("/covers/novel.png")));
    }

    #[test]
    fn test_cancel_leaves_dirty_and_disk_untouched() {
        let dir = TempDir::new().unwrap();
        let path = write_book(&dir);
        let on_disk = fs::read_to_string(&path).unwrap();
        let mut recents = MemoryRecents::default();
        let mut session = session();
        session.load(&path, &mut recents).unwrap();
        type_text(&mut session, "unsaved");

        assert!(session.request_leave(LeaveAction::CloseWindow).is_none());
        let outcome = session.resolve_leave(LeaveChoice::Cancel, &mut recents);

        assert!(matches!(outcome, LeaveOutcome::Stay));
        assert_eq!(session.state(), EditorState::Dirty);
        assert!(session.pending_leave().is_none());
        assert_eq!(fs::read_to_string(&path).unwrap(), on_disk);
    }

    #[test]
    fn test_save_choice_writes_and_proceeds() {
        let dir = TempDir::new().unwrap();
        let path = write_book(&dir);
        let mut recents = MemoryRecents::default();
        let mut session = session();
        session.load(&path, &mut recents).unwrap();
        type_text(&mut session, "kept");

        session.request_leave(LeaveAction::Home);
        let outcome = session.resolve_leave(LeaveChoice::Save, &mut recents);

        assert!(matches!(outcome, LeaveOutcome::Proceed(LeaveAction::Home)));
        assert_eq!(session.state(), EditorState::Clean);
        assert!(fs::read_to_string(&path).unwrap().contains("kept"));
        assert_eq!(recents.books[0].html_path, path);
    }

    #[test]
    fn test_discard_proceeds_without_writing() {
        let dir = TempDir::new().unwrap();
        let path = write_book(&dir);
        let on_disk = fs::read_to_string(&path).unwrap();
        let mut recents = MemoryRecents::default();
        let mut session = session();
        session.load(&path, &mut recents).unwrap();
        type_text(&mut session, "dropped");

        session.request_leave(LeaveAction::NewDocument);
        let outcome = session.resolve_leave(LeaveChoice::Discard, &mut recents);

        assert!(matches!(outcome, LeaveOutcome::Proceed(LeaveAction::NewDocument)));
        assert_eq!(fs::read_to_string(&path).unwrap(), on_disk);
    }

    #[test]
    fn test_clean_session_leaves_immediately() {
        let mut session = session();
        session.new_document();
        assert_eq!(
            session.request_leave(LeaveAction::Home),
            Some(LeaveAction::Home)
        );
    }

    #[test]
    fn test_save_untitled_needs_a_path() {
        let mut session = session();
        session.new_document();
        type_text(&mut session, "draft");

        session.request_leave(LeaveAction::CloseWindow);
        let outcome = session.resolve_leave(LeaveChoice::Save, &mut MemoryRecents::default());

        assert!(matches!(outcome, LeaveOutcome::Failed(SessionError::NoPath)));
        assert!(session.is_dirty());
    }

    #[test]
    fn test_save_to_unwritable_path_stays_dirty() {
        let dir = TempDir::new().unwrap();
        let mut session = session();
        session.new_document();
        type_text(&mut session, "draft");

        let err = session
            .save_to(&dir.path().join("no").join("such.html"), &mut MemoryRecents::default())
            .unwrap_err();

        assert!(matches!(err, SessionError::Save { .. }));
        assert!(session.is_dirty());
        assert!(session.path().is_none());
    }

    #[test]
    fn test_unchanged_edit_stays_clean() {
        let mut session = session();
        session.new_document();
        assert!(!session.edit(EditKind::Structure, |_| false));
        assert_eq!(session.state(), EditorState::Clean);
        assert!(!session.can_undo());
    }

    #[test]
    fn test_undo_restores_previous_document() {
        let mut session = session();
        session.new_document();
        let before = session.document.clone();
        type_text(&mut session, "oops");

        assert!(session.undo());
        assert_eq!(session.document, before);
        assert!(session.is_dirty());
        assert!(session.redo());
        assert!(session.document.plain_text().ends_with("oops"));
    }

    #[test]
    fn test_save_to_other_folder_keeps_images_reachable() {
        let dir = TempDir::new().unwrap();
        let book_dir = dir.path().join("Novel");
        fs::create_dir_all(book_dir.join("img")).unwrap();
        fs::write(book_dir.join("img").join("c.png"), b"png").unwrap();
        let path = book_dir.join("Novel.html");
        fs::write(&path, scaffold_html("Novel")).unwrap();

        let mut recents = MemoryRecents::default();
        let mut session = session();
        session.load(&path, &mut recents).unwrap();
        session.edit(EditKind::Structure, |doc| {
            doc.blocks.push(Block::Image(ImageBlock::new("img/c.png", None, None)));
            true
        });

        let elsewhere = dir.path().join("elsewhere");
        fs::create_dir_all(&elsewhere).unwrap();
        let copy = elsewhere.join("copy.html");
        session.save_to(&copy, &mut recents).unwrap();

        let saved = html::from_html(&fs::read_to_string(&copy).unwrap()).unwrap();
        let src = saved
            .blocks
            .iter()
            .find_map(|b| match b {
                Block::Image(image) => Some(image.src.clone()),
                Block::Text(_) => None,
            })
            .unwrap();
        assert!(resolve_src(&src, Some(&elsewhere)).exists());
        assert_eq!(session.path(), Some(copy.as_path()));
    }

    #[test]
    fn test_save_in_same_folder_keeps_relative_images() {
        let dir = TempDir::new().unwrap();
        let path = write_book(&dir);
        let mut recents = MemoryRecents::default();
        let mut session = session();
        session.load(&path, &mut recents).unwrap();
        session.edit(EditKind::Structure, |doc| {
            doc.blocks.push(Block::Image(ImageBlock::new("img/c.png", None, None)));
            true
        });

        session
            .save_to(&dir.path().join("Second.html"), &mut recents)
            .unwrap();

        assert!(fs::read_to_string(dir.path().join("Second.html"))
            .unwrap()
            .contains("src=\"img/c.png\""));
    }

    #[test]
    fn test_failed_save_as_on_leave_binds_nothing() {
        let dir = TempDir::new().unwrap();
        let mut recents = MemoryRecents::default();
        let mut session = session();
        session.new_document();
        type_text(&mut session, "draft");

        session.request_leave(LeaveAction::CloseWindow);
        let target = dir.path().join("no").join("such.html");
        let outcome = session.resolve_leave_saving_to(&target, &mut recents);

        assert!(matches!(outcome, LeaveOutcome::Failed(SessionError::Save { .. })));
        assert!(session.path().is_none());
        assert!(session.is_dirty());
        assert!(recents.books.is_empty());
    }

    #[test]
    fn test_save_as_on_leave_writes_and_proceeds() {
        let dir = TempDir::new().unwrap();
        let mut recents = MemoryRecents::default();
        let mut session = session();
        session.new_document();
        type_text(&mut session, "draft");

        session.request_leave(LeaveAction::Home);
        let target = dir.path().join("Draft.html");
        let outcome = session.resolve_leave_saving_to(&target, &mut recents);

        assert!(matches!(outcome, LeaveOutcome::Proceed(LeaveAction::Home)));
        assert_eq!(session.path(), Some(target.as_path()));
        assert!(fs::read_to_string(&target).unwrap().contains("draft"));
    }
}
