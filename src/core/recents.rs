//! Recent books index
//!
//! The index is a single JSON array, most recently used book first. It is
//! shared with older releases of the editor, which is why the on-disk keys
//! keep their original names.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use super::error::RecentsError;

/// Directory under the user's home holding the index
const INDEX_DIR: &str = "EditorA5";
/// Index file name
const INDEX_FILE: &str = "livros_recentes.json";

/// One entry of the recent books index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentBook {
    /// Display title
    #[serde(rename = "nome")]
    pub name: String,
    /// Directory holding the book
    #[serde(rename = "pasta")]
    pub folder: PathBuf,
    /// The book's HTML document
    #[serde(rename = "html")]
    pub html_path: PathBuf,
    /// Cover image, empty when the book has none
    #[serde(rename = "capa", default)]
    pub cover_path: PathBuf,
    /// Creation time (naive local time)
    #[serde(rename = "data_criacao")]
    pub created_at: NaiveDateTime,
}

impl RecentBook {
    /// Build an entry for a document that was never registered, e.g. one
    /// opened straight from disk
    pub fn for_document(html_path: &Path) -> Self {
        let name = html_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Untitled".to_string());
        let folder = html_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Self {
            name,
            folder,
            html_path: html_path.to_path_buf(),
            cover_path: PathBuf::new(),
            created_at: chrono::Local::now().naive_local(),
        }
    }

    /// Cover image path, if one was chosen
    pub fn cover(&self) -> Option<&Path> {
        if self.cover_path.as_os_str().is_empty() {
            None
        } else {
            Some(&self.cover_path)
        }
    }

    /// Whether the document still exists on disk
    pub fn is_available(&self) -> bool {
        self.html_path.is_file()
    }
}

/// Identity used to deduplicate entries on insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecentKey {
    Folder,
    HtmlPath,
}

impl RecentKey {
    /// The application's canonical identity for a book
    pub const CANONICAL: RecentKey = RecentKey::HtmlPath;

    fn same(self, a: &RecentBook, b: &RecentBook) -> bool {
        match self {
            RecentKey::Folder => a.folder == b.folder,
            RecentKey::HtmlPath => a.html_path == b.html_path,
        }
    }
}

/// Remove entries sharing `entry`'s key and put `entry` in front
pub fn insert_front(books: &mut Vec<RecentBook>, entry: RecentBook, key: RecentKey) {
    books.retain(|b| !key.same(b, &entry));
    books.insert(0, entry);
}

/// Storage for the recent books index
///
/// Every screen receives the repository by reference; nothing reopens the
/// index file on its own.
pub trait RecentsRepository {
    /// Read the index. Missing or unreadable indexes read as empty.
    fn load(&self) -> Vec<RecentBook>;

    /// Replace the whole index
    fn save(&mut self, books: &[RecentBook]) -> Result<(), RecentsError>;

    /// Insert `entry` at the front, dropping any entry with the same key
    fn touch_or_insert(&mut self, entry: RecentBook, key: RecentKey) -> Result<(), RecentsError> {
        let mut books = self.load();
        insert_front(&mut books, entry, key);
        self.save(&books)
    }

    /// Move the entry for `html_path` to the front. Returns `false` without
    /// writing anything when the path is not in the index.
    fn promote(&mut self, html_path: &Path) -> Result<bool, RecentsError> {
        let mut books = self.load();
        let Some(pos) = books.iter().position(|b| b.html_path == html_path) else {
            return Ok(false);
        };
        if pos > 0 {
            let entry = books.remove(pos);
            books.insert(0, entry);
            self.save(&books)?;
        }
        Ok(true)
    }

    /// Look up the entry for a document
    fn find_by_html(&self, html_path: &Path) -> Option<RecentBook> {
        self.load().into_iter().find(|b| b.html_path == html_path)
    }
}

/// Recent books index stored as a JSON file
#[derive(Debug, Clone)]
pub struct JsonRecentsStore {
    path: PathBuf,
}

impl JsonRecentsStore {
    /// Store backed by the given file
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// The per-user default location
    pub fn default_path() -> Option<PathBuf> {
        BaseDirs::new().map(|dirs| dirs.home_dir().join(INDEX_DIR).join(INDEX_FILE))
    }

    /// Location of the index file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(content: &str) -> Vec<RecentBook> {
        let entries: Vec<serde_json::Value> = match serde_json::from_str(content) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Recent books index is malformed, treating it as empty: {}", e);
                return Vec::new();
            }
        };

        entries
            .into_iter()
            .enumerate()
            .filter_map(|(idx, value)| match serde_json::from_value(value) {
                Ok(book) => Some(book),
                Err(e) => {
                    tracing::warn!("Skipping recent book #{}: {}", idx, e);
                    None
                }
            })
            .collect()
    }
}

impl RecentsRepository for JsonRecentsStore {
    fn load(&self) -> Vec<RecentBook> {
        if !self.path.exists() {
            return Vec::new();
        }

        match fs::read_to_string(&self.path) {
            Ok(content) => Self::parse(&content),
            Err(e) => {
                tracing::warn!("Could not read {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    fn save(&mut self, books: &[RecentBook]) -> Result<(), RecentsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| RecentsError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        books.serialize(&mut ser)?;

        fs::write(&self.path, buf).map_err(|source| RecentsError::Io {
            path: self.path.clone(),
            source,
        })?;

        tracing::info!("Saved {} recent books to: {}", books.len(), self.path.display());
        Ok(())
    }
}

/// In-memory index for tests
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryRecents {
    pub books: Vec<RecentBook>,
    pub saves: usize,
}

#[cfg(test)]
impl RecentsRepository for MemoryRecents {
    fn load(&self) -> Vec<RecentBook> {
        self.books.clone()
    }

    fn save(&mut self, books: &[RecentBook]) -> Result<(), RecentsError> {
        self.books = books.to_vec();
        self.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn book(name: &str, folder: &str) -> RecentBook {
        let folder = PathBuf::from(folder);
        RecentBook {
            name: name.to_string(),
            html_path: folder.join(format!("{}.html", name)),
            folder,
            cover_path: PathBuf::new(),
            created_at: chrono::Local::now().naive_local(),
        }
    }

    #[test]
    fn test_missing_index_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonRecentsStore::new(dir.path().join("nope.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_malformed_index_loads_empty_and_can_be_overwritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("recents.json");
        fs::write(&path, "{ not json").unwrap();

        let mut store = JsonRecentsStore::new(path);
        assert!(store.load().is_empty());

        store
            .touch_or_insert(book("A", "/books/A"), RecentKey::Folder)
            .unwrap();
        assert_eq!(store.load().len(), 1);
    }

    #[test]
    fn test_entries_missing_keys_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("recents.json");
        fs::write(
            &path,
            r#"[
                {"nome": "Ok", "pasta": "/b/Ok", "html": "/b/Ok/Ok.html", "data_criacao": "2024-05-01T10:20:30.123456"},
                {"nome": "Broken", "pasta": "/b/Broken"}
            ]"#,
        )
        .unwrap();

        let books = JsonRecentsStore::new(path).load();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].name, "Ok");
        assert!(books[0].cover().is_none());
    }

    #[test]
    fn test_touch_same_folder_keeps_one_entry() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonRecentsStore::new(dir.path().join("sub").join("recents.json"));

        store
            .touch_or_insert(book("Other", "/books/Other"), RecentKey::Folder)
            .unwrap();
        store
            .touch_or_insert(book("First", "/books/Same"), RecentKey::Folder)
            .unwrap();
        store
            .touch_or_insert(book("Second", "/books/Same"), RecentKey::Folder)
            .unwrap();

        let books = store.load();
        let same: Vec<_> = books
            .iter()
            .filter(|b| b.folder == Path::new("/books/Same"))
            .collect();
        assert_eq!(same.len(), 1);
        assert_eq!(books[0].name, "Second");
        assert_eq!(books.len(), 2);
    }

    #[test]
    fn test_index_uses_legacy_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("recents.json");
        let mut store = JsonRecentsStore::new(path.clone());
        store.save(&[book("Livro", "/books/Livro")]).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        for key in ["\"nome\"", "\"pasta\"", "\"html\"", "\"capa\"", "\"data_criacao\""] {
            assert!(raw.contains(key), "missing {key} in {raw}");
        }
        assert!(raw.contains("\n    {"));
    }

    #[test]
    fn test_promote_moves_existing_entry() {
        let mut repo = MemoryRecents::default();
        repo.books = vec![book("A", "/a"), book("B", "/b")];

        assert!(repo.promote(Path::new("/b/B.html")).unwrap());
        assert_eq!(repo.books[0].name, "B");

        let saves = repo.saves;
        assert!(!repo.promote(Path::new("/c/C.html")).unwrap());
        assert_eq!(repo.saves, saves);
    }

    #[test]
    fn test_for_document_uses_file_stem() {
        let entry = RecentBook::for_document(Path::new("/tmp/notes/draft.html"));
        assert_eq!(entry.name, "draft");
        assert_eq!(entry.folder, PathBuf::from("/tmp/notes"));
    }
}
