use crate::{KeywordCount, Link, Page, PageId, TermId};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Which half of a page a keyword or position row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Body,
}

impl Field {
    pub const ALL: [Field; 2] = [Field::Title, Field::Body];

    fn insert_keyword_sql(self) -> &'static str {
        match self {
            Field::Title => "INSERT INTO title_keywords (page_url, term_id, frequency) VALUES (?1, ?2, ?3)
                             ON CONFLICT(page_url, term_id) DO NOTHING",
            Field::Body => "INSERT INTO body_keywords (page_url, term_id, frequency) VALUES (?1, ?2, ?3)
                            ON CONFLICT(page_url, term_id) DO NOTHING",
        }
    }

    fn insert_position_sql(self) -> &'static str {
        match self {
            Field::Title => "INSERT INTO title_positions (page_url, term_id, position) VALUES (?1, ?2, ?3)
                             ON CONFLICT(page_url, term_id, position) DO NOTHING",
            Field::Body => "INSERT INTO body_positions (page_url, term_id, position) VALUES (?1, ?2, ?3)
                            ON CONFLICT(page_url, term_id, position) DO NOTHING",
        }
    }

    fn select_positions_sql(self) -> &'static str {
        match self {
            Field::Title => "SELECT position FROM title_positions WHERE page_url = ?1 AND term_id = ?2 ORDER BY position",
            Field::Body => "SELECT position FROM body_positions WHERE page_url = ?1 AND term_id = ?2 ORDER BY position",
        }
    }

    fn select_frequency_sql(self) -> &'static str {
        match self {
            Field::Title => "SELECT frequency FROM title_keywords WHERE page_url = ?1 AND term_id = ?2",
            Field::Body => "SELECT frequency FROM body_keywords WHERE page_url = ?1 AND term_id = ?2",
        }
    }
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    last_modified TEXT NOT NULL,
    size INTEGER NOT NULL
);

-- no uniqueness: the same edge may be discovered more than once
CREATE TABLE IF NOT EXISTS links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    parent_url TEXT NOT NULL,
    child_url TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_links_parent ON links(parent_url);
CREATE INDEX IF NOT EXISTS idx_links_child ON links(child_url);

CREATE TABLE IF NOT EXISTS terms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    token TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS title_keywords (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_url TEXT NOT NULL,
    term_id INTEGER NOT NULL REFERENCES terms(id),
    frequency INTEGER NOT NULL,
    UNIQUE(page_url, term_id)
);

CREATE TABLE IF NOT EXISTS body_keywords (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_url TEXT NOT NULL,
    term_id INTEGER NOT NULL REFERENCES terms(id),
    frequency INTEGER NOT NULL,
    UNIQUE(page_url, term_id)
);
CREATE INDEX IF NOT EXISTS idx_body_keywords_freq ON body_keywords(page_url, frequency);

CREATE TABLE IF NOT EXISTS title_positions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_url TEXT NOT NULL,
    term_id INTEGER NOT NULL REFERENCES terms(id),
    position INTEGER NOT NULL,
    UNIQUE(page_url, term_id, position)
);

CREATE TABLE IF NOT EXISTS body_positions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_url TEXT NOT NULL,
    term_id INTEGER NOT NULL REFERENCES terms(id),
    position INTEGER NOT NULL,
    UNIQUE(page_url, term_id, position)
);
"#;

const TABLES: [&str; 7] = [
    "pages",
    "links",
    "terms",
    "title_keywords",
    "body_keywords",
    "title_positions",
    "body_positions",
];

/// SQLite-backed corpus: pages, links, the term vocabulary and per-field
/// keyword frequencies and positions.
///
/// Every call runs in autocommit mode, so a write is durable once it returns.
pub struct PageStore {
    conn: Mutex<Connection>,
}

impl PageStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(dir) = path.as_ref().parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Insert a page. Returns `false` when the url is already stored, in which
    /// case the existing row is left untouched.
    pub fn insert_page(&self, url: &str, title: &str, content: &str, last_modified: &str, size: u64) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "INSERT INTO pages (url, title, content, last_modified, size) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(url) DO NOTHING",
            params![url, title, content, last_modified, size as i64],
        )?;
        Ok(changed > 0)
    }

    pub fn insert_link(&self, parent_url: &str, child_url: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO links (parent_url, child_url) VALUES (?1, ?2)",
            params![parent_url, child_url],
        )?;
        Ok(())
    }

    /// Look up a term without creating it.
    pub fn term_id(&self, token: &str) -> Result<Option<TermId>> {
        let conn = self.conn.lock();
        let id = conn
            .query_row("SELECT id FROM terms WHERE token = ?1", params![token], |row| row.get(0))
            .optional()?;
        Ok(id)
    }

    pub fn get_or_create_term_id(&self, token: &str) -> Result<TermId> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO terms (token) VALUES (?1) ON CONFLICT(token) DO NOTHING",
            params![token],
        )?;
        let id = conn.query_row("SELECT id FROM terms WHERE token = ?1", params![token], |row| row.get(0))?;
        Ok(id)
    }

    pub fn insert_field_keyword(&self, field: Field, page_url: &str, term_id: TermId, frequency: u32) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(field.insert_keyword_sql(), params![page_url, term_id, frequency])?;
        Ok(())
    }

    pub fn insert_field_positions(&self, field: Field, page_url: &str, term_id: TermId, positions: &[usize]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(field.insert_position_sql())?;
            for &pos in positions {
                stmt.execute(params![page_url, term_id, pos as i64])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn all_pages(&self) -> Result<Vec<Page>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id, url, title, content, last_modified, size FROM pages ORDER BY id")?;
        let pages = stmt.query_map([], row_to_page)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(pages)
    }

    pub fn page_by_url(&self, url: &str) -> Result<Option<Page>> {
        let conn = self.conn.lock();
        let page = conn
            .query_row(
                "SELECT id, url, title, content, last_modified, size FROM pages WHERE url = ?1",
                params![url],
                row_to_page,
            )
            .optional()?;
        Ok(page)
    }

    pub fn all_links(&self) -> Result<Vec<Link>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT parent_url, child_url FROM links ORDER BY id")?;
        let links = stmt
            .query_map([], |row| Ok(Link { parent_url: row.get(0)?, child_url: row.get(1)? }))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(links)
    }

    /// Stored positions of a term in one field of a page, ascending.
    pub fn positions(&self, field: Field, page_url: &str, term_id: TermId) -> Result<Vec<usize>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(field.select_positions_sql())?;
        let positions = stmt
            .query_map(params![page_url, term_id], |row| row.get::<_, i64>(0))?
            .map(|r| r.map(|p| p as usize))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(positions)
    }

    pub fn field_frequency(&self, field: Field, page_url: &str, term_id: TermId) -> Result<Option<u32>> {
        let conn = self.conn.lock();
        let freq = conn
            .query_row(field.select_frequency_sql(), params![page_url, term_id], |row| row.get(0))
            .optional()?;
        Ok(freq)
    }

    /// Most frequent body terms of a page. Ties break on the term text.
    pub fn top_keywords(&self, page_url: &str, limit: usize) -> Result<Vec<KeywordCount>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT t.token, k.frequency
             FROM body_keywords k JOIN terms t ON t.id = k.term_id
             WHERE k.page_url = ?1
             ORDER BY k.frequency DESC, t.token ASC
             LIMIT ?2",
        )?;
        let keywords = stmt
            .query_map(params![page_url, limit as i64], |row| {
                Ok(KeywordCount { word: row.get(0)?, frequency: row.get(1)? })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(keywords)
    }

    /// Urls of pages linking to `page_url`.
    pub fn parent_links(&self, page_url: &str) -> Result<Vec<String>> {
        self.link_column("SELECT parent_url FROM links WHERE child_url = ?1 ORDER BY id", page_url)
    }

    /// Urls `page_url` links to.
    pub fn child_links(&self, page_url: &str) -> Result<Vec<String>> {
        self.link_column("SELECT child_url FROM links WHERE parent_url = ?1 ORDER BY id", page_url)
    }

    fn link_column(&self, sql: &str, page_url: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(sql)?;
        let urls = stmt
            .query_map(params![page_url], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(urls)
    }

    /// Row count of every table, in schema order.
    pub fn table_counts(&self) -> Result<Vec<(&'static str, u64)>> {
        let conn = self.conn.lock();
        let mut counts = Vec::with_capacity(TABLES.len());
        for table in TABLES {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            counts.push((table, n as u64));
        }
        Ok(counts)
    }
}

fn row_to_page(row: &rusqlite::Row) -> rusqlite::Result<Page> {
    Ok(Page {
        id: row.get::<_, PageId>(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        last_modified: row.get(4)?,
        size: row.get::<_, i64>(5)? as u64,
    })
}
