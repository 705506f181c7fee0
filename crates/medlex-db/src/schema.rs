//! Store schema: one citation row keyed by PMID, one child table per
//! list-valued relation, plus the file-association table used for
//! file-level incremental-load screening.
//!
//! Citations reference their source file by invariant name
//! (`xml_file_name`, suffix stripped). The `xml_files` row is inserted
//! only after a whole file has been consumed, so the column is a plain
//! indexed reference rather than an enforced foreign key.

pub const TABLE_XML_FILES: &str = "xml_files";
pub const TABLE_CITATIONS: &str = "citations";

/// Child tables, each carrying a `pmid` column back to `citations`.
pub const CHILD_TABLES: &[&str] = &[
    "journals",
    "authors",
    "personal_names",
    "investigators",
    "space_flights",
    "notes",
    "chemicals",
    "gene_symbols",
    "comments",
    "journal_infos",
    "citation_subsets",
    "mesh_headings",
    "qualifiers",
    "grants",
    "databanks",
    "accessions",
    "languages",
    "publication_types",
    "other_abstracts",
    "other_ids",
    "keywords",
    "suppl_mesh_names",
];

/// Schema DDL, executed statement by statement. Idempotent.
pub const CREATE_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS xml_files (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        xml_file_name   TEXT NOT NULL UNIQUE,
        time_processed  TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS citations (
        pmid                     INTEGER PRIMARY KEY,
        citation_owner           TEXT,
        citation_status          TEXT,
        article_title            TEXT,
        medline_pgn              TEXT,
        abstract_text            TEXT,
        copyright_information    TEXT,
        article_affiliation      TEXT,
        vernacular_title         TEXT,
        number_of_references     TEXT,
        keyword_list_owner       TEXT,
        author_list_complete     TEXT,
        grant_list_complete      TEXT,
        data_bank_list_complete  TEXT,
        date_created             TEXT,
        date_completed           TEXT,
        date_revised             TEXT,
        xml_file_name            TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_citations_xml_file ON citations (xml_file_name)",
    "CREATE TABLE IF NOT EXISTS journals (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        pmid              INTEGER NOT NULL REFERENCES citations (pmid) ON DELETE CASCADE,
        issn              TEXT,
        issn_type         TEXT,
        volume            TEXT,
        issue             TEXT,
        title             TEXT,
        iso_abbreviation  TEXT,
        pub_date_year     TEXT,
        pub_date_month    TEXT,
        pub_date_day      TEXT,
        medline_date      TEXT
    )",
    "CREATE TABLE IF NOT EXISTS authors (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        pmid             INTEGER NOT NULL REFERENCES citations (pmid) ON DELETE CASCADE,
        last_name        TEXT,
        fore_name        TEXT,
        initials         TEXT,
        suffix           TEXT,
        collective_name  TEXT
    )",
    "CREATE TABLE IF NOT EXISTS personal_names (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        pmid       INTEGER NOT NULL REFERENCES citations (pmid) ON DELETE CASCADE,
        last_name  TEXT,
        fore_name  TEXT,
        initials   TEXT,
        suffix     TEXT
    )",
    "CREATE TABLE IF NOT EXISTS investigators (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        pmid         INTEGER NOT NULL REFERENCES citations (pmid) ON DELETE CASCADE,
        last_name    TEXT,
        fore_name    TEXT,
        initials     TEXT,
        suffix       TEXT,
        affiliation  TEXT
    )",
    "CREATE TABLE IF NOT EXISTS space_flights (
        id       INTEGER PRIMARY KEY AUTOINCREMENT,
        pmid     INTEGER NOT NULL REFERENCES citations (pmid) ON DELETE CASCADE,
        mission  TEXT
    )",
    "CREATE TABLE IF NOT EXISTS notes (
        id      INTEGER PRIMARY KEY AUTOINCREMENT,
        pmid    INTEGER NOT NULL REFERENCES citations (pmid) ON DELETE CASCADE,
        owner   TEXT,
        note    TEXT
    )",
    "CREATE TABLE IF NOT EXISTS chemicals (
        id                 INTEGER PRIMARY KEY AUTOINCREMENT,
        pmid               INTEGER NOT NULL REFERENCES citations (pmid) ON DELETE CASCADE,
        registry_number    TEXT,
        name_of_substance  TEXT,
        substance_ui       TEXT
    )",
    "CREATE TABLE IF NOT EXISTS gene_symbols (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        pmid         INTEGER NOT NULL REFERENCES citations (pmid) ON DELETE CASCADE,
        gene_symbol  TEXT
    )",
    "CREATE TABLE IF NOT EXISTS comments (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        pmid        INTEGER NOT NULL REFERENCES citations (pmid) ON DELETE CASCADE,
        ref_type    TEXT,
        ref_source  TEXT,
        ref_pmid    TEXT
    )",
    "CREATE TABLE IF NOT EXISTS journal_infos (
        id             INTEGER PRIMARY KEY AUTOINCREMENT,
        pmid           INTEGER NOT NULL REFERENCES citations (pmid) ON DELETE CASCADE,
        nlm_unique_id  TEXT,
        country        TEXT,
        medline_ta     TEXT
    )",
    "CREATE TABLE IF NOT EXISTS citation_subsets (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        pmid             INTEGER NOT NULL REFERENCES citations (pmid) ON DELETE CASCADE,
        citation_subset  TEXT
    )",
    "CREATE TABLE IF NOT EXISTS mesh_headings (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        pmid             INTEGER NOT NULL REFERENCES citations (pmid) ON DELETE CASCADE,
        descriptor_name  TEXT,
        major_topic      TEXT,
        descriptor_ui    TEXT
    )",
    "CREATE TABLE IF NOT EXISTS qualifiers (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        pmid             INTEGER NOT NULL REFERENCES citations (pmid) ON DELETE CASCADE,
        descriptor_name  TEXT,
        qualifier_name   TEXT,
        major_topic      TEXT,
        qualifier_ui     TEXT
    )",
    "CREATE TABLE IF NOT EXISTS grants (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        pmid      INTEGER NOT NULL REFERENCES citations (pmid) ON DELETE CASCADE,
        grant_id  TEXT,
        acronym   TEXT,
        agency    TEXT,
        country   TEXT
    )",
    "CREATE TABLE IF NOT EXISTS databanks (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        pmid            INTEGER NOT NULL REFERENCES citations (pmid) ON DELETE CASCADE,
        data_bank_name  TEXT
    )",
    "CREATE TABLE IF NOT EXISTS accessions (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        pmid              INTEGER NOT NULL REFERENCES citations (pmid) ON DELETE CASCADE,
        data_bank_name    TEXT,
        accession_number  TEXT
    )",
    "CREATE TABLE IF NOT EXISTS languages (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        pmid      INTEGER NOT NULL REFERENCES citations (pmid) ON DELETE CASCADE,
        language  TEXT
    )",
    "CREATE TABLE IF NOT EXISTS publication_types (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        pmid              INTEGER NOT NULL REFERENCES citations (pmid) ON DELETE CASCADE,
        publication_type  TEXT
    )",
    "CREATE TABLE IF NOT EXISTS other_abstracts (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        pmid            INTEGER NOT NULL REFERENCES citations (pmid) ON DELETE CASCADE,
        abstract_text   TEXT
    )",
    "CREATE TABLE IF NOT EXISTS other_ids (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        pmid      INTEGER NOT NULL REFERENCES citations (pmid) ON DELETE CASCADE,
        other_id  TEXT,
        source    TEXT
    )",
    "CREATE TABLE IF NOT EXISTS keywords (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        pmid         INTEGER NOT NULL REFERENCES citations (pmid) ON DELETE CASCADE,
        keyword      TEXT,
        major_topic  TEXT
    )",
    "CREATE TABLE IF NOT EXISTS suppl_mesh_names (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        pmid             INTEGER NOT NULL REFERENCES citations (pmid) ON DELETE CASCADE,
        suppl_mesh_name  TEXT,
        ui               TEXT,
        mesh_type        TEXT
    )",
];
