//! Data models for the citation aggregate.
//!
//! One [`Citation`] carries the complete nested graph parsed from a
//! single `MedlineCitation`/`BookDocument` subtree. Every list-valued
//! relation is owned exclusively by its citation and preserves document
//! order; nothing here is shared across citations or files.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Root aggregate for one bibliographic record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Citation {
    /// Unique external identifier, the business key. Mandatory.
    pub pmid: i64,
    pub citation_owner: Option<String>,
    pub citation_status: Option<String>,
    pub article_title: Option<String>,
    pub medline_pgn: Option<String>,
    pub abstract_text: Option<String>,
    pub copyright_information: Option<String>,
    pub article_affiliation: Option<String>,
    pub vernacular_title: Option<String>,
    pub number_of_references: Option<String>,
    pub keyword_list_owner: Option<String>,
    pub author_list_complete: Option<String>,
    pub grant_list_complete: Option<String>,
    pub data_bank_list_complete: Option<String>,
    pub date_created: Option<NaiveDate>,
    pub date_completed: Option<NaiveDate>,
    pub date_revised: Option<NaiveDate>,
    pub journal: Journal,
    pub authors: Vec<Author>,
    pub personal_names: Vec<PersonalName>,
    pub investigators: Vec<Investigator>,
    pub space_flights: Vec<String>,
    pub notes: Vec<Note>,
    pub chemicals: Vec<Chemical>,
    pub gene_symbols: Vec<String>,
    pub comments: Vec<Comment>,
    pub journal_infos: Vec<JournalInfo>,
    pub citation_subsets: Vec<String>,
    pub mesh_headings: Vec<MeshHeading>,
    pub qualifiers: Vec<Qualifier>,
    pub grants: Vec<Grant>,
    pub databanks: Vec<String>,
    pub accessions: Vec<Accession>,
    pub languages: Vec<String>,
    pub publication_types: Vec<String>,
    pub other_abstracts: Vec<String>,
    pub other_ids: Vec<OtherId>,
    pub keywords: Vec<Keyword>,
    pub suppl_mesh_names: Vec<SupplMeshName>,
}

/// Embedded journal sub-entity. The publication date is kept in the
/// string form of the source: an explicit year/month/day triple, or a
/// year recovered from the free-text `MedlineDate` fallback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Journal {
    pub issn: Option<String>,
    pub issn_type: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub title: Option<String>,
    pub iso_abbreviation: Option<String>,
    pub pub_date_year: Option<String>,
    pub pub_date_month: Option<String>,
    pub pub_date_day: Option<String>,
    pub medline_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Author {
    pub last_name: Option<String>,
    pub fore_name: Option<String>,
    pub initials: Option<String>,
    pub suffix: Option<String>,
    pub collective_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonalName {
    pub last_name: Option<String>,
    pub fore_name: Option<String>,
    pub initials: Option<String>,
    pub suffix: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Investigator {
    pub last_name: Option<String>,
    pub fore_name: Option<String>,
    pub initials: Option<String>,
    pub suffix: Option<String>,
    pub affiliation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Note {
    pub owner: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Chemical {
    pub registry_number: Option<String>,
    pub name_of_substance: Option<String>,
    pub substance_ui: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Comment {
    pub ref_type: Option<String>,
    pub ref_source: Option<String>,
    pub ref_pmid: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JournalInfo {
    pub nlm_unique_id: Option<String>,
    pub country: Option<String>,
    pub medline_ta: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshHeading {
    pub descriptor_name: Option<String>,
    pub major_topic: Option<String>,
    pub descriptor_ui: Option<String>,
}

/// Mesh qualifier, flattened out of its heading. `descriptor_name` is
/// copied from the owning heading at build time; downstream consumers
/// rely on this denormalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Qualifier {
    pub descriptor_name: Option<String>,
    pub qualifier_name: Option<String>,
    pub major_topic: Option<String>,
    pub qualifier_ui: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Grant {
    pub grant_id: Option<String>,
    pub acronym: Option<String>,
    pub agency: Option<String>,
    pub country: Option<String>,
}

/// Accession number with the owning databank name copied in, mirroring
/// the qualifier/heading denormalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Accession {
    pub data_bank_name: Option<String>,
    pub accession_number: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OtherId {
    pub other_id: String,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Keyword {
    pub keyword: String,
    pub major_topic: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupplMeshName {
    pub suppl_mesh_name: String,
    pub ui: Option<String>,
    pub mesh_type: Option<String>,
}
