//! Transactional citation writer.
//!
//! Each citation lands atomically: the root row and every child row
//! commit together or not at all, so a crash mid-citation never leaves
//! a partial aggregate behind.

use medlex_db::{Database, DbError};
use tracing::debug;

use crate::models::Citation;

#[derive(Clone)]
pub struct IngestionRepository {
    db: Database,
}

impl IngestionRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Insert one citation aggregate under `xml_file_name`.
    ///
    /// A PMID already present in the store rolls the whole aggregate
    /// back and surfaces as [`DbError::Duplicate`].
    pub async fn insert_citation(
        &self,
        citation: &Citation,
        xml_file_name: &str,
    ) -> Result<(), DbError> {
        let mut tx = self.db.pool().begin().await?;

        let root = sqlx::query(
            "INSERT INTO citations (
                pmid, citation_owner, citation_status, article_title,
                medline_pgn, abstract_text, copyright_information,
                article_affiliation, vernacular_title, number_of_references,
                keyword_list_owner, author_list_complete, grant_list_complete,
                data_bank_list_complete, date_created, date_completed,
                date_revised, xml_file_name
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(citation.pmid)
        .bind(&citation.citation_owner)
        .bind(&citation.citation_status)
        .bind(&citation.article_title)
        .bind(&citation.medline_pgn)
        .bind(&citation.abstract_text)
        .bind(&citation.copyright_information)
        .bind(&citation.article_affiliation)
        .bind(&citation.vernacular_title)
        .bind(&citation.number_of_references)
        .bind(&citation.keyword_list_owner)
        .bind(&citation.author_list_complete)
        .bind(&citation.grant_list_complete)
        .bind(&citation.data_bank_list_complete)
        .bind(citation.date_created)
        .bind(citation.date_completed)
        .bind(citation.date_revised)
        .bind(xml_file_name)
        .execute(&mut *tx)
        .await;

        if let Err(err) = root {
            return Err(classify(err, citation.pmid));
        }

        let pmid = citation.pmid;
        let journal = &citation.journal;
        sqlx::query(
            "INSERT INTO journals (
                pmid, issn, issn_type, volume, issue, title,
                iso_abbreviation, pub_date_year, pub_date_month,
                pub_date_day, medline_date
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(pmid)
        .bind(&journal.issn)
        .bind(&journal.issn_type)
        .bind(&journal.volume)
        .bind(&journal.issue)
        .bind(&journal.title)
        .bind(&journal.iso_abbreviation)
        .bind(&journal.pub_date_year)
        .bind(&journal.pub_date_month)
        .bind(&journal.pub_date_day)
        .bind(&journal.medline_date)
        .execute(&mut *tx)
        .await?;

        for author in &citation.authors {
            sqlx::query(
                "INSERT INTO authors (pmid, last_name, fore_name, initials, suffix, collective_name)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(pmid)
            .bind(&author.last_name)
            .bind(&author.fore_name)
            .bind(&author.initials)
            .bind(&author.suffix)
            .bind(&author.collective_name)
            .execute(&mut *tx)
            .await?;
        }

        for name in &citation.personal_names {
            sqlx::query(
                "INSERT INTO personal_names (pmid, last_name, fore_name, initials, suffix)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(pmid)
            .bind(&name.last_name)
            .bind(&name.fore_name)
            .bind(&name.initials)
            .bind(&name.suffix)
            .execute(&mut *tx)
            .await?;
        }

        for inv in &citation.investigators {
            sqlx::query(
                "INSERT INTO investigators (pmid, last_name, fore_name, initials, suffix, affiliation)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(pmid)
            .bind(&inv.last_name)
            .bind(&inv.fore_name)
            .bind(&inv.initials)
            .bind(&inv.suffix)
            .bind(&inv.affiliation)
            .execute(&mut *tx)
            .await?;
        }

        for mission in &citation.space_flights {
            sqlx::query("INSERT INTO space_flights (pmid, mission) VALUES (?, ?)")
                .bind(pmid)
                .bind(mission)
                .execute(&mut *tx)
                .await?;
        }

        for note in &citation.notes {
            sqlx::query("INSERT INTO notes (pmid, owner, note) VALUES (?, ?, ?)")
                .bind(pmid)
                .bind(&note.owner)
                .bind(&note.note)
                .execute(&mut *tx)
                .await?;
        }

        for chem in &citation.chemicals {
            sqlx::query(
                "INSERT INTO chemicals (pmid, registry_number, name_of_substance, substance_ui)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(pmid)
            .bind(&chem.registry_number)
            .bind(&chem.name_of_substance)
            .bind(&chem.substance_ui)
            .execute(&mut *tx)
            .await?;
        }

        for symbol in &citation.gene_symbols {
            sqlx::query("INSERT INTO gene_symbols (pmid, gene_symbol) VALUES (?, ?)")
                .bind(pmid)
                .bind(symbol)
                .execute(&mut *tx)
                .await?;
        }

        for comment in &citation.comments {
            sqlx::query(
                "INSERT INTO comments (pmid, ref_type, ref_source, ref_pmid)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(pmid)
            .bind(&comment.ref_type)
            .bind(&comment.ref_source)
            .bind(&comment.ref_pmid)
            .execute(&mut *tx)
            .await?;
        }

        for info in &citation.journal_infos {
            sqlx::query(
                "INSERT INTO journal_infos (pmid, nlm_unique_id, country, medline_ta)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(pmid)
            .bind(&info.nlm_unique_id)
            .bind(&info.country)
            .bind(&info.medline_ta)
            .execute(&mut *tx)
            .await?;
        }

        for subset in &citation.citation_subsets {
            sqlx::query("INSERT INTO citation_subsets (pmid, citation_subset) VALUES (?, ?)")
                .bind(pmid)
                .bind(subset)
                .execute(&mut *tx)
                .await?;
        }

        for mesh in &citation.mesh_headings {
            sqlx::query(
                "INSERT INTO mesh_headings (pmid, descriptor_name, major_topic, descriptor_ui)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(pmid)
            .bind(&mesh.descriptor_name)
            .bind(&mesh.major_topic)
            .bind(&mesh.descriptor_ui)
            .execute(&mut *tx)
            .await?;
        }

        for qual in &citation.qualifiers {
            sqlx::query(
                "INSERT INTO qualifiers (pmid, descriptor_name, qualifier_name, major_topic, qualifier_ui)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(pmid)
            .bind(&qual.descriptor_name)
            .bind(&qual.qualifier_name)
            .bind(&qual.major_topic)
            .bind(&qual.qualifier_ui)
            .execute(&mut *tx)
            .await?;
        }

        for grant in &citation.grants {
            sqlx::query(
                "INSERT INTO grants (pmid, grant_id, acronym, agency, country)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(pmid)
            .bind(&grant.grant_id)
            .bind(&grant.acronym)
            .bind(&grant.agency)
            .bind(&grant.country)
            .execute(&mut *tx)
            .await?;
        }

        for bank in &citation.databanks {
            sqlx::query("INSERT INTO databanks (pmid, data_bank_name) VALUES (?, ?)")
                .bind(pmid)
                .bind(bank)
                .execute(&mut *tx)
                .await?;
        }

        for acc in &citation.accessions {
            sqlx::query(
                "INSERT INTO accessions (pmid, data_bank_name, accession_number)
                 VALUES (?, ?, ?)",
            )
            .bind(pmid)
            .bind(&acc.data_bank_name)
            .bind(&acc.accession_number)
            .execute(&mut *tx)
            .await?;
        }

        for language in &citation.languages {
            sqlx::query("INSERT INTO languages (pmid, language) VALUES (?, ?)")
                .bind(pmid)
                .bind(language)
                .execute(&mut *tx)
                .await?;
        }

        for pub_type in &citation.publication_types {
            sqlx::query("INSERT INTO publication_types (pmid, publication_type) VALUES (?, ?)")
                .bind(pmid)
                .bind(pub_type)
                .execute(&mut *tx)
                .await?;
        }

        for text in &citation.other_abstracts {
            sqlx::query("INSERT INTO other_abstracts (pmid, abstract_text) VALUES (?, ?)")
                .bind(pmid)
                .bind(text)
                .execute(&mut *tx)
                .await?;
        }

        for other in &citation.other_ids {
            sqlx::query("INSERT INTO other_ids (pmid, other_id, source) VALUES (?, ?, ?)")
                .bind(pmid)
                .bind(&other.other_id)
                .bind(&other.source)
                .execute(&mut *tx)
                .await?;
        }

        for keyword in &citation.keywords {
            sqlx::query("INSERT INTO keywords (pmid, keyword, major_topic) VALUES (?, ?, ?)")
                .bind(pmid)
                .bind(&keyword.keyword)
                .bind(&keyword.major_topic)
                .execute(&mut *tx)
                .await?;
        }

        for suppl in &citation.suppl_mesh_names {
            sqlx::query(
                "INSERT INTO suppl_mesh_names (pmid, suppl_mesh_name, ui, mesh_type)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(pmid)
            .bind(&suppl.suppl_mesh_name)
            .bind(&suppl.ui)
            .bind(&suppl.mesh_type)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(pmid, "citation stored");
        Ok(())
    }
}

fn classify(err: sqlx::Error, pmid: i64) -> DbError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => DbError::Duplicate(pmid),
        other => DbError::Sqlx(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Author, Keyword};

    async fn scratch_repo() -> (tempfile::TempDir, IngestionRepository) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let db = Database::connect(&url, 1).await.unwrap();
        db.create_schema().await.unwrap();
        (dir, IngestionRepository::new(db))
    }

    fn sample_citation(pmid: i64) -> Citation {
        Citation {
            pmid,
            article_title: Some("A title".into()),
            authors: vec![Author {
                last_name: Some("Smith".into()),
                initials: Some("ja".into()),
                ..Author::default()
            }],
            keywords: vec![Keyword {
                keyword: "KRAS".into(),
                major_topic: Some("Y".into()),
            }],
            languages: vec!["eng".into()],
            ..Citation::default()
        }
    }

    #[tokio::test]
    async fn inserts_root_and_children() {
        let (_dir, repo) = scratch_repo().await;
        repo.insert_citation(&sample_citation(100), "medline16n0001")
            .await
            .unwrap();

        let authors: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM authors WHERE pmid = 100")
            .fetch_one(repo.db().pool())
            .await
            .unwrap();
        assert_eq!(authors, 1);
        assert!(repo.db().citation_exists(100).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_pmid_rolls_back_cleanly() {
        let (_dir, repo) = scratch_repo().await;
        repo.insert_citation(&sample_citation(200), "fileA")
            .await
            .unwrap();

        let mut second = sample_citation(200);
        second.languages = vec!["fre".into()];
        let err = repo.insert_citation(&second, "fileB").await.unwrap_err();
        assert!(matches!(err, DbError::Duplicate(200)));

        // First insert intact, nothing from the second leaked through.
        let languages: Vec<String> =
            sqlx::query_scalar("SELECT language FROM languages WHERE pmid = 200")
                .fetch_all(repo.db().pool())
                .await
                .unwrap();
        assert_eq!(languages, vec!["eng".to_string()]);
    }
}
