//! End-to-end ingestion runs over a scratch directory and store.

use std::io::Write;
use std::path::Path;

use medlex_db::Database;
use medlex_ingestion::{run_ingestion, RunConfig};

fn citation_xml(pmid: i64, title: &str) -> String {
    format!(
        r#"<MedlineCitation Owner="NLM" Status="MEDLINE">
  <PMID>{pmid}</PMID>
  <DateCreated><Year>2014</Year><Month>Jul</Month><Day>21</Day></DateCreated>
  <Article>
    <Journal>
      <Title>Journal of Testing</Title>
      <JournalIssue>
        <Volume>1</Volume>
        <PubDate><Year>2014</Year><Month>Jul</Month></PubDate>
      </JournalIssue>
    </Journal>
    <ArticleTitle>{title}</ArticleTitle>
    <AuthorList CompleteYN="Y">
      <Author><LastName>Smith</LastName><Initials>JA</Initials></Author>
    </AuthorList>
    <Language>eng</Language>
  </Article>
  <MeshHeadingList>
    <MeshHeading>
      <DescriptorName MajorTopicYN="N" UI="D000001">Testing</DescriptorName>
      <QualifierName MajorTopicYN="Y" UI="Q000001">methods</QualifierName>
    </MeshHeading>
  </MeshHeadingList>
</MedlineCitation>"#
    )
}

fn document(citations: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<PubmedArticleSet>\n{}\n</PubmedArticleSet>",
        citations.join("\n")
    )
}

fn write_plain(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(name), body).unwrap();
}

fn write_gzip(dir: &Path, name: &str, body: &str) {
    let file = std::fs::File::create(dir.join(name)).unwrap();
    let mut enc = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    enc.write_all(body.as_bytes()).unwrap();
    enc.finish().unwrap();
}

async fn scratch_db(dir: &Path) -> Database {
    let url = format!("sqlite://{}?mode=rwc", dir.join("store.db").display());
    let db = Database::connect(&url, 4).await.unwrap();
    db.create_schema().await.unwrap();
    db
}

#[tokio::test]
async fn ingests_plain_and_gzipped_files() {
    let input = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    write_plain(
        input.path(),
        "medline16n0001.xml",
        &document(&[citation_xml(1, "First"), citation_xml(2, "Second")]),
    );
    write_gzip(
        input.path(),
        "medline16n0002.xml.gz",
        &document(&[citation_xml(3, "Third")]),
    );

    let db = scratch_db(store.path()).await;
    let report = run_ingestion(RunConfig::new(input.path().to_path_buf()), db.clone())
        .await
        .unwrap();

    assert_eq!(report.files_processed, 2);
    assert_eq!(report.files_failed, 0);
    assert_eq!(report.citations_inserted, 3);
    assert_eq!(report.citations_failed, 0);

    let stats = db.stats().await.unwrap();
    assert_eq!(stats.citations, 3);
    assert_eq!(stats.xml_files, 2);

    // Child rows landed with their citations.
    let qualifiers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM qualifiers")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(qualifiers, 3);

    let file_names: Vec<String> =
        sqlx::query_scalar("SELECT xml_file_name FROM citations WHERE pmid = 3")
            .fetch_all(db.pool())
            .await
            .unwrap();
    assert_eq!(file_names, vec!["medline16n0002".to_string()]);
}

#[tokio::test]
async fn rerun_over_same_directory_is_idempotent() {
    let input = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    write_plain(
        input.path(),
        "medline16n0001.xml",
        &document(&[citation_xml(10, "Once")]),
    );

    let db = scratch_db(store.path()).await;
    let cfg = RunConfig::new(input.path().to_path_buf());
    run_ingestion(cfg.clone(), db.clone()).await.unwrap();
    let second = run_ingestion(cfg, db.clone()).await.unwrap();

    assert_eq!(second.files_skipped, 1);
    assert_eq!(second.files_processed, 0);
    assert_eq!(second.citations_inserted, 0);
    assert_eq!(db.stats().await.unwrap().citations, 1);
}

#[tokio::test]
async fn duplicate_pmid_across_files_is_skipped() {
    let input = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    write_plain(
        input.path(),
        "a.xml",
        &document(&[citation_xml(20, "Original")]),
    );
    write_plain(
        input.path(),
        "b.xml",
        &document(&[citation_xml(20, "Republished"), citation_xml(21, "New")]),
    );

    let db = scratch_db(store.path()).await;
    // One worker so file order is deterministic.
    let mut cfg = RunConfig::new(input.path().to_path_buf());
    cfg.workers = 1;
    let report = run_ingestion(cfg, db.clone()).await.unwrap();

    assert_eq!(report.citations_inserted, 2);
    assert_eq!(report.citations_skipped, 1);
    assert_eq!(report.files_processed, 2);

    // First occurrence won.
    let title: String = sqlx::query_scalar("SELECT article_title FROM citations WHERE pmid = 20")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(title, "Original");
}

#[tokio::test]
async fn window_limits_the_run_to_an_ordinal_slice() {
    let input = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    for (i, name) in ["a.xml", "b.xml", "c.xml"].iter().enumerate() {
        write_plain(
            input.path(),
            name,
            &document(&[citation_xml(30 + i as i64, "Windowed")]),
        );
    }

    let db = scratch_db(store.path()).await;
    let mut cfg = RunConfig::new(input.path().to_path_buf());
    cfg.start = 1;
    cfg.end = Some(2);
    let report = run_ingestion(cfg, db.clone()).await.unwrap();

    assert_eq!(report.files_processed, 1);
    let loaded = db.loaded_file_names().await.unwrap();
    assert!(loaded.contains("b"));
    assert_eq!(loaded.len(), 1);
}

#[tokio::test]
async fn window_slots_skip_already_loaded_files() {
    let input = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    for (i, name) in ["a.xml", "b.xml", "c.xml"].iter().enumerate() {
        write_plain(
            input.path(),
            name,
            &document(&[citation_xml(60 + i as i64, "Sliced")]),
        );
    }

    let db = scratch_db(store.path()).await;
    db.record_file_loaded("a").await.unwrap();

    // "a" is screened out before the window applies, so slot [0, 1)
    // goes to "b", the first unloaded file.
    let mut cfg = RunConfig::new(input.path().to_path_buf());
    cfg.start = 0;
    cfg.end = Some(1);
    let report = run_ingestion(cfg, db.clone()).await.unwrap();

    assert_eq!(report.files_skipped, 1);
    assert_eq!(report.files_processed, 1);
    let loaded = db.loaded_file_names().await.unwrap();
    assert!(loaded.contains("b"));
    assert!(!loaded.contains("c"));
}

#[tokio::test]
async fn resumes_a_partially_loaded_file() {
    let input = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    write_plain(
        input.path(),
        "medline16n0009.xml",
        &document(&[citation_xml(40, "Committed earlier"), citation_xml(41, "Fresh")]),
    );

    let db = scratch_db(store.path()).await;
    // Simulate a crash after the first citation committed but before the
    // file record was written.
    sqlx::query("INSERT INTO citations (pmid, xml_file_name) VALUES (40, 'medline16n0009')")
        .execute(db.pool())
        .await
        .unwrap();

    let report = run_ingestion(RunConfig::new(input.path().to_path_buf()), db.clone())
        .await
        .unwrap();

    assert_eq!(report.files_processed, 1);
    assert_eq!(report.citations_skipped, 1);
    assert_eq!(report.citations_inserted, 1);
    assert_eq!(db.stats().await.unwrap().citations, 2);
    assert!(db
        .loaded_file_names()
        .await
        .unwrap()
        .contains("medline16n0009"));
}

#[tokio::test]
async fn malformed_file_fails_alone() {
    let input = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    write_plain(input.path(), "bad.xml", "<Set><MedlineCitation><PMID>50</PMID>");
    write_plain(
        input.path(),
        "good.xml",
        &document(&[citation_xml(51, "Survivor")]),
    );

    let db = scratch_db(store.path()).await;
    let mut cfg = RunConfig::new(input.path().to_path_buf());
    cfg.workers = 1;
    let report = run_ingestion(cfg, db.clone()).await.unwrap();

    assert_eq!(report.files_failed, 1);
    assert_eq!(report.files_processed, 1);
    assert_eq!(db.stats().await.unwrap().citations, 1);
    // Failed files stay unrecorded so the next run retries them.
    assert!(!db.loaded_file_names().await.unwrap().contains("bad"));
}
