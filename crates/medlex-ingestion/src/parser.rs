//! Streaming citation parser.
//!
//! [`CitationReader`] drives one XML document and yields one
//! [`Citation`] per `MedlineCitation`/`BookDocument` subtree.
//! [`CitationBuilder`] is the tag-driven state machine behind it: it is
//! constructed fresh at every subtree start, fed the flat event stream,
//! and consumed at the subtree end, so peak memory is one citation's
//! worth of data regardless of document size.
//!
//! Routing is parent-sensitive where Medline reuses a tag: `PMID` counts
//! only directly under the citation root (a `CommentsCorrections` child
//! PMID is a reference, not an identifier), `Title` only under
//! `Journal`, `Country` under `Grant` vs `MedlineJournalInfo`, and
//! `Year`/`Month`/`Day` go to whichever date element is open.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::warn;

use crate::dates::{month_number, resolve_date};
use crate::error::IngestError;
use crate::models::*;
use crate::normalise::{limited, limited_lower};

const ROOT_TAGS: [&str; 2] = ["MedlineCitation", "BookDocument"];

/// Streams citations out of one XML document. Single consuming pass.
pub struct CitationReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
}

impl CitationReader<BufReader<Box<dyn Read + Send>>> {
    /// Open a plain or gzip-compressed citation file.
    pub fn open(path: &Path) -> Result<Self, IngestError> {
        let file = File::open(path)?;
        let raw: Box<dyn Read + Send> =
            if path.extension().and_then(|e| e.to_str()) == Some("gz") {
                Box::new(GzDecoder::new(file))
            } else {
                Box::new(file)
            };
        Ok(Self::from_reader(BufReader::new(raw)))
    }
}

impl<R: BufRead> CitationReader<R> {
    pub fn from_reader(input: R) -> Self {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(true);
        Self {
            reader,
            buf: Vec::new(),
        }
    }

    /// Next fully-built citation, or `None` at document end.
    ///
    /// A citation without a root-level PMID is logged and skipped; the
    /// reader continues with the following subtree. Malformed XML is a
    /// file-level error and ends the stream.
    pub fn next_citation(&mut self) -> Result<Option<Citation>, IngestError> {
        let mut builder: Option<CitationBuilder> = None;
        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) => {
                    let name = tag_name(&e);
                    match builder.as_mut() {
                        None => {
                            if ROOT_TAGS.contains(&name.as_str()) {
                                builder = Some(CitationBuilder::new(name, attrs_of(&e)));
                            }
                        }
                        Some(b) => b.start(&name, attrs_of(&e)),
                    }
                }
                Event::Empty(e) => {
                    if let Some(b) = builder.as_mut() {
                        let name = tag_name(&e);
                        b.start(&name, attrs_of(&e));
                        b.end(&name);
                    }
                }
                Event::Text(e) => {
                    if let Some(b) = builder.as_mut() {
                        b.text(&e.unescape().unwrap_or_default());
                    }
                }
                Event::CData(e) => {
                    if let Some(b) = builder.as_mut() {
                        b.text(&String::from_utf8_lossy(&e.into_inner()));
                    }
                }
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    let at_root = builder.as_ref().is_some_and(|b| b.is_root(&name));
                    if at_root {
                        let done = builder.take();
                        self.buf.clear();
                        match done.map(CitationBuilder::finish) {
                            Some(Ok(citation)) => return Ok(Some(citation)),
                            Some(Err(err)) => warn!(error = %err, "skipping citation"),
                            None => {}
                        }
                    } else if let Some(b) = builder.as_mut() {
                        b.end(&name);
                    }
                }
                Event::Eof => {
                    if builder.is_some() {
                        return Err(IngestError::TruncatedDocument);
                    }
                    return Ok(None);
                }
                _ => {}
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn scratch_len(&self) -> usize {
        self.buf.len()
    }
}

fn tag_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn attrs_of(e: &BytesStart) -> Vec<(String, String)> {
    e.attributes()
        .flatten()
        .map(|a| {
            (
                String::from_utf8_lossy(a.key.as_ref()).into_owned(),
                String::from_utf8_lossy(&a.value).into_owned(),
            )
        })
        .collect()
}

fn attr(attrs: &[(String, String)], key: &str) -> Option<String> {
    attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DateCtx {
    Created,
    Completed,
    Revised,
    PubDate,
    ArticleDate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PersonKind {
    Author,
    PersonalName,
    Investigator,
}

#[derive(Default)]
struct DateParts {
    year: Option<String>,
    month: Option<String>,
    day: Option<String>,
}

struct PersonScratch {
    kind: PersonKind,
    last_name: Option<String>,
    fore_name: Option<String>,
    initials: Option<String>,
    suffix: Option<String>,
    collective_name: Option<String>,
    affiliation: Option<String>,
}

impl PersonScratch {
    fn new(kind: PersonKind) -> Self {
        Self {
            kind,
            last_name: None,
            fore_name: None,
            initials: None,
            suffix: None,
            collective_name: None,
            affiliation: None,
        }
    }
}

/// Prefix decision for one `AbstractText` segment, fixed from its
/// attributes at the segment's start event.
enum SegmentLabel {
    Bare,
    Unlabelled,
    Label(String),
}

fn segment_label(attrs: &[(String, String)]) -> SegmentLabel {
    match attrs.len() {
        0 => SegmentLabel::Bare,
        1 => {
            if attrs[0].1 == "UNLABELLED" {
                SegmentLabel::Unlabelled
            } else {
                SegmentLabel::Label(attrs[0].1.clone())
            }
        }
        // Label plus NlmCategory: the category names the section.
        _ => SegmentLabel::Label(
            attr(attrs, "NlmCategory").unwrap_or_else(|| attrs[1].1.clone()),
        ),
    }
}

/// Builds one citation aggregate from the event stream of its subtree.
pub struct CitationBuilder {
    root: String,
    citation: Citation,
    pmid: Option<i64>,
    stack: Vec<String>,
    text: String,
    date_ctx: Option<DateCtx>,
    date: DateParts,
    person: Option<PersonScratch>,
    mesh: Option<MeshHeading>,
    qualifier_major: Option<String>,
    qualifier_ui: Option<String>,
    in_abstract: bool,
    in_other_abstract: bool,
    abstract_pieces: Vec<String>,
    first_segment_raw: Option<String>,
    current_segment: Option<SegmentLabel>,
    other_abstract_text: Option<String>,
    chemical: Option<Chemical>,
    grant: Option<Grant>,
    comment: Option<Comment>,
    journal_info: Option<JournalInfo>,
    databank_name: Option<String>,
    note_owner: Option<String>,
    keyword_major: Option<String>,
    other_id_source: Option<String>,
    issn_type: Option<String>,
    suppl_ui: Option<String>,
    suppl_type: Option<String>,
}

impl CitationBuilder {
    fn new(root: String, root_attrs: Vec<(String, String)>) -> Self {
        let mut citation = Citation::default();
        citation.citation_owner = attr(&root_attrs, "Owner");
        citation.citation_status = attr(&root_attrs, "Status");
        Self {
            root,
            citation,
            pmid: None,
            stack: Vec::new(),
            text: String::new(),
            date_ctx: None,
            date: DateParts::default(),
            person: None,
            mesh: None,
            qualifier_major: None,
            qualifier_ui: None,
            in_abstract: false,
            in_other_abstract: false,
            abstract_pieces: Vec::new(),
            first_segment_raw: None,
            current_segment: None,
            other_abstract_text: None,
            chemical: None,
            grant: None,
            comment: None,
            journal_info: None,
            databank_name: None,
            note_owner: None,
            keyword_major: None,
            other_id_source: None,
            issn_type: None,
            suppl_ui: None,
            suppl_type: None,
        }
    }

    fn is_root(&self, name: &str) -> bool {
        self.stack.is_empty() && name == self.root
    }

    fn text(&mut self, chunk: &str) {
        self.text.push_str(chunk);
    }

    fn start(&mut self, name: &str, attrs: Vec<(String, String)>) {
        self.text.clear();
        let parent = self.stack.last().map(String::as_str);
        match name {
            "DateCreated" => self.open_date(DateCtx::Created),
            "DateCompleted" => self.open_date(DateCtx::Completed),
            "DateRevised" => self.open_date(DateCtx::Revised),
            "PubDate" => self.open_date(DateCtx::PubDate),
            "ArticleDate" => self.open_date(DateCtx::ArticleDate),
            "AuthorList" => self.citation.author_list_complete = attr(&attrs, "CompleteYN"),
            "GrantList" => self.citation.grant_list_complete = attr(&attrs, "CompleteYN"),
            "DataBankList" => {
                self.citation.data_bank_list_complete = attr(&attrs, "CompleteYN")
            }
            "KeywordList" => self.citation.keyword_list_owner = attr(&attrs, "Owner"),
            "Author" if parent == Some("AuthorList") => {
                self.person = Some(PersonScratch::new(PersonKind::Author))
            }
            "Keyword" => self.keyword_major = attr(&attrs, "MajorTopicYN"),
            "MeshHeading" => self.mesh = Some(MeshHeading::default()),
            "DescriptorName" if parent == Some("MeshHeading") => {
                if let Some(m) = &mut self.mesh {
                    m.major_topic = attr(&attrs, "MajorTopicYN");
                    m.descriptor_ui = attr(&attrs, "UI");
                }
            }
            "QualifierName" => {
                self.qualifier_major = attr(&attrs, "MajorTopicYN");
                self.qualifier_ui = attr(&attrs, "UI");
            }
            "Abstract" if !self.in_other_abstract => {
                self.in_abstract = true;
                self.abstract_pieces.clear();
                self.first_segment_raw = None;
            }
            "OtherAbstract" => {
                self.in_other_abstract = true;
                self.other_abstract_text = None;
            }
            "AbstractText" if self.in_abstract && !self.in_other_abstract => {
                self.current_segment = Some(segment_label(&attrs));
            }
            "ISSN" => self.issn_type = attr(&attrs, "IssnType"),
            "OtherID" => self.other_id_source = attr(&attrs, "Source"),
            "GeneralNote" => self.note_owner = attr(&attrs, "Owner"),
            "Chemical" => self.chemical = Some(Chemical::default()),
            "NameOfSubstance" => {
                if let Some(c) = &mut self.chemical {
                    c.substance_ui = attr(&attrs, "UI");
                }
            }
            "Grant" => self.grant = Some(Grant::default()),
            "CommentsCorrections" => {
                self.comment = Some(Comment {
                    ref_type: attr(&attrs, "RefType").map(|t| limited(&t, 22)),
                    ..Comment::default()
                })
            }
            "MedlineJournalInfo" => self.journal_info = Some(JournalInfo::default()),
            "DataBank" => self.databank_name = None,
            "SupplMeshName" => {
                self.suppl_ui = attr(&attrs, "UI");
                self.suppl_type = attr(&attrs, "Type");
            }
            _ => {
                if parent == Some("PersonalNameSubjectList") {
                    self.person = Some(PersonScratch::new(PersonKind::PersonalName));
                } else if parent == Some("InvestigatorList") {
                    self.person = Some(PersonScratch::new(PersonKind::Investigator));
                }
            }
        }
        self.stack.push(name.to_string());
    }

    fn open_date(&mut self, ctx: DateCtx) {
        self.date_ctx = Some(ctx);
        self.date = DateParts::default();
    }

    fn end(&mut self, name: &str) {
        self.stack.pop();
        let text = std::mem::take(&mut self.text);
        // Owned copy: the arms below mutate `self` while routing on it.
        let parent_owned = self.stack.last().cloned();
        let parent = parent_owned.as_deref();

        match name {
            "PMID" => {
                if parent.is_none() {
                    if self.pmid.is_none() {
                        self.pmid = text.trim().parse().ok();
                    }
                } else if parent == Some("CommentsCorrections") {
                    if let Some(c) = &mut self.comment {
                        c.ref_pmid = Some(text);
                    }
                }
            }
            "Year" if self.date_ctx.is_some() => self.date.year = Some(text),
            "Month" if self.date_ctx.is_some() => self.date.month = Some(text),
            "Day" if self.date_ctx.is_some() => self.date.day = Some(text),
            "MedlineDate" if parent == Some("PubDate") => {
                self.citation.journal.medline_date = Some(limited(&text, 40));
            }
            "DateCreated" => self.citation.date_created = self.close_calendar_date(),
            "DateCompleted" => self.citation.date_completed = self.close_calendar_date(),
            "DateRevised" => self.citation.date_revised = self.close_calendar_date(),
            "PubDate" => self.close_pub_date(),
            "ArticleDate" => self.close_article_date(),
            "Volume" if matches!(parent, Some("JournalIssue") | Some("Book")) => {
                self.citation.journal.volume = Some(text);
            }
            "Issue" if matches!(parent, Some("JournalIssue") | Some("Book")) => {
                self.citation.journal.issue = Some(text);
            }
            "ISSN" => {
                self.citation.journal.issn = Some(text);
                self.citation.journal.issn_type = self.issn_type.take();
            }
            "Title" if parent == Some("Journal") => {
                self.citation.journal.title = Some(text);
            }
            "ISOAbbreviation" if parent == Some("Journal") => {
                self.citation.journal.iso_abbreviation = Some(text);
            }
            "ArticleTitle" | "BookTitle" => self.citation.article_title = Some(text),
            "MedlinePgn" => self.citation.medline_pgn = Some(text),
            "NumberOfReferences" => self.citation.number_of_references = Some(text),
            "VernacularTitle" => self.citation.vernacular_title = Some(text),
            "Affiliation" => match &mut self.person {
                Some(p) if p.kind == PersonKind::Investigator => {
                    p.affiliation = Some(text);
                }
                _ => self.citation.article_affiliation = Some(limited(&text, 2000)),
            },
            "LastName" => {
                if let Some(p) = &mut self.person {
                    p.last_name = Some(text);
                }
            }
            "ForeName" => {
                if let Some(p) = &mut self.person {
                    p.fore_name = Some(match p.kind {
                        PersonKind::Author => limited(&text, 100),
                        _ => text,
                    });
                }
            }
            "Initials" => {
                if let Some(p) = &mut self.person {
                    p.initials = Some(match p.kind {
                        PersonKind::Author => limited_lower(&text, 20),
                        PersonKind::PersonalName => limited_lower(&text, 10),
                        PersonKind::Investigator => text,
                    });
                }
            }
            "Suffix" => {
                if let Some(p) = &mut self.person {
                    p.suffix = Some(match p.kind {
                        PersonKind::Author => limited_lower(&text, 20),
                        _ => text,
                    });
                }
            }
            "CollectiveName" => {
                if let Some(p) = &mut self.person {
                    p.collective_name = Some(text);
                }
            }
            "Author" if parent == Some("AuthorList") => self.close_person(),
            "SpaceFlightMission" => self.citation.space_flights.push(text),
            "GeneralNote" => self.citation.notes.push(Note {
                owner: self.note_owner.take(),
                note: Some(text),
            }),
            "RegistryNumber" => {
                if let Some(c) = &mut self.chemical {
                    c.registry_number = Some(text);
                }
            }
            "NameOfSubstance" => {
                if let Some(c) = &mut self.chemical {
                    c.name_of_substance = Some(text);
                }
            }
            "Chemical" => {
                if let Some(c) = self.chemical.take() {
                    self.citation.chemicals.push(c);
                }
            }
            "GeneSymbol" => self.citation.gene_symbols.push(limited(&text, 40)),
            "RefSource" if parent == Some("CommentsCorrections") => {
                if let Some(c) = &mut self.comment {
                    c.ref_source = Some(limited(&text, 255));
                }
            }
            "CommentsCorrections" => {
                if let Some(c) = self.comment.take() {
                    self.citation.comments.push(c);
                }
            }
            "NlmUniqueID" => {
                if let Some(j) = &mut self.journal_info {
                    j.nlm_unique_id = Some(text);
                }
            }
            "Country" if parent == Some("MedlineJournalInfo") => {
                if let Some(j) = &mut self.journal_info {
                    j.country = Some(text);
                }
            }
            "Country" if parent == Some("Grant") => {
                if let Some(g) = &mut self.grant {
                    g.country = Some(text);
                }
            }
            // An empty <MedlineTA/> is present-but-blank in the source;
            // keep the sentinel the store expects.
            "MedlineTA" => {
                if let Some(j) = &mut self.journal_info {
                    j.medline_ta = Some(if text.is_empty() {
                        "unknown".to_string()
                    } else {
                        text
                    });
                }
            }
            "MedlineJournalInfo" => {
                if let Some(j) = self.journal_info.take() {
                    self.citation.journal_infos.push(j);
                }
            }
            "CitationSubset" => self.citation.citation_subsets.push(text),
            "DescriptorName" if parent == Some("MeshHeading") => {
                if let Some(m) = &mut self.mesh {
                    m.descriptor_name = Some(text);
                }
            }
            "QualifierName" => {
                // Qualifiers inherit their heading's descriptor name.
                self.citation.qualifiers.push(Qualifier {
                    descriptor_name: self
                        .mesh
                        .as_ref()
                        .and_then(|m| m.descriptor_name.clone()),
                    qualifier_name: Some(text),
                    major_topic: self.qualifier_major.take(),
                    qualifier_ui: self.qualifier_ui.take(),
                });
            }
            "MeshHeading" => {
                if let Some(m) = self.mesh.take() {
                    self.citation.mesh_headings.push(m);
                }
            }
            "GrantID" => {
                if let Some(g) = &mut self.grant {
                    g.grant_id = Some(text);
                }
            }
            "Acronym" => {
                if let Some(g) = &mut self.grant {
                    g.acronym = Some(text);
                }
            }
            "Agency" => {
                if let Some(g) = &mut self.grant {
                    g.agency = Some(text);
                }
            }
            "Grant" => {
                if let Some(g) = self.grant.take() {
                    self.citation.grants.push(g);
                }
            }
            "DataBankName" => {
                self.citation.databanks.push(text.clone());
                self.databank_name = Some(text);
            }
            "AccessionNumber" => self.citation.accessions.push(Accession {
                data_bank_name: self.databank_name.clone(),
                accession_number: text,
            }),
            "Language" => self.citation.languages.push(text),
            "PublicationType" => self.citation.publication_types.push(text),
            "AbstractText" => {
                if self.in_other_abstract {
                    self.other_abstract_text = Some(text);
                } else if self.in_abstract {
                    self.close_abstract_segment(text);
                }
            }
            "CopyrightInformation" if parent == Some("Abstract") => {
                self.citation.copyright_information = Some(text);
            }
            "Abstract" if self.in_abstract => self.close_abstract(),
            "OtherAbstract" => {
                self.in_other_abstract = false;
                if let Some(t) = self.other_abstract_text.take() {
                    self.citation.other_abstracts.push(t);
                }
            }
            "OtherID" => self.citation.other_ids.push(OtherId {
                other_id: limited(&text, 80),
                source: self.other_id_source.take(),
            }),
            "Keyword" => {
                let major = self.keyword_major.take();
                // Some documents repeat a keyword; the first occurrence
                // and its flag win.
                if !self.citation.keywords.iter().any(|k| k.keyword == text) {
                    self.citation.keywords.push(Keyword {
                        keyword: text,
                        major_topic: major,
                    });
                }
            }
            "SupplMeshName" => self.citation.suppl_mesh_names.push(SupplMeshName {
                suppl_mesh_name: limited(&text, 80),
                ui: self.suppl_ui.take(),
                mesh_type: self.suppl_type.take(),
            }),
            _ => {}
        }

        if self.person.is_some()
            && matches!(
                parent,
                Some("PersonalNameSubjectList") | Some("InvestigatorList")
            )
        {
            self.close_person();
        }
    }

    fn close_calendar_date(&mut self) -> Option<chrono::NaiveDate> {
        self.date_ctx = None;
        resolve_date(
            self.date.year.as_deref(),
            self.date.month.as_deref(),
            self.date.day.as_deref(),
        )
    }

    /// Journal issue date: explicit parts win; without a `Year` the first
    /// four characters of the free-text `MedlineDate` stand in.
    fn close_pub_date(&mut self) {
        self.date_ctx = None;
        let journal = &mut self.citation.journal;
        if let Some(month) = self.date.month.take() {
            journal.pub_date_month = Some(
                month_number(&month)
                    .map(str::to_string)
                    .unwrap_or(month),
            );
        }
        if let Some(day) = self.date.day.take() {
            journal.pub_date_day = Some(day);
        }
        match self.date.year.take() {
            Some(year) => journal.pub_date_year = Some(year),
            None => {
                let fallback: Option<String> = journal
                    .medline_date
                    .as_ref()
                    .map(|md| md.chars().take(4).collect())
                    .filter(|y: &String| y.len() == 4);
                match fallback {
                    Some(year) => journal.pub_date_year = Some(year),
                    None => warn!(
                        pmid = ?self.pmid,
                        "journal publication date has no resolvable year"
                    ),
                }
            }
        }
    }

    /// `ArticleDate` carries explicit year/month/day and overrides the
    /// issue date parts it names.
    fn close_article_date(&mut self) {
        self.date_ctx = None;
        let journal = &mut self.citation.journal;
        if let Some(year) = self.date.year.take() {
            journal.pub_date_year = Some(year);
        }
        if let Some(month) = self.date.month.take() {
            journal.pub_date_month = Some(month);
        }
        if let Some(day) = self.date.day.take() {
            journal.pub_date_day = Some(day);
        }
    }

    fn close_person(&mut self) {
        let Some(p) = self.person.take() else { return };
        match p.kind {
            PersonKind::Author => self.citation.authors.push(Author {
                last_name: p.last_name,
                fore_name: p.fore_name,
                initials: p.initials,
                suffix: p.suffix,
                collective_name: p.collective_name,
            }),
            PersonKind::PersonalName => self.citation.personal_names.push(PersonalName {
                last_name: p.last_name,
                fore_name: p.fore_name,
                initials: p.initials,
                suffix: p.suffix,
            }),
            PersonKind::Investigator => self.citation.investigators.push(Investigator {
                last_name: p.last_name,
                fore_name: p.fore_name,
                initials: p.initials,
                suffix: p.suffix,
                affiliation: p.affiliation,
            }),
        }
    }

    fn close_abstract_segment(&mut self, text: String) {
        let label = self.current_segment.take().unwrap_or(SegmentLabel::Bare);
        if text.is_empty() {
            return;
        }
        if self.abstract_pieces.is_empty() {
            self.first_segment_raw = Some(text.clone());
        }
        let piece = match label {
            SegmentLabel::Bare | SegmentLabel::Unlabelled => format!("{text}\n"),
            SegmentLabel::Label(l) => format!("{l}:\n{text}\n"),
        };
        self.abstract_pieces.push(piece);
    }

    fn close_abstract(&mut self) {
        self.in_abstract = false;
        // A lone segment is taken verbatim; labels only matter once the
        // abstract is split into sections.
        let composed = if self.abstract_pieces.len() == 1 {
            self.first_segment_raw.take().unwrap_or_default()
        } else {
            self.abstract_pieces.concat()
        };
        self.abstract_pieces.clear();
        self.first_segment_raw = None;
        self.citation.abstract_text = Some(composed);
    }

    fn finish(mut self) -> Result<Citation, IngestError> {
        let pmid = self.pmid.ok_or(IngestError::MissingPmid)?;
        self.citation.pmid = pmid;
        Ok(self.citation)
    }
}
