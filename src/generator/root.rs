//! Root document rendering.
//!
//! The root file is a fixed sequence of groups, each present only when it
//! has something to say:
//!
//! ```text
//! import, title
//! #show: versatile-apa.with(
//!   authors/affiliations    both lists non-empty
//!   student fields          course, instructor or due date set
//!   professional fields     running head or author notes set
//!   abstract/keywords       either set
//!   common fields           always, with defaults
//! )
//! outlines
//! #include per section run
//! bibliography
//! ```

use super::escape::{escape_markup, escape_string};
use super::section::file_runs;
use crate::config::DocumentConfig;
use crate::document::{Affiliation, Author, Document, Metadata};

const DEFAULT_FONT_FAMILY: &str = "Times New Roman";
const DEFAULT_FONT_SIZE: u32 = 12;
const DEFAULT_REGION: &str = "us";
const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_PAPER_SIZE: &str = "us-letter";

/// Outline targets, each followed by a page break.
const OUTLINES: &[&str] = &[
    "#outline()",
    "#outline(target: figure.where(kind: table), title: [Tables])",
    "#outline(target: figure.where(kind: image), title: [Figures])",
    "#outline(target: figure.where(kind: math.equation), title: [Equations])",
    "#outline(target: figure.where(kind: raw), title: [Listings])",
];

/// Render the root document.
pub fn render_root(doc: &Document, config: &DocumentConfig) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(64);

    lines.push(config.import_line());
    lines.push(String::new());

    lines.push("// Document titles should be formatted in title case".into());
    lines.push(format!("#let doc-title = [{}]", escape_markup(&doc.title)));
    lines.push(String::new());

    lines.push("#show: versatile-apa.with(".into());
    lines.push("  title: doc-title,".into());
    lines.push(String::new());

    if !doc.authors.is_empty() && !doc.affiliations.is_empty() {
        push_authors(&mut lines, &doc.authors, &doc.affiliations);
    }
    push_student(&mut lines, &doc.meta);
    push_professional(&mut lines, &doc.meta, &doc.authors);
    push_abstract(&mut lines, &doc.meta);
    push_common(&mut lines, &doc.meta);
    lines.push(")".into());
    lines.push(String::new());

    lines.push("// Document outlines".into());
    for outline in OUTLINES {
        lines.push((*outline).into());
        lines.push("#pagebreak()".into());
    }
    lines.push(String::new());

    lines.push("// Main document content".into());
    for range in file_runs(&doc.sections).into_iter().flatten() {
        let id = &doc.sections[range.start].id;
        lines.push(format!("#include \"{}/{}.typ\"", config.sections_dir, id));
    }
    lines.push(String::new());

    lines.push("#pagebreak()".into());
    lines.push("#bibliography(".into());
    lines.push(format!("  \"{}\",", escape_string(&config.bibliography)));
    lines.push(format!("  style: \"{}\",", escape_string(&config.csl)));
    lines.push("  full: true,".into());
    lines.push("  title: auto,".into());
    lines.push(")".into());

    lines.join("\n")
}

/// Positional token of the affiliation with `id`, if it exists.
pub fn affiliation_token(affiliations: &[Affiliation], id: &str) -> Option<String> {
    affiliations
        .iter()
        .position(|aff| aff.id == id)
        .map(|idx| format!("AF-{}", idx + 1))
}

fn push_authors(lines: &mut Vec<String>, authors: &[Author], affiliations: &[Affiliation]) {
    lines.push("  // Authors and affiliations".into());
    lines.push("  authors: (".into());

    // the template requires at least one affiliation per author
    for author in authors {
        if author.name.is_empty() || author.affiliation_ids.is_empty() {
            continue;
        }

        lines.push("    (".into());
        lines.push(format!("      name: [{}],", escape_markup(&author.name)));

        let tokens: Vec<String> = author
            .affiliation_ids
            .iter()
            .filter_map(|id| affiliation_token(affiliations, id))
            .map(|token| format!("\"{token}\""))
            .collect();
        if !tokens.is_empty() {
            lines.push(format!("      affiliations: ({}),", tokens.join(", ")));
        }

        lines.push("    ),".into());
    }
    lines.push("  ),".into());

    lines.push("  affiliations: (".into());
    for (idx, affiliation) in affiliations.iter().enumerate() {
        if affiliation.name.is_empty() {
            continue;
        }
        lines.push("    (".into());
        lines.push(format!("      id: \"AF-{}\",", idx + 1));
        lines.push(format!("      name: [{}],", escape_markup(&affiliation.name)));
        lines.push("    ),".into());
    }
    lines.push("  ),".into());
    lines.push(String::new());
}

fn push_student(lines: &mut Vec<String>, meta: &Metadata) {
    if meta.course.is_empty() && meta.instructor.is_empty() && meta.due_date.is_empty() {
        return;
    }

    lines.push("  // Student-specific fields".into());
    if !meta.course.is_empty() {
        lines.push(format!("  course: [{}],", escape_markup(&meta.course)));
    }
    if !meta.instructor.is_empty() {
        lines.push(format!("  instructor: [{}],", escape_markup(&meta.instructor)));
    }
    if meta.due_date.is_empty() {
        lines.push("  due-date: datetime.today().display(),".into());
    } else {
        lines.push(format!("  due-date: [{}],", escape_markup(&meta.due_date)));
    }
    lines.push(String::new());
}

fn push_professional(lines: &mut Vec<String>, meta: &Metadata, authors: &[Author]) {
    if meta.running_head.is_empty() && meta.author_notes.is_empty() {
        return;
    }

    lines.push("  // Professional-specific fields".into());
    if !meta.running_head.is_empty() {
        lines.push(format!("  running-head: [{}],", escape_markup(&meta.running_head)));
    }
    if !meta.author_notes.is_empty() {
        lines.push("  author-notes: [".into());
        for author in authors.iter().filter(|a| !a.name.is_empty()) {
            if let Some(orcid) = author.orcid() {
                lines.push(format!(
                    "    #include-orcid([{}], \"{}\")",
                    escape_markup(&author.name),
                    escape_string(orcid)
                ));
                lines.push(String::new());
            }
        }
        lines.push(format!("    {}", escape_markup(&meta.author_notes)));
        lines.push("  ],".into());
    }
    lines.push(String::new());
}

fn push_abstract(lines: &mut Vec<String>, meta: &Metadata) {
    if meta.summary.is_empty() && meta.keywords.is_empty() {
        return;
    }

    if !meta.summary.is_empty() {
        lines.push(format!("  abstract: [{}],", escape_markup(&meta.summary)));
    }
    if !meta.keywords.is_empty() {
        lines.push(format!("  keywords: {},", keyword_list(&meta.keywords)));
    }
    lines.push(String::new());
}

/// Comma-separated keywords as an array of string literals.
pub fn keyword_list(keywords: &str) -> String {
    let quoted: Vec<String> = keywords
        .split(',')
        .map(str::trim)
        .filter(|kw| !kw.is_empty())
        .map(|kw| format!("\"{}\"", escape_string(kw)))
        .collect();
    format!("({})", quoted.join(", "))
}

fn push_common(lines: &mut Vec<String>, meta: &Metadata) {
    let or_default = |value: &str, default: &'static str| -> String {
        let value = value.trim();
        escape_string(if value.is_empty() { default } else { value }).into_owned()
    };

    lines.push("  // Common fields".into());
    lines.push(format!(
        "  font-family: \"{}\",",
        or_default(&meta.font_family, DEFAULT_FONT_FAMILY)
    ));
    lines.push(format!(
        "  font-size: {}pt,",
        meta.font_size.filter(|&size| size > 0).unwrap_or(DEFAULT_FONT_SIZE)
    ));
    lines.push(format!("  region: \"{}\",", or_default(&meta.region, DEFAULT_REGION)));
    lines.push(format!(
        "  language: \"{}\",",
        or_default(&meta.language, DEFAULT_LANGUAGE)
    ));
    lines.push(format!(
        "  paper-size: \"{}\",",
        or_default(&meta.paper_size, DEFAULT_PAPER_SIZE)
    ));
    lines.push(format!("  implicit-introduction-heading: {},", meta.implicit_intro));
    lines.push(format!("  abstract-as-description: {},", meta.abstract_as_desc));
}
