//! Section run rendering.
//!
//! A run is a level-1 section plus every deeper section that follows it
//! until the next level-1 section. Each run becomes one source file named
//! after its leading section.

use std::ops::Range;

use rustc_hash::FxHashSet;
use thiserror::Error;
use uuid::Uuid;

use super::escape::{escape_markup, escape_string};
use crate::config::DocumentConfig;
use crate::document::{Block, Document, ImageBlock, Section};
use crate::{debug, log};

/// A run that gets no file of its own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkippedRun {
    #[error("section id `{0}` cannot name a file, run skipped")]
    InvalidId(String),

    #[error("section id `{0}` already names an earlier run, run skipped")]
    DuplicateId(String),
}

/// A rendered run file, relative to the sections directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionFile {
    /// ID of the leading section; also the file stem.
    pub id: String,
    pub content: String,
}

impl SectionFile {
    pub fn file_name(&self) -> String {
        format!("{}.typ", self.id)
    }
}

/// Whether a section ID can name a file inside the sections directory.
pub fn is_valid_file_id(id: &str) -> bool {
    !id.is_empty() && !id.contains(['/', '\\']) && !id.contains("..")
}

/// Group sections into runs, returning the index range of each.
///
/// Deeper sections before the first level-1 section belong to no run.
pub fn runs(sections: &[Section]) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = None;

    for (i, section) in sections.iter().enumerate() {
        if section.is_top_level() {
            if let Some(s) = start {
                runs.push(s..i);
            }
            start = Some(i);
        } else if start.is_none() {
            debug!("generate"; "section `{}` precedes any top-level section, skipped", section.id);
        }
    }

    if let Some(s) = start {
        runs.push(s..sections.len());
    }
    runs
}

/// Runs in document order, each either written to its own file or skipped.
///
/// The first run with a given ID owns the file; later runs with the same
/// ID are skipped.
pub fn file_runs(sections: &[Section]) -> Vec<Result<Range<usize>, SkippedRun>> {
    let mut taken = FxHashSet::default();
    runs(sections)
        .into_iter()
        .map(|range| {
            let id = &sections[range.start].id;
            if !is_valid_file_id(id) {
                Err(SkippedRun::InvalidId(id.clone()))
            } else if !taken.insert(id.as_str()) {
                Err(SkippedRun::DuplicateId(id.clone()))
            } else {
                Ok(range)
            }
        })
        .collect()
}

/// Whether `label` can be written as a `<label>` in markup.
pub fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '.'))
}

/// Give every image block a usable label, keeping valid ones.
///
/// Returns the number of labels assigned.
pub fn assign_labels(doc: &mut Document) -> usize {
    let mut assigned = 0;
    for image in doc.images_mut() {
        if is_valid_label(&image.label) {
            continue;
        }
        if !image.label.is_empty() {
            log!("warning"; "image label `{}` is not a valid label, replaced", image.label);
        }
        image.label = format!("img:{}", Uuid::new_v4());
        assigned += 1;
    }
    assigned
}

/// Render every run into its file content.
///
/// Labels are assigned first, so the returned content always references
/// the labels stored back into `doc`. Skipped runs are logged and left
/// out.
pub fn render_sections(doc: &mut Document, config: &DocumentConfig) -> Vec<SectionFile> {
    assign_labels(doc);

    let import_line = config.import_line();
    // `None` is rejected when the config is loaded
    let root_prefix = config.root_prefix().unwrap_or_default();

    file_runs(&doc.sections)
        .into_iter()
        .filter_map(|run| {
            let range = match run {
                Ok(range) => range,
                Err(skipped) => {
                    log!("warning"; "{}", skipped);
                    return None;
                }
            };
            let members = &doc.sections[range];

            let mut parts = Vec::with_capacity(members.len() + 1);
            parts.push(import_line.clone());
            parts.extend(members.iter().map(|section| render_section(section, &root_prefix)));

            Some(SectionFile {
                id: members[0].id.clone(),
                content: parts.join("\n\n"),
            })
        })
        .collect()
}

/// Heading plus body of one section.
fn render_section(section: &Section, root_prefix: &str) -> String {
    let heading = format!(
        "{} {}",
        "=".repeat(section.depth() as usize),
        escape_markup(&section.title)
    );
    format!("{heading}\n\n{}", render_body(section, root_prefix))
}

fn render_body(section: &Section, root_prefix: &str) -> String {
    if section.blocks.is_empty() {
        return section.content.clone();
    }

    section
        .blocks
        .iter()
        .map(|block| match block {
            Block::Text { content } => content.clone(),
            Block::Image(image) => render_figure(image, root_prefix),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render an image block as a figure with an optional note below it.
///
/// Image paths are project-relative; `root_prefix` leads from the section
/// file back to the project root.
pub fn render_figure(image: &ImageBlock, root_prefix: &str) -> String {
    let path = image.path.replace('\\', "/");

    let mut out = String::from("#figure(\n");
    out.push_str(&format!(
        "  image(\"{}{}\"),\n",
        root_prefix,
        escape_string(&path)
    ));
    if !image.caption.is_empty() {
        out.push_str(&format!("  caption: [{}],\n", escape_markup(&image.caption)));
    }
    out.push(')');

    if is_valid_label(&image.label) {
        out.push_str(&format!(" <{}>", image.label));
    }

    if !image.note.is_empty() {
        out.push_str("\n#pad(top: 0.5em)[\n");
        out.push_str(&format!(
            "  #text(style: \"italic\")[Note.] {}\n",
            escape_markup(&image.note)
        ));
        out.push(']');
    }
    out
}
