//! Structured document model edited by the authoring session.
//!
//! The model mirrors the form: title, authors, affiliations, sections made of
//! blocks, and a flat bag of scalar metadata. It round-trips through the
//! `form_data.json` snapshot, so field names follow that file's layout.
//!
//! Affiliation references on authors are stable IDs; positional `AF-n` tokens
//! only exist in generated output.

mod snapshot;

pub use snapshot::Snapshot;

use serde::{Deserialize, Serialize};

/// A complete document as entered in the form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    pub title: String,
    pub authors: Vec<Author>,
    pub affiliations: Vec<Affiliation>,
    pub sections: Vec<Section>,
    #[serde(flatten)]
    pub meta: Metadata,
}

/// Scalar metadata and formatting options.
///
/// Empty strings and `None` mean "unset"; the generator supplies defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub running_head: String,
    pub author_notes: String,
    pub course: String,
    pub instructor: String,
    pub due_date: String,
    #[serde(rename = "abstract")]
    pub summary: String,
    /// Comma-separated keyword list.
    pub keywords: String,
    pub font_family: String,
    pub font_size: Option<u32>,
    pub paper_size: String,
    pub region: String,
    pub language: String,
    pub implicit_intro: bool,
    pub abstract_as_desc: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Author {
    pub name: String,
    /// ORCID iD; empty when the author has none.
    pub orcid: String,
    #[serde(rename = "affiliationIds")]
    pub affiliation_ids: Vec<String>,
}

impl Author {
    pub fn orcid(&self) -> Option<&str> {
        let orcid = self.orcid.trim();
        (!orcid.is_empty()).then_some(orcid)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Affiliation {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Section {
    pub id: String,
    pub title: String,
    /// 1 = top-level; deeper levels nest under the preceding top-level section.
    pub level: u32,
    pub blocks: Vec<Block>,
    /// Flat markup body from before sections had blocks. Used when `blocks`
    /// is empty.
    pub content: String,
}

impl Default for Section {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            level: 1,
            blocks: Vec::new(),
            content: String::new(),
        }
    }
}

impl Section {
    /// Heading depth; level 0 is treated as top-level.
    pub fn depth(&self) -> u32 {
        self.level.max(1)
    }

    pub fn is_top_level(&self) -> bool {
        self.depth() == 1
    }
}

/// A unit of section content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    Text {
        #[serde(default)]
        content: String,
    },
    Image(ImageBlock),
}

/// A figure: image reference plus caption, note and cross-reference label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageBlock {
    /// Project-relative image path.
    pub path: String,
    pub caption: String,
    pub note: String,
    /// Cross-reference label; the generator replaces an empty or malformed one.
    pub label: String,
}

impl Document {
    /// Iterate over image blocks mutably, in document order.
    pub fn images_mut(&mut self) -> impl Iterator<Item = &mut ImageBlock> {
        self.sections
            .iter_mut()
            .flat_map(|section| section.blocks.iter_mut())
            .filter_map(|block| match block {
                Block::Image(image) => Some(image),
                Block::Text { .. } => None,
            })
    }

    /// Carry labels already assigned in `previous` over to unlabeled images.
    ///
    /// An image inherits a label when the section with the same ID has an
    /// image at the same block position with the same path. Editing sessions
    /// that resend the whole form therefore keep their figure labels stable.
    pub fn adopt_labels(&mut self, previous: &Document) {
        for section in &mut self.sections {
            let Some(old) = previous.sections.iter().find(|s| s.id == section.id) else {
                continue;
            };

            for (block, old_block) in section.blocks.iter_mut().zip(&old.blocks) {
                if let (Block::Image(image), Block::Image(old_image)) = (block, old_block)
                    && image.label.is_empty()
                    && !old_image.label.is_empty()
                    && image.path == old_image.path
                {
                    image.label = old_image.label.clone();
                }
            }
        }
    }
}
