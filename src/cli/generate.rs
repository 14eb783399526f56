//! `ergo generate`: one generation pass outside a preview session.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::ProjectConfig;
use crate::document::Document;
use crate::generator::Generator;
use crate::log;

pub fn generate(config: &ProjectConfig, from: Option<&Path>) -> Result<()> {
    let generator = Generator::new(config.get_root(), config.document.clone());
    let saved = match generator.snapshot() {
        Some(snapshot) => snapshot.load()?,
        None => None,
    };

    let mut doc = match (from, saved) {
        (Some(path), saved) => {
            let mut doc = read_document(path)?;
            // keep the labels of figures that were generated before
            if let Some(saved) = saved {
                doc.adopt_labels(&saved);
            }
            doc
        }
        (None, Some(saved)) => saved,
        (None, None) => {
            log!("warning"; "no form data found, generating an empty document");
            Document::default()
        }
    };

    let report = generator.generate(&mut doc)?;
    log!(
        "generate";
        "wrote {} with {} section file(s)",
        report.root.display(),
        report.sections
    );
    Ok(())
}

fn read_document(path: &Path) -> Result<Document> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read `{}`", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Malformed document `{}`", path.display()))
}
