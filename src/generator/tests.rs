use std::fs;

use tempfile::TempDir;

use super::*;
use crate::document::{Affiliation, Author, Block, ImageBlock, Section};

fn section(id: &str, title: &str, level: u32, blocks: Vec<Block>) -> Section {
    Section {
        id: id.into(),
        title: title.into(),
        level,
        blocks,
        content: String::new(),
    }
}

fn text(content: &str) -> Block {
    Block::Text {
        content: content.into(),
    }
}

fn image(path: &str) -> Block {
    Block::Image(ImageBlock {
        path: path.into(),
        ..Default::default()
    })
}

fn sample() -> Document {
    let mut doc = Document {
        title: "Effects of [Sleep] on #Memory".into(),
        authors: vec![
            Author {
                name: "Ada Lovelace".into(),
                orcid: "0000-0002-1825-0097".into(),
                affiliation_ids: vec!["uni".into(), "lab".into()],
            },
            Author {
                name: "No Affiliation".into(),
                ..Default::default()
            },
            Author {
                name: "Dangling".into(),
                affiliation_ids: vec!["gone".into()],
                ..Default::default()
            },
        ],
        affiliations: vec![
            Affiliation {
                id: "lab".into(),
                name: "Sleep Lab".into(),
            },
            Affiliation {
                id: "uni".into(),
                name: "University".into(),
            },
        ],
        sections: vec![
            section("intro", "Introduction", 1, vec![text("Intro text.")]),
            section("bg", "Background", 2, vec![image("img\\fig1.png")]),
            section("method", "Method", 1, vec![text("Method text.")]),
        ],
        ..Default::default()
    };
    doc.meta.summary = "Costs $5".into();
    doc.meta.keywords = "sleep, memory,, ".into();
    doc
}

/// Config whose import line is `#import "x": *`.
fn bare_config() -> DocumentConfig {
    DocumentConfig {
        package: "x".into(),
        ..Default::default()
    }
}

fn generator(temp: &TempDir) -> Generator {
    Generator::new(temp.path(), DocumentConfig::default())
}

#[test]
fn test_unconfigured_writes_nothing() {
    let generator = Generator::unconfigured(DocumentConfig::default());
    let mut doc = sample();

    assert!(matches!(
        generator.generate(&mut doc),
        Err(GenerateError::NotConfigured)
    ));
    assert!(doc.images_mut().all(|img| img.label.is_empty()));
}

#[test]
fn test_one_file_per_top_level_run() {
    let temp = TempDir::new().unwrap();
    let mut doc = sample();

    let report = generator(&temp).generate(&mut doc).unwrap();

    assert_eq!(report.sections, 2);
    assert_eq!(report.root, temp.path().join("main.typ"));
    assert!(report.snapshot_warning.is_none());

    let mut names: Vec<_> = fs::read_dir(temp.path().join("sections"))
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, vec!["intro.typ", "method.typ"]);
    assert!(temp.path().join("form_data.json").exists());
}

#[test]
fn test_run_concatenates_nested_sections() {
    let temp = TempDir::new().unwrap();
    let mut doc = sample();
    generator(&temp).generate(&mut doc).unwrap();

    let intro = fs::read_to_string(temp.path().join("sections/intro.typ")).unwrap();
    let label = &doc.images_mut().next().unwrap().label;

    let expected = format!(
        "#import \"@preview/versatile-apa:7.1.5\": *\n\n\
         = Introduction\n\nIntro text.\n\n\
         == Background\n\n#figure(\n  image(\"../img/fig1.png\"),\n) <{label}>"
    );
    assert_eq!(intro, expected);
}

#[test]
fn test_regeneration_is_byte_identical() {
    let temp = TempDir::new().unwrap();
    let generator = generator(&temp);
    let mut doc = sample();

    generator.generate(&mut doc).unwrap();
    let first_root = fs::read_to_string(temp.path().join("main.typ")).unwrap();
    let first_intro = fs::read_to_string(temp.path().join("sections/intro.typ")).unwrap();
    let labels: Vec<_> = doc.images_mut().map(|img| img.label.clone()).collect();

    generator.generate(&mut doc).unwrap();
    assert_eq!(fs::read_to_string(temp.path().join("main.typ")).unwrap(), first_root);
    assert_eq!(
        fs::read_to_string(temp.path().join("sections/intro.typ")).unwrap(),
        first_intro
    );
    let again: Vec<_> = doc.images_mut().map(|img| img.label.clone()).collect();
    assert_eq!(labels, again);
}

#[test]
fn test_label_assigned_once() {
    let mut doc = sample();
    let config = DocumentConfig::default();

    render_sections(&mut doc, &config);
    let label = doc.images_mut().next().unwrap().label.clone();
    assert!(label.starts_with("img:"));
    assert_eq!(label.len(), "img:".len() + 36);

    render_sections(&mut doc, &config);
    assert_eq!(doc.images_mut().next().unwrap().label, label);
}

#[test]
fn test_authors_mapped_to_positional_tokens() {
    let root = render_root(&sample(), &DocumentConfig::default());

    // "uni" is second, "lab" first in the affiliation list
    assert!(root.contains("      name: [Ada Lovelace],\n      affiliations: (\"AF-2\", \"AF-1\"),"));
    assert!(root.contains("      id: \"AF-1\",\n      name: [Sleep Lab],"));
    assert!(root.contains("      id: \"AF-2\",\n      name: [University],"));
    assert!(!root.contains("No Affiliation"));

    // dangling references are dropped, the author stays
    assert!(root.contains("      name: [Dangling],\n    ),"));
}

#[test]
fn test_authors_group_needs_both_lists() {
    let mut doc = sample();
    doc.affiliations.clear();

    let root = render_root(&doc, &DocumentConfig::default());
    assert!(!root.contains("authors: ("));
    assert!(!root.contains("Ada Lovelace"));
}

#[test]
fn test_title_and_abstract_escaped() {
    let root = render_root(&sample(), &DocumentConfig::default());

    assert!(root.contains("#let doc-title = [Effects of \\[Sleep\\] on \\#Memory]"));
    assert!(root.contains("  abstract: [Costs \\$5],"));
    assert!(root.contains("  keywords: (\"sleep\", \"memory\"),"));
}

#[test]
fn test_common_fields_defaults() {
    let root = render_root(&Document::default(), &DocumentConfig::default());

    let expected = [
        "  // Common fields",
        "  font-family: \"Times New Roman\",",
        "  font-size: 12pt,",
        "  region: \"us\",",
        "  language: \"en\",",
        "  paper-size: \"us-letter\",",
        "  implicit-introduction-heading: false,",
        "  abstract-as-description: false,",
        ")",
    ]
    .join("\n");
    assert!(root.contains(&expected), "{root}");
}

#[test]
fn test_common_fields_from_model() {
    let mut doc = Document::default();
    doc.meta.font_family = "Libertinus \"Serif\"".into();
    doc.meta.font_size = Some(11);
    doc.meta.paper_size = "a4".into();
    doc.meta.implicit_intro = true;
    doc.meta.abstract_as_desc = true;

    let root = render_root(&doc, &DocumentConfig::default());
    assert!(root.contains("  font-family: \"Libertinus \\\"Serif\\\"\","));
    assert!(root.contains("  font-size: 11pt,"));
    assert!(root.contains("  paper-size: \"a4\","));
    assert!(root.contains("  implicit-introduction-heading: true,"));
    assert!(root.contains("  abstract-as-description: true,"));
}

#[test]
fn test_student_group_default_due_date() {
    let mut doc = Document::default();
    doc.meta.course = "PSY 101".into();

    let root = render_root(&doc, &DocumentConfig::default());
    assert!(root.contains("  // Student-specific fields\n  course: [PSY 101],\n  due-date: datetime.today().display(),"));
    assert!(!root.contains("instructor:"));

    let root = render_root(&Document::default(), &DocumentConfig::default());
    assert!(!root.contains("Student-specific"));
}

#[test]
fn test_author_notes_with_orcid() {
    let mut doc = sample();
    doc.meta.author_notes = "Thanks to #all.".into();

    let root = render_root(&doc, &DocumentConfig::default());
    assert!(root.contains(
        "  author-notes: [\n    #include-orcid([Ada Lovelace], \"0000-0002-1825-0097\")\n\n    Thanks to \\#all.\n  ],"
    ));
    assert!(!root.contains("running-head"));
}

#[test]
fn test_includes_in_document_order() {
    let root = render_root(&sample(), &DocumentConfig::default());

    let intro = root.find("#include \"sections/intro.typ\"").unwrap();
    let method = root.find("#include \"sections/method.typ\"").unwrap();
    assert!(intro < method);
    assert!(!root.contains("sections/bg.typ"));
    assert!(root.ends_with(
        "#pagebreak()\n#bibliography(\n  \"bibliography/ref.bib\",\n  style: \"csl/apa.csl\",\n  full: true,\n  title: auto,\n)"
    ));
}

#[test]
fn test_orphan_subsection_skipped() {
    let mut doc = Document {
        sections: vec![
            section("orphan", "Orphan", 2, vec![text("lost")]),
            section("main", "Main", 1, vec![text("kept")]),
        ],
        ..Default::default()
    };

    let files = render_sections(&mut doc, &bare_config());
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].id, "main");
    assert!(!files[0].content.contains("lost"));
}

#[test]
fn test_unsafe_section_id_skipped() {
    let temp = TempDir::new().unwrap();
    let mut doc = Document {
        sections: vec![
            section("../escape", "Evil", 1, vec![]),
            section("", "Blank", 1, vec![]),
            section("ok", "Fine", 1, vec![]),
        ],
        ..Default::default()
    };

    let report = generator(&temp).generate(&mut doc).unwrap();
    assert_eq!(report.sections, 1);
    assert!(!temp.path().join("escape.typ").exists());

    let root = fs::read_to_string(&report.root).unwrap();
    assert!(root.contains("#include \"sections/ok.typ\""));
    assert!(!root.contains("escape"));
}

#[test]
fn test_legacy_content_used_without_blocks() {
    let mut doc = Document {
        sections: vec![Section {
            id: "old".into(),
            title: "Old".into(),
            content: "Flat *markup*".into(),
            ..Default::default()
        }],
        ..Default::default()
    };

    let files = render_sections(&mut doc, &bare_config());
    assert_eq!(files[0].content, "#import \"x\": *\n\n= Old\n\nFlat *markup*");
}

#[test]
fn test_figure_with_caption_and_note() {
    let image = ImageBlock {
        path: "figs/a.png".into(),
        caption: "Mean [SD]".into(),
        note: "Error bars show $SE".into(),
        label: "img:fixed".into(),
    };
    let figure = section::render_figure(&image, "../");

    assert_eq!(
        figure,
        "#figure(\n  image(\"../figs/a.png\"),\n  caption: [Mean \\[SD\\]],\n) <img:fixed>\n\
         #pad(top: 0.5em)[\n  #text(style: \"italic\")[Note.] Error bars show \\$SE\n]"
    );
}

#[test]
fn test_section_write_failure_reports_path() {
    let temp = TempDir::new().unwrap();
    // a file where the sections directory should be
    fs::write(temp.path().join("sections"), "").unwrap();

    let mut doc = sample();
    match generator(&temp).generate(&mut doc) {
        Err(GenerateError::Io { path, .. }) => assert!(path.ends_with("sections")),
        other => panic!("expected Io error, got {other:?}"),
    }
    assert!(!temp.path().join("main.typ").exists());
}

#[test]
fn test_snapshot_failure_is_warning() {
    let temp = TempDir::new().unwrap();
    let config = DocumentConfig {
        snapshot: "missing/form_data.json".into(),
        ..Default::default()
    };
    let generator = Generator::new(temp.path(), config);

    let report = generator.generate(&mut sample()).unwrap();
    assert!(report.snapshot_warning.is_some());
    assert!(report.root.exists());
}

#[test]
fn test_nested_sections_dir_reaches_root() {
    let temp = TempDir::new().unwrap();
    let config = DocumentConfig {
        sections_dir: "content/sections".into(),
        ..Default::default()
    };
    let mut doc = Document {
        sections: vec![section("s1", "Results", 1, vec![image("img/a.png")])],
        ..Default::default()
    };

    let report = Generator::new(temp.path(), config).generate(&mut doc).unwrap();

    let file = fs::read_to_string(temp.path().join("content/sections/s1.typ")).unwrap();
    assert!(file.contains("image(\"../../img/a.png\")"), "{file}");
    let root = fs::read_to_string(&report.root).unwrap();
    assert!(root.contains("#include \"content/sections/s1.typ\""));
}

#[test]
fn test_duplicate_run_id_skipped() {
    let temp = TempDir::new().unwrap();
    let mut doc = Document {
        sections: vec![
            section("dup", "First", 1, vec![text("first body")]),
            section("dup", "Second", 1, vec![text("second body")]),
            section("other", "Third", 1, vec![]),
        ],
        ..Default::default()
    };

    let report = generator(&temp).generate(&mut doc).unwrap();
    assert_eq!(report.sections, 2);

    let file = fs::read_to_string(temp.path().join("sections/dup.typ")).unwrap();
    assert!(file.contains("first body"));
    assert!(!file.contains("second body"));

    let root = fs::read_to_string(&report.root).unwrap();
    assert_eq!(root.matches("#include \"sections/dup.typ\"").count(), 1);
    assert!(root.contains("#include \"sections/other.typ\""));
}

#[test]
fn test_file_runs_reasons() {
    let sections = vec![
        section("a", "A", 1, vec![]),
        section("a/b", "Bad", 1, vec![]),
        section("a", "Again", 1, vec![]),
    ];

    assert_eq!(
        section::file_runs(&sections),
        vec![
            Ok(0..1),
            Err(section::SkippedRun::InvalidId("a/b".into())),
            Err(section::SkippedRun::DuplicateId("a".into())),
        ]
    );
}

#[test]
fn test_invalid_label_replaced() {
    let mut doc = Document {
        sections: vec![section(
            "s",
            "S",
            1,
            vec![
                Block::Image(ImageBlock {
                    path: "a.png".into(),
                    label: "my fig>".into(),
                    ..Default::default()
                }),
                Block::Image(ImageBlock {
                    path: "b.png".into(),
                    label: "fig:chart-2.b".into(),
                    ..Default::default()
                }),
            ],
        )],
        ..Default::default()
    };

    let files = render_sections(&mut doc, &bare_config());
    let labels: Vec<_> = doc.images_mut().map(|img| img.label.clone()).collect();

    assert!(labels[0].starts_with("img:"));
    assert_eq!(labels[1], "fig:chart-2.b");
    assert!(!files[0].content.contains("my fig"));
    assert!(files[0].content.contains(&format!("<{}>", labels[0])));
    assert!(section::is_valid_label("img:0b5e-αβ_1.x"));
    assert!(!section::is_valid_label("a b"));
    assert!(!section::is_valid_label(""));
}
