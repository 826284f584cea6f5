//! Builders for test artifacts. Every builder renders real text and a tree
//! whose ranges point into that text.

use lintel_core::artifact::{DocumentWriter, LiteralValue, NodeKind, SourceNode, MANIFEST_FILE};
use lintel_core::{Artifact, ArtifactTree, Finding, ProjectSnapshot, TextRange};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::catalog::{Issue, IssueCatalog};
use crate::config::AnalysisConfig;
use crate::report::compare_findings;
use crate::scope::AnalysisMode;
use crate::session::{AnalysisSession, CancellationToken};

pub type Attrs<'a> = &'a [(&'a str, &'a str)];

pub fn pool(threads: usize) -> ThreadPool {
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .unwrap()
}

/// Run a full analysis with only `issues` registered and return the raw
/// findings in report order.
pub fn run_issues(issues: Vec<Issue>, artifacts: Vec<Artifact>) -> Vec<Finding> {
    let mut builder = IssueCatalog::builder();
    for issue in issues {
        builder.register(issue).unwrap();
    }
    let catalog = builder.build().unwrap();
    let config = AnalysisConfig::default();
    let snapshot = ProjectSnapshot::new("test", artifacts);
    let pool = pool(2);
    let token = CancellationToken::new();
    let outcome = AnalysisSession::new(&catalog, &config, &snapshot, &pool, &token)
        .run(&AnalysisMode::Full, None)
        .unwrap();
    let mut findings: Vec<Finding> = outcome.state.findings().cloned().collect();
    findings.sort_by(compare_findings);
    findings
}

/// Range of the first occurrence of `needle`.
pub fn range_of(contents: &str, needle: &str) -> TextRange {
    let start = contents
        .find(needle)
        .unwrap_or_else(|| panic!("{:?} not found", needle));
    TextRange::from_offsets(contents, start, start + needle.len())
}

/// A layout with a `LinearLayout` root and one leaf per `(tag, attributes)`.
pub fn layout_artifact(path: &str, children: &[(&str, Attrs<'_>)]) -> Artifact {
    let mut w = DocumentWriter::with_prolog();
    w.start("LinearLayout", &[]);
    for (tag, attributes) in children {
        w.leaf(tag, attributes, None);
    }
    w.end();
    Artifact::resource(path, w.finish().unwrap())
}

/// A layout nesting `depth` `FrameLayout`s below the root.
pub fn nested_layout(path: &str, depth: usize) -> Artifact {
    let mut w = DocumentWriter::new();
    w.start("LinearLayout", &[]);
    for _ in 0..depth {
        w.start("FrameLayout", &[]);
    }
    w.leaf("View", &[], None);
    w.end();
    Artifact::resource(path, w.finish().unwrap())
}

/// A `<resources>` document filled by `body`.
pub fn resources_artifact(path: &str, body: impl FnOnce(&mut DocumentWriter)) -> Artifact {
    let mut w = DocumentWriter::with_prolog();
    w.start("resources", &[]);
    body(&mut w);
    w.end();
    Artifact::resource(path, w.finish().unwrap())
}

/// A values file declaring one `string-array` with `count` items.
pub fn array_artifact(path: &str, name: &str, count: usize) -> Artifact {
    resources_artifact(path, |w| {
        w.start("string-array", &[("name", name)]);
        for i in 0..count {
            w.leaf("item", &[], Some(format!("item {}", i).as_str()));
        }
        w.end();
    })
}

pub fn strings_artifact(path: &str, strings: &[(&str, &str)]) -> Artifact {
    resources_artifact(path, |w| {
        for &(name, value) in strings {
            w.leaf("string", &[("name", name)], Some(value));
        }
    })
}

/// A manifest whose root holds one leaf per `(tag, attributes)`.
pub fn manifest_artifact(children: &[(&str, Attrs<'_>)]) -> Artifact {
    let mut w = DocumentWriter::with_prolog();
    w.start(
        "manifest",
        &[
            ("xmlns:android", "http://schemas.android.com/apk/res/android"),
            ("package", "com.example.demo"),
        ],
    );
    for (tag, attributes) in children {
        w.leaf(tag, attributes, None);
    }
    w.end();
    Artifact::manifest(MANIFEST_FILE, w.finish().unwrap())
}

/// A source file holding a single class with no members.
pub fn source_artifact(path: &str, contents: &str) -> Artifact {
    let whole = TextRange::from_offsets(contents, 0, contents.len());
    let unit = SourceNode::new(NodeKind::Unit, whole);
    Artifact::new(path, contents, ArtifactTree::Source(unit))
}

/// A source file whose method `run` makes one call, `receiver.method(args)`.
///
/// Integer arguments become literals; anything else an identifier.
pub fn call_artifact(path: &str, owner: Option<&str>, method: &str, args: &[&str]) -> Artifact {
    call_artifact_with(path, owner, method, args, "")
}

/// Like [`call_artifact`], with `prefix` written on the line before the call.
pub fn call_artifact_with(
    path: &str,
    owner: Option<&str>,
    method: &str,
    args: &[&str],
    prefix: &str,
) -> Artifact {
    let mut contents = String::from("class Demo {\n    void run() {\n");
    if !prefix.is_empty() {
        contents.push_str("        ");
        contents.push_str(prefix);
        contents.push('\n');
    }
    contents.push_str("        ");
    let call_start = contents.len();
    contents.push_str("receiver.");
    contents.push_str(method);
    contents.push('(');
    let mut arg_ranges = Vec::with_capacity(args.len());
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            contents.push_str(", ");
        }
        let start = contents.len();
        contents.push_str(arg);
        arg_ranges.push((start, contents.len()));
    }
    contents.push(')');
    let call_end = contents.len();
    contents.push_str(";\n    }\n");
    let method_end = contents.len() - 1;
    contents.push_str("}\n");

    let mut call = SourceNode::new(
        NodeKind::Call,
        TextRange::from_offsets(&contents, call_start, call_end),
    )
    .named(method);
    if let Some(owner) = owner {
        call = call.with_owner(owner);
    }
    for (arg, (start, end)) in args.iter().zip(arg_ranges) {
        let range = TextRange::from_offsets(&contents, start, end);
        let node = match arg.parse::<i64>() {
            Ok(value) => {
                SourceNode::new(NodeKind::Literal, range).with_literal(LiteralValue::Int(value))
            }
            Err(_) => SourceNode::new(NodeKind::Identifier, range).named(*arg),
        };
        call = call.with_child(node);
    }

    let method_start = contents.find("void").unwrap();
    let method = SourceNode::new(
        NodeKind::Method,
        TextRange::from_offsets(&contents, method_start, method_end),
    )
    .named("run")
    .with_child(call);
    let whole = TextRange::from_offsets(&contents, 0, contents.len());
    let class = SourceNode::new(NodeKind::Class, whole)
        .named("Demo")
        .with_child(method);
    let unit = SourceNode::new(NodeKind::Unit, whole).with_child(class);
    Artifact::new(path, contents.as_str(), ArtifactTree::Source(unit))
}
