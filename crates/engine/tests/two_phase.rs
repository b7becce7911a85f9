//! Integration tests for the build engine
//!
//! These tests run whole builds over temporary source trees and check what
//! ends up in the build directory.

#![allow(clippy::unwrap_used, clippy::panic)]

use indexmap::IndexMap;
use jssg_engine::{
    AbsPath, BuildEnv, BuildListener, BuildRequest, BuildRule, Context, DryRunFileSystem, Error,
    Execution, ExecutionRule, FileMap, FileSelection, FileState, Matcher, Operation, PageIndex,
    PathMap, RelPath, RenderRule, Result, SiteSettings, build,
};
use jssg_template::TemplateEngine;
use serde_json::{Map, Value, json};
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use tempfile::TempDir;

fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (name, content) in files {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

fn settings(temp: &TempDir, files: &[(&str, &str)]) -> SiteSettings {
    let source = temp.path().join("src");
    fs::create_dir_all(&source).unwrap();
    write_tree(&source, files);
    SiteSettings::new(source, temp.path().join("build"), "https://example.org/")
        .with_renderer(Arc::new(TemplateEngine::new()))
}

fn read_output(temp: &TempDir, name: &str) -> String {
    fs::read_to_string(temp.path().join("build").join(name)).unwrap()
}

fn output_exists(temp: &TempDir, name: &str) -> bool {
    temp.path().join("build").join(name).exists()
}

/// Takes the title from the first line, renders the rest as markdown
struct PostRule;

impl ExecutionRule for PostRule {
    fn collect(
        &self,
        ctx: &Context,
        input: &RelPath,
        output: &RelPath,
    ) -> Result<(Execution, Option<Value>)> {
        let text = ctx.fs().read_to_string(input)?;
        let (title, body) = text.split_once('\n').unwrap_or((text.as_str(), ""));
        let title = title.trim().to_string();
        let body = body.to_string();

        let state = json!({
            "type": "post",
            "title": title,
            "href": output.to_slash_string(),
        });

        let output = output.clone();
        let execution: Execution = Box::new(move |ctx| {
            let renderer = ctx
                .renderer()
                .ok_or_else(|| Error::configuration("no renderer"))?;
            let html = renderer.render_markdown(&body)?;
            ctx.fs()
                .write(&output, format!("<h1>{title}</h1>\n{html}").as_bytes())?;
            Ok(None)
        });
        Ok((execution, Some(state)))
    }
}

fn site_rules() -> Vec<BuildRule> {
    vec![
        BuildRule::execution(Matcher::glob("*.md").unwrap(), PathMap::to_html(), PostRule),
        BuildRule::execution(
            Matcher::glob("*index.html").unwrap(),
            PathMap::mirror(),
            RenderRule::new(),
        ),
    ]
}

const INDEX: &str = "{% for post in listeners.posts %}{{ post.title }}|{% endfor %}";

#[test]
fn test_index_sees_every_post() {
    let temp = TempDir::new().unwrap();
    let settings = settings(
        &temp,
        &[
            ("a.md", "Alpha\nFirst *post*"),
            ("b.md", "Beta\nSecond post"),
            ("index.html", INDEX),
        ],
    )
    .with_listener(PageIndex::new("posts").kind("post").sort_by("title"));

    let report = build(settings, BuildRequest::new(site_rules())).unwrap();

    assert_eq!(report.walked, 3);
    assert_eq!(report.executed, 3);
    assert!(output_exists(&temp, "a.html"));
    assert!(output_exists(&temp, "b.html"));
    assert!(read_output(&temp, "a.html").contains("<em>post</em>"));
    assert_eq!(read_output(&temp, "index.html"), "Alpha|Beta|");
}

#[test]
fn test_index_walked_before_posts() {
    // `_index.html` sorts before `a.md`, so it is collected first
    let temp = TempDir::new().unwrap();
    let settings = settings(
        &temp,
        &[
            ("_index.html", INDEX),
            ("a.md", "Alpha\n"),
            ("b.md", "Beta\n"),
        ],
    )
    .with_listener(PageIndex::new("posts").kind("post").sort_by("title"));

    build(settings, BuildRequest::new(site_rules())).unwrap();

    assert_eq!(read_output(&temp, "_index.html"), "Alpha|Beta|");
}

#[test]
fn test_failing_predicate_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let settings = settings(&temp, &[("a.md", "A\n"), ("bad.md", "B\n"), ("c.md", "C\n")]);

    let rules = vec![
        BuildRule::execution(
            Matcher::predicate(|path| {
                if path.to_slash_string() == "bad.md" {
                    Err(Error::configuration("refusing bad.md"))
                } else {
                    Ok(true)
                }
            }),
            PathMap::to_html(),
            PostRule,
        ),
    ];

    let err = build(settings, BuildRequest::new(rules)).unwrap_err();

    assert!(matches!(err, Error::Match { rule: 0, .. }));
    assert!(err.to_string().contains("bad.md"));
    assert!(!temp.path().join("build").exists());
}

/// Records hook calls into a shared log
struct Recorder {
    name: String,
    log: Rc<RefCell<Vec<String>>>,
}

impl Recorder {
    fn new(name: &str, log: &Rc<RefCell<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            log: Rc::clone(log),
        }
    }
}

impl BuildListener for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn before_execute(&mut self, _ctx: &Context) -> Result<Value> {
        self.log.borrow_mut().push(format!("{}:before", self.name));
        Ok(json!(true))
    }

    fn on_data_return(&mut self, state: &FileState) -> Result<()> {
        self.log
            .borrow_mut()
            .push(format!("{}:{}", self.name, state.input));
        Ok(())
    }
}

/// Reports state only for files whose name contains `state`
struct MaybeState {
    log: Rc<RefCell<Vec<String>>>,
}

impl ExecutionRule for MaybeState {
    fn collect(
        &self,
        _ctx: &Context,
        input: &RelPath,
        _output: &RelPath,
    ) -> Result<(Execution, Option<Value>)> {
        let log = Rc::clone(&self.log);
        let name = input.to_slash_string();
        let state = name.contains("state").then(|| json!(name));
        let execution: Execution = Box::new(move |ctx| {
            // Every listener has already contributed its value
            assert_eq!(ctx.listeners().unwrap()["first"], json!(true));
            assert_eq!(ctx.listeners().unwrap()["second"], json!(true));
            log.borrow_mut().push(format!("exec:{name}"));
            Ok(None)
        });
        Ok((execution, state))
    }
}

#[test]
fn test_listener_delivery_and_ordering() {
    let temp = TempDir::new().unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));
    let settings = settings(
        &temp,
        &[("a_state.txt", ""), ("b.txt", ""), ("c_state.txt", "")],
    )
    .with_listener(Recorder::new("first", &log))
    .with_listener(Recorder::new("second", &log));

    let rules = vec![BuildRule::execution(
        Matcher::glob("*").unwrap(),
        PathMap::mirror(),
        MaybeState {
            log: Rc::clone(&log),
        },
    )];

    let report = build(settings, BuildRequest::new(rules)).unwrap();

    assert_eq!(report.states, 2);
    assert_eq!(
        *log.borrow(),
        vec![
            "first:a_state.txt",
            "second:a_state.txt",
            "first:c_state.txt",
            "second:c_state.txt",
            "first:before",
            "second:before",
            "exec:a_state.txt",
            "exec:b.txt",
            "exec:c_state.txt",
        ]
    );
}

#[test]
fn test_execution_state_delivered_after_each_closure() {
    struct Late;

    impl ExecutionRule for Late {
        fn collect(
            &self,
            _ctx: &Context,
            input: &RelPath,
            _output: &RelPath,
        ) -> Result<(Execution, Option<Value>)> {
            let name = input.to_slash_string();
            let execution: Execution = Box::new(move |_| Ok(Some(json!(name))));
            Ok((execution, None))
        }
    }

    let temp = TempDir::new().unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));
    let settings = settings(&temp, &[("x.txt", ""), ("y.txt", "")])
        .with_listener(Recorder::new("rec", &log));

    let rules = vec![BuildRule::execution(
        Matcher::glob("*").unwrap(),
        PathMap::mirror(),
        Late,
    )];
    let report = build(settings, BuildRequest::new(rules)).unwrap();

    assert_eq!(report.states, 2);
    assert_eq!(*log.borrow(), vec!["rec:before", "rec:x.txt", "rec:y.txt"]);
}

#[test]
fn test_unmatched_files_are_skipped() {
    let temp = TempDir::new().unwrap();
    let settings = settings(&temp, &[("a.css", "a"), ("notes.txt", "n")]);

    let rules = vec![BuildRule::file_map(
        Matcher::glob("*.css").unwrap(),
        PathMap::mirror(),
        FileMap::copy(),
    )];
    let report = build(settings, BuildRequest::new(rules)).unwrap();

    assert_eq!(report.matched, 1);
    assert_eq!(report.skipped, 1);
    assert!(output_exists(&temp, "a.css"));
    assert!(!output_exists(&temp, "notes.txt"));
}

#[test]
fn test_first_match_wins() {
    let upper = || {
        BuildRule::file_map(
            Matcher::glob("*.txt").unwrap(),
            PathMap::mirror(),
            FileMap::transform(str::to_uppercase),
        )
    };
    let copy = || {
        BuildRule::file_map(
            Matcher::glob("*").unwrap(),
            PathMap::mirror(),
            FileMap::copy(),
        )
    };

    let temp = TempDir::new().unwrap();
    build(
        settings(&temp, &[("a.txt", "hello")]),
        BuildRequest::new(vec![upper(), copy()]),
    )
    .unwrap();
    assert_eq!(read_output(&temp, "a.txt"), "HELLO");

    let temp = TempDir::new().unwrap();
    build(
        settings(&temp, &[("a.txt", "hello")]),
        BuildRequest::new(vec![copy(), upper()]),
    )
    .unwrap();
    assert_eq!(read_output(&temp, "a.txt"), "hello");
}

#[test]
fn test_glob_and_single_element_sequence_agree() {
    let files = [("a.md", ""), ("b.txt", ""), ("posts/c.md", "")];
    let rules = |matcher: Matcher| {
        vec![BuildRule::file_map(matcher, PathMap::mirror(), FileMap::copy())]
    };

    let temp = TempDir::new().unwrap();
    let env = BuildEnv::new(settings(&temp, &files)).unwrap();

    let single = env
        .classify(&FileSelection::All, &rules(Matcher::glob("*.md").unwrap()))
        .unwrap();
    let sequence = env
        .classify(&FileSelection::All, &rules(Matcher::any_of(["*.md"]).unwrap()))
        .unwrap();
    assert_eq!(single, sequence);
    assert_eq!(
        single.iter().filter(|(_, owner)| owner.is_some()).count(),
        2
    );
}

#[test]
fn test_repeated_builds_are_identical() {
    let temp = TempDir::new().unwrap();
    let settings = settings(
        &temp,
        &[("a.md", "Alpha\n"), ("b.md", "Beta\n"), ("index.html", INDEX)],
    )
    .with_listener(PageIndex::new("posts").kind("post").sort_by("title"));
    let mut env = BuildEnv::new(settings).unwrap();

    let first = env.build(BuildRequest::new(site_rules())).unwrap();
    let index = read_output(&temp, "index.html");
    let second = env.build(BuildRequest::new(site_rules())).unwrap();

    assert_eq!(first, second);
    assert_eq!(read_output(&temp, "index.html"), index);
    assert_eq!(index, "Alpha|Beta|");
}

#[test]
fn test_duplicate_listener_names() {
    let temp = TempDir::new().unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));
    let settings = settings(&temp, &[("a.txt", "")]).with_listener(Recorder::new("dup", &log));
    let mut env = BuildEnv::new(settings).unwrap();

    let request = BuildRequest::new(vec![BuildRule::file_map(
        Matcher::glob("*").unwrap(),
        PathMap::mirror(),
        FileMap::copy(),
    )])
    .with_listener(Recorder::new("dup", &log));

    let err = env.build(request).unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }));
    assert!(log.borrow().is_empty());
    assert!(!temp.path().join("build").exists());
}

#[test]
fn test_execution_error_keeps_earlier_outputs() {
    let temp = TempDir::new().unwrap();
    let settings = settings(&temp, &[("a.txt", "a"), ("b.txt", "b"), ("c.txt", "c")]);

    let rules = vec![
        BuildRule::callable(Matcher::glob("b.txt").unwrap(), |_, _| {
            Err(Error::configuration("broken"))
        }),
        BuildRule::file_map(
            Matcher::glob("*").unwrap(),
            PathMap::mirror(),
            FileMap::copy(),
        ),
    ];

    let err = build(settings, BuildRequest::new(rules)).unwrap_err();
    assert!(matches!(err, Error::Execution { rule: 0, .. }));
    assert!(output_exists(&temp, "a.txt"));
    assert!(!output_exists(&temp, "c.txt"));
}

#[test]
fn test_context_layers() {
    let temp = TempDir::new().unwrap();
    let mut user = IndexMap::new();
    user.insert("title".to_string(), json!("user"));
    user.insert("author".to_string(), json!("jj"));
    user.insert("baseUrl".to_string(), json!("ignored"));
    let settings = settings(
        &temp,
        &[("page.html", "{{ title }} {{ author }} {{ baseUrl }} {{ fullhref }}")],
    )
    .with_user_context(user);

    let mut call = IndexMap::new();
    call.insert("title".to_string(), json!("call"));
    let rules = vec![BuildRule::execution(
        Matcher::glob("*.html").unwrap(),
        PathMap::mirror(),
        RenderRule::new(),
    )];
    build(settings, BuildRequest::new(rules).with_context(call)).unwrap();

    assert_eq!(
        read_output(&temp, "page.html"),
        "call jj https://example.org/ https://example.org/page.html"
    );
}

#[test]
fn test_dry_run_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("src");
    let build_dir = temp.path().join("build");
    write_tree(&source, &[("a.css", "a"), ("b.txt", "b")]);

    let fs = Arc::new(DryRunFileSystem::new(
        AbsPath::new(source.clone()).unwrap(),
        AbsPath::new(build_dir.clone()).unwrap(),
    ));
    let settings = SiteSettings::new(source, build_dir, "/").with_fs(fs.clone());

    let rules = vec![
        BuildRule::file_map(
            Matcher::glob("*.css").unwrap(),
            PathMap::mirror(),
            FileMap::copy(),
        ),
        BuildRule::file_map(
            Matcher::glob("*.txt").unwrap(),
            PathMap::replace_extensions(".out"),
            FileMap::transform(str::to_uppercase),
        ),
    ];
    build(settings, BuildRequest::new(rules)).unwrap();

    let targets: Vec<String> = fs
        .operations()
        .iter()
        .map(|op| op.target().to_slash_string())
        .collect();
    assert_eq!(targets, vec!["a.css", "b.out"]);
    assert!(matches!(fs.operations()[1], Operation::Write { size: 1, .. }));
    assert!(!temp.path().join("build").exists());
}

fn assert_failed_on(err: &Error, path: &str, rule: usize) {
    assert_eq!(err.path().map(RelPath::to_slash_string).as_deref(), Some(path));
    assert_eq!(err.rule(), Some(rule));
}

#[test]
fn test_path_map_escaping_build_root_fails() {
    let temp = TempDir::new().unwrap();
    let settings = settings(&temp, &[("a.txt", "a")]);

    let rules = vec![BuildRule::file_map(
        Matcher::glob("*").unwrap(),
        PathMap::output(|path| Ok(RelPath::parse("../escaped")?.join(path))),
        FileMap::copy(),
    )];

    let err = build(settings, BuildRequest::new(rules)).unwrap_err();
    assert!(matches!(err, Error::PathMap { .. }));
    assert_failed_on(&err, "a.txt", 0);
    assert!(!temp.path().join("build").exists());
    assert!(!temp.path().join("escaped").exists());
}

#[test]
fn test_failing_path_map_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let settings = settings(&temp, &[("a.css", "a"), ("b.txt", "b")]);

    let rules = vec![
        BuildRule::file_map(
            Matcher::glob("*.css").unwrap(),
            PathMap::mirror(),
            FileMap::copy(),
        ),
        BuildRule::file_map(
            Matcher::glob("*.txt").unwrap(),
            PathMap::output(|_| Err(Error::configuration("no output for text files"))),
            FileMap::copy(),
        ),
    ];

    let err = build(settings, BuildRequest::new(rules)).unwrap_err();
    assert!(matches!(err, Error::PathMap { .. }));
    assert_failed_on(&err, "b.txt", 1);
    assert!(!temp.path().join("build").exists());
}

#[test]
fn test_failing_collection_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let settings = settings(
        &temp,
        &[("a.css", "a"), ("b.html", "+++\ntitle = = \"broken\"\n+++\nbody")],
    );

    let rules = vec![
        BuildRule::file_map(
            Matcher::glob("*.css").unwrap(),
            PathMap::mirror(),
            FileMap::copy(),
        ),
        BuildRule::execution(
            Matcher::glob("*.html").unwrap(),
            PathMap::mirror(),
            RenderRule::named("page").front_matter(true),
        ),
    ];

    let err = build(settings, BuildRequest::new(rules)).unwrap_err();
    assert!(matches!(err, Error::Collect { .. }));
    assert_failed_on(&err, "b.html", 1);
    assert!(!temp.path().join("build").exists());
}

/// Fails in the named hook
struct Failing {
    in_before_execute: bool,
}

impl BuildListener for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn before_execute(&mut self, _ctx: &Context) -> Result<Value> {
        if self.in_before_execute {
            return Err(Error::configuration("cannot aggregate"));
        }
        Ok(Value::Null)
    }

    fn on_data_return(&mut self, _state: &FileState) -> Result<()> {
        if self.in_before_execute {
            return Ok(());
        }
        Err(Error::configuration("rejecting state"))
    }
}

fn reporting_rules() -> Vec<BuildRule> {
    vec![
        BuildRule::file_map(
            Matcher::glob("*.css").unwrap(),
            PathMap::mirror(),
            FileMap::copy(),
        ),
        BuildRule::execution(
            Matcher::glob("*.html").unwrap(),
            PathMap::mirror(),
            RenderRule::named("page"),
        ),
    ]
}

#[test]
fn test_failing_before_execute_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let settings = settings(&temp, &[("a.css", "a"), ("b.html", "b")]).with_listener(Failing {
        in_before_execute: true,
    });
    let mut env = BuildEnv::new(settings).unwrap();

    let err = env.build(BuildRequest::new(reporting_rules())).unwrap_err();
    assert!(matches!(err, Error::Listener { ref name, .. } if name == "failing"));
    assert!(err.path().is_none());
    assert_eq!(env.phase(), jssg_engine::BuildPhase::Failed);
    assert!(!temp.path().join("build").exists());
}

#[test]
fn test_failing_state_delivery_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let settings = settings(&temp, &[("a.css", "a"), ("b.html", "b")]).with_listener(Failing {
        in_before_execute: false,
    });

    let err = build(settings, BuildRequest::new(reporting_rules())).unwrap_err();
    assert!(matches!(err, Error::Listener { ref name, .. } if name == "failing"));
    assert!(!temp.path().join("build").exists());
}

fn title_from_stem(_: &Context, input: &RelPath, _: &RelPath) -> Result<Map<String, Value>> {
    let stem = input.file_name().unwrap_or_default().trim_end_matches(".html");
    let mut data = Map::new();
    data.insert("title".to_string(), json!(stem.replace('-', " ")));
    Ok(data)
}

#[test]
fn test_index_lists_hook_titles() {
    let temp = TempDir::new().unwrap();
    let settings = settings(
        &temp,
        &[
            ("index.html", "{% for p in listeners.posts %}{{ p.title }}@{{ p.href }}|{% endfor %}"),
            ("posts/hello-world.html", "<h1>{{ title }}</h1>"),
            ("posts/all-about-rust.html", "<h1>{{ title }}</h1>"),
        ],
    )
    .with_listener(PageIndex::new("posts").kind("post").sort_by("title"));

    let rules = vec![
        BuildRule::execution(
            Matcher::glob("posts/*").unwrap(),
            PathMap::mirror(),
            RenderRule::named("post").with_hook(title_from_stem),
        ),
        BuildRule::execution(
            Matcher::glob("index.html").unwrap(),
            PathMap::mirror(),
            RenderRule::new(),
        ),
    ];
    build(settings, BuildRequest::new(rules)).unwrap();

    assert_eq!(
        read_output(&temp, "index.html"),
        "all about rust@posts/all-about-rust.html|hello world@posts/hello-world.html|"
    );
    assert_eq!(
        read_output(&temp, "posts/hello-world.html"),
        "<h1>hello world</h1>"
    );
}

#[test]
fn test_index_sorted_by_front_matter_date() {
    let temp = TempDir::new().unwrap();
    let settings = settings(
        &temp,
        &[
            ("index.html", "{% for p in listeners.posts %}{{ p.title }};{% endfor %}"),
            ("posts/a.html", "+++\ntitle = \"Old\"\ndate = 2020-01-01\n+++\n{{ title }}"),
            ("posts/b.html", "+++\ntitle = \"New\"\ndate = 2022-06-30\n+++\n{{ title }}"),
        ],
    )
    .with_listener(
        PageIndex::new("posts")
            .kind("post")
            .sort_by("date")
            .reversed(true),
    );

    let rules = vec![
        BuildRule::execution(
            Matcher::glob("posts/*").unwrap(),
            PathMap::mirror(),
            RenderRule::named("post").front_matter(true),
        ),
        BuildRule::execution(
            Matcher::glob("index.html").unwrap(),
            PathMap::mirror(),
            RenderRule::new(),
        ),
    ];
    build(settings, BuildRequest::new(rules)).unwrap();

    assert_eq!(read_output(&temp, "index.html"), "New;Old;");
    assert_eq!(read_output(&temp, "posts/a.html"), "Old");
}

#[test]
fn test_later_render_sees_pushed_page() {
    let temp = TempDir::new().unwrap();
    let pages = jssg_engine::PageCollection::new();
    let settings = settings(
        &temp,
        &[
            ("a.html", "{{ push_to_collection({'title': 'First'}) }}A"),
            ("b.html", "{% for p in pages %}{{ p.title }}@{{ p.fullhref }}{% endfor %}"),
        ],
    );

    let rules = vec![BuildRule::execution(
        Matcher::glob("*.html").unwrap(),
        PathMap::mirror(),
        RenderRule::new(),
    )];
    build(settings, BuildRequest::new(rules).with_pages(pages.clone())).unwrap();

    assert_eq!(read_output(&temp, "a.html"), "A");
    assert_eq!(
        read_output(&temp, "b.html"),
        "First@https://example.org/a.html"
    );
    assert_eq!(pages.len(), 1);
    assert_eq!(pages.snapshot()[0]["href"], "a.html");
}
