//! Two-phase build engine
//!
//! A build walks the source tree, gives every file to the first rule that
//! claims it and then runs in two strictly separated phases:
//!
//! 1. **Collection**: path maps and execution rules run for every file,
//!    producing deferred executions and optional state. Nothing is written.
//! 2. **Execution**: after listeners have seen every collected state and
//!    contributed their values, the executions run in collection order.
//!
//! Any error before execution leaves the build tree untouched. During
//! execution the first error stops the remaining work; earlier outputs stay.

use crate::context::{Context, PageCollection};
use crate::error::{Error, Result};
use crate::execution::{Execution, ExecutionRule, FileMapRule};
use crate::listener::{BuildListener, FileState};
use crate::rule::{BuildRule, RuleProc, Target};
use crate::system::{FileSystem, RealFileSystem};
use indexmap::IndexMap;
use jssg_core::TemplateRenderer;
use jssg_core::path::{AbsPath, RelPath};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Phase a build last reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    /// No build has run yet
    Idle,
    /// Enumerating source files
    Walking,
    /// Resolving rules and collecting executions
    Collecting,
    /// Delivering collected state and calling `before_execute`
    AggregatingListeners,
    /// Running executions
    Executing,
    /// Finished successfully
    Done,
    /// Aborted by an error
    Failed,
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildPhase::Idle => "idle",
            BuildPhase::Walking => "walking",
            BuildPhase::Collecting => "collecting",
            BuildPhase::AggregatingListeners => "aggregating listeners",
            BuildPhase::Executing => "executing",
            BuildPhase::Done => "done",
            BuildPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Site-wide settings for a [`BuildEnv`]
pub struct SiteSettings {
    /// Source directory
    pub source_dir: PathBuf,
    /// Build directory
    pub build_dir: PathBuf,
    /// Public base URL
    pub base_url: String,
    /// Environment-level user context
    pub user_context: IndexMap<String, Value>,
    /// Render-context defaults, exposed as `render`
    pub render_defaults: IndexMap<String, Value>,
    /// Template renderer for render rules
    pub renderer: Option<Arc<dyn TemplateRenderer>>,
    /// Filesystem handle; a [`RealFileSystem`] over the two directories if absent
    pub fs: Option<Arc<dyn FileSystem>>,
    /// Listeners taking part in every build
    pub listeners: Vec<Box<dyn BuildListener>>,
}

impl SiteSettings {
    /// Settings with the required fields; everything else empty
    pub fn new(
        source_dir: impl Into<PathBuf>,
        build_dir: impl Into<PathBuf>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            build_dir: build_dir.into(),
            base_url: base_url.into(),
            user_context: IndexMap::new(),
            render_defaults: IndexMap::new(),
            renderer: None,
            fs: None,
            listeners: Vec::new(),
        }
    }

    /// Set the user context
    #[must_use]
    pub fn with_user_context(mut self, context: IndexMap<String, Value>) -> Self {
        self.user_context = context;
        self
    }

    /// Set the render-context defaults
    #[must_use]
    pub fn with_render_defaults(mut self, render: IndexMap<String, Value>) -> Self {
        self.render_defaults = render;
        self
    }

    /// Set the template renderer
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Set a custom filesystem handle
    #[must_use]
    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    /// Register a listener for every build
    #[must_use]
    pub fn with_listener(mut self, listener: impl BuildListener + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }
}

/// Which source files a build visits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FileSelection {
    /// Every file under the source root
    #[default]
    All,
    /// Every file under a subdirectory of the source root
    Subdir(RelPath),
    /// Exactly these source files, in this order
    Files(Vec<RelPath>),
}

impl FileSelection {
    /// Resolve the selection to source-relative file paths
    ///
    /// # Errors
    ///
    /// Returns walk errors, or a configuration error for a listed file that
    /// does not exist
    pub fn resolve(&self, fs: &dyn FileSystem) -> Result<Vec<RelPath>> {
        match self {
            FileSelection::All => fs.list_files(None),
            FileSelection::Subdir(subdir) => fs.list_files(Some(subdir)),
            FileSelection::Files(files) => {
                if let Some(missing) = files.iter().find(|file| !fs.exists(file)) {
                    return Err(Error::configuration(format!(
                        "{missing} is not a source file"
                    )));
                }
                Ok(files.clone())
            }
        }
    }
}

impl fmt::Display for FileSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileSelection::All => f.write_str("all files"),
            FileSelection::Subdir(subdir) => write!(f, "files under {subdir}"),
            FileSelection::Files(files) => write!(f, "{} listed files", files.len()),
        }
    }
}

/// One build invocation
pub struct BuildRequest {
    /// Source files to visit
    pub files: FileSelection,
    /// Rules in declaration order
    pub rules: Vec<BuildRule>,
    /// Per-build context layer
    pub context: IndexMap<String, Value>,
    /// Page collection exposed as `pages`
    pub pages: PageCollection,
    /// Listeners for this build only, after the environment's listeners
    pub listeners: Vec<Box<dyn BuildListener>>,
}

impl BuildRequest {
    /// Build the whole source tree with `rules`
    pub fn new(rules: Vec<BuildRule>) -> Self {
        Self {
            files: FileSelection::All,
            rules,
            context: IndexMap::new(),
            pages: PageCollection::new(),
            listeners: Vec::new(),
        }
    }

    /// Restrict the walk to a subdirectory
    #[must_use]
    pub fn with_subdir(mut self, subdir: RelPath) -> Self {
        self.files = FileSelection::Subdir(subdir);
        self
    }

    /// Visit exactly these source files instead of walking
    #[must_use]
    pub fn with_files(mut self, files: Vec<RelPath>) -> Self {
        self.files = FileSelection::Files(files);
        self
    }

    /// Set the per-build context layer
    #[must_use]
    pub fn with_context(mut self, context: IndexMap<String, Value>) -> Self {
        self.context = context;
        self
    }

    /// Share a page collection with the caller
    #[must_use]
    pub fn with_pages(mut self, pages: PageCollection) -> Self {
        self.pages = pages;
        self
    }

    /// Register a listener for this build only
    #[must_use]
    pub fn with_listener(mut self, listener: impl BuildListener + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }
}

/// Outcome of a successful build
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    /// Files found by the walk
    pub walked: usize,
    /// Files claimed by a rule
    pub matched: usize,
    /// Files no rule claimed
    pub skipped: usize,
    /// Executions run
    pub executed: usize,
    /// States delivered to listeners
    pub states: usize,
    /// Value each listener returned from `before_execute`
    pub listener_state: IndexMap<String, Value>,
}

/// Work collected for one file
struct PendingExecution {
    path: RelPath,
    input: RelPath,
    output: RelPath,
    rule: usize,
    execution: Execution,
}

/// Build environment: site settings plus the listeners shared by every build
pub struct BuildEnv {
    fs: Arc<dyn FileSystem>,
    base_url: String,
    user_context: IndexMap<String, Value>,
    render_defaults: IndexMap<String, Value>,
    renderer: Option<Arc<dyn TemplateRenderer>>,
    listeners: Vec<Box<dyn BuildListener>>,
    phase: BuildPhase,
}

impl fmt::Debug for BuildEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildEnv")
            .field("source", self.fs.source_root())
            .field("build", self.fs.build_root())
            .field("base_url", &self.base_url)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl BuildEnv {
    /// Create a build environment
    ///
    /// Relative directories are resolved against the current directory.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if two listeners share a name
    pub fn new(settings: SiteSettings) -> Result<Self> {
        check_listener_names(settings.listeners.iter())?;

        let fs = match settings.fs {
            Some(fs) => fs,
            None => Arc::new(RealFileSystem::new(
                absolute(&settings.source_dir)?,
                absolute(&settings.build_dir)?,
            )),
        };

        Ok(Self {
            fs,
            base_url: settings.base_url,
            user_context: settings.user_context,
            render_defaults: settings.render_defaults,
            renderer: settings.renderer,
            listeners: settings.listeners,
            phase: BuildPhase::Idle,
        })
    }

    /// Phase the last build reached
    pub fn phase(&self) -> BuildPhase {
        self.phase
    }

    /// Filesystem handle
    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Run one build
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any phase; see the module docs for
    /// what has been written when that happens
    #[tracing::instrument(
        skip_all,
        fields(files = %request.files, rules = request.rules.len())
    )]
    pub fn build(&mut self, request: BuildRequest) -> Result<BuildReport> {
        let result = self.run(request);
        match &result {
            Ok(report) => {
                enter(&mut self.phase, BuildPhase::Done);
                tracing::info!(
                    walked = report.walked,
                    matched = report.matched,
                    skipped = report.skipped,
                    executed = report.executed,
                    "Build finished"
                );
            }
            Err(e) => {
                tracing::debug!(phase = %self.phase, error = %e, "Build aborted");
                enter(&mut self.phase, BuildPhase::Failed);
            }
        }
        result
    }

    fn run(&mut self, request: BuildRequest) -> Result<BuildReport> {
        let BuildRequest {
            files,
            rules,
            context,
            pages,
            listeners: mut extra_listeners,
        } = request;

        check_listener_names(self.listeners.iter().chain(extra_listeners.iter()))?;

        let mut listeners: Vec<&mut Box<dyn BuildListener>> = self
            .listeners
            .iter_mut()
            .chain(extra_listeners.iter_mut())
            .collect();
        for listener in &mut listeners {
            listener.on_build_start();
        }

        enter(&mut self.phase, BuildPhase::Walking);
        let files = files.resolve(self.fs.as_ref())?;

        let ctx = Context::builder(Arc::clone(&self.fs))
            .base_url(self.base_url.clone())
            .renderer(self.renderer.clone())
            .render_defaults(self.render_defaults.clone())
            .user(self.user_context.clone())
            .call(context)
            .pages(pages)
            .build();

        let mut report = BuildReport {
            walked: files.len(),
            ..BuildReport::default()
        };

        // Phase 1: nothing below may write to the build tree
        enter(&mut self.phase, BuildPhase::Collecting);
        let mut pending = Vec::new();
        let mut collected = Vec::new();
        for path in files {
            let Some(index) = owning_rule(&rules, &path)? else {
                tracing::debug!(path = %path, "No rule matches, skipping");
                report.skipped += 1;
                continue;
            };
            tracing::debug!(path = %path, rule = index, "Collecting");
            report.matched += 1;

            let (pending_execution, state) = collect(&ctx, &rules[index], index, path)?;
            pending.push(pending_execution);
            collected.extend(state);
        }

        enter(&mut self.phase, BuildPhase::AggregatingListeners);
        for state in &collected {
            dispatch(&mut listeners, state)?;
            report.states += 1;
        }

        let mut listener_state = IndexMap::new();
        for listener in &mut listeners {
            let value = listener.before_execute(&ctx).map_err(|e| Error::Listener {
                name: listener.name().to_string(),
                source: Box::new(e),
            })?;
            listener_state.insert(listener.name().to_string(), value);
        }

        // Phase 2
        enter(&mut self.phase, BuildPhase::Executing);
        let ctx = ctx.with_listeners(&listener_state);
        for PendingExecution {
            path,
            input,
            output,
            rule,
            execution,
        } in pending
        {
            tracing::debug!(path = %path, rule, "Executing");
            let returned = execution(&ctx).map_err(|e| Error::Execution {
                path: path.clone(),
                rule,
                source: Box::new(e),
            })?;
            report.executed += 1;

            if let Some(data) = returned {
                let state = FileState {
                    input,
                    output,
                    data,
                };
                dispatch(&mut listeners, &state)?;
                report.states += 1;
            }
        }

        report.listener_state = listener_state;
        Ok(report)
    }

    /// Report which rule owns each file, without collecting anything
    ///
    /// # Errors
    ///
    /// Returns walk errors and predicate matcher errors
    pub fn classify(
        &self,
        files: &FileSelection,
        rules: &[BuildRule],
    ) -> Result<Vec<(RelPath, Option<usize>)>> {
        files
            .resolve(self.fs.as_ref())?
            .into_iter()
            .map(|path| {
                let owner = owning_rule(rules, &path)?;
                Ok((path, owner))
            })
            .collect()
    }
}

/// Build once with a fresh environment
///
/// # Errors
///
/// Returns any error from [`BuildEnv::new`] or [`BuildEnv::build`]
pub fn build(settings: SiteSettings, request: BuildRequest) -> Result<BuildReport> {
    BuildEnv::new(settings)?.build(request)
}

fn enter(phase: &mut BuildPhase, next: BuildPhase) {
    tracing::debug!(from = %phase, to = %next, "Build phase");
    *phase = next;
}

fn absolute(path: &Path) -> Result<AbsPath> {
    Ok(AbsPath::new(std::path::absolute(path)?)?)
}

fn check_listener_names<'a, I>(listeners: I) -> Result<()>
where
    I: Iterator<Item = &'a Box<dyn BuildListener>>,
{
    let mut seen = HashSet::new();
    for listener in listeners {
        if !seen.insert(listener.name().to_string()) {
            return Err(Error::configuration(format!(
                "duplicate listener name '{}'",
                listener.name()
            )));
        }
    }
    Ok(())
}

/// Index of the first rule claiming `path`
fn owning_rule(rules: &[BuildRule], path: &RelPath) -> Result<Option<usize>> {
    for (index, rule) in rules.iter().enumerate() {
        let matched = rule.matcher().matches(path).map_err(|e| Error::Match {
            path: path.clone(),
            rule: index,
            source: Box::new(e),
        })?;
        if matched {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

fn collect(
    ctx: &Context,
    rule: &BuildRule,
    index: usize,
    path: RelPath,
) -> Result<(PendingExecution, Option<FileState>)> {
    match rule.proc() {
        RuleProc::Callable(f) => {
            let f = Arc::clone(f);
            let walked = path.clone();
            let execution: Execution = Box::new(move |ctx| {
                f(ctx, &walked)?;
                Ok(None)
            });
            let pending = PendingExecution {
                input: path.clone(),
                output: path.clone(),
                path,
                rule: index,
                execution,
            };
            Ok((pending, None))
        }
        RuleProc::Mapped { path_map, target } => {
            let (input, output) = path_map.apply(ctx, &path).map_err(|e| Error::PathMap {
                path: path.clone(),
                rule: index,
                source: Box::new(e),
            })?;

            let collected = match target {
                Target::FileMap(file_map) => {
                    FileMapRule::new(file_map.clone()).collect(ctx, &input, &output)
                }
                Target::Execution(rule) => rule.collect(ctx, &input, &output),
            };
            let (execution, state) = collected.map_err(|e| Error::Collect {
                path: path.clone(),
                rule: index,
                source: Box::new(e),
            })?;

            let state = state.map(|data| FileState {
                input: input.clone(),
                output: output.clone(),
                data,
            });
            let pending = PendingExecution {
                path,
                input,
                output,
                rule: index,
                execution,
            };
            Ok((pending, state))
        }
    }
}

fn dispatch(listeners: &mut [&mut Box<dyn BuildListener>], state: &FileState) -> Result<()> {
    for listener in listeners.iter_mut() {
        listener
            .on_data_return(state)
            .map_err(|e| Error::Listener {
                name: listener.name().to_string(),
                source: Box::new(e),
            })?;
    }
    Ok(())
}
