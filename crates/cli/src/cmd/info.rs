//! Info command implementation
//!
//! Display the resolved site configuration.

use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::debug;

use crate::command::Command;
use crate::common::RuntimeContext;
use crate::error::Result;

const NOT_FOUND: &str = "not found";
const DEFAULTS: &str = "using defaults";

/// Resolved site information
#[derive(Debug, Serialize)]
pub struct InfoData {
    jssg: JssgInfo,
    site: SiteInfo,
    rules: Vec<RuleInfo>,
    listeners: Vec<ListenerInfo>,
}

#[derive(Debug, Serialize)]
struct JssgInfo {
    version: &'static str,
    config: String,
    config_exists: bool,
}

#[derive(Debug, Serialize)]
struct SiteInfo {
    source: String,
    source_exists: bool,
    build: String,
    base_url: String,
    templates: Vec<String>,
    data: Option<String>,
}

#[derive(Debug, Serialize)]
struct RuleInfo {
    index: usize,
    description: String,
    kind: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListenerInfo {
    name: String,
    kind: Option<String>,
    sort_by: Option<String>,
    reverse: bool,
}

/// Info command
#[derive(Debug, Args)]
pub struct InfoCommand {
    /// Output in JSON format (default: table format)
    #[arg(long)]
    pub json: bool,
}

impl Command for InfoCommand {
    type Output = InfoData;

    fn execute(&self, context: &RuntimeContext) -> Result<InfoData> {
        let info = gather_info(context)?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).map_err(anyhow::Error::from)?
            );
        } else {
            display_table(&info);
        }

        Ok(info)
    }
}

fn gather_info(context: &RuntimeContext) -> Result<InfoData> {
    debug!("Gathering site information");
    let config = &context.config;

    let rules = context
        .rules()?
        .iter()
        .zip(&config.rules)
        .enumerate()
        .map(|(index, (rule, rule_config))| RuleInfo {
            index,
            description: rule.describe(),
            kind: rule_config.kind.clone(),
        })
        .collect();

    let listeners = config
        .listeners
        .iter()
        .map(|l| ListenerInfo {
            name: l.name.clone(),
            kind: l.kind.clone(),
            sort_by: l.sort_by.clone(),
            reverse: l.reverse,
        })
        .collect();

    let mut templates: Vec<String> = config
        .site
        .templates
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    templates.extend(
        config
            .site
            .prefixed_templates
            .iter()
            .map(|dir| format!("{}/ → {}", dir.prefix(), dir.path.display())),
    );

    Ok(InfoData {
        jssg: JssgInfo {
            version: env!("CARGO_PKG_VERSION"),
            config: context.config_path.display().to_string(),
            config_exists: context.config_found,
        },
        site: SiteInfo {
            source: context.source_dir().display().to_string(),
            source_exists: context.source_dir().is_dir(),
            build: context.build_dir().display().to_string(),
            base_url: context.base_url().to_string(),
            templates,
            data: config.site.data.as_ref().map(|p| p.display().to_string()),
        },
        rules,
        listeners,
    })
}

fn print_section_header(name: &str) {
    println!("{}", name.bright_white().bold());
}

fn display_table(info: &InfoData) {
    print_section_header("jssg");
    print_row("Version", info.jssg.version, true, None);
    print_row(
        "Config",
        &info.jssg.config,
        info.jssg.config_exists,
        (!info.jssg.config_exists).then_some(DEFAULTS),
    );
    println!();

    print_section_header("Site");
    print_row(
        "Source",
        &info.site.source,
        info.site.source_exists,
        (!info.site.source_exists).then_some(NOT_FOUND),
    );
    print_row("Build", &info.site.build, true, None);
    print_row("Base URL", &info.site.base_url, true, None);
    for template in &info.site.templates {
        print_row("Templates", template, true, None);
    }
    if let Some(data) = info.site.data.as_ref() {
        print_row("Data", data, true, None);
    }
    println!();

    print_section_header("Rules");
    if info.rules.is_empty() {
        print_row("Rules", "none", false, None);
    }
    for rule in &info.rules {
        println!("  {} {}", format!("#{}", rule.index).cyan(), rule.description);
    }
    println!();

    if !info.listeners.is_empty() {
        print_section_header("Listeners");
        for listener in &info.listeners {
            let mut details = Vec::new();
            if let Some(kind) = &listener.kind {
                details.push(format!("kind={kind}"));
            }
            if let Some(key) = &listener.sort_by {
                details.push(format!("sort_by={key}"));
            }
            if listener.reverse {
                details.push("reversed".to_string());
            }
            print_row(&listener.name, &details.join(" "), true, None);
        }
        println!();
    }
}

fn print_row(label: &str, value: &str, ok: bool, note: Option<&str>) {
    let symbol = if ok {
        "✓".bright_green().to_string()
    } else if note.is_some() {
        "✗".bright_red().to_string()
    } else {
        "⚠".yellow().to_string()
    };

    let formatted_value = if ok {
        value.bright_white().to_string()
    } else {
        value.dimmed().to_string()
    };

    if let Some(note_text) = note {
        println!(
            "  {} {:14} {} {}",
            symbol,
            label,
            formatted_value,
            format!("({note_text})").dimmed()
        );
    } else {
        println!("  {symbol} {label:14} {formatted_value}");
    }
}
