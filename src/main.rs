//! Structer CLI - inspect Go packages and their named types

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::PathBuf;
use structer::config::{self, StructerConfig};
use structer::types::{BasicKind, Field};
use structer::ui::{self, theme, Icons};
use structer::walk::StructInfo;
use structer::{walk, Flow, PackageSet, SearchRoots, Type, TypeName, TypeVisitor, WalkContext};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "structer")]
#[command(version)]
#[command(about = "Package and type introspection for Go source trees")]
#[command(long_about = r#"
Structer loads and type-checks Go packages once, indexes every named type
they declare, and answers questions code generators ask:
  • which types implement an interface
  • which constants belong to a type
  • what a type looks like, field by field

Example usage:
  structer resolve example.com/app/model
  structer implementers io.Writer --package example.com/app/sink
  structer consts example.com/app/model.Color
  structer walk example.com/app/model.Order
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    json: bool,

    /// Config file (defaults to ./structer.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Workspace root import paths are resolved against
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// Standard library source root
    #[arg(long, global = true)]
    system_root: Option<PathBuf>,

    /// Load _test.go files too
    #[arg(long, global = true)]
    tests: bool,

    /// Fail a package on its first hard type error
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve packages and list their named types
    Resolve {
        /// Import paths
        #[arg(required = true)]
        packages: Vec<String>,
    },

    /// Find every indexed type implementing an interface
    Implementers {
        /// Interface as full/pkg/path.Name
        interface: String,

        /// Extra packages to resolve before searching
        #[arg(short, long = "package")]
        packages: Vec<String>,
    },

    /// List the constants declared with a type
    Consts {
        /// Type as full/pkg/path.Name
        type_name: String,

        /// Include unexported constants
        #[arg(long)]
        unexported: bool,
    },

    /// Print the structure of a type
    Walk {
        /// Type as full/pkg/path.Name
        type_name: String,
    },

    /// Print the declaration of a type
    Source {
        /// Type as full/pkg/path.Name
        type_name: String,
    },

    /// Print the doc comment of a type or one of its fields
    Doc {
        /// Type as full/pkg/path.Name
        type_name: String,

        #[arg(short, long)]
        field: Option<String>,
    },

    /// Write a structer.toml with the current defaults
    Init {
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(self) -> bool {
        self == OutputMode::Human
    }
}

pub fn emit_success(mode: OutputMode, command: &str, data: impl Serialize) -> anyhow::Result<()> {
    if mode == OutputMode::Json {
        let envelope = serde_json::json!({
            "status": "ok",
            "command": command,
            "data": data,
        });
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output stays clean
    let filter = if cli.verbose {
        EnvFilter::new("structer=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mode = if cli.json { OutputMode::Json } else { OutputMode::Human };

    match &cli.command {
        Commands::Init { path, force } => run_init(mode, path.clone(), *force),
        Commands::Resolve { packages } => run_resolve(&cli, mode, packages),
        Commands::Implementers { interface, packages } => run_implementers(&cli, mode, interface, packages),
        Commands::Consts { type_name, unexported } => run_consts(&cli, mode, type_name, *unexported),
        Commands::Walk { type_name } => run_walk(&cli, mode, type_name),
        Commands::Source { type_name } => run_source(&cli, mode, type_name),
        Commands::Doc { type_name, field } => run_doc(&cli, mode, type_name, field.as_deref()),
    }
}

fn open_set(cli: &Cli, mode: OutputMode) -> anyhow::Result<PackageSet> {
    let config = config::load_config(cli.config.as_deref())?.unwrap_or_default();

    let mut roots = config.search_roots(SearchRoots::from_env());
    if let Some(workspace) = &cli.workspace {
        roots.workspace = Some(workspace.clone());
    }
    if let Some(system) = &cli.system_root {
        roots.system = Some(system.clone());
    }

    let mut options = config.resolve_options();
    options.include_tests |= cli.tests;
    if cli.strict {
        options.allow_hard_errors = false;
    }

    let set = PackageSet::new(roots)?.with_options(options);
    if mode.is_human() {
        return Ok(set.capture_errors(|e| ui::warn(&e.to_string())));
    }
    Ok(set)
}

/// Parse `name` and make sure its package is loaded
fn load_type(set: &mut PackageSet, name: &str) -> anyhow::Result<TypeName> {
    let name = TypeName::parse(name)?;
    if set.resolve(&name.package_path)?.is_none() {
        anyhow::bail!("package not found: {}", name.package_path);
    }
    Ok(name)
}

#[derive(Serialize)]
struct PackageSummary {
    path: String,
    name: String,
    kind: structer::PackageKind,
    dir: Option<PathBuf>,
    opaque: bool,
    types: Vec<String>,
    consts: usize,
    imports: Vec<String>,
}

fn run_resolve(cli: &Cli, mode: OutputMode, packages: &[String]) -> anyhow::Result<()> {
    let mut set = open_set(cli, mode)?;
    let mut summaries = Vec::new();

    for path in packages {
        let Some(pkg) = set.resolve(path)? else {
            if mode.is_human() {
                ui::error(&format!("package not found: {}", path));
            }
            continue;
        };
        summaries.push(PackageSummary {
            path: pkg.path.clone(),
            name: pkg.name.clone(),
            kind: pkg.kind,
            dir: pkg.dir.clone(),
            opaque: pkg.opaque,
            types: pkg.types.keys().cloned().collect(),
            consts: pkg.consts.len(),
            imports: pkg.imports.clone(),
        });
    }

    if !mode.is_human() {
        let data = serde_json::json!({ "packages": summaries, "stats": set.stats() });
        return emit_success(mode, "resolve", data);
    }

    for summary in &summaries {
        ui::header(&format!("{} {}", summary.path, ui::kind_label(summary.kind)));
        if let Some(dir) = &summary.dir {
            ui::summary_row("dir:", &dir.display().to_string());
        }
        if summary.opaque {
            ui::summary_row("types:", &ui::dim("opaque (no sources)"));
            continue;
        }
        ui::summary_row("consts:", &summary.consts.to_string());
        ui::section("Types");
        for ty in &summary.types {
            let full = TypeName::new(&summary.path, ty);
            let shape = set
                .find_object(&full)
                .map(|def| def.underlying.kind_str())
                .unwrap_or("");
            println!("  {} {}", ty.style(theme().ident.clone()), ui::dim(shape));
        }
    }

    let stats = set.stats();
    ui::section("Stats");
    ui::summary_row("requests:", &stats.requests.to_string());
    ui::summary_row("cache hits:", &stats.cache_hits.to_string());
    ui::summary_row("packages loaded:", &stats.loads.to_string());
    ui::summary_row("indexed types:", &set.index().len().to_string());
    Ok(())
}

#[derive(Serialize)]
struct Implementer {
    #[serde(rename = "type")]
    ty: TypeName,
    form: structer::resolve::Implementation,
}

fn run_implementers(cli: &Cli, mode: OutputMode, interface: &str, packages: &[String]) -> anyhow::Result<()> {
    let mut set = open_set(cli, mode)?;
    let iface = TypeName::parse(interface)?;
    for path in packages {
        if set.resolve(path)?.is_none() {
            ui::warn(&format!("package not found: {}", path));
        }
    }

    let found: Vec<Implementer> = set
        .find_implementers(&iface)?
        .into_iter()
        .map(|(ty, form)| Implementer { ty, form })
        .collect();

    if !mode.is_human() {
        return emit_success(mode, "implementers", serde_json::json!({ "interface": iface, "implementers": found }));
    }

    ui::header(&format!("{} {}", Icons::SEARCH, iface));
    if found.is_empty() {
        println!("  {}", ui::dim("no implementers among indexed types"));
    }
    for imp in &found {
        println!("  {} {}", imp.ty.style(theme().ident.clone()), ui::dim(&format!("({})", imp.form)));
    }
    Ok(())
}

fn run_consts(cli: &Cli, mode: OutputMode, type_name: &str, unexported: bool) -> anyhow::Result<()> {
    let mut set = open_set(cli, mode)?;
    let name = load_type(&mut set, type_name)?;
    let consts = set.extract_consts(&name, unexported)?;

    if !mode.is_human() {
        return emit_success(mode, "consts", &consts);
    }

    let enum_note = if consts.is_enum { " enum" } else { "" };
    ui::header(&format!("{} {}{}", name, consts.underlying, enum_note));
    for value in &consts.values {
        println!("  {} = {}", value.name.name.style(theme().ident.clone()), value.value);
    }
    if consts.is_empty() {
        println!("  {}", ui::dim("no constants"));
    }
    Ok(())
}

/// Renders a walk as an indented outline
#[derive(Default)]
struct Outline {
    lines: Vec<String>,
}

impl Outline {
    fn line(&mut self, ctx: &WalkContext<'_>, text: String) {
        self.lines.push(format!("{}{}", "  ".repeat(ctx.depth()), text));
    }
}

impl TypeVisitor for Outline {
    fn enter_struct(&mut self, ctx: &WalkContext<'_>, _info: &StructInfo<'_>) -> structer::Result<Flow> {
        self.line(ctx, "struct".to_string());
        Ok(Flow::Continue)
    }
    fn enter_field(&mut self, ctx: &WalkContext<'_>, _info: &StructInfo<'_>, field: &Field) -> structer::Result<Flow> {
        let mut text = if field.embedded { format!("(embedded) {}", field.ty) } else { field.name.clone() };
        if let Some(tag) = &field.tag {
            text.push_str(&format!(" `{}`", tag));
        }
        self.line(ctx, text);
        Ok(Flow::Continue)
    }
    fn enter_map_key(&mut self, ctx: &WalkContext<'_>, _key: &Type) -> structer::Result<Flow> {
        self.line(ctx, "key".to_string());
        Ok(Flow::Continue)
    }
    fn enter_map_elem(&mut self, ctx: &WalkContext<'_>, _elem: &Type) -> structer::Result<Flow> {
        self.line(ctx, "elem".to_string());
        Ok(Flow::Continue)
    }
    fn enter_pointer(&mut self, ctx: &WalkContext<'_>, _elem: &Type) -> structer::Result<Flow> {
        self.line(ctx, "*".to_string());
        Ok(Flow::Continue)
    }
    fn enter_slice(&mut self, ctx: &WalkContext<'_>, _elem: &Type) -> structer::Result<Flow> {
        self.line(ctx, "[]".to_string());
        Ok(Flow::Continue)
    }
    fn enter_array(&mut self, ctx: &WalkContext<'_>, len: u64, _elem: &Type) -> structer::Result<Flow> {
        self.line(ctx, format!("[{}]", len));
        Ok(Flow::Continue)
    }
    fn visit_basic(&mut self, ctx: &WalkContext<'_>, kind: BasicKind) -> structer::Result<()> {
        self.line(ctx, kind.to_string());
        Ok(())
    }
    fn visit_named(&mut self, ctx: &WalkContext<'_>, name: &TypeName) -> structer::Result<()> {
        self.line(ctx, name.to_string());
        Ok(())
    }
}

fn run_walk(cli: &Cli, mode: OutputMode, type_name: &str) -> anyhow::Result<()> {
    let mut set = open_set(cli, mode)?;
    let name = load_type(&mut set, type_name)?;
    let def = set
        .definition(&name)
        .ok_or_else(|| structer::Error::ObjectNotFound(name.to_string()))?;

    let mut outline = Outline::default();
    walk(&name, &def.underlying, &mut outline)?;

    if !mode.is_human() {
        return emit_success(mode, "walk", serde_json::json!({ "type": name, "outline": outline.lines }));
    }
    ui::header(&name.to_string());
    for line in &outline.lines {
        println!("{}", line);
    }
    Ok(())
}

fn run_source(cli: &Cli, mode: OutputMode, type_name: &str) -> anyhow::Result<()> {
    let mut set = open_set(cli, mode)?;
    let name = load_type(&mut set, type_name)?;
    let source = String::from_utf8_lossy(&set.extract_source(&name)?).into_owned();

    if !mode.is_human() {
        return emit_success(mode, "source", serde_json::json!({ "type": name, "source": source }));
    }
    if let Some(span) = set.find_object(&name).and_then(|def| def.span.clone()) {
        println!("{} {}", Icons::FILE, ui::dim(&format!("{}:{}", span.file, span.line)));
    }
    println!("type {}", source);
    Ok(())
}

fn run_doc(cli: &Cli, mode: OutputMode, type_name: &str, field: Option<&str>) -> anyhow::Result<()> {
    let mut set = open_set(cli, mode)?;
    let name = load_type(&mut set, type_name)?;
    let doc = match field {
        Some(field) => set.field_doc(&name, field)?,
        None => set.type_doc(&name)?,
    };

    if !mode.is_human() {
        return emit_success(mode, "doc", serde_json::json!({ "type": name, "field": field, "doc": doc }));
    }
    if doc.is_empty() {
        println!("{}", ui::dim("no doc comment"));
    } else {
        print!("{}", doc);
    }
    Ok(())
}

fn run_init(mode: OutputMode, path: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(config::default_config_path);
    let roots = SearchRoots::from_env();
    let options = structer::ResolveOptions::default();
    let config = StructerConfig {
        workspace_root: roots.workspace,
        system_root: roots.system,
        vendor_dir: Some(roots.vendor_dir),
        include_tests: Some(options.include_tests),
        allow_hard_errors: Some(options.allow_hard_errors),
    };
    config::write_config(&path, &config, force)?;

    if !mode.is_human() {
        return emit_success(mode, "init", serde_json::json!({ "path": path, "config": config }));
    }
    ui::success(&format!("{} wrote {}", Icons::GEAR, path.display()));
    Ok(())
}
