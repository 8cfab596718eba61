//! resume-forge – render resume templates from JSON and export them as PDF.
//!
//! Usage:
//!   resume-forge templates
//!   resume-forge html <resume.json> [-o preview.html]
//!   resume-forge pdf <resume.json> [-o out.pdf] [--mode fixed]
//!   resume-forge batch <people.json> --out-dir pdfs
//!   resume-forge print <resume.json> -o print.html
//!   resume-forge placeholders

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use resume_forge::composer::RenderOptions;
use resume_forge::fields::{Escape, SCALAR_FIELDS};
use resume_forge::pagination::PageMode;
use resume_forge::placeholder::placeholder_names;
use resume_forge::pipeline::ExportConfig;
use resume_forge::record::ResumeRecord;
use resume_forge::sections::SECTION_PLACEHOLDERS;
use resume_forge::session::{
    generate_batch, FilePreview, HtmlPrintPage, ResumeSession, BATCH_DELAY,
};
use resume_forge::templates::{BuiltinTemplates, DirTemplates, TemplateSource};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON export configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Template to render with
    #[arg(short, long, global = true)]
    template: Option<String>,

    /// Load templates from the *.html files in this directory instead of the
    /// bundled ones
    #[arg(long, global = true)]
    template_dir: Option<PathBuf>,

    /// Page mode (overrides the config file)
    #[arg(long, value_enum, global = true)]
    mode: Option<ModeArg>,

    /// TrueType font used for text measurement
    #[arg(long, global = true)]
    font: Option<PathBuf>,

    /// HTML-escape interpolated values
    #[arg(long, global = true)]
    escape: bool,

    /// Refuse records missing a name, email, summary or experience
    #[arg(long, global = true)]
    validate: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available templates
    Templates,
    /// Render a resume to HTML
    Html {
        data: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export a resume as PDF
    Pdf {
        data: PathBuf,
        /// Output file (defaults to <name>-resume.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export every resume in a JSON array
    Batch {
        data: PathBuf,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Pause between documents
        #[arg(long, default_value_t = BATCH_DELAY.as_millis() as u64)]
        delay_ms: u64,
    },
    /// Write a page that opens the print dialog
    Print {
        data: PathBuf,
        #[arg(short, long, default_value = "print.html")]
        output: PathBuf,
    },
    /// Show the placeholders the selected template uses
    Placeholders,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Single,
    Fixed,
}

impl From<ModeArg> for PageMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Single => PageMode::SinglePage,
            ModeArg::Fixed => PageMode::Fixed,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let session = build_session(&cli)?;

    match &cli.command {
        Commands::Templates => {
            for name in session.available_templates() {
                let marker = if name == session.current_template() { "*" } else { " " };
                println!("{marker} {name}");
            }
        }
        Commands::Html { data, output } => {
            let session = with_record(session, data, cli.validate)?;
            match output {
                Some(path) => {
                    session.preview(&mut FilePreview::new(path))?;
                    info!("HTML written to {}", path.display());
                }
                None => {
                    let mut html = String::new();
                    session.preview(&mut html)?;
                    print!("{html}");
                }
            }
        }
        Commands::Pdf { data, output } => {
            let session = with_record(session, data, cli.validate)?;
            let path = match output {
                Some(path) => path.clone(),
                None => PathBuf::from(
                    session
                        .resume_data()
                        .map(ResumeRecord::pdf_file_name)
                        .unwrap_or_else(|| "resume.pdf".to_string()),
                ),
            };
            let export = session
                .generate_pdf(&path)
                .with_context(|| format!("exporting {}", path.display()))?;
            eprintln!(
                "Wrote '{}' ({} bytes, {} page{})",
                path.display(),
                export.bytes.len(),
                export.pages,
                if export.pages == 1 { "" } else { "s" }
            );
        }
        Commands::Batch {
            data,
            out_dir,
            delay_ms,
        } => {
            let records = read_records(data)?;
            if cli.validate {
                for record in &records {
                    record.validate().with_context(|| {
                        format!("invalid record for '{}'", record.personal_info.name)
                    })?;
                }
            }
            let written = generate_batch(
                &session,
                &records,
                out_dir,
                Duration::from_millis(*delay_ms),
            )?;
            for path in written {
                println!("{}", path.display());
            }
        }
        Commands::Print { data, output } => {
            let session = with_record(session, data, cli.validate)?;
            session.print(&mut HtmlPrintPage::new(output))?;
            eprintln!("Open '{}' in a browser to print", output.display());
        }
        Commands::Placeholders => {
            let html = session_template(&cli)?;
            for name in placeholder_names(&html) {
                let kind = if SCALAR_FIELDS.contains(&name) {
                    "field"
                } else if SECTION_PLACEHOLDERS.contains(&name) {
                    "section"
                } else {
                    "unknown"
                };
                println!("{name}\t{kind}");
            }
        }
    }

    Ok(())
}

fn template_source(cli: &Cli) -> Result<Box<dyn TemplateSource>> {
    let source: Box<dyn TemplateSource> = match &cli.template_dir {
        Some(dir) => Box::new(
            DirTemplates::scan(dir)
                .with_context(|| format!("scanning templates in {}", dir.display()))?,
        ),
        None => Box::new(BuiltinTemplates),
    };
    Ok(source)
}

fn build_session(cli: &Cli) -> Result<ResumeSession> {
    let mut config = match &cli.config {
        Some(path) => ExportConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ExportConfig::default(),
    };
    if let Some(mode) = cli.mode {
        config.page.mode = mode.into();
    }
    if let Some(font) = &cli.font {
        config.font_path = Some(font.clone());
    }

    let source = template_source(cli)?;
    let mut session = ResumeSession::init(source.as_ref())
        .context("loading templates")?
        .with_export_config(config)
        .with_render_options(RenderOptions {
            escape: if cli.escape { Escape::Html } else { Escape::None },
        });

    if let Some(name) = &cli.template {
        if !session.set_template(name) {
            bail!(
                "unknown template '{name}' (available: {})",
                session.available_templates().join(", ")
            );
        }
    }
    Ok(session)
}

/// Raw body of the selected template, for placeholder listing.
fn session_template(cli: &Cli) -> Result<String> {
    let source = template_source(cli)?;
    let name = match &cli.template {
        Some(name) => name.clone(),
        None => ResumeSession::init(source.as_ref())?
            .current_template()
            .to_string(),
    };
    source
        .fetch(&name)
        .with_context(|| format!("reading template '{name}'"))
}

fn with_record(mut session: ResumeSession, path: &Path, validate: bool) -> Result<ResumeSession> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let record = ResumeRecord::from_json(&text)
        .with_context(|| format!("parsing resume {}", path.display()))?;
    if validate {
        record.validate()?;
    }
    session.set_resume_data(record);
    Ok(session)
}

fn read_records(path: &Path) -> Result<Vec<ResumeRecord>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing resume list {}", path.display()))
}
