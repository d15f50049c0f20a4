use std::io::{self, BufWriter, Read, Write};
use std::{fs, path::PathBuf};

use clap::Parser;
use loopsmith_core::{FatalError, Report, Translator, TranslatorConfig};
use loopsmith_ir::{ModuleCache, Program};
use miette::{IntoDiagnostic, miette};

#[derive(Parser, Debug)]
#[command(name = "loopsmith")]
#[command(version = "0.1.0")]
#[command(after_help = "Examples:\n\n\
    To translate a unit and print the result:\n\
    $ loopsmith unit.xml\n\n\
    To translate with modules from a build directory:\n\
    $ loopsmith -L build/modules -o out.xml unit.xml\n\n\
    To rewrite several units in place:\n\
    $ loopsmith -U a.xml b.xml")]
#[command(
    about = "loopsmith applies source-to-source loop transformations driven by directives in an XcodeML unit.",
    long_about = None
)]
pub struct Cli {
    /// Read settings from a TOML file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Search modules from the directory
    #[arg(short = 'L', long = "directory")]
    module_directories: Option<Vec<PathBuf>>,

    /// First word of the directives to apply
    #[arg(long)]
    reserved_prefix: Option<String>,

    /// Split longer foreign pragmas into continued pragmas
    #[arg(long)]
    max_columns: Option<usize>,

    /// Output to the specified file
    #[arg(short = 'o', long = "output", value_name = "FILE", conflicts_with = "update")]
    output_file: Option<PathBuf>,

    /// Rewrite the input files
    #[arg(short = 'U', long, default_value_t = false)]
    update: bool,

    /// Exit with an error when a directive could not be applied
    #[arg(long, default_value_t = false)]
    strict: bool,

    #[command(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity,

    /// XcodeML units to translate, standard input when omitted
    files: Option<Vec<PathBuf>>,
}

impl Cli {
    pub fn run(&self) -> miette::Result<()> {
        if self.update && self.files.is_none() {
            return Err(miette!("--update needs input files"));
        }
        if self.output_file.is_some() && self.files.as_ref().is_some_and(|files| files.len() > 1) {
            return Err(miette!("--output accepts a single input file"));
        }

        let config = self.config()?;
        let mut modules = config.module_cache();
        let translator = Translator::new(config);
        let mut failed = 0;
        let mut fatal = 0;

        for (file, content) in self.read_contents()? {
            let name = file
                .as_ref()
                .map_or_else(|| "<stdin>".to_string(), |f| f.to_string_lossy().to_string());

            match Self::translate_unit(&translator, &mut modules, &name, &content) {
                Ok((report, output)) => {
                    self.print_report(&report)?;
                    failed += usize::from(report.has_errors());
                    self.write(file, &output)?;
                }
                Err(error) => {
                    log::debug!("Skipping `{}`", name);
                    eprintln!("{:?}", miette::Report::new(error));
                    fatal += 1;
                }
            }
        }

        if fatal > 0 {
            return Err(miette!("{} unit(s) could not be translated", fatal));
        }
        if self.strict && failed > 0 {
            return Err(miette!("{} unit(s) with directives that could not be applied", failed));
        }

        Ok(())
    }

    /// Parses, translates and serializes one unit. A fatal error leaves nothing to write.
    fn translate_unit(
        translator: &Translator,
        modules: &mut ModuleCache,
        name: &str,
        content: &str,
    ) -> Result<(Report, String), FatalError> {
        let mut program = Program::from_xml(content).map_err(|cause| FatalError::new(name, cause))?;
        let report = translator.translate(&mut program, modules)?;
        let output = program.to_xml().map_err(|cause| FatalError::new(name, cause))?;

        Ok((report, output))
    }

    /// The config file, when given, with command-line flags on top.
    fn config(&self) -> miette::Result<TranslatorConfig> {
        let mut config = match &self.config {
            Some(path) => TranslatorConfig::from_file(path)?,
            None => TranslatorConfig::default(),
        };

        if let Some(prefix) = &self.reserved_prefix {
            config.reserved_prefix = prefix.clone();
        }
        if let Some(max_columns) = self.max_columns {
            config.max_columns = Some(max_columns);
        }
        if let Some(dirs) = &self.module_directories {
            config.module_search_paths = dirs.clone();
        }

        Ok(config)
    }

    fn read_contents(&self) -> miette::Result<Vec<(Option<PathBuf>, String)>> {
        match &self.files {
            Some(files) => files
                .iter()
                .map(|file| {
                    fs::read_to_string(file)
                        .into_diagnostic()
                        .map(|content| (Some(file.clone()), content))
                })
                .collect(),
            None => {
                let mut input = String::new();
                io::stdin().read_to_string(&mut input).into_diagnostic()?;
                Ok(vec![(None, input)])
            }
        }
    }

    fn print_report(&self, report: &Report) -> miette::Result<()> {
        let stderr = io::stderr();
        let mut handle = stderr.lock();

        for diagnostic in report.diagnostics() {
            writeln!(handle, "{}", diagnostic).into_diagnostic()?;
        }
        log::info!(
            "{}: {} applied, {} dropped",
            report.file(),
            report.applied(),
            report.dropped()
        );

        Ok(())
    }

    fn write(&self, file: Option<PathBuf>, output: &str) -> miette::Result<()> {
        let target = match (&self.output_file, file) {
            (Some(output_file), _) => Some(output_file.clone()),
            (None, Some(file)) if self.update => Some(file),
            _ => None,
        };

        match target {
            Some(path) => fs::write(&path, output).into_diagnostic(),
            None => {
                let stdout = io::stdout();
                let mut handle = BufWriter::new(stdout.lock());
                writeln!(handle, "{}", output).into_diagnostic()?;
                handle.flush().into_diagnostic()
            }
        }
    }
}
