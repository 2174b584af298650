use clap::Parser;
use facs2tei::config::cli::DEFAULT_CONFIG_FILE;
use facs2tei::core::batch::read_batch;
use facs2tei::core::orchestrator::{load_facsimile, resolve_descriptor};
use facs2tei::domain::ports::{ConfigProvider, DocumentJob};
use facs2tei::utils::error::ErrorSeverity;
use facs2tei::utils::{logger, validation::Validate};
use facs2tei::{
    AppConfig, BatchReport, BatchRunner, Cli, Command, CoreDataLookup, DocumentArgs,
    DocxConverter, HttpClient, ImageExtractor, JpegPdfWriter, LocalStorage, PdfMerger, Result,
    TeiError, TeiPipeline,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("🚀 Starting facs2tei");
    tracing::debug!("CLI arguments: {:?}", cli);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if let Err(e) = run(&cli, config).await {
        tracing::error!(
            "❌ facs2tei failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

/// `--config`, else `facs2tei.toml` in the working directory, else defaults.
fn load_config(cli: &Cli) -> Result<AppConfig> {
    match &cli.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path.display());
            AppConfig::from_file(path)
        }
        None => {
            let path = cli.workdir.join(DEFAULT_CONFIG_FILE);
            if path.is_file() {
                tracing::info!("📁 Loading configuration from: {}", path.display());
                AppConfig::from_file(path)
            } else {
                tracing::debug!("No configuration file, using defaults");
                Ok(AppConfig::default())
            }
        }
    }
}

async fn run(cli: &Cli, config: AppConfig) -> Result<()> {
    let storage = LocalStorage::new(cli.workdir.clone());
    let http = HttpClient::new();
    let records = CoreDataLookup::new(
        http.clone(),
        config.record_lookup.base_url.clone(),
        config.record_lookup.project_id,
    );

    match &cli.command {
        Command::Tei(args) => {
            args.validate()?;
            let pipeline = TeiPipeline::new(
                storage.clone(),
                config.clone(),
                http,
                records,
                DocxConverter::new(),
            );
            run_documents(&storage, &config, args, pipeline).await
        }
        Command::Images(args) => {
            args.validate()?;
            let extractor =
                ImageExtractor::new(storage.clone(), config.clone(), http.clone(), records, http);
            run_documents(&storage, &config, args, extractor).await
        }
        Command::Inspect(args) => {
            args.validate()?;
            if args.file.is_some() {
                return Err(TeiError::InvalidConfigValueError {
                    field: "file".to_string(),
                    value: args.file.clone().unwrap_or_default(),
                    reason: "inspect works on a single document".to_string(),
                });
            }
            let resolved = resolve_descriptor(&records, &args.to_descriptor()).await?;
            let model =
                load_facsimile(&http, &resolved.manifests, config.display_language()).await?;
            println!("{}", serde_json::to_string_pretty(&model)?);
            Ok(())
        }
        Command::Merge(args) => {
            args.validate()?;
            let input = args.input.as_deref().unwrap_or(config.merge_input_dir());
            let output = args.output.as_deref().unwrap_or(config.merge_output_dir());
            let report = PdfMerger::new(storage, JpegPdfWriter::new())
                .merge(input, output)
                .await?;
            print_report(&report, "PDFs");
            Ok(())
        }
    }
}

fn print_report(report: &BatchReport, noun: &str) {
    println!(
        "✅ Finished {} {} ({} succeeded)",
        report.items.len(),
        noun,
        report.succeeded()
    );
    for item in report.failed() {
        if let Err(message) = &item.outcome {
            println!("❌ {}: {}", item.document, message);
        }
    }
}

async fn run_documents<J: DocumentJob>(
    storage: &LocalStorage,
    config: &AppConfig,
    args: &DocumentArgs,
    job: J,
) -> Result<()> {
    match &args.file {
        Some(file) => {
            let path = format!("{}/{}", config.csv_dir(), file);
            let descriptors = read_batch(storage, &path, config.xml_id_field()).await?;
            let report = BatchRunner::new(job).run(&descriptors).await;
            print_report(&report, "documents");
            Ok(())
        }
        None => {
            let summary = job.process(&args.to_descriptor()).await?;
            println!("✅ {}", summary);
            Ok(())
        }
    }
}
