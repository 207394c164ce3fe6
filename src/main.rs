// Command-line front end for the PAN card extraction engine

use clap::{Parser, Subcommand};
use log::error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use pancard_ocr::{
    models::{ExtractionResult, Field},
    utils::ExtractionError,
    validation::{DocumentNumberInfo, FormatValidator},
    ExtractorConfig, IdentityExtractor,
};

#[derive(Parser)]
#[command(name = "pancard-ocr")]
#[command(about = "Extract and correct the fields of a photographed PAN card", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the card fields and portrait from an image
    Extract {
        /// Card image (JPEG, PNG, ...)
        image: PathBuf,

        /// Skip ensemble voting and sweep every image variant instead
        #[arg(long)]
        no_ensemble: bool,

        /// JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Tesseract language(s), e.g. "eng" or "eng+hin"
        #[arg(short, long)]
        lang: Option<String>,

        /// Tesseract data directory
        #[arg(long)]
        tessdata: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Write the portrait crop to this file
        #[arg(long)]
        portrait_out: Option<PathBuf>,
    },

    /// Check a document number against the PAN format
    Validate {
        number: String,
    },

    /// Break a document number into its parts
    Info {
        number: String,
    },
}

fn print_detailed_report(result: &ExtractionResult) {
    println!("\n===============================================");
    println!("        PAN CARD EXTRACTION REPORT");
    println!("===============================================\n");

    println!("CARD FIELDS:");
    for field in Field::ALL {
        let note = if field == Field::SecondaryName && result.secondary_name_inferred {
            " (guessed from name, not read from card)"
        } else {
            ""
        };
        println!(
            "  {:<16} {}{}",
            format!("{}:", capitalise(&field.to_string())),
            result.field(field).unwrap_or("(not found)"),
            note
        );
    }
    println!(
        "  Portrait:        {}",
        match &result.portrait {
            Some(bytes) => format!("{} bytes JPEG", bytes.len()),
            None => "(not extracted)".to_string(),
        }
    );

    let completeness = result.completeness();
    println!("\nCOMPLETENESS: {}/{}", completeness.found, completeness.total);
    println!("  {}", result.status_message());

    if !result.raw_text.is_empty() {
        println!("\nRECOGNISED TEXT:");
        for line in result.raw_text.lines().filter(|l| !l.trim().is_empty()) {
            println!("  | {}", line);
        }
    }
}

fn capitalise(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_extract(
    image: PathBuf,
    no_ensemble: bool,
    config: Option<PathBuf>,
    lang: Option<String>,
    tessdata: Option<String>,
    json: bool,
    portrait_out: Option<PathBuf>,
) -> Result<bool, ExtractionError> {
    let mut config = match config {
        Some(path) => ExtractorConfig::from_file(path)?,
        None => ExtractorConfig::default(),
    };
    if let Some(lang) = lang {
        config.language = lang;
    }
    if tessdata.is_some() {
        config.tessdata_path = tessdata;
    }

    let bytes = fs::read(&image)?;
    let extractor = IdentityExtractor::with_tesseract(config);
    let result = extractor.extract(&bytes, !no_ensemble);

    if let (Some(path), Some(portrait)) = (portrait_out, &result.portrait) {
        fs::write(&path, portrait)?;
        println!("Portrait written to {}", path.display());
    }

    if json {
        let rendered = serde_json::to_string_pretty(&result).map_err(std::io::Error::from)?;
        println!("{}", rendered);
    } else {
        print_detailed_report(&result);
    }

    Ok(result.success)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            image,
            no_ensemble,
            config,
            lang,
            tessdata,
            json,
            portrait_out,
        } => match run_extract(image, no_ensemble, config, lang, tessdata, json, portrait_out) {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => ExitCode::FAILURE,
            Err(e) => {
                error!("{}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Validate { number } => {
            let candidate = number.trim().to_uppercase();
            if FormatValidator::is_valid_document_number(&candidate) {
                println!("{}: valid PAN format", candidate);
                ExitCode::SUCCESS
            } else {
                println!("{}: invalid PAN format (expected AAAAA9999A)", candidate);
                ExitCode::FAILURE
            }
        }
        Commands::Info { number } => match DocumentNumberInfo::parse(&number) {
            Ok(info) => {
                println!("PAN:               {}", info.document_number);
                println!("First three:       {}", info.first_three_letters);
                println!(
                    "Holder type:       {} ({})",
                    info.holder_type, info.holder_type_indicator
                );
                println!("Surname initial:   {}", info.surname_initial);
                println!("Sequence number:   {}", info.sequential_number);
                println!("Check letter:      {}", info.check_letter);
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("{}", e);
                ExitCode::FAILURE
            }
        },
    }
}
