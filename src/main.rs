use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use siteproof::badge::Badge;
use siteproof::config::Config;
use siteproof::db::Database;
use siteproof::export::{self, ExportFormat};
use siteproof::geo::Coordinates;
use siteproof::listing::{DraftStore, EditOutcome, ListingDraft, ListingEdit, VerifiedPhoto};
use siteproof::logging;
use siteproof::metadata::{CaptureMethod, ImageSource};
use siteproof::scanner::{PhotoInput, PhotoProcessor};
use siteproof::verify::Verifier;

/// Parsed command line: positional arguments plus `--name value` options.
#[derive(Debug, Default)]
struct Args {
    positional: Vec<String>,
    options: Vec<(String, String)>,
    flags: Vec<String>,
}

/// Options that stand alone rather than taking a value.
const FLAGS: &[&str] = &["--camera", "--help", "-h", "--version", "-V"];

impl Args {
    fn parse(raw: &[String]) -> Result<Self> {
        let mut args = Args::default();

        let mut i = 0;
        while i < raw.len() {
            let arg = &raw[i];
            if FLAGS.contains(&arg.as_str()) {
                args.flags.push(arg.clone());
            } else if arg.starts_with('-') && arg.len() > 1 {
                let value = raw
                    .get(i + 1)
                    .ok_or_else(|| anyhow!("{} requires a value", arg))?;
                args.options.push((arg.clone(), value.clone()));
                i += 1;
            } else {
                args.positional.push(arg.clone());
            }
            i += 1;
        }

        Ok(args)
    }

    fn flag(&self, name: &str) -> bool {
        self.flags.iter().any(|f| f == name)
    }

    fn option(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn require(&self, name: &str) -> Result<&str> {
        self.option(name).ok_or_else(|| anyhow!("{} is required", name))
    }

    fn number(&self, name: &str) -> Result<Option<f64>> {
        self.option(name)
            .map(|v| v.parse::<f64>().with_context(|| format!("{} expects a number, got {:?}", name, v)))
            .transpose()
    }

    /// Coordinates from a `--<prefix>lat` / `--<prefix>lng` pair.
    fn coordinates(&self, prefix: &str) -> Result<Option<Coordinates>> {
        let lat_name = format!("--{}lat", prefix);
        let lng_name = format!("--{}lng", prefix);
        match (self.number(&lat_name)?, self.number(&lng_name)?) {
            (Some(lat), Some(lng)) => Ok(Some(Coordinates::try_new(lat, lng)?)),
            (None, None) => Ok(None),
            _ => Err(anyhow!("{} and {} must be given together", lat_name, lng_name)),
        }
    }

    fn capture_method(&self) -> CaptureMethod {
        if self.flag("--camera") {
            CaptureMethod::Camera
        } else {
            CaptureMethod::Upload
        }
    }

    fn listing_id(&self, index: usize) -> Result<i64> {
        let raw = self
            .positional
            .get(index)
            .ok_or_else(|| anyhow!("missing listing id"))?;
        raw.parse().with_context(|| format!("invalid listing id {:?}", raw))
    }
}

fn print_help() {
    println!(
        r#"siteproof - verify listing photos against the listing location

USAGE:
    siteproof [--config PATH] <COMMAND> [OPTIONS]

COMMANDS:
    verify FILE... [--lat N --lng N] [--camera] [--fallback-lat N --fallback-lng N]
                                Verify photos and print the results as JSON
    scan DIR [--listing ID | --lat N --lng N] [--camera]
                                Verify every image under DIR, attaching them to
                                a stored listing when --listing is given
    listing new --title T --category C [--lat N --lng N]
    listing show ID
    listing locate ID --lat N --lng N
    listing edit ID [--title T] [--category C] [--lat N --lng N]
    listing submit ID
    listing approve ID
    listing reject ID
    export --output PATH [--format json|csv] [--listing ID]

OPTIONS:
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    SITEPROOF_CONFIG    Path to config file (overrides default location)
    SITEPROOF_LOG       Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/siteproof/config.toml"#
    );
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PhotoReport<'a> {
    photo: &'a VerifiedPhoto,
    badge: Badge,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListingReport<'a> {
    listing: &'a ListingDraft,
    badge: Option<Badge>,
    requires_reverification: bool,
}

fn print_photos(photos: &[VerifiedPhoto]) -> Result<()> {
    let reports: Vec<PhotoReport> = photos
        .iter()
        .map(|photo| PhotoReport {
            photo,
            badge: photo.badge(),
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}

fn print_listing(draft: &ListingDraft) -> Result<()> {
    let report = ListingReport {
        listing: draft,
        badge: draft.display_badge(),
        requires_reverification: draft.requires_reverification(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn report_edit(outcome: &EditOutcome) {
    if outcome.returned_to_review {
        eprintln!("Listing returned to review: verification-relevant fields changed");
    }
}

fn open_store(config: &Config) -> Result<Database> {
    let db = Database::open(&config.db_path)
        .with_context(|| format!("Failed to open database {}", config.db_path.display()))?;
    db.initialize()?;
    Ok(db)
}

fn load_listing(db: &Database, id: i64) -> Result<ListingDraft> {
    db.load_draft(id)?
        .ok_or_else(|| anyhow!("Listing {} not found", id))
}

fn run_verify(args: &Args, config: &Config) -> Result<()> {
    let files = &args.positional[1..];
    if files.is_empty() {
        anyhow::bail!("verify needs at least one file");
    }

    let reference = args.coordinates("")?;
    let fallback = args.coordinates("fallback-")?;
    let method = args.capture_method();

    let inputs: Vec<PhotoInput> = files
        .iter()
        .map(|f| PhotoInput::new(ImageSource::Path(PathBuf::from(f)), method).with_fallback_location(fallback))
        .collect();

    let processor = PhotoProcessor::new(Verifier::new(config.verification));
    let photos = processor.process_batch(&inputs, reference.as_ref(), None);
    print_photos(&photos)
}

fn run_scan(args: &Args, config: &Config) -> Result<()> {
    let dir = args
        .positional
        .get(1)
        .ok_or_else(|| anyhow!("scan needs a directory"))?;
    let processor = PhotoProcessor::new(Verifier::new(config.verification));
    let method = args.capture_method();

    match args.option("--listing") {
        Some(raw) => {
            let id: i64 = raw.parse().with_context(|| format!("invalid listing id {:?}", raw))?;
            let db = open_store(config)?;
            let mut draft = load_listing(&db, id)?;

            let photos = processor.process_directory(
                Path::new(dir),
                &config.scanner.image_extensions,
                method,
                draft.location.as_ref(),
                None,
            )?;
            let outcome = draft.attach_photos(photos, processor.verifier());
            report_edit(&outcome);
            db.save_draft(&mut draft)?;
            print_listing(&draft)
        }
        None => {
            let reference = args.coordinates("")?;
            let photos = processor.process_directory(
                Path::new(dir),
                &config.scanner.image_extensions,
                method,
                reference.as_ref(),
                None,
            )?;
            print_photos(&photos)
        }
    }
}

fn run_listing(args: &Args, config: &Config) -> Result<()> {
    let action = args
        .positional
        .get(1)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("listing needs an action"))?;
    let db = open_store(config)?;
    let verifier = Verifier::new(config.verification);

    let mut draft = match action {
        "new" => {
            let mut draft = ListingDraft::new(args.require("--title")?, args.require("--category")?);
            if let Some(location) = args.coordinates("")? {
                draft.set_location(location, &verifier);
            }
            draft
        }
        "show" => return print_listing(&load_listing(&db, args.listing_id(2)?)?),
        "locate" => {
            let mut draft = load_listing(&db, args.listing_id(2)?)?;
            let location = args
                .coordinates("")?
                .ok_or_else(|| anyhow!("locate needs --lat and --lng"))?;
            let outcome = draft.apply_edit(
                ListingEdit {
                    location: Some(location),
                    ..ListingEdit::default()
                },
                &verifier,
            );
            report_edit(&outcome);
            draft
        }
        "edit" => {
            let mut draft = load_listing(&db, args.listing_id(2)?)?;
            let edit = ListingEdit {
                title: args.option("--title").map(str::to_string),
                category: args.option("--category").map(str::to_string),
                location: args.coordinates("")?,
                photos: None,
            };
            let outcome = draft.apply_edit(edit, &verifier);
            report_edit(&outcome);
            draft
        }
        "submit" => {
            let mut draft = load_listing(&db, args.listing_id(2)?)?;
            draft.submit(&verifier);
            draft
        }
        "approve" => {
            let mut draft = load_listing(&db, args.listing_id(2)?)?;
            draft.approve();
            draft
        }
        "reject" => {
            let mut draft = load_listing(&db, args.listing_id(2)?)?;
            draft.reject();
            draft
        }
        other => anyhow::bail!("Unknown listing action: {}", other),
    };

    db.save_draft(&mut draft)?;
    print_listing(&draft)
}

fn run_export(args: &Args, config: &Config) -> Result<()> {
    let output = PathBuf::from(args.require("--output")?);
    let format = match args.option("--format") {
        Some(f) => ExportFormat::parse(f).ok_or_else(|| anyhow!("Unknown export format: {}", f))?,
        None => ExportFormat::Json,
    };

    let db = open_store(config)?;
    let drafts = match args.option("--listing") {
        Some(raw) => {
            let id: i64 = raw.parse().with_context(|| format!("invalid listing id {:?}", raw))?;
            vec![load_listing(&db, id)?]
        }
        None => db.list_drafts()?,
    };

    let count = export::export_report(&drafts, &output, format)?;
    eprintln!("Exported {} photos to {}", count, output.display());
    Ok(())
}

fn main() -> Result<()> {
    let raw: Vec<String> = std::env::args().skip(1).collect();
    let args = Args::parse(&raw)?;

    if args.flag("--help") || args.flag("-h") || args.positional.is_empty() {
        print_help();
        return Ok(());
    }
    if args.flag("--version") || args.flag("-V") {
        println!("siteproof {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let _ = logging::init(Some(Config::config_dir().join("logs")));

    let config = match args.option("--config").or_else(|| args.option("-c")) {
        Some(path) => Config::load_from(Path::new(path))?,
        None => Config::load()?,
    };

    match args.positional[0].as_str() {
        "verify" => run_verify(&args, &config),
        "scan" => run_scan(&args, &config),
        "listing" => run_listing(&args, &config),
        "export" => run_export(&args, &config),
        other => {
            eprintln!("Unknown command: {}", other);
            print_help();
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siteproof::listing::{ListingVerification, ReviewStatus};
    use siteproof::verify::VerificationStatus;
    use tempfile::{tempdir, TempDir};

    fn config(dir: &TempDir) -> Config {
        Config {
            db_path: dir.path().join("siteproof.db"),
            ..Config::default()
        }
    }

    fn args(line: &str) -> Args {
        let raw: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        Args::parse(&raw).unwrap()
    }

    fn stored(config: &Config, id: i64) -> ListingDraft {
        load_listing(&open_store(config).unwrap(), id).unwrap()
    }

    fn approved_listing(config: &Config) -> i64 {
        run_listing(&args("listing new --title Bales --category paper --lat 10 --lng 10"), config).unwrap();
        run_listing(&args("listing approve 1"), config).unwrap();
        assert_eq!(stored(config, 1).review_status, ReviewStatus::Approved);
        1
    }

    #[test]
    fn test_args_parse() {
        let parsed = args("listing locate 3 --lat 51.5 --lng -0.12 --camera");
        assert_eq!(parsed.positional, vec!["listing", "locate", "3"]);
        assert!(parsed.flag("--camera"));
        assert_eq!(parsed.listing_id(2).unwrap(), 3);

        let location = parsed.coordinates("").unwrap().unwrap();
        assert_eq!(location, Coordinates::new(51.5, -0.12));
    }

    #[test]
    fn test_args_reject_bad_coordinates() {
        assert!(args("verify a.jpg --lat 95 --lng 0").coordinates("").is_err());
        assert!(args("verify a.jpg --lat 10").coordinates("").is_err());
        assert!(Args::parse(&["--lat".to_string()]).is_err());
    }

    #[test]
    fn test_locate_after_approval_returns_to_review() {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        let id = approved_listing(&config);

        run_listing(&args("listing locate 1 --lat 20 --lng 20"), &config).unwrap();

        let draft = stored(&config, id);
        assert_eq!(draft.location, Some(Coordinates::new(20.0, 20.0)));
        assert_eq!(draft.review_status, ReviewStatus::Pending);
        assert_eq!(draft.verification, ListingVerification::default());
    }

    #[test]
    fn test_edit_after_approval() {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        let id = approved_listing(&config);

        run_listing(&args("listing edit 1 --title Cardboard"), &config).unwrap();
        assert_eq!(stored(&config, id).review_status, ReviewStatus::Approved);

        run_listing(&args("listing edit 1 --category metals"), &config).unwrap();
        let draft = stored(&config, id);
        assert_eq!(draft.title, "Cardboard");
        assert_eq!(draft.category, "metals");
        assert_eq!(draft.review_status, ReviewStatus::Pending);
    }

    #[test]
    fn test_scan_into_approved_listing_returns_to_review() {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        let id = approved_listing(&config);

        let photos = dir.path().join("photos");
        std::fs::create_dir(&photos).unwrap();
        std::fs::write(photos.join("bale.jpg"), b"not really a jpeg").unwrap();

        run_scan(&args(&format!("scan {} --listing 1", photos.display())), &config).unwrap();

        let draft = stored(&config, id);
        assert_eq!(draft.photos.len(), 1);
        assert_eq!(draft.photos[0].verification.status, VerificationStatus::Unverified);
        assert_eq!(draft.review_status, ReviewStatus::Pending);
        assert!(draft.verification.verification_status.is_none());
    }

    #[test]
    fn test_scan_into_pending_listing_aggregates() {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        run_listing(&args("listing new --title Bales --category paper --lat 10 --lng 10"), &config).unwrap();

        let photos = dir.path().join("photos");
        std::fs::create_dir(&photos).unwrap();
        std::fs::write(photos.join("bale.jpg"), b"not really a jpeg").unwrap();

        run_scan(&args(&format!("scan {} --listing 1 --camera", photos.display())), &config).unwrap();

        let draft = stored(&config, 1);
        assert_eq!(draft.review_status, ReviewStatus::Pending);
        assert_eq!(draft.verification.verification_status, Some(VerificationStatus::SelfReported));
    }

    #[test]
    fn test_submit_and_export() {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        run_listing(&args("listing new --title Bales --category paper --lat 10 --lng 10"), &config).unwrap();

        let photos = dir.path().join("photos");
        std::fs::create_dir(&photos).unwrap();
        std::fs::write(photos.join("a.jpg"), b"a").unwrap();
        std::fs::write(photos.join("b.jpg"), b"b").unwrap();
        run_scan(&args(&format!("scan {} --listing 1", photos.display())), &config).unwrap();
        run_listing(&args("listing submit 1"), &config).unwrap();

        let output = dir.path().join("report.csv");
        run_export(&args(&format!("export --output {} --format csv", output.display())), &config).unwrap();

        let mut reader = csv::Reader::from_path(&output).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][5], "a.jpg");
        assert_eq!(&rows[1][11], "UNVERIFIED");
    }

    #[test]
    fn test_unknown_listing_action() {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        assert!(run_listing(&args("listing frobnicate 1"), &config).is_err());
        assert!(run_listing(&args("listing show 9"), &config).is_err());
    }
}
