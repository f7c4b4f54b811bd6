//! CLI binary for inspecting and verifying in-app billing records.

use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};
use indicatif::{ProgressBar, ProgressStyle};
use kinapp_rs::billing::{BillingFixture, InMemoryBillingService};
use kinapp_rs::kin_app::KinAppBlocking;
use kinapp_rs::models::{
    Product, ProductId, ProductType, Purchase, PurchaseState, Verification, VerificationOutcome,
};
use kinapp_rs::verifier::{PURCHASE_REQUEST_CODE, PurchaseVerifier, RESULT_OK};
use owo_colors::OwoColorize;

/// Environment variable holding the base64 public key.
const PUBLIC_KEY_ENV: &str = "KINAPP_PUBLIC_KEY";

/// In-app billing CLI: decode, verify and restore purchase records.
#[derive(Debug, Parser)]
#[command(name = "kinapp", version, about)]
struct Cli {
    /// Package name sent to the billing service.
    #[arg(long, global = true, default_value = "com.example.app")]
    package: String,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Decode a purchase JSON file and print it.
    Purchase {
        /// Purchase JSON file.
        file: PathBuf,
    },
    /// Decode a product JSON file and print it.
    Product {
        /// Product JSON file.
        file: PathBuf,
    },
    /// Verify a purchase-flow result.
    Verify(VerifyArgs),
    /// List the catalog of a billing fixture.
    Products(ProductsArgs),
    /// Restore owned purchases from a billing fixture.
    Restore(RestoreArgs),
}

/// Arguments for the `verify` subcommand.
#[derive(Debug, Args)]
struct VerifyArgs {
    /// File holding the raw purchase data. Its bytes are verified exactly
    /// as read, including any trailing newline.
    #[arg(long, value_name = "FILE")]
    data: PathBuf,
    /// Strip trailing line breaks from the data file before verifying.
    #[arg(long)]
    trim_newline: bool,
    /// Base64 signature of the purchase data.
    #[arg(long)]
    signature: Option<String>,
    /// Platform result code of the flow (-1 = OK, 0 = canceled).
    #[arg(long, default_value_t = RESULT_OK, allow_hyphen_values = true)]
    result_code: i32,
    /// Request tag of the flow.
    #[arg(long, default_value_t = PURCHASE_REQUEST_CODE)]
    request_code: i32,
    /// Base64 public key (default: $KINAPP_PUBLIC_KEY).
    #[arg(long)]
    key: Option<String>,
}

/// Arguments for the `products` subcommand.
#[derive(Debug, Args)]
struct ProductsArgs {
    /// Billing fixture JSON file.
    #[arg(long, value_name = "FILE")]
    fixture: PathBuf,
    /// Product type to list (inapp or subs).
    #[arg(long = "type", default_value = "inapp", value_parser = str::parse::<ProductType>)]
    product_type: ProductType,
}

/// Arguments for the `restore` subcommand.
#[derive(Debug, Args)]
struct RestoreArgs {
    /// Billing fixture JSON file.
    #[arg(long, value_name = "FILE")]
    fixture: PathBuf,
    /// Product type to restore (inapp or subs).
    #[arg(long = "type", default_value = "inapp", value_parser = str::parse::<ProductType>)]
    product_type: ProductType,
    /// Override the fixture's page size.
    #[arg(long)]
    page_size: Option<usize>,
    /// Maximum number of pages to request.
    #[arg(long)]
    max_pages: Option<usize>,
    /// Keep only purchases whose signature verifies.
    #[arg(long)]
    verified: bool,
    /// Base64 public key (default: $KINAPP_PUBLIC_KEY).
    #[arg(long)]
    key: Option<String>,
}

/// Runs the CLI, returning an appropriate exit code.
fn run() -> io::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let _dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    dispatch(&cli.package, cli.command)
}

/// Dispatches to the appropriate subcommand handler.
fn dispatch(package: &str, command: Command) -> io::Result<ExitCode> {
    match command {
        Command::Purchase { file } => cmd_purchase(&file),
        Command::Product { file } => cmd_product(&file),
        Command::Verify(args) => cmd_verify(&args),
        Command::Products(args) => cmd_products(package, &args),
        Command::Restore(args) => cmd_restore(package, &args),
    }
}

/// Reads a file, printing an error on failure.
///
/// Returns `Ok(None)` if the file could not be read (error already
/// printed), or `Err` on stderr I/O failure.
fn read_input(label: &str, path: &Path) -> io::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} cannot read {label} {}: {err}",
                "error:".red().bold(),
                path.display()
            )?;
            Ok(None)
        }
    }
}

/// Resolves the public key from the flag or the environment.
///
/// A missing key is not fatal: only test purchases will verify.
fn resolve_public_key(flag: Option<&str>) -> io::Result<String> {
    if let Some(key) = flag.filter(|key| !key.is_empty()) {
        return Ok(key.to_owned());
    }
    match std::env::var(PUBLIC_KEY_ENV) {
        Ok(key) if !key.is_empty() => Ok(key),
        _ => {
            let mut err = io::stderr().lock();
            writeln!(
                err,
                "{} no public key; only {} purchases will verify",
                "warning:".yellow().bold(),
                "android.test.*".bold()
            )?;
            writeln!(
                err,
                "  {} pass --key or set {}=<base64 key> in .env",
                "hint:".cyan(),
                PUBLIC_KEY_ENV
            )?;
            Ok(String::new())
        }
    }
}

/// Reads and decodes a billing fixture, printing errors.
fn load_fixture(path: &Path) -> io::Result<Option<BillingFixture>> {
    let Some(raw) = read_input("fixture", path)? else {
        return Ok(None);
    };
    match BillingFixture::from_json(&raw) {
        Ok(fixture) => Ok(Some(fixture)),
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} invalid fixture {}: {err}",
                "error:".red().bold(),
                path.display()
            )?;
            Ok(None)
        }
    }
}

/// Settings for a fixture-backed facade.
#[derive(Debug, Default)]
struct Connect<'a> {
    /// Page size override.
    page_size: Option<usize>,
    /// Restoration page limit.
    max_pages: Option<usize>,
    /// Base64 public key.
    public_key: &'a str,
}

/// Loads a fixture into a connected blocking facade, printing errors.
fn connect(
    package: &str,
    fixture: BillingFixture,
    settings: &Connect<'_>,
) -> io::Result<Option<KinAppBlocking<InMemoryBillingService>>> {
    let built = InMemoryBillingService::from_fixture(fixture).and_then(|service| {
        let service = match settings.page_size {
            Some(size) => service.with_page_size(size),
            None => service,
        };
        let mut builder = KinAppBlocking::builder()
            .service(service)
            .package_name(package)
            .public_key(settings.public_key);
        if let Some(limit) = settings.max_pages {
            builder = builder.max_pages(limit);
        }
        let app = builder.build()?;
        let _state = app.bind()?;
        let _state = app.service_connected()?;
        Ok(app)
    });
    match built {
        Ok(app) => Ok(Some(app)),
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} cannot start billing service: {err}",
                "error:".red().bold()
            )?;
            Ok(None)
        }
    }
}

/// Executes the `purchase` subcommand: decodes and prints a purchase.
fn cmd_purchase(path: &Path) -> io::Result<ExitCode> {
    let Some(raw) = read_input("purchase", path)? else {
        return Ok(ExitCode::FAILURE);
    };
    match Purchase::from_json(&raw) {
        Ok(purchase) => {
            print_purchase(&purchase)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to decode purchase: {err}",
                "error:".red().bold()
            )?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes the `product` subcommand: decodes and prints a product.
fn cmd_product(path: &Path) -> io::Result<ExitCode> {
    let Some(raw) = read_input("product", path)? else {
        return Ok(ExitCode::FAILURE);
    };
    match Product::from_json(&raw) {
        Ok(product) => {
            print_products_table(core::slice::from_ref(&product))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to decode product: {err}",
                "error:".red().bold()
            )?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes the `verify` subcommand: classifies a purchase-flow result.
///
/// Succeeds only for a verified purchase.
fn cmd_verify(args: &VerifyArgs) -> io::Result<ExitCode> {
    let Some(data) = read_input("purchase data", &args.data)? else {
        return Ok(ExitCode::FAILURE);
    };
    let public_key = resolve_public_key(args.key.as_deref())?;
    let payload = if args.trim_newline {
        data.trim_end_matches(['\r', '\n'])
    } else {
        data.as_str()
    };
    let verification = PurchaseVerifier::new(&public_key).verify_parts(
        args.request_code,
        args.result_code,
        Some(payload),
        args.signature.as_deref(),
    );
    print_verification(&verification)?;
    Ok(if verification.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Executes the `products` subcommand: lists a fixture's catalog.
fn cmd_products(package: &str, args: &ProductsArgs) -> io::Result<ExitCode> {
    let Some(fixture) = load_fixture(&args.fixture)? else {
        return Ok(ExitCode::FAILURE);
    };
    let ids: Vec<ProductId> = fixture
        .products
        .iter()
        .map(|product| product.product_id.clone())
        .collect();
    let Some(app) = connect(package, fixture, &Connect::default())? else {
        return Ok(ExitCode::FAILURE);
    };

    match app.fetch_products(&ids, args.product_type) {
        Ok(catalog) => {
            print_products_table(&catalog.into_products())?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to fetch products: {err}",
                "error:".red().bold()
            )?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes the `restore` subcommand: restores owned purchases.
fn cmd_restore(package: &str, args: &RestoreArgs) -> io::Result<ExitCode> {
    let Some(fixture) = load_fixture(&args.fixture)? else {
        return Ok(ExitCode::FAILURE);
    };
    let public_key = if args.verified {
        resolve_public_key(args.key.as_deref())?
    } else {
        String::new()
    };
    let settings = Connect {
        page_size: args.page_size,
        max_pages: args.max_pages,
        public_key: &public_key,
    };
    let Some(app) = connect(package, fixture, &settings)? else {
        return Ok(ExitCode::FAILURE);
    };

    let spinner = make_spinner("Restoring purchases...");
    let restored = if args.verified {
        app.restore_verified_purchases(args.product_type)
    } else {
        app.restore_purchases(args.product_type)
    };
    spinner.finish_and_clear();

    match restored {
        Ok(purchases) => {
            print_purchases_table(&purchases)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} restore failed: {err}",
                "error:".red().bold()
            )?;
            Ok(ExitCode::FAILURE)
        }
    }
}

// ── Output formatting ────────────────────────────────────────────────

/// Formats a purchase time, or a dash if it is unset or out of range.
fn format_time(purchase: &Purchase) -> String {
    purchase
        .purchased_at()
        .filter(|_| purchase.purchase_time != 0)
        .map_or_else(
            || "\u{2014}".to_owned(),
            |time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        )
}

/// Colors a purchase state cell.
fn state_cell(state: PurchaseState) -> Cell {
    let color = match state {
        PurchaseState::Purchased => Color::Green,
        PurchaseState::Canceled => Color::Yellow,
        PurchaseState::Refunded => Color::Red,
    };
    Cell::new(format!("{state:?}")).fg(color)
}

/// Prints one purchase as a field table.
fn print_purchase(purchase: &Purchase) -> io::Result<()> {
    let mut out = io::stdout().lock();
    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Field").fg(Color::Cyan),
        Cell::new("Value").fg(Color::Cyan),
    ]);
    let order = purchase
        .order_id
        .as_ref()
        .map_or_else(|| "\u{2014}".to_owned(), ToString::to_string);
    _ = table.add_row(vec![Cell::new("Product"), Cell::new(&purchase.product_id)]);
    _ = table.add_row(vec![Cell::new("Order"), Cell::new(order)]);
    _ = table.add_row(vec![Cell::new("Purchased"), Cell::new(format_time(purchase))]);
    _ = table.add_row(vec![Cell::new("State"), state_cell(purchase.purchase_state)]);
    _ = table.add_row(vec![Cell::new("Token"), Cell::new(&purchase.purchase_token)]);
    _ = table.add_row(vec![Cell::new("Package"), Cell::new(&purchase.package_name)]);
    _ = table.add_row(vec![
        Cell::new("Payload"),
        Cell::new(&purchase.developer_payload),
    ]);
    _ = table.add_row(vec![
        Cell::new("Auto-renewing"),
        Cell::new(purchase.auto_renewing),
    ]);

    let title = if purchase.is_test_purchase() {
        "Test purchase"
    } else {
        "Purchase"
    };
    writeln!(out, "{}", title.green().bold())?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints products in a table.
fn print_products_table(products: &[Product]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if products.is_empty() {
        writeln!(out, "{}", "No products found.".dimmed())?;
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Product").fg(Color::Cyan),
        Cell::new("Title").fg(Color::Cyan),
        Cell::new("Price").fg(Color::Cyan),
        Cell::new("Currency").fg(Color::Cyan),
        Cell::new("Type").fg(Color::Cyan),
    ]);

    for product in products {
        _ = table.add_row(vec![
            Cell::new(&product.product_id),
            Cell::new(&product.title),
            Cell::new(&product.price),
            Cell::new(&product.price_currency_code),
            Cell::new(product.product_type),
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "Products".green().bold(),
        format_args!("({})", products.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints restored purchases in a table.
fn print_purchases_table(purchases: &[Purchase]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if purchases.is_empty() {
        writeln!(out, "{}", "No purchases found.".dimmed())?;
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Product").fg(Color::Cyan),
        Cell::new("Order").fg(Color::Cyan),
        Cell::new("Purchased").fg(Color::Cyan),
        Cell::new("State").fg(Color::Cyan),
        Cell::new("Token").fg(Color::Cyan),
    ]);

    for purchase in purchases {
        let order = purchase
            .order_id
            .as_ref()
            .map_or_else(|| "\u{2014}".to_owned(), ToString::to_string);
        _ = table.add_row(vec![
            Cell::new(&purchase.product_id),
            Cell::new(order),
            Cell::new(format_time(purchase)),
            state_cell(purchase.purchase_state),
            Cell::new(&purchase.purchase_token),
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "Restored Purchases".green().bold(),
        format_args!("({})", purchases.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints a verification outcome, with the purchase on success.
fn print_verification(verification: &Verification) -> io::Result<()> {
    let outcome = verification.outcome();
    {
        let mut out = io::stdout().lock();
        match outcome {
            VerificationOutcome::Success => {
                writeln!(out, "{} {}", "outcome:".bold(), outcome.green().bold())?;
            }
            VerificationOutcome::CanceledByUser | VerificationOutcome::NotApplicable => {
                writeln!(out, "{} {}", "outcome:".bold(), outcome.yellow())?;
            }
            VerificationOutcome::PurchaseDataMissing
            | VerificationOutcome::AlreadyOwned
            | VerificationOutcome::SignatureInvalid => {
                writeln!(out, "{} {}", "outcome:".bold(), outcome.red().bold())?;
            }
        }
    }
    if let Some(purchase) = verification.purchase() {
        print_purchase(purchase)?;
    }
    Ok(())
}

/// Creates a spinner with the given message.
fn make_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(core::time::Duration::from_millis(80));
    spinner
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            // Last-resort error output; if stderr itself failed, nothing
            // we can do.
            let _ignored = writeln!(io::stderr(), "fatal I/O error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write as _;

    use tempfile::NamedTempFile;

    const PACKAGE: &str = "com.example.app";

    /// Writes `contents` to a fresh temporary file.
    fn temp_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn purchase_blob(id: &str) -> String {
        format!(
            r#"{{"orderId":"GPA.{id}","packageName":"{PACKAGE}","productId":"{id}","purchaseTime":1700000000000,"purchaseState":0,"purchaseToken":"tok-{id}"}}"#
        )
    }

    /// Fixture with two products and `count` owned test purchases.
    fn fixture(count: usize, page_size: usize) -> NamedTempFile {
        let purchases: Vec<serde_json::Value> = (0..count)
            .map(|index| {
                serde_json::json!({
                    "type": "inapp",
                    "data": purchase_blob(&format!("android.test.item{index}")),
                    "signature": "",
                })
            })
            .collect();
        let json = serde_json::json!({
            "pageSize": page_size,
            "products": [
                {"productId": "gas", "title": "Gas", "price": "$0.99", "price_currency_code": "USD", "type": "inapp"},
                {"productId": "premium", "title": "Premium", "price": "$4.99", "price_currency_code": "USD", "type": "subs"}
            ],
            "purchases": purchases,
        });
        temp_file(&json.to_string())
    }

    fn verify_args(data: &NamedTempFile, result_code: i32) -> VerifyArgs {
        VerifyArgs {
            data: data.path().to_path_buf(),
            signature: None,
            result_code,
            request_code: PURCHASE_REQUEST_CODE,
            key: Some("bm90IGEga2V5".to_owned()),
            trim_newline: false,
        }
    }

    fn restore_args(fixture: &NamedTempFile) -> RestoreArgs {
        RestoreArgs {
            fixture: fixture.path().to_path_buf(),
            product_type: ProductType::Inapp,
            page_size: None,
            max_pages: None,
            verified: false,
            key: None,
        }
    }

    #[test]
    fn cli_parses_verify() {
        let cli = Cli::try_parse_from([
            "kinapp",
            "verify",
            "--data",
            "p.json",
            "--result-code",
            "-1",
            "--signature",
            "c2ln",
        ])
        .unwrap();
        let Command::Verify(args) = cli.command else {
            unreachable!("parsed verify subcommand");
        };
        assert_eq!(args.result_code, RESULT_OK);
        assert_eq!(args.request_code, PURCHASE_REQUEST_CODE);
        assert_eq!(args.signature.as_deref(), Some("c2ln"));
        assert_eq!(cli.package, PACKAGE);
    }

    #[test]
    fn cli_parses_restore_type() {
        let cli = Cli::try_parse_from([
            "kinapp",
            "restore",
            "--fixture",
            "f.json",
            "--type",
            "subs",
            "--max-pages",
            "3",
            "--verified",
        ])
        .unwrap();
        let Command::Restore(args) = cli.command else {
            unreachable!("parsed restore subcommand");
        };
        assert_eq!(args.product_type, ProductType::Subscription);
        assert_eq!(args.max_pages, Some(3));
        assert!(args.verified);
    }

    #[test]
    fn cli_rejects_unknown_type() {
        assert!(
            Cli::try_parse_from(["kinapp", "products", "--fixture", "f", "--type", "bogus"])
                .is_err()
        );
    }

    #[test]
    fn cli_rejects_unknown_restore_type() {
        assert!(
            Cli::try_parse_from(["kinapp", "restore", "--fixture", "f", "--type", "bogus"])
                .is_err()
        );
    }

    #[test]
    fn cli_type_is_case_insensitive() {
        let cli =
            Cli::try_parse_from(["kinapp", "products", "--fixture", "f", "--type", "SUBS"]).unwrap();
        let Command::Products(args) = cli.command else {
            unreachable!("parsed products subcommand");
        };
        assert_eq!(args.product_type, ProductType::Subscription);
    }

    #[test]
    fn make_spinner_creates_spinner() {
        let spinner = make_spinner("Testing...");
        spinner.finish_and_clear();
    }

    #[test]
    fn format_time_of_unset_purchase_is_dash() {
        assert_eq!(format_time(&Purchase::default()), "\u{2014}");
        let purchase = Purchase::from_json(&purchase_blob("gas")).unwrap();
        assert_eq!(format_time(&purchase), "2023-11-14 22:13:20 UTC");
    }

    // ── cmd_* tests ──────────────────────────────────────────────────

    #[test]
    fn cmd_purchase_decodes_file() {
        let file = temp_file(&purchase_blob("gas"));
        assert_eq!(cmd_purchase(file.path()).unwrap(), ExitCode::SUCCESS);
    }

    #[test]
    fn cmd_purchase_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let code = cmd_purchase(&dir.path().join("absent.json")).unwrap();
        assert_eq!(code, ExitCode::FAILURE);
    }

    #[test]
    fn cmd_purchase_malformed() {
        let file = temp_file("{oops");
        assert_eq!(cmd_purchase(file.path()).unwrap(), ExitCode::FAILURE);
    }

    #[test]
    fn cmd_product_decodes_file() {
        let file = temp_file(r#"{"productId":"gas","price":"$0.99","type":"subs"}"#);
        assert_eq!(cmd_product(file.path()).unwrap(), ExitCode::SUCCESS);
    }

    #[test]
    fn cmd_verify_test_purchase_succeeds() {
        let data = temp_file(&purchase_blob("android.test.purchased"));
        let code = cmd_verify(&verify_args(&data, RESULT_OK)).unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn cmd_verify_unsigned_real_purchase_fails() {
        let data = temp_file(&purchase_blob("premium"));
        let code = cmd_verify(&verify_args(&data, RESULT_OK)).unwrap();
        assert_eq!(code, ExitCode::FAILURE);
    }

    /// Generates a key pair, signs `payload` and returns
    /// `(public_key_base64, signature_base64)`.
    fn sign_payload(payload: &str) -> (String, String) {
        use base64::Engine as _;
        use base64::engine::general_purpose::STANDARD as BASE64;
        use rsa::pkcs8::EncodePublicKey as _;
        use sha1::{Digest as _, Sha1};

        let private = rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
        let der = private.to_public_key().to_public_key_der().unwrap();
        let digest = Sha1::digest(payload.as_bytes());
        let signature = private
            .sign(rsa::Pkcs1v15Sign::new::<Sha1>(), &digest)
            .unwrap();
        (BASE64.encode(der.as_bytes()), BASE64.encode(signature))
    }

    #[test]
    fn cmd_verify_keeps_trailing_newline_by_default() {
        let payload = format!("{}\n", purchase_blob("premium"));
        let (key, signature) = sign_payload(&payload);
        let data = temp_file(&payload);
        let args = VerifyArgs {
            signature: Some(signature),
            key: Some(key),
            ..verify_args(&data, RESULT_OK)
        };
        assert_eq!(cmd_verify(&args).unwrap(), ExitCode::SUCCESS);

        let trimmed = VerifyArgs {
            trim_newline: true,
            ..args
        };
        assert_eq!(cmd_verify(&trimmed).unwrap(), ExitCode::FAILURE);
    }

    #[test]
    fn cmd_verify_trims_when_asked() {
        let payload = purchase_blob("premium");
        let (key, signature) = sign_payload(&payload);
        let data = temp_file(&format!("{payload}\r\n"));
        let args = VerifyArgs {
            signature: Some(signature),
            key: Some(key),
            trim_newline: true,
            ..verify_args(&data, RESULT_OK)
        };
        assert_eq!(cmd_verify(&args).unwrap(), ExitCode::SUCCESS);
    }

    #[test]
    fn cmd_verify_cancelled_fails() {
        let data = temp_file(&purchase_blob("android.test.purchased"));
        let code = cmd_verify(&verify_args(&data, 0)).unwrap();
        assert_eq!(code, ExitCode::FAILURE);
    }

    #[test]
    fn cmd_products_lists_type() {
        let file = fixture(0, 10);
        let args = ProductsArgs {
            fixture: file.path().to_path_buf(),
            product_type: ProductType::Subscription,
        };
        assert_eq!(cmd_products(PACKAGE, &args).unwrap(), ExitCode::SUCCESS);
    }

    #[test]
    fn cmd_products_bad_fixture() {
        let file = temp_file("{not json");
        let args = ProductsArgs {
            fixture: file.path().to_path_buf(),
            product_type: ProductType::Inapp,
        };
        assert_eq!(cmd_products(PACKAGE, &args).unwrap(), ExitCode::FAILURE);
    }

    #[test]
    fn cmd_restore_across_pages() {
        let file = fixture(5, 2);
        let code = cmd_restore(PACKAGE, &restore_args(&file)).unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn cmd_restore_page_limit_fails() {
        let file = fixture(5, 1);
        let args = RestoreArgs {
            max_pages: Some(2),
            ..restore_args(&file)
        };
        assert_eq!(cmd_restore(PACKAGE, &args).unwrap(), ExitCode::FAILURE);
    }

    #[test]
    fn cmd_restore_verified_keeps_test_purchases() {
        let file = fixture(3, 2);
        let args = RestoreArgs {
            verified: true,
            key: Some("bm90IGEga2V5".to_owned()),
            ..restore_args(&file)
        };
        assert_eq!(cmd_restore(PACKAGE, &args).unwrap(), ExitCode::SUCCESS);
    }

    #[test]
    fn cmd_restore_page_size_override() {
        let file = fixture(4, 100);
        let args = RestoreArgs {
            page_size: Some(1),
            max_pages: Some(3),
            ..restore_args(&file)
        };
        assert_eq!(cmd_restore(PACKAGE, &args).unwrap(), ExitCode::FAILURE);
    }
}
