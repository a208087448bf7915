mod error;
mod model;
mod pdf;
mod session;
mod store;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use clap::{Parser, Subcommand};
use comfy_table::{Attribute, Cell, Color, Table};
use directories::{BaseDirs, ProjectDirs};
use inquire::{Confirm, Select, Text};
use serde::{Deserialize, Serialize};

use crate::error::QuoteError;
use crate::model::{CompanyInfo, QuotationRecord};
use crate::pdf::{format_amount, hex_to_rgb};
use crate::session::Session;
use crate::store::QuoteStore;

// ==========================================
// Constants & Embeds
// ==========================================
const DONE_OPT: &str = "Done";

// Embed default company settings at compile time to ensure availability
const DEFAULT_COMPANY: &str = include_str!("../company.toml");

// ==========================================
// Structs & Enums
// ==========================================

#[derive(Debug, Serialize, Deserialize)]
struct AppSettings {
    data_root: String,
}

/// On-disk form of the company details (`company.toml` in the data root).
/// The logo lives next to it as a file path and is loaded into memory when a
/// session starts.
#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(default)]
struct CompanyConfig {
    name: String,
    address: String,
    phone: String,
    email: String,
    footer_text: String,
    theme_color: String,
    logo_path: Option<String>,
}

impl CompanyConfig {
    fn into_company_info(self) -> CompanyInfo {
        let logo = self.logo_path.as_ref().and_then(|path| match fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                log::warn!("could not read logo {path}: {err}");
                None
            }
        });
        CompanyInfo {
            name: self.name,
            address: self.address,
            phone: self.phone,
            email: self.email,
            footer_text: self.footer_text,
            theme_color: self.theme_color,
            logo,
        }
    }
}

#[derive(Parser)]
#[command(name = "quotation-maker")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose a new quotation
    New,
    /// Browse saved quotations and regenerate PDFs
    History,
    /// Edit the company details printed on every quotation
    Company,
    /// Configure data directory
    Config,
    /// Open the quotation folder
    Open,
}

// ==========================================
// Main Function
// ==========================================

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    // 1. Initialize configuration
    let settings = load_settings().unwrap_or_else(setup_config_wizard);
    let expanded_path = expand_home_dir(&settings.data_root);
    let root = PathBuf::from(expanded_path);

    if let Err(e) = fs::create_dir_all(&root) {
        eprintln!("❌ Error: Failed to create data directory: {}", e);
        return;
    }

    if cli.command.is_none() {
        use clap::CommandFactory;
        Cli::command().print_help().ok();
        return;
    }

    match cli.command.unwrap() {
        Commands::New => run_new(&root),
        Commands::History => run_history(&root),
        Commands::Company => company_settings_wizard(&root),
        Commands::Config => {
            setup_config_wizard();
        }
        Commands::Open => open_folder(&root),
    }
}

// ==========================================
// 1. Quotation Composer
// ==========================================

fn run_new(root: &Path) {
    let store = match QuoteStore::new(root) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("❌ {}", e);
            return;
        }
    };
    let company = load_company_config(root).into_company_info();
    let mut session = Session::with_sequence(company, store.next_sequence());

    println!("\n--- New Quotation ---");
    client_form(&mut session);

    loop {
        print_ledger(&session);
        let actions = vec![
            "➕ Add Item",
            "✏️  Edit Item",
            "🗑  Delete Item",
            "👤 Edit Client",
            "🧹 Clear All",
            "📄 Generate Quotation",
            "Quit",
        ];
        let Ok(choice) = Select::new("Action:", actions).prompt() else {
            return;
        };
        match choice {
            "➕ Add Item" => item_form(&mut session),
            "✏️  Edit Item" => edit_item(&mut session),
            "🗑  Delete Item" => delete_item(&mut session),
            "👤 Edit Client" => client_form(&mut session),
            "🧹 Clear All" => clear_all(&mut session),
            "📄 Generate Quotation" => generate(&mut session, &store),
            _ => return,
        }
    }
}

fn client_form(session: &mut Session) {
    if let Ok(v) = Text::new("Client Name:")
        .with_default(&session.client.name)
        .prompt()
    {
        session.client.name = v;
    }
    if let Ok(v) = Text::new("Client Phone:")
        .with_default(&session.client.phone)
        .prompt()
    {
        session.client.phone = v;
    }
    if let Ok(v) = Text::new("Client Email:")
        .with_default(&session.client.email)
        .prompt()
    {
        session.client.email = v;
    }
    if let Ok(v) = Text::new("Client Address:")
        .with_default(&session.client.address)
        .prompt()
    {
        session.client.address = v;
    }
}

fn item_form(session: &mut Session) {
    let prefill = session
        .editing()
        .and_then(|i| session.items().get(i).cloned());
    let (d0, c0, q0) = match &prefill {
        Some(item) => (
            item.description.clone(),
            item.unit_cost.to_string(),
            item.quantity.to_string(),
        ),
        None => (String::new(), "0.0".to_string(), "1.0".to_string()),
    };

    let Ok(description) = Text::new("Description:").with_default(&d0).prompt() else {
        session.cancel_edit();
        return;
    };
    let Ok(unit_cost) = Text::new("Unit Cost:").with_default(&c0).prompt() else {
        session.cancel_edit();
        return;
    };
    let Ok(quantity) = Text::new("Quantity:").with_default(&q0).prompt() else {
        session.cancel_edit();
        return;
    };

    if let Err(e) = session.add_or_update(&description, &unit_cost, &quantity) {
        eprintln!("❌ {}", e);
    }
}

fn edit_item(session: &mut Session) {
    let Some(index) = pick_index(session, "edit") else {
        return;
    };
    match session.begin_edit(index) {
        Ok(_) => item_form(session),
        Err(e) => eprintln!("❌ {}", e),
    }
}

fn delete_item(session: &mut Session) {
    let Some(index) = pick_index(session, "delete") else {
        return;
    };
    if let Err(e) = session.delete(index) {
        eprintln!("❌ {}", e);
    }
}

fn clear_all(session: &mut Session) {
    let confirmed = Confirm::new("Clear all items and client details?")
        .with_default(false)
        .prompt()
        .unwrap_or(false);
    if confirmed {
        session.clear();
        println!("🧹 Cleared.");
    }
}

fn generate(session: &mut Session, store: &QuoteStore) {
    let record = match session.build_record() {
        Ok(record) => record,
        Err(e) => {
            eprintln!("❌ {}", e);
            return;
        }
    };
    let json_path = match store.save(&record) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("❌ Failed to save quotation: {}", e);
            return;
        }
    };
    let pdf_path = store.pdf_path(&record.quote_number);
    let written = pdf::render_quotation(&record)
        .and_then(|bytes| fs::write(&pdf_path, bytes).map_err(QuoteError::from));
    match written {
        Ok(()) => {
            // Counter moves only once both files exist.
            session.advance_sequence();
            session.clear();
            println!("✅ Saved: {}", json_path.display());
            println!("✅ PDF:   {}", pdf_path.display());
        }
        Err(e) => eprintln!("❌ Failed to write PDF: {}", e),
    }
}

fn pick_index(session: &Session, verb: &str) -> Option<usize> {
    if session.items().is_empty() {
        println!("(No items yet)");
        return None;
    }
    let options: Vec<String> = session
        .items()
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!(
                "{}. {} — {}",
                i + 1,
                item.description,
                format_amount(item.amount)
            )
        })
        .collect();
    let choice = Select::new(&format!("Select item to {}:", verb), options)
        .with_page_size(10)
        .prompt()
        .ok()?;
    let number: usize = choice.split('.').next()?.parse().ok()?;
    Some(number - 1)
}

fn print_ledger(session: &Session) {
    if session.items().is_empty() {
        println!("(No items yet)");
        return;
    }
    let (r, g, b) = hex_to_rgb(&session.company.theme_color);
    let header = ["#", "Description", "Unit Cost", "Quantity", "Amount"]
        .into_iter()
        .map(|title| {
            Cell::new(title)
                .fg(Color::Rgb { r, g, b })
                .add_attribute(Attribute::Bold)
        })
        .collect::<Vec<_>>();

    let mut table = Table::new();
    table.set_header(header);
    for (i, item) in session.items().iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&item.description),
            Cell::new(format_amount(item.unit_cost)),
            Cell::new(format_amount(item.quantity)),
            Cell::new(format_amount(item.amount)),
        ]);
    }
    println!("{table}");
    println!("💰 Total: {}", format_amount(session.total()));
}

// ==========================================
// 2. History & Regeneration
// ==========================================

fn run_history(root: &Path) {
    let store = match QuoteStore::new(root) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("❌ {}", e);
            return;
        }
    };

    println!("\n--- Quotation History ---");
    let term = Text::new("🔍 Search (client, number, date — empty for all):")
        .prompt()
        .unwrap_or_default();

    let records = match store.search(&term) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("❌ {}", e);
            return;
        }
    };
    if records.is_empty() {
        println!("No quotations found");
        return;
    }
    print_history(&records);

    loop {
        let mut options: Vec<String> = records
            .iter()
            .map(|record| {
                format!(
                    "Quote #{} — {}",
                    record.quote_number, record.client_info.name
                )
            })
            .collect();
        options.push(DONE_OPT.to_string());

        let Ok(choice) = Select::new("♻️  Regenerate PDF for:", options.clone())
            .with_page_size(10)
            .prompt()
        else {
            return;
        };
        if choice == DONE_OPT {
            return;
        }
        if let Some(index) = options.iter().position(|opt| *opt == choice) {
            regenerate(&store, &records[index]);
        }
    }
}

fn regenerate(store: &QuoteStore, record: &QuotationRecord) {
    // Uses the company snapshot embedded in the record, so old quotations
    // keep the branding they were issued with.
    let pdf_path = store.pdf_path(&record.quote_number);
    let written = pdf::render_quotation(record)
        .and_then(|bytes| fs::write(&pdf_path, bytes).map_err(QuoteError::from));
    match written {
        Ok(()) => println!("✅ PDF regenerated: {}", pdf_path.display()),
        Err(e) => eprintln!("❌ Failed to regenerate PDF: {}", e),
    }
}

fn print_history(records: &[QuotationRecord]) {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("Quote #").add_attribute(Attribute::Bold),
        Cell::new("Date").add_attribute(Attribute::Bold),
        Cell::new("Client").add_attribute(Attribute::Bold),
        Cell::new("Total").add_attribute(Attribute::Bold),
    ]);
    for record in records {
        table.add_row(vec![
            Cell::new(&record.quote_number),
            Cell::new(&record.date),
            Cell::new(&record.client_info.name),
            Cell::new(format_amount(record.total)),
        ]);
    }
    println!("{table}");
}

// ==========================================
// 3. Company Settings
// ==========================================

fn company_config_path(root: &Path) -> PathBuf {
    root.join("company.toml")
}

fn load_company_config(root: &Path) -> CompanyConfig {
    let path = company_config_path(root);
    if !path.exists() {
        println!("✨ Initializing default company settings...");
        if let Err(e) = fs::write(&path, DEFAULT_COMPANY) {
            eprintln!("⚠️  Could not write {}: {}", path.display(), e);
        }
        return toml::from_str(DEFAULT_COMPANY).unwrap_or_default();
    }
    match fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("⚠️  Could not parse {}: {}", path.display(), e);
                toml::from_str(DEFAULT_COMPANY).unwrap_or_default()
            }
        },
        Err(e) => {
            eprintln!("⚠️  Could not read {}: {}", path.display(), e);
            toml::from_str(DEFAULT_COMPANY).unwrap_or_default()
        }
    }
}

fn company_settings_wizard(root: &Path) {
    println!("\n⚙️  --- Company Settings ---");
    let mut config = load_company_config(root);

    if let Ok(v) = Text::new("Company Name:").with_default(&config.name).prompt() {
        config.name = v;
    }
    println!("💡 Tip: Use '\\n' for new lines in the address.");
    if let Ok(v) = Text::new("Address:")
        .with_default(&config.address.replace('\n', "\\n"))
        .prompt()
    {
        config.address = v.replace("\\n", "\n");
    }
    if let Ok(v) = Text::new("Phone:").with_default(&config.phone).prompt() {
        config.phone = v;
    }
    if let Ok(v) = Text::new("Email:").with_default(&config.email).prompt() {
        config.email = v;
    }
    if let Ok(v) = Text::new("Footer Text:")
        .with_default(&config.footer_text)
        .prompt()
    {
        config.footer_text = v;
    }
    if let Ok(v) = Text::new("Theme Color (hex, e.g. #4A90E2):")
        .with_default(&config.theme_color)
        .prompt()
    {
        if hex_to_rgb(&v) == (0, 0, 0) && !v.trim_start_matches('#').eq_ignore_ascii_case("000000")
        {
            println!("⚠️  Not a 6-digit hex color; the table header will print black.");
        }
        config.theme_color = v;
    }

    let logo_status = config.logo_path.as_deref().unwrap_or("(none)");
    let logo_actions = vec!["Keep current logo", "Choose new logo...", "Remove logo"];
    println!("Current logo: {}", logo_status);
    if let Ok(choice) = Select::new("Logo:", logo_actions).prompt() {
        match choice {
            "Choose new logo..." => {
                println!("📂 Opening file picker...");
                let picked = rfd::FileDialog::new()
                    .set_title("Select Logo Image")
                    .add_filter("Images", &["png", "jpg", "jpeg"])
                    .pick_file();
                match picked {
                    Some(path) => config.logo_path = Some(path.to_string_lossy().to_string()),
                    None => println!("No file selected, keeping current logo."),
                }
            }
            "Remove logo" => config.logo_path = None,
            _ => {}
        }
    }

    let path = company_config_path(root);
    match toml::to_string_pretty(&config) {
        Ok(toml_str) => match fs::write(&path, toml_str) {
            Ok(()) => println!("✅ Company settings saved."),
            Err(e) => eprintln!("❌ Failed to save {}: {}", path.display(), e),
        },
        Err(e) => eprintln!("❌ Failed to serialize settings: {}", e),
    }
}

// ==========================================
// 4. Config & Utilities
// ==========================================

fn get_config_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "quotation-maker", "app") {
        let config_dir = proj_dirs.config_dir();
        if !config_dir.exists() {
            fs::create_dir_all(config_dir).ok();
        }
        return config_dir.join("settings.toml");
    }
    PathBuf::from("settings.toml")
}

fn load_settings() -> Option<AppSettings> {
    let path = get_config_path();
    if !path.exists() {
        return None;
    }
    let content = fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

fn setup_config_wizard() -> AppSettings {
    println!("\n⚙️  --- Configuration Setup ---");
    let current = load_settings();
    let default_val = current
        .map(|s| s.data_root)
        .unwrap_or_else(|| "~/Documents/Quotations".to_string());

    println!("📂 Opening folder picker...");
    let picked_path = rfd::FileDialog::new()
        .set_title("Select Quotation Data Directory")
        .pick_folder();

    let new_root = if let Some(path) = picked_path {
        path.to_string_lossy().to_string()
    } else {
        println!("❌ No folder selected. Falling back to manual input.");
        Text::new("Enter Quotation Data Directory:")
            .with_default(&default_val)
            .prompt()
            .unwrap_or(default_val)
    };

    let settings = AppSettings {
        data_root: new_root,
    };

    let path = get_config_path();
    match toml::to_string_pretty(&settings) {
        Ok(toml_str) => {
            if let Err(e) = fs::write(&path, toml_str) {
                eprintln!("❌ Failed to save settings: {}", e);
            } else {
                println!("✅ Settings saved.");
            }
        }
        Err(e) => eprintln!("❌ Failed to serialize settings: {}", e),
    }
    settings
}

fn expand_home_dir(path: &str) -> String {
    if path.starts_with("~") {
        if let Some(base_dirs) = BaseDirs::new() {
            let home = base_dirs.home_dir().to_string_lossy();
            return path.replacen("~", &home, 1);
        }
    }
    path.to_string()
}

fn open_folder(root: &Path) {
    println!("🚀 Opening: {:?}", root);

    #[cfg(target_os = "macos")]
    Command::new("open").arg(root).spawn().ok();

    #[cfg(target_os = "windows")]
    Command::new("explorer").arg(root).spawn().ok();

    #[cfg(target_os = "linux")]
    Command::new("xdg-open").arg(root).spawn().ok();
}

// ==========================================
// Tests
// ==========================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClientInfo;
    use tempfile::TempDir;

    #[test]
    fn generate_flow_end_to_end() {
        let dir = TempDir::new().unwrap();
        let store = QuoteStore::new(dir.path()).unwrap();
        let company = CompanyInfo {
            name: "Acme Ltd".to_string(),
            footer_text: "Thank you for your business!".to_string(),
            theme_color: "#4A90E2".to_string(),
            ..CompanyInfo::default()
        };
        let mut session = Session::with_sequence(company, store.next_sequence());
        session.client = ClientInfo {
            name: "Jane Doe".to_string(),
            ..ClientInfo::default()
        };
        session.add_or_update("Consulting", "100.0", "2.0").unwrap();

        let record = session.build_record().unwrap();
        assert_eq!(record.quote_number, "000001");
        assert_eq!(record.total, 200.0);
        assert_eq!(format_amount(record.items[0].amount), "200.00");

        let json_path = store.save(&record).unwrap();
        assert!(json_path.ends_with("quotation_000001.json"));
        let bytes = pdf::render_quotation(&record).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        fs::write(store.pdf_path(&record.quote_number), &bytes).unwrap();

        session.advance_sequence();
        session.clear();
        assert_eq!(session.sequence(), 2);
        assert!(session.items().is_empty());

        // a restarted session picks up after what is already on disk
        let resumed = Session::with_sequence(CompanyInfo::default(), store.next_sequence());
        assert_eq!(resumed.sequence(), 2);

        let found = store.search("jane").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0], record);
    }

    #[test]
    fn company_config_round_trips_through_toml() {
        let dir = TempDir::new().unwrap();
        let mut config = load_company_config(dir.path());
        assert_eq!(config.theme_color, "#4A90E2");
        config.name = "Acme Ltd".to_string();
        config.address = "1 Main Street\nSpringfield".to_string();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        fs::write(company_config_path(dir.path()), toml_str).unwrap();

        let reloaded = load_company_config(dir.path());
        assert_eq!(reloaded.name, "Acme Ltd");
        assert_eq!(reloaded.address, "1 Main Street\nSpringfield");
        let info = reloaded.into_company_info();
        assert_eq!(info.footer_text, "Thank you for your business!");
        assert!(info.logo.is_none());
    }

    #[test]
    fn missing_logo_file_is_dropped_quietly() {
        let config = CompanyConfig {
            logo_path: Some("/definitely/not/here.png".to_string()),
            ..CompanyConfig::default()
        };
        assert!(config.into_company_info().logo.is_none());
    }
}
