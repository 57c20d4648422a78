use clap::{Parser, Subcommand, ValueEnum};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fs;

const TOKEN_FILE: &str = ".travel_admin_token";

#[derive(Parser)]
#[command(name = "travel-admin-cli")]
#[command(about = "CLI for the travel admin API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Homestay,
    Hotel,
    Nearby,
}

impl Kind {
    fn fetch_path(self) -> &'static str {
        match self {
            Kind::Homestay => "homestays",
            Kind::Hotel => "hotels",
            Kind::Nearby => "nearbyPlaces",
        }
    }

    fn route(self) -> &'static str {
        match self {
            Kind::Homestay => "homestay",
            Kind::Hotel => "hotel",
            Kind::Nearby => "nearbyPlace",
        }
    }

    /// Field holding the nested list, and the path segment naming one entry.
    fn items(self) -> (&'static str, &'static str) {
        match self {
            Kind::Homestay => ("stays", "stay"),
            Kind::Hotel => ("hotels", "hotel"),
            Kind::Nearby => ("tovisit", "place"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Show the admin behind the saved token.
    Whoami,
    Places,
    CreatePlace {
        #[arg(short, long)]
        name: String,
        #[arg(short, long, default_value = "")]
        month: String,
        #[arg(short, long, default_value = "")]
        about: String,
        #[arg(short = 'b', long, default_value_t = 0.0)]
        minbudget: f64,
        #[arg(short, long, default_value = "")]
        official: String,
    },
    DeletePlace {
        #[arg(short, long)]
        id: String,
    },
    List {
        #[arg(value_enum)]
        kind: Kind,
    },
    /// Append entries to the document of a place, creating it when absent.
    Add {
        #[arg(value_enum)]
        kind: Kind,
        #[arg(short, long)]
        place: String,
        /// JSON array of entries, e.g. '[{"name":"A","rating":4,"budget":1000}]'
        #[arg(short, long)]
        items: String,
    },
    DeleteRecord {
        #[arg(value_enum)]
        kind: Kind,
        #[arg(short, long)]
        id: String,
    },
    /// Remove one entry by its id or zero-based position.
    DeleteItem {
        #[arg(value_enum)]
        kind: Kind,
        #[arg(short, long)]
        id: String,
        #[arg(short = 'r', long = "item")]
        item: String,
    },
    Logout,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

fn authorized(request: RequestBuilder) -> RequestBuilder {
    let token = fs::read_to_string(TOKEN_FILE).unwrap_or_default();
    request.bearer_auth(token.trim())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = Client::new();

    let res = match cli.command {
        Commands::Login { email, password } => {
            let res = client
                .post(format!("{}/login", cli.url))
                .json(&json!({ "email": email, "password": password }))
                .send()
                .await?;
            if res.status().is_success() {
                let body: LoginResponse = res.json().await?;
                fs::write(TOKEN_FILE, body.token)?;
                println!("Logged in. Token saved to {TOKEN_FILE}");
            } else {
                println!("Login failed: {}", res.text().await?);
            }
            return Ok(());
        }
        Commands::Whoami => authorized(client.get(format!("{}/session", cli.url))).send().await?,
        Commands::Places => client.get(format!("{}/fetch/mainplace", cli.url)).send().await?,
        Commands::CreatePlace { name, month, about, minbudget, official } => {
            authorized(client.post(format!("{}/create/mainplace", cli.url)))
                .json(&json!({
                    "placename": name,
                    "month": month,
                    "about": about,
                    "minbudget": minbudget,
                    "official": official
                }))
                .send()
                .await?
        }
        Commands::DeletePlace { id } => {
            authorized(client.delete(format!("{}/delete/mainplace/{}", cli.url, id)))
                .send()
                .await?
        }
        Commands::List { kind } => {
            client
                .get(format!("{}/fetch/{}", cli.url, kind.fetch_path()))
                .send()
                .await?
        }
        Commands::Add { kind, place, items } => {
            let items: Value = serde_json::from_str(&items)?;
            let (field, _) = kind.items();
            authorized(client.post(format!("{}/create/{}", cli.url, kind.route())))
                .json(&json!({ "place": place, field: items }))
                .send()
                .await?
        }
        Commands::DeleteRecord { kind, id } => {
            authorized(client.delete(format!("{}/delete/{}/{}", cli.url, kind.route(), id)))
                .send()
                .await?
        }
        Commands::DeleteItem { kind, id, item } => {
            let (_, segment) = kind.items();
            authorized(client.delete(format!("{}/delete/{}/{}/{}/{}", cli.url, kind.route(), id, segment, item)))
                .send()
                .await?
        }
        Commands::Logout => {
            let _ = fs::remove_file(TOKEN_FILE);
            println!("Logged out (token removed).");
            return Ok(());
        }
    };

    println!("{} {}", res.status(), res.text().await?);
    Ok(())
}
