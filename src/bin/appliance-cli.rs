use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "appliance-cli")]
#[command(about = "Management CLI for the appliance configuration daemon", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8443")]
    url: String,

    /// Username for Basic authentication (not needed on loopback).
    #[arg(long)]
    user: Option<String>,

    #[arg(long, default_value = "")]
    password: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the running configuration
    Show,
    /// List configured RADIUS servers
    RadiusServers,
    /// Add a local user
    AddUser {
        username: String,
        password: String,
        /// 1 = user, 2 = administrator
        #[arg(long, default_value_t = 1)]
        privilege: i64,
    },
    /// Delete local users by name
    DeleteUsers {
        #[arg(required = true)]
        usernames: Vec<String>,
    },
    /// Persist the running configuration as the startup configuration
    SaveStartup,
    /// Check credentials through the local authentication endpoint
    AuthTest { username: String, password: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let url = cli.url.trim_end_matches('/');

    let authed = |req: reqwest::RequestBuilder| match &cli.user {
        Some(user) => req.basic_auth(user, Some(&cli.password)),
        None => req,
    };

    let res = match &cli.command {
        Commands::Show => authed(client.get(format!("{}/configs/running", url))).send().await?,
        Commands::RadiusServers => {
            authed(client.get(format!("{}/aaa/radius/servers", url))).send().await?
        }
        Commands::AddUser {
            username,
            password,
            privilege,
        } => {
            let body = json!([{ "username": username, "password": password, "privilege": privilege }]);
            authed(client.post(format!("{}/aaa/localusers", url)))
                .json(&body)
                .send()
                .await?
        }
        Commands::DeleteUsers { usernames } => {
            authed(client.delete(format!("{}/aaa/localusers", url)))
                .query(&[("users", usernames.join(","))])
                .send()
                .await?
        }
        Commands::SaveStartup => {
            authed(client.post(format!("{}/configs/startup/save", url))).send().await?
        }
        Commands::AuthTest { username, password } => {
            client
                .get(format!("{}/local/radius/authenticate", url))
                .basic_auth(username, Some(password))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    if text.is_empty() {
        println!("{}", status);
        return Ok(());
    }
    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
