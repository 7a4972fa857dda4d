// MockMate Server CLI Validation Tool
// This tool exercises the session, feed, chat, and feedback APIs through one-off commands and automated scenarios

use chrono::{Duration as ChronoDuration, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Duration};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type WsRead = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

#[derive(Parser)]
#[command(name = "mockmate-cli")]
#[command(about = "MockMate Server CLI Validation Tool", long_about = None)]
struct Cli {
    /// Server address (default: 127.0.0.1:8080)
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health endpoint
    Health,

    /// Get server configuration
    Config,

    /// List sessions, optionally filtered
    List {
        /// Filter by status (upcoming, active, completed)
        #[arg(long)]
        status: Option<String>,

        /// Filter by participant id
        #[arg(long)]
        participant: Option<String>,
    },

    /// Show one session in full
    Show {
        /// Session id
        id: String,
    },

    /// Create a session
    Create {
        /// Session title (at least 5 characters)
        #[arg(short, long)]
        title: String,

        /// Session description (at least 10 characters)
        #[arg(short, long)]
        description: String,

        /// Duration in minutes
        #[arg(long, default_value_t = 30)]
        duration: u32,

        /// Participant as email or email:role (repeatable)
        #[arg(short, long)]
        participant: Vec<String>,
    },

    /// Change the status of a session
    SetStatus {
        /// Session id
        id: String,

        /// New status (upcoming, active, completed)
        status: String,
    },

    /// Delete a session
    Delete {
        /// Session id
        id: String,
    },

    /// Append a chat message to a session
    SendMessage {
        /// Session id
        id: String,

        /// Sender participant id
        #[arg(long)]
        sender: String,

        /// Sender display name
        #[arg(long)]
        name: String,

        /// Message content
        content: String,
    },

    /// Submit feedback for a participant
    Feedback {
        /// Session id
        id: String,

        /// Participant being evaluated
        #[arg(long)]
        participant: String,

        /// Evaluator id
        #[arg(long)]
        evaluator: String,

        /// Ratings 1-5 as clarity,content,delivery,engagement
        #[arg(long)]
        ratings: String,

        /// Written comments
        #[arg(long)]
        comments: String,
    },

    /// Show the per-participant feedback summary of a session
    Summary {
        /// Session id
        id: String,
    },

    /// Follow the live session feed (press Ctrl+C to exit)
    Watch,

    /// Run automated validation scenarios
    Validate {
        /// Run all validation tests
        #[arg(short, long)]
        all: bool,

        /// Test specific scenario
        #[arg(long)]
        scenario: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Health => {
            check_health(&cli.server).await;
        }
        Commands::Config => {
            check_config(&cli.server).await;
        }
        Commands::List {
            status,
            participant,
        } => {
            list_sessions(&cli.server, status.as_deref(), participant.as_deref()).await;
        }
        Commands::Show { id } => {
            show_session(&cli.server, id).await;
        }
        Commands::Create {
            title,
            description,
            duration,
            participant,
        } => {
            create_session(&cli.server, title, description, *duration, participant).await;
        }
        Commands::SetStatus { id, status } => {
            set_status(&cli.server, id, status).await;
        }
        Commands::Delete { id } => {
            delete_session(&cli.server, id).await;
        }
        Commands::SendMessage {
            id,
            sender,
            name,
            content,
        } => {
            send_message(&cli.server, id, sender, name, content).await;
        }
        Commands::Feedback {
            id,
            participant,
            evaluator,
            ratings,
            comments,
        } => {
            submit_feedback(&cli.server, id, participant, evaluator, ratings, comments).await;
        }
        Commands::Summary { id } => {
            show_summary(&cli.server, id).await;
        }
        Commands::Watch => {
            watch_feed(&cli.server).await;
        }
        Commands::Validate { all, scenario } => {
            if *all {
                run_all_validations(&cli.server).await;
            } else if let Some(s) = scenario {
                run_scenario(&cli.server, s).await;
            } else {
                println!("{}", "Use --all or --scenario <name>".yellow());
                list_scenarios();
            }
        }
    }
}

fn http_url(server: &str, path: &str) -> String {
    format!("http://{}{}", server, path)
}

fn feed_url(server: &str) -> String {
    format!("ws://{}/api/feed", server)
}

async fn check_health(server: &str) {
    println!("{}", "Checking server health...".cyan());

    let url = http_url(server, "/api/health");
    let client = reqwest::Client::new();

    match client.get(&url).send().await {
        Ok(resp) => {
            let status = resp.status();
            if status.is_success() {
                println!("{} Health check passed", "✓".green());

                if let Ok(body) = resp.json::<serde_json::Value>().await {
                    println!("  Status: {}", body["status"].as_str().unwrap_or("unknown"));
                    println!("  Service: {}", body["service"].as_str().unwrap_or("unknown"));
                    println!("  Version: {}", body["version"].as_str().unwrap_or("unknown"));
                }
            } else {
                println!("{} Health check failed: {}", "✗".red(), status);
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
            println!("  Make sure the server is running on {}", server);
        }
    }
}

async fn check_config(server: &str) {
    println!("{}", "Fetching server configuration...".cyan());

    let url = http_url(server, "/api/config");
    let client = reqwest::Client::new();

    match client.get(&url).send().await {
        Ok(resp) => {
            if resp.status().is_success() {
                println!("{} Config endpoint accessible", "✓".green());

                if let Ok(body) = resp.json::<serde_json::Value>().await {
                    println!("\nConfiguration:");
                    println!("{}", serde_json::to_string_pretty(&body).unwrap());
                }
            } else {
                println!("{} Config fetch failed: {}", "✗".red(), resp.status());
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
        }
    }
}

fn status_colored(status: &str) -> ColoredString {
    match status {
        "upcoming" => status.yellow(),
        "active" => status.green(),
        "completed" => status.blue(),
        other => other.normal(),
    }
}

fn print_session_line(session: &serde_json::Value) {
    let id = session["id"].as_str().unwrap_or("?");
    let title = session["title"].as_str().unwrap_or("?");
    let status = session["status"].as_str().unwrap_or("?");
    let duration = session["duration_minutes"].as_u64().unwrap_or(0);
    let participants = session["participants"]
        .as_array()
        .map(|p| p.len())
        .unwrap_or(0);

    println!(
        "  {}  [{}]  {} ({} min, {} participants)",
        id.cyan(),
        status_colored(status),
        title.bold(),
        duration,
        participants
    );
}

async fn list_sessions(server: &str, status: Option<&str>, participant: Option<&str>) {
    println!("{}", "Listing sessions...".cyan());

    let mut query = Vec::new();
    if let Some(s) = status {
        query.push(format!("status={}", urlencoding::encode(s)));
    }
    if let Some(p) = participant {
        query.push(format!("participant={}", urlencoding::encode(p)));
    }
    let path = if query.is_empty() {
        "/api/sessions".to_string()
    } else {
        format!("/api/sessions?{}", query.join("&"))
    };

    let client = reqwest::Client::new();
    match client.get(http_url(server, &path)).send().await {
        Ok(resp) => {
            if resp.status().is_success() {
                match resp.json::<Vec<serde_json::Value>>().await {
                    Ok(sessions) => {
                        println!("{} {} session(s)", "✓".green(), sessions.len());
                        for session in &sessions {
                            print_session_line(session);
                        }
                    }
                    Err(e) => println!("{} Could not parse response: {}", "✗".red(), e),
                }
            } else {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                println!("{} List failed: {} {}", "✗".red(), status, body);
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
        }
    }
}

async fn show_session(server: &str, id: &str) {
    let client = reqwest::Client::new();
    let url = http_url(server, &format!("/api/sessions/{}", id));

    match client.get(&url).send().await {
        Ok(resp) => {
            if resp.status().is_success() {
                if let Ok(body) = resp.json::<serde_json::Value>().await {
                    println!("{}", serde_json::to_string_pretty(&body).unwrap());
                }
            } else if resp.status() == reqwest::StatusCode::NOT_FOUND {
                println!("{} Session {} not found", "✗".red(), id);
            } else {
                println!("{} Fetch failed: {}", "✗".red(), resp.status());
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
        }
    }
}

/// Parse "email" or "email:role" into an invite object.
fn parse_invite(raw: &str) -> serde_json::Value {
    match raw.split_once(':') {
        Some((email, role)) => json!({ "email": email, "role": role }),
        None => json!({ "email": raw, "role": "participant" }),
    }
}

async fn create_session(
    server: &str,
    title: &str,
    description: &str,
    duration: u32,
    participants: &[String],
) {
    println!("{}", "Creating session...".cyan());

    let invites: Vec<serde_json::Value> = participants.iter().map(|p| parse_invite(p)).collect();
    let body = json!({
        "title": title,
        "description": description,
        "scheduled_at": (Utc::now() + ChronoDuration::days(1)).to_rfc3339(),
        "duration_minutes": duration,
        "participants": invites,
    });

    let client = reqwest::Client::new();
    match client
        .post(http_url(server, "/api/sessions"))
        .json(&body)
        .send()
        .await
    {
        Ok(resp) => {
            if resp.status() == reqwest::StatusCode::CREATED {
                if let Ok(created) = resp.json::<serde_json::Value>().await {
                    println!("{} Session created", "✓".green());
                    print_session_line(&created);
                }
            } else {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                println!("{} Create failed: {} {}", "✗".red(), status, body);
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
        }
    }
}

async fn set_status(server: &str, id: &str, status: &str) {
    if !matches!(status, "upcoming" | "active" | "completed") {
        println!(
            "{} Unknown status: {} (expected upcoming, active, or completed)",
            "✗".red(),
            status
        );
        return;
    }

    let client = reqwest::Client::new();
    let url = http_url(server, &format!("/api/sessions/{}", id));

    // Fetch, edit, and put the whole record back; the server only does
    // wholesale updates.
    let mut record = match client.get(&url).send().await {
        Ok(resp) if resp.status().is_success() => match resp.json::<serde_json::Value>().await {
            Ok(record) => record,
            Err(e) => {
                println!("{} Could not parse session: {}", "✗".red(), e);
                return;
            }
        },
        Ok(resp) => {
            println!("{} Session fetch failed: {}", "✗".red(), resp.status());
            return;
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
            return;
        }
    };

    record["status"] = json!(status);

    match client.put(&url).json(&record).send().await {
        Ok(resp) => {
            if resp.status().is_success() {
                println!(
                    "{} Session {} is now {}",
                    "✓".green(),
                    id.cyan(),
                    status_colored(status)
                );
            } else {
                println!("{} Update failed: {}", "✗".red(), resp.status());
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
        }
    }
}

async fn delete_session(server: &str, id: &str) {
    let client = reqwest::Client::new();
    let url = http_url(server, &format!("/api/sessions/{}", id));

    match client.delete(&url).send().await {
        Ok(resp) => {
            if resp.status().is_success() {
                println!("{} Session {} deleted", "✓".green(), id.cyan());
            } else if resp.status() == reqwest::StatusCode::NOT_FOUND {
                println!("{} Session {} not found", "✗".red(), id);
            } else {
                println!("{} Delete failed: {}", "✗".red(), resp.status());
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
        }
    }
}

async fn send_message(server: &str, id: &str, sender: &str, name: &str, content: &str) {
    let client = reqwest::Client::new();
    let body = json!({
        "sender_id": sender,
        "sender_name": name,
        "content": content,
    });

    match client
        .post(http_url(server, &format!("/api/sessions/{}/messages", id)))
        .json(&body)
        .send()
        .await
    {
        Ok(resp) => {
            if resp.status() == reqwest::StatusCode::CREATED {
                if let Ok(message) = resp.json::<serde_json::Value>().await {
                    println!(
                        "{} Message {} appended",
                        "✓".green(),
                        message["id"].as_str().unwrap_or("?").cyan()
                    );
                }
            } else {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                println!("{} Send failed: {} {}", "✗".red(), status, body);
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
        }
    }
}

/// Parse "4,5,3,4" into the four criterion ratings.
fn parse_ratings(raw: &str) -> Option<[u8; 4]> {
    let parts: Vec<u8> = raw
        .split(',')
        .filter_map(|p| p.trim().parse::<u8>().ok())
        .collect();
    if parts.len() == 4 {
        Some([parts[0], parts[1], parts[2], parts[3]])
    } else {
        None
    }
}

async fn submit_feedback(
    server: &str,
    id: &str,
    participant: &str,
    evaluator: &str,
    ratings: &str,
    comments: &str,
) {
    let ratings = match parse_ratings(ratings) {
        Some(r) => r,
        None => {
            println!(
                "{} Ratings must be four numbers: clarity,content,delivery,engagement",
                "✗".red()
            );
            return;
        }
    };

    let client = reqwest::Client::new();
    let body = json!({
        "participant_id": participant,
        "evaluator_id": evaluator,
        "clarity": ratings[0],
        "content": ratings[1],
        "delivery": ratings[2],
        "engagement": ratings[3],
        "comments": comments,
    });

    match client
        .post(http_url(server, &format!("/api/sessions/{}/feedback", id)))
        .json(&body)
        .send()
        .await
    {
        Ok(resp) => {
            if resp.status() == reqwest::StatusCode::CREATED {
                if let Ok(feedback) = resp.json::<serde_json::Value>().await {
                    println!(
                        "{} Feedback {} recorded (overall {})",
                        "✓".green(),
                        feedback["id"].as_str().unwrap_or("?").cyan(),
                        feedback["overall"]
                    );
                }
            } else {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                println!("{} Submit failed: {} {}", "✗".red(), status, body);
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
        }
    }
}

async fn show_summary(server: &str, id: &str) {
    let client = reqwest::Client::new();
    let url = http_url(server, &format!("/api/sessions/{}/feedback/summary", id));

    match client.get(&url).send().await {
        Ok(resp) => {
            if resp.status().is_success() {
                match resp.json::<Vec<serde_json::Value>>().await {
                    Ok(summary) => {
                        println!("{} Summary for {}", "✓".green(), id.cyan());
                        for scores in &summary {
                            println!(
                                "  {}  overall {} (clarity {}, content {}, delivery {}, engagement {}) best: {}",
                                scores["participant_id"].as_str().unwrap_or("?").cyan(),
                                scores["overall"],
                                scores["clarity"],
                                scores["content"],
                                scores["delivery"],
                                scores["engagement"],
                                scores["highest_rated"].as_str().unwrap_or("?").bold()
                            );
                        }
                    }
                    Err(e) => println!("{} Could not parse summary: {}", "✗".red(), e),
                }
            } else if resp.status() == reqwest::StatusCode::NOT_FOUND {
                println!("{} Session {} not found", "✗".red(), id);
            } else {
                println!("{} Summary fetch failed: {}", "✗".red(), resp.status());
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
        }
    }
}

async fn watch_feed(server: &str) {
    println!("{}", "Watching the live session feed...".cyan());

    let url = feed_url(server);

    match connect_async(&url).await {
        Ok((ws_stream, _)) => {
            let (mut write, mut read) = ws_stream.split();

            let msg = json!({ "type": "Subscribe" });
            if write.send(Message::Text(msg.to_string())).await.is_err() {
                println!("{} Failed to send Subscribe message", "✗".red());
                return;
            }

            println!("{} Subscribed", "✓".green());
            println!("Press {} to stop.\n", "Ctrl+C".bold());

            loop {
                match timeout(Duration::from_secs(30), read.next()).await {
                    Ok(Some(Ok(Message::Text(text)))) => {
                        match serde_json::from_str::<serde_json::Value>(&text) {
                            Ok(event) if event["type"] == "Sessions" => {
                                let sessions =
                                    event["sessions"].as_array().cloned().unwrap_or_default();
                                println!(
                                    "{} {} session(s)",
                                    "◀".green(),
                                    sessions.len().to_string().bold()
                                );
                                for session in &sessions {
                                    print_session_line(session);
                                }
                            }
                            _ => println!("{} {}", "◀".yellow(), text),
                        }
                    }
                    Ok(Some(Ok(Message::Close(_)))) => {
                        println!("{} Server closed the connection", "✗".yellow());
                        break;
                    }
                    Ok(Some(Ok(_))) => {
                        // Ignore other message types (Binary, Ping, Pong, Frame)
                        continue;
                    }
                    Ok(Some(Err(e))) => {
                        println!("{} Connection error: {}", "✗".red(), e);
                        break;
                    }
                    Ok(None) => {
                        println!("{} Connection closed", "✗".yellow());
                        break;
                    }
                    Err(_) => {
                        // Timeout - just continue listening
                        continue;
                    }
                }
            }
        }
        Err(e) => {
            println!("{} Cannot connect to feed: {}", "✗".red(), e);
        }
    }
}

fn list_scenarios() {
    println!("\n{}", "Available Validation Scenarios:".bold());
    println!("\n{}", "Session Registry:".bold().cyan());
    println!("  {} - Create, update, and delete round trip", "crud".cyan());
    println!("  {} - Invalid input handling (4xx responses)", "invalid-input".cyan());
    println!("\n{}", "Live Feed:".bold().cyan());
    println!("  {} - Basic WebSocket connection test", "connection".cyan());
    println!("  {} - Feed ordering across mutations", "feed".cyan());
    println!("\n{}", "Feedback:".bold().cyan());
    println!("  {} - Submission, scoring, and summary", "feedback".cyan());
    println!("\nExample: mockmate-cli validate --scenario crud");
    println!("Example: mockmate-cli validate --all");
}

async fn run_scenario(server: &str, scenario: &str) {
    println!("\n{} {}", "Running scenario:".bold(), scenario.cyan());
    println!("{}", "─".repeat(60));

    let result = match scenario {
        "connection" => validate_connection(server).await,
        "crud" => validate_crud(server).await,
        "invalid-input" => validate_invalid_input(server).await,
        "feed" => validate_feed(server).await,
        "feedback" => validate_feedback(server).await,
        _ => {
            println!("{} Unknown scenario: {}", "✗".red(), scenario);
            list_scenarios();
            return;
        }
    };

    if result {
        println!("\n{} Scenario passed", "✓".green().bold());
    } else {
        println!("\n{} Scenario failed", "✗".red().bold());
    }
}

async fn run_all_validations(server: &str) {
    println!("\n{}", "Running All Validation Tests".bold().green());
    println!("{}\n", "═".repeat(60).green());

    let scenarios = vec!["connection", "crud", "invalid-input", "feed", "feedback"];

    let mut passed = 0;
    let mut failed = 0;

    for scenario in scenarios {
        println!("\n{} Testing: {}", "▶".cyan(), scenario.bold());
        println!("{}", "─".repeat(60));

        let result = match scenario {
            "connection" => validate_connection(server).await,
            "crud" => validate_crud(server).await,
            "invalid-input" => validate_invalid_input(server).await,
            "feed" => validate_feed(server).await,
            "feedback" => validate_feedback(server).await,
            _ => false,
        };

        if result {
            passed += 1;
        } else {
            failed += 1;
        }

        sleep(Duration::from_millis(500)).await;
    }

    println!("\n{}", "═".repeat(60).green());
    println!("{}", "Validation Summary".bold());
    println!("{}", "═".repeat(60).green());
    println!("  {} Passed: {}", "✓".green(), passed.to_string().green());
    println!("  {} Failed: {}", "✗".red(), failed.to_string().red());
    println!("  Total: {}", passed + failed);

    if failed == 0 {
        println!("\n{}", "All validations passed! 🎉".green().bold());
    } else {
        println!("\n{}", "Some validations failed. Check output above.".yellow());
    }
}

async fn validate_connection(server: &str) -> bool {
    let url = feed_url(server);

    match connect_async(&url).await {
        Ok((ws_stream, _)) => {
            println!("{} WebSocket connection successful", "✓".green());
            drop(ws_stream);
            true
        }
        Err(e) => {
            println!("{} Connection failed: {}", "✗".red(), e);
            false
        }
    }
}

fn budget_review_body() -> serde_json::Value {
    json!({
        "title": "Budget Review",
        "description": "Walk through the quarterly budget line by line",
        "scheduled_at": (Utc::now() + ChronoDuration::days(1)).to_rfc3339(),
        "duration_minutes": 30,
        "participants": [
            { "email": "alex@example.com", "role": "moderator" },
            { "email": "casey@example.com", "role": "evaluator" }
        ],
    })
}

async fn validate_crud(server: &str) -> bool {
    let client = reqwest::Client::new();

    println!("  Step 1: Creating \"Budget Review\" (30 min)...");
    let created = match client
        .post(http_url(server, "/api/sessions"))
        .json(&budget_review_body())
        .send()
        .await
    {
        Ok(resp) if resp.status() == reqwest::StatusCode::CREATED => {
            match resp.json::<serde_json::Value>().await {
                Ok(created) => created,
                Err(e) => {
                    println!("{} Could not parse created session: {}", "✗".red(), e);
                    return false;
                }
            }
        }
        Ok(resp) => {
            println!("{} Create failed: {}", "✗".red(), resp.status());
            return false;
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
            return false;
        }
    };

    let id = match created["id"].as_str() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            println!("{} Created session has no id", "✗".red());
            return false;
        }
    };
    println!("  {} Created: {}", "✓".green(), id.cyan());

    println!("  Step 2: Updating duration to 45 minutes...");
    let mut updated = created.clone();
    updated["duration_minutes"] = json!(45);
    let update_ok = matches!(
        client
            .put(http_url(server, &format!("/api/sessions/{}", id)))
            .json(&updated)
            .send()
            .await,
        Ok(resp) if resp.status().is_success()
    );
    if !update_ok {
        println!("{} Update failed", "✗".red());
        return false;
    }

    let fetched = client
        .get(http_url(server, &format!("/api/sessions/{}", id)))
        .send()
        .await;
    match fetched {
        Ok(resp) if resp.status().is_success() => {
            if let Ok(record) = resp.json::<serde_json::Value>().await {
                if record["duration_minutes"] != json!(45) || record["id"] != json!(id.as_str()) {
                    println!("{} Update did not stick", "✗".red());
                    return false;
                }
                println!("  {} Duration is now 45, id unchanged", "✓".green());
            }
        }
        _ => {
            println!("{} Could not fetch updated session", "✗".red());
            return false;
        }
    }

    println!("  Step 3: Deleting the session...");
    let delete_ok = matches!(
        client
            .delete(http_url(server, &format!("/api/sessions/{}", id)))
            .send()
            .await,
        Ok(resp) if resp.status().is_success()
    );
    if !delete_ok {
        println!("{} Delete failed", "✗".red());
        return false;
    }

    match client
        .get(http_url(server, &format!("/api/sessions/{}", id)))
        .send()
        .await
    {
        Ok(resp) if resp.status() == reqwest::StatusCode::NOT_FOUND => {
            println!("  {} Session is gone", "✓".green());
            true
        }
        _ => {
            println!("{} Deleted session is still reachable", "✗".red());
            false
        }
    }
}

async fn validate_invalid_input(server: &str) -> bool {
    let client = reqwest::Client::new();
    let mut all_passed = true;

    println!("  Posting a draft with a too-short title...");
    let mut bad = budget_review_body();
    bad["title"] = json!("abc");
    match client
        .post(http_url(server, "/api/sessions"))
        .json(&bad)
        .send()
        .await
    {
        Ok(resp) if resp.status() == reqwest::StatusCode::UNPROCESSABLE_ENTITY => {
            println!("  {} Rejected with 422", "✓".green());
        }
        Ok(resp) => {
            println!("  {} Expected 422, got {}", "✗".red(), resp.status());
            all_passed = false;
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
            return false;
        }
    }

    println!("  Posting a draft with an unknown participant role...");
    let mut bad_role = budget_review_body();
    bad_role["participants"][0]["role"] = json!("observer");
    match client
        .post(http_url(server, "/api/sessions"))
        .json(&bad_role)
        .send()
        .await
    {
        Ok(resp) if resp.status() == reqwest::StatusCode::UNPROCESSABLE_ENTITY => {
            println!("  {} Rejected with 422", "✓".green());
        }
        Ok(resp) => {
            println!("  {} Expected 422, got {}", "✗".red(), resp.status());
            all_passed = false;
        }
        Err(_) => return false,
    }

    println!("  Fetching an unknown session...");
    match client
        .get(http_url(server, "/api/sessions/session-999999"))
        .send()
        .await
    {
        Ok(resp) if resp.status() == reqwest::StatusCode::NOT_FOUND => {
            println!("  {} Rejected with 404", "✓".green());
        }
        Ok(resp) => {
            println!("  {} Expected 404, got {}", "✗".red(), resp.status());
            all_passed = false;
        }
        Err(_) => return false,
    }

    println!("  Deleting an unknown session...");
    match client
        .delete(http_url(server, "/api/sessions/session-999999"))
        .send()
        .await
    {
        Ok(resp) if resp.status() == reqwest::StatusCode::NOT_FOUND => {
            println!("  {} Rejected with 404", "✓".green());
        }
        Ok(resp) => {
            println!("  {} Expected 404, got {}", "✗".red(), resp.status());
            all_passed = false;
        }
        Err(_) => return false,
    }

    all_passed
}

/// Wait for the next Sessions event on the feed, skipping anything else.
async fn next_sessions_event(read: &mut WsRead, secs: u64) -> Option<Vec<serde_json::Value>> {
    loop {
        match timeout(Duration::from_secs(secs), read.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                if let Ok(event) = serde_json::from_str::<serde_json::Value>(&text) {
                    if event["type"] == "Sessions" {
                        return event["sessions"].as_array().cloned();
                    }
                }
            }
            Ok(Some(Ok(_))) => continue,
            _ => return None,
        }
    }
}

async fn validate_feed(server: &str) -> bool {
    let client = reqwest::Client::new();

    println!("  Step 1: Subscribing to the feed...");
    let (mut write, mut read) = match connect_async(&feed_url(server)).await {
        Ok((ws_stream, _)) => ws_stream.split(),
        Err(e) => {
            println!("{} Connection failed: {}", "✗".red(), e);
            return false;
        }
    };

    let msg = json!({ "type": "Subscribe" });
    if write.send(Message::Text(msg.to_string())).await.is_err() {
        println!("{} Failed to send Subscribe message", "✗".red());
        return false;
    }

    let baseline = match next_sessions_event(&mut read, 3).await {
        Some(sessions) => sessions.len(),
        None => {
            println!("{} No initial snapshot received", "✗".red());
            return false;
        }
    };
    println!("  {} Initial snapshot: {} session(s)", "✓".green(), baseline);

    println!("  Step 2: Creating a session over HTTP...");
    let created = match client
        .post(http_url(server, "/api/sessions"))
        .json(&budget_review_body())
        .send()
        .await
    {
        Ok(resp) if resp.status() == reqwest::StatusCode::CREATED => {
            resp.json::<serde_json::Value>().await.ok()
        }
        _ => None,
    };
    let created = match created {
        Some(c) => c,
        None => {
            println!("{} Create failed", "✗".red());
            return false;
        }
    };
    let id = created["id"].as_str().unwrap_or("").to_string();

    match next_sessions_event(&mut read, 3).await {
        Some(sessions) if sessions.len() == baseline + 1 => {
            println!("  {} Feed delivered the create", "✓".green());
        }
        Some(sessions) => {
            println!(
                "  {} Expected {} sessions in feed, got {}",
                "✗".red(),
                baseline + 1,
                sessions.len()
            );
            return false;
        }
        None => {
            println!("{} No feed event after create", "✗".red());
            return false;
        }
    }

    println!("  Step 3: Updating the session...");
    let mut updated = created.clone();
    updated["duration_minutes"] = json!(45);
    if client
        .put(http_url(server, &format!("/api/sessions/{}", id)))
        .json(&updated)
        .send()
        .await
        .is_err()
    {
        println!("{} Update failed", "✗".red());
        return false;
    }

    match next_sessions_event(&mut read, 3).await {
        Some(sessions) => {
            let changed = sessions
                .iter()
                .find(|s| s["id"] == json!(id.as_str()))
                .map(|s| s["duration_minutes"] == json!(45))
                .unwrap_or(false);
            if changed {
                println!("  {} Feed delivered the update", "✓".green());
            } else {
                println!("  {} Update not visible in feed event", "✗".red());
                return false;
            }
        }
        None => {
            println!("{} No feed event after update", "✗".red());
            return false;
        }
    }

    println!("  Step 4: Deleting the session...");
    if client
        .delete(http_url(server, &format!("/api/sessions/{}", id)))
        .send()
        .await
        .is_err()
    {
        println!("{} Delete failed", "✗".red());
        return false;
    }

    match next_sessions_event(&mut read, 3).await {
        Some(sessions) if sessions.len() == baseline => {
            println!("  {} Feed delivered the delete", "✓".green());
            true
        }
        Some(sessions) => {
            println!(
                "  {} Expected {} sessions in feed, got {}",
                "✗".red(),
                baseline,
                sessions.len()
            );
            false
        }
        None => {
            println!("{} No feed event after delete", "✗".red());
            false
        }
    }
}

async fn validate_feedback(server: &str) -> bool {
    let client = reqwest::Client::new();

    println!("  Step 1: Creating a session to evaluate...");
    let created = match client
        .post(http_url(server, "/api/sessions"))
        .json(&budget_review_body())
        .send()
        .await
    {
        Ok(resp) if resp.status() == reqwest::StatusCode::CREATED => {
            resp.json::<serde_json::Value>().await.ok()
        }
        _ => None,
    };
    let created = match created {
        Some(c) => c,
        None => {
            println!("{} Create failed", "✗".red());
            return false;
        }
    };
    let id = created["id"].as_str().unwrap_or("").to_string();
    let participant = created["participants"][0]["id"].as_str().unwrap_or("user-1");

    println!("  Step 2: Submitting feedback (5,4,5,4)...");
    let submission = json!({
        "participant_id": participant,
        "evaluator_id": "user-99",
        "clarity": 5,
        "content": 4,
        "delivery": 5,
        "engagement": 4,
        "comments": "Clear structure and strong delivery throughout.",
    });
    let mut all_passed = true;

    match client
        .post(http_url(server, &format!("/api/sessions/{}/feedback", id)))
        .json(&submission)
        .send()
        .await
    {
        Ok(resp) if resp.status() == reqwest::StatusCode::CREATED => {
            if let Ok(feedback) = resp.json::<serde_json::Value>().await {
                if feedback["overall"] == json!(4.5) {
                    println!("  {} Overall computed as 4.5", "✓".green());
                } else {
                    println!("  {} Expected overall 4.5, got {}", "✗".red(), feedback["overall"]);
                    all_passed = false;
                }
            }
        }
        Ok(resp) => {
            println!("  {} Submit failed: {}", "✗".red(), resp.status());
            all_passed = false;
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
            return false;
        }
    }

    println!("  Step 3: Checking the summary...");
    match client
        .get(http_url(server, &format!("/api/sessions/{}/feedback/summary", id)))
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            if let Ok(summary) = resp.json::<Vec<serde_json::Value>>().await {
                let ok = summary.len() == 1 && summary[0]["highest_rated"] == json!("clarity");
                if ok {
                    println!("  {} Summary lists clarity as highest rated", "✓".green());
                } else {
                    println!("  {} Unexpected summary: {:?}", "✗".red(), summary);
                    all_passed = false;
                }
            }
        }
        _ => {
            println!("  {} Summary fetch failed", "✗".red());
            all_passed = false;
        }
    }

    println!("  Step 4: Submitting an out-of-range rating...");
    let mut bad = submission.clone();
    bad["clarity"] = json!(9);
    match client
        .post(http_url(server, &format!("/api/sessions/{}/feedback", id)))
        .json(&bad)
        .send()
        .await
    {
        Ok(resp) if resp.status() == reqwest::StatusCode::UNPROCESSABLE_ENTITY => {
            println!("  {} Rejected with 422", "✓".green());
        }
        Ok(resp) => {
            println!("  {} Expected 422, got {}", "✗".red(), resp.status());
            all_passed = false;
        }
        Err(_) => return false,
    }

    println!("  Step 5: Deleting the session; feedback should remain...");
    match client
        .delete(http_url(server, &format!("/api/sessions/{}", id)))
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {}
        _ => {
            println!("  {} Delete failed", "✗".red());
            return false;
        }
    }
    match client
        .get(http_url(server, &format!("/api/sessions/{}/feedback", id)))
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            let count = resp
                .json::<Vec<serde_json::Value>>()
                .await
                .map(|entries| entries.len())
                .unwrap_or(0);
            if count == 1 {
                println!("  {} Feedback still readable after delete", "✓".green());
            } else {
                println!("  {} Expected 1 feedback entry, found {}", "✗".red(), count);
                all_passed = false;
            }
        }
        _ => {
            println!("  {} Feedback unreachable after delete", "✗".red());
            all_passed = false;
        }
    }

    all_passed
}
