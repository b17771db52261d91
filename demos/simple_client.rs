//! Simple IRC client example
//!
//! Connects, joins a channel, greets it, and answers anyone who says
//! "hello" until the server closes the connection or someone says "!quit".
//!
//! ```text
//! RUST_LOG=ircflow=debug cargo run --example simple_client -- irc.libera.chat 6667 '#ircflow-test'
//! ```

use anyhow::Context;
use futures_util::StreamExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ircflow::{Client, Config, ConnectionState, TcpConnector};

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "ircflow=info".into()),
    );
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let hostname = args.next().unwrap_or_else(|| "irc.libera.chat".to_string());
    let port = match args.next() {
        Some(port) => port.parse().context("port must be a number")?,
        None => 6667,
    };
    let channel_name = args.next().unwrap_or_else(|| "#ircflow-test".to_string());

    let client = Client::new(Config::new(
        hostname,
        port,
        "ircflow_demo",
        "ircflow",
        "ircflow example bot",
    ));

    let channel = client.channel(channel_name);
    let mut chatter = channel.messages();
    // Registration completes with the 001 welcome numeric.
    let mut welcome = client.command_stream("001");
    let driver = client.connect(TcpConnector)?;

    if client.wait_connected().await != ConnectionState::Connected {
        anyhow::bail!("could not connect to {}", client.config().address());
    }
    match welcome.next().await {
        Some(Ok(msg)) => println!("✓ Registered: {}", msg.params.last().map_or("", String::as_str)),
        Some(Err(e)) => return Err(anyhow::anyhow!("connection failed: {e}")),
        None => return Ok(()),
    }
    welcome.unsubscribe();

    channel.join()?;
    channel.send_message("Hello from ircflow!")?;

    println!("\n--- Listening on {} (Ctrl+C to exit) ---", channel.name());
    while let Some(item) = chatter.next().await {
        let msg = match item {
            Ok(msg) => msg,
            Err(e) => {
                eprintln!("connection error: {e}");
                break;
            }
        };
        println!("← {}", msg);

        if msg.command != "PRIVMSG" {
            continue;
        }
        let text = msg.params.get(1).map_or("", String::as_str);
        if text.trim() == "!quit" {
            client.quit();
        } else if text.contains("hello") {
            let who = msg.source_nickname().unwrap_or("there");
            channel.send_message(format!("Hello {who}! 👋"))?;
        }
    }

    driver.await.context("connection driver panicked")?;
    Ok(())
}
