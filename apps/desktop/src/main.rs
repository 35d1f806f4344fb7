use std::{
    io::{self, Write},
    sync::Arc,
};

use anyhow::Result;
use clap::Parser;
use client_core::{ChatClient, ClientEvent, DurableSessionStore, Endpoints};
use shared::domain::{ChatMessage, Credentials};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

mod config;

#[derive(Parser, Debug)]
struct Args {
    /// Auth endpoint override.
    #[arg(long)]
    auth_url: Option<String>,
    /// Message submission endpoint override.
    #[arg(long)]
    messages_url: Option<String>,
    /// Message listing endpoint override.
    #[arg(long)]
    listing_url: Option<String>,
    /// Session database override (sqlite url or file path).
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mut settings = config::load_settings();
    if let Some(v) = args.auth_url {
        settings.auth_url = v;
    }
    if let Some(v) = args.messages_url {
        settings.messages_url = v;
    }
    if let Some(v) = args.listing_url {
        settings.listing_url = v;
    }
    if let Some(v) = args.database_url {
        settings.database_url = v;
    }

    let database_url = config::prepare_database_url(&settings.database_url)?;
    let store = DurableSessionStore::initialize(&database_url).await?;
    let client = ChatClient::new_with_store(
        Endpoints {
            auth_url: settings.auth_url,
            messages_url: settings.messages_url,
            listing_url: settings.listing_url,
        },
        store,
    );

    spawn_event_printer(&client);

    if client.restore_session().await.is_none() {
        println!("No hay sesión guardada. Usa: login <usuario>");
    }
    print_help();

    repl(client).await
}

fn spawn_event_printer(client: &Arc<ChatClient>) {
    let mut events = client.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ClientEvent::SessionChanged(Some(session)) => {
                    println!("* autenticado como {}", session.username);
                }
                ClientEvent::SessionChanged(None) => println!("* sesión cerrada"),
                ClientEvent::MessagesReplaced(messages) => {
                    println!("* lista actualizada: {} mensajes", messages.len());
                }
                ClientEvent::Status(text) => println!("* {text}"),
                ClientEvent::Error(text) => eprintln!("! {text}"),
            }
        }
    });
}

async fn repl(client: Arc<ChatClient>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt("> ")?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));

        // Flow errors are already printed by the event stream; the match
        // arms only drive the orchestrator.
        match command {
            "" => {}
            "login" => {
                let password = read_password(&mut lines).await?;
                let _ = client
                    .login(Credentials {
                        username: rest.trim().to_string(),
                        password,
                    })
                    .await;
            }
            "send" => {
                let _ = client.send_message(rest).await;
            }
            "refresh" => {
                let _ = client.refresh_messages().await;
            }
            "list" => print_messages(&client.state().await.messages),
            "logout" => client.logout().await,
            "help" => print_help(),
            "quit" | "exit" => break,
            other => println!("comando desconocido: {other} (usa: help)"),
        }
    }

    Ok(())
}

async fn read_password(lines: &mut Lines<BufReader<Stdin>>) -> Result<String> {
    prompt("contraseña: ")?;
    Ok(lines.next_line().await?.unwrap_or_default())
}

fn prompt(text: &str) -> Result<()> {
    print!("{text}");
    io::stdout().flush()?;
    Ok(())
}

fn print_messages(messages: &[ChatMessage]) {
    if messages.is_empty() {
        println!("(sin mensajes)");
        return;
    }
    for message in messages {
        match &message.timestamp {
            Some(timestamp) => println!("[{timestamp}] {}: {}", message.sender, message.content),
            None => println!("{}: {}", message.sender, message.content),
        }
    }
}

fn print_help() {
    println!("comandos:");
    println!("  login <usuario>   iniciar sesión (pide la contraseña)");
    println!("  send <texto>      enviar un mensaje a la sala");
    println!("  refresh           volver a pedir la lista de mensajes");
    println!("  list              mostrar la lista actual");
    println!("  logout            cerrar la sesión");
    println!("  quit              salir");
}
