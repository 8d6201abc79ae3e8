use crate::client::config::ClientConfig;
use crate::client::models::chat::ChatMessage;
use crate::client::models::event::EventQuery;
use crate::client::models::notification::NotificationQuery;
use crate::client::models::restaurant::RestaurantQuery;
use crate::client::models::review::ReviewKind;
use crate::client::services::api_client::ApiClient;
use crate::client::services::auth_service::AuthService;
use crate::client::services::chat_room::ChatRoom;
use crate::client::services::chat_service::ChatService;
use crate::client::services::comments_service::CommentsService;
use crate::client::services::events_service::EventsService;
use crate::client::services::notifications_service::NotificationsService;
use crate::client::services::restaurants_service::RestaurantsService;
use crate::client::services::reviews_service::ReviewsService;
use crate::client::utils::session_store::{open_store, SessionHandle};
use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::sync::Arc;
use tokio::io::{stdin, AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "bobple")]
#[command(about = "Command line client for the bobple meal-matching service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Email/password login
    Login { email: String, password: String },
    /// Login with an identity-provider id token
    LoginToken { id_token: String },
    Logout,
    /// Current user, recovered from the backend session
    Profile,
    Events {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        page: Option<u64>,
        #[arg(long)]
        size: Option<u64>,
    },
    Event { id: String },
    MyEvents,
    Apply {
        event: i64,
        #[arg(long)]
        message: Option<String>,
    },
    Restaurants {
        #[arg(long)]
        q: Option<String>,
        /// Filters client-side across pages
        #[arg(long)]
        category: Option<String>,
        /// Searches by keyword instead of listing
        #[arg(long)]
        keyword: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u64,
        #[arg(long, default_value_t = 5)]
        limit: u64,
        #[arg(long)]
        sponsored: bool,
    },
    Restaurant { id: String },
    Comments { event: i64 },
    Comment { event: i64, text: String },
    Reviews {
        user: i64,
        #[arg(long)]
        written: bool,
        #[arg(long, default_value_t = 1)]
        page: u64,
        #[arg(long, default_value_t = 10)]
        limit: u64,
    },
    Notifications {
        #[arg(long)]
        unread: bool,
    },
    /// Chat list with the last message of each room
    Chats,
    /// Interactive room: stdin lines are sent, `/leave` leaves, `/quit` exits
    Chat { id: i64 },
}

/// Runs one command against the configured backend.
pub async fn run(cli: Cli, config: ClientConfig) -> anyhow::Result<()> {
    let session = SessionHandle::new(open_store(&config));
    let api = ApiClient::new(&config, session.clone())?;

    match cli.command {
        Command::Login { email, password } => {
            let res = AuthService::new(api).login(&email, &password).await?;
            print_json(&res)?;
        }
        Command::LoginToken { id_token } => {
            let res = AuthService::new(api).login_with_id_token(&id_token).await?;
            print_json(&res)?;
        }
        Command::Logout => {
            AuthService::new(api).logout().await?;
            println!("[CLIENT] logged out");
        }
        Command::Profile => match AuthService::new(api).get_profile().await {
            Some(profile) => print_json(&profile)?,
            None => println!("[CLIENT] not logged in"),
        },
        Command::Events { search, page, size } => {
            let query = EventQuery { search, page, size, user_id: None };
            print_json(&EventsService::new(api).list(&query).await?)?;
        }
        Command::Event { id } => match EventsService::new(api).get(&id).await? {
            Some(event) => print_json(&event)?,
            None => println!("[CLIENT] no event {}", id),
        },
        Command::MyEvents => print_json(&EventsService::new(api).my_events().await?)?,
        Command::Apply { event, message } => {
            let res = EventsService::new(api).apply(event, message.as_deref()).await?;
            print_json(&res)?;
        }
        Command::Restaurants { q, category, keyword, page, limit, sponsored } => {
            let restaurants = RestaurantsService::new(api);
            if let Some(keyword) = keyword {
                print_json(&restaurants.search(&keyword).await?)?;
            } else if let Some(category) = category.filter(|c| c != "ALL") {
                print_json(&restaurants.collect_by_category(&category, page, limit, q, None).await)?;
            } else {
                let query = RestaurantQuery {
                    page,
                    limit,
                    q,
                    category: None,
                    sponsored_only: sponsored.then(|| "1".to_string()),
                };
                print_json(&restaurants.list(&query).await)?;
            }
        }
        Command::Restaurant { id } => match RestaurantsService::new(api).get_by_id(&id).await? {
            Some(restaurant) => print_json(&restaurant)?,
            None => println!("[CLIENT] no restaurant {}", id),
        },
        Command::Comments { event } => print_json(&CommentsService::new(api).list(event).await?)?,
        Command::Comment { event, text } => {
            let me = session.user_id().ok_or_else(|| anyhow!("login first"))?;
            print_json(&CommentsService::new(api).create(event, &text, me).await?)?;
        }
        Command::Reviews { user, written, page, limit } => {
            let kind = if written { ReviewKind::Written } else { ReviewKind::Received };
            print_json(&ReviewsService::new(api).list(user, kind, page, limit).await?)?;
        }
        Command::Notifications { unread } => {
            let query = NotificationQuery { unread_only: unread.then_some(true), ..Default::default() };
            print_json(&NotificationsService::new(api).list(&query).await?)?;
        }
        Command::Chats => print_json(&ChatService::new(api).previews().await?)?,
        Command::Chat { id } => chat_loop(id, api, session, &config).await?,
    }
    Ok(())
}

async fn chat_loop(chat_id: i64, api: ApiClient, session: SessionHandle, config: &ClientConfig) -> anyhow::Result<()> {
    let room = ChatRoom::new(chat_id, Arc::new(ChatService::new(api)), session, config);
    room.start().await;

    let printer = {
        let room = room.clone();
        let mut changes = room.subscribe();
        tokio::spawn(async move {
            let mut transcript = Transcript::default();
            loop {
                let messages = room.messages().await;
                let (replaced, unseen) = transcript.unseen(&messages);
                if replaced {
                    println!("[CLIENT] history refreshed");
                }
                for msg in unseen {
                    let who = msg.sender.map(|s| s.to_string()).unwrap_or_else(|| "?".to_string());
                    println!("[{}] {}: {}", msg.created_at.as_deref().unwrap_or("-"), who, msg.content);
                }
                if changes.changed().await.is_err() {
                    break;
                }
            }
        })
    };

    println!("[CLIENT] room {} ready. /leave to leave, /quit to exit", chat_id);
    let mut lines = BufReader::new(stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        match line.trim() {
            "/quit" => break,
            "/leave" => {
                room.leave().await?;
                println!("[CLIENT] left room {}", chat_id);
                break;
            }
            text => {
                room.send(text).await;
            }
        }
    }

    room.shutdown().await;
    printer.abort();
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Tracks how much of the room history has been printed.
#[derive(Debug, Default)]
struct Transcript {
    printed: usize,
    tail: Option<String>,
}

impl Transcript {
    /// Messages not yet shown. When the room swapped its list for a
    /// different one (shorter, or a changed message where the printed tail
    /// was) the whole list is returned and the flag is set.
    fn unseen<'a>(&mut self, messages: &'a [ChatMessage]) -> (bool, &'a [ChatMessage]) {
        let replaced = match self.printed.checked_sub(1) {
            Some(last) => messages.get(last).map(|m| Some(&m.content) != self.tail.as_ref()).unwrap_or(true),
            None => false,
        };
        let start = if replaced { 0 } else { self.printed };
        self.printed = messages.len();
        self.tail = messages.last().map(|m| m.content.clone());
        (replaced, &messages[start..])
    }
}
