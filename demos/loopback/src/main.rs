//! Loopback demo: the whole gateway wired to an in-memory client and a
//! scripted room service.
//!
//! Run it to watch a full session go by — registration, a join with
//! backlog replay, a live message, presence and identity queries, and
//! a clean part:
//!
//! ```text
//! cargo run -p loopback
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parlor::prelude::*;
use parlor_api::{
    EnterResponse, MessageKind, MessageRecord, ObserveResponse, OccupantRecord, OwnIdentity,
    RoomDescriptor, RoomService, ServiceError,
};
use tokio::sync::Mutex;
use tokio::time::sleep;

// ---------------------------------------------------------------------------
// Scripted room service
// ---------------------------------------------------------------------------

/// A stand-in service: every room greets you with a short backlog, one
/// neighbor already present, and then goes quiet (the long-poll pends
/// forever, like a real room where nobody is talking).
struct ScriptedRooms {
    served: Mutex<HashSet<String>>,
}

impl ScriptedRooms {
    fn new() -> Self {
        Self {
            served: Mutex::new(HashSet::new()),
        }
    }
}

impl RoomService for ScriptedRooms {
    async fn create_session(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn login(&self, account: &str, _password: &str) -> Result<(), ServiceError> {
        tracing::info!(account, "scripted service: logged in");
        Ok(())
    }

    async fn fetch_own_identity(&self) -> Result<OwnIdentity, ServiceError> {
        Ok(OwnIdentity {
            user_id: "pat".into(),
            nickname: "Pat".into(),
        })
    }

    async fn enter_room(
        &self,
        room: &str,
        _nick: &str,
        _password: Option<&str>,
    ) -> Result<EnterResponse, ServiceError> {
        Ok(EnterResponse {
            ticket: format!("ticket-{room}"),
            counter: 0,
            occupant_id: format!("self-{room}"),
            room: RoomDescriptor {
                id: room.into(),
                url: Some(format!("https://rooms.example/{room}")),
                description: Some("a quiet little room".into()),
            },
        })
    }

    async fn observe_room(
        &self,
        ticket: &str,
        _counter: u64,
    ) -> Result<ObserveResponse, ServiceError> {
        let first_poll = self.served.lock().await.insert(ticket.to_owned());
        if !first_poll {
            // Nothing further ever happens in a scripted room.
            std::future::pending::<()>().await;
        }
        sleep(Duration::from_millis(200)).await;
        Ok(ObserveResponse {
            counter: Some(2),
            messages: vec![
                MessageRecord {
                    id: "1".into(),
                    kind: MessageKind::User,
                    text: "welcome in, take a seat".into(),
                    nickname: "Quinn".into(),
                    user_id: None,
                    occupant_id: Some("o2".into()),
                    new_nickname: None,
                },
                MessageRecord {
                    id: "2".into(),
                    kind: MessageKind::Enter,
                    text: String::new(),
                    nickname: "Rae".into(),
                    user_id: Some("rae".into()),
                    occupant_id: Some("o3".into()),
                    new_nickname: None,
                },
            ],
            occupants: None,
        })
    }

    async fn say(&self, ticket: &str, text: &str) -> Result<(), ServiceError> {
        tracing::info!(ticket, text, "scripted service: said");
        Ok(())
    }

    async fn fetch_room_snapshot(
        &self,
        _room_id: &str,
        _password: Option<&str>,
    ) -> Result<Vec<OccupantRecord>, ServiceError> {
        Ok(vec![
            OccupantRecord {
                id: "o2".into(),
                nickname: Some("Quinn".into()),
                user_id: None,
                description: Some("just visiting".into()),
            },
            OccupantRecord {
                id: "o3".into(),
                nickname: Some("Rae".into()),
                user_id: Some("rae".into()),
                description: None,
            },
        ])
    }

    async fn exit_room(&self, ticket: &str) -> Result<(), ServiceError> {
        tracing::info!(ticket, "scripted service: exited");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// What a real transport would do with each event: turn it into a
/// client-facing line.
fn render(event: &Outbound) -> String {
    match event {
        Outbound::Registered { handle } => format!("*** your nick is now {handle}"),
        Outbound::Topic { channel, text } => format!("*** topic for {channel}: {text}"),
        Outbound::Joined { channel, who } => format!("--> {} joined {channel}", who.handle),
        Outbound::Parted { channel, who } => format!("<-- {} left {channel}", who.handle),
        Outbound::NickChanged { from, to } => format!("*** {} is now {to}", from.handle),
        Outbound::Message {
            channel,
            from,
            text,
        } => format!("[{channel}] <{}> {text}", from.handle),
        Outbound::Notice {
            channel,
            from,
            text,
        } => {
            let from = match from {
                Sender::Participant(who) => who.handle.as_str(),
                Sender::System => SYSTEM_SENDER,
                Sender::Server => "gateway",
            };
            format!("[{channel}] -{from}- {text}")
        }
        Outbound::OperatorGrant { channel, handle } => format!("*** {channel}: +o {handle}"),
        Outbound::WhoReply {
            channel,
            who,
            description,
        } => format!("[{channel}] {} ({}) {description}", who.handle, who.username()),
        Outbound::EndOfWho { channel } => format!("*** end of who for {channel}"),
        Outbound::WhoisReply {
            who,
            channel,
            server,
        } => format!(
            "*** {} is {} on {server}, seen in {channel}",
            who.handle,
            who.username()
        ),
        Outbound::EndOfWhois { handle } => format!("*** end of whois for {handle}"),
        Outbound::NoSuchChannel { channel } => format!("!!! no such channel: {channel}"),
        Outbound::NoSuchNick { nick } => format!("!!! no such nick: {nick}"),
        Outbound::ServerNotice { text } => format!("-gateway- {text}"),
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), GatewayError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (commands, command_stream, event_sink, mut events) = channel_transport();
    let service = Arc::new(ScriptedRooms::new());
    let config = GatewayConfig::builder()
        .service_host("rooms.example.com")
        .greeting("this is the Parlor loopback demo.")
        .build();
    let session = GatewaySession::new(config, service, command_stream, event_sink);

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("{}", render(&event));
        }
    });

    let driver = tokio::spawn(async move {
        let script = [
            ClientCommand::Register {
                nick: "pat".into(),
                account: "pat@example.com".into(),
                password: Some("hunter2".into()),
                options: vec!["tid".into()],
            },
            ClientCommand::Join {
                channels: "#lobby".into(),
                password: None,
            },
        ];
        for command in script {
            let _ = commands.send(command);
            sleep(Duration::from_millis(100)).await;
        }

        // Give the backlog a moment to replay, then poke around.
        sleep(Duration::from_millis(500)).await;
        let _ = commands.send(ClientCommand::Privmsg {
            target: "#lobby".into(),
            text: "hello from the demo".into(),
        });
        let _ = commands.send(ClientCommand::Who {
            channel: "#lobby".into(),
        });
        let _ = commands.send(ClientCommand::Whois {
            nick: "Rae|o3".into(),
        });
        sleep(Duration::from_millis(200)).await;
        let _ = commands.send(ClientCommand::Part {
            channel: "#lobby".into(),
        });
        sleep(Duration::from_millis(200)).await;
        let _ = commands.send(ClientCommand::Quit);
    });

    session.run().await?;
    let _ = driver.await;
    let _ = printer.await;
    Ok(())
}
