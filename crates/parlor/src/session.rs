//! The gateway session: one connected client, many observed rooms.
//!
//! A session is a single `select!` loop over two sources:
//!
//! ```text
//! client commands ──→ dispatch ──→ api calls / observer lifecycle
//! room signals    ──→ deliver  ──→ event sink (single writer)
//! ```
//!
//! Every room observer emits into the same signal channel, and only
//! this loop writes to the sink — that is what serializes concurrent
//! rooms' output onto the one connection. Dispatch-path API calls
//! (say, snapshot) happen inline; the long-polls live on the observer
//! tasks and never block this loop.

use std::collections::HashMap;
use std::sync::Arc;

use parlor_api::{OwnIdentity, RoomService};
use parlor_protocol::{ClientCommand, IdentityResolver, Outbound};
use parlor_room::{RoomHandle, RoomSignal, enter};
use parlor_transport::{CommandStream, EventSink};
use tokio::sync::mpsc;

use crate::{GatewayConfig, GatewayError};

/// What dispatch decided about the session's future.
enum Flow {
    Continue,
    Quit,
}

/// Everything learned at registration time.
struct Registration {
    /// The client's bare nick, announced to the service on joins.
    nick: String,
    own: OwnIdentity,
    resolver: IdentityResolver,
}

/// A gateway session bound to one client connection.
///
/// Create it with the service client and the connection halves, then
/// [`run`](Self::run) it to completion. The future resolves when the
/// client quits or disconnects (`Ok`), or when the transport or the
/// upstream session dies (`Err`).
pub struct GatewaySession<S: RoomService, C: CommandStream, E: EventSink> {
    core: SessionCore<S>,
    commands: C,
    events: E,
    signal_rx: mpsc::UnboundedReceiver<RoomSignal>,
}

impl<S: RoomService, C: CommandStream, E: EventSink> GatewaySession<S, C, E> {
    /// Builds a session over the given service and connection halves.
    pub fn new(config: GatewayConfig, api: Arc<S>, commands: C, events: E) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        Self {
            core: SessionCore {
                config,
                api,
                rooms: HashMap::new(),
                registration: None,
                signals: signal_tx,
            },
            commands,
            events,
            signal_rx,
        }
    }

    /// Drives the session until it ends, then releases all rooms.
    pub async fn run(self) -> Result<(), GatewayError> {
        let Self {
            mut core,
            mut commands,
            mut events,
            mut signal_rx,
        } = self;

        let outcome = loop {
            tokio::select! {
                command = commands.next_command() => match command {
                    Ok(Some(command)) => match core.dispatch(command, &mut events).await {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Quit) => break Ok(()),
                        Err(err) => break Err(err),
                    },
                    Ok(None) => {
                        tracing::info!("client connection closed");
                        break Ok(());
                    }
                    Err(err) => break Err(GatewayError::Transport(err)),
                },

                Some(signal) = signal_rx.recv() => match signal {
                    RoomSignal::Deliver(event) => {
                        if let Err(err) = events.deliver(event).await {
                            break Err(GatewayError::Transport(err));
                        }
                    }
                    RoomSignal::RoomClosed { channel, ticket } => {
                        // Only evict the entry if it still belongs to
                        // the closed occupancy — a part followed by a
                        // quick rejoin puts a new room under this key.
                        if let Some(handle) = core.rooms.get(&channel) {
                            if handle.state().lock().await.ticket == ticket {
                                core.rooms.remove(&channel);
                            }
                        }
                    }
                    RoomSignal::SessionInvalidated => {
                        core.abandon_rooms();
                        break Err(GatewayError::SessionInvalidated);
                    }
                },
            }
        };

        match outcome {
            Ok(()) => {
                core.close_rooms().await;
                // The closing parts are already in the channel; hand
                // them to the client if it's still listening.
                while let Ok(signal) = signal_rx.try_recv() {
                    if let RoomSignal::Deliver(event) = signal {
                        if events.deliver(event).await.is_err() {
                            break;
                        }
                    }
                }
                Ok(())
            }
            Err(GatewayError::SessionInvalidated) => Err(GatewayError::SessionInvalidated),
            Err(err) => {
                core.close_rooms().await;
                Err(err)
            }
        }
    }
}

/// The session's state, separated from the connection halves so the
/// `select!` loop can borrow them independently.
struct SessionCore<S: RoomService> {
    config: GatewayConfig,
    api: Arc<S>,
    /// Joined rooms, keyed by lowercased channel name.
    rooms: HashMap<String, RoomHandle>,
    registration: Option<Registration>,
    /// Handed (cloned) to every observer this session spawns.
    signals: mpsc::UnboundedSender<RoomSignal>,
}

impl<S: RoomService> SessionCore<S> {
    async fn dispatch<E: EventSink>(
        &mut self,
        command: ClientCommand,
        events: &mut E,
    ) -> Result<Flow, GatewayError> {
        match command {
            ClientCommand::Register {
                nick,
                account,
                password,
                options,
            } => self.register(events, nick, account, password, options).await?,
            ClientCommand::Join { channels, password } => {
                self.join(events, &channels, password.as_deref()).await?
            }
            ClientCommand::Part { channel } => self.part(events, channel).await?,
            ClientCommand::Privmsg { target, text } => {
                self.privmsg(events, target, &text).await?
            }
            ClientCommand::Who { channel } => self.who(events, channel).await?,
            ClientCommand::Whois { nick } => self.whois(events, nick).await?,
            ClientCommand::Quit => {
                tracing::info!("client quit");
                return Ok(Flow::Quit);
            }
        }
        Ok(Flow::Continue)
    }

    /// Registration: authenticate against the service, learn who we
    /// are, announce readiness. A failure here is fatal to the whole
    /// session — there is nothing to bridge without an account.
    async fn register<E: EventSink>(
        &mut self,
        events: &mut E,
        nick: String,
        account: String,
        password: Option<String>,
        options: Vec<String>,
    ) -> Result<(), GatewayError> {
        // Reconnecting clients present the previously derived handle;
        // keep only the bare nick in front of the suffix.
        let nick = match nick.split_once('|') {
            Some((bare, _)) => bare.to_owned(),
            None => nick,
        };

        self.api.create_session().await?;
        self.api
            .login(&account, password.as_deref().unwrap_or(""))
            .await?;
        let own = self.api.fetch_own_identity().await?;

        let resolver = IdentityResolver::new(own.user_id.clone());
        let handle = resolver.resolve_own(&own, &own.user_id).handle;
        tracing::info!(%nick, %account, %handle, "client registered");

        events
            .deliver(Outbound::server_notice(format!(
                "Hello {nick}, {}",
                self.config.greeting
            )))
            .await?;
        if !options.is_empty() {
            events
                .deliver(Outbound::server_notice(format!(
                    "Client options: {}",
                    options.join(", ")
                )))
                .await?;
        }
        events.deliver(Outbound::Registered { handle }).await?;

        self.registration = Some(Registration {
            nick,
            own,
            resolver,
        });
        Ok(())
    }

    /// Joins each room in a comma-separated list. Failures are
    /// reported per room and don't touch the siblings.
    async fn join<E: EventSink>(
        &mut self,
        events: &mut E,
        channels: &str,
        password: Option<&str>,
    ) -> Result<(), GatewayError> {
        let Some(reg) = &self.registration else {
            tracing::debug!("join before registration, ignoring");
            return Ok(());
        };
        let resolver = reg.resolver.clone();
        let own = reg.own.clone();
        let nick = reg.nick.clone();

        for name in channels.split(',') {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let channel = name.to_lowercase();
            if self.rooms.contains_key(&channel) {
                continue;
            }

            match enter(
                Arc::clone(&self.api),
                resolver.clone(),
                &own,
                &channel,
                &nick,
                password,
                self.signals.clone(),
            )
            .await
            {
                Ok(handle) => {
                    self.rooms.insert(channel, handle);
                }
                Err(err) => {
                    tracing::warn!(%channel, error = %err, "join failed");
                    events
                        .deliver(Outbound::server_notice(format!(
                            "Could not join {channel}: {err}"
                        )))
                        .await?;
                }
            }
        }
        Ok(())
    }

    /// Part: remove the room immediately and let its observer run the
    /// closing ritual; the part event arrives through the signal
    /// channel.
    async fn part<E: EventSink>(
        &mut self,
        events: &mut E,
        channel: String,
    ) -> Result<(), GatewayError> {
        let key = channel.to_lowercase();
        match self.rooms.remove(&key) {
            Some(handle) => handle.close(),
            None => events.deliver(Outbound::NoSuchChannel { channel }).await?,
        }
        Ok(())
    }

    /// Forwards a message verbatim to the room's say operation.
    async fn privmsg<E: EventSink>(
        &mut self,
        events: &mut E,
        target: String,
        text: &str,
    ) -> Result<(), GatewayError> {
        let key = target.to_lowercase();
        let Some(handle) = self.rooms.get(&key) else {
            events
                .deliver(Outbound::NoSuchChannel { channel: target })
                .await?;
            return Ok(());
        };

        let ticket = handle.state().lock().await.ticket.clone();
        if let Err(err) = self.api.say(&ticket, text).await {
            tracing::warn!(channel = %key, error = %err, "say failed");
            events
                .deliver(Outbound::server_notice(format!(
                    "Could not deliver to {target}: {err}"
                )))
                .await?;
        }
        Ok(())
    }

    /// Presence query: a fresh snapshot from the service, one line per
    /// occupant that resolves to a handle.
    async fn who<E: EventSink>(
        &mut self,
        events: &mut E,
        channel: String,
    ) -> Result<(), GatewayError> {
        let key = channel.to_lowercase();
        let (Some(handle), Some(reg)) = (self.rooms.get(&key), self.registration.as_ref()) else {
            events.deliver(Outbound::NoSuchChannel { channel }).await?;
            return Ok(());
        };

        let (room_id, password) = {
            let st = handle.state().lock().await;
            (st.room_id.clone(), st.password.clone())
        };

        match self
            .api
            .fetch_room_snapshot(&room_id, password.as_deref())
            .await
        {
            Ok(occupants) => {
                for occupant in &occupants {
                    let Some(who) = reg.resolver.resolve_occupant(occupant) else {
                        continue;
                    };
                    let description: String = occupant
                        .description
                        .as_deref()
                        .unwrap_or("")
                        .split_whitespace()
                        .collect::<Vec<_>>()
                        .join(" ");
                    events
                        .deliver(Outbound::WhoReply {
                            channel: key.clone(),
                            who,
                            description,
                        })
                        .await?;
                }
                events.deliver(Outbound::EndOfWho { channel: key }).await?;
            }
            Err(err) => {
                tracing::warn!(channel = %key, error = %err, "snapshot failed");
                events
                    .deliver(Outbound::server_notice(format!(
                        "Could not list {channel}; the stored password may be wrong. Part and join again."
                    )))
                    .await?;
            }
        }
        Ok(())
    }

    /// Identity query: scan the rosters we already track.
    async fn whois<E: EventSink>(
        &mut self,
        events: &mut E,
        nick: String,
    ) -> Result<(), GatewayError> {
        let mut found = None;
        for (channel, handle) in &self.rooms {
            let st = handle.state().lock().await;
            if let Some(who) = st.roster.get(&nick) {
                found = Some((channel.clone(), who.clone()));
                break;
            }
        }

        match found {
            Some((channel, who)) => {
                events
                    .deliver(Outbound::WhoisReply {
                        who,
                        channel,
                        server: self.config.service_host.clone(),
                    })
                    .await?;
                events.deliver(Outbound::EndOfWhois { handle: nick }).await?;
            }
            None => events.deliver(Outbound::NoSuchNick { nick }).await?,
        }
        Ok(())
    }

    /// Cooperative teardown: every observer runs its closing ritual
    /// (best-effort room exit) and is awaited.
    async fn close_rooms(&mut self) {
        let handles: Vec<RoomHandle> = self.rooms.drain().map(|(_, handle)| handle).collect();
        for handle in &handles {
            handle.close();
        }
        for handle in handles {
            handle.wait().await;
        }
    }

    /// Hard teardown for an invalidated upstream session: the tickets
    /// are void, so the rooms are abandoned without exits or parts.
    fn abandon_rooms(&mut self) {
        for (channel, handle) in self.rooms.drain() {
            tracing::debug!(%channel, "abandoning room");
            handle.abort();
        }
    }
}
