//! Session manager for a single two-player match
//!
//! The session owns the authoritative [`GameState`] and the connection table
//! behind one async mutex. Every state change (join, paddle move, disconnect,
//! ball tick) goes through the same cycle:
//!
//! 1. lock the match and apply exactly one transition
//! 2. capture the encoded snapshot and the seated connections
//! 3. release the lock and send the snapshot to each captured connection
//!
//! A failed send is handled as a disconnect of that slot, which runs through the
//! same cycle so the remaining player sees the removal.

use crate::client_manager::{Client, ClientManager, ConnectionId, Slot};
use crate::connection::{Connection, TransportError};
use crate::error::ServerError;
use crate::game::{GameState, Rally};
use futures_util::future::join_all;
use futures_util::{Stream, StreamExt};
use log::{debug, error, info, warn};
use shared::{ClientCommand, Direction, GameStateSnapshot, ServerNotice, Side};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Connected(Slot),
    Full,
}

/// Whether a listen loop should keep reading from its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Client,
    Ticker,
}

/// Side effects a transition asks for once the lock is released.
#[derive(Default)]
struct Change {
    broadcast: bool,
    evicted: Option<Client>,
    ticker: Option<JoinHandle<()>>,
}

impl Change {
    fn none() -> Self {
        Self::default()
    }

    fn broadcast() -> Self {
        Self {
            broadcast: true,
            ..Self::default()
        }
    }
}

struct Match {
    state: GameState,
    clients: ClientManager,
    ticker: Option<JoinHandle<()>>,
    /// Bumped whenever a tick loop starts or the match stops being ready.
    /// A loop holding an older generation halts on its next tick.
    generation: u64,
}

impl Match {
    fn join(&mut self, connection: Arc<dyn Connection>, session: &Session) -> (JoinOutcome, Change) {
        let Some(side) = self.state.open_slot() else {
            return (JoinOutcome::Full, Change::none());
        };
        let Some(slot) = self.clients.add_client(side, connection) else {
            error!("{:?} slot is free in the game but held in the client table", side);
            return (JoinOutcome::Full, Change::none());
        };

        self.state.add_player(side);
        if self.state.ready {
            self.start_ticker(session);
        }
        (JoinOutcome::Connected(slot), Change::broadcast())
    }

    fn start_ticker(&mut self, session: &Session) {
        if self
            .ticker
            .as_ref()
            .is_some_and(|ticker| !ticker.is_finished())
        {
            return;
        }
        self.generation += 1;
        self.ticker = Some(tokio::spawn(session.clone().run_ticker(self.generation)));
    }

    /// `None` when the slot no longer belongs to the caller.
    fn move_paddle(&mut self, slot: Slot, direction: Direction) -> (Option<bool>, Change) {
        if !self.clients.holds(slot) {
            return (None, Change::none());
        }
        if self.state.move_player(slot.side, direction) {
            (Some(true), Change::broadcast())
        } else {
            (Some(false), Change::none())
        }
    }

    fn remove(&mut self, side: Side, owner: Option<ConnectionId>) -> (bool, Change) {
        let Some(client) = self.clients.remove_client(side, owner) else {
            return (false, Change::none());
        };

        self.state.remove_player(side);
        self.generation += 1;
        let change = Change {
            broadcast: true,
            evicted: Some(client),
            ticker: self.ticker.take(),
        };
        (true, change)
    }

    fn advance(&mut self, generation: u64) -> (Option<Rally>, Change) {
        if !self.state.ready || generation != self.generation {
            return (None, Change::none());
        }
        (Some(self.state.move_ball()), Change::broadcast())
    }
}

struct Inner {
    game: Mutex<Match>,
    tick_period: Duration,
}

/// Cloneable handle to the running match.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    pub fn new(tick_period: Duration) -> Self {
        Self::with_state(GameState::new(), tick_period)
    }

    pub fn with_state(state: GameState, tick_period: Duration) -> Self {
        info!(
            "New match, {:?} serves first, ticking every {}ms",
            state.turn,
            tick_period.as_millis()
        );
        Self {
            inner: Arc::new(Inner {
                game: Mutex::new(Match {
                    state,
                    clients: ClientManager::new(),
                    ticker: None,
                    generation: 0,
                }),
                tick_period: tick_period.max(Duration::from_millis(1)),
            }),
        }
    }

    /// Seats a connection in the first free slot, LEFT before RIGHT.
    ///
    /// Filling the second slot starts the tick loop. The caller is responsible
    /// for the `connected` or `full` notice; see [`Session::attach`].
    pub async fn join(&self, connection: Arc<dyn Connection>) -> JoinOutcome {
        let session = self.clone();
        let outcome = self
            .update(Origin::Client, move |game| game.join(connection, &session))
            .await;

        match outcome {
            JoinOutcome::Connected(slot) => {
                info!("Connection {} joined as {:?}", slot.id, slot.side)
            }
            JoinOutcome::Full => info!("Rejecting connection, both slots are taken"),
        }
        outcome
    }

    /// Handles one inbound text frame from `slot`.
    pub async fn receive(&self, slot: Slot, text: &str) -> Flow {
        debug!("Command from {:?}: {}", slot.side, text);
        match ClientCommand::decode(text) {
            Ok(Some(ClientCommand::Move { direction })) => {
                match self.move_player(slot, direction).await {
                    Some(_) => Flow::Continue,
                    None => Flow::Stop,
                }
            }
            Ok(Some(ClientCommand::Close)) => {
                self.leave(slot).await;
                Flow::Stop
            }
            Ok(None) => {
                debug!("Ignoring unknown command from {:?}", slot.side);
                Flow::Continue
            }
            Err(e) => {
                warn!("Dropping malformed frame from {:?}: {}", slot.side, e);
                Flow::Continue
            }
        }
    }

    /// Moves the paddle held by `slot`.
    ///
    /// Returns `None` if the slot has been taken away from this connection,
    /// otherwise whether the paddle accepted the direction.
    pub async fn move_player(&self, slot: Slot, direction: Direction) -> Option<bool> {
        self.update(Origin::Client, |game| game.move_paddle(slot, direction))
            .await
    }

    /// Runs one physics step if both players are seated.
    pub async fn tick(&self) -> Option<Rally> {
        self.update(Origin::Client, |game| {
            let generation = game.generation;
            game.advance(generation)
        })
        .await
    }

    /// Frees `side` whoever holds it. Disconnecting an empty side is a no-op.
    pub async fn disconnect(&self, side: Side) -> bool {
        self.update(Origin::Client, |game| game.remove(side, None))
            .await
    }

    /// Frees the slot if this connection still holds it.
    pub async fn leave(&self, slot: Slot) -> bool {
        self.update(Origin::Client, |game| game.remove(slot.side, Some(slot.id)))
            .await
    }

    /// Reads frames from `inbound` until the peer leaves, then frees the slot.
    ///
    /// A clean end of stream, a transport error and a `close` command all end
    /// up in the same disconnect path.
    pub async fn listen<S>(&self, slot: Slot, mut inbound: S)
    where
        S: Stream<Item = Result<String, TransportError>> + Unpin + Send,
    {
        info!("Listening to {:?} (connection {})", slot.side, slot.id);
        while let Some(frame) = inbound.next().await {
            match frame {
                Ok(text) => {
                    if self.receive(slot, &text).await == Flow::Stop {
                        return;
                    }
                }
                Err(e) => {
                    warn!("Connection {} on {:?} dropped: {}", slot.id, slot.side, e);
                    break;
                }
            }
        }
        self.leave(slot).await;
    }

    /// Full lifecycle of one accepted connection: join, notice, listen, leave.
    pub async fn attach<S>(&self, connection: Arc<dyn Connection>, inbound: S)
    where
        S: Stream<Item = Result<String, TransportError>> + Unpin + Send,
    {
        match self.join(Arc::clone(&connection)).await {
            JoinOutcome::Full => {
                if let Err(e) = notify(connection.as_ref(), &ServerNotice::Full).await {
                    debug!("Could not deliver full notice: {}", e);
                }
                connection.close().await;
            }
            JoinOutcome::Connected(slot) => {
                let notice = ServerNotice::Connected {
                    player_side: slot.side,
                };
                if let Err(e) = notify(connection.as_ref(), &notice).await {
                    warn!("Could not confirm {:?} to connection {}: {}", slot.side, slot.id, e);
                    self.leave(slot).await;
                    return;
                }
                self.listen(slot, inbound).await;
            }
        }
    }

    pub async fn snapshot(&self) -> GameStateSnapshot {
        self.inner.game.lock().await.state.snapshot()
    }

    pub async fn is_ticking(&self) -> bool {
        self.inner
            .game
            .lock()
            .await
            .ticker
            .as_ref()
            .is_some_and(|ticker| !ticker.is_finished())
    }

    async fn run_ticker(self, generation: u64) {
        info!("Tick loop {} started", generation);
        let mut ticks = interval(self.inner.tick_period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Skip the first tick since it fires immediately
        ticks.tick().await;

        loop {
            ticks.tick().await;
            match self
                .update(Origin::Ticker, |game| game.advance(generation))
                .await
            {
                Some(Rally::Missed(side)) => info!("{:?} missed the ball", side),
                Some(_) => {}
                None => break,
            }
        }
        info!("Tick loop {} stopped", generation);
    }

    /// Applies a transition, broadcasts, and evicts any slot whose send failed.
    async fn update<R, F>(&self, origin: Origin, action: F) -> R
    where
        F: FnOnce(&mut Match) -> (R, Change),
    {
        let (outcome, mut failed) = self.commit(origin, action).await;
        while let Some(slot) = failed.pop() {
            warn!(
                "Send to {:?} failed, dropping connection {}",
                slot.side, slot.id
            );
            let (_, more) = self
                .commit(origin, |game| game.remove(slot.side, Some(slot.id)))
                .await;
            failed.extend(more);
        }
        outcome
    }

    async fn commit<R, F>(&self, origin: Origin, action: F) -> (R, Vec<Slot>)
    where
        F: FnOnce(&mut Match) -> (R, Change),
    {
        let (outcome, change, broadcast) = {
            let mut game = self.inner.game.lock().await;
            let (outcome, change) = action(&mut *game);
            let broadcast = if change.broadcast {
                let notice = ServerNotice::State {
                    state: game.state.snapshot(),
                };
                match notice.encode() {
                    Ok(frame) => Some((frame, game.clients.recipients())),
                    Err(e) => {
                        error!("Failed to encode state: {}", e);
                        None
                    }
                }
            } else {
                None
            };
            (outcome, change, broadcast)
        };

        if let Some(ticker) = change.ticker {
            // The tick loop notices the bumped generation on its own; aborting
            // from inside it would cut off the broadcast below.
            if origin == Origin::Client {
                ticker.abort();
            }
        }
        if let Some(client) = change.evicted {
            client.connection.close().await;
        }

        let failed = match broadcast {
            Some((frame, recipients)) => broadcast_frame(&frame, recipients).await,
            None => Vec::new(),
        };
        (outcome, failed)
    }
}

async fn notify(connection: &dyn Connection, notice: &ServerNotice) -> Result<(), ServerError> {
    let text = notice.encode()?;
    connection.send(&text).await?;
    Ok(())
}

/// Sends one frame to every recipient concurrently and returns the slots that failed.
async fn broadcast_frame(frame: &str, recipients: Vec<(Slot, Arc<dyn Connection>)>) -> Vec<Slot> {
    let sends = recipients.iter().map(|(slot, connection)| async move {
        match connection.send(frame).await {
            Ok(()) => None,
            Err(e) => {
                debug!("Broadcast to {:?} failed: {}", slot.side, e);
                Some(*slot)
            }
        }
    });
    join_all(sends).await.into_iter().flatten().collect()
}
