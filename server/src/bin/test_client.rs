use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use shared::{
    ClientCommand, Direction, GameStateSnapshot, ServerNotice, Side, BALL_SIZE, PADDLE_HEIGHT,
};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Headless Pong player that keeps its paddle under the ball.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Websocket URL of the game endpoint
    #[arg(short, long, default_value = "ws://127.0.0.1:8080/game")]
    server: String,

    /// Leave the match after sending this many moves
    #[arg(short, long)]
    moves: Option<u32>,
}

/// Move that brings the paddle toward the ball while the ball is heading our way.
fn chase(state: &GameStateSnapshot, side: Side) -> Option<Direction> {
    if !state.ready || state.turn != side {
        return None;
    }
    let paddle = state.players.get(&side)?;
    let paddle_center = paddle.y + PADDLE_HEIGHT / 2;
    let ball_center = state.ball.y + BALL_SIZE / 2;
    let slack = PADDLE_HEIGHT / 4;

    if ball_center < paddle_center - slack {
        Some(Direction::Up)
    } else if ball_center > paddle_center + slack {
        Some(Direction::Down)
    } else {
        None
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Connecting to {}", args.server);
    let (websocket, _) = connect_async(args.server.as_str()).await?;
    let (mut sink, mut source) = websocket.split();

    let mut side = None;
    let mut sent = 0u32;

    loop {
        tokio::select! {
            frame = source.next() => {
                let Some(frame) = frame else { break };
                let text = match frame? {
                    Message::Text(text) => text,
                    Message::Close(_) => break,
                    _ => continue,
                };

                match ServerNotice::decode(text.as_str()) {
                    Ok(ServerNotice::Connected { player_side }) => {
                        info!("Playing as {:?}", player_side);
                        side = Some(player_side);
                    }
                    Ok(ServerNotice::Full) => {
                        warn!("Match is full");
                        break;
                    }
                    Ok(ServerNotice::State { state }) => {
                        let Some(side) = side else { continue };
                        if let Some(direction) = chase(&state, side) {
                            let command = ClientCommand::Move { direction }.encode()?;
                            sink.send(Message::Text(command.into())).await?;
                            sent += 1;
                        }
                        if args.moves.is_some_and(|limit| sent >= limit) {
                            info!("Sent {} moves, leaving", sent);
                            break;
                        }
                    }
                    Err(e) => warn!("Unreadable notice from server: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, leaving");
                break;
            }
        }
    }

    if side.is_some() {
        let farewell = ClientCommand::Close.encode()?;
        if let Err(e) = sink.send(Message::Text(farewell.into())).await {
            warn!("Could not say goodbye: {}", e);
        }
    }
    // The server may already have closed the socket.
    let _ = sink.close().await;

    Ok(())
}
