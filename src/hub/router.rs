//! Event router
//!
//! Decides which fan-out primitive an event goes through and applies the
//! event's effect on the sender's own [`User`](crate::client::User). The
//! router keeps no state of its own; it always runs on the hub task.

use tracing::debug;

use crate::client::ClientId;
use crate::hub::engine::Hub;
use crate::hub::event::{Event, JoinGame, MovePlayer};
use crate::utils::HubError;

/// Route one event sent by `sender`.
///
/// - `connect` / `disconnect`: broadcast to every other client
/// - `game:join`: move the sender into the game, then tell the clients
///   already there
/// - `game:move`: resolve user and game from the sender, then tell the other
///   clients in that game
pub fn route(hub: &mut Hub, sender: &ClientId, event: Event) -> Result<(), HubError> {
    match event {
        Event::Connect(_) | Event::Disconnect(_) => {
            hub.broadcast_all(sender, &event);
            Ok(())
        }
        Event::Join(join) => join_game(hub, sender, join),
        Event::Move(mv) => move_player(hub, sender, mv),
    }
}

fn join_game(hub: &mut Hub, sender: &ClientId, join: JoinGame) -> Result<(), HubError> {
    let user = hub
        .user_mut(sender)
        .ok_or(HubError::UnknownClient(*sender))?;

    let user_id = join.user_id.unwrap_or_else(|| user.user_id.clone());
    let game_id = join.game_id;
    user.current_game_id = Some(game_id.clone());

    debug!(client_id = %sender, %user_id, %game_id, "Joined game");

    let event = Event::Join(JoinGame {
        user_id: Some(user_id),
        game_id: game_id.clone(),
    });
    hub.emit_to_game(&game_id, sender, &event);

    Ok(())
}

fn move_player(hub: &mut Hub, sender: &ClientId, mv: MovePlayer) -> Result<(), HubError> {
    let user = hub.user(sender).ok_or(HubError::UnknownClient(*sender))?;

    let user_id = mv.user_id.unwrap_or_else(|| user.user_id.clone());
    let game_id = mv
        .game_id
        .or_else(|| user.current_game_id.clone())
        .ok_or(HubError::Validation("game_id is unresolved, join a game first"))?;

    let event = Event::Move(MovePlayer {
        user_id: Some(user_id),
        game_id: Some(game_id.clone()),
        direction: mv.direction,
    });
    hub.emit_to_game(&game_id, sender, &event);

    Ok(())
}
