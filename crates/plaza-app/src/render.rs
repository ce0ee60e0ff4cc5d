//! One-line console rendering of session events.

use plaza_session::{CallEvent, LeaveReason, RoomEvent, RoomInfo, SessionEvent};

pub fn room_line(room: &RoomInfo) -> String {
    format!(
        "{}  {:<24} {:<12} {}/{}{}",
        room.room_id,
        room.room_name,
        room.room_type.as_str(),
        room.player_count,
        room.max_players,
        if room.is_full() { "  (full)" } else { "" }
    )
}

fn leave_reason(reason: LeaveReason) -> &'static str {
    match reason {
        LeaveReason::Requested => "left",
        LeaveReason::Closed => "room closed by host",
        LeaveReason::HostLost => "host disconnected",
        LeaveReason::Disconnected => "connection lost",
        LeaveReason::JoinTimedOut => "host never answered",
    }
}

/// Render an event, or `None` for events with nothing to show.
pub fn describe(event: &SessionEvent) -> Option<String> {
    let line = match event {
        SessionEvent::Room(room_event) => match room_event {
            RoomEvent::Connected { peer_id } => format!("connected as {peer_id}"),
            RoomEvent::Disconnected => "disconnected from relay".to_string(),
            RoomEvent::RoomCreated { room } => {
                format!("hosting {} \"{}\" ({})", room.room_id, room.room_name, room.room_type)
            }
            RoomEvent::RoomJoined { room } => {
                format!("joining {} \"{}\"", room.room_id, room.room_name)
            }
            RoomEvent::RosterConfirmed { room } => {
                format!("in room {} ({} players)", room.room_id, room.player_count)
            }
            RoomEvent::PeerJoined { peer, .. } => {
                let host = if peer.is_host { " [host]" } else { "" };
                format!("+ {}{} in {}", peer.display_name, host, peer.sub_area)
            }
            RoomEvent::PeerLeft { peer_id, .. } => format!("- {peer_id}"),
            RoomEvent::SubAreaChanged { peer_id, sub_area } => {
                format!("{peer_id} moved to {sub_area}")
            }
            RoomEvent::PeerRenamed {
                peer_id,
                display_name,
            } => format!("{peer_id} is now {display_name}"),
            RoomEvent::RoomLeft { room_code, reason } => {
                format!("left {room_code}: {}", leave_reason(*reason))
            }
            RoomEvent::RoomListUpdated { rooms } if rooms.is_empty() => {
                "no rooms advertised".to_string()
            }
            RoomEvent::RoomListUpdated { rooms } => {
                let mut out = format!("{} room(s):", rooms.len());
                for room in rooms {
                    out.push_str("\n  ");
                    out.push_str(&room_line(room));
                }
                out
            }
            RoomEvent::Error(e) => format!("error: {e}"),
        },
        SessionEvent::Call(call_event) => match call_event {
            CallEvent::StateChanged { peer_id, state } => format!("call {peer_id}: {state}"),
            CallEvent::Ended { .. } => return None,
            CallEvent::Failed { peer_id, reason } => format!("call {peer_id} failed: {reason}"),
        },
        SessionEvent::Error(e) => format!("error: {e}"),
        SessionEvent::TransportError(reason) => format!("relay unreachable: {reason}"),
    };
    Some(line)
}

#[cfg(test)]
mod tests {
    use plaza_common::{PeerId, RoomCode, SessionError};
    use plaza_session::RoomKind;

    use super::*;

    fn room(players: u32) -> RoomInfo {
        RoomInfo {
            room_id: RoomCode::from_normalized("ABC234"),
            host_id: PeerId::from("host"),
            room_name: "Standup".into(),
            room_type: RoomKind::MeetingRoom,
            player_count: players,
            max_players: 4,
        }
    }

    #[test]
    fn room_list_lines() {
        let line = describe(&SessionEvent::Room(RoomEvent::RoomListUpdated {
            rooms: vec![room(1), room(4)],
        }))
        .unwrap();
        assert!(line.starts_with("2 room(s):"));
        assert!(line.contains("ABC234"));
        assert!(line.contains("1/4"));
        assert!(line.contains("(full)"));
    }

    #[test]
    fn errors_render_message() {
        let line = describe(&SessionEvent::Error(SessionError::NotConnected)).unwrap();
        assert!(line.starts_with("error: "));
    }

    #[test]
    fn leave_reason_is_readable() {
        let line = describe(&SessionEvent::Room(RoomEvent::RoomLeft {
            room_code: RoomCode::from_normalized("ABC234"),
            reason: LeaveReason::Closed,
        }))
        .unwrap();
        assert_eq!(line, "left ABC234: room closed by host");
    }

    #[test]
    fn call_end_is_quiet() {
        assert!(describe(&SessionEvent::Call(CallEvent::Ended {
            peer_id: PeerId::from("p")
        }))
        .is_none());
    }
}
