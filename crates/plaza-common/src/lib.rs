pub mod errors;
pub mod id;

pub use errors::{ConfigError, PlazaError, SessionError, TransportError};
pub use id::{new_id, PeerId, RoomCode, ROOM_CODE_ALPHABET, ROOM_CODE_LEN};

pub type Result<T> = std::result::Result<T, PlazaError>;
