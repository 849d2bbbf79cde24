pub mod backend;
pub mod controller;
pub mod driver;

pub use backend::{parse_event_data, ChatBackend, ChunkStream, HttpBackend, SubmitReply};
pub use controller::{decode_audio, SessionCommand, SessionController, TurnEvent, TurnMessage};
pub use driver::{route_ui_commands, run_capture_loop, CaptureCommand};
