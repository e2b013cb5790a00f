// Poll-based admin/visitor messaging relay

pub mod conversation;
pub mod desk;
pub mod poller;
pub mod session_list;
pub mod transcript;

pub use conversation::{Conversation, DedupKey, DEDUP_BUCKET_SECS};
pub use desk::{DeskEvent, DeskSettings, InquiryDesk};
pub use poller::{spawn_poll, PollHandle, PollPolicy};
pub use session_list::{ListUpdate, SessionList};
pub use transcript::{Bubble, Speaker, Transcript, APOLOGY};
