//! Concrete transports, each behind a client trait so real network
//! backends slot in without touching the retry machinery.

mod mail;
mod memory;
mod object_store;
mod remote_file;

pub use mail::{EmailMessage, EmailMessageBuilder, MailClient, MailTransport};
pub use memory::MemoryTransport;
pub use object_store::{ObjectStoreClient, ObjectStoreTransport};
pub use remote_file::{FileTransferClient, RemoteFileTransport};
