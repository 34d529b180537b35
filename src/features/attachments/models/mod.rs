mod attachment;

pub use attachment::{ArchivedFile, AttachmentSlot, StoredAttachment};
