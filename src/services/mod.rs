pub mod mailer;
pub mod storage;

pub use mailer::{Mailer, MailError, OutboundMail, RecordingMailer, SmtpMailer};
pub use storage::{FileStorage, StorageError, StoredFile, UploadKind};
