//! Transcript export: PDF rendering and optional delivery by mail

pub mod mail;
pub mod pdf;

pub use mail::parse_recipient;
pub use mail::MailTransport;
pub use mail::PdfAttachment;
pub use mail::SmtpMailer;
pub use pdf::PdfExporter;
