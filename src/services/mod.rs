//! Outbound collaborators called after an order is written. Both are best-effort.

pub mod carrier;
pub mod mailer;

pub use carrier::{CarrierClient, CarrierError, CarrierQuote, CarrierQuoteRequest, HttpCarrierClient, UnconfiguredCarrier};
pub use mailer::{LogMailer, Mailer, MailerError, OrderConfirmation};
