//! Two-step checkout: delivery details, then payment.

pub mod draft;
pub mod form;
pub mod pricing;
pub mod service;
pub mod session;

pub use draft::{CheckoutDraft, CheckoutDraftManager, DraftAutosaver, DraftRecovery, DraftStore, InMemoryDraftStore};
pub use form::{CheckoutForm, DeliveryInput, FieldErrors, GuestDetails, InvoiceProfile, PaymentInput};
pub use pricing::{PaymentCountdown, PriceBreakdown, PricingPolicy};
pub use service::{CheckoutError, CheckoutReceipt, CheckoutService, CheckoutSettings};
pub use session::{CheckoutSession, CheckoutStep};
