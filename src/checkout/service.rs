//! Order submission.
//!
//! Validation, pricing, weather annotation and the order write happen in the
//! request. The carrier cost estimate and the confirmation email are spawned
//! afterwards and never affect the outcome.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use super::draft::CheckoutDraftManager;
use super::form::{CheckoutForm, DeliveryInput, FieldErrors};
use super::pricing::{PaymentCountdown, PriceBreakdown, PricingPolicy};
use super::session::CheckoutSession;
use crate::domain::aggregates::{
    Cart, CartError, CostAnalysis, CustomerSnapshot, Destination, NewOrder, Order, OrderError, PaymentMethod, PaymentSummary, WeatherAlert,
};
use crate::domain::value_objects::{Money, MoneyError};
use crate::infrastructure::{publish_all, EventPublisher, OrderRepository, RepositoryError};
use crate::services::{CarrierClient, CarrierQuoteRequest, Mailer, OrderConfirmation};
use crate::shipping::{calculate_cold_pack_needs, EddCalculator, ShipmentMetrics};
use crate::weather::{check_weather_for_shipping, WeatherProvider};

pub const DEFAULT_PAYMENT_DEADLINE_HOURS: i64 = 12;
pub const DEFAULT_ORIGIN_CITY_CODE: &str = "07";

const SUBMIT_FAILED_MESSAGE: &str = "Siparişiniz oluşturulamadı. Lütfen tekrar deneyin.";

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("checkout form has {} invalid field(s)", .0.len())]
    Validation(FieldErrors),
    #[error("cart is empty")]
    EmptyCart,
    #[error("order is already being submitted")]
    AlreadySubmitting,
    #[error(transparent)]
    Cart(#[from] CartError),
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error(transparent)]
    Pricing(#[from] MoneyError),
    #[error("order could not be saved: {0}")]
    Persistence(#[from] RepositoryError),
}

#[derive(Clone, Debug)]
pub struct CheckoutSettings {
    pub pricing: PricingPolicy,
    pub payment_deadline: Duration,
    /// Plate code of the dispatching workshop.
    pub origin_city_code: String,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            pricing: PricingPolicy::default(),
            payment_deadline: Duration::hours(DEFAULT_PAYMENT_DEADLINE_HOURS),
            origin_city_code: DEFAULT_ORIGIN_CITY_CODE.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CheckoutReceipt {
    pub order_id: String,
    pub breakdown: PriceBreakdown,
    pub estimated_delivery_date: Option<DateTime<Utc>>,
    pub weather_alert: Option<WeatherAlert>,
    /// Only for bank transfers.
    pub payment_deadline: Option<PaymentCountdown>,
    /// The idempotency key had already produced this order.
    pub duplicate: bool,
    #[serde(skip)]
    pub background: Vec<JoinHandle<()>>,
}

pub struct CheckoutService {
    orders: Arc<dyn OrderRepository>,
    weather: Arc<dyn WeatherProvider>,
    carrier: Arc<dyn CarrierClient>,
    mailer: Arc<dyn Mailer>,
    events: Arc<dyn EventPublisher>,
    drafts: Option<Arc<CheckoutDraftManager>>,
    settings: CheckoutSettings,
    edd: EddCalculator,
}

impl CheckoutService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        weather: Arc<dyn WeatherProvider>,
        carrier: Arc<dyn CarrierClient>,
        mailer: Arc<dyn Mailer>,
        events: Arc<dyn EventPublisher>,
        settings: CheckoutSettings,
    ) -> Self {
        Self { orders, weather, carrier, mailer, events, drafts: None, settings, edd: EddCalculator::default() }
    }

    pub fn with_drafts(mut self, drafts: Arc<CheckoutDraftManager>) -> Self {
        self.drafts = Some(drafts);
        self
    }

    pub fn with_edd(mut self, edd: EddCalculator) -> Self {
        self.edd = edd;
        self
    }

    pub fn settings(&self) -> &CheckoutSettings { &self.settings }

    pub fn quote(&self, cart: &Cart, method: PaymentMethod) -> Result<PriceBreakdown, CheckoutError> {
        let subtotal = cart.subtotal()?;
        Ok(self.settings.pricing.quote(subtotal.amount(), method)?)
    }

    /// Submits the session. Field problems land in `session.errors`, anything
    /// else in `session.general_error`; in both cases the session can be submitted again.
    #[instrument(skip_all, fields(idempotency_key = %idempotency_key))]
    pub async fn place_order(&self, session: &mut CheckoutSession, cart: &mut Cart, idempotency_key: &str) -> Result<CheckoutReceipt, CheckoutError> {
        if session.submitting {
            return Err(CheckoutError::AlreadySubmitting);
        }
        session.general_error = None;
        session.validate_for_submit().map_err(CheckoutError::Validation)?;
        if cart.is_empty() {
            session.general_error = Some("Sepetiniz boş.".into());
            return Err(CheckoutError::EmptyCart);
        }
        if let Err(e) = cart.subtotal() {
            session.general_error = Some("Sepet tutarı geçersiz.".into());
            return Err(CheckoutError::Cart(e));
        }

        session.submitting = true;
        let result = self.submit(&session.form, cart, idempotency_key).await;
        session.submitting = false;

        match result {
            Ok(receipt) => {
                cart.clear();
                if let Some(drafts) = &self.drafts {
                    drafts.clear();
                }
                Ok(receipt)
            }
            Err(CheckoutError::Validation(errors)) => {
                session.errors.extend(errors.clone());
                Err(CheckoutError::Validation(errors))
            }
            Err(e) => {
                warn!(error = %e, "checkout submission failed");
                session.general_error = Some(SUBMIT_FAILED_MESSAGE.into());
                Err(e)
            }
        }
    }

    async fn submit(&self, form: &CheckoutForm, cart: &Cart, idempotency_key: &str) -> Result<CheckoutReceipt, CheckoutError> {
        let now = Utc::now();
        let method = form.payment.method();
        let breakdown = self.quote(cart, method)?;
        let items = cart.line_items();
        let shipment = ShipmentMetrics::from_items(&items);
        let customer = customer_snapshot(form)?;

        let check = check_weather_for_shipping(self.weather.as_ref(), &customer.destination.city).await;
        let temperature = check.weather.temperature;
        let weather_alert = WeatherAlert { temp: temperature, requires_ice: check.requires_cold_pack };
        let cold_pack = calculate_cold_pack_needs(temperature, shipment.total_weight_kg, &now.with_timezone(&self.edd.tz()));

        let payment = PaymentSummary::new(method, breakdown.cart_total.clone(), breakdown.shipping_cost.clone(), breakdown.discount.clone())?;
        let user_id = customer.user_id.clone();
        let email = customer.email.clone();
        let mut order = Order::place(NewOrder {
            idempotency_key: idempotency_key.to_string(),
            placed_at: now,
            customer,
            items,
            payment,
            weather_alert: Some(weather_alert),
            cold_pack: Some(cold_pack),
            shipment: Some(shipment),
        })?;
        order.set_promised_delivery_date(self.edd.estimate(&order));

        let outcome = match &user_id {
            Some(user_id) => self.orders.create_for_user(user_id, &order).await?,
            None => self.orders.create(&order).await?,
        };
        let stored = outcome.order;

        let mut background = Vec::new();
        if outcome.created {
            info!(order_id = stored.id(), total = %stored.payment().total(), guest = stored.is_guest(), "order placed");
            publish_all(self.events.as_ref(), order.take_events()).await;
            background.push(self.spawn_cost_estimate(&stored, shipment));
            background.push(self.spawn_confirmation(&stored, email));
        } else {
            info!(order_id = stored.id(), "duplicate submission, returning existing order");
        }

        let payment_deadline =
            (stored.payment().method() == PaymentMethod::Eft).then(|| PaymentCountdown::starting(stored.order_date(), self.settings.payment_deadline));
        Ok(CheckoutReceipt {
            order_id: stored.id().to_string(),
            breakdown,
            estimated_delivery_date: stored.logistics().estimated_delivery_date,
            weather_alert: stored.weather_alert().copied(),
            payment_deadline,
            duplicate: !outcome.created,
            background,
        })
    }

    fn spawn_cost_estimate(&self, order: &Order, shipment: ShipmentMetrics) -> JoinHandle<()> {
        let destination = &order.customer().destination;
        let request = CarrierQuoteRequest {
            origin_city_code: self.settings.origin_city_code.clone(),
            destination_city_code: destination.province_code.map(|c| format!("{:02}", c)).unwrap_or_else(|| destination.city.clone()),
            destination_district: destination.district.clone(),
            address: order.customer().address.clone(),
            weight_kg: shipment.total_weight_kg,
            desi: shipment.desi,
        };
        let order_id = order.id().to_string();
        let orders = self.orders.clone();
        let carrier = self.carrier.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let quote = match carrier.estimate(&request).await {
                Ok(quote) => quote,
                Err(e) => {
                    warn!(%order_id, error = %e, "carrier estimate failed, skipping");
                    return;
                }
            };
            let mut order = match orders.find(&order_id).await {
                Ok(Some(order)) => order,
                Ok(None) => {
                    warn!(%order_id, "order vanished before cost estimate");
                    return;
                }
                Err(e) => {
                    warn!(%order_id, error = %e, "could not load order for cost estimate");
                    return;
                }
            };
            order.record_cost_analysis(CostAnalysis {
                estimated_shipping_cost: Money::new(quote.cost, &quote.currency),
                carrier: quote.carrier,
                estimated_at: Utc::now(),
            });
            if let Err(e) = orders.save(&order).await {
                warn!(%order_id, error = %e, "could not store cost estimate");
                return;
            }
            publish_all(events.as_ref(), order.take_events()).await;
        })
    }

    fn spawn_confirmation(&self, order: &Order, to: String) -> JoinHandle<()> {
        let payload = OrderConfirmation::for_order(order);
        let mailer = self.mailer.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send_order_confirmation(&to, &payload).await {
                warn!(order_id = %payload.order_id, error = %e, "confirmation email failed");
            }
        })
    }
}

fn customer_snapshot(form: &CheckoutForm) -> Result<CustomerSnapshot, CheckoutError> {
    let invoice = form.invoice.normalized();
    match &form.delivery {
        DeliveryInput::Guest(g) => Ok(CustomerSnapshot {
            user_id: None,
            name: g.full_name(),
            email: g.email.trim().to_string(),
            phone: g.full_phone(),
            address: format!("{}, {}/{}", g.address.trim(), g.district.trim(), g.city.trim()),
            destination: Destination::resolve(g.city.trim(), g.district.trim()),
            invoice,
        }),
        DeliveryInput::Account(account) => {
            let Some(addr) = &account.address else {
                let mut errors = FieldErrors::new();
                errors.insert("address", "Lütfen bir teslimat adresi seçin");
                return Err(CheckoutError::Validation(errors));
            };
            let name = if addr.recipient_name.trim().is_empty() { account.name.clone() } else { addr.recipient_name.clone() };
            Ok(CustomerSnapshot {
                user_id: Some(account.user_id.clone()),
                name,
                email: account.email.clone(),
                phone: addr.phone.clone(),
                address: format!("{}, {}/{}", addr.address.trim(), addr.district.trim(), addr.city.trim()),
                destination: Destination::resolve(addr.city.trim(), addr.district.trim()),
                invoice,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::draft::{CheckoutDraft, DraftAutosaver, DraftRecovery, InMemoryDraftStore, AUTOSAVE_DEBOUNCE};
    use crate::checkout::form::fixtures::complete_guest_form;
    use crate::checkout::form::{AccountDelivery, InvoiceProfile, PaymentInput, SelectedAddress};
    use crate::checkout::session::CheckoutStep;
    use crate::domain::aggregates::{CartItem, OrderStatus};
    use crate::domain::events::OrderEvent;
    use crate::infrastructure::{InMemoryOrderRepository, InsertOutcome, RecordingPublisher};
    use crate::services::{CarrierError, CarrierQuote, MailerError};
    use crate::weather::fixed::FixedWeather;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use tokio::sync::Mutex;

    struct StubCarrier {
        fail: bool,
    }

    #[async_trait]
    impl CarrierClient for StubCarrier {
        async fn estimate(&self, request: &CarrierQuoteRequest) -> Result<CarrierQuote, CarrierError> {
            if self.fail {
                return Err(CarrierError::Status(500));
            }
            assert!(request.desi >= 1);
            Ok(CarrierQuote { carrier: "Aras".into(), cost: Decimal::new(8450, 2), currency: "TRY".into() })
        }
    }

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<(String, OrderConfirmation)>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send_order_confirmation(&self, to: &str, payload: &OrderConfirmation) -> Result<(), MailerError> {
            self.sent.lock().await.push((to.to_string(), payload.clone()));
            Ok(())
        }
    }

    struct Harness {
        repo: Arc<InMemoryOrderRepository>,
        mailer: Arc<RecordingMailer>,
        events: Arc<RecordingPublisher>,
        drafts: Arc<CheckoutDraftManager>,
        service: CheckoutService,
    }

    fn harness(temp: f64, carrier_fails: bool) -> Harness {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let mailer = Arc::new(RecordingMailer::default());
        let events = Arc::new(RecordingPublisher::new());
        let drafts = Arc::new(CheckoutDraftManager::new(Arc::new(InMemoryDraftStore::default())));
        let service = CheckoutService::new(
            repo.clone(),
            Arc::new(FixedWeather::new(temp)),
            Arc::new(StubCarrier { fail: carrier_fails }),
            mailer.clone(),
            events.clone(),
            CheckoutSettings::default(),
        )
        .with_drafts(drafts.clone());
        Harness { repo, mailer, events, drafts, service }
    }

    fn cart(unit_price: i64, quantity: u32) -> Cart {
        let mut cart = Cart::new("TRY");
        cart.add_item(CartItem {
            product_id: "pralin-16".into(),
            title: "Pralin Kutusu 16'lı".into(),
            quantity,
            unit_price: Money::lira(Decimal::new(unit_price, 0)),
            image: None,
            weight_grams: Some(400),
            dimensions: None,
        })
        .unwrap();
        cart
    }

    async fn settle(receipt: &mut CheckoutReceipt) {
        for handle in receipt.background.drain(..) {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn guest_card_order_end_to_end() {
        let h = harness(18.0, false);
        h.drafts.save(&CheckoutDraft::capture(&complete_guest_form(), CheckoutStep::Payment), Utc::now()).unwrap();
        let mut session = CheckoutSession::new(complete_guest_form());
        let mut cart = cart(500, 2);

        let mut receipt = h.service.place_order(&mut session, &mut cart, "key-1").await.unwrap();
        settle(&mut receipt).await;

        assert!(!receipt.duplicate);
        assert_eq!(receipt.breakdown.shipping_cost.amount(), Decimal::new(100, 0));
        assert_eq!(receipt.breakdown.final_total.amount(), Decimal::new(1100, 0));
        assert!(receipt.payment_deadline.is_none());
        assert!(cart.is_empty());
        assert_eq!(h.drafts.recover(Utc::now()), DraftRecovery::Empty);

        let order = h.repo.find(&receipt.order_id).await.unwrap().unwrap();
        assert_eq!(order.status(), OrderStatus::Pending);
        assert!(order.is_guest());
        assert_eq!(order.payment().total().amount(), Decimal::new(1100, 0));
        assert_eq!(order.customer().destination.province_code, Some(7));
        assert_eq!(order.shipment().unwrap().desi, 2);
        assert!(order.logistics().promised_delivery_date.is_some());
        assert_eq!(order.logistics().cost_analysis.as_ref().unwrap().carrier, "Aras");

        let sent = h.mailer.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "ayse@example.com");

        let events = h.events.events().await;
        assert!(matches!(events[0], OrderEvent::Placed { guest: true, .. }));
        assert!(events.iter().any(|e| matches!(e, OrderEvent::ShippingCostEstimated { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn pending_autosave_cannot_bring_the_draft_back() {
        let h = harness(18.0, false);
        let saver = DraftAutosaver::spawn(h.drafts.clone(), AUTOSAVE_DEBOUNCE);
        saver.notify(CheckoutDraft::capture(&complete_guest_form(), CheckoutStep::Payment));
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;

        let mut session = CheckoutSession::new(complete_guest_form());
        let mut receipt = h.service.place_order(&mut session, &mut cart(500, 2), "key-draft").await.unwrap();
        settle(&mut receipt).await;

        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        assert_eq!(h.drafts.recover(Utc::now()), DraftRecovery::Empty);
        saver.shutdown().await;
        assert_eq!(h.drafts.recover(Utc::now()), DraftRecovery::Empty);
    }

    #[tokio::test]
    async fn invoice_details_are_stored_on_the_order() {
        let h = harness(18.0, false);
        let mut form = complete_guest_form();
        form.invoice = InvoiceProfile::Corporate {
            company_name: " Kakao Gıda AŞ ".into(),
            tax_number: "1234567890".into(),
            tax_office: "Muratpaşa".into(),
        };
        let mut receipt = h.service.place_order(&mut CheckoutSession::new(form), &mut cart(500, 2), "key-corp").await.unwrap();
        settle(&mut receipt).await;
        let order = h.repo.find(&receipt.order_id).await.unwrap().unwrap();
        assert_eq!(
            order.customer().invoice,
            InvoiceProfile::Corporate { company_name: "Kakao Gıda AŞ".into(), tax_number: "1234567890".into(), tax_office: "Muratpaşa".into() }
        );

        let mut form = complete_guest_form();
        form.invoice = InvoiceProfile::Individual { tc_kimlik_no: Some("123 456 789 01 999".into()) };
        let mut receipt = h.service.place_order(&mut CheckoutSession::new(form), &mut cart(500, 2), "key-tc").await.unwrap();
        settle(&mut receipt).await;
        let order = h.repo.find(&receipt.order_id).await.unwrap().unwrap();
        assert_eq!(order.customer().invoice, InvoiceProfile::Individual { tc_kimlik_no: Some("12345678901".into()) });
    }

    #[tokio::test]
    async fn bank_transfer_gets_discount_and_deadline() {
        let h = harness(18.0, false);
        let mut form = complete_guest_form();
        form.payment = PaymentInput::BankTransfer;
        let mut session = CheckoutSession::new(form);

        let mut receipt = h.service.place_order(&mut session, &mut cart(750, 2), "key-eft").await.unwrap();
        settle(&mut receipt).await;

        assert_eq!(receipt.breakdown.shipping_cost.amount(), Decimal::ZERO);
        assert_eq!(receipt.breakdown.discount.as_ref().unwrap().amount(), Decimal::new(30, 0));
        assert_eq!(receipt.breakdown.final_total.amount(), Decimal::new(1470, 0));
        let order = h.repo.find(&receipt.order_id).await.unwrap().unwrap();
        let deadline = receipt.payment_deadline.unwrap().deadline;
        assert_eq!(deadline - order.order_date(), Duration::hours(12));
        assert!(h.mailer.sent.lock().await[0].1.awaiting_transfer);
    }

    #[tokio::test]
    async fn invalid_form_creates_nothing() {
        let h = harness(18.0, false);
        let mut form = complete_guest_form();
        form.agreed_to_terms = false;
        let mut session = CheckoutSession::new(form);
        let mut cart = cart(500, 1);

        let err = h.service.place_order(&mut session, &mut cart, "key-2").await.unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(ref e) if e.contains("agreed_to_terms")));
        assert!(session.errors.contains("agreed_to_terms"));
        assert_eq!(h.repo.len().await, 0);
        assert!(!cart.is_empty());
    }

    #[tokio::test]
    async fn hot_destination_is_annotated_for_ice() {
        let h = harness(32.0, false);
        let mut session = CheckoutSession::new(complete_guest_form());

        let mut receipt = h.service.place_order(&mut session, &mut cart(500, 1), "key-hot").await.unwrap();
        settle(&mut receipt).await;

        let alert = receipt.weather_alert.unwrap();
        assert_eq!(alert.temp, 32.0);
        assert!(alert.requires_ice);
        let order = h.repo.find(&receipt.order_id).await.unwrap().unwrap();
        assert!(order.cold_pack().unwrap().required);
        assert_eq!(order.status(), OrderStatus::Pending);
    }

    #[tokio::test]
    async fn resubmitting_same_key_returns_first_order() {
        let h = harness(18.0, false);
        let mut session = CheckoutSession::new(complete_guest_form());

        let mut first = h.service.place_order(&mut session, &mut cart(500, 1), "double-click").await.unwrap();
        settle(&mut first).await;
        let second = h.service.place_order(&mut session, &mut cart(500, 1), "double-click").await.unwrap();

        assert!(second.duplicate);
        assert!(second.background.is_empty());
        assert_eq!(second.order_id, first.order_id);
        assert_eq!(h.repo.len().await, 1);
        assert_eq!(h.mailer.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn carrier_failure_is_swallowed() {
        let h = harness(18.0, true);
        let mut session = CheckoutSession::new(complete_guest_form());

        let mut receipt = h.service.place_order(&mut session, &mut cart(500, 1), "key-3").await.unwrap();
        settle(&mut receipt).await;

        let order = h.repo.find(&receipt.order_id).await.unwrap().unwrap();
        assert!(order.logistics().cost_analysis.is_none());
        assert_eq!(h.mailer.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn account_order_goes_through_user_scope() {
        let h = harness(18.0, false);
        let mut form = CheckoutForm::account(AccountDelivery {
            user_id: "user-42".into(),
            name: "Mehmet Kaya".into(),
            email: "mehmet@example.com".into(),
            address: Some(SelectedAddress {
                id: Some("addr-1".into()),
                recipient_name: String::new(),
                phone: "+905551112233".into(),
                city: "İzmir".into(),
                district: "Karşıyaka".into(),
                address: "Cemal Gürsel Cd. 10".into(),
                temporary: false,
                confirmed: false,
            }),
        });
        form.payment = complete_guest_form().payment;
        form.agreed_to_terms = true;
        let mut session = CheckoutSession::new(form);

        let mut receipt = h.service.place_order(&mut session, &mut cart(500, 1), "key-acct").await.unwrap();
        settle(&mut receipt).await;

        let order = h.repo.find(&receipt.order_id).await.unwrap().unwrap();
        assert_eq!(order.customer().user_id.as_deref(), Some("user-42"));
        assert_eq!(order.customer().name, "Mehmet Kaya");
        assert_eq!(order.customer().destination.province_code, Some(35));
    }

    struct DownRepo;

    #[async_trait]
    impl OrderRepository for DownRepo {
        async fn create(&self, _order: &Order) -> Result<InsertOutcome, RepositoryError> { Err(RepositoryError::Unavailable("connection refused".into())) }
        async fn find(&self, _id: &str) -> Result<Option<Order>, RepositoryError> { Ok(None) }
        async fn save(&self, _order: &Order) -> Result<(), RepositoryError> { Ok(()) }
        async fn find_by_status(&self, _status: OrderStatus) -> Result<Vec<Order>, RepositoryError> { Ok(vec![]) }
    }

    #[tokio::test]
    async fn persistence_failure_leaves_session_resubmittable() {
        let mailer = Arc::new(RecordingMailer::default());
        let service = CheckoutService::new(
            Arc::new(DownRepo),
            Arc::new(FixedWeather::new(18.0)),
            Arc::new(StubCarrier { fail: false }),
            mailer.clone(),
            Arc::new(RecordingPublisher::new()),
            CheckoutSettings::default(),
        );
        let mut session = CheckoutSession::new(complete_guest_form());
        let mut cart = cart(500, 1);

        let err = service.place_order(&mut session, &mut cart, "key-4").await.unwrap_err();
        assert!(matches!(err, CheckoutError::Persistence(_)));
        assert_eq!(session.general_error.as_deref(), Some(SUBMIT_FAILED_MESSAGE));
        assert!(!session.submitting);
        assert!(session.errors.is_empty());
        assert!(!cart.is_empty());
        assert!(mailer.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn empty_cart_is_rejected() {
        let h = harness(18.0, false);
        let mut session = CheckoutSession::new(complete_guest_form());
        let err = h.service.place_order(&mut session, &mut Cart::new("TRY"), "key-5").await.unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
        assert!(session.general_error.is_some());
    }
}
