//! Checkout input and its validation rules.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::domain::aggregates::PaymentMethod;
use crate::shipping::region::normalize;

pub const TURKEY_DIAL_CODE: &str = "+90";
const TC_KIMLIK_MAX_DIGITS: usize = 11;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("Bu alan zorunludur".into());
        return Err(err);
    }
    Ok(())
}

fn email_format(value: &str) -> Result<(), ValidationError> {
    if !EMAIL_PATTERN.is_match(value.trim()) {
        let mut err = ValidationError::new("email");
        err.message = Some("Geçerli bir e-posta adresi girin".into());
        return Err(err);
    }
    Ok(())
}

pub fn digits(value: &str) -> String { value.chars().filter(char::is_ascii_digit).collect() }

/// Ten national digits for Turkish numbers (a trunk `0` is dropped first), seven or more elsewhere.
pub fn is_valid_phone(country_code: &str, phone: &str) -> bool {
    let digits = digits(phone);
    if country_code.trim() == TURKEY_DIAL_CODE {
        let national = digits.strip_prefix('0').unwrap_or(digits.as_str());
        national.len() == 10
    } else {
        digits.len() >= 7
    }
}

/// Field-keyed validation messages, shown next to the offending input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self { Self::default() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn get(&self, field: &str) -> Option<&str> { self.0.get(field).map(String::as_str) }
    pub fn contains(&self, field: &str) -> bool { self.0.contains_key(field) }
    pub fn fields(&self) -> impl Iterator<Item = &str> { self.0.keys().map(String::as_str) }

    /// First message per field wins.
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn extend(&mut self, other: FieldErrors) {
        for (field, message) in other.0 {
            self.insert(field, message);
        }
    }

    fn absorb(&mut self, prefix: &str, result: Result<(), ValidationErrors>) {
        let Err(errors) = result else { return };
        for (field, list) in errors.field_errors() {
            let message = list
                .first()
                .map(|e| e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| e.code.to_string()))
                .unwrap_or_default();
            self.insert(format!("{}{}", prefix, field), message);
        }
    }

    pub fn into_result(self) -> Result<(), FieldErrors> { if self.is_empty() { Ok(()) } else { Err(self) } }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct GuestDetails {
    #[validate(custom = "not_blank")]
    pub first_name: String,
    #[validate(custom = "not_blank")]
    pub last_name: String,
    #[validate(custom = "email_format")]
    pub email: String,
    pub country_code: String,
    pub phone: String,
    #[validate(custom = "not_blank")]
    pub city: String,
    #[validate(custom = "not_blank")]
    pub district: String,
    #[validate(custom = "not_blank")]
    pub address: String,
}

impl GuestDetails {
    pub fn full_name(&self) -> String { format!("{} {}", self.first_name.trim(), self.last_name.trim()) }
    pub fn full_phone(&self) -> String { format!("{}{}", self.country_code.trim(), digits(&self.phone)) }

    pub fn validate_fields(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.absorb("guest.", self.validate());
        if !is_valid_phone(&self.country_code, &self.phone) {
            errors.insert("guest.phone", "Geçerli bir telefon numarası girin");
        }
        if !self.city.trim().is_empty() && !self.district.trim().is_empty() && !district_belongs_to_city(&self.city, &self.district) {
            errors.insert("guest.district", "İlçe seçilen ile ait değil");
        }
        errors
    }
}

/// Address picked from the account's address book, or typed in for this order only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectedAddress {
    pub id: Option<String>,
    pub recipient_name: String,
    pub phone: String,
    pub city: String,
    pub district: String,
    pub address: String,
    /// Typed in during checkout rather than saved.
    #[serde(default)]
    pub temporary: bool,
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountDelivery {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub address: Option<SelectedAddress>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DeliveryInput {
    Guest(GuestDetails),
    Account(AccountDelivery),
}

impl DeliveryInput {
    pub fn city(&self) -> Option<&str> {
        match self {
            Self::Guest(g) => Some(g.city.as_str()),
            Self::Account(a) => a.address.as_ref().map(|addr| addr.city.as_str()),
        }
    }

    pub fn validate_fields(&self) -> FieldErrors {
        match self {
            Self::Guest(guest) => guest.validate_fields(),
            Self::Account(account) => {
                let mut errors = FieldErrors::new();
                match &account.address {
                    None => errors.insert("address", "Lütfen bir teslimat adresi seçin"),
                    Some(addr) if addr.temporary && !addr.confirmed => errors.insert("address", "Lütfen yeni adresi onaylayın"),
                    Some(_) => {}
                }
                errors
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InvoiceProfile {
    Individual {
        #[serde(default)]
        tc_kimlik_no: Option<String>,
    },
    Corporate {
        company_name: String,
        tax_number: String,
        tax_office: String,
    },
}

impl Default for InvoiceProfile {
    fn default() -> Self { Self::Individual { tc_kimlik_no: None } }
}

impl InvoiceProfile {
    /// Keeps digits only and caps an identity number at eleven of them.
    pub fn sanitize_tc_kimlik(raw: &str) -> String { digits(raw).chars().take(TC_KIMLIK_MAX_DIGITS).collect() }

    /// Copy with identity and tax fields cleaned up for storing on the order.
    pub fn normalized(&self) -> Self {
        match self {
            Self::Individual { tc_kimlik_no } => Self::Individual {
                tc_kimlik_no: tc_kimlik_no.as_deref().map(Self::sanitize_tc_kimlik).filter(|n| !n.is_empty()),
            },
            Self::Corporate { company_name, tax_number, tax_office } => Self::Corporate {
                company_name: company_name.trim().to_string(),
                tax_number: tax_number.trim().to_string(),
                tax_office: tax_office.trim().to_string(),
            },
        }
    }

    pub fn validate_fields(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if let Self::Corporate { tax_number, .. } = self {
            let valid = tax_number.chars().all(|c| c.is_ascii_digit()) && (10..=11).contains(&tax_number.len());
            if !valid {
                errors.insert("invoice.tax_number", "Vergi numarası 10 veya 11 haneli olmalıdır");
            }
        }
        errors
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDetails {
    pub holder_name: String,
    pub number: String,
    /// `MM/YY`
    pub expiry: String,
    pub cvv: String,
}

impl CardDetails {
    pub fn validate_fields(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        let number: String = self.number.chars().filter(|c| !c.is_whitespace()).collect();
        if number.len() != 16 || !number.chars().all(|c| c.is_ascii_digit()) {
            errors.insert("card.number", "Kart numarası 16 haneli olmalıdır");
        }
        let expiry_ok = match self.expiry.trim().split_once('/') {
            Some((mm, yy)) => [mm, yy].iter().all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_digit())),
            None => false,
        };
        if !expiry_ok {
            errors.insert("card.expiry", "Son kullanma tarihi AA/YY biçiminde olmalıdır");
        }
        if self.cvv.len() != 3 || !self.cvv.chars().all(|c| c.is_ascii_digit()) {
            errors.insert("card.cvv", "CVV 3 haneli olmalıdır");
        }
        errors
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentInput {
    Card(CardDetails),
    BankTransfer,
}

impl PaymentInput {
    pub fn method(&self) -> PaymentMethod {
        match self {
            Self::Card(_) => PaymentMethod::Card,
            Self::BankTransfer => PaymentMethod::Eft,
        }
    }
}

impl Default for PaymentInput {
    fn default() -> Self { Self::Card(CardDetails::default()) }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckoutForm {
    pub delivery: DeliveryInput,
    #[serde(default)]
    pub invoice: InvoiceProfile,
    #[serde(default)]
    pub payment: PaymentInput,
    #[serde(default)]
    pub agreed_to_terms: bool,
}

impl CheckoutForm {
    pub fn guest(details: GuestDetails) -> Self {
        Self { delivery: DeliveryInput::Guest(details), invoice: InvoiceProfile::default(), payment: PaymentInput::default(), agreed_to_terms: false }
    }

    pub fn account(delivery: AccountDelivery) -> Self {
        Self { delivery: DeliveryInput::Account(delivery), invoice: InvoiceProfile::default(), payment: PaymentInput::default(), agreed_to_terms: false }
    }

    /// Step one: who and where. The terms gate applies here too.
    pub fn validate_delivery_step(&self) -> FieldErrors {
        let mut errors = self.delivery.validate_fields();
        errors.extend(self.invoice.validate_fields());
        self.check_terms(&mut errors);
        errors
    }

    /// Step two: payment and terms.
    pub fn validate_payment_step(&self) -> FieldErrors {
        let mut errors = match &self.payment {
            PaymentInput::Card(card) => card.validate_fields(),
            PaymentInput::BankTransfer => FieldErrors::new(),
        };
        self.check_terms(&mut errors);
        errors
    }

    fn check_terms(&self, errors: &mut FieldErrors) {
        if !self.agreed_to_terms {
            errors.insert("agreed_to_terms", "Devam etmek için satış sözleşmesini onaylayın");
        }
    }

    pub fn validate_all(&self) -> FieldErrors {
        let mut errors = self.validate_delivery_step();
        errors.extend(self.validate_payment_step());
        errors
    }
}

static DISTRICTS: Lazy<BTreeMap<String, Vec<String>>> = Lazy::new(|| {
    let table: [(&str, &[&str]); 8] = [
        ("Antalya", &["Muratpaşa", "Konyaaltı", "Kepez", "Aksu", "Döşemealtı", "Alanya", "Manavgat", "Serik", "Kemer", "Kaş", "Kumluca", "Finike", "Demre", "Gazipaşa", "Elmalı", "Korkuteli", "Gündoğmuş", "İbradı", "Akseki"]),
        ("İstanbul", &["Adalar", "Arnavutköy", "Ataşehir", "Avcılar", "Bağcılar", "Bahçelievler", "Bakırköy", "Başakşehir", "Bayrampaşa", "Beşiktaş", "Beykoz", "Beylikdüzü", "Beyoğlu", "Büyükçekmece", "Çatalca", "Çekmeköy", "Esenler", "Esenyurt", "Eyüpsultan", "Fatih", "Gaziosmanpaşa", "Güngören", "Kadıköy", "Kağıthane", "Kartal", "Küçükçekmece", "Maltepe", "Pendik", "Sancaktepe", "Sarıyer", "Silivri", "Sultanbeyli", "Sultangazi", "Şile", "Şişli", "Tuzla", "Ümraniye", "Üsküdar", "Zeytinburnu"]),
        ("Ankara", &["Altındağ", "Ayaş", "Bala", "Beypazarı", "Çankaya", "Çubuk", "Elmadağ", "Etimesgut", "Gölbaşı", "Haymana", "Kahramankazan", "Keçiören", "Mamak", "Polatlı", "Pursaklar", "Sincan", "Yenimahalle"]),
        ("İzmir", &["Balçova", "Bayraklı", "Bornova", "Buca", "Çeşme", "Çiğli", "Gaziemir", "Güzelbahçe", "Karabağlar", "Karşıyaka", "Konak", "Menemen", "Narlıdere", "Seferihisar", "Torbalı", "Urla"]),
        ("Muğla", &["Bodrum", "Dalaman", "Datça", "Fethiye", "Köyceğiz", "Marmaris", "Menteşe", "Milas", "Ortaca", "Seydikemer", "Ula", "Yatağan"]),
        ("Mersin", &["Akdeniz", "Anamur", "Erdemli", "Mezitli", "Silifke", "Tarsus", "Toroslar", "Yenişehir"]),
        ("Adana", &["Ceyhan", "Çukurova", "Karaisalı", "Kozan", "Sarıçam", "Seyhan", "Yüreğir"]),
        ("Hatay", &["Antakya", "Arsuz", "Defne", "Dörtyol", "İskenderun", "Kırıkhan", "Reyhanlı", "Samandağ"]),
    ];
    table
        .iter()
        .map(|(city, districts)| (normalize(city), districts.iter().map(|d| normalize(d)).collect()))
        .collect()
});

/// Cities without a district list accept any district name.
pub fn district_belongs_to_city(city: &str, district: &str) -> bool {
    match DISTRICTS.get(&normalize(city)) {
        Some(list) => list.contains(&normalize(district)),
        None => true,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn guest() -> GuestDetails {
        GuestDetails {
            first_name: "Ayşe".into(),
            last_name: "Yılmaz".into(),
            email: "ayse@example.com".into(),
            country_code: "+90".into(),
            phone: "0532 123 45 67".into(),
            city: "Antalya".into(),
            district: "Muratpaşa".into(),
            address: "Lara Cd. No:5".into(),
        }
    }

    pub fn card() -> CardDetails {
        CardDetails { holder_name: "AYSE YILMAZ".into(), number: "4111 1111 1111 1111".into(), expiry: "08/27".into(), cvv: "123".into() }
    }

    pub fn complete_guest_form() -> CheckoutForm {
        let mut form = CheckoutForm::guest(guest());
        form.payment = PaymentInput::Card(card());
        form.agreed_to_terms = true;
        form
    }
}
