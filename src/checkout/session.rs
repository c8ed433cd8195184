use serde::{Deserialize, Serialize};

use super::form::{CheckoutForm, FieldErrors};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    DeliveryInfo = 1,
    Payment = 2,
}

impl CheckoutStep {
    pub fn number(self) -> u8 { self as u8 }
}

/// One buyer's pass through the two checkout steps.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckoutSession {
    pub form: CheckoutForm,
    pub step: CheckoutStep,
    pub errors: FieldErrors,
    /// Shown above the form when submission failed for reasons outside the buyer's input.
    pub general_error: Option<String>,
    pub submitting: bool,
}

impl CheckoutSession {
    pub fn new(form: CheckoutForm) -> Self {
        Self { form, step: CheckoutStep::DeliveryInfo, errors: FieldErrors::new(), general_error: None, submitting: false }
    }

    /// Moves to payment once the delivery step is clean. Returns whether it moved.
    pub fn advance(&mut self) -> bool {
        if self.step == CheckoutStep::Payment {
            return true;
        }
        self.errors = self.form.validate_delivery_step();
        if self.errors.is_empty() {
            self.step = CheckoutStep::Payment;
            true
        } else {
            false
        }
    }

    pub fn back(&mut self) {
        self.step = CheckoutStep::DeliveryInfo;
        self.errors = FieldErrors::new();
    }

    pub fn validate_for_submit(&mut self) -> Result<(), FieldErrors> {
        self.errors = self.form.validate_all();
        self.errors.clone().into_result()
    }
}
