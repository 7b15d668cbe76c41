//! Payment gateway adapter: HTTP client and webhook signature verification.
//!
//! The external gateway is a collaborator, not part of this engine; this
//! module fixes the narrow contract the engine requires from it.

pub mod client;
pub mod signature;

pub use client::{
    GatewayOrderState, GatewayOrderStatus, GatewaySession, HttpPaymentGateway, PaymentGateway,
};
pub use signature::WebhookVerifier;
