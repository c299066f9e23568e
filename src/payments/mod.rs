pub mod razorpay;
pub mod signature;

pub use razorpay::{GatewayOrder, PaymentGateway, RazorpayGateway};
pub use signature::SignatureVerifier;
