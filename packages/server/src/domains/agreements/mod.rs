pub mod models;

pub use models::{AgreementStatus, MembershipAgreement, RenewalBillingTrigger};
