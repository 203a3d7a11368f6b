//! Typed ID definitions for all domain entities.
//!
//! Type aliases over [`Id`] give compile-time safety for ID usage throughout
//! the application: a `JobId` cannot be passed where an `EmployeeId` is
//! expected.

// Re-export the core Id type and version markers
pub use super::id::{Id, V4, V7};

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for Company entities (tenant roots).
pub struct Company;

/// Marker type for User accounts.
pub struct User;

/// Marker type for Employee entities (dispatchable workers).
pub struct Employee;

/// Marker type for Customer entities.
pub struct Customer;

/// Marker type for CustomerLocation entities (additional service addresses).
pub struct CustomerLocation;

/// Marker type for Equipment entities.
pub struct Equipment;

/// Marker type for Job entities.
pub struct Job;

/// Marker type for EscalationPolicy entities.
pub struct EscalationPolicy;

/// Marker type for EscalationEvent entities.
pub struct EscalationEvent;

/// Marker type for AfterHoursRule entities.
pub struct AfterHoursRule;

/// Marker type for RecurringJobSchedule entities.
pub struct RecurringJobSchedule;

/// Marker type for MembershipAgreement entities.
pub struct MembershipAgreement;

/// Marker type for ReviewRequest entities.
pub struct ReviewRequest;

/// Marker type for RefrigerantLog entities.
pub struct RefrigerantLog;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

/// Typed ID for Company entities.
pub type CompanyId = Id<Company>;

/// Typed ID for User accounts.
pub type UserId = Id<User>;

/// Typed ID for Employee entities.
pub type EmployeeId = Id<Employee>;

/// Typed ID for Customer entities.
pub type CustomerId = Id<Customer>;

/// Typed ID for CustomerLocation entities.
pub type LocationId = Id<CustomerLocation>;

/// Typed ID for Equipment entities.
pub type EquipmentId = Id<Equipment>;

/// Typed ID for Job entities.
pub type JobId = Id<Job>;

/// Typed ID for EscalationPolicy entities.
pub type PolicyId = Id<EscalationPolicy>;

/// Typed ID for EscalationEvent entities.
pub type EscalationEventId = Id<EscalationEvent>;

/// Typed ID for AfterHoursRule entities.
pub type AfterHoursRuleId = Id<AfterHoursRule>;

/// Typed ID for RecurringJobSchedule entities.
pub type ScheduleId = Id<RecurringJobSchedule>;

/// Typed ID for MembershipAgreement entities.
pub type AgreementId = Id<MembershipAgreement>;

/// Typed ID for ReviewRequest entities.
pub type ReviewRequestId = Id<ReviewRequest>;

/// Typed ID for RefrigerantLog entities.
pub type RefrigerantLogId = Id<RefrigerantLog>;
