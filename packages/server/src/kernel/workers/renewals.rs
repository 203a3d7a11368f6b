//! Membership renewal processor: expiry reminders, then expiry handling
//! with auto-renew.

use anyhow::Result;
use tracing::{error, info, warn};

use crate::domains::agreements::models::{MembershipAgreement, RenewalBillingTrigger};
use crate::domains::customers::models::Customer;
use crate::kernel::ServerDeps;

/// Days before expiry at which the reminder goes out.
const REMINDER_WINDOW_DAYS: i32 = 14;

#[derive(Debug, Default, Clone, Copy)]
pub struct RenewalStats {
    pub reminded: usize,
    pub expired: usize,
    pub renewed: usize,
    pub errors: usize,
}

/// Two passes per tick: (a) remind on agreements entering the expiry window,
/// (b) expire lapsed agreements, auto-renewing the ones that opted in.
/// Agreements with `auto_renew = false` are only ever marked expired.
pub async fn process_renewals(deps: &ServerDeps) -> Result<RenewalStats> {
    let mut stats = RenewalStats::default();

    // Pass a: reminders.
    for agreement in
        MembershipAgreement::find_expiring_unreminded(REMINDER_WINDOW_DAYS, &deps.db_pool).await?
    {
        match remind_one(deps, &agreement).await {
            Ok(()) => stats.reminded += 1,
            Err(e) => {
                stats.errors += 1;
                error!(agreement_id = %agreement.id, error = %e, "renewal reminder failed");
            }
        }
    }

    // Pass b: expiry + auto-renew.
    for agreement in MembershipAgreement::find_lapsed_active(&deps.db_pool).await? {
        match expire_one(deps, &agreement).await {
            Ok(renewed) => {
                stats.expired += 1;
                if renewed {
                    stats.renewed += 1;
                }
            }
            Err(e) => {
                stats.errors += 1;
                error!(agreement_id = %agreement.id, error = %e, "agreement expiry failed");
            }
        }
    }

    if stats.reminded + stats.expired > 0 {
        info!(
            reminded = stats.reminded,
            expired = stats.expired,
            renewed = stats.renewed,
            errors = stats.errors,
            "renewal pass complete"
        );
    }
    Ok(stats)
}

async fn remind_one(deps: &ServerDeps, agreement: &MembershipAgreement) -> Result<()> {
    let customer =
        Customer::find_by_id(agreement.customer_id, agreement.company_id, &deps.db_pool).await?;

    if let Some(phone) = customer.as_ref().and_then(|c| c.phone.as_deref()) {
        let body = format!(
            "Your {} plan expires on {}. Reply or call us to renew.",
            agreement.plan_name, agreement.expires_on
        );
        if let Err(e) = deps.sms.send(phone, &body).await {
            warn!(agreement_id = %agreement.id, error = %e, "reminder SMS failed");
        }
    }

    MembershipAgreement::mark_reminded(agreement.id, &deps.db_pool).await?;
    Ok(())
}

/// Returns true when a successor agreement was created.
async fn expire_one(deps: &ServerDeps, agreement: &MembershipAgreement) -> Result<bool> {
    let mut tx = deps.db_pool.begin().await?;

    // Conditional flip keyed on the active status; a concurrent tick that
    // already expired this row wins and we do nothing.
    if !MembershipAgreement::mark_expired_in_tx(agreement.id, &mut tx).await? {
        tx.rollback().await?;
        return Ok(false);
    }

    let renewed = if agreement.auto_renew {
        let successor = agreement.insert_renewal_in_tx(&mut tx).await?;
        RenewalBillingTrigger::insert_in_tx(agreement.company_id, successor.id, &mut tx).await?;
        true
    } else {
        false
    };

    tx.commit().await?;
    Ok(renewed)
}
