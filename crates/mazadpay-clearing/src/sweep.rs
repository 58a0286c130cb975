//! Scheduled enforcement
//!
//! Two periodic jobs: the hourly grace-period sweep (on the engine itself,
//! see [`ClearanceEngine::sweep_expired_grace_periods`]) and the daily debt
//! enforcement implemented here. Both are idempotent by construction and
//! bounded per run; a failure for one seller never aborts the rest.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use mazadpay_types::{
    ClearanceResult, DEBT_SUSPENSION_AFTER_DAYS, DEFAULT_CURRENCY, HIGH_DEBT_THRESHOLD,
    SWEEP_BATCH_LIMIT,
};

use crate::engine::ClearanceEngine;
use crate::model::{note_line, Account, NewNotification};

impl ClearanceEngine {
    /// Suspend sellers whose blocked debt is overdue.
    ///
    /// Finds blocked records older than the 5-day window with unresolved
    /// debt, groups them by seller, suspends each still-active seller,
    /// escalates their blocked records, and notifies every admin.
    /// Already-suspended sellers are skipped without re-notification.
    /// Returns the number of sellers suspended this run.
    pub async fn enforce_debt_suspensions(&self, now: DateTime<Utc>) -> ClearanceResult<u64> {
        let _guard = match self.debt_gate.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!("debt enforcement already running, skipping");
                return Ok(0);
            }
        };

        let cutoff = now - Duration::days(DEBT_SUSPENSION_AFTER_DAYS);
        let overdue = self.store().overdue_blocked(cutoff, SWEEP_BATCH_LIMIT).await?;
        if overdue.is_empty() {
            debug!("no overdue blocked permissions");
            return Ok(0);
        }

        let mut debt_by_seller: BTreeMap<Uuid, i64> = BTreeMap::new();
        for permission in &overdue {
            *debt_by_seller.entry(permission.seller_id).or_default() +=
                permission.outstanding_debt();
        }
        info!(
            records = overdue.len(),
            sellers = debt_by_seller.len(),
            "processing sellers with overdue blocked debt"
        );

        let admins = self.load_admins().await;

        let mut suspended = 0;
        for (seller_id, total_debt) in debt_by_seller {
            match self
                .suspend_overdue_seller(seller_id, total_debt, &admins, now)
                .await
            {
                Ok(true) => suspended += 1,
                Ok(false) => {}
                Err(err) => {
                    // Isolate per-seller failures so the rest of the sweep
                    // still runs.
                    warn!(%seller_id, error = %err, "debt enforcement failed for seller");
                }
            }
        }

        info!(suspended, "debt enforcement complete");
        Ok(suspended)
    }

    /// Alert admins about sellers whose outstanding blocked debt exceeds
    /// `threshold`. Purely observational; mutates nothing. Returns the
    /// number of sellers alerted on.
    pub async fn high_debt_alert(
        &self,
        now: DateTime<Utc>,
        threshold: i64,
    ) -> ClearanceResult<u64> {
        debug!(at = %now, threshold, "checking for high-value seller debt");

        let blocked = self.store().outstanding_blocked(SWEEP_BATCH_LIMIT).await?;

        let mut debt_by_seller: BTreeMap<Uuid, i64> = BTreeMap::new();
        for permission in &blocked {
            *debt_by_seller.entry(permission.seller_id).or_default() +=
                permission.outstanding_debt();
        }
        debt_by_seller.retain(|_, total| *total > threshold);
        if debt_by_seller.is_empty() {
            return Ok(0);
        }

        let admins = self.load_admins().await;
        if admins.is_empty() {
            warn!("no admin accounts to notify about high debt");
            return Ok(0);
        }

        let mut alerts = 0;
        for (seller_id, total_debt) in debt_by_seller {
            let seller = match self.accounts().find(seller_id).await {
                Ok(Some(seller)) => seller,
                Ok(None) => {
                    warn!(%seller_id, "seller not found during high debt alert");
                    continue;
                }
                Err(err) => {
                    warn!(%seller_id, error = %err, "failed to load seller for high debt alert");
                    continue;
                }
            };

            for admin in &admins {
                self.dispatch(NewNotification {
                    user_id: admin.id,
                    kind: "admin_high_debt_alert".to_string(),
                    title: "High debt alert".to_string(),
                    body: format!(
                        "Seller \"{}\" has {} {} of outstanding blocked debt and needs follow-up.",
                        seller.display_name, total_debt, DEFAULT_CURRENCY
                    ),
                    link_url: Some(format!("/admin?tab=sellers&sellerId={}", seller_id)),
                    related_id: Some(seller_id),
                })
                .await;
            }
            info!(%seller_id, total_debt, "high debt alert sent");
            alerts += 1;
        }

        Ok(alerts)
    }

    async fn suspend_overdue_seller(
        &self,
        seller_id: Uuid,
        total_debt: i64,
        admins: &[Account],
        now: DateTime<Utc>,
    ) -> ClearanceResult<bool> {
        let seller = match self.accounts().find(seller_id).await? {
            Some(seller) => seller,
            None => {
                warn!(%seller_id, "seller not found during debt enforcement");
                return Ok(false);
            }
        };

        if !seller.is_active {
            debug!(%seller_id, "seller already suspended, skipping");
            return Ok(false);
        }

        self.accounts().suspend(seller_id).await?;
        self.store()
            .escalate_seller_debts(
                seller_id,
                now,
                &note_line(
                    now,
                    "Account suspended: blocked debt overdue past the 5-day window",
                ),
            )
            .await?;

        info!(
            %seller_id,
            seller_name = %seller.display_name,
            total_debt,
            "seller suspended for overdue debt"
        );

        for admin in admins {
            self.dispatch(NewNotification {
                user_id: admin.id,
                kind: "admin_debt_suspension".to_string(),
                title: "Seller suspended - overdue debt".to_string(),
                body: format!(
                    "Seller \"{}\" was suspended with {} {} of blocked debt overdue for more than {} days.",
                    seller.display_name, total_debt, DEFAULT_CURRENCY, DEBT_SUSPENSION_AFTER_DAYS
                ),
                link_url: Some(format!("/admin?tab=sellers&sellerId={}", seller_id)),
                related_id: Some(seller_id),
            })
            .await;
        }

        Ok(true)
    }

    async fn load_admins(&self) -> Vec<Account> {
        match self.accounts().admins().await {
            Ok(admins) => admins,
            Err(err) => {
                warn!(error = %err, "failed to load admin accounts");
                Vec::new()
            }
        }
    }
}

/// Run the grace-period sweep on a fixed period until the task is aborted.
pub async fn run_grace_sweeper(engine: Arc<ClearanceEngine>, period: StdDuration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    info!(period_secs = period.as_secs(), "grace period sweeper scheduled");

    loop {
        interval.tick().await;
        match engine.sweep_expired_grace_periods(Utc::now()).await {
            Ok(0) => {}
            Ok(cleared) => info!(cleared, "grace period sweep cleared permissions"),
            Err(err) => error!(error = %err, "grace period sweep failed"),
        }
    }
}

/// Run debt suspension enforcement and the high-debt alert on a fixed period.
pub async fn run_debt_enforcer(engine: Arc<ClearanceEngine>, period: StdDuration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    info!(period_secs = period.as_secs(), "debt enforcer scheduled");

    loop {
        interval.tick().await;
        let now = Utc::now();
        if let Err(err) = engine.enforce_debt_suspensions(now).await {
            error!(error = %err, "debt suspension enforcement failed");
        }
        if let Err(err) = engine.high_debt_alert(now, HIGH_DEBT_THRESHOLD).await {
            error!(error = %err, "high debt alert failed");
        }
    }
}
