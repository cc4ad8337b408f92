// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Google Play subscription purchases.
//
// The host opens the store sheet and reports back with a purchase token; the
// token still has to be verified by the backend before the plan is granted.
// Only one purchase may be in flight regardless of the bridge's duplicate
// policy: replacing a store sheet the user is looking at would orphan it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use finaudy_bridge::{CallbackFamily, HostEvent, Installation};
use finaudy_core::error::{FinaudyError, Result};
use finaudy_core::types::{Capability, HostCall, Plan, PurchaseReceipt, RequestKey};
use tracing::{info, warn};

use super::app_services::AppServices;
use crate::state::{self, AppState};

pub struct PurchaseService {
    services: AppServices,
    processing: Arc<AtomicBool>,
    _listener: Installation,
}

/// Clears the in-flight markers however the purchase ends.
struct InFlight {
    processing: Arc<AtomicBool>,
    state: Arc<Mutex<AppState>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        state::lock(&self.state).purchase_in_progress = false;
        self.processing.store(false, Ordering::Release);
    }
}

#[allow(dead_code)]
impl PurchaseService {
    pub fn install(services: &AppServices) -> Self {
        let shared = services.state_handle();
        let listener = services.dispatcher().install(CallbackFamily::PurchaseFinished, move |event| {
            if let HostEvent::PurchaseFinished {
                purchase_token,
                product_id,
            } = event
            {
                let plan = Plan::from_product_id(product_id);
                info!(product_id, ?plan, completed = purchase_token.is_some(), "store sheet closed");
                state::lock(&shared).purchase_in_progress = false;
            }
        });
        Self {
            services: services.clone(),
            processing: Arc::new(AtomicBool::new(false)),
            _listener: listener,
        }
    }

    pub fn is_available(&self) -> bool {
        self.services.invoker().supports(Capability::LaunchPurchaseFlow)
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// Open the store sheet for `plan` and wait for the outcome. Backing
    /// out of the sheet yields `PurchaseCancelled`.
    pub async fn start_purchase(&self, plan: Plan) -> Result<PurchaseReceipt> {
        if self.processing.swap(true, Ordering::AcqRel) {
            return Err(FinaudyError::DuplicateRequest(RequestKey::Purchase));
        }
        let state = self.services.state_handle();
        state::lock(&state).purchase_in_progress = true;
        let _in_flight = InFlight {
            processing: self.processing.clone(),
            state,
        };

        info!(?plan, product_id = plan.product_id(), "starting purchase");
        let call = HostCall::purchase(plan.product_id());
        let key = RequestKey::Purchase;
        let receipt = self
            .services
            .invoker()
            .request(call)
            .await?
            .into_receipt(key)?;

        if receipt.product_id != plan.product_id() {
            warn!(
                expected = plan.product_id(),
                actual = %receipt.product_id,
                "store reported a different product"
            );
        }
        Ok(receipt)
    }
}
