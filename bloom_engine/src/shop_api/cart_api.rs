//! Cart mutations and client-side pricing.
//!
//! Every mutation funnels through [`CartApi::finish_mutation`], which re-validates any applied coupon against the
//! new subtotal and recomputes the totals before the cart is stored. Authenticated carts round-trip through the
//! shop database; guest carts live in an [`ExpiringCache`] keyed by session token and evaporate when the session
//! does.
use std::{str::FromStr, time::Duration};

use bloom_common::Rupees;
use log::*;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::{
    db_types::{AppliedCoupon, CartLine, CartOwner, CartState, CartTotals, PaymentMethod},
    kv::ExpiringCache,
    pricing,
    shop_api::{coupon_api::CouponApi, errors::CartApiError},
    traits::ShopDatabase,
};

/// What to do with an applied coupon when re-validation fails for infrastructure reasons (the coupon store is
/// unreachable). Business-rule rejections always drop the coupon regardless of this setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CouponFailPolicy {
    /// Keep the coupon and recompute its discount from the cart's own snapshot. Favours checkout conversion.
    #[default]
    Keep,
    /// Drop the coupon and tell the user. Favours revenue protection.
    Drop,
}

impl FromStr for CouponFailPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "keep" => Ok(CouponFailPolicy::Keep),
            "drop" => Ok(CouponFailPolicy::Drop),
            other => Err(format!("Unknown coupon fail policy: {other}. Use 'keep' or 'drop'.")),
        }
    }
}

/// The result of a cart mutation. `coupon_dropped` carries a user-facing notice when re-validation removed the
/// coupon as a side effect of the mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartMutationOutcome {
    pub cart: CartState,
    pub totals: CartTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_dropped: Option<String>,
}

#[derive(Clone)]
pub struct CartApi<B> {
    db: B,
    coupons: CouponApi<B>,
    guest_carts: ExpiringCache<String, CartState>,
    fail_policy: CouponFailPolicy,
}

impl<B> CartApi<B>
where B: ShopDatabase
{
    pub fn new(db: B, guest_cart_ttl: Duration, fail_policy: CouponFailPolicy) -> Self {
        let coupons = CouponApi::new(db.clone());
        Self { db, coupons, guest_carts: ExpiringCache::new(guest_cart_ttl), fail_policy }
    }

    /// Spawns the guest-cart sweep task. Call once at startup.
    pub fn start_guest_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        self.guest_carts.start_sweeper(interval)
    }

    /// A handle to the guest-cart store. Hand this to [`crate::OrderFlowApi::with_guest_carts`] so a guest
    /// checkout clears the session's cart the same way an authenticated checkout clears the stored one.
    pub fn guest_carts(&self) -> ExpiringCache<String, CartState> {
        self.guest_carts.clone()
    }

    /// The current cart and its totals. Read-only; a stale coupon stays on the cart until the next mutation.
    pub async fn cart(&self, owner: &CartOwner) -> Result<CartMutationOutcome, CartApiError> {
        let cart = self.load(owner).await?;
        let totals = self.totals_for(&cart).await?;
        Ok(CartMutationOutcome { cart, totals, coupon_dropped: None })
    }

    pub async fn add_item(
        &self,
        owner: &CartOwner,
        product_id: i64,
        quantity: u32,
    ) -> Result<CartMutationOutcome, CartApiError> {
        if quantity == 0 {
            return self.remove_item(owner, product_id).await;
        }
        let product = self
            .db
            .fetch_product(product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(CartApiError::ProductUnavailable(product_id))?;
        let mut cart = self.load(owner).await?;
        match cart.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => line.quantity += quantity,
            None => cart.lines.push(CartLine {
                product_id,
                name: product.name,
                unit_price: product.unit_price,
                quantity,
            }),
        }
        self.finish_mutation(owner, cart).await
    }

    /// Sets the quantity of an existing line. Zero removes the line.
    pub async fn set_quantity(
        &self,
        owner: &CartOwner,
        product_id: i64,
        quantity: u32,
    ) -> Result<CartMutationOutcome, CartApiError> {
        if quantity == 0 {
            return self.remove_item(owner, product_id).await;
        }
        let mut cart = self.load(owner).await?;
        let line =
            cart.lines.iter_mut().find(|l| l.product_id == product_id).ok_or(CartApiError::LineNotFound(product_id))?;
        line.quantity = quantity;
        self.finish_mutation(owner, cart).await
    }

    /// Removes a line. Removing a line that is not present is a no-op.
    pub async fn remove_item(&self, owner: &CartOwner, product_id: i64) -> Result<CartMutationOutcome, CartApiError> {
        let mut cart = self.load(owner).await?;
        cart.lines.retain(|l| l.product_id != product_id);
        self.finish_mutation(owner, cart).await
    }

    /// Applies a coupon code. On rejection the cart is left untouched and the rejection is returned verbatim.
    /// Applying a second coupon replaces the first.
    pub async fn apply_coupon(&self, owner: &CartOwner, code: &str) -> Result<CartMutationOutcome, CartApiError> {
        let mut cart = self.load(owner).await?;
        let (coupon, discount) = self.coupons.check_code(code, cart.subtotal()).await??;
        cart.coupon = Some(AppliedCoupon::from_coupon(&coupon, discount));
        let totals = self.totals_for(&cart).await?;
        self.store(owner, &cart).await?;
        Ok(CartMutationOutcome { cart, totals, coupon_dropped: None })
    }

    pub async fn remove_coupon(&self, owner: &CartOwner) -> Result<CartMutationOutcome, CartApiError> {
        let mut cart = self.load(owner).await?;
        cart.coupon = None;
        let totals = self.totals_for(&cart).await?;
        self.store(owner, &cart).await?;
        Ok(CartMutationOutcome { cart, totals, coupon_dropped: None })
    }

    pub async fn set_delivery_option(
        &self,
        owner: &CartOwner,
        option_id: i64,
    ) -> Result<CartMutationOutcome, CartApiError> {
        let _option = self
            .db
            .fetch_delivery_option(option_id)
            .await?
            .filter(|o| o.is_active)
            .ok_or(CartApiError::DeliveryOptionNotFound(option_id))?;
        let mut cart = self.load(owner).await?;
        cart.delivery_option_id = Some(option_id);
        // Delivery charges sit outside the discount base, so no re-validation is needed here.
        let totals = self.totals_for(&cart).await?;
        self.store(owner, &cart).await?;
        Ok(CartMutationOutcome { cart, totals, coupon_dropped: None })
    }

    pub async fn set_payment_method(
        &self,
        owner: &CartOwner,
        method: PaymentMethod,
    ) -> Result<CartMutationOutcome, CartApiError> {
        let mut cart = self.load(owner).await?;
        cart.payment_method = Some(method);
        let totals = self.totals_for(&cart).await?;
        self.store(owner, &cart).await?;
        Ok(CartMutationOutcome { cart, totals, coupon_dropped: None })
    }

    pub async fn set_shipping_address(
        &self,
        owner: &CartOwner,
        address_id: i64,
    ) -> Result<CartMutationOutcome, CartApiError> {
        let _address = self
            .db
            .fetch_address(address_id, &owner.key())
            .await?
            .ok_or(CartApiError::AddressNotFound(address_id))?;
        let mut cart = self.load(owner).await?;
        cart.address_id = Some(address_id);
        let totals = self.totals_for(&cart).await?;
        self.store(owner, &cart).await?;
        Ok(CartMutationOutcome { cart, totals, coupon_dropped: None })
    }

    pub async fn clear(&self, owner: &CartOwner) -> Result<(), CartApiError> {
        self.store(owner, &CartState::default()).await
    }

    async fn load(&self, owner: &CartOwner) -> Result<CartState, CartApiError> {
        let cart = match owner {
            CartOwner::User(_) => self.db.load_cart(&owner.key()).await?,
            CartOwner::Guest(_) => self.guest_carts.get(&owner.key()).await,
        };
        Ok(cart.unwrap_or_default())
    }

    async fn store(&self, owner: &CartOwner, cart: &CartState) -> Result<(), CartApiError> {
        match owner {
            CartOwner::User(_) => self.db.save_cart(&owner.key(), cart).await?,
            CartOwner::Guest(_) => self.guest_carts.insert(owner.key(), cart.clone()).await,
        }
        Ok(())
    }

    /// Re-validates the coupon against the post-mutation subtotal, recomputes the totals and stores the cart.
    async fn finish_mutation(&self, owner: &CartOwner, mut cart: CartState) -> Result<CartMutationOutcome, CartApiError> {
        let coupon_dropped = self.revalidate_coupon(&mut cart).await?;
        let totals = self.totals_for(&cart).await?;
        self.store(owner, &cart).await?;
        Ok(CartMutationOutcome { cart, totals, coupon_dropped })
    }

    /// Returns a user-facing notice when the coupon was removed. Business-rule rejections always remove it;
    /// infrastructure failures follow the configured [`CouponFailPolicy`].
    async fn revalidate_coupon(&self, cart: &mut CartState) -> Result<Option<String>, CartApiError> {
        let Some(applied) = cart.coupon.clone() else {
            return Ok(None);
        };
        let subtotal = cart.subtotal();
        match self.coupons.check_code(&applied.code, subtotal).await {
            Ok(Ok((coupon, discount))) => {
                // Only write back if the coupon on the cart is still the one we validated.
                if cart.coupon.as_ref().map(|c| c.code.as_str()) == Some(applied.code.as_str()) {
                    cart.coupon = Some(AppliedCoupon::from_coupon(&coupon, discount));
                }
                Ok(None)
            },
            Ok(Err(rejection)) => {
                info!("🛒️ Coupon {} dropped from the cart: {rejection}", applied.code);
                cart.coupon = None;
                Ok(Some(format!("Coupon {} was removed: {rejection}", applied.code)))
            },
            Err(e) => match self.fail_policy {
                CouponFailPolicy::Keep => {
                    warn!("🛒️ Coupon {} could not be re-checked ({e}). Keeping it on the cart.", applied.code);
                    let discount = pricing::discount_for(applied.kind, applied.value, applied.max_discount, subtotal);
                    cart.coupon = Some(AppliedCoupon { discount, ..applied });
                    Ok(None)
                },
                CouponFailPolicy::Drop => {
                    warn!("🛒️ Coupon {} could not be re-checked ({e}). Dropping it from the cart.", applied.code);
                    cart.coupon = None;
                    Ok(Some(format!("Coupon {} was removed because it could not be re-checked", applied.code)))
                },
            },
        }
    }

    async fn totals_for(&self, cart: &CartState) -> Result<CartTotals, CartApiError> {
        let delivery_charge = match cart.delivery_option_id {
            Some(id) => match self.db.fetch_delivery_option(id).await?.filter(|o| o.is_active) {
                Some(option) => option.price,
                None => {
                    warn!("🛒️ Cart references delivery option {id}, which is no longer available");
                    Rupees::default()
                },
            },
            None => Rupees::default(),
        };
        let surcharge = cart.payment_method.map(|m| m.surcharge()).unwrap_or_default();
        Ok(pricing::recompute_totals(&cart.lines, cart.coupon.as_ref(), delivery_charge, surcharge))
    }
}
