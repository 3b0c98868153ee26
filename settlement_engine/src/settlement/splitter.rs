use chrono::{DateTime, Utc};
use log::*;
use storefront_common::{BasisPoints, Naira};

use crate::{
    config::CheckoutPolicy,
    db_types::{CartLine, CheckoutId, DeliveryMethod, Fulfilment, NewVendorOrder, OrderId, PaymentType},
    errors::ValidationError,
    order_objects::CheckoutRequest,
};

struct VendorGroup {
    vendor_id: String,
    vendor_name: String,
    lines: Vec<CartLine>,
}

impl VendorGroup {
    // Only called once validate_request has checked the whole cart for overflow
    fn subtotal(&self) -> Naira {
        self.lines.iter().filter_map(CartLine::line_total).sum()
    }
}

/// Splits a checkout into one order per vendor.
///
/// The delivery fee is shared in proportion to each vendor's subtotal, and the shares always add up to the fee
/// exactly. Pickup orders pay a deposit of `policy.deposit_rate` up front; delivery orders are paid in full. Every order
/// records the admin commission rate in force, and the referring affiliate's `affiliate_rate` if the cart has an
/// affiliate, so that the ledger never depends on the current configuration.
///
/// Orders come back in the order in which each vendor first appears in the cart.
pub fn split_checkout(
    checkout_id: &CheckoutId,
    request: &CheckoutRequest,
    policy: &CheckoutPolicy,
    affiliate_rate: BasisPoints,
    now: DateTime<Utc>,
) -> Result<Vec<NewVendorOrder>, ValidationError> {
    validate_request(request)?;
    let affiliate_rate = if request.affiliate_id.is_some() { affiliate_rate } else { BasisPoints::default() };
    let groups = group_by_vendor(&request.lines);
    let subtotals = groups.iter().map(VendorGroup::subtotal).collect::<Vec<Naira>>();
    let fee_shares = match request.delivery_method {
        DeliveryMethod::Delivery => apportion(request.delivery_fee, &subtotals),
        DeliveryMethod::Pickup => vec![Naira::zero(); groups.len()],
    };
    let orders = groups
        .into_iter()
        .zip(subtotals.into_iter().zip(fee_shares))
        .map(|(group, (subtotal, delivery_fee_share))| {
            let total = subtotal + delivery_fee_share;
            let (payment_type, amount_paid) = match request.delivery_method {
                DeliveryMethod::Delivery => (PaymentType::Full, total),
                DeliveryMethod::Pickup => (PaymentType::Deposit, policy.deposit_rate.apply(subtotal)),
            };
            let admin_commission = policy.admin_commission_rate.apply(total);
            NewVendorOrder {
                order_id: OrderId::for_vendor(checkout_id, &group.vendor_id),
                checkout_id: checkout_id.clone(),
                vendor_id: group.vendor_id,
                vendor_name: group.vendor_name,
                items: group.lines,
                buyer: request.buyer.clone(),
                subtotal,
                delivery_fee_share,
                total,
                fulfilment: Fulfilment::new(request.delivery_method),
                payment_type,
                amount_paid,
                balance_due: total - amount_paid,
                payment_reference: request.payment.reference.trim().to_string(),
                commission_rate: policy.admin_commission_rate,
                admin_commission,
                vendor_net_amount: total - admin_commission,
                affiliate_id: request.affiliate_id.clone(),
                affiliate_commission_rate: affiliate_rate,
                affiliate_commission: affiliate_rate.apply(total),
                created_at: now,
            }
        })
        .collect::<Vec<NewVendorOrder>>();
    check_payment(request, &orders)?;
    Ok(orders)
}

fn validate_request(request: &CheckoutRequest) -> Result<(), ValidationError> {
    if request.lines.is_empty() {
        return Err(ValidationError::EmptyCart);
    }
    for line in &request.lines {
        if line.quantity < 1 {
            return Err(ValidationError::InvalidQuantity {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
            });
        }
        if line.unit_price.is_negative() {
            return Err(ValidationError::NegativePrice { product_id: line.product_id.clone(), price: line.unit_price });
        }
    }
    if request.delivery_fee.is_negative() {
        return Err(ValidationError::NegativeDeliveryFee(request.delivery_fee));
    }
    if request.delivery_method == DeliveryMethod::Pickup && !request.delivery_fee.is_zero() {
        return Err(ValidationError::DeliveryFeeOnPickup(request.delivery_fee));
    }
    if request.payment.reference.trim().is_empty() {
        return Err(ValidationError::MissingPaymentReference);
    }
    // Every line, subtotal and order total is bounded by this sum, so none of them can overflow afterwards
    if request.cart_subtotal().and_then(|subtotal| subtotal.checked_add(request.delivery_fee)).is_none() {
        return Err(ValidationError::AmountOverflow);
    }
    Ok(())
}

fn check_payment(request: &CheckoutRequest, orders: &[NewVendorOrder]) -> Result<(), ValidationError> {
    let due = orders.iter().map(|o| o.amount_paid).sum::<Naira>();
    let confirmed = request.payment.amount_confirmed;
    if confirmed < due {
        return Err(ValidationError::PaymentShortfall {
            reference: request.payment.reference.clone(),
            expected: due,
            confirmed,
        });
    }
    if confirmed > due {
        warn!(
            "🧾️ Payment {} confirmed {confirmed}, which is more than the {due} due at checkout. The excess is not \
             allocated to any vendor.",
            request.payment.reference
        );
    }
    Ok(())
}

fn group_by_vendor(lines: &[CartLine]) -> Vec<VendorGroup> {
    let mut groups: Vec<VendorGroup> = Vec::new();
    for line in lines {
        let vendor_id = line.settlement_vendor();
        match groups.iter_mut().find(|g| g.vendor_id == vendor_id) {
            Some(group) => group.lines.push(line.clone()),
            None => groups.push(VendorGroup {
                vendor_id: vendor_id.to_string(),
                vendor_name: line.vendor_name.clone(),
                lines: vec![line.clone()],
            }),
        }
    }
    groups
}

/// Divides `amount` into shares proportional to `weights` using the largest-remainder method.
///
/// Each share gets the floor of its exact proportion, and the leftover kobo go one at a time to the largest fractional
/// remainders (earlier entries win ties). The shares therefore always sum to `amount`. If the weights sum to zero, every
/// share is zero.
pub fn apportion(amount: Naira, weights: &[Naira]) -> Vec<Naira> {
    let total = weights.iter().map(|w| i128::from(w.value())).sum::<i128>();
    if total <= 0 {
        return vec![Naira::zero(); weights.len()];
    }
    let amount = i128::from(amount.value());
    let mut shares = Vec::with_capacity(weights.len());
    let mut remainders = Vec::with_capacity(weights.len());
    for (i, w) in weights.iter().enumerate() {
        let exact = amount * i128::from(w.value());
        shares.push(exact / total);
        remainders.push((exact % total, i));
    }
    let mut leftover = amount - shares.iter().sum::<i128>();
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for (_, i) in remainders {
        if leftover <= 0 {
            break;
        }
        shares[i] += 1;
        leftover -= 1;
    }
    #[allow(clippy::cast_possible_truncation)]
    shares.into_iter().map(|s| Naira::from(s as i64)).collect()
}
